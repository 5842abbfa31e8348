use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DataDeletionRequests::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DataDeletionRequests::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(DataDeletionRequests::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(DataDeletionRequests::Status)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DataDeletionRequests::DeletionType)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(ColumnDef::new(DataDeletionRequests::DataTypes).json())
                    .col(ColumnDef::new(DataDeletionRequests::Reason).text())
                    .col(
                        ColumnDef::new(DataDeletionRequests::VerificationCode)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(DataDeletionRequests::VerifiedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(DataDeletionRequests::ScheduledFor)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(DataDeletionRequests::ProcessedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(DataDeletionRequests::ErrorMessage).text())
                    .col(ColumnDef::new(DataDeletionRequests::BackupReference).uuid())
                    .col(
                        ColumnDef::new(DataDeletionRequests::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DataDeletionRequests::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_data_deletion_requests_user_id")
                    .table(DataDeletionRequests::Table)
                    .col(DataDeletionRequests::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_data_deletion_requests_status")
                    .table(DataDeletionRequests::Table)
                    .col(DataDeletionRequests::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DataDeletionRequests::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum DataDeletionRequests {
    Table,
    Id,
    UserId,
    Status,
    DeletionType,
    DataTypes,
    Reason,
    VerificationCode,
    VerifiedAt,
    ScheduledFor,
    ProcessedAt,
    ErrorMessage,
    BackupReference,
    CreatedAt,
    UpdatedAt,
}
