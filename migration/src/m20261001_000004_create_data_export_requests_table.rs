use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DataExportRequests::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DataExportRequests::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(DataExportRequests::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(DataExportRequests::Status)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DataExportRequests::Format)
                            .string_len(10)
                            .not_null(),
                    )
                    .col(ColumnDef::new(DataExportRequests::DataTypes).json().not_null())
                    .col(ColumnDef::new(DataExportRequests::FilePath).string_len(512))
                    .col(ColumnDef::new(DataExportRequests::FileSize).big_integer())
                    .col(ColumnDef::new(DataExportRequests::DownloadUrl).string_len(1024))
                    .col(
                        ColumnDef::new(DataExportRequests::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(DataExportRequests::ProcessedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(DataExportRequests::ErrorMessage).text())
                    .col(
                        ColumnDef::new(DataExportRequests::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DataExportRequests::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_data_export_requests_user_id")
                    .table(DataExportRequests::Table)
                    .col(DataExportRequests::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_data_export_requests_status_expires")
                    .table(DataExportRequests::Table)
                    .col(DataExportRequests::Status)
                    .col(DataExportRequests::ExpiresAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DataExportRequests::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum DataExportRequests {
    Table,
    Id,
    UserId,
    Status,
    Format,
    DataTypes,
    FilePath,
    FileSize,
    DownloadUrl,
    ExpiresAt,
    ProcessedAt,
    ErrorMessage,
    CreatedAt,
    UpdatedAt,
}
