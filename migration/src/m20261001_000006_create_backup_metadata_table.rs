use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(BackupMetadata::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BackupMetadata::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(BackupMetadata::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(BackupMetadata::StorageKey)
                            .string_len(512)
                            .not_null(),
                    )
                    .col(ColumnDef::new(BackupMetadata::Size).big_integer().not_null())
                    .col(
                        ColumnDef::new(BackupMetadata::Checksum)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BackupMetadata::Encrypted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(BackupMetadata::CompressionLevel)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(BackupMetadata::DataTypes).json().not_null())
                    .col(
                        ColumnDef::new(BackupMetadata::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BackupMetadata::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_backup_metadata_user_id")
                    .table(BackupMetadata::Table)
                    .col(BackupMetadata::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_backup_metadata_expires_at")
                    .table(BackupMetadata::Table)
                    .col(BackupMetadata::ExpiresAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(BackupMetadata::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum BackupMetadata {
    Table,
    Id,
    UserId,
    StorageKey,
    Size,
    Checksum,
    Encrypted,
    CompressionLevel,
    DataTypes,
    ExpiresAt,
    CreatedAt,
}
