use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 同意台帳は追記専用。ユーザー削除時はアプリケーション側で明示的に削除する
        manager
            .create_table(
                Table::create()
                    .table(UserConsents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserConsents::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(UserConsents::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(UserConsents::ConsentType)
                            .string_len(50)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(UserConsents::Status)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(UserConsents::Version)
                            .string_len(50)
                            .not_null(),
                    )
                    .col(ColumnDef::new(UserConsents::ConsentText).text().not_null())
                    .col(ColumnDef::new(UserConsents::IpAddress).string_len(45))
                    .col(ColumnDef::new(UserConsents::UserAgent).text())
                    .col(
                        ColumnDef::new(UserConsents::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 有効な同意の検索用 (user_id, consent_type, created_at)
        manager
            .create_index(
                Index::create()
                    .name("idx_user_consents_user_type_created")
                    .table(UserConsents::Table)
                    .col(UserConsents::UserId)
                    .col(UserConsents::ConsentType)
                    .col(UserConsents::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_user_consents_created_at")
                    .table(UserConsents::Table)
                    .col(UserConsents::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserConsents::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum UserConsents {
    Table,
    Id,
    UserId,
    ConsentType,
    Status,
    Version,
    ConsentText,
    IpAddress,
    UserAgent,
    CreatedAt,
}
