use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 監査ログテーブルの作成
        // アカウント削除のカスケード対象外にするため users への外部キーは張らない
        manager
            .create_table(
                Table::create()
                    .table(AuditLogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AuditLogs::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AuditLogs::UserId).uuid())
                    .col(ColumnDef::new(AuditLogs::SessionId).string_len(255))
                    .col(ColumnDef::new(AuditLogs::Action).string_len(50).not_null())
                    .col(
                        ColumnDef::new(AuditLogs::ResourceType)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(ColumnDef::new(AuditLogs::ResourceId).string_len(255))
                    .col(ColumnDef::new(AuditLogs::Result).string_len(20).not_null())
                    .col(ColumnDef::new(AuditLogs::IpAddress).string_len(45))
                    .col(ColumnDef::new(AuditLogs::UserAgent).text())
                    .col(ColumnDef::new(AuditLogs::RequestId).string_len(255))
                    .col(ColumnDef::new(AuditLogs::Metadata).json())
                    .col(ColumnDef::new(AuditLogs::OldValues).json())
                    .col(ColumnDef::new(AuditLogs::NewValues).json())
                    .col(ColumnDef::new(AuditLogs::ErrorMessage).text())
                    .col(
                        ColumnDef::new(AuditLogs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // インデックスの作成
        manager
            .create_index(
                Index::create()
                    .name("idx_audit_logs_user_id")
                    .table(AuditLogs::Table)
                    .col(AuditLogs::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_audit_logs_resource")
                    .table(AuditLogs::Table)
                    .col(AuditLogs::ResourceType)
                    .col(AuditLogs::ResourceId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_audit_logs_action")
                    .table(AuditLogs::Table)
                    .col(AuditLogs::Action)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_audit_logs_created_at")
                    .table(AuditLogs::Table)
                    .col(AuditLogs::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AuditLogs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum AuditLogs {
    Table,
    Id,
    UserId,
    SessionId,
    Action,
    ResourceType,
    ResourceId,
    Result,
    IpAddress,
    UserAgent,
    RequestId,
    Metadata,
    OldValues,
    NewValues,
    ErrorMessage,
    CreatedAt,
}
