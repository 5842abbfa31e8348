// migration/src/lib.rs
pub use sea_orm_migration::prelude::*;

// ユーザープロファイル
mod m20261001_000001_create_users_table;

// 同意台帳・監査ログ
mod m20261001_000002_create_user_consents_table;
mod m20261001_000003_create_audit_logs_table;

// データエクスポート / 削除ワークフロー
mod m20261001_000004_create_data_export_requests_table;
mod m20261001_000005_create_data_deletion_requests_table;

// バックアップ
mod m20261001_000006_create_backup_metadata_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261001_000001_create_users_table::Migration),
            Box::new(m20261001_000002_create_user_consents_table::Migration),
            Box::new(m20261001_000003_create_audit_logs_table::Migration),
            Box::new(m20261001_000004_create_data_export_requests_table::Migration),
            Box::new(m20261001_000005_create_data_deletion_requests_table::Migration),
            Box::new(m20261001_000006_create_backup_metadata_table::Migration),
        ]
    }
}
