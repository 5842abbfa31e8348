// privacy-backend/src/features/data_domain/mod.rs

//! 外部サービスが所有するユーザーデータ (提出履歴・コンテスト参加など) への窓口
//!
//! エクスポート時は `collect`、削除時は `erase` が呼ばれる。

use crate::error::AppResult;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

#[async_trait]
pub trait UserDataDomain: Send + Sync {
    /// データ種別名 (エクスポート/部分削除の data_types に使われる)
    fn name(&self) -> &str;

    async fn collect(&self, user_id: Uuid) -> AppResult<serde_json::Value>;

    /// 削除した件数を返す
    async fn erase(&self, user_id: Uuid) -> AppResult<u64>;
}

#[derive(Clone, Default)]
pub struct DataDomainRegistry {
    domains: BTreeMap<String, Arc<dyn UserDataDomain>>,
}

impl DataDomainRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 同名のドメインは後勝ち
    pub fn register(mut self, domain: Arc<dyn UserDataDomain>) -> Self {
        self.domains.insert(domain.name().to_string(), domain);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn UserDataDomain>> {
        self.domains.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.domains.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.domains.keys().cloned().collect()
    }

    pub fn all(&self) -> Vec<Arc<dyn UserDataDomain>> {
        self.domains.values().cloned().collect()
    }

    /// 全ドメインの erase を投げっぱなしで起動する (アカウント完全削除用)
    pub fn spawn_erase_all(&self, user_id: Uuid) {
        for domain in self.all() {
            tokio::spawn(async move {
                match domain.erase(user_id).await {
                    Ok(count) => tracing::info!(
                        user_id = %user_id,
                        domain = domain.name(),
                        erased = count,
                        "External data domain erased"
                    ),
                    Err(e) => tracing::error!(
                        user_id = %user_id,
                        domain = domain.name(),
                        error = %e,
                        "External data domain erase failed"
                    ),
                }
            });
        }
    }
}
