// privacy-backend/src/infrastructure/storage.rs

use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

/// ストレージI/Oエラーをログ付きで StorageFailure に変換
fn storage_error<E: std::fmt::Display>(error: E, context: &str) -> AppError {
    tracing::error!(error = %error, context = %context, "Storage operation failed");
    AppError::StorageFailure(format!("{}: {}", context, error))
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub root_path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Local,
    Memory,
}

/// バックアップ・エクスポートのBLOBを保持するストレージ
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Store a blob and return its storage key
    async fn store(&self, key: &str, data: &[u8], content_type: &str) -> AppResult<String>;

    /// Retrieve a blob by its storage key
    async fn retrieve(&self, key: &str) -> AppResult<Vec<u8>>;

    /// Delete a blob. Deleting a missing key is not an error
    async fn delete(&self, key: &str) -> AppResult<()>;

    async fn exists(&self, key: &str) -> AppResult<bool>;
}

/// ローカルファイルシステム実装 (root_path 配下に保存)
pub struct LocalFileStorage {
    root: PathBuf,
}

impl LocalFileStorage {
    pub fn new(root_path: impl Into<PathBuf>) -> Self {
        Self {
            root: root_path.into(),
        }
    }

    fn resolve(&self, key: &str) -> AppResult<PathBuf> {
        let sanitized = sanitize_key(key);
        if sanitized.is_empty() {
            return Err(AppError::BadRequest(format!("Invalid storage key: {}", key)));
        }
        Ok(self.root.join(sanitized))
    }
}

#[async_trait]
impl StorageService for LocalFileStorage {
    async fn store(&self, key: &str, data: &[u8], _content_type: &str) -> AppResult<String> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| storage_error(e, "LocalFileStorage::store"))?;
        }
        tokio::fs::write(&path, data)
            .await
            .map_err(|e| storage_error(e, "LocalFileStorage::store"))?;

        tracing::debug!(key = %key, size = data.len(), "Blob stored");
        Ok(key.to_string())
    }

    async fn retrieve(&self, key: &str) -> AppResult<Vec<u8>> {
        let path = self.resolve(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(AppError::NotFound("Stored object not found".to_string()))
            }
            Err(e) => Err(storage_error(e, "LocalFileStorage::retrieve")),
        }
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let path = self.resolve(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(storage_error(e, "LocalFileStorage::delete")),
        }
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        let path = self.resolve(key)?;
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| storage_error(e, "LocalFileStorage::exists"))
    }
}

/// インメモリ実装 (テスト・開発用)
#[derive(Default, Clone)]
pub struct InMemoryStorage {
    files: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.files.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.files.read().await.is_empty()
    }
}

#[async_trait]
impl StorageService for InMemoryStorage {
    async fn store(&self, key: &str, data: &[u8], _content_type: &str) -> AppResult<String> {
        let mut files = self.files.write().await;
        files.insert(key.to_string(), data.to_vec());
        Ok(key.to_string())
    }

    async fn retrieve(&self, key: &str) -> AppResult<Vec<u8>> {
        let files = self.files.read().await;
        files
            .get(key)
            .cloned()
            .ok_or_else(|| AppError::NotFound("Stored object not found".to_string()))
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let mut files = self.files.write().await;
        files.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        let files = self.files.read().await;
        Ok(files.contains_key(key))
    }
}

/// Create storage service based on configuration
pub fn create_storage_service(config: &StorageConfig) -> Arc<dyn StorageService> {
    match config.backend {
        StorageBackend::Local => Arc::new(LocalFileStorage::new(&config.root_path)),
        StorageBackend::Memory => Arc::new(InMemoryStorage::new()),
    }
}

/// Sanitize a storage key to prevent path traversal.
/// `/` 区切りの各セグメントを個別に無害化し、`.` `..` や空セグメントは捨てる
pub fn sanitize_key(key: &str) -> String {
    key.split('/')
        .map(|segment| {
            segment
                .chars()
                .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_' || *c == '.')
                .collect::<String>()
                .trim_start_matches('.')
                .to_string()
        })
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}
