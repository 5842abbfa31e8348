// privacy-backend/src/middleware/rate_limit.rs

use crate::error::AppError;
use crate::middleware::identity::user_id_from_headers;
use axum::{
    body::Body,
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::Response,
};
use std::{
    collections::HashMap,
    hash::Hash,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;
use uuid::Uuid;

/// エントリーごとに有効期限を持つ共有マップ。期限切れは読み出し時と sweep で消える
pub struct TtlStore<K, V> {
    entries: Arc<Mutex<HashMap<K, (V, Instant)>>>,
}

impl<K, V> Clone for TtlStore<K, V> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<K, V> Default for TtlStore<K, V> {
    fn default() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<K, V> TtlStore<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some((_, expires_at)) if *expires_at <= Instant::now() => {
                entries.remove(key);
                None
            }
            Some((value, _)) => Some(value.clone()),
            None => None,
        }
    }

    pub async fn insert(&self, key: K, value: V, ttl: Duration) {
        self.entries
            .lock()
            .await
            .insert(key, (value, Instant::now() + ttl));
    }

    /// 有効なエントリーを更新する。無い (または期限切れ) なら既定値で ttl 付きで作り直す
    pub async fn update<F, R>(&self, key: K, ttl: Duration, f: F) -> R
    where
        V: Default,
        F: FnOnce(&mut V) -> R,
    {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        let entry = entries
            .entry(key)
            .or_insert_with(|| (V::default(), now + ttl));
        if entry.1 <= now {
            *entry = (V::default(), now + ttl);
        }
        f(&mut entry.0)
    }

    /// 期限切れのエントリーを削除し、削除件数を返す
    pub async fn sweep_expired(&self) -> usize {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        let before = entries.len();
        entries.retain(|_, (_, expires_at)| *expires_at > now);
        before - entries.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

/// ユーザーごとの固定ウィンドウ方式レート制限
#[derive(Clone)]
pub struct RateLimiter {
    store: TtlStore<Uuid, usize>,
    limit: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn new(limit: usize, window: Duration) -> Self {
        Self {
            store: TtlStore::new(),
            limit,
            window,
        }
    }

    /// 1時間あたりの上限
    pub fn per_hour(limit: usize) -> Self {
        Self::new(limit, Duration::from_secs(3600))
    }

    pub fn store(&self) -> &TtlStore<Uuid, usize> {
        &self.store
    }

    /// 上限内なら消費して true
    pub async fn try_acquire(&self, user_id: Uuid) -> bool {
        let limit = self.limit;
        self.store
            .update(user_id, self.window, |count| {
                if *count >= limit {
                    false
                } else {
                    *count += 1;
                    true
                }
            })
            .await
    }
}

/// 作成系 (POST) リクエストにだけ適用する
pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiter>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    if request.method() != Method::POST {
        return Ok(next.run(request).await);
    }

    // 識別できないリクエストは後段の抽出でエラーになる
    let Some(user_id) = user_id_from_headers(request.headers()) else {
        return Ok(next.run(request).await);
    };

    if !limiter.try_acquire(user_id).await {
        tracing::warn!(user_id = %user_id, path = %request.uri().path(), "Rate limit exceeded");
        return Err(AppError::TooManyRequests(
            "Rate limit exceeded. Please try again later.".to_string(),
        ));
    }

    Ok(next.run(request).await)
}
