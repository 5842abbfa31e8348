// privacy-backend/src/utils/time.rs

use chrono::{DateTime, Duration, DurationRound, Utc};

/// 現在時刻 (マイクロ秒精度)
///
/// PostgreSQL / SQLite のどちらに保存しても値が変わらない精度に揃える
pub fn now() -> DateTime<Utc> {
    truncate_to_micros(Utc::now())
}

pub fn truncate_to_micros(value: DateTime<Utc>) -> DateTime<Utc> {
    value
        .duration_trunc(Duration::microseconds(1))
        .unwrap_or(value)
}
