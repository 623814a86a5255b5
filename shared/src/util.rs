/// 一天的毫秒数
pub const DAY_MS: i64 = 86_400_000;

/// 获取当前 UTC 时间戳（毫秒）
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// 时间戳加上若干天（毫秒精度，不做时区对齐）
pub fn add_days(millis: i64, days: i64) -> i64 {
    millis.saturating_add(days.saturating_mul(DAY_MS))
}

/// 从 `from` 到 `to` 经过的整天数（向下取整，可为负）
pub fn whole_days_between(from: i64, to: i64) -> i64 {
    (to - from).div_euclid(DAY_MS)
}

/// Generate a new random resource id (UUID v4, hyphenated)
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
