pub const DEFAULT_HIGH_SCORE_LIMIT: usize = 10;
pub const MAX_HIGH_SCORE_LIMIT: usize = 100;

pub fn sanitize_name(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return "Player".to_string();
    }
    trimmed
        .chars()
        .filter(|ch| !ch.is_control())
        .take(16)
        .collect()
}

pub fn parse_high_score_limit(raw: Option<&str>) -> usize {
    raw.and_then(|value| value.trim().parse::<usize>().ok())
        .unwrap_or(DEFAULT_HIGH_SCORE_LIMIT)
        .min(MAX_HIGH_SCORE_LIMIT)
}

pub fn seconds_per_tick(tick_ms: u64) -> f32 {
    tick_ms as f32 / 1000.0
}
