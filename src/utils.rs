use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Exponential backoff `base * 2^attempt` plus up to 50% jitter, capped at 30 seconds.
pub(crate) fn jittered_delay(base: Duration, attempt: u32) -> Duration {
    let base_ms = u64::try_from(base.as_millis()).unwrap_or(u64::MAX);
    let scaled_ms = base_ms.saturating_mul(1u64.checked_shl(attempt).unwrap_or(u64::MAX));

    let jitter_bound = scaled_ms / 2;
    let jitter_ms = if jitter_bound == 0 {
        0
    } else {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.subsec_nanos())
            .unwrap_or_default();
        let mut hasher = DefaultHasher::new();
        attempt.hash(&mut hasher);
        nanos.hash(&mut hasher);
        hasher.finish() % jitter_bound
    };

    Duration::from_millis(scaled_ms.saturating_add(jitter_ms)).min(MAX_BACKOFF)
}
