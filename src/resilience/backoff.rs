//! Exponential backoff with jitter for polling loops.

use std::time::Duration;

use rand::Rng;

/// Delay before poll number `attempt` (1-based): `base_ms * 2^(attempt-1)`,
/// capped at `max_ms`, plus up to 10% jitter. Attempt 0 has no delay.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let exponential_base = 2u64.saturating_pow(attempt - 1);
    let capped_delay = base_ms.saturating_mul(exponential_base).min(max_ms);

    // Spreads concurrent pollers of the same node apart.
    let jitter_range = capped_delay / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receipt_poll_schedule() {
        let expected = [500, 1000, 2000, 4000, 4000];
        for (i, base) in expected.iter().enumerate() {
            let delay = calculate_backoff(i as u32 + 1, 500, 4000).as_millis() as u64;
            assert!(delay >= *base && delay < base + base / 10 + 1, "attempt {}: {delay}", i + 1);
        }
    }

    #[test]
    fn test_zero_attempt_and_overflow() {
        assert_eq!(calculate_backoff(0, 500, 4000), Duration::ZERO);
        let huge = calculate_backoff(200, u64::MAX / 2, 4000);
        assert!(huge.as_millis() >= 4000 && huge.as_millis() < 4400);
    }
}
