use rand::Rng;
use std::time::Duration;

/// Randomized delay before retry `attempt`
///
/// Drawn uniformly from `[base, base * 2 * attempt)`. The range grows without
/// a cap; the retry limit bounds how far it gets. Attempt 0 is the first try
/// and never waits.
pub fn retry_delay(base: Duration, attempt: u32) -> Duration {
    retry_delay_with(&mut rand::rng(), base, attempt)
}

/// [`retry_delay`] with a caller-supplied random source
pub fn retry_delay_with<R: Rng>(rng: &mut R, base: Duration, attempt: u32) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let upper = attempt
        .checked_mul(2)
        .and_then(|factor| base.checked_mul(factor))
        .unwrap_or(Duration::MAX);

    if upper <= base {
        return base;
    }

    rng.random_range(base..upper)
}
