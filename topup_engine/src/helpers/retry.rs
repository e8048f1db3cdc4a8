use std::time::Duration;

use backon::ExponentialBuilder;

/// Backoff for ledger transactions that lost a race with a concurrent writer.
///
/// - Min delay: 10ms
/// - Max delay: 1s
/// - Jitter enabled
pub fn conflict_backoff(max_retries: usize) -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(10))
        .with_max_delay(Duration::from_secs(1))
        .with_max_times(max_retries)
        .with_jitter()
}
