use chrono::{DateTime, TimeZone};
use rand::Rng;
use std::time::Duration;

/// Prefix of every results file name
pub const RESULTS_FILE_PREFIX: &str = "webscavanger_results";

/// Uniformly random delay between `min_ms` and `max_ms` inclusive.
/// A reversed range is treated as its swap.
pub fn random_delay(min_ms: u64, max_ms: u64) -> Duration {
    let (low, high) = if min_ms <= max_ms {
        (min_ms, max_ms)
    } else {
        (max_ms, min_ms)
    };
    if low == high {
        return Duration::from_millis(low);
    }
    Duration::from_millis(rand::thread_rng().gen_range(low..=high))
}

/// Timestamped results file name, e.g. `webscavanger_results_20240131_235959.json`
pub fn results_filename<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("{}_{}.json", RESULTS_FILE_PREFIX, at.format("%Y%m%d_%H%M%S"))
}
