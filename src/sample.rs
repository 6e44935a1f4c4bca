/// A single data point returned by the TSD: seconds since epoch and the value at that time.
///
/// Values are `f64`, so integer counters beyond 2^53 lose precision.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    pub timestamp: i64,
    pub value: f64,
}

impl Sample {
    pub fn new(timestamp: i64, value: f64) -> Self {
        Sample { timestamp, value }
    }

    /// Seconds between this sample and `now`. Samples from the future have a negative age.
    ///
    /// Saturates for timestamps too far off to be represented, which keeps them out of any
    /// window.
    pub fn age(&self, now: i64) -> i64 {
        now.saturating_sub(self.timestamp)
    }
}

impl From<(i64, f64)> for Sample {
    fn from((timestamp, value): (i64, f64)) -> Self {
        Sample::new(timestamp, value)
    }
}

/// Estimates the value at `at` from two samples that bracket it.
///
/// A decreasing pair is taken to mean the counter was reset somewhere in between. Where it
/// reset can't be told from two points, so the estimate is `0`.
///
/// The samples must have distinct timestamps.
pub fn interpolate(before: &Sample, after: &Sample, at: i64) -> f64 {
    if after.value < before.value {
        return 0.0;
    }
    let span = (i128::from(after.timestamp) - i128::from(before.timestamp)) as f64;
    let offset = (i128::from(at) - i128::from(before.timestamp)) as f64;
    before.value + (after.value - before.value) / span * offset
}
