//! Verbose output of a check, passed around explicitly instead of living in a global flag.

use crate::Sample;

/// Something noteworthy that happened while evaluating a check.
#[derive(Clone, Debug, PartialEq)]
pub enum Diagnostic {
    /// The time span a bucket was framed on.
    BucketFrame {
        size: i64,
        which: u32,
        now: i64,
        start: i64,
        end: i64,
    },
    /// Both bucket values and the percent change between them.
    BucketChange { now: f64, old: f64, change: f64 },
    /// Samples dropped for falling outside the evaluation window.
    Ignored {
        ignored: usize,
        total: usize,
        duration: i64,
    },
    /// The most extreme sample that violated a threshold.
    Worst(Sample),
    /// Oldest and newest in-window samples used in delta mode, as `(age, value)`.
    DeltaEndpoints { oldest: (i64, f64), newest: (i64, f64) },
    /// A query sent to the TSD and how many samples came back.
    Fetched { query: String, samples: usize },
}

/// Receives diagnostics from the evaluator.
pub trait Diagnostics {
    fn emit(&mut self, event: Diagnostic);
}

/// Discards everything.
impl Diagnostics for () {
    fn emit(&mut self, _event: Diagnostic) {}
}

/// Records everything, mostly useful to inspect a check in tests.
impl Diagnostics for Vec<Diagnostic> {
    fn emit(&mut self, event: Diagnostic) {
        self.push(event)
    }
}

/// Forwards diagnostics to `tracing` at debug level.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn emit(&mut self, event: Diagnostic) {
        match event {
            Diagnostic::BucketFrame {
                size,
                which,
                now,
                start,
                end,
            } => tracing::debug!(size, which, now, start, end, "get_bucket"),
            Diagnostic::BucketChange { now, old, change } => {
                tracing::debug!(now, old, change, "bucket change")
            }
            Diagnostic::Ignored {
                ignored,
                total,
                duration,
            } => tracing::debug!(
                "ignored {}/{} data points for being more than {}s old or too new",
                ignored,
                total,
                duration
            ),
            Diagnostic::Worst(sample) => tracing::debug!(
                value = sample.value,
                ts = sample.timestamp,
                "worst data point"
            ),
            Diagnostic::DeltaEndpoints { oldest, newest } => tracing::debug!(
                "delta: oldest = [{}, {}], newest = [{}, {}]",
                oldest.0,
                oldest.1,
                newest.0,
                newest.1
            ),
            Diagnostic::Fetched { query, samples } => {
                tracing::debug!(%query, samples, "fetched data points")
            }
        }
    }
}
