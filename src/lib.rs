//! The tsdcheck crate decides whether recent samples of a TSD metric warrant a warning or a
//! critical alert and renders the result the way nagios and icinga expect it.
//!
//! There are two ways of looking at the data:
//!
//! * a *recent* check scans the samples of a trailing window and alerts when enough of them
//!   cross a threshold, or compares the newest sample to the oldest one in delta mode;
//! * a *bucket* check reduces a counter to its increase over the last full bucket and
//!   compares it to the increase some buckets ago.
//!
//! ```rust
//! use tsdcheck::{evaluate_window, Comparator, Sample, ServiceState, ThresholdSpec, WindowSpec};
//!
//! let thresholds = ThresholdSpec::new(Some(5.0), Some(10.0), Comparator::Gt).unwrap();
//! let window = WindowSpec::new(600);
//! let samples = [Sample::new(900, 3.0), Sample::new(960, 12.0)];
//!
//! let verdict = evaluate_window(&samples, &window, &thresholds, false, 1000, "load", &mut ());
//! assert_eq!(verdict.unwrap().state(), ServiceState::Critical);
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::process;

#[macro_use]
mod macros;

mod bucket;
pub mod check;
mod comparator;
pub mod config;
pub mod diagnostics;
mod error;
#[cfg(feature = "clap")]
pub mod icinga;
mod runner;
mod sample;
pub mod tsd;
mod window;

pub use crate::bucket::{bucket_bounds, compare_buckets, resolve_bucket};
pub use crate::check::run_check;
pub use crate::comparator::Comparator;
pub use crate::config::{
    Aggregator, BucketSpec, CheckConfig, Downsample, Mode, ThresholdSpec, WindowSpec,
};
pub use crate::diagnostics::{Diagnostic, Diagnostics, TracingDiagnostics};
pub use crate::error::{CheckError, FetchError};
pub use crate::runner::{Runner, RunnerResult};
pub use crate::sample::{interpolate, Sample};
pub use crate::window::evaluate_window;

/// Represents a service state from nagios.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServiceState {
    Ok,
    Warning,
    Critical,
    Unknown,
}

impl ServiceState {
    /// Returns the corresponding nagios exit code to signal the service state of self.
    pub fn exit_code(&self) -> i32 {
        match self {
            ServiceState::Ok => 0,
            ServiceState::Warning => 1,
            ServiceState::Critical => 2,
            ServiceState::Unknown => 3,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            ServiceState::Unknown => 0,
            ServiceState::Ok => 1,
            ServiceState::Warning => 2,
            ServiceState::Critical => 3,
        }
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ServiceState::Ok => "OK",
            ServiceState::Warning => "WARNING",
            ServiceState::Critical => "CRITICAL",
            ServiceState::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

impl PartialOrd for ServiceState {
    fn partial_cmp(&self, other: &ServiceState) -> Option<Ordering> {
        Some(self.rank().cmp(&other.rank()))
    }
}

/// Custom performance data representation without going through `ToString`.
pub trait ToPerfString {
    fn to_perf_string(&self) -> String;
}

impl_to_perf_string_on_display!(i64, f64);

impl<T> ToPerfString for Option<T>
where
    T: ToPerfString,
{
    fn to_perf_string(&self) -> String {
        match self {
            Some(ref s) => s.to_perf_string(),
            None => String::new(),
        }
    }
}

/// A single performance data entry attached to a verdict.
#[derive(Clone, Debug, PartialEq)]
pub struct PerfData {
    label: String,
    value: f64,
    warning: Option<f64>,
    critical: Option<f64>,
}

impl PerfData {
    pub fn new(label: &str, value: f64) -> Self {
        PerfData {
            label: label.to_owned(),
            value,
            warning: None,
            critical: None,
        }
    }

    pub fn with_thresholds(mut self, warning: f64, critical: f64) -> Self {
        self.warning = Some(warning);
        self.critical = Some(critical);
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn value(&self) -> f64 {
        self.value
    }
}

impl ToPerfString for PerfData {
    fn to_perf_string(&self) -> String {
        let label = self.label.replace('=', "_").replace('\'', "''");
        let label = if label.contains(' ') {
            format!("'{}'", label)
        } else {
            label
        };

        perf_string!(label, self.value, self.warning, self.critical)
    }
}

/// The outcome of one evaluation: a state, a human readable explanation and optionally the
/// number the state was derived from.
///
/// ```rust
/// # use tsdcheck::{PerfData, ServiceState, Verdict};
/// let verdict = Verdict::new(ServiceState::Warning, "delta is gt 5: currently 7 over 600 seconds")
///     .with_perf(PerfData::new("delta", 7.0).with_thresholds(5.0, 10.0));
/// assert_eq!(
///     &verdict.to_nagios_string(),
///     "WARNING: delta is gt 5: currently 7 over 600 seconds | delta=7;5;10"
/// );
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Verdict {
    state: ServiceState,
    message: String,
    perf: Option<PerfData>,
}

impl Verdict {
    pub fn new(state: ServiceState, message: impl Into<String>) -> Self {
        Verdict {
            state,
            message: message.into(),
            perf: None,
        }
    }

    pub fn with_perf(mut self, perf: PerfData) -> Self {
        self.perf = Some(perf);
        self
    }

    /// The verdict for a query that left nothing to look at.
    pub fn no_data(no_result_ok: bool) -> Self {
        if no_result_ok {
            Verdict::new(
                ServiceState::Ok,
                "query did not return any data point (--no-result-ok)",
            )
        } else {
            Verdict::new(ServiceState::Critical, "query did not return any data point")
        }
    }

    pub fn state(&self) -> ServiceState {
        self.state
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn perf(&self) -> Option<&PerfData> {
        self.perf.as_ref()
    }

    pub fn exit_code(&self) -> i32 {
        self.state.exit_code()
    }

    /// Returns the single line nagios reads the service state from.
    pub fn to_nagios_string(&self) -> String {
        let mut s = format!("{}: {}", self.state, self.message);
        if let Some(ref perf) = self.perf {
            s.push_str(" | ");
            s.push_str(&perf.to_perf_string());
        }
        s
    }

    /// Prints Self::to_nagios_string and exits with the exit code of the state.
    pub fn print_and_exit(&self) -> ! {
        println!("{}", self.to_nagios_string());
        process::exit(self.exit_code());
    }
}

#[cfg(test)]
mod tests {
    use crate::{PerfData, ServiceState, ToPerfString, Verdict};

    #[test]
    fn test_state() {
        assert_eq!(ServiceState::Ok.exit_code(), 0);
        assert_eq!(ServiceState::Warning.exit_code(), 1);
        assert_eq!(ServiceState::Critical.exit_code(), 2);
        assert_eq!(ServiceState::Unknown.exit_code(), 3);

        assert_eq!(&ServiceState::Ok.to_string(), "OK");
        assert_eq!(&ServiceState::Warning.to_string(), "WARNING");
        assert_eq!(&ServiceState::Critical.to_string(), "CRITICAL");
        assert_eq!(&ServiceState::Unknown.to_string(), "UNKNOWN");

        assert!(ServiceState::Critical > ServiceState::Warning);
        assert!(ServiceState::Warning > ServiceState::Ok);
        assert!(ServiceState::Ok > ServiceState::Unknown);
    }

    #[test]
    fn test_perf_data_labels() {
        let test_data = [
            ("test", "test=0"),
            ("test=a", "test_a=0"),
            ("te'st", "te''st=0"),
            ("te st", "'te st'=0"),
        ];
        for (label, expected) in &test_data {
            assert_eq!(&PerfData::new(label, 0.0).to_perf_string(), expected);
        }

        let perf = PerfData::new("change", -12.5).with_thresholds(10.0, 20.0);
        assert_eq!(&perf.to_perf_string(), "change=-12.5;10;20");
    }

    #[test]
    fn test_verdict() {
        let verdict = Verdict::new(ServiceState::Ok, "sum:foo: 3 values OK, last=1");
        assert_eq!(&verdict.to_nagios_string(), "OK: sum:foo: 3 values OK, last=1");
        assert_eq!(verdict.exit_code(), 0);
        assert!(verdict.perf().is_none());

        let verdict = Verdict::no_data(true);
        assert_eq!(verdict.state(), ServiceState::Ok);
        assert_eq!(
            verdict.message(),
            "query did not return any data point (--no-result-ok)"
        );

        let verdict = Verdict::no_data(false);
        assert_eq!(
            &verdict.to_nagios_string(),
            "CRITICAL: query did not return any data point"
        );
    }
}
