//! Typed configuration of a check and the sanity checks run before any evaluation.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::comparator::Comparator;
use crate::error::CheckError;
use crate::ServiceState;

/// How the TSD combines the time series matching the tag filter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Aggregator {
    #[default]
    Sum,
    Avg,
    Min,
    Max,
}

impl FromStr for Aggregator {
    type Err = CheckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sum" => Ok(Aggregator::Sum),
            "avg" => Ok(Aggregator::Avg),
            "min" => Ok(Aggregator::Min),
            "max" => Ok(Aggregator::Max),
            other => Err(CheckError::InvalidConfiguration(format!(
                "Aggregator \"{other}\" not valid."
            ))),
        }
    }
}

impl fmt::Display for Aggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Aggregator::Sum => "sum",
            Aggregator::Avg => "avg",
            Aggregator::Min => "min",
            Aggregator::Max => "max",
        })
    }
}

/// Downsampling the TSD applies over the whole duration, if any.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Downsample {
    #[default]
    None,
    Avg,
    Min,
    Sum,
    Max,
}

impl FromStr for Downsample {
    type Err = CheckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Downsample::None),
            "avg" => Ok(Downsample::Avg),
            "min" => Ok(Downsample::Min),
            "sum" => Ok(Downsample::Sum),
            "max" => Ok(Downsample::Max),
            other => Err(CheckError::InvalidConfiguration(format!(
                "Downsample \"{other}\" not valid."
            ))),
        }
    }
}

impl fmt::Display for Downsample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Downsample::None => "none",
            Downsample::Avg => "avg",
            Downsample::Min => "min",
            Downsample::Sum => "sum",
            Downsample::Max => "max",
        })
    }
}

/// Warning and critical levels together with the relation that decides a hit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ThresholdSpec {
    pub warning: f64,
    pub critical: f64,
    pub comparator: Comparator,
}

impl ThresholdSpec {
    /// At least one of the levels has to be given, the missing one takes the value of the
    /// other. Pairs where the warning level is already "past" the critical one under the
    /// comparator are rejected.
    ///
    /// ```rust
    /// # use tsdcheck::{Comparator, ThresholdSpec};
    /// assert!(ThresholdSpec::new(Some(10.0), Some(5.0), Comparator::Lt).is_ok());
    /// assert!(ThresholdSpec::new(Some(10.0), Some(5.0), Comparator::Gt).is_err());
    /// ```
    pub fn new(
        warning: Option<f64>,
        critical: Option<f64>,
        comparator: Comparator,
    ) -> Result<Self, CheckError> {
        let (warning, critical) = match (warning, critical) {
            (Some(w), Some(c)) => (w, c),
            (Some(w), None) => (w, w),
            (None, Some(c)) => (c, c),
            (None, None) => {
                return Err(CheckError::InvalidConfiguration(
                    "You must specify at least a warning threshold (-w) or a critical threshold (-c)."
                        .to_owned(),
                ))
            }
        };

        if comparator.apply(warning, critical) {
            return Err(CheckError::InvalidConfiguration(
                "Warning/Critical thresholds appear to be inverted.".to_owned(),
            ));
        }

        Ok(ThresholdSpec {
            warning,
            critical,
            comparator,
        })
    }

    /// Critical is tested first, a value hitting both levels is critical.
    pub fn classify(&self, value: f64) -> ServiceState {
        if self.comparator.apply(value, self.critical) {
            ServiceState::Critical
        } else if self.comparator.apply(value, self.warning) {
            ServiceState::Warning
        } else {
            ServiceState::Ok
        }
    }
}

/// The trailing window a recent check looks at.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WindowSpec {
    /// Samples older than this many seconds are ignored.
    pub duration: i64,
    /// Samples this many seconds old or newer are ignored.
    pub ignore_recent: i64,
    /// Fraction in `[0, 1]` of samples that has to be bad before alerting.
    pub percent_over: f64,
    pub no_result_ok: bool,
}

impl WindowSpec {
    pub fn new(duration: i64) -> Self {
        WindowSpec {
            duration,
            ignore_recent: 0,
            percent_over: 0.0,
            no_result_ok: false,
        }
    }

    pub fn with_ignore_recent(mut self, seconds: i64) -> Self {
        self.ignore_recent = seconds;
        self
    }

    pub fn with_percent_over(mut self, fraction: f64) -> Self {
        self.percent_over = fraction;
        self
    }

    pub fn with_no_result_ok(mut self, no_result_ok: bool) -> Self {
        self.no_result_ok = no_result_ok;
        self
    }

    /// Whether a sample of the given age takes part in the evaluation.
    pub fn contains(&self, age: i64) -> bool {
        age <= self.duration && age > self.ignore_recent
    }
}

/// Smallest bucket width in seconds.
pub const MIN_BUCKET_SIZE: i64 = 60;

/// Bucket comparison settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BucketSpec {
    pub size: i64,
    pub buckets_ago: u32,
    /// Reduce buckets to the increase of a counter. The only supported reduction.
    pub rate: bool,
}

impl BucketSpec {
    /// A rate bucket of `size` seconds compared against the one `buckets_ago` buckets back.
    ///
    /// ```rust
    /// # use tsdcheck::BucketSpec;
    /// assert!(BucketSpec::new(300, 1).is_ok());
    /// assert!(BucketSpec::new(0, 1).is_err());
    /// ```
    pub fn new(size: i64, buckets_ago: u32) -> Result<Self, CheckError> {
        let spec = BucketSpec {
            size,
            buckets_ago,
            rate: true,
        };
        spec.validate()?;
        Ok(spec)
    }

    /// Buckets are at least a minute wide and are compared against an earlier one.
    pub fn validate(&self) -> Result<(), CheckError> {
        validate_bucket_size(self.size)?;
        if self.buckets_ago < 1 {
            return Err(CheckError::InvalidConfiguration(
                "--buckets-ago must be 1 or more".to_owned(),
            ));
        }
        Ok(())
    }
}

pub(crate) fn validate_bucket_size(size: i64) -> Result<(), CheckError> {
    if size < MIN_BUCKET_SIZE {
        return Err(CheckError::InvalidConfiguration(
            "--bucket-size must be at least 60 seconds".to_owned(),
        ));
    }
    Ok(())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Recent,
    Bucket,
}

/// Everything a check needs to know, as handed over by the command line.
#[derive(Clone, Debug)]
pub struct CheckConfig {
    pub host: String,
    pub port: u16,
    pub metric: String,
    pub tags: Vec<String>,
    pub rate: bool,
    pub delta: bool,
    pub duration: i64,
    pub downsample: Downsample,
    pub aggregator: Aggregator,
    pub thresholds: ThresholdSpec,
    pub timeout: Duration,
    pub no_result_ok: bool,
    pub ignore_recent: i64,
    /// Percent of bad samples required, `0..=100`.
    pub percent_over: u32,
    /// `0` disables bucket mode.
    pub bucket_size: i64,
    pub buckets_ago: u32,
    pub bucket_abs: bool,
}

impl CheckConfig {
    pub fn new(metric: &str, thresholds: ThresholdSpec) -> Self {
        CheckConfig {
            host: "localhost".to_owned(),
            port: 4242,
            metric: metric.to_owned(),
            tags: Vec::new(),
            rate: false,
            delta: false,
            duration: 600,
            downsample: Downsample::None,
            aggregator: Aggregator::Sum,
            thresholds,
            timeout: Duration::from_secs(10),
            no_result_ok: false,
            ignore_recent: 0,
            percent_over: 0,
            bucket_size: 0,
            buckets_ago: 0,
            bucket_abs: true,
        }
    }

    /// Rejects settings that are out of range or don't go together.
    pub fn validate(&self) -> Result<(), CheckError> {
        let invalid = |msg: &str| Err(CheckError::InvalidConfiguration(msg.to_owned()));

        if self.metric.is_empty() {
            return invalid("You must specify a metric (option -m).");
        }
        if self.duration <= 0 {
            return invalid("Duration must be strictly positive.");
        }
        if self.ignore_recent < 0 {
            return invalid("--ignore-recent must be positive.");
        }
        if self.percent_over > 100 {
            return invalid("--percent-over must be in the range 0..100.");
        }
        if self.bucket_size < 0 || (self.bucket_size > 0 && self.bucket_size < MIN_BUCKET_SIZE) {
            return invalid("--bucket-size must be at least 60 seconds");
        }
        if self.bucket_size > 0 && self.buckets_ago < 1 {
            return invalid("--buckets-ago must be 1 or more");
        }
        if self.delta && self.rate {
            return invalid("--delta must not be combined with --rate");
        }
        if self.delta && self.percent_over > 0 {
            return invalid("--delta must not be combined with --percent-over");
        }
        if self.delta && self.buckets_ago > 0 {
            return invalid("--delta must not be combined with --buckets-ago");
        }
        Ok(())
    }

    pub fn mode(&self) -> Mode {
        if self.bucket_size > 0 {
            Mode::Bucket
        } else {
            Mode::Recent
        }
    }

    pub fn window(&self) -> WindowSpec {
        WindowSpec::new(self.duration)
            .with_ignore_recent(self.ignore_recent)
            .with_percent_over(f64::from(self.percent_over) / 100.0)
            .with_no_result_ok(self.no_result_ok)
    }

    pub fn bucket(&self) -> Option<BucketSpec> {
        match self.mode() {
            Mode::Bucket => Some(BucketSpec {
                size: self.bucket_size,
                buckets_ago: self.buckets_ago,
                rate: self.rate,
            }),
            Mode::Recent => None,
        }
    }

    /// `host:port` of the TSD.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thresholds() -> ThresholdSpec {
        ThresholdSpec::new(Some(5.0), Some(10.0), Comparator::Gt).unwrap()
    }

    fn assert_invalid(config: &CheckConfig, expected: &str) {
        match config.validate() {
            Err(CheckError::InvalidConfiguration(msg)) => assert_eq!(msg, expected),
            other => panic!("expected invalid configuration, got {:?}", other),
        }
    }

    #[test]
    fn test_threshold_spec() {
        let spec = ThresholdSpec::new(Some(5.0), None, Comparator::Gt).unwrap();
        assert_eq!((spec.warning, spec.critical), (5.0, 5.0));

        let spec = ThresholdSpec::new(None, Some(0.0), Comparator::Lt).unwrap();
        assert_eq!((spec.warning, spec.critical), (0.0, 0.0));

        assert!(ThresholdSpec::new(None, None, Comparator::Gt).is_err());
        assert!(ThresholdSpec::new(Some(10.0), Some(5.0), Comparator::Gt).is_err());
        assert!(ThresholdSpec::new(Some(5.0), Some(10.0), Comparator::Lt).is_err());
        assert!(ThresholdSpec::new(Some(10.0), Some(5.0), Comparator::Le).is_ok());
        // Equal levels are fine for strict relations only.
        assert!(ThresholdSpec::new(Some(5.0), Some(5.0), Comparator::Ge).is_err());
    }

    #[test]
    fn test_classify() {
        let spec = thresholds();
        assert_eq!(spec.classify(3.0), ServiceState::Ok);
        assert_eq!(spec.classify(5.0), ServiceState::Ok);
        assert_eq!(spec.classify(7.0), ServiceState::Warning);
        assert_eq!(spec.classify(12.0), ServiceState::Critical);

        let spec = ThresholdSpec::new(Some(10.0), Some(2.0), Comparator::Lt).unwrap();
        assert_eq!(spec.classify(1.0), ServiceState::Critical);
        assert_eq!(spec.classify(5.0), ServiceState::Warning);
        assert_eq!(spec.classify(10.0), ServiceState::Ok);
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("avg".parse::<Aggregator>().unwrap(), Aggregator::Avg);
        assert_eq!("none".parse::<Downsample>().unwrap(), Downsample::None);
        assert_eq!(Downsample::Max.to_string(), "max");
        assert!("none".parse::<Aggregator>().is_err());
        assert!("median".parse::<Downsample>().is_err());
    }

    #[test]
    fn test_validate() {
        let base = CheckConfig::new("proc.loadavg.15min", thresholds());
        assert!(base.validate().is_ok());
        assert_eq!(base.mode(), Mode::Recent);
        assert!(base.bucket().is_none());

        let mut config = base.clone();
        config.metric = String::new();
        assert_invalid(&config, "You must specify a metric (option -m).");

        let mut config = base.clone();
        config.duration = 0;
        assert_invalid(&config, "Duration must be strictly positive.");

        let mut config = base.clone();
        config.percent_over = 101;
        assert_invalid(&config, "--percent-over must be in the range 0..100.");

        let mut config = base.clone();
        config.bucket_size = 30;
        assert_invalid(&config, "--bucket-size must be at least 60 seconds");

        let mut config = base.clone();
        config.bucket_size = 300;
        assert_invalid(&config, "--buckets-ago must be 1 or more");
        config.buckets_ago = 2;
        assert!(config.validate().is_ok());
        assert_eq!(config.mode(), Mode::Bucket);

        let mut config = base.clone();
        config.delta = true;
        config.rate = true;
        assert_invalid(&config, "--delta must not be combined with --rate");

        let mut config = base.clone();
        config.delta = true;
        config.percent_over = 20;
        assert_invalid(&config, "--delta must not be combined with --percent-over");

        let mut config = base.clone();
        config.delta = true;
        config.buckets_ago = 1;
        assert_invalid(&config, "--delta must not be combined with --buckets-ago");
    }

    #[test]
    fn test_bucket_spec() {
        let spec = BucketSpec::new(60, 1).unwrap();
        assert!(spec.rate);

        for (size, buckets_ago) in [(0, 1), (-60, 1), (59, 1), (60, 0)] {
            match BucketSpec::new(size, buckets_ago) {
                Err(CheckError::InvalidConfiguration(_)) => {}
                other => panic!("{}s/{} gave {:?}", size, buckets_ago, other),
            }
        }

        let spec = BucketSpec { size: 0, ..spec };
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_window() {
        let mut config = CheckConfig::new("m", thresholds());
        config.percent_over = 20;
        config.ignore_recent = 30;
        let window = config.window();
        assert_eq!(window.percent_over, 0.2);
        assert!(!window.contains(30));
        assert!(window.contains(31));
        assert!(window.contains(600));
        assert!(!window.contains(601));
    }
}
