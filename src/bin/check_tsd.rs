//! check_tsd: nagios/icinga check alerting on data points stored in a TSD.
//!
//! ```plain
//! $ check_tsd -m proc.loadavg.15min -t host=web01 -w 5 -c 10
//! ```
//!
//! looks at the last ten minutes of `proc.loadavg.15min` for `host=web01` and alerts if *any*
//! data point crosses a threshold. To only alert once 20% of the data points are over the
//! line, add `-P 20`.

use chrono::Utc;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use tsdcheck::tsd::TsdClient;
use tsdcheck::{
    icinga, run_check, Aggregator, CheckConfig, CheckError, Comparator, Downsample, Runner,
    ThresholdSpec, TracingDiagnostics,
};

/// Generate alerts from the data points stored in a TSD.
#[derive(Parser, Debug)]
#[command(name = "check_tsd", version, about)]
struct Args {
    /// Hostname to use to connect to the TSD.
    #[arg(short = 'H', long, default_value = "localhost")]
    host: String,
    /// Port to connect to the TSD instance on.
    #[arg(short, long, default_value_t = 4242)]
    port: u16,
    /// Metric to query.
    #[arg(short, long)]
    metric: Option<String>,
    /// Parse metric as a rate value.
    #[arg(short, long)]
    rate: bool,
    /// Alert on the difference between the newest and the oldest data point.
    #[arg(short = 'L', long)]
    delta: bool,
    /// Tags to filter the metric on.
    #[arg(short = 't', long = "tag", value_name = "TAG")]
    tags: Vec<String>,
    /// How far back to look for data, in seconds.
    #[arg(short, long, default_value_t = 600, allow_negative_numbers = true)]
    duration: i64,
    /// Downsample the data over the duration via avg, min, sum, or max.
    #[arg(short = 'D', long, default_value = "none")]
    downsample: String,
    /// Aggregation method: avg, min, sum, max.
    #[arg(short, long, default_value = "sum")]
    aggregator: String,
    /// Comparison method for -w/-c: gt, ge, lt, le, eq, ne.
    #[arg(short = 'x', long = "method", default_value = "gt")]
    comparator: String,
    /// Threshold for warning. Uses the comparison method.
    #[arg(short, long, allow_negative_numbers = true)]
    warning: Option<f64>,
    /// Threshold for critical. Uses the comparison method.
    #[arg(short, long, allow_negative_numbers = true)]
    critical: Option<f64>,
    /// Be more verbose.
    #[arg(short, long)]
    verbose: bool,
    /// How long to wait for the response from the TSD, in seconds.
    #[arg(short = 'T', long, default_value_t = 10)]
    timeout: u64,
    /// Return OK when the TSD query returns no result.
    #[arg(short = 'E', long)]
    no_result_ok: bool,
    /// Ignore data points that are more recent than this many seconds.
    #[arg(short = 'I', long, default_value_t = 0, allow_negative_numbers = true)]
    ignore_recent: i64,
    /// Only alarm if PERCENT of the data points violate the threshold.
    #[arg(short = 'P', long, default_value_t = 0, value_name = "PERCENT")]
    percent_over: u32,
    /// How many seconds of data to consider for bucket comparisons.
    #[arg(short, long, default_value_t = 0)]
    bucket_size: i64,
    /// How many buckets back to compare against the current bucket.
    #[arg(short = 'o', long, default_value_t = 0)]
    buckets_ago: u32,
    /// Compare the signed bucket change instead of its absolute value.
    #[arg(short = 'Z', long)]
    bucket_no_abs: bool,
}

impl Args {
    fn to_config(&self) -> Result<CheckConfig, CheckError> {
        let comparator: Comparator = self.comparator.parse()?;
        let downsample: Downsample = self.downsample.parse()?;
        let aggregator: Aggregator = self.aggregator.parse()?;
        let thresholds = ThresholdSpec::new(self.warning, self.critical, comparator)?;

        let mut config = CheckConfig::new(self.metric.as_deref().unwrap_or_default(), thresholds);
        config.host = self.host.clone();
        config.port = self.port;
        config.tags = self.tags.clone();
        config.rate = self.rate;
        config.delta = self.delta;
        config.duration = self.duration;
        config.downsample = downsample;
        config.aggregator = aggregator;
        config.timeout = std::time::Duration::from_secs(self.timeout);
        config.no_result_ok = self.no_result_ok;
        config.ignore_recent = self.ignore_recent;
        config.percent_over = self.percent_over;
        config.bucket_size = self.bucket_size;
        config.buckets_ago = self.buckets_ago;
        config.bucket_abs = !self.bucket_no_abs;

        config.validate()?;
        Ok(config)
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    if let Err(e) = icinga::print_if_env_and_exit("tsd", &Args::command()) {
        println!("UNKNOWN: {}", e);
        std::process::exit(3);
    }

    let args = Args::parse();
    init_logging(args.verbose);

    let config = match args.to_config() {
        Ok(config) => config,
        Err(CheckError::InvalidConfiguration(msg)) => {
            Args::command().error(ErrorKind::ValueValidation, msg).exit()
        }
        Err(e) => Args::command().error(ErrorKind::ValueValidation, e).exit(),
    };

    let now = Utc::now().timestamp();
    Runner::for_check()
        .safe_run(|| {
            let client = TsdClient::new(&config.address(), config.timeout)?;
            run_check(&config, &client, now, &mut TracingDiagnostics)
        })
        .print_and_exit()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tsdcheck::Mode;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = parse(&["check_tsd", "-m", "proc.loadavg.15min", "-w", "5"])
            .to_config()
            .unwrap();
        assert_eq!(config.address(), "localhost:4242");
        assert_eq!(config.duration, 600);
        assert_eq!(config.aggregator, Aggregator::Sum);
        assert_eq!(config.downsample, Downsample::None);
        assert_eq!(config.thresholds.warning, 5.0);
        assert_eq!(config.thresholds.critical, 5.0);
        assert_eq!(config.thresholds.comparator, Comparator::Gt);
        assert!(config.bucket_abs);
        assert_eq!(config.mode(), Mode::Recent);
    }

    #[test]
    fn test_full_command_line() {
        let args = parse(&[
            "check_tsd", "-H", "tsd01", "-p", "4343", "-m", "http.hits", "-r", "-t", "host=web01",
            "-t", "dc=east", "-x", "lt", "-w", "-5", "-c", "-10", "-b", "300", "-o", "2", "-Z",
            "-T", "3",
        ]);
        let config = args.to_config().unwrap();
        assert_eq!(config.address(), "tsd01:4343");
        assert_eq!(config.tags, vec!["host=web01", "dc=east"]);
        assert_eq!(config.thresholds.critical, -10.0);
        assert_eq!(config.mode(), Mode::Bucket);
        assert_eq!(config.buckets_ago, 2);
        assert!(!config.bucket_abs);
        assert_eq!(config.timeout, std::time::Duration::from_secs(3));
    }

    #[test]
    fn test_invalid_command_lines() {
        let cases: &[&[&str]] = &[
            &["check_tsd", "-m", "m", "-w", "5", "-x", "gte"],
            &["check_tsd", "-m", "m", "-w", "5", "-D", "median"],
            &["check_tsd", "-m", "m"],
            &["check_tsd", "-w", "5"],
            &["check_tsd", "-m", "m", "-w", "10", "-c", "5"],
            &["check_tsd", "-m", "m", "-w", "5", "-L", "-P", "10"],
            &["check_tsd", "-m", "m", "-w", "5", "-b", "30", "-o", "1"],
            &["check_tsd", "-m", "m", "-w", "5", "-I", "-1"],
        ];
        for argv in cases {
            let err = parse(argv).to_config().unwrap_err();
            assert!(
                matches!(err, CheckError::InvalidConfiguration(_)),
                "{:?} gave {:?}",
                argv,
                err
            );
        }
    }

    #[test]
    fn test_icinga_definition() {
        let cmd = icinga::CheckCommand::from_command("tsd", &Args::command()).unwrap();
        let out = cmd.render("/usr/lib/nagios/plugins/check_tsd");
        assert!(out.contains("\"--percent-over\" = {\n      value = \"$tsd_percent_over$\""));
        assert!(out.contains("\"--no-result-ok\" = {\n      set_if = \"$tsd_no_result_ok$\""));
        assert!(out.contains("vars.tsd_duration = \"600\""));
    }
}
