//! Runs a whole check: validate the configuration, fetch what is needed and evaluate it.

use crate::bucket::{bucket_bounds, compare_buckets, ensure_rate, resolve_bucket};
use crate::config::{BucketSpec, CheckConfig, Downsample};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::CheckError;
use crate::sample::Sample;
use crate::tsd::{Query, SampleSource};
use crate::window::evaluate_window;
use crate::Verdict;

/// Evaluates `config` against the data `source` returns, as seen at `now`.
///
/// Configuration errors are reported before anything is fetched.
pub fn run_check(
    config: &CheckConfig,
    source: &impl SampleSource,
    now: i64,
    diagnostics: &mut impl Diagnostics,
) -> Result<Verdict, CheckError> {
    config.validate()?;

    match config.bucket() {
        Some(spec) => bucket_check(config, &spec, source, now, diagnostics),
        None => recent_check(config, source, now, diagnostics),
    }
}

/// Compares the most recent full bucket against the one `buckets_ago` buckets before it.
fn bucket_check(
    config: &CheckConfig,
    spec: &BucketSpec,
    source: &impl SampleSource,
    now: i64,
    diagnostics: &mut impl Diagnostics,
) -> Result<Verdict, CheckError> {
    if config.downsample != Downsample::None {
        return Err(CheckError::UnsupportedMode(
            "downsampling not supported with bucket checks".to_owned(),
        ));
    }
    ensure_rate(spec)?;

    let mut bucket = |which: u32| -> Result<f64, CheckError> {
        let (start, end) = bucket_bounds(spec.size, which, now)?;
        let samples = fetch(source, &Query::bucket(config, start, end), diagnostics)?;
        resolve_bucket(&samples, spec, which, now, diagnostics)
    };
    let bucket_now = bucket(0)?;
    let bucket_old = bucket(spec.buckets_ago)?;

    let metric = Query::bucket_metric(config).replace('|', ":");
    compare_buckets(
        bucket_now,
        bucket_old,
        &config.thresholds,
        config.bucket_abs,
        &metric,
        diagnostics,
    )
}

/// Looks at the samples of the last `duration` seconds.
fn recent_check(
    config: &CheckConfig,
    source: &impl SampleSource,
    now: i64,
    diagnostics: &mut impl Diagnostics,
) -> Result<Verdict, CheckError> {
    let query = Query::recent(config);
    let samples = fetch(source, &query, diagnostics)?;

    evaluate_window(
        &samples,
        &config.window(),
        &config.thresholds,
        config.delta,
        now,
        &query.display_metric(),
        diagnostics,
    )
}

fn fetch(
    source: &impl SampleSource,
    query: &Query,
    diagnostics: &mut impl Diagnostics,
) -> Result<Vec<Sample>, CheckError> {
    let samples = source.fetch(query)?;
    diagnostics.emit(Diagnostic::Fetched {
        query: query.path(),
        samples: samples.len(),
    });
    Ok(samples)
}
