use crate::config::{validate_bucket_size, BucketSpec, ThresholdSpec};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::CheckError;
use crate::sample::{interpolate, Sample};
use crate::{PerfData, ServiceState, Verdict};

/// Returns the inclusive `(start, end)` timestamps of the bucket `which` buckets before the
/// most recently finished one.
///
/// Buckets narrower than a minute are rejected.
///
/// ```rust
/// # use tsdcheck::bucket_bounds;
/// assert_eq!(bucket_bounds(60, 0, 1000).unwrap(), (900, 959));
/// assert_eq!(bucket_bounds(60, 2, 1000).unwrap(), (780, 839));
/// assert!(bucket_bounds(0, 0, 1000).is_err());
/// ```
pub fn bucket_bounds(size: i64, which: u32, now: i64) -> Result<(i64, i64), CheckError> {
    validate_bucket_size(size)?;

    let end = now - now.rem_euclid(size);
    let start = end
        .saturating_sub(size)
        .saturating_sub(i64::from(which).saturating_mul(size));
    Ok((start, start.saturating_add(size - 1)))
}

/// Reduces the samples to the increase of the counter across one bucket.
///
/// The bucket has to be framed by data on both sides: a sample before it, one at each end
/// of its inside and one after it. The values at the exact bucket edges are interpolated
/// from those. If the counter went backwards inside the bucket, the increase up to the
/// highest value seen is added to what was counted after the reset.
pub fn resolve_bucket(
    samples: &[Sample],
    spec: &BucketSpec,
    which: u32,
    now: i64,
    diagnostics: &mut impl Diagnostics,
) -> Result<f64, CheckError> {
    spec.validate()?;
    ensure_rate(spec)?;

    let (start, end) = bucket_bounds(spec.size, which, now)?;
    diagnostics.emit(Diagnostic::BucketFrame {
        size: spec.size,
        which,
        now,
        start,
        end,
    });

    let mut left: Option<&Sample> = None;
    let mut first: Option<&Sample> = None;
    let mut last: Option<&Sample> = None;
    let mut right: Option<&Sample> = None;
    let mut highest: Option<f64> = None;

    for sample in samples {
        let ts = sample.timestamp;
        if highest.map_or(true, |h| sample.value > h) {
            highest = Some(sample.value);
        }

        if ts < start {
            if left.map_or(true, |s| ts > s.timestamp) {
                left = Some(sample);
            }
        } else if ts > end {
            if right.map_or(true, |s| ts < s.timestamp) {
                right = Some(sample);
            }
        } else {
            if first.map_or(true, |s| ts < s.timestamp) {
                first = Some(sample);
            }
            if last.map_or(true, |s| ts > s.timestamp) {
                last = Some(sample);
            }
        }
    }

    let (left, first, last, right, highest) = match (left, first, last, right, highest) {
        (Some(l), Some(f), Some(la), Some(r), Some(h)) => (l, f, la, r, h),
        _ => {
            return Err(CheckError::InsufficientData(
                "not enough data to frame the requested bucket".to_owned(),
            ))
        }
    };

    let start_value = interpolate(left, first, start);
    let end_value = interpolate(last, right, end);

    if end_value < start_value {
        Ok((highest - start_value) + end_value)
    } else {
        Ok(end_value - start_value)
    }
}

/// Buckets can only be reduced to the increase of a counter.
pub(crate) fn ensure_rate(spec: &BucketSpec) -> Result<(), CheckError> {
    if spec.rate {
        Ok(())
    } else {
        Err(CheckError::UnsupportedMode(
            "sorry, buckets only work with rates right now".to_owned(),
        ))
    }
}

/// Compares the current bucket against an older one by their percent change.
pub fn compare_buckets(
    bucket_now: f64,
    bucket_old: f64,
    thresholds: &ThresholdSpec,
    use_absolute_change: bool,
    metric: &str,
    diagnostics: &mut impl Diagnostics,
) -> Result<Verdict, CheckError> {
    if bucket_old == 0.0 {
        return Err(CheckError::DivisionUndefined);
    }

    let change = ((bucket_now / bucket_old) - 1.0) * 100.0;
    diagnostics.emit(Diagnostic::BucketChange {
        now: bucket_now,
        old: bucket_old,
        change,
    });

    let compared = if use_absolute_change {
        change.abs()
    } else {
        change
    };

    let state = thresholds.classify(compared);
    let message = match state {
        ServiceState::Critical => format!(
            "{} {} {}: bucket changed {:.2}%",
            metric, thresholds.comparator, thresholds.critical, change
        ),
        ServiceState::Warning => format!(
            "{} {} {}: bucket changed {:.2}%",
            metric, thresholds.comparator, thresholds.warning, change
        ),
        _ => format!("{}: bucket changed {:.2}%", metric, change),
    };

    Ok(Verdict::new(state, message).with_perf(
        PerfData::new("change", change).with_thresholds(thresholds.warning, thresholds.critical),
    ))
}
