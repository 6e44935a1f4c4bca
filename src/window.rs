use chrono::DateTime;

use crate::config::{ThresholdSpec, WindowSpec};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::CheckError;
use crate::sample::Sample;
use crate::{PerfData, ServiceState, Verdict};

/// Judges the samples that fall into the trailing window.
///
/// In delta mode only the oldest and the newest sample in the window matter. Otherwise every
/// sample is classified on its own and the share of bad samples has to exceed
/// `window.percent_over` before the check alerts.
///
/// The `last=` value of an OK verdict is the last sample of the window in input order.
/// Samples dropped as too recent are never reported there.
pub fn evaluate_window(
    samples: &[Sample],
    window: &WindowSpec,
    thresholds: &ThresholdSpec,
    delta: bool,
    now: i64,
    metric: &str,
    diagnostics: &mut impl Diagnostics,
) -> Result<Verdict, CheckError> {
    let in_window = match filter(samples, window, now, diagnostics) {
        Ok(in_window) => in_window,
        Err(CheckError::NoData) => return Ok(Verdict::no_data(window.no_result_ok)),
        Err(e) => return Err(e),
    };

    if delta {
        evaluate_delta(&in_window, window, thresholds, metric, diagnostics)
    } else {
        evaluate_proportion(&in_window, window, thresholds, metric, diagnostics)
    }
}

/// A sample that survived filtering, along with its age.
struct Aged<'a> {
    age: i64,
    sample: &'a Sample,
}

fn filter<'a>(
    samples: &'a [Sample],
    window: &WindowSpec,
    now: i64,
    diagnostics: &mut impl Diagnostics,
) -> Result<Vec<Aged<'a>>, CheckError> {
    let in_window: Vec<Aged<'a>> = samples
        .iter()
        .map(|sample| Aged {
            age: sample.age(now),
            sample,
        })
        .filter(|aged| window.contains(aged.age))
        .collect();

    if in_window.len() != samples.len() {
        diagnostics.emit(Diagnostic::Ignored {
            ignored: samples.len() - in_window.len(),
            total: samples.len(),
            duration: window.duration,
        });
    }

    if in_window.is_empty() {
        return Err(CheckError::NoData);
    }
    Ok(in_window)
}

fn evaluate_delta(
    in_window: &[Aged<'_>],
    window: &WindowSpec,
    thresholds: &ThresholdSpec,
    metric: &str,
    diagnostics: &mut impl Diagnostics,
) -> Result<Verdict, CheckError> {
    let mut oldest: Option<&Aged<'_>> = None;
    let mut newest: Option<&Aged<'_>> = None;
    for aged in in_window {
        if oldest.map_or(true, |o| aged.age > o.age) {
            oldest = Some(aged);
        }
        if newest.map_or(true, |n| aged.age < n.age) {
            newest = Some(aged);
        }
    }

    let (oldest, newest) = oldest.zip(newest).ok_or_else(|| {
        CheckError::InsufficientData("not enough data to compute the delta".to_owned())
    })?;
    diagnostics.emit(Diagnostic::DeltaEndpoints {
        oldest: (oldest.age, oldest.sample.value),
        newest: (newest.age, newest.sample.value),
    });

    // Negative deltas are kept, they are how restarts show up.
    let delta = newest.sample.value - oldest.sample.value;
    let state = thresholds.classify(delta);
    let message = match state {
        ServiceState::Critical | ServiceState::Warning => format!(
            "{} delta is {} {}: currently {} over {} seconds",
            metric,
            thresholds.comparator,
            threshold_for(state, thresholds),
            delta,
            window.duration
        ),
        _ => format!(
            "{} delta is currently {} over {} seconds",
            metric, delta, window.duration
        ),
    };

    Ok(Verdict::new(state, message).with_perf(
        PerfData::new("delta", delta).with_thresholds(thresholds.warning, thresholds.critical),
    ))
}

fn evaluate_proportion(
    in_window: &[Aged<'_>],
    window: &WindowSpec,
    thresholds: &ThresholdSpec,
    metric: &str,
    diagnostics: &mut impl Diagnostics,
) -> Result<Verdict, CheckError> {
    let total = in_window.len();
    let mut critical = 0usize;
    let mut warning = 0usize;
    let mut worst: Option<&Sample> = None;

    for aged in in_window {
        let sample = aged.sample;
        match thresholds.classify(sample.value) {
            ServiceState::Critical => critical += 1,
            ServiceState::Warning => warning += 1,
            _ => continue,
        }
        if worst.map_or(true, |w| thresholds.comparator.apply(sample.value, w.value)) {
            worst = Some(sample);
        }
    }

    if let Some(worst) = worst {
        diagnostics.emit(Diagnostic::Worst(*worst));
    }

    // Criticals also count towards the warning share: on their own they may not cross
    // percent_over, which downgrades the check to a warning.
    let warning = warning + critical;
    let over = |count: usize| count > 0 && count as f64 / total as f64 > window.percent_over;
    let (state, bad) = if over(critical) {
        (ServiceState::Critical, critical)
    } else if over(warning) {
        (ServiceState::Warning, warning)
    } else {
        (ServiceState::Ok, 0)
    };

    if state == ServiceState::Ok {
        let last = in_window[total - 1].sample.value;
        let message = format!("{}: {} values OK, last={}", metric, total, last);
        return Ok(Verdict::new(state, message).with_perf(
            PerfData::new("last", last).with_thresholds(thresholds.warning, thresholds.critical),
        ));
    }

    let worst = worst.ok_or_else(|| {
        CheckError::InsufficientData("no bad data point to report".to_owned())
    })?;
    let message = format!(
        "{} {} {}: {}/{} bad values ({:.1}%) worst: {} @ {}",
        metric,
        thresholds.comparator,
        threshold_for(state, thresholds),
        bad,
        total,
        bad as f64 * 100.0 / total as f64,
        worst.value,
        format_timestamp(worst.timestamp)
    );

    Ok(Verdict::new(state, message).with_perf(
        PerfData::new("worst", worst.value)
            .with_thresholds(thresholds.warning, thresholds.critical),
    ))
}

fn threshold_for(state: ServiceState, thresholds: &ThresholdSpec) -> f64 {
    match state {
        ServiceState::Critical => thresholds.critical,
        _ => thresholds.warning,
    }
}

/// Renders a timestamp like `asctime`, in UTC.
fn format_timestamp(timestamp: i64) -> String {
    DateTime::from_timestamp(timestamp, 0)
        .map(|dt| dt.format("%a %b %e %H:%M:%S %Y").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}
