use anyhow::Context;

use tsdcheck::tsd::parse_ascii;
use tsdcheck::{run_check, CheckConfig, Comparator, Diagnostic, Runner, ThresholdSpec};

// Usage: cargo run --example offline_check
//
// Evaluates a canned TSD answer instead of querying a live TSD.

const NOW: i64 = 1_288_900_600;

// Two of five samples are bad, the single critical one alone doesn't cross 20%.
const ANSWER: &str = "\
proc.loadavg.15min 1288900060 2.5 host=web01
proc.loadavg.15min 1288900180 4 host=web01
proc.loadavg.15min 1288900300 6.5 host=web01
proc.loadavg.15min 1288900420 11 host=web01
proc.loadavg.15min 1288900540 3 host=web01
";

fn main() -> anyhow::Result<()> {
    let samples = parse_ascii(ANSWER).context("canned answer should parse")?;

    let thresholds = ThresholdSpec::new(Some(5.0), Some(10.0), Comparator::Gt)?;
    let mut config = CheckConfig::new("proc.loadavg.15min", thresholds);
    config.tags.push("host=web01".to_owned());
    config.percent_over = 20;

    let mut diagnostics: Vec<Diagnostic> = Vec::new();
    let result =
        Runner::for_check().safe_run(|| run_check(&config, &samples, NOW, &mut diagnostics));
    for diagnostic in &diagnostics {
        eprintln!("{:?}", diagnostic);
    }
    result.print_and_exit()
}
