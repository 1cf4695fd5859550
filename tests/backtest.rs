use std::fs;
use std::path::PathBuf;

use fixture_forecast::backtest::{
    Aggregator, BacktestConfig, BetOutcome, backtest, backtest_parallel, replay_order,
};
use fixture_forecast::predict::{RatingMode, SampleWindow};
use fixture_forecast::records::{MatchRecord, parse_records_json};
use fixture_forecast::stat_kind::StatKind;

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

fn season() -> Vec<MatchRecord> {
    parse_records_json(&read_fixture("season.json")).expect("fixture should parse")
}

fn config(mode: RatingMode) -> BacktestConfig {
    BacktestConfig {
        stat: StatKind::Corners,
        window: SampleWindow::Last(3),
        aggregator: Aggregator::Median,
        mode,
        ..BacktestConfig::default()
    }
}

#[test]
fn replays_only_records_with_the_statistic() {
    let records = season();
    let ordered = replay_order(&records, StatKind::Corners);
    assert_eq!(ordered.len(), 11);
    assert!(ordered.iter().all(|r| r.id.as_deref() != Some("1008")));

    let result = backtest(&records, &config(RatingMode::Raw));
    assert_eq!(result.summary.evaluated + result.summary.skipped, 11);
    assert_eq!(result.summary.evaluated, result.rows.len());
    // The opening fixtures have no history for either side.
    assert!(result.summary.skipped >= 2);
    assert!(result.rows.iter().all(|r| r.predicted_total > 0.0));
}

#[test]
fn summary_is_consistent_with_rows() {
    let result = backtest(&season(), &config(RatingMode::Raw));
    let s = &result.summary;
    let wins = result.rows.iter().filter(|r| r.outcome == BetOutcome::Win).count();
    let losses = result.rows.iter().filter(|r| r.outcome == BetOutcome::Loss).count();
    assert_eq!((s.wins, s.losses, s.no_bets), (wins, losses, 0));
    assert_eq!(s.active_bets, wins + losses);
    let err: f64 = result.rows.iter().map(|r| r.abs_diff).sum::<f64>() / s.active_bets as f64;
    assert!((s.avg_error - err).abs() < 1e-12);
    assert_eq!(s.win_diff, s.wins as i64 - s.benchmark_wins as i64);
    assert_eq!(s.benchmark_wins + s.benchmark_losses, s.active_bets);
    for row in &result.rows {
        assert_eq!(row.line.fract().abs(), 0.5);
        assert_eq!(row.outcome == BetOutcome::Win, row.actual_total > row.line);
    }
}

#[test]
fn prefixes_reproduce_earlier_rows() {
    let ordered = replay_order(&season(), StatKind::Corners);
    let cfg = config(RatingMode::Adjusted);
    let full = backtest(&ordered, &cfg);
    for cut in 1..=ordered.len() {
        let partial = backtest(&ordered[..cut], &cfg);
        let n = partial.rows.len();
        assert_eq!(partial.rows[..], full.rows[..n]);
    }
}

#[test]
fn parallel_is_identical_to_sequential() {
    let records = season();
    for mode in [RatingMode::Raw, RatingMode::Adjusted] {
        for aggregator in [Aggregator::Mean, Aggregator::Median] {
            let cfg = BacktestConfig {
                aggregator,
                buffer: 0.5,
                cap: Some(10.5),
                min_prediction: Some(9.0),
                ..config(mode)
            };
            assert_eq!(backtest(&records, &cfg), backtest_parallel(&records, &cfg));
        }
    }
}

#[test]
fn gate_and_cap_apply_to_season() {
    let cfg = BacktestConfig {
        cap: Some(9.5),
        min_prediction: Some(10.0),
        ..config(RatingMode::Raw)
    };
    let result = backtest(&season(), &cfg);
    for row in &result.rows {
        assert!(row.line <= 9.5);
        assert!(row.benchmark_line <= 9.5);
        if row.predicted_total < 10.0 {
            assert_eq!(row.outcome, BetOutcome::NoBet);
            assert_eq!(row.benchmark_outcome, BetOutcome::NoBet);
        } else {
            assert_ne!(row.outcome, BetOutcome::NoBet);
        }
    }
    let no_bets = result.rows.iter().filter(|r| r.outcome == BetOutcome::NoBet).count();
    assert_eq!(result.summary.no_bets, no_bets);
    assert_eq!(result.summary.active_bets + no_bets, result.rows.len());
}
