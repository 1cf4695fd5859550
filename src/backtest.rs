//! Walk-forward evaluation of the over/under line policy.
//!
//! Records are replayed oldest first. The prediction for step `i` is built
//! from `records[..i]` only, and compared with a naive rolling mean/median of
//! past totals run under the same line policy.

use std::str::FromStr;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::aggregate::aggregate;
use crate::error::ParseError;
use crate::predict::{RatingMode, SampleScope, SampleWindow, predict_scoped};
use crate::records::{MatchRecord, RoundKey, TeamId, sort_chronological};
use crate::series::{mean, median};
use crate::stat_kind::StatKind;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregator {
    Mean,
    #[default]
    Median,
}

impl Aggregator {
    pub fn apply(self, values: &[f64]) -> f64 {
        match self {
            Aggregator::Mean => mean(values),
            Aggregator::Median => median(values),
        }
    }
}

impl FromStr for Aggregator {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mean" | "avg" | "average" => Ok(Aggregator::Mean),
            "median" => Ok(Aggregator::Median),
            _ => Err(ParseError::UnknownAggregator(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    pub stat: StatKind,
    pub window: SampleWindow,
    pub aggregator: Aggregator,
    /// Subtracted from every estimate before the line is drawn.
    pub buffer: f64,
    pub cap: Option<f64>,
    /// Model estimates below this are not bet.
    pub min_prediction: Option<f64>,
    pub mode: RatingMode,
    pub scope: SampleScope,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            stat: StatKind::Corners,
            window: SampleWindow::default(),
            aggregator: Aggregator::default(),
            buffer: 0.0,
            cap: None,
            min_prediction: None,
            mode: RatingMode::Raw,
            scope: SampleScope::Venue,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BetOutcome {
    Win,
    Loss,
    NoBet,
}

impl BetOutcome {
    pub fn label(self) -> &'static str {
        match self {
            BetOutcome::Win => "win",
            BetOutcome::Loss => "loss",
            BetOutcome::NoBet => "no bet",
        }
    }
}

/// Half-integer over line for `estimate`: `floor(estimate - buffer) - 0.5`,
/// clamped to `cap`. The flag reports whether the cap applied.
pub fn betting_line(estimate: f64, buffer: f64, cap: Option<f64>) -> (f64, bool) {
    let line = (estimate - buffer).floor() - 0.5;
    match cap {
        Some(cap) if line > cap => (cap, true),
        _ => (line, false),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestRow {
    /// Position in the chronological replay.
    pub step: usize,
    pub id: Option<String>,
    pub home: TeamId,
    pub away: TeamId,
    pub round: RoundKey,
    pub exp_home: f64,
    pub exp_away: f64,
    pub predicted_total: f64,
    pub total_std: f64,
    pub actual_home: f64,
    pub actual_away: f64,
    pub actual_total: f64,
    pub diff: f64,
    pub abs_diff: f64,
    pub line: f64,
    pub capped: bool,
    pub outcome: BetOutcome,
    pub benchmark_estimate: f64,
    pub benchmark_line: f64,
    pub benchmark_outcome: BetOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BacktestSummary {
    pub evaluated: usize,
    pub skipped: usize,
    pub active_bets: usize,
    pub avg_error: f64,
    pub wins: usize,
    pub losses: usize,
    pub no_bets: usize,
    pub win_margin: f64,
    pub loss_margin: f64,
    pub benchmark_wins: usize,
    pub benchmark_losses: usize,
    pub win_diff: i64,
}

impl BacktestSummary {
    pub fn win_rate(&self) -> f64 {
        rate(self.wins, self.active_bets)
    }

    pub fn benchmark_win_rate(&self) -> f64 {
        rate(self.benchmark_wins, self.active_bets)
    }
}

fn rate(n: usize, of: usize) -> f64 {
    if of == 0 { 0.0 } else { n as f64 / of as f64 }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestResult {
    pub config: BacktestConfig,
    /// Oldest first.
    pub rows: Vec<BacktestRow>,
    pub summary: BacktestSummary,
}

impl BacktestResult {
    pub fn newest_first(&self) -> impl Iterator<Item = &BacktestRow> {
        self.rows.iter().rev()
    }
}

/// Chronological replay order for `config.stat`: records lacking the
/// statistic are dropped, the rest sorted oldest first.
pub fn replay_order(records: &[MatchRecord], stat: StatKind) -> Vec<MatchRecord> {
    let usable: Vec<MatchRecord> = records
        .iter()
        .filter(|r| r.has_stat(stat))
        .cloned()
        .collect();
    sort_chronological(&usable)
}

/// Scores `target` using nothing but `history`. `None` when the model has no
/// usable prediction for the pairing.
pub fn evaluate_step(
    step: usize,
    history: &[MatchRecord],
    target: &MatchRecord,
    config: &BacktestConfig,
) -> Option<BacktestRow> {
    let aggregates = aggregate(history, config.stat);
    let prediction = predict_scoped(
        &target.home,
        &target.away,
        &aggregates,
        config.window,
        config.mode,
        config.scope,
    )?;
    if prediction.total <= 0.0 {
        return None;
    }

    let actual = target.stat_or_zero(config.stat);
    let actual_total = actual.total();
    let diff = actual_total - prediction.total;

    let (line, capped) = betting_line(prediction.total, config.buffer, config.cap);
    let no_bet = config
        .min_prediction
        .is_some_and(|min| prediction.total < min);
    let settle = |line: f64| {
        if no_bet {
            BetOutcome::NoBet
        } else if actual_total > line {
            BetOutcome::Win
        } else {
            BetOutcome::Loss
        }
    };

    let past_totals: Vec<f64> = history
        .iter()
        .map(|r| r.stat_or_zero(config.stat).total())
        .collect();
    let benchmark_estimate = config.aggregator.apply(&past_totals);
    let (benchmark_line, _) = betting_line(benchmark_estimate, config.buffer, config.cap);

    Some(BacktestRow {
        step,
        id: target.id.clone(),
        home: target.home.clone(),
        away: target.away.clone(),
        round: target.round,
        exp_home: prediction.exp_home,
        exp_away: prediction.exp_away,
        predicted_total: prediction.total,
        total_std: prediction.total_std,
        actual_home: actual.home,
        actual_away: actual.away,
        actual_total,
        diff,
        abs_diff: diff.abs(),
        line,
        capped,
        outcome: settle(line),
        benchmark_estimate,
        benchmark_line,
        benchmark_outcome: settle(benchmark_line),
    })
}

pub fn backtest(records: &[MatchRecord], config: &BacktestConfig) -> BacktestResult {
    let ordered = replay_order(records, config.stat);
    let steps: Vec<Option<BacktestRow>> = (0..ordered.len())
        .map(|i| evaluate_step(i, &ordered[..i], &ordered[i], config))
        .collect();
    finish(config, steps)
}

/// Same result as [`backtest`], with steps spread across the rayon pool. Each
/// step still reads only its own prefix.
pub fn backtest_parallel(records: &[MatchRecord], config: &BacktestConfig) -> BacktestResult {
    let ordered = replay_order(records, config.stat);
    let steps: Vec<Option<BacktestRow>> = (0..ordered.len())
        .into_par_iter()
        .map(|i| evaluate_step(i, &ordered[..i], &ordered[i], config))
        .collect();
    finish(config, steps)
}

fn finish(config: &BacktestConfig, steps: Vec<Option<BacktestRow>>) -> BacktestResult {
    let skipped = steps.iter().filter(|s| s.is_none()).count();
    let rows: Vec<BacktestRow> = steps.into_iter().flatten().collect();
    let summary = summarize(&rows, skipped);
    info!(
        stat = config.stat.key(),
        evaluated = summary.evaluated,
        skipped = summary.skipped,
        wins = summary.wins,
        losses = summary.losses,
        no_bets = summary.no_bets,
        "backtest finished"
    );
    BacktestResult {
        config: *config,
        rows,
        summary,
    }
}

pub fn summarize(rows: &[BacktestRow], skipped: usize) -> BacktestSummary {
    let mut s = BacktestSummary {
        evaluated: rows.len(),
        skipped,
        ..BacktestSummary::default()
    };
    let mut error_sum = 0.0;
    let mut win_sum = 0.0;
    let mut loss_sum = 0.0;

    for row in rows {
        match row.outcome {
            BetOutcome::NoBet => {
                s.no_bets += 1;
                continue;
            }
            BetOutcome::Win => {
                s.wins += 1;
                win_sum += row.diff;
            }
            BetOutcome::Loss => {
                s.losses += 1;
                loss_sum += row.abs_diff;
            }
        }
        s.active_bets += 1;
        error_sum += row.abs_diff;
        match row.benchmark_outcome {
            BetOutcome::Win => s.benchmark_wins += 1,
            BetOutcome::Loss => s.benchmark_losses += 1,
            BetOutcome::NoBet => {}
        }
    }

    let per = |sum: f64, n: usize| if n > 0 { sum / n as f64 } else { 0.0 };
    s.avg_error = per(error_sum, s.active_bets);
    s.win_margin = per(win_sum, s.wins);
    s.loss_margin = per(loss_sum, s.losses);
    s.win_diff = s.wins as i64 - s.benchmark_wins as i64;
    s
}
