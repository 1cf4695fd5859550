use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};
use serde::Serialize;

use crate::backtest::{BacktestResult, BacktestRow};
use crate::records::RoundKey;

pub struct ExportReport {
    pub rows: usize,
    pub summary_rows: usize,
}

/// Workbook with a `Summary` sheet and a `Rows` sheet (newest first).
pub fn write_backtest_workbook(path: &Path, result: &BacktestResult) -> Result<ExportReport> {
    let summary_rows = summary_rows(result);

    let mut rows = vec![vec![
        "Step".to_string(),
        "Round".to_string(),
        "Home".to_string(),
        "Away".to_string(),
        "Exp Home".to_string(),
        "Exp Away".to_string(),
        "Predicted".to_string(),
        "Std".to_string(),
        "Actual".to_string(),
        "Diff".to_string(),
        "Line".to_string(),
        "Capped".to_string(),
        "Outcome".to_string(),
        "Benchmark".to_string(),
        "Benchmark Line".to_string(),
        "Benchmark Outcome".to_string(),
    ]];
    rows.extend(result.newest_first().map(backtest_row));

    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Summary")?;
        write_rows(sheet, &summary_rows)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Rows")?;
        write_rows(sheet, &rows)?;
    }

    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;

    Ok(ExportReport {
        rows: rows.len().saturating_sub(1),
        summary_rows: summary_rows.len().saturating_sub(1),
    })
}

/// Pretty JSON of any report shape.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("serialize report")?;
    fs::write(path, json).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

pub fn round_label(round: &RoundKey) -> String {
    match round.date {
        Some(date) => format!("{date} (md {})", round.matchday),
        None => format!("md {}", round.matchday),
    }
}

fn summary_rows(result: &BacktestResult) -> Vec<Vec<String>> {
    let cfg = &result.config;
    let s = &result.summary;
    let pair = |k: &str, v: String| vec![k.to_string(), v];
    vec![
        pair("Metric", "Value".to_string()),
        pair("Statistic", cfg.stat.label().to_string()),
        pair("Window", cfg.window.to_string()),
        pair("Aggregator", format!("{:?}", cfg.aggregator)),
        pair("Mode", format!("{:?}", cfg.mode)),
        pair("Scope", format!("{:?}", cfg.scope)),
        pair("Buffer", format!("{:.2}", cfg.buffer)),
        pair("Cap", opt_to_string(cfg.cap)),
        pair("Min Prediction", opt_to_string(cfg.min_prediction)),
        pair("Evaluated", s.evaluated.to_string()),
        pair("Skipped", s.skipped.to_string()),
        pair("Active Bets", s.active_bets.to_string()),
        pair("Avg Error", format!("{:.3}", s.avg_error)),
        pair("Wins", s.wins.to_string()),
        pair("Losses", s.losses.to_string()),
        pair("No Bets", s.no_bets.to_string()),
        pair("Win Rate", format!("{:.1}%", s.win_rate() * 100.0)),
        pair("Win Margin", format!("{:.3}", s.win_margin)),
        pair("Loss Margin", format!("{:.3}", s.loss_margin)),
        pair("Benchmark Wins", s.benchmark_wins.to_string()),
        pair("Benchmark Losses", s.benchmark_losses.to_string()),
        pair("Win Diff", format!("{:+}", s.win_diff)),
    ]
}

fn backtest_row(row: &BacktestRow) -> Vec<String> {
    vec![
        row.step.to_string(),
        round_label(&row.round),
        row.home.clone(),
        row.away.clone(),
        format!("{:.2}", row.exp_home),
        format!("{:.2}", row.exp_away),
        format!("{:.2}", row.predicted_total),
        format!("{:.2}", row.total_std),
        format!("{}", row.actual_total),
        format!("{:+.2}", row.diff),
        format!("{}", row.line),
        if row.capped {
            "yes".to_string()
        } else {
            "no".to_string()
        },
        row.outcome.label().to_string(),
        format!("{:.2}", row.benchmark_estimate),
        format!("{}", row.benchmark_line),
        row.benchmark_outcome.label().to_string(),
    ]
}

fn opt_to_string<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<String>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            worksheet
                .write_string(row_idx as u32, col_idx as u16, value)
                .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backtest::{BacktestConfig, backtest};
    use crate::predict::SampleWindow;
    use crate::records::MatchRecord;
    use crate::stat_kind::StatKind;

    fn result() -> BacktestResult {
        let records: Vec<MatchRecord> = (1..=4)
            .map(|d| {
                MatchRecord::new("A", "B", RoundKey::matchday(d))
                    .with_stat(StatKind::Corners, 4.0 + d as f64, 3.0)
            })
            .collect();
        let cfg = BacktestConfig {
            window: SampleWindow::All,
            cap: Some(10.5),
            ..BacktestConfig::default()
        };
        backtest(&records, &cfg)
    }

    #[test]
    fn summary_lists_config_and_counts() {
        let rows = summary_rows(&result());
        assert_eq!(rows[0], vec!["Metric".to_string(), "Value".to_string()]);
        assert!(rows.iter().all(|r| r.len() == 2));
        let cap = rows.iter().find(|r| r[0] == "Cap").unwrap();
        assert_eq!(cap[1], "10.5");
        let evaluated = rows.iter().find(|r| r[0] == "Evaluated").unwrap();
        assert_eq!(evaluated[1], "3");
    }

    #[test]
    fn workbook_is_written() {
        let path = std::env::temp_dir().join(format!("fixture_forecast_{}.xlsx", std::process::id()));
        let report = write_backtest_workbook(&path, &result()).unwrap();
        assert_eq!(report.rows, 3);
        assert!(path.exists());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn round_labels() {
        assert_eq!(round_label(&RoundKey::matchday(7)), "md 7");
        let date = chrono::NaiveDate::from_ymd_opt(2024, 9, 1).unwrap();
        assert_eq!(round_label(&RoundKey::dated(date, 3)), "2024-09-01 (md 3)");
    }
}
