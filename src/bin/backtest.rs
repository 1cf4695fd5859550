use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};

use fixture_forecast::backtest::{self, BetOutcome};
use fixture_forecast::config::ForecastConfig;
use fixture_forecast::export;
use fixture_forecast::predict::{RatingMode, SampleScope, SampleWindow};
use fixture_forecast::records::load_records;

const RECENT_ROWS: usize = 15;

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    fixture_forecast::init_logging();

    let data_path = parse_path_arg("--data")
        .or_else(|| std::env::var("FORECAST_DATA").ok().map(PathBuf::from))
        .context("no match data: pass --data <file> or set FORECAST_DATA")?;
    let mut config = match parse_path_arg("--config")
        .or_else(|| std::env::var("FORECAST_CONFIG").ok().map(PathBuf::from))
    {
        Some(path) => ForecastConfig::load(&path)?,
        None => ForecastConfig::default(),
    };

    if let Some(raw) = parse_string_arg("--stat") {
        config.stat = raw.parse()?;
    }
    if let Some(raw) = parse_string_arg("--window") {
        config.window = SampleWindow::parse_lenient(&raw);
    }
    if let Some(raw) = parse_string_arg("--aggregator") {
        config.aggregator = raw.parse()?;
    }
    if let Some(v) = parse_f64_arg("--buffer") {
        config.buffer = v;
    }
    if let Some(v) = parse_f64_arg("--cap") {
        config.cap = Some(v);
    }
    if let Some(v) = parse_f64_arg("--min-pred") {
        config.min_prediction = Some(v);
    }
    if has_flag("--adjusted") {
        config.mode = RatingMode::Adjusted;
    }
    if has_flag("--general") {
        config.scope = SampleScope::General;
    }

    let records = load_records(&data_path)?;
    if records.is_empty() {
        return Err(anyhow!("no records in {}", data_path.display()));
    }

    let bt_config = config.backtest_config();
    let result = if has_flag("--parallel") {
        backtest::backtest_parallel(&records, &bt_config)
    } else {
        backtest::backtest(&records, &bt_config)
    };

    if let Some(path) = parse_path_arg("--xlsx") {
        let report = export::write_backtest_workbook(&path, &result)?;
        eprintln!("Wrote {} rows to {}", report.rows, path.display());
    }
    if let Some(path) = parse_path_arg("--json-out") {
        export::write_json(&path, &result)?;
        eprintln!("Wrote {}", path.display());
    }

    if has_flag("--json") {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    let s = &result.summary;
    println!("Walk-forward backtest");
    println!("Data: {}", data_path.display());
    println!(
        "Stat: {}  window={}  aggregator={:?}  mode={:?}  scope={:?}  buffer={:.2}  cap={}  min_pred={}",
        bt_config.stat.label(),
        bt_config.window,
        bt_config.aggregator,
        bt_config.mode,
        bt_config.scope,
        bt_config.buffer,
        opt_to_string(bt_config.cap),
        opt_to_string(bt_config.min_prediction)
    );
    println!();
    println!(
        "evaluated={} skipped={} active={} no_bet={}",
        s.evaluated, s.skipped, s.active_bets, s.no_bets
    );
    println!(
        "model     wins={} ({:.1}%) losses={} avg_err={:.3} win_margin={:.3} loss_margin={:.3}",
        s.wins,
        s.win_rate() * 100.0,
        s.losses,
        s.avg_error,
        s.win_margin,
        s.loss_margin
    );
    println!(
        "benchmark wins={} ({:.1}%) losses={}",
        s.benchmark_wins,
        s.benchmark_win_rate() * 100.0,
        s.benchmark_losses
    );
    println!("win_diff={:+}", s.win_diff);

    println!();
    println!("Most recent:");
    for row in result.newest_first().take(RECENT_ROWS) {
        let mark = match row.outcome {
            BetOutcome::Win => "W",
            BetOutcome::Loss => "L",
            BetOutcome::NoBet => "-",
        };
        println!(
            "{mark} {:<14} {} vs {}  pred {:.2}  line {}{}  actual {}  bench {}",
            export::round_label(&row.round),
            row.home,
            row.away,
            row.predicted_total,
            row.line,
            if row.capped { "*" } else { "" },
            row.actual_total,
            row.benchmark_line
        );
    }

    Ok(())
}

fn opt_to_string<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

fn parse_string_arg(name: &str) -> Option<String> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&format!("{name}=")) {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
            && !next.starts_with("--")
        {
            return Some(next.trim().to_string());
        }
    }
    None
}

fn parse_path_arg(name: &str) -> Option<PathBuf> {
    parse_string_arg(name).map(PathBuf::from)
}

fn parse_f64_arg(name: &str) -> Option<f64> {
    parse_string_arg(name).and_then(|raw| raw.parse::<f64>().ok())
}

fn has_flag(name: &str) -> bool {
    std::env::args().skip(1).any(|arg| arg == name)
}
