use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use serde::Serialize;

use fixture_forecast::aggregate::{Aggregates, aggregate};
use fixture_forecast::config::ForecastConfig;
use fixture_forecast::distribution::{
    self, DEFAULT_MAX_GOALS, OutcomeProbs, ProbabilityTable, SimulationSummary,
};
use fixture_forecast::insights::{self, DistributionView, LineSide};
use fixture_forecast::league::league_average_total;
use fixture_forecast::predict::{
    Confidence, Prediction, RatingMode, SampleScope, SampleWindow, predict_scoped,
};
use fixture_forecast::records::{MatchRecord, load_fixtures, load_records};
use fixture_forecast::stat_kind::{LineScope, StatKind};

const TABLE_SPAN: u32 = 4;
const USAGE: &str = "usage: fixture_forecast --data <records.json> [--config <file>] [--stat <key>] \
[--window <n|all>] [--adjusted] [--general] [--json]
  --home <team> --away <team>       prediction, Poisson table and simulation
  --trends                          league trends
  --fixtures <file> [--hot-count <n>]  safest and hot upcoming fixtures
  --distribution <total|home|away>  histogram of the statistic
  --hit-rate <over|under> [--threshold <x>] [--scope <total|individual>]";

#[derive(Serialize)]
struct MatchupReport<'a> {
    home: &'a str,
    away: &'a str,
    stat: StatKind,
    prediction: &'a Prediction,
    confidence: Confidence,
    line: f64,
    over_probability: f64,
    outcomes: OutcomeProbs,
    table: ProbabilityTable,
    simulation: SimulationSummary,
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    fixture_forecast::init_logging();

    if has_flag("--help") || has_flag("-h") {
        println!("{USAGE}");
        return Ok(());
    }

    let data_path = parse_path_arg("--data")
        .or_else(|| std::env::var("FORECAST_DATA").ok().map(PathBuf::from))
        .context("no match data: pass --data <file> or set FORECAST_DATA")?;
    let config_path = parse_path_arg("--config")
        .or_else(|| std::env::var("FORECAST_CONFIG").ok().map(PathBuf::from));
    let mut config = match config_path {
        Some(path) => ForecastConfig::load(&path)?,
        None => ForecastConfig::default(),
    };
    apply_overrides(&mut config)?;

    let records = load_records(&data_path)?;
    let aggregates = aggregate(&records, config.stat);
    let json = has_flag("--json");

    if let (Some(home), Some(away)) = (parse_string_arg("--home"), parse_string_arg("--away")) {
        return report_matchup(&home, &away, &aggregates, &config, json);
    }
    if has_flag("--trends") {
        return report_trends(&aggregates, &config, json);
    }
    if let Some(path) = parse_path_arg("--fixtures") {
        let league_average = league_average_total(&records, config.stat);
        return report_fixtures(&path, &aggregates, league_average, &config, json);
    }
    if let Some(raw) = parse_string_arg("--distribution") {
        let view: DistributionView = raw.parse()?;
        return report_distribution(&records, view, &config, json);
    }
    if let Some(raw) = parse_string_arg("--hit-rate") {
        let side: LineSide = raw.parse()?;
        return report_hit_rates(&records, side, &config, json);
    }

    println!("{USAGE}");
    Ok(())
}

fn apply_overrides(config: &mut ForecastConfig) -> Result<()> {
    if let Some(raw) = parse_string_arg("--stat") {
        config.stat = raw.parse()?;
    }
    if let Some(raw) = parse_string_arg("--window") {
        config.window = SampleWindow::parse_lenient(&raw);
    }
    if has_flag("--adjusted") {
        config.mode = RatingMode::Adjusted;
    }
    if has_flag("--general") {
        config.scope = SampleScope::General;
    }
    if let Some(n) = parse_usize_arg("--hot-count") {
        config.hot_count = n;
    }
    if let Some(n) = parse_usize_arg("--iterations") {
        config.iterations = n;
    }
    if let Some(seed) = parse_usize_arg("--seed") {
        config.seed = Some(seed as u64);
    }
    Ok(())
}

fn report_matchup(
    home: &str,
    away: &str,
    aggregates: &Aggregates,
    config: &ForecastConfig,
    json: bool,
) -> Result<()> {
    let prediction =
        predict_scoped(home, away, aggregates, config.window, config.mode, config.scope)
            .ok_or_else(|| anyhow!("insufficient data for {home} vs {away}"))?;
    let confidence = prediction.confidence(config.stat);
    let line = config.stat.line_preset(LineScope::Total).default;
    let upper = config
        .table_upper_bound
        .unwrap_or_else(|| distribution::default_upper_bound(prediction.total));
    let table = distribution::probability_table(prediction.total, upper);
    let simulation = distribution::monte_carlo(
        prediction.exp_home,
        prediction.exp_away,
        config.iterations,
        config.seed,
    );
    let report = MatchupReport {
        home,
        away,
        stat: config.stat,
        prediction: &prediction,
        confidence,
        line,
        over_probability: distribution::poisson_over(line, prediction.total),
        outcomes: distribution::outcome_probs(
            prediction.exp_home,
            prediction.exp_away,
            DEFAULT_MAX_GOALS.max(upper),
        ),
        table,
        simulation,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{home} vs {away} ({})", config.stat.label());
    println!(
        "Expected: {:.2} - {:.2} (total {:.2}, std {:.2}, confidence {})",
        prediction.exp_home,
        prediction.exp_away,
        prediction.total,
        prediction.total_std,
        confidence.label()
    );
    println!(
        "Components: hFor={:.2} hAg={:.2} aFor={:.2} aAg={:.2} ({} home / {} away matches)",
        prediction.h_for,
        prediction.h_ag,
        prediction.a_for,
        prediction.a_ag,
        prediction.home_matches.len(),
        prediction.away_matches.len()
    );
    println!(
        "1X2: {:.1}% / {:.1}% / {:.1}%",
        report.outcomes.home * 100.0,
        report.outcomes.draw * 100.0,
        report.outcomes.away * 100.0
    );
    println!();
    println!("  k      pmf      cdf     over");
    let centre = line.floor() as u32;
    let lo = centre.saturating_sub(TABLE_SPAN);
    for row in report
        .table
        .rows
        .iter()
        .filter(|r| r.k >= lo && r.k <= centre + TABLE_SPAN)
    {
        println!("{:>3} {:>8.4} {:>8.4} {:>8.4}", row.k, row.pmf, row.cdf, row.over);
    }
    println!();
    println!(
        "Over {line}: poisson {:.1}%, simulated {:.1}% ({} iterations, mean total {:.2})",
        report.over_probability * 100.0,
        report.simulation.prob_over(line) * 100.0,
        report.simulation.iterations,
        report.simulation.mean_total
    );
    Ok(())
}

fn report_trends(aggregates: &Aggregates, config: &ForecastConfig, json: bool) -> Result<()> {
    let trends = insights::league_trends(aggregates, config.window);
    if json {
        println!("{}", serde_json::to_string_pretty(&trends)?);
        return Ok(());
    }
    println!(
        "League trends: {} (window {})",
        config.stat.label(),
        config.window
    );
    for t in &trends {
        println!(
            "{:<24} home {:>6.2} -> {:>6.2} {:<8} away {:>6.2} -> {:>6.2} {:<8}",
            t.team,
            t.home.season,
            t.home.recent,
            t.home_label.label(),
            t.away.season,
            t.away.recent,
            t.away_label.label()
        );
    }
    Ok(())
}

fn report_fixtures(
    path: &std::path::Path,
    aggregates: &Aggregates,
    league_average: f64,
    config: &ForecastConfig,
    json: bool,
) -> Result<()> {
    let fixtures = load_fixtures(path)?;
    let safest = insights::rank_safest(
        &fixtures,
        aggregates,
        config.stat,
        config.window,
        config.mode,
        config.scope,
    );
    let hot = insights::hot_fixtures(
        &fixtures,
        aggregates,
        league_average,
        config.stat,
        config.window,
        config.mode,
        config.hot_count,
    );

    if json {
        let value = serde_json::json!({ "safest": safest, "hot": hot });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("Safest fixtures ({}):", config.stat.label());
    for (idx, r) in safest.iter().enumerate() {
        println!(
            "{:>2}. {} vs {}  total {:.2}  std {:.2}  {}",
            idx + 1,
            r.fixture.home,
            r.fixture.away,
            r.prediction.total,
            r.prediction.total_std,
            r.confidence.label()
        );
    }
    println!();
    println!(
        "Next matchday by expected total (hot above {:.2}):",
        league_average * insights::HOT_FACTOR
    );
    for f in &hot {
        println!(
            "{} {} vs {}  total {:.2}",
            if f.hot { "*" } else { " " },
            f.fixture.home,
            f.fixture.away,
            f.prediction.total
        );
    }
    Ok(())
}

fn report_distribution(
    records: &[MatchRecord],
    view: DistributionView,
    config: &ForecastConfig,
    json: bool,
) -> Result<()> {
    let dist = insights::stat_distribution(records, config.stat, view);
    if json {
        println!("{}", serde_json::to_string_pretty(&dist)?);
        return Ok(());
    }
    println!(
        "{} ({:?}): {} matches, mean {:.2}, median {:.1}",
        config.stat.label(),
        view,
        dist.samples,
        dist.mean,
        dist.median
    );
    let max = dist.max_count().max(1);
    for bin in &dist.bins {
        let bar = "#".repeat(bin.count * 40 / max);
        println!("{:>4} {:>5} {:>5.1}% {bar}", bin.value, bin.count, bin.percentage);
    }
    Ok(())
}

fn report_hit_rates(
    records: &[MatchRecord],
    side: LineSide,
    config: &ForecastConfig,
    json: bool,
) -> Result<()> {
    let scope: LineScope = match parse_string_arg("--scope") {
        Some(raw) => raw.parse()?,
        None => LineScope::Total,
    };
    let threshold = parse_f64_arg("--threshold")
        .unwrap_or_else(|| config.stat.line_preset(scope).default);
    let ranked =
        insights::hit_rates(records, config.stat, config.window, scope, side, threshold);
    if json {
        println!("{}", serde_json::to_string_pretty(&ranked)?);
        return Ok(());
    }
    println!(
        "{} {:?} {threshold} ({:?}, window {})",
        config.stat.label(),
        side,
        scope,
        config.window
    );
    for (idx, r) in ranked.iter().enumerate() {
        println!(
            "{:>2}. {:<24} {:>2}/{:<2} {:>5.1}%",
            idx + 1,
            r.team,
            r.hits,
            r.games,
            r.rate * 100.0
        );
    }
    Ok(())
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

fn parse_usize_arg(name: &str) -> Option<usize> {
    parse_string_arg(name).and_then(|raw| raw.parse::<usize>().ok())
}

fn has_flag(name: &str) -> bool {
    std::env::args().skip(1).any(|arg| arg == name)
}
