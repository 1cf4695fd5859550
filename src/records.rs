use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::stat_kind::StatKind;

pub type TeamId = String;

/// Chronological position of a fixture. Ordered by date first, then matchday;
/// records without a date sort before dated ones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RoundKey {
    pub date: Option<NaiveDate>,
    pub matchday: i64,
}

impl RoundKey {
    pub fn matchday(matchday: i64) -> Self {
        Self {
            date: None,
            matchday,
        }
    }

    pub fn dated(date: NaiveDate, matchday: i64) -> Self {
        Self {
            date: Some(date),
            matchday,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StatPair {
    #[serde(default, deserialize_with = "de_lenient_f64")]
    pub home: f64,
    #[serde(default, deserialize_with = "de_lenient_f64")]
    pub away: f64,
}

impl StatPair {
    pub fn new(home: f64, away: f64) -> Self {
        Self { home, away }
    }

    pub fn total(&self) -> f64 {
        self.home + self.away
    }
}

/// One played fixture as delivered by the data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawRecord")]
pub struct MatchRecord {
    pub id: Option<String>,
    pub league: Option<String>,
    pub home: TeamId,
    pub away: TeamId,
    pub round: RoundKey,
    pub stats: HashMap<String, StatPair>,
    pub tldr: Option<String>,
    pub summary: Option<String>,
}

impl MatchRecord {
    pub fn new(home: impl Into<TeamId>, away: impl Into<TeamId>, round: RoundKey) -> Self {
        Self {
            id: None,
            league: None,
            home: home.into(),
            away: away.into(),
            round,
            stats: HashMap::new(),
            tldr: None,
            summary: None,
        }
    }

    pub fn with_stat(mut self, kind: StatKind, home: f64, away: f64) -> Self {
        self.stats
            .insert(kind.key().to_string(), StatPair::new(home, away));
        self
    }

    /// Looks the statistic up under any of its accepted keys. Cards fall back
    /// to yellow + red when no combined entry exists.
    pub fn stat(&self, kind: StatKind) -> Option<StatPair> {
        let found = kind
            .aliases()
            .iter()
            .find_map(|alias| self.stats.get(*alias).copied());
        if found.is_some() || kind != StatKind::Cards {
            return found;
        }
        let yellow = self.stat(StatKind::YellowCards);
        let red = self.stat(StatKind::RedCards);
        if yellow.is_none() && red.is_none() {
            return None;
        }
        let yellow = yellow.unwrap_or_default();
        let red = red.unwrap_or_default();
        Some(StatPair::new(yellow.home + red.home, yellow.away + red.away))
    }

    /// Missing statistics read as zero on both sides.
    pub fn stat_or_zero(&self, kind: StatKind) -> StatPair {
        self.stat(kind).unwrap_or_default()
    }

    pub fn has_stat(&self, kind: StatKind) -> bool {
        self.stat(kind).is_some()
    }
}

/// An upcoming fixture, not yet played.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawFixture")]
pub struct Fixture {
    pub id: Option<String>,
    pub league: Option<String>,
    pub home: TeamId,
    pub away: TeamId,
    pub round: RoundKey,
}

impl Fixture {
    pub fn new(home: impl Into<TeamId>, away: impl Into<TeamId>, round: RoundKey) -> Self {
        Self {
            id: None,
            league: None,
            home: home.into(),
            away: away.into(),
            round,
        }
    }
}

#[derive(Deserialize)]
struct RawRecord {
    #[serde(default)]
    id: Value,
    #[serde(default)]
    league: Option<String>,
    #[serde(alias = "home_team")]
    home: String,
    #[serde(alias = "away_team")]
    away: String,
    #[serde(default, alias = "giornata", alias = "round")]
    matchday: Value,
    #[serde(default, alias = "match_date")]
    date: Value,
    #[serde(default)]
    stats: HashMap<String, StatPair>,
    #[serde(default)]
    tldr: Option<String>,
    #[serde(default, alias = "detailed_summary")]
    summary: Option<String>,
}

impl From<RawRecord> for MatchRecord {
    fn from(raw: RawRecord) -> Self {
        Self {
            id: value_to_id(&raw.id),
            league: raw.league.filter(|s| !s.trim().is_empty()),
            home: raw.home.trim().to_string(),
            away: raw.away.trim().to_string(),
            round: RoundKey {
                date: value_to_date(&raw.date),
                matchday: value_to_matchday(&raw.matchday),
            },
            stats: raw.stats,
            tldr: raw.tldr.filter(|s| !s.trim().is_empty()),
            summary: raw.summary.filter(|s| !s.trim().is_empty()),
        }
    }
}

#[derive(Deserialize)]
struct RawFixture {
    #[serde(default)]
    id: Value,
    #[serde(default)]
    league: Option<String>,
    #[serde(alias = "home_team")]
    home: String,
    #[serde(alias = "away_team")]
    away: String,
    #[serde(default, alias = "giornata", alias = "round")]
    matchday: Value,
    #[serde(default, alias = "match_date")]
    date: Value,
}

impl From<RawFixture> for Fixture {
    fn from(raw: RawFixture) -> Self {
        Self {
            id: value_to_id(&raw.id),
            league: raw.league.filter(|s| !s.trim().is_empty()),
            home: raw.home.trim().to_string(),
            away: raw.away.trim().to_string(),
            round: RoundKey {
                date: value_to_date(&raw.date),
                matchday: value_to_matchday(&raw.matchday),
            },
        }
    }
}

/// Coerces a numeric cell. Percent signs and thousands separators are
/// stripped; anything unparseable yields `None`.
pub fn parse_stat_value(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() || s == "-" {
        return None;
    }
    let s = s.trim_end_matches('%').replace(',', "");
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn de_lenient_f64<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(deserializer)?;
    Ok(value_to_f64(&v))
}

fn value_to_f64(v: &Value) -> f64 {
    match v {
        Value::Number(n) => n.as_f64().filter(|x| x.is_finite()).unwrap_or(0.0),
        Value::String(s) => parse_stat_value(s).unwrap_or(0.0),
        Value::Bool(b) => f64::from(u8::from(*b)),
        _ => 0.0,
    }
}

fn value_to_matchday(v: &Value) -> i64 {
    match v {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|x| x.trunc() as i64))
            .unwrap_or(0),
        Value::String(s) => {
            // "Giornata 12", "R12", "12" all mean matchday 12.
            let digits: String = s.chars().filter(|c| c.is_ascii_digit()).collect();
            digits.parse::<i64>().unwrap_or(0)
        }
        _ => 0,
    }
}

fn value_to_date(v: &Value) -> Option<NaiveDate> {
    let s = v.as_str()?.trim();
    let head = s.get(..10)?;
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

fn value_to_id(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub fn parse_records_json(raw: &str) -> Result<Vec<MatchRecord>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    serde_json::from_str(trimmed).context("invalid match records json")
}

pub fn parse_fixtures_json(raw: &str) -> Result<Vec<Fixture>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    serde_json::from_str(trimmed).context("invalid fixtures json")
}

pub fn load_records(path: &Path) -> Result<Vec<MatchRecord>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read match records {}", path.display()))?;
    let records = parse_records_json(&raw)
        .with_context(|| format!("parse match records {}", path.display()))?;
    debug!(path = %path.display(), count = records.len(), "loaded match records");
    Ok(records)
}

pub fn load_fixtures(path: &Path) -> Result<Vec<Fixture>> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("read fixtures {}", path.display()))?;
    let fixtures =
        parse_fixtures_json(&raw).with_context(|| format!("parse fixtures {}", path.display()))?;
    debug!(path = %path.display(), count = fixtures.len(), "loaded fixtures");
    Ok(fixtures)
}

/// Oldest first. Stable, so records sharing a round keep their input order.
pub fn sort_chronological(records: &[MatchRecord]) -> Vec<MatchRecord> {
    let mut out = records.to_vec();
    out.sort_by(|a, b| a.round.cmp(&b.round));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_stat_value_handles_percent_and_separators() {
        assert_eq!(parse_stat_value("58%"), Some(58.0));
        assert_eq!(parse_stat_value(" 1,204 "), Some(1204.0));
        assert_eq!(parse_stat_value("7"), Some(7.0));
        assert_eq!(parse_stat_value("-"), None);
        assert_eq!(parse_stat_value("n/a"), None);
    }

    #[test]
    fn record_accepts_strings_numbers_and_nulls() {
        let raw = r#"{
            "home_team": "Ajax",
            "away_team": "PSV",
            "giornata": "Giornata 7",
            "stats": {
                "corners": {"home": "6", "away": 3},
                "possession": {"home": "55%", "away": null},
                "shots": {"home": "x"}
            }
        }"#;
        let rec: MatchRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(rec.home, "Ajax");
        assert_eq!(rec.round, RoundKey::matchday(7));
        assert_eq!(rec.stat(StatKind::Corners), Some(StatPair::new(6.0, 3.0)));
        assert_eq!(rec.stat(StatKind::Possession), Some(StatPair::new(55.0, 0.0)));
        assert_eq!(rec.stat(StatKind::Shots), Some(StatPair::new(0.0, 0.0)));
        assert_eq!(rec.stat_or_zero(StatKind::Goals), StatPair::default());
        assert!(!rec.has_stat(StatKind::Goals));
    }

    #[test]
    fn date_takes_precedence_over_matchday() {
        let early = RoundKey::dated(NaiveDate::from_ymd_opt(2024, 8, 10).unwrap(), 9);
        let late = RoundKey::dated(NaiveDate::from_ymd_opt(2024, 9, 1).unwrap(), 2);
        assert!(early < late);
        assert!(RoundKey::matchday(30) < early);
    }

    #[test]
    fn timestamp_dates_use_the_date_part() {
        let raw = r#"{"home":"A","away":"B","match_date":"2024-10-05T18:45:00Z"}"#;
        let rec: MatchRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(rec.round.date, NaiveDate::from_ymd_opt(2024, 10, 5));
        assert_eq!(rec.round.matchday, 0);
    }

    #[test]
    fn cards_combine_yellow_and_red() {
        let rec = MatchRecord::new("A", "B", RoundKey::matchday(1))
            .with_stat(StatKind::YellowCards, 2.0, 3.0)
            .with_stat(StatKind::RedCards, 1.0, 0.0);
        assert_eq!(rec.stat(StatKind::Cards), Some(StatPair::new(3.0, 3.0)));
        let bare = MatchRecord::new("A", "B", RoundKey::matchday(1));
        assert_eq!(bare.stat(StatKind::Cards), None);
    }

    #[test]
    fn null_payload_is_empty() {
        assert!(parse_records_json("null").unwrap().is_empty());
        assert!(parse_fixtures_json("  ").unwrap().is_empty());
    }
}
