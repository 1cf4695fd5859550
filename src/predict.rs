use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::aggregate::{Aggregates, MatchEntry, TeamAggregate, Venue};
use crate::error::ParseError;
use crate::rating::{AdjustedRating, RatingStrategy, RawRating};
use crate::series::{mean, stddev};
use crate::stat_kind::StatKind;

pub const DEFAULT_WINDOW: usize = 5;

/// How many of the most recent matches feed a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleWindow {
    All,
    Last(usize),
}

impl Default for SampleWindow {
    fn default() -> Self {
        SampleWindow::Last(DEFAULT_WINDOW)
    }
}

impl SampleWindow {
    /// Anything that is neither "all" nor a positive integer falls back to the
    /// default window.
    pub fn parse_lenient(raw: &str) -> Self {
        let s = raw.trim();
        if s.eq_ignore_ascii_case("all") {
            return SampleWindow::All;
        }
        match s.parse::<usize>() {
            Ok(n) if n > 0 => SampleWindow::Last(n),
            _ => SampleWindow::default(),
        }
    }

    pub fn from_count(n: i64) -> Self {
        if n > 0 {
            SampleWindow::Last(n as usize)
        } else {
            SampleWindow::default()
        }
    }

    /// Leading slice of a newest-first series.
    pub fn take<T>(self, values: &[T]) -> &[T] {
        match self {
            SampleWindow::All => values,
            SampleWindow::Last(n) => &values[..n.min(values.len())],
        }
    }
}

impl fmt::Display for SampleWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleWindow::All => f.write_str("all"),
            SampleWindow::Last(n) => write!(f, "{n}"),
        }
    }
}

impl FromStr for SampleWindow {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(SampleWindow::parse_lenient(s))
    }
}

impl Serialize for SampleWindow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SampleWindow::All => serializer.serialize_str("all"),
            SampleWindow::Last(n) => serializer.serialize_u64(*n as u64),
        }
    }
}

impl<'de> Deserialize<'de> for SampleWindow {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let v = serde_json::Value::deserialize(deserializer)?;
        Ok(match v {
            serde_json::Value::String(s) => SampleWindow::parse_lenient(&s),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(SampleWindow::from_count)
                .unwrap_or_default(),
            _ => SampleWindow::default(),
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatingMode {
    #[default]
    Raw,
    Adjusted,
}

impl FromStr for RatingMode {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "raw" => Ok(RatingMode::Raw),
            "adjusted" | "adj" => Ok(RatingMode::Adjusted),
            _ => Err(ParseError::UnknownRatingMode(s.to_string())),
        }
    }
}

/// Which of a team's matches a prediction samples from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleScope {
    /// Home side's home matches, away side's away matches.
    #[default]
    Venue,
    /// Each side's most recent matches at either venue.
    General,
}

impl SampleScope {
    fn matches(self, agg: &TeamAggregate, venue: Venue) -> Vec<MatchEntry> {
        match self {
            SampleScope::Venue => agg.matches_at(venue).cloned().collect(),
            SampleScope::General => agg.all_matches().to_vec(),
        }
    }
}

impl FromStr for SampleScope {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "venue" | "specific" => Ok(SampleScope::Venue),
            "general" | "all" => Ok(SampleScope::General),
            _ => Err(ParseError::UnknownSampleScope(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn from_std(total_std: f64, stat: StatKind) -> Self {
        let t = stat.confidence_thresholds();
        if total_std <= t.high {
            Confidence::High
        } else if total_std <= t.med {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Confidence::High => "High",
            Confidence::Medium => "Med",
            Confidence::Low => "Low",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub exp_home: f64,
    pub exp_away: f64,
    pub total: f64,
    pub exp_home_std: f64,
    pub exp_away_std: f64,
    pub total_std: f64,
    pub h_for: f64,
    pub h_ag: f64,
    pub a_for: f64,
    pub a_ag: f64,
    pub home_matches: Vec<MatchEntry>,
    pub away_matches: Vec<MatchEntry>,
}

impl Prediction {
    pub fn confidence(&self, stat: StatKind) -> Confidence {
        Confidence::from_std(self.total_std, stat)
    }
}

/// Expected values for `home` hosting `away`, sampling venue matches only.
/// `None` when either team has no history in `aggregates`.
pub fn predict(
    home: &str,
    away: &str,
    aggregates: &Aggregates,
    window: SampleWindow,
    mode: RatingMode,
) -> Option<Prediction> {
    predict_scoped(home, away, aggregates, window, mode, SampleScope::Venue)
}

pub fn predict_scoped(
    home: &str,
    away: &str,
    aggregates: &Aggregates,
    window: SampleWindow,
    mode: RatingMode,
    scope: SampleScope,
) -> Option<Prediction> {
    match mode {
        RatingMode::Raw => predict_with(&RawRating, home, away, aggregates, window, scope),
        RatingMode::Adjusted => predict_with(
            &AdjustedRating::new(aggregates),
            home,
            away,
            aggregates,
            window,
            scope,
        ),
    }
}

pub fn predict_with<S: RatingStrategy + ?Sized>(
    strategy: &S,
    home: &str,
    away: &str,
    aggregates: &Aggregates,
    window: SampleWindow,
    scope: SampleScope,
) -> Option<Prediction> {
    let home_agg = aggregates.get(home)?;
    let away_agg = aggregates.get(away)?;

    let recent = |matches: Vec<MatchEntry>| window.take(&matches).to_vec();
    let home_matches = recent(scope.matches(home_agg, Venue::Home));
    let away_matches = recent(scope.matches(away_agg, Venue::Away));

    let parts = strategy.components(&home_matches, &away_matches);
    let h_for = mean(&parts.home_for);
    let h_ag = mean(&parts.home_against);
    let a_for = mean(&parts.away_for);
    let a_ag = mean(&parts.away_against);

    let (exp_home, exp_away) =
        strategy.project(home, away, (h_for + a_ag) / 2.0, (a_for + h_ag) / 2.0);

    let exp_home_std =
        0.5 * (stddev(&parts.home_for).powi(2) + stddev(&parts.away_against).powi(2)).sqrt();
    let exp_away_std =
        0.5 * (stddev(&parts.away_for).powi(2) + stddev(&parts.home_against).powi(2)).sqrt();
    // Pooled sample of match totals, deliberately wider than combining the
    // per-side deviations.
    let total_std = stddev(&parts.pooled_totals());

    Some(Prediction {
        exp_home,
        exp_away,
        total: exp_home + exp_away,
        exp_home_std,
        exp_away_std,
        total_std,
        h_for,
        h_ag,
        a_for,
        a_ag,
        home_matches,
        away_matches,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use crate::records::{MatchRecord, RoundKey};

    fn rec(home: &str, away: &str, day: i64, h: f64, a: f64) -> MatchRecord {
        MatchRecord::new(home, away, RoundKey::matchday(day)).with_stat(StatKind::Corners, h, a)
    }

    #[test]
    fn window_parsing() {
        assert_eq!(SampleWindow::parse_lenient("all"), SampleWindow::All);
        assert_eq!(SampleWindow::parse_lenient("ALL"), SampleWindow::All);
        assert_eq!(SampleWindow::parse_lenient("10"), SampleWindow::Last(10));
        assert_eq!(SampleWindow::parse_lenient("0"), SampleWindow::Last(5));
        assert_eq!(SampleWindow::parse_lenient("-3"), SampleWindow::Last(5));
        assert_eq!(SampleWindow::parse_lenient("lots"), SampleWindow::Last(5));
        let w: SampleWindow = serde_json::from_str("3").unwrap();
        assert_eq!(w, SampleWindow::Last(3));
        let w: SampleWindow = serde_json::from_str("\"all\"").unwrap();
        assert_eq!(w, SampleWindow::All);
    }

    #[test]
    fn missing_team_yields_none() {
        let aggs = aggregate(&[rec("A", "B", 1, 5.0, 3.0)], StatKind::Corners);
        assert!(predict("A", "Z", &aggs, SampleWindow::All, RatingMode::Raw).is_none());
        assert!(predict("Z", "B", &aggs, SampleWindow::All, RatingMode::Adjusted).is_none());
    }

    #[test]
    fn raw_prediction_arithmetic() {
        let records = vec![
            rec("A", "B", 1, 6.0, 2.0),
            rec("A", "C", 2, 4.0, 4.0),
            rec("C", "B", 3, 3.0, 5.0),
            rec("D", "B", 4, 7.0, 1.0),
        ];
        let aggs = aggregate(&records, StatKind::Corners);
        let p = predict("A", "B", &aggs, SampleWindow::All, RatingMode::Raw).unwrap();
        // A at home: for [4, 6], against [4, 2]. B away: for [1, 5, 2], against [7, 3, 6].
        assert_eq!(p.h_for, 5.0);
        assert_eq!(p.h_ag, 3.0);
        assert!((p.a_for - 8.0 / 3.0).abs() < 1e-12);
        assert!((p.a_ag - 16.0 / 3.0).abs() < 1e-12);
        assert!((p.exp_home - (5.0 + 16.0 / 3.0) / 2.0).abs() < 1e-12);
        assert!((p.exp_away - (8.0 / 3.0 + 3.0) / 2.0).abs() < 1e-12);
        assert!((p.total - (p.exp_home + p.exp_away)).abs() < 1e-12);
        let expect_home_std = 0.5 * (stddev(&[4.0, 6.0]).powi(2) + stddev(&[7.0, 3.0, 6.0]).powi(2)).sqrt();
        assert!((p.exp_home_std - expect_home_std).abs() < 1e-12);
        assert!((p.total_std - stddev(&[8.0, 8.0, 8.0, 8.0, 8.0])).abs() < 1e-12);
        assert_eq!(p.home_matches.len(), 2);
        assert_eq!(p.away_matches.len(), 3);
    }

    #[test]
    fn window_limits_to_most_recent_matches() {
        let records = vec![
            rec("A", "B", 1, 10.0, 0.0),
            rec("A", "B", 2, 2.0, 0.0),
            rec("A", "B", 3, 4.0, 0.0),
        ];
        let aggs = aggregate(&records, StatKind::Corners);
        let p = predict("A", "B", &aggs, SampleWindow::Last(2), RatingMode::Raw).unwrap();
        assert_eq!(p.h_for, 3.0);
        let rounds: Vec<i64> = p.home_matches.iter().map(|m| m.round.matchday).collect();
        assert_eq!(rounds, vec![3, 2]);
    }

    #[test]
    fn total_std_pools_rather_than_combines() {
        let records = vec![
            rec("A", "B", 1, 9.0, 1.0),
            rec("A", "C", 2, 3.0, 1.0),
            rec("C", "B", 3, 2.0, 2.0),
            rec("D", "B", 4, 8.0, 6.0),
        ];
        let aggs = aggregate(&records, StatKind::Corners);
        let p = predict("A", "B", &aggs, SampleWindow::All, RatingMode::Raw).unwrap();
        let algebraic = (p.exp_home_std.powi(2) + p.exp_away_std.powi(2)).sqrt();
        let pooled = stddev(&[4.0, 10.0, 14.0, 4.0, 10.0]);
        assert!((p.total_std - pooled).abs() < 1e-12);
        assert!((p.total_std - algebraic).abs() > 1e-6);
    }

    #[test]
    fn adjusted_mode_is_identity_on_a_balanced_league() {
        // Every team concedes and produces the same at each venue, so every
        // ratio is 1 and adjusted equals raw.
        let records = vec![
            rec("A", "B", 1, 5.0, 3.0),
            rec("B", "A", 2, 5.0, 3.0),
            rec("A", "C", 3, 5.0, 3.0),
            rec("C", "A", 4, 5.0, 3.0),
            rec("B", "C", 5, 5.0, 3.0),
            rec("C", "B", 6, 5.0, 3.0),
        ];
        let aggs = aggregate(&records, StatKind::Corners);
        let raw = predict("A", "B", &aggs, SampleWindow::All, RatingMode::Raw).unwrap();
        let adj = predict("A", "B", &aggs, SampleWindow::All, RatingMode::Adjusted).unwrap();
        assert!((raw.total - adj.total).abs() < 1e-12);
        assert!((raw.exp_home - adj.exp_home).abs() < 1e-12);
    }

    #[test]
    fn adjusted_mode_uses_mean_of_adjusted_series_and_projects() {
        let records = vec![
            rec("A", "B", 1, 6.0, 2.0),
            rec("A", "C", 2, 4.0, 4.0),
            rec("C", "B", 3, 3.0, 5.0),
            rec("B", "C", 4, 7.0, 1.0),
        ];
        let aggs = aggregate(&records, StatKind::Corners);
        let adj = AdjustedRating::new(&aggs);
        let league = *adj.league();
        let p = predict("A", "B", &aggs, SampleWindow::All, RatingMode::Adjusted).unwrap();

        // A's home-for, newest first: 4 vs C, 6 vs B.
        let c_aa = mean(aggs["C"].away_against());
        let b_aa = mean(aggs["B"].away_against());
        let h_for = (4.0 * league.avg_away_against / c_aa + 6.0 * league.avg_away_against / b_aa) / 2.0;
        assert!((p.h_for - h_for).abs() < 1e-12);

        let base_home = (p.h_for + p.a_ag) / 2.0;
        let factor = b_aa / league.avg_away_against;
        assert!((p.exp_home - base_home * factor).abs() < 1e-12);

        let base_away = (p.a_for + p.h_ag) / 2.0;
        let factor = mean(aggs["A"].home_against()) / league.avg_home_against;
        assert!((p.exp_away - base_away * factor).abs() < 1e-12);
    }

    #[test]
    fn general_scope_samples_both_venues() {
        let records = vec![
            rec("A", "B", 1, 6.0, 2.0),
            rec("C", "A", 2, 3.0, 8.0),
            rec("A", "C", 3, 4.0, 4.0),
            rec("B", "D", 4, 7.0, 1.0),
        ];
        let aggs = aggregate(&records, StatKind::Corners);

        let venue = predict("A", "B", &aggs, SampleWindow::All, RatingMode::Raw).unwrap();
        assert_eq!((venue.h_for, venue.h_ag), (5.0, 3.0));
        assert_eq!((venue.a_for, venue.a_ag), (2.0, 6.0));
        assert_eq!(venue.exp_home, 5.5);
        assert_eq!(venue.exp_away, 2.5);

        let general = predict_scoped(
            "A",
            "B",
            &aggs,
            SampleWindow::All,
            RatingMode::Raw,
            SampleScope::General,
        )
        .unwrap();
        // A newest first: v C (4-4), at C (8-3), v B (6-2). B: v D (7-1), at A (2-6).
        assert_eq!((general.h_for, general.h_ag), (6.0, 3.0));
        assert_eq!((general.a_for, general.a_ag), (4.5, 3.5));
        assert_eq!(general.exp_home, 4.75);
        assert_eq!(general.exp_away, 3.75);
        assert!(general.home_matches.iter().any(|m| m.venue == Venue::Away));
        assert!(general.away_matches.iter().any(|m| m.venue == Venue::Home));
        assert!((general.total_std - stddev(&[8.0, 11.0, 8.0, 8.0, 8.0])).abs() < 1e-12);

        let recent = predict_scoped(
            "A",
            "B",
            &aggs,
            SampleWindow::Last(2),
            RatingMode::Raw,
            SampleScope::General,
        )
        .unwrap();
        assert_eq!((recent.h_for, recent.h_ag), (6.0, 3.5));
    }

    #[test]
    fn general_scope_adjusted_is_identity_on_a_balanced_league() {
        let records = vec![
            rec("A", "B", 1, 5.0, 3.0),
            rec("B", "A", 2, 5.0, 3.0),
            rec("A", "C", 3, 5.0, 3.0),
            rec("C", "A", 4, 5.0, 3.0),
            rec("B", "C", 5, 5.0, 3.0),
            rec("C", "B", 6, 5.0, 3.0),
        ];
        let aggs = aggregate(&records, StatKind::Corners);
        let run = |mode| {
            predict_scoped("A", "B", &aggs, SampleWindow::All, mode, SampleScope::General).unwrap()
        };
        let (raw, adj) = (run(RatingMode::Raw), run(RatingMode::Adjusted));
        assert!((raw.h_for - adj.h_for).abs() < 1e-12);
        assert!((raw.total - adj.total).abs() < 1e-12);
    }

    #[test]
    fn scope_parsing() {
        assert_eq!("general".parse::<SampleScope>(), Ok(SampleScope::General));
        assert_eq!("Specific".parse::<SampleScope>(), Ok(SampleScope::Venue));
        assert!("both".parse::<SampleScope>().is_err());
        let s: SampleScope = serde_json::from_str("\"general\"").unwrap();
        assert_eq!(s, SampleScope::General);
        assert_eq!(SampleScope::default(), SampleScope::Venue);
    }

    #[test]
    fn confidence_buckets() {
        assert_eq!(Confidence::from_std(2.0, StatKind::Corners), Confidence::High);
        assert_eq!(Confidence::from_std(2.5, StatKind::Corners), Confidence::Medium);
        assert_eq!(Confidence::from_std(3.01, StatKind::Corners), Confidence::Low);
        assert_eq!(Confidence::from_std(0.9, StatKind::Goals), Confidence::Medium);
    }
}
