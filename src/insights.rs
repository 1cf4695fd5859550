//! League-level reports built on top of aggregation and prediction.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::Serialize;
use tracing::debug;

use crate::aggregate::{Aggregates, Venue, aggregate};
use crate::error::ParseError;
use crate::predict::{
    Confidence, Prediction, RatingMode, SampleScope, SampleWindow, predict, predict_scoped,
};
use crate::records::{Fixture, MatchRecord, TeamId};
use crate::series::{Trend, TrendLabel, mean, median, trend};
use crate::stat_kind::{LineScope, StatKind};

/// A fixture is hot when its expected total beats the league-average match
/// total by this factor.
pub const HOT_FACTOR: f64 = 1.15;
pub const DEFAULT_HOT_COUNT: usize = 9;
/// Widest value span the distribution fills gap by gap.
pub const MAX_FILLED_SPAN: i64 = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LineSide {
    Over,
    Under,
}

impl LineSide {
    fn hits(self, value: f64, threshold: f64) -> bool {
        match self {
            LineSide::Over => value > threshold,
            LineSide::Under => value < threshold,
        }
    }
}

impl FromStr for LineSide {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "over" => Ok(LineSide::Over),
            "under" => Ok(LineSide::Under),
            _ => Err(ParseError::UnknownLineSide(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DistributionView {
    Total,
    Home,
    Away,
}

impl FromStr for DistributionView {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "total" => Ok(DistributionView::Total),
            "home" => Ok(DistributionView::Home),
            "away" => Ok(DistributionView::Away),
            _ => Err(ParseError::UnknownView(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamTrend {
    pub team: TeamId,
    pub home: Trend,
    pub home_label: TrendLabel,
    pub away: Trend,
    pub away_label: TrendLabel,
    pub avg_home_for: f64,
    pub avg_home_against: f64,
    pub avg_away_for: f64,
    pub avg_away_against: f64,
}

/// Per-team form of match totals at each venue, ordered by team id.
pub fn league_trends(aggregates: &Aggregates, window: SampleWindow) -> Vec<TeamTrend> {
    aggregates
        .iter()
        .map(|(team, agg)| {
            let home = trend(&agg.home_totals(), window);
            let away = trend(&agg.away_totals(), window);
            TeamTrend {
                team: team.clone(),
                home,
                home_label: home.label(),
                away,
                away_label: away.label(),
                avg_home_for: mean(agg.home_for()),
                avg_home_against: mean(agg.home_against()),
                avg_away_for: mean(agg.away_for()),
                avg_away_against: mean(agg.away_against()),
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HitRate {
    pub team: TeamId,
    pub hits: usize,
    pub games: usize,
    /// Fraction of `games`, 0..=1.
    pub rate: f64,
}

/// How often each team's recent matches landed over (or under) `threshold`.
/// `Total` scope counts the match total, `Individual` the team's own value.
pub fn hit_rates(
    records: &[MatchRecord],
    stat: StatKind,
    window: SampleWindow,
    scope: LineScope,
    side: LineSide,
    threshold: f64,
) -> Vec<HitRate> {
    let aggregates = aggregate(records, stat);
    let mut out: Vec<HitRate> = aggregates
        .iter()
        .filter_map(|(team, agg)| {
            let recent = window.take(agg.all_matches());
            if recent.is_empty() {
                return None;
            }
            let hits = recent
                .iter()
                .filter(|m| {
                    let value = match scope {
                        LineScope::Total => m.total,
                        LineScope::Individual => m.value_for,
                    };
                    side.hits(value, threshold)
                })
                .count();
            Some(HitRate {
                team: team.clone(),
                hits,
                games: recent.len(),
                rate: hits as f64 / recent.len() as f64,
            })
        })
        .collect();
    out.sort_by(|a, b| {
        b.rate
            .total_cmp(&a.rate)
            .then(b.hits.cmp(&a.hits))
            .then_with(|| a.team.cmp(&b.team))
    });
    out
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedFixture {
    pub fixture: Fixture,
    pub prediction: Prediction,
    pub confidence: Confidence,
}

/// Upcoming fixtures with a prediction, least volatile first.
pub fn rank_safest(
    fixtures: &[Fixture],
    aggregates: &Aggregates,
    stat: StatKind,
    window: SampleWindow,
    mode: RatingMode,
    scope: SampleScope,
) -> Vec<RankedFixture> {
    let mut ranked: Vec<RankedFixture> = fixtures
        .iter()
        .filter_map(|fixture| {
            let prediction =
                predict_scoped(&fixture.home, &fixture.away, aggregates, window, mode, scope)?;
            let confidence = prediction.confidence(stat);
            Some(RankedFixture {
                fixture: fixture.clone(),
                prediction,
                confidence,
            })
        })
        .collect();
    ranked.sort_by(|a, b| {
        a.prediction
            .total_std
            .total_cmp(&b.prediction.total_std)
            .then_with(|| a.fixture.home.cmp(&b.fixture.home))
            .then_with(|| a.fixture.away.cmp(&b.fixture.away))
    });
    debug!(
        fixtures = fixtures.len(),
        ranked = ranked.len(),
        stat = stat.key(),
        "ranked safest fixtures"
    );
    ranked
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HotFixture {
    pub fixture: Fixture,
    pub prediction: Prediction,
    /// League-average match total the flag was judged against.
    pub league_average: f64,
    pub hot: bool,
}

/// Possession splits a fixed 100, so it never runs hot.
pub fn is_hot(stat: StatKind, total: f64, league_average: f64) -> bool {
    stat != StatKind::Possession && total > league_average * HOT_FACTOR
}

fn already_played(fixture: &Fixture, aggregates: &Aggregates) -> bool {
    aggregates.get(&fixture.home).is_some_and(|agg| {
        agg.matches_at(Venue::Home)
            .any(|m| m.opponent == fixture.away && m.round.matchday == fixture.round.matchday)
    })
}

/// Unplayed fixtures on each league's earliest outstanding matchday.
/// Fixtures without a league are grouped together.
pub fn next_matchday<'a>(fixtures: &'a [Fixture], aggregates: &Aggregates) -> Vec<&'a Fixture> {
    let unplayed: Vec<&Fixture> = fixtures
        .iter()
        .filter(|f| !already_played(f, aggregates))
        .collect();
    let mut next: BTreeMap<Option<&str>, i64> = BTreeMap::new();
    for f in unplayed.iter().copied() {
        next.entry(f.league.as_deref())
            .and_modify(|md| *md = (*md).min(f.round.matchday))
            .or_insert(f.round.matchday);
    }
    unplayed
        .into_iter()
        .filter(|f| next.get(&f.league.as_deref()) == Some(&f.round.matchday))
        .collect()
}

/// Next-matchday fixtures ordered by expected total, highest first, cut to
/// `limit`. Each carries the hot flag.
pub fn hot_fixtures(
    fixtures: &[Fixture],
    aggregates: &Aggregates,
    league_average: f64,
    stat: StatKind,
    window: SampleWindow,
    mode: RatingMode,
    limit: usize,
) -> Vec<HotFixture> {
    let mut out: Vec<HotFixture> = next_matchday(fixtures, aggregates)
        .into_iter()
        .filter_map(|fixture| {
            let prediction = predict(&fixture.home, &fixture.away, aggregates, window, mode)?;
            let hot = is_hot(stat, prediction.total, league_average);
            Some(HotFixture {
                fixture: fixture.clone(),
                prediction,
                league_average,
                hot,
            })
        })
        .collect();
    out.sort_by(|a, b| b.prediction.total.total_cmp(&a.prediction.total));
    out.truncate(limit);
    debug!(
        fixtures = out.len(),
        hot = out.iter().filter(|f| f.hot).count(),
        stat = stat.key(),
        "scored hot fixtures"
    );
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DistributionBin {
    pub value: i64,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatDistribution {
    pub stat: StatKind,
    pub view: DistributionView,
    pub samples: usize,
    pub mean: f64,
    pub median: f64,
    /// Every integer between the smallest and largest observed value,
    /// including empty ones. Only observed values once the span exceeds
    /// [`MAX_FILLED_SPAN`].
    pub bins: Vec<DistributionBin>,
}

impl StatDistribution {
    pub fn max_count(&self) -> usize {
        self.bins.iter().map(|b| b.count).max().unwrap_or(0)
    }
}

/// Histogram of observed values across `records`, rounded to integers.
pub fn stat_distribution(
    records: &[MatchRecord],
    stat: StatKind,
    view: DistributionView,
) -> StatDistribution {
    let values: Vec<f64> = records
        .iter()
        .filter_map(|r| r.stat(stat))
        .map(|pair| {
            let v = match view {
                DistributionView::Total => pair.total(),
                DistributionView::Home => pair.home,
                DistributionView::Away => pair.away,
            };
            v.round()
        })
        .collect();

    let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
    for v in &values {
        *counts.entry(*v as i64).or_default() += 1;
    }

    let samples = values.len();
    let bin = |value: i64, count: usize| DistributionBin {
        value,
        count,
        percentage: count as f64 * 100.0 / samples as f64,
    };
    let bins = match (counts.keys().next(), counts.keys().next_back()) {
        (Some(&lo), Some(&hi)) if hi.saturating_sub(lo) <= MAX_FILLED_SPAN => (lo..=hi)
            .map(|value| bin(value, counts.get(&value).copied().unwrap_or(0)))
            .collect(),
        _ => counts.iter().map(|(&value, &count)| bin(value, count)).collect(),
    };

    StatDistribution {
        stat,
        view,
        samples,
        mean: mean(&values),
        median: median(&values),
        bins,
    }
}
