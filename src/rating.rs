//! Opponent-strength normalisation.
//!
//! A raw per-match value is rescaled by `league_avg / opponent_avg` for the
//! role the opponent played in that match, so a team that ran up numbers
//! against weak sides is not over-rated.

use crate::aggregate::{Aggregates, MatchEntry, TeamAggregate, Venue};
use crate::league::{LeagueAverages, league_averages};
use crate::series::mean;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Side {
    Offense,
    Defense,
}

/// Whose value is being rated, and therefore which opponent series
/// normalises it.
///
/// | context      | value rated            | opponent series       | league baseline    |
/// |--------------|------------------------|-----------------------|--------------------|
/// | HomeOffense  | home team's for        | opponent away-against | avg away-against   |
/// | HomeDefense  | home team's against    | opponent away-for     | avg away-for       |
/// | AwayOffense  | away team's for        | opponent home-against | avg home-against   |
/// | AwayDefense  | away team's against    | opponent home-for     | avg home-for       |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AdjustContext {
    HomeOffense,
    HomeDefense,
    AwayOffense,
    AwayDefense,
}

impl AdjustContext {
    fn at(venue: Venue, side: Side) -> Self {
        match (venue, side) {
            (Venue::Home, Side::Offense) => AdjustContext::HomeOffense,
            (Venue::Home, Side::Defense) => AdjustContext::HomeDefense,
            (Venue::Away, Side::Offense) => AdjustContext::AwayOffense,
            (Venue::Away, Side::Defense) => AdjustContext::AwayDefense,
        }
    }

    fn venue(self) -> Venue {
        match self {
            AdjustContext::HomeOffense | AdjustContext::HomeDefense => Venue::Home,
            AdjustContext::AwayOffense | AdjustContext::AwayDefense => Venue::Away,
        }
    }

    fn side(self) -> Side {
        match self {
            AdjustContext::HomeOffense | AdjustContext::AwayOffense => Side::Offense,
            AdjustContext::HomeDefense | AdjustContext::AwayDefense => Side::Defense,
        }
    }

    fn raw_value(self, entry: &MatchEntry) -> f64 {
        match self.side() {
            Side::Offense => entry.value_for,
            Side::Defense => entry.value_against,
        }
    }

    fn opponent_series(self, opponent: &TeamAggregate) -> &[f64] {
        match (self.side(), self.venue().opposite()) {
            (Side::Offense, Venue::Away) => opponent.away_against(),
            (Side::Offense, Venue::Home) => opponent.home_against(),
            (Side::Defense, Venue::Away) => opponent.away_for(),
            (Side::Defense, Venue::Home) => opponent.home_for(),
        }
    }

    fn league_baseline(self, league: &LeagueAverages) -> f64 {
        let opp_venue = self.venue().opposite();
        match self.side() {
            Side::Offense => league.against_at(opp_venue),
            Side::Defense => league.for_at(opp_venue),
        }
    }
}

/// Opponent-adjusted `side` values for `matches`, one per entry, in the same
/// order. Each entry is rated in the context of the venue it was played at.
/// Entries whose opponent has no usable average pass through unchanged.
pub(crate) fn adjusted_series<'a>(
    matches: impl IntoIterator<Item = &'a MatchEntry>,
    aggregates: &Aggregates,
    side: Side,
    league: &LeagueAverages,
) -> Vec<f64> {
    matches
        .into_iter()
        .map(|entry| {
            let ctx = AdjustContext::at(entry.venue, side);
            let baseline = ctx.league_baseline(league);
            let raw = ctx.raw_value(entry);
            let Some(opponent) = aggregates.get(&entry.opponent) else {
                return raw;
            };
            let opp_avg = mean(ctx.opponent_series(opponent));
            if opp_avg <= 0.0 || !opp_avg.is_finite() {
                return raw;
            }
            raw * (baseline / opp_avg)
        })
        .collect()
}

/// The four series a prediction is built from. `home_*` come from the home
/// team's sampled matches, `away_*` from the away team's, index aligned per
/// match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentSeries {
    pub home_for: Vec<f64>,
    pub home_against: Vec<f64>,
    pub away_for: Vec<f64>,
    pub away_against: Vec<f64>,
}

impl ComponentSeries {
    /// Per-match totals from both sides, pooled.
    pub fn pooled_totals(&self) -> Vec<f64> {
        let home = self
            .home_for
            .iter()
            .zip(&self.home_against)
            .map(|(f, a)| f + a);
        let away = self
            .away_for
            .iter()
            .zip(&self.away_against)
            .map(|(f, a)| f + a);
        home.chain(away).collect()
    }
}

/// How a prediction turns match history into component series.
pub trait RatingStrategy {
    fn components(
        &self,
        home_matches: &[MatchEntry],
        away_matches: &[MatchEntry],
    ) -> ComponentSeries;

    /// Final per-side expectations given the specific upcoming pairing.
    fn project(&self, _home: &str, _away: &str, exp_home: f64, exp_away: f64) -> (f64, f64) {
        (exp_home, exp_away)
    }
}

/// Literal for/against values.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawRating;

impl RatingStrategy for RawRating {
    fn components(
        &self,
        home_matches: &[MatchEntry],
        away_matches: &[MatchEntry],
    ) -> ComponentSeries {
        ComponentSeries {
            home_for: home_matches.iter().map(|m| m.value_for).collect(),
            home_against: home_matches.iter().map(|m| m.value_against).collect(),
            away_for: away_matches.iter().map(|m| m.value_for).collect(),
            away_against: away_matches.iter().map(|m| m.value_against).collect(),
        }
    }
}

/// Opponent-adjusted values, plus a projection against the upcoming opponent.
#[derive(Debug, Clone)]
pub struct AdjustedRating<'a> {
    aggregates: &'a Aggregates,
    league: LeagueAverages,
}

impl<'a> AdjustedRating<'a> {
    pub fn new(aggregates: &'a Aggregates) -> Self {
        Self {
            aggregates,
            league: league_averages(aggregates),
        }
    }

    pub fn league(&self) -> &LeagueAverages {
        &self.league
    }

    fn projection_factor(&self, team: &str, venue: Venue) -> f64 {
        let Some(agg) = self.aggregates.get(team) else {
            return 1.0;
        };
        let (series, baseline) = match venue {
            Venue::Home => (agg.home_against(), self.league.avg_home_against),
            Venue::Away => (agg.away_against(), self.league.avg_away_against),
        };
        if series.is_empty() || baseline <= 0.0 {
            return 1.0;
        }
        mean(series) / baseline
    }
}

impl RatingStrategy for AdjustedRating<'_> {
    fn components(
        &self,
        home_matches: &[MatchEntry],
        away_matches: &[MatchEntry],
    ) -> ComponentSeries {
        let adjust = |matches: &[MatchEntry], side| {
            adjusted_series(matches, self.aggregates, side, &self.league)
        };
        ComponentSeries {
            home_for: adjust(home_matches, Side::Offense),
            home_against: adjust(home_matches, Side::Defense),
            away_for: adjust(away_matches, Side::Offense),
            away_against: adjust(away_matches, Side::Defense),
        }
    }

    fn project(&self, home: &str, away: &str, exp_home: f64, exp_away: f64) -> (f64, f64) {
        // The home side's output scales with how much this away team concedes
        // on the road, and vice versa.
        (
            exp_home * self.projection_factor(away, Venue::Away),
            exp_away * self.projection_factor(home, Venue::Home),
        )
    }
}
