use serde::Serialize;

use crate::aggregate::{Aggregates, Venue};
use crate::records::MatchRecord;
use crate::series::mean;
use crate::stat_kind::StatKind;

/// League-wide per-venue baselines for the current record set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LeagueAverages {
    pub avg_home_for: f64,
    pub avg_home_against: f64,
    pub avg_away_for: f64,
    pub avg_away_against: f64,
    pub home_games: usize,
    pub away_games: usize,
}

impl LeagueAverages {
    /// Average a team concedes at `venue`.
    pub fn against_at(&self, venue: Venue) -> f64 {
        match venue {
            Venue::Home => self.avg_home_against,
            Venue::Away => self.avg_away_against,
        }
    }

    /// Average a team produces at `venue`.
    pub fn for_at(&self, venue: Venue) -> f64 {
        match venue {
            Venue::Home => self.avg_home_for,
            Venue::Away => self.avg_away_for,
        }
    }
}

/// Games-weighted: total produced at a venue over total games at that venue,
/// summed across every team, not a mean of team means.
pub fn league_averages(aggregates: &Aggregates) -> LeagueAverages {
    let mut home_for = 0.0;
    let mut home_against = 0.0;
    let mut away_for = 0.0;
    let mut away_against = 0.0;
    let mut home_games = 0usize;
    let mut away_games = 0usize;

    for agg in aggregates.values() {
        home_for += agg.home_for().iter().sum::<f64>();
        home_against += agg.home_against().iter().sum::<f64>();
        away_for += agg.away_for().iter().sum::<f64>();
        away_against += agg.away_against().iter().sum::<f64>();
        home_games += agg.games_at(Venue::Home);
        away_games += agg.games_at(Venue::Away);
    }

    let per_game = |sum: f64, n: usize| if n > 0 { sum / n as f64 } else { 0.0 };
    LeagueAverages {
        avg_home_for: per_game(home_for, home_games),
        avg_home_against: per_game(home_against, home_games),
        avg_away_for: per_game(away_for, away_games),
        avg_away_against: per_game(away_against, away_games),
        home_games,
        away_games,
    }
}

/// Mean match total of `stat` over the records that report it.
pub fn league_average_total(records: &[MatchRecord], stat: StatKind) -> f64 {
    let totals: Vec<f64> = records
        .iter()
        .filter_map(|r| r.stat(stat))
        .map(|pair| pair.total())
        .collect();
    mean(&totals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use crate::records::RoundKey;

    #[test]
    fn weighted_by_games_not_teams() {
        // A plays three home games, C one. A mean-of-means would give (4 + 10) / 2 = 7.
        let records = vec![
            MatchRecord::new("A", "B", RoundKey::matchday(1)).with_stat(StatKind::Corners, 4.0, 1.0),
            MatchRecord::new("A", "C", RoundKey::matchday(2)).with_stat(StatKind::Corners, 4.0, 2.0),
            MatchRecord::new("A", "B", RoundKey::matchday(3)).with_stat(StatKind::Corners, 4.0, 3.0),
            MatchRecord::new("C", "B", RoundKey::matchday(4)).with_stat(StatKind::Corners, 10.0, 6.0),
        ];
        let avgs = league_averages(&aggregate(&records, StatKind::Corners));
        assert_eq!(avgs.home_games, 4);
        assert_eq!(avgs.away_games, 4);
        assert!((avgs.avg_home_for - 22.0 / 4.0).abs() < 1e-12);
        assert!((avgs.avg_away_for - 12.0 / 4.0).abs() < 1e-12);
        assert!((avgs.avg_home_against - avgs.avg_away_for).abs() < 1e-12);
        assert!((avgs.avg_away_against - avgs.avg_home_for).abs() < 1e-12);
    }

    #[test]
    fn empty_aggregates_are_zero() {
        let avgs = league_averages(&Aggregates::new());
        assert_eq!(avgs, LeagueAverages::default());
    }

    #[test]
    fn average_total_skips_records_without_the_stat() {
        let records = vec![
            MatchRecord::new("A", "B", RoundKey::matchday(1)).with_stat(StatKind::Corners, 4.0, 2.0),
            MatchRecord::new("B", "A", RoundKey::matchday(2)),
            MatchRecord::new("C", "A", RoundKey::matchday(3)).with_stat(StatKind::Corners, 5.0, 3.0),
        ];
        assert_eq!(league_average_total(&records, StatKind::Corners), 7.0);
        assert_eq!(league_average_total(&records, StatKind::Goals), 0.0);
    }
}
