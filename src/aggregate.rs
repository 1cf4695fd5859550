use std::collections::BTreeMap;

use serde::Serialize;

use crate::records::{MatchRecord, RoundKey, TeamId};
use crate::stat_kind::StatKind;

pub type Aggregates = BTreeMap<TeamId, TeamAggregate>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Venue {
    Home,
    Away,
}

impl Venue {
    pub fn opposite(self) -> Self {
        match self {
            Venue::Home => Venue::Away,
            Venue::Away => Venue::Home,
        }
    }
}

/// One match seen from one team's side.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchEntry {
    pub opponent: TeamId,
    pub venue: Venue,
    pub value_for: f64,
    pub value_against: f64,
    pub total: f64,
    pub round: RoundKey,
    pub tldr: Option<String>,
    pub summary: Option<String>,
}

/// Per-team history for one statistic. Every series is newest-first, so the
/// first N values are the last N matches.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TeamAggregate {
    home_for: Vec<f64>,
    home_against: Vec<f64>,
    away_for: Vec<f64>,
    away_against: Vec<f64>,
    all_matches: Vec<MatchEntry>,
}

impl TeamAggregate {
    pub fn home_for(&self) -> &[f64] {
        &self.home_for
    }

    pub fn home_against(&self) -> &[f64] {
        &self.home_against
    }

    pub fn away_for(&self) -> &[f64] {
        &self.away_for
    }

    pub fn away_against(&self) -> &[f64] {
        &self.away_against
    }

    pub fn all_matches(&self) -> &[MatchEntry] {
        &self.all_matches
    }

    pub fn matches_at(&self, venue: Venue) -> impl Iterator<Item = &MatchEntry> {
        self.all_matches.iter().filter(move |m| m.venue == venue)
    }

    pub fn home_totals(&self) -> Vec<f64> {
        self.matches_at(Venue::Home).map(|m| m.total).collect()
    }

    pub fn away_totals(&self) -> Vec<f64> {
        self.matches_at(Venue::Away).map(|m| m.total).collect()
    }

    pub fn games_at(&self, venue: Venue) -> usize {
        match venue {
            Venue::Home => self.home_for.len(),
            Venue::Away => self.away_for.len(),
        }
    }

    fn push(&mut self, entry: MatchEntry) {
        match entry.venue {
            Venue::Home => {
                self.home_for.push(entry.value_for);
                self.home_against.push(entry.value_against);
            }
            Venue::Away => {
                self.away_for.push(entry.value_for);
                self.away_against.push(entry.value_against);
            }
        }
        self.all_matches.push(entry);
    }
}

/// Builds per-team series for `stat`. Input order does not matter; records
/// are ordered newest first before anything is pushed. A record without the
/// statistic counts as 0-0.
pub fn aggregate(records: &[MatchRecord], stat: StatKind) -> Aggregates {
    let mut ordered: Vec<&MatchRecord> = records.iter().collect();
    ordered.sort_by(|a, b| b.round.cmp(&a.round));

    let mut out = Aggregates::new();
    for rec in ordered {
        let pair = rec.stat_or_zero(stat);
        let total = pair.home + pair.away;

        out.entry(rec.home.clone()).or_default().push(MatchEntry {
            opponent: rec.away.clone(),
            venue: Venue::Home,
            value_for: pair.home,
            value_against: pair.away,
            total,
            round: rec.round,
            tldr: rec.tldr.clone(),
            summary: rec.summary.clone(),
        });
        out.entry(rec.away.clone()).or_default().push(MatchEntry {
            opponent: rec.home.clone(),
            venue: Venue::Away,
            value_for: pair.away,
            value_against: pair.home,
            total,
            round: rec.round,
            tldr: rec.tldr.clone(),
            summary: rec.summary.clone(),
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(home: &str, away: &str, day: i64, h: f64, a: f64) -> MatchRecord {
        MatchRecord::new(home, away, RoundKey::matchday(day)).with_stat(StatKind::Corners, h, a)
    }

    #[test]
    fn series_are_newest_first_regardless_of_input_order() {
        let records = vec![
            rec("A", "B", 1, 4.0, 2.0),
            rec("A", "C", 3, 7.0, 1.0),
            rec("C", "A", 2, 5.0, 6.0),
        ];
        let aggs = aggregate(&records, StatKind::Corners);
        let a = &aggs["A"];
        assert_eq!(a.home_for(), &[7.0, 4.0]);
        assert_eq!(a.home_against(), &[1.0, 2.0]);
        assert_eq!(a.away_for(), &[6.0]);
        assert_eq!(a.away_against(), &[5.0]);
        let rounds: Vec<i64> = a.all_matches().iter().map(|m| m.round.matchday).collect();
        assert_eq!(rounds, vec![3, 2, 1]);
    }

    #[test]
    fn every_record_yields_two_entries_with_swapped_perspective() {
        let records = vec![rec("A", "B", 1, 4.0, 2.0)];
        let aggs = aggregate(&records, StatKind::Corners);
        let home = &aggs["A"].all_matches()[0];
        let away = &aggs["B"].all_matches()[0];
        assert_eq!((home.venue, home.value_for, home.value_against), (Venue::Home, 4.0, 2.0));
        assert_eq!((away.venue, away.value_for, away.value_against), (Venue::Away, 2.0, 4.0));
        assert_eq!(home.opponent, "B");
        assert_eq!(away.opponent, "A");
    }

    #[test]
    fn lengths_and_totals_are_consistent() {
        let records = vec![
            rec("A", "B", 1, 4.0, 2.0),
            rec("B", "A", 2, 3.0, 3.0),
            rec("A", "C", 3, 9.0, 0.0),
            rec("C", "B", 4, 1.0, 5.0),
        ];
        for agg in aggregate(&records, StatKind::Corners).values() {
            assert_eq!(agg.home_for().len(), agg.home_against().len());
            assert_eq!(agg.home_for().len(), agg.matches_at(Venue::Home).count());
            assert_eq!(agg.away_for().len(), agg.away_against().len());
            assert_eq!(agg.away_for().len(), agg.matches_at(Venue::Away).count());
            for m in agg.all_matches() {
                assert_eq!(m.total, m.value_for + m.value_against);
            }
        }
    }

    #[test]
    fn missing_statistic_defaults_to_zero() {
        let records = vec![MatchRecord::new("A", "B", RoundKey::matchday(1))];
        let aggs = aggregate(&records, StatKind::Goals);
        assert_eq!(aggs["A"].home_for(), &[0.0]);
        assert_eq!(aggs["B"].away_against(), &[0.0]);
    }

    #[test]
    fn different_statistics_over_same_records() {
        let records = vec![
            rec("A", "B", 1, 4.0, 2.0).with_stat(StatKind::Goals, 1.0, 0.0),
        ];
        let corners = aggregate(&records, StatKind::Corners);
        let goals = aggregate(&records, StatKind::Goals);
        assert_eq!(corners["A"].home_for(), &[4.0]);
        assert_eq!(goals["A"].home_for(), &[1.0]);
    }
}
