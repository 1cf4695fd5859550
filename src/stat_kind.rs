use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// The match statistics the engine knows how to aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatKind {
    #[serde(alias = "calci_d_angolo", alias = "corner_kicks")]
    Corners,
    Goals,
    #[serde(alias = "total_shots")]
    Shots,
    #[serde(alias = "shots_ot")]
    ShotsOnTarget,
    Fouls,
    #[serde(alias = "yellows")]
    YellowCards,
    #[serde(alias = "reds")]
    RedCards,
    Cards,
    #[serde(alias = "ball_possession")]
    Possession,
    Offsides,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineScope {
    Total,
    Individual,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinePreset {
    pub default: f64,
    pub step: f64,
    pub options: &'static [f64],
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceThresholds {
    pub high: f64,
    pub med: f64,
}

const FALLBACK_LINE: LinePreset = LinePreset {
    default: 0.5,
    step: 0.5,
    options: &[],
};

const FALLBACK_CONFIDENCE: ConfidenceThresholds = ConfidenceThresholds {
    high: 1.0,
    med: 2.0,
};

impl StatKind {
    pub const ALL: [StatKind; 10] = [
        StatKind::Corners,
        StatKind::Goals,
        StatKind::Shots,
        StatKind::ShotsOnTarget,
        StatKind::Fouls,
        StatKind::YellowCards,
        StatKind::RedCards,
        StatKind::Cards,
        StatKind::Possession,
        StatKind::Offsides,
    ];

    pub fn key(self) -> &'static str {
        match self {
            StatKind::Corners => "corners",
            StatKind::Goals => "goals",
            StatKind::Shots => "shots",
            StatKind::ShotsOnTarget => "shots_on_target",
            StatKind::Fouls => "fouls",
            StatKind::YellowCards => "yellow_cards",
            StatKind::RedCards => "red_cards",
            StatKind::Cards => "cards",
            StatKind::Possession => "possession",
            StatKind::Offsides => "offsides",
        }
    }

    /// Keys a data source may use for this statistic, canonical key first.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            StatKind::Corners => &["corners", "calci_d_angolo", "corner_kicks"],
            StatKind::Goals => &["goals"],
            StatKind::Shots => &["shots", "total_shots"],
            StatKind::ShotsOnTarget => &["shots_on_target", "shots_ot"],
            StatKind::Fouls => &["fouls"],
            StatKind::YellowCards => &["yellow_cards", "yellows"],
            StatKind::RedCards => &["red_cards", "reds"],
            StatKind::Cards => &["cards"],
            StatKind::Possession => &["possession", "ball_possession"],
            StatKind::Offsides => &["offsides"],
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StatKind::Corners => "Corners",
            StatKind::Goals => "Goals",
            StatKind::Shots => "Shots",
            StatKind::ShotsOnTarget => "Shots on Target",
            StatKind::Fouls => "Fouls",
            StatKind::YellowCards => "Yellow Cards",
            StatKind::RedCards => "Red Cards",
            StatKind::Cards => "Cards",
            StatKind::Possession => "Possession",
            StatKind::Offsides => "Offsides",
        }
    }

    pub fn line_preset(self, scope: LineScope) -> LinePreset {
        match (self, scope) {
            (StatKind::Corners, LineScope::Total) => LinePreset {
                default: 9.5,
                step: 1.0,
                options: &[7.5, 8.5, 9.5, 10.5, 11.5, 12.5, 13.5],
            },
            (StatKind::Corners, LineScope::Individual) => LinePreset {
                default: 4.5,
                step: 1.0,
                options: &[2.5, 3.5, 4.5, 5.5, 6.5, 7.5],
            },
            (StatKind::Goals, LineScope::Total) => LinePreset {
                default: 2.5,
                step: 1.0,
                options: &[0.5, 1.5, 2.5, 3.5, 4.5, 5.5],
            },
            (StatKind::Goals, LineScope::Individual) => LinePreset {
                default: 1.5,
                step: 1.0,
                options: &[0.5, 1.5, 2.5, 3.5],
            },
            (StatKind::Shots, LineScope::Total) => LinePreset {
                default: 24.5,
                step: 1.0,
                options: &[20.5, 22.5, 24.5, 26.5, 28.5, 30.5],
            },
            (StatKind::Shots, LineScope::Individual) => LinePreset {
                default: 12.5,
                step: 1.0,
                options: &[9.5, 10.5, 11.5, 12.5, 13.5, 14.5],
            },
            (StatKind::ShotsOnTarget, LineScope::Total) => LinePreset {
                default: 8.5,
                step: 1.0,
                options: &[6.5, 7.5, 8.5, 9.5, 10.5, 11.5],
            },
            (StatKind::ShotsOnTarget, LineScope::Individual) => LinePreset {
                default: 4.5,
                step: 1.0,
                options: &[2.5, 3.5, 4.5, 5.5, 6.5],
            },
            (StatKind::Fouls, LineScope::Total) => LinePreset {
                default: 24.5,
                step: 1.0,
                options: &[20.5, 22.5, 24.5, 26.5, 28.5, 30.5],
            },
            (StatKind::Fouls, LineScope::Individual) => LinePreset {
                default: 11.5,
                step: 1.0,
                options: &[9.5, 10.5, 11.5, 12.5, 13.5],
            },
            (StatKind::YellowCards, LineScope::Total) => LinePreset {
                default: 4.5,
                step: 1.0,
                options: &[2.5, 3.5, 4.5, 5.5, 6.5],
            },
            (StatKind::YellowCards, LineScope::Individual) => LinePreset {
                default: 1.5,
                step: 1.0,
                options: &[0.5, 1.5, 2.5, 3.5],
            },
            (StatKind::RedCards, _) => LinePreset {
                default: 0.5,
                step: 0.5,
                options: &[0.5],
            },
            (StatKind::Possession, _) => LinePreset {
                default: 50.5,
                step: 5.0,
                options: &[40.5, 45.5, 50.5, 55.5, 60.5],
            },
            (StatKind::Cards | StatKind::Offsides, _) => FALLBACK_LINE,
        }
    }

    /// Standard deviation bounds for the High / Medium confidence buckets.
    pub fn confidence_thresholds(self) -> ConfidenceThresholds {
        let (high, med) = match self {
            StatKind::Corners => (2.0, 3.0),
            StatKind::Goals => (0.85, 1.35),
            StatKind::Shots => (3.5, 5.5),
            StatKind::ShotsOnTarget => (1.8, 2.8),
            StatKind::Fouls => (3.2, 5.2),
            StatKind::YellowCards => (1.0, 1.6),
            StatKind::RedCards => (0.2, 0.4),
            StatKind::Possession => (4.5, 7.5),
            StatKind::Offsides => (0.8, 1.5),
            StatKind::Cards => return FALLBACK_CONFIDENCE,
        };
        ConfidenceThresholds { high, med }
    }
}

impl fmt::Display for StatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for StatKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let want = s.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        StatKind::ALL
            .into_iter()
            .find(|kind| kind.aliases().iter().any(|alias| *alias == want))
            .ok_or_else(|| ParseError::UnknownStat(s.to_string()))
    }
}

impl FromStr for LineScope {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "total" => Ok(LineScope::Total),
            "individual" | "team" => Ok(LineScope::Individual),
            _ => Err(ParseError::UnknownLineScope(s.to_string())),
        }
    }
}
