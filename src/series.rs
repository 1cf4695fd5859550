use serde::Serialize;

use crate::predict::SampleWindow;

const VERY_HOT_DIFF: f64 = 1.5;
const HOT_DIFF: f64 = 0.5;
const COLD_DIFF: f64 = -0.5;

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divides by N).
pub fn stddev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    var.max(0.0).sqrt()
}

pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TrendLabel {
    VeryHot,
    Hot,
    Stable,
    Cold,
}

impl TrendLabel {
    pub fn classify(diff: f64) -> Self {
        if diff > VERY_HOT_DIFF {
            TrendLabel::VeryHot
        } else if diff > HOT_DIFF {
            TrendLabel::Hot
        } else if diff < COLD_DIFF {
            TrendLabel::Cold
        } else {
            TrendLabel::Stable
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TrendLabel::VeryHot => "Very Hot",
            TrendLabel::Hot => "Hot",
            TrendLabel::Stable => "Stable",
            TrendLabel::Cold => "Cold",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Trend {
    pub season: f64,
    pub recent: f64,
    pub diff: f64,
}

impl Trend {
    pub fn label(&self) -> TrendLabel {
        TrendLabel::classify(self.diff)
    }
}

/// Season mean against the mean of the first `window` values (the series is
/// newest-first).
pub fn trend(values: &[f64], window: SampleWindow) -> Trend {
    if values.is_empty() {
        return Trend {
            season: 0.0,
            recent: 0.0,
            diff: 0.0,
        };
    }
    let season = mean(values);
    let recent = mean(window.take(values));
    Trend {
        season,
        recent,
        diff: recent - season,
    }
}
