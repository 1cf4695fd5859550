use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::backtest::{Aggregator, BacktestConfig};
use crate::distribution::DEFAULT_ITERATIONS;
use crate::insights::DEFAULT_HOT_COUNT;
use crate::predict::{RatingMode, SampleScope, SampleWindow};
use crate::stat_kind::StatKind;

/// Every knob the caller can set. Missing keys in a config file take the
/// default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub stat: StatKind,
    pub window: SampleWindow,
    pub mode: RatingMode,
    pub scope: SampleScope,
    pub aggregator: Aggregator,
    pub buffer: f64,
    pub cap: Option<f64>,
    pub min_prediction: Option<f64>,
    pub iterations: usize,
    pub seed: Option<u64>,
    /// Last `k` shown in probability tables; derived from the mean when unset.
    pub table_upper_bound: Option<u32>,
    /// Length of the hot fixture list.
    pub hot_count: usize,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            stat: StatKind::Corners,
            window: SampleWindow::default(),
            mode: RatingMode::Raw,
            scope: SampleScope::Venue,
            aggregator: Aggregator::default(),
            buffer: 0.0,
            cap: None,
            min_prediction: None,
            iterations: DEFAULT_ITERATIONS,
            seed: None,
            table_upper_bound: None,
            hot_count: DEFAULT_HOT_COUNT,
        }
    }
}

impl ForecastConfig {
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("parse forecast config")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw =
            fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
        let config = Self::from_json(&raw).with_context(|| format!("load {}", path.display()))?;
        debug!(path = %path.display(), stat = config.stat.key(), "loaded config");
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(self).context("serialize forecast config")?;
        fs::write(&tmp, json).context("write forecast config")?;
        fs::rename(&tmp, path).context("swap forecast config")?;
        Ok(())
    }

    pub fn backtest_config(&self) -> BacktestConfig {
        BacktestConfig {
            stat: self.stat,
            window: self.window,
            aggregator: self.aggregator,
            buffer: self.buffer,
            cap: self.cap,
            min_prediction: self.min_prediction,
            mode: self.mode,
            scope: self.scope,
        }
    }
}
