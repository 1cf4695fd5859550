pub mod aggregate;
pub mod backtest;
pub mod config;
pub mod distribution;
pub mod error;
pub mod export;
pub mod insights;
pub mod league;
pub mod predict;
pub mod rating;
pub mod records;
pub mod series;
pub mod stat_kind;

use tracing_subscriber::EnvFilter;

/// Stderr logging for the binaries, filtered by `RUST_LOG` (default `info`).
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
