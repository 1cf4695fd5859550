use thiserror::Error;

/// Failure to read one of the caller-facing option strings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unknown statistic: {0}")]
    UnknownStat(String),

    #[error("unknown aggregator: {0} (expected mean or median)")]
    UnknownAggregator(String),

    #[error("unknown rating mode: {0} (expected raw or adjusted)")]
    UnknownRatingMode(String),

    #[error("unknown sample scope: {0} (expected venue or general)")]
    UnknownSampleScope(String),

    #[error("unknown distribution view: {0} (expected total, home or away)")]
    UnknownView(String),

    #[error("unknown line side: {0} (expected over or under)")]
    UnknownLineSide(String),

    #[error("unknown line scope: {0} (expected total or individual)")]
    UnknownLineScope(String),
}
