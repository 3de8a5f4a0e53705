use thiserror::Error;

/// Violations of the chunking configuration contract.
///
/// These are caller programming errors and are reported as soon as a config
/// is validated; nothing is clamped silently.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    ZeroSize(&'static str),

    #[error("minChunkSize ({min}) exceeds maxChunkSize ({max})")]
    MinExceedsMax { min: usize, max: usize },

    #[error("targetChunkSize ({target}) must lie within [{min}, {max}]")]
    TargetOutOfRange { target: usize, min: usize, max: usize },

    #[error("similarityThreshold ({0}) must lie within [0, 1]")]
    ThresholdOutOfRange(f32),

    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
}
