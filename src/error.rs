use std::{path::PathBuf, time::Duration};

use at_controller::CaptureError;
use at_cv::MatchError;
use thiserror::Error;

/// Unified error type of the automation core.
///
/// Every variant is fatal: the core never retries on error, the only retry
/// construct is the click loop in [`crate::AutoTalent::run`].
#[derive(Error, Debug)]
pub enum Error {
    /// The window could not be captured or clicked
    #[error(transparent)]
    Capture(#[from] CaptureError),

    /// A template could not be loaded or matched
    #[error(transparent)]
    Match(#[from] MatchError),

    /// The button template's best score is below the threshold
    #[error("button not found: best score {score:.4} is below threshold {threshold}")]
    ButtonNotFound { score: f32, threshold: f32 },

    /// The click loop hit its attempt or time limit
    #[error("target screen not reached after {attempts} attempts in {elapsed:?}")]
    RetriesExhausted { attempts: u32, elapsed: Duration },

    #[error("failed to read config {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// A stable name for the error kind, used in crash reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Capture(_) => "CaptureError",
            Error::Match(MatchError::TemplateLoad { .. }) => "TemplateLoadError",
            Error::Match(_) => "MatchError",
            Error::ButtonNotFound { .. } => "ButtonNotFoundError",
            Error::RetriesExhausted { .. } => "RetriesExhaustedError",
            Error::ConfigRead { .. } | Error::ConfigParse(_) | Error::InvalidConfig(_) => {
                "ConfigError"
            }
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
