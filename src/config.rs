//! Run configuration, read from `auto-talent.toml`.
//!
//! Every field has a default matching the reference deployment, so the file
//! is optional and may set only the keys that differ.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use at_cv::{MatchTemplateMethod, MatcherOptions};
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as, skip_serializing_none};
use tracing::info;

use crate::{
    error::{Error, Result},
    retry::RetryPolicy,
};

/// The config file looked up in the working directory.
pub const CONFIG_FILE: &str = "auto-talent.toml";
pub const DEFAULT_CRASH_LOG: &str = "except_error.log";

/// Seconds from the config file, rounded to whole milliseconds.
fn duration_secs(secs: f32) -> Duration {
    Duration::from_millis((secs as f64 * 1000.0).round() as u64)
}

#[serde_as]
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Exact title of the game window
    pub window_title: String,
    /// Directory the template file names are relative to
    pub template_dir: PathBuf,
    /// Template of the button that rerolls the screen
    pub button_template: String,
    /// Templates that must all be visible on the target screen, checked in order
    pub talent_templates: Vec<String>,
    /// Minimum best score for a template to count as visible
    pub threshold: f32,
    #[serde_as(as = "DisplayFromStr")]
    pub method: MatchTemplateMethod,
    /// Added to the located button centre before clicking
    pub click_offset: (i32, i32),
    /// Pause between raising the window and capturing it
    pub capture_settle_sec: f32,
    /// Pause between button down and button up
    pub press_hold_sec: f32,
    /// Pause after each click before checking the screen again
    pub retry_interval_sec: f32,
    pub max_attempts: Option<u32>,
    pub timeout_sec: Option<f32>,
    /// Crash reports are appended here
    pub crash_log: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            window_title: "射雕  ".to_string(),
            template_dir: PathBuf::from("img"),
            button_template: "button.png".to_string(),
            talent_templates: vec![
                "talent1.png".to_string(),
                "talent2.png".to_string(),
                "talent3.png".to_string(),
            ],
            threshold: 0.99,
            method: MatchTemplateMethod::CrossCorrelationNormed,
            // the window rect includes the frame, posted clicks are client-relative
            click_offset: (-10, -45),
            capture_settle_sec: 1.0,
            press_hold_sec: 0.1,
            retry_interval_sec: 3.5,
            max_attempts: None,
            timeout_sec: None,
            crash_log: PathBuf::from(DEFAULT_CRASH_LOG),
        }
    }
}

impl Config {
    pub fn from_toml(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&s)
    }

    /// Load `path` if it exists, otherwise use the defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            info!("loading config from {}", path.display());
            Self::load(path)
        } else {
            info!("{} not found, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.threshold.is_finite() {
            return Err(Error::InvalidConfig(format!(
                "threshold must be finite, got {}",
                self.threshold
            )));
        }
        if self.button_template.is_empty() {
            return Err(Error::InvalidConfig("button_template is empty".to_string()));
        }
        if self.talent_templates.is_empty() {
            return Err(Error::InvalidConfig("talent_templates is empty".to_string()));
        }
        let durations = [
            ("capture_settle_sec", Some(self.capture_settle_sec)),
            ("press_hold_sec", Some(self.press_hold_sec)),
            ("retry_interval_sec", Some(self.retry_interval_sec)),
            ("timeout_sec", self.timeout_sec),
        ];
        for (name, secs) in durations {
            if let Some(secs) = secs.filter(|s| !(s.is_finite() && *s >= 0.0)) {
                return Err(Error::InvalidConfig(format!(
                    "{name} must be a non-negative number of seconds, got {secs}"
                )));
            }
        }
        Ok(())
    }

    pub fn button_path(&self) -> PathBuf {
        self.template_dir.join(&self.button_template)
    }

    pub fn talent_paths(&self) -> impl Iterator<Item = PathBuf> + '_ {
        self.talent_templates
            .iter()
            .map(|name| self.template_dir.join(name))
    }

    pub fn matcher_options(&self) -> MatcherOptions {
        MatcherOptions::default()
            .with_method(self.method)
            .with_threshold(self.threshold)
    }

    pub fn capture_settle(&self) -> Duration {
        duration_secs(self.capture_settle_sec)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            press_hold: duration_secs(self.press_hold_sec),
            interval: duration_secs(self.retry_interval_sec),
            max_attempts: self.max_attempts,
            timeout: self.timeout_sec.map(duration_secs),
        }
    }
}
