//! Scheduler parameters
//!
//! A versioned, swappable value: weights, target retention, interval cap,
//! fuzz and short-term switches, and the learning/relearning step tables.
//! Loaded from JSON with `MNEMO_*` environment overrides on top.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::algorithm::{DEFAULT_MAXIMUM_INTERVAL, DEFAULT_RETENTION, FSRS5_WEIGHTS, WEIGHT_COUNT};
use super::error::SchedulerError;

/// Environment variable overriding the target retention
pub const ENV_REQUEST_RETENTION: &str = "MNEMO_REQUEST_RETENTION";
/// Environment variable overriding the maximum interval
pub const ENV_MAXIMUM_INTERVAL: &str = "MNEMO_MAXIMUM_INTERVAL";
/// Environment variable toggling interval fuzz
pub const ENV_ENABLE_FUZZ: &str = "MNEMO_ENABLE_FUZZ";
/// Environment variable toggling short-term scheduling
pub const ENV_ENABLE_SHORT_TERM: &str = "MNEMO_ENABLE_SHORT_TERM";

const SECONDS_PER_MINUTE: u32 = 60;
const SECONDS_PER_HOUR: u32 = 3_600;
const SECONDS_PER_DAY: u32 = 86_400;

// ============================================================================
// STEP DURATION
// ============================================================================

/// One entry of a learning or relearning step table
///
/// Written as `"30s"`, `"10m"`, `"1h"` or `"2d"` in parameter files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StepDuration {
    seconds: u32,
}

impl StepDuration {
    /// Step of `seconds`
    pub const fn from_seconds(seconds: u32) -> Self {
        Self { seconds }
    }

    /// Step of `minutes`
    pub const fn from_minutes(minutes: u32) -> Self {
        Self { seconds: minutes * SECONDS_PER_MINUTE }
    }

    /// Length in seconds
    pub fn seconds(&self) -> u32 {
        self.seconds
    }

    /// Length as a chrono duration
    pub fn as_duration(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.seconds as i64)
    }

    /// Steps of a day or more graduate straight to Review
    pub fn spans_days(&self) -> bool {
        self.seconds >= SECONDS_PER_DAY
    }

    /// Whole days covered by the step
    pub fn whole_days(&self) -> u32 {
        self.seconds / SECONDS_PER_DAY
    }
}

impl std::fmt::Display for StepDuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = self.seconds;
        if s > 0 && s % SECONDS_PER_DAY == 0 {
            write!(f, "{}d", s / SECONDS_PER_DAY)
        } else if s > 0 && s % SECONDS_PER_HOUR == 0 {
            write!(f, "{}h", s / SECONDS_PER_HOUR)
        } else if s > 0 && s % SECONDS_PER_MINUTE == 0 {
            write!(f, "{}m", s / SECONDS_PER_MINUTE)
        } else {
            write!(f, "{}s", s)
        }
    }
}

impl std::str::FromStr for StepDuration {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| format!("Missing unit in step '{}' (use s, m, h or d)", s))?;
        let (number, unit) = s.split_at(split);
        let value: u32 = number
            .parse()
            .map_err(|_| format!("Invalid number in step '{}'", s))?;
        let multiplier = match unit {
            "s" => 1,
            "m" => SECONDS_PER_MINUTE,
            "h" => SECONDS_PER_HOUR,
            "d" => SECONDS_PER_DAY,
            _ => return Err(format!("Unknown unit '{}' in step '{}'", unit, s)),
        };
        value
            .checked_mul(multiplier)
            .map(StepDuration::from_seconds)
            .ok_or_else(|| format!("Step '{}' is too long", s))
    }
}

impl TryFrom<String> for StepDuration {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<StepDuration> for String {
    fn from(step: StepDuration) -> Self {
        step.to_string()
    }
}

// ============================================================================
// CONFIG ERROR
// ============================================================================

/// Failure loading a parameter file
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// File is not valid parameter JSON
    #[error("Invalid parameter file: {0}")]
    Json(#[from] serde_json::Error),
    /// Parameters parsed but failed validation
    #[error(transparent)]
    Invalid(#[from] SchedulerError),
}

// ============================================================================
// PARAMETERS
// ============================================================================

/// Full scheduler configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct FSRSParameters {
    /// Model weights
    pub w: [f64; WEIGHT_COUNT],
    /// Target probability of recall at the due date, in (0, 1)
    pub request_retention: f64,
    /// Longest interval in days
    pub maximum_interval: u32,
    /// Jitter review intervals so cards do not cluster
    pub enable_fuzz: bool,
    /// Use learning steps and the same-day stability formula
    pub enable_short_term: bool,
    /// Step table for New/Learning cards
    pub learning_steps: Vec<StepDuration>,
    /// Step table for lapsed cards
    pub relearning_steps: Vec<StepDuration>,
}

impl Default for FSRSParameters {
    fn default() -> Self {
        Self {
            w: FSRS5_WEIGHTS,
            request_retention: DEFAULT_RETENTION,
            maximum_interval: DEFAULT_MAXIMUM_INTERVAL,
            enable_fuzz: false,
            enable_short_term: true,
            learning_steps: vec![StepDuration::from_minutes(1), StepDuration::from_minutes(10)],
            relearning_steps: vec![StepDuration::from_minutes(10)],
        }
    }
}

impl FSRSParameters {
    /// Check every field the memory model relies on
    pub fn validate(&self) -> Result<(), SchedulerError> {
        let retention = self.request_retention;
        if !retention.is_finite() || retention <= 0.0 || retention >= 1.0 {
            return Err(SchedulerError::InvalidParameters(format!(
                "requestRetention must be in (0, 1), got {}",
                retention
            )));
        }
        if self.maximum_interval < 1 {
            return Err(SchedulerError::InvalidParameters(
                "maximumInterval must be at least 1 day".to_string(),
            ));
        }
        if let Some((index, value)) = self.w.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(SchedulerError::InvalidParameters(format!(
                "weight w{} is not finite ({})",
                index, value
            )));
        }
        if let Some((index, value)) = self.w[..4].iter().enumerate().find(|(_, v)| **v <= 0.0) {
            return Err(SchedulerError::InvalidParameters(format!(
                "initial stability weight w{} must be positive ({})",
                index, value
            )));
        }
        let zero_step = self
            .learning_steps
            .iter()
            .chain(self.relearning_steps.iter())
            .any(|step| step.seconds() == 0);
        if zero_step {
            return Err(SchedulerError::InvalidParameters(
                "learning and relearning steps must be longer than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Load from a JSON file; absent fields keep their defaults
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let params: FSRSParameters = serde_json::from_str(&raw)?;
        params.validate()?;
        Ok(params)
    }

    /// Apply `MNEMO_*` overrides from the process environment
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup
    ///
    /// Values that do not parse are ignored and logged.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_REQUEST_RETENTION) {
            match raw.trim().parse::<f64>() {
                Ok(value) => self.request_retention = value,
                Err(_) => tracing::warn!(
                    key = ENV_REQUEST_RETENTION,
                    value = %raw,
                    "Ignoring unparsable override"
                ),
            }
        }
        if let Some(raw) = lookup(ENV_MAXIMUM_INTERVAL) {
            match raw.trim().parse::<u32>() {
                Ok(value) => self.maximum_interval = value,
                Err(_) => tracing::warn!(
                    key = ENV_MAXIMUM_INTERVAL,
                    value = %raw,
                    "Ignoring unparsable override"
                ),
            }
        }
        if let Some(raw) = lookup(ENV_ENABLE_FUZZ) {
            match parse_flag(&raw) {
                Some(value) => self.enable_fuzz = value,
                None => tracing::warn!(
                    key = ENV_ENABLE_FUZZ,
                    value = %raw,
                    "Ignoring unparsable override"
                ),
            }
        }
        if let Some(raw) = lookup(ENV_ENABLE_SHORT_TERM) {
            match parse_flag(&raw) {
                Some(value) => self.enable_short_term = value,
                None => tracing::warn!(
                    key = ENV_ENABLE_SHORT_TERM,
                    value = %raw,
                    "Ignoring unparsable override"
                ),
            }
        }
        self
    }

    /// Step table used for a card in the given lifecycle position
    pub fn steps_for(&self, relearning: bool) -> &[StepDuration] {
        if relearning {
            &self.relearning_steps
        } else {
            &self.learning_steps
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

// ============================================================================
// TESTS
// ============================================================================
