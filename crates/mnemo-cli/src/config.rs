//! Runtime configuration
//!
//! Resolves where the database lives and which scheduler parameters to use.
//! Precedence: command-line flag, then `MNEMO_*` environment variable, then
//! the platform default.

use std::path::PathBuf;

use anyhow::Context;
use directories::ProjectDirs;
use mnemo_core::FSRSParameters;

/// Overrides the data directory
pub const ENV_DATA_DIR: &str = "MNEMO_DATA_DIR";
/// Overrides the parameter file
pub const ENV_PARAMS: &str = "MNEMO_PARAMS";

const DB_FILE: &str = "mnemo.db";
const PARAMS_FILE: &str = "params.json";

/// Resolved settings for one invocation
#[derive(Debug, Clone)]
pub struct Settings {
    /// Database file, `None` for the platform default
    pub db_path: Option<PathBuf>,
    /// Scheduler parameters after file and environment overrides
    pub params: FSRSParameters,
    /// File the parameters were read from, if any
    pub params_file: Option<PathBuf>,
}

impl Settings {
    /// Resolve settings from flags and an environment lookup
    pub fn from_sources<F>(
        data_dir: Option<PathBuf>,
        params_file: Option<PathBuf>,
        lookup: F,
    ) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let db_path = data_dir
            .or_else(|| lookup(ENV_DATA_DIR).map(PathBuf::from))
            .map(|dir| dir.join(DB_FILE));

        let params_file = match params_file.or_else(|| lookup(ENV_PARAMS).map(PathBuf::from)) {
            Some(explicit) => Some(explicit),
            None => default_params_file().filter(|path| path.exists()),
        };

        let params = match &params_file {
            Some(path) => {
                tracing::debug!(path = %path.display(), "Loading scheduler parameters");
                FSRSParameters::from_json_file(path)
                    .with_context(|| format!("Failed to load parameters from {}", path.display()))?
            }
            None => FSRSParameters::default(),
        };
        let params = params.with_overrides_from(&lookup);
        params
            .validate()
            .context("Parameters invalid after environment overrides")?;

        Ok(Self {
            db_path,
            params,
            params_file,
        })
    }
}

/// `params.json` in the platform config directory
pub fn default_params_file() -> Option<PathBuf> {
    ProjectDirs::from("com", "mnemo", "mnemo").map(|dirs| dirs.config_dir().join(PARAMS_FILE))
}
