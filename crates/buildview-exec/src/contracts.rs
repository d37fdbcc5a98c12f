use std::path::Path;

use buildview_core::state::Build;
use buildview_core::state::BuildPreparation;
use buildview_core::state::Job;
use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use buildview_core::error::ControllerError;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("reading fixture {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing fixture: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("controller failure: {0}")]
    Controller(#[from] ControllerError),
}

/// A scripted CI server for the simulated executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    #[serde(default = "default_start")]
    pub start: DateTime<Utc>,
    #[serde(default)]
    pub jobs: Vec<Job>,
    #[serde(default)]
    pub builds: Vec<FixtureBuild>,
    #[serde(default = "default_page_size")]
    pub history_page_size: usize,
    #[serde(default)]
    pub latency_ms: u64,
    /// Rejects every request with 401.
    #[serde(default)]
    pub require_login: bool,
    /// How long a triggered build stays pending before it starts.
    #[serde(default = "default_trigger_start")]
    pub trigger_start_after_ms: u64,
}

fn default_start() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap_or_default()
}

fn default_page_size() -> usize {
    10
}

fn default_trigger_start() -> u64 {
    2_000
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureBuild {
    #[serde(flatten)]
    pub build: Build,
    #[serde(default)]
    pub preparation: Option<BuildPreparation>,
    #[serde(default)]
    pub events: Vec<ScriptedEvent>,
}

/// A stream event emitted `at_ms` after the fixture start. Status events also
/// move the build's status at that instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptedEvent {
    pub at_ms: u64,
    pub event: serde_json::Value,
}

impl Fixture {
    pub fn from_json_str(raw: &str) -> Result<Self, ExecError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ExecError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ExecError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&raw)
    }
}
