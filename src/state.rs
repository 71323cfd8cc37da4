//! Persisted monitor state
//!
//! The state file is the only durable artifact of a run: the last
//! known health of every node ever observed, plus the dates the daily
//! summary and daily reminder were last sent. The schema matches the
//! original deployment's `state.json` so existing files keep working.

use crate::error::{Error, Result};
use crate::node::{NodeHealth, NodeKey};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

/// In-memory monitor state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistedState {
    /// Last known health per node; absence means never observed
    pub nodes: BTreeMap<NodeKey, NodeHealth>,
    /// Date the daily summary was last sent
    pub last_summary: Option<NaiveDate>,
    /// Date the daily reminder was last sent
    pub last_reminder: Option<NaiveDate>,
}

/// On-disk representation
///
/// Every field defaults so files written by older versions (or by the
/// original deployment) stay readable when fields are added.
#[derive(Debug, Serialize, Deserialize, Default)]
struct StateFile {
    #[serde(default)]
    node_state: BTreeMap<String, bool>,
    #[serde(default)]
    last_daily_summary: String,
    #[serde(default)]
    last_daily_reminder: String,
}

impl From<&PersistedState> for StateFile {
    fn from(state: &PersistedState) -> Self {
        Self {
            node_state: state
                .nodes
                .iter()
                .map(|(key, health)| (key.to_string(), health.is_issue()))
                .collect(),
            last_daily_summary: date_to_field(state.last_summary),
            last_daily_reminder: date_to_field(state.last_reminder),
        }
    }
}

impl From<StateFile> for PersistedState {
    fn from(file: StateFile) -> Self {
        // Entries with unparseable keys are dropped; they can only
        // come from hand-edited files and will be re-learned on the
        // next observation.
        let nodes = file
            .node_state
            .into_iter()
            .filter_map(|(key, is_issue)| {
                NodeKey::parse(&key).map(|k| (k, NodeHealth::from_issue(is_issue)))
            })
            .collect();

        Self {
            nodes,
            last_summary: date_from_field(&file.last_daily_summary),
            last_reminder: date_from_field(&file.last_daily_reminder),
        }
    }
}

fn date_to_field(date: Option<NaiveDate>) -> String {
    date.map(|d| d.to_string()).unwrap_or_default()
}

fn date_from_field(field: &str) -> Option<NaiveDate> {
    field.parse().ok()
}

/// Owner of the state file for the lifetime of one run
#[derive(Debug)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the persisted state
    ///
    /// A missing, unreadable or unparseable file yields a fresh
    /// default, which is persisted immediately so subsequent loads are
    /// stable. This never fails: state loss is recoverable, aborting
    /// the run is not.
    pub fn load(&self) -> PersistedState {
        if let Ok(content) = fs::read_to_string(&self.path) {
            if let Ok(file) = serde_json::from_str::<StateFile>(&content) {
                return file.into();
            }
        }

        let default = PersistedState::default();
        // Best effort; the end-of-run save will retry with a real error.
        let _ = self.save(&default);
        default
    }

    /// Persist the full state, overwriting the previous file
    pub fn save(&self, state: &PersistedState) -> Result<()> {
        let file = StateFile::from(state);
        let json = serde_json::to_string_pretty(&file)?;
        fs::write(&self.path, json).map_err(|e| Error::StateWrite {
            path: self.path.clone(),
            source: e,
        })
    }
}
