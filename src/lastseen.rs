//! Last-seen and uptime tracking
//!
//! Keeps a small JSON file mapping each node to the epoch time it was
//! last observed healthy and the epoch time its current healthy streak
//! began. The formatted values end up in report columns; they carry no
//! alerting semantics.

use crate::error::{Error, Result};
use crate::node::NodeKey;
use chrono::{Local, TimeZone};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

/// Per-node record
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
struct SeenRecord {
    /// Epoch seconds of the last healthy observation
    #[serde(default)]
    last_seen: Option<i64>,
    /// Epoch seconds the current healthy streak started
    #[serde(default)]
    up_since: Option<i64>,
}

/// Tracker owning the last-seen file for one run
#[derive(Debug)]
pub struct LastSeenTracker {
    path: PathBuf,
    entries: BTreeMap<String, SeenRecord>,
}

impl LastSeenTracker {
    /// Load the tracking file; missing or corrupt files yield an empty
    /// tracker
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = fs::read_to_string(&path)
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default();
        Self { path, entries }
    }

    /// Record an observation and return the formatted
    /// (last seen, uptime) pair for the report
    pub fn observe(&mut self, key: &NodeKey, healthy: bool, now: i64) -> (String, String) {
        let entry = self.entries.entry(key.to_string()).or_default();

        if healthy {
            entry.last_seen = Some(now);
            if entry.up_since.is_none() {
                entry.up_since = Some(now);
            }
        } else {
            entry.up_since = None;
        }

        let last_seen = entry
            .last_seen
            .and_then(format_timestamp)
            .unwrap_or_else(|| "-".to_string());
        let uptime = entry
            .up_since
            .map(|since| format_uptime(now - since))
            .unwrap_or_else(|| "-".to_string());

        (last_seen, uptime)
    }

    /// Persist the tracking file, overwriting the previous content
    pub fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&self.path, json).map_err(|e| Error::StateWrite {
            path: self.path.clone(),
            source: e,
        })
    }
}

fn format_timestamp(epoch: i64) -> Option<String> {
    Local
        .timestamp_opt(epoch, 0)
        .single()
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
}

/// Render a duration in seconds as `Nd Nh Nm` (smaller units only
/// when the larger ones are zero)
fn format_uptime(secs: i64) -> String {
    let secs = secs.max(0);
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3_600;
    let minutes = (secs % 3_600) / 60;

    if days > 0 {
        format!("{}d {}h {}m", days, hours, minutes)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}
