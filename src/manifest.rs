//! Configuration file parsing for Fleetwatch
//!
//! Parses `fleetwatch.toml` configuration files using serde

use crate::error::{Error, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Load configuration from a file
pub fn load(path: &Path) -> Result<FleetConfig> {
    let content = fs::read_to_string(path).map_err(|e| Error::ConfigRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let config: FleetConfig = toml::from_str(&content)?;
    config.validate()?;

    Ok(config)
}

/// Root configuration structure
#[derive(Debug, Deserialize)]
pub struct FleetConfig {
    /// Global configuration settings
    #[serde(default)]
    pub config: GlobalConfig,

    /// Mail delivery settings
    #[serde(default)]
    pub mail: MailConfig,

    /// Retry policy for ping probes
    #[serde(default)]
    pub ping_retry: RetryConfig,

    /// Retry policy for SSH login probes
    #[serde(default)]
    pub ssh_retry: RetryConfig,

    /// Monitored group definitions
    #[serde(default)]
    pub groups: Vec<GroupDef>,
}

impl FleetConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.config.summary_hour > 23 {
            return Err(Error::ConfigValidation(format!(
                "summary_hour must be 0-23, got {}",
                self.config.summary_hour
            )));
        }
        if self.config.reminder_hour > 23 {
            return Err(Error::ConfigValidation(format!(
                "reminder_hour must be 0-23, got {}",
                self.config.reminder_hour
            )));
        }

        // Check for duplicate group names
        let mut names = std::collections::HashSet::new();
        for group in &self.groups {
            if group.name.is_empty() {
                return Err(Error::ConfigValidation("Group name cannot be empty".into()));
            }
            // The state file keys nodes as "group:name"; a colon in the
            // group would split incorrectly on re-read.
            if group.name.contains(':') {
                return Err(Error::ConfigValidation(format!(
                    "Group name '{}' may not contain ':'",
                    group.name
                )));
            }
            if !names.insert(&group.name) {
                return Err(Error::ConfigValidation(format!(
                    "Duplicate group name: {}",
                    group.name
                )));
            }

            // Check for duplicate node names within the group's inline list
            let mut node_names = std::collections::HashSet::new();
            for node in &group.nodes {
                if node.name.is_empty() {
                    return Err(Error::ConfigValidation(format!(
                        "Group '{}' has a node with an empty name",
                        group.name
                    )));
                }
                if !node_names.insert(&node.name) {
                    return Err(Error::ConfigValidation(format!(
                        "Duplicate node name '{}' in group '{}'",
                        node.name, group.name
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Global configuration settings
#[derive(Debug, Deserialize)]
pub struct GlobalConfig {
    /// Path to the persisted state file
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,

    /// Path to the last-seen tracking file
    #[serde(default = "default_lastseen_file")]
    pub lastseen_file: PathBuf,

    /// Path to the run log (appended; stdout always gets a copy)
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,

    /// Hour of day (0-23) at which the daily summary fires
    #[serde(default)]
    pub summary_hour: u32,

    /// Hour of day (0-23) at which the daily reminder fires
    #[serde(default = "default_reminder_hour")]
    pub reminder_hour: u32,

    /// Per-attempt ping timeout in seconds
    #[serde(default = "default_ping_timeout")]
    pub ping_timeout_secs: u64,

    /// Per-attempt SSH connect timeout in seconds
    #[serde(default = "default_ssh_timeout")]
    pub ssh_timeout_secs: u64,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            state_file: default_state_file(),
            lastseen_file: default_lastseen_file(),
            log_file: default_log_file(),
            summary_hour: 0,
            reminder_hour: default_reminder_hour(),
            ping_timeout_secs: default_ping_timeout(),
            ssh_timeout_secs: default_ssh_timeout(),
        }
    }
}

fn default_state_file() -> PathBuf {
    PathBuf::from("state.json")
}

fn default_lastseen_file() -> PathBuf {
    PathBuf::from("lastseen.json")
}

fn default_log_file() -> PathBuf {
    PathBuf::from("fleetwatch.log")
}

fn default_reminder_hour() -> u32 {
    10
}

fn default_ping_timeout() -> u64 {
    3
}

fn default_ssh_timeout() -> u64 {
    5
}

/// Mail delivery configuration
#[derive(Debug, Deserialize)]
pub struct MailConfig {
    /// From address for outgoing mail
    #[serde(default = "default_mail_from")]
    pub from: String,

    /// Path to the sendmail binary
    #[serde(default = "default_sendmail")]
    pub sendmail: PathBuf,

    /// Recipients used when a group defines none, and for the daily summary
    #[serde(default)]
    pub default_recipients: Vec<String>,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            from: default_mail_from(),
            sendmail: default_sendmail(),
            default_recipients: Vec::new(),
        }
    }
}

fn default_mail_from() -> String {
    "fleetwatch@localhost".to_string()
}

fn default_sendmail() -> PathBuf {
    PathBuf::from("/usr/sbin/sendmail")
}

/// Retry/backoff configuration for probe attempts
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Base delay in milliseconds before first retry
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Maximum delay in milliseconds between retries
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Multiplier for exponential backoff
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,

    /// Maximum number of probe attempts
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u8,

    /// Jitter factor (0.0-1.0) to randomize delays
    #[serde(default = "default_jitter_factor")]
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            multiplier: default_multiplier(),
            max_attempts: default_max_attempts(),
            jitter_factor: default_jitter_factor(),
        }
    }
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    5_000
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_max_attempts() -> u8 {
    4
}

fn default_jitter_factor() -> f64 {
    0.25
}

/// A monitored group of nodes
#[derive(Debug, Deserialize)]
pub struct GroupDef {
    /// Group name (used in subjects, state keys and report headers)
    pub name: String,

    /// Notification recipients for this group
    #[serde(default)]
    pub recipients: Vec<String>,

    /// Optional external JSON node list (original format: array of
    /// objects with name/ip/role/skip_ssh)
    #[serde(default)]
    pub nodes_file: Option<PathBuf>,

    /// Inline node definitions
    #[serde(default)]
    pub nodes: Vec<NodeDef>,
}

impl GroupDef {
    /// Resolve the full node list: inline nodes first, then the
    /// external file's nodes if one is configured.
    ///
    /// A read or parse failure of the external file is an error; the
    /// caller skips the group for this run rather than aborting.
    pub fn resolve_nodes(&self) -> Result<Vec<NodeDef>> {
        let mut nodes = self.nodes.clone();

        if let Some(path) = &self.nodes_file {
            let content = fs::read_to_string(path).map_err(|e| Error::NodeList {
                path: path.clone(),
                reason: e.to_string(),
            })?;
            let external: Vec<NodeDef> =
                serde_json::from_str(&content).map_err(|e| Error::NodeList {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;
            nodes.extend(external);

            // A name shared between the inline list and the file (or
            // within the file) would collide on the same state key.
            let mut seen = std::collections::HashSet::new();
            for node in &nodes {
                if !seen.insert(&node.name) {
                    return Err(Error::NodeList {
                        path: path.clone(),
                        reason: format!("duplicate node name '{}'", node.name),
                    });
                }
            }
        }

        Ok(nodes)
    }

    /// Recipients for this group, falling back to the default set
    pub fn recipients_or<'a>(&'a self, fallback: &'a [String]) -> &'a [String] {
        if self.recipients.is_empty() {
            fallback
        } else {
            &self.recipients
        }
    }
}

/// A monitored node
#[derive(Debug, Clone, Deserialize)]
pub struct NodeDef {
    /// Node name (unique within its group)
    pub name: String,

    /// Address probed by ping/SSH; empty renders as "-" in reports
    #[serde(default, alias = "ip")]
    pub address: String,

    /// Role label used for report badges (login, compute, gpu, storage)
    #[serde(default = "default_role")]
    pub role: String,

    /// Skip the SSH login probe for this node
    #[serde(default)]
    pub skip_ssh: bool,
}

fn default_role() -> String {
    "default".to_string()
}

/// Sample configuration written by `fleetwatch init`
pub const SAMPLE_CONFIG: &str = r#"# Fleetwatch configuration

[config]
state_file = "state.json"
lastseen_file = "lastseen.json"
log_file = "fleetwatch.log"
# Hour of day (0-23) for the daily all-systems summary
summary_hour = 0
# Hour of day (0-23) for the unresolved-issue reminder
reminder_hour = 10

[mail]
from = "fleetwatch@example.org"
sendmail = "/usr/sbin/sendmail"
default_recipients = ["ops@example.org"]

[ping_retry]
max_attempts = 4

[ssh_retry]
max_attempts = 4

[[groups]]
name = "Cluster"
recipients = ["cluster-admins@example.org"]
# nodes_file = "config/cluster_nodes.json"

[[groups.nodes]]
name = "login1"
address = "10.0.0.10"
role = "login"

[[groups.nodes]]
name = "storage1"
address = "10.0.0.20"
role = "storage"
skip_ssh = true
"#;
