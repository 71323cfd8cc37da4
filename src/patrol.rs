//! Check orchestrator
//!
//! One sweep probes every node of every configured group and produces
//! the structured results the transition detector and scheduler work
//! from. A group whose node list cannot be loaded is logged and
//! skipped; it contributes no rows and no issues for this run.

use crate::lastseen::LastSeenTracker;
use crate::logging::Logger;
use crate::manifest::{FleetConfig, NodeDef};
use crate::node::NodeKey;
use crate::probe::{HealthProbe, ProbeReport};

/// One node's observation from the current sweep
#[derive(Debug, Clone)]
pub struct NodeObservation {
    /// Node name
    pub name: String,
    /// Probed address ("-" when unset)
    pub address: String,
    /// Role label for report badges
    pub role: String,
    /// Ping probe verdict
    pub ping: ProbeReport,
    /// SSH login probe verdict (passing "skipped" when configured off)
    pub login: ProbeReport,
    /// Derived issue flag
    pub is_issue: bool,
    /// Formatted last-seen timestamp
    pub last_seen: String,
    /// Formatted healthy-streak duration
    pub uptime: String,
}

/// All observations for one group, in configuration order
#[derive(Debug, Clone)]
pub struct GroupResult {
    /// Group name
    pub name: String,
    /// Per-node observations
    pub rows: Vec<NodeObservation>,
    /// Number of rows with an issue
    pub issues: usize,
}

/// Result of a full sweep over the configuration
#[derive(Debug, Clone)]
pub struct Sweep {
    /// Group results in configuration order (failed groups omitted)
    pub groups: Vec<GroupResult>,
    /// Total issue count across all groups
    pub total_issues: usize,
}

/// Probe every configured group and assemble the sweep result
///
/// Probes within a group fan out over scoped threads and are joined in
/// node order, so the result is identical to probing sequentially.
pub fn sweep<P: HealthProbe + Sync>(
    config: &FleetConfig,
    probe: &P,
    lastseen: &mut LastSeenTracker,
    log: &Logger,
    now: i64,
) -> Sweep {
    let mut groups = Vec::new();
    let mut total_issues = 0;

    for group in &config.groups {
        let nodes = match group.resolve_nodes() {
            Ok(nodes) => nodes,
            Err(e) => {
                log.log(format!("ERROR loading group '{}': {}", group.name, e));
                continue;
            }
        };
        log.log(format!(
            "Loaded {} nodes for group '{}'",
            nodes.len(),
            group.name
        ));

        let verdicts = probe_nodes(probe, &nodes);

        let mut rows = Vec::with_capacity(nodes.len());
        let mut issues = 0;

        for (node, (ping, login)) in nodes.iter().zip(verdicts) {
            let is_issue = !ping.ok || (!node.skip_ssh && !login.ok);
            if is_issue {
                issues += 1;
            }

            let key = NodeKey::new(&group.name, &node.name);
            let (last_seen, uptime) = lastseen.observe(&key, !is_issue, now);

            log.debug(format!(
                "{}: ping={} ssh={} issue={}",
                key, ping.ok, login.ok, is_issue
            ));

            rows.push(NodeObservation {
                name: node.name.clone(),
                address: if node.address.is_empty() {
                    "-".to_string()
                } else {
                    node.address.clone()
                },
                role: node.role.clone(),
                ping,
                login,
                is_issue,
                last_seen,
                uptime,
            });
        }

        total_issues += issues;
        groups.push(GroupResult {
            name: group.name.clone(),
            rows,
            issues,
        });
    }

    Sweep {
        groups,
        total_issues,
    }
}

/// Run both probes for each node, one scoped thread per node
fn probe_nodes<P: HealthProbe + Sync>(
    probe: &P,
    nodes: &[NodeDef],
) -> Vec<(ProbeReport, ProbeReport)> {
    crossbeam::thread::scope(|s| {
        let handles: Vec<_> = nodes
            .iter()
            .map(|node| {
                s.spawn(move |_| {
                    let ping = probe.ping(&node.address);
                    let login = if node.skip_ssh {
                        ProbeReport::skipped()
                    } else {
                        probe.login(&node.address)
                    };
                    (ping, login)
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("probe thread panicked"))
            .collect()
    })
    .expect("probe scope panicked")
}

#[cfg(test)]
impl NodeObservation {
    /// Observation for a healthy node
    pub fn healthy(name: &str) -> Self {
        Self {
            name: name.to_string(),
            address: "10.0.0.1".to_string(),
            role: "default".to_string(),
            ping: ProbeReport::pass("reply received"),
            login: ProbeReport::pass("login ok"),
            is_issue: false,
            last_seen: "-".to_string(),
            uptime: "-".to_string(),
        }
    }

    /// Observation for a node with a failed ping
    pub fn down(name: &str) -> Self {
        Self {
            name: name.to_string(),
            address: "10.0.0.1".to_string(),
            role: "default".to_string(),
            ping: ProbeReport::fail("no reply"),
            login: ProbeReport::fail("login refused"),
            is_issue: true,
            last_seen: "-".to_string(),
            uptime: "-".to_string(),
        }
    }
}

#[cfg(test)]
pub mod testutil {
    use super::*;

    /// Probe scripted by address: listed addresses pass, others fail
    pub struct ScriptedProbe {
        pub ping_up: Vec<String>,
        pub login_up: Vec<String>,
    }

    impl ScriptedProbe {
        pub fn all_up(addresses: &[&str]) -> Self {
            let up: Vec<String> = addresses.iter().map(|a| a.to_string()).collect();
            Self {
                ping_up: up.clone(),
                login_up: up,
            }
        }
    }

    impl HealthProbe for ScriptedProbe {
        fn ping(&self, address: &str) -> ProbeReport {
            if self.ping_up.iter().any(|a| a == address) {
                ProbeReport::pass("reply received")
            } else {
                ProbeReport::fail("no reply")
            }
        }

        fn login(&self, address: &str) -> ProbeReport {
            if self.login_up.iter().any(|a| a == address) {
                ProbeReport::pass("login ok")
            } else {
                ProbeReport::fail("login refused")
            }
        }
    }

    /// Build a sweep from (group, [(node, is_issue)]) tuples
    pub fn sweep_of(groups: &[(&str, &[(&str, bool)])]) -> Sweep {
        let mut out = Vec::new();
        let mut total = 0;
        for (name, rows) in groups {
            let rows: Vec<NodeObservation> = rows
                .iter()
                .map(|(n, issue)| {
                    if *issue {
                        NodeObservation::down(n)
                    } else {
                        NodeObservation::healthy(n)
                    }
                })
                .collect();
            let issues = rows.iter().filter(|r| r.is_issue).count();
            total += issues;
            out.push(GroupResult {
                name: name.to_string(),
                rows,
                issues,
            });
        }
        Sweep {
            groups: out,
            total_issues: total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testutil::ScriptedProbe;
    use super::*;
    use crate::manifest::FleetConfig;

    fn config_from(toml_src: &str) -> FleetConfig {
        let config: FleetConfig = toml::from_str(toml_src).unwrap();
        config.validate().unwrap();
        config
    }

    fn fresh_tracker(tag: &str) -> LastSeenTracker {
        LastSeenTracker::load(
            std::env::temp_dir().join(format!("fleetwatch-patrol-{}-{}.json", tag, std::process::id())),
        )
    }

    #[test]
    fn test_sweep_counts_issues_and_preserves_order() {
        let config = config_from(
            r#"
[[groups]]
name = "Cluster"

[[groups.nodes]]
name = "a"
address = "10.0.0.1"

[[groups.nodes]]
name = "b"
address = "10.0.0.2"

[[groups.nodes]]
name = "c"
address = "10.0.0.3"
"#,
        );
        let probe = ScriptedProbe::all_up(&["10.0.0.1", "10.0.0.3"]);
        let mut tracker = fresh_tracker("order");

        let sweep = sweep(&config, &probe, &mut tracker, &Logger::stdout_only(), 1_000);

        assert_eq!(sweep.groups.len(), 1);
        let group = &sweep.groups[0];
        let names: Vec<&str> = group.rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["a", "b", "c"]);
        assert_eq!(group.issues, 1);
        assert_eq!(sweep.total_issues, 1);
        assert!(group.rows[1].is_issue);
        assert!(!group.rows[0].is_issue);
    }

    #[test]
    fn test_ssh_failure_is_issue_unless_skipped() {
        let config = config_from(
            r#"
[[groups]]
name = "G"

[[groups.nodes]]
name = "checked"
address = "10.0.0.1"

[[groups.nodes]]
name = "skipped"
address = "10.0.0.2"
skip_ssh = true
"#,
        );
        // Ping passes everywhere, SSH nowhere.
        let probe = ScriptedProbe {
            ping_up: vec!["10.0.0.1".into(), "10.0.0.2".into()],
            login_up: Vec::new(),
        };
        let mut tracker = fresh_tracker("ssh");

        let sweep = sweep(&config, &probe, &mut tracker, &Logger::stdout_only(), 1_000);

        let rows = &sweep.groups[0].rows;
        assert!(rows[0].is_issue);
        assert!(!rows[1].is_issue);
        assert_eq!(rows[1].login.detail, "skipped");
        assert_eq!(sweep.total_issues, 1);
    }

    #[test]
    fn test_failed_group_load_is_skipped() {
        let config = config_from(
            r#"
[[groups]]
name = "Broken"
nodes_file = "/nonexistent/nodes.json"

[[groups]]
name = "Good"

[[groups.nodes]]
name = "n1"
address = "10.0.0.1"
"#,
        );
        let probe = ScriptedProbe::all_up(&["10.0.0.1"]);
        let mut tracker = fresh_tracker("skip");

        let sweep = sweep(&config, &probe, &mut tracker, &Logger::stdout_only(), 1_000);

        assert_eq!(sweep.groups.len(), 1);
        assert_eq!(sweep.groups[0].name, "Good");
        assert_eq!(sweep.total_issues, 0);
    }

    #[test]
    fn test_empty_address_renders_dash() {
        let config = config_from(
            r#"
[[groups]]
name = "G"

[[groups.nodes]]
name = "n1"
"#,
        );
        let probe = ScriptedProbe::all_up(&[]);
        let mut tracker = fresh_tracker("dash");

        let sweep = sweep(&config, &probe, &mut tracker, &Logger::stdout_only(), 1_000);
        assert_eq!(sweep.groups[0].rows[0].address, "-");
        assert!(sweep.groups[0].rows[0].is_issue);
    }
}
