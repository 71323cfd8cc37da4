//! Reachability and login probes
//!
//! Provides:
//! - ICMP reachability via the system `ping` utility
//! - SSH login checking in batch mode
//! - Retry with exponential backoff per probe
//!
//! A failing probe is a verdict, not an error: retries exhaust
//! silently into a failure report carrying the last diagnostic.

use crate::manifest::{FleetConfig, RetryConfig};
use chrono_machines::{BackoffStrategy, ExponentialBackoff};
use rand::rng;
use std::process::Command;
use std::thread;
use std::time::Duration;

/// Create backoff strategy from RetryConfig
fn backoff_from_config(config: &RetryConfig) -> ExponentialBackoff {
    ExponentialBackoff::new()
        .base_delay_ms(config.base_delay_ms)
        .max_delay_ms(config.max_delay_ms)
        .multiplier(config.multiplier)
        .max_attempts(config.max_attempts)
        .jitter_factor(config.jitter_factor)
}

/// Verdict of a single probe over a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    /// Whether the probe passed
    pub ok: bool,
    /// Diagnostic text (last failure's message when not ok)
    pub detail: String,
}

impl ProbeReport {
    /// A passing report
    pub fn pass(detail: impl Into<String>) -> Self {
        Self {
            ok: true,
            detail: detail.into(),
        }
    }

    /// A failing report
    pub fn fail(detail: impl Into<String>) -> Self {
        Self {
            ok: false,
            detail: detail.into(),
        }
    }

    /// The report used when a check is configured off
    pub fn skipped() -> Self {
        Self::pass("skipped")
    }
}

/// Probe seam between the orchestrator and the outside world
///
/// Tests substitute a scripted implementation; production uses
/// [`CommandProbe`].
pub trait HealthProbe {
    /// Reachability check for an address
    fn ping(&self, address: &str) -> ProbeReport;
    /// Remote login check for an address
    fn login(&self, address: &str) -> ProbeReport;
}

/// Retry an attempt per the given policy, returning the first success
/// or the last failure
pub fn retry_probe(
    retry: &RetryConfig,
    mut attempt_fn: impl FnMut() -> ProbeReport,
) -> ProbeReport {
    let backoff = backoff_from_config(retry);
    let mut rng = rng();
    let mut attempt: u8 = 0;

    loop {
        attempt += 1;
        let report = attempt_fn();
        if report.ok {
            return report;
        }

        match backoff.delay(attempt, &mut rng) {
            Some(delay_ms) => thread::sleep(Duration::from_millis(delay_ms)),
            None => return report,
        }
    }
}

/// Probe implementation shelling out to `ping` and `ssh`
pub struct CommandProbe {
    ping_retry: RetryConfig,
    ssh_retry: RetryConfig,
    ping_timeout_secs: u64,
    ssh_timeout_secs: u64,
}

impl CommandProbe {
    pub fn from_config(config: &FleetConfig) -> Self {
        Self {
            ping_retry: config.ping_retry.clone(),
            ssh_retry: config.ssh_retry.clone(),
            ping_timeout_secs: config.config.ping_timeout_secs,
            ssh_timeout_secs: config.config.ssh_timeout_secs,
        }
    }

    fn ping_once(&self, address: &str) -> ProbeReport {
        let output = Command::new("ping")
            .args(["-c", "1", "-W", &self.ping_timeout_secs.to_string()])
            .arg(address)
            .output();

        match output {
            Ok(out) if out.status.success() => ProbeReport::pass("reply received"),
            Ok(out) => ProbeReport::fail(first_line_or(&out, "no reply")),
            Err(e) => ProbeReport::fail(format!("ping: {}", e)),
        }
    }

    fn login_once(&self, address: &str) -> ProbeReport {
        let output = Command::new("ssh")
            .args([
                "-o",
                "BatchMode=yes",
                "-o",
                &format!("ConnectTimeout={}", self.ssh_timeout_secs),
                "-o",
                "StrictHostKeyChecking=accept-new",
            ])
            .arg(address)
            .arg("true")
            .output();

        match output {
            Ok(out) if out.status.success() => ProbeReport::pass("login ok"),
            Ok(out) => ProbeReport::fail(first_line_or(&out, "login refused")),
            Err(e) => ProbeReport::fail(format!("ssh: {}", e)),
        }
    }
}

impl HealthProbe for CommandProbe {
    fn ping(&self, address: &str) -> ProbeReport {
        if address.is_empty() {
            return ProbeReport::fail("no address configured");
        }
        retry_probe(&self.ping_retry, || self.ping_once(address))
    }

    fn login(&self, address: &str) -> ProbeReport {
        if address.is_empty() {
            return ProbeReport::fail("no address configured");
        }
        retry_probe(&self.ssh_retry, || self.login_once(address))
    }
}

/// First non-empty line of a command's stderr (falling back to stdout,
/// then a static message)
fn first_line_or(out: &std::process::Output, fallback: &str) -> String {
    let stderr = String::from_utf8_lossy(&out.stderr);
    let stdout = String::from_utf8_lossy(&out.stdout);
    stderr
        .lines()
        .chain(stdout.lines())
        .find(|l| !l.trim().is_empty())
        .unwrap_or(fallback)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_retry(max_attempts: u8) -> RetryConfig {
        RetryConfig {
            base_delay_ms: 1,
            max_delay_ms: 1,
            multiplier: 1.0,
            max_attempts,
            jitter_factor: 0.0,
        }
    }

    #[test]
    fn test_retry_stops_on_first_success() {
        let mut calls = 0;
        let report = retry_probe(&fast_retry(4), || {
            calls += 1;
            ProbeReport::pass("ok")
        });
        assert!(report.ok);
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_retry_exhausts_into_last_failure() {
        let mut calls = 0;
        let report = retry_probe(&fast_retry(3), || {
            calls += 1;
            ProbeReport::fail(format!("attempt {}", calls))
        });
        assert!(!report.ok);
        assert_eq!(calls, 3);
        assert_eq!(report.detail, "attempt 3");
    }

    #[test]
    fn test_retry_recovers_mid_sequence() {
        let mut calls = 0;
        let report = retry_probe(&fast_retry(4), || {
            calls += 1;
            if calls < 3 {
                ProbeReport::fail("down")
            } else {
                ProbeReport::pass("up")
            }
        });
        assert!(report.ok);
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_skipped_report_passes() {
        let report = ProbeReport::skipped();
        assert!(report.ok);
        assert_eq!(report.detail, "skipped");
    }
}
