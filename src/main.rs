//! Fleetwatch - fleet health monitor
//!
//! Probes a fleet of named hosts, tracks UP/DOWN transitions across
//! runs in a persisted state file, and schedules email notifications:
//! immediate down/recovery alerts, a daily summary and a daily
//! reminder for unresolved issues. Designed to be invoked repeatedly
//! by cron; the state file keeps runs consistent over time.

mod cli;
mod error;
mod lastseen;
mod logging;
mod manifest;
mod node;
mod notify;
mod patrol;
mod probe;
mod report;
mod schedule;
mod state;
mod transition;

use cli::{Cli, Commands};
use error::Result;
use lastseen::LastSeenTracker;
use logging::Logger;
use notify::{Notifier, SendmailNotifier};
use probe::CommandProbe;
use schedule::{Audience, Clock};
use state::StateStore;

use chrono::Local;
use std::fs;
use std::path::Path;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse_args();

    match cli.command {
        Commands::Completion { shell } => {
            Cli::generate_completion(shell);
            Ok(())
        }

        Commands::Init { file, force } => {
            if file.exists() && !force {
                eprintln!(
                    "Error: {} already exists. Use -y/--force to overwrite.",
                    file.display()
                );
                std::process::exit(1);
            }
            fs::write(&file, manifest::SAMPLE_CONFIG)?;
            println!("Wrote sample configuration to {}", file.display());
            Ok(())
        }

        Commands::Check => check(&cli.config),

        Commands::Status { json } => status(&cli.config, json),

        Commands::Run { no_notify } => run_once(&cli.config, cli.verbose, no_notify),
    }
}

/// Validate the configuration and report what would be monitored
fn check(config_path: &Path) -> Result<()> {
    let config = manifest::load(config_path)?;

    println!("Configuration OK: {} group(s)", config.groups.len());
    for group in &config.groups {
        match group.resolve_nodes() {
            Ok(nodes) => {
                let recipients = group.recipients_or(&config.mail.default_recipients);
                println!(
                    "  {}: {} node(s), {} recipient(s)",
                    group.name,
                    nodes.len(),
                    recipients.len()
                );
            }
            Err(e) => println!("  {}: WARNING - {}", group.name, e),
        }
    }
    println!(
        "Summary at {:02}:00, reminder at {:02}:00",
        config.config.summary_hour, config.config.reminder_hour
    );

    Ok(())
}

/// Print last known per-node health from the state file
fn status(config_path: &Path, json: bool) -> Result<()> {
    let config = manifest::load(config_path)?;
    let store = StateStore::new(&config.config.state_file);
    let state = store.load();

    if json {
        let nodes: Vec<serde_json::Value> = state
            .nodes
            .iter()
            .map(|(key, health)| {
                serde_json::json!({
                    "group": key.group,
                    "node": key.name,
                    "state": health.to_string(),
                })
            })
            .collect();
        let output = serde_json::json!({
            "nodes": nodes,
            "last_summary": state.last_summary.map(|d| d.to_string()),
            "last_reminder": state.last_reminder.map(|d| d.to_string()),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{:<20} {:<20} {:<6}", "GROUP", "NODE", "STATE");
        println!("{}", "-".repeat(48));
        for (key, health) in &state.nodes {
            println!("{:<20} {:<20} {:<6}", key.group, key.name, health);
        }
        if let Some(date) = state.last_summary {
            println!("\nLast daily summary: {}", date);
        }
        if let Some(date) = state.last_reminder {
            println!("Last daily reminder: {}", date);
        }
    }

    Ok(())
}

/// One full monitoring pass
fn run_once(config_path: &Path, verbose: bool, no_notify: bool) -> Result<()> {
    let config = manifest::load(config_path)?;
    let log = Logger::new(&config.config.log_file, verbose);
    log.log("fleetwatch run started");

    let store = StateStore::new(&config.config.state_file);
    let mut state = store.load();
    let mut lastseen = LastSeenTracker::load(&config.config.lastseen_file);

    let probe = CommandProbe::from_config(&config);
    let now = Local::now().timestamp();
    let sweep = patrol::sweep(&config, &probe, &mut lastseen, &log, now);

    let transitions = transition::detect(&sweep, &mut state);
    let down_count: usize = transitions.down.values().map(|s| s.rows.len()).sum();
    let recovered_count: usize = transitions.recovered.values().map(|s| s.rows.len()).sum();
    if down_count > 0 {
        log.log(format!("{} node(s) newly down", down_count));
    }
    if recovered_count > 0 {
        log.log(format!("{} node(s) recovered", recovered_count));
    }

    let clock = Clock::now();
    let notifications = schedule::plan(&clock, &transitions, &sweep, &mut state, &config.config);

    let notifier = SendmailNotifier::from_config(&config.mail);
    for notification in &notifications {
        let recipients: &[String] = match &notification.audience {
            Audience::All => &config.mail.default_recipients,
            Audience::Group(name) => config
                .groups
                .iter()
                .find(|g| g.name == *name)
                .map(|g| g.recipients_or(&config.mail.default_recipients))
                .unwrap_or(&[]),
        };

        if recipients.is_empty() {
            log.log(format!(
                "No recipients for '{}', skipping",
                notification.subject
            ));
            continue;
        }
        if no_notify {
            log.log(format!(
                "Would send '{}' to {} recipient(s)",
                notification.subject,
                recipients.len()
            ));
            continue;
        }

        let body = report::render(&notification.report);
        match notifier.send(&notification.subject, &body, recipients) {
            Ok(()) => log.log(format!("Sent '{}'", notification.subject)),
            Err(e) => log.log(format!("ERROR {}", e)),
        }
    }

    if let Err(e) = lastseen.save() {
        log.log(format!("ERROR {}", e));
    }
    store.save(&state)?;

    log.log(format!(
        "run finished: {} group(s), {} issue(s), {} notification(s)",
        sweep.groups.len(),
        sweep.total_issues,
        notifications.len()
    ));

    Ok(())
}
