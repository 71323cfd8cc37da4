//! Notification scheduling
//!
//! Decides what to send for one run: immediate down/recovery alerts,
//! the once-a-day full summary and the once-a-day reminder for
//! unresolved issues. The four rules run in a fixed order and are
//! independent; several can fire in the same run.

use crate::manifest::GlobalConfig;
use crate::patrol::Sweep;
use crate::report::ReportData;
use crate::state::PersistedState;
use crate::transition::{GroupSlice, TransitionSet};
use chrono::{Local, NaiveDate, Timelike};

/// Wall-clock inputs captured at the start of scheduling
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    /// Current hour of day (0-23)
    pub hour: u32,
    /// Current calendar date
    pub today: NaiveDate,
}

impl Clock {
    pub fn now() -> Self {
        let now = Local::now();
        Self {
            hour: now.hour(),
            today: now.date_naive(),
        }
    }

    #[cfg(test)]
    pub fn at(hour: u32, today: NaiveDate) -> Self {
        Self { hour, today }
    }
}

/// What kind of notification a decision is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Down,
    Recovery,
    Summary,
    Reminder,
}

/// Who a notification goes to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Audience {
    /// One group's recipient list
    Group(String),
    /// The default recipient list
    All,
}

/// A scheduled notification, ready for rendering and delivery
#[derive(Debug, Clone)]
pub struct Notification {
    pub kind: NotificationKind,
    pub subject: String,
    pub audience: Audience,
    pub report: ReportData,
}

/// Apply the scheduling rules for one run
///
/// Only the two last-sent dates are mutated here; node health was
/// already updated by the detector. The recovery rule clears the
/// reminder date before the reminder rule checks it, so a recovery and
/// a reminder can both fire in the same run.
pub fn plan(
    clock: &Clock,
    transitions: &TransitionSet,
    sweep: &Sweep,
    state: &mut PersistedState,
    config: &GlobalConfig,
) -> Vec<Notification> {
    let mut out = Vec::new();

    // Rule 1: immediate down alerts, one per affected group.
    for (group, slice) in &transitions.down {
        out.push(Notification {
            kind: NotificationKind::Down,
            subject: format!("[ALERT] Node down [{}]", group),
            audience: Audience::Group(group.clone()),
            report: ReportData::single(group, slice.clone()),
        });
    }

    // Rule 2: immediate recovery alerts. Any recovery re-arms the
    // daily reminder for the whole fleet.
    for (group, slice) in &transitions.recovered {
        out.push(Notification {
            kind: NotificationKind::Recovery,
            subject: format!("[RECOVERY] Node back online [{}]", group),
            audience: Audience::Group(group.clone()),
            report: ReportData::single(group, slice.clone()),
        });
    }
    if !transitions.recovered.is_empty() {
        state.last_reminder = None;
    }

    // Rule 3: daily all-systems summary, at most once per date.
    if clock.hour == config.summary_hour && state.last_summary != Some(clock.today) {
        let groups = sweep
            .groups
            .iter()
            .map(|g| {
                let mut slice = GroupSlice::default();
                for row in &g.rows {
                    slice.push(row.clone());
                }
                (g.name.clone(), slice)
            })
            .collect();
        out.push(Notification {
            kind: NotificationKind::Summary,
            subject: "[SUMMARY] Daily fleet summary (all systems)".to_string(),
            audience: Audience::All,
            report: ReportData {
                groups,
                issues: sweep.total_issues,
            },
        });
        state.last_summary = Some(clock.today);
    }

    // Rule 4: daily reminder while issues remain, at most once per
    // date. Checked after rule 2 on purpose.
    if sweep.total_issues > 0
        && clock.hour == config.reminder_hour
        && state.last_reminder != Some(clock.today)
    {
        for group in &sweep.groups {
            if group.issues == 0 {
                continue;
            }
            let mut slice = GroupSlice::default();
            for row in group.rows.iter().filter(|r| r.is_issue) {
                slice.push(row.clone());
            }
            out.push(Notification {
                kind: NotificationKind::Reminder,
                subject: format!("[REMINDER] Issue not resolved [{}]", group.name),
                audience: Audience::Group(group.name.clone()),
                report: ReportData::single(&group.name, slice),
            });
        }
        state.last_reminder = Some(clock.today);
    }

    out
}
