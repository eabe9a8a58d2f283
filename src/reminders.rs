//! Reminder parsing and the once-a-minute reminder scheduler.
//!
//! Reminders recur daily: every tick compares each stored `HH:MM` with the
//! current local wall-clock minute and notifies on a match. Nothing is
//! removed after firing and a missed minute is simply skipped.

use chrono::{Local, NaiveDateTime, NaiveTime, Timelike};
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::AppResult;
use crate::observability;
use crate::storage::{Reminder, StateStore};
use crate::validation::MAX_REMINDER_NOTE_CHARS;

lazy_static! {
    static ref REMINDER_PATTERN: Regex =
        Regex::new(r"(?s)^\s*(\d{1,2}):(\d{2})(?:\s+(.*?))?\s*$")
            .expect("Invalid reminder regex pattern");
    static ref TIME_PREFIX: Regex =
        Regex::new(r"^\s*\d{1,2}:\d{2}(?:\s|$)").expect("Invalid time prefix regex pattern");
}

/// Why a reminder input was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReminderParseError {
    /// Input does not start with `H:MM` / `HH:MM`
    Malformed,
    /// Hour above 23 or minute above 59
    TimeOutOfRange { hour: u32, minute: u32 },
    /// Time without a note
    MissingNote,
    /// Note longer than the allowed maximum
    NoteTooLong,
}

impl fmt::Display for ReminderParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReminderParseError::Malformed => write!(f, "expected 'HH:MM note'"),
            ReminderParseError::TimeOutOfRange { hour, minute } => {
                write!(f, "time {}:{:02} is out of range", hour, minute)
            }
            ReminderParseError::MissingNote => write!(f, "reminder note is empty"),
            ReminderParseError::NoteTooLong => write!(
                f,
                "reminder note is longer than {} characters",
                MAX_REMINDER_NOTE_CHARS
            ),
        }
    }
}

impl std::error::Error for ReminderParseError {}

/// True when the text starts with something shaped like a time of day
pub fn looks_like_reminder(text: &str) -> bool {
    TIME_PREFIX.is_match(text)
}

/// Parse `"21:00 apply night cream"` into a zero-padded reminder
pub fn parse_reminder(input: &str) -> Result<Reminder, ReminderParseError> {
    let captures = REMINDER_PATTERN
        .captures(input)
        .ok_or(ReminderParseError::Malformed)?;

    let hour: u32 = captures[1]
        .parse()
        .map_err(|_| ReminderParseError::Malformed)?;
    let minute: u32 = captures[2]
        .parse()
        .map_err(|_| ReminderParseError::Malformed)?;
    if hour > 23 || minute > 59 {
        return Err(ReminderParseError::TimeOutOfRange { hour, minute });
    }

    let note = captures.get(3).map(|m| m.as_str().trim()).unwrap_or("");
    if note.is_empty() {
        return Err(ReminderParseError::MissingNote);
    }
    if note.chars().count() > MAX_REMINDER_NOTE_CHARS {
        return Err(ReminderParseError::NoteTooLong);
    }

    Ok(Reminder {
        time: format!("{:02}:{:02}", hour, minute),
        text: note.to_string(),
    })
}

/// `HH:MM` key of the minute `now` falls in
pub fn minute_key(now: NaiveTime) -> String {
    format!("{:02}:{:02}", now.hour(), now.minute())
}

/// Reminders whose time equals the current minute
pub fn due_reminders(all: &[(i64, Reminder)], now: NaiveTime) -> Vec<(i64, Reminder)> {
    let key = minute_key(now);
    all.iter()
        .filter(|(_, reminder)| reminder.time == key)
        .cloned()
        .collect()
}

/// Capability used by the scheduler to reach users
pub trait Notifier: Send + Sync + 'static {
    fn notify(
        &self,
        user_id: i64,
        reminder: &Reminder,
    ) -> impl Future<Output = AppResult<()>> + Send;
}

/// Outcome of one scheduler tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub due: usize,
    pub delivered: usize,
    pub failed: usize,
}

/// Background job that scans the reminder store once per minute
pub struct ReminderScheduler<N> {
    store: Arc<StateStore>,
    notifier: Arc<N>,
    tick: Duration,
}

impl<N: Notifier> ReminderScheduler<N> {
    pub fn new(store: Arc<StateStore>, notifier: Arc<N>, tick: Duration) -> Self {
        Self {
            store,
            notifier,
            tick,
        }
    }

    /// Evaluate every stored reminder against the minute of `now`
    pub async fn tick_at(&self, now: NaiveTime) -> TickReport {
        let all = self.store.all_reminders();
        let due = due_reminders(&all, now);
        let mut report = TickReport {
            due: due.len(),
            ..Default::default()
        };

        for (user_id, reminder) in &due {
            match self.notifier.notify(*user_id, reminder).await {
                Ok(()) => {
                    report.delivered += 1;
                    debug!(user_id = %user_id, time = %reminder.time, "Reminder delivered");
                }
                Err(e) => {
                    report.failed += 1;
                    warn!(
                        user_id = %user_id,
                        time = %reminder.time,
                        error = %e,
                        "Reminder delivery failed"
                    );
                }
            }
        }

        if report.due > 0 {
            info!(
                minute = %minute_key(now),
                due = report.due,
                delivered = report.delivered,
                failed = report.failed,
                "Reminder tick completed"
            );
        }
        observability::record_reminders_fired(report.delivered, report.failed);
        report
    }

    /// Run until `cancel` fires, evaluating each wall-clock minute once
    pub async fn run(self, cancel: CancellationToken) {
        // Start on a minute boundary so ticks land early in each minute
        let now = Local::now();
        let into_minute = Duration::from_secs(now.second() as u64)
            + Duration::from_nanos(now.nanosecond() as u64 % 1_000_000_000);
        let align = Duration::from_secs(60).saturating_sub(into_minute);

        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(align) => {}
        }

        let mut interval = tokio::time::interval(self.tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last_minute: Option<NaiveDateTime> = None;

        info!(tick_secs = self.tick.as_secs(), "Reminder scheduler started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Reminder scheduler stopped");
                    break;
                }
                _ = interval.tick() => {
                    let now = Local::now().naive_local();
                    let minute = now.with_second(0).and_then(|t| t.with_nanosecond(0));
                    if minute.is_some() && minute == last_minute {
                        continue;
                    }
                    last_minute = minute;
                    self.tick_at(now.time()).await;
                }
            }
        }
    }

    /// Spawn the scheduler on the current runtime
    pub fn spawn(self, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }
}
