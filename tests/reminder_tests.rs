//! # Reminder Tests
//!
//! Tests for reminder parsing and the scheduler tick: which reminders fire for
//! a given wall-clock minute and how delivery failures are reported.

use chrono::NaiveTime;
use cosmo_assistant::errors::{AppError, AppResult};
use cosmo_assistant::reminders::{
    due_reminders, parse_reminder, Notifier, ReminderParseError, ReminderScheduler, TickReport,
};
use cosmo_assistant::storage::{Reminder, StateStore};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

/// Notifier that records deliveries and fails for selected users
#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<(i64, String)>>,
    failing_user: Option<i64>,
}

impl Notifier for RecordingNotifier {
    async fn notify(&self, user_id: i64, reminder: &Reminder) -> AppResult<()> {
        if Some(user_id) == self.failing_user {
            return Err(AppError::Network("chat not found".to_string()));
        }
        self.sent.lock().push((user_id, reminder.text.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time(hour: u32, minute: u32, second: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, second).unwrap()
    }

    fn store_with(reminders: &[(i64, &str, &str)]) -> (TempDir, Arc<StateStore>) {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let store = StateStore::open(dir.path()).expect("Failed to open store");
        for (user_id, input_time, text) in reminders {
            store
                .add_reminder(
                    *user_id,
                    Reminder {
                        time: input_time.to_string(),
                        text: text.to_string(),
                    },
                )
                .unwrap();
        }
        (dir, Arc::new(store))
    }

    #[test]
    fn test_parse_documented_example() {
        let reminder = parse_reminder("21:00 apply night cream").unwrap();
        assert_eq!(
            serde_json::to_value(&reminder).unwrap(),
            serde_json::json!({"time": "21:00", "text": "apply night cream"})
        );
    }

    #[test]
    fn test_parse_trims_and_keeps_inner_spaces() {
        let reminder = parse_reminder("  7:30   умыться и  нанести SPF  ").unwrap();
        assert_eq!(reminder.time, "07:30");
        assert_eq!(reminder.text, "умыться и  нанести SPF");
    }

    #[test]
    fn test_parse_rejects_long_note() {
        let input = format!("10:00 {}", "я".repeat(201));
        assert_eq!(parse_reminder(&input), Err(ReminderParseError::NoteTooLong));
    }

    #[test]
    fn test_due_reminders_match_minute_only() {
        let all = vec![
            (1, parse_reminder("21:00 крем").unwrap()),
            (2, parse_reminder("21:01 маска").unwrap()),
            (3, parse_reminder("09:00 SPF").unwrap()),
        ];

        let due = due_reminders(&all, time(21, 0, 42));
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].0, 1);

        assert!(due_reminders(&all, time(20, 59, 59)).iter().all(|(u, _)| *u != 1));
    }

    #[tokio::test]
    async fn test_fires_at_its_minute_and_again_next_day() {
        let (_dir, store) = store_with(&[(42, "21:00", "apply night cream")]);
        let notifier = Arc::new(RecordingNotifier::default());
        let scheduler =
            ReminderScheduler::new(store, Arc::clone(&notifier), Duration::from_secs(60));

        let report = scheduler.tick_at(time(21, 0, 5)).await;
        assert_eq!(
            report,
            TickReport {
                due: 1,
                delivered: 1,
                failed: 0
            }
        );

        let report = scheduler.tick_at(time(21, 1, 5)).await;
        assert_eq!(report.due, 0);

        // Same wall-clock time on the following day
        let report = scheduler.tick_at(time(21, 0, 0)).await;
        assert_eq!(report.delivered, 1);

        let sent = notifier.sent.lock().clone();
        assert_eq!(
            sent,
            vec![
                (42, "apply night cream".to_string()),
                (42, "apply night cream".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_delivery_does_not_stop_tick() {
        let (_dir, store) = store_with(&[
            (1, "08:15", "SPF"),
            (2, "08:15", "SPF"),
            (3, "08:15", "SPF"),
        ]);
        let notifier = Arc::new(RecordingNotifier {
            failing_user: Some(2),
            ..Default::default()
        });
        let scheduler =
            ReminderScheduler::new(store, Arc::clone(&notifier), Duration::from_secs(60));

        let report = scheduler.tick_at(time(8, 15, 0)).await;
        assert_eq!(report.due, 3);
        assert_eq!(report.delivered, 2);
        assert_eq!(report.failed, 1);

        let mut users: Vec<i64> = notifier.sent.lock().iter().map(|(u, _)| *u).collect();
        users.sort();
        assert_eq!(users, vec![1, 3]);
    }

    #[tokio::test]
    async fn test_scheduler_stops_on_cancel() {
        let (_dir, store) = store_with(&[]);
        let notifier = Arc::new(RecordingNotifier::default());
        let cancel = CancellationToken::new();
        let handle =
            ReminderScheduler::new(store, notifier, Duration::from_secs(60)).spawn(cancel.clone());

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("scheduler did not stop")
            .expect("scheduler task panicked");
    }
}
