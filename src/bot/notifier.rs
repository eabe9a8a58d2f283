//! Reminder notifications delivered through the Telegram bot

use std::sync::Arc;
use teloxide::prelude::*;

use crate::errors::{AppError, AppResult};
use crate::localization::LocalizationManager;
use crate::reminders::Notifier;
use crate::storage::Reminder;

/// [`Notifier`] that sends `🔔 <note>` messages to the user's private chat
#[derive(Clone)]
pub struct TelegramNotifier {
    bot: Bot,
    localization: Arc<LocalizationManager>,
}

impl TelegramNotifier {
    pub fn new(bot: Bot, localization: Arc<LocalizationManager>) -> Self {
        Self { bot, localization }
    }
}

/// Notification text for a reminder in the given language
pub fn format_notification(
    localization: &LocalizationManager,
    reminder: &Reminder,
    language: &str,
) -> String {
    localization.get_message_with_args_in_language(
        "reminder-notification",
        language,
        &[("text", reminder.text.as_str())],
    )
}

impl Notifier for TelegramNotifier {
    async fn notify(&self, user_id: i64, reminder: &Reminder) -> AppResult<()> {
        // The user's language is not stored, so the default language is used
        let text = format_notification(
            &self.localization,
            reminder,
            self.localization.default_language(),
        );

        self.bot
            .send_message(ChatId(user_id), text)
            .await
            .map_err(|e| AppError::Network(format!("send reminder: {}", e)))?;
        Ok(())
    }
}
