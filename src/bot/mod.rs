//! Bot module for handling Telegram interactions
//!
//! This module is split into several submodules:
//! - `message_handler`: parses incoming text and executes the command
//! - `command_handlers`: slash commands and unsupported messages
//! - `ui_builder`: reply keyboards and message formatting
//! - `consultation`: completion, history and reply preparation for questions
//! - `reply`: text or voice delivery of answers
//! - `notifier`: reminder delivery for the scheduler

pub mod command_handlers;
pub mod consultation;
pub mod message_handler;
pub mod notifier;
pub mod reply;
pub mod ui_builder;

use std::sync::Arc;
use teloxide::prelude::*;

use crate::completion::CompletionClient;
use crate::localization::LocalizationManager;
use crate::speech::{GoogleTts, SpeechSynthesizer};
use crate::storage::StateStore;

/// Shared services every handler needs
#[derive(Clone)]
pub struct BotDeps {
    pub store: Arc<StateStore>,
    pub localization: Arc<LocalizationManager>,
    pub completion: Arc<CompletionClient>,
    pub speech: Arc<SpeechSynthesizer<GoogleTts>>,
    pub master_admin_id: i64,
}

/// Common context for bot handlers containing shared dependencies
pub struct HandlerContext<'a> {
    pub bot: &'a Bot,
    pub deps: &'a BotDeps,
    pub chat_id: ChatId,
    pub user_id: i64,
    pub language: &'a str,
}

impl HandlerContext<'_> {
    /// Localized message in the user's language
    pub fn t(&self, key: &str) -> String {
        self.deps
            .localization
            .get_message_in_language(key, self.language, None)
    }

    /// Localized message with arguments in the user's language
    pub fn t_args(&self, key: &str, args: &[(&str, &str)]) -> String {
        self.deps
            .localization
            .get_message_with_args_in_language(key, self.language, args)
    }
}

// Re-export main handler functions for use in main.rs
pub use message_handler::message_handler;
pub use notifier::TelegramNotifier;
