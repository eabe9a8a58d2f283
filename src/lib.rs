//! # Cosmo Assistant Telegram Bot
//!
//! A Telegram bot acting as a personal cosmetologist: it keeps a small skin
//! profile per user, sends daily care reminders, analyses ingredient lists
//! and answers questions through a chat completion API, optionally as voice.

pub mod bot;
pub mod command;
pub mod completion;
pub mod config;
pub mod dialogue;
pub mod errors;
pub mod facts;
pub mod liveness;
pub mod localization;
pub mod observability;
pub mod observability_config;
pub mod reminders;
pub mod speech;
pub mod storage;
pub mod validation;

// Re-export types for easier access
pub use command::{parse_command, Command, MenuButton, Vocabulary};
pub use storage::{Mood, Reminder, SkinType, StateStore};
