//! Per-chat pending mode deciding how the next free-text message is read.

use serde::{Deserialize, Serialize};
use teloxide::dispatching::dialogue::{Dialogue, InMemStorage};

/// Represents the conversation state of one chat
///
/// Kept in memory only; a restart returns every chat to `Idle`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssistantDialogueState {
    #[default]
    Idle,
    AwaitingSkinType,
    AwaitingReminder,
    AwaitingIngredients,
    AwaitingReplyFormat,
    AwaitingMood,
    AwaitingConsultation,
}

impl AssistantDialogueState {
    /// Label used in logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            AssistantDialogueState::Idle => "idle",
            AssistantDialogueState::AwaitingSkinType => "awaiting_skin_type",
            AssistantDialogueState::AwaitingReminder => "awaiting_reminder",
            AssistantDialogueState::AwaitingIngredients => "awaiting_ingredients",
            AssistantDialogueState::AwaitingReplyFormat => "awaiting_reply_format",
            AssistantDialogueState::AwaitingMood => "awaiting_mood",
            AssistantDialogueState::AwaitingConsultation => "awaiting_consultation",
        }
    }
}

/// Type alias for our assistant dialogue
pub type AssistantDialogue = Dialogue<AssistantDialogueState, InMemStorage<AssistantDialogueState>>;
