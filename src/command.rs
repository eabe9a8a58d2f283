//! Interpretation of incoming text as exactly one [`Command`].
//!
//! Parsing is pure: it looks at the text, the chat's pending mode and the
//! button vocabulary, and never touches storage or the network.

use std::collections::HashMap;

use crate::dialogue::AssistantDialogueState;
use crate::localization::LocalizationManager;
use crate::reminders::{looks_like_reminder, parse_reminder, ReminderParseError};
use crate::storage::{Mood, Reminder, SkinType};
use crate::validation::parse_user_id_argument;

/// Reply-keyboard buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MenuButton {
    Reminder,
    Personalization,
    Analysis,
    Mood,
    ReplyFormat,
    History,
    Fact,
    Consultation,
    FormatText,
    FormatVoice,
    MoodGood,
    MoodNormal,
    MoodBad,
    Back,
}

impl MenuButton {
    pub const ALL: [MenuButton; 14] = [
        MenuButton::Reminder,
        MenuButton::Personalization,
        MenuButton::Analysis,
        MenuButton::Mood,
        MenuButton::ReplyFormat,
        MenuButton::History,
        MenuButton::Fact,
        MenuButton::Consultation,
        MenuButton::FormatText,
        MenuButton::FormatVoice,
        MenuButton::MoodGood,
        MenuButton::MoodNormal,
        MenuButton::MoodBad,
        MenuButton::Back,
    ];

    /// Buttons of the main keyboard, in display order
    pub const MAIN_MENU: [MenuButton; 8] = [
        MenuButton::Reminder,
        MenuButton::Personalization,
        MenuButton::Analysis,
        MenuButton::Mood,
        MenuButton::ReplyFormat,
        MenuButton::History,
        MenuButton::Fact,
        MenuButton::Consultation,
    ];

    /// Localization key of the caption
    pub fn message_key(&self) -> &'static str {
        match self {
            MenuButton::Reminder => "btn-reminder",
            MenuButton::Personalization => "btn-personalization",
            MenuButton::Analysis => "btn-analysis",
            MenuButton::Mood => "btn-mood",
            MenuButton::ReplyFormat => "btn-reply-format",
            MenuButton::History => "btn-history",
            MenuButton::Fact => "btn-fact",
            MenuButton::Consultation => "btn-consultation",
            MenuButton::FormatText => "btn-format-text",
            MenuButton::FormatVoice => "btn-format-voice",
            MenuButton::MoodGood => "btn-mood-good",
            MenuButton::MoodNormal => "btn-mood-normal",
            MenuButton::MoodBad => "btn-mood-bad",
            MenuButton::Back => "btn-back",
        }
    }

    /// Label used in logs and metrics
    pub fn as_str(&self) -> &'static str {
        self.message_key().trim_start_matches("btn-")
    }
}

/// Button captions and free-text keywords of the user's language
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    buttons: HashMap<String, MenuButton>,
    format_keywords: Vec<(String, bool)>,
    mood_keywords: Vec<(String, Mood)>,
}

impl Vocabulary {
    /// Build the vocabulary for `language`, also accepting the default
    /// language's captions
    pub fn for_language(localization: &LocalizationManager, language: &str) -> Self {
        let mut vocabulary = Self::default();
        let mut languages = vec![language];
        if localization.default_language() != language {
            languages.push(localization.default_language());
        }

        for lang in languages {
            for button in MenuButton::ALL {
                let caption =
                    localization.get_message_in_language(button.message_key(), lang, None);
                vocabulary.buttons.entry(caption).or_insert(button);
            }

            // Voice first: "голосом, не текстом" should pick voice
            for (key, voice) in [("keyword-format-voice", true), ("keyword-format-text", false)] {
                let keyword = localization.get_message_in_language(key, lang, None);
                vocabulary.format_keywords.push((keyword.to_lowercase(), voice));
            }
            for (key, mood) in [
                ("keyword-mood-good", Mood::Good),
                ("keyword-mood-normal", Mood::Normal),
                ("keyword-mood-bad", Mood::Bad),
            ] {
                let keyword = localization.get_message_in_language(key, lang, None);
                vocabulary.mood_keywords.push((keyword.to_lowercase(), mood));
            }
        }

        vocabulary
    }

    /// Build a vocabulary from explicit captions
    pub fn from_captions(
        buttons: impl IntoIterator<Item = (String, MenuButton)>,
        format_keywords: impl IntoIterator<Item = (String, bool)>,
        mood_keywords: impl IntoIterator<Item = (String, Mood)>,
    ) -> Self {
        Self {
            buttons: buttons.into_iter().collect(),
            format_keywords: format_keywords
                .into_iter()
                .map(|(k, v)| (k.to_lowercase(), v))
                .collect(),
            mood_keywords: mood_keywords
                .into_iter()
                .map(|(k, v)| (k.to_lowercase(), v))
                .collect(),
        }
    }

    /// Exact, case-sensitive caption lookup
    pub fn button(&self, text: &str) -> Option<MenuButton> {
        self.buttons.get(text).copied()
    }

    fn reply_format_in(&self, text: &str) -> Option<bool> {
        let lowered = text.to_lowercase();
        self.format_keywords
            .iter()
            .find(|(keyword, _)| !keyword.is_empty() && lowered.contains(keyword.as_str()))
            .map(|(_, voice)| *voice)
    }

    fn mood_in(&self, text: &str) -> Option<Mood> {
        let lowered = text.to_lowercase();
        self.mood_keywords
            .iter()
            .find(|(keyword, _)| !keyword.is_empty() && lowered.contains(keyword.as_str()))
            .map(|(_, mood)| *mood)
    }
}

/// Everything a single incoming text can mean
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    /// Admin statistics
    Stats,
    /// Grant admin rights; `None` when the argument is missing or invalid
    AddAdmin(Option<i64>),
    /// Unrecognized slash command
    UnknownCommand(String),
    /// Main-menu button: open a flow or answer directly
    Menu(MenuButton),
    SetReplyFormat { voice: bool },
    SetMood(Mood),
    SetSkinType(SkinType),
    InvalidSkinType,
    AddReminder(Reminder),
    InvalidReminder(ReminderParseError),
    Analyze(String),
    Consult(String),
}

impl Command {
    /// Label used in logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Command::Start => "start",
            Command::Help => "help",
            Command::Stats => "stats",
            Command::AddAdmin(_) => "add_admin",
            Command::UnknownCommand(_) => "unknown_command",
            Command::Menu(_) => "menu",
            Command::SetReplyFormat { .. } => "set_reply_format",
            Command::SetMood(_) => "set_mood",
            Command::SetSkinType(_) => "set_skin_type",
            Command::InvalidSkinType => "invalid_skin_type",
            Command::AddReminder(_) => "add_reminder",
            Command::InvalidReminder(_) => "invalid_reminder",
            Command::Analyze(_) => "analyze",
            Command::Consult(_) => "consult",
        }
    }
}

fn parse_slash_command(text: &str) -> Command {
    let head = text.split_whitespace().next().unwrap_or(text);
    // "/start@SomeBot" addresses the bot explicitly in groups
    let name = head.split('@').next().unwrap_or(head);

    match name {
        "/start" => Command::Start,
        "/help" => Command::Help,
        "/stats" => Command::Stats,
        "/addadmin" => Command::AddAdmin(parse_user_id_argument(text)),
        other => Command::UnknownCommand(other.to_string()),
    }
}

fn reminder_command(text: &str) -> Command {
    match parse_reminder(text) {
        Ok(reminder) => Command::AddReminder(reminder),
        Err(e) => Command::InvalidReminder(e),
    }
}

fn idle_command(text: &str) -> Command {
    if looks_like_reminder(text) {
        reminder_command(text)
    } else {
        Command::Consult(text.to_string())
    }
}

/// Decide what `text` means in the current pending mode
///
/// Slash commands and button captions always win over the pending mode.
pub fn parse_command(
    text: &str,
    state: &AssistantDialogueState,
    vocabulary: &Vocabulary,
) -> Command {
    if text.starts_with('/') {
        return parse_slash_command(text);
    }

    if let Some(button) = vocabulary.button(text) {
        return match button {
            MenuButton::FormatText => Command::SetReplyFormat { voice: false },
            MenuButton::FormatVoice => Command::SetReplyFormat { voice: true },
            MenuButton::MoodGood => Command::SetMood(Mood::Good),
            MenuButton::MoodNormal => Command::SetMood(Mood::Normal),
            MenuButton::MoodBad => Command::SetMood(Mood::Bad),
            other => Command::Menu(other),
        };
    }

    match state {
        AssistantDialogueState::AwaitingSkinType => match SkinType::from_user_input(text) {
            Some(skin) => Command::SetSkinType(skin),
            None => Command::InvalidSkinType,
        },
        AssistantDialogueState::AwaitingReminder => reminder_command(text),
        AssistantDialogueState::AwaitingIngredients => Command::Analyze(text.to_string()),
        AssistantDialogueState::AwaitingReplyFormat => match vocabulary.reply_format_in(text) {
            Some(voice) => Command::SetReplyFormat { voice },
            None => idle_command(text),
        },
        AssistantDialogueState::AwaitingMood => match vocabulary.mood_in(text) {
            Some(mood) => Command::SetMood(mood),
            None => idle_command(text),
        },
        AssistantDialogueState::AwaitingConsultation | AssistantDialogueState::Idle => {
            idle_command(text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocabulary() -> Vocabulary {
        Vocabulary::from_captions(
            [
                ("📆 Напоминание".to_string(), MenuButton::Reminder),
                ("🔊 Голос".to_string(), MenuButton::FormatVoice),
            ],
            [("Голос".to_string(), true), ("Текст".to_string(), false)],
            [("Плохо".to_string(), Mood::Bad)],
        )
    }

    #[test]
    fn test_button_wins_over_pending_mode() {
        let command = parse_command(
            "📆 Напоминание",
            &AssistantDialogueState::AwaitingIngredients,
            &vocabulary(),
        );
        assert_eq!(command, Command::Menu(MenuButton::Reminder));
    }

    #[test]
    fn test_button_match_is_case_sensitive() {
        let command = parse_command("📆 напоминание", &AssistantDialogueState::Idle, &vocabulary());
        assert_eq!(command, Command::Consult("📆 напоминание".to_string()));
    }

    #[test]
    fn test_slash_command_with_bot_suffix() {
        let command = parse_command(
            "/start@CosmoBot",
            &AssistantDialogueState::Idle,
            &vocabulary(),
        );
        assert_eq!(command, Command::Start);
    }

    #[test]
    fn test_reply_format_keyword_contains() {
        let command = parse_command(
            "давай голосом",
            &AssistantDialogueState::AwaitingReplyFormat,
            &vocabulary(),
        );
        assert_eq!(command, Command::SetReplyFormat { voice: true });
    }

    #[test]
    fn test_button_labels() {
        assert_eq!(MenuButton::ReplyFormat.as_str(), "reply-format");
        assert_eq!(Command::Consult(String::new()).kind(), "consult");
    }
}
