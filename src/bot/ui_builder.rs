//! UI Builder module for creating reply keyboards and formatting messages

use teloxide::types::{KeyboardButton, KeyboardMarkup};

use crate::command::MenuButton;
use crate::localization::LocalizationManager;
use crate::storage::HistoryEntry;

/// Longest answer preview shown in the history list
pub const HISTORY_ANSWER_PREVIEW_CHARS: usize = 600;

fn button(
    localization: &LocalizationManager,
    menu_button: MenuButton,
    language: &str,
) -> KeyboardButton {
    KeyboardButton::new(localization.get_message_in_language(
        menu_button.message_key(),
        language,
        None,
    ))
}

/// Main menu: eight buttons, two per row
pub fn create_main_menu_keyboard(
    localization: &LocalizationManager,
    language: &str,
) -> KeyboardMarkup {
    let rows: Vec<Vec<KeyboardButton>> = MenuButton::MAIN_MENU
        .chunks(2)
        .map(|pair| {
            pair.iter()
                .map(|b| button(localization, *b, language))
                .collect()
        })
        .collect();

    KeyboardMarkup::new(rows).resize_keyboard()
}

/// Text / voice choice plus the way back
pub fn create_reply_format_keyboard(
    localization: &LocalizationManager,
    language: &str,
) -> KeyboardMarkup {
    KeyboardMarkup::new(vec![
        vec![
            button(localization, MenuButton::FormatText, language),
            button(localization, MenuButton::FormatVoice, language),
        ],
        vec![button(localization, MenuButton::Back, language)],
    ])
    .resize_keyboard()
}

/// Mood choice plus the way back
pub fn create_mood_keyboard(localization: &LocalizationManager, language: &str) -> KeyboardMarkup {
    KeyboardMarkup::new(vec![
        vec![
            button(localization, MenuButton::MoodGood, language),
            button(localization, MenuButton::MoodNormal, language),
            button(localization, MenuButton::MoodBad, language),
        ],
        vec![button(localization, MenuButton::Back, language)],
    ])
    .resize_keyboard()
}

fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max_chars).collect();
    cut.push('…');
    cut
}

/// Format history entries oldest first, question above answer
pub fn format_history(
    entries: &[HistoryEntry],
    localization: &LocalizationManager,
    language: &str,
) -> String {
    if entries.is_empty() {
        return localization.get_message_in_language("history-empty", language, None);
    }

    entries
        .iter()
        .map(|entry| {
            format!(
                "{}\n{}",
                localization.get_message_with_args_in_language(
                    "history-question",
                    language,
                    &[("question", entry.question.as_str())],
                ),
                localization.get_message_with_args_in_language(
                    "history-answer",
                    language,
                    &[(
                        "answer",
                        preview(&entry.answer, HISTORY_ANSWER_PREVIEW_CHARS).as_str(),
                    )],
                ),
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_keeps_short_text() {
        assert_eq!(preview("коротко", 10), "коротко");
    }

    #[test]
    fn test_preview_cuts_on_characters() {
        assert_eq!(preview("абвгд", 3), "абв…");
    }
}
