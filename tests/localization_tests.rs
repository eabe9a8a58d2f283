//! # Localization Tests
//!
//! This module contains unit tests for the localization functionality,
//! testing message retrieval, argument formatting and language detection.

use cosmo_assistant::command::MenuButton;
use cosmo_assistant::localization::{
    create_localization_manager, create_localization_manager_with_default, t_args_lang, t_lang,
    LocalizationManager,
};
use std::collections::HashMap;
use std::sync::Arc;

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_localization() -> Arc<LocalizationManager> {
        create_localization_manager().expect("Failed to create localization manager")
    }

    #[test]
    fn test_russian_button_captions() {
        let manager = setup_localization();

        assert_eq!(
            manager.get_message_in_language("btn-reminder", "ru", None),
            "📆 Напоминание"
        );
        assert_eq!(
            manager.get_message_in_language("btn-consultation", "ru", None),
            "💬 Консультация"
        );
        assert_eq!(manager.get_message_in_language("btn-back", "ru", None), "🔙 Меню");
    }

    #[test]
    fn test_every_button_has_caption_in_every_language() {
        let manager = setup_localization();

        for language in ["ru", "en"] {
            for button in MenuButton::ALL {
                let caption = manager.get_message_in_language(button.message_key(), language, None);
                assert!(
                    !caption.starts_with("Missing"),
                    "{} missing in {}",
                    button.message_key(),
                    language
                );
            }
        }
    }

    #[test]
    fn test_get_message_nonexistent_key() {
        let manager = setup_localization();

        let message = manager.get_message_in_language("nonexistent-key", "en", None);
        assert!(message.starts_with("Missing translation:"));
    }

    #[test]
    fn test_unsupported_language_falls_back_to_default() {
        let manager = setup_localization();

        let message = manager.get_message_in_language("btn-fact", "de", None);
        assert_eq!(message, "💡 Факт");
    }

    #[test]
    fn test_arguments_without_isolation_marks() {
        let manager = setup_localization();

        let mut args = HashMap::new();
        args.insert("text", "нанести крем");
        let message = manager.get_message_in_language("reminder-notification", "ru", Some(&args));
        assert_eq!(message, "🔔 Напоминание: нанести крем");
    }

    #[test]
    fn test_reminder_saved_formatting() {
        let manager = setup_localization();

        let message = t_args_lang(
            &manager,
            "reminder-saved",
            &[("time", "21:00"), ("text", "крем")],
            Some("ru"),
        );
        assert!(message.contains("21:00"));
        assert!(message.contains("крем"));
    }

    #[test]
    fn test_detect_language() {
        let manager = setup_localization();

        assert_eq!(manager.detect_language(Some("en-US")), "en");
        assert_eq!(manager.detect_language(Some("ru")), "ru");
        assert_eq!(manager.detect_language(Some("fr")), "ru");
        assert_eq!(manager.detect_language(None), "ru");
    }

    #[test]
    fn test_t_lang_uses_detected_language() {
        let manager = setup_localization();

        assert_eq!(t_lang(&manager, "btn-fact", Some("en")), "💡 Fact");
        assert_eq!(t_lang(&manager, "btn-fact", None), "💡 Факт");
    }

    #[test]
    fn test_custom_default_language() {
        let manager = create_localization_manager_with_default("en").unwrap();
        assert_eq!(manager.detect_language(Some("fr")), "en");

        assert!(create_localization_manager_with_default("xx").is_err());
    }
}
