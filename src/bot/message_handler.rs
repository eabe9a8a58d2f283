//! Message Handler module for processing incoming Telegram messages

use anyhow::Result;
use std::sync::Arc;
use std::time::Instant;
use teloxide::prelude::*;
use teloxide::types::KeyboardMarkup;
use tracing::{debug, error, info, Instrument};

use super::command_handlers::{
    handle_add_admin_command, handle_help_command, handle_start_command, handle_stats_command,
    handle_unsupported_message,
};
use super::consultation::answer_question;
use super::reply::{send_prepared_reply, send_text};
use super::ui_builder::{
    create_main_menu_keyboard, create_mood_keyboard, create_reply_format_keyboard, format_history,
};
use super::{BotDeps, HandlerContext};

use crate::command::{parse_command, Command, MenuButton, Vocabulary};
use crate::completion::PromptKind;
use crate::dialogue::{AssistantDialogue, AssistantDialogueState};
use crate::errors::error_logging;
use crate::facts::next_fact;
use crate::observability;
use crate::storage::{run_blocking, HISTORY_LIMIT};
use crate::validation::{validate_prompt_text, MAX_PROMPT_CHARS};

/// Entry point for every message update
pub async fn message_handler(
    bot: Bot,
    msg: Message,
    dialogue: AssistantDialogue,
    deps: BotDeps,
) -> Result<()> {
    let Some(user) = msg.from.as_ref() else {
        debug!(chat_id = %msg.chat.id, "Ignoring message without sender");
        return Ok(());
    };

    let user_id = user.id.0 as i64;
    let language = deps
        .localization
        .detect_language(user.language_code.as_deref());
    let display_name = user.full_name();

    let span = observability::telegram_span("handle_message", Some(user_id));

    async {
        let ctx = HandlerContext {
            bot: &bot,
            deps: &deps,
            chat_id: msg.chat.id,
            user_id,
            language: &language,
        };

        let Some(text) = msg.text() else {
            observability::record_telegram_message("unsupported");
            return handle_unsupported_message(&ctx).await;
        };
        observability::record_telegram_message("text");

        let state = dialogue.get().await?.unwrap_or_default();
        let vocabulary = Vocabulary::for_language(&deps.localization, &language);
        let command = parse_command(text, &state, &vocabulary);
        let kind = command.kind();

        debug!(user_id = %user_id, state = %state.as_str(), command = %kind, "Parsed message");

        let started = Instant::now();
        let result = execute_command(&ctx, &dialogue, command, &display_name).await;
        observability::record_request_metrics(kind, result.is_ok(), started.elapsed());

        if let Err(e) = result {
            error!(user_id = %user_id, command = %kind, error = %e, "Failed to handle message");
            bot.send_message(msg.chat.id, ctx.t("error-storage")).await?;
        }
        Ok(())
    }
    .instrument(span)
    .await
}

async fn reply_with_keyboard(
    ctx: &HandlerContext<'_>,
    text: String,
    keyboard: KeyboardMarkup,
) -> Result<()> {
    ctx.bot
        .send_message(ctx.chat_id, text)
        .reply_markup(keyboard)
        .await?;
    Ok(())
}

async fn reply_with_main_menu(ctx: &HandlerContext<'_>, text: String) -> Result<()> {
    let keyboard = create_main_menu_keyboard(&ctx.deps.localization, ctx.language);
    send_text(ctx.bot, ctx.chat_id, text, keyboard).await
}

/// Run one parsed command and move the dialogue to its next state
async fn execute_command(
    ctx: &HandlerContext<'_>,
    dialogue: &AssistantDialogue,
    command: Command,
    display_name: &str,
) -> Result<()> {
    let store = &ctx.deps.store;
    let user_id = ctx.user_id;

    match command {
        Command::Start => {
            dialogue.update(AssistantDialogueState::Idle).await?;
            handle_start_command(ctx, display_name).await
        }
        Command::Help | Command::UnknownCommand(_) => handle_help_command(ctx).await,
        Command::Stats => handle_stats_command(ctx).await,
        Command::AddAdmin(target) => handle_add_admin_command(ctx, target).await,
        Command::Menu(button) => handle_menu_button(ctx, dialogue, button).await,
        Command::SetReplyFormat { voice } => {
            run_blocking(store, move |store| store.set_voice(user_id, voice)).await?;
            dialogue.update(AssistantDialogueState::Idle).await?;
            info!(user_id = %ctx.user_id, voice = %voice, "Reply format updated");
            reply_with_main_menu(ctx, ctx.t("reply-format-saved")).await
        }
        Command::SetMood(mood) => {
            run_blocking(store, move |store| store.set_mood(user_id, mood)).await?;
            dialogue.update(AssistantDialogueState::Idle).await?;
            info!(user_id = %ctx.user_id, mood = ?mood, "Mood updated");
            reply_with_main_menu(ctx, ctx.t("mood-saved")).await
        }
        Command::SetSkinType(skin) => {
            run_blocking(store, move |store| store.set_skin_type(user_id, skin)).await?;
            dialogue.update(AssistantDialogueState::Idle).await?;
            let skin_name = ctx.t(skin.message_key());
            reply_with_main_menu(
                ctx,
                ctx.t_args("skin-type-saved", &[("skin", skin_name.as_str())]),
            )
            .await
        }
        Command::InvalidSkinType => {
            ctx.bot
                .send_message(ctx.chat_id, ctx.t("skin-type-invalid"))
                .await?;
            Ok(())
        }
        Command::AddReminder(reminder) => {
            let saved = reminder.clone();
            let count =
                run_blocking(store, move |store| store.add_reminder(user_id, saved)).await?;
            observability::record_reminder_created();
            dialogue.update(AssistantDialogueState::Idle).await?;
            info!(
                user_id = %ctx.user_id,
                time = %reminder.time,
                reminders = count,
                "Reminder added"
            );
            reply_with_main_menu(
                ctx,
                ctx.t_args(
                    "reminder-saved",
                    &[
                        ("time", reminder.time.as_str()),
                        ("text", reminder.text.as_str()),
                    ],
                ),
            )
            .await
        }
        Command::InvalidReminder(reason) => {
            debug!(user_id = %ctx.user_id, reason = %reason, "Rejected reminder input");
            ctx.bot
                .send_message(ctx.chat_id, ctx.t("reminder-invalid"))
                .await?;
            Ok(())
        }
        Command::Analyze(text) => {
            answer_with_completion(ctx, dialogue, PromptKind::IngredientAnalysis, &text).await
        }
        Command::Consult(text) => {
            answer_with_completion(ctx, dialogue, PromptKind::Consultation, &text).await
        }
    }
}

async fn handle_menu_button(
    ctx: &HandlerContext<'_>,
    dialogue: &AssistantDialogue,
    button: MenuButton,
) -> Result<()> {
    observability::record_menu_action(button.as_str());
    let localization = &ctx.deps.localization;

    match button {
        MenuButton::Reminder => {
            dialogue.update(AssistantDialogueState::AwaitingReminder).await?;
            ctx.bot.send_message(ctx.chat_id, ctx.t("ask-reminder")).await?;
        }
        MenuButton::Personalization => {
            dialogue.update(AssistantDialogueState::AwaitingSkinType).await?;
            ctx.bot.send_message(ctx.chat_id, ctx.t("ask-skin-type")).await?;
        }
        MenuButton::Analysis => {
            dialogue.update(AssistantDialogueState::AwaitingIngredients).await?;
            ctx.bot.send_message(ctx.chat_id, ctx.t("ask-ingredients")).await?;
        }
        MenuButton::Consultation => {
            dialogue.update(AssistantDialogueState::AwaitingConsultation).await?;
            ctx.bot.send_message(ctx.chat_id, ctx.t("ask-consultation")).await?;
        }
        MenuButton::Mood => {
            dialogue.update(AssistantDialogueState::AwaitingMood).await?;
            reply_with_keyboard(
                ctx,
                ctx.t("ask-mood"),
                create_mood_keyboard(localization, ctx.language),
            )
            .await?;
        }
        MenuButton::ReplyFormat => {
            dialogue.update(AssistantDialogueState::AwaitingReplyFormat).await?;
            reply_with_keyboard(
                ctx,
                ctx.t("ask-reply-format"),
                create_reply_format_keyboard(localization, ctx.language),
            )
            .await?;
        }
        MenuButton::History => {
            dialogue.update(AssistantDialogueState::Idle).await?;
            let entries = ctx.deps.store.recent_history(ctx.user_id, HISTORY_LIMIT);
            reply_with_main_menu(ctx, format_history(&entries, localization, ctx.language)).await?;
        }
        MenuButton::Fact => {
            dialogue.update(AssistantDialogueState::Idle).await?;
            let localization = Arc::clone(localization);
            let language = ctx.language.to_string();
            let user_id = ctx.user_id;
            let fact = run_blocking(&ctx.deps.store, move |store| {
                next_fact(store, &localization, user_id, &language)
            })
            .await?;
            reply_with_main_menu(ctx, fact).await?;
        }
        MenuButton::Back
        | MenuButton::FormatText
        | MenuButton::FormatVoice
        | MenuButton::MoodGood
        | MenuButton::MoodNormal
        | MenuButton::MoodBad => {
            dialogue.update(AssistantDialogueState::Idle).await?;
            reply_with_main_menu(ctx, ctx.t("main-menu")).await?;
        }
    }
    Ok(())
}

/// Validate the question, then answer it as text or voice
async fn answer_with_completion(
    ctx: &HandlerContext<'_>,
    dialogue: &AssistantDialogue,
    kind: PromptKind,
    text: &str,
) -> Result<()> {
    let question = match validate_prompt_text(text) {
        Ok(question) => question,
        Err(key) => {
            error_logging::log_validation_error(
                &key,
                "validate_prompt",
                Some(ctx.user_id),
                "prompt",
                text.chars().count(),
            );
            let max = MAX_PROMPT_CHARS.to_string();
            ctx.bot
                .send_message(ctx.chat_id, ctx.t_args(key, &[("max", max.as_str())]))
                .await?;
            return Ok(());
        }
    };

    ctx.bot.send_message(ctx.chat_id, ctx.t("thinking")).await?;

    let deps = ctx.deps;
    let reply = answer_question(
        &deps.store,
        &deps.completion,
        deps.speech.as_ref(),
        dialogue,
        ctx.user_id,
        kind,
        question,
    )
    .await?;

    let keyboard = create_main_menu_keyboard(&deps.localization, ctx.language);
    send_prepared_reply(ctx.bot, ctx.chat_id, reply, keyboard).await
}
