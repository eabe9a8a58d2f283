//! Answering ingredient analyses and consultations
//!
//! Everything between a validated question and the reply that goes back to
//! the chat: prompt context, the completion call, history and the text or
//! voice decision. Telegram itself is not touched here.

use anyhow::Result;
use chrono::Local;
use std::sync::Arc;
use tracing::info;

use crate::completion::{build_prompt, CompletionClient, PromptContext, PromptKind};
use crate::dialogue::{AssistantDialogue, AssistantDialogueState};
use crate::speech::{PreparedReply, SpeechBackend, SpeechSynthesizer};
use crate::storage::{run_blocking, StateStore};

/// Answer `question` for `user_id` and return the dialogue to `Idle`
///
/// The exchange is recorded in history even when the completion failed and
/// the answer is the apology reply.
pub async fn answer_question<B: SpeechBackend>(
    store: &Arc<StateStore>,
    completion: &CompletionClient,
    speech: &SpeechSynthesizer<B>,
    dialogue: &AssistantDialogue,
    user_id: i64,
    kind: PromptKind,
    question: &str,
) -> Result<PreparedReply> {
    let settings = store.settings(user_id);
    let context = PromptContext {
        skin: store.profile(user_id).and_then(|profile| profile.skin),
        mood: settings.mood,
    };
    let prompt = build_prompt(kind, question, &context);

    let answer = completion.complete(user_id, &prompt).await;

    let entry_question = question.to_string();
    let entry_answer = answer.clone();
    let at = Local::now().naive_local();
    run_blocking(store, move |store| {
        store.append_history(user_id, &entry_question, &entry_answer, at)
    })
    .await?;
    dialogue.update(AssistantDialogueState::Idle).await?;

    info!(
        user_id = %user_id,
        kind = ?kind,
        answer_chars = answer.chars().count(),
        "Question answered"
    );

    Ok(speech.prepare_reply(user_id, &settings, &answer).await)
}
