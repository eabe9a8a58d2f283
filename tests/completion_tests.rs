//! # Completion Client Tests
//!
//! Runs the completion client against a local hyper server standing in for
//! the chat completion endpoint: a successful answer, error statuses,
//! malformed bodies and an unreachable endpoint. The same server backs the
//! full question-answering path from prompt to history and reply.

use cosmo_assistant::bot::consultation::answer_question;
use cosmo_assistant::completion::{CompletionClient, PromptKind, COMPLETION_ERROR_MARKER};
use cosmo_assistant::config::CompletionConfig;
use cosmo_assistant::dialogue::{AssistantDialogue, AssistantDialogueState};
use cosmo_assistant::errors::{AppError, AppResult};
use cosmo_assistant::speech::{PreparedReply, SpeechBackend, SpeechSynthesizer};
use cosmo_assistant::storage::{Mood, SkinType, StateStore, HISTORY_LIMIT};
use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::Arc;
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::types::ChatId;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Serve every request with the given status and body, recording the
/// Authorization header of each request
async fn start_fake_endpoint(
    status: u16,
    body: &'static str,
) -> (SocketAddr, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind fake endpoint");
    let addr = listener.local_addr().unwrap();
    let seen_auth = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&seen_auth);

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            let recorder = Arc::clone(&recorder);
            tokio::spawn(async move {
                let service = hyper::service::service_fn(
                    move |req: hyper::Request<hyper::body::Incoming>| {
                        let auth = req
                            .headers()
                            .get("authorization")
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or_default()
                            .to_string();
                        recorder.lock().push(auth);

                        let mut response = hyper::Response::new(body.to_string());
                        *response.status_mut() = hyper::StatusCode::from_u16(status).unwrap();
                        response.headers_mut().insert(
                            "content-type",
                            hyper::header::HeaderValue::from_static("application/json"),
                        );
                        async move { Ok::<_, std::convert::Infallible>(response) }
                    },
                );
                let _ = http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), service)
                    .await;
            });
        }
    });

    (addr, seen_auth)
}

fn client_for(endpoint: String) -> CompletionClient {
    CompletionClient::new(&CompletionConfig {
        api_key: "test-key".to_string(),
        endpoint,
        model: "test/model".to_string(),
        timeout_secs: 5,
    })
    .expect("Failed to build completion client")
}

/// Speech backend that is never reachable
struct OfflineSpeech;

impl SpeechBackend for OfflineSpeech {
    async fn synthesize(&self, _text: &str, _language: &str) -> AppResult<Vec<u8>> {
        Err(AppError::Speech("offline".to_string()))
    }
}

/// Store, synthesizer and a dialogue waiting for a consultation
async fn consultation_setup() -> (
    TempDir,
    Arc<StateStore>,
    SpeechSynthesizer<OfflineSpeech>,
    AssistantDialogue,
) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let store = Arc::new(StateStore::open(dir.path()).expect("Failed to open store"));
    let speech = SpeechSynthesizer::new(OfflineSpeech, "ru", dir.path());
    let dialogue = AssistantDialogue::new(InMemStorage::new(), ChatId(1));
    dialogue
        .update(AssistantDialogueState::AwaitingConsultation)
        .await
        .unwrap();
    (dir, store, speech, dialogue)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUCCESS_BODY: &str = concat!(
        r#"{"choices":[{"message":{"role":"assistant","#,
        r#""content":"  Используй мягкое очищение.  "}}]}"#
    );

    #[tokio::test]
    async fn test_successful_completion_returns_first_choice() {
        let (addr, seen_auth) = start_fake_endpoint(200, SUCCESS_BODY).await;
        let client = client_for(format!("http://{}/v1/chat/completions", addr));

        let reply = client.try_complete("Как умываться?").await.unwrap();
        assert_eq!(reply, "Используй мягкое очищение.");
        assert_eq!(seen_auth.lock().clone(), vec!["Bearer test-key".to_string()]);

        let reply = client.complete(1, "Как умываться?").await;
        assert!(!reply.contains(COMPLETION_ERROR_MARKER));
    }

    #[tokio::test]
    async fn test_error_status_yields_marker() {
        let (addr, _) = start_fake_endpoint(500, r#"{"error":"boom"}"#).await;
        let client = client_for(format!("http://{}/", addr));

        assert!(client.try_complete("q").await.is_err());
        let reply = client.complete(1, "q").await;
        assert!(reply.contains(COMPLETION_ERROR_MARKER));
    }

    #[tokio::test]
    async fn test_quota_error_yields_marker() {
        let (addr, _) = start_fake_endpoint(429, r#"{"error":"quota"}"#).await;
        let client = client_for(format!("http://{}/", addr));

        assert!(client.complete(1, "q").await.contains(COMPLETION_ERROR_MARKER));
    }

    #[tokio::test]
    async fn test_malformed_body_yields_marker() {
        let (addr, _) = start_fake_endpoint(200, "not json at all").await;
        let client = client_for(format!("http://{}/", addr));

        assert!(client.complete(1, "q").await.contains(COMPLETION_ERROR_MARKER));
    }

    #[tokio::test]
    async fn test_empty_choices_yield_marker() {
        let (addr, _) = start_fake_endpoint(200, r#"{"choices":[]}"#).await;
        let client = client_for(format!("http://{}/", addr));

        assert!(client.complete(1, "q").await.contains(COMPLETION_ERROR_MARKER));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_yields_marker() {
        // Bind and drop to get a port nobody listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = client_for(format!("http://{}/", addr));
        assert!(client.complete(1, "q").await.contains(COMPLETION_ERROR_MARKER));
    }

    #[tokio::test]
    async fn test_answered_question_is_recorded_and_dialogue_reset() {
        let (addr, _) = start_fake_endpoint(200, SUCCESS_BODY).await;
        let client = client_for(format!("http://{}/", addr));
        let (_dir, store, speech, dialogue) = consultation_setup().await;
        store.set_skin_type(1, SkinType::Dry).unwrap();
        store.set_mood(1, Mood::Bad).unwrap();

        let reply = answer_question(
            &store,
            &client,
            &speech,
            &dialogue,
            1,
            PromptKind::Consultation,
            "Как умываться?",
        )
        .await
        .unwrap();

        assert_eq!(
            reply,
            PreparedReply::Text("Используй мягкое очищение.".to_string())
        );
        let history = store.recent_history(1, HISTORY_LIMIT);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].question, "Как умываться?");
        assert_eq!(history[0].answer, "Используй мягкое очищение.");
        assert_eq!(
            dialogue.get().await.unwrap(),
            Some(AssistantDialogueState::Idle)
        );
    }

    #[tokio::test]
    async fn test_failed_completion_is_still_recorded() {
        let (addr, _) = start_fake_endpoint(500, r#"{"error":"boom"}"#).await;
        let client = client_for(format!("http://{}/", addr));
        let (dir, store, speech, dialogue) = consultation_setup().await;

        let reply = answer_question(
            &store,
            &client,
            &speech,
            &dialogue,
            1,
            PromptKind::IngredientAnalysis,
            "aqua, glycerin",
        )
        .await
        .unwrap();

        match reply {
            PreparedReply::Text(text) => assert!(text.contains(COMPLETION_ERROR_MARKER)),
            other => panic!("expected a text reply, got {:?}", other),
        }
        let reopened = StateStore::open(dir.path()).unwrap();
        let history = reopened.recent_history(1, HISTORY_LIMIT);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].question, "aqua, glycerin");
        assert!(history[0].answer.contains(COMPLETION_ERROR_MARKER));
        assert_eq!(
            dialogue.get().await.unwrap(),
            Some(AssistantDialogueState::Idle)
        );
    }

    #[tokio::test]
    async fn test_voice_user_falls_back_to_text_when_speech_is_offline() {
        let (addr, _) = start_fake_endpoint(200, SUCCESS_BODY).await;
        let client = client_for(format!("http://{}/", addr));
        let (_dir, store, speech, dialogue) = consultation_setup().await;
        store.set_voice(1, true).unwrap();

        let reply = answer_question(
            &store,
            &client,
            &speech,
            &dialogue,
            1,
            PromptKind::Consultation,
            "SPF зимой?",
        )
        .await
        .unwrap();

        assert_eq!(
            reply,
            PreparedReply::Text("Используй мягкое очищение.".to_string())
        );
    }
}
