//! Text-to-speech for users who prefer voice replies.
//!
//! The production backend talks to the public Google Translate TTS endpoint:
//! text is split into short chunks, every chunk comes back as MP3 and the
//! chunks are concatenated into one clip.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::config::SpeechConfig;
use crate::errors::{AppError, AppResult};
use crate::observability;
use crate::storage::Settings;

/// Longest chunk accepted by the TTS endpoint
pub const MAX_CHUNK_CHARS: usize = 200;

/// Source of synthesized audio
pub trait SpeechBackend: Send + Sync + 'static {
    fn synthesize(
        &self,
        text: &str,
        language: &str,
    ) -> impl Future<Output = AppResult<Vec<u8>>> + Send;
}

/// Split text into chunks of at most `max_chars` characters on whitespace
///
/// Words longer than `max_chars` are cut into pieces.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if word_len > max_chars {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let chars: Vec<char> = word.chars().collect();
            for piece in chars.chunks(max_chars) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }

        let needed = if current.is_empty() {
            word_len
        } else {
            current_len + 1 + word_len
        };
        if needed > max_chars {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if !current.is_empty() {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(word);
        current_len += word_len;
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Google Translate TTS backend
#[derive(Debug, Clone)]
pub struct GoogleTts {
    client: reqwest::Client,
    endpoint: String,
}

impl GoogleTts {
    pub fn new(endpoint: &str, timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build TTS HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }
}

impl SpeechBackend for GoogleTts {
    async fn synthesize(&self, text: &str, language: &str) -> AppResult<Vec<u8>> {
        let chunks = chunk_text(text, MAX_CHUNK_CHARS);
        if chunks.is_empty() {
            return Err(AppError::Speech("nothing to synthesize".to_string()));
        }

        let total = chunks.len().to_string();
        let mut audio = Vec::new();

        for (idx, chunk) in chunks.iter().enumerate() {
            let idx = idx.to_string();
            let textlen = chunk.chars().count().to_string();
            let response = self
                .client
                .get(&self.endpoint)
                .query(&[
                    ("ie", "UTF-8"),
                    ("client", "tw-ob"),
                    ("tl", language),
                    ("q", chunk.as_str()),
                    ("total", total.as_str()),
                    ("idx", idx.as_str()),
                    ("textlen", textlen.as_str()),
                ])
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                return Err(AppError::Speech(format!(
                    "TTS endpoint returned {} for chunk {}",
                    status, idx
                )));
            }
            audio.extend_from_slice(&response.bytes().await?);
        }

        if audio.is_empty() {
            return Err(AppError::Speech("TTS endpoint returned no audio".to_string()));
        }
        Ok(audio)
    }
}

/// A reply ready to be sent to Telegram
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreparedReply {
    Text(String),
    /// Voice clip on disk plus the text it was made from
    Voice { path: PathBuf, text: String },
}

/// Turns replies into voice clips for voice-enabled users
#[derive(Debug)]
pub struct SpeechSynthesizer<B> {
    backend: B,
    language: String,
    temp_dir: PathBuf,
}

impl SpeechSynthesizer<GoogleTts> {
    /// Synthesizer backed by the configured Google TTS endpoint
    pub fn from_config(config: &SpeechConfig, timeout: Duration) -> AppResult<Self> {
        Ok(Self::new(
            GoogleTts::new(&config.endpoint, timeout)?,
            &config.language,
            &config.temp_dir,
        ))
    }
}

impl<B: SpeechBackend> SpeechSynthesizer<B> {
    pub fn new(backend: B, language: &str, temp_dir: &Path) -> Self {
        Self {
            backend,
            language: language.to_string(),
            temp_dir: temp_dir.to_path_buf(),
        }
    }

    /// Where the clip for a user is written
    pub fn voice_path(&self, user_id: i64) -> PathBuf {
        self.temp_dir.join(format!("{}_voice.ogg", user_id))
    }

    /// Synthesize `text` into the user's clip file, overwriting any older clip
    pub async fn synthesize_to_file(&self, user_id: i64, text: &str) -> AppResult<PathBuf> {
        let audio = self.backend.synthesize(text, &self.language).await?;
        let path = self.voice_path(user_id);
        tokio::fs::write(&path, &audio).await?;
        debug!(
            user_id = %user_id,
            path = %path.display(),
            bytes = audio.len(),
            "Voice clip written"
        );
        Ok(path)
    }

    /// Decide between text and voice for this user
    ///
    /// Synthesis failures fall back to text so the answer is never lost.
    pub async fn prepare_reply(
        &self,
        user_id: i64,
        settings: &Settings,
        text: &str,
    ) -> PreparedReply {
        if !settings.voice {
            return PreparedReply::Text(text.to_string());
        }

        let started = Instant::now();
        match self.synthesize_to_file(user_id, text).await {
            Ok(path) => {
                let bytes = std::fs::metadata(&path).map(|m| m.len() as usize).unwrap_or(0);
                observability::record_tts_metrics(true, started.elapsed(), bytes);
                PreparedReply::Voice {
                    path,
                    text: text.to_string(),
                }
            }
            Err(e) => {
                observability::record_tts_metrics(false, started.elapsed(), 0);
                warn!(
                    user_id = %user_id,
                    error = %e,
                    "Speech synthesis failed, replying with text"
                );
                PreparedReply::Text(text.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunks_respect_limit() {
        let text = "слово ".repeat(100);
        let chunks = chunk_text(&text, MAX_CHUNK_CHARS);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= MAX_CHUNK_CHARS));
        assert_eq!(chunks.join(" "), text.trim());
    }

    #[test]
    fn test_long_word_is_split() {
        let word = "a".repeat(450);
        let chunks = chunk_text(&word, MAX_CHUNK_CHARS);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].len(), 50);
    }

    #[test]
    fn test_blank_text_has_no_chunks() {
        assert!(chunk_text("  \n ", MAX_CHUNK_CHARS).is_empty());
    }

    #[test]
    fn test_short_text_is_one_chunk() {
        assert_eq!(chunk_text("Привет, как дела?", 200), vec!["Привет, как дела?"]);
    }
}
