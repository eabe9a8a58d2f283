//! Delivery of prepared replies as text or voice messages

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{InputFile, KeyboardMarkup};
use tracing::{debug, warn};

use crate::speech::PreparedReply;

/// Longest text Telegram accepts in one message, in UTF-16 code units
pub const TELEGRAM_MESSAGE_LIMIT: usize = 4096;

/// Split `text` into pieces of at most `max_units` UTF-16 code units
///
/// Pieces break after the last newline that fits, otherwise between
/// characters. Concatenating the pieces gives back `text`.
pub fn split_message(text: &str, max_units: usize) -> Vec<String> {
    // A surrogate pair needs two units
    let max_units = max_units.max(2);
    let mut pieces = Vec::new();
    let mut rest = text;

    loop {
        let mut units = 0;
        let mut window_end = rest.len();
        for (index, c) in rest.char_indices() {
            units += c.len_utf16();
            if units > max_units {
                window_end = index;
                break;
            }
        }
        if window_end == rest.len() {
            break;
        }

        let cut = rest[..window_end]
            .rfind('\n')
            .map(|newline| newline + 1)
            .filter(|&end| !rest[..end].trim().is_empty())
            .unwrap_or(window_end);
        pieces.push(rest[..cut].to_string());
        rest = &rest[cut..];
    }

    if !rest.is_empty() || pieces.is_empty() {
        pieces.push(rest.to_string());
    }
    pieces
}

/// Send text as consecutive messages within Telegram's limit; the keyboard
/// is attached to the last one
pub async fn send_text(
    bot: &Bot,
    chat_id: ChatId,
    text: String,
    keyboard: KeyboardMarkup,
) -> Result<()> {
    let pieces = split_message(&text, TELEGRAM_MESSAGE_LIMIT);
    if pieces.len() > 1 {
        debug!(chat_id = %chat_id, pieces = pieces.len(), "Splitting long reply");
    }

    let last = pieces.len().saturating_sub(1);
    for (index, piece) in pieces.into_iter().enumerate() {
        if index == last {
            bot.send_message(chat_id, piece)
                .reply_markup(keyboard.clone())
                .await?;
        } else {
            bot.send_message(chat_id, piece).await?;
        }
    }
    Ok(())
}

/// Send a prepared reply, falling back to text when the voice upload fails
pub async fn send_prepared_reply(
    bot: &Bot,
    chat_id: ChatId,
    reply: PreparedReply,
    keyboard: KeyboardMarkup,
) -> Result<()> {
    match reply {
        PreparedReply::Text(text) => send_text(bot, chat_id, text, keyboard).await?,
        PreparedReply::Voice { path, text } => {
            if let Err(e) = bot
                .send_voice(chat_id, InputFile::file(&path))
                .reply_markup(keyboard.clone())
                .await
            {
                warn!(
                    user_id = %chat_id,
                    path = %path.display(),
                    error = %e,
                    "Voice upload failed, sending text"
                );
                send_text(bot, chat_id, text, keyboard).await?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_one_piece() {
        assert_eq!(split_message("привет", 10), vec!["привет".to_string()]);
        assert_eq!(split_message("", 10), vec![String::new()]);
    }

    #[test]
    fn test_split_prefers_newlines() {
        let pieces = split_message("abc\ndefgh", 6);
        assert_eq!(pieces, vec!["abc\n".to_string(), "defgh".to_string()]);
    }

    #[test]
    fn test_split_without_newline_cuts_between_characters() {
        let pieces = split_message("абвгдеж", 3);
        assert_eq!(pieces, vec!["абв", "где", "ж"]);
    }

    #[test]
    fn test_split_counts_emoji_as_two_units() {
        let pieces = split_message("🔔🔔🔔", 4);
        assert_eq!(pieces, vec!["🔔🔔", "🔔"]);
        assert!(pieces.iter().all(|p| p.encode_utf16().count() <= 4));
    }
}
