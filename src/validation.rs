//! Validation module for free-text user input
//!
//! Validation errors are returned as localization keys so handlers can
//! answer the user directly.

/// Longest text forwarded to the completion API
pub const MAX_PROMPT_CHARS: usize = 2000;

/// Longest note accepted for a reminder
pub const MAX_REMINDER_NOTE_CHARS: usize = 200;

/// Validates text that will be sent to the completion API
///
/// # Returns
/// * `Ok(&str)` - The trimmed text if valid
/// * `Err(&str)` - Localization key: "input-empty" or "input-too-long"
///
/// # Examples
/// ```
/// use cosmo_assistant::validation::validate_prompt_text;
///
/// assert_eq!(validate_prompt_text("  niacinamide  "), Ok("niacinamide"));
/// assert_eq!(validate_prompt_text("   "), Err("input-empty"));
/// assert_eq!(validate_prompt_text(&"a".repeat(2001)), Err("input-too-long"));
/// ```
pub fn validate_prompt_text(input: &str) -> Result<&str, &'static str> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err("input-empty");
    }

    if trimmed.chars().count() > MAX_PROMPT_CHARS {
        return Err("input-too-long");
    }

    Ok(trimmed)
}

/// Parse the argument of `/addadmin <id>`
///
/// # Examples
/// ```
/// use cosmo_assistant::validation::parse_user_id_argument;
///
/// assert_eq!(parse_user_id_argument("/addadmin 12345"), Some(12345));
/// assert_eq!(parse_user_id_argument("/addadmin"), None);
/// assert_eq!(parse_user_id_argument("/addadmin abc"), None);
/// ```
pub fn parse_user_id_argument(text: &str) -> Option<i64> {
    let mut parts = text.split_whitespace();
    parts.next()?;
    let id = parts.next()?.parse::<i64>().ok()?;
    if parts.next().is_some() || id <= 0 {
        return None;
    }
    Some(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_length_counts_characters_not_bytes() {
        // Cyrillic letters take two bytes each
        let text = "я".repeat(MAX_PROMPT_CHARS);
        assert!(validate_prompt_text(&text).is_ok());
    }

    #[test]
    fn test_user_id_argument_rejects_extra_tokens() {
        assert_eq!(parse_user_id_argument("/addadmin 1 2"), None);
        assert_eq!(parse_user_id_argument("/addadmin -5"), None);
    }
}
