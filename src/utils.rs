//! Text helpers for chat output: HTML escaping, light markdown conversion and
//! message splitting.
//!
//! Patterns are declared with `lazy_regex!`, so they are validated at compile
//! time and built on first use.

// lazy_regex! is backed by once_cell
#![allow(clippy::non_std_lazy_statics)]

use anyhow::Result;
use lazy_regex::lazy_regex;
use std::time::Duration;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::Retry;
use tracing::warn;
use unicode_segmentation::UnicodeSegmentation;

/// Telegram rejects messages longer than 4096 characters
pub const TELEGRAM_MESSAGE_LIMIT: usize = 4000;

const SEND_INITIAL_BACKOFF_MS: u64 = 500;
const SEND_MAX_BACKOFF_MS: u64 = 4000;
const SEND_MAX_RETRIES: usize = 3;

/// Match bullet points at start of line: `* ` or `- `
static RE_BULLET: lazy_regex::Lazy<regex::Regex> = lazy_regex!(r"(?m)^[*-] ");

/// Match bold text: **text**
static RE_BOLD: lazy_regex::Lazy<regex::Regex> = lazy_regex!(r"\*\*(.+?)\*\*");

/// Match inline code: `code`
static RE_INLINE_CODE: lazy_regex::Lazy<regex::Regex> = lazy_regex!(r"`([^`\n]+)`");

/// Match markdown headings: `### Title`
static RE_HEADING: lazy_regex::Lazy<regex::Regex> = lazy_regex!(r"(?m)^#{1,6}\s+(.+)$");

/// Match 3+ consecutive newlines
static RE_MULTI_NEWLINE: lazy_regex::Lazy<regex::Regex> = lazy_regex!(r"\n{3,}");

/// Escapes `<`, `>` and `&` for Telegram HTML parse mode.
///
/// # Examples
///
/// ```
/// use agentolog::utils::escape_html;
/// assert_eq!(escape_html("1 < 2 & 3"), "1 &lt; 2 &amp; 3");
/// ```
#[must_use]
pub fn escape_html(text: &str) -> String {
    html_escape::encode_text(text).into_owned()
}

/// Formats LLM markdown into Telegram-compatible HTML.
///
/// The text is escaped first, so only the markup produced here reaches Telegram:
/// - `**text**` and `# heading` become `<b>text</b>`
/// - `* ` / `- ` at the start of a line become `• `
/// - `` `code` `` becomes `<code>code</code>`
/// - 3+ newlines collapse into two
///
/// # Examples
///
/// ```
/// use agentolog::utils::format_text;
/// let formatted = format_text("**Уникальна** <да> и `agents.xlsx`");
/// assert_eq!(formatted, "<b>Уникальна</b> &lt;да&gt; и <code>agents.xlsx</code>");
/// ```
#[must_use]
pub fn format_text(text: &str) -> String {
    let escaped = escape_html(text);
    let text = RE_HEADING.replace_all(&escaped, "<b>$1</b>");
    let text = RE_BULLET.replace_all(&text, "• ");
    let text = RE_BOLD.replace_all(&text, "<b>$1</b>");
    let text = RE_INLINE_CODE.replace_all(&text, "<code>$1</code>");
    let text = RE_MULTI_NEWLINE.replace_all(&text, "\n\n");
    text.trim().to_string()
}

/// Splits a long message into parts that fit within `max_length` bytes.
///
/// Lines are kept whole where possible; a single line longer than the limit is
/// cut on grapheme boundaries.
///
/// # Examples
///
/// ```
/// use agentolog::utils::split_long_message;
/// let long_msg = "Агент для сверки отчётов\n".repeat(300);
/// let parts = split_long_message(&long_msg, 4000);
/// assert!(parts.len() > 1);
/// ```
#[must_use]
pub fn split_long_message(message: &str, max_length: usize) -> Vec<String> {
    if message.is_empty() {
        return Vec::new();
    }
    if message.len() <= max_length {
        return vec![message.to_string()];
    }

    let mut parts = Vec::new();
    let mut current = String::new();

    for line in message.lines() {
        if line.len() > max_length {
            flush(&mut current, &mut parts);
            for grapheme in line.graphemes(true) {
                if current.len() + grapheme.len() > max_length {
                    flush(&mut current, &mut parts);
                }
                current.push_str(grapheme);
            }
            current.push('\n');
            continue;
        }

        if current.len() + line.len() + 1 > max_length {
            flush(&mut current, &mut parts);
        }
        current.push_str(line);
        current.push('\n');
    }
    flush(&mut current, &mut parts);

    parts
}

fn flush(current: &mut String, parts: &mut Vec<String>) {
    let trimmed = current.trim_end();
    if !trimmed.is_empty() {
        parts.push(trimmed.to_string());
    }
    current.clear();
}

/// Truncates a string to a maximum character length (not bytes).
///
/// # Examples
///
/// ```
/// use agentolog::utils::truncate_str;
/// assert_eq!(truncate_str("Привет, мир!", 6), "Привет");
/// ```
pub fn truncate_str(s: impl AsRef<str>, max_chars: usize) -> String {
    let s = s.as_ref();
    s.char_indices()
        .nth(max_chars)
        .map_or_else(|| s.to_string(), |(pos, _)| s[..pos].to_string())
}

/// Retries a chat API call with jittered exponential backoff.
///
/// # Errors
///
/// Returns the last error once all attempts have failed.
pub async fn retry_send<F, Fut, T>(operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let strategy = ExponentialBackoff::from_millis(SEND_INITIAL_BACKOFF_MS)
        .max_delay(Duration::from_millis(SEND_MAX_BACKOFF_MS))
        .map(jitter)
        .take(SEND_MAX_RETRIES);

    Retry::spawn(strategy, operation).await.map_err(|e| {
        warn!("Chat API call failed after {SEND_MAX_RETRIES} retries: {e}");
        e
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_truncate_str_unicode() {
        assert_eq!(truncate_str("Привет, мир!", 6), "Привет");
        assert_eq!(truncate_str("Привет, мир!", 50), "Привет, мир!");
    }

    #[test]
    fn test_format_text_escapes_before_markup() {
        let input = "<script>**жирный**</script>";
        assert_eq!(
            format_text(input),
            "&lt;script&gt;<b>жирный</b>&lt;/script&gt;"
        );
    }

    #[test]
    fn test_format_text_bullets_and_headings() {
        let input = "### Вердикт\n* первый\n- второй";
        assert_eq!(format_text(input), "<b>Вердикт</b>\n• первый\n• второй");
    }

    #[test]
    fn test_format_text_multi_newline() {
        assert_eq!(format_text("Строка 1\n\n\n\nСтрока 2"), "Строка 1\n\nСтрока 2");
    }

    #[test]
    fn test_split_long_message_simple() {
        let input = "Line 1\nLine 2\nLine 3";
        // "Line 1\n" is 7 bytes, two of them exceed 13
        let parts = split_long_message(input, 13);
        assert_eq!(parts, vec!["Line 1", "Line 2", "Line 3"]);
    }

    #[test]
    fn test_split_very_long_line() {
        let input = "a".repeat(10_000);
        let parts = split_long_message(&input, 4000);

        assert_eq!(parts.len(), 3);
        assert!(parts.iter().all(|p| p.len() <= 4000));
        assert_eq!(parts.concat().len(), input.len());
    }

    #[tokio::test]
    async fn test_retry_send_recovers() -> Result<()> {
        let mut calls = 0;
        let value = retry_send(|| {
            calls += 1;
            let attempt = calls;
            async move {
                if attempt < 2 {
                    anyhow::bail!("timeout");
                }
                Ok(attempt)
            }
        })
        .await?;
        assert_eq!(value, 2);
        Ok(())
    }

    proptest! {
        #[test]
        fn split_parts_respect_limit(text in "[а-яa-z \n]{0,600}", limit in 20usize..200) {
            for part in split_long_message(&text, limit) {
                prop_assert!(part.len() <= limit);
            }
        }

        #[test]
        fn split_keeps_all_words(text in "[а-я]{1,12}( [а-я]{1,12}){0,80}") {
            let parts = split_long_message(&text, 64);
            let original: String = text.split_whitespace().collect();
            let rejoined: String = parts.concat().split_whitespace().collect();
            prop_assert_eq!(original, rejoined);
        }
    }
}
