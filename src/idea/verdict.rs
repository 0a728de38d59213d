// lazy_regex! is backed by once_cell
#![allow(clippy::non_std_lazy_statics)]

use lazy_regex::lazy_regex;
use std::fmt;

/// `Контакт:`, `Контакт лидера:` or `Контакт владельца:` followed by the value
static RE_CONTACT: lazy_regex::Lazy<regex::Regex> =
    lazy_regex!(r"(?im)контакт(?:\s+(?:лидера|владельца))?\s*\**\s*:\s*\**\s*(.+?)\s*$");

/// Bold/code markup; underscores are left alone since they occur in handles
static RE_EMPHASIS: lazy_regex::Lazy<regex::Regex> = lazy_regex!(r"[*`]+");

/// Uniqueness judgment extracted from an LLM reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Nothing similar in the registry
    Unique,
    /// Overlaps with existing agents but adds something new
    PartiallyUnique,
    /// Already covered by an existing agent
    NotUnique,
    /// The model could not make sense of the input
    Unclear,
}

impl Verdict {
    /// Whether the idea should proceed to the template
    #[must_use]
    pub const fn is_unique(self) -> bool {
        matches!(self, Self::Unique | Self::PartiallyUnique)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Unique => "уникальна",
            Self::PartiallyUnique => "частично уникальна",
            Self::NotUnique => "не уникальна",
            Self::Unclear => "не удалось оценить",
        };
        f.write_str(label)
    }
}

/// Classifies a free-text reply.
///
/// Negative markers are checked before positive ones, since "не уникальна"
/// also contains "уникальна". A reply without any marker counts as not unique.
///
/// # Examples
///
/// ```
/// use agentolog::idea::verdict::{parse, Verdict};
/// assert_eq!(parse("Идея НЕ уникальна: похожий агент уже есть"), Verdict::NotUnique);
/// assert_eq!(parse("Уникальна! Предлагаю добавить отчёты."), Verdict::Unique);
/// ```
#[must_use]
pub fn parse(response: &str) -> Verdict {
    let text = response.to_lowercase();

    if text.contains("не понимаю") || text.contains("неразборчив") {
        Verdict::Unclear
    } else if text.contains("не уникальн") || text.contains("неуникальн") {
        Verdict::NotUnique
    } else if text.contains("частично уникальн") {
        Verdict::PartiallyUnique
    } else if text.contains("уникальн") {
        Verdict::Unique
    } else {
        Verdict::NotUnique
    }
}

/// Leader contact named in the reply, if any
#[must_use]
pub fn extract_contact(response: &str) -> Option<String> {
    RE_CONTACT
        .captures_iter(response)
        .filter_map(|caps| caps.get(1))
        .map(|m| {
            RE_EMPHASIS
                .replace_all(m.as_str(), "")
                .trim_matches(|c: char| c == '_' || c.is_whitespace())
                .to_string()
        })
        .find(|contact| !contact.is_empty())
}
