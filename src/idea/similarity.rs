use similar::TextDiff;

fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Character similarity `2·M / (|a| + |b|)` over normalized text, in `[0, 1]`
///
/// Case and runs of whitespace are ignored. Two empty strings are identical.
///
/// # Examples
///
/// ```
/// use agentolog::idea::similarity::ratio;
/// assert!((ratio("Бот  для HR", "бот для hr") - 1.0).abs() < f32::EPSILON);
/// ```
#[must_use]
pub fn ratio(a: &str, b: &str) -> f32 {
    let (a, b) = (normalize(a), normalize(b));
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    TextDiff::from_chars(a.as_str(), b.as_str()).ratio()
}
