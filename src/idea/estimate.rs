// lazy_regex! is backed by once_cell
#![allow(clippy::non_std_lazy_statics)]

use lazy_regex::lazy_regex;
use std::fmt;

/// `10-15 человеко-дней`, `20 чел.-дн.`, `5–7 чел-дней`
static RE_PERSON_DAYS: lazy_regex::Lazy<regex::Regex> = lazy_regex!(
    r"(?i)(\d+)\s*(?:[-–—]\s*(\d+))?\s*(?:человеко[-\s]?дн|чел\.?\s*-?\s*дн)"
);

/// `1 500 000 руб`, `300 тыс. руб.`, `1,2 млн ₽`
static RE_BUDGET: lazy_regex::Lazy<regex::Regex> = lazy_regex!(
    r"(?i)(\d{1,3}(?:[ \u{a0}]\d{3})+|\d+(?:[.,]\d+)?)\s*(тыс\.?|млн\.?)?\s*(?:руб|₽)"
);

/// Effort and budget figures pulled from an LLM estimate
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CostEstimate {
    /// Lower and upper bound in person-days
    pub person_days: Option<(u32, u32)>,
    /// Budget in roubles
    pub budget_rub: Option<u64>,
    /// Full reply text
    pub summary: String,
}

impl CostEstimate {
    /// Whether any figure could be extracted
    #[must_use]
    pub const fn has_figures(&self) -> bool {
        self.person_days.is_some() || self.budget_rub.is_some()
    }
}

impl fmt::Display for CostEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.person_days {
            Some((lo, hi)) if lo == hi => write!(f, "Трудозатраты: {lo} чел.-дн.")?,
            Some((lo, hi)) => write!(f, "Трудозатраты: {lo}–{hi} чел.-дн.")?,
            None => f.write_str("Трудозатраты: не указаны")?,
        }
        match self.budget_rub {
            Some(rub) => write!(f, "\nБюджет: {} руб.", group_thousands(rub)),
            None => Ok(()),
        }
    }
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(' ');
        }
        out.push(ch);
    }
    out
}

// Amounts outside u64 are not realistic budgets
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn parse_amount(number: &str, scale: Option<&str>) -> Option<u64> {
    let cleaned: String = number
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    let value: f64 = cleaned.parse().ok()?;
    let multiplier = match scale.map(str::to_lowercase).as_deref() {
        Some(s) if s.starts_with("тыс") => 1_000.0,
        Some(s) if s.starts_with("млн") => 1_000_000.0,
        _ => 1.0,
    };
    let amount = (value * multiplier).round();
    (amount.is_finite() && amount >= 0.0 && amount < 1e18).then_some(amount as u64)
}

/// Extracts the first person-day range and budget from `response`
///
/// # Examples
///
/// ```
/// use agentolog::idea::estimate::parse;
/// let estimate = parse("Оценка: 10-15 человеко-дней, бюджет около 1,2 млн руб.");
/// assert_eq!(estimate.person_days, Some((10, 15)));
/// assert_eq!(estimate.budget_rub, Some(1_200_000));
/// ```
#[must_use]
pub fn parse(response: &str) -> CostEstimate {
    let person_days = RE_PERSON_DAYS.captures(response).and_then(|caps| {
        let lo: u32 = caps.get(1)?.as_str().parse().ok()?;
        let hi: u32 = caps
            .get(2)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(lo);
        Some((lo.min(hi), lo.max(hi)))
    });

    let budget_rub = RE_BUDGET.captures(response).and_then(|caps| {
        parse_amount(caps.get(1)?.as_str(), caps.get(2).map(|m| m.as_str()))
    });

    CostEstimate {
        person_days,
        budget_rub,
        summary: response.trim().to_string(),
    }
}
