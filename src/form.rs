//! Initiative template and text command parsing
//!
//! The template is filled one field per message. Power users can skip the
//! dialog with `заполнено: k=v, …` or submit a structured `инициатива: k=v, …`.

/// Template fields in the order they are asked
pub const TEMPLATE_FIELDS: [&str; 7] = [
    "Название",
    "Что хотим улучшить?",
    "Какие данные поступают агенту на выход?",
    "Как процесс выглядит сейчас? as-is",
    "Какой результат нужен от агента?",
    "Достижимый идеал(to-be)",
    "Масштаб процесса",
];

/// Question for template step `step` (zero-based), e.g. `2️⃣ Что хотим улучшить?:`
#[must_use]
pub fn step_prompt(step: usize) -> Option<String> {
    TEMPLATE_FIELDS
        .get(step)
        .map(|field| format!("{}\u{fe0f}\u{20e3} {field}:", step + 1))
}

/// Parses `k=v, k2=v2` into ordered pairs
///
/// Pairs without `=` or with an empty key or value are dropped; everything
/// after the first `=` belongs to the value.
///
/// # Examples
///
/// ```
/// use agentolog::form::parse_pairs;
/// let pairs = parse_pairs("Название=HR-бот, формула=a=b, мусор, пусто=");
/// assert_eq!(pairs, vec![
///     ("Название".to_string(), "HR-бот".to_string()),
///     ("формула".to_string(), "a=b".to_string()),
/// ]);
/// ```
#[must_use]
pub fn parse_pairs(raw: &str) -> Vec<(String, String)> {
    raw.split(',')
        .filter_map(|chunk| chunk.split_once('='))
        .map(|(k, v)| (k.trim(), v.trim()))
        .filter(|(k, v)| !k.is_empty() && !v.is_empty())
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Case-insensitive prefix strip that is safe for Cyrillic text
///
/// # Examples
///
/// ```
/// use agentolog::form::strip_prefix_ci;
/// assert_eq!(strip_prefix_ci("ГигаЧат: привет", "гигачат:"), Some(" привет"));
/// assert_eq!(strip_prefix_ci("шаблон", "гигачат:"), None);
/// ```
#[must_use]
pub fn strip_prefix_ci<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let mut rest = text.char_indices();
    for expected in prefix.chars() {
        let (_, actual) = rest.next()?;
        if !actual.to_lowercase().eq(expected.to_lowercase()) {
            return None;
        }
    }
    Some(rest.next().map_or("", |(idx, _)| &text[idx..]))
}

/// Structured initiative submitted with the `инициатива:` command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Initiative {
    /// Initiative name
    pub name: String,
    /// Short name
    pub short_name: Option<String>,
    /// What the agent should do
    pub description: Option<String>,
    /// Initiative type
    pub kind: Option<String>,
    /// Development team
    pub team: Option<String>,
    /// Leader contact
    pub contact: Option<String>,
}

impl Initiative {
    /// Builds an initiative from parsed pairs; `None` without a name
    #[must_use]
    pub fn from_pairs(pairs: &[(String, String)]) -> Option<Self> {
        let mut initiative = Self::default();
        for (key, value) in pairs {
            let value = value.clone();
            match key.to_lowercase().as_str() {
                "название" | "название инициативы" => initiative.name = value,
                "краткое название" => initiative.short_name = Some(value),
                "описание" | "описание инициативы" => initiative.description = Some(value),
                "тип" | "тип инициативы" => initiative.kind = Some(value),
                "команда" | "команда разработки" => initiative.team = Some(value),
                "контакт" | "контакт лидера" => initiative.contact = Some(value),
                _ => {}
            }
        }
        (!initiative.name.is_empty()).then_some(initiative)
    }

    /// Present fields with their prompt labels
    #[must_use]
    pub fn labeled_fields(&self) -> Vec<(&'static str, &str)> {
        [
            ("Название инициативы", Some(self.name.as_str())),
            ("Краткое название", self.short_name.as_deref()),
            ("Описание инициативы", self.description.as_deref()),
            ("Тип инициативы", self.kind.as_deref()),
            ("Команда", self.team.as_deref()),
            ("Контакт", self.contact.as_deref()),
        ]
        .into_iter()
        .filter_map(|(label, value)| value.map(|v| (label, v)))
        .collect()
    }
}
