use crate::form::Initiative;
use std::fmt::Write as _;

/// Listing used when the registry spreadsheet cannot be read
pub const REGISTRY_UNAVAILABLE: &str = "(не удалось загрузить данные об агентах)";

/// Role given to the model for every pipeline request
pub const SYSTEM_PROMPT: &str = "Ты эксперт по внедрению AI-агентов в крупной компании. \
Ты сравниваешь новые идеи с реестром уже существующих агентов и отвечаешь кратко и по делу, на русском языке.";

/// Free-form idea check against the registry
#[must_use]
pub fn idea_check(digest: &str, idea: &str) -> String {
    format!(
        "Вот список существующих AI-агентов:\n{digest}\n\n\
         Пользователь предлагает идею: {idea}\n\n\
         Проверь, есть ли похожие агенты, и оцени уникальность идеи. Ответь кратко:\n\
         - если похожий агент уже есть, начни ответ с \"НЕ уникальна\" и назови его;\n\
         - если идея пересекается с существующими, но добавляет новое, начни с \"Частично уникальна\";\n\
         - если похожих нет, начни с \"Уникальна\" и предложи улучшения;\n\
         - если текст неразборчив, ответь \"Извините, не понимаю\".\n\
         Если нашёлся похожий агент, в последней строке напиши \"Контакт лидера: ...\"."
    )
}

/// Structured initiative check against the registry
#[must_use]
pub fn initiative_check(digest: &str, initiative: &Initiative) -> String {
    let mut described = String::new();
    for (label, value) in initiative.labeled_fields() {
        let _ = writeln!(described, "{label}: {value}");
    }

    format!(
        "Вот инициатива от пользователя:\n{described}\n\
         Инициативы:\n{digest}\n\n\
         Сравни инициативу пользователя с известными инициативами и ответь:\n\
         - если идея похожа, напиши \"НЕ уникальна\", название похожей инициативы и владельца;\n\
         - если новая, напиши \"Уникальна\" и предложи улучшения;\n\
         - если текст неразборчив, напиши \"Извините, не понимаю\".\n\
         Если указываешь владельца, добавь строку \"Контакт владельца: ...\"."
    )
}

/// Effort and budget estimate for a filled template
#[must_use]
pub fn cost_estimate(fields: &[(String, String)]) -> String {
    let mut described = String::new();
    for (field, value) in fields {
        let _ = writeln!(described, "{field}: {value}");
    }

    format!(
        "Оцени трудозатраты на разработку AI-агента по описанию:\n{described}\n\
         Дай оценку в формате \"N-M человеко-дней\" и ориентировочный бюджет в рублях \
         (например, \"1 500 000 руб.\"). Затем в двух-трёх предложениях перечисли основные риски."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idea_check_embeds_digest_and_idea() {
        let prompt = idea_check("Название: HR-бот", "бот для отпусков");
        assert!(prompt.contains("Название: HR-бот"));
        assert!(prompt.contains("Пользователь предлагает идею: бот для отпусков"));
        assert!(prompt.contains("Контакт лидера"));
    }

    #[test]
    fn test_initiative_check_lists_fields() {
        let initiative = Initiative {
            name: "Сверка".into(),
            short_name: Some("СВ".into()),
            description: Some("Сверяет акты".into()),
            ..Initiative::default()
        };
        let prompt = initiative_check(REGISTRY_UNAVAILABLE, &initiative);
        assert!(prompt.contains("Название инициативы: Сверка\n"));
        assert!(prompt.contains("Краткое название: СВ\n"));
        assert!(prompt.contains(REGISTRY_UNAVAILABLE));
        assert!(!prompt.contains("Тип инициативы"));
    }

    #[test]
    fn test_cost_estimate_lists_answers() {
        let fields = vec![("Название".to_string(), "Сверка".to_string())];
        assert!(cost_estimate(&fields).contains("Название: Сверка\n"));
    }
}
