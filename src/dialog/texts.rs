//! Button labels and canned replies

/// Main menu: submit an idea
pub const BTN_IDEA: &str = "У меня есть идея!💡";
/// Main menu: agents submenu
pub const BTN_AGENTS: &str = "АИ-агенты?📍";
/// Main menu: find responsible people
pub const BTN_HELPERS: &str = "Кто поможет?💬";
/// Main menu: support contact
pub const BTN_SUPPORT: &str = "Поддержка📝";
/// Agents submenu: download the registry
pub const BTN_ALL_AGENTS: &str = "Все агенты (Excel)";
/// Agents submenu: search by name
pub const BTN_SEARCH: &str = "Искать по названию";
/// Return to the main menu
pub const BTN_BACK: &str = "Назад";

pub(crate) const WELCOME: &str = "👋 Привет! Меня зовут **Агентолог**, я помогу тебе с идеями для AI-агентов.

Вот что я могу сделать:
**1. У меня есть идея!💡**
Я помогу тебе узнать, насколько твоя идея **уникальна!**

**2. АИ-агенты?📍**
АИ-агенты разрабатываются каждый день, здесь мы собрали самый **свежий список агентов!**

**3. Кто поможет?💬**
Агентов очень много и не всегда можно найти, кто их разрабатывает. Давай **подскажем**, кто эти люди!

**4. Поддержка📝**
Остались **вопросы** или **предложения** по работе чат-бота? Пиши нам!

Скорее выбирай, что мы будем делать👇";

pub(crate) const HELP: &str = "Добро пожаловать! Вот что я умею:
- Напиши 'шаблон', чтобы оформить идею по шаблону
- Напиши 'заполнено: Название=..., Масштаб процесса=...', чтобы сразу получить файлы
- Напиши 'инициатива: название=..., описание=..., тип=...', чтобы проверить инициативу
- Напиши 'гигачат: твой вопрос', чтобы спросить модель напрямую";

pub(crate) const CANCELLED: &str = "↩️ Действие отменено. Выбирай, что делать дальше:";
pub(crate) const NOT_UNDERSTOOD: &str = "🤖 Я вас не понял. Пожалуйста, выбери действие из меню!";
pub(crate) const FAILURE: &str =
    "⚠️ Что-то пошло не так, попробуй ещё раз чуть позже. Возвращаю в главное меню.";

pub(crate) const ASK_IDEA: &str = "💬 Опиши свою идею свободно, я проверю её уникальность:";
pub(crate) const ASK_IDEA_AGAIN: &str = "✍️ Попробуй описать идею подробнее или другими словами:";
pub(crate) const IDEA_UNIQUE: &str = "✅ Давай оформим идею по шаблону. Название я уже записал.";
pub(crate) const IDEA_NOT_UNIQUE: &str =
    "🔁 Похоже, такой агент уже есть. Свяжись с командой, чтобы присоединиться к разработке.";

pub(crate) const AGENTS_MENU: &str = "📋 Что хотите сделать?";
pub(crate) const REGISTRY_MISSING: &str = "❌ Не удалось отправить файл: реестр агентов не найден.";
pub(crate) const REGISTRY_UNAVAILABLE: &str = "⚠️ Реестр агентов сейчас недоступен, попробуй позже.";
pub(crate) const ASK_AGENT_NAME: &str = "🔍 Введи название агента:";
pub(crate) const AGENT_NOT_FOUND: &str = "❌ Агент не найден.";
pub(crate) const ASK_HELPER_QUERY: &str =
    "🧑‍💻 Опиши задачу или область, и я подскажу, кто делает похожих агентов:";
pub(crate) const HELPERS_NOT_FOUND: &str =
    "🤷 Не нашёл ответственных по этой теме. Попробуй другое слово или обратись в поддержку.";

pub(crate) const TEMPLATE_INTRO: &str = "📝 Давай заполним шаблон. Отвечай на вопросы по одному:";
pub(crate) const EMPTY_ANSWER: &str = "✏️ Ответ не может быть пустым.";
pub(crate) const FILES_READY: &str = "📁 Шаблоны готовы. Выбирай следующее действие:";
pub(crate) const NO_PAIRS: &str =
    "⚠️ Не нашёл ни одной пары вида поле=значение. Пример: заполнено: Название=Сверка, Масштаб процесса=Банк";
pub(crate) const NO_INITIATIVE_NAME: &str =
    "⚠️ Укажи хотя бы название: инициатива: название=..., описание=..., тип=...";
pub(crate) const INITIATIVE_UNIQUE: &str =
    "👏 Отличная идея! Давайте оформим её по шаблону. Напишите 'шаблон' для начала.";
pub(crate) const EMPTY_PROMPT: &str = "⚠️ После 'гигачат:' нужен текст запроса.";

/// How many search results are listed before the rest is summarized
pub(crate) const MAX_LISTED: usize = 10;

pub(crate) fn support(contact: &str) -> String {
    format!("✉️ Напиши нам в Telegram: {contact}")
}

pub(crate) fn and_more(count: usize) -> String {
    format!("…и ещё {count}")
}

pub(crate) fn main_menu() -> Vec<Vec<String>> {
    [BTN_IDEA, BTN_AGENTS, BTN_HELPERS, BTN_SUPPORT]
        .iter()
        .map(|label| vec![(*label).to_string()])
        .collect()
}

pub(crate) fn agents_menu() -> Vec<Vec<String>> {
    [BTN_ALL_AGENTS, BTN_SEARCH, BTN_BACK]
        .iter()
        .map(|label| vec![(*label).to_string()])
        .collect()
}
