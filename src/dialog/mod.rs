//! Conversation engine shared by all transports
//!
//! A transport hands over `(user_id, text)` and renders the returned replies.
//! Failures never reach the transport: they are logged, the session is reset
//! and the user gets an apology with the main menu.

/// Button labels and canned replies.
pub mod texts;

use crate::config::Settings;
use crate::documents::DocumentFactory;
use crate::form::{self, Initiative, TEMPLATE_FIELDS};
use crate::idea::{IdeaAssessment, IdeaChecker, Verdict};
use crate::llm::LlmClient;
use crate::registry::{AgentRecord, IdeaJournal, RegistryStore};
use crate::session::{Mode, Session, SessionStore};
use crate::utils::truncate_str;
use anyhow::Result;
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Longest prefilled template name taken from an idea
const MAX_PREFILLED_NAME_CHARS: usize = 100;

/// One unit of output for the transport to deliver
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Markdown text, optionally with a reply keyboard (rows of button labels)
    Text {
        /// Message body
        body: String,
        /// Keyboard rows
        buttons: Option<Vec<Vec<String>>>,
    },
    /// A file to send
    File {
        /// Location on disk
        path: PathBuf,
        /// Whether the file may be deleted once delivered
        cleanup: bool,
    },
}

impl Reply {
    /// Plain text without a keyboard
    pub fn text(body: impl Into<String>) -> Self {
        Self::Text {
            body: body.into(),
            buttons: None,
        }
    }

    /// Text followed by the main menu keyboard
    pub fn with_menu(body: impl Into<String>) -> Self {
        Self::Text {
            body: body.into(),
            buttons: Some(texts::main_menu()),
        }
    }

    /// Generated file the transport may delete after sending
    #[must_use]
    pub const fn generated(path: PathBuf) -> Self {
        Self::File {
            path,
            cleanup: true,
        }
    }
}

/// Request handler owning sessions and the idea pipeline
pub struct Dialog {
    sessions: SessionStore,
    checker: IdeaChecker,
    registry: Arc<RegistryStore>,
    journal: IdeaJournal,
    documents: DocumentFactory,
    support_contact: String,
}

impl Dialog {
    /// Wires the dialog from settings around an LLM client
    #[must_use]
    pub fn new(settings: &Settings, llm: Arc<LlmClient>) -> Self {
        let registry = Arc::new(RegistryStore::new(settings.registry_path.clone()));
        Self {
            sessions: SessionStore::new(settings.session_ttl_secs, settings.session_max_capacity),
            checker: IdeaChecker::new(llm, Arc::clone(&registry), settings.similarity_threshold),
            registry,
            journal: IdeaJournal::new(settings.ideas_journal_path.clone()),
            documents: DocumentFactory::new(settings.output_dir.clone()),
            support_contact: settings.support_contact.clone(),
        }
    }

    /// Session cache, shared with transports for diagnostics
    #[must_use]
    pub const fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Directory generated files are written to
    #[must_use]
    pub fn output_dir(&self) -> &std::path::Path {
        self.documents.output_dir()
    }

    /// Processes one incoming message from `user_id`
    pub async fn handle(&self, user_id: &str, text: &str) -> Vec<Reply> {
        let handle = self.sessions.get_or_create(user_id).await;
        let mut session = handle.lock().await;
        debug!(user_id, mode = ?session.mode, "Handling message");

        match self.process(&mut session, text.trim()).await {
            Ok(replies) => replies,
            Err(e) => {
                error!(user_id, "Dialog failure: {e:#}");
                session.reset();
                vec![Reply::with_menu(texts::FAILURE)]
            }
        }
    }

    async fn process(&self, session: &mut Session, text: &str) -> Result<Vec<Reply>> {
        if let Some(replies) = Self::global_command(session, text) {
            return Ok(replies);
        }
        if let Some(replies) = self.menu_button(session, text) {
            return Ok(replies);
        }
        if let Some(replies) = self.text_command(session, text).await? {
            return Ok(replies);
        }

        match session.mode {
            Mode::AwaitingIdea => self.on_idea(session, text).await,
            Mode::AwaitingAgentName => Ok(self.on_agent_search(session, text).await),
            Mode::AwaitingHelperQuery => Ok(self.on_helper_query(session, text).await),
            Mode::FillingTemplate { step } => self.on_template_answer(session, step, text).await,
            Mode::Idle => Ok(vec![Reply::with_menu(texts::NOT_UNDERSTOOD)]),
        }
    }

    fn global_command(session: &mut Session, text: &str) -> Option<Vec<Reply>> {
        let lowered = text.to_lowercase();
        match lowered.as_str() {
            "/start" | "привет" => {
                session.reset();
                Some(vec![Reply::with_menu(texts::WELCOME)])
            }
            "отмена" | "/cancel" | "назад" => {
                session.reset();
                Some(vec![Reply::with_menu(texts::CANCELLED)])
            }
            _ => None,
        }
    }

    fn menu_button(&self, session: &mut Session, text: &str) -> Option<Vec<Reply>> {
        let reply = match text {
            texts::BTN_IDEA => {
                session.reset();
                session.mode = Mode::AwaitingIdea;
                Reply::text(texts::ASK_IDEA)
            }
            texts::BTN_AGENTS => Reply::Text {
                body: texts::AGENTS_MENU.to_string(),
                buttons: Some(texts::agents_menu()),
            },
            texts::BTN_ALL_AGENTS => {
                let path = self.registry.path().to_path_buf();
                if path.exists() {
                    Reply::File {
                        path,
                        cleanup: false,
                    }
                } else {
                    warn!(path = %path.display(), "Registry file requested but missing");
                    Reply::with_menu(texts::REGISTRY_MISSING)
                }
            }
            texts::BTN_SEARCH => {
                session.reset();
                session.mode = Mode::AwaitingAgentName;
                Reply::text(texts::ASK_AGENT_NAME)
            }
            texts::BTN_HELPERS => {
                session.reset();
                session.mode = Mode::AwaitingHelperQuery;
                Reply::text(texts::ASK_HELPER_QUERY)
            }
            texts::BTN_SUPPORT => Reply::with_menu(texts::support(&self.support_contact)),
            _ => return None,
        };
        Some(vec![reply])
    }

    async fn text_command(&self, session: &mut Session, text: &str) -> Result<Option<Vec<Reply>>> {
        let lowered = text.to_lowercase();
        if lowered == "старт" {
            return Ok(Some(vec![Reply::text(texts::HELP)]));
        }
        if lowered == "шаблон" {
            session.start_template(Vec::new());
            return Ok(Some(vec![Reply::text(format!(
                "{}\n\n{}",
                texts::TEMPLATE_INTRO,
                form::step_prompt(0).unwrap_or_default()
            ))]));
        }
        if let Some(raw) = form::strip_prefix_ci(text, "заполнено:") {
            return self.on_filled(session, raw).await.map(Some);
        }
        if let Some(raw) = form::strip_prefix_ci(text, "инициатива:") {
            return self.on_initiative(session, raw).await.map(Some);
        }
        if let Some(prompt) = form::strip_prefix_ci(text, "гигачат:") {
            let prompt = prompt.trim();
            if prompt.is_empty() {
                return Ok(Some(vec![Reply::text(texts::EMPTY_PROMPT)]));
            }
            let answer = self.checker.ask(prompt).await?;
            return Ok(Some(vec![Reply::text(format!("🤖 Ответ модели:\n\n{answer}"))]));
        }
        Ok(None)
    }

    async fn on_filled(&self, session: &mut Session, raw: &str) -> Result<Vec<Reply>> {
        let pairs = form::parse_pairs(raw);
        if pairs.is_empty() {
            return Ok(vec![Reply::text(texts::NO_PAIRS)]);
        }

        let artifacts = self.documents.template_files(pairs).await?;
        session.reset();
        Ok(vec![
            Reply::generated(artifacts.word),
            Reply::generated(artifacts.excel),
            Reply::with_menu(texts::FILES_READY),
        ])
    }

    async fn on_initiative(&self, session: &mut Session, raw: &str) -> Result<Vec<Reply>> {
        let Some(initiative) = Initiative::from_pairs(&form::parse_pairs(raw)) else {
            return Ok(vec![Reply::text(texts::NO_INITIATIVE_NAME)]);
        };

        let assessment = self.checker.check_initiative(&initiative).await?;
        remember(session, &initiative.name, &assessment);

        let mut replies = vec![Reply::text(describe(&assessment))];
        match assessment.verdict {
            Verdict::Unique | Verdict::PartiallyUnique => {
                replies.push(Reply::text(texts::INITIATIVE_UNIQUE));
            }
            Verdict::NotUnique if !assessment.matches.is_empty() => {
                let path = self
                    .documents
                    .initiatives_excel(assessment.matches.clone())
                    .await?;
                replies.push(Reply::generated(path));
            }
            Verdict::NotUnique | Verdict::Unclear => {}
        }
        Ok(replies)
    }

    async fn on_idea(&self, session: &mut Session, idea: &str) -> Result<Vec<Reply>> {
        if idea.is_empty() {
            return Ok(vec![Reply::text(texts::ASK_IDEA)]);
        }

        match self.journal.record(idea).await {
            Ok(true) => info!("New idea journaled"),
            Ok(false) => {}
            Err(e) => warn!("Failed to journal idea: {e}"),
        }

        let assessment = self.checker.check_idea(idea).await?;
        remember(session, idea, &assessment);
        let verdict_reply = Reply::text(describe(&assessment));

        Ok(match assessment.verdict {
            Verdict::Unique | Verdict::PartiallyUnique => {
                let name = (TEMPLATE_FIELDS[0].to_string(), prefilled_name(idea));
                session.start_template(vec![name]);
                vec![
                    verdict_reply,
                    Reply::text(format!(
                        "{}\n\n{}",
                        texts::IDEA_UNIQUE,
                        form::step_prompt(1).unwrap_or_default()
                    )),
                ]
            }
            Verdict::NotUnique => {
                session.reset();
                vec![verdict_reply, Reply::with_menu(texts::IDEA_NOT_UNIQUE)]
            }
            Verdict::Unclear => vec![verdict_reply, Reply::text(texts::ASK_IDEA_AGAIN)],
        })
    }

    async fn on_agent_search(&self, session: &mut Session, term: &str) -> Vec<Reply> {
        session.reset();
        let registry = match self.registry.current().await {
            Ok(registry) => registry,
            Err(e) => {
                warn!("Agent search without registry: {e}");
                return vec![Reply::with_menu(texts::REGISTRY_UNAVAILABLE)];
            }
        };

        let found = registry.search_by_name(term);
        if found.is_empty() {
            return vec![Reply::with_menu(texts::AGENT_NOT_FOUND)];
        }
        vec![Reply::with_menu(listing(&found, AgentRecord::card, "\n\n"))]
    }

    async fn on_helper_query(&self, session: &mut Session, query: &str) -> Vec<Reply> {
        session.reset();
        let registry = match self.registry.current().await {
            Ok(registry) => registry,
            Err(e) => {
                warn!("Helper lookup without registry: {e}");
                return vec![Reply::with_menu(texts::REGISTRY_UNAVAILABLE)];
            }
        };

        let found = registry.find_helpers(query);
        if found.is_empty() {
            return vec![Reply::with_menu(texts::HELPERS_NOT_FOUND)];
        }
        let line = |r: &AgentRecord| format!("• **{}**: {}", r.name, r.responsible().unwrap_or_default());
        vec![Reply::with_menu(format!(
            "🧑‍💻 Вот кто может помочь:\n\n{}",
            listing(&found, line, "\n")
        ))]
    }

    async fn on_template_answer(
        &self,
        session: &mut Session,
        step: usize,
        answer: &str,
    ) -> Result<Vec<Reply>> {
        let Some(field) = TEMPLATE_FIELDS.get(step) else {
            session.reset();
            return Ok(vec![Reply::with_menu(texts::NOT_UNDERSTOOD)]);
        };
        if answer.is_empty() {
            return Ok(vec![Reply::text(format!(
                "{}\n\n{}",
                texts::EMPTY_ANSWER,
                form::step_prompt(step).unwrap_or_default()
            ))]);
        }

        session.form.push(((*field).to_string(), answer.to_string()));
        let next = step + 1;
        if let Some(prompt) = form::step_prompt(next) {
            session.mode = Mode::FillingTemplate { step: next };
            return Ok(vec![Reply::text(prompt)]);
        }

        self.finish_template(session).await
    }

    async fn finish_template(&self, session: &mut Session) -> Result<Vec<Reply>> {
        let mut fields = session.form.clone();
        let mut notes = String::from("✅ Формирую файлы...");

        match self.checker.estimate(&fields).await {
            Ok(estimate) => {
                let text = if estimate.has_figures() {
                    estimate.to_string()
                } else {
                    estimate.summary.clone()
                };
                let _ = write!(notes, "\n\n💰 {text}");
                fields.push(("Оценка трудозатрат".to_string(), estimate.summary));
            }
            Err(e) => warn!("Cost estimate skipped: {e}"),
        }

        if let Some((verdict, summary)) = check_for_template(session) {
            let _ = write!(notes, "\n\n🔎 Уникальность: {verdict}");
            fields.push(("Проверка уникальности".to_string(), summary.to_string()));
        }

        let artifacts = self.documents.template_files(fields).await?;
        session.reset();
        info!("Template completed");

        Ok(vec![
            Reply::text(notes),
            Reply::generated(artifacts.word),
            Reply::generated(artifacts.excel),
            Reply::with_menu(texts::FILES_READY),
        ])
    }
}

/// Template name derived from an idea: its first line, shortened
fn prefilled_name(idea: &str) -> String {
    let first_line = idea.lines().next().unwrap_or(idea).trim();
    truncate_str(first_line, MAX_PREFILLED_NAME_CHARS)
}

/// The cached check result, if it belongs to the idea this template describes
fn check_for_template(session: &Session) -> Option<(Verdict, &str)> {
    let name = session
        .form
        .iter()
        .find(|(field, _)| field == TEMPLATE_FIELDS[0])
        .map(|(_, value)| value.trim().to_lowercase())?;
    let checked = prefilled_name(session.last_idea.as_deref()?).to_lowercase();
    if name != checked {
        return None;
    }
    Some((session.verdict?, session.summary.as_deref()?))
}

fn remember(session: &mut Session, idea: &str, assessment: &IdeaAssessment) {
    session.last_idea = Some(idea.to_string());
    session.summary = Some(assessment.response.clone());
    session.verdict = Some(assessment.verdict);
}

fn describe(assessment: &IdeaAssessment) -> String {
    let mut text = format!("🤖 Результат проверки:\n\n{}", assessment.response.trim());
    if let Some(contact) = &assessment.contact {
        if !assessment.response.contains(contact.as_str()) {
            let _ = write!(text, "\n\n📇 Контакт лидера: {contact}");
        }
    }
    text
}

fn listing<F>(records: &[&AgentRecord], render: F, separator: &str) -> String
where
    F: Fn(&AgentRecord) -> String,
{
    let mut text = records
        .iter()
        .take(texts::MAX_LISTED)
        .map(|r| render(r))
        .collect::<Vec<_>>()
        .join(separator);
    if records.len() > texts::MAX_LISTED {
        let _ = write!(text, "\n\n{}", texts::and_more(records.len() - texts::MAX_LISTED));
    }
    text
}
