//! Registry of existing AI agents
//!
//! The registry lives in a spreadsheet maintained by hand. Two layouts are
//! in circulation: the full eight-column export (block, team, owner, contact,
//! name, short name, description, type) and the older four-column sheet
//! (name, team, contact, description).

mod journal;

pub use journal::IdeaJournal;

use crate::idea::similarity;
use calamine::Reader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Header width from which a sheet is read as the full layout
const FULL_LAYOUT_WIDTH: usize = 8;

/// Prompt listing used when the registry has no rows
pub const EMPTY_DIGEST: &str = "(список инициатив пуст)";

/// Errors that can occur while reading the registry
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The spreadsheet does not exist
    #[error("registry file not found: {0}")]
    NotFound(PathBuf),
    /// The spreadsheet could not be opened or parsed
    #[error("failed to open registry: {0}")]
    Open(String),
    /// The workbook contains no worksheets
    #[error("registry workbook has no sheets")]
    NoSheets,
}

/// Column layout of the registry sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// block, team, owner, contact, name, short name, description, type
    Full,
    /// name, team, contact, description
    Compact,
}

/// One row of the registry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentRecord {
    /// Business block
    pub block: Option<String>,
    /// Development team (ССП)
    pub team: Option<String>,
    /// Initiative owner
    pub owner: Option<String>,
    /// Leader contact
    pub contact: Option<String>,
    /// Initiative name
    pub name: String,
    /// Short name
    pub short_name: Option<String>,
    /// What the agent does
    pub description: Option<String>,
    /// Initiative type
    pub kind: Option<String>,
}

impl AgentRecord {
    fn labeled_fields(&self) -> [(&'static str, Option<&str>); 8] {
        [
            ("Название", Some(self.name.as_str())),
            ("Краткое название", self.short_name.as_deref()),
            ("Блок", self.block.as_deref()),
            ("Команда", self.team.as_deref()),
            ("Владелец", self.owner.as_deref()),
            ("Контакт", self.contact.as_deref()),
            ("Описание", self.description.as_deref()),
            ("Тип", self.kind.as_deref()),
        ]
    }

    /// Markdown card shown to users
    #[must_use]
    pub fn card(&self) -> String {
        self.labeled_fields()
            .iter()
            .filter_map(|(label, value)| value.map(|v| format!("**{label}:** {v}")))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Plain labeled block embedded into LLM prompts
    #[must_use]
    pub fn prompt_block(&self) -> String {
        self.labeled_fields()
            .iter()
            .filter_map(|(label, value)| value.map(|v| format!("{label}: {v}")))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Who to talk to about this agent: owner and/or contact
    #[must_use]
    pub fn responsible(&self) -> Option<String> {
        match (&self.owner, &self.contact) {
            (Some(owner), Some(contact)) => Some(format!("{owner} ({contact})")),
            (Some(one), None) | (None, Some(one)) => Some(one.clone()),
            (None, None) => None,
        }
    }

    fn from_row(layout: Layout, row: &[String]) -> Option<Self> {
        let cell = |idx: usize| {
            row.get(idx)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(ToString::to_string)
        };

        match layout {
            Layout::Full => Some(Self {
                block: cell(0),
                team: cell(1),
                owner: cell(2),
                contact: cell(3),
                name: cell(4)?,
                short_name: cell(5),
                description: cell(6),
                kind: cell(7),
            }),
            Layout::Compact => Some(Self {
                name: cell(0)?,
                team: cell(1),
                contact: cell(2),
                description: cell(3),
                ..Self::default()
            }),
        }
    }
}

/// Parsed registry sheet
#[derive(Debug, Clone)]
pub struct Registry {
    layout: Layout,
    records: Vec<AgentRecord>,
}

impl Registry {
    /// Builds the registry from raw rows; the first row is the header
    #[must_use]
    pub fn from_rows(rows: &[Vec<String>]) -> Self {
        let header_width = rows
            .first()
            .and_then(|header| header.iter().rposition(|cell| !cell.trim().is_empty()))
            .map_or(0, |last| last + 1);
        let layout = if header_width >= FULL_LAYOUT_WIDTH {
            Layout::Full
        } else {
            Layout::Compact
        };

        let records = rows
            .iter()
            .skip(1)
            .filter_map(|row| AgentRecord::from_row(layout, row))
            .collect();

        Self { layout, records }
    }

    /// Reads the first worksheet of `path` on the blocking pool
    ///
    /// # Errors
    ///
    /// Returns `RegistryError` if the file is missing or unreadable.
    pub async fn load(path: &Path) -> Result<Self, RegistryError> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || Self::load_blocking(&path))
            .await
            .map_err(|e| RegistryError::Open(e.to_string()))?
    }

    fn load_blocking(path: &Path) -> Result<Self, RegistryError> {
        if !path.exists() {
            return Err(RegistryError::NotFound(path.to_path_buf()));
        }

        let mut workbook =
            calamine::open_workbook_auto(path).map_err(|e| RegistryError::Open(e.to_string()))?;
        let first = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or(RegistryError::NoSheets)?;
        let range = workbook
            .worksheet_range(&first)
            .map_err(|e| RegistryError::Open(e.to_string()))?;

        let rows: Vec<Vec<String>> = range
            .rows()
            .map(|row| row.iter().map(ToString::to_string).collect())
            .collect();

        let registry = Self::from_rows(&rows);
        info!(
            path = %path.display(),
            sheet = %first,
            layout = ?registry.layout,
            agents = registry.records.len(),
            "Agent registry loaded"
        );
        Ok(registry)
    }

    /// Detected sheet layout
    #[must_use]
    pub const fn layout(&self) -> Layout {
        self.layout
    }

    /// All records in sheet order
    #[must_use]
    pub fn records(&self) -> &[AgentRecord] {
        &self.records
    }

    /// Case-insensitive substring search on name and short name
    #[must_use]
    pub fn search_by_name(&self, term: &str) -> Vec<&AgentRecord> {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return Vec::new();
        }
        self.records
            .iter()
            .filter(|r| {
                contains_ci(&r.name, &term)
                    || r.short_name.as_deref().is_some_and(|s| contains_ci(s, &term))
            })
            .collect()
    }

    /// Records with a known owner or contact whose text mentions `query`
    #[must_use]
    pub fn find_helpers(&self, query: &str) -> Vec<&AgentRecord> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Vec::new();
        }
        self.records
            .iter()
            .filter(|r| r.responsible().is_some())
            .filter(|r| {
                contains_ci(&r.name, &query)
                    || [&r.short_name, &r.description, &r.team]
                        .iter()
                        .any(|f| f.as_deref().is_some_and(|s| contains_ci(s, &query)))
            })
            .collect()
    }

    /// Exact case-insensitive name match
    #[must_use]
    pub fn contains_name(&self, name: &str) -> bool {
        let name = name.trim().to_lowercase();
        !name.is_empty() && self.records.iter().any(|r| r.name.to_lowercase() == name)
    }

    /// Records whose name or short name is at least `threshold` similar to `text`, best first
    #[must_use]
    pub fn similar_to(&self, text: &str, threshold: f32) -> Vec<(&AgentRecord, f32)> {
        let mut matches: Vec<(&AgentRecord, f32)> = self
            .records
            .iter()
            .filter_map(|r| {
                let by_name = similarity::ratio(text, &r.name);
                let by_short = r
                    .short_name
                    .as_deref()
                    .map_or(0.0, |s| similarity::ratio(text, s));
                let score = by_name.max(by_short);
                (score >= threshold).then_some((r, score))
            })
            .collect();
        matches.sort_by(|a, b| b.1.total_cmp(&a.1));
        matches
    }

    /// First record whose name contains `text`, used as a contact fallback
    #[must_use]
    pub fn contact_for(&self, text: &str) -> Option<String> {
        let text = text.trim().to_lowercase();
        if text.is_empty() {
            return None;
        }
        self.records
            .iter()
            .find(|r| contains_ci(&r.name, &text))
            .and_then(|r| r.contact.clone().or_else(|| r.owner.clone()))
    }

    /// Prompt-ready listing of every record
    #[must_use]
    pub fn digest(&self) -> String {
        if self.records.is_empty() {
            return EMPTY_DIGEST.to_string();
        }
        self.records
            .iter()
            .map(AgentRecord::prompt_block)
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

fn contains_ci(haystack: &str, lowered_needle: &str) -> bool {
    haystack.to_lowercase().contains(lowered_needle)
}

/// Registry cache that reloads the sheet when its modification time changes
pub struct RegistryStore {
    path: PathBuf,
    cached: RwLock<Option<(SystemTime, Arc<Registry>)>>,
}

impl RegistryStore {
    /// Creates a store for the sheet at `path`; nothing is read yet
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cached: RwLock::new(None),
        }
    }

    /// Path of the registry spreadsheet
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the current registry, reloading it if the file changed
    ///
    /// # Errors
    ///
    /// Returns `RegistryError` if the file is missing or unreadable.
    pub async fn current(&self) -> Result<Arc<Registry>, RegistryError> {
        let modified = match tokio::fs::metadata(&self.path).await {
            Ok(meta) => meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RegistryError::NotFound(self.path.clone()));
            }
            Err(e) => return Err(RegistryError::Open(e.to_string())),
        };

        if let Some((stamp, registry)) = self.cached.read().await.as_ref() {
            if *stamp == modified {
                return Ok(Arc::clone(registry));
            }
        }

        let mut cached = self.cached.write().await;
        if let Some((stamp, registry)) = cached.as_ref() {
            if *stamp == modified {
                return Ok(Arc::clone(registry));
            }
        }

        debug!(path = %self.path.display(), "Registry changed on disk, reloading");
        let registry = Arc::new(Registry::load(&self.path).await?);
        *cached = Some((modified, Arc::clone(&registry)));
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(ToString::to_string).collect()
    }

    fn full_sheet() -> Vec<Vec<String>> {
        vec![
            row(&[
                "Блок", "ССП", "Владелец", "Контакт", "Название", "Краткое", "Описание", "Тип",
            ]),
            row(&[
                "Розница",
                "ЦК ИИ",
                "Иванов И.",
                "@ivanov",
                "Агент сверки платежей",
                "Сверка",
                "Сверяет выписки с учётом",
                "Агент",
            ]),
            row(&["", "", "", "", "", "", "строка без названия", ""]),
            row(&["КИБ", "", "", "", "Помощник юриста", "", "", ""]),
        ]
    }

    #[test]
    fn test_full_layout_skips_header_and_unnamed_rows() {
        let registry = Registry::from_rows(&full_sheet());
        assert_eq!(registry.layout(), Layout::Full);
        assert_eq!(registry.records().len(), 2);

        let first = &registry.records()[0];
        assert_eq!(first.name, "Агент сверки платежей");
        assert_eq!(first.owner.as_deref(), Some("Иванов И."));
        assert_eq!(first.kind.as_deref(), Some("Агент"));
        assert_eq!(registry.records()[1].contact, None);
    }

    #[test]
    fn test_compact_layout() {
        let rows = vec![
            row(&["Название", "Команда", "Контакт", "Описание"]),
            row(&["  HR-бот ", "HR Tech", "@hr_lead", "Отвечает на вопросы"]),
            row(&["", "x", "y", "z"]),
            row(&["Короткая строка"]),
        ];
        let registry = Registry::from_rows(&rows);

        assert_eq!(registry.layout(), Layout::Compact);
        assert_eq!(registry.records().len(), 2);
        assert_eq!(registry.records()[0].name, "HR-бот");
        assert_eq!(registry.records()[0].team.as_deref(), Some("HR Tech"));
        assert_eq!(registry.records()[1].description, None);
    }

    #[test]
    fn test_search_and_helpers() {
        let registry = Registry::from_rows(&full_sheet());

        assert_eq!(registry.search_by_name("СВЕРКА").len(), 1);
        assert_eq!(registry.search_by_name("помощник").len(), 1);
        assert!(registry.search_by_name("   ").is_empty());

        let helpers = registry.find_helpers("выписки");
        assert_eq!(helpers.len(), 1);
        assert_eq!(helpers[0].responsible().as_deref(), Some("Иванов И. (@ivanov)"));
        // No owner or contact on record
        assert!(registry.find_helpers("юриста").is_empty());
    }

    #[test]
    fn test_contains_name_is_exact() {
        let registry = Registry::from_rows(&full_sheet());
        assert!(registry.contains_name("агент сверки платежей "));
        assert!(!registry.contains_name("агент сверки"));
    }

    #[test]
    fn test_similar_to_orders_best_first() {
        let registry = Registry::from_rows(&full_sheet());
        let matches = registry.similar_to("агент сверки платежа", 0.8);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].0.name, "Агент сверки платежей");
        assert!(registry.similar_to("генератор картинок", 0.8).is_empty());
    }

    #[test]
    fn test_digest() {
        let registry = Registry::from_rows(&full_sheet());
        let digest = registry.digest();
        assert!(digest.contains("Название: Агент сверки платежей\nКраткое название: Сверка"));
        assert!(digest.contains("\n\nНазвание: Помощник юриста\nБлок: КИБ"));

        let empty = Registry::from_rows(&[row(&["Название"])]);
        assert_eq!(empty.digest(), EMPTY_DIGEST);
    }

    #[tokio::test]
    async fn test_store_reports_missing_file() {
        let store = RegistryStore::new("/nonexistent/agents.xlsx");
        assert!(matches!(
            store.current().await,
            Err(RegistryError::NotFound(_))
        ));
    }
}
