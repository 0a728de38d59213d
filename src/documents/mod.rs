//! Word/Excel artifact generation
//!
//! Office files are plain zip packages of XML parts. Only the parts needed
//! for Word, Excel and `calamine` to open them are written.

/// WordprocessingML writer.
pub mod docx;
/// SpreadsheetML writer.
pub mod xlsx;

use crate::registry::AgentRecord;
use chrono::Local;
use std::fs::File;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;
use xlsx::XlsxTable;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Title of the Word template
pub const TEMPLATE_TITLE: &str = "AI-агент — шаблон";
/// Sheet name of the Excel template
pub const TEMPLATE_SHEET: &str = "Агент";
/// Sheet name of the initiatives export
pub const INITIATIVES_SHEET: &str = "Инициативы";
/// Header of the initiatives export
pub const INITIATIVES_HEADER: [&str; 4] =
    ["Название", "Команда разработки", "Контакт лидера", "Суть агента"];

/// Errors that can occur while writing documents
#[derive(Debug, Error)]
pub enum DocumentError {
    /// Filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Zip container failure
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// Word and Excel renderings of one template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSet {
    /// `.docx` file
    pub word: PathBuf,
    /// `.xlsx` file
    pub excel: PathBuf,
}

/// Writes generated files into the output directory
#[derive(Debug, Clone)]
pub struct DocumentFactory {
    output_dir: PathBuf,
}

impl DocumentFactory {
    /// Creates a factory writing into `output_dir`
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Directory files are written to
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Renders a filled template as `.docx` and `.xlsx`
    ///
    /// # Errors
    ///
    /// Returns `DocumentError` if the files cannot be written.
    pub async fn template_files(
        &self,
        fields: Vec<(String, String)>,
    ) -> Result<ArtifactSet, DocumentError> {
        let stem = file_stem("agent");
        let word = self.output_dir.join(format!("{stem}.docx"));
        let excel = self.output_dir.join(format!("{stem}.xlsx"));
        let artifacts = ArtifactSet { word, excel };

        let dir = self.output_dir.clone();
        let paths = artifacts.clone();
        run_blocking(move || {
            std::fs::create_dir_all(&dir)?;
            docx::write_template(&paths.word, TEMPLATE_TITLE, &fields)?;
            xlsx::write_table(&paths.excel, &template_table(&fields))
        })
        .await?;

        info!(word = %artifacts.word.display(), excel = %artifacts.excel.display(), "Template files written");
        Ok(artifacts)
    }

    /// Exports registry records as an initiatives sheet
    ///
    /// # Errors
    ///
    /// Returns `DocumentError` if the file cannot be written.
    pub async fn initiatives_excel(
        &self,
        records: Vec<AgentRecord>,
    ) -> Result<PathBuf, DocumentError> {
        let path = self
            .output_dir
            .join(format!("{}.xlsx", file_stem("initiatives")));

        let dir = self.output_dir.clone();
        let target = path.clone();
        run_blocking(move || {
            std::fs::create_dir_all(&dir)?;
            xlsx::write_table(&target, &initiatives_table(&records))
        })
        .await?;

        info!(path = %path.display(), "Initiatives export written");
        Ok(path)
    }

    /// Deletes files in the output dir last modified at least `max_age` ago
    ///
    /// Returns how many files were removed. A missing directory counts as empty.
    ///
    /// # Errors
    ///
    /// Returns `DocumentError::Io` if the directory cannot be listed.
    pub async fn sweep_expired(&self, max_age: Duration) -> Result<usize, DocumentError> {
        let mut entries = match tokio::fs::read_dir(&self.output_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let now = SystemTime::now();
        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            let Ok(meta) = entry.metadata().await else {
                continue;
            };
            let age = meta
                .modified()
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .unwrap_or_default();
            if !meta.is_file() || age < max_age {
                continue;
            }
            match tokio::fs::remove_file(entry.path()).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!(path = %entry.path().display(), "Failed to remove expired file: {e}"),
            }
        }

        if removed > 0 {
            info!(removed, "Expired generated files removed");
        }
        Ok(removed)
    }
}

async fn run_blocking<F>(job: F) -> Result<(), DocumentError>
where
    F: FnOnce() -> Result<(), DocumentError> + Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|e| DocumentError::Io(std::io::Error::other(e)))?
}

/// `{prefix}_{YYYYMMDD_HHMMSS}_{8 hex}`; the suffix keeps concurrent sessions apart
fn file_stem(prefix: &str) -> String {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{prefix}_{timestamp}_{}", &suffix[..8])
}

fn template_table(fields: &[(String, String)]) -> XlsxTable {
    XlsxTable {
        sheet_name: TEMPLATE_SHEET.to_string(),
        header: vec!["Поле".to_string(), "Значение".to_string()],
        rows: fields
            .iter()
            .map(|(field, value)| vec![field.clone(), value.clone()])
            .collect(),
        column_widths: vec![30.0, 60.0],
    }
}

fn initiatives_table(records: &[AgentRecord]) -> XlsxTable {
    let cell = |value: &Option<String>| value.clone().unwrap_or_default();
    XlsxTable {
        sheet_name: INITIATIVES_SHEET.to_string(),
        header: INITIATIVES_HEADER.iter().map(ToString::to_string).collect(),
        rows: records
            .iter()
            .map(|r| {
                vec![
                    r.name.clone(),
                    cell(&r.team),
                    cell(&r.contact),
                    cell(&r.description),
                ]
            })
            .collect(),
        column_widths: vec![30.0, 25.0, 25.0, 60.0],
    }
}

/// Writes a zip package from `(part name, xml)` pairs
pub(crate) fn write_package(path: &Path, parts: &[(&str, String)]) -> Result<(), DocumentError> {
    let file = BufWriter::new(File::create(path)?);
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, xml) in parts {
        zip.start_file(*name, options)?;
        zip.write_all(xml.as_bytes())?;
    }

    zip.finish()?.flush()?;
    Ok(())
}

/// Escapes text for XML and drops control characters XML 1.0 cannot carry
pub(crate) fn xml_text(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\t'))
        .collect();
    quick_xml::escape::escape(cleaned.as_str()).into_owned()
}
