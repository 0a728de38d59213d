use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

/// Append-only journal of submitted ideas, one per line
pub struct IdeaJournal {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl IdeaJournal {
    /// Creates a journal backed by `path`; the file is created on first write
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// All recorded ideas in submission order
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file exists but cannot be read.
    pub async fn load(&self) -> std::io::Result<Vec<String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => Ok(content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(ToString::to_string)
                .collect()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    /// Appends `idea` unless it is already present; returns whether it was written
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the journal cannot be read or appended to.
    pub async fn record(&self, idea: &str) -> std::io::Result<bool> {
        // Keep one idea per line
        let idea = idea.split_whitespace().collect::<Vec<_>>().join(" ");
        if idea.is_empty() {
            return Ok(false);
        }

        let _guard = self.write_lock.lock().await;
        if self.load().await?.iter().any(|known| *known == idea) {
            debug!("Idea already journaled");
            return Ok(false);
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(format!("{idea}\n").as_bytes()).await?;
        file.flush().await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_record_deduplicates() -> std::io::Result<()> {
        let dir = tempfile::tempdir()?;
        let journal = IdeaJournal::new(dir.path().join("ideas.txt"));

        assert!(journal.load().await?.is_empty());
        assert!(journal.record("Агент для\nсверки актов").await?);
        assert!(!journal.record("Агент для сверки актов").await?);
        assert!(journal.record("Бот для отпусков").await?);
        assert!(!journal.record("   ").await?);

        assert_eq!(
            journal.load().await?,
            vec!["Агент для сверки актов", "Бот для отпусков"]
        );
        Ok(())
    }
}
