//! Append-only process journal with file-based persistence.
//!
//! Every process writes its events as newline-delimited JSON (JSONL) so
//! a run can be inspected after the fact without the backend.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use uuid::Uuid;

use crate::domain::ProcessEvent;

/// JSONL journal for a single process.
pub struct ProcessJournal {
    events_path: PathBuf,
}

impl ProcessJournal {
    /// Create or open the journal for a process under `root`.
    pub async fn open(root: &Path, process_id: Uuid) -> Result<Self> {
        let process_dir = root.join("processes").join(process_id.to_string());

        fs::create_dir_all(&process_dir)
            .await
            .with_context(|| format!("Failed to create journal directory: {}", process_dir.display()))?;

        Ok(Self {
            events_path: process_dir.join("events.jsonl"),
        })
    }

    pub fn events_path(&self) -> &Path {
        &self.events_path
    }

    /// Append an event to the log.
    pub async fn append(&self, event: &ProcessEvent) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.events_path)
            .await
            .with_context(|| {
                format!("Failed to open journal file: {}", self.events_path.display())
            })?;

        let json = serde_json::to_string(event).context("Failed to serialize process event")?;
        file.write_all(format!("{}\n", json).as_bytes())
            .await
            .context("Failed to write process event")?;
        file.flush().await.context("Failed to flush process event")?;

        Ok(())
    }

    /// Replay all events in append order.
    pub async fn replay(&self) -> Result<Vec<ProcessEvent>> {
        if !self.events_path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.events_path)
            .await
            .with_context(|| format!("Failed to open journal file: {}", self.events_path.display()))?;

        let reader = BufReader::new(file);
        let mut lines = reader.lines();
        let mut events = Vec::new();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let event: ProcessEvent = serde_json::from_str(&line)
                .with_context(|| format!("Failed to parse process event: {}", line))?;
            events.push(event);
        }

        Ok(events)
    }

    /// List all journaled process ids under `root`.
    pub async fn list_processes(root: &Path) -> Result<Vec<Uuid>> {
        let processes_dir = root.join("processes");

        if !processes_dir.exists() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::new();
        let mut entries = fs::read_dir(&processes_dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    if let Ok(id) = Uuid::parse_str(name) {
                        ids.push(id);
                    }
                }
            }
        }

        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ProcessEventKind, Stage};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_append_and_replay_order() {
        let temp = TempDir::new().unwrap();
        let process_id = Uuid::new_v4();
        let journal = ProcessJournal::open(temp.path(), process_id).await.unwrap();

        for stage in Stage::PIPELINE {
            let event = ProcessEvent::new(
                process_id,
                "sig_1",
                Some(stage),
                ProcessEventKind::StageActivated,
                format!("{} started", stage),
            );
            journal.append(&event).await.unwrap();
        }

        let events = journal.replay().await.unwrap();
        assert_eq!(events.len(), 4);
        let stages: Vec<_> = events.iter().filter_map(|e| e.stage).collect();
        assert_eq!(stages, Stage::PIPELINE.to_vec());
    }

    #[tokio::test]
    async fn test_replay_missing_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let journal = ProcessJournal::open(temp.path(), Uuid::new_v4()).await.unwrap();

        let events = journal.replay().await.unwrap();
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_list_processes() {
        let temp = TempDir::new().unwrap();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        ProcessJournal::open(temp.path(), a).await.unwrap();
        ProcessJournal::open(temp.path(), b).await.unwrap();

        let mut ids = ProcessJournal::list_processes(temp.path()).await.unwrap();
        ids.sort();
        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(ids, expected);
    }
}
