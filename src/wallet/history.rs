//! Transaction history log
//!
//! One JSON record per line, appended with `O_APPEND` so concurrent writers
//! never overwrite each other. Files written by older faucets hold a single
//! pretty-printed JSON array; those are still readable and get converted to
//! one-record-per-line on the first append.

use std::path::{Path, PathBuf};

use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::{Error, Result};

use super::types::TransactionRecord;

/// History file name inside the wallet data directory
pub const HISTORY_FILE: &str = "faucet-history.json";

/// Append-only log of sent transactions
#[derive(Debug, Clone)]
pub struct TransactionHistory {
    path: PathBuf,
}

impl TransactionHistory {
    /// Log stored at `<data_dir>/faucet-history.json`
    pub fn in_data_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(HISTORY_FILE))
    }

    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record
    pub async fn append(&self, record: &TransactionRecord) -> Result<()> {
        self.migrate_legacy().await?;

        let mut line = serde_json::to_string(record)
            .map_err(|e| Error::History(format!("Failed to serialize record: {}", e)))?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| Error::History(format!("Failed to open {}: {}", self.path.display(), e)))?;

        file.write_all(line.as_bytes())
            .await
            .map_err(|e| Error::History(format!("Failed to write record: {}", e)))?;
        file.flush()
            .await
            .map_err(|e| Error::History(format!("Failed to flush history: {}", e)))?;

        debug!("Recorded transaction {} in {}", record.txid, self.path.display());
        Ok(())
    }

    /// Every record, oldest first. A missing file is an empty log.
    pub async fn all(&self) -> Result<Vec<TransactionRecord>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(Error::History(format!(
                    "Failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        parse_history(&content)
    }

    /// The last `limit` records, oldest first
    pub async fn recent(&self, limit: usize) -> Result<Vec<TransactionRecord>> {
        let mut records = self.all().await?;
        let skip = records.len().saturating_sub(limit);
        Ok(records.split_off(skip))
    }

    /// Number of records in the log
    pub async fn count(&self) -> Result<usize> {
        Ok(self.all().await?.len())
    }

    /// Rewrite a legacy JSON array file as one record per line
    async fn migrate_legacy(&self) -> Result<()> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                return Err(Error::History(format!(
                    "Failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        if !is_legacy(&content) {
            return Ok(());
        }

        let records = parse_history(&content)?;
        let mut lines = String::new();
        for record in &records {
            lines.push_str(&serde_json::to_string(record)?);
            lines.push('\n');
        }

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, lines)
            .await
            .map_err(|e| Error::History(format!("Failed to write {}: {}", tmp.display(), e)))?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| Error::History(format!("Failed to replace history: {}", e)))?;

        info!(
            "Converted {} legacy history records in {}",
            records.len(),
            self.path.display()
        );
        Ok(())
    }
}

fn is_legacy(content: &str) -> bool {
    content.trim_start().starts_with('[')
}

/// Parse either format, preserving file order
fn parse_history(content: &str) -> Result<Vec<TransactionRecord>> {
    if is_legacy(content) {
        return serde_json::from_str(content)
            .map_err(|e| Error::History(format!("Malformed history array: {}", e)));
    }

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str(line).map_err(|e| {
                Error::History(format!("Malformed history record on line {}: {}", idx + 1, e))
            })
        })
        .collect()
}
