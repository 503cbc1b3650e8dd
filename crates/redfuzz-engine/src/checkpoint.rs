// Checkpoint store
//
// Append-only JSONL persistence of completed attempts, one file per
// execution id. Every completed result is written and flushed before the
// worker moves on, so a crash loses at most the attempt that was in
// flight. On open, any existing file for the execution id is parsed so
// already-completed work can be filtered out of the new run.

use std::path::{Path, PathBuf};

use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use redfuzz_core::{AttemptResult, Result};

/// Append-only store of completed attempts for one execution id.
///
/// Writes are serialized behind a mutex so concurrent workers never
/// interleave lines.
pub struct CheckpointStore {
    path: PathBuf,
    writer: tokio::sync::Mutex<tokio::fs::File>,
    prior: Vec<AttemptResult>,
}

impl CheckpointStore {
    /// Open (or create) the checkpoint file for `execution_id` under `dir`,
    /// loading any previously persisted results.
    pub async fn open(dir: &Path, execution_id: &str) -> Result<Self> {
        fs::create_dir_all(dir).await?;
        let path = dir.join(execution_id);

        let prior = match fs::read_to_string(&path).await {
            Ok(data) => Self::parse_lines(&path, &data),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(err) => return Err(err.into()),
        };

        if !prior.is_empty() {
            info!(
                execution_id,
                entries = prior.len(),
                "found previous execution, loading checkpointed results"
            );
        }

        let writer = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        Ok(Self {
            path,
            writer: tokio::sync::Mutex::new(writer),
            prior,
        })
    }

    /// Results persisted by a previous run of the same execution id
    pub fn prior_results(&self) -> &[AttemptResult] {
        &self.prior
    }

    /// Take ownership of the previously persisted results
    pub fn take_prior(&mut self) -> Vec<AttemptResult> {
        std::mem::take(&mut self.prior)
    }

    /// Path of the underlying checkpoint file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one completed result and flush it to disk.
    ///
    /// The entry is durable once this returns; it is never rewritten.
    pub async fn append(&self, result: &AttemptResult) -> Result<()> {
        let mut line = serde_json::to_string(result)
            .map_err(|e| anyhow::anyhow!("failed to serialize checkpoint entry: {e}"))?;
        line.push('\n');

        let mut writer = self.writer.lock().await;
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await?;
        debug!(dedup_key = %result.dedup_key(), "checkpointed attempt");
        Ok(())
    }

    /// Parse persisted lines, skipping any that fail to parse.
    ///
    /// A torn trailing line is an expected artifact of an interrupted
    /// writer; the affected attempt simply re-runs.
    fn parse_lines(path: &Path, data: &str) -> Vec<AttemptResult> {
        let mut entries = Vec::new();
        for (lineno, line) in data.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<AttemptResult>(line) {
                Ok(entry) => entries.push(entry),
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        line = lineno + 1,
                        %err,
                        "skipping unparseable checkpoint line"
                    );
                }
            }
        }
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_open_append_reload() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::open(dir.path(), "run-1").await.unwrap();
        assert!(store.prior_results().is_empty());

        let mut entry = AttemptResult::new("a", "Please a", "out-a");
        entry.verdicts.insert("REFUSAL".into(), json!(1));
        store.append(&entry).await.unwrap();
        store.append(&AttemptResult::new("b", "b", "out-b")).await.unwrap();

        let reopened = CheckpointStore::open(dir.path(), "run-1").await.unwrap();
        let prior = reopened.prior_results();
        assert_eq!(prior.len(), 2);
        assert_eq!(prior[0].dedup_key(), "a");
        assert_eq!(prior[0].verdicts["REFUSAL"], json!(1));
        assert_eq!(prior[1].output, "out-b");
    }

    #[tokio::test]
    async fn test_execution_ids_do_not_share_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::open(dir.path(), "run-1").await.unwrap();
        store.append(&AttemptResult::new("a", "a", "out")).await.unwrap();

        let other = CheckpointStore::open(dir.path(), "run-2").await.unwrap();
        assert!(other.prior_results().is_empty());
    }

    #[tokio::test]
    async fn test_truncated_trailing_line_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::open(dir.path(), "run-1").await.unwrap();
        store.append(&AttemptResult::new("a", "a", "out")).await.unwrap();
        let path = store.path().to_path_buf();
        drop(store);

        // Simulate a crash mid-write: torn final line
        let mut data = std::fs::read_to_string(&path).unwrap();
        data.push_str("{\"original_input\":\"b\",\"transfo");
        std::fs::write(&path, data).unwrap();

        let reopened = CheckpointStore::open(dir.path(), "run-1").await.unwrap();
        assert_eq!(reopened.prior_results().len(), 1);
        assert_eq!(reopened.prior_results()[0].dedup_key(), "a");
    }
}
