use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use webagent_core_types::{now_epoch_ms, TraceId};

use crate::error::ReplayError;
use crate::model::{ReplayEvent, TraceIndex, TraceManifest};

/// Append-only, file-backed event log: one `{trace}.jsonl` line-delimited file
/// plus a `{trace}.index.json` sidecar per trace, both under `traces_root`.
/// No fsync guarantee is made — a crash between `write` and the OS flushing
/// its buffers can lose the last line.
pub struct ReplayStore {
    traces_root: PathBuf,
}

impl ReplayStore {
    pub fn new(traces_root: impl Into<PathBuf>) -> Self {
        Self {
            traces_root: traces_root.into(),
        }
    }

    fn trace_path(&self, trace_id: &TraceId) -> PathBuf {
        self.traces_root.join(format!("{}.jsonl", trace_id.sanitized()))
    }

    fn index_path(&self, trace_id: &TraceId) -> PathBuf {
        self.traces_root
            .join(format!("{}.index.json", trace_id.sanitized()))
    }

    /// Frame artifacts for this trace live under `{traces_root}/{trace}/frames/`.
    pub fn frames_dir(&self, trace_id: &TraceId) -> PathBuf {
        self.traces_root.join(trace_id.sanitized()).join("frames")
    }

    pub async fn append(&self, trace_id: &TraceId, event: &ReplayEvent) -> Result<(), ReplayError> {
        fs::create_dir_all(&self.traces_root).await?;
        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.trace_path(trace_id))
            .await?;
        file.write_all(&line).await?;
        Ok(())
    }

    pub async fn load(&self, trace_id: &TraceId) -> Result<TraceManifest, ReplayError> {
        let path = self.trace_path(trace_id);
        let raw = match fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(TraceManifest {
                    trace_id: trace_id.as_str().to_string(),
                    created_at: now_epoch_ms(),
                    session_id: None,
                    events: Vec::new(),
                });
            }
            Err(err) => return Err(err.into()),
        };

        let mut events = Vec::new();
        for (lineno, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<ReplayEvent>(line) {
                Ok(event) => events.push(event),
                Err(err) => {
                    warn!(lineno, %err, "dropping malformed replay line");
                }
            }
        }

        let created_at = events.first().map(|e| e.at).unwrap_or_else(now_epoch_ms);
        let session_id = events
            .iter()
            .find(|e| matches!(e.event_type, crate::model::ReplayEventType::Create))
            .and_then(|e| e.payload.get("session_id"))
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());

        Ok(TraceManifest {
            trace_id: trace_id.as_str().to_string(),
            created_at,
            session_id,
            events,
        })
    }

    /// Keep events with `start <= index <= end`, either bound optional.
    pub async fn filter(
        &self,
        trace_id: &TraceId,
        start: Option<u64>,
        end: Option<u64>,
    ) -> Result<Vec<ReplayEvent>, ReplayError> {
        let manifest = self.load(trace_id).await?;
        Ok(manifest
            .events
            .into_iter()
            .filter(|e| start.map(|s| e.index >= s).unwrap_or(true))
            .filter(|e| end.map(|en| e.index <= en).unwrap_or(true))
            .collect())
    }

    pub async fn persist_trace_index(&self, trace_id: &TraceId, total: u64) -> Result<(), ReplayError> {
        fs::create_dir_all(&self.traces_root).await?;
        let index = TraceIndex {
            trace_id: trace_id.as_str().to_string(),
            total,
            updated_at: now_epoch_ms(),
        };
        let bytes = serde_json::to_vec_pretty(&index)?;
        fs::write(self.index_path(trace_id), bytes).await?;
        Ok(())
    }

    /// Best-effort removal of both files; missing files are not an error.
    pub async fn cleanup(&self, trace_id: &TraceId) {
        for path in [self.trace_path(trace_id), self.index_path(trace_id)] {
            if let Err(err) = fs::remove_file(&path).await {
                if err.kind() != std::io::ErrorKind::NotFound {
                    debug!(?path, %err, "failed to remove trace artifact during cleanup");
                }
            }
        }
    }

    pub fn traces_root(&self) -> &Path {
        &self.traces_root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ReplayEventType;

    fn event(index: u64, event_type: ReplayEventType) -> ReplayEvent {
        ReplayEvent {
            event_type,
            index,
            at: index,
            payload: serde_json::json!({}),
        }
    }

    #[tokio::test]
    async fn s6_filter_returns_middle_events_inclusive() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReplayStore::new(dir.path());
        let trace = TraceId("trace-1".to_string());

        for i in 1..=5 {
            store
                .append(&trace, &event(i, ReplayEventType::Step))
                .await
                .unwrap();
        }

        let filtered = store.filter(&trace, Some(2), Some(4)).await.unwrap();
        let indices: Vec<u64> = filtered.iter().map(|e| e.index).collect();
        assert_eq!(indices, vec![2, 3, 4]);
    }

    #[tokio::test]
    async fn load_missing_trace_returns_empty_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReplayStore::new(dir.path());
        let trace = TraceId("missing".to_string());

        let manifest = store.load(&trace).await.unwrap();
        assert!(manifest.events.is_empty());
        assert_eq!(manifest.trace_id, "missing");
    }

    #[tokio::test]
    async fn load_drops_malformed_lines() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReplayStore::new(dir.path());
        let trace = TraceId("trace-2".to_string());

        store.append(&trace, &event(1, ReplayEventType::Create)).await.unwrap();
        let mut file = fs::OpenOptions::new()
            .append(true)
            .open(store.trace_path(&trace))
            .await
            .unwrap();
        file.write_all(b"not json\n").await.unwrap();
        store.append(&trace, &event(2, ReplayEventType::Step)).await.unwrap();

        let manifest = store.load(&trace).await.unwrap();
        assert_eq!(manifest.events.len(), 2);
    }

    #[tokio::test]
    async fn cleanup_removes_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReplayStore::new(dir.path());
        let trace = TraceId("trace-3".to_string());

        store.append(&trace, &event(1, ReplayEventType::Create)).await.unwrap();
        store.persist_trace_index(&trace, 1).await.unwrap();

        store.cleanup(&trace).await;
        assert!(!store.trace_path(&trace).exists());
        assert!(!store.index_path(&trace).exists());
    }
}
