use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use wirecore::{NodeId, RunId};

/// Terminal status of a finished run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RunStatus {
    Completed,
    Failed { node: NodeId, reason: String },
}

/// Record of one terminal run outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: RunId,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub status: RunStatus,
    /// Nodes whose executor was invoked.
    pub ran: Vec<NodeId>,
    /// Nodes that finished cleanly.
    pub completed: Vec<NodeId>,
}

#[derive(Default)]
struct Inner {
    running: HashSet<NodeId>,
    history: Vec<RunRecord>,
}

/// Process-wide run state: the set of nodes currently mid-execution
/// across all in-flight runs, and the history of terminal outcomes.
///
/// Constructed once at process start and passed explicitly to every
/// runner. All mutations are read-modify-write under a single lock, so
/// two nodes settling simultaneously never lose each other's update.
/// History (and only history) is persisted to a local JSON slot.
pub struct RunStateStore {
    inner: Mutex<Inner>,
    history_path: Option<PathBuf>,
}

impl RunStateStore {
    pub fn in_memory() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            history_path: None,
        }
    }

    /// Store backed by a history file, loading any records already
    /// there. The running set always starts empty; nothing can be
    /// mid-execution in a fresh process.
    pub fn with_history_file(path: impl Into<PathBuf>) -> Result<Self, wirecore::EngineError> {
        let path = path.into();
        let history = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            inner: Mutex::new(Inner {
                running: HashSet::new(),
                history,
            }),
            history_path: Some(path),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn mark_running(&self, node: NodeId) {
        self.lock().running.insert(node);
    }

    pub fn mark_settled(&self, node: NodeId) {
        self.lock().running.remove(&node);
    }

    /// Atomically claim every node of an execution plan.
    ///
    /// The overlap test and the running-set insertions are one
    /// read-modify-write, so two runs racing over a shared subgraph
    /// cannot both pass the gate. When any node is already
    /// mid-execution the overlapping nodes are returned and nothing is
    /// claimed.
    pub fn try_claim(&self, nodes: impl IntoIterator<Item = NodeId>) -> Result<(), Vec<NodeId>> {
        let mut inner = self.lock();
        let nodes: Vec<NodeId> = nodes.into_iter().collect();
        let busy: Vec<NodeId> = nodes
            .iter()
            .copied()
            .filter(|n| inner.running.contains(n))
            .collect();
        if !busy.is_empty() {
            return Err(busy);
        }
        inner.running.extend(nodes);
        Ok(())
    }

    /// Give back claims a run still holds at its terminal outcome.
    pub fn release(&self, nodes: impl IntoIterator<Item = NodeId>) {
        let mut inner = self.lock();
        for node in nodes {
            inner.running.remove(&node);
        }
    }

    pub fn is_running(&self, node: NodeId) -> bool {
        self.lock().running.contains(&node)
    }

    pub fn running_nodes(&self) -> HashSet<NodeId> {
        self.lock().running.clone()
    }

    /// Nodes from `nodes` that are currently mid-execution. Non-empty
    /// means a new run over them must be refused.
    pub fn running_overlap(&self, nodes: impl IntoIterator<Item = NodeId>) -> Vec<NodeId> {
        let inner = self.lock();
        nodes
            .into_iter()
            .filter(|n| inner.running.contains(n))
            .collect()
    }

    /// Append a terminal run record and persist history.
    ///
    /// Persistence is best-effort observability; a failed write is
    /// logged, not propagated into the run outcome.
    pub fn append_record(&self, record: RunRecord) {
        let mut inner = self.lock();
        inner.history.push(record);
        if let Some(path) = &self.history_path {
            if let Err(e) = Self::persist(path, &inner.history) {
                tracing::warn!("failed to persist run history to {}: {}", path.display(), e);
            }
        }
    }

    fn persist(path: &PathBuf, history: &[RunRecord]) -> Result<(), wirecore::EngineError> {
        let json = serde_json::to_string_pretty(history)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn history(&self) -> Vec<RunRecord> {
        self.lock().history.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn claim_is_all_or_nothing() {
        let store = RunStateStore::in_memory();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();

        store.try_claim([a, b]).unwrap();
        let busy = store.try_claim([b, c]).unwrap_err();
        assert_eq!(busy, vec![b]);
        // The refused attempt claimed nothing.
        assert!(!store.is_running(c));

        store.release([a, b]);
        store.try_claim([b, c]).unwrap();
    }

    #[test]
    fn running_set_tracks_marks_atomically() {
        let store = RunStateStore::in_memory();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        store.mark_running(a);
        store.mark_running(b);
        assert!(store.is_running(a));
        assert_eq!(store.running_overlap([a, b, Uuid::new_v4()]), vec![a, b]);

        store.mark_settled(a);
        assert!(!store.is_running(a));
        assert!(store.is_running(b));
    }

    #[test]
    fn history_round_trips_through_the_file_slot() {
        let path = std::env::temp_dir().join(format!("wireflow-history-{}.json", Uuid::new_v4()));

        let store = RunStateStore::with_history_file(&path).unwrap();
        let node = Uuid::new_v4();
        store.append_record(RunRecord {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            status: RunStatus::Failed {
                node,
                reason: "boom".to_string(),
            },
            ran: vec![node],
            completed: vec![],
        });

        let reloaded = RunStateStore::with_history_file(&path).unwrap();
        let history = reloaded.history();
        assert_eq!(history.len(), 1);
        assert_eq!(
            history[0].status,
            RunStatus::Failed {
                node,
                reason: "boom".to_string()
            }
        );
        assert!(reloaded.running_nodes().is_empty());

        std::fs::remove_file(&path).ok();
    }
}
