use crate::{connector, Registry, RunReport, RunStateStore, SharedGraph, Snapshot, WorkflowRunner};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use wirecore::{EdgeId, EngineError, EventBus, Graph, NodeId, RunEvent};

/// Configuration for the runtime
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub event_capacity: usize,
    /// Local slot the run history is persisted to; in-memory when absent.
    pub history_file: Option<PathBuf>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            event_capacity: 1000,
            history_file: None,
        }
    }
}

/// Owns the shared graph, the registry, and the process-wide run state;
/// exposes the single run trigger, `run_workflow(start)`.
pub struct WireRuntime {
    graph: SharedGraph,
    registry: Arc<Registry>,
    run_state: Arc<RunStateStore>,
    events: Arc<EventBus>,
}

impl WireRuntime {
    pub fn new(graph: Graph, registry: Registry, config: RuntimeConfig) -> Result<Self, EngineError> {
        let run_state = match &config.history_file {
            Some(path) => RunStateStore::with_history_file(path)?,
            None => RunStateStore::in_memory(),
        };
        Ok(Self::with_run_state(graph, registry, Arc::new(run_state), config))
    }

    /// Runtime over an externally constructed run-state store, for
    /// callers that share one store across several runtimes.
    pub fn with_run_state(
        graph: Graph,
        registry: Registry,
        run_state: Arc<RunStateStore>,
        config: RuntimeConfig,
    ) -> Self {
        Self {
            graph: Arc::new(RwLock::new(graph)),
            registry: Arc::new(registry),
            run_state,
            events: Arc::new(EventBus::new(config.event_capacity)),
        }
    }

    pub fn graph(&self) -> SharedGraph {
        self.graph.clone()
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn run_state(&self) -> &Arc<RunStateStore> {
        &self.run_state
    }

    pub fn subscribe_events(&self) -> tokio::sync::broadcast::Receiver<RunEvent> {
        self.events.subscribe()
    }

    /// Connect `source` to `target`, assigning the first matching input
    /// slot of the target.
    pub async fn connect(&self, source: NodeId, target: NodeId) -> Result<EdgeId, EngineError> {
        let mut graph = self.graph.write().await;
        Ok(connector::connect(&mut graph, &self.registry, source, target)?)
    }

    /// Build a snapshot from the current graph state and hand it to a
    /// fresh runner. The plan is frozen before the first node fires.
    pub async fn run_workflow(&self, start: NodeId) -> Result<RunReport, EngineError> {
        let snapshot = {
            let graph = self.graph.read().await;
            Snapshot::build(&graph, start)?
        };

        let runner = WorkflowRunner::new(
            self.graph.clone(),
            self.registry.clone(),
            self.run_state.clone(),
            self.events.clone(),
            snapshot,
        );
        Ok(runner.run().await)
    }
}
