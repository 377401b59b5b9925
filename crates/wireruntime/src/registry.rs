use crate::SharedGraph;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use wirecore::{Graph, GraphError, InputContract, NodeError, NodeId, NodeType, RunId, Value, ValueType};

/// Context handed to an executor for one node firing.
///
/// Gives the executor read access to the live graph and lets it write
/// back into its own node's props, the only graph mutation this layer
/// sanctions.
#[derive(Clone)]
pub struct ExecContext {
    pub run_id: RunId,
    pub node_id: NodeId,
    graph: SharedGraph,
}

impl ExecContext {
    pub fn new(run_id: RunId, node_id: NodeId, graph: SharedGraph) -> Self {
        Self {
            run_id,
            node_id,
            graph,
        }
    }

    /// Read a prop of the executing node.
    pub async fn prop(&self, key: &str) -> Option<Value> {
        self.graph.read().await.prop(self.node_id, key).cloned()
    }

    /// Update a prop of the executing node, visible to later snapshot
    /// builds and to whatever renders the graph.
    pub async fn set_prop(
        &self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<(), NodeError> {
        self.graph
            .write()
            .await
            .set_prop(self.node_id, key, value)
            .map_err(|e| NodeError::ExecutionFailed(e.to_string()))
    }

    /// Run a closure against a read-locked view of the live graph.
    pub async fn with_graph<R>(&self, f: impl FnOnce(&Graph) -> R) -> R {
        f(&*self.graph.read().await)
    }
}

/// Behavior of one node type.
///
/// The runner guarantees at-most-once invocation per run per node and
/// hands over inputs already validated against the registered contract.
#[async_trait]
pub trait NodeExecutor: Send + Sync {
    async fn execute(
        &self,
        ctx: ExecContext,
        inputs: HashMap<String, Value>,
    ) -> Result<Value, NodeError>;
}

/// Everything the engine knows about one node type
pub struct Registration {
    pub inputs: InputContract,
    pub output: Option<ValueType>,
    pub executor: Arc<dyn NodeExecutor>,
}

impl Registration {
    pub fn new(
        inputs: InputContract,
        output: Option<ValueType>,
        executor: Arc<dyn NodeExecutor>,
    ) -> Self {
        Self {
            inputs,
            output,
            executor,
        }
    }
}

/// Registry of node type registrations, keyed by the closed `NodeType`
/// enum. Unknown string tags never get this far; they are rejected when
/// a graph document is parsed.
pub struct Registry {
    entries: HashMap<NodeType, Registration>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn register(&mut self, node_type: NodeType, registration: Registration) {
        tracing::info!("Registering node type: {}", node_type);
        self.entries.insert(node_type, registration);
    }

    pub fn lookup(&self, node_type: NodeType) -> Result<&Registration, GraphError> {
        self.entries
            .get(&node_type)
            .ok_or_else(|| GraphError::UnregisteredNodeType(node_type.tag().to_string()))
    }

    pub fn registered_types(&self) -> Vec<NodeType> {
        let mut types: Vec<_> = self.entries.keys().copied().collect();
        types.sort_by_key(|t| t.tag());
        types
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
