use crate::{RunRecord, RunStateStore, RunStatus, Registry, SharedGraph, Snapshot};
use chrono::Utc;
use futures::future::{join_all, BoxFuture, FutureExt};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use uuid::Uuid;
use wirecore::{validate_output, EngineError, EventBus, NodeId, RunEvent, RunId, Value};

/// Terminal outcome of one run.
///
/// Exactly one of these is surfaced per run, however many nodes fire.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed,
    Failed { node: NodeId, reason: String },
    /// Declined at the can-start gate; nothing was mutated.
    Refused { busy_nodes: Vec<NodeId> },
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Completed)
    }

    pub fn is_refused(&self) -> bool {
        matches!(self, RunOutcome::Refused { .. })
    }
}

/// What one run did
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: RunId,
    pub outcome: RunOutcome,
    /// Nodes whose executor was invoked, in invocation order.
    pub ran: Vec<NodeId>,
    /// Nodes that finished cleanly.
    pub completed: Vec<NodeId>,
    pub duration_ms: u64,
}

struct NodeFailure {
    node: NodeId,
    error: EngineError,
}

/// Executes one frozen snapshot.
///
/// Single-use: a fresh runner is constructed per run. Drives nodes
/// through the registry, accumulates multi-input join state, and fans
/// results out along the snapshot's children.
pub struct WorkflowRunner {
    run_id: RunId,
    graph: SharedGraph,
    registry: Arc<Registry>,
    run_state: Arc<RunStateStore>,
    events: Arc<EventBus>,
    snapshot: Snapshot,
    /// Per-target `(slot, value)` pairs delivered by completed parents.
    /// Cleared for a node the moment it fires.
    triggers: Mutex<HashMap<NodeId, Vec<(String, Value)>>>,
    /// Plan nodes this run still holds in the process-wide running set.
    /// A node leaves when it settles; the remainder is released at the
    /// run's terminal outcome.
    claimed: Mutex<HashSet<NodeId>>,
    ran: Mutex<Vec<NodeId>>,
    completed: Mutex<Vec<NodeId>>,
}

impl WorkflowRunner {
    pub fn new(
        graph: SharedGraph,
        registry: Arc<Registry>,
        run_state: Arc<RunStateStore>,
        events: Arc<EventBus>,
        snapshot: Snapshot,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            graph,
            registry,
            run_state,
            events,
            snapshot,
            triggers: Mutex::new(HashMap::new()),
            claimed: Mutex::new(HashSet::new()),
            ran: Mutex::new(Vec::new()),
            completed: Mutex::new(Vec::new()),
        }
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Nodes of this plan currently mid-execution under another run.
    /// Non-empty means `run` will refuse to start.
    pub fn busy_nodes(&self) -> Vec<NodeId> {
        self.run_state.running_overlap(self.snapshot.nodes())
    }

    /// Execute the snapshot to its single terminal outcome.
    ///
    /// Refused when any reachable node is already mid-execution; the
    /// prior run is unaffected and no state is touched. The gate and
    /// the running-set insertions are one atomic claim of the whole
    /// plan, so two runs racing over a shared subgraph cannot both
    /// start. Otherwise the start node fires immediately with empty
    /// inputs and completion or the first failure is recorded in the
    /// run-state history.
    pub async fn run(self) -> RunReport {
        let plan: HashSet<NodeId> = self.snapshot.nodes().collect();
        if let Err(busy_nodes) = self.run_state.try_claim(plan.iter().copied()) {
            tracing::warn!(
                run = %self.run_id,
                start = %self.snapshot.start(),
                ?busy_nodes,
                "refusing to start: nodes already mid-execution"
            );
            self.events.emit(RunEvent::RunRefused {
                start_node: self.snapshot.start(),
                busy_nodes: busy_nodes.clone(),
                timestamp: Utc::now(),
            });
            return RunReport {
                run_id: self.run_id,
                outcome: RunOutcome::Refused { busy_nodes },
                ran: Vec::new(),
                completed: Vec::new(),
                duration_ms: 0,
            };
        }
        *lock(&self.claimed) = plan;

        let started_at = Utc::now();
        let start_time = Instant::now();
        tracing::info!(run = %self.run_id, start = %self.snapshot.start(), "starting run");
        self.events.emit(RunEvent::RunStarted {
            run_id: self.run_id,
            start_node: self.snapshot.start(),
            timestamp: started_at,
        });

        let result = self.run_node(self.snapshot.start(), HashMap::new()).await;

        // Nodes the run never reached (e.g. past a failure) are still
        // claimed; give them back so later runs are not refused.
        let leftover: Vec<NodeId> = lock(&self.claimed).drain().collect();
        self.run_state.release(leftover);

        let duration_ms = start_time.elapsed().as_millis() as u64;
        let ran = lock(&self.ran).clone();
        let completed = lock(&self.completed).clone();
        let (outcome, status) = match result {
            Ok(()) => (RunOutcome::Completed, RunStatus::Completed),
            Err(failure) => {
                let reason = failure.error.to_string();
                (
                    RunOutcome::Failed {
                        node: failure.node,
                        reason: reason.clone(),
                    },
                    RunStatus::Failed {
                        node: failure.node,
                        reason,
                    },
                )
            }
        };
        self.run_state.append_record(RunRecord {
            run_id: self.run_id,
            started_at,
            finished_at: Utc::now(),
            status,
            ran: ran.clone(),
            completed: completed.clone(),
        });

        self.events.emit(RunEvent::RunCompleted {
            run_id: self.run_id,
            success: outcome.is_success(),
            duration_ms,
            timestamp: Utc::now(),
        });
        tracing::info!(run = %self.run_id, success = outcome.is_success(), duration_ms, "run finished");

        RunReport {
            run_id: self.run_id,
            outcome,
            ran,
            completed,
            duration_ms,
        }
    }

    /// Fire one node, then launch every child its completion makes
    /// ready and await the whole batch.
    fn run_node(
        &self,
        node_id: NodeId,
        inputs: HashMap<String, Value>,
    ) -> BoxFuture<'_, Result<(), NodeFailure>> {
        async move {
            let node_type = self
                .graph
                .read()
                .await
                .node_type(node_id)
                .map_err(|e| self.node_failure(node_id, e.into()))?;
            let registration = self
                .registry
                .lookup(node_type)
                .map_err(|e| self.node_failure(node_id, e.into()))?;

            registration
                .inputs
                .validate(&inputs)
                .map_err(|e| self.node_failure(node_id, e.into()))?;

            lock(&self.ran).push(node_id);
            tracing::debug!(run = %self.run_id, node = %node_id, %node_type, "node started");
            self.events.emit(RunEvent::NodeStarted {
                run_id: self.run_id,
                node_id,
                node_type,
                timestamp: Utc::now(),
            });

            let node_start = Instant::now();
            let ctx = crate::ExecContext::new(self.run_id, node_id, self.graph.clone());
            let result = registration.executor.execute(ctx, inputs).await;
            // Deregistered on every settle path, success or not.
            lock(&self.claimed).remove(&node_id);
            self.run_state.mark_settled(node_id);

            let output = result.map_err(|e| self.node_failure(node_id, e.into()))?;
            validate_output(registration.output, &output)
                .map_err(|e| self.node_failure(node_id, e.into()))?;

            lock(&self.completed).push(node_id);
            self.events.emit(RunEvent::NodeFinished {
                run_id: self.run_id,
                node_id,
                duration_ms: node_start.elapsed().as_millis() as u64,
                timestamp: Utc::now(),
            });

            // Every launched sibling must settle and deregister even
            // when another one fails, so the batch is joined, not
            // short-circuited; the first failure surfaces afterwards.
            let ready = self.deliver_and_collect_ready(node_id, &output);
            let results = join_all(
                ready
                    .into_iter()
                    .map(|(child, merged)| self.run_node(child, merged)),
            )
            .await;
            for result in results {
                result?;
            }
            Ok(())
        }
        .boxed()
    }

    /// Append this node's output to each child's accumulator, then take
    /// the children whose accumulator just reached their required
    /// inbound count. One lock scope, so a child made ready by two
    /// parents settling simultaneously fires exactly once.
    fn deliver_and_collect_ready(
        &self,
        node_id: NodeId,
        output: &Value,
    ) -> Vec<(NodeId, HashMap<String, Value>)> {
        let children = self.snapshot.children(node_id);
        let mut triggers = lock(&self.triggers);

        for (child, slot) in children {
            triggers
                .entry(*child)
                .or_default()
                .push((slot.clone(), output.clone()));
        }

        let mut ready = Vec::new();
        for (child, _) in children {
            let fire = triggers
                .get(child)
                .is_some_and(|pending| pending.len() == self.snapshot.required_inputs(*child));
            if fire {
                if let Some(pending) = triggers.remove(child) {
                    ready.push((*child, merge_inputs(pending)));
                }
            }
        }
        ready
    }

    fn node_failure(&self, node: NodeId, error: EngineError) -> NodeFailure {
        tracing::error!(run = %self.run_id, %node, %error, "node failed");
        self.events.emit(RunEvent::NodeFailed {
            run_id: self.run_id,
            node_id: node,
            error: error.to_string(),
            timestamp: Utc::now(),
        });
        NodeFailure { node, error }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Fold accumulated `(slot, value)` pairs into the merged input object.
/// Later entries for the same slot overwrite earlier ones.
fn merge_inputs(pairs: Vec<(String, Value)>) -> HashMap<String, Value> {
    let mut merged = HashMap::new();
    for (slot, value) in pairs {
        merged.insert(slot, value);
    }
    merged
}
