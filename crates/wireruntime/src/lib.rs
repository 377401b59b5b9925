//! Workflow execution runtime
//!
//! This crate turns the live graph into immutable execution plans and
//! runs them: node registry, connection-time slot assignment, snapshot
//! builder, the process-wide run-state store, and the join-barrier
//! runner.

mod connector;
mod registry;
mod runner;
mod runstate;
mod runtime;
mod snapshot;

pub use connector::{connect, Connector};
pub use registry::{ExecContext, NodeExecutor, Registration, Registry};
pub use runner::{RunOutcome, RunReport, WorkflowRunner};
pub use runstate::{RunRecord, RunStateStore, RunStatus};
pub use runtime::{RuntimeConfig, WireRuntime};
pub use snapshot::Snapshot;

use std::sync::Arc;
use tokio::sync::RwLock;
use wirecore::Graph;

/// The live graph, shared between the runtime and node executors.
pub type SharedGraph = Arc<RwLock<Graph>>;
