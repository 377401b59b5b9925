//! Core abstractions for the wireflow engine
//!
//! This crate provides the fundamental types that all other components
//! depend on: the dynamic value model, the live graph with its edge
//! binding roles, input/output contracts, the error taxonomy, and run
//! events.

mod error;
mod events;
mod graph;
mod schema;
mod value;

pub use error::{EngineError, GraphError, NodeError};
pub use events::{EventBus, RunEvent, RunId};
pub use graph::{Bounds, Edge, EdgeId, Graph, NodeId, NodeSpec, NodeType};
pub use schema::{validate_output, InputContract, SlotSpec};
pub use value::{Value, ValueType};

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
