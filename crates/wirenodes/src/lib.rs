//! Built-in node library
//!
//! The node kinds a graph can place: prompt, text, aggregator, and the
//! run-all trigger.

mod aggregator;
mod prompt;
mod text;
mod trigger;

pub use aggregator::AggregatorNode;
pub use prompt::PromptNode;
pub use text::TextNode;
pub use trigger::TriggerNode;

use wirecore::NodeType;
use wireruntime::Registry;

/// Register every built-in node type with a registry
pub fn register_builtins(registry: &mut Registry) {
    registry.register(NodeType::Prompt, prompt::registration());
    registry.register(NodeType::Text, text::registration());
    registry.register(NodeType::Aggregator, aggregator::registration());
    registry.register(NodeType::Trigger, trigger::registration());
}

/// A registry with all built-ins registered
pub fn builtin_registry() -> Registry {
    let mut registry = Registry::new();
    register_builtins(&mut registry);
    registry
}
