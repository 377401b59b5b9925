use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use wirecore::{InputContract, NodeError, Value};
use wireruntime::{ExecContext, NodeExecutor, Registration};

/// The run-all entry node: takes nothing, produces nothing, exists so
/// a whole subgraph can hang off one play button.
pub struct TriggerNode;

#[async_trait]
impl NodeExecutor for TriggerNode {
    async fn execute(
        &self,
        _ctx: ExecContext,
        _inputs: HashMap<String, Value>,
    ) -> Result<Value, NodeError> {
        Ok(Value::Null)
    }
}

pub fn registration() -> Registration {
    Registration::new(InputContract::none(), None, Arc::new(TriggerNode))
}
