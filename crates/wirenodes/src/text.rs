use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use wirecore::{InputContract, NodeError, SlotSpec, Value, ValueType};
use wireruntime::{ExecContext, NodeExecutor, Registration};

/// Displays whatever text arrives: writes the `text` input back into
/// the node's own props so the canvas shows it, then passes it on.
pub struct TextNode;

#[async_trait]
impl NodeExecutor for TextNode {
    async fn execute(
        &self,
        ctx: ExecContext,
        inputs: HashMap<String, Value>,
    ) -> Result<Value, NodeError> {
        let text = inputs
            .get("text")
            .and_then(Value::as_str)
            .ok_or_else(|| NodeError::MissingInput("text".to_string()))?
            .to_string();

        ctx.set_prop("text", text.clone()).await?;

        Ok(Value::from(text))
    }
}

pub fn registration() -> Registration {
    Registration::new(
        InputContract::fixed(vec![SlotSpec::required("text", ValueType::Text)]),
        Some(ValueType::Text),
        Arc::new(TextNode),
    )
}
