use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use wirecore::{InputContract, NodeError, SlotSpec, Value, ValueType};
use wireruntime::{ExecContext, NodeExecutor, Registration};

/// Renders the prompt text stored in the node's props.
///
/// An optional `text` input is spliced into the `{{text}}` placeholder;
/// a node with no stored prompt passes the piped text through.
pub struct PromptNode;

#[async_trait]
impl NodeExecutor for PromptNode {
    async fn execute(
        &self,
        ctx: ExecContext,
        inputs: HashMap<String, Value>,
    ) -> Result<Value, NodeError> {
        let prompt = ctx
            .prop("text")
            .await
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        let piped = inputs
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let rendered = if prompt.is_empty() {
            piped
        } else {
            prompt.replace("{{text}}", &piped)
        };

        Ok(Value::from(rendered))
    }
}

pub fn registration() -> Registration {
    Registration::new(
        InputContract::fixed(vec![SlotSpec::optional("text", ValueType::Text)]),
        Some(ValueType::Text),
        Arc::new(PromptNode),
    )
}
