use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use wirecore::{InputContract, NodeError, Value, ValueType};
use wireruntime::{ExecContext, NodeExecutor, Registration};

/// Joins arbitrarily many inputs through a template.
///
/// Accepts the variadic `input-N` slots and renders the `template`
/// prop, substituting each `{{input-N}}` placeholder with the value
/// delivered on that slot. With no template, inputs are concatenated
/// in slot order.
pub struct AggregatorNode;

fn render_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Text(s) => s.clone(),
        Value::Json(j) => j.to_string(),
    }
}

#[async_trait]
impl NodeExecutor for AggregatorNode {
    async fn execute(
        &self,
        ctx: ExecContext,
        inputs: HashMap<String, Value>,
    ) -> Result<Value, NodeError> {
        let template = ctx
            .prop("template")
            .await
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();

        let mut slots: Vec<(&String, &Value)> = inputs.iter().collect();
        slots.sort_by(|(a, _), (b, _)| a.cmp(b));

        let rendered = if template.is_empty() {
            slots
                .into_iter()
                .map(|(_, v)| render_value(v))
                .collect::<Vec<_>>()
                .join("\n")
        } else {
            slots.into_iter().fold(template, |acc, (slot, value)| {
                acc.replace(&format!("{{{{{}}}}}", slot), &render_value(value))
            })
        };

        Ok(Value::from(rendered))
    }
}

pub fn registration() -> Registration {
    Registration::new(
        InputContract::Variadic,
        Some(ValueType::Text),
        Arc::new(AggregatorNode),
    )
}
