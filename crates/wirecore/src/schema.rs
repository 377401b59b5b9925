use crate::{NodeError, Value, ValueType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A named input position on a node type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotSpec {
    pub name: String,
    pub value_type: ValueType,
    pub required: bool,
}

impl SlotSpec {
    pub fn required(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
            required: true,
        }
    }

    pub fn optional(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
            required: false,
        }
    }
}

/// Shape of the inputs a node type accepts.
///
/// `Fixed` declares a closed set of named slots; `Variadic` accepts
/// unboundedly many numbered slots (`input-1`, `input-2`, ...) assigned
/// at connection time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum InputContract {
    Fixed { slots: Vec<SlotSpec> },
    Variadic,
}

impl InputContract {
    pub fn fixed(slots: Vec<SlotSpec>) -> Self {
        InputContract::Fixed { slots }
    }

    /// A fixed contract with no slots at all (entry nodes).
    pub fn none() -> Self {
        InputContract::Fixed { slots: Vec::new() }
    }

    pub fn is_variadic(&self) -> bool {
        matches!(self, InputContract::Variadic)
    }

    pub fn slot(&self, name: &str) -> Option<&SlotSpec> {
        match self {
            InputContract::Fixed { slots } => slots.iter().find(|s| s.name == name),
            InputContract::Variadic => None,
        }
    }

    pub fn slot_names(&self) -> Vec<&str> {
        match self {
            InputContract::Fixed { slots } => slots.iter().map(|s| s.name.as_str()).collect(),
            InputContract::Variadic => Vec::new(),
        }
    }

    /// Validate a merged input payload against this contract.
    ///
    /// Fixed contracts reject unknown slots, missing required slots, and
    /// values whose type differs from the slot's declaration. Variadic
    /// contracts accept any string-keyed values.
    pub fn validate(&self, inputs: &HashMap<String, Value>) -> Result<(), NodeError> {
        let slots = match self {
            InputContract::Variadic => return Ok(()),
            InputContract::Fixed { slots } => slots,
        };

        for (name, value) in inputs {
            let slot = slots
                .iter()
                .find(|s| &s.name == name)
                .ok_or_else(|| NodeError::UnknownInput(name.clone()))?;

            // A null delivery (e.g. from a source with no output type)
            // counts as the slot being absent.
            if value.is_null() {
                if slot.required {
                    return Err(NodeError::MissingInput(name.clone()));
                }
                continue;
            }

            if value.value_type() != Some(slot.value_type) {
                return Err(NodeError::InputType {
                    slot: name.clone(),
                    expected: slot.value_type.to_string(),
                    actual: value.type_name().to_string(),
                });
            }
        }

        for slot in slots.iter().filter(|s| s.required) {
            if !inputs.contains_key(&slot.name) {
                return Err(NodeError::MissingInput(slot.name.clone()));
            }
        }

        Ok(())
    }
}

/// Validate a produced value against the declared output type.
///
/// Node types with no declared output must produce `Value::Null`.
pub fn validate_output(declared: Option<ValueType>, value: &Value) -> Result<(), NodeError> {
    match (declared, value.value_type()) {
        (None, None) => Ok(()),
        (Some(expected), Some(actual)) if expected == actual => Ok(()),
        (expected, _) => Err(NodeError::OutputType {
            expected: expected.map_or_else(|| "no output".to_string(), |t| t.to_string()),
            actual: value.type_name().to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_contract() -> InputContract {
        InputContract::fixed(vec![
            SlotSpec::required("text", ValueType::Text),
            SlotSpec::optional("note", ValueType::Text),
        ])
    }

    #[test]
    fn fixed_contract_accepts_well_typed_inputs() {
        let mut inputs = HashMap::new();
        inputs.insert("text".to_string(), Value::from("hi"));
        text_contract().validate(&inputs).unwrap();
    }

    #[test]
    fn fixed_contract_rejects_missing_required_slot() {
        let err = text_contract().validate(&HashMap::new()).unwrap_err();
        assert!(matches!(err, NodeError::MissingInput(s) if s == "text"));
    }

    #[test]
    fn fixed_contract_rejects_unknown_slot() {
        let mut inputs = HashMap::new();
        inputs.insert("text".to_string(), Value::from("hi"));
        inputs.insert("bogus".to_string(), Value::from("x"));
        let err = text_contract().validate(&inputs).unwrap_err();
        assert!(matches!(err, NodeError::UnknownInput(s) if s == "bogus"));
    }

    #[test]
    fn fixed_contract_rejects_type_mismatch() {
        let mut inputs = HashMap::new();
        inputs.insert("text".to_string(), Value::from(42.0));
        let err = text_contract().validate(&inputs).unwrap_err();
        assert!(matches!(err, NodeError::InputType { slot, .. } if slot == "text"));
    }

    #[test]
    fn null_satisfies_optional_but_not_required_slots() {
        let mut inputs = HashMap::new();
        inputs.insert("text".to_string(), Value::from("hi"));
        inputs.insert("note".to_string(), Value::Null);
        text_contract().validate(&inputs).unwrap();

        let mut inputs = HashMap::new();
        inputs.insert("text".to_string(), Value::Null);
        let err = text_contract().validate(&inputs).unwrap_err();
        assert!(matches!(err, NodeError::MissingInput(s) if s == "text"));
    }

    #[test]
    fn variadic_contract_accepts_anything() {
        let mut inputs = HashMap::new();
        inputs.insert("input-1".to_string(), Value::from("a"));
        inputs.insert("input-2".to_string(), Value::from(1.0));
        InputContract::Variadic.validate(&inputs).unwrap();
    }

    #[test]
    fn output_validation_matches_declared_type() {
        validate_output(Some(ValueType::Text), &Value::from("ok")).unwrap();
        validate_output(None, &Value::Null).unwrap();

        let err = validate_output(Some(ValueType::Text), &Value::from(1.0)).unwrap_err();
        assert!(matches!(err, NodeError::OutputType { .. }));

        let err = validate_output(None, &Value::from("spurious")).unwrap_err();
        assert!(matches!(err, NodeError::OutputType { expected, .. } if expected == "no output"));
    }
}
