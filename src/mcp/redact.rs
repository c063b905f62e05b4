//! Secret redaction for editor-facing MCP configs.
//!
//! Values that look secret are replaced by an `${input:<id>}` reference and a
//! matching `promptString` input, so the editor asks for the value instead of
//! it being committed. This is one-way: the original value is not recoverable.

use serde_json::{Value, json};
use std::collections::BTreeMap;

/// Substring that marks a value as secret.
pub const SECRET_MARKER: &str = "SECRET";

pub fn looks_secret(value: &str) -> bool {
    value.contains(SECRET_MARKER)
}

/// Placeholder that refers to an editor input.
pub fn input_reference(id: &str) -> String {
    format!("${{input:{}}}", id)
}

/// A "prompt for this value" declaration.
pub fn prompt_input(id: &str, server: &str) -> Value {
    json!({
        "type": "promptString",
        "id": id,
        "description": format!("{} for MCP server {}", id, server),
        "password": true
    })
}

/// Redact secret-looking values in `values`, returning the redacted map and
/// the inputs it now depends on.
pub fn redact_values(
    server: &str,
    values: &BTreeMap<String, String>,
) -> (BTreeMap<String, String>, Vec<Value>) {
    let mut redacted = BTreeMap::new();
    let mut inputs = Vec::new();

    for (key, value) in values {
        if looks_secret(value) {
            redacted.insert(key.clone(), input_reference(key));
            inputs.push(prompt_input(key, server));
        } else {
            redacted.insert(key.clone(), value.clone());
        }
    }

    (redacted, inputs)
}

/// Append `new` inputs to `inputs`, skipping ids already declared.
pub fn merge_inputs(inputs: &mut Vec<Value>, new: Vec<Value>) {
    for input in new {
        let id = input.get("id").and_then(Value::as_str).map(str::to_string);
        let exists = inputs
            .iter()
            .any(|i| i.get("id").and_then(Value::as_str).map(str::to_string) == id);
        if !exists {
            inputs.push(input);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_values_are_replaced() {
        let env = BTreeMap::from([
            ("API_KEY".to_string(), "MY_SECRET_VALUE".to_string()),
            ("MODE".to_string(), "fast".to_string()),
        ]);
        let (redacted, inputs) = redact_values("search", &env);

        assert_eq!(redacted["API_KEY"], "${input:API_KEY}");
        assert_eq!(redacted["MODE"], "fast");
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0]["type"], "promptString");
        assert_eq!(inputs[0]["id"], "API_KEY");
        assert_eq!(inputs[0]["password"], true);
    }

    #[test]
    fn test_merge_inputs_dedupes_by_id() {
        let mut inputs = vec![prompt_input("TOKEN", "a")];
        merge_inputs(&mut inputs, vec![prompt_input("TOKEN", "b"), prompt_input("KEY", "b")]);
        assert_eq!(inputs.len(), 2);
    }
}
