//! Tool descriptors and the input-schema validation used by
//! `call_tool` (spec §4.9 step 7).

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInputField {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub input_schema: Vec<ToolInputField>,
}

impl Tool {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            input_schema: Vec::new(),
        }
    }

    /// Validate `arguments` against `input_schema`: every required field
    /// must be present, and every present field's JSON type must match the
    /// schema's declared type name (`"string"`, `"number"`, `"boolean"`,
    /// `"object"`, `"array"`, or `"null"`). Returns the name of the first
    /// offending field on failure.
    pub fn validate_arguments(&self, arguments: &Value) -> Result<(), ToolValidationError> {
        let obj = arguments.as_object();
        for field in &self.input_schema {
            let value = obj.and_then(|o| o.get(&field.name));
            match value {
                None => {
                    if field.required {
                        return Err(ToolValidationError::MissingField(field.name.clone()));
                    }
                }
                Some(v) => {
                    if !json_type_matches(v, &field.ty) {
                        return Err(ToolValidationError::WrongType {
                            field: field.name.clone(),
                            expected: field.ty.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

fn json_type_matches(value: &Value, expected: &str) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        // Unknown/unsupported declared types are not validated further —
        // the host-registered schema is trusted beyond the primitives we
        // understand.
        _ => true,
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ToolValidationError {
    #[error("missing required field `{0}`")]
    MissingField(String),
    #[error("field `{field}` must be of type `{expected}`")]
    WrongType { field: String, expected: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_tool() -> Tool {
        Tool {
            name: "echo".into(),
            description: None,
            input_schema: vec![
                ToolInputField {
                    name: "text".into(),
                    ty: "string".into(),
                    description: None,
                    required: true,
                },
                ToolInputField {
                    name: "times".into(),
                    ty: "number".into(),
                    description: None,
                    required: false,
                },
            ],
        }
    }

    #[test]
    fn accepts_valid_arguments() {
        let tool = sample_tool();
        assert!(tool
            .validate_arguments(&json!({"text": "hi", "times": 3}))
            .is_ok());
    }

    #[test]
    fn accepts_missing_optional_field() {
        let tool = sample_tool();
        assert!(tool.validate_arguments(&json!({"text": "hi"})).is_ok());
    }

    #[test]
    fn rejects_missing_required_field() {
        let tool = sample_tool();
        let err = tool.validate_arguments(&json!({"times": 3})).unwrap_err();
        assert!(matches!(err, ToolValidationError::MissingField(f) if f == "text"));
    }

    #[test]
    fn rejects_wrong_type() {
        let tool = sample_tool();
        let err = tool
            .validate_arguments(&json!({"text": 5}))
            .unwrap_err();
        assert!(matches!(err, ToolValidationError::WrongType { field, .. } if field == "text"));
    }
}
