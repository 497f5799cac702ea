//! Validation of desired state against a resource [`Schema`].
//!
//! The reconciler runs this before the first remote call so a malformed
//! configuration never reaches the vendor API.
//!
//! # Example
//!
//! ```
//! use hemmer_reconcile::schema::{Schema, Attribute};
//! use hemmer_reconcile::validation::validate;
//! use serde_json::json;
//!
//! let schema = Schema::v0()
//!     .with_attribute("network_id", Attribute::path_string())
//!     .with_attribute("max_retention_days", Attribute::optional_int64());
//!
//! let diagnostics = validate(&schema, &json!({"network_id": "N1", "max_retention_days": 30}));
//! assert!(diagnostics.is_empty());
//!
//! let diagnostics = validate(&schema, &json!({"max_retention_days": "thirty"}));
//! assert_eq!(diagnostics.len(), 2);
//! ```

use crate::schema::{Attribute, AttributeType, Diagnostic, Schema};
use serde_json::Value;
use std::collections::HashMap;

/// Validate a desired state against a schema.
///
/// Returns a list of diagnostics; an empty list means the value is valid.
/// Computed-only attributes are skipped since the remote sets them.
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    let obj = match value {
        Value::Object(map) => map,
        other => {
            diagnostics.push(
                Diagnostic::error("Expected object")
                    .with_detail(format!("Got {}", value_type_name(other))),
            );
            return diagnostics;
        }
    };

    let mut names: Vec<&String> = schema.attributes.keys().collect();
    names.sort();
    for name in names {
        let attr = &schema.attributes[name];
        validate_attribute(attr, obj.get(name), name, &mut diagnostics);
    }
    diagnostics
}

/// Validate, returning `Ok` if valid or `Err` with the error diagnostics.
///
/// Warnings never fail validation.
pub fn validate_result(schema: &Schema, value: &Value) -> Result<(), Vec<Diagnostic>> {
    let errors: Vec<Diagnostic> = validate(schema, value)
        .into_iter()
        .filter(Diagnostic::is_error)
        .collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_attribute(
    attr: &Attribute,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if attr.flags.is_computed_only() {
        if matches!(value, Some(v) if !v.is_null()) {
            diagnostics.push(
                Diagnostic::warning(format!("Ignoring computed attribute '{}'", path))
                    .with_detail("This attribute is set by the remote and cannot be configured")
                    .with_attribute(path),
            );
        }
        return;
    }

    match value {
        None | Some(Value::Null) => {
            if attr.flags.required {
                diagnostics.push(
                    Diagnostic::error(format!("Missing required attribute '{}'", path))
                        .with_detail("This attribute is required and must be provided")
                        .with_attribute(path),
                );
            }
        }
        Some(v) => validate_type(&attr.attr_type, v, path, diagnostics),
    }
}

fn validate_type(
    attr_type: &AttributeType,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    // Nulls nested inside collections are treated as unset elements.
    if value.is_null() {
        return;
    }
    match attr_type {
        AttributeType::String if !value.is_string() => {
            diagnostics.push(type_error(path, "string", value))
        }
        AttributeType::Int64 if !is_int64(value) => {
            diagnostics.push(type_error(path, "int64", value))
        }
        AttributeType::Float64 if !value.is_number() => {
            diagnostics.push(type_error(path, "float64", value))
        }
        AttributeType::Bool if !value.is_boolean() => {
            diagnostics.push(type_error(path, "bool", value))
        }
        AttributeType::List(element_type) | AttributeType::Set(element_type) => {
            match value.as_array() {
                Some(arr) => {
                    for (i, elem) in arr.iter().enumerate() {
                        validate_type(element_type, elem, &format!("{}.{}", path, i), diagnostics);
                    }
                }
                None => diagnostics.push(type_error(path, "list", value)),
            }
        }
        AttributeType::Map(value_type) => match value.as_object() {
            Some(obj) => {
                for (key, val) in obj {
                    validate_type(value_type, val, &format!("{}.{}", path, key), diagnostics);
                }
            }
            None => diagnostics.push(type_error(path, "map", value)),
        },
        AttributeType::Object(attrs) => match value.as_object() {
            Some(obj) => validate_object(attrs, obj, path, diagnostics),
            None => diagnostics.push(type_error(path, "object", value)),
        },
        _ => {}
    }
}

fn validate_object(
    attrs: &HashMap<String, AttributeType>,
    obj: &serde_json::Map<String, Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for (name, attr_type) in attrs {
        if let Some(value) = obj.get(name) {
            validate_type(attr_type, value, &format!("{}.{}", path, name), diagnostics);
        }
    }
}

pub(crate) fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn is_int64(value: &Value) -> bool {
    match value {
        Value::Number(n) if n.is_i64() => true,
        Value::Number(n) => n
            .as_f64()
            .map(|f| f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64)
            .unwrap_or(false),
        _ => false,
    }
}

fn type_error(path: &str, expected: &str, got: &Value) -> Diagnostic {
    Diagnostic::error(format!("Invalid type for attribute '{}'", path))
        .with_detail(format!("Expected {}, got {}", expected, value_type_name(got)))
        .with_attribute(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AttributeFlags, DiagnosticSeverity};
    use serde_json::json;

    fn schema() -> Schema {
        Schema::v0()
            .with_attribute("network_id", Attribute::path_string())
            .with_attribute("id", Attribute::computed_id())
            .with_attribute("name", Attribute::required_string())
            .with_attribute("max_retention_days", Attribute::optional_int64())
            .with_attribute("created_at", Attribute::computed_string())
    }

    #[test]
    fn test_valid_desired_state() {
        let diagnostics = validate(
            &schema(),
            &json!({"network_id": "N1", "name": "Profile-A", "max_retention_days": 30}),
        );
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_missing_required() {
        let diagnostics = validate(&schema(), &json!({"name": "Profile-A"}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("network_id".to_string()));

        let diagnostics = validate(&schema(), &json!({"network_id": null, "name": "Profile-A"}));
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_wrong_type() {
        let diagnostics = validate(
            &schema(),
            &json!({"network_id": "N1", "name": "Profile-A", "max_retention_days": "30"}),
        );
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Invalid type"));
        assert_eq!(
            diagnostics[0].detail,
            Some("Expected int64, got string".to_string())
        );
    }

    #[test]
    fn test_int64_accepts_integral_float() {
        let diagnostics = validate(
            &schema(),
            &json!({"network_id": "N1", "name": "Profile-A", "max_retention_days": 30.0}),
        );
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_computed_attribute_warns() {
        let diagnostics = validate(
            &schema(),
            &json!({"network_id": "N1", "name": "Profile-A", "created_at": "yesterday"}),
        );
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].severity, DiagnosticSeverity::Warning);
        assert!(validate_result(
            &schema(),
            &json!({"network_id": "N1", "name": "Profile-A", "created_at": "yesterday"}),
        )
        .is_ok());
    }

    #[test]
    fn test_nested_types() {
        let mut inner = HashMap::new();
        inner.insert("enabled".to_string(), AttributeType::Bool);
        let schema = Schema::v0()
            .with_attribute(
                "tags",
                Attribute::new(
                    AttributeType::list(AttributeType::String),
                    AttributeFlags::optional(),
                ),
            )
            .with_attribute(
                "settings",
                Attribute::new(AttributeType::object(inner), AttributeFlags::optional()),
            );

        let diagnostics = validate(
            &schema,
            &json!({"tags": ["a", 1], "settings": {"enabled": "yes"}}),
        );
        let mut paths: Vec<_> = diagnostics
            .iter()
            .filter_map(|d| d.attribute.clone())
            .collect();
        paths.sort();
        assert_eq!(paths, vec!["settings.enabled", "tags.1"]);
    }

    #[test]
    fn test_non_object_desired_state() {
        let diagnostics = validate(&schema(), &json!(["not", "an", "object"]));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].detail, Some("Got array".to_string()));
    }
}
