//! Field-level merge of observed remote state into prior state.
//!
//! The merger walks prior and observed state in lock-step by field name. It
//! works on the JSON form of a resource, so every resource shares one
//! implementation regardless of its attributes; typed values go through
//! [`merge_typed`].
//!
//! # Precedence rules
//!
//! | Observed value | Result |
//! |---|---|
//! | missing or `null` | prior value kept (absence never clears a field) |
//! | scalar | observed wins |
//! | object | merged recursively |
//! | empty array | prior value kept |
//! | non-empty array | replaces prior wholesale (no element-wise merge) |
//!
//! Prior and observed values of different kinds (an object against a string,
//! a number against a bool, ...) abort the merge with
//! [`ReconcileError::ShapeMismatch`].
//!
//! In [`MergeMode::PathOnly`] only the top-level addressing-path attributes
//! are merged; differences on any other attribute are reported as drift and
//! left at their prior value.
//!
//! # Example
//!
//! ```
//! use hemmer_reconcile::merge::merge;
//! use hemmer_reconcile::types::MergeMode;
//! use serde_json::json;
//!
//! let prior = json!({"network_id": "N1", "name": "Profile-A", "max_retention_days": 30});
//! let observed = json!({"id": "Q1", "name": "Profile-A", "max_retention_days": null});
//!
//! let outcome = merge(&prior, &observed, MergeMode::Full, &[]).unwrap();
//! assert_eq!(
//!     outcome.state,
//!     json!({"network_id": "N1", "id": "Q1", "name": "Profile-A", "max_retention_days": 30})
//! );
//! ```

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ReconcileError;
use crate::schema::Schema;
use crate::types::{AttributeChange, MergeMode, MergeOutcome};
use crate::validation::value_type_name;

const ROOT: &str = "<root>";

/// A merger bound to one resource's addressing path.
///
/// Values of sensitive attributes never appear in the reported changes or
/// drift; the merged state itself keeps them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Merger {
    path_fields: Vec<String>,
    sensitive_fields: Vec<String>,
}

impl Merger {
    /// Create a merger with the given addressing-path attributes.
    pub fn new<S: Into<String>>(path_fields: impl IntoIterator<Item = S>) -> Self {
        Self {
            path_fields: path_fields.into_iter().map(Into::into).collect(),
            sensitive_fields: Vec::new(),
        }
    }

    /// Create a merger from the path and sensitive attributes of a schema.
    pub fn for_schema(schema: &Schema) -> Self {
        Self::new(schema.path_attributes()).with_sensitive_fields(schema.sensitive_attributes())
    }

    /// Redact reported values of these top-level attributes.
    pub fn with_sensitive_fields<S: Into<String>>(
        mut self,
        fields: impl IntoIterator<Item = S>,
    ) -> Self {
        self.sensitive_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// The addressing-path attributes this merger refreshes in path-only mode.
    pub fn path_fields(&self) -> &[String] {
        &self.path_fields
    }

    /// Merge `observed` into `prior`.
    pub fn merge(
        &self,
        prior: &Value,
        observed: &Value,
        mode: MergeMode,
    ) -> Result<MergeOutcome, ReconcileError> {
        let outcome = merge(prior, observed, mode, &self.path_fields)?;
        Ok(MergeOutcome {
            state: outcome.state,
            changes: outcome.changes.into_iter().map(|c| self.redact(c)).collect(),
            drift: outcome.drift.into_iter().map(|c| self.redact(c)).collect(),
        })
    }

    /// Hide the values of `change` if it touches a sensitive attribute.
    pub fn redact(&self, change: AttributeChange) -> AttributeChange {
        if self.sensitive_fields.iter().any(|f| f == change.attribute()) {
            change.redacted()
        } else {
            change
        }
    }
}

/// Merge `observed` into `prior` under `mode`.
///
/// `path_fields` names the top-level attributes refreshed by
/// [`MergeMode::PathOnly`]; it is ignored in [`MergeMode::Full`].
pub fn merge(
    prior: &Value,
    observed: &Value,
    mode: MergeMode,
    path_fields: &[String],
) -> Result<MergeOutcome, ReconcileError> {
    let mut changes = Vec::new();
    let mut drift = Vec::new();
    let state = match mode {
        MergeMode::Full => merge_value(prior, observed, "", &mut changes)?,
        MergeMode::PathOnly => {
            merge_path_only(prior, observed, path_fields, &mut changes, &mut drift)?
        }
    };
    tracing::debug!(
        ?mode,
        changes = changes.len(),
        drift = drift.len(),
        "Merged observed state"
    );
    Ok(MergeOutcome {
        state,
        changes,
        drift,
    })
}

/// Merge two typed values through their JSON form.
///
/// `None` fields serialize to `null` and therefore count as absent.
pub fn merge_typed<T>(
    prior: &T,
    observed: &T,
    mode: MergeMode,
    path_fields: &[String],
) -> Result<T, ReconcileError>
where
    T: Serialize + DeserializeOwned,
{
    let prior = serde_json::to_value(prior)?;
    let observed = serde_json::to_value(observed)?;
    let outcome = merge(&prior, &observed, mode, path_fields)?;
    Ok(serde_json::from_value(outcome.state)?)
}

fn merge_value(
    prior: &Value,
    observed: &Value,
    path: &str,
    changes: &mut Vec<AttributeChange>,
) -> Result<Value, ReconcileError> {
    match (prior, observed) {
        (_, Value::Null) => Ok(prior.clone()),
        (Value::Null, _) => {
            changes.push(AttributeChange::added(display_path(path), observed.clone()));
            Ok(observed.clone())
        }
        (Value::Object(p), Value::Object(o)) => merge_objects(p, o, path, changes),
        (Value::Array(_), Value::Array(o)) if o.is_empty() => Ok(prior.clone()),
        (p, o) if value_type_name(p) == value_type_name(o) => {
            if p != o {
                changes.push(AttributeChange::modified(
                    display_path(path),
                    p.clone(),
                    o.clone(),
                ));
            }
            Ok(o.clone())
        }
        (p, o) => Err(ReconcileError::ShapeMismatch {
            path: display_path(path),
            expected: value_type_name(p),
            found: value_type_name(o),
        }),
    }
}

fn merge_objects(
    prior: &Map<String, Value>,
    observed: &Map<String, Value>,
    path: &str,
    changes: &mut Vec<AttributeChange>,
) -> Result<Value, ReconcileError> {
    let mut merged = prior.clone();
    for (name, observed_value) in observed {
        if observed_value.is_null() {
            continue;
        }
        let prior_value = prior.get(name).unwrap_or(&Value::Null);
        let value = merge_value(prior_value, observed_value, &join_path(path, name), changes)?;
        merged.insert(name.clone(), value);
    }
    Ok(Value::Object(merged))
}

fn merge_path_only(
    prior: &Value,
    observed: &Value,
    path_fields: &[String],
    changes: &mut Vec<AttributeChange>,
    drift: &mut Vec<AttributeChange>,
) -> Result<Value, ReconcileError> {
    let empty = Map::new();
    let prior_obj = as_object(prior)?.unwrap_or(&empty);
    let observed_obj = as_object(observed)?.unwrap_or(&empty);

    let mut merged = prior_obj.clone();
    for (name, observed_value) in observed_obj {
        if observed_value.is_null() {
            continue;
        }
        let prior_value = prior_obj.get(name).unwrap_or(&Value::Null);
        if path_fields.iter().any(|field| field == name) {
            let value = merge_value(prior_value, observed_value, name, changes)?;
            merged.insert(name.clone(), value);
        } else if prior_value != observed_value && !is_empty_array(observed_value) {
            drift.push(AttributeChange::new(
                name.clone(),
                (!prior_value.is_null()).then(|| prior_value.clone()),
                Some(observed_value.clone()),
            ));
        }
    }
    Ok(Value::Object(merged))
}

fn as_object(value: &Value) -> Result<Option<&Map<String, Value>>, ReconcileError> {
    match value {
        Value::Object(map) => Ok(Some(map)),
        Value::Null => Ok(None),
        other => Err(ReconcileError::ShapeMismatch {
            path: ROOT.to_string(),
            expected: "object",
            found: value_type_name(other),
        }),
    }
}

fn is_empty_array(value: &Value) -> bool {
    value.as_array().is_some_and(Vec::is_empty)
}

fn join_path(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", base, name)
    }
}

fn display_path(path: &str) -> String {
    if path.is_empty() {
        ROOT.to_string()
    } else {
        path.to_string()
    }
}
