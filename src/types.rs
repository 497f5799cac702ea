//! Value types passed between the reconciliation components.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Placeholder shown instead of the value of a sensitive attribute.
pub const REDACTED: &str = "(sensitive)";

/// A change to a single attribute made (or withheld) by a merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeChange {
    /// Dotted path to the attribute.
    pub path: String,
    /// The value before the merge (None if the attribute was unknown).
    pub before: Option<Value>,
    /// The value after the merge.
    pub after: Option<Value>,
}

impl AttributeChange {
    /// Create a new attribute change.
    pub fn new(path: impl Into<String>, before: Option<Value>, after: Option<Value>) -> Self {
        Self {
            path: path.into(),
            before,
            after,
        }
    }

    /// Create a change for an attribute that was previously unknown.
    pub fn added(path: impl Into<String>, value: Value) -> Self {
        Self::new(path, None, Some(value))
    }

    /// Create a change for a modified attribute.
    pub fn modified(path: impl Into<String>, before: Value, after: Value) -> Self {
        Self::new(path, Some(before), Some(after))
    }

    /// The same change with both values replaced by [`REDACTED`].
    pub fn redacted(self) -> Self {
        let hide = |value: Option<Value>| value.map(|_| Value::String(REDACTED.to_string()));
        Self {
            path: self.path,
            before: hide(self.before),
            after: hide(self.after),
        }
    }

    /// The top-level attribute this change belongs to.
    pub fn attribute(&self) -> &str {
        self.path.split_once('.').map_or(self.path.as_str(), |(head, _)| head)
    }
}

/// Precedence mode for the state merger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MergeMode {
    /// Reconcile every attribute the observed state carries. Used after
    /// create and update, whose responses reflect every field they touch.
    #[default]
    Full,
    /// Only refresh the addressing-path attributes. Used after a plain read
    /// so a partial response cannot hide drift on other attributes.
    PathOnly,
}

/// The result of merging observed state into prior state.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MergeOutcome {
    /// The merged state, to be persisted.
    pub state: Value,
    /// Attributes whose value was changed by the merge.
    pub changes: Vec<AttributeChange>,
    /// Attributes where the observed value differs from prior but the merge
    /// mode did not apply it. Always empty for [`MergeMode::Full`].
    pub drift: Vec<AttributeChange>,
}

impl MergeOutcome {
    /// Whether the merge left the prior state as it was.
    pub fn is_unchanged(&self) -> bool {
        self.changes.is_empty()
    }

    /// Whether the remote differs from the merged state.
    pub fn has_drift(&self) -> bool {
        !self.drift.is_empty()
    }
}

/// A step of the adopt-or-create orchestration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Nothing is known about the remote object yet.
    Unresolved,
    /// An existing remote object matched the natural key.
    Located,
    /// The located object was converged to the desired state.
    Updated,
    /// A new remote object was created.
    Created,
    /// The object was found again after the write.
    ReLocated,
    /// The canonical identifier is known.
    Resolved,
    /// The orchestration stopped with an error.
    Failed,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Unresolved => "unresolved",
            Phase::Located => "located",
            Phase::Updated => "updated",
            Phase::Created => "created",
            Phase::ReLocated => "relocated",
            Phase::Resolved => "resolved",
            Phase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// How the identifier of a resource was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionPath {
    /// A pre-existing remote object was adopted and updated.
    Adopted,
    /// A new remote object was created.
    Created,
}

/// The outcome of an adopt-or-create orchestration.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// The canonical server-assigned identifier.
    pub id: String,
    /// Whether the object was adopted or created.
    pub path: ResolutionPath,
    /// The phases visited, in order.
    pub trail: Vec<Phase>,
    /// The canonical remote object, if it was fetched.
    pub observed: Option<Value>,
}

/// The state to persist after a create or update.
#[derive(Debug, Clone, PartialEq)]
pub struct Applied {
    /// How the identifier was resolved, when an orchestration ran.
    pub resolution: Option<Resolution>,
    /// The merged state.
    pub merge: MergeOutcome,
}

impl Applied {
    /// The state to persist.
    pub fn state(&self) -> &Value {
        &self.merge.state
    }

    /// Consume and return the state to persist.
    pub fn into_state(self) -> Value {
        self.merge.state
    }
}
