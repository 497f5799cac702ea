//! Read-variant selection.
//!
//! Many remote APIs expose several overlapping reads for one resource: list
//! everything under a network, or get one item by id. Each [`ReadVariant`]
//! names the parameters it needs; the selector picks the one the caller's
//! parameters satisfy. Variants are declared from least to most specific and
//! the **last** satisfied one wins, so supplying both `network_id` and `id`
//! resolves to the single-item read rather than the list.
//!
//! ```
//! use hemmer_reconcile::selector::select;
//!
//! // list needs [network_id], get needs [network_id, id]
//! assert_eq!(select(&[vec![true], vec![true, true]]).unwrap(), 1);
//! assert_eq!(select(&[vec![true], vec![true, false]]).unwrap(), 0);
//! assert!(select(&[vec![false], vec![false, true]]).is_err());
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ReconcileError;

/// Whether a read variant returns a collection or a single object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadKind {
    /// The variant lists a collection.
    List,
    /// The variant fetches one object by id.
    Item,
}

/// One of the remote read operations available for a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadVariant {
    /// Name used in logs and error messages.
    pub name: String,
    /// Parameters that must be non-null for this variant.
    pub required: Vec<String>,
    /// What the variant returns.
    pub kind: ReadKind,
}

impl ReadVariant {
    /// Create a list variant.
    pub fn list<S: Into<String>>(
        name: impl Into<String>,
        required: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            name: name.into(),
            required: required.into_iter().map(Into::into).collect(),
            kind: ReadKind::List,
        }
    }

    /// Create a single-item variant.
    pub fn item<S: Into<String>>(
        name: impl Into<String>,
        required: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            name: name.into(),
            required: required.into_iter().map(Into::into).collect(),
            kind: ReadKind::Item,
        }
    }

    /// Presence flags for this variant's parameters.
    pub fn presence(&self, params: &Value) -> Vec<bool> {
        self.required
            .iter()
            .map(|name| is_present(params, name))
            .collect()
    }

    fn missing(&self, params: &Value) -> Vec<&str> {
        self.required
            .iter()
            .filter(|name| !is_present(params, name))
            .map(String::as_str)
            .collect()
    }
}

/// Whether every flag of a variant is set.
pub fn is_satisfied(flags: &[bool]) -> bool {
    flags.iter().all(|&flag| flag)
}

/// Pick the last fully satisfied variant.
///
/// Fails with [`ReconcileError::Configuration`] when no variant is satisfied.
pub fn select(variants: &[Vec<bool>]) -> Result<usize, ReconcileError> {
    variants
        .iter()
        .rposition(|flags| is_satisfied(flags))
        .ok_or_else(|| {
            ReconcileError::Configuration(format!(
                "none of the {} read variant(s) has all of its parameters set",
                variants.len()
            ))
        })
}

/// Presence flags for every variant, in declaration order.
pub fn presence(variants: &[ReadVariant], params: &Value) -> Vec<Vec<bool>> {
    variants.iter().map(|v| v.presence(params)).collect()
}

/// Select the read variant the given parameters satisfy.
///
/// The error names each variant and the parameters it is missing.
pub fn select_variant<'a>(
    variants: &'a [ReadVariant],
    params: &Value,
) -> Result<&'a ReadVariant, ReconcileError> {
    match select(&presence(variants, params)) {
        Ok(index) => {
            let variant = &variants[index];
            tracing::debug!(variant = %variant.name, index, "Selected read variant");
            Ok(variant)
        }
        Err(_) => {
            let detail = variants
                .iter()
                .map(|v| format!("{} (missing {})", v.name, v.missing(params).join(", ")))
                .collect::<Vec<_>>()
                .join("; ");
            Err(ReconcileError::Configuration(format!(
                "no read variant matches the supplied parameters: {}",
                detail
            )))
        }
    }
}

fn is_present(params: &Value, name: &str) -> bool {
    params.get(name).map(|v| !v.is_null()).unwrap_or(false)
}
