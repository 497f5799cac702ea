//! Tunables for a reconciler.
//!
//! Options are plain data so a provider can carry them in its own
//! configuration block and deserialize them with the rest of its settings.
//!
//! ```
//! use hemmer_reconcile::options::{KeyComparison, ReconcileOptions};
//!
//! let options: ReconcileOptions = serde_json::from_value(serde_json::json!({
//!     "key_comparison": "case_insensitive"
//! }))
//! .unwrap();
//! assert_eq!(options.key_comparison, KeyComparison::CaseInsensitive);
//! assert!(options.fetch_canonical);
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How natural-key values are compared when locating a remote object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum KeyComparison {
    /// Values must be equal.
    #[default]
    Exact,
    /// Strings compare equal ignoring ASCII case.
    CaseInsensitive,
    /// Strings compare equal ignoring leading and trailing whitespace.
    Trimmed,
}

impl KeyComparison {
    /// Compare an element's key value with the target.
    ///
    /// Non-string values always fall back to exact equality.
    pub fn matches(&self, candidate: &Value, target: &Value) -> bool {
        match (self, candidate, target) {
            (Self::CaseInsensitive, Value::String(a), Value::String(b)) => {
                a.eq_ignore_ascii_case(b)
            }
            (Self::Trimmed, Value::String(a), Value::String(b)) => a.trim() == b.trim(),
            _ => candidate == target,
        }
    }
}

/// Options controlling a reconciler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileOptions {
    /// Comparison used by the natural-key locator.
    pub key_comparison: KeyComparison,
    /// Emit a warning when more than one remote object matches the natural key.
    pub warn_on_duplicate_keys: bool,
    /// Fetch the object by id after resolution and merge that response.
    /// When disabled, the re-listed element is merged instead.
    pub fetch_canonical: bool,
    /// Validate desired state against the schema before any remote call.
    pub validate_desired: bool,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            key_comparison: KeyComparison::Exact,
            warn_on_duplicate_keys: true,
            fetch_canonical: true,
            validate_desired: true,
        }
    }
}

impl ReconcileOptions {
    /// Create options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the natural-key comparison.
    pub fn with_key_comparison(mut self, comparison: KeyComparison) -> Self {
        self.key_comparison = comparison;
        self
    }

    /// Enable or disable duplicate-key warnings.
    pub fn with_duplicate_key_warnings(mut self, enabled: bool) -> Self {
        self.warn_on_duplicate_keys = enabled;
        self
    }

    /// Enable or disable the canonical fetch after resolution.
    pub fn with_fetch_canonical(mut self, enabled: bool) -> Self {
        self.fetch_canonical = enabled;
        self
    }

    /// Enable or disable schema validation of desired state.
    pub fn with_validation(mut self, enabled: bool) -> Self {
        self.validate_desired = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let options = ReconcileOptions::new();
        assert_eq!(options.key_comparison, KeyComparison::Exact);
        assert!(options.warn_on_duplicate_keys);
        assert!(options.fetch_canonical);
        assert!(options.validate_desired);
    }

    #[test]
    fn test_builder() {
        let options = ReconcileOptions::new()
            .with_key_comparison(KeyComparison::Trimmed)
            .with_duplicate_key_warnings(false)
            .with_fetch_canonical(false)
            .with_validation(false);
        assert_eq!(options.key_comparison, KeyComparison::Trimmed);
        assert!(!options.warn_on_duplicate_keys);
        assert!(!options.fetch_canonical);
        assert!(!options.validate_desired);
    }

    #[test]
    fn test_partial_deserialize_keeps_defaults() {
        let options: ReconcileOptions =
            serde_json::from_value(json!({"fetch_canonical": false})).unwrap();
        assert!(!options.fetch_canonical);
        assert!(options.warn_on_duplicate_keys);
    }

    #[test]
    fn test_key_comparison() {
        assert!(KeyComparison::Exact.matches(&json!("a"), &json!("a")));
        assert!(!KeyComparison::Exact.matches(&json!("A"), &json!("a")));
        assert!(KeyComparison::CaseInsensitive.matches(&json!("Profile-A"), &json!("profile-a")));
        assert!(KeyComparison::Trimmed.matches(&json!(" Profile-A "), &json!("Profile-A")));
        assert!(!KeyComparison::Trimmed.matches(&json!("1"), &json!(1)));
        assert!(KeyComparison::CaseInsensitive.matches(&json!(7), &json!(7)));
    }
}
