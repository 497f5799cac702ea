//! Error types for the reconciliation engine.

use thiserror::Error;

use crate::schema::Diagnostic;

/// Errors reported by a [`RemoteCollection`](crate::remote::RemoteCollection).
///
/// These mirror the status classes a vendor SDK usually distinguishes. The
/// engine never retries them; it attaches the name of the failing step and
/// hands them back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// The addressed remote object does not exist.
    #[error("Remote object not found: {0}")]
    NotFound(String),

    /// Permission denied (authentication/authorization failure).
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Quota or rate limit exceeded.
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Service temporarily unavailable.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// The request timed out.
    #[error("Deadline exceeded: {0}")]
    DeadlineExceeded(String),

    /// The remote rejected the request body or parameters.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The remote API does not offer this operation.
    #[error("Unimplemented: {0}")]
    Unimplemented(String),

    /// Any other transport failure.
    #[error("Remote error: {0}")]
    Other(String),
}

impl RemoteError {
    /// Whether this error means the addressed object is gone.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Errors that abort a reconciliation pass.
///
/// Whatever the variant, the persisted state handed to the engine is left
/// untouched: no partial merge is ever returned alongside an error.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The caller supplied a parameter set no read variant accepts, or a
    /// scope attribute is missing. Raised before any remote call.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A read addressed an object that does not exist.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// A create went through but the new object could not be found again by
    /// its natural key, so it now exists remotely without being managed.
    #[error("Orphaned {resource_type} resource: created object with {key} could not be located")]
    OrphanResource {
        /// The resource type being reconciled.
        resource_type: String,
        /// The natural key (`field=value`) that failed to match.
        key: String,
    },

    /// A remote call failed.
    #[error("Transport error during {operation}: {source}")]
    Transport {
        /// The orchestration step that issued the call.
        operation: &'static str,
        /// The error reported by the remote.
        #[source]
        source: RemoteError,
    },

    /// Prior and observed state disagree on the shape of an attribute.
    #[error("Shape mismatch at '{path}': expected {expected}, found {found}")]
    ShapeMismatch {
        /// Dotted path of the offending attribute.
        path: String,
        /// The kind held by the prior state.
        expected: &'static str,
        /// The kind held by the observed state.
        found: &'static str,
    },

    /// The desired state failed schema validation.
    #[error("Validation failed with {} error(s)", .0.len())]
    Validation(Vec<Diagnostic>),

    /// A typed value could not be converted to or from JSON.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ReconcileError {
    /// Wrap a remote failure with the name of the step that triggered it.
    pub fn transport(operation: &'static str, source: RemoteError) -> Self {
        Self::Transport { operation, source }
    }

    /// Get the error message without the variant prefix.
    pub fn message(&self) -> String {
        match self {
            Self::Configuration(msg) => msg.clone(),
            Self::NotFound(msg) => msg.clone(),
            Self::OrphanResource { key, .. } => {
                format!("created object with {} could not be located", key)
            }
            Self::Transport { source, .. } => source.to_string(),
            Self::ShapeMismatch {
                path,
                expected,
                found,
            } => format!("{}: expected {}, found {}", path, expected, found),
            Self::Validation(diags) => diags
                .iter()
                .map(|d| d.summary.as_str())
                .collect::<Vec<_>>()
                .join("; "),
            Self::Serialization(err) => err.to_string(),
        }
    }

    /// Convert into diagnostics for the host framework.
    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        if let Self::ShapeMismatch { path, .. } = &self {
            return vec![Diagnostic::error(self.to_string()).with_attribute(path.clone())];
        }
        match self {
            Self::Validation(diags) => diags,
            Self::OrphanResource { resource_type, key } => vec![Diagnostic::error(format!(
                "Orphaned {} resource",
                resource_type
            ))
            .with_detail(format!(
                "The remote object with {} was created but could not be located afterwards. \
                 It now exists without being managed and may need to be imported \
                 or removed by hand.",
                key
            ))],
            other => vec![Diagnostic::error(other.to_string())],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DiagnosticSeverity;

    #[test]
    fn test_error_display() {
        let err = ReconcileError::Configuration("no read variant".to_string());
        assert_eq!(format!("{}", err), "Configuration error: no read variant");

        let err = ReconcileError::transport(
            "list",
            RemoteError::Unavailable("503".to_string()),
        );
        assert_eq!(
            format!("{}", err),
            "Transport error during list: Service unavailable: 503"
        );

        let err = ReconcileError::OrphanResource {
            resource_type: "retention_profile".to_string(),
            key: "name=Profile-A".to_string(),
        };
        assert_eq!(
            format!("{}", err),
            "Orphaned retention_profile resource: created object with name=Profile-A could not be located"
        );
    }

    #[test]
    fn test_shape_mismatch_display() {
        let err = ReconcileError::ShapeMismatch {
            path: "settings.mode".to_string(),
            expected: "object",
            found: "string",
        };
        assert_eq!(
            format!("{}", err),
            "Shape mismatch at 'settings.mode': expected object, found string"
        );
        assert_eq!(err.message(), "settings.mode: expected object, found string");
    }

    #[test]
    fn test_transport_keeps_source() {
        let err = ReconcileError::transport("fetch", RemoteError::NotFound("Q1".to_string()));
        let source = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(source, Some("Remote object not found: Q1".to_string()));
        assert_eq!(err.message(), "Remote object not found: Q1");
    }

    #[test]
    fn test_remote_error_not_found() {
        assert!(RemoteError::NotFound("x".to_string()).is_not_found());
        assert!(!RemoteError::Unavailable("x".to_string()).is_not_found());
    }

    #[test]
    fn test_into_diagnostics() {
        let diags = ReconcileError::Validation(vec![
            Diagnostic::error("Missing required attribute 'network_id'"),
            Diagnostic::error("Invalid type for attribute 'name'"),
        ])
        .into_diagnostics();
        assert_eq!(diags.len(), 2);

        let diags = ReconcileError::OrphanResource {
            resource_type: "retention_profile".to_string(),
            key: "name=Profile-A".to_string(),
        }
        .into_diagnostics();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].severity, DiagnosticSeverity::Error);
        assert!(diags[0].detail.as_deref().unwrap_or_default().contains("Profile-A"));

        let diags = ReconcileError::ShapeMismatch {
            path: "tags".to_string(),
            expected: "array",
            found: "string",
        }
        .into_diagnostics();
        assert_eq!(diags[0].attribute, Some("tags".to_string()));
    }

    #[test]
    fn test_validation_message() {
        let err = ReconcileError::Validation(vec![
            Diagnostic::error("first"),
            Diagnostic::error("second"),
        ]);
        assert_eq!(format!("{}", err), "Validation failed with 2 error(s)");
        assert_eq!(err.message(), "first; second");
    }
}
