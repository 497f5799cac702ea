//! The remote capability consumed by the engine.
//!
//! Implementations wrap a vendor SDK: they take the resource's scope
//! parameters (for example `{"network_id": "N1"}`) and return decoded JSON.
//! Transport, retries and authentication stay on the implementation's side.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::RemoteError;

/// Scope parameters addressing a resource's parent collection.
pub type Scope = Map<String, Value>;

/// CRUD access to one remote collection.
///
/// # Example
///
/// ```ignore
/// use hemmer_reconcile::remote::{RemoteCollection, Scope};
/// use hemmer_reconcile::RemoteError;
///
/// struct RetentionProfiles { client: vendor::Client }
///
/// #[async_trait::async_trait]
/// impl RemoteCollection for RetentionProfiles {
///     async fn list(&self, scope: &Scope) -> Result<Vec<serde_json::Value>, RemoteError> {
///         let network = scope["network_id"].as_str().unwrap_or_default();
///         self.client.list_profiles(network).await.map_err(into_remote_error)
///     }
///     // ... fetch, create, update
/// }
/// ```
#[async_trait::async_trait]
pub trait RemoteCollection: Send + Sync {
    /// List every object in the scoped collection.
    async fn list(&self, scope: &Scope) -> Result<Vec<Value>, RemoteError>;

    /// Fetch one object by its server-assigned id.
    ///
    /// Returns [`RemoteError::NotFound`] when the object does not exist.
    async fn fetch(&self, scope: &Scope, id: &str) -> Result<Value, RemoteError>;

    /// Create an object. The response may be partial or missing entirely.
    async fn create(&self, scope: &Scope, body: &Value) -> Result<Option<Value>, RemoteError>;

    /// Update the object with the given id.
    async fn update(
        &self,
        scope: &Scope,
        id: &str,
        body: &Value,
    ) -> Result<Option<Value>, RemoteError>;

    /// Delete the object with the given id.
    async fn delete(&self, scope: &Scope, id: &str) -> Result<(), RemoteError> {
        let _ = (scope, id);
        Err(RemoteError::Unimplemented(
            "delete is not supported by this collection".to_string(),
        ))
    }
}

#[async_trait::async_trait]
impl<R: RemoteCollection + ?Sized> RemoteCollection for Arc<R> {
    async fn list(&self, scope: &Scope) -> Result<Vec<Value>, RemoteError> {
        (**self).list(scope).await
    }

    async fn fetch(&self, scope: &Scope, id: &str) -> Result<Value, RemoteError> {
        (**self).fetch(scope, id).await
    }

    async fn create(&self, scope: &Scope, body: &Value) -> Result<Option<Value>, RemoteError> {
        (**self).create(scope, body).await
    }

    async fn update(
        &self,
        scope: &Scope,
        id: &str,
        body: &Value,
    ) -> Result<Option<Value>, RemoteError> {
        (**self).update(scope, id, body).await
    }

    async fn delete(&self, scope: &Scope, id: &str) -> Result<(), RemoteError> {
        (**self).delete(scope, id).await
    }
}
