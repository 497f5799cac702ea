//! Testing utilities for resources built on the engine.
//!
//! [`FakeRemote`] is an in-memory [`RemoteCollection`] that counts calls and
//! can inject failures, so reconciliation paths can be exercised without a
//! vendor API.
//!
//! # Example
//!
//! ```ignore
//! use hemmer_reconcile::testing::{assert_adopted, FakeRemote};
//! use serde_json::json;
//!
//! #[tokio::test]
//! async fn adopts_existing_profile() {
//!     let remote = FakeRemote::with_objects(vec![json!({"id": "Q1", "name": "Profile-A"})]);
//!     let reconciler = Reconciler::new(retention_profile(), remote);
//!
//!     let desired = json!({"network_id": "N1", "name": "Profile-A"});
//!     let applied = reconciler.create(&desired).await.unwrap();
//!     assert_adopted(applied.resolution.as_ref().unwrap());
//! }
//! ```

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use serde_json::{Map, Value};

use crate::error::RemoteError;
use crate::locator::field_as_id;
use crate::remote::{RemoteCollection, Scope};
use crate::schema::Diagnostic;
use crate::types::{MergeOutcome, Resolution, ResolutionPath};

/// Number of calls a [`FakeRemote`] received, per operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    /// `list` calls.
    pub lists: usize,
    /// `fetch` calls.
    pub fetches: usize,
    /// `create` calls.
    pub creates: usize,
    /// `update` calls.
    pub updates: usize,
    /// `delete` calls.
    pub deletes: usize,
}

impl CallCounts {
    /// Total number of calls.
    pub fn total(&self) -> usize {
        self.lists + self.fetches + self.creates + self.updates + self.deletes
    }
}

#[derive(Debug, Default)]
struct FakeState {
    listed: Vec<Value>,
    hidden: Vec<Value>,
    calls: CallCounts,
    next_id: usize,
    last_body: Option<Value>,
}

/// An in-memory remote collection.
///
/// Created objects get ids `Q1`, `Q2`, ... (or plain numbers, see
/// [`numeric_ids`](Self::numeric_ids)) and carry the scope attributes
/// they were created under. `list` only returns objects whose scope
/// attributes match the requested scope.
#[derive(Debug, Default)]
pub struct FakeRemote {
    state: Mutex<FakeState>,
    failures: HashMap<&'static str, RemoteError>,
    hide_created: bool,
    echo_create: bool,
    numeric_ids: bool,
}

impl FakeRemote {
    /// Create an empty remote.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a remote that already holds the given objects.
    pub fn with_objects(objects: Vec<Value>) -> Self {
        let remote = Self::new();
        remote.lock().listed = objects;
        remote
    }

    /// Created objects exist (and can be fetched) but never show up in
    /// `list`, which makes them orphans.
    pub fn hide_created(mut self) -> Self {
        self.hide_created = true;
        self
    }

    /// Assign JSON numbers (`1`, `2`, ...) as ids instead of `Q1`, `Q2`, ...
    pub fn numeric_ids(mut self) -> Self {
        self.numeric_ids = true;
        self
    }

    /// Return the created object from `create` instead of an empty response.
    pub fn echo_create(mut self) -> Self {
        self.echo_create = true;
        self
    }

    /// Fail every call to `operation` (`list`, `fetch`, `create`, `update`,
    /// `delete`) with `error`.
    pub fn fail_on(mut self, operation: &'static str, error: RemoteError) -> Self {
        self.failures.insert(operation, error);
        self
    }

    /// Calls received so far.
    pub fn calls(&self) -> CallCounts {
        self.lock().calls
    }

    /// Listed objects currently held.
    pub fn objects(&self) -> Vec<Value> {
        self.lock().listed.clone()
    }

    /// Body of the most recent create or update.
    pub fn last_body(&self) -> Option<Value> {
        self.lock().last_body.clone()
    }

    /// Replace a field of a stored object, simulating an out-of-band change.
    pub fn set_field(&self, id: &str, field: &str, value: Value) {
        let mut state = self.lock();
        if let Some(Value::Object(obj)) = find_mut(&mut state, id) {
            obj.insert(field.to_string(), value);
        }
    }

    /// Remove a stored object, simulating an out-of-band delete.
    pub fn remove(&self, id: &str) {
        let mut state = self.lock();
        state.listed.retain(|obj| !has_id(obj, id));
        state.hidden.retain(|obj| !has_id(obj, id));
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        // A panic inside a test body poisons the lock; the data is still usable.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check(&self, operation: &'static str) -> Result<(), RemoteError> {
        match self.failures.get(operation) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl RemoteCollection for FakeRemote {
    async fn list(&self, scope: &Scope) -> Result<Vec<Value>, RemoteError> {
        self.lock().calls.lists += 1;
        self.check("list")?;
        Ok(self
            .lock()
            .listed
            .iter()
            .filter(|obj| in_scope(obj, scope))
            .cloned()
            .collect())
    }

    async fn fetch(&self, _scope: &Scope, id: &str) -> Result<Value, RemoteError> {
        let mut state = self.lock();
        state.calls.fetches += 1;
        self.check("fetch")?;
        find_mut(&mut state, id)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(id.to_string()))
    }

    async fn create(&self, scope: &Scope, body: &Value) -> Result<Option<Value>, RemoteError> {
        let mut state = self.lock();
        state.calls.creates += 1;
        self.check("create")?;
        state.last_body = Some(body.clone());
        state.next_id += 1;

        let mut obj: Map<String, Value> = scope.clone();
        if let Value::Object(fields) = body {
            obj.extend(fields.clone());
        }
        let id = if self.numeric_ids {
            Value::from(state.next_id)
        } else {
            Value::String(format!("Q{}", state.next_id))
        };
        obj.insert("id".to_string(), id);
        let obj = Value::Object(obj);

        if self.hide_created {
            state.hidden.push(obj.clone());
        } else {
            state.listed.push(obj.clone());
        }
        Ok(self.echo_create.then_some(obj))
    }

    async fn update(
        &self,
        _scope: &Scope,
        id: &str,
        body: &Value,
    ) -> Result<Option<Value>, RemoteError> {
        let mut state = self.lock();
        state.calls.updates += 1;
        self.check("update")?;
        state.last_body = Some(body.clone());
        match find_mut(&mut state, id) {
            Some(Value::Object(obj)) => {
                if let Value::Object(fields) = body {
                    obj.extend(fields.clone());
                }
                Ok(Some(Value::Object(obj.clone())))
            }
            _ => Err(RemoteError::NotFound(id.to_string())),
        }
    }

    async fn delete(&self, _scope: &Scope, id: &str) -> Result<(), RemoteError> {
        let mut state = self.lock();
        state.calls.deletes += 1;
        self.check("delete")?;
        if find_mut(&mut state, id).is_none() {
            return Err(RemoteError::NotFound(id.to_string()));
        }
        state.listed.retain(|obj| !has_id(obj, id));
        state.hidden.retain(|obj| !has_id(obj, id));
        Ok(())
    }
}

fn find_mut<'a>(state: &'a mut FakeState, id: &str) -> Option<&'a mut Value> {
    state
        .listed
        .iter_mut()
        .chain(state.hidden.iter_mut())
        .find(|obj| has_id(obj, id))
}

fn has_id(obj: &Value, id: &str) -> bool {
    field_as_id(obj, "id").as_deref() == Some(id)
}

fn in_scope(obj: &Value, scope: &Scope) -> bool {
    scope
        .iter()
        .all(|(name, value)| obj.get(name).map_or(true, |v| v == value))
}

// =========================================================================
// Assertion Helpers
// =========================================================================

/// Assert that a resolution adopted a pre-existing object.
///
/// # Panics
///
/// Panics if the object was created.
pub fn assert_adopted(resolution: &Resolution) {
    assert_eq!(
        resolution.path,
        ResolutionPath::Adopted,
        "Expected an existing object to be adopted, but it was created (trail: {:?})",
        resolution.trail
    );
}

/// Assert that a resolution created a new object.
///
/// # Panics
///
/// Panics if an existing object was adopted.
pub fn assert_created(resolution: &Resolution) {
    assert_eq!(
        resolution.path,
        ResolutionPath::Created,
        "Expected a new object to be created, but one was adopted (trail: {:?})",
        resolution.trail
    );
}

/// Assert that a merge changed the attribute at `path`.
///
/// # Panics
///
/// Panics if the merge did not change it.
pub fn assert_merge_changes_attribute(outcome: &MergeOutcome, path: &str) {
    assert!(
        outcome.changes.iter().any(|c| c.path == path),
        "Expected merge to change attribute '{}', but it was not changed. Changed attributes: {:?}",
        path,
        outcome.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// Assert that a merge reported drift on the attribute at `path`.
///
/// # Panics
///
/// Panics if no drift was reported for it.
pub fn assert_drift_on(outcome: &MergeOutcome, path: &str) {
    assert!(
        outcome.drift.iter().any(|c| c.path == path),
        "Expected drift on attribute '{}', but got: {:?}",
        path,
        outcome.drift.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// Assert that a merge reported no drift.
///
/// # Panics
///
/// Panics if any drift was reported.
pub fn assert_no_drift(outcome: &MergeOutcome) {
    assert!(
        outcome.drift.is_empty(),
        "Expected no drift, but got {} drifted attribute(s): {:?}",
        outcome.drift.len(),
        outcome.drift.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// Assert that diagnostics contain no errors.
///
/// # Panics
///
/// Panics if there are any error diagnostics.
pub fn assert_no_errors(diagnostics: &[Diagnostic]) {
    let errors: Vec<_> = diagnostics.iter().filter(|d| d.is_error()).collect();
    assert!(
        errors.is_empty(),
        "Expected no errors, but got {} error(s): {:?}",
        errors.len(),
        errors.iter().map(|d| &d.summary).collect::<Vec<_>>()
    );
}

/// Assert that diagnostics contain an error with the given summary substring.
///
/// # Panics
///
/// Panics if no error diagnostic contains the given substring.
pub fn assert_error_contains(diagnostics: &[Diagnostic], substring: &str) {
    assert!(
        diagnostics
            .iter()
            .any(|d| d.is_error() && d.summary.contains(substring)),
        "Expected an error containing '{}', but no matching error found. Errors: {:?}",
        substring,
        diagnostics
            .iter()
            .filter(|d| d.is_error())
            .map(|d| &d.summary)
            .collect::<Vec<_>>()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AttributeChange, Phase};
    use serde_json::json;

    fn scope(network: &str) -> Scope {
        let mut scope = Map::new();
        scope.insert("network_id".to_string(), json!(network));
        scope
    }

    #[tokio::test]
    async fn test_create_assigns_ids_and_scope() {
        let remote = FakeRemote::new().echo_create();
        let created = remote
            .create(&scope("N1"), &json!({"name": "Profile-A"}))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(created["id"], "Q1");
        assert_eq!(created["network_id"], "N1");

        assert_eq!(remote.list(&scope("N1")).await.unwrap().len(), 1);
        assert!(remote.list(&scope("N2")).await.unwrap().is_empty());
        assert_eq!(remote.calls().creates, 1);
        assert_eq!(remote.calls().lists, 2);
    }

    #[tokio::test]
    async fn test_numeric_ids() {
        let remote = FakeRemote::new().numeric_ids().echo_create();
        let created = remote
            .create(&scope("N1"), &json!({"name": "Profile-A"}))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(created["id"], json!(1));
        assert_eq!(remote.fetch(&scope("N1"), "1").await.unwrap()["name"], "Profile-A");
    }

    #[tokio::test]
    async fn test_hidden_objects_fetchable_not_listed() {
        let remote = FakeRemote::new().hide_created();
        let response = remote
            .create(&scope("N1"), &json!({"name": "Profile-A"}))
            .await
            .unwrap();
        assert!(response.is_none());
        assert!(remote.list(&scope("N1")).await.unwrap().is_empty());
        assert_eq!(remote.fetch(&scope("N1"), "Q1").await.unwrap()["name"], "Profile-A");
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let remote = FakeRemote::with_objects(vec![json!({"id": "Q1", "name": "a"})]);
        let updated = remote
            .update(&Map::new(), "Q1", &json!({"name": "b"}))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated["name"], "b");

        remote.delete(&Map::new(), "Q1").await.unwrap();
        let err = remote.fetch(&Map::new(), "Q1").await.unwrap_err();
        assert!(err.is_not_found());
        assert!(remote.delete(&Map::new(), "Q1").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_fail_on() {
        let remote =
            FakeRemote::new().fail_on("list", RemoteError::DeadlineExceeded("slow".into()));
        let err = remote.list(&Map::new()).await.unwrap_err();
        assert_eq!(err, RemoteError::DeadlineExceeded("slow".into()));
        assert_eq!(remote.calls().lists, 1);
    }

    #[test]
    fn test_out_of_band_changes() {
        let remote = FakeRemote::with_objects(vec![json!({"id": "Q1", "name": "a"})]);
        remote.set_field("Q1", "name", json!("changed"));
        assert_eq!(remote.objects()[0]["name"], "changed");
        remote.remove("Q1");
        assert!(remote.objects().is_empty());
    }

    #[test]
    fn test_resolution_assertions() {
        let resolution = Resolution {
            id: "Q1".to_string(),
            path: ResolutionPath::Adopted,
            trail: vec![Phase::Unresolved, Phase::Located],
            observed: None,
        };
        assert_adopted(&resolution);
    }

    #[test]
    #[should_panic(expected = "Expected a new object to be created")]
    fn test_assert_created_fails_on_adoption() {
        let resolution = Resolution {
            id: "Q1".to_string(),
            path: ResolutionPath::Adopted,
            trail: vec![],
            observed: None,
        };
        assert_created(&resolution);
    }

    #[test]
    fn test_merge_assertions() {
        let outcome = MergeOutcome {
            state: json!({"id": "Q1"}),
            changes: vec![AttributeChange::added("id", json!("Q1"))],
            drift: vec![AttributeChange::modified("name", json!("a"), json!("b"))],
        };
        assert_merge_changes_attribute(&outcome, "id");
        assert_drift_on(&outcome, "name");
    }

    #[test]
    #[should_panic(expected = "Expected no drift")]
    fn test_assert_no_drift_fails() {
        let outcome = MergeOutcome {
            state: json!({}),
            changes: vec![],
            drift: vec![AttributeChange::added("name", json!("b"))],
        };
        assert_no_drift(&outcome);
    }

    #[test]
    fn test_diagnostic_assertions() {
        assert_no_errors(&[Diagnostic::warning("Just a warning")]);
        assert_error_contains(
            &[Diagnostic::error("Missing required attribute 'network_id'")],
            "network_id",
        );
    }
}
