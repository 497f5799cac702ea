//! Per-resource reconciliation over the host framework's CRUD lifecycle.
//!
//! A [`Reconciler`] owns a [`ResourceDescriptor`] and a [`RemoteCollection`]
//! and maps each lifecycle call onto the engine's components:
//!
//! | Call | Remote steps | Merge |
//! |---|---|---|
//! | [`create`](Reconciler::create) | adopt-or-create | full |
//! | [`update`](Reconciler::update) | update by id, fetch | full |
//! | [`read`](Reconciler::read) | fetch by id, or list + locate | path-only |
//! | [`read_data_source`](Reconciler::read_data_source) | selected read variant | none |
//! | [`delete`](Reconciler::delete) | delete by id | none |
//! | [`import`](Reconciler::import) | fetch by id | full |
//!
//! Prior state is always taken by reference and a fresh state is returned, so
//! a failing call leaves the caller's persisted state as it was.

use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};

use crate::error::ReconcileError;
use crate::locator::{field_as_id, locate};
use crate::merge::Merger;
use crate::options::ReconcileOptions;
use crate::orchestrator::AdoptOrCreate;
use crate::remote::{RemoteCollection, Scope};
use crate::resource::ResourceDescriptor;
use crate::selector::{select_variant, ReadKind};
use crate::types::{Applied, AttributeChange, MergeMode, MergeOutcome};
use crate::validation::validate_result;

/// Reconciles instances of one resource type against a remote collection.
pub struct Reconciler<R: RemoteCollection> {
    descriptor: ResourceDescriptor,
    remote: R,
    options: ReconcileOptions,
    merger: Merger,
}

impl<R: RemoteCollection> Reconciler<R> {
    /// Create a reconciler with default options.
    pub fn new(descriptor: ResourceDescriptor, remote: R) -> Self {
        let merger = Merger::new(descriptor.path_fields())
            .with_sensitive_fields(descriptor.schema.sensitive_attributes());
        Self {
            descriptor,
            remote,
            options: ReconcileOptions::default(),
            merger,
        }
    }

    /// Replace the options.
    pub fn with_options(mut self, options: ReconcileOptions) -> Self {
        self.options = options;
        self
    }

    /// The resource descriptor.
    pub fn descriptor(&self) -> &ResourceDescriptor {
        &self.descriptor
    }

    /// The remote collection.
    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// The active options.
    pub fn options(&self) -> &ReconcileOptions {
        &self.options
    }

    /// Bring a new resource instance into existence, adopting a remote object
    /// with the same natural key if there is one.
    #[instrument(
        skip_all,
        name = "reconcile.create",
        fields(resource_type = %self.descriptor.type_name)
    )]
    pub async fn create(&self, desired: &Value) -> Result<Applied, ReconcileError> {
        self.validate(desired)?;
        let resolution = AdoptOrCreate::new(&self.descriptor, &self.remote, &self.options)
            .resolve(desired)
            .await?;
        let merge = self.merge_written(desired, &resolution.id, resolution.observed.as_ref())?;
        info!(id = %resolution.id, changes = merge.changes.len(), "Create completed");
        Ok(Applied {
            resolution: Some(resolution),
            merge,
        })
    }

    /// Converge an existing instance to `desired`.
    ///
    /// Falls back to [`create`](Self::create) when the prior state carries no
    /// identifier.
    #[instrument(
        skip_all,
        name = "reconcile.update",
        fields(resource_type = %self.descriptor.type_name)
    )]
    pub async fn update(&self, prior: &Value, desired: &Value) -> Result<Applied, ReconcileError> {
        let Some(id) = self.descriptor.id_of(prior) else {
            warn!("Prior state has no identifier, resolving by natural key");
            return self.create(desired).await;
        };
        self.validate(desired)?;

        let scope = self.descriptor.scope(desired)?;
        let body = self.descriptor.request_body(desired);
        let response = self
            .remote
            .update(&scope, &id, &body)
            .await
            .map_err(|e| ReconcileError::transport("update", e))?;

        let observed = if self.options.fetch_canonical {
            Some(self.fetch(&scope, &id).await?)
        } else {
            response
        };

        let planned = self.planned_state(prior, desired);
        let merge = self.merge_written(&planned, &id, observed.as_ref())?;
        info!(%id, changes = merge.changes.len(), "Update completed");
        Ok(Applied {
            resolution: None,
            merge,
        })
    }

    /// Refresh persisted state from the remote.
    ///
    /// Returns `None` when the remote object no longer exists. Only the
    /// addressing path is refreshed; other differences are reported as drift.
    #[instrument(
        skip_all,
        name = "reconcile.read",
        fields(resource_type = %self.descriptor.type_name)
    )]
    pub async fn read(&self, prior: &Value) -> Result<Option<MergeOutcome>, ReconcileError> {
        let scope = self.descriptor.scope(prior)?;

        let observed = match self.descriptor.id_of(prior) {
            Some(id) => match self.remote.fetch(&scope, &id).await {
                Ok(observed) => observed,
                Err(e) if e.is_not_found() => {
                    info!(%id, "Remote object is gone");
                    return Ok(None);
                }
                Err(e) => return Err(ReconcileError::transport("fetch", e)),
            },
            None => {
                let target = self.descriptor.natural_key_value(prior)?;
                let listing = self
                    .remote
                    .list(&scope)
                    .await
                    .map_err(|e| ReconcileError::transport("list", e))?;
                let comparison = self.options.key_comparison;
                match locate(&listing, &self.descriptor.natural_key, target, |a, b| {
                    comparison.matches(a, b)
                }) {
                    Some(found) => found.element.clone(),
                    None => {
                        info!(
                            key = %self.descriptor.describe_key(target),
                            "No remote object matches"
                        );
                        return Ok(None);
                    }
                }
            }
        };

        let outcome = self.merger.merge(prior, &observed, MergeMode::PathOnly)?;
        if outcome.has_drift() {
            info!(
                drift = outcome.drift.len(),
                attributes = ?outcome.drift.iter().map(|c| c.path.as_str()).collect::<Vec<_>>(),
                "Remote state differs from persisted state"
            );
        }
        Ok(Some(outcome))
    }

    /// Read through whichever read variant the parameters select.
    ///
    /// List variants return a JSON array; item variants return one object.
    /// Fails with [`ReconcileError::Configuration`] before any remote call if
    /// no variant is satisfied.
    #[instrument(
        skip_all,
        name = "reconcile.read_data_source",
        fields(resource_type = %self.descriptor.type_name)
    )]
    pub async fn read_data_source(&self, params: &Value) -> Result<Value, ReconcileError> {
        let variants = self.descriptor.read_variants();
        let variant = select_variant(&variants, params)?;

        let scope: Scope = variant
            .required
            .iter()
            .filter(|name| **name != self.descriptor.id_field)
            .filter_map(|name| params.get(name).map(|v| (name.clone(), v.clone())))
            .collect();

        match variant.kind {
            ReadKind::List => {
                let listing = self
                    .remote
                    .list(&scope)
                    .await
                    .map_err(|e| ReconcileError::transport("list", e))?;
                debug!(variant = %variant.name, count = listing.len(), "Read data source");
                Ok(Value::Array(listing))
            }
            ReadKind::Item => {
                let id = self.descriptor.id_of(params).ok_or_else(|| {
                    ReconcileError::Configuration(format!(
                        "read variant {} needs '{}'",
                        variant.name, self.descriptor.id_field
                    ))
                })?;
                match self.remote.fetch(&scope, &id).await {
                    Ok(observed) => Ok(observed),
                    Err(e) if e.is_not_found() => Err(ReconcileError::NotFound(format!(
                        "{} {}",
                        self.descriptor.type_name, id
                    ))),
                    Err(e) => Err(ReconcileError::transport("fetch", e)),
                }
            }
        }
    }

    /// Delete the remote object. An already-missing object counts as deleted.
    #[instrument(
        skip_all,
        name = "reconcile.delete",
        fields(resource_type = %self.descriptor.type_name)
    )]
    pub async fn delete(&self, prior: &Value) -> Result<(), ReconcileError> {
        let Some(id) = self.descriptor.id_of(prior) else {
            warn!("Prior state has no identifier, nothing to delete");
            return Ok(());
        };
        let scope = self.descriptor.scope(prior)?;
        match self.remote.delete(&scope, &id).await {
            Ok(()) => {
                info!(%id, "Delete completed");
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                info!(%id, "Remote object already gone");
                Ok(())
            }
            Err(e) => Err(ReconcileError::transport("delete", e)),
        }
    }

    /// Bring an existing remote object under management.
    ///
    /// `params` carries the scope attributes; the returned value is the first
    /// persisted state.
    #[instrument(
        skip_all,
        name = "reconcile.import",
        fields(resource_type = %self.descriptor.type_name, id = %id)
    )]
    pub async fn import(&self, params: &Value, id: &str) -> Result<Value, ReconcileError> {
        let scope = self.descriptor.scope(params)?;
        let observed = self.fetch(&scope, id).await?;
        let base = Value::Object(scope);
        let merge = self.merge_written(&base, id, Some(&observed))?;
        info!("Import completed");
        Ok(merge.state)
    }

    fn validate(&self, desired: &Value) -> Result<(), ReconcileError> {
        if !self.options.validate_desired {
            return Ok(());
        }
        validate_result(&self.descriptor.schema, desired).map_err(ReconcileError::Validation)
    }

    async fn fetch(&self, scope: &Scope, id: &str) -> Result<Value, ReconcileError> {
        match self.remote.fetch(scope, id).await {
            Ok(observed) => Ok(observed),
            Err(e) if e.is_not_found() => Err(ReconcileError::NotFound(format!(
                "{} {}",
                self.descriptor.type_name, id
            ))),
            Err(e) => Err(ReconcileError::transport("fetch", e)),
        }
    }

    /// The desired state, carrying over what only the remote knows.
    ///
    /// Attributes the user cannot set (computed or addressing-path ones, or
    /// ones outside the schema) keep their prior value unless desired sets
    /// them. User-settable attributes follow desired, including nulls.
    fn planned_state(&self, prior: &Value, desired: &Value) -> Value {
        let mut planned = desired.as_object().cloned().unwrap_or_default();
        if let Some(prior) = prior.as_object() {
            for (name, value) in prior {
                let desired_set = planned.get(name).is_some_and(|v| !v.is_null());
                if desired_set || value.is_null() {
                    continue;
                }
                let carried = match self.descriptor.schema.attributes.get(name) {
                    Some(attr) => attr.flags.computed || attr.flags.path,
                    None => true,
                };
                if carried {
                    planned.insert(name.clone(), value.clone());
                }
            }
        }
        Value::Object(planned)
    }

    /// Full merge after a write, making sure the resolved id is recorded.
    fn merge_written(
        &self,
        base: &Value,
        id: &str,
        observed: Option<&Value>,
    ) -> Result<MergeOutcome, ReconcileError> {
        let empty = Value::Object(Map::new());
        let mut outcome = self
            .merger
            .merge(base, observed.unwrap_or(&empty), MergeMode::Full)?;

        // A recorded id matching the resolved one keeps the remote's own
        // representation (string or number).
        let id_field = &self.descriptor.id_field;
        if field_as_id(&outcome.state, id_field).as_deref() != Some(id) {
            if let Value::Object(state) = &mut outcome.state {
                let before = state
                    .insert(id_field.clone(), Value::String(id.to_string()))
                    .filter(|v| !v.is_null());
                let change = AttributeChange::new(
                    id_field.clone(),
                    before,
                    Some(Value::String(id.to_string())),
                );
                outcome.changes.push(self.merger.redact(change));
            }
        }
        Ok(outcome)
    }
}
