//! Adopt-or-create resolution of a server-assigned identifier.
//!
//! For resources whose create call is not an idempotent upsert, the engine
//! cannot just create and remember the returned id: the response may be
//! partial, and a previous run may already have created the object. Instead
//! it runs this sequence, every step awaited before the next begins:
//!
//! ```text
//! Unresolved ─list+locate─> Located ─update─> Updated ─┐
//!     │                                                ├─relist+locate─> ReLocated
//!     └───(no match)───create───> Created ─────────────┘                     │
//!                                                                          fetch
//!                                                                            v
//!                                                                        Resolved
//! ```
//!
//! A pre-existing object with the desired natural key is adopted and
//! converged rather than treated as a conflict. If a freshly created object
//! cannot be found again, the run fails with
//! [`ReconcileError::OrphanResource`]; no compensating delete is attempted.
//! Nothing is retried: callers re-run the whole sequence, which finds the
//! object by its natural key and takes the update path.

use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

use crate::error::ReconcileError;
use crate::locator::locate;
use crate::options::ReconcileOptions;
use crate::remote::{RemoteCollection, Scope};
use crate::resource::ResourceDescriptor;
use crate::types::{Phase, Resolution, ResolutionPath};

/// Runs the adopt-or-create sequence for one resource instance.
pub struct AdoptOrCreate<'a, R: RemoteCollection + ?Sized> {
    descriptor: &'a ResourceDescriptor,
    remote: &'a R,
    options: &'a ReconcileOptions,
}

impl<'a, R: RemoteCollection + ?Sized> AdoptOrCreate<'a, R> {
    /// Create an orchestrator over the given remote collection.
    pub fn new(
        descriptor: &'a ResourceDescriptor,
        remote: &'a R,
        options: &'a ReconcileOptions,
    ) -> Self {
        Self {
            descriptor,
            remote,
            options,
        }
    }

    /// Resolve the canonical identifier for `desired`.
    #[instrument(
        skip_all,
        name = "reconcile.adopt_or_create",
        fields(resource_type = %self.descriptor.type_name)
    )]
    pub async fn resolve(&self, desired: &Value) -> Result<Resolution, ReconcileError> {
        let scope = self.descriptor.scope(desired)?;
        let target = self.descriptor.natural_key_value(desired)?;
        let body = self.descriptor.request_body(desired);

        let mut trail = vec![Phase::Unresolved];
        match self.run(&scope, target, &body, &mut trail).await {
            Ok(resolution) => Ok(resolution),
            Err(e) => {
                let last = trail.last().copied().unwrap_or(Phase::Unresolved);
                trail.push(Phase::Failed);
                error!(phase = %last, trail = ?trail, error = %e, "Adopt-or-create failed");
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        scope: &Scope,
        target: &Value,
        body: &Value,
        trail: &mut Vec<Phase>,
    ) -> Result<Resolution, ReconcileError> {
        let key = self.descriptor.describe_key(target);

        let listing = self.list(scope, "list").await?;
        let located = self.find(&listing, target)?.map(|(id, _)| id);

        let path = match &located {
            Some(id) => {
                trail.push(Phase::Located);
                info!(%key, %id, "Adopting existing remote object");
                self.remote
                    .update(scope, id, body)
                    .await
                    .map_err(|e| ReconcileError::transport("update", e))?;
                trail.push(Phase::Updated);
                ResolutionPath::Adopted
            }
            None => {
                info!(%key, "No remote object matches, creating");
                let response = self
                    .remote
                    .create(scope, body)
                    .await
                    .map_err(|e| ReconcileError::transport("create", e))?;
                debug!(has_response = response.is_some(), "Create returned");
                trail.push(Phase::Created);
                ResolutionPath::Created
            }
        };

        let relisting = self.list(scope, "relist").await?;
        let (id, element) = match self.find(&relisting, target)? {
            Some(found) => found,
            None => match (path, located) {
                (ResolutionPath::Adopted, Some(id)) => {
                    warn!(%key, %id, "Updated object not found on relist, keeping located id");
                    (id, None)
                }
                _ => {
                    return Err(ReconcileError::OrphanResource {
                        resource_type: self.descriptor.type_name.clone(),
                        key,
                    })
                }
            },
        };
        trail.push(Phase::ReLocated);

        let observed = if self.options.fetch_canonical {
            let canonical = self
                .remote
                .fetch(scope, &id)
                .await
                .map_err(|e| ReconcileError::transport("fetch", e))?;
            Some(canonical)
        } else {
            element
        };
        trail.push(Phase::Resolved);
        info!(%key, %id, ?path, "Resolved remote identifier");

        Ok(Resolution {
            id,
            path,
            trail: trail.clone(),
            observed,
        })
    }

    async fn list(
        &self,
        scope: &Scope,
        operation: &'static str,
    ) -> Result<Vec<Value>, ReconcileError> {
        let listing = self
            .remote
            .list(scope)
            .await
            .map_err(|e| ReconcileError::transport(operation, e))?;
        debug!(operation, count = listing.len(), "Listed remote collection");
        Ok(listing)
    }

    /// Locate by natural key and read the id of the match.
    ///
    /// A match that carries no id can be neither adopted nor told apart from
    /// a newly created object, so it fails the run before anything is
    /// written.
    fn find(
        &self,
        listing: &[Value],
        target: &Value,
    ) -> Result<Option<(String, Option<Value>)>, ReconcileError> {
        let comparison = self.options.key_comparison;
        let Some(found) = locate(listing, &self.descriptor.natural_key, target, |a, b| {
            comparison.matches(a, b)
        }) else {
            return Ok(None);
        };

        if found.duplicates > 0 && self.options.warn_on_duplicate_keys {
            warn!(
                key = %self.descriptor.describe_key(target),
                duplicates = found.duplicates,
                index = found.index,
                "Natural key matches more than one remote object, using the first"
            );
        }

        match found.id(&self.descriptor.id_field) {
            Some(id) => Ok(Some((id, Some(found.element.clone())))),
            None => Err(ReconcileError::Configuration(format!(
                "{} object with {} has no '{}' and cannot be adopted",
                self.descriptor.type_name,
                self.descriptor.describe_key(target),
                self.descriptor.id_field
            ))),
        }
    }
}
