//! Hemmer Reconcile
//!
//! The state-reconciliation engine shared by Hemmer provider resources. The
//! code that maps a resource's schema onto vendor SDK calls is mechanical;
//! this crate holds the part that is not:
//!
//! - **Read-variant selection** ([`selector`]): pick one of several
//!   overlapping remote reads from the identifying parameters supplied.
//! - **Natural-key lookup** ([`locator`]): find a remote object by a field
//!   such as `name` when its server-assigned id is not yet known.
//! - **Adopt-or-create** ([`orchestrator`]): list, locate, update or create,
//!   locate again, fetch; so resources whose create call is not an upsert
//!   still converge without duplicates.
//! - **State merging** ([`merge`]): fold an observed remote object into prior
//!   state without clobbering what the response did not echo back.
//!
//! [`Reconciler`] wires them onto a resource's create/read/update/delete
//! lifecycle.
//!
//! # Quick Start
//!
//! ```ignore
//! use hemmer_reconcile::{
//!     Reconciler, RemoteCollection, RemoteError, ResourceDescriptor,
//!     remote::Scope,
//!     schema::{Attribute, Schema},
//! };
//! use serde_json::{json, Value};
//!
//! struct RetentionProfiles { /* vendor client */ }
//!
//! #[async_trait::async_trait]
//! impl RemoteCollection for RetentionProfiles {
//!     async fn list(&self, scope: &Scope) -> Result<Vec<Value>, RemoteError> { todo!() }
//!     async fn fetch(&self, scope: &Scope, id: &str) -> Result<Value, RemoteError> { todo!() }
//!     async fn create(&self, scope: &Scope, body: &Value)
//!         -> Result<Option<Value>, RemoteError> { todo!() }
//!     async fn update(&self, scope: &Scope, id: &str, body: &Value)
//!         -> Result<Option<Value>, RemoteError> { todo!() }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     hemmer_reconcile::init_logging();
//!
//!     let descriptor = ResourceDescriptor::new(
//!         "retention_profile",
//!         Schema::v0()
//!             .with_attribute("network_id", Attribute::path_string())
//!             .with_attribute("id", Attribute::computed_id())
//!             .with_attribute("name", Attribute::required_string())
//!             .with_attribute("max_retention_days", Attribute::optional_int64()),
//!     );
//!     let reconciler = Reconciler::new(descriptor, RetentionProfiles {});
//!
//!     let applied = reconciler
//!         .create(&json!({"network_id": "N1", "name": "Profile-A", "max_retention_days": 30}))
//!         .await?;
//!     println!("{}", applied.state());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod locator;
pub mod logging;
pub mod merge;
pub mod options;
pub mod orchestrator;
pub mod reconciler;
pub mod remote;
pub mod resource;
pub mod schema;
pub mod selector;
pub mod testing;
pub mod types;
pub mod validation;

// Re-export main types at crate root
pub use error::{ReconcileError, RemoteError};
pub use locator::{locate, locate_exact, Located};
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use merge::{merge, merge_typed, Merger};
pub use options::{KeyComparison, ReconcileOptions};
pub use orchestrator::AdoptOrCreate;
pub use reconciler::Reconciler;
pub use remote::RemoteCollection;
pub use resource::ResourceDescriptor;
pub use selector::{select, select_variant, ReadKind, ReadVariant};
pub use types::{
    Applied, AttributeChange, MergeMode, MergeOutcome, Phase, Resolution, ResolutionPath,
};
pub use validation::{validate, validate_result};

// Re-export async_trait for convenience
pub use async_trait::async_trait;

// Re-export commonly used external types
pub use serde_json;
pub use tracing;
