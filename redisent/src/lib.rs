//! Lifecycle reconciler for clustered, shardable databases.
//!
//! The planning engine hands each operation a [`ResourceData`] and a
//! [`ProviderMeta`]. Plans are checked by [`diff::plan`] before any call is
//! made; mutating operations wait for the control plane to converge through
//! the [`Poller`] and then read the database back.

pub mod convergence;
pub mod diff;
pub mod error;
pub mod provider;
pub mod reconciler;
pub mod resource_data;
pub mod schema;

pub use convergence::{Clock, ManualClock, PendingOperation, Poller, TokioClock};
pub use diff::{MutationDecision, PlanDiff, RuleTable, ValidationError};
pub use error::{ResourceError, Result, normalize};
pub use provider::{ProviderConfig, ProviderMeta};
pub use reconciler::{DatabaseResource, Resource};
pub use resource_data::{ResourceData, Timeouts};
pub use schema::{DatabaseState, Field, FieldValue};
