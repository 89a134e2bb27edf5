//! Resource reconcilers.
//!
//! A reconciler drives one kind of remote resource through its lifecycle.
//! Operations receive the provider handle explicitly and never keep state
//! between calls; the caller serializes operations on a single resource.

pub mod database;

use async_trait::async_trait;

use crate::diff::{PlanDiff, ValidationError};
use crate::error::Result;
use crate::provider::ProviderMeta;
use crate::resource_data::ResourceData;

pub use database::DatabaseResource;

/// Lifecycle operations of a managed resource.
#[async_trait]
pub trait Resource: Send + Sync {
    /// Check whether the resource identified by `d` still exists remotely.
    async fn exists(&self, meta: &ProviderMeta, d: &ResourceData) -> Result<bool>;

    /// Create the resource, wait for it to become ready and read it back.
    async fn create(&self, meta: &ProviderMeta, d: &mut ResourceData) -> Result<()>;

    /// Overwrite the state in `d` with the remote representation.
    async fn read(&self, meta: &ProviderMeta, d: &mut ResourceData) -> Result<()>;

    /// Apply the changed fields, wait for convergence and read back.
    async fn update(&self, meta: &ProviderMeta, d: &mut ResourceData) -> Result<()>;

    /// Delete the resource and wait until it is gone.
    async fn delete(&self, meta: &ProviderMeta, d: &mut ResourceData) -> Result<()>;

    /// Plan-time check of the transition described by `d`.
    fn customize_diff(&self, d: &ResourceData) -> std::result::Result<PlanDiff, ValidationError>;
}
