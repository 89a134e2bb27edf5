//! The databases API surface.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{CreateDatabaseRequest, Database, UpdateDatabaseRequest};

/// Operations on the databases endpoint of the management API.
///
/// Implemented by [`HttpClient`](crate::HttpClient); tests substitute an
/// in-memory control plane.
#[async_trait]
pub trait DatabasesApi: Send + Sync {
    /// Fetch a database by uid.
    async fn get_database(&self, uid: u32) -> Result<Database>;

    /// Request creation of a database. The returned database carries the
    /// assigned uid; it is usually still `pending`.
    async fn create_database(&self, req: &CreateDatabaseRequest) -> Result<Database>;

    /// Apply a partial update. Fields left unset in `req` are untouched.
    async fn update_database(&self, uid: u32, req: &UpdateDatabaseRequest) -> Result<Database>;

    /// Request deletion of a database.
    async fn delete_database(&self, uid: u32) -> Result<()>;
}
