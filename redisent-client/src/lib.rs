//! Client for the cluster management REST API.
//!
//! Only the databases (`/v1/bdbs`) endpoint is covered. Every response is
//! decoded exactly once into either a model or a [`ClientError`], so callers
//! match on an explicit error tag instead of inspecting raw responses.

pub mod api;
pub mod error;
pub mod http;
pub mod models;

pub use api::DatabasesApi;
pub use error::{ClientError, Result, ServiceErrorBody};
pub use http::{Configuration, HttpClient};
pub use models::{
    CreateDatabaseRequest, Database, DatabaseStatus, ShardPlacement, UpdateDatabaseRequest,
};
