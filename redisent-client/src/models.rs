//! Wire models for the databases endpoint.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle status reported by the control plane.
///
/// Unrecognised values are kept verbatim in [`DatabaseStatus::Other`] so they
/// can be reported back to the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DatabaseStatus {
    #[default]
    Pending,
    Active,
    ActiveChangePending,
    DeletePending,
    ImportPending,
    CreationFailed,
    Recovery,
    Other(String),
}

impl DatabaseStatus {
    pub fn as_str(&self) -> &str {
        match self {
            DatabaseStatus::Pending => "pending",
            DatabaseStatus::Active => "active",
            DatabaseStatus::ActiveChangePending => "active-change-pending",
            DatabaseStatus::DeletePending => "delete-pending",
            DatabaseStatus::ImportPending => "import-pending",
            DatabaseStatus::CreationFailed => "creation-failed",
            DatabaseStatus::Recovery => "recovery",
            DatabaseStatus::Other(s) => s,
        }
    }
}

impl From<String> for DatabaseStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "pending" => DatabaseStatus::Pending,
            "active" => DatabaseStatus::Active,
            "active-change-pending" => DatabaseStatus::ActiveChangePending,
            "delete-pending" => DatabaseStatus::DeletePending,
            "import-pending" => DatabaseStatus::ImportPending,
            "creation-failed" => DatabaseStatus::CreationFailed,
            "recovery" => DatabaseStatus::Recovery,
            _ => DatabaseStatus::Other(s),
        }
    }
}

impl From<DatabaseStatus> for String {
    fn from(s: DatabaseStatus) -> Self {
        match s {
            DatabaseStatus::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for DatabaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shard placement policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShardPlacement {
    /// Shards co-located on as few nodes as possible.
    #[default]
    Dense,
    /// Shards spread across as many nodes as possible.
    Sparse,
}

impl ShardPlacement {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShardPlacement::Dense => "dense",
            ShardPlacement::Sparse => "sparse",
        }
    }
}

impl FromStr for ShardPlacement {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dense" => Ok(ShardPlacement::Dense),
            "sparse" => Ok(ShardPlacement::Sparse),
            _ => Err("shard placement policy should be one of 'dense' or 'sparse'".to_string()),
        }
    }
}

impl fmt::Display for ShardPlacement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A database as returned by the management API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Database {
    pub uid: u32,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub db_type: String,
    #[serde(default)]
    pub port: i32,
    #[serde(default)]
    pub memory_size: i64,
    #[serde(default)]
    pub replication: bool,
    #[serde(default)]
    pub sharding: bool,
    #[serde(rename = "shards_count", default)]
    pub shard_count: i32,
    #[serde(rename = "shards_placement", default)]
    pub shard_placement: ShardPlacement,
    #[serde(default)]
    pub status: DatabaseStatus,
}

/// Body of a create request. Unset optional fields are left to the
/// cluster's defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateDatabaseRequest {
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub db_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replication: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sharding: Option<bool>,
    #[serde(rename = "shards_count", skip_serializing_if = "Option::is_none")]
    pub shard_count: Option<i32>,
    #[serde(rename = "shards_placement", skip_serializing_if = "Option::is_none")]
    pub shard_placement: Option<ShardPlacement>,
}

/// Body of a partial update. Only fields that are `Some` are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateDatabaseRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replication: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sharding: Option<bool>,
    #[serde(rename = "shards_count", skip_serializing_if = "Option::is_none")]
    pub shard_count: Option<i32>,
    #[serde(rename = "shards_placement", skip_serializing_if = "Option::is_none")]
    pub shard_placement: Option<ShardPlacement>,
}

impl UpdateDatabaseRequest {
    /// True when no field would be sent.
    pub fn is_empty(&self) -> bool {
        *self == UpdateDatabaseRequest::default()
    }
}
