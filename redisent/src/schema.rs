//! Field schema for the database resource.
//!
//! [`DatabaseState`] is the typed desired (or last known) state. The
//! diff engine works on the untyped [`FieldValue`] view so rules can be
//! registered per [`Field`] without knowing the struct layout.

use std::fmt;

use redisent_client::{Database, ShardPlacement};
use serde::{Deserialize, Serialize};

use crate::diff::ValidationError;

pub const MIN_SHARD_COUNT: i64 = 1;
pub const MAX_SHARD_COUNT: i64 = 512;

/// Tracked fields of the database resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Name,
    Type,
    Port,
    MemorySize,
    Replication,
    Sharding,
    ShardCount,
    ShardPlacement,
}

impl Field {
    pub const ALL: [Field; 8] = [
        Field::Name,
        Field::Type,
        Field::Port,
        Field::MemorySize,
        Field::Replication,
        Field::Sharding,
        Field::ShardCount,
        Field::ShardPlacement,
    ];

    /// Schema key of the field.
    pub fn key(&self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Type => "type",
            Field::Port => "port",
            Field::MemorySize => "memory_size",
            Field::Replication => "replication",
            Field::Sharding => "sharding",
            Field::ShardCount => "shard_count",
            Field::ShardPlacement => "shard_placement",
        }
    }

    pub fn schema(&self) -> &'static FieldSchema {
        // DATABASE_SCHEMA is declared in Field::ALL order
        &DATABASE_SCHEMA[*self as usize]
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Untyped field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Str(String),
    Int(i64),
    Bool(bool),
}

impl FieldValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            FieldValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Str(s) => write!(f, "{:?}", s),
            FieldValue::Int(v) => write!(f, "{}", v),
            FieldValue::Bool(v) => write!(f, "{}", v),
        }
    }
}

/// Static description of one field.
#[derive(Debug)]
pub struct FieldSchema {
    pub field: Field,
    pub required: bool,
    /// Any change to this field forces replacement.
    pub force_new: bool,
    /// Value-level check run on the desired state.
    pub validate: Option<fn(&FieldValue) -> Result<(), String>>,
}

fn validate_shard_count(value: &FieldValue) -> Result<(), String> {
    match value.as_int() {
        Some(v) if (MIN_SHARD_COUNT..=MAX_SHARD_COUNT).contains(&v) => Ok(()),
        Some(v) => Err(format!(
            "expected shard_count to be in the range ({} - {}), got {}",
            MIN_SHARD_COUNT, MAX_SHARD_COUNT, v
        )),
        None => Err("expected shard_count to be an integer".to_string()),
    }
}

pub static DATABASE_SCHEMA: [FieldSchema; 8] = [
    FieldSchema {
        field: Field::Name,
        required: true,
        force_new: false,
        validate: None,
    },
    FieldSchema {
        field: Field::Type,
        required: false,
        force_new: true,
        validate: None,
    },
    FieldSchema {
        field: Field::Port,
        required: false,
        force_new: false,
        validate: None,
    },
    FieldSchema {
        field: Field::MemorySize,
        required: true,
        force_new: false,
        validate: None,
    },
    FieldSchema {
        field: Field::Replication,
        required: false,
        force_new: false,
        validate: None,
    },
    FieldSchema {
        field: Field::Sharding,
        required: false,
        force_new: false,
        validate: None,
    },
    FieldSchema {
        field: Field::ShardCount,
        required: false,
        force_new: false,
        validate: Some(validate_shard_count),
    },
    FieldSchema {
        field: Field::ShardPlacement,
        required: false,
        force_new: false,
        validate: None,
    },
];

/// Declared configuration of one database.
///
/// Optional fields use their zero value when unset, which the create path
/// treats as "leave to the cluster default".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseState {
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
    #[serde(default = "default_shard_count")]
    pub shard_count: i32,
    #[serde(default)]
    pub shard_placement: ShardPlacement,
}

fn default_shard_count() -> i32 {
    1
}

impl Default for DatabaseState {
    fn default() -> Self {
        Self {
            name: String::new(),
            db_type: String::new(),
            port: 0,
            memory_size: 0,
            replication: false,
            sharding: false,
            shard_count: default_shard_count(),
            shard_placement: ShardPlacement::default(),
        }
    }
}

impl DatabaseState {
    pub fn get(&self, field: Field) -> FieldValue {
        match field {
            Field::Name => FieldValue::Str(self.name.clone()),
            Field::Type => FieldValue::Str(self.db_type.clone()),
            Field::Port => FieldValue::Int(self.port.into()),
            Field::MemorySize => FieldValue::Int(self.memory_size),
            Field::Replication => FieldValue::Bool(self.replication),
            Field::Sharding => FieldValue::Bool(self.sharding),
            Field::ShardCount => FieldValue::Int(self.shard_count.into()),
            Field::ShardPlacement => FieldValue::Str(self.shard_placement.to_string()),
        }
    }

    /// Build the state from the control plane's representation. Every
    /// tracked field is taken from `db`.
    pub fn from_remote(db: &Database) -> Self {
        Self {
            name: db.name.clone(),
            db_type: db.db_type.clone(),
            port: db.port,
            memory_size: db.memory_size,
            replication: db.replication,
            sharding: db.sharding,
            shard_count: db.shard_count,
            shard_placement: db.shard_placement,
        }
    }

    /// Check required fields and per-value constraints.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for schema in DATABASE_SCHEMA.iter() {
            let value = self.get(schema.field);
            if schema.required && is_zero(&value) {
                return Err(ValidationError::Required(schema.field));
            }
            if let Some(check) = schema.validate {
                check(&value).map_err(|reason| ValidationError::InvalidValue {
                    field: schema.field,
                    reason,
                })?;
            }
        }
        Ok(())
    }
}

fn is_zero(value: &FieldValue) -> bool {
    match value {
        FieldValue::Str(s) => s.is_empty(),
        FieldValue::Int(v) => *v == 0,
        FieldValue::Bool(v) => !v,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> DatabaseState {
        DatabaseState {
            name: "cache".to_string(),
            memory_size: 1 << 30,
            ..Default::default()
        }
    }

    #[test]
    fn test_schema_table_matches_field_order() {
        for field in Field::ALL {
            assert_eq!(field.schema().field, field);
        }
        assert!(Field::Type.schema().force_new);
        assert!(!Field::ShardCount.schema().force_new);
    }

    #[test]
    fn test_defaults() {
        let state = DatabaseState::default();
        assert!(!state.sharding);
        assert_eq!(state.shard_count, 1);
        assert_eq!(state.shard_placement, ShardPlacement::Dense);

        let decoded: DatabaseState =
            serde_json::from_str(r#"{"name": "cache", "memory_size": 100}"#).unwrap();
        assert_eq!(decoded.shard_count, 1);
    }

    #[test]
    fn test_validate_required() {
        let mut state = valid();
        state.name.clear();
        assert!(matches!(
            state.validate(),
            Err(ValidationError::Required(Field::Name))
        ));

        let mut state = valid();
        state.memory_size = 0;
        assert!(matches!(
            state.validate(),
            Err(ValidationError::Required(Field::MemorySize))
        ));
    }

    #[test]
    fn test_validate_shard_count_range() {
        assert!(valid().validate().is_ok());

        for bad in [0, 513, -4] {
            let mut state = valid();
            state.shard_count = bad;
            assert!(
                matches!(
                    state.validate(),
                    Err(ValidationError::InvalidValue {
                        field: Field::ShardCount,
                        ..
                    })
                ),
                "shard_count {} should be rejected",
                bad
            );
        }

        let mut state = valid();
        state.shard_count = 512;
        assert!(state.validate().is_ok());
    }

    #[test]
    fn test_from_remote_copies_every_field() {
        let db = Database {
            uid: 3,
            name: "orders".to_string(),
            db_type: "redis".to_string(),
            port: 12000,
            memory_size: 2048,
            replication: true,
            sharding: true,
            shard_count: 6,
            shard_placement: ShardPlacement::Sparse,
            ..Default::default()
        };
        let state = DatabaseState::from_remote(&db);
        assert_eq!(state.get(Field::Port), FieldValue::Int(12000));
        assert_eq!(state.get(Field::ShardCount), FieldValue::Int(6));
        assert_eq!(
            state.get(Field::ShardPlacement),
            FieldValue::Str("sparse".to_string())
        );
    }
}
