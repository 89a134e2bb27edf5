//! Per-operation view of one database resource.

use std::time::Duration;

use redisent_client::Database;

use crate::error::{ResourceError, Result};
use crate::schema::{DatabaseState, Field};

/// Operation timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub create: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl Timeouts {
    pub const DEFAULT: Duration = Duration::from_secs(20 * 60);

    pub fn all(timeout: Duration) -> Self {
        Self {
            create: timeout,
            update: timeout,
            delete: timeout,
        }
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self::all(Self::DEFAULT)
    }
}

/// Identity, prior snapshot and desired state of a database, as handed
/// over by the planning engine for a single operation.
#[derive(Debug, Clone)]
pub struct ResourceData {
    id: Option<String>,
    prior: Option<DatabaseState>,
    desired: DatabaseState,
    timeouts: Timeouts,
}

impl ResourceData {
    /// A resource that does not exist yet.
    pub fn new(desired: DatabaseState) -> Self {
        Self {
            id: None,
            prior: None,
            desired,
            timeouts: Timeouts::default(),
        }
    }

    /// An existing resource whose stored state is `state`.
    pub fn existing(id: impl Into<String>, state: DatabaseState) -> Self {
        Self {
            id: Some(id.into()),
            prior: Some(state.clone()),
            desired: state,
            timeouts: Timeouts::default(),
        }
    }

    /// An existing resource moving from `prior` to `desired`.
    pub fn with_change(id: impl Into<String>, prior: DatabaseState, desired: DatabaseState) -> Self {
        Self {
            id: Some(id.into()),
            prior: Some(prior),
            desired,
            timeouts: Timeouts::default(),
        }
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn set_id(&mut self, id: Option<String>) {
        self.id = id;
    }

    /// The database uid parsed from the identity.
    pub fn uid(&self) -> Result<u32> {
        let id = self.id.as_deref().ok_or(ResourceError::MissingId)?;
        id.parse()
            .map_err(|_| ResourceError::InvalidId(id.to_string()))
    }

    pub fn prior(&self) -> Option<&DatabaseState> {
        self.prior.as_ref()
    }

    pub fn state(&self) -> &DatabaseState {
        &self.desired
    }

    pub fn timeouts(&self) -> &Timeouts {
        &self.timeouts
    }

    /// Whether `field` differs between prior and desired state. Everything
    /// counts as changed when there is no prior state.
    pub fn has_change(&self, field: Field) -> bool {
        match &self.prior {
            Some(prior) => prior.get(field) != self.desired.get(field),
            None => true,
        }
    }

    pub fn changed_fields(&self) -> Vec<Field> {
        Field::ALL
            .into_iter()
            .filter(|f| self.has_change(*f))
            .collect()
    }

    /// Overwrite every tracked field from the remote representation. The
    /// result becomes the new prior snapshot.
    pub fn sync_from_remote(&mut self, db: &Database) {
        let state = DatabaseState::from_remote(db);
        self.prior = Some(state.clone());
        self.desired = state;
    }
}
