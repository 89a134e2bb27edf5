//! Database reconciler - drives database lifecycle on the management API.

use async_trait::async_trait;
use redisent_client::{CreateDatabaseRequest, Database, DatabasesApi, UpdateDatabaseRequest};
use tracing::{debug, info, warn};

use super::Resource;
use crate::convergence::PendingOperation;
use crate::diff::{self, MutationDecision, PlanDiff, RuleTable, ValidationError};
use crate::error::{ResourceError, Result};
use crate::provider::ProviderMeta;
use crate::resource_data::ResourceData;
use crate::schema::{DatabaseState, Field};

/// Reconciler for databases.
#[derive(Debug, Clone)]
pub struct DatabaseResource {
    rules: RuleTable,
}

impl DatabaseResource {
    pub fn new(rules: RuleTable) -> Self {
        Self { rules }
    }

    /// Delete the database in `d` and create its desired state anew.
    ///
    /// Returns the replacement; `d` loses its id once the deletion has
    /// converged.
    pub async fn replace(&self, meta: &ProviderMeta, d: &mut ResourceData) -> Result<ResourceData> {
        let old = d.uid()?;
        d.state().validate()?;
        let desired = d.state().clone();
        let timeouts = *d.timeouts();

        self.delete(meta, d).await?;

        let mut replacement = ResourceData::new(desired).with_timeouts(timeouts);
        self.create(meta, &mut replacement)
            .await
            .map_err(|e| e.context(format!("error recreating database {}", old)))?;
        info!(
            "Database {} replaced by {}",
            old,
            replacement.id().unwrap_or_default()
        );
        Ok(replacement)
    }
}

impl Default for DatabaseResource {
    fn default() -> Self {
        Self::new(RuleTable::sharding())
    }
}

/// Fetch a database for the poller. Not found maps to `None`.
async fn refresh(api: &dyn DatabasesApi, uid: u32) -> Result<Option<Database>> {
    match api.get_database(uid).await {
        Ok(db) => Ok(Some(db)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(ResourceError::api(
            "error getting database during status refresh",
            &e,
        )),
    }
}

/// Create body: optional fields are only sent when set.
fn create_request(state: &DatabaseState) -> CreateDatabaseRequest {
    CreateDatabaseRequest {
        name: state.name.clone(),
        db_type: Some(state.db_type.clone()).filter(|t| !t.is_empty()),
        port: Some(state.port).filter(|p| *p != 0),
        memory_size: Some(state.memory_size).filter(|m| *m != 0),
        replication: Some(state.replication).filter(|r| *r),
        sharding: Some(state.sharding).filter(|s| *s),
        shard_count: Some(state.shard_count).filter(|c| *c != 0),
        shard_placement: Some(state.shard_placement),
    }
}

/// Update body: only fields that differ from the prior state.
fn update_request(d: &ResourceData) -> UpdateDatabaseRequest {
    let state = d.state();
    let mut req = UpdateDatabaseRequest::default();

    if d.has_change(Field::Name) {
        req.name = Some(state.name.clone());
    }
    if d.has_change(Field::Port) {
        req.port = Some(state.port);
    }
    if d.has_change(Field::MemorySize) {
        req.memory_size = Some(state.memory_size);
    }
    if d.has_change(Field::Replication) {
        req.replication = Some(state.replication);
    }
    if d.has_change(Field::Sharding) {
        req.sharding = Some(state.sharding);
    }
    if d.has_change(Field::ShardCount) {
        req.shard_count = Some(state.shard_count);
    }
    if d.has_change(Field::ShardPlacement) {
        req.shard_placement = Some(state.shard_placement);
    }

    req
}

fn payload<T: serde::Serialize>(req: &T) -> String {
    serde_json::to_string(req).unwrap_or_else(|e| format!("<unserializable: {}>", e))
}

#[async_trait]
impl Resource for DatabaseResource {
    async fn exists(&self, meta: &ProviderMeta, d: &ResourceData) -> Result<bool> {
        let uid = d.uid()?;
        debug!("checking for existence of database {}", uid);

        match meta.api().get_database(uid).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(ResourceError::api(
                format!("error checking database {}", uid),
                &e,
            )),
        }
    }

    async fn create(&self, meta: &ProviderMeta, d: &mut ResourceData) -> Result<()> {
        d.state().validate()?;
        let req = create_request(d.state());
        debug!("creating database with payload: {}", payload(&req));

        let db = meta
            .api()
            .create_database(&req)
            .await
            .map_err(|e| ResourceError::api("error creating database", &e))?;

        info!("Created database {} ({})", db.uid, db.name);
        d.set_id(Some(db.uid.to_string()));

        let uid = db.uid;
        let api = meta.api();
        let op = PendingOperation::create(uid, d.timeouts().create);
        meta.poller()
            .await_status(&op, move || refresh(api, uid))
            .await
            .map_err(|e| e.context("error waiting for database creation"))?;

        self.read(meta, d).await
    }

    async fn read(&self, meta: &ProviderMeta, d: &mut ResourceData) -> Result<()> {
        let uid = d.uid()?;

        let db = meta
            .api()
            .get_database(uid)
            .await
            .map_err(|e| ResourceError::api(format!("error getting database {}", uid), &e))?;

        debug!("read database {}: {:?}", uid, db);
        d.sync_from_remote(&db);
        Ok(())
    }

    async fn update(&self, meta: &ProviderMeta, d: &mut ResourceData) -> Result<()> {
        let uid = d.uid()?;
        let diff = self.customize_diff(d)?;
        if let Some(change) = diff
            .changes
            .iter()
            .find(|c| c.decision == MutationDecision::ForceReplace)
        {
            return Err(ResourceError::RequiresReplacement {
                uid,
                field: change.field,
            });
        }

        let req = update_request(d);
        if req.is_empty() {
            debug!("database {} has no changes to apply", uid);
            return self.read(meta, d).await;
        }
        debug!("updating database {} with payload: {}", uid, payload(&req));

        meta.api()
            .update_database(uid, &req)
            .await
            .map_err(|e| ResourceError::api(format!("error updating database {}", uid), &e))?;

        let api = meta.api();
        let op = PendingOperation::update(uid, d.timeouts().update);
        meta.poller()
            .await_status(&op, move || refresh(api, uid))
            .await
            .map_err(|e| e.context(format!("error waiting for database {} update", uid)))?;

        info!("Updated database {}", uid);
        self.read(meta, d).await
    }

    async fn delete(&self, meta: &ProviderMeta, d: &mut ResourceData) -> Result<()> {
        let uid = d.uid()?;
        let api = meta.api();

        match api.delete_database(uid).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                info!("Database {} already deleted", uid);
                d.set_id(None);
                return Ok(());
            }
            Err(e) => {
                return Err(ResourceError::api(
                    format!("error deleting database {}", uid),
                    &e,
                ));
            }
        }

        let op = PendingOperation::delete(uid, d.timeouts().delete);
        match meta
            .poller()
            .await_status(&op, move || refresh(api, uid))
            .await
        {
            Ok(_) => {}
            Err(e) if e.is_timeout() => {
                // The deadline may have raced the final removal
                warn!("Timed out waiting for database {} deletion, re-checking", uid);
                if !matches!(refresh(api, uid).await, Ok(None)) {
                    return Err(e.context("error waiting for database deletion"));
                }
            }
            Err(e) => return Err(e.context("error waiting for database deletion")),
        }

        info!("Deleted database {}", uid);
        d.set_id(None);
        Ok(())
    }

    fn customize_diff(&self, d: &ResourceData) -> std::result::Result<PlanDiff, ValidationError> {
        diff::plan(d.prior(), d.state(), &self.rules)
    }
}
