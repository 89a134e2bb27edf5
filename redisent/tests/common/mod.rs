//! Shared test utilities: an in-memory control plane with scripted status
//! transitions.

#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use redisent::{ManualClock, Poller, ProviderMeta};
use redisent_client::{
    ClientError, CreateDatabaseRequest, Database, DatabaseStatus, DatabasesApi, ServiceErrorBody,
    UpdateDatabaseRequest,
};

pub const POLL_INTERVAL: Duration = Duration::from_secs(3);

/// What the next GET of a database observes.
#[derive(Debug, Clone)]
pub enum Step {
    Status(DatabaseStatus),
    Gone,
}

pub fn status(s: DatabaseStatus) -> Step {
    Step::Status(s)
}

pub fn not_found() -> ClientError {
    ClientError::Service {
        status: 404,
        body: ServiceErrorBody {
            error_code: "db_not_exist".to_string(),
            description: String::new(),
        },
    }
}

pub fn service_error(status: u16, code: &str, description: &str) -> ClientError {
    ClientError::Service {
        status,
        body: ServiceErrorBody {
            error_code: code.to_string(),
            description: description.to_string(),
        },
    }
}

struct FakeDb {
    db: Database,
    /// Consumed one per GET; the last step sticks.
    script: VecDeque<Step>,
}

type Drift = Box<dyn Fn(&mut Database) + Send>;

#[derive(Default)]
struct Inner {
    next_uid: u32,
    dbs: BTreeMap<u32, FakeDb>,
    create_script: Vec<Step>,
    update_script: Vec<Step>,
    delete_script: Vec<Step>,
    drift: Option<Drift>,
    fail_create: Option<ClientError>,
    fail_update: Option<ClientError>,
    fail_delete: Option<ClientError>,
    /// Fail the n-th GET from now (0 = next one).
    fail_get: Option<(usize, ClientError)>,
    gets: usize,
    creates: Vec<CreateDatabaseRequest>,
    updates: Vec<(u32, UpdateDatabaseRequest)>,
    deletes: Vec<u32>,
}

/// In-memory stand-in for the management API.
pub struct FakeControlPlane {
    inner: Mutex<Inner>,
}

impl FakeControlPlane {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(Inner {
                next_uid: 1,
                create_script: vec![
                    status(DatabaseStatus::Pending),
                    status(DatabaseStatus::Pending),
                    status(DatabaseStatus::Active),
                ],
                update_script: vec![
                    status(DatabaseStatus::ActiveChangePending),
                    status(DatabaseStatus::Active),
                ],
                delete_script: vec![status(DatabaseStatus::DeletePending), Step::Gone],
                ..Default::default()
            }),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap()
    }

    pub fn set_create_script(&self, steps: Vec<Step>) {
        self.lock().create_script = steps;
    }

    pub fn set_update_script(&self, steps: Vec<Step>) {
        self.lock().update_script = steps;
    }

    pub fn set_delete_script(&self, steps: Vec<Step>) {
        self.lock().delete_script = steps;
    }

    /// Mutate what the cluster persists on every create and update.
    pub fn set_drift(&self, drift: impl Fn(&mut Database) + Send + 'static) {
        self.lock().drift = Some(Box::new(drift));
    }

    pub fn fail_create(&self, err: ClientError) {
        self.lock().fail_create = Some(err);
    }

    pub fn fail_update(&self, err: ClientError) {
        self.lock().fail_update = Some(err);
    }

    pub fn fail_delete(&self, err: ClientError) {
        self.lock().fail_delete = Some(err);
    }

    pub fn fail_get_after(&self, successful_gets: usize, err: ClientError) {
        self.lock().fail_get = Some((successful_gets, err));
    }

    /// Seed an active database.
    pub fn insert(&self, db: Database) -> u32 {
        let mut inner = self.lock();
        let uid = db.uid;
        inner.next_uid = inner.next_uid.max(uid + 1);
        inner.dbs.insert(
            uid,
            FakeDb {
                db: Database {
                    status: DatabaseStatus::Active,
                    ..db
                },
                script: VecDeque::new(),
            },
        );
        uid
    }

    pub fn database(&self, uid: u32) -> Option<Database> {
        self.lock().dbs.get(&uid).map(|f| f.db.clone())
    }

    pub fn gets(&self) -> usize {
        self.lock().gets
    }

    pub fn creates(&self) -> Vec<CreateDatabaseRequest> {
        self.lock().creates.clone()
    }

    pub fn updates(&self) -> Vec<(u32, UpdateDatabaseRequest)> {
        self.lock().updates.clone()
    }

    pub fn deletes(&self) -> Vec<u32> {
        self.lock().deletes.clone()
    }
}

#[async_trait]
impl DatabasesApi for FakeControlPlane {
    async fn get_database(&self, uid: u32) -> redisent_client::Result<Database> {
        let mut guard = self.lock();
        let inner = &mut *guard;
        inner.gets += 1;

        let fail_now = match &mut inner.fail_get {
            Some((0, _)) => true,
            Some((remaining, _)) => {
                *remaining -= 1;
                false
            }
            None => false,
        };
        if fail_now {
            if let Some((_, err)) = inner.fail_get.take() {
                return Err(err);
            }
        }

        let Some(fake) = inner.dbs.get_mut(&uid) else {
            return Err(not_found());
        };

        let step = if fake.script.len() > 1 {
            fake.script.pop_front()
        } else {
            fake.script.front().cloned()
        };
        match step {
            Some(Step::Gone) => {
                inner.dbs.remove(&uid);
                Err(not_found())
            }
            Some(Step::Status(s)) => {
                fake.db.status = s;
                Ok(fake.db.clone())
            }
            None => Ok(fake.db.clone()),
        }
    }

    async fn create_database(&self, req: &CreateDatabaseRequest) -> redisent_client::Result<Database> {
        let mut guard = self.lock();
        let inner = &mut *guard;
        inner.creates.push(req.clone());
        if let Some(err) = inner.fail_create.take() {
            return Err(err);
        }

        let uid = inner.next_uid;
        inner.next_uid += 1;

        let mut db = Database {
            uid,
            name: req.name.clone(),
            db_type: req.db_type.clone().unwrap_or_else(|| "redis".to_string()),
            port: req.port.unwrap_or(12000),
            memory_size: req.memory_size.unwrap_or_default(),
            replication: req.replication.unwrap_or_default(),
            sharding: req.sharding.unwrap_or_default(),
            shard_count: req.shard_count.unwrap_or(1),
            shard_placement: req.shard_placement.unwrap_or_default(),
            status: DatabaseStatus::Pending,
        };
        if let Some(drift) = &inner.drift {
            drift(&mut db);
        }

        let script = inner.create_script.clone().into();
        inner.dbs.insert(
            uid,
            FakeDb {
                db: db.clone(),
                script,
            },
        );
        Ok(db)
    }

    async fn update_database(
        &self,
        uid: u32,
        req: &UpdateDatabaseRequest,
    ) -> redisent_client::Result<Database> {
        let mut guard = self.lock();
        let inner = &mut *guard;
        inner.updates.push((uid, req.clone()));
        if let Some(err) = inner.fail_update.take() {
            return Err(err);
        }

        let script: VecDeque<Step> = inner.update_script.clone().into();
        let Inner { dbs, drift, .. } = inner;
        let Some(fake) = dbs.get_mut(&uid) else {
            return Err(not_found());
        };

        let db = &mut fake.db;
        if let Some(v) = &req.name {
            db.name = v.clone();
        }
        if let Some(v) = req.port {
            db.port = v;
        }
        if let Some(v) = req.memory_size {
            db.memory_size = v;
        }
        if let Some(v) = req.replication {
            db.replication = v;
        }
        if let Some(v) = req.sharding {
            db.sharding = v;
        }
        if let Some(v) = req.shard_count {
            db.shard_count = v;
        }
        if let Some(v) = req.shard_placement {
            db.shard_placement = v;
        }
        if let Some(drift) = drift {
            drift(db);
        }
        db.status = DatabaseStatus::ActiveChangePending;
        fake.script = script;
        Ok(fake.db.clone())
    }

    async fn delete_database(&self, uid: u32) -> redisent_client::Result<()> {
        let mut guard = self.lock();
        let inner = &mut *guard;
        inner.deletes.push(uid);
        if let Some(err) = inner.fail_delete.take() {
            return Err(err);
        }

        let script: VecDeque<Step> = inner.delete_script.clone().into();
        let Some(fake) = inner.dbs.get_mut(&uid) else {
            return Err(not_found());
        };
        fake.db.status = DatabaseStatus::DeletePending;
        fake.script = script;
        Ok(())
    }
}

/// Provider backed by `fake` with a manual clock, so polling never sleeps.
pub fn provider(fake: &Arc<FakeControlPlane>) -> (ProviderMeta, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let meta = ProviderMeta::new(fake.clone(), Poller::new(clock.clone(), POLL_INTERVAL));
    (meta, clock)
}
