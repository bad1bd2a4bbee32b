use async_trait::async_trait;
use slurprs::domain::models::checkin::{BatchSource, Checkin};
use slurprs::domain::models::job::MaintenanceKind;
use slurprs::domain::services::content_store::{ContentStore, StoreError, StoreOutcome};
use std::collections::HashSet;
use std::sync::Mutex;

/// In-memory content store for integration tests
pub struct MockContentStore {
    existing: Mutex<HashSet<i64>>,
    inserted: Mutex<Vec<(i64, BatchSource)>>,
    companions: Mutex<Vec<(i64, i64)>>,
    maintenance: Mutex<Vec<MaintenanceKind>>,
}

impl MockContentStore {
    pub fn new() -> Self {
        Self {
            existing: Mutex::new(HashSet::new()),
            inserted: Mutex::new(Vec::new()),
            companions: Mutex::new(Vec::new()),
            maintenance: Mutex::new(Vec::new()),
        }
    }

    /// Pre-populate the store with already imported checkin ids
    pub fn with_existing(ids: &[i64]) -> Self {
        let store = Self::new();
        store.existing.lock().unwrap().extend(ids.iter().copied());
        store
    }

    pub fn inserted(&self) -> Vec<(i64, BatchSource)> {
        self.inserted.lock().unwrap().clone()
    }

    pub fn companions_attached(&self) -> Vec<(i64, i64)> {
        self.companions.lock().unwrap().clone()
    }

    pub fn maintenance_runs(&self) -> Vec<MaintenanceKind> {
        self.maintenance.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContentStore for MockContentStore {
    async fn checkin_exists(&self, checkin_id: i64) -> Result<bool, StoreError> {
        Ok(self.existing.lock().unwrap().contains(&checkin_id))
    }

    async fn insert_or_update(
        &self,
        checkin: &Checkin,
        source: BatchSource,
    ) -> Result<StoreOutcome, StoreError> {
        let mut existing = self.existing.lock().unwrap();
        if existing.contains(&checkin.checkin_id) {
            return Ok(StoreOutcome::Duplicate);
        }
        existing.insert(checkin.checkin_id);
        self.inserted
            .lock()
            .unwrap()
            .push((checkin.checkin_id, source));
        Ok(StoreOutcome::Created(checkin.checkin_id))
    }

    async fn attach_companions(
        &self,
        checkin_id: i64,
        post_id: i64,
        _detail: &serde_json::Value,
    ) -> Result<(), StoreError> {
        self.companions.lock().unwrap().push((checkin_id, post_id));
        Ok(())
    }

    async fn latest_checkin_id(&self) -> Result<Option<i64>, StoreError> {
        Ok(self.existing.lock().unwrap().iter().max().copied())
    }

    async fn run_maintenance(&self, task: MaintenanceKind) -> Result<(), StoreError> {
        self.maintenance.lock().unwrap().push(task);
        Ok(())
    }
}
