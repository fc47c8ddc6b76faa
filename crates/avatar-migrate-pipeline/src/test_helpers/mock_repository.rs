//! Mock repository implementation for testing
//!
//! Lets the pipeline run without a database connection.

use async_trait::async_trait;
use avatar_migrate_core::{AssetRecord, MigrationError, MigrationResult};
use avatar_migrate_db::AssetRepository;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};

/// Mock asset repository for testing without database
#[derive(Clone, Default)]
pub struct MockAssetRepository {
    rows: Arc<Mutex<BTreeMap<i64, String>>>,
    select_calls: Arc<Mutex<usize>>,
    update_calls: Arc<Mutex<Vec<(i64, String)>>>,
    /// Rows inserted right after the n-th select completes, to simulate concurrent writers.
    pending_inserts: Arc<Mutex<Vec<(usize, AssetRecord)>>>,
    failing_updates: Arc<Mutex<HashSet<i64>>>,
    failing_select: Arc<Mutex<Option<usize>>>,
}

impl MockAssetRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: &[(i64, &str)]) -> Self {
        let repo = Self::new();
        for (id, path) in rows {
            repo.insert(*id, path);
        }
        repo
    }

    pub fn insert(&self, id: i64, path: &str) {
        self.rows.lock().unwrap().insert(id, path.to_string());
    }

    /// Insert `record` once the `select_number`-th select (1-based) has returned.
    pub fn insert_after_select(&self, select_number: usize, record: AssetRecord) {
        self.pending_inserts
            .lock()
            .unwrap()
            .push((select_number, record));
    }

    pub fn fail_update_for(&self, id: i64) {
        self.failing_updates.lock().unwrap().insert(id);
    }

    /// Make the `select_number`-th select (1-based) fail with a query error.
    pub fn fail_select(&self, select_number: usize) {
        *self.failing_select.lock().unwrap() = Some(select_number);
    }

    pub fn path_of(&self, id: i64) -> Option<String> {
        self.rows.lock().unwrap().get(&id).cloned()
    }

    pub fn select_calls(&self) -> usize {
        *self.select_calls.lock().unwrap()
    }

    pub fn update_calls(&self) -> Vec<(i64, String)> {
        self.update_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AssetRepository for MockAssetRepository {
    async fn find_by_path_prefix(&self, prefix: &str) -> MigrationResult<Vec<AssetRecord>> {
        let call = {
            let mut calls = self.select_calls.lock().unwrap();
            *calls += 1;
            *calls
        };

        if *self.failing_select.lock().unwrap() == Some(call) {
            return Err(MigrationError::Query(sqlx::Error::Protocol(
                "injected query failure".to_string(),
            )));
        }

        let rows: Vec<AssetRecord> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, path)| path.starts_with(prefix))
            .map(|(id, path)| AssetRecord::new(*id, path.clone()))
            .collect();

        let due: Vec<AssetRecord> = {
            let mut pending = self.pending_inserts.lock().unwrap();
            let (due, rest): (Vec<_>, Vec<_>) = pending.drain(..).partition(|(n, _)| *n == call);
            *pending = rest;
            due.into_iter().map(|(_, record)| record).collect()
        };
        for record in due {
            self.insert(record.id, &record.path);
        }

        Ok(rows)
    }

    async fn find_by_id(&self, id: i64) -> MigrationResult<Option<AssetRecord>> {
        Ok(self.path_of(id).map(|path| AssetRecord::new(id, path)))
    }

    async fn update_path(&self, id: i64, path: &str) -> MigrationResult<()> {
        self.update_calls
            .lock()
            .unwrap()
            .push((id, path.to_string()));

        if self.failing_updates.lock().unwrap().contains(&id) {
            return Err(MigrationError::Update {
                id,
                source: sqlx::Error::Protocol("injected update failure".to_string()),
            });
        }

        let mut rows = self.rows.lock().unwrap();
        match rows.get_mut(&id) {
            Some(existing) => {
                *existing = path.to_string();
                Ok(())
            }
            None => Err(MigrationError::AssetNotFound(id)),
        }
    }
}
