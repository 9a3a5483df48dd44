use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::collection::{sort_for_display, Collection, ListScope};
use super::manager::DatabaseError;
use crate::resources::{Entry, Resource};

/// Process-local collection for development without Postgres and for tests
pub struct MemoryCollection<R: Resource> {
    rows: RwLock<Vec<R::Record>>,
}

impl<R: Resource> MemoryCollection<R> {
    pub fn new() -> Self {
        Self::with_records(Vec::new())
    }

    pub fn with_records(records: Vec<R::Record>) -> Self {
        Self {
            rows: RwLock::new(records),
        }
    }
}

impl<R: Resource> Default for MemoryCollection<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<R: Resource> Collection<R> for MemoryCollection<R> {
    async fn list(&self, scope: ListScope) -> Result<Vec<R::Record>, DatabaseError> {
        let rows = self.rows.read().await;
        let mut out: Vec<R::Record> = rows
            .iter()
            .filter(|r| scope == ListScope::All || r.published())
            .cloned()
            .collect();
        sort_for_display(&mut out);
        Ok(out)
    }

    async fn find(&self, id: Uuid) -> Result<Option<R::Record>, DatabaseError> {
        let rows = self.rows.read().await;
        Ok(rows.iter().find(|r| r.id() == id).cloned())
    }

    async fn insert(&self, record: R::Record) -> Result<R::Record, DatabaseError> {
        let mut rows = self.rows.write().await;
        rows.push(record.clone());
        Ok(record)
    }

    async fn update(&self, id: Uuid, patch: R::Patch) -> Result<Option<R::Record>, DatabaseError> {
        let mut rows = self.rows.write().await;
        let Some(record) = rows.iter_mut().find(|r| r.id() == id) else {
            return Ok(None);
        };
        R::apply(record, patch);
        Ok(Some(record.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|r| r.id() != id);
        Ok(rows.len() != before)
    }
}
