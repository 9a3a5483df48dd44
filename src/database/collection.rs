use async_trait::async_trait;
use uuid::Uuid;

use super::manager::DatabaseError;
use crate::resources::{Entry, Resource};

/// Which records a listing returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListScope {
    All,
    Published,
}

/// CRUD access to one resource's records
#[async_trait]
pub trait Collection<R: Resource>: Send + Sync {
    /// Records in display order: `order` ascending, newest first within an order
    async fn list(&self, scope: ListScope) -> Result<Vec<R::Record>, DatabaseError>;

    async fn find(&self, id: Uuid) -> Result<Option<R::Record>, DatabaseError>;

    async fn insert(&self, record: R::Record) -> Result<R::Record, DatabaseError>;

    /// Writes only the fields present in `patch`. `None` when no record has `id`.
    async fn update(&self, id: Uuid, patch: R::Patch) -> Result<Option<R::Record>, DatabaseError>;

    /// Whether a record was removed
    async fn delete(&self, id: Uuid) -> Result<bool, DatabaseError>;
}

/// Sort records into display order
pub fn sort_for_display<E: Entry>(records: &mut [E]) {
    records.sort_by(|a, b| {
        a.order()
            .cmp(&b.order())
            .then_with(|| b.created_at().cmp(&a.created_at()))
    });
}
