pub mod collection;
pub mod manager;
pub mod memory;
pub mod postgres;

pub use collection::{Collection, ListScope};
pub use manager::{DatabaseError, DatabaseManager};
pub use memory::MemoryCollection;
pub use postgres::{Column, PgCollection};

use sqlx::PgPool;
use std::sync::Arc;

use crate::resources::investor::Investor;
use crate::resources::techstack::TechstackEntry;
use crate::resources::testimonial::Testimonial;
use crate::resources::Resource;

/// Data-access handle shared by every request. Cloning is cheap.
#[derive(Clone)]
pub struct Database {
    pub(crate) investors: Arc<dyn Collection<Investor>>,
    pub(crate) testimonials: Arc<dyn Collection<Testimonial>>,
    pub(crate) techstack: Arc<dyn Collection<TechstackEntry>>,
    pool: Option<PgPool>,
}

impl Database {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            investors: Arc::new(PgCollection::<Investor>::new(pool.clone())),
            testimonials: Arc::new(PgCollection::<Testimonial>::new(pool.clone())),
            techstack: Arc::new(PgCollection::<TechstackEntry>::new(pool.clone())),
            pool: Some(pool),
        }
    }

    pub fn memory() -> Self {
        Self {
            investors: Arc::new(MemoryCollection::<Investor>::new()),
            testimonials: Arc::new(MemoryCollection::<Testimonial>::new()),
            techstack: Arc::new(MemoryCollection::<TechstackEntry>::new()),
            pool: None,
        }
    }

    pub fn collection<R: Resource>(&self) -> &Arc<dyn Collection<R>> {
        R::collection(self)
    }

    /// Swap the backing collection of one resource
    pub fn with_collection<R: Resource>(mut self, collection: Arc<dyn Collection<R>>) -> Self {
        *R::collection_mut(&mut self) = collection;
        self
    }

    pub fn backend_name(&self) -> &'static str {
        if self.pool.is_some() {
            "postgres"
        } else {
            "memory"
        }
    }

    pub async fn health_check(&self) -> Result<(), DatabaseError> {
        match &self.pool {
            Some(pool) => DatabaseManager::health_check(pool).await,
            None => Ok(()),
        }
    }
}
