//! CMS resources and the procedure set every resource exposes.
//!
//! | procedure      | kind     | access    | input                 |
//! |----------------|----------|-----------|-----------------------|
//! | `getPublished` | query    | public    | none                  |
//! | `getAll`       | query    | protected | none                  |
//! | `getById`      | query    | protected | `{ id }`              |
//! | `create`       | mutation | protected | resource schema       |
//! | `update`       | mutation | protected | `{ id, data: patch }` |
//! | `delete`       | mutation | protected | `{ id }`              |

pub mod investor;
pub mod techstack;
pub mod testimonial;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::FromRow;
use std::sync::Arc;
use uuid::Uuid;

use crate::context::Context;
use crate::database::{Collection, Column, Database, ListScope};
use crate::error::{FieldErrors, RpcError};
use crate::rpc::procedure::{protected_procedure, public_procedure};
use crate::rpc::schema::{NoInput, Schema};
use crate::rpc::transformer::Rich;
use crate::rpc::RpcRouter;

/// Fields every listed record carries
pub trait Entry {
    fn id(&self) -> Uuid;
    fn published(&self) -> bool;
    fn order(&self) -> i32;
    fn created_at(&self) -> DateTime<Utc>;
}

/// A persisted CMS collection
pub trait Resource: Sized + Send + Sync + 'static {
    /// Display name used in client messages
    const NAME: &'static str;
    const TABLE: &'static str;

    type Record: Entry
        + Clone
        + Serialize
        + Rich
        + Send
        + Sync
        + Unpin
        + for<'r> FromRow<'r, PgRow>
        + 'static;
    type Create: Schema;
    type Patch: Schema;

    /// Assemble a new record from validated input
    fn build(id: Uuid, created_at: DateTime<Utc>, input: Self::Create) -> Self::Record;

    /// Apply the fields present in `patch`
    fn apply(record: &mut Self::Record, patch: Self::Patch);

    /// Every column of `record`, in insert order
    fn columns(record: &Self::Record) -> Vec<(&'static str, Column)>;

    /// Only the columns `patch` sets
    fn patch_columns(patch: &Self::Patch) -> Vec<(&'static str, Column)>;

    fn collection(db: &Database) -> &Arc<dyn Collection<Self>>;

    fn collection_mut(db: &mut Database) -> &mut Arc<dyn Collection<Self>>;
}

#[derive(Debug, Clone, Deserialize)]
pub struct ById {
    pub id: Uuid,
}

impl Schema for ById {}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateInput<P> {
    pub id: Uuid,
    pub data: P,
}

impl<P: Schema> Schema for UpdateInput<P> {
    fn normalize(self) -> Self {
        Self {
            id: self.id,
            data: self.data.normalize(),
        }
    }

    fn validate(&self, errors: &mut FieldErrors) {
        let mut data_errors = FieldErrors::new();
        self.data.validate(&mut data_errors);
        for (field, message) in data_errors {
            errors.insert(format!("data.{}", field), message);
        }
    }
}

/// Acknowledgement returned by `delete`
#[derive(Debug, Clone, Serialize)]
pub struct Ack {
    pub success: bool,
}

impl Rich for Ack {}

fn not_found<R: Resource>(id: Uuid) -> RpcError {
    RpcError::not_found(format!("{} {} not found", R::NAME, id))
}

/// Public listing. Storage failures degrade to an empty list so public pages
/// keep rendering.
pub async fn get_published<R: Resource>(ctx: Arc<Context>) -> Vec<R::Record> {
    match ctx.db.collection::<R>().list(ListScope::Published).await {
        Ok(records) => records,
        Err(e) => {
            tracing::warn!("Serving empty {} listing after storage failure: {}", R::NAME, e);
            Vec::new()
        }
    }
}

pub async fn get_all<R: Resource>(ctx: Arc<Context>) -> Result<Vec<R::Record>, RpcError> {
    Ok(ctx.db.collection::<R>().list(ListScope::All).await?)
}

pub async fn get_by_id<R: Resource>(ctx: Arc<Context>, id: Uuid) -> Result<R::Record, RpcError> {
    ctx.db
        .collection::<R>()
        .find(id)
        .await?
        .ok_or_else(|| not_found::<R>(id))
}

pub async fn create<R: Resource>(ctx: Arc<Context>, input: R::Create) -> Result<R::Record, RpcError> {
    let record = R::build(Uuid::new_v4(), Utc::now(), input);
    let created = ctx.db.collection::<R>().insert(record).await?;
    tracing::info!("Created {} {}", R::NAME, created.id());
    Ok(created)
}

pub async fn update<R: Resource>(ctx: Arc<Context>, input: UpdateInput<R::Patch>) -> Result<R::Record, RpcError> {
    let collection = ctx.db.collection::<R>();
    if collection.find(input.id).await?.is_none() {
        return Err(not_found::<R>(input.id));
    }

    // The record can disappear between the check and the write
    let updated = collection
        .update(input.id, input.data)
        .await?
        .ok_or_else(|| not_found::<R>(input.id))?;
    tracing::info!("Updated {} {}", R::NAME, input.id);
    Ok(updated)
}

/// Deleting an id that does not exist succeeds; delete is idempotent.
pub async fn delete<R: Resource>(ctx: Arc<Context>, id: Uuid) -> Result<Ack, RpcError> {
    let removed = ctx.db.collection::<R>().delete(id).await?;
    if removed {
        tracing::info!("Deleted {} {}", R::NAME, id);
    } else {
        tracing::debug!("Delete of absent {} {} ignored", R::NAME, id);
    }
    Ok(Ack { success: true })
}

/// The six-procedure router for `R`
pub fn crud_router<R: Resource>() -> RpcRouter {
    RpcRouter::new()
        .procedure(
            "getPublished",
            public_procedure().query(|ctx, _: NoInput| async move { Ok(get_published::<R>(ctx).await) }),
        )
        .procedure(
            "getAll",
            protected_procedure().query(|ctx, _: NoInput| get_all::<R>(ctx)),
        )
        .procedure(
            "getById",
            protected_procedure().query(|ctx, input: ById| get_by_id::<R>(ctx, input.id)),
        )
        .procedure(
            "create",
            protected_procedure().mutation(|ctx, input: R::Create| create::<R>(ctx, input)),
        )
        .procedure(
            "update",
            protected_procedure().mutation(|ctx, input: UpdateInput<R::Patch>| update::<R>(ctx, input)),
        )
        .procedure(
            "delete",
            protected_procedure().mutation(|ctx, input: ById| delete::<R>(ctx, input.id)),
        )
}
