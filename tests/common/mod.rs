#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use studio_cms_api::auth::{issue_token, Claims, JwtSessionResolver};
use studio_cms_api::config::AppConfig;
use studio_cms_api::database::{Collection, Database, DatabaseError, ListScope, MemoryCollection};
use studio_cms_api::resources::Resource;
use studio_cms_api::server;

pub const SECRET: &str = "integration-test-secret";
pub const PREFIX: &str = "/api/trpc";

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::development();
    config.server.trpc_prefix = PREFIX.to_string();
    config.rpc.max_batch_size = 10;
    config.rpc.expose_error_detail = false;
    config.security.jwt_secret = SECRET.to_string();
    config
}

/// A signed-in editor's bearer token
pub fn token() -> String {
    let mut claims = Claims::new("editor-1", 1);
    claims.name = Some("Editor".to_string());
    issue_token(&claims, SECRET).expect("token")
}

/// In-process application driven through `tower::ServiceExt::oneshot`
pub struct TestApp {
    pub app: Router,
    pub db: Database,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_db(Database::memory())
    }

    pub fn with_db(db: Database) -> Self {
        Self::with_config(test_config(), db)
    }

    pub fn with_config(config: AppConfig, db: Database) -> Self {
        let sessions = Arc::new(JwtSessionResolver::from_config(&config.security));
        let app = server::app(&config, db.clone(), sessions);
        Self { app, db }
    }

    pub async fn send(&self, request: Request<Body>) -> Result<(StatusCode, Value)> {
        let response = self.app.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok((status, body))
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(Body::empty())?).await
    }

    pub async fn post(&self, uri: &str, body: Value, token: Option<&str>) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(Body::from(body.to_string()))?).await
    }

    /// Single query; `input` is wrapped in the `{json}` envelope
    pub async fn query(&self, path: &str, input: Option<Value>, token: Option<&str>) -> Result<(StatusCode, Value)> {
        let uri = match input {
            Some(input) => format!("{}/{}?input={}", PREFIX, path, encode(&json!({ "json": input }))),
            None => format!("{}/{}", PREFIX, path),
        };
        self.get(&uri, token).await
    }

    /// Single mutation; `input` is wrapped in the `{json}` envelope
    pub async fn mutate(&self, path: &str, input: Value, token: Option<&str>) -> Result<(StatusCode, Value)> {
        self.post(&format!("{}/{}", PREFIX, path), json!({ "json": input }), token).await
    }

    /// Create through the API and return the created record's wire JSON
    pub async fn create(&self, resource: &str, input: Value) -> Result<Value> {
        let token = token();
        let (status, body) = self.mutate(&format!("{}.create", resource), input, Some(&token)).await?;
        anyhow::ensure!(status == StatusCode::OK, "create failed: {} {}", status, body);
        Ok(data(&body).clone())
    }
}

pub fn encode(value: &Value) -> String {
    url::form_urlencoded::byte_serialize(value.to_string().as_bytes()).collect()
}

/// `result.data.json` of a success item
pub fn data(item: &Value) -> &Value {
    &item["result"]["data"]["json"]
}

/// `error.json` of an error item
pub fn error(item: &Value) -> &Value {
    &item["error"]["json"]
}

/// Memory-backed collection that counts every storage call
pub struct CountingCollection<R: Resource> {
    inner: MemoryCollection<R>,
    calls: Arc<AtomicUsize>,
}

impl<R: Resource> CountingCollection<R> {
    pub fn tracked() -> (Arc<Self>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let collection = Arc::new(Self {
            inner: MemoryCollection::new(),
            calls: calls.clone(),
        });
        (collection, calls)
    }

    fn tick(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl<R: Resource> Collection<R> for CountingCollection<R> {
    async fn list(&self, scope: ListScope) -> Result<Vec<R::Record>, DatabaseError> {
        self.tick();
        self.inner.list(scope).await
    }

    async fn find(&self, id: Uuid) -> Result<Option<R::Record>, DatabaseError> {
        self.tick();
        self.inner.find(id).await
    }

    async fn insert(&self, record: R::Record) -> Result<R::Record, DatabaseError> {
        self.tick();
        self.inner.insert(record).await
    }

    async fn update(&self, id: Uuid, patch: R::Patch) -> Result<Option<R::Record>, DatabaseError> {
        self.tick();
        self.inner.update(id, patch).await
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DatabaseError> {
        self.tick();
        self.inner.delete(id).await
    }
}

/// Collection whose every call fails as if the pool were exhausted
pub struct FailingCollection;

#[async_trait]
impl<R: Resource> Collection<R> for FailingCollection {
    async fn list(&self, _scope: ListScope) -> Result<Vec<R::Record>, DatabaseError> {
        Err(DatabaseError::Sqlx(sqlx::Error::PoolTimedOut))
    }

    async fn find(&self, _id: Uuid) -> Result<Option<R::Record>, DatabaseError> {
        Err(DatabaseError::Sqlx(sqlx::Error::PoolTimedOut))
    }

    async fn insert(&self, _record: R::Record) -> Result<R::Record, DatabaseError> {
        Err(DatabaseError::Sqlx(sqlx::Error::PoolTimedOut))
    }

    async fn update(&self, _id: Uuid, _patch: R::Patch) -> Result<Option<R::Record>, DatabaseError> {
        Err(DatabaseError::Sqlx(sqlx::Error::PoolTimedOut))
    }

    async fn delete(&self, _id: Uuid) -> Result<bool, DatabaseError> {
        Err(DatabaseError::Sqlx(sqlx::Error::PoolTimedOut))
    }
}
