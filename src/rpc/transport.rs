//! HTTP binding for the procedure router.
//!
//! ```text
//! GET  /api/trpc/investor.getPublished
//! GET  /api/trpc/investor.getPublished,investor.getAll?batch=1&input={"1":{"json":null}}
//! POST /api/trpc/investor.create            body: {"json":{"logo":"https://..."}}
//! POST /api/trpc/investor.create,investor.delete?batch=1
//!                                           body: {"0":{"json":{...}},"1":{"json":{"id":"..."}}}
//! ```
//!
//! Each call in a batch succeeds or fails on its own; the response is an array
//! in request order.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use futures::future::join_all;
use futures::FutureExt;
use serde::Deserialize;
use serde_json::{json, Value};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use super::gate;
use super::procedure::ProcedureKind;
use super::router::RpcRouter;
use super::transformer::{self, Encoded};
use crate::context::{Context, ContextBuilder};
use crate::error::{ErrorCode, RpcError};

#[derive(Debug, Clone, Copy)]
pub struct TransportOptions {
    pub max_batch_size: usize,
    pub expose_error_detail: bool,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            max_batch_size: 50,
            expose_error_detail: false,
        }
    }
}

#[derive(Clone)]
pub struct RpcState {
    pub router: Arc<RpcRouter>,
    pub contexts: ContextBuilder,
    pub options: TransportOptions,
}

#[derive(Debug, Default, Deserialize)]
pub struct RpcQuery {
    pub batch: Option<String>,
    pub input: Option<String>,
}

impl RpcQuery {
    fn is_batch(&self) -> bool {
        matches!(self.batch.as_deref(), Some("1") | Some("true"))
    }
}

/// Result of one procedure call
#[derive(Debug)]
pub struct CallOutcome {
    pub path: String,
    pub result: Result<Encoded, RpcError>,
}

impl CallOutcome {
    pub fn status_code(&self) -> u16 {
        match &self.result {
            Ok(_) => 200,
            Err(err) => err.status_code(),
        }
    }

    pub fn to_json(&self, expose_detail: bool) -> Value {
        match &self.result {
            Ok(encoded) => json!({ "result": { "data": encoded.to_json() } }),
            Err(err) => json!({ "error": { "json": err.to_json(Some(&self.path), expose_detail) } }),
        }
    }
}

/// Mount under the procedure prefix, e.g. `/api/trpc`
pub fn routes(state: RpcState) -> Router {
    Router::new()
        .route("/*path", get(handle_get).post(handle_post))
        .with_state(state)
}

async fn handle_get(
    State(state): State<RpcState>,
    Path(path): Path<String>,
    Query(query): Query<RpcQuery>,
    headers: HeaderMap,
) -> Response {
    let raw_input = query.input.clone();
    dispatch(&state, ProcedureKind::Query, path, &query, headers, Ok(raw_input.as_deref())).await
}

async fn handle_post(
    State(state): State<RpcState>,
    Path(path): Path<String>,
    Query(query): Query<RpcQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let raw_input = std::str::from_utf8(&body)
        .map(Some)
        .map_err(|_| RpcError::bad_input("Request body is not valid UTF-8"));
    dispatch(&state, ProcedureKind::Mutation, path, &query, headers, raw_input).await
}

async fn dispatch(
    state: &RpcState,
    kind: ProcedureKind,
    path: String,
    query: &RpcQuery,
    headers: HeaderMap,
    raw_input: Result<Option<&str>, RpcError>,
) -> Response {
    let batch = query.is_batch();
    let expose = state.options.expose_error_detail;
    let paths = split_paths(&path, batch);

    if paths.len() > state.options.max_batch_size {
        let err = RpcError::bad_input(format!(
            "Batch of {} calls exceeds the limit of {}",
            paths.len(),
            state.options.max_batch_size
        ));
        return reject(&paths, batch, err, expose);
    }

    // Unparseable input fails each call only after its access check
    let inputs: Vec<CallInput> = match raw_input.and_then(|raw| split_inputs(raw, batch, paths.len())) {
        Ok(inputs) => inputs.into_iter().map(Ok).collect(),
        Err(err) => vec![Err(err); paths.len()],
    };

    let ctx = state.contexts.build(headers).await;
    tracing::debug!("Dispatching {} {} call(s): {}", paths.len(), kind.as_str(), path);

    let outcomes = execute(&state.router, ctx, kind, paths.into_iter().zip(inputs).collect()).await;
    respond(&outcomes, batch, expose)
}

/// Raw input of one call, or the reason the request input could not be read
pub type CallInput = Result<Value, RpcError>;

/// Run every call concurrently. A failing or panicking call never affects
/// its siblings.
pub async fn execute(
    router: &RpcRouter,
    ctx: Arc<Context>,
    kind: ProcedureKind,
    calls: Vec<(String, CallInput)>,
) -> Vec<CallOutcome> {
    let futures = calls
        .into_iter()
        .map(|(path, input)| call_one(router, ctx.clone(), kind, path, input));
    join_all(futures).await
}

async fn call_one(router: &RpcRouter, ctx: Arc<Context>, kind: ProcedureKind, path: String, raw: CallInput) -> CallOutcome {
    let result = invoke(router, ctx, kind, &path, raw).await;

    if let Err(err) = &result {
        match err.code {
            ErrorCode::Internal => tracing::error!(
                "Procedure {} failed: {} (cause: {})",
                path,
                err.message,
                err.cause.as_deref().unwrap_or("none")
            ),
            _ => tracing::debug!("Procedure {} rejected: {}", path, err),
        }
    }

    CallOutcome { path, result }
}

async fn invoke(
    router: &RpcRouter,
    ctx: Arc<Context>,
    kind: ProcedureKind,
    path: &str,
    raw: CallInput,
) -> Result<Encoded, RpcError> {
    let procedure = router
        .resolve(path)
        .ok_or_else(|| RpcError::not_found(format!("No procedure found on path \"{}\"", path)))?;

    if procedure.kind() != kind {
        let method = match kind {
            ProcedureKind::Query => "GET",
            ProcedureKind::Mutation => "POST",
        };
        return Err(RpcError::method_not_supported(format!(
            "Procedure \"{}\" is a {} and cannot be called with {}",
            path,
            procedure.kind().as_str(),
            method
        )));
    }

    if !gate::admits(procedure.access(), &ctx) {
        return Err(gate::unauthorized());
    }

    let input = transformer::decode(raw?)?;

    match AssertUnwindSafe(procedure.call(ctx, input)).catch_unwind().await {
        Ok(result) => result,
        Err(_) => Err(RpcError::internal("An error occurred while processing your request").with_cause("handler panicked")),
    }
}

fn split_paths(path: &str, batch: bool) -> Vec<String> {
    if batch {
        path.split(',').map(str::to_string).collect()
    } else {
        vec![path.to_string()]
    }
}

/// Raw per-call inputs; envelope decoding happens per call
fn split_inputs(raw: Option<&str>, batch: bool, count: usize) -> Result<Vec<Value>, RpcError> {
    let raw = match raw.map(str::trim) {
        None | Some("") => return Ok(vec![Value::Null; count]),
        Some(raw) => raw,
    };

    let value: Value =
        serde_json::from_str(raw).map_err(|e| RpcError::bad_input("Input is not valid JSON").with_cause(e))?;

    if !batch {
        return Ok(vec![value]);
    }

    let Value::Object(mut by_index) = value else {
        return Err(RpcError::bad_input("Batched input must be an object keyed by call index"));
    };
    Ok((0..count)
        .map(|i| by_index.remove(&i.to_string()).unwrap_or(Value::Null))
        .collect())
}

/// Fail every call of a request with the same error
fn reject(paths: &[String], batch: bool, err: RpcError, expose: bool) -> Response {
    tracing::debug!("Rejected request before dispatch: {}", err);
    let outcomes: Vec<CallOutcome> = paths
        .iter()
        .map(|path| CallOutcome {
            path: path.clone(),
            result: Err(err.clone()),
        })
        .collect();
    respond(&outcomes, batch, expose)
}

fn respond(outcomes: &[CallOutcome], batch: bool, expose: bool) -> Response {
    let (status, body) = if batch {
        let body: Vec<Value> = outcomes.iter().map(|o| o.to_json(expose)).collect();
        (batch_status(outcomes), Value::Array(body))
    } else {
        match outcomes.first() {
            Some(outcome) => (outcome.status_code(), outcome.to_json(expose)),
            None => (400, json!({ "error": { "json": RpcError::bad_input("Empty request").to_json(None, expose) } })),
        }
    };

    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(body)).into_response()
}

/// Shared status when every call agrees, otherwise 207 Multi-Status
fn batch_status(outcomes: &[CallOutcome]) -> u16 {
    let mut statuses = outcomes.iter().map(CallOutcome::status_code);
    match statuses.next() {
        Some(first) if statuses.all(|s| s == first) => first,
        Some(_) => 207,
        None => 200,
    }
}
