use futures::future;
use serde_json::Value;
use std::sync::Arc;

use super::procedure::{Access, ErasedHandler, HandlerFuture};
use crate::context::Context;
use crate::error::RpcError;

/// Whether the caller behind `ctx` may invoke a procedure with `access`
pub fn admits(access: Access, ctx: &Context) -> bool {
    access == Access::Public || ctx.session.is_some()
}

pub fn unauthorized() -> RpcError {
    RpcError::unauthorized("You must be signed in to perform this action")
}

/// Wrap a handler so it only runs for callers with a session.
///
/// The check happens before input decoding, so an anonymous caller sees
/// UNAUTHORIZED even when their input is also malformed. The transport runs
/// the same check before unwrapping the wire envelope.
pub fn require_session(next: ErasedHandler) -> ErasedHandler {
    Arc::new(move |ctx: Arc<Context>, input: Value| -> HandlerFuture {
        if !admits(Access::Protected, &ctx) {
            tracing::debug!("Rejected anonymous call to protected procedure");
            return Box::pin(future::ready(Err(unauthorized())));
        }
        next(ctx, input)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Session;
    use crate::database::Database;
    use crate::error::ErrorCode;
    use crate::rpc::transformer::encode;
    use axum::http::HeaderMap;
    use chrono::Utc;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_handler(calls: Arc<AtomicUsize>) -> ErasedHandler {
        Arc::new(move |ctx: Arc<Context>, input: Value| -> HandlerFuture {
            calls.fetch_add(1, Ordering::SeqCst);
            let user = ctx.session.as_ref().map(|s| s.user_id.clone());
            Box::pin(async move { encode(&json!({ "user": user, "input": input })) })
        })
    }

    fn session() -> Session {
        Session {
            user_id: "editor".to_string(),
            name: None,
            email: None,
            image: None,
            expires_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn anonymous_call_skips_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let guarded = require_session(counting_handler(calls.clone()));
        let ctx = Arc::new(Context::new(Database::memory(), None, HeaderMap::new()));

        let err = guarded(ctx, Value::Null).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Unauthorized);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn authenticated_call_is_forwarded_unchanged() {
        let calls = Arc::new(AtomicUsize::new(0));
        let guarded = require_session(counting_handler(calls.clone()));
        let ctx = Arc::new(Context::new(Database::memory(), Some(session()), HeaderMap::new()));

        let out = guarded(ctx, json!({ "id": 7 })).await.unwrap();
        assert_eq!(out.json, json!({ "user": "editor", "input": { "id": 7 } }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
