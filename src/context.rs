use axum::http::HeaderMap;
use std::sync::Arc;

use crate::auth::{Session, SessionResolver};
use crate::database::Database;

/// Everything a procedure handler may read about its request.
///
/// Built once per HTTP request and shared read-only by every call in a batch.
pub struct Context {
    pub db: Database,
    pub session: Option<Session>,
    pub headers: HeaderMap,
}

impl Context {
    pub fn new(db: Database, session: Option<Session>, headers: HeaderMap) -> Self {
        Self { db, session, headers }
    }
}

#[derive(Clone)]
pub struct ContextBuilder {
    db: Database,
    sessions: Arc<dyn SessionResolver>,
}

impl ContextBuilder {
    pub fn new(db: Database, sessions: Arc<dyn SessionResolver>) -> Self {
        Self { db, sessions }
    }

    /// Never fails: an unusable session token leaves the caller anonymous and
    /// protected procedures reject the call later.
    pub async fn build(&self, headers: HeaderMap) -> Arc<Context> {
        let session = match self.sessions.resolve(&headers).await {
            Ok(session) => session,
            Err(e) => {
                tracing::debug!("Session resolution failed, continuing anonymously: {}", e);
                None
            }
        };

        Arc::new(Context::new(self.db.clone(), session, headers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{issue_token, Claims, JwtSessionResolver};
    use axum::http::{header, HeaderValue};

    fn builder() -> ContextBuilder {
        ContextBuilder::new(Database::memory(), Arc::new(JwtSessionResolver::new("secret", "studio_session")))
    }

    #[tokio::test]
    async fn malformed_token_yields_anonymous_context() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer not.a.jwt"));

        let ctx = builder().build(headers).await;
        assert!(ctx.session.is_none());
        assert!(ctx.headers.contains_key(header::AUTHORIZATION));
    }

    #[tokio::test]
    async fn valid_token_yields_session() {
        let token = issue_token(&Claims::new("admin", 1), "secret").unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );

        let ctx = builder().build(headers).await;
        assert_eq!(ctx.session.as_ref().map(|s| s.user_id.as_str()), Some("admin"));
    }
}
