use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

use super::gate;
use super::schema::{parse_input, Schema};
use super::transformer::{encode, Encoded, Rich};
use crate::context::Context;
use crate::error::RpcError;

pub type HandlerFuture = BoxFuture<'static, Result<Encoded, RpcError>>;

/// A handler after input decoding and output encoding have been folded in
pub type ErasedHandler = Arc<dyn Fn(Arc<Context>, Value) -> HandlerFuture + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcedureKind {
    /// Read-only, served over GET
    Query,
    /// Writes, served over POST
    Mutation,
}

impl ProcedureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcedureKind::Query => "query",
            ProcedureKind::Mutation => "mutation",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Protected,
}

#[derive(Clone)]
pub struct Procedure {
    kind: ProcedureKind,
    access: Access,
    handler: ErasedHandler,
}

impl Procedure {
    pub fn kind(&self) -> ProcedureKind {
        self.kind
    }

    pub fn access(&self) -> Access {
        self.access
    }

    pub async fn call(&self, ctx: Arc<Context>, input: Value) -> Result<Encoded, RpcError> {
        (self.handler)(ctx, input).await
    }
}

impl std::fmt::Debug for Procedure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Procedure")
            .field("kind", &self.kind)
            .field("access", &self.access)
            .finish_non_exhaustive()
    }
}

/// Starts a procedure anyone may call
pub fn public_procedure() -> ProcedureBuilder {
    ProcedureBuilder { access: Access::Public }
}

/// Starts a procedure that requires a session
pub fn protected_procedure() -> ProcedureBuilder {
    ProcedureBuilder { access: Access::Protected }
}

pub struct ProcedureBuilder {
    access: Access,
}

impl ProcedureBuilder {
    pub fn query<I, O, F, Fut>(self, handler: F) -> Procedure
    where
        I: Schema,
        O: Serialize + Rich + Send + 'static,
        F: Fn(Arc<Context>, I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O, RpcError>> + Send + 'static,
    {
        self.build(ProcedureKind::Query, handler)
    }

    pub fn mutation<I, O, F, Fut>(self, handler: F) -> Procedure
    where
        I: Schema,
        O: Serialize + Rich + Send + 'static,
        F: Fn(Arc<Context>, I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O, RpcError>> + Send + 'static,
    {
        self.build(ProcedureKind::Mutation, handler)
    }

    fn build<I, O, F, Fut>(self, kind: ProcedureKind, handler: F) -> Procedure
    where
        I: Schema,
        O: Serialize + Rich + Send + 'static,
        F: Fn(Arc<Context>, I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O, RpcError>> + Send + 'static,
    {
        let handler = Arc::new(handler);
        let erased: ErasedHandler = Arc::new(move |ctx: Arc<Context>, raw: Value| -> HandlerFuture {
            let handler = handler.clone();
            Box::pin(async move {
                let input = parse_input::<I>(raw)?;
                let output = handler(ctx, input).await?;
                encode(&output)
            })
        });

        let handler = match self.access {
            Access::Public => erased,
            Access::Protected => gate::require_session(erased),
        };

        Procedure {
            kind,
            access: self.access,
            handler,
        }
    }
}
