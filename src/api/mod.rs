//! The application's procedure tree.
//!
//! ```text
//! auth.getSession
//! investor.{getPublished,getAll,getById,create,update,delete}
//! testimonial.{getPublished,getAll,getById,create,update,delete}
//! techstack.{getPublished,getAll,getById,create,update,delete}
//! ```

use crate::rpc::schema::NoInput;
use crate::rpc::{public_procedure, RpcRouter};
use crate::resources::{investor, techstack, testimonial};

pub fn app_router() -> RpcRouter {
    RpcRouter::new()
        .nest("auth", auth_router())
        .nest("investor", investor::router())
        .nest("testimonial", testimonial::router())
        .nest("techstack", techstack::router())
}

/// Session introspection; returns `null` for anonymous callers
fn auth_router() -> RpcRouter {
    RpcRouter::new().procedure(
        "getSession",
        public_procedure().query(|ctx, _: NoInput| async move { Ok(ctx.session.clone()) }),
    )
}
