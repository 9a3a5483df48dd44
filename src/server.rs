use axum::{
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::api::app_router;
use crate::auth::SessionResolver;
use crate::config::{AppConfig, SecurityConfig};
use crate::context::ContextBuilder;
use crate::database::Database;
use crate::rpc::{RpcRouter, RpcState, TransportOptions};

#[derive(Clone)]
struct InfoState {
    db: Database,
    router: Arc<RpcRouter>,
    prefix: String,
    expose_error_detail: bool,
}

/// Assemble the HTTP application: info, health and the procedure endpoint
pub fn app(config: &AppConfig, db: Database, sessions: Arc<dyn SessionResolver>) -> Router {
    let router = Arc::new(app_router());
    let prefix = config.server.trpc_prefix.trim_end_matches('/').to_string();

    let rpc = RpcState {
        router: router.clone(),
        contexts: ContextBuilder::new(db.clone(), sessions),
        options: TransportOptions {
            max_batch_size: config.rpc.max_batch_size,
            expose_error_detail: config.rpc.expose_error_detail,
        },
    };

    let info = InfoState {
        db,
        router,
        prefix: prefix.clone(),
        expose_error_detail: config.rpc.expose_error_detail,
    };

    let app = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .with_state(info)
        .nest(&prefix, crate::rpc::transport::routes(rpc));

    let app = match cors_layer(&config.security) {
        Some(cors) => app.layer(cors),
        None => app,
    };

    app.layer(TraceLayer::new_for_http())
}

fn cors_layer(security: &SecurityConfig) -> Option<CorsLayer> {
    if !security.enable_cors {
        return None;
    }

    if security.cors_origins.is_empty() || security.cors_origins.iter().any(|o| o == "*") {
        return Some(CorsLayer::permissive());
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    Some(
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            .allow_credentials(true),
    )
}

async fn root(State(state): State<InfoState>) -> Json<Value> {
    let procedures: Vec<&str> = state.router.paths().collect();

    Json(json!({
        "success": true,
        "data": {
            "name": "Studio CMS API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Typed procedure API for the studio site's CMS content",
            "endpoint": format!("{}/<procedure>", state.prefix),
            "procedures": procedures,
        }
    }))
}

async fn health(State(state): State<InfoState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.db.health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": state.db.backend_name()
                }
            })),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);

            let mut data = json!({ "status": "degraded", "timestamp": now });
            if state.expose_error_detail {
                data["database_error"] = json!(e.to_string());
            }

            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "data": data
                })),
            )
        }
    }
}
