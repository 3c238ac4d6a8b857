//! Axum HTTP server for the case-management API.
//!
//! Every route is a `POST` with a JSON body (multipart for uploads) answering
//! with an [`Envelope`](crate::web::types::Envelope). `GET /health` is the
//! only exception.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State},
    http::{HeaderValue, Method, header},
    routing::{get, post},
};
use tokio::sync::oneshot;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::config::{Config, ServerConfig};
use crate::db::StoreClient;
use crate::error::GatewayError;
use crate::legal::Repositories;
use crate::legal::cascade::CascadeCoordinator;
use crate::web::handlers::{cases, chats, documents, users};
use crate::web::types::HealthResponse;

/// Body limit for JSON routes.
const JSON_BODY_LIMIT: usize = 1024 * 1024;

/// Shared state for all gateway handlers.
pub struct GatewayState {
    pub repos: Arc<Repositories>,
    /// Multi-entity operations (case creation, uploads, cascading deletes).
    pub cascade: CascadeCoordinator,
    pub server: ServerConfig,
    /// Shutdown signal sender.
    pub shutdown_tx: tokio::sync::RwLock<Option<oneshot::Sender<()>>>,
    /// Server startup time for uptime calculation.
    pub startup_time: Instant,
}

impl GatewayState {
    pub fn new(store: &StoreClient, config: &Config) -> Self {
        let repos = Arc::new(Repositories::new(
            store,
            &config.storage,
            &config.credentials,
        ));
        Self {
            cascade: CascadeCoordinator::new(Arc::clone(&repos), Arc::clone(&store.blobs)),
            repos,
            server: config.server.clone(),
            shutdown_tx: tokio::sync::RwLock::new(None),
            startup_time: Instant::now(),
        }
    }
}

fn cors_layer(origins: &[String]) -> Result<CorsLayer, GatewayError> {
    let allow_origin = if origins.is_empty() {
        AllowOrigin::any()
    } else {
        let values = origins
            .iter()
            .map(|origin| {
                HeaderValue::from_str(origin).map_err(|e| GatewayError::StartupFailed {
                    reason: format!("Invalid CORS origin '{}': {}", origin, e),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        AllowOrigin::list(values)
    };
    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]))
}

/// Assemble the router with all routes and middleware.
pub fn build_router(state: Arc<GatewayState>) -> Result<Router, GatewayError> {
    let upload_limit = DefaultBodyLimit::max(state.server.max_upload_bytes);

    let api = Router::new()
        // Users
        .route("/createUser", post(users::create_user_handler))
        .route("/login", post(users::login_handler))
        .route("/getUser", post(users::get_user_handler))
        .route("/updateUser", post(users::update_user_handler))
        .route("/deleteUser", post(users::delete_user_handler))
        // Cases
        .route("/createCase", post(cases::create_case_handler))
        .route("/getCase", post(cases::get_case_handler))
        .route("/updateCase", post(cases::update_case_handler))
        .route("/getUserCases", post(cases::get_user_cases_handler))
        .route("/deleteCaseById", post(cases::delete_case_handler))
        .route("/deleteUserCases", post(cases::delete_user_cases_handler))
        // Chats
        .route("/getCaseChat", post(chats::get_case_chat_handler))
        .route("/addMessage", post(chats::add_message_handler))
        // Documents
        .route(
            "/uploadDocument",
            post(documents::upload_document_handler).layer(upload_limit.clone()),
        )
        .route(
            "/uploadDocuments",
            post(documents::upload_documents_handler).layer(upload_limit.clone()),
        )
        .route(
            "/createDocuments",
            post(documents::create_documents_handler).layer(upload_limit),
        )
        .route(
            "/getCaseDocuments",
            post(documents::get_case_documents_handler),
        )
        .route("/getDocumentById", post(documents::get_document_handler))
        .route(
            "/deleteDocumentById",
            post(documents::delete_document_handler),
        )
        .route(
            "/deleteCaseDocuments",
            post(documents::delete_case_documents_handler),
        )
        .route(
            "/updateDocumentRelevancy",
            post(documents::update_relevancy_handler),
        );

    Ok(Router::new()
        .route("/health", get(health_handler))
        .merge(api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(SetResponseHeaderLayer::if_not_present(
                    header::X_CONTENT_TYPE_OPTIONS,
                    HeaderValue::from_static("nosniff"),
                ))
                .layer(cors_layer(&state.server.cors_origins)?)
                .layer(DefaultBodyLimit::max(JSON_BODY_LIMIT)),
        )
        .with_state(state))
}

/// Start the HTTP server.
///
/// Returns the actual bound `SocketAddr` (useful when binding to port 0).
/// The server stops when the sender stored in `state.shutdown_tx` fires.
pub async fn start_server(
    addr: SocketAddr,
    state: Arc<GatewayState>,
) -> Result<SocketAddr, GatewayError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| GatewayError::StartupFailed {
            reason: format!("Failed to bind to {}: {}", addr, e),
        })?;
    let bound_addr = listener
        .local_addr()
        .map_err(|e| GatewayError::StartupFailed {
            reason: format!("Failed to get local addr: {}", e),
        })?;

    let app = build_router(Arc::clone(&state))?;

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    *state.shutdown_tx.write().await = Some(shutdown_tx);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("HTTP server shutting down");
            })
            .await
        {
            tracing::error!("HTTP server error: {}", e);
        }
    });

    tracing::info!("Listening on {}", bound_addr);
    Ok(bound_addr)
}

async fn health_handler(State(state): State<Arc<GatewayState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        uptime_secs: state.startup_time.elapsed().as_secs(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_origin_list_allows_any() {
        assert!(cors_layer(&[]).is_ok());
    }

    #[test]
    fn invalid_origin_fails_startup() {
        let err = cors_layer(&["https://ok.example".to_string(), "bad\norigin".to_string()])
            .expect_err("newline is not a header value");
        let GatewayError::StartupFailed { reason } = err;
        assert!(reason.contains("bad"));
    }
}
