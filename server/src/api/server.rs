//! API server initialization

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::routing::get;
use axum::Router;
use sqlx::SqlitePool;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::auth::{require_auth, AuthState};
use super::routes::{
    auth, comments, health, notifications, projects, reviews, submissions, users, ws,
};
use crate::core::CoreApp;
use crate::domain::realtime::{ConnectionRegistry, Notifier};
use crate::domain::workflow::ReviewWorkflow;

/// Shared state handed to every route
#[derive(Clone)]
pub struct ApiState {
    pub pool: SqlitePool,
    pub signing_key: Vec<u8>,
    pub registry: Arc<ConnectionRegistry>,
    pub notifier: Arc<Notifier>,
    pub workflow: Arc<ReviewWorkflow>,
}

pub struct ApiServer {
    app: CoreApp,
}

impl ApiServer {
    pub fn new(app: CoreApp) -> Self {
        Self { app }
    }

    /// Returns CoreApp for graceful shutdown
    pub async fn start(self) -> Result<CoreApp> {
        let app = self.app;
        let shutdown = app.shutdown.clone();

        let addr = SocketAddr::new(app.config.server.host.parse()?, app.config.server.port);

        let state = ApiState {
            pool: app.sqlite.pool().clone(),
            signing_key: app.config.signing_key.clone(),
            registry: app.registry.clone(),
            notifier: app.notifier.clone(),
            workflow: app.workflow.clone(),
        };
        let auth_state = AuthState {
            signing_key: app.config.signing_key.clone(),
        };

        let protected = Router::new()
            .merge(users::routes())
            .merge(projects::routes())
            .merge(submissions::routes())
            .merge(comments::routes())
            .merge(reviews::routes())
            .merge(notifications::routes())
            .layer(axum::middleware::from_fn_with_state(
                auth_state,
                require_auth,
            ));

        let router = Router::new()
            .route("/health", get(health::health))
            // Handshake auth happens inside the handler, not the middleware
            .route("/ws", get(ws::ws_handler))
            .nest("/api/auth", auth::routes())
            .nest("/api", protected)
            .with_state(state)
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive());

        let listener = TcpListener::bind(addr).await?;
        tracing::info!("Listening on http://{}", addr);

        axum::serve(listener, router)
            .with_graceful_shutdown(async move { shutdown.wait().await })
            .await?;

        Ok(app)
    }
}
