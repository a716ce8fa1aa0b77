use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request},
    routing::get,
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use order_api::{config::AppConfig, db, handlers::AppServices, AppState};

/// Helper harness for spinning up an application state backed by an in-memory
/// SQLite database. Each instance gets its own fresh schema.
pub struct TestApp {
    router: Router,
    pub state: AppState,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        // Minimal configuration suitable for tests. A single connection keeps
        // the in-memory SQLite database alive for the harness lifetime.
        let mut cfg = AppConfig::new("sqlite::memory:", "127.0.0.1", 18_080, "test");
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");

        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let services = AppServices::new(db_arc.clone());

        let state = AppState {
            db: db_arc,
            config: cfg,
            services,
        };

        let router = Router::new()
            .route("/health", get(order_api::health_check))
            .merge(order_api::api_routes())
            .with_state(state.clone());

        Self { router, state }
    }

    /// Send a request against the router, optionally with a JSON body.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn response_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    serde_json::from_slice(&bytes).expect("response body was not valid JSON")
}
