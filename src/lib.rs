//! Order API Library
//!
//! This crate provides the core functionality for the order management API
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod migrator;
pub mod services;

use axum::{
    extract::State,
    response::Json,
    routing::{delete, get, patch, post},
    Router,
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde_json::{json, Value};
use std::sync::Arc;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub services: handlers::AppServices,
}

impl AppState {
    pub fn order_service(&self) -> Arc<services::orders::OrderService> {
        self.services.order.clone()
    }
}

/// The order management routes. Mounted at the root; every path keeps a
/// trailing slash. The static `/orders/filter/` segment takes priority over
/// the `/orders/:id/` capture.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/orders/", post(handlers::orders::create_order))
        .route("/orders/filter/", get(handlers::orders::filter_orders))
        .route("/orders/:id/", get(handlers::orders::get_order))
        .route(
            "/orders/:id/add-items/",
            patch(handlers::orders::add_items),
        )
        .route(
            "/orders/:id/items/:item_id/",
            delete(handlers::orders::delete_item),
        )
        .route(
            "/orders/:id/update-address/",
            patch(handlers::orders::update_address),
        )
}

/// Liveness plus database reachability
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let database = match db::check_connection(&state.db).await {
        Ok(()) => "up",
        Err(_) => "down",
    };

    Json(json!({
        "status": if database == "up" { "healthy" } else { "degraded" },
        "database": database,
        "timestamp": Utc::now().to_rfc3339(),
    }))
}
