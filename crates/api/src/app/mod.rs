//! HTTP API application wiring.
//!
//! Layout:
//! - `router.rs`: startup-time route table (path -> method -> handler)
//! - `dispatch.rs`: request parsing, route lookup and response rendering
//! - `routes/`: one file per resource (`users`, `tokens`)
//! - `dto.rs`: request field extraction and validation
//! - `errors.rs`: handler replies and error responses

use std::sync::Arc;

use axum::Router;

use keystone_core::PasswordHasher;
use keystone_infra::{Config, FileStore, RecordStore};

pub mod dispatch;
pub mod dto;
pub mod errors;
pub mod router;
pub mod routes;

use dispatch::Dispatcher;
use router::{RouteConflict, RouteTable};

/// Shared dependencies handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub hasher: Arc<PasswordHasher>,
}

impl AppState {
    pub fn new(store: Arc<dyn RecordStore>, hasher: PasswordHasher) -> Self {
        Self {
            store,
            hasher: Arc::new(hasher),
        }
    }

    /// File-backed state rooted at the configured data directory.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Arc::new(FileStore::new(config.data_dir.clone())),
            PasswordHasher::new(&config.hashing_secret),
        )
    }
}

/// Every resource served by the API.
pub fn route_table() -> Result<RouteTable<AppState>, RouteConflict> {
    RouteTable::builder()
        .resource(&routes::users::UsersResource)
        .resource(&routes::tokens::TokensResource)
        .build()
}

/// Build the HTTP router around an existing state.
pub fn build_router(state: AppState) -> Result<Router, RouteConflict> {
    let routes = route_table()?;
    for (method, path) in routes.entries() {
        tracing::info!(method = %method, path = %format!("/{path}"), "route registered");
    }

    Ok(Dispatcher::new(routes, state).into_router())
}

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(config: &Config) -> Result<Router, RouteConflict> {
    build_router(AppState::from_config(config))
}
