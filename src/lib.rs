pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod store;
pub mod utils;

use std::{path::PathBuf, sync::Arc};

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_cookies::CookieManagerLayer;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use config::{Config, JwtSettings};
use store::Repositories;

pub const DEFAULT_BODY_LIMIT: usize = 10 * 1024 * 1024; // 10MB

/// Shared by every handler. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub repos: Repositories,
    pub jwt: Arc<JwtSettings>,
    pub upload_dir: Arc<PathBuf>,
}

impl AppState {
    pub fn new(repos: Repositories, jwt: JwtSettings, upload_dir: PathBuf) -> Self {
        Self {
            repos,
            jwt: Arc::new(jwt),
            upload_dir: Arc::new(upload_dir),
        }
    }

    pub fn from_config(repos: Repositories, config: &Config) -> Self {
        Self::new(repos, config.jwt.clone(), config.upload_dir.clone())
    }
}

pub fn create_router(state: AppState, body_limit: usize) -> Router {
    // Everything here requires a valid access cookie.
    let protected = Router::new()
        .route(
            "/products",
            get(handlers::products::list_products).post(handlers::products::create_product),
        )
        .route(
            "/products/:id",
            get(handlers::products::get_product)
                .put(handlers::products::update_product)
                .delete(handlers::products::delete_product),
        )
        .route(
            "/purchases",
            get(handlers::purchases::list_purchases).post(handlers::purchases::create_purchase),
        )
        .route(
            "/sales",
            get(handlers::sales::list_sales).post(handlers::sales::create_sale),
        )
        .route("/sales/import", post(handlers::imports::import_sales))
        .route("/sales/import/async", post(handlers::imports::import_sales_async))
        .route("/import-batches/:id", get(handlers::imports::get_import_batch))
        .route("/inventory/:id", get(handlers::inventory::product_ledger))
        .route("/inventory/:id/stock", get(handlers::inventory::product_stock))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    Router::new()
        // Public routes
        .route("/health", get(handlers::health))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/refresh", post(handlers::auth::refresh))
        .route("/auth/logout", post(handlers::auth::logout))
        .merge(protected)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CookieManagerLayer::new())
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state)
}
