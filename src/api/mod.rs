pub mod categories;
pub mod products;
pub mod reviews;
pub mod users;

use axum::{middleware::from_fn, Extension, Router};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::middleware::{auth::AuthState, logging::logging_middleware};
use categories::category_router;
use products::product_router;
use reviews::review_router;
use users::users_router;

pub fn create_api_router(shared_db: Arc<DatabaseConnection>, config: Arc<Config>) -> Router {
    let auth = AuthState {
        db: shared_db.clone(),
        secret: config.secret.clone(),
    };

    Router::new()
        .merge(users_router())
        .merge(category_router(auth.clone()))
        .merge(product_router(auth.clone()))
        .merge(review_router(auth))
        .layer(from_fn(logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(shared_db))
        .layer(Extension(config))
}
