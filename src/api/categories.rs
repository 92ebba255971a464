use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set, TransactionTrait};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};
use validator::Validate;

use crate::entities::{
    category::{self, Entity as CategoryEntity},
    user::Role,
};
use crate::error::ApiError;
use crate::extract::{Json, Path};
use crate::middleware::auth::{authenticated, AuthState, CurrentUser};

//ROUTERS
pub fn category_router(auth: AuthState) -> Router {
    Router::new()
        .route(
            "/categories/",
            get(get_categories).merge(authenticated(&auth, post(create_category))),
        )
        .route(
            "/categories/:id",
            authenticated(&auth, put(update_category).delete(delete_category)),
        )
}

//ROUTES
async fn get_categories(
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> Result<impl IntoResponse, ApiError> {
    let categories = CategoryEntity::find_active().all(&*db).await?;
    Ok(Json(categories))
}

async fn create_category(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(current_user): Extension<CurrentUser>,
    Json(payload): Json<CategoryPayload>,
) -> Result<impl IntoResponse, ApiError> {
    debug!("->> Called `create_category()` with payload: {:?}", payload);
    current_user.require(Role::Admin)?;
    payload.validate()?;

    let txn = db.begin().await?;
    let new_category = category::ActiveModel {
        name: Set(payload.name),
        is_active: Set(true),
        ..Default::default()
    };
    let created = new_category.insert(&txn).await.map_err(duplicate_name)?;
    txn.commit().await?;

    info!(category_id = created.id, "Created category");
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_category(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(current_user): Extension<CurrentUser>,
    Json(payload): Json<CategoryPayload>,
) -> Result<impl IntoResponse, ApiError> {
    debug!("->> Called `update_category({id})` with payload: {:?}", payload);
    current_user.require(Role::Admin)?;
    payload.validate()?;

    let txn = db.begin().await?;
    let existing = CategoryEntity::find_active_by_id(id)
        .one(&txn)
        .await?
        .ok_or_else(|| not_found(id))?;

    let mut existing: category::ActiveModel = existing.into();
    existing.name = Set(payload.name);
    let updated = existing.update(&txn).await.map_err(duplicate_name)?;
    txn.commit().await?;

    Ok(Json(updated))
}

async fn delete_category(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(current_user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    current_user.require(Role::Admin)?;

    let txn = db.begin().await?;
    let existing = CategoryEntity::find_active_by_id(id)
        .one(&txn)
        .await?
        .ok_or_else(|| not_found(id))?;

    let mut existing: category::ActiveModel = existing.into();
    existing.is_active = Set(false);
    let deleted = existing.update(&txn).await?;
    txn.commit().await?;

    info!(category_id = id, "Soft-deleted category");
    Ok(Json(deleted))
}

fn not_found(id: i32) -> ApiError {
    ApiError::NotFound(format!("Category {id} not found or inactive"))
}

fn duplicate_name(err: sea_orm::DbErr) -> ApiError {
    match ApiError::from(err) {
        ApiError::Conflict(_) => ApiError::Conflict("Category already exists".to_owned()),
        other => other,
    }
}

//Structs
#[derive(Deserialize, Validate, Debug)]
struct CategoryPayload {
    #[validate(length(min = 1, max = 100))]
    name: String,
}
