use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Router,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set, TransactionTrait};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};
use validator::Validate;

use crate::api::products::find_active_product;
use crate::entities::{
    review::{self, Entity as ReviewEntity},
    user::Role,
};
use crate::error::ApiError;
use crate::extract::{Json, Path};
use crate::middleware::auth::{authenticated, AuthState, CurrentUser};
use crate::rating::recompute_product_rating;

//ROUTERS
pub fn review_router(auth: AuthState) -> Router {
    Router::new()
        .route(
            "/reviews/",
            get(get_all_reviews).merge(authenticated(&auth, post(create_review))),
        )
        .route(
            "/reviews/:id",
            get(get_review).merge(authenticated(&auth, delete(delete_review))),
        )
}

//ROUTES
async fn get_all_reviews(
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> Result<impl IntoResponse, ApiError> {
    let reviews = ReviewEntity::find_active().all(&*db).await?;
    Ok(Json(reviews))
}

async fn get_review(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> Result<impl IntoResponse, ApiError> {
    let review = ReviewEntity::find_active_by_id(id)
        .one(&*db)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(review))
}

/// Stores the review and refreshes the product rating in one transaction.
async fn create_review(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(current_user): Extension<CurrentUser>,
    Json(payload): Json<CreateReview>,
) -> Result<impl IntoResponse, ApiError> {
    debug!("->> Called `create_review()` with payload: {:?}", payload);
    current_user.require(Role::Buyer)?;

    let txn = db.begin().await?;
    let product = find_active_product(&txn, payload.product_id).await?;
    payload.validate()?;
    let grade = i32::try_from(payload.grade)
        .map_err(|_| ApiError::InvalidRequest("Grade should be from 1 to 5".to_owned()))?;

    let new_review = review::ActiveModel {
        user_id: Set(current_user.id),
        product_id: Set(product.id),
        comment: Set(payload.comment),
        comment_date: Set(Utc::now()),
        grade: Set(grade),
        is_active: Set(true),
        ..Default::default()
    };
    let created = new_review.insert(&txn).await?;
    let rating = recompute_product_rating(&txn, product.id).await?;
    txn.commit().await?;

    info!(
        review_id = created.id,
        product_id = product.id,
        rating,
        "Created review"
    );
    Ok((StatusCode::CREATED, Json(created)))
}

/// Tombstones the review and refreshes the product rating in one transaction.
async fn delete_review(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(current_user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    current_user.require(Role::Admin)?;

    let txn = db.begin().await?;
    let existing = ReviewEntity::find_active_by_id(id)
        .one(&txn)
        .await?
        .ok_or_else(|| not_found(id))?;
    let product_id = existing.product_id;

    let mut existing: review::ActiveModel = existing.into();
    existing.is_active = Set(false);
    existing.update(&txn).await?;
    let rating = recompute_product_rating(&txn, product_id).await?;
    txn.commit().await?;

    info!(review_id = id, product_id, rating, "Soft-deleted review");
    Ok(Json(json!({
        "message": "Review deleted!"
    })))
}

fn not_found(id: i32) -> ApiError {
    ApiError::NotFound(format!("Review {id} not found or inactive"))
}

//Structs
#[derive(Deserialize, Validate, Debug)]
struct CreateReview {
    product_id: i32,
    comment: Option<String>,
    #[validate(range(min = 1, max = 5, message = "Grade should be from 1 to 5"))]
    grade: i64,
}
