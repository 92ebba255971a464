use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set, TransactionTrait,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};
use validator::Validate;

use crate::entities::{
    category::Entity as CategoryEntity,
    product::{self, Entity as ProductEntity},
    review::{self, Entity as ReviewEntity},
    user::Role,
};
use crate::error::ApiError;
use crate::extract::{Json, Path};
use crate::middleware::auth::{authenticated, AuthState, CurrentUser};
use crate::rating::recompute_product_rating;

//ROUTERS
pub fn product_router(auth: AuthState) -> Router {
    Router::new()
        .route(
            "/products/",
            get(get_all_products).merge(authenticated(&auth, post(create_product))),
        )
        .route("/products/category/:id", get(get_products_by_category))
        .route(
            "/products/:id",
            get(get_product).merge(authenticated(
                &auth,
                put(update_product).delete(delete_product),
            )),
        )
        .route("/products/:id/reviews", get(get_product_reviews))
        .route(
            "/products/:id/rating",
            authenticated(&auth, post(recompute_rating)),
        )
}

//ROUTES
async fn get_all_products(
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> Result<impl IntoResponse, ApiError> {
    let products = ProductEntity::find_active().all(&*db).await?;
    Ok(Json(products))
}

async fn get_products_by_category(
    Path(category_id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_active_category(&*db, category_id).await?;

    let products = ProductEntity::find_active()
        .filter(product::Column::CategoryId.eq(category_id))
        .all(&*db)
        .await?;
    Ok(Json(products))
}

async fn get_product(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> Result<impl IntoResponse, ApiError> {
    let product = find_active_product(&*db, id).await?;

    //a product under a dead category is treated as an integrity error
    ensure_active_category(&*db, product.category_id).await?;

    Ok(Json(product))
}

async fn get_product_reviews(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> Result<impl IntoResponse, ApiError> {
    find_active_product(&*db, id).await?;

    let reviews = ReviewEntity::find_active()
        .filter(review::Column::ProductId.eq(id))
        .all(&*db)
        .await?;
    Ok(Json(reviews))
}

async fn create_product(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(current_user): Extension<CurrentUser>,
    Json(payload): Json<ProductPayload>,
) -> Result<impl IntoResponse, ApiError> {
    debug!("->> Called `create_product()` with payload: {:?}", payload);
    current_user.require(Role::Seller)?;
    payload.validate()?;

    let txn = db.begin().await?;
    ensure_active_category(&txn, payload.category_id).await?;

    let new_product = product::ActiveModel {
        name: Set(payload.name),
        description: Set(payload.description),
        price: Set(payload.price),
        image_url: Set(payload.image_url),
        stock: Set(payload.stock),
        category_id: Set(payload.category_id),
        seller_id: Set(current_user.id),
        rating: Set(0.0),
        is_active: Set(true),
        ..Default::default()
    };
    let created = new_product.insert(&txn).await?;
    txn.commit().await?;

    info!(product_id = created.id, seller_id = current_user.id, "Created product");
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_product(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(current_user): Extension<CurrentUser>,
    Json(payload): Json<ProductPayload>,
) -> Result<impl IntoResponse, ApiError> {
    debug!("->> Called `update_product({id})` with payload: {:?}", payload);
    current_user.require(Role::Seller)?;
    payload.validate()?;

    let txn = db.begin().await?;
    let existing = find_active_product(&txn, id).await?;
    ensure_owner(&existing, &current_user, "update")?;
    ensure_active_category(&txn, payload.category_id).await?;

    //full overwrite of the client-owned fields; seller, rating and
    //active flag are never taken from the payload
    let mut existing: product::ActiveModel = existing.into();
    existing.name = Set(payload.name);
    existing.description = Set(payload.description);
    existing.price = Set(payload.price);
    existing.image_url = Set(payload.image_url);
    existing.stock = Set(payload.stock);
    existing.category_id = Set(payload.category_id);

    let updated = existing.update(&txn).await?;
    txn.commit().await?;

    info!(product_id = id, "Updated product");
    Ok(Json(updated))
}

async fn delete_product(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(current_user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    current_user.require(Role::Seller)?;

    let txn = db.begin().await?;
    let existing = find_active_product(&txn, id).await?;
    ensure_owner(&existing, &current_user, "delete")?;

    //rating is kept as it was
    let mut existing: product::ActiveModel = existing.into();
    existing.is_active = Set(false);
    let deleted = existing.update(&txn).await?;
    txn.commit().await?;

    info!(product_id = id, "Soft-deleted product");
    Ok(Json(deleted))
}

async fn recompute_rating(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(current_user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    current_user.require(Role::Admin)?;

    let txn = db.begin().await?;
    //inactive products are repairable too
    if ProductEntity::find_by_id(id).one(&txn).await?.is_none() {
        return Err(ApiError::NotFound(format!("Product {id} not found")));
    }
    recompute_product_rating(&txn, id).await?;
    let refreshed = ProductEntity::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Product {id} not found")))?;
    txn.commit().await?;

    info!(product_id = id, rating = refreshed.rating, "Repaired product rating");
    Ok(Json(refreshed))
}

//utilities
pub(crate) async fn find_active_product<C>(db: &C, id: i32) -> Result<product::Model, ApiError>
where
    C: ConnectionTrait,
{
    ProductEntity::find_active_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Product {id} not found or inactive")))
}

async fn ensure_active_category<C>(db: &C, category_id: i32) -> Result<(), ApiError>
where
    C: ConnectionTrait,
{
    match CategoryEntity::find_active_by_id(category_id).one(db).await? {
        Some(_) => Ok(()),
        None => Err(ApiError::InvalidRequest(format!(
            "Category {category_id} not found or inactive"
        ))),
    }
}

fn ensure_owner(product: &product::Model, user: &CurrentUser, action: &str) -> Result<(), ApiError> {
    if product.seller_id == user.id {
        Ok(())
    } else {
        Err(ApiError::Forbidden(format!(
            "You can only {action} your own products"
        )))
    }
}

//Structs
#[derive(Deserialize, Validate, Debug)]
struct ProductPayload {
    #[validate(length(min = 1, max = 200))]
    name: String,
    description: Option<String>,
    #[validate(range(min = 0.0))]
    price: f64,
    image_url: Option<String>,
    #[validate(range(min = 0))]
    stock: i32,
    category_id: i32,
}
