use axum::{extract::Extension, http::StatusCode, response::IntoResponse, routing::post, Router};
use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};
use validator::Validate;

use crate::config::Config;
use crate::entities::user::{self, Entity as UserEntity, Role};
use crate::error::ApiError;
use crate::extract::Json;
use crate::middleware::auth::generate_token;

static USERNAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.-]{3,32}$").expect("username pattern is valid"));

pub fn users_router() -> Router {
    Router::new()
        .route("/users/", post(register_user))
        .route("/users/token", post(login))
}

async fn register_user(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<CreateUser>,
) -> Result<impl IntoResponse, ApiError> {
    debug!("->> Called `register_user()` for {:?}", payload.username);
    payload.validate()?;

    if payload.role == Role::Admin {
        return Err(ApiError::InvalidRequest(
            "Admin accounts cannot be registered".to_owned(),
        ));
    }

    let password = user::hash_password(&payload.password)
        .map_err(|err| ApiError::Internal(format!("Failed to hash password: {err}")))?;

    let txn = db.begin().await?;
    let new_user = user::ActiveModel {
        username: Set(payload.username),
        password: Set(password),
        role: Set(payload.role),
        is_active: Set(true),
        ..Default::default()
    };

    let created = new_user.insert(&txn).await.map_err(|err| match ApiError::from(err) {
        ApiError::Conflict(_) => ApiError::Conflict("Username already exists".to_owned()),
        other => other,
    })?;
    txn.commit().await?;

    info!(user_id = created.id, role = %created.role, "Registered user");
    Ok((StatusCode::CREATED, Json(created)))
}

async fn login(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(config): Extension<Arc<Config>>,
    Json(payload): Json<UserLogin>,
) -> Result<impl IntoResponse, ApiError> {
    debug!("->> Called `login()` for {:?}", payload.username);

    let invalid = || ApiError::Unauthorized("Invalid username or password".to_owned());

    let model = UserEntity::find()
        .filter(user::Column::Username.eq(&*payload.username))
        .filter(user::Column::IsActive.eq(true))
        .one(&*db)
        .await?
        .ok_or_else(invalid)?;

    model.check_hash(&payload.password).map_err(|_| invalid())?;

    let token = generate_token(&config.secret, model.id, model.role, config.token_ttl_hours)?;

    Ok(Json(json!({
        "token": token,
        "token_type": "bearer"
    })))
}

//structs
#[derive(Deserialize, Validate)]
struct CreateUser {
    #[validate(regex(
        path = *USERNAME_REGEX,
        message = "username must be 3-32 letters, digits, '_', '.' or '-'"
    ))]
    username: String,
    #[validate(length(min = 6, message = "password must be at least 6 characters"))]
    password: String,
    role: Role,
}

#[derive(Deserialize)]
struct UserLogin {
    username: String,
    password: String,
}
