use crate::entities::user::{self, Entity as UserEntity, Role};
use crate::error::ApiError;
use axum::{
    extract::{Request, State},
    middleware::{from_fn_with_state, Next},
    response::Response,
    routing::MethodRouter,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use std::{str::FromStr, sync::Arc};
use thiserror::Error;
use tracing::debug;

/// Resolves the bearer token into a [`CurrentUser`] request extension.
///
/// Only identity is checked here. Which roles may call an operation is
/// decided by the handler through [`CurrentUser::require`].
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok());

    let token = match auth_header.and_then(|header| header.strip_prefix("Bearer ")) {
        Some(token) => token,
        None => {
            return Err(ApiError::Unauthorized(
                "Missing bearer token".to_owned(),
            ))
        }
    };

    let claims = validate_token(&state.secret, token)?;
    let current_user = resolve_user(&state.db, &claims).await?;
    debug!(user_id = current_user.id, role = %current_user.role, "Authenticated request");

    req.extensions_mut().insert(current_user);
    Ok(next.run(req).await)
}

/// Puts the methods of `methods` behind [`auth_middleware`]. Other methods
/// merged onto the same path, and the 405 fallback, stay public.
pub fn authenticated(auth: &AuthState, methods: MethodRouter) -> MethodRouter {
    methods.route_layer(from_fn_with_state(auth.clone(), auth_middleware))
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i32,
    pub role: String,
    pub exp: usize,
}

#[derive(Clone, Debug)]
pub struct AuthState {
    pub db: Arc<DatabaseConnection>,
    pub secret: String,
}

/// The authenticated caller of the current request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: i32,
    pub role: Role,
}

impl CurrentUser {
    pub fn require(&self, role: Role) -> Result<(), ApiError> {
        if self.role == role {
            Ok(())
        } else {
            Err(ApiError::Forbidden(format!(
                "This operation requires the {} role",
                role
            )))
        }
    }
}

pub fn generate_token(
    secret: &str,
    user_id: i32,
    role: Role,
    ttl_hours: i64,
) -> Result<String, AuthError> {
    let exp = Utc::now()
        .checked_add_signed(Duration::hours(ttl_hours))
        .ok_or(AuthError::GenerationFail)?
        .timestamp() as usize;

    let claims = Claims {
        user_id,
        role: role.to_string(),
        exp,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| AuthError::GenerationFail)
}

pub fn validate_token(secret: &str, token: &str) -> Result<Claims, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|err| match err.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::ValidationFail,
    })?;

    Ok(token_data.claims)
}

/// The token role must still match the stored account, which must be active.
async fn resolve_user(db: &DatabaseConnection, claims: &Claims) -> Result<CurrentUser, AuthError> {
    let role = Role::from_str(&claims.role).map_err(|_| AuthError::ValidationFail)?;

    match UserEntity::find_by_id(claims.user_id)
        .filter(user::Column::Role.eq(role))
        .filter(user::Column::IsActive.eq(true))
        .one(db)
        .await
    {
        Ok(Some(model)) => Ok(CurrentUser {
            id: model.id,
            role: model.role,
        }),
        Ok(None) => Err(AuthError::InvalidUserOrRole),
        Err(_) => Err(AuthError::InternalServerError),
    }
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid user id or role")]
    InvalidUserOrRole,
    #[error("Token expired")]
    TokenExpired,
    #[error("Failed to validate token")]
    ValidationFail,
    #[error("Failed to generate token")]
    GenerationFail,
    #[error("Internal server error")]
    InternalServerError,
}
