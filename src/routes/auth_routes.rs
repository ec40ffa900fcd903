// src/routes/auth_routes.rs

use axum::{
    Form, Json, Router,
    extract::State,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use crate::{
    auth::{hash_password, verify_password},
    error::{ApiError, is_unique_violation},
    middleware::auth_context::AuthContext,
    models::{AppState, Role, UserOut, UserRow},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/me", get(me))
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: String,
    pub user: UserOut,
}

/// OAuth2 password form: `username` carries the email.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

fn email_taken() -> ApiError {
    ApiError::Conflict("EMAIL_TAKEN", "Email already registered".into())
}

fn validate_registration(req: &RegisterRequest) -> Result<(), ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::validation("name is required"));
    }
    let email = req.email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::validation("a valid email is required"));
    }
    if req.password.is_empty() {
        return Err(ApiError::validation("password is required"));
    }
    Ok(())
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, ApiError> {
    validate_registration(&req)?;

    let role = Role::from_registration(req.role.as_deref());
    if role == Role::Admin && !state.allow_admin_registration {
        return Err(ApiError::Forbidden(
            "ADMIN_REGISTRATION_DISABLED",
            "Administrator accounts cannot be self-registered".into(),
        ));
    }

    let email = req.email.trim();

    let existing: Option<i64> = sqlx::query_scalar(r#"SELECT id FROM users WHERE email = $1"#)
        .bind(email)
        .fetch_optional(&state.db)
        .await
        .map_err(ApiError::db)?;
    if existing.is_some() {
        return Err(email_taken());
    }

    let password_hash = hash_password(&req.password)?;

    let user: UserRow = sqlx::query_as::<_, UserRow>(
        r#"
        INSERT INTO users (name, email, password_hash, role)
        VALUES ($1, $2, $3, $4)
        RETURNING id, name, email, password_hash, role
        "#,
    )
    .bind(req.name.trim())
    .bind(email)
    .bind(&password_hash)
    .bind(role.as_str())
    .fetch_one(&state.db)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            email_taken()
        } else {
            ApiError::db(e)
        }
    })?;

    tracing::info!(user_id = user.id, role = role.as_str(), "user registered");

    Ok(Json(RegisterResponse {
        message: "User registered successfully".into(),
        user: user.into(),
    }))
}

pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Json<TokenResponse>, ApiError> {
    let email = form.username.trim();
    if email.is_empty() || form.password.is_empty() {
        return Err(ApiError::validation("username and password are required"));
    }

    let user: UserRow = sqlx::query_as::<_, UserRow>(
        r#"
        SELECT id, name, email, password_hash, role
        FROM users
        WHERE email = $1
        "#,
    )
    .bind(email)
    .fetch_optional(&state.db)
    .await
    .map_err(ApiError::db)?
    .ok_or_else(ApiError::invalid_credentials)?;

    if !verify_password(&form.password, &user.password_hash) {
        return Err(ApiError::invalid_credentials());
    }

    let access_token = state.tokens.issue(user.id, Role::from_db(&user.role))?;

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".into(),
    }))
}

pub async fn me(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<UserOut>, ApiError> {
    let user: UserRow = sqlx::query_as::<_, UserRow>(
        r#"
        SELECT id, name, email, password_hash, role
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(auth.user_id)
    .fetch_optional(&state.db)
    .await
    .map_err(ApiError::db)?
    .ok_or_else(ApiError::not_authenticated)?;

    Ok(Json(user.into()))
}
