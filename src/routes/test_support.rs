// Helpers for tests that run the router against a real Postgres database
// provisioned by `#[sqlx::test]`.

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use chrono::Duration;
use serde_json::Value;
use sqlx::PgPool;
use tower::ServiceExt;

use crate::{
    auth::TokenKeys,
    db,
    models::{AppState, Role},
};

const SECRET: &str = "store-test-secret";

/// Creates the schema in the per-test database and builds the full router on it.
pub async fn app_with_schema(pool: PgPool) -> Router {
    db::ensure_schema(&pool).await;
    super::router(AppState {
        db: pool,
        tokens: TokenKeys::new(SECRET, Duration::minutes(30)),
        allow_admin_registration: false,
    })
}

pub fn bearer(user_id: i64, role: Role) -> String {
    let token = TokenKeys::new(SECRET, Duration::minutes(30))
        .issue(user_id, role)
        .unwrap();
    format!("Bearer {token}")
}

pub async fn insert_user(pool: &PgPool, name: &str, role: Role) -> i64 {
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO users (name, email, password_hash, role)
        VALUES ($1, $2, 'not-a-hash', $3)
        RETURNING id
        "#,
    )
    .bind(name)
    .bind(format!("{}@example.com", name.to_lowercase()))
    .bind(role.as_str())
    .fetch_one(pool)
    .await
    .unwrap();
    id
}

pub async fn insert_doctor(pool: &PgPool, email: &str, duration_minutes: i32) -> i64 {
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO doctors (name, email, specialty, duration_minutes)
        VALUES ('Dr. Kim', $1, 'Dermatology', $2)
        RETURNING id
        "#,
    )
    .bind(email)
    .bind(duration_minutes)
    .fetch_one(pool)
    .await
    .unwrap();
    id
}

async fn dispatch(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    // extractor rejections answer in plain text
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

/// Sends a request with an optional bearer header and optional JSON body.
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    auth: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(auth) = auth {
        req = req.header(header::AUTHORIZATION, auth);
    }
    let body = match body {
        Some(json) => {
            req = req.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    dispatch(app, req.body(body).unwrap()).await
}

pub async fn send_form(app: &Router, uri: &str, form: &str) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form.to_string()))
        .unwrap();
    dispatch(app, req).await
}
