mod auth;
mod config;
mod middleware;

mod db;
mod error;
mod models;
mod routes;
mod schedule;

use crate::{auth::TokenKeys, config::Config, models::AppState};

use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use axum::http::header;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cfg = Config::from_env()?;
    let pool = db::connect_pg(&cfg.database_url, cfg.db_max_connections).await?;
    db::ensure_schema(&pool).await;

    let state = AppState {
        db: pool,
        tokens: TokenKeys::new(
            &cfg.jwt_secret,
            chrono::Duration::minutes(cfg.access_token_ttl_minutes),
        ),
        allow_admin_registration: cfg.allow_admin_registration,
    };

    if cfg.allow_admin_registration {
        tracing::warn!("ALLOW_ADMIN_REGISTRATION is on: anyone can register as ADMIN");
    }

    // Browser frontends are served from other origins.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
        ]);

    let app = routes::router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    tracing::info!("Listening on http://{}", cfg.bind_addr);
    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
