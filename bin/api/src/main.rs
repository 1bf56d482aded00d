use std::sync::Arc;

use addresses_config::Settings;
use addresses_store::{PostgresStore, Store};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router
};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

#[derive(Clone)]
struct ApiState {
    store: Arc<dyn Store>,
    max_page_size: u32,
    max_page_skip: u32
}

#[derive(Debug, Deserialize)]
struct Page {
    limit: Option<i64>,
    skip: Option<i64>
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let settings = Settings::load()?;
    tracing::info!(name = %settings.name, "starting api");

    let store: Arc<dyn Store> = Arc::new(PostgresStore::connect(&settings.database_url).await?);
    let state = ApiState { store, max_page_size: settings.rest_max_page_size, max_page_skip: settings.rest_max_page_skip };

    let app = Router::new()
        .route(&settings.rest_prefix, get(list_addresses))
        .route(&format!("{}/:public_key", settings.rest_prefix), get(get_address))
        .route(&settings.health_prefix, get(health))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", settings.port)).await?;
    tracing::info!(port = settings.port, "api listening");
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health() -> &'static str {
    "OK"
}

async fn list_addresses(
    State(state): State<ApiState>,
    Query(page): Query<Page>
) -> Result<Json<serde_json::Value>, StatusCode> {
    let limit = page.limit.unwrap_or(100).clamp(1, i64::from(state.max_page_size));
    let skip = page.skip.unwrap_or(0).clamp(0, i64::from(state.max_page_skip));

    let rows = state.store.select_addresses_page(limit, skip).await.map_err(|err| {
        tracing::error!(error = %err, "failed to page addresses");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(serde_json::json!({ "limit": limit, "skip": skip, "addresses": rows })))
}

async fn get_address(
    State(state): State<ApiState>,
    Path(public_key): Path<String>
) -> Result<Json<serde_json::Value>, StatusCode> {
    let row = state.store.select_address(&public_key).await.map_err(|err| {
        tracing::error!(error = %err, public_key = %public_key, "failed to read address");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    match row {
        Some(address) => Ok(Json(serde_json::to_value(address).expect("Address always serializes"))),
        None => Err(StatusCode::NOT_FOUND)
    }
}
