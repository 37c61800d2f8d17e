use crate::{app::App, error::AppError};
use axum::{
    Json,
    extract::{FromRequest, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use linkhub_rs::{
    Analytics, CreatePartnerRequest, CreateUrlRequest, DeleteResponse, Partner, ShortUrlListing,
    UpdateUrlRequest,
};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::info;

/// `Json` whose rejections render as our own `{error}` body with status 400.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

pub async fn handle_health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "git_sha": option_env!("VERGEN_GIT_SHA").unwrap_or("unknown"),
    }))
}

pub async fn handle_list_urls(
    State(app): State<Arc<App>>,
) -> Result<Json<Vec<ShortUrlListing>>, AppError> {
    Ok(Json(app.list_urls().await?))
}

pub async fn handle_create_url(
    State(app): State<Arc<App>>,
    AppJson(create): AppJson<CreateUrlRequest>,
) -> Result<impl IntoResponse, AppError> {
    info!("handle_create_url: {:?}", create.url);

    Ok((StatusCode::CREATED, Json(app.create_url(create).await?)))
}

pub async fn handle_update_url(
    Path(code): Path<String>,
    State(app): State<Arc<App>>,
    AppJson(update): AppJson<UpdateUrlRequest>,
) -> Result<impl IntoResponse, AppError> {
    info!("handle_update_url: {}", code);

    Ok(Json(app.update_url(&code, update).await?))
}

pub async fn handle_delete_url(
    Path(code): Path<String>,
    State(app): State<Arc<App>>,
) -> Result<Json<DeleteResponse>, AppError> {
    info!("handle_delete_url: {}", code);

    Ok(Json(app.delete_url(&code).await?))
}

pub async fn handle_list_partners(
    State(app): State<Arc<App>>,
) -> Result<Json<Vec<Partner>>, AppError> {
    Ok(Json(app.list_partners().await?))
}

pub async fn handle_create_partner(
    State(app): State<Arc<App>>,
    AppJson(create): AppJson<CreatePartnerRequest>,
) -> Result<impl IntoResponse, AppError> {
    Ok((StatusCode::CREATED, Json(app.create_partner(create).await?)))
}

pub async fn handle_analytics(
    Path(code): Path<String>,
    State(app): State<Arc<App>>,
) -> Result<Json<Analytics>, AppError> {
    info!("handle_analytics: {}", code);

    Ok(Json(app.analytics(&code).await?))
}

pub async fn handle_method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

pub async fn handle_not_found() -> AppError {
    AppError::NotFound("Not found".to_string())
}
