use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::WithRejection;

use crate::{
    error::{AppError, AppResult},
    models::{Product, ProductPayload},
    utils::ValidJson,
    AppState,
};

fn not_found(id: i64) -> AppError {
    AppError::NotFound {
        entity: "product",
        id,
    }
}

pub async fn list_products(State(state): State<AppState>) -> AppResult<Json<Vec<Product>>> {
    Ok(Json(state.repos.products.list().await?))
}

pub async fn get_product(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, AppError>,
) -> AppResult<Json<Product>> {
    let product = state
        .repos
        .products
        .find_by_id(id)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(product))
}

pub async fn create_product(
    State(state): State<AppState>,
    ValidJson(product): ValidJson<ProductPayload>,
) -> AppResult<(StatusCode, Json<Product>)> {
    let product = state.repos.products.insert(product).await?;
    log::info!("product {} created", product.id);
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, AppError>,
    ValidJson(product): ValidJson<ProductPayload>,
) -> AppResult<Json<Product>> {
    let product = state
        .repos
        .products
        .update(id, product)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(product))
}

pub async fn delete_product(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, AppError>,
) -> AppResult<StatusCode> {
    if !state.repos.products.delete(id).await? {
        return Err(not_found(id));
    }
    log::info!("product {} deleted", id);
    Ok(StatusCode::OK)
}
