use axum::{extract::State, http::StatusCode, Json};

use crate::{
    error::AppResult,
    models::{Purchase, PurchasePayload},
    utils::ValidJson,
    AppState,
};

pub async fn list_purchases(State(state): State<AppState>) -> AppResult<Json<Vec<Purchase>>> {
    Ok(Json(state.repos.purchases.list().await?))
}

pub async fn create_purchase(
    State(state): State<AppState>,
    ValidJson(purchase): ValidJson<PurchasePayload>,
) -> AppResult<(StatusCode, Json<Purchase>)> {
    let purchase = state.repos.purchases.insert(purchase).await?;
    Ok((StatusCode::CREATED, Json(purchase)))
}
