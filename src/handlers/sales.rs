use axum::{extract::State, http::StatusCode, Extension, Json};

use crate::{
    error::AppResult,
    middleware::AuthenticatedUser,
    models::{Sale, SalePayload},
    utils::ValidJson,
    AppState,
};

pub async fn list_sales(State(state): State<AppState>) -> AppResult<Json<Vec<Sale>>> {
    Ok(Json(state.repos.sales.list().await?))
}

/// Records a sale only if the product has enough stock for it.
pub async fn create_sale(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    ValidJson(sale): ValidJson<SalePayload>,
) -> AppResult<(StatusCode, Json<Sale>)> {
    let sale = state.repos.sales.record_checked(sale).await?;
    log::info!(
        "sale {} of {} x product {} recorded by {}",
        sale.id,
        sale.quantity,
        sale.product_id,
        user.username
    );
    Ok((StatusCode::CREATED, Json(sale)))
}
