use axum::{
    extract::{Path, State},
    Json,
};
use axum_extra::extract::WithRejection;

use crate::{
    error::{AppError, AppResult},
    models::{LedgerEntry, Product, StockSummary},
    services::{ledger, stock},
    AppState,
};

async fn load_product(state: &AppState, id: i64) -> AppResult<Product> {
    state
        .repos
        .products
        .find_by_id(id)
        .await?
        .ok_or(AppError::NotFound {
            entity: "product",
            id,
        })
}

/// Purchases and sales of one product, merged and ordered by date.
pub async fn product_ledger(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, AppError>,
) -> AppResult<Json<Vec<LedgerEntry>>> {
    let product = load_product(&state, id).await?;
    let purchases = state.repos.purchases.list_by_product(id).await?;
    let sales = state.repos.sales.list_by_product(id).await?;

    Ok(Json(ledger::merge(product.price, purchases, sales)))
}

pub async fn product_stock(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, AppError>,
) -> AppResult<Json<StockSummary>> {
    load_product(&state, id).await?;
    let purchased = state.repos.purchases.sum_quantity_by_product(id).await?;
    let sold = state.repos.sales.sum_quantity_by_product(id).await?;

    Ok(Json(StockSummary {
        product: id,
        purchased,
        sold,
        available: stock::available(purchased, sold),
    }))
}
