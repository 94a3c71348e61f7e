use crate::error::{AppError, AppResult};

/// Purchased minus sold.
pub fn available(purchased: i64, sold: i64) -> i64 {
    purchased - sold
}

/// Rejects a sale of `requested` units when it would take the product's
/// available stock below zero. Returns the stock left after the sale.
pub fn ensure_available(product_id: i64, purchased: i64, sold: i64, requested: i64) -> AppResult<i64> {
    let available = available(purchased, sold);
    if requested > available {
        log::warn!(
            "rejecting sale of {} for product {}: only {} available",
            requested,
            product_id,
            available
        );
        return Err(AppError::InsufficientStock {
            product_id,
            available,
            requested,
        });
    }
    Ok(available - requested)
}
