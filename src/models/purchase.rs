use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{non_negative, require, Validate};
use crate::error::FieldErrors;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Purchase {
    pub id: i64,
    #[serde(rename = "product")]
    pub product_id: i64,
    pub quantity: i32,
    pub purchase_date: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PurchasePayload {
    pub product: Option<i64>,
    pub quantity: Option<i64>,
    pub purchase_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPurchase {
    pub product_id: i64,
    pub quantity: i32,
    pub purchase_date: DateTime<Utc>,
}

impl Validate for PurchasePayload {
    type Output = NewPurchase;

    fn validate(self) -> Result<NewPurchase, FieldErrors> {
        let mut errors = FieldErrors::new();

        let product_id = require(&mut errors, "product", self.product);
        let quantity = require(&mut errors, "quantity", self.quantity);
        let quantity = quantity_field(&mut errors, quantity);
        let purchase_date = require(&mut errors, "purchase_date", self.purchase_date);

        match (product_id, quantity, purchase_date) {
            (Some(product_id), Some(quantity), Some(purchase_date)) if errors.is_empty() => {
                Ok(NewPurchase {
                    product_id,
                    quantity,
                    purchase_date,
                })
            }
            _ => Err(errors),
        }
    }
}

/// Range-checks a quantity: non-negative and small enough for an `INTEGER` column.
pub(crate) fn quantity_field(errors: &mut FieldErrors, value: Option<i64>) -> Option<i32> {
    let value = non_negative(errors, "quantity", value)?;
    match i32::try_from(value) {
        Ok(quantity) => Some(quantity),
        Err(_) => {
            errors.add(
                "quantity",
                format!("Ensure this value is less than or equal to {}.", i32::MAX),
            );
            None
        }
    }
}
