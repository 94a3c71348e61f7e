use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{purchase::quantity_field, require, Validate};
use crate::error::FieldErrors;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Sale {
    pub id: i64,
    #[serde(rename = "product")]
    pub product_id: i64,
    pub quantity: i32,
    pub sales_date: DateTime<Utc>,
    #[serde(rename = "import_batch")]
    pub import_batch_id: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SalePayload {
    pub product: Option<i64>,
    pub quantity: Option<i64>,
    pub sales_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSale {
    pub product_id: i64,
    pub quantity: i32,
    pub sales_date: DateTime<Utc>,
    pub import_batch_id: Option<i64>,
}

impl Validate for SalePayload {
    type Output = NewSale;

    fn validate(self) -> Result<NewSale, FieldErrors> {
        let mut errors = FieldErrors::new();

        let product_id = require(&mut errors, "product", self.product);
        let quantity = require(&mut errors, "quantity", self.quantity);
        let quantity = quantity_field(&mut errors, quantity);
        let sales_date = require(&mut errors, "sales_date", self.sales_date);

        match (product_id, quantity, sales_date) {
            (Some(product_id), Some(quantity), Some(sales_date)) if errors.is_empty() => {
                Ok(NewSale {
                    product_id,
                    quantity,
                    sales_date,
                    import_batch_id: None,
                })
            }
            _ => Err(errors),
        }
    }
}
