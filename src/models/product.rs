use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{non_negative, require, Validate};
use crate::error::FieldErrors;

pub const NAME_MAX_LEN: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: i64,
    pub name: String,
    /// Unit price, in the smallest currency unit.
    pub price: i64,
    pub description: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductPayload {
    pub name: Option<String>,
    pub price: Option<i64>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub name: String,
    pub price: i64,
    pub description: String,
}

impl Validate for ProductPayload {
    type Output = NewProduct;

    fn validate(self) -> Result<NewProduct, FieldErrors> {
        let mut errors = FieldErrors::new();

        let name = match require(&mut errors, "name", self.name.map(|n| n.trim().to_string())) {
            Some(name) if name.is_empty() => {
                errors.add("name", "This field may not be blank.");
                None
            }
            Some(name) if name.chars().count() > NAME_MAX_LEN => {
                errors.add(
                    "name",
                    format!("Ensure this field has no more than {NAME_MAX_LEN} characters."),
                );
                None
            }
            other => other,
        };
        let price = require(&mut errors, "price", self.price);
        let price = non_negative(&mut errors, "price", price);

        match (name, price) {
            (Some(name), Some(price)) if errors.is_empty() => Ok(NewProduct {
                name,
                price,
                description: self.description.unwrap_or_default(),
            }),
            _ => Err(errors),
        }
    }
}
