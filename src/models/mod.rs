pub mod import_batch;
pub mod ledger;
pub mod product;
pub mod purchase;
pub mod sale;
pub mod user;

use crate::error::FieldErrors;

pub use import_batch::{ImportBatch, ImportStatus};
pub use ledger::{EntryType, LedgerEntry, StockSummary};
pub use product::{NewProduct, Product, ProductPayload};
pub use purchase::{NewPurchase, Purchase, PurchasePayload};
pub use sale::{NewSale, Sale, SalePayload};
pub use user::{Credentials, LoginRequest, NewUser, User};

/// Turns a loosely-typed request body into a checked domain value.
///
/// Payload structs keep every field optional so that a missing field is
/// reported as a field error instead of a deserialization failure.
pub trait Validate {
    type Output;

    fn validate(self) -> Result<Self::Output, FieldErrors>;
}

pub(crate) fn require<T>(errors: &mut FieldErrors, field: &str, value: Option<T>) -> Option<T> {
    if value.is_none() {
        errors.required(field);
    }
    value
}

pub(crate) fn non_negative(errors: &mut FieldErrors, field: &str, value: Option<i64>) -> Option<i64> {
    match value {
        Some(v) if v < 0 => {
            errors.add(field, "Ensure this value is greater than or equal to 0.");
            None
        }
        other => other,
    }
}
