pub mod import;
pub mod ledger;
pub mod stock;
