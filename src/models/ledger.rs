use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Inflow,
    Outflow,
}

/// One purchase (inflow) or sale (outflow) in a product's ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub unit: i64,
    pub quantity: i32,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockSummary {
    pub product: i64,
    pub purchased: i64,
    pub sold: i64,
    pub available: i64,
}
