pub mod auth;
pub mod imports;
pub mod inventory;
pub mod products;
pub mod purchases;
pub mod sales;

use axum::Json;
use serde_json::{json, Value};

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
