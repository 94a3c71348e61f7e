//! Bulk import of sales from an uploaded CSV file.
//!
//! The file needs a header row with `product`, `date` and `quantity`
//! columns. Rows are inserted one at a time with no enclosing transaction
//! and no stock check: the first bad row stops the import, and rows before
//! it stay in the batch.

use std::path::{Path, PathBuf};

use axum::body::Bytes;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use tokio::{fs, task::JoinHandle};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{ImportBatch, ImportStatus, NewSale},
    store::Repositories,
};

#[derive(Debug, Deserialize)]
struct RawRow {
    product: String,
    date: String,
    quantity: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleRow {
    /// Line in the file, counting the header as line 1.
    pub line: usize,
    pub product_id: i64,
    pub sales_date: DateTime<Utc>,
    pub quantity: i32,
}

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS` (UTC) and `YYYY-MM-DD`.
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(date) = DateTime::parse_from_rfc3339(value) {
        return Some(date.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(date) = NaiveDateTime::parse_from_str(value, format) {
            return Some(date.and_utc());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|d| d.and_utc())
}

fn parse_row(line: usize, raw: RawRow) -> AppResult<SaleRow> {
    let fail = |message: String| AppError::Import { line, message };

    let product_id = raw
        .product
        .trim()
        .parse::<i64>()
        .map_err(|_| fail(format!("invalid product id {:?}", raw.product)))?;
    let sales_date =
        parse_date(&raw.date).ok_or_else(|| fail(format!("invalid date {:?}", raw.date)))?;
    let quantity = raw
        .quantity
        .trim()
        .parse::<i32>()
        .ok()
        .filter(|q| *q >= 0)
        .ok_or_else(|| fail(format!("invalid quantity {:?}", raw.quantity)))?;

    Ok(SaleRow {
        line,
        product_id,
        sales_date,
        quantity,
    })
}

/// Parses the file lazily, one row per item, so a bad row only surfaces
/// when the import reaches it.
pub fn parse_rows(data: &[u8]) -> impl Iterator<Item = AppResult<SaleRow>> + '_ {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(data)
        .into_deserialize::<RawRow>()
        .enumerate()
        .map(|(index, record)| {
            let line = index + 2;
            let raw = record.map_err(|e| AppError::Import {
                line,
                message: format!("malformed row: {e}"),
            })?;
            parse_row(line, raw)
        })
}

/// Writes the upload under `dir` with a collision-free name.
pub async fn save_upload(dir: &Path, file_name: &str, data: &[u8]) -> AppResult<PathBuf> {
    if !dir.exists() {
        fs::create_dir_all(dir).await?;
    }
    let base = Path::new(file_name)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .unwrap_or("upload.csv");
    let path = dir.join(format!("{}-{}", Uuid::new_v4(), base));
    fs::write(&path, data).await?;
    Ok(path)
}

/// Inserts every row as a sale of `batch_id`. Returns the number of rows imported.
pub async fn import_sales(repos: &Repositories, batch_id: i64, data: &[u8]) -> AppResult<usize> {
    let mut imported = 0;
    for row in parse_rows(data) {
        let row = row?;
        if repos.products.find_by_id(row.product_id).await?.is_none() {
            return Err(AppError::Import {
                line: row.line,
                message: format!("product {} does not exist", row.product_id),
            });
        }
        repos
            .sales
            .insert(NewSale {
                product_id: row.product_id,
                quantity: row.quantity,
                sales_date: row.sales_date,
                import_batch_id: Some(batch_id),
            })
            .await?;
        imported += 1;
    }
    log::info!("import batch {}: {} sales imported", batch_id, imported);
    Ok(imported)
}

/// Imports in the background and marks the batch done on success. A failed
/// import is logged and leaves the batch pending.
pub fn spawn_import(repos: Repositories, batch: ImportBatch, data: Bytes) -> JoinHandle<()> {
    tokio::spawn(async move {
        let result: AppResult<()> = async {
            import_sales(&repos, batch.id, &data).await?;
            repos
                .import_batches
                .set_status(batch.id, ImportStatus::AsyncDone)
                .await
        }
        .await;

        if let Err(e) = result {
            log::error!("import batch {} ({}) failed: {}", batch.id, batch.file_name, e);
        }
    })
}
