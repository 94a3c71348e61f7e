use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::{Multipart, WithRejection};

use crate::{
    error::{AppError, AppResult, FieldErrors},
    models::{import_batch::FILE_NAME_MAX_LEN, ImportBatch, ImportStatus},
    services::import,
    AppState,
};

struct Upload {
    file_name: String,
    data: Bytes,
}

async fn read_upload(mut multipart: Multipart) -> AppResult<Upload> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::MalformedBody(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload.csv").to_string();
        let length = file_name.chars().count();
        if length > FILE_NAME_MAX_LEN {
            return Err(FieldErrors::single(
                "file",
                format!(
                    "Ensure this filename has at most {FILE_NAME_MAX_LEN} characters (it has {length})."
                ),
            )
            .into());
        }
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::MalformedBody(e.to_string()))?;
        return Ok(Upload { file_name, data });
    }
    Err(FieldErrors::single("file", "No file was submitted.").into())
}

/// Keeps the uploaded file and opens a batch for its rows.
async fn open_batch(state: &AppState, upload: &Upload, status: ImportStatus) -> AppResult<ImportBatch> {
    let path = import::save_upload(&state.upload_dir, &upload.file_name, &upload.data).await?;
    let batch = state
        .repos
        .import_batches
        .insert(&upload.file_name, status)
        .await?;
    log::info!(
        "import batch {} opened for {} (stored at {})",
        batch.id,
        upload.file_name,
        path.display()
    );
    Ok(batch)
}

/// Imports every row before responding. Rows before a failing row stay
/// persisted.
pub async fn import_sales(
    State(state): State<AppState>,
    WithRejection(multipart, _): WithRejection<Multipart, AppError>,
) -> AppResult<StatusCode> {
    let upload = read_upload(multipart).await?;
    let batch = open_batch(&state, &upload, ImportStatus::Synchronous).await?;
    import::import_sales(&state.repos, batch.id, &upload.data).await?;
    Ok(StatusCode::CREATED)
}

pub async fn import_sales_async(
    State(state): State<AppState>,
    WithRejection(multipart, _): WithRejection<Multipart, AppError>,
) -> AppResult<(StatusCode, Json<ImportBatch>)> {
    let upload = read_upload(multipart).await?;
    let batch = open_batch(&state, &upload, ImportStatus::AsyncPending).await?;
    import::spawn_import(state.repos.clone(), batch.clone(), upload.data);
    Ok((StatusCode::ACCEPTED, Json(batch)))
}

pub async fn get_import_batch(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, AppError>,
) -> AppResult<Json<ImportBatch>> {
    let batch = state
        .repos
        .import_batches
        .find_by_id(id)
        .await?
        .ok_or(AppError::NotFound {
            entity: "import batch",
            id,
        })?;
    Ok(Json(batch))
}
