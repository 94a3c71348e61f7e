use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;

use crate::{error::AppError, models::Validate};

/// JSON body that has passed `Validate`. Yields the validated output, so
/// `ValidJson<ProductPayload>` hands the handler a `NewProduct`.
pub struct ValidJson<T: Validate>(pub T::Output);

#[async_trait]
impl<S, T> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(payload) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e: JsonRejection| AppError::MalformedBody(e.body_text()))?;
        Ok(ValidJson(payload.validate()?))
    }
}
