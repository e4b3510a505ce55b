//! Input validation extractors for the Routy API
//!
//! This module provides:
//! - `ValidatedJson<T>` - An Axum extractor that validates request bodies
//! - Custom validators for location names, timestamps and order batches

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use routy_core::util::parse_timestamp;
use routy_core::Order;

/// Default body size limit: 1MB
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// Maximum length of a location name
pub const MAX_LOCATION_LEN: usize = 128;

/// Error type for validated JSON extraction
#[derive(Debug)]
pub struct ValidationError {
    pub message: String,
}

impl IntoResponse for ValidationError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "success": false,
            "error": self.message,
            "error_type": "validation_error"
        });
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

/// A JSON extractor that validates the request body using the validator crate
///
/// Usage:
/// ```ignore
/// async fn handler(ValidatedJson(payload): ValidatedJson<MyRequest>) -> impl IntoResponse {
///     // payload is guaranteed to be valid
/// }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ValidationError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection: JsonRejection| ValidationError {
                message: format!("Invalid JSON: {}", rejection),
            })?;

        value.validate().map_err(|e| ValidationError {
            message: format!("Validation failed: {}", e),
        })?;

        Ok(ValidatedJson(value))
    }
}

fn invalid(code: &'static str, message: String) -> validator::ValidationError {
    let mut err = validator::ValidationError::new(code);
    err.message = Some(message.into());
    err
}

/// Location names must be non-blank and reasonably short
pub fn validate_location(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() {
        return Err(invalid("blank_location", "Location must not be blank".to_string()));
    }
    if value.len() > MAX_LOCATION_LEN {
        return Err(invalid(
            "location_too_long",
            format!("Location must be at most {} bytes", MAX_LOCATION_LEN),
        ));
    }
    Ok(())
}

/// Timestamps are ISO-8601, with or without an offset
pub fn validate_timestamp(value: &str) -> Result<(), validator::ValidationError> {
    parse_timestamp(value)
        .map(|_| ())
        .map_err(|e| invalid("invalid_timestamp", e.to_string()))
}

/// Every order needs a priority in 1..=10 and a usable origin and destination
pub fn validate_orders(orders: &[Order]) -> Result<(), validator::ValidationError> {
    for order in orders {
        if !order.has_valid_priority() {
            return Err(invalid(
                "invalid_priority",
                format!(
                    "Order {} priority must be between 1 and 10, got {}",
                    order.id, order.priority
                ),
            ));
        }
        validate_location(&order.origin)?;
        validate_location(&order.destination)?;
    }
    Ok(())
}
