use crate::errors::{ApiError, ServiceError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Standard success response
pub fn success_response<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(data)).into_response()
}

/// Standard created response
pub fn created_response<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(data)).into_response()
}

/// Map service errors to API errors
pub fn map_service_error(err: ServiceError) -> ApiError {
    ApiError::ServiceError(err)
}

/// Parses a path id; malformed ids read as a missing record
pub fn parse_id(raw: &str, not_found: &str) -> Result<Uuid, ServiceError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ServiceError::NotFound(not_found.to_string()))
}

fn normalize_optional_string(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

pub fn parse_decimal(value: &str, field: &str) -> Result<Decimal, ApiError> {
    Decimal::from_str(value.trim())
        .map_err(|_| ApiError::ValidationError(format!("{field} must be a number")))
}

/// Blank means absent
pub fn parse_optional_decimal(value: &str, field: &str) -> Result<Option<Decimal>, ApiError> {
    normalize_optional_string(value)
        .map(|v| parse_decimal(v, field))
        .transpose()
}

pub fn parse_optional_i32(value: &str, field: &str) -> Result<Option<i32>, ApiError> {
    normalize_optional_string(value)
        .map(|v| {
            v.parse::<i32>()
                .map_err(|_| ApiError::ValidationError(format!("{field} must be a whole number")))
        })
        .transpose()
}

/// Form checkboxes: only the literal `true` is set
pub fn parse_flag(value: &str) -> bool {
    value.trim() == "true"
}

/// JSON-encoded form field; blank means absent
pub fn parse_json_field<T: DeserializeOwned>(value: &str, field: &str) -> Result<Option<T>, ApiError> {
    normalize_optional_string(value)
        .map(|v| {
            serde_json::from_str(v)
                .map_err(|e| ApiError::ValidationError(format!("Invalid JSON in {field}: {e}")))
        })
        .transpose()
}
