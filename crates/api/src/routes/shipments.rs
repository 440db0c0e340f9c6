//! Shipment route handlers.

use axum::{
    Json,
    body::Bytes,
    extract::{Query, State},
    http::{Method, StatusCode, Uri},
};
use serde::Serialize;
use serde_json::Value;

use shipments_core::{ShipmentFilter, TrackingNumber, ValidationError, parse_shipments};

use crate::error::{AppError, Result};
use crate::models::Shipment;
use crate::state::AppState;

/// Response for a successfully recorded batch.
#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub message: &'static str,
    pub tracking_numbers: Vec<TrackingNumber>,
}

/// Record a batch of shipments.
///
/// The body must be a non-empty JSON array of shipment objects. The batch is
/// validated as a whole and persisted in a single transaction.
///
/// # Errors
///
/// - `AppError::NoData` if the body is empty, `null`, `[]` or `{}`
/// - `AppError::InvalidData` if the body or any record fails validation
/// - `AppError::Repository` if persisting fails
pub async fn create(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Result<(StatusCode, Json<CreatedResponse>)> {
    let path = uri.path();

    let payload = match decode_payload(&body) {
        Ok(Some(payload)) => payload,
        Ok(None) => {
            tracing::error!(%method, path, "No data provided");
            return Err(AppError::NoData);
        }
        Err(e) => {
            tracing::error!(%method, path, error = %e, "Invalid data format or missing required fields");
            return Err(AppError::InvalidData(e));
        }
    };

    let shipments = payload
        .as_array()
        .ok_or(ValidationError::NotAnArray)
        .and_then(|records| parse_shipments(records))
        .map_err(|e| {
            tracing::error!(%method, path, error = %e, "Invalid data format or missing required fields");
            AppError::InvalidData(e)
        })?;

    let tracking_numbers = state
        .shipments()
        .insert_shipments(&shipments)
        .await
        .inspect_err(|_| tracing::error!(%method, path, "Insertion error"))?;

    tracing::info!(
        %method,
        path,
        count = tracking_numbers.len(),
        "Shipments created successfully"
    );

    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            message: "Shipments created successfully",
            tracking_numbers,
        }),
    ))
}

/// List shipments matching the query filters.
///
/// Accepts `carrier`, `date=start:end` and `price=start:end`; no filters
/// lists every shipment.
///
/// # Errors
///
/// - `AppError::MalformedQuery` if any other query key is present
/// - `AppError::InvalidQuery` if a range filter cannot be parsed
/// - `AppError::Repository` if the query fails
pub async fn list(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<Shipment>>> {
    let path = uri.path();

    if !params.iter().all(|(key, _)| ShipmentFilter::is_known_key(key)) {
        tracing::error!(%method, path, "Malformed query params");
        return Err(AppError::MalformedQuery);
    }

    let filter = ShipmentFilter::from_params(params).map_err(|e| {
        tracing::error!(%method, path, error = %e, "Invalid query param format");
        AppError::InvalidQuery(e)
    })?;

    let shipments = state
        .shipments()
        .fetch_shipments(&filter)
        .await
        .inspect_err(|_| tracing::error!(%method, path, "Fetch error"))?;

    tracing::info!(
        %method,
        path,
        count = shipments.len(),
        "Shipments fetched successfully"
    );

    Ok(Json(shipments))
}

/// Decode a request body, returning `None` when it carries no data.
fn decode_payload(body: &[u8]) -> std::result::Result<Option<Value>, ValidationError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    let value: Value =
        serde_json::from_slice(body).map_err(|e| ValidationError::MalformedJson(e.to_string()))?;

    let empty = match &value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
        _ => false,
    };

    Ok((!empty).then_some(value))
}
