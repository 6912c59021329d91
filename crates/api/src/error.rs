use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sched_core::BuildError;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::error;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Conflict(String),
    Unprocessable(String),
    Build(BuildError),
    Internal(anyhow::Error),
}

impl From<BuildError> for ApiError {
    fn from(e: BuildError) -> Self {
        ApiError::Build(e)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        ApiError::Internal(e)
    }
}

/// `{ message, ..payload }` with the payload's fields flattened in.
fn with_message(message: String, payload: impl Serialize) -> Value {
    let mut body = json!({ "message": message });
    if let (Some(obj), Ok(Value::Object(extra))) =
        (body.as_object_mut(), serde_json::to_value(payload))
    {
        obj.extend(extra);
    }
    body
}

fn status_and_body(err: ApiError) -> (StatusCode, Value) {
    match err {
        ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, json!({ "message": m })),
        ApiError::Conflict(m) => (StatusCode::CONFLICT, json!({ "message": m })),
        ApiError::Unprocessable(m) => (StatusCode::UNPROCESSABLE_ENTITY, json!({ "message": m })),
        ApiError::Internal(e) => {
            error!(error = %format!("{e:#}"), "request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "message": format!("{e:#}") }),
            )
        }
        ApiError::Build(e) => {
            let message = e.to_string();
            match e {
                BuildError::SubjectInfeasible(p) => {
                    (StatusCode::UNPROCESSABLE_ENTITY, with_message(message, p))
                }
                BuildError::CapacityExceeded(p) => {
                    (StatusCode::UNPROCESSABLE_ENTITY, with_message(message, p))
                }
                BuildError::PlacementExhausted(r) => {
                    (StatusCode::CONFLICT, with_message(message, r))
                }
                BuildError::Upstream(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, json!({ "message": message }))
                }
                BuildError::Persistence { built, .. } => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    with_message(message, *built),
                ),
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = status_and_body(self);
        (status, Json(body)).into_response()
    }
}
