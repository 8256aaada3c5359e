//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use rollcall_core::Error as CoreError;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error(transparent)]
  Core(#[from] CoreError),
}

impl ApiError {
  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::Core(e) => core_status(e),
    }
  }
}

fn core_status(e: &CoreError) -> StatusCode {
  match e {
    CoreError::InvalidTimeFormat { .. }
    | CoreError::InvalidShiftName(_)
    | CoreError::InvalidDuration { .. }
    | CoreError::InvalidCheckInTime { .. }
    | CoreError::TooSoon { .. }
    | CoreError::NoActiveShift { .. } => StatusCode::BAD_REQUEST,

    CoreError::UnknownShift(_)
    | CoreError::UnknownUser(_)
    | CoreError::NotAssigned { .. } => StatusCode::NOT_FOUND,

    CoreError::DuplicateShiftName(_)
    | CoreError::DuplicateUser(_)
    | CoreError::AlreadyAssigned { .. }
    | CoreError::ShiftInUse { .. }
    | CoreError::AlreadyComplete { .. }
    | CoreError::Conflict(_) => StatusCode::CONFLICT,

    CoreError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    (status, Json(json!({ "error": self.to_string() }))).into_response()
  }
}
