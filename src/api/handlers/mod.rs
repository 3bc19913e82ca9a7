use axum::{extract::rejection::JsonRejection, Json};
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::runs::FieldError;

pub mod feedback;
pub mod health;
pub mod runs;

/// Unwrap a JSON body, reporting malformed payloads as validation errors
pub(crate) fn json_body<T>(body: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    body.map(|Json(payload)| payload).map_err(|rejection| AppError::Validation {
        errors: vec![FieldError {
            loc: vec![Value::from("body")],
            msg: rejection.body_text(),
            kind: "value_error".to_string(),
        }],
        body: Value::Null,
    })
}
