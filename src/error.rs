use rocket::http::{ContentType, Status};
use rocket::request::Request;
use rocket::response::{self, Responder, Response};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use std::io::Cursor;
use std::sync::PoisonError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("invalid input: {0}")]
    Validation(String),
    /// A version-stamped update observed a concurrent bump. The single shared
    /// connection serializes requests today, so this fires only once the
    /// store moves to a multi-connection pool; callers should retry.
    #[error("{0} was modified concurrently, retry the request")]
    Conflict(&'static str),
    #[error("external service failure: {0}")]
    ExternalService(String),
    #[error("storage failure: {0}")]
    Transaction(#[from] rusqlite::Error),
    #[error("internal error: {0}")]
    Internal(String),
}

impl<T> From<PoisonError<T>> for ApiError {
    fn from(e: PoisonError<T>) -> ApiError {
        ApiError::Internal(e.to_string())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, _request: &'r Request<'_>) -> response::Result<'static> {
        let (status, message) = match &self {
            ApiError::NotFound(_) => (Status::NotFound, self.to_string()),
            ApiError::Validation(_) => (Status::BadRequest, self.to_string()),
            ApiError::Conflict(_) => (Status::Conflict, self.to_string()),
            ApiError::ExternalService(_) => (Status::BadGateway, self.to_string()),
            // Internal details are logged, never surfaced to the caller.
            ApiError::Transaction(_) | ApiError::Internal(_) => {
                error!("request failed: {}", self);
                (Status::InternalServerError, "internal error".to_string())
            }
        };

        let body = serde_json::to_string(&ErrorBody {
            success: false,
            error: message,
        })
        .unwrap_or_else(|_| String::from(r#"{"success":false}"#));

        Response::build()
            .status(status)
            .header(ContentType::JSON)
            .sized_body(body.len(), Cursor::new(body))
            .ok()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
