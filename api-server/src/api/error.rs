use crate::validation::ValidationError;
use rocket::http::Status;
use rocket::response::{self, Responder, Response};
use rocket::serde::json::Json;
use rocket::{catch, Request};
use serde_json::{json, Value};

/// Errors returned to HTTP clients as `{"error": ...}` bodies
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidInput(#[from] ValidationError),
    #[error("User not found")]
    NotFound,
    #[error("Too many requests. Please try again later.")]
    RateLimited { retry_after: u64 },
    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    pub fn status(&self) -> Status {
        match self {
            ApiError::InvalidInput(_) => Status::BadRequest,
            ApiError::NotFound => Status::NotFound,
            ApiError::RateLimited { .. } => Status::TooManyRequests,
            ApiError::Internal => Status::InternalServerError,
        }
    }

    fn body(&self) -> Value {
        match self {
            ApiError::RateLimited { retry_after } => json!({
                "error": self.to_string(),
                "retryAfter": retry_after,
            }),
            _ => json!({ "error": self.to_string() }),
        }
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, request: &'r Request<'_>) -> response::Result<'static> {
        let mut response = Response::build_from(Json(self.body()).respond_to(request)?);
        response.status(self.status());
        if let ApiError::RateLimited { retry_after } = self {
            response.raw_header("Retry-After", retry_after.to_string());
        }
        response.ok()
    }
}

#[catch(400)]
pub fn bad_request() -> Json<Value> {
    Json(json!({ "error": "Bad request" }))
}

#[catch(404)]
pub fn not_found() -> Json<Value> {
    Json(json!({ "error": "Not found" }))
}

#[catch(422)]
pub fn unprocessable() -> Json<Value> {
    Json(json!({ "error": "Malformed request body" }))
}

#[catch(500)]
pub fn internal_error() -> Json<Value> {
    Json(json!({ "error": "Internal server error" }))
}
