use actix_web::{HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::otp::OtpError;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiErrorBody {
    #[schema(example = "Invalid OTP")]
    pub error: String,
    /// Provider message, only present on delivery failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("{0}")] BadRequest(String),
    #[error("{error}")] Internal { error: String, details: String },
}

impl From<OtpError> for ApiError {
    fn from(e: OtpError) -> Self {
        match e {
            OtpError::Delivery(inner) => ApiError::Internal {
                error: "Email failed".into(),
                details: inner.to_string(),
            },
            other => ApiError::BadRequest(other.to_string()),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        use actix_web::http::StatusCode;
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            ApiError::BadRequest(msg) => ApiErrorBody { error: msg.clone(), details: None },
            ApiError::Internal { error, details } => ApiErrorBody { error: error.clone(), details: Some(details.clone()) },
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}
