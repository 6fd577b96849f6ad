use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use log::error;
use solupi_engine::{ErrorKind, IngestionError, OrderFlowError};
use thiserror::Error;

use crate::data_objects::JsonResponse;

const INTERNAL_ERROR_MESSAGE: &str = "An internal error occurred. Please try again later.";

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("{0}")]
    NoRecordFound(String),
    #[error("{0}")]
    InsufficientPermissions(String),
    #[error("{0}")]
    ValidationError(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    ServiceUnavailable(String),
}

impl ServerError {
    fn from_kind(kind: ErrorKind, message: String) -> Self {
        match kind {
            ErrorKind::Validation => Self::ValidationError(message),
            ErrorKind::NotFound => Self::NoRecordFound(message),
            ErrorKind::Forbidden => Self::InsufficientPermissions(message),
            ErrorKind::Conflict | ErrorKind::NotYetAvailable => Self::Conflict(message),
            ErrorKind::TransientNetwork => Self::ServiceUnavailable(message),
            ErrorKind::Irrecoverable | ErrorKind::Internal => Self::BackendError(message),
        }
    }

    /// The message that is sent to the client. Details of server-side failures are only logged.
    pub fn public_message(&self) -> String {
        match self.status_code() {
            s if s.is_server_error() && !matches!(self, Self::ServiceUnavailable(_)) => INTERNAL_ERROR_MESSAGE.into(),
            _ => self.to_string(),
        }
    }
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.status_code().is_server_error() {
            error!("💻️ {self}");
        }
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .json(JsonResponse::<()>::failure(self.public_message()))
    }
}

impl From<OrderFlowError> for ServerError {
    fn from(e: OrderFlowError) -> Self {
        Self::from_kind(e.kind(), e.to_string())
    }
}

impl From<IngestionError> for ServerError {
    fn from(e: IngestionError) -> Self {
        Self::from_kind(e.kind(), e.to_string())
    }
}
