use crate::config::ConfigError;
use crate::notifications::NotificationError;
use crate::questions::QuestionBankError;
use crate::screening::{LifecycleError, SubmissionError};
use crate::storage::StorageError;
use crate::telemetry::TelemetryError;
use crate::validation::ValidationError;
use crate::wallet::WalletError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Validation(ValidationError),
    Lifecycle(LifecycleError),
    Submission(SubmissionError),
    Notification(NotificationError),
    QuestionBank(QuestionBankError),
    Wallet(WalletError),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Lifecycle(err) => match err {
                LifecycleError::NotFound(_) => StatusCode::NOT_FOUND,
                LifecycleError::PreconditionFailed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                LifecycleError::ConcurrencyConflict(_) => StatusCode::CONFLICT,
                LifecycleError::Storage(err) => storage_status(err),
            },
            AppError::Submission(err) => match err {
                SubmissionError::MissingChildName
                | SubmissionError::NoAnswers
                | SubmissionError::DuplicateAnswer(_)
                | SubmissionError::UnknownQuestion(_)
                | SubmissionError::QuestionOutOfRange { .. } => StatusCode::BAD_REQUEST,
                SubmissionError::Storage(err) => storage_status(err),
                SubmissionError::QuestionBank(_) | SubmissionError::Scoring(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            AppError::Notification(err) => match err {
                NotificationError::Validation(_) => StatusCode::BAD_REQUEST,
                NotificationError::NotFound(_) => StatusCode::NOT_FOUND,
                NotificationError::Storage(err) => storage_status(err),
            },
            AppError::Wallet(err) => match err {
                WalletError::InvalidAmount => StatusCode::BAD_REQUEST,
                WalletError::Overflow { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                WalletError::Storage(err) => storage_status(err),
            },
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::QuestionBank(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn storage_status(err: &StorageError) -> StatusCode {
    match err {
        StorageError::NotFound => StatusCode::NOT_FOUND,
        StorageError::Conflict => StatusCode::CONFLICT,
        StorageError::InvalidState(_) => StatusCode::UNPROCESSABLE_ENTITY,
        StorageError::Unavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Validation(err) => write!(f, "{}", err),
            AppError::Lifecycle(err) => write!(f, "{}", err),
            AppError::Submission(err) => write!(f, "{}", err),
            AppError::Notification(err) => write!(f, "{}", err),
            AppError::QuestionBank(err) => write!(f, "question bank error: {}", err),
            AppError::Wallet(err) => write!(f, "wallet error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Validation(err) => Some(err),
            AppError::Lifecycle(err) => Some(err),
            AppError::Submission(err) => Some(err),
            AppError::Notification(err) => Some(err),
            AppError::QuestionBank(err) => Some(err),
            AppError::Wallet(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<ValidationError> for AppError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<LifecycleError> for AppError {
    fn from(value: LifecycleError) -> Self {
        Self::Lifecycle(value)
    }
}

impl From<SubmissionError> for AppError {
    fn from(value: SubmissionError) -> Self {
        Self::Submission(value)
    }
}

impl From<NotificationError> for AppError {
    fn from(value: NotificationError) -> Self {
        Self::Notification(value)
    }
}

impl From<QuestionBankError> for AppError {
    fn from(value: QuestionBankError) -> Self {
        Self::QuestionBank(value)
    }
}

impl From<WalletError> for AppError {
    fn from(value: WalletError) -> Self {
        Self::Wallet(value)
    }
}
