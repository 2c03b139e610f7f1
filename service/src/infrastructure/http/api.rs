use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::domain::course::CourseError;
use crate::domain::enrollment::EnrollmentError;
use crate::domain::identity::AccessError;
use crate::domain::payment_provider::WebhookError;
use crate::domain::repository::RepositoryError;

// ApiSuccess is a wrapper around a response that includes a status code.

#[derive(Debug, Clone)]
pub struct ApiSuccess<T: Serialize>(StatusCode, Json<T>);

impl<T: Serialize> ApiSuccess<T> {
    pub(crate) fn new(status: StatusCode, data: T) -> Self {
        ApiSuccess(status, Json(data))
    }

    pub(crate) fn ok(data: T) -> Self {
        Self::new(StatusCode::OK, data)
    }
}

impl<T: Serialize> IntoResponse for ApiSuccess<T> {
    fn into_response(self) -> Response {
        (self.0, self.1).into_response()
    }
}

// ApiError is a wrapper around a response that includes a status code.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized,
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    UnprocessableEntity(String),
    InternalServerError(String),
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        Self::InternalServerError(e.to_string())
    }
}

impl From<RepositoryError> for ApiError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::NotFound => Self::NotFound("Not found".to_string()),
            RepositoryError::UniqueViolation(cause) => {
                tracing::debug!(constraint = %cause, "unique violation");
                Self::Conflict("Already exists".to_string())
            }
            RepositoryError::DatabaseError(cause) => Self::InternalServerError(cause),
        }
    }
}

impl From<AccessError> for ApiError {
    fn from(value: AccessError) -> Self {
        match value {
            AccessError::Unauthenticated | AccessError::NotPermitted => Self::Unauthorized,
            AccessError::Banned => Self::Forbidden(value.to_string()),
            AccessError::Repository(e) => e.into(),
        }
    }
}

impl From<CourseError> for ApiError {
    fn from(value: CourseError) -> Self {
        match value {
            CourseError::CourseNotFound
            | CourseError::ChapterNotFound
            | CourseError::AttachmentNotFound => Self::NotFound(value.to_string()),
            CourseError::MissingRequiredFields(_) | CourseError::Invalid(_) => {
                Self::BadRequest(value.to_string())
            }
            CourseError::Repository(e) => e.into(),
        }
    }
}

impl From<EnrollmentError> for ApiError {
    fn from(value: EnrollmentError) -> Self {
        match value {
            EnrollmentError::CourseNotFound | EnrollmentError::PaymentNotFound => {
                Self::NotFound(value.to_string())
            }
            EnrollmentError::AlreadyEnrolled
            | EnrollmentError::AlreadyPurchased
            | EnrollmentError::CapacityReached => Self::BadRequest(value.to_string()),
            EnrollmentError::AlreadyApproved => Self::Conflict(value.to_string()),
            EnrollmentError::Repository(e) => e.into(),
        }
    }
}

impl From<WebhookError> for ApiError {
    fn from(value: WebhookError) -> Self {
        match value {
            WebhookError::InvalidSignature => Self::BadRequest(value.to_string()),
            WebhookError::InvalidPayload(_) => Self::BadRequest(value.to_string()),
        }
    }
}

impl ApiError {
    /// Logs the failure under the handler tag and passes the error through.
    pub fn tagged<E: Into<ApiError>>(tag: &'static str) -> impl Fn(E) -> ApiError {
        move |error| {
            let error: ApiError = error.into();
            match &error {
                ApiError::InternalServerError(_) => tracing::warn!(tag, "request failed"),
                other => tracing::debug!(tag, error = ?other, "request refused"),
            }
            error
        }
    }

    fn status_and_message(self) -> (StatusCode, String) {
        use ApiError::*;

        match self {
            BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            Forbidden(message) => (StatusCode::FORBIDDEN, message),
            NotFound(message) => (StatusCode::NOT_FOUND, message),
            Conflict(message) => (StatusCode::CONFLICT, message),
            UnprocessableEntity(message) => (StatusCode::UNPROCESSABLE_ENTITY, message),
            InternalServerError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::InternalServerError(cause) = &self {
            tracing::error!("{}", cause);
        }
        let (status, message) = self.status_and_message();
        (status, Json(ApiResponseBody::new_error(status, message))).into_response()
    }
}

// Generic response structure shared by all API responses.

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiResponseBody<T: Serialize + PartialEq> {
    pub status_code: u16,
    pub data: T,
}

impl ApiResponseBody<ApiErrorData> {
    pub fn new_error(status_code: StatusCode, message: String) -> Self {
        Self {
            status_code: status_code.as_u16(),
            data: ApiErrorData { message },
        }
    }
}

/// The response data format for all error responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiErrorData {
    pub message: String,
}
