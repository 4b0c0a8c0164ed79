//! Generic result/error resprentation(s).

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use devdine_core::{common::ErrorResponse, email::EmailError, otp_code::OtpCodeError};
use std::convert::Infallible;
use validator::ValidationErrors;

use crate::models::otp::OtpError;

/// Standard return type out of routes / handlers
pub type AppResult<T> = std::result::Result<T, AppError>;

/// An error on its way out to the client.
///
/// Rendered as `{ "error": "<message>" }` where the message is the
/// `detail` if present, otherwise the canonical reason of the status
/// code. Anything that ends up in `detail` is shown to the caller, so
/// server side failures are logged and replaced with an opaque message
/// before they get here (see [`AppError::internal`]).
#[derive(thiserror::Error, Eq, PartialEq, Debug)]
pub struct AppError {
    pub(crate) status: StatusCode,
    pub(crate) detail: Option<String>,
    pub(crate) title: Option<String>,
}

impl AppError {
    /// New instance of [AppError].
    pub fn new<M: ToString>(status_code: StatusCode, message: Option<M>) -> AppError {
        Self {
            status: status_code,
            title: Self::canonical_reason_to_string(&status_code),
            detail: message.map(|m| m.to_string()),
        }
    }

    /// [AppError] for [StatusCode::BAD_REQUEST].
    pub fn bad_request<M: ToString>(message: M) -> AppError {
        Self::new(StatusCode::BAD_REQUEST, Some(message))
    }

    /// [AppError] for [StatusCode::UNAUTHORIZED].
    pub fn unauthorized<M: ToString>(message: M) -> AppError {
        Self::new(StatusCode::UNAUTHORIZED, Some(message))
    }

    /// [AppError] for [StatusCode::NOT_FOUND].
    pub fn not_found<M: ToString>(message: M) -> AppError {
        Self::new(StatusCode::NOT_FOUND, Some(message))
    }

    /// Log `err` with all its detail and return an opaque
    /// [StatusCode::INTERNAL_SERVER_ERROR] carrying only `public_message`.
    pub fn internal<E, M>(err: E, public_message: M) -> AppError
    where
        E: std::fmt::Debug,
        M: ToString,
    {
        tracing::error!(
            subject = "app_error",
            category = "internal",
            error = ?err,
            "internal error while handling request"
        );
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, Some(public_message))
    }

    /// The HTTP status of this error.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The message shown to the client.
    pub fn message(&self) -> String {
        self.detail
            .clone()
            .or_else(|| self.title.clone())
            .unwrap_or_else(|| self.status.as_str().to_string())
    }

    fn canonical_reason_to_string(status_code: &StatusCode) -> Option<String> {
        status_code.canonical_reason().map(|r| r.to_string())
    }
}

impl From<&AppError> for ErrorResponse {
    fn from(e: &AppError) -> Self {
        Self { error: e.message() }
    }
}

impl From<AppError> for (StatusCode, Json<ErrorResponse>) {
    fn from(app_error: AppError) -> Self {
        let body = ErrorResponse::from(&app_error);
        (app_error.status, Json(body))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let error_response: (StatusCode, Json<ErrorResponse>) = self.into();
        error_response.into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        let err = match err.downcast::<ValidationErrors>() {
            Ok(err) => return Self::from(err),
            Err(e) => e,
        };

        let err = match err.downcast::<OtpError>() {
            Ok(err) => return Self::from(err),
            Err(e) => e,
        };

        Self::internal(err, "Internal Server Error")
    }
}

impl From<diesel::result::Error> for AppError {
    fn from(err: diesel::result::Error) -> Self {
        match err {
            diesel::result::Error::NotFound => Self::not_found("Resource Not Found"),
            _ => Self::internal(err, "Internal Server Error"),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        Self::bad_request(err)
    }
}

impl From<EmailError> for AppError {
    fn from(err: EmailError) -> Self {
        tracing::debug!(%err, "rejected email address");
        Self::bad_request("Please enter a valid email")
    }
}

impl From<OtpCodeError> for AppError {
    fn from(_: OtpCodeError) -> Self {
        Self::bad_request("Please enter a valid 6-digit OTP")
    }
}

impl From<OtpError> for AppError {
    fn from(err: OtpError) -> Self {
        Self::unauthorized(err)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<Infallible> for AppError {
    fn from(the_impossible: Infallible) -> Self {
        match the_impossible {}
    }
}

// Needed to support thiserror::Error, outputs debug for AppError
impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

#[cfg(test)]
/// Parse the error body out of a response
pub(crate) async fn parse_error(response: Response) -> ErrorResponse {
    let body_bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    serde_json::from_slice(&body_bytes).unwrap()
}
