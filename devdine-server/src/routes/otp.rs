//! Email verification code routes

use crate::{
    app_state::AppState,
    error::{AppError, AppResult},
    extract::json::Json,
    setups::{ServerSetup, VerificationCodeSender},
};
use axum::{extract::State, http::StatusCode};
use devdine_core::{
    common::{ErrorResponse, OtpIssuedResponse, OtpRequest, OtpVerifyRequest, SuccessResponse},
    otp_code::OtpCode,
};

/// POST handler for issuing a verification code
#[utoipa::path(
    post,
    path = "/otp",
    request_body = OtpRequest,
    responses(
        (status = 200, description = "Verification code issued", body = OtpIssuedResponse),
        (status = 400, description = "Invalid email address", body = ErrorResponse),
        (status = 500, description = "Code could not be delivered", body = ErrorResponse),
    )
)]
pub async fn issue<S: ServerSetup>(
    State(state): State<AppState<S>>,
    Json(request): Json<OtpRequest>,
) -> AppResult<(StatusCode, Json<OtpIssuedResponse>)> {
    let email = state.email_policy.parse(&request.email)?;

    let challenge = state.otp_store.issue(&email);

    if let Err(err) = state
        .verification_code_sender
        .send_code(&email, challenge.code.as_str())
        .await
    {
        state.otp_store.discard(&email, &challenge.code);
        return Err(AppError::internal(err, "Failed to send verification code"));
    }

    metrics::increment_counter!("otp_issued_total");
    tracing::info!(%email, expires_at = %challenge.expires_at, "issued verification code");

    let otp = state.echo_codes.then(|| challenge.code.to_string());

    Ok((
        StatusCode::OK,
        Json(OtpIssuedResponse {
            success: true,
            otp,
            expires_at: challenge.expires_at,
        }),
    ))
}

/// PUT handler for checking a verification code
#[utoipa::path(
    put,
    path = "/otp",
    request_body = OtpVerifyRequest,
    responses(
        (status = 200, description = "Email verified", body = SuccessResponse),
        (status = 400, description = "Malformed email or code", body = ErrorResponse),
        (status = 401, description = "Wrong, expired or used code", body = ErrorResponse),
    )
)]
pub async fn verify<S: ServerSetup>(
    State(state): State<AppState<S>>,
    Json(request): Json<OtpVerifyRequest>,
) -> AppResult<(StatusCode, Json<SuccessResponse>)> {
    let email = state.email_policy.parse(&request.email)?;
    let code: OtpCode = request.otp.parse()?;

    let result = state.otp_store.verify(&email, &code);

    let outcome = match &result {
        Ok(()) => "verified",
        Err(err) => err.as_label(),
    };
    metrics::increment_counter!("otp_verifications_total", "outcome" => outcome);

    if let Err(err) = result {
        tracing::info!(%email, outcome, "verification code rejected");
        return Err(err.into());
    }

    tracing::info!(%email, "email verified");

    Ok((StatusCode::OK, Json(SuccessResponse { success: true })))
}
