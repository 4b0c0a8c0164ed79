//! OpenAPI doc generation.

use crate::routes::{health, otp, ping, users};
use devdine_core::common::{
    ErrorResponse, OtpIssuedResponse, OtpRequest, OtpVerifyRequest, SuccessResponse,
    UpsertUserRequest, UpsertUserResponse, UserResponse,
};
use utoipa::OpenApi;

/// API documentation generator.
#[derive(OpenApi)]
#[openapi(
    paths(
        health::healthcheck,
        ping::get,
        otp::issue,
        otp::verify,
        users::upsert,
        users::get_user,
    ),
    components(
        schemas(
            ErrorResponse,
            OtpRequest,
            OtpVerifyRequest,
            OtpIssuedResponse,
            SuccessResponse,
            UpsertUserRequest,
            UpsertUserResponse,
            UserResponse,
            health::HealthcheckResponse
        )
    ),
)]

/// Tied to OpenAPI documentation.
#[derive(Debug)]
pub struct ApiDoc;
