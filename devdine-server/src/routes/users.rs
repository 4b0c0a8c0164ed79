//! User Routes

use crate::{
    app_state::AppState,
    error::{AppError, AppResult},
    extract::json::Json,
    models::user::UpsertOutcome,
    setups::{ServerSetup, UserStore},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use devdine_core::common::{ErrorResponse, UpsertUserRequest, UpsertUserResponse, UserResponse};
use validator::Validate;

/// POST handler for creating or updating a user
#[utoipa::path(
    post,
    path = "/users",
    request_body = UpsertUserRequest,
    responses(
        (status = 201, description = "User created", body = UpsertUserResponse),
        (status = 200, description = "User updated", body = UpsertUserResponse),
        (status = 400, description = "Missing name or invalid email", body = ErrorResponse),
        (status = 500, description = "User could not be saved", body = ErrorResponse),
    )
)]
pub async fn upsert<S: ServerSetup>(
    State(state): State<AppState<S>>,
    Json(request): Json<UpsertUserRequest>,
) -> AppResult<(StatusCode, Json<UpsertUserResponse>)> {
    let request = UpsertUserRequest {
        name: request.name.trim().to_string(),
        email: request.email.trim().to_string(),
    };

    request
        .validate()
        .map_err(|_| AppError::bad_request("Missing name or email"))?;

    let email = state.email_policy.parse(&request.email)?;

    let outcome = state
        .user_store
        .upsert(&request.name, &email)
        .await
        .map_err(|err| AppError::internal(err, "Failed to save user"))?;

    metrics::increment_counter!("users_upserted_total", "outcome" => outcome.as_label());
    tracing::info!(%email, id = outcome.id(), outcome = outcome.as_label(), "saved user");

    let (status, message) = match outcome {
        UpsertOutcome::Created { .. } => (StatusCode::CREATED, "User created"),
        UpsertOutcome::Updated { .. } => (StatusCode::OK, "User updated"),
    };

    Ok((
        status,
        Json(UpsertUserResponse {
            success: true,
            id: outcome.id(),
            message: message.to_string(),
        }),
    ))
}

/// GET handler for a user by email address
#[utoipa::path(
    get,
    path = "/users/{email}",
    params(
        ("email" = String, Path, description = "Email address of the user")
    ),
    responses(
        (status = 200, description = "Found user", body = UserResponse),
        (status = 400, description = "Invalid email", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
    )
)]
pub async fn get_user<S: ServerSetup>(
    State(state): State<AppState<S>>,
    Path(email): Path<String>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    let email = state.email_policy.parse(&email)?;

    let user = state
        .user_store
        .find_by_email(&email)
        .await
        .map_err(|err| AppError::internal(err, "Failed to load user"))?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    Ok((StatusCode::OK, Json(user.into())))
}

#[cfg(test)]
mod tests {
    use crate::test_utils::{route_builder::RouteBuilder, test_context::TestContext};
    use devdine_core::common::{
        ErrorResponse, OtpIssuedResponse, SuccessResponse, UpsertUserResponse, UserResponse,
    };
    use http::{Method, StatusCode};
    use serde_json::json;
    use testresult::TestResult;

    async fn upsert(
        ctx: &TestContext,
        body: serde_json::Value,
    ) -> anyhow::Result<(StatusCode, serde_json::Value)> {
        RouteBuilder::new(ctx.app(), Method::POST, "/users")
            .with_json_body(body)?
            .into_json_response()
            .await
    }

    #[test_log::test(tokio::test)]
    async fn test_create_then_update() -> TestResult {
        let ctx = TestContext::new();

        let (status, created) = RouteBuilder::new(ctx.app(), Method::POST, "/users")
            .with_json_body(json!({ "name": "Alice", "email": "alice@example.com" }))?
            .into_json_response::<UpsertUserResponse>()
            .await?;

        assert_eq!(status, StatusCode::CREATED);
        assert!(created.success);
        assert_eq!(created.message, "User created");

        let (status, updated) = RouteBuilder::new(ctx.app(), Method::POST, "/users")
            .with_json_body(json!({ "name": "Alicia", "email": "Alice@Example.com" }))?
            .into_json_response::<UpsertUserResponse>()
            .await?;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated.message, "User updated");
        assert_eq!(updated.id, created.id);
        assert_eq!(ctx.user_store().len(), 1);

        let (status, user) = RouteBuilder::new(ctx.app(), Method::GET, "/users/alice@example.com")
            .into_json_response::<UserResponse>()
            .await?;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(user.id, created.id);
        assert_eq!(user.name, "Alicia");
        assert_eq!(user.email, "alice@example.com");
        assert!(user.updated_at.is_some());

        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_missing_fields() -> TestResult {
        let ctx = TestContext::new();

        for body in [
            json!({}),
            json!({ "name": "Alice" }),
            json!({ "email": "alice@example.com" }),
            json!({ "name": "   ", "email": "alice@example.com" }),
            json!({ "name": "Alice", "email": "" }),
        ] {
            let (status, response) = upsert(&ctx, body.clone()).await?;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
            assert_eq!(response, json!({ "error": "Missing name or email" }));
        }

        assert_eq!(ctx.user_store().len(), 0);

        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_invalid_email() -> TestResult {
        let ctx = TestContext::new();

        let (status, response) =
            upsert(&ctx, json!({ "name": "Alice", "email": "alice@example" })).await?;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response, json!({ "error": "Please enter a valid email" }));
        assert_eq!(ctx.user_store().len(), 0);

        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_store_failure_is_opaque() -> TestResult {
        let ctx = TestContext::new();
        ctx.user_store().break_connection();

        let (status, response) = RouteBuilder::new(ctx.app(), Method::POST, "/users")
            .with_json_body(json!({ "name": "Alice", "email": "alice@example.com" }))?
            .into_json_response::<ErrorResponse>()
            .await?;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.error, "Failed to save user");

        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_get_unknown_user() -> TestResult {
        let ctx = TestContext::new();

        let (status, response) = RouteBuilder::new(ctx.app(), Method::GET, "/users/bob@example.com")
            .into_json_response::<ErrorResponse>()
            .await?;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(response.error, "User not found");

        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_verify_then_register() -> TestResult {
        let ctx = TestContext::new();

        let (status, issued) = RouteBuilder::new(ctx.app(), Method::POST, "/otp")
            .with_json_body(json!({ "email": "alice@example.com" }))?
            .into_json_response::<OtpIssuedResponse>()
            .await?;
        assert_eq!(status, StatusCode::OK);

        let otp = issued.otp.ok_or("code not echoed")?;

        let (status, verified) = RouteBuilder::new(ctx.app(), Method::PUT, "/otp")
            .with_json_body(json!({ "email": "alice@example.com", "otp": otp }))?
            .into_json_response::<SuccessResponse>()
            .await?;
        assert_eq!(status, StatusCode::OK);
        assert!(verified.success);

        let (status, created) =
            upsert(&ctx, json!({ "name": "Alice", "email": "alice@example.com" })).await?;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["message"], json!("User created"));

        let (status, updated) =
            upsert(&ctx, json!({ "name": "Alicia", "email": "alice@example.com" })).await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["message"], json!("User updated"));
        assert_eq!(updated["id"], created["id"]);

        assert_eq!(ctx.user_store().len(), 1);

        Ok(())
    }
}
