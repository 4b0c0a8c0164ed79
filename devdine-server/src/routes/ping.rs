//! Generic ping route.

use crate::error::AppResult;
use axum::{self, http::StatusCode};

/// GET handler for internal pings and availability
#[utoipa::path(
    get,
    path = "/ping",
    responses(
        (status = 200, description = "Ping successful"),
    )
)]
pub async fn get() -> AppResult<StatusCode> {
    Ok(StatusCode::OK)
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http::Request};
    use http::StatusCode;
    use testresult::TestResult;
    use tower::ServiceExt;

    use crate::test_utils::test_context::TestContext;

    #[test_log::test(tokio::test)]
    async fn test_ping() -> TestResult {
        let ctx = TestContext::new();

        let response = ctx
            .app()
            .oneshot(Request::builder().uri("/ping").body(Body::empty())?)
            .await?;

        assert_eq!(response.status(), StatusCode::OK);

        Ok(())
    }
}
