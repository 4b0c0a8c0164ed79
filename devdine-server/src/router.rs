//! Main [axum::Router] interface for webserver.

use crate::{
    app_state::AppState,
    docs::ApiDoc,
    middleware::{
        self,
        logging::{log_request_response, DebugOnlyLogger, Logger, REQUEST_ID},
        request_ulid::MakeRequestUlid,
        runtime,
    },
    routes::{fallback::notfound_404, health, otp, ping, users},
    setups::ServerSetup,
};
use axum::{
    http::{self, HeaderName},
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    ServiceBuilderExt,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Setup main router for application.
pub fn setup_app_router<S: ServerSetup>(app_state: AppState<S>) -> Router {
    // The form is served from a different origin than the API.
    let cors = CorsLayer::new()
        .allow_methods([http::Method::GET, http::Method::POST, http::Method::PUT])
        .allow_headers([http::header::CONTENT_TYPE, http::header::ACCEPT])
        .allow_origin(Any);

    let api_router = Router::new()
        .route("/otp", post(otp::issue::<S>).put(otp::verify::<S>))
        .route("/users", post(users::upsert::<S>))
        .route("/users/:email", get(users::get_user::<S>))
        .route("/ping", get(ping::get))
        .layer(cors)
        .layer(axum::middleware::from_fn(log_request_response::<Logger>))
        .with_state(app_state.clone());

    // Healthcheck layer
    let healthcheck_router = Router::new()
        .route("/healthcheck", get(health::healthcheck::<S>))
        .layer(axum::middleware::from_fn(
            log_request_response::<DebugOnlyLogger>,
        ))
        .with_state(app_state);

    Router::merge(api_router, healthcheck_router)
        .route_layer(axum::middleware::from_fn(middleware::metrics::track))
        .fallback(notfound_404)
}

/// Wrap the application router with the outer service layers and the
/// OpenAPI documentation routes.
pub fn with_service_layers(router: Router, timeout: Duration) -> Router {
    let req_id = HeaderName::from_static(REQUEST_ID);

    router
        // Set and propagate "x-request-id" (as a ulid) per request.
        .layer(
            ServiceBuilder::new()
                .set_request_id(req_id.clone(), MakeRequestUlid)
                .propagate_request_id(req_id),
        )
        // Applies the `tower_http::timeout::Timeout` middleware which
        // applies a timeout to requests.
        .layer(TimeoutLayer::new(timeout))
        // Catches runtime panics and converts them into
        // `500 Internal Server` responses.
        .layer(CatchPanicLayer::custom(runtime::catch_panic))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{route_builder::RouteBuilder, test_context::TestContext};
    use axum::{body::Body, http::Request};
    use http::{Method, StatusCode};
    use testresult::TestResult;
    use tower::ServiceExt;

    #[test_log::test(tokio::test)]
    async fn test_request_id_is_set_and_propagated() -> TestResult {
        let ctx = TestContext::new();
        let app = with_service_layers(ctx.app(), Duration::from_secs(5));

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/ping").body(Body::empty())?)
            .await?;

        let request_id = response
            .headers()
            .get(REQUEST_ID)
            .ok_or("missing request id")?
            .to_str()?;
        assert!(request_id.parse::<ulid::Ulid>().is_ok());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/ping")
                    .header(REQUEST_ID, "from-the-client")
                    .body(Body::empty())?,
            )
            .await?;

        assert_eq!(
            response.headers().get(REQUEST_ID).ok_or("missing request id")?,
            "from-the-client"
        );

        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_openapi_document_served() -> TestResult {
        let ctx = TestContext::new();
        let app = with_service_layers(ctx.app(), Duration::from_secs(5));

        let (status, doc) = RouteBuilder::new(app, Method::GET, "/api-doc/openapi.json")
            .into_json_response::<serde_json::Value>()
            .await?;

        assert_eq!(status, StatusCode::OK);
        assert!(doc["paths"]["/otp"]["post"].is_object());
        assert!(doc["paths"]["/otp"]["put"].is_object());
        assert!(doc["paths"]["/users"]["post"].is_object());

        Ok(())
    }
}
