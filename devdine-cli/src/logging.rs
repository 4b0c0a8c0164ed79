//! Request logging for the HTTP client

use reqwest::{Request, Response};
use reqwest_middleware::{Middleware, Next};
use task_local_extensions::Extensions;

/// Logs every request and the status it came back with.
///
/// Bodies aren't logged, they carry verification codes.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LogRequestsMiddleware;

#[async_trait::async_trait]
impl Middleware for LogRequestsMiddleware {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        let url = req.url().clone();
        let method = req.method().clone();

        tracing::debug!(%url, %method, "Running request");

        match next.run(req, extensions).await {
            Ok(resp) => {
                let status = resp.status();
                if status.is_server_error() {
                    tracing::error!(%url, %method, ?status, "Server error on response");
                } else if status.is_client_error() {
                    tracing::warn!(%url, %method, ?status, "Client error on response");
                } else {
                    tracing::debug!(%url, %method, ?status, "Got response");
                }
                Ok(resp)
            }
            Err(e) => {
                tracing::error!(%url, %method, err = %e, "Request failed");
                Err(e)
            }
        }
    }
}
