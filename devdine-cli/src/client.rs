//! Typed client for the devdine server API

use crate::logging::LogRequestsMiddleware;
use devdine_core::{
    common::{
        ErrorResponse, OtpIssuedResponse, OtpRequest, OtpVerifyRequest, SuccessResponse,
        UpsertUserRequest, UpsertUserResponse, UserResponse,
    },
    email::Email,
    otp_code::OtpCode,
};
use reqwest::{Client, Method, Response, StatusCode};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, RequestBuilder};
use serde::de::DeserializeOwned;
use url::Url;

/// Ways a call to the server can fail.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The server answered with an error status.
    #[error("{message}")]
    Rejected {
        /// Response status
        status: StatusCode,
        /// The `error` field of the response, or the status reason
        message: String,
    },
    /// The server couldn't be reached.
    #[error("Couldn't reach the server: {0}")]
    Transport(#[from] reqwest_middleware::Error),
    /// The server answered with something unexpected.
    #[error("Unexpected response from the server: {0}")]
    Decode(#[from] reqwest::Error),
    /// The endpoint URL couldn't be put together.
    #[error("Invalid API endpoint: {0}")]
    Url(#[from] url::ParseError),
}

impl ClientError {
    /// Whether the server refused a verification code.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Rejected { status, .. } if *status == StatusCode::UNAUTHORIZED)
    }
}

/// Client for the devdine server.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: ClientWithMiddleware,
    api_endpoint: Url,
}

impl ApiClient {
    /// Create a client talking to the server at `api_endpoint`
    pub fn new(api_endpoint: Url) -> Self {
        let client = ClientBuilder::new(Client::new())
            .with(LogRequestsMiddleware)
            .build();

        Self {
            client,
            api_endpoint,
        }
    }

    /// Ask the server to issue a verification code for `email`.
    pub async fn issue_code(&self, email: &Email) -> Result<OtpIssuedResponse, ClientError> {
        let response = self
            .server_request(Method::POST, "otp")?
            .json(&OtpRequest {
                email: email.to_string(),
            })
            .send()
            .await?;

        parse_json(response).await
    }

    /// Submit a verification code for `email`.
    pub async fn verify_code(&self, email: &Email, code: &OtpCode) -> Result<(), ClientError> {
        let response = self
            .server_request(Method::PUT, "otp")?
            .json(&OtpVerifyRequest {
                email: email.to_string(),
                otp: code.to_string(),
            })
            .send()
            .await?;

        let _: SuccessResponse = parse_json(response).await?;
        Ok(())
    }

    /// Create or update the user record for `email`.
    pub async fn save_user(
        &self,
        name: &str,
        email: &Email,
    ) -> Result<UpsertUserResponse, ClientError> {
        let response = self
            .server_request(Method::POST, "users")?
            .json(&UpsertUserRequest {
                name: name.to_string(),
                email: email.to_string(),
            })
            .send()
            .await?;

        parse_json(response).await
    }

    /// Fetch the user record for `email`, if there is one.
    pub async fn get_user(&self, email: &Email) -> Result<Option<UserResponse>, ClientError> {
        let response = self
            .server_request(Method::GET, &format!("users/{email}"))?
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        parse_json(response).await.map(Some)
    }

    fn server_request(&self, method: Method, path: &str) -> Result<RequestBuilder, ClientError> {
        let url = self.api_endpoint.join(path)?;
        Ok(self.client.request(method, url))
    }
}

async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let response = handle_failure(response).await?;
    Ok(response.json().await?)
}

async fn handle_failure(response: Response) -> Result<Response, ClientError> {
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    let message = match response.json::<ErrorResponse>().await {
        Ok(body) => body.error,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("Unknown error")
            .to_string(),
    };

    Err(ClientError::Rejected { status, message })
}
