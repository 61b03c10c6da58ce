//! API Client Module
//!
//! HTTP communication with the K-HIGH backend. Every request passes through
//! the interceptor chain before it is sent.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, Request, Response, StatusCode, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use crate::interceptor::Interceptor;

/// API client for the K-HIGH backend
pub struct ApiClient {
    base_url: Url,
    client: reqwest::Client,
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("interceptors", &self.interceptors.len())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a new API client
    pub fn new(
        base_url: &str,
        timeout: Duration,
        interceptors: Vec<Arc<dyn Interceptor>>,
    ) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        // Trailing slash so relative paths join under the base path
        let base_url = Url::parse(&format!("{}/", base_url.trim_end_matches('/')))
            .map_err(|e| ApiError::InvalidUrl(e.to_string()))?;

        Ok(Self {
            base_url,
            client,
            interceptors,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve `path` against the base URL. The result must stay on the
    /// backend's origin and under its base path, since the interceptors
    /// attach credentials to whatever is returned here.
    pub fn url(&self, path: &str) -> Result<Url, ApiError> {
        let url = self
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::InvalidUrl(e.to_string()))?;

        let same_origin = url.scheme() == self.base_url.scheme()
            && url.host_str() == self.base_url.host_str()
            && url.port_or_known_default() == self.base_url.port_or_known_default();
        if !same_origin || !url.path().starts_with(self.base_url.path()) {
            warn!("Refusing request outside the backend base URL");
            return Err(ApiError::InvalidUrl(format!(
                "{} is outside {}",
                path, self.base_url
            )));
        }

        Ok(url)
    }

    /// Start a request for `path`; finish it and hand it to [`Self::execute`]
    pub fn request(&self, method: Method, path: &str) -> Result<reqwest::RequestBuilder, ApiError> {
        Ok(self.client.request(method, self.url(path)?))
    }

    /// Run the interceptor chain in order, then send
    pub async fn execute(&self, request: Request) -> Result<Response, ApiError> {
        let request = self
            .interceptors
            .iter()
            .fold(request, |request, stage| stage.intercept(request));

        debug!("{} {}", request.method(), request.url());

        self.client
            .execute(request)
            .await
            .map_err(|e| ApiError::Network(e.without_url().to_string()))
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let request = self.build(self.request(Method::GET, path)?)?;
        let response = check(self.execute(request).await?).await?;
        parse(response).await
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.build(self.request(Method::POST, path)?.json(body))?;
        let response = check(self.execute(request).await?).await?;
        parse(response).await
    }

    pub async fn put_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.build(self.request(Method::PUT, path)?.json(body))?;
        let response = check(self.execute(request).await?).await?;
        parse(response).await
    }

    /// Send a body and ignore whatever comes back on success
    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<(), ApiError> {
        let request = self.build(self.request(Method::POST, path)?.json(body))?;
        check(self.execute(request).await?).await?;
        Ok(())
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        let request = self.build(self.request(Method::DELETE, path)?)?;
        check(self.execute(request).await?).await?;
        Ok(())
    }

    fn build(&self, builder: reqwest::RequestBuilder) -> Result<Request, ApiError> {
        builder
            .build()
            .map_err(|e| ApiError::InvalidUrl(e.to_string()))
    }
}

/// Turn a non-success status into an [`ApiError`]
async fn check(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = match response.json::<ErrorResponse>().await {
        Ok(body) => body.into_message(),
        Err(_) => None,
    }
    .unwrap_or_else(|| format!("Status: {}", status));

    if status == StatusCode::UNAUTHORIZED {
        warn!("Backend rejected credentials");
        return Err(ApiError::Unauthorized(message));
    }

    Err(ApiError::Server {
        status: status.as_u16(),
        message,
    })
}

async fn parse<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    response
        .json::<T>()
        .await
        .map_err(|e| ApiError::Parse(e.to_string()))
}

#[derive(Deserialize)]
struct ErrorResponse {
    message: Option<String>,
    error: Option<String>,
}

impl ErrorResponse {
    fn into_message(self) -> Option<String> {
        self.message.or(self.error)
    }
}

/// API errors
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_resolve_under_base_path() {
        let api = ApiClient::new("http://host.test/api/", Duration::from_secs(5), vec![]).unwrap();
        assert_eq!(api.url("/users/me").unwrap().as_str(), "http://host.test/api/users/me");
        assert_eq!(api.url("caretakers").unwrap().as_str(), "http://host.test/api/caretakers");
    }

    #[test]
    fn paths_outside_the_backend_are_rejected() {
        let api = ApiClient::new("http://host.test/api", Duration::from_secs(5), vec![]).unwrap();

        for path in [
            "http://elsewhere.test/steal",
            "https://host.test/api/users/me",
            "http://host.test:8081/api/users/me",
            "http://host.test/other",
            "../admin",
        ] {
            assert!(
                matches!(api.url(path), Err(ApiError::InvalidUrl(_))),
                "{path} should be rejected"
            );
        }

        assert_eq!(
            api.url("http://host.test/api/users/me").unwrap().as_str(),
            "http://host.test/api/users/me"
        );
    }

    #[test]
    fn rejects_unparseable_base_url() {
        let err = ApiClient::new("not a url", Duration::from_secs(5), vec![]).unwrap_err();
        assert!(matches!(err, ApiError::InvalidUrl(_)));
    }
}
