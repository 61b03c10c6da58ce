//! Request Interceptors
//!
//! Stages that see every outgoing request before it is sent.

use std::sync::Arc;

use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::Request;
use tracing::{debug, warn};

use crate::auth::TokenProvider;

/// A stage in the outgoing request pipeline
pub trait Interceptor: Send + Sync {
    fn intercept(&self, request: Request) -> Request;
}

/// Adds `Authorization: Bearer <access token>` to requests that carry no
/// `Authorization` header of their own.
pub struct AuthInterceptor {
    tokens: Arc<dyn TokenProvider>,
}

impl AuthInterceptor {
    pub fn new(tokens: Arc<dyn TokenProvider>) -> Self {
        Self { tokens }
    }
}

impl Interceptor for AuthInterceptor {
    fn intercept(&self, mut request: Request) -> Request {
        if request.headers().contains_key(AUTHORIZATION) {
            debug!(url = %request.url(), "Request carries its own Authorization header");
            return request;
        }

        let Some(token) = self.tokens.access_token() else {
            debug!(url = %request.url(), "No access token, sending unauthenticated");
            return request;
        };

        match HeaderValue::from_str(&format!("Bearer {}", token)) {
            Ok(mut value) => {
                value.set_sensitive(true);
                request.headers_mut().insert(AUTHORIZATION, value);
            }
            Err(_) => {
                // Token is not a valid header value; never echo it
                warn!("Stored access token is not a valid header value, sending unauthenticated");
            }
        }

        request
    }
}
