//! Middleware-driven HTTP transport.
//!
//! Every call goes through the same pipeline: request stages run in
//! registration order on the built `reqwest::Request`, the request is sent,
//! non-success statuses are classified into `TransportError`, and response
//! stages run in registration order on the outcome.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{header, Client, Method, Request, RequestBuilder, Response, Url};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use super::TransportError;

/// Default base URL of the card shop service
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api";

/// HTTP request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Transform applied to every outgoing request.
pub trait RequestStage: Send + Sync {
    fn name(&self) -> &'static str;

    fn on_request(&self, request: Request) -> Result<Request, TransportError>;
}

/// Transform applied to every response or failure.
pub trait ResponseStage: Send + Sync {
    fn name(&self) -> &'static str;

    fn on_response(
        &self,
        ctx: &RequestContext,
        outcome: Result<Response, TransportError>,
    ) -> Result<Response, TransportError>;
}

/// What a response stage knows about the request that produced its outcome.
#[derive(Clone)]
pub struct RequestContext {
    pub method: Method,
    pub url: Url,
    /// Bearer token the request was actually sent with
    pub bearer: Option<String>,
}

impl RequestContext {
    fn from_request(request: &Request) -> Self {
        let bearer = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::to_string);
        Self {
            method: request.method().clone(),
            url: request.url().clone(),
            bearer,
        }
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("method", &self.method)
            .field("url", &self.url.as_str())
            .field("bearer", &self.bearer.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// HTTP client for the card shop service.
/// Clone is cheap - the reqwest client and the stage lists are shared.
#[derive(Clone)]
pub struct Transport {
    client: Client,
    base_url: String,
    request_stages: Arc<Vec<Arc<dyn RequestStage>>>,
    response_stages: Arc<Vec<Arc<dyn ResponseStage>>>,
}

pub struct TransportBuilder {
    base_url: String,
    timeout: Duration,
    request_stages: Vec<Arc<dyn RequestStage>>,
    response_stages: Vec<Arc<dyn ResponseStage>>,
}

impl TransportBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn request_stage(mut self, stage: impl RequestStage + 'static) -> Self {
        self.request_stages.push(Arc::new(stage));
        self
    }

    pub fn response_stage(mut self, stage: impl ResponseStage + 'static) -> Self {
        self.response_stages.push(Arc::new(stage));
        self
    }

    pub fn build(self) -> Result<Transport, TransportError> {
        Url::parse(&self.base_url).map_err(|e| {
            TransportError::InvalidRequest(format!("bad base URL {}: {}", self.base_url, e))
        })?;

        let client = Client::builder().timeout(self.timeout).build()?;

        Ok(Transport {
            client,
            base_url: self.base_url.trim_end_matches('/').to_string(),
            request_stages: Arc::new(self.request_stages),
            response_stages: Arc::new(self.response_stages),
        })
    }
}

impl Transport {
    pub fn builder(base_url: impl Into<String>) -> TransportBuilder {
        TransportBuilder {
            base_url: base_url.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            request_stages: Vec::new(),
            response_stages: Vec::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Stage names in the order they run, for diagnostics.
    pub fn stage_names(&self) -> (Vec<&'static str>, Vec<&'static str>) {
        (
            self.request_stages.iter().map(|s| s.name()).collect(),
            self.response_stages.iter().map(|s| s.name()).collect(),
        )
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Start a request against `path`, relative to the base URL.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, self.url(path))
            .header(header::ACCEPT, "application/json")
    }

    /// Run a built request through the pipeline.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response, TransportError> {
        let mut request = builder.build()?;
        for stage in self.request_stages.iter() {
            request = stage.on_request(request)?;
        }

        let ctx = RequestContext::from_request(&request);
        debug!(method = %ctx.method, url = %ctx.url, authenticated = ctx.bearer.is_some(), "Sending request");

        let mut outcome = match self.client.execute(request).await {
            Ok(response) => Self::check_response(response).await,
            Err(e) => Err(TransportError::Network(e)),
        };

        for stage in self.response_stages.iter() {
            outcome = stage.on_response(&ctx, outcome);
        }
        outcome
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: Response) -> Result<Response, TransportError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(TransportError::from_status(status, &body))
        }
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, TransportError> {
        let url = response.url().to_string();
        let text = response
            .text()
            .await
            .map_err(|e| TransportError::InvalidResponse(format!("{}: {}", url, e)))?;
        serde_json::from_str(&text)
            .map_err(|e| TransportError::InvalidResponse(format!("{}: {}", url, e)))
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, TransportError> {
        let response = self.send(self.request(Method::GET, path)).await?;
        Self::decode(response).await
    }

    pub async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, TransportError> {
        let response = self.send(self.request(Method::POST, path).json(body)).await?;
        Self::decode(response).await
    }

    /// POST without a body, as the validate and logout endpoints expect.
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, TransportError> {
        let response = self.send(self.request(Method::POST, path)).await?;
        Self::decode(response).await
    }
}
