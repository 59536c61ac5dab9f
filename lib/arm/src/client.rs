//! Authenticated, throttled, retrying transport for ARM calls.

use reqwest::header::{ACCEPT, RETRY_AFTER};
use reqwest::{Method, Response};
use rootcause::Report;
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use speechkit_core::TenantId;
use speechkit_identity::TokenCredential;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::config::ArmConfig;
use crate::error::ArmError;
use crate::throttle::{RequestThrottle, throttle_key};

/// One page of an ARM collection.
#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    value: Vec<T>,
    #[serde(default, rename = "nextLink")]
    next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Path and query of an absolute or relative URL.
fn path_of(url: &str) -> &str {
    match url.split_once("://") {
        Some((_, rest)) => rest.find('/').map_or("/", |i| &rest[i..]),
        None => url,
    }
}

async fn status_error(response: Response) -> ArmError {
    let status = response.status().as_u16();
    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok());
    let body = response.text().await.unwrap_or_default();
    let (code, message) = match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(envelope) => (
            envelope.error.code,
            envelope.error.message.unwrap_or_default(),
        ),
        Err(_) => (None, body),
    };
    ArmError::Status {
        status,
        code,
        message,
        retry_after,
    }
}

/// HTTP client for Azure Resource Manager.
///
/// Every request carries a bearer token minted for the caller's tenant,
/// counts against the subscription's throttle window, and is retried on
/// throttling, server errors, timeouts and connection failures.
#[derive(Clone)]
pub struct ArmClient {
    http: reqwest::Client,
    credential: Arc<dyn TokenCredential>,
    endpoint: String,
    max_retries: u32,
    throttle: RequestThrottle,
}

impl ArmClient {
    /// Creates a client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        config: &ArmConfig,
        credential: Arc<dyn TokenCredential>,
    ) -> Result<Self, Report<ArmError>> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ArmError::Configuration {
                reason: format!("HTTP client error: {e}"),
            })?;
        Ok(Self {
            http,
            credential,
            endpoint: config.endpoint().to_string(),
            max_retries: config.max_retries(),
            throttle: RequestThrottle::new(config.throttle()),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.endpoint)
    }

    /// GETs `path` and decodes the JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the body does not decode.
    pub async fn get<T: DeserializeOwned>(
        &self,
        tenant_id: Option<&TenantId>,
        path: &str,
    ) -> Result<T, Report<ArmError>> {
        let response = self
            .send(tenant_id, Method::GET, &self.url(path), None)
            .await?;
        decode(response).await
    }

    /// GETs every page of a collection, following `nextLink`.
    ///
    /// # Errors
    ///
    /// Returns an error if any page fails.
    #[instrument(skip(self), fields(tenant = tenant_id.map(TenantId::as_str)))]
    pub async fn list<T: DeserializeOwned>(
        &self,
        tenant_id: Option<&TenantId>,
        path: &str,
    ) -> Result<Vec<T>, Report<ArmError>> {
        let mut items = Vec::new();
        let mut next = Some(self.url(path));
        let mut pages = 0_u32;
        while let Some(url) = next {
            let response = self.send(tenant_id, Method::GET, &url, None).await?;
            let page: Page<T> = decode(response).await?;
            pages += 1;
            items.extend(page.value);
            next = page.next_link.filter(|link| !link.is_empty());
        }
        debug!(pages, items = items.len(), "collection listed");
        Ok(items)
    }

    /// PUTs `body` to `path` and decodes the response.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the body does not decode.
    pub async fn put<B, T>(
        &self,
        tenant_id: Option<&TenantId>,
        path: &str,
        body: &B,
    ) -> Result<T, Report<ArmError>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = to_body(body)?;
        let response = self
            .send(tenant_id, Method::PUT, &self.url(path), Some(&body))
            .await?;
        decode(response).await
    }

    /// POSTs `body` to `path` and decodes the response.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the body does not decode.
    pub async fn post<B, T>(
        &self,
        tenant_id: Option<&TenantId>,
        path: &str,
        body: &B,
    ) -> Result<T, Report<ArmError>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = to_body(body)?;
        let response = self
            .send(tenant_id, Method::POST, &self.url(path), Some(&body))
            .await?;
        decode(response).await
    }

    /// Sends a HEAD request and returns whether the target exists.
    ///
    /// # Errors
    ///
    /// Returns an error for any status other than success or 404.
    pub async fn exists(
        &self,
        tenant_id: Option<&TenantId>,
        path: &str,
    ) -> Result<bool, Report<ArmError>> {
        match self.send(tenant_id, Method::HEAD, &self.url(path), None).await {
            Ok(_) => Ok(true),
            Err(err) if err.current_context().status() == Some(404) => Ok(false),
            Err(err) => Err(err),
        }
    }

    async fn send(
        &self,
        tenant_id: Option<&TenantId>,
        method: Method,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<Response, Report<ArmError>> {
        let mut attempt = 0;
        loop {
            match self.send_once(tenant_id, &method, url, body).await {
                Ok(response) => return Ok(response),
                Err(err) => {
                    attempt += 1;
                    let delay = err.current_context().retry_delay(attempt);
                    if let Some(delay) = delay.filter(|_| attempt <= self.max_retries) {
                        warn!(
                            %method,
                            path = path_of(url),
                            attempt,
                            error = %err.current_context(),
                            "ARM call failed; retrying after {delay}s"
                        );
                        tokio::time::sleep(Duration::from_secs(delay)).await;
                        continue;
                    }
                    return Err(err);
                }
            }
        }
    }

    async fn send_once(
        &self,
        tenant_id: Option<&TenantId>,
        method: &Method,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<Response, Report<ArmError>> {
        self.throttle.acquire(throttle_key(path_of(url))).await;

        let token = self
            .credential
            .bearer_token(tenant_id)
            .await
            .map_err(|e| ArmError::from(e.current_context()))?;

        let mut request = self
            .http
            .request(method.clone(), url)
            .bearer_auth(token.expose_secret())
            .header(ACCEPT, "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(ArmError::from)?;
        if response.status().is_success() {
            return Ok(response);
        }
        Err(status_error(response).await.into())
    }
}

fn to_body<B: Serialize + ?Sized>(body: &B) -> Result<serde_json::Value, Report<ArmError>> {
    Ok(
        serde_json::to_value(body).map_err(|e| ArmError::Configuration {
            reason: format!("request body does not serialize: {e}"),
        })?,
    )
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, Report<ArmError>> {
    let bytes = response.bytes().await.map_err(ArmError::from)?;
    // Some ARM writes answer 200/201/202 with an empty body.
    let bytes: &[u8] = if bytes.is_empty() { b"null" } else { &bytes };
    Ok(
        serde_json::from_slice(bytes).map_err(|e| ArmError::Deserialize {
            reason: e.to_string(),
        })?,
    )
}
