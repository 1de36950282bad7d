use async_trait::async_trait;
use reqwest::{redirect, Client, Method};
use std::collections::HashMap;
use std::time::Duration;

/// Outgoing request description handed to a transport
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,

    /// JSON body, sent with `Content-Type: application/json`
    pub body: Option<serde_json::Value>,

    /// When false, 3xx responses are returned as-is instead of being followed
    pub follow_redirects: bool,

    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            follow_redirects: true,
            timeout: None,
        }
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self {
            method: Method::POST,
            ..Self::get(url)
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn bearer_auth(self, token: &str) -> Self {
        self.header("Authorization", format!("Bearer {}", token))
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn no_redirects(mut self) -> Self {
        self.follow_redirects = false;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Response as seen by callers; header names are lower-cased
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self.status, 301 | 302 | 303 | 307 | 308)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Parse the body as JSON into `T`
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_str(&self.body)
    }
}

/// The request never produced a response
#[derive(thiserror::Error, Debug)]
#[error("HTTP request to {url} failed: {reason}")]
pub struct TransportFailure {
    pub url: String,
    pub reason: String,
}

/// Minimal HTTP seam used by the extractors and the recognition client
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportFailure>;
}

/// `reqwest` backed transport
pub struct ReqwestTransport {
    client: Client,
    no_redirect_client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, TransportFailure> {
        let build_failure = |e: reqwest::Error| TransportFailure {
            url: String::new(),
            reason: format!("failed to build HTTP client: {}", e),
        };

        let client = Client::builder().build().map_err(build_failure)?;
        let no_redirect_client = Client::builder()
            .redirect(redirect::Policy::none())
            .build()
            .map_err(build_failure)?;

        Ok(Self {
            client,
            no_redirect_client,
        })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportFailure> {
        let client = if request.follow_redirects {
            &self.client
        } else {
            &self.no_redirect_client
        };

        tracing::debug!("{} {}", request.method, request.url);

        let mut builder = client.request(request.method.clone(), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let failure = |e: reqwest::Error| TransportFailure {
            url: request.url.clone(),
            reason: e.to_string(),
        };

        let response = builder.send().await.map_err(failure)?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let body = response.text().await.map_err(failure)?;

        tracing::debug!("{} {} -> {}", request.method, request.url, status);

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
