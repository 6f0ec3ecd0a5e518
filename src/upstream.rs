use std::fmt;
use std::time::Duration;

use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde_json::{Value, json};
use tracing::{error, info};

use crate::error::{GatewayError, Result};

pub const AUTH_TOKEN_HEADER: &str = "x-auth-token";
pub const API_KEY_HEADER: &str = "x-api-key";
pub const USER_ID_HEADER: &str = "x-user-id";

/// The verb set the gateway forwards. Anything else is a routing error and
/// never reaches an upstream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "get",
            Method::Post => "post",
            Method::Patch => "patch",
            Method::Put => "put",
            Method::Delete => "delete",
        }
    }

    fn as_reqwest(self) -> reqwest::Method {
        match self {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Patch => reqwest::Method::PATCH,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&axum::http::Method> for Method {
    type Error = GatewayError;

    fn try_from(method: &axum::http::Method) -> std::result::Result<Self, GatewayError> {
        use axum::http::Method as Http;
        if *method == Http::GET {
            Ok(Method::Get)
        } else if *method == Http::POST {
            Ok(Method::Post)
        } else if *method == Http::PATCH {
            Ok(Method::Patch)
        } else if *method == Http::PUT {
            Ok(Method::Put)
        } else if *method == Http::DELETE {
            Ok(Method::Delete)
        } else {
            Err(GatewayError::UnsupportedMethod(method.to_string()))
        }
    }
}

/// Decoded upstream reply: JSON body plus the status code, relayed verbatim.
#[derive(Clone, Debug)]
pub struct UpstreamResponse {
    pub body: Value,
    pub status: StatusCode,
}

/// Thin typed caller bound to one upstream base URL. One instance per
/// upstream role (auth server, courses, payments).
#[derive(Clone)]
pub struct UpstreamClient {
    name: &'static str,
    base_url: String,
    credential_header: &'static str,
    client: reqwest::Client,
}

impl UpstreamClient {
    pub fn new(
        name: &'static str,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(GatewayError::Client)?;
        Ok(Self {
            name,
            base_url: base_url.into(),
            credential_header: AUTH_TOKEN_HEADER,
            client,
        })
    }

    /// Switches the header the credential travels under. Legacy auth-server
    /// deployments read `x-api-key`.
    pub fn with_credential_header(mut self, name: &'static str) -> Self {
        self.credential_header = name;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Performs exactly one outbound HTTP call. The body decodes as JSON and
    /// degrades to `{}` when the upstream replies with something else; the
    /// status code passes through unmodified. Connection-level failures
    /// surface as [`GatewayError::Transport`].
    pub async fn call(
        &self,
        method: Method,
        path: &str,
        payload: Option<Value>,
        credential: &str,
        extra_headers: &[(HeaderName, HeaderValue)],
    ) -> Result<UpstreamResponse> {
        let url = join_base_url(&self.base_url, path);
        let mut headers = HeaderMap::new();
        let credential_value =
            HeaderValue::from_str(credential).map_err(|_| GatewayError::InvalidHeader {
                name: self.credential_header.to_string(),
            })?;
        headers.insert(HeaderName::from_static(self.credential_header), credential_value);
        for (name, value) in extra_headers {
            headers.insert(name.clone(), value.clone());
        }

        let payload = payload.unwrap_or_else(|| json!({}));
        let response = self
            .client
            .request(method.as_reqwest(), &url)
            .headers(headers)
            .json(&payload)
            .send()
            .await
            .map_err(|err| {
                error!(
                    upstream = self.name,
                    method = %method,
                    path,
                    token = credential,
                    error = %err,
                    "upstream request failed"
                );
                GatewayError::Transport {
                    upstream: self.name,
                    source: err,
                }
            })?;

        let status = response.status();
        let body = response.json::<Value>().await.unwrap_or_else(|_| json!({}));
        info!(
            upstream = self.name,
            method = %method,
            path,
            status = status.as_u16(),
            "upstream call"
        );
        Ok(UpstreamResponse { body, status })
    }
}

fn join_base_url(base_url: &str, path: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    }
}
