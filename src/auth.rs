use std::sync::Arc;

use axum::http::{HeaderMap, StatusCode, header};
use serde_json::{Value, json};
use tracing::warn;

use crate::error::{GatewayError, Result};
use crate::upstream::{Method, UpstreamClient, UpstreamResponse};

pub const MISSING_TOKEN_MESSAGE: &str = "Authorization token is required.";

const WHOAMI_PATH: &str = "/auth-server/v1/users/me";
const ADMIN_USERS_PATH: &str = "/auth-server/v1/admin/users";

/// Identity document returned by the auth server for the authenticated
/// caller. Fetched once per request and discarded afterwards.
#[derive(Clone, Debug)]
pub struct Identity {
    pub document: Value,
}

impl Identity {
    /// Unique id field used for downstream header enrichment.
    pub fn user_id(&self) -> Result<&str> {
        self.document
            .get("_id")
            .and_then(Value::as_str)
            .ok_or_else(|| GatewayError::InvalidResponse {
                upstream: "auth-server",
                reason: "identity document is missing _id".to_string(),
            })
    }
}

/// Outcome of the credential check. A denial carries the exact status and
/// body the caller must relay; no downstream call may follow it.
#[derive(Debug)]
pub enum AuthDecision {
    Granted {
        credential: String,
        identity: Identity,
    },
    Denied {
        status: StatusCode,
        body: Value,
    },
}

/// Validates the inbound credential against the auth server before any
/// downstream service is touched.
pub struct AuthGate {
    identity: Arc<UpstreamClient>,
}

impl AuthGate {
    pub fn new(identity: Arc<UpstreamClient>) -> Self {
        Self { identity }
    }

    /// Raw token from the `Authorization` header. Not a `Bearer` scheme; the
    /// header value itself is the credential.
    pub fn credential(headers: &HeaderMap) -> Option<String> {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    }

    pub fn missing_token() -> (StatusCode, Value) {
        (
            StatusCode::UNAUTHORIZED,
            json!({ "message": MISSING_TOKEN_MESSAGE }),
        )
    }

    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<AuthDecision> {
        self.check(headers, WHOAMI_PATH).await
    }

    /// Admin-scoped variant used by privileged routes. Same 401/200
    /// semantics against a different auth-server endpoint.
    pub async fn authenticate_admin(&self, headers: &HeaderMap) -> Result<AuthDecision> {
        self.check(headers, ADMIN_USERS_PATH).await
    }

    async fn check(&self, headers: &HeaderMap, path: &str) -> Result<AuthDecision> {
        let Some(credential) = Self::credential(headers) else {
            warn!("authorization token missing");
            let (status, body) = Self::missing_token();
            return Ok(AuthDecision::Denied { status, body });
        };

        let UpstreamResponse { body, status } = self
            .identity
            .call(Method::Get, path, None, &credential, &[])
            .await?;
        if status != StatusCode::OK {
            return Ok(AuthDecision::Denied { status, body });
        }
        Ok(AuthDecision::Granted {
            credential,
            identity: Identity { document: body },
        })
    }
}
