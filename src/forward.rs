use std::sync::Arc;

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use tracing::info;

use crate::auth::{AuthDecision, AuthGate};
use crate::error::{GatewayError, Result};
use crate::upstream::{Method, USER_ID_HEADER, UpstreamClient, UpstreamResponse};

/// Which route group matched. Decided by the routing layer, never computed
/// here.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServiceKind {
    Course,
    Payment,
    User,
}

impl ServiceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ServiceKind::Course => "courses",
            ServiceKind::Payment => "payments",
            ServiceKind::User => "users",
        }
    }
}

/// Rewrites a validated inbound request into a downstream call and relays
/// the (body, status) pair unchanged.
pub struct Forwarder {
    gate: AuthGate,
    identity: Arc<UpstreamClient>,
    course: Arc<UpstreamClient>,
    payment: Arc<UpstreamClient>,
}

impl Forwarder {
    pub fn new(
        gate: AuthGate,
        identity: Arc<UpstreamClient>,
        course: Arc<UpstreamClient>,
        payment: Arc<UpstreamClient>,
    ) -> Self {
        Self {
            gate,
            identity,
            course,
            payment,
        }
    }

    /// `path` is the downstream path with the gateway mount prefix already
    /// stripped, query string included.
    pub async fn forward(
        &self,
        kind: ServiceKind,
        method: Method,
        path: &str,
        payload: Option<Value>,
        headers: &HeaderMap,
    ) -> Result<UpstreamResponse> {
        info!(service = kind.as_str(), method = %method, path, "forwarding");
        match kind {
            ServiceKind::Course => self.forward_course(method, path, payload, headers).await,
            ServiceKind::Payment => self.forward_payment(method, path, payload, headers).await,
            ServiceKind::User => self.forward_user(method, path, payload, headers).await,
        }
    }

    async fn forward_course(
        &self,
        method: Method,
        path: &str,
        payload: Option<Value>,
        headers: &HeaderMap,
    ) -> Result<UpstreamResponse> {
        let (credential, identity) = match self.gate.authenticate(headers).await? {
            AuthDecision::Granted {
                credential,
                identity,
            } => (credential, identity),
            AuthDecision::Denied { status, body } => {
                return Ok(UpstreamResponse { body, status });
            }
        };

        // The course service resolves ownership from the caller's id.
        let user_id =
            HeaderValue::from_str(identity.user_id()?).map_err(|_| GatewayError::InvalidHeader {
                name: USER_ID_HEADER.to_string(),
            })?;
        self.course
            .call(
                method,
                path,
                payload,
                &credential,
                &[(HeaderName::from_static(USER_ID_HEADER), user_id)],
            )
            .await
    }

    async fn forward_payment(
        &self,
        method: Method,
        path: &str,
        payload: Option<Value>,
        headers: &HeaderMap,
    ) -> Result<UpstreamResponse> {
        let credential = match self.gate.authenticate(headers).await? {
            AuthDecision::Granted { credential, .. } => credential,
            AuthDecision::Denied { status, body } => {
                return Ok(UpstreamResponse { body, status });
            }
        };
        self.payment.call(method, path, payload, &credential, &[]).await
    }

    // User-group calls target the auth server itself, which validates the
    // credential as part of handling the forwarded request. Only the local
    // presence check runs here; a whoami round-trip first would call the
    // same upstream twice.
    async fn forward_user(
        &self,
        method: Method,
        path: &str,
        payload: Option<Value>,
        headers: &HeaderMap,
    ) -> Result<UpstreamResponse> {
        let Some(credential) = AuthGate::credential(headers) else {
            let (status, body) = AuthGate::missing_token();
            return Ok(UpstreamResponse { body, status });
        };
        self.identity.call(method, path, payload, &credential, &[]).await
    }
}
