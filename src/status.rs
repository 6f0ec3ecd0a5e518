use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::http::{HeaderMap, StatusCode};
use futures_util::future;
use serde_json::{Map, Value, json};
use tracing::warn;

use crate::auth::{AuthDecision, AuthGate};
use crate::error::{GatewayError, Result};
use crate::upstream::{Method, UpstreamClient};

pub const GATEWAY_COMPONENT: &str = "api-gateway";

const IDENTITY_STATUS_PATH: &str = "/auth-server/v1/status";
const COURSE_STATUS_PATH: &str = "/courses/v1/status";
const PAYMENT_STATUS_PATH: &str = "/payments/status";

/// Health entry for one component of the composite document.
#[derive(Clone, Debug)]
pub struct ServiceStatus {
    pub status: &'static str,
    pub creation_date: String,
    pub description: String,
}

impl ServiceStatus {
    /// Synthetic placeholder substituted when an upstream is unreachable.
    pub fn offline() -> Self {
        Self {
            status: "Offline",
            creation_date: "0".to_string(),
            description: String::new(),
        }
    }
}

impl From<ServiceStatus> for Value {
    fn from(status: ServiceStatus) -> Value {
        json!({
            "status": status.status,
            "creationDate": status.creation_date,
            "description": status.description,
        })
    }
}

/// Aggregation result: either the relayed auth denial or the composite
/// document, which is always served with HTTP 200.
pub enum StatusReport {
    Denied { status: StatusCode, body: Value },
    Ready(Value),
}

/// Probes every known upstream after an admin-scoped credential check and
/// merges the results, downgrading unreachable upstreams to an offline entry
/// instead of failing the whole request.
pub struct StatusAggregator {
    gate: AuthGate,
    identity: Arc<UpstreamClient>,
    course: Arc<UpstreamClient>,
    payment: Arc<UpstreamClient>,
    started_at: String,
}

impl StatusAggregator {
    pub fn new(
        gate: AuthGate,
        identity: Arc<UpstreamClient>,
        course: Arc<UpstreamClient>,
        payment: Arc<UpstreamClient>,
    ) -> Self {
        let started_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
            .to_string();
        Self {
            gate,
            identity,
            course,
            payment,
            started_at,
        }
    }

    pub async fn aggregate(&self, headers: &HeaderMap) -> Result<StatusReport> {
        let credential = match self.gate.authenticate_admin(headers).await? {
            AuthDecision::Granted { credential, .. } => credential,
            AuthDecision::Denied { status, body } => {
                return Ok(StatusReport::Denied { status, body });
            }
        };

        // Probes are independent; one slow or dead upstream must not mask
        // the others, so they run concurrently.
        let (identity, course, payment) = future::join3(
            self.probe(&self.identity, IDENTITY_STATUS_PATH, &credential),
            self.probe(&self.course, COURSE_STATUS_PATH, &credential),
            self.probe(&self.payment, PAYMENT_STATUS_PATH, &credential),
        )
        .await;

        let mut composite = Map::new();
        composite.insert(
            GATEWAY_COMPONENT.to_string(),
            ServiceStatus {
                status: "Online",
                creation_date: self.started_at.clone(),
                description: "Campus API gateway".to_string(),
            }
            .into(),
        );
        composite.insert("auth-server".to_string(), identity?);
        composite.insert("courses".to_string(), course?);
        composite.insert("payments".to_string(), payment?);
        Ok(StatusReport::Ready(Value::Object(composite)))
    }

    async fn probe(
        &self,
        upstream: &UpstreamClient,
        path: &str,
        credential: &str,
    ) -> Result<Value> {
        match upstream.call(Method::Get, path, None, credential, &[]).await {
            Ok(response) => Ok(response.body),
            Err(GatewayError::Transport { upstream, source }) => {
                warn!(upstream, error = %source, "status probe failed, reporting offline");
                Ok(ServiceStatus::offline().into())
            }
            Err(err) => Err(err),
        }
    }
}
