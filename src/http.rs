use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, Method as HttpMethod, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;
use tracing::error;

use crate::auth::AuthGate;
use crate::config::GatewayConfig;
use crate::error::{GatewayError, Result};
use crate::forward::{Forwarder, ServiceKind};
use crate::status::{StatusAggregator, StatusReport};
use crate::upstream::{API_KEY_HEADER, Method, UpstreamClient};

/// Mount prefix stripped from inbound paths before forwarding.
pub const FORWARD_PREFIX: &str = "/api";

#[derive(Clone)]
pub struct GatewayState {
    forwarder: Arc<Forwarder>,
    aggregator: Arc<StatusAggregator>,
}

impl GatewayState {
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.request_timeout_secs);
        let mut identity = UpstreamClient::new("auth-server", &config.identity_base_url, timeout)?;
        if config.identity_legacy_auth {
            identity = identity.with_credential_header(API_KEY_HEADER);
        }
        let identity = Arc::new(identity);
        let course = Arc::new(UpstreamClient::new(
            "courses",
            &config.course_base_url,
            timeout,
        )?);
        let payment = Arc::new(UpstreamClient::new(
            "payments",
            &config.payment_base_url,
            timeout,
        )?);

        let forwarder = Forwarder::new(
            AuthGate::new(identity.clone()),
            identity.clone(),
            course.clone(),
            payment.clone(),
        );
        let aggregator =
            StatusAggregator::new(AuthGate::new(identity.clone()), identity, course, payment);
        Ok(Self {
            forwarder: Arc::new(forwarder),
            aggregator: Arc::new(aggregator),
        })
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
}

pub fn router(state: GatewayState) -> Router {
    // Every forwarding route accepts exactly the supported verb set; other
    // verbs never reach the forwarder.
    let course = get(forward_course)
        .post(forward_course)
        .patch(forward_course)
        .put(forward_course)
        .delete(forward_course);
    let payment = get(forward_payment)
        .post(forward_payment)
        .patch(forward_payment)
        .put(forward_payment)
        .delete(forward_payment);
    let user = get(forward_user)
        .post(forward_user)
        .patch(forward_user)
        .put(forward_user)
        .delete(forward_user);

    Router::new()
        .route("/", get(root))
        .route("/api/status", get(handle_status))
        .route("/api/status/", get(handle_status))
        .route("/api/courses/*path", course)
        .route("/api/payments/*path", payment)
        .route("/api/auth-server/*path", user)
        .with_state(state)
}

// The root probe stays open; everything under /api is protected.
async fn root() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn forward_course(
    State(state): State<GatewayState>,
    method: HttpMethod,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    dispatch(state, ServiceKind::Course, method, uri, headers, body).await
}

async fn forward_payment(
    State(state): State<GatewayState>,
    method: HttpMethod,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    dispatch(state, ServiceKind::Payment, method, uri, headers, body).await
}

async fn forward_user(
    State(state): State<GatewayState>,
    method: HttpMethod,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    dispatch(state, ServiceKind::User, method, uri, headers, body).await
}

async fn dispatch(
    state: GatewayState,
    kind: ServiceKind,
    method: HttpMethod,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let method = match Method::try_from(&method) {
        Ok(method) => method,
        Err(err) => return normalize_error(err).into_response(),
    };
    let path = downstream_path(&uri);
    let payload = parse_payload(&body);
    match state
        .forwarder
        .forward(kind, method, &path, payload, &headers)
        .await
    {
        Ok(response) => (response.status, Json(response.body)).into_response(),
        Err(err) => normalize_error(err).into_response(),
    }
}

async fn handle_status(
    State(state): State<GatewayState>,
    headers: HeaderMap,
) -> Response {
    match state.aggregator.aggregate(&headers).await {
        Ok(StatusReport::Ready(composite)) => (StatusCode::OK, Json(composite)).into_response(),
        Ok(StatusReport::Denied { status, body }) => (status, Json(body)).into_response(),
        Err(err) => normalize_error(err).into_response(),
    }
}

/// Last-resort boundary handler. Auth denials and upstream non-2xx never
/// reach this path; they are ordinary pipeline outputs.
pub fn normalize_error(err: GatewayError) -> (StatusCode, Json<ErrorBody>) {
    error!(error = %err, "request failed");
    (
        err.status_code(),
        Json(ErrorBody {
            message: format!("Error: {err}"),
        }),
    )
}

fn downstream_path(uri: &Uri) -> String {
    let path_and_query = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());
    path_and_query
        .strip_prefix(FORWARD_PREFIX)
        .unwrap_or(path_and_query)
        .to_string()
}

// The gateway never interprets business payloads: absent or non-JSON bodies
// forward as an empty object.
fn parse_payload(body: &Bytes) -> Option<Value> {
    if body.is_empty() {
        return None;
    }
    serde_json::from_slice(body).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downstream_path_strips_the_mount_prefix() {
        let uri: Uri = "/api/courses/v1/courses".parse().unwrap();
        assert_eq!(downstream_path(&uri), "/courses/v1/courses");
    }

    #[test]
    fn downstream_path_preserves_query_strings() {
        let uri: Uri = "/api/courses/v1/courses?limit=5&page=2".parse().unwrap();
        assert_eq!(downstream_path(&uri), "/courses/v1/courses?limit=5&page=2");
    }

    #[test]
    fn parse_payload_defaults_to_none_for_empty_or_invalid_bodies() {
        assert!(parse_payload(&Bytes::new()).is_none());
        assert!(parse_payload(&Bytes::from_static(b"not json")).is_none());
        assert_eq!(
            parse_payload(&Bytes::from_static(b"{\"name\":\"Fiesta\"}")),
            Some(serde_json::json!({ "name": "Fiesta" }))
        );
    }

    #[test]
    fn normalize_error_prefixes_the_message_and_defaults_to_500() {
        let (status, Json(body)) = normalize_error(GatewayError::InvalidResponse {
            upstream: "auth-server",
            reason: "identity document is missing _id".to_string(),
        });
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body.message,
            "Error: invalid response from auth-server: identity document is missing _id"
        );
    }
}
