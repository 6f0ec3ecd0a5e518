use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use campus_gateway::{GatewayConfig, GatewayState, router};
use httpmock::Method::GET;
use httpmock::MockServer;
use serde_json::{Value, json};
use tower::util::ServiceExt;

fn app(auth_url: String, courses_url: String, payments_url: String) -> Router {
    let config = GatewayConfig {
        identity_base_url: auth_url,
        course_base_url: courses_url,
        payment_base_url: payments_url,
        identity_legacy_auth: false,
        request_timeout_secs: 5,
    };
    router(GatewayState::new(&config).expect("gateway state"))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).expect("json body")
}

fn status_request() -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri("/api/status")
        .header("authorization", "admin-tok")
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn composite_document_covers_every_component() {
    let auth = MockServer::start();
    let courses = MockServer::start();
    let payments = MockServer::start();
    let admin = auth.mock(|when, then| {
        when.method(GET)
            .path("/auth-server/v1/admin/users")
            .header("x-auth-token", "admin-tok");
        then.status(200).json_body(json!([{ "_id": "admin" }]));
    });
    auth.mock(|when, then| {
        when.method(GET).path("/auth-server/v1/status");
        then.status(200).json_body(json!({
            "status": "Online", "creationDate": "1700000000", "description": "auth server"
        }));
    });
    courses.mock(|when, then| {
        when.method(GET).path("/courses/v1/status");
        then.status(200).json_body(json!({
            "status": "Online", "creationDate": "1700000001", "description": "course service"
        }));
    });
    payments.mock(|when, then| {
        when.method(GET).path("/payments/status");
        then.status(200).json_body(json!({
            "status": "Online", "creationDate": "1700000002", "description": "payment service"
        }));
    });

    let app = app(auth.base_url(), courses.base_url(), payments.base_url());
    let response = app.oneshot(status_request()).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    admin.assert();
    assert_eq!(body["api-gateway"]["status"], "Online");
    assert_eq!(body["api-gateway"]["description"], "Campus API gateway");
    assert_eq!(body["auth-server"]["status"], "Online");
    assert_eq!(body["courses"]["description"], "course service");
    assert_eq!(body["payments"]["description"], "payment service");
}

#[tokio::test]
async fn unreachable_upstream_degrades_to_an_offline_entry() {
    let auth = MockServer::start();
    let payments = MockServer::start();
    auth.mock(|when, then| {
        when.method(GET).path("/auth-server/v1/admin/users");
        then.status(200).json_body(json!([{ "_id": "admin" }]));
    });
    auth.mock(|when, then| {
        when.method(GET).path("/auth-server/v1/status");
        then.status(200).json_body(json!({
            "status": "Online", "creationDate": "1700000000", "description": "auth server"
        }));
    });
    let payments_probe = payments.mock(|when, then| {
        when.method(GET).path("/payments/status");
        then.status(200).json_body(json!({
            "status": "Online", "creationDate": "1700000002", "description": "payment service"
        }));
    });

    // Courses points at a refusing port; the probe must fail without taking
    // the whole document down.
    let app = app(
        auth.base_url(),
        "http://127.0.0.1:9".to_string(),
        payments.base_url(),
    );
    let response = app.oneshot(status_request()).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["api-gateway"]["status"], "Online");
    assert_eq!(
        body["courses"],
        json!({ "status": "Offline", "creationDate": "0", "description": "" })
    );
    assert_eq!(body["payments"]["status"], "Online");
    payments_probe.assert();
}

#[tokio::test]
async fn admin_denial_short_circuits_the_probes() {
    let auth = MockServer::start();
    let courses = MockServer::start();
    let admin = auth.mock(|when, then| {
        when.method(GET).path("/auth-server/v1/admin/users");
        then.status(403).json_body(json!({ "message": "Forbidden" }));
    });
    let probes = courses.mock(|_when, then| {
        then.status(200);
    });

    let app = app(auth.base_url(), courses.base_url(), courses.base_url());
    let response = app.oneshot(status_request()).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await, json!({ "message": "Forbidden" }));
    admin.assert();
    probes.assert_calls(0);
}

#[tokio::test]
async fn status_route_requires_the_credential_header() {
    let auth = MockServer::start();
    let catch_all = auth.mock(|_when, then| {
        then.status(200);
    });

    let app = app(auth.base_url(), auth.base_url(), auth.base_url());
    let request = Request::builder()
        .method("GET")
        .uri("/api/status")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(response).await,
        json!({ "message": "Authorization token is required." })
    );
    catch_all.assert_calls(0);
}

#[tokio::test]
async fn trailing_slash_variant_is_routed_too() {
    let auth = MockServer::start();
    let payments = MockServer::start();
    auth.mock(|when, then| {
        when.method(GET).path("/auth-server/v1/admin/users");
        then.status(200).json_body(json!([]));
    });
    auth.mock(|when, then| {
        when.method(GET).path("/auth-server/v1/status");
        then.status(200).json_body(json!({ "status": "Online" }));
    });
    payments.mock(|when, then| {
        when.method(GET).path("/payments/status");
        then.status(200).json_body(json!({ "status": "Online" }));
    });

    let app = app(auth.base_url(), "http://127.0.0.1:9".to_string(), payments.base_url());
    let request = Request::builder()
        .method("GET")
        .uri("/api/status/")
        .header("authorization", "admin-tok")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["api-gateway"]["status"], "Online");
}
