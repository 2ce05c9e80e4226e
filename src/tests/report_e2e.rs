//! End-to-end report tests using wiremock.
//!
//! Each test stands up a mock server playing all three upstream roles
//! (token authority, Cost Management, Resource Graph), builds the real
//! router against it, and drives requests through `tower::oneshot`.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

use crate::{
    AppState,
    config::{AppConfig, AzureConfig, ServerConfig},
    routes,
};

const TENANT: &str = "test-tenant";
const SUBSCRIPTION: &str = "sub-123";

const VM_ID: &str =
    "/subscriptions/sub-123/resourceGroups/rg-app/providers/Microsoft.Compute/virtualMachines/vm-api";
const STORAGE_ID: &str =
    "/subscriptions/sub-123/resourceGroups/rg-data/providers/Microsoft.Storage/storageAccounts/storacct";

fn app(mock_uri: &str) -> Router {
    app_with(mock_uri, |_| {})
}

fn app_with(mock_uri: &str, adjust: impl FnOnce(&mut AzureConfig)) -> Router {
    let mut azure = AzureConfig {
        tenant_id: Some(TENANT.to_string()),
        client_id: Some("client-id".to_string()),
        client_secret: Some("client-secret".to_string()),
        default_subscription_id: None,
        management_url: mock_uri.trim_end_matches('/').to_string(),
        login_url: mock_uri.trim_end_matches('/').to_string(),
    };
    adjust(&mut azure);

    let config = AppConfig {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        azure,
    };
    routes::router(AppState::new(config).unwrap())
}

async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(format!("/{TENANT}/oauth2/token")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"access_token": "test-token"})),
        )
        .mount(server)
        .await;
}

async fn mount_costs(server: &MockServer) {
    let body = json!({
        "properties": {
            "columns": [
                {"name": "PreTaxCost", "type": "Number"},
                {"name": "UsageDate", "type": "Number"},
                {"name": "ServiceName", "type": "String"},
                {"name": "ResourceId", "type": "String"},
                {"name": "ResourceGroupName", "type": "String"},
                {"name": "ResourceType", "type": "String"}
            ],
            "rows": [
                [10.005, 20240101, "Virtual Machines", VM_ID, "rg-app",
                 "Microsoft.Compute/virtualMachines"],
                [10.005, 20240101, "Virtual Machines", VM_ID, "rg-app",
                 "Microsoft.Compute/virtualMachines"],
                [5.0, 20240102, "Storage", STORAGE_ID, "rg-data",
                 "Microsoft.Storage/storageAccounts"]
            ]
        }
    });
    Mock::given(method("POST"))
        .and(path(format!(
            "/subscriptions/{SUBSCRIPTION}/providers/Microsoft.CostManagement/query"
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_tags(server: &MockServer) {
    let body = json!({
        "data": [
            {"id": VM_ID, "tags": {"Env": "PRD", "Team": "Eng"}},
            {"id": STORAGE_ID, "tags": {}}
        ]
    });
    Mock::given(method("POST"))
        .and(path("/providers/Microsoft.ResourceGraph/resources"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn post_report(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/cost-report")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn default_body() -> Value {
    json!({
        "start_date": "2024-01-01",
        "end_date": "2024-01-02",
        "subscription_id": SUBSCRIPTION,
    })
}

#[tokio::test]
async fn full_report_with_tags() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_costs(&server).await;
    mount_tags(&server).await;

    let (status, body) = send(app(&server.uri()), post_report(default_body())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"]["total_cost"], json!(25.02));
    assert_eq!(body["summary"]["currency"], "USD");
    assert_eq!(body["summary"]["average_daily_cost"], json!(12.51));
    assert_eq!(body["summary"]["unique_services"], 2);
    assert_eq!(body["summary"]["unique_resources"], 2);
    assert_eq!(body["summary"]["unique_resource_groups"], 2);
    assert_eq!(
        body["summary"]["daily_breakdown"],
        json!([
            {"date": "01-01-2024", "cost": 20.02},
            {"date": "02-01-2024", "cost": 5.0}
        ])
    );
    assert_eq!(body["summary"]["top_services"][0]["service"], "Virtual Machines");
    assert_eq!(body["summary"]["top_services"][0]["cost"], json!(20.02));
    assert_eq!(
        body["summary"]["top_resources"][0]["resource"],
        "vm-api (Virtual Machines)"
    );

    let records = body["detailed_costs"].as_array().unwrap();
    assert_eq!(records.len(), 3);
    // Sorted date ascending, cost descending; the two VM rows come first.
    assert_eq!(records[0]["date"], "01-01-2024");
    assert_eq!(records[0]["cost"], json!(10.01));
    assert_eq!(records[0]["resource_name"], "vm-api");
    assert_eq!(records[0]["tags"], "Env=PRD; Team=Eng");
    // The storage account has an empty tag map upstream.
    assert_eq!(records[2]["resource_name"], "storacct");
    assert_eq!(records[2]["tags"], "No tags");

    assert_eq!(body["metadata"]["total_records"], 3);
    assert_eq!(body["metadata"]["subscription_id"], SUBSCRIPTION);
    assert_eq!(body["metadata"]["include_tags"], true);
    assert!(body["metadata"]["generated_at"].is_string());
}

#[tokio::test]
async fn include_tags_false_skips_the_tag_query() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_costs(&server).await;
    // The tag endpoint must never be called.
    Mock::given(method("POST"))
        .and(path("/providers/Microsoft.ResourceGraph/resources"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut request_body = default_body();
    request_body["include_tags"] = json!(false);
    let (status, body) = send(app(&server.uri()), post_report(request_body)).await;

    assert_eq!(status, StatusCode::OK);
    assert!(
        body["detailed_costs"]
            .as_array()
            .unwrap()
            .iter()
            .all(|record| record["tags"] == "No tags")
    );
    assert_eq!(body["metadata"]["include_tags"], false);
}

#[tokio::test]
async fn tag_failure_degrades_to_no_tags() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_costs(&server).await;
    Mock::given(method("POST"))
        .and(path("/providers/Microsoft.ResourceGraph/resources"))
        .respond_with(ResponseTemplate::new(500).set_body_string("graph exploded"))
        .mount(&server)
        .await;

    let (status, body) = send(app(&server.uri()), post_report(default_body())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"]["total_cost"], json!(25.02));
    assert!(
        body["detailed_costs"]
            .as_array()
            .unwrap()
            .iter()
            .all(|record| record["tags"] == "No tags")
    );
}

#[tokio::test]
async fn cost_failure_is_fatal() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_tags(&server).await;
    Mock::given(method("POST"))
        .and(path(format!(
            "/subscriptions/{SUBSCRIPTION}/providers/Microsoft.CostManagement/query"
        )))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let (status, body) = send(app(&server.uri()), post_report(default_body())).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Internal server error");
    assert!(
        body["message"]
            .as_str()
            .unwrap()
            .contains("cost endpoint returned")
    );
}

#[tokio::test]
async fn rejected_token_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/{TENANT}/oauth2/token")))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
        .mount(&server)
        .await;

    let (status, body) = send(app(&server.uri()), post_report(default_body())).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Internal server error");
    assert!(
        body["message"]
            .as_str()
            .unwrap()
            .contains("token endpoint returned")
    );
}

#[tokio::test]
async fn missing_credentials_surface_per_request() {
    let server = MockServer::start().await;
    let app = app_with(&server.uri(), |azure| azure.tenant_id = None);

    let (status, body) = send(app, post_report(default_body())).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(
        body["message"]
            .as_str()
            .unwrap()
            .contains("AZURE_TENANT_ID")
    );
}

#[tokio::test]
async fn validation_failures_report_the_first_broken_rule() {
    let server = MockServer::start().await;

    // Nothing supplied at all: the start_date rule fires first.
    let request = Request::builder()
        .method("GET")
        .uri("/api/cost-report")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app(&server.uri()), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required parameter: start_date");

    // With a start date the next unmet rule is reported.
    let request = Request::builder()
        .method("GET")
        .uri("/api/cost-report?start_date=2024-01-01")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app(&server.uri()), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required parameter: end_date");
}

#[tokio::test]
async fn query_string_alone_works_and_env_default_fills_subscription() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_costs(&server).await;
    mount_tags(&server).await;

    let app = app_with(&server.uri(), |azure| {
        azure.default_subscription_id = Some(SUBSCRIPTION.to_string());
    });

    let request = Request::builder()
        .method("GET")
        .uri("/api/cost-report?start_date=2024-01-01&end_date=2024-01-02")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["metadata"]["subscription_id"], SUBSCRIPTION);
}

#[tokio::test]
async fn body_parameters_override_the_query_string() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_costs(&server).await;
    mount_tags(&server).await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/cost-report?start_date=2023-06-01&end_date=2023-06-02")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(default_body().to_string()))
        .unwrap();
    let (status, body) = send(app(&server.uri()), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["metadata"]["start_date"], "2024-01-01");
    assert_eq!(body["metadata"]["end_date"], "2024-01-02");
}

#[tokio::test]
async fn preflight_gets_an_empty_200_with_cors_headers() {
    let server = MockServer::start().await;
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/api/cost-report")
        .header(header::ORIGIN, "https://dashboard.example")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();

    let response = app(&server.uri()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN)
    );
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert!(bytes.is_empty());
}

#[tokio::test]
async fn empty_result_set_yields_zero_defaults() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_tags(&server).await;
    Mock::given(method("POST"))
        .and(path(format!(
            "/subscriptions/{SUBSCRIPTION}/providers/Microsoft.CostManagement/query"
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "properties": {"columns": [], "rows": []}
        })))
        .mount(&server)
        .await;

    let (status, body) = send(app(&server.uri()), post_report(default_body())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"]["total_cost"], json!(0.0));
    assert_eq!(body["summary"]["average_daily_cost"], json!(0.0));
    assert_eq!(body["summary"]["unique_services"], 0);
    assert_eq!(body["summary"]["top_services"], json!([]));
    assert_eq!(body["summary"]["daily_breakdown"], json!([]));
    assert_eq!(body["detailed_costs"], json!([]));
    assert_eq!(body["metadata"]["total_records"], 0);
}
