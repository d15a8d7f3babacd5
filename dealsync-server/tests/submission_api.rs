use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{json, Value};

use dealsync_crm::{CrmOp, InMemoryCrm};
use dealsync_server::{router, AppState};

fn server(crm: &Arc<InMemoryCrm>) -> TestServer {
    TestServer::new(router(AppState::new(crm.clone()))).expect("test server")
}

fn body(products: &[&str]) -> Value {
    json!({
        "title": "Order 1",
        "client": { "name": "Ivan", "phone": "+7999000000", "adress": "Main St 1" },
        "products": products,
        "delivery_adress": "Main St 1",
        "delivery_date": "2024-01-01",
        "delivery_code": "AAABBBCCCDDD"
    })
}

#[tokio::test]
async fn health_reports_version() {
    let crm = Arc::new(InMemoryCrm::provisioned());
    let response = server(&crm).get("/health").await;

    response.assert_status_ok();
    let health: Value = response.json();
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn first_submission_creates_contact_and_deal() {
    let crm = Arc::new(InMemoryCrm::provisioned());
    let response = server(&crm).post("/api/v1").json(&body(&["Chair"])).await;

    response.assert_status_ok();
    let result: Value = response.json();
    assert_eq!(result["disposition"], "new_contact_new_deal");
    assert_eq!(result["contact"]["ok"]["phone"], "+7999000000");
    assert_eq!(result["deal"]["ok"]["products"], "Chair");
    assert_eq!(crm.deals().len(), 1);
}

#[tokio::test]
async fn resubmission_updates_then_settles() {
    let crm = Arc::new(InMemoryCrm::provisioned());
    let server = server(&crm);
    server.post("/api/v1").json(&body(&["Chair"])).await.assert_status_ok();

    let updated: Value = server
        .post("/api/v1")
        .json(&body(&["Chair", "Table"]))
        .await
        .json();
    assert_eq!(updated["disposition"], "existing_contact_updated_deal");
    assert_eq!(updated["deal"]["ok"]["products"], "Chair, Table");

    let repeated: Value = server
        .post("/api/v1")
        .json(&body(&["Chair", "Table"]))
        .await
        .json();
    assert_eq!(repeated["disposition"], "existing_contact_unchanged_deal");
    assert_eq!(crm.count(CrmOp::UpdateDeal), 1);
}

#[tokio::test]
async fn conflict_is_a_successful_response() {
    let crm = Arc::new(InMemoryCrm::provisioned());
    let server = server(&crm);
    server.post("/api/v1").json(&body(&["Chair"])).await.assert_status_ok();

    let mut intruder = body(&["Sofa"]);
    intruder["client"]["phone"] = json!("79990000001");
    let response = server.post("/api/v1").json(&intruder).await;

    response.assert_status_ok();
    let result: Value = response.json();
    assert_eq!(result["disposition"], "conflict");
    assert_eq!(result["deal"]["error"]["kind"], "conflict");
}

#[tokio::test]
async fn short_delivery_code_is_unprocessable() {
    let crm = Arc::new(InMemoryCrm::provisioned());
    let mut invalid = body(&["Chair"]);
    invalid["delivery_code"] = json!("SHORT");

    let response = server(&crm).post("/api/v1").json(&invalid).await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let error: Value = response.json();
    assert_eq!(error["ok"], false);
    assert_eq!(error["kind"], "validation");
    assert!(error["error"].as_str().expect("message").contains("delivery code"));
    assert!(crm.calls().is_empty(), "nothing reaches the CRM");
}

#[tokio::test]
async fn missing_phone_is_unprocessable() {
    let crm = Arc::new(InMemoryCrm::provisioned());
    let mut invalid = body(&["Chair"]);
    invalid["client"] = json!({ "name": "Ivan" });

    let response = server(&crm).post("/api/v1").json(&invalid).await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    assert!(crm.calls().is_empty());
}

#[tokio::test]
async fn lookup_failure_is_bad_gateway() {
    let crm = Arc::new(InMemoryCrm::provisioned());
    crm.reject(CrmOp::FindContact);

    let response = server(&crm).post("/api/v1").json(&body(&["Chair"])).await;

    response.assert_status(StatusCode::BAD_GATEWAY);
    let error: Value = response.json();
    assert_eq!(error["kind"], "upstream");
    assert_eq!(error["detail"]["error"], "ACCESS_DENIED");
}

#[tokio::test]
async fn contact_rejection_is_reported_inside_a_200() {
    let crm = Arc::new(InMemoryCrm::provisioned());
    crm.reject(CrmOp::CreateContact);

    let response = server(&crm).post("/api/v1").json(&body(&["Chair"])).await;

    response.assert_status_ok();
    let result: Value = response.json();
    assert_eq!(result["disposition"], "partial_failure");
    assert_eq!(result["contact"]["error"]["kind"], "rejected");
    assert!(result.get("deal").is_none());
}
