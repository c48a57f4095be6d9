//! HTTP-level tests for the fiscal REST surface.
//!
//! Each test drives the router directly with `tower::ServiceExt::oneshot`
//! over an in-memory store, so no database or listener is needed.
//! Run with: cargo test -p fiscal-server --test http_integration

use std::sync::Arc;

use axum::body::Body;
use fiscal_core::store::FiscalStore;
use fiscal_core::types::LineItem;
use fiscal_core::validation::{RuleCheck, Severity, ValidationRule};
use fiscal_core::{FinancialFacts, FiscalConfig, FiscalYear, MemoryStore};
use fiscal_server::{create_fiscal_router, AppState};
use http_body_util::BodyExt;
use hyper::{Request, StatusCode};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

// ── Test app builder ───────────────────────────────────────────

struct TestApp {
    store: Arc<MemoryStore>,
    router: axum::Router,
}

async fn build_test_app() -> TestApp {
    let rules = vec![ValidationRule::new(
        "revenue_yoy_change",
        RuleCheck::YearOverYear {
            threshold_percent: 50.0,
        },
    )
    .for_field("revenues", "amount")
    .with_severity(Severity::Warning)
    .with_priority(100)];

    let store = Arc::new(MemoryStore::with_rules(rules).await);
    let state = AppState::new(store.clone(), &FiscalConfig::default()).unwrap();
    TestApp {
        store,
        router: create_fiscal_router(state),
    }
}

impl TestApp {
    async fn request(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    async fn seed_year(&self, complete: bool) -> FiscalYear {
        let mut fy = FiscalYear::new(Uuid::new_v4(), 2024);
        if complete {
            fy = fy.completed();
        }
        self.store.save_fiscal_year(&fy).await.unwrap();

        let mut facts = FinancialFacts::new(fy.id);
        facts.total_revenues = Some(Decimal::from(100_000_000));
        facts.total_expenditures = Some(Decimal::from(101_000_000));
        facts.intergovernmental_revenues = Some(Decimal::from(20_000_000));
        facts.unassigned_fund_balance = Some(Decimal::from(8_000_000));
        facts.general_fund_balance = Some(Decimal::from(4_000_000));
        facts.cash_and_investments = Some(Decimal::from(12_000_000));
        facts.pension_contributions = Some(Decimal::from(20_000_000));
        facts.pension_total_liability = Some(Decimal::from(500_000_000));
        facts.pension_fiduciary_net_position = Some(Decimal::from(300_000_000));
        facts.debt_service = Some(Decimal::from(9_000_000));
        self.store.save_financial_facts(&facts).await.unwrap();
        fy
    }

    /// Enter a revenue value 60% above last year's and return the queue item id
    async fn flagged_item(&self) -> String {
        let city_id = Uuid::new_v4();
        self.store
            .save_line_item(&LineItem::new(
                city_id,
                2022,
                "revenues",
                "amount",
                Decimal::from(100),
            ))
            .await
            .unwrap();

        let (status, body) = self
            .request(
                "POST",
                "/api/validation/check",
                Some(json!({
                    "table_name": "revenues",
                    "record_id": Uuid::new_v4(),
                    "field_name": "amount",
                    "value": "160",
                    "city_id": city_id,
                    "fiscal_year": 2023,
                    "entered_by": "clerk@city.gov",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["flagged"], true);
        body["queue_item"]["id"].as_str().unwrap().to_string()
    }
}

// ── Health ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_health() {
    let app = build_test_app().await;
    let (status, body) = app.request("GET", "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

// ── Risk scores ────────────────────────────────────────────────

#[tokio::test]
async fn test_risk_score_unknown_year_is_404() {
    let app = build_test_app().await;
    let uri = format!("/api/fiscal-years/{}/risk-score", Uuid::new_v4());
    let (status, _) = app.request("POST", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_risk_score_requires_complete_data() {
    let app = build_test_app().await;
    let fy = app.seed_year(false).await;

    let uri = format!("/api/fiscal-years/{}/risk-score", fy.id);
    let (status, _) = app.request("POST", &uri, None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_risk_score_lifecycle() {
    let app = build_test_app().await;
    let fy = app.seed_year(true).await;
    let uri = format!("/api/fiscal-years/{}/risk-score", fy.id);

    let (status, _) = app.request("GET", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, created) = app.request("POST", &uri, None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["model_version"], "v1.0");
    // No prior year, so revenue growth is unavailable
    assert_eq!(created["indicators_available"], 8);
    assert_eq!(created["indicators_missing"], 1);
    assert!(created["narrative"]
        .as_str()
        .unwrap()
        .starts_with("The FY2024 fiscal stress score is"));

    let (status, latest) = app.request("GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(latest["id"], created["id"]);

    let (status, history) = app
        .request("GET", &format!("{uri}/history"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history.as_array().unwrap().len(), 1);

    let validate_uri = format!(
        "/api/risk-scores/{}/validate",
        created["id"].as_str().unwrap()
    );
    let (status, validated) = app
        .request(
            "POST",
            &validate_uri,
            Some(json!({ "validated_by": "analyst" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(validated["validated"], true);
    assert_eq!(validated["validated_by"], "analyst");
}

// ── Validation queue ───────────────────────────────────────────

#[tokio::test]
async fn test_clean_value_is_not_flagged() {
    let app = build_test_app().await;
    let (status, body) = app
        .request(
            "POST",
            "/api/validation/check",
            Some(json!({
                "table_name": "revenues",
                "record_id": Uuid::new_v4(),
                "field_name": "amount",
                "value": "100",
                "city_id": Uuid::new_v4(),
                "fiscal_year": 2023,
                "entered_by": "clerk@city.gov",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["flagged"], false);
    assert!(body["queue_item"].is_null());
}

#[tokio::test]
async fn test_approve_then_publish() {
    let app = build_test_app().await;
    let id = app.flagged_item().await;

    let (status, queue) = app
        .request("GET", "/api/validation/queue?status=FLAGGED", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(queue.as_array().unwrap().len(), 1);

    let (status, outcome) = app
        .request(
            "POST",
            &format!("/api/validation/queue/{id}/actions"),
            Some(json!({
                "action": "APPROVE",
                "validator": "analyst@city.gov",
                "notes": "Matches the audited statement",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["item"]["status"], "APPROVED");
    assert_eq!(outcome["flags_resolved"], 1);

    let (status, published) = app
        .request(
            "POST",
            &format!("/api/validation/queue/{id}/publish"),
            Some(json!({ "published_by": "editor@city.gov" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(published["status"], "PUBLISHED");

    let (status, detail) = app
        .request("GET", &format!("/api/validation/queue/{id}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["records"].as_array().unwrap().len(), 1);
    assert_eq!(detail["flags"][0]["is_resolved"], true);
}

#[tokio::test]
async fn test_invalid_action_and_transition_are_400() {
    let app = build_test_app().await;
    let id = app.flagged_item().await;

    let (status, _) = app
        .request(
            "POST",
            &format!("/api/validation/queue/{id}/actions"),
            Some(json!({ "action": "PURGE", "validator": "analyst" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Still FLAGGED, so it cannot be published
    let (status, _) = app
        .request(
            "POST",
            &format!("/api/validation/queue/{id}/publish"),
            Some(json!({ "published_by": "editor" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_soft_deleted_item_disappears() {
    let app = build_test_app().await;
    let id = app.flagged_item().await;

    let (status, _) = app
        .request("DELETE", &format!("/api/validation/queue/{id}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .request("GET", &format!("/api/validation/queue/{id}"), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, summary) = app.request("GET", "/api/validation/summary", None).await;
    assert_eq!(summary["total"], 0);
}

// ── Projections ────────────────────────────────────────────────

#[tokio::test]
async fn test_projection_endpoints() {
    let app = build_test_app().await;
    let fy = app.seed_year(true).await;

    let (status, projection) = app
        .request(
            "GET",
            &format!("/api/fiscal-years/{}/projections/base", fy.id),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(projection["years"].as_array().unwrap().len(), 5);

    let (status, cliff) = app
        .request(
            "GET",
            &format!("/api/fiscal-years/{}/fiscal-cliff?scenario=pessimistic", fy.id),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cliff["scenario"], "pessimistic");
    assert_eq!(cliff["has_cliff"], true);

    let (status, comparison) = app
        .request(
            "GET",
            &format!("/api/fiscal-years/{}/scenarios/compare", fy.id),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(comparison["projections"].as_array().unwrap().len(), 3);

    let (status, _) = app
        .request(
            "GET",
            &format!("/api/fiscal-years/{}/projections/stagflation", fy.id),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_scenarios_listed() {
    let app = build_test_app().await;
    let (status, body) = app.request("GET", "/api/scenarios", None).await;
    assert_eq!(status, StatusCode::OK);

    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["base", "optimistic", "pessimistic"]);
}
