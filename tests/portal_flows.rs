//! End-to-end portal flows against a local mock of the backend contract.
//! The mock enforces bearer auth and step ordering the way the real API
//! does, so these tests exercise the same envelopes the portals see.

use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use konfirmi::api::{ApiClient, ApiError};
use konfirmi::auth::Auth;
use konfirmi::session::{MemorySessionStore, Portal, SessionStore};
use konfirmi::verification::{
    extract_record,
    status::StatusCache,
    submission::{
        BusinessInfo, ComplianceAnswers, ContactPerson, StepInput, Submission, SubmissionGate,
        SubmissionState,
    },
    VerificationStatus,
};
use konfirmi::wallet::topup::{self, PollPolicy, TopUpOutcome};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const TOKEN: &str = "token-1";

#[derive(Default)]
struct MockState {
    steps: Vec<String>,
    completed: bool,
    flat_login_token: bool,
    topup_calls: u32,
    verify_calls: u32,
    pending_before_success: u32,
    verify_always_pending: bool,
}

type Shared = Arc<Mutex<MockState>>;

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .map_or(false, |value| value == format!("Bearer {TOKEN}"))
}

fn unauthorized() -> (StatusCode, Json<Value>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "success": false,
            "error": { "code": "UNAUTHORIZED", "message": "Session expired" }
        })),
    )
}

async fn login(State(state): State<Shared>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if body["email"].as_str().unwrap_or_default().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "success": false,
                "error": { "code": "VALIDATION_ERROR", "message": "Email is required" }
            })),
        );
    }

    let flat = state.lock().unwrap().flat_login_token;
    let envelope = if flat {
        json!({ "success": true, "token": TOKEN, "data": { "user": { "email": "ada@acme.test" } } })
    } else {
        json!({ "success": true, "data": { "token": TOKEN, "user": { "email": "ada@acme.test" } } })
    };

    (StatusCode::OK, Json(envelope))
}

async fn me(headers: HeaderMap) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return unauthorized();
    }
    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "data": { "user": { "email": "ada@acme.test", "businessName": "Acme Ltd" } }
        })),
    )
}

async fn verification_status(
    State(state): State<Shared>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return unauthorized();
    }

    let status = if state.lock().unwrap().completed {
        "admin_review"
    } else {
        "inactive"
    };

    (
        StatusCode::OK,
        Json(json!({ "success": true, "data": { "status": status } })),
    )
}

fn submit_step(state: &Shared, step: &str, headers: &HeaderMap) -> (StatusCode, Json<Value>) {
    if !authorized(headers) {
        return unauthorized();
    }

    let mut state = state.lock().unwrap();
    let previous = state.steps.last().map(String::as_str);
    let in_order = match step {
        "business-info" => true,
        "compliance" => previous == Some("business-info"),
        "contact-person" => previous == Some("compliance"),
        "complete" => previous == Some("contact-person"),
        _ => false,
    };

    if !in_order {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "success": false,
                "error": { "code": "VALIDATION_ERROR", "message": "Step out of order" }
            })),
        );
    }

    state.steps.push(step.to_string());
    if step == "complete" {
        state.completed = true;
    }

    (
        StatusCode::OK,
        Json(json!({ "success": true, "data": {} })),
    )
}

async fn submit_business_info(
    State(state): State<Shared>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    submit_step(&state, "business-info", &headers)
}

async fn submit_compliance(
    State(state): State<Shared>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    submit_step(&state, "compliance", &headers)
}

async fn submit_contact_person(
    State(state): State<Shared>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    submit_step(&state, "contact-person", &headers)
}

async fn complete(State(state): State<Shared>, headers: HeaderMap) -> (StatusCode, Json<Value>) {
    submit_step(&state, "complete", &headers)
}

async fn topup(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return unauthorized();
    }

    state.lock().unwrap().topup_calls += 1;
    let naira = body["amount"].as_u64().unwrap_or_default();

    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "data": {
                "reference": "ref-1",
                "amount": {
                    "kobo": naira * 100,
                    "naira": naira,
                    "formatted": format!("₦{naira}.00")
                },
                "payment": {
                    "url": "https://checkout.example/pay/ref-1",
                    "accessCode": "ac-1",
                    "reference": "ref-1"
                },
                "publicKey": "pk_test_1"
            }
        })),
    )
}

async fn verify_topup(
    State(state): State<Shared>,
    Path(reference): Path<String>,
) -> (StatusCode, Json<Value>) {
    let mut state = state.lock().unwrap();
    state.verify_calls += 1;

    if reference == "bad-ref" {
        return (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "transaction": { "status": "failed", "gatewayResponse": "Declined" },
                    "paystackStatus": "failed"
                }
            })),
        );
    }

    let still_pending =
        state.verify_always_pending || state.verify_calls <= state.pending_before_success;
    let transaction = if still_pending {
        json!({ "status": "pending", "reference": reference })
    } else {
        json!({
            "status": "success",
            "reference": reference,
            "amount": { "kobo": 500_000, "naira": 5000.0, "formatted": "₦5,000.00" }
        })
    };

    (
        StatusCode::OK,
        Json(json!({ "success": true, "data": { "transaction": transaction } })),
    )
}

async fn usage(headers: HeaderMap) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return unauthorized();
    }
    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "data": { "data": { "usage": {
                "totalRequests": 120,
                "successfulRequests": 118,
                "failedRequests": 2,
                "totalCost": 650.5
            } } }
        })),
    )
}

async fn spawn_backend(state: Shared) -> Result<String> {
    let app = Router::new()
        .route("/api/v1/customer/auth/login", post(login))
        .route("/api/v1/customer/auth/me", get(me))
        .route(
            "/api/v1/customer/verification/status",
            get(verification_status),
        )
        .route(
            "/api/v1/customer/verification/submit-business-info",
            post(submit_business_info),
        )
        .route(
            "/api/v1/customer/verification/submit-compliance",
            post(submit_compliance),
        )
        .route(
            "/api/v1/customer/verification/submit-contact-person",
            post(submit_contact_person),
        )
        .route("/api/v1/customer/verification/complete", post(complete))
        .route("/api/v1/customer/wallet/topup", post(topup))
        .route(
            "/api/v1/customer/wallet/topup/verify/:reference",
            get(verify_topup),
        )
        .route("/api/v1/customer/usage", get(usage))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Ok(format!("http://{addr}"))
}

fn portal_client(base_url: &str) -> Result<(Arc<ApiClient>, Arc<dyn SessionStore>)> {
    let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
    let client = Arc::new(ApiClient::new(base_url, Portal::Customer, store.clone())?);
    Ok((client, store))
}

fn business_info() -> BusinessInfo {
    BusinessInfo {
        business_name: "Acme Ltd".to_string(),
        registration_number: "RC123456".to_string(),
        business_type: "Limited company".to_string(),
        industry: "Fintech".to_string(),
        address: "1 Broad Street".to_string(),
        city: "Lagos".to_string(),
        state: "Lagos".to_string(),
        country: "Nigeria".to_string(),
    }
}

fn compliance() -> ComplianceAnswers {
    ComplianceAnswers {
        countries_of_operation: "Nigeria, Ghana".to_string(),
        has_aml_policy: true,
        has_data_protection_policy: true,
        ..ComplianceAnswers::default()
    }
}

fn contact_person() -> ContactPerson {
    ContactPerson {
        full_name: "Ada Obi".to_string(),
        email: "ada@acme.test".to_string(),
        phone: "+2348000000000".to_string(),
        role: "CTO".to_string(),
        website: Some("https://acme.test".to_string()),
    }
}

#[tokio::test]
async fn login_persists_token_from_nested_and_flat_envelopes() -> Result<()> {
    for flat in [false, true] {
        let state = Shared::default();
        state.lock().unwrap().flat_login_token = flat;
        let base_url = spawn_backend(state).await?;

        let (client, store) = portal_client(&base_url)?;
        let auth = Auth::new(client, store.clone(), Portal::Customer);

        let outcome = auth.login("ada@acme.test", "secret").await;
        assert!(outcome.ok, "login failed for flat={flat}: {outcome:?}");
        assert_eq!(
            store
                .get(Portal::Customer)
                .map(|token| token.expose_secret().to_string()),
            Some(TOKEN.to_string())
        );
        assert_eq!(
            auth.profile().and_then(|profile| profile.email),
            Some("ada@acme.test".to_string())
        );
    }

    Ok(())
}

#[tokio::test]
async fn login_failure_carries_the_backend_message() -> Result<()> {
    let base_url = spawn_backend(Shared::default()).await?;
    let (client, store) = portal_client(&base_url)?;
    let auth = Auth::new(client, store, Portal::Customer);

    let outcome = auth.login("", "secret").await;
    assert!(!outcome.ok);
    assert_eq!(outcome.message.as_deref(), Some("Email is required"));

    Ok(())
}

#[tokio::test]
async fn full_submission_happy_path_walks_all_four_steps() -> Result<()> {
    let state = Shared::default();
    let base_url = spawn_backend(state.clone()).await?;

    let (client, store) = portal_client(&base_url)?;
    let auth = Auth::new(client.clone(), store, Portal::Customer);
    assert!(auth.login("ada@acme.test", "secret").await.ok);

    let record = extract_record(
        &client
            .get(&client.prefixed("/verification/status"))
            .await?,
    );
    assert_eq!(record.status, VerificationStatus::Inactive);

    let mut submission = match Submission::begin(client.clone(), &record) {
        SubmissionGate::Open(submission) => submission,
        SubmissionGate::ReadOnly(record) => panic!("flow gated unexpectedly: {record:?}"),
    };

    assert_eq!(
        submission
            .submit(StepInput::BusinessInfo(business_info()))
            .await?,
        SubmissionState::Compliance
    );
    assert_eq!(
        submission.submit(StepInput::Compliance(compliance())).await?,
        SubmissionState::ContactPerson
    );
    assert_eq!(
        submission
            .submit(StepInput::ContactPerson(contact_person()))
            .await?,
        SubmissionState::Review
    );
    assert_eq!(
        submission.submit(StepInput::Complete).await?,
        SubmissionState::Submitted
    );

    assert_eq!(
        state.lock().unwrap().steps,
        vec!["business-info", "compliance", "contact-person", "complete"]
    );

    // The refreshed status now gates re-entry into the flow.
    let record = extract_record(
        &client
            .get(&client.prefixed("/verification/status"))
            .await?,
    );
    assert_eq!(record.status, VerificationStatus::AdminReview);
    assert!(matches!(
        Submission::begin(client, &record),
        SubmissionGate::ReadOnly(_)
    ));

    Ok(())
}

#[tokio::test]
async fn expired_session_clears_token_and_preserves_path() -> Result<()> {
    let base_url = spawn_backend(Shared::default()).await?;
    let (client, store) = portal_client(&base_url)?;

    store.set(Portal::Customer, SecretString::from("stale".to_string()));
    client.set_current_path("/customer/usage");

    let err = client
        .get(&client.prefixed("/verification/status"))
        .await
        .unwrap_err();

    match err {
        ApiError::SessionExpired { redirect } => {
            assert_eq!(redirect, "/customer/login?auth=1&from=%2Fcustomer%2Fusage");
        }
        other => panic!("expected SessionExpired, got {other:?}"),
    }
    assert!(store.get(Portal::Customer).is_none());

    Ok(())
}

#[tokio::test]
async fn status_cache_follows_login_and_logout() -> Result<()> {
    let base_url = spawn_backend(Shared::default()).await?;
    let (client, store) = portal_client(&base_url)?;
    let auth = Auth::new(client.clone(), store, Portal::Customer);

    let cache = Arc::new(StatusCache::new());
    let _task = StatusCache::spawn_auto_refresh(cache.clone(), client, auth.subscribe());

    assert!(auth.login("ada@acme.test", "secret").await.ok);
    wait_until(|| cache.record().is_some()).await;
    assert_eq!(cache.status(), VerificationStatus::Inactive);

    auth.logout();
    wait_until(|| cache.record().is_none()).await;

    Ok(())
}

#[tokio::test]
async fn topup_below_minimum_never_calls_backend() -> Result<()> {
    let state = Shared::default();
    let base_url = spawn_backend(state.clone()).await?;
    let (client, store) = portal_client(&base_url)?;
    let auth = Auth::new(client.clone(), store, Portal::Customer);
    assert!(auth.login("ada@acme.test", "secret").await.ok);

    let err = topup::initiate(&client, 50, None).await.unwrap_err();
    assert_eq!(err.to_string(), "Minimum top-up amount is ₦100");
    assert_eq!(state.lock().unwrap().topup_calls, 0);

    Ok(())
}

#[tokio::test]
async fn topup_polls_pending_then_success_without_a_session() -> Result<()> {
    let state = Shared::default();
    state.lock().unwrap().pending_before_success = 1;
    let base_url = spawn_backend(state.clone()).await?;

    // Fresh store with no token: verification is a public endpoint.
    let (client, _store) = portal_client(&base_url)?;

    let outcome = topup::resolve_callback(
        &client,
        "https://app.konfirmi.dev/customer/wallet/callback?reference=ref-1",
        PollPolicy {
            max_attempts: 5,
            delay: Duration::from_millis(10),
        },
    )
    .await?;

    assert_eq!(
        outcome,
        TopUpOutcome::Success {
            reference: "ref-1".to_string(),
            amount_formatted: "₦5,000.00".to_string(),
        }
    );
    assert_eq!(state.lock().unwrap().verify_calls, 2);

    Ok(())
}

#[tokio::test]
async fn topup_verification_gives_up_after_bounded_attempts() -> Result<()> {
    let state = Shared::default();
    state.lock().unwrap().verify_always_pending = true;
    let base_url = spawn_backend(state.clone()).await?;
    let (client, _store) = portal_client(&base_url)?;

    let outcome = topup::confirm(
        &client,
        "ref-1",
        PollPolicy {
            max_attempts: 3,
            delay: Duration::from_millis(5),
        },
    )
    .await?;

    assert_eq!(outcome, TopUpOutcome::TimedOut { attempts: 3 });
    assert_eq!(state.lock().unwrap().verify_calls, 3);

    Ok(())
}

#[tokio::test]
async fn topup_failure_surfaces_the_gateway_message() -> Result<()> {
    let base_url = spawn_backend(Shared::default()).await?;
    let (client, _store) = portal_client(&base_url)?;

    let outcome = topup::confirm(&client, "bad-ref", PollPolicy::default()).await?;
    assert_eq!(
        outcome,
        TopUpOutcome::Failed {
            message: "Declined".to_string()
        }
    );

    Ok(())
}

#[tokio::test]
async fn usage_stats_survive_the_double_nested_envelope() -> Result<()> {
    let base_url = spawn_backend(Shared::default()).await?;
    let (client, store) = portal_client(&base_url)?;
    let auth = Auth::new(client.clone(), store, Portal::Customer);
    assert!(auth.login("ada@acme.test", "secret").await.ok);

    let usage = konfirmi::wallet::usage::fetch_usage(&client)
        .await?
        .expect("usage should be recognized");
    assert_eq!(usage.total_requests, 120);
    assert_eq!(usage.failed_requests, 2);

    Ok(())
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}
