use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::models::BookAppointmentRequest;
use appointment_cell::AppointmentBookingService;
use payment_cell::payment_routes;
use shared_database::{AppointmentFilter, ClinicStore, MemoryStore};
use shared_models::appointment::{Appointment, PaymentMethod};
use shared_models::user::User;
use shared_utils::test_utils::{JwtTestUtils, StubImageHost, TestConfig, TestFixtures, TestUser};
use shared_utils::AppState;

const CHECKOUT_URL: &str = "https://sandbox.sslcommerz.com/EasyCheckOut/testcde";

struct PaymentApp {
    state: Arc<AppState>,
    store: Arc<MemoryStore>,
    server: MockServer,
    patient: User,
    token: String,
}

impl PaymentApp {
    async fn new() -> Self {
        let server = MockServer::start().await;
        let test_config = TestConfig::default();
        let mut config = test_config.to_app_config();
        config.sslcommerz_store_id = "medibook_store".to_string();
        config.sslcommerz_store_password = "medibook_store@ssl".to_string();
        config.sslcommerz_base_url = server.uri();

        let store = Arc::new(MemoryStore::new());
        let state = Arc::new(AppState::with_parts(
            config,
            store.clone(),
            Arc::new(StubImageHost::default()),
        ));

        let patient = TestFixtures::user("Jane Doe", "jane@patients.test");
        store.insert_user(&patient).await.unwrap();
        let token = JwtTestUtils::create_test_token(
            &TestUser::patient(patient.id),
            &test_config.jwt_secret,
            Some(24),
        );

        Self {
            state,
            store,
            server,
            patient,
            token,
        }
    }

    fn router(&self) -> Router {
        payment_routes(self.state.clone())
    }

    async fn book(&self, time: &str) -> Appointment {
        let doctor = TestFixtures::doctor("Dr. Emily Larson", &format!("{}@medibook.test", Uuid::new_v4()));
        self.store.insert_doctor(&doctor).await.unwrap();
        AppointmentBookingService::new(self.state.store.clone())
            .book(
                self.patient.id,
                BookAppointmentRequest {
                    doc_id: doctor.id,
                    slot_date: "05_06_2025".to_string(),
                    slot_time: time.to_string(),
                },
            )
            .await
            .unwrap()
    }

    async fn reload(&self, id: Uuid) -> Appointment {
        self.store
            .find_appointment(&AppointmentFilter::by_id(id))
            .await
            .unwrap()
            .unwrap()
    }

    async fn mount_checkout(&self) {
        Mock::given(method("POST"))
            .and(path("/gwprocess/v4/api.php"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "SUCCESS",
                "GatewayPageURL": CHECKOUT_URL,
            })))
            .mount(&self.server)
            .await;
    }

    async fn mount_validation(&self, val_id: &str, status: &str, tran_id: &str) {
        Mock::given(method("GET"))
            .and(path("/validator/api/validationserverAPI.php"))
            .and(query_param("val_id", val_id))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": status,
                "tran_id": tran_id,
                "val_id": val_id,
                "amount": "50.00",
                "bank_tran_id": "bank_9",
                "card_type": "VISA-Dutch Bangla",
            })))
            .mount(&self.server)
            .await;
    }

    /// Starts a payment and returns the transaction stored on the appointment.
    async fn init(&self, appointment: &Appointment) -> String {
        let (status, body) = send(self.router(), self.init_request(appointment.id)).await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        self.reload(appointment.id).await.transaction_id.unwrap()
    }

    fn init_request(&self, appointment_id: Uuid) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/init")
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({"appointmentId": appointment_id}).to_string()))
            .unwrap()
    }
}

async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

async fn redirect(router: Router, request: Request<Body>) -> String {
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().method("GET").uri(uri).body(Body::empty()).unwrap()
}

fn post_form(uri: &str, form: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_init_stores_transaction_before_handing_out_url() {
    let app = PaymentApp::new().await;
    app.mount_checkout().await;
    let appointment = app.book("10:00").await;

    let (status, body) = send(app.router(), app.init_request(appointment.id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["url"], CHECKOUT_URL);

    let stored = app.reload(appointment.id).await;
    let tran_id = stored.transaction_id.clone().unwrap();
    assert!(tran_id.starts_with("txn_"));
    let info = stored.payment_info.unwrap();
    assert_eq!(info.tran_id.as_deref(), Some(tran_id.as_str()));
    assert!(info.initiated_at.is_some());
    assert!(!stored.payment);

    let requests = app.server.received_requests().await.unwrap();
    let form = String::from_utf8(requests[0].body.clone()).unwrap();
    assert!(form.contains(&format!("tran_id={}", tran_id)));
    assert!(form.contains("cus_email=jane%40patients.test"));
    assert!(form.contains(&format!(
        "success_url=http%3A%2F%2Fapi.medibook.test%2Fapi%2Fpayment%2Fsuccess%2F{}%2F{}",
        tran_id, appointment.id
    )));
}

#[tokio::test]
async fn test_init_requires_patient_token() {
    let app = PaymentApp::new().await;
    let appointment = app.book("10:00").await;

    let request = Request::builder()
        .method("POST")
        .uri("/init")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({"appointmentId": appointment.id}).to_string()))
        .unwrap();
    let (status, _) = send(app.router(), request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_init_refused_for_paid_appointment() {
    let app = PaymentApp::new().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&app.server)
        .await;
    let appointment = app.book("10:00").await;
    AppointmentBookingService::new(app.state.store.clone())
        .pay_cash(app.patient.id, appointment.id)
        .await
        .unwrap();

    let (status, body) = send(app.router(), app.init_request(appointment.id)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Appointment is already paid");

    let (status, _) = send(app.router(), app.init_request(Uuid::new_v4())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_init_reports_gateway_outage() {
    let app = PaymentApp::new().await;
    Mock::given(method("POST"))
        .and(path("/gwprocess/v4/api.php"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&app.server)
        .await;
    let appointment = app.book("10:00").await;

    let (status, body) = send(app.router(), app.init_request(appointment.id)).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["success"], false);
    assert!(body.get("url").is_none());
}

#[tokio::test]
async fn test_success_callback_marks_paid_once() {
    let app = PaymentApp::new().await;
    app.mount_checkout().await;
    let appointment = app.book("10:00").await;
    let tran_id = app.init(&appointment).await;
    app.mount_validation("val_ok", "VALIDATED", &tran_id).await;

    let location = redirect(
        app.router(),
        get(&format!("/success/{}/{}?val_id=val_ok", tran_id, appointment.id)),
    )
    .await;
    assert_eq!(location, "http://medibook.test/payment-success");

    let paid = app.reload(appointment.id).await;
    assert!(paid.payment);
    assert_eq!(paid.payment_method, Some(PaymentMethod::Online));
    let paid_at = paid.paid_at().unwrap();

    let location = redirect(
        app.router(),
        post_form(
            &format!("/success/{}", tran_id),
            &format!("tran_id={}&val_id=val_ok", tran_id),
        ),
    )
    .await;
    assert_eq!(location, "http://medibook.test/payment-success");
    assert_eq!(app.reload(appointment.id).await.paid_at(), Some(paid_at));
    assert!(app.store.payment_exceptions().await.is_empty());
}

#[tokio::test]
async fn test_success_callback_with_validation_id() {
    let app = PaymentApp::new().await;
    app.mount_checkout().await;
    let appointment = app.book("10:00").await;
    let tran_id = app.init(&appointment).await;
    app.mount_validation("val_123", "VALID", &tran_id).await;

    let location = redirect(
        app.router(),
        post_form(
            &format!("/success/{}/{}", tran_id, appointment.id),
            &format!("tran_id={}&val_id=val_123&status=VALID", tran_id),
        ),
    )
    .await;
    assert_eq!(location, "http://medibook.test/payment-success");

    let info = app.reload(appointment.id).await.payment_info.unwrap();
    assert_eq!(info.val_id.as_deref(), Some("val_123"));
    assert_eq!(info.bank_tran_id.as_deref(), Some("bank_9"));
    assert_eq!(info.tran_id.as_deref(), Some(tran_id.as_str()));
    assert!(info.initiated_at.is_some());
}

#[tokio::test]
async fn test_unverified_success_is_recorded_as_exception() {
    let app = PaymentApp::new().await;
    app.mount_checkout().await;
    let appointment = app.book("10:00").await;
    let tran_id = app.init(&appointment).await;
    app.mount_validation("val_bad", "INVALID_TRANSACTION", &tran_id).await;

    let location = redirect(
        app.router(),
        get(&format!("/success/{}?val_id=val_bad", tran_id)),
    )
    .await;
    assert_eq!(location, "http://medibook.test/payment-fail?reason=unreconciled");
    assert!(!app.reload(appointment.id).await.payment);

    let exceptions = app.store.payment_exceptions().await;
    assert_eq!(exceptions.len(), 1);
    assert_eq!(exceptions[0].tran_id, tran_id);
    assert!(exceptions[0].reason.contains("INVALID_TRANSACTION"));
}

#[tokio::test]
async fn test_success_without_validation_id_is_not_paid() {
    let app = PaymentApp::new().await;
    app.mount_checkout().await;
    let appointment = app.book("10:00").await;
    let tran_id = app.init(&appointment).await;

    let location = redirect(
        app.router(),
        get(&format!("/success/{}/{}", tran_id, appointment.id)),
    )
    .await;
    assert_eq!(location, "http://medibook.test/payment-fail?reason=unreconciled");

    let location = redirect(
        app.router(),
        post_form(
            &format!("/success/{}", tran_id),
            &format!("tran_id={}&status=VALID&val_id=", tran_id),
        ),
    )
    .await;
    assert_eq!(location, "http://medibook.test/payment-fail?reason=unreconciled");

    let stored = app.reload(appointment.id).await;
    assert!(!stored.payment);
    assert_eq!(stored.payment_method, None);

    let exceptions = app.store.payment_exceptions().await;
    assert_eq!(exceptions.len(), 2);
    assert!(exceptions.iter().all(|e| e.reason.contains("validation id")));
    assert_eq!(exceptions[0].appointment_id, Some(appointment.id));
}

#[tokio::test]
async fn test_validation_for_another_transaction_is_not_paid() {
    let app = PaymentApp::new().await;
    app.mount_checkout().await;
    let appointment = app.book("10:00").await;
    let tran_id = app.init(&appointment).await;
    app.mount_validation("val_other", "VALID", "txn_someone_else").await;

    let location = redirect(
        app.router(),
        get(&format!("/success/{}?val_id=val_other", tran_id)),
    )
    .await;
    assert_eq!(location, "http://medibook.test/payment-fail?reason=unreconciled");
    assert!(!app.reload(appointment.id).await.payment);

    let exceptions = app.store.payment_exceptions().await;
    assert_eq!(exceptions.len(), 1);
    assert!(exceptions[0].reason.contains("txn_someone_else"));
}

#[tokio::test]
async fn test_fail_and_cancel_leave_appointment_unchanged() {
    let app = PaymentApp::new().await;
    app.mount_checkout().await;
    let appointment = app.book("10:00").await;
    let tran_id = app.init(&appointment).await;
    let before = app.reload(appointment.id).await;

    let location = redirect(app.router(), post_form("/fail", "tran_id=txn_unrelated")).await;
    assert_eq!(location, "http://medibook.test/payment-fail");
    let location = redirect(app.router(), get("/cancel?tran_id=txn_unrelated")).await;
    assert_eq!(location, "http://medibook.test/payment-cancel");

    let location = redirect(app.router(), get("/success/txn_unrelated")).await;
    assert_eq!(location, "http://medibook.test/payment-fail?reason=unreconciled");

    let after = app.reload(appointment.id).await;
    assert!(!after.payment);
    assert_eq!(after.transaction_id.as_deref(), Some(tran_id.as_str()));
    assert_eq!(after.payment_info, before.payment_info);

    let exceptions = app.store.payment_exceptions().await;
    assert_eq!(exceptions.len(), 1);
    assert_eq!(exceptions[0].tran_id, "txn_unrelated");
}

#[tokio::test]
async fn test_foreign_appointment_id_falls_back_to_transaction() {
    let app = PaymentApp::new().await;
    app.mount_checkout().await;
    let first = app.book("10:00").await;
    let second = app.book("11:00").await;
    let tran_id = app.init(&first).await;
    app.mount_validation("val_first", "VALID", &tran_id).await;

    let location = redirect(
        app.router(),
        get(&format!("/success/{}/{}?val_id=val_first", tran_id, second.id)),
    )
    .await;
    assert_eq!(location, "http://medibook.test/payment-success");
    assert!(app.reload(first.id).await.payment);
    assert!(!app.reload(second.id).await.payment);
}

#[tokio::test]
async fn test_cash_paid_appointment_is_not_paid_again_online() {
    let app = PaymentApp::new().await;
    app.mount_checkout().await;
    let appointment = app.book("10:00").await;
    let tran_id = app.init(&appointment).await;
    AppointmentBookingService::new(app.state.store.clone())
        .pay_cash(app.patient.id, appointment.id)
        .await
        .unwrap();
    app.mount_validation("val_cash", "VALID", &tran_id).await;

    let location = redirect(
        app.router(),
        get(&format!("/success/{}?val_id=val_cash", tran_id)),
    )
    .await;
    assert_eq!(location, "http://medibook.test/payment-fail?reason=unreconciled");
    assert_eq!(
        app.reload(appointment.id).await.payment_method,
        Some(PaymentMethod::Cash)
    );
    assert_eq!(app.store.payment_exceptions().await.len(), 1);
}

#[tokio::test]
async fn test_ipn_reconciles_validated_payments() {
    let app = PaymentApp::new().await;
    app.mount_checkout().await;
    let appointment = app.book("10:00").await;
    let tran_id = app.init(&appointment).await;
    app.mount_validation("val_ipn", "VALID", &tran_id).await;

    let (status, body) = send(
        app.router(),
        post_form("/ipn", &format!("tran_id={}&status=FAILED", tran_id)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "received", "reconciled": false}));
    assert!(!app.reload(appointment.id).await.payment);

    let (status, body) = send(
        app.router(),
        post_form(
            "/ipn",
            &format!("tran_id={}&val_id=val_ipn&status=VALID", tran_id),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "received", "reconciled": true}));
    assert!(app.reload(appointment.id).await.payment);
}
