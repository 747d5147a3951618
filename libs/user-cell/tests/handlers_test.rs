use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use shared_database::ClinicStore;
use shared_utils::test_utils::{JwtTestUtils, TestApp, TestFixtures, TestUser};
use user_cell::user_routes;

const BOUNDARY: &str = "medibook-boundary";

fn create_test_app(app: &TestApp) -> Router {
    user_routes(app.state.clone())
}

async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

fn multipart_body(fields: &[(&str, &str)], image: Option<(&str, &str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, content_type, bytes)) = image {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                BOUNDARY, file_name, content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn multipart_request(uri: &str, token: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn seed_patient(app: &TestApp) -> (Uuid, String) {
    let user = TestFixtures::user("Richard James", "richard@medibook.test");
    app.store.insert_user(&user).await.unwrap();
    (user.id, app.token_for(&TestUser::patient(user.id)))
}

async fn seed_doctor(app: &TestApp) -> Uuid {
    let doctor = TestFixtures::doctor("Dr. Emily Larson", "emily@medibook.test");
    app.store.insert_doctor(&doctor).await.unwrap();
    doctor.id
}

#[tokio::test]
async fn test_register_then_login() {
    let app = TestApp::new();

    let (status, body) = send(
        create_test_app(&app),
        json_request(
            "POST",
            "/register",
            None,
            json!({"name": "Jane Doe", "email": "Jane@Example.com", "password": "long-enough"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(body["token"].as_str().is_some());

    let stored = app.store.find_user_by_email("jane@example.com").await.unwrap().unwrap();
    assert_ne!(stored.password_hash, "long-enough");

    let (status, body) = send(
        create_test_app(&app),
        json_request(
            "POST",
            "/login",
            None,
            json!({"email": "jane@example.com", "password": "long-enough"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].as_str().is_some());

    let (status, body) = send(
        create_test_app(&app),
        json_request(
            "POST",
            "/login",
            None,
            json!({"email": "jane@example.com", "password": "wrong-password"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Invalid credentials");
}

#[tokio::test]
async fn test_register_rejects_bad_input() {
    let app = TestApp::new();
    app.store
        .insert_user(&TestFixtures::user("Taken", "taken@example.com"))
        .await
        .unwrap();

    let cases = [
        (json!({"email": "a@example.com", "password": "long-enough"}), StatusCode::BAD_REQUEST, "Missing Details"),
        (json!({"name": "A", "email": "not-an-email", "password": "long-enough"}), StatusCode::BAD_REQUEST, "Please enter a valid email"),
        (json!({"name": "A", "email": "a@example.com", "password": "short"}), StatusCode::BAD_REQUEST, "Please enter a strong password (at least 8 characters)"),
        (json!({"name": "A", "email": "taken@example.com", "password": "long-enough"}), StatusCode::CONFLICT, "User already exists"),
    ];

    for (request, expected_status, expected_message) in cases {
        let (status, body) = send(
            create_test_app(&app),
            json_request("POST", "/register", None, request),
        )
        .await;
        assert_eq!(status, expected_status);
        assert_eq!(body["message"], expected_message);
    }
}

#[tokio::test]
async fn test_profile_requires_patient_token() {
    let app = TestApp::new();
    let (user_id, token) = seed_patient(&app).await;

    let (status, body) = send(create_test_app(&app), get_request("/get-profile", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Not Authorized Login Again");

    let doctor_token = app.token_for(&TestUser::doctor(Uuid::new_v4()));
    let (status, _) = send(
        create_test_app(&app),
        get_request("/get-profile", Some(&doctor_token)),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(create_test_app(&app), get_request("/get-profile", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["userData"]["_id"], user_id.to_string());
    assert_eq!(body["userData"]["name"], "Richard James");
    assert!(body["userData"].get("password_hash").is_none());

    // Older clients send the token in a `token` header.
    let legacy = Request::builder()
        .method("GET")
        .uri("/get-profile")
        .header("token", token.as_str())
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(create_test_app(&app), legacy).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_bad_tokens_are_rejected() {
    let app = TestApp::new();
    let (user_id, _) = seed_patient(&app).await;
    let user = TestUser::patient(user_id);

    for token in [
        JwtTestUtils::create_expired_token(&user, &app.config.jwt_secret),
        JwtTestUtils::create_invalid_signature_token(&user),
        JwtTestUtils::create_malformed_token(),
    ] {
        let (status, body) = send(create_test_app(&app), get_request("/get-profile", Some(&token))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Not Authorized Login Again");
    }
}

#[tokio::test]
async fn test_update_profile_with_image() {
    let app = TestApp::new();
    let (user_id, token) = seed_patient(&app).await;

    let body = multipart_body(
        &[
            ("name", "Richard Jameson"),
            ("phone", "01711111111"),
            ("dob", "1990-01-15"),
            ("gender", "Male"),
            ("address", r#"{"line1":"57th Cross","line2":"Richmond"}"#),
        ],
        Some(("me.png", "image/png", &[0x89, 0x50, 0x4e, 0x47])),
    );
    let (status, response) = send(
        create_test_app(&app),
        multipart_request("/update-profile", &token, body),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["message"], "Profile Updated");

    let user = app.store.find_user(user_id).await.unwrap().unwrap();
    assert_eq!(user.name, "Richard Jameson");
    assert_eq!(user.address.line1, "57th Cross");
    assert_eq!(user.image, "https://images.medibook.test/uploads/me.png");
    assert_eq!(app.images.uploaded().len(), 1);
}

#[tokio::test]
async fn test_update_profile_rejects_missing_fields_and_non_images() {
    let app = TestApp::new();
    let (_, token) = seed_patient(&app).await;

    let body = multipart_body(&[("name", "Richard"), ("phone", "017")], None);
    let (status, response) = send(
        create_test_app(&app),
        multipart_request("/update-profile", &token, body),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["message"], "Data Missing");

    let body = multipart_body(
        &[("name", "Richard"), ("phone", "017"), ("dob", "1990-01-15"), ("gender", "Male")],
        Some(("cv.pdf", "application/pdf", b"%PDF-1.4")),
    );
    let (status, response) = send(
        create_test_app(&app),
        multipart_request("/update-profile", &token, body),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["message"], "Not an image! Please upload only images.");
    assert!(app.images.uploaded().is_empty());
}

#[tokio::test]
async fn test_book_cancel_and_hide_appointment() {
    let app = TestApp::new();
    let (_, token) = seed_patient(&app).await;
    let doctor_id = seed_doctor(&app).await;

    let booking = json!({"docId": doctor_id, "slotDate": "05_06_2025", "slotTime": "10:00"});
    let (status, body) = send(
        create_test_app(&app),
        json_request("POST", "/book-appointment", Some(&token), booking.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["appointment"]["status"], "pending");
    let appointment_id = body["appointment"]["_id"].as_str().unwrap().to_string();

    let (status, body) = send(
        create_test_app(&app),
        json_request("POST", "/book-appointment", Some(&token), booking),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Slot not available");

    let (status, _) = send(
        create_test_app(&app),
        json_request(
            "POST",
            "/cancel-appointment",
            Some(&token),
            json!({"appointmentId": appointment_id}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(create_test_app(&app), get_request("/appointments", Some(&token))).await;
    let listed = body["appointments"].as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["status"], "cancelled");
    assert_eq!(listed[0]["cancelled"], true);
    assert_eq!(listed[0]["isConfirmed"], false);

    let delete = Request::builder()
        .method("DELETE")
        .uri(format!("/delete-appointment/{}", appointment_id))
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(create_test_app(&app), delete).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(create_test_app(&app), get_request("/appointments", Some(&token))).await;
    assert!(body["appointments"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_pay_cash_twice_succeeds_once() {
    let app = TestApp::new();
    let (_, token) = seed_patient(&app).await;
    let doctor_id = seed_doctor(&app).await;

    let (_, body) = send(
        create_test_app(&app),
        json_request(
            "POST",
            "/book-appointment",
            Some(&token),
            json!({"docId": doctor_id, "slotDate": "05_06_2025", "slotTime": "11:00"}),
        ),
    )
    .await;
    let appointment_id = body["appointment"]["_id"].clone();

    let (status, first) = send(
        create_test_app(&app),
        json_request("POST", "/pay-cash", Some(&token), json!({"appointmentId": appointment_id})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["message"], "Cash payment recorded");
    assert_eq!(first["appointment"]["paymentMethod"], "cash");

    let (status, second) = send(
        create_test_app(&app),
        json_request("POST", "/pay-cash", Some(&token), json!({"appointmentId": appointment_id})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["message"], "Appointment is already paid");
    assert_eq!(
        first["appointment"]["paymentInfo"]["paid_at"],
        second["appointment"]["paymentInfo"]["paid_at"]
    );
}

#[tokio::test]
async fn test_public_doctor_lookup_hides_email() {
    let app = TestApp::new();
    let doctor_id = seed_doctor(&app).await;

    let (status, body) = send(
        create_test_app(&app),
        get_request(&format!("/doctor/{}", doctor_id), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["doctor"]["name"], "Dr. Emily Larson");
    assert!(body["doctor"].get("email").is_none());

    let (status, body) = send(
        create_test_app(&app),
        get_request(&format!("/doctor/{}", Uuid::new_v4()), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Doctor not found");
}
