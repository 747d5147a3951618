use assert_matches::assert_matches;
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared_config::AppConfig;
use shared_database::{AppointmentFilter, ClinicStore, StoreError, SupabaseStore};
use shared_models::appointment::DisplayStatus;
use shared_models::doctor::SlotBook;
use shared_models::user::User;

fn store_for(server: &MockServer) -> SupabaseStore {
    let config = AppConfig {
        supabase_url: server.uri(),
        supabase_service_key: "service-key".to_string(),
        ..AppConfig::default()
    };
    SupabaseStore::new(&config)
}

fn user_row(id: Uuid, email: &str) -> serde_json::Value {
    json!({
        "id": id,
        "name": "Jane",
        "email": email,
        "password_hash": "hash",
        "image": "",
        "address": { "line1": "", "line2": "" },
        "gender": "Not Selected",
        "dob": "Not Selected",
        "phone": "0000000000",
        "created_at": Utc::now(),
    })
}

#[tokio::test]
async fn test_find_user_by_email_encodes_filter_and_sends_service_key() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("email", "eq.jane+1@example.com"))
        .and(header("apikey", "service-key"))
        .and(header("authorization", "Bearer service-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([user_row(id, "jane+1@example.com")])))
        .expect(1)
        .mount(&server)
        .await;

    let store = store_for(&server);
    let user = store.find_user_by_email("jane+1@example.com").await.unwrap();

    assert_eq!(user.map(|u| u.id), Some(id));
}

#[tokio::test]
async fn test_conditional_update_sends_guard_as_filters() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", id)))
        .and(query_param("status", "in.(pending,confirmed)"))
        .and(query_param("payment", "eq.false"))
        .and(header("prefer", "return=representation"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let store = store_for(&server);
    let filter = AppointmentFilter::by_id(id)
        .with_statuses(&[DisplayStatus::Pending, DisplayStatus::Confirmed])
        .paid(false);
    let patch = shared_database::AppointmentPatch::new();

    let updated = store.update_appointments(&filter, &patch).await.unwrap();
    assert!(updated.is_empty());
}

#[tokio::test]
async fn test_slot_swap_guards_on_version() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();

    let mut slots = SlotBook::default();
    slots.reserve("5_6_2025", "10:00").unwrap();

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("id", format!("eq.{}", id)))
        .and(query_param("slots_version", "eq.3"))
        .and(body_json(json!({
            "slots_booked": { "5_6_2025": ["10:00"] },
            "slots_version": 4,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": id }])))
        .mount(&server)
        .await;

    let store = store_for(&server);
    assert!(store.swap_doctor_slots(id, 3, &slots).await.unwrap());
}

#[tokio::test]
async fn test_doctor_delete_guards_on_version() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("id", format!("eq.{}", id)))
        .and(query_param("slots_version", "eq.2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let store = store_for(&server);
    assert!(!store.delete_doctor(id, 2).await.unwrap());
}

#[tokio::test]
async fn test_count_reads_content_range() {
    let server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path("/rest/v1/users"))
        .and(header("prefer", "count=exact"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-range", "0-9/42"))
        .mount(&server)
        .await;

    let store = store_for(&server);
    assert_eq!(store.count_users().await.unwrap(), 42);
}

#[tokio::test]
async fn test_unique_violation_maps_to_duplicate() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "23505",
            "message": "duplicate key value violates unique constraint \"users_email_key\"",
        })))
        .mount(&server)
        .await;

    let store = store_for(&server);
    let user = User::new("Jane".into(), "jane@example.com".into(), "hash".into());

    assert_matches!(store.insert_user(&user).await, Err(StoreError::Duplicate(_)));
}

#[tokio::test]
async fn test_backend_failure_maps_to_backend_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let store = store_for(&server);
    assert_matches!(store.list_doctors().await, Err(StoreError::Backend(_)));
}
