use std::sync::Arc;

use assert_matches::assert_matches;
use uuid::Uuid;

use appointment_cell::models::BookAppointmentRequest;
use appointment_cell::{Action, Actor, AppointmentBookingService, AppointmentError, PaymentOutcome};
use shared_database::{AppointmentFilter, ClinicStore, MemoryStore};
use shared_models::appointment::{AppointmentStatus, DisplayStatus, PaymentMethod};
use shared_models::error::AppError;
use shared_utils::test_utils::TestFixtures;

struct Clinic {
    store: Arc<MemoryStore>,
    service: AppointmentBookingService,
    patient: Uuid,
    doctor: Uuid,
}

async fn setup() -> Clinic {
    let store = Arc::new(MemoryStore::new());
    let patient = TestFixtures::user("Richard James", "richard@medibook.test");
    let doctor = TestFixtures::doctor("Dr. Emily Larson", "emily@medibook.test");
    store.insert_user(&patient).await.unwrap();
    store.insert_doctor(&doctor).await.unwrap();

    Clinic {
        service: AppointmentBookingService::new(store.clone()),
        store,
        patient: patient.id,
        doctor: doctor.id,
    }
}

fn request(doc_id: Uuid, date: &str, time: &str) -> BookAppointmentRequest {
    BookAppointmentRequest {
        doc_id,
        slot_date: date.to_string(),
        slot_time: time.to_string(),
    }
}

#[tokio::test]
async fn test_full_visit_lifecycle() {
    let clinic = setup().await;

    let booked = clinic
        .service
        .book(clinic.patient, request(clinic.doctor, "05_06_2025", "10:00"))
        .await
        .unwrap();
    assert_eq!(booked.status, AppointmentStatus::Pending);
    assert_eq!(booked.amount, 50.0);
    assert!(!booked.payment);

    let doctor = clinic.store.find_doctor(clinic.doctor).await.unwrap().unwrap();
    assert!(doctor.slots_booked.is_booked("05_06_2025", "10:00"));

    let confirmed = clinic.service.confirm(clinic.doctor, booked.id).await.unwrap();
    assert_eq!(confirmed.status, AppointmentStatus::Confirmed);

    let completed = clinic
        .service
        .complete(clinic.doctor, booked.id, true)
        .await
        .unwrap();
    assert_eq!(completed.status.display(), DisplayStatus::Completed);
    let flags = completed.status.flags();
    assert!(flags.is_completed && flags.patient_visited && flags.is_confirmed);

    let err = clinic
        .service
        .cancel(Actor::Patient(clinic.patient), booked.id)
        .await
        .unwrap_err();
    assert_matches!(
        err,
        AppointmentError::InvalidStatusTransition { action: Action::Cancel, current: DisplayStatus::Completed }
    );

    // Completed visits keep their slot.
    let doctor = clinic.store.find_doctor(clinic.doctor).await.unwrap().unwrap();
    assert!(doctor.slots_booked.is_booked("05_06_2025", "10:00"));
}

#[tokio::test]
async fn test_cancel_before_confirmation_frees_slot() {
    let clinic = setup().await;

    let booked = clinic
        .service
        .book(clinic.patient, request(clinic.doctor, "05_06_2025", "10:00"))
        .await
        .unwrap();
    let cancelled = clinic
        .service
        .cancel(Actor::Patient(clinic.patient), booked.id)
        .await
        .unwrap();

    let flags = cancelled.status.flags();
    assert!(flags.cancelled);
    assert!(!flags.is_confirmed && !flags.is_completed && !flags.patient_visited);

    let doctor = clinic.store.find_doctor(clinic.doctor).await.unwrap().unwrap();
    assert!(!doctor.slots_booked.is_booked("05_06_2025", "10:00"));

    let stored = clinic
        .store
        .find_appointment(&AppointmentFilter::by_id(booked.id))
        .await
        .unwrap()
        .unwrap();
    assert!(stored.slot_released);

    // The freed slot can be booked again.
    clinic
        .service
        .book(clinic.patient, request(clinic.doctor, "05_06_2025", "10:00"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_cancel_twice_is_refused() {
    let clinic = setup().await;
    let booked = clinic
        .service
        .book(clinic.patient, request(clinic.doctor, "06_06_2025", "11:30"))
        .await
        .unwrap();

    clinic
        .service
        .cancel(Actor::Doctor(clinic.doctor), booked.id)
        .await
        .unwrap();
    let err = clinic
        .service
        .cancel(Actor::Admin, booked.id)
        .await
        .unwrap_err();

    assert_matches!(err, AppointmentError::InvalidStatusTransition { current: DisplayStatus::Cancelled, .. });
    assert_matches!(AppError::from(err), AppError::PreconditionFailed(_));
}

#[tokio::test]
async fn test_other_parties_cannot_touch_appointment() {
    let clinic = setup().await;
    let booked = clinic
        .service
        .book(clinic.patient, request(clinic.doctor, "07_06_2025", "09:00"))
        .await
        .unwrap();

    let stranger = Uuid::new_v4();
    assert_matches!(
        clinic.service.cancel(Actor::Patient(stranger), booked.id).await,
        Err(AppointmentError::NotFound)
    );
    assert_matches!(
        clinic.service.confirm(stranger, booked.id).await,
        Err(AppointmentError::NotFound)
    );
}

#[tokio::test]
async fn test_confirm_requires_pending() {
    let clinic = setup().await;
    let booked = clinic
        .service
        .book(clinic.patient, request(clinic.doctor, "07_06_2025", "09:00"))
        .await
        .unwrap();

    assert_matches!(
        clinic.service.complete(clinic.doctor, booked.id, true).await,
        Err(AppointmentError::InvalidStatusTransition { current: DisplayStatus::Pending, .. })
    );

    clinic.service.confirm(clinic.doctor, booked.id).await.unwrap();
    assert_matches!(
        clinic.service.confirm(clinic.doctor, booked.id).await,
        Err(AppointmentError::InvalidStatusTransition { current: DisplayStatus::Confirmed, .. })
    );
}

#[tokio::test]
async fn test_missed_visit_is_reported_as_missed() {
    let clinic = setup().await;
    let booked = clinic
        .service
        .book(clinic.patient, request(clinic.doctor, "08_06_2025", "14:00"))
        .await
        .unwrap();
    clinic.service.confirm(clinic.doctor, booked.id).await.unwrap();

    let missed = clinic
        .service
        .complete(clinic.doctor, booked.id, false)
        .await
        .unwrap();
    assert_eq!(missed.status.display(), DisplayStatus::Missed);
    assert!(missed.status.flags().is_completed);
    assert!(!missed.status.flags().patient_visited);
}

#[tokio::test]
async fn test_hide_refused_while_active() {
    let clinic = setup().await;
    let booked = clinic
        .service
        .book(clinic.patient, request(clinic.doctor, "09_06_2025", "10:00"))
        .await
        .unwrap();

    assert_matches!(
        clinic.service.hide(Actor::Patient(clinic.patient), booked.id).await,
        Err(AppointmentError::InvalidStatusTransition { action: Action::Hide, .. })
    );

    clinic
        .service
        .cancel(Actor::Patient(clinic.patient), booked.id)
        .await
        .unwrap();
    let hidden = clinic
        .service
        .hide(Actor::Patient(clinic.patient), booked.id)
        .await
        .unwrap();
    assert!(!hidden.show_to_user);
    assert!(hidden.show_to_doctor);

    assert!(clinic.service.list_for_user(clinic.patient).await.unwrap().is_empty());
    assert_eq!(clinic.service.list_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_admin_hides_from_both_parties() {
    let clinic = setup().await;
    let booked = clinic
        .service
        .book(clinic.patient, request(clinic.doctor, "09_06_2025", "10:00"))
        .await
        .unwrap();
    clinic.service.cancel(Actor::Admin, booked.id).await.unwrap();

    let hidden = clinic.service.hide(Actor::Admin, booked.id).await.unwrap();
    assert!(!hidden.show_to_user && !hidden.show_to_doctor);
}

#[tokio::test]
async fn test_pay_cash_is_idempotent() {
    let clinic = setup().await;
    let booked = clinic
        .service
        .book(clinic.patient, request(clinic.doctor, "10_06_2025", "12:00"))
        .await
        .unwrap();

    let first = clinic.service.pay_cash(clinic.patient, booked.id).await.unwrap();
    assert_matches!(first, PaymentOutcome::Recorded(_));
    let paid_at = first.appointment().paid_at();
    assert!(paid_at.is_some());
    assert_eq!(first.appointment().payment_method, Some(PaymentMethod::Cash));
    assert_eq!(
        first.appointment().payment_info.as_ref().and_then(|i| i.amount.clone()),
        Some("50".to_string())
    );

    let second = clinic.service.pay_cash(clinic.patient, booked.id).await.unwrap();
    assert!(second.is_replay());
    assert_eq!(second.appointment().paid_at(), paid_at);
}

#[tokio::test]
async fn test_cancelled_appointment_cannot_be_paid() {
    let clinic = setup().await;
    let booked = clinic
        .service
        .book(clinic.patient, request(clinic.doctor, "10_06_2025", "12:00"))
        .await
        .unwrap();
    clinic
        .service
        .cancel(Actor::Patient(clinic.patient), booked.id)
        .await
        .unwrap();

    assert_matches!(
        clinic.service.pay_cash(clinic.patient, booked.id).await,
        Err(AppointmentError::InvalidStatusTransition { action: Action::PayCash, .. })
    );
}

#[tokio::test]
async fn test_attach_transaction_refuses_paid_appointment() {
    let clinic = setup().await;
    let booked = clinic
        .service
        .book(clinic.patient, request(clinic.doctor, "11_06_2025", "15:00"))
        .await
        .unwrap();

    let attached = clinic
        .service
        .attach_transaction(clinic.patient, booked.id, "txn_1", Default::default())
        .await
        .unwrap();
    assert_eq!(attached.transaction_id.as_deref(), Some("txn_1"));

    clinic.service.pay_cash(clinic.patient, booked.id).await.unwrap();
    assert_matches!(
        clinic
            .service
            .attach_transaction(clinic.patient, booked.id, "txn_2", Default::default())
            .await,
        Err(AppointmentError::AlreadyPaid)
    );
}

#[tokio::test]
async fn test_booking_validates_input() {
    let clinic = setup().await;

    assert_matches!(
        clinic
            .service
            .book(clinic.patient, request(clinic.doctor, "2025-06-05", "10:00"))
            .await,
        Err(AppointmentError::ValidationError(_))
    );
    assert_matches!(
        clinic
            .service
            .book(clinic.patient, request(clinic.doctor, "05_06_2025", "  "))
            .await,
        Err(AppointmentError::ValidationError(_))
    );
    assert_matches!(
        clinic
            .service
            .book(Uuid::new_v4(), request(clinic.doctor, "05_06_2025", "10:00"))
            .await,
        Err(AppointmentError::UserNotFound)
    );
    assert_matches!(
        clinic
            .service
            .book(clinic.patient, request(Uuid::new_v4(), "05_06_2025", "10:00"))
            .await,
        Err(AppointmentError::DoctorNotFound)
    );
}
