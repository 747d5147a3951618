use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use shared_models::appointment::Appointment;
use shared_models::doctor::{Doctor, SlotBook};
use shared_models::payment::PaymentException;
use shared_models::user::User;

use crate::store::{
    AppointmentFilter, AppointmentPatch, ClinicStore, DoctorPatch, ListOptions, StoreError,
    UserPatch,
};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    doctors: HashMap<Uuid, Doctor>,
    appointments: HashMap<Uuid, Appointment>,
    payment_exceptions: Vec<PaymentException>,
}

/// In-process [`ClinicStore`] for local runs and tests.
///
/// Every operation takes the table lock once, so each call is atomic the
/// same way a single PostgREST statement is.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn payment_exceptions(&self) -> Vec<PaymentException> {
        self.tables.read().await.payment_exceptions.clone()
    }
}

#[async_trait]
impl ClinicStore for MemoryStore {
    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate(format!("users.email {}", user.email)));
        }
        tables.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_users(&self, ids: &[Uuid]) -> Result<Vec<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(ids.iter().filter_map(|id| tables.users.get(id).cloned()).collect())
    }

    async fn update_user(&self, id: Uuid, patch: &UserPatch) -> Result<Option<User>, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(tables.users.get_mut(&id).map(|user| {
            patch.apply(user);
            user.clone()
        }))
    }

    async fn count_users(&self) -> Result<u64, StoreError> {
        Ok(self.tables.read().await.users.len() as u64)
    }

    async fn insert_doctor(&self, doctor: &Doctor) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if tables.doctors.values().any(|d| d.email == doctor.email) {
            return Err(StoreError::Duplicate(format!("doctors.email {}", doctor.email)));
        }
        tables.doctors.insert(doctor.id, doctor.clone());
        Ok(())
    }

    async fn find_doctor(&self, id: Uuid) -> Result<Option<Doctor>, StoreError> {
        Ok(self.tables.read().await.doctors.get(&id).cloned())
    }

    async fn find_doctor_by_email(&self, email: &str) -> Result<Option<Doctor>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.doctors.values().find(|d| d.email == email).cloned())
    }

    async fn list_doctors(&self) -> Result<Vec<Doctor>, StoreError> {
        let tables = self.tables.read().await;
        let mut doctors: Vec<Doctor> = tables.doctors.values().cloned().collect();
        doctors.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(doctors)
    }

    async fn update_doctor(&self, id: Uuid, patch: &DoctorPatch) -> Result<Option<Doctor>, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(tables.doctors.get_mut(&id).map(|doctor| {
            patch.apply(doctor);
            doctor.clone()
        }))
    }

    async fn delete_doctor(&self, id: Uuid, expected_version: i64) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        match tables.doctors.get(&id) {
            Some(doctor) if doctor.slots_version == expected_version => {
                tables.doctors.remove(&id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn swap_doctor_slots(
        &self,
        id: Uuid,
        expected_version: i64,
        slots: &SlotBook,
    ) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        match tables.doctors.get_mut(&id) {
            Some(doctor) if doctor.slots_version == expected_version => {
                doctor.slots_booked = slots.clone();
                doctor.slots_version = expected_version + 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn insert_appointment(&self, appointment: &Appointment) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if tables.appointments.contains_key(&appointment.id) {
            return Err(StoreError::Duplicate(format!("appointments.id {}", appointment.id)));
        }
        tables.appointments.insert(appointment.id, appointment.clone());
        Ok(())
    }

    async fn find_appointments(
        &self,
        filter: &AppointmentFilter,
        options: ListOptions,
    ) -> Result<Vec<Appointment>, StoreError> {
        let tables = self.tables.read().await;
        let mut found: Vec<Appointment> = tables
            .appointments
            .values()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        options.sort(&mut found);
        Ok(found)
    }

    async fn count_appointments(&self, filter: &AppointmentFilter) -> Result<u64, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.appointments.values().filter(|a| filter.matches(a)).count() as u64)
    }

    async fn count_appointments_by_doctor(
        &self,
        filter: &AppointmentFilter,
    ) -> Result<HashMap<Uuid, u64>, StoreError> {
        let tables = self.tables.read().await;
        let mut counts = HashMap::new();
        for appointment in tables.appointments.values().filter(|a| filter.matches(a)) {
            *counts.entry(appointment.doc_id).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn update_appointments(
        &self,
        filter: &AppointmentFilter,
        patch: &AppointmentPatch,
    ) -> Result<Vec<Appointment>, StoreError> {
        let mut tables = self.tables.write().await;
        let mut updated = Vec::new();
        for appointment in tables.appointments.values_mut().filter(|a| filter.matches(a)) {
            patch.apply(appointment);
            updated.push(appointment.clone());
        }
        Ok(updated)
    }

    async fn insert_payment_exception(&self, exception: &PaymentException) -> Result<(), StoreError> {
        self.tables
            .write()
            .await
            .payment_exceptions
            .push(exception.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shared_models::user::Address;

    fn doctor() -> Doctor {
        Doctor {
            id: Uuid::new_v4(),
            name: "Dr. Karim".into(),
            email: "karim@example.com".into(),
            password_hash: "hash".into(),
            image: String::new(),
            speciality: "General physician".into(),
            degree: "MBBS".into(),
            experience: "4 Years".into(),
            about: String::new(),
            available: true,
            fees: 50.0,
            address: Address::default(),
            created_at: Utc::now(),
            slots_booked: SlotBook::default(),
            slots_version: 0,
        }
    }

    #[tokio::test]
    async fn slot_swap_rejects_stale_version() {
        let store = MemoryStore::new();
        let doctor = doctor();
        store.insert_doctor(&doctor).await.unwrap();

        let mut slots = SlotBook::default();
        slots.reserve("5_6_2025", "10:00").unwrap();
        assert!(store.swap_doctor_slots(doctor.id, 0, &slots).await.unwrap());
        assert!(!store.swap_doctor_slots(doctor.id, 0, &SlotBook::default()).await.unwrap());

        let stored = store.find_doctor(doctor.id).await.unwrap().unwrap();
        assert_eq!(stored.slots_version, 1);
        assert!(stored.slots_booked.is_booked("5_6_2025", "10:00"));
    }

    #[tokio::test]
    async fn doctor_delete_rejects_stale_version() {
        let store = MemoryStore::new();
        let doctor = doctor();
        store.insert_doctor(&doctor).await.unwrap();

        let mut slots = SlotBook::default();
        slots.reserve("05_06_2025", "10:00").unwrap();
        assert!(store.swap_doctor_slots(doctor.id, 0, &slots).await.unwrap());

        assert!(!store.delete_doctor(doctor.id, 0).await.unwrap());
        assert!(store.find_doctor(doctor.id).await.unwrap().is_some());
        assert!(store.delete_doctor(doctor.id, 1).await.unwrap());
        assert!(!store.delete_doctor(doctor.id, 1).await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_emails_are_rejected() {
        let store = MemoryStore::new();
        let user = User::new("A".into(), "a@example.com".into(), "h".into());
        store.insert_user(&user).await.unwrap();

        let twin = User::new("B".into(), "a@example.com".into(), "h".into());
        assert!(matches!(
            store.insert_user(&twin).await,
            Err(StoreError::Duplicate(_))
        ));
    }
}
