use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Method;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use tracing::{debug, instrument};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::appointment::Appointment;
use shared_models::doctor::{Doctor, SlotBook};
use shared_models::payment::PaymentException;
use shared_models::user::User;

use crate::store::{
    AppointmentFilter, AppointmentPatch, ClinicStore, DoctorPatch, ListOptions, StoreError,
    UserPatch,
};
use crate::supabase::{DuplicateKey, SupabaseClient};

const USERS: &str = "/rest/v1/users";
const DOCTORS: &str = "/rest/v1/doctors";
const APPOINTMENTS: &str = "/rest/v1/appointments";
const PAYMENT_EXCEPTIONS: &str = "/rest/v1/payment_exceptions";

const RETURN_MINIMAL: (&str, &str) = ("prefer", "return=minimal");
const RETURN_REPRESENTATION: (&str, &str) = ("prefer", "return=representation");

/// [`ClinicStore`] backed by Supabase tables through PostgREST.
pub struct SupabaseStore {
    client: SupabaseClient,
}

impl SupabaseStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: SupabaseClient::new(config),
        }
    }

    async fn insert(&self, table: &str, row: Value) -> Result<(), StoreError> {
        self.client
            .execute(Method::POST, table, &[RETURN_MINIMAL], Some(row))
            .await
            .map_err(map_error)
    }

    async fn select<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, StoreError> {
        self.client
            .request::<Vec<T>>(Method::GET, path, None)
            .await
            .map_err(map_error)
    }

    async fn patch<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Value,
    ) -> Result<Vec<T>, StoreError> {
        self.client
            .request_with_headers::<Vec<T>>(Method::PATCH, path, &[RETURN_REPRESENTATION], Some(body))
            .await
            .map_err(map_error)
    }
}

fn map_error(err: anyhow::Error) -> StoreError {
    match err.downcast::<DuplicateKey>() {
        Ok(dup) => StoreError::Duplicate(dup.0),
        Err(err) => StoreError::Backend(err.to_string()),
    }
}

fn with_query(table: &str, parts: &[String]) -> String {
    if parts.is_empty() {
        table.to_string()
    } else {
        format!("{}?{}", table, parts.join("&"))
    }
}

fn id_list(ids: &[Uuid]) -> String {
    ids.iter().map(Uuid::to_string).collect::<Vec<_>>().join(",")
}

#[derive(Deserialize)]
struct DoctorRef {
    doc_id: Uuid,
}

#[async_trait]
impl ClinicStore for SupabaseStore {
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        self.insert(USERS, serde_json::to_value(user)?).await
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let path = format!("{}?id=eq.{}&limit=1", USERS, id);
        Ok(self.select::<User>(&path).await?.into_iter().next())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let path = format!("{}?email=eq.{}&limit=1", USERS, urlencoding::encode(email));
        Ok(self.select::<User>(&path).await?.into_iter().next())
    }

    async fn find_users(&self, ids: &[Uuid]) -> Result<Vec<User>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let path = format!("{}?id=in.({})", USERS, id_list(ids));
        self.select(&path).await
    }

    async fn update_user(&self, id: Uuid, patch: &UserPatch) -> Result<Option<User>, StoreError> {
        let path = format!("{}?id=eq.{}", USERS, id);
        let rows = self.patch::<User>(&path, serde_json::to_value(patch)?).await?;
        Ok(rows.into_iter().next())
    }

    async fn count_users(&self) -> Result<u64, StoreError> {
        self.client
            .count(&format!("{}?select=id", USERS))
            .await
            .map_err(map_error)
    }

    #[instrument(skip(self, doctor), fields(doctor_id = %doctor.id))]
    async fn insert_doctor(&self, doctor: &Doctor) -> Result<(), StoreError> {
        self.insert(DOCTORS, serde_json::to_value(doctor)?).await
    }

    async fn find_doctor(&self, id: Uuid) -> Result<Option<Doctor>, StoreError> {
        let path = format!("{}?id=eq.{}&limit=1", DOCTORS, id);
        Ok(self.select::<Doctor>(&path).await?.into_iter().next())
    }

    async fn find_doctor_by_email(&self, email: &str) -> Result<Option<Doctor>, StoreError> {
        let path = format!("{}?email=eq.{}&limit=1", DOCTORS, urlencoding::encode(email));
        Ok(self.select::<Doctor>(&path).await?.into_iter().next())
    }

    async fn list_doctors(&self) -> Result<Vec<Doctor>, StoreError> {
        self.select(&format!("{}?order=created_at.asc", DOCTORS)).await
    }

    async fn update_doctor(&self, id: Uuid, patch: &DoctorPatch) -> Result<Option<Doctor>, StoreError> {
        let path = format!("{}?id=eq.{}", DOCTORS, id);
        let rows = self.patch::<Doctor>(&path, serde_json::to_value(patch)?).await?;
        Ok(rows.into_iter().next())
    }

    async fn delete_doctor(&self, id: Uuid, expected_version: i64) -> Result<bool, StoreError> {
        let path = format!(
            "{}?id=eq.{}&slots_version=eq.{}",
            DOCTORS, id, expected_version
        );
        let rows: Vec<Value> = self
            .client
            .request_with_headers(Method::DELETE, &path, &[RETURN_REPRESENTATION], None)
            .await
            .map_err(map_error)?;
        Ok(!rows.is_empty())
    }

    #[instrument(skip(self, slots))]
    async fn swap_doctor_slots(
        &self,
        id: Uuid,
        expected_version: i64,
        slots: &SlotBook,
    ) -> Result<bool, StoreError> {
        let path = format!(
            "{}?id=eq.{}&slots_version=eq.{}",
            DOCTORS, id, expected_version
        );
        let body = json!({
            "slots_booked": slots,
            "slots_version": expected_version + 1,
        });
        let rows = self.patch::<Value>(&path, body).await?;
        debug!("Slot swap for doctor {} matched {} row(s)", id, rows.len());
        Ok(!rows.is_empty())
    }

    #[instrument(skip(self, appointment), fields(appointment_id = %appointment.id))]
    async fn insert_appointment(&self, appointment: &Appointment) -> Result<(), StoreError> {
        self.insert(APPOINTMENTS, serde_json::to_value(appointment)?).await
    }

    async fn find_appointments(
        &self,
        filter: &AppointmentFilter,
        options: ListOptions,
    ) -> Result<Vec<Appointment>, StoreError> {
        let mut parts = filter.to_query();
        parts.extend(options.to_query());
        self.select(&with_query(APPOINTMENTS, &parts)).await
    }

    async fn count_appointments(&self, filter: &AppointmentFilter) -> Result<u64, StoreError> {
        let mut parts = vec!["select=id".to_string()];
        parts.extend(filter.to_query());
        self.client
            .count(&with_query(APPOINTMENTS, &parts))
            .await
            .map_err(map_error)
    }

    async fn count_appointments_by_doctor(
        &self,
        filter: &AppointmentFilter,
    ) -> Result<HashMap<Uuid, u64>, StoreError> {
        let mut parts = vec!["select=doc_id".to_string()];
        parts.extend(filter.to_query());
        let rows: Vec<DoctorRef> = self.select(&with_query(APPOINTMENTS, &parts)).await?;

        let mut counts = HashMap::new();
        for row in rows {
            *counts.entry(row.doc_id).or_insert(0) += 1;
        }
        Ok(counts)
    }

    #[instrument(skip(self, patch))]
    async fn update_appointments(
        &self,
        filter: &AppointmentFilter,
        patch: &AppointmentPatch,
    ) -> Result<Vec<Appointment>, StoreError> {
        let parts = filter.to_query();
        if parts.is_empty() {
            return Err(StoreError::Backend(
                "Refusing to update appointments without a filter".to_string(),
            ));
        }
        self.patch(&with_query(APPOINTMENTS, &parts), serde_json::to_value(patch)?)
            .await
    }

    async fn insert_payment_exception(&self, exception: &PaymentException) -> Result<(), StoreError> {
        self.insert(PAYMENT_EXCEPTIONS, serde_json::to_value(exception)?)
            .await
    }
}
