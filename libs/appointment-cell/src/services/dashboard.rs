// libs/appointment-cell/src/services/dashboard.rs
use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::debug;
use uuid::Uuid;

use shared_database::{AppointmentFilter, ClinicStore, ListOptions};
use shared_models::appointment::{slot_date_keys, Appointment, AppointmentView, DisplayStatus};
use shared_models::user::User;

use crate::models::{
    AdminDashboardStats, AppointmentError, DoctorAppointmentView, DoctorDashboardStats,
    PatientSummary,
};

const RECENT_LIMIT: usize = 5;

pub struct DashboardService {
    store: Arc<dyn ClinicStore>,
}

impl DashboardService {
    pub fn new(store: Arc<dyn ClinicStore>) -> Self {
        Self { store }
    }

    /// Loads every patient referenced by `appointments` in one lookup.
    async fn patients_for(&self, appointments: &[&Appointment]) -> Result<HashMap<Uuid, User>, AppointmentError> {
        let mut ids: Vec<Uuid> = appointments.iter().map(|a| a.user_id).collect();
        ids.sort();
        ids.dedup();

        let users = self.store.find_users(&ids).await?;
        Ok(users.into_iter().map(|u| (u.id, u)).collect())
    }

    async fn count_with(
        &self,
        base: &AppointmentFilter,
        statuses: &[DisplayStatus],
    ) -> Result<u64, AppointmentError> {
        let filter = base.clone().with_statuses(statuses);
        Ok(self.store.count_appointments(&filter).await?)
    }

    fn rows(
        appointments: &[Appointment],
        patients: &HashMap<Uuid, User>,
        today: NaiveDate,
    ) -> Vec<DoctorAppointmentView> {
        appointments
            .iter()
            .map(|a| DoctorAppointmentView::new(a, PatientSummary::from_user(patients.get(&a.user_id), today)))
            .collect()
    }

    /// The doctor's visible appointments, newest first, with patient details.
    pub async fn doctor_appointments(
        &self,
        doc_id: Uuid,
        today: NaiveDate,
    ) -> Result<Vec<DoctorAppointmentView>, AppointmentError> {
        let filter = AppointmentFilter::new().for_doctor(doc_id).visible_to_doctor();
        let appointments = self
            .store
            .find_appointments(&filter, ListOptions::newest_first())
            .await?;

        let patients = self.patients_for(&appointments.iter().collect::<Vec<_>>()).await?;
        Ok(Self::rows(&appointments, &patients, today))
    }

    pub async fn doctor_stats(&self, doc_id: Uuid, today: NaiveDate) -> Result<DoctorDashboardStats, AppointmentError> {
        let visible = AppointmentFilter::new().for_doctor(doc_id).visible_to_doctor();

        let total_appointments = self.store.count_appointments(&visible).await?;
        let completed_appointments = self
            .count_with(&visible, &[DisplayStatus::Completed, DisplayStatus::Missed])
            .await?;
        let confirmed_appointments = self.count_with(&visible, &[DisplayStatus::Confirmed]).await?;
        let cancelled_appointments = self.count_with(&visible, &[DisplayStatus::Cancelled]).await?;
        let pending_appointments = self.count_with(&visible, &[DisplayStatus::Pending]).await?;

        let today_filter = visible
            .clone()
            .on_dates(slot_date_keys(today))
            .with_statuses(&[
                DisplayStatus::Pending,
                DisplayStatus::Confirmed,
                DisplayStatus::Completed,
                DisplayStatus::Missed,
            ]);
        let today_list = self
            .store
            .find_appointments(&today_filter, ListOptions::by_slot_time())
            .await?;
        let recent_list = self
            .store
            .find_appointments(&visible, ListOptions::newest_first().limit(RECENT_LIMIT))
            .await?;

        let patients = self
            .patients_for(&today_list.iter().chain(recent_list.iter()).collect::<Vec<_>>())
            .await?;

        debug!(
            "Dashboard for doctor {}: {} total, {} today",
            doc_id,
            total_appointments,
            today_list.len()
        );

        Ok(DoctorDashboardStats {
            total_appointments,
            completed_appointments,
            confirmed_appointments,
            cancelled_appointments,
            pending_appointments,
            today_appointments: Self::rows(&today_list, &patients, today),
            recent_appointments: Self::rows(&recent_list, &patients, today),
        })
    }

    pub async fn admin_stats(&self) -> Result<AdminDashboardStats, AppointmentError> {
        let all = AppointmentFilter::new();

        let doctors = self.store.list_doctors().await?.len() as u64;
        let patients = self.store.count_users().await?;
        let appointments = self.store.count_appointments(&all).await?;
        let pending_appointments = self.count_with(&all, &[DisplayStatus::Pending]).await?;
        let confirmed_appointments = self.count_with(&all, &[DisplayStatus::Confirmed]).await?;
        let completed_appointments = self
            .count_with(&all, &[DisplayStatus::Completed, DisplayStatus::Missed])
            .await?;
        let cancelled_appointments = self.count_with(&all, &[DisplayStatus::Cancelled]).await?;

        let latest = self
            .store
            .find_appointments(&all, ListOptions::newest_first().limit(RECENT_LIMIT))
            .await?;

        Ok(AdminDashboardStats {
            doctors,
            patients,
            appointments,
            pending_appointments,
            confirmed_appointments,
            completed_appointments,
            cancelled_appointments,
            latest_appointments: latest.iter().map(AppointmentView::from).collect(),
        })
    }
}
