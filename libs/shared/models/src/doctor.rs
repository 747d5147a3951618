use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::user::Address;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub image: String,
    pub speciality: String,
    pub degree: String,
    pub experience: String,
    pub about: String,
    pub available: bool,
    pub fees: f64,
    pub address: Address,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub slots_booked: SlotBook,
    /// Bumped on every write to `slots_booked`; guards compare-and-swap updates.
    #[serde(default)]
    pub slots_version: i64,
}

impl Doctor {
    pub fn snapshot(&self) -> DoctorSnapshot {
        DoctorSnapshot {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            image: self.image.clone(),
            speciality: self.speciality.clone(),
            degree: self.degree.clone(),
            experience: self.experience.clone(),
            about: self.about.clone(),
            fees: self.fees,
            address: self.address.clone(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Slot {time} on {date} is already booked")]
pub struct SlotTaken {
    pub date: String,
    pub time: String,
}

/// Reserved slots of one doctor: date key (`day_month_year`) to booked times.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotBook(BTreeMap<String, Vec<String>>);

impl SlotBook {
    pub fn is_booked(&self, date: &str, time: &str) -> bool {
        self.0
            .get(date)
            .map(|times| times.iter().any(|t| t == time))
            .unwrap_or(false)
    }

    pub fn times(&self, date: &str) -> &[String] {
        self.0.get(date).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn reserve(&mut self, date: &str, time: &str) -> Result<(), SlotTaken> {
        if self.is_booked(date, time) {
            return Err(SlotTaken {
                date: date.to_string(),
                time: time.to_string(),
            });
        }
        self.0.entry(date.to_string()).or_default().push(time.to_string());
        Ok(())
    }

    /// Removes `time` under `date`, dropping the date key once empty.
    /// Returns whether anything was removed.
    pub fn release(&mut self, date: &str, time: &str) -> bool {
        let Some(times) = self.0.get_mut(date) else {
            return false;
        };
        let before = times.len();
        times.retain(|t| t != time);
        let removed = times.len() != before;
        if times.is_empty() {
            self.0.remove(date);
        }
        removed
    }

    pub fn contains_date(&self, date: &str) -> bool {
        self.0.contains_key(date)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Doctor data copied onto an appointment at booking time (`docData`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoctorSnapshot {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub image: String,
    pub speciality: String,
    pub degree: String,
    pub experience: String,
    pub about: String,
    pub fees: f64,
    pub address: Address,
}

/// Client-facing doctor document. Never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorProfile {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub image: String,
    pub speciality: String,
    pub degree: String,
    pub experience: String,
    pub about: String,
    pub available: bool,
    pub fees: f64,
    pub address: Address,
    pub date: i64,
    pub slots_booked: SlotBook,
    #[serde(rename = "appointmentCount", skip_serializing_if = "Option::is_none")]
    pub appointment_count: Option<u64>,
}

impl DoctorProfile {
    /// Profile shown to anonymous visitors: the email is withheld.
    pub fn public(doctor: &Doctor) -> Self {
        let mut profile = Self::private(doctor);
        profile.email = None;
        profile
    }

    /// Profile shown to the doctor themselves and to admins.
    pub fn private(doctor: &Doctor) -> Self {
        Self {
            id: doctor.id,
            name: doctor.name.clone(),
            email: Some(doctor.email.clone()),
            image: doctor.image.clone(),
            speciality: doctor.speciality.clone(),
            degree: doctor.degree.clone(),
            experience: doctor.experience.clone(),
            about: doctor.about.clone(),
            available: doctor.available,
            fees: doctor.fees,
            address: doctor.address.clone(),
            date: doctor.created_at.timestamp_millis(),
            slots_booked: doctor.slots_booked.clone(),
            appointment_count: None,
        }
    }

    pub fn with_appointment_count(mut self, count: u64) -> Self {
        self.appointment_count = Some(count);
        self
    }
}
