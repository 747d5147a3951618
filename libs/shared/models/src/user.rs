use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_USER_IMAGE: &str =
    "https://res.cloudinary.com/demo/image/upload/v1/samples/people/default-avatar.png";
pub const NOT_SELECTED: &str = "Not Selected";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub line1: String,
    #[serde(default)]
    pub line2: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub image: String,
    pub address: Address,
    pub gender: String,
    pub dob: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: String, email: String, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            email,
            password_hash,
            image: DEFAULT_USER_IMAGE.to_string(),
            address: Address::default(),
            gender: NOT_SELECTED.to_string(),
            dob: NOT_SELECTED.to_string(),
            phone: "0000000000".to_string(),
            created_at: Utc::now(),
        }
    }

    /// Age in whole years on `today`, if `dob` holds a `YYYY-MM-DD` date.
    pub fn age_on(&self, today: NaiveDate) -> Option<u32> {
        let birth = NaiveDate::parse_from_str(&self.dob, "%Y-%m-%d").ok()?;
        let mut age = today.year() - birth.year();
        if (today.month(), today.day()) < (birth.month(), birth.day()) {
            age -= 1;
        }
        u32::try_from(age).ok()
    }
}

/// Client-facing profile. Never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub image: String,
    pub address: Address,
    pub gender: String,
    pub dob: String,
    pub phone: String,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            image: user.image.clone(),
            address: user.address.clone(),
            gender: user.gender.clone(),
            dob: user.dob.clone(),
            phone: user.phone.clone(),
        }
    }
}
