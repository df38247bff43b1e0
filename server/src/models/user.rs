use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "camelCase")]
#[sqlx(type_name = "user_role", rename_all = "camelCase")]
pub enum UserRole {
    #[default]
    Customer,
    Organizer,
    SiteAdmin,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub display_name: String,
    pub email: String,
    pub role: UserRole,
    pub phone_code: String,
    pub mobile_number: Option<String>,
    pub picture: Option<String>,
    pub country: Option<String>,
    pub disabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub display_name: String,
    pub email: String,
    #[serde(default)]
    pub role: UserRole,
    pub phone_code: Option<String>,
    pub mobile_number: Option<String>,
    pub picture: Option<String>,
    pub country: Option<String>,
}

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    pub display_name: Option<String>,
    pub role: Option<UserRole>,
    pub phone_code: Option<String>,
    pub mobile_number: Option<String>,
    pub picture: Option<String>,
    pub country: Option<String>,
}

impl NewUser {
    pub fn into_user(self, default_country: &str) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            display_name: self.display_name.trim().to_string(),
            email: self.email.trim().to_lowercase(),
            role: self.role,
            phone_code: self.phone_code.unwrap_or_default(),
            mobile_number: self.mobile_number,
            picture: self.picture,
            country: Some(self.country.unwrap_or_else(|| default_country.to_string())),
            disabled: false,
            created_at: now,
            updated_at: now,
        }
    }
}

impl User {
    pub fn apply(&mut self, update: UserUpdate) {
        if let Some(display_name) = update.display_name {
            self.display_name = display_name;
        }
        if let Some(role) = update.role {
            self.role = role;
        }
        if let Some(phone_code) = update.phone_code {
            self.phone_code = phone_code;
        }
        if update.mobile_number.is_some() {
            self.mobile_number = update.mobile_number;
        }
        if update.picture.is_some() {
            self.picture = update.picture;
        }
        if update.country.is_some() {
            self.country = update.country;
        }
        self.updated_at = Utc::now();
    }
}
