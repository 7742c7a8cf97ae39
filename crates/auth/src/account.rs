//! Storefront user and back-office admin account records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bookmart_core::{AdminId, DomainError, UserId};

use crate::Permission;

/// Account status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    #[default]
    Active,
    Disabled,
}

impl UserStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, UserStatus::Active)
    }
}

/// A storefront user. `password_hash` is a bcrypt hash; the plaintext never
/// leaves the registration/login handlers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        id: UserId,
        username: String,
        email: String,
        password_hash: String,
        full_name: String,
        phone: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if username.trim().is_empty() {
            return Err(DomainError::validation("username cannot be empty"));
        }
        if !email.contains('@') {
            return Err(DomainError::validation("email is not valid"));
        }
        if full_name.trim().is_empty() {
            return Err(DomainError::validation("full name cannot be empty"));
        }
        Ok(Self {
            id,
            username,
            email,
            password_hash,
            full_name,
            phone,
            address: None,
            city: None,
            postal_code: None,
            status: UserStatus::Active,
            created_at: now,
        })
    }

    pub fn apply_profile_patch(&mut self, patch: UserProfilePatch) {
        if let Some(full_name) = patch.full_name {
            self.full_name = full_name;
        }
        if let Some(phone) = patch.phone {
            self.phone = Some(phone);
        }
        if let Some(address) = patch.address {
            self.address = Some(address);
        }
        if let Some(city) = patch.city {
            self.city = Some(city);
        }
        if let Some(postal_code) = patch.postal_code {
            self.postal_code = Some(postal_code);
        }
    }
}

/// Partial profile update; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfilePatch {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
}

/// A back-office admin with an explicit permission grant list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Admin {
    pub id: AdminId,
    pub username: String,
    pub password_hash: String,
    pub full_name: String,
    pub permissions: Vec<Permission>,
    pub status: UserStatus,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Admin {
    pub fn has_permission(&self, required: &Permission) -> bool {
        self.permissions
            .iter()
            .any(|p| p.is_wildcard() || p == required)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User::new(
            UserId::new(),
            "reader".to_string(),
            "reader@example.com".to_string(),
            "$2b$10$hash".to_string(),
            "A Reader".to_string(),
            None,
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn new_users_are_active() {
        assert!(user().status.is_active());
    }

    #[test]
    fn invalid_email_rejected() {
        let err = User::new(
            UserId::new(),
            "reader".to_string(),
            "not-an-email".to_string(),
            "h".to_string(),
            "A Reader".to_string(),
            None,
            Utc::now(),
        );
        assert!(err.is_err());
    }

    #[test]
    fn profile_patch_touches_only_set_fields() {
        let mut u = user();
        u.apply_profile_patch(UserProfilePatch {
            city: Some("Rotterdam".to_string()),
            ..UserProfilePatch::default()
        });
        assert_eq!(u.city.as_deref(), Some("Rotterdam"));
        assert_eq!(u.full_name, "A Reader");
    }

    #[test]
    fn wildcard_admin_has_every_permission() {
        let admin = Admin {
            id: AdminId::new(),
            username: "root".to_string(),
            password_hash: "h".to_string(),
            full_name: "Root".to_string(),
            permissions: vec![Permission::new("*")],
            status: UserStatus::Active,
            last_login_at: None,
            created_at: Utc::now(),
        };
        assert!(admin.has_permission(&Permission::new("books.write")));
    }
}
