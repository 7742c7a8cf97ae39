//! Storefront account registration, login and profile.

use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use bookmart_auth::{PasswordHasher, User, UserProfilePatch};
use bookmart_cart::Cart;
use bookmart_core::{CartId, DomainError, DomainResult, UserId};

use crate::store::Datastore;

/// Registration input. Plaintext password, hashed before anything is stored.
#[derive(Debug, Clone)]
pub struct RegisterUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub phone: Option<String>,
}

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn Datastore>,
    hasher: PasswordHasher,
}

impl UserService {
    pub fn new(store: Arc<dyn Datastore>, hasher: PasswordHasher) -> Self {
        Self { store, hasher }
    }

    /// Create the account and its empty cart in one transaction.
    #[instrument(skip(self, input), fields(username = %input.username))]
    pub async fn register(&self, input: RegisterUser) -> DomainResult<User> {
        let password_hash = self.hasher.hash(&input.password)?;
        let now = Utc::now();

        let mut tx = self.store.begin().await?;
        if tx
            .find_user_by_username_or_email(&input.username, &input.email)
            .await?
            .is_some()
        {
            return Err(DomainError::conflict("username or email already taken"));
        }

        let user = User::new(
            UserId::new(),
            input.username,
            input.email,
            password_hash,
            input.full_name,
            input.phone,
            now,
        )?;
        tx.insert_user(&user).await?;
        tx.insert_cart(&Cart::new(CartId::new(), user.id, now)).await?;
        tx.commit().await?;

        tracing::info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    /// Verify credentials. The same `Unauthorized` comes back whether the
    /// username is unknown, the password is wrong or the account is disabled.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> DomainResult<User> {
        let mut tx = self.store.begin().await?;
        let user = tx
            .find_user_by_username(username)
            .await?
            .ok_or(DomainError::Unauthorized)?;
        if !self.hasher.verify(password, &user.password_hash) {
            return Err(DomainError::Unauthorized);
        }
        if !user.status.is_active() {
            return Err(DomainError::Unauthorized);
        }
        Ok(user)
    }

    pub async fn get_user(&self, user_id: UserId) -> DomainResult<User> {
        let mut tx = self.store.begin().await?;
        tx.find_user(user_id)
            .await?
            .ok_or(DomainError::UserNotFound)
    }

    #[instrument(skip(self, patch), fields(user_id = %user_id))]
    pub async fn update_profile(
        &self,
        user_id: UserId,
        patch: UserProfilePatch,
    ) -> DomainResult<User> {
        let mut tx = self.store.begin().await?;
        let mut user = tx
            .find_user(user_id)
            .await?
            .ok_or(DomainError::UserNotFound)?;
        user.apply_profile_patch(patch);
        tx.update_user(&user).await?;
        tx.commit().await?;
        Ok(user)
    }
}
