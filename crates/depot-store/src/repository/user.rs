//! # User Administration
//!
//! Passwords are stored as Argon2 PHC strings and only ever change through
//! [`UserRepository::set_password`]; a plain edit keeps the stored hash.
//!
//! ## Last Administrator
//! ```text
//! demote / deactivate / archive / delete
//!      │
//!      ├── was the user an active admin?          no ──► allowed
//!      ├── is another active admin left?          yes ─► allowed
//!      ▼
//!  CoreError::LastAdmin
//! ```

use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use depot_core::validation::normalize_key;
use depot_core::{CoreError, Entity, User, ValidationError};
use tracing::{info, warn};

use super::hooks::{Change, WriteHook};
use super::Repository;
use crate::backend::{Batch, StoreBackend};
use crate::error::{StoreError, StoreResult};

pub const MIN_PASSWORD_LEN: usize = 8;

impl WriteHook for User {
    async fn on_write(
        backend: &StoreBackend,
        change: Change<'_, Self>,
        _batch: &mut Batch,
    ) -> StoreResult<()> {
        let Some(before) = change.before() else {
            return Ok(());
        };
        let still_admin = change.after().is_some_and(User::is_active_admin);
        if !before.is_active_admin() || still_admin {
            return Ok(());
        }

        let others = Repository::<User>::new(backend.clone())
            .list(false)
            .await?
            .into_iter()
            .filter(|u| u.id() != before.id() && u.is_active_admin())
            .count();
        if others == 0 {
            warn!(username = %before.username, "Refused to remove the last administrator");
            return Err(CoreError::LastAdmin.into());
        }
        Ok(())
    }
}

fn hash_password(password: &str) -> StoreResult<String> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::InvalidFormat {
            field: "password".to_string(),
            reason: format!("must be at least {MIN_PASSWORD_LEN} characters"),
        }
        .into());
    }

    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| StoreError::Internal(format!("Failed to hash password: {e}")))?;
    Ok(hash.to_string())
}

fn password_matches(password: &str, hash: &str) -> bool {
    let parsed = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[derive(Debug, Clone)]
pub struct UserRepository {
    users: Repository<User>,
}

impl UserRepository {
    pub fn new(backend: StoreBackend) -> Self {
        UserRepository {
            users: Repository::new(backend),
        }
    }

    pub fn records(&self) -> &Repository<User> {
        &self.users
    }

    /// Creates a user with an initial password.
    pub async fn create_with_password(&self, mut user: User, password: &str) -> StoreResult<User> {
        user.password_hash = hash_password(password)?;
        let user = self.users.create(user).await?;
        info!(username = %user.username, role = %user.role, "User created");
        Ok(user)
    }

    pub async fn set_password(&self, id: &str, password: &str) -> StoreResult<User> {
        let stored = self.users.require(id).await?;
        if stored.is_archived() {
            return Err(super::archived(&stored).into());
        }
        let mut user = stored.clone();
        user.password_hash = hash_password(password)?;
        user.touch();
        let user = self.users.save_with(&stored, user, Batch::new()).await?;
        info!(username = %user.username, "Password changed");
        Ok(user)
    }

    /// Checks a username and password pair. Inactive, archived and
    /// password-less accounts never match.
    pub async fn verify_password(&self, username: &str, password: &str) -> StoreResult<bool> {
        let key = normalize_key(username);
        let user = self
            .users
            .list(false)
            .await?
            .into_iter()
            .find(|u| normalize_key(&u.username) == key);

        Ok(match user {
            Some(user) if user.active && !user.password_hash.is_empty() => {
                password_matches(password, &user.password_hash)
            }
            _ => false,
        })
    }
}
