//! Back-office user accounts.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use ts_rs::TS;

use crate::entity::{Collection, Entity, Record};
use crate::error::CoreResult;
use crate::migration;
use crate::validation::{normalize_key, validate_code, validate_email, validate_name, ValidationResult};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    #[default]
    Staff,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => f.write_str("admin"),
            Role::Manager => f.write_str("manager"),
            Role::Staff => f.write_str("staff"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(flatten)]
    pub record: Record,

    pub username: String,

    #[serde(default)]
    pub display_name: Option<String>,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub role: Role,

    #[serde(default = "default_active")]
    pub active: bool,

    /// Argon2 PHC string. Stored, never sent to clients.
    #[ts(skip)]
    #[serde(default)]
    pub password_hash: String,
}

fn default_active() -> bool {
    true
}

impl User {
    pub fn new(username: impl Into<String>, role: Role) -> Self {
        User {
            record: Record::new(),
            username: username.into(),
            display_name: None,
            email: None,
            role,
            active: true,
            password_hash: String::new(),
        }
    }

    /// Counts toward the "at least one administrator" rule.
    pub fn is_active_admin(&self) -> bool {
        self.role == Role::Admin && self.active && !self.record.archived
    }
}

impl Entity for User {
    const COLLECTION: Collection = Collection::Users;
    const LABEL: &'static str = "User";

    fn record(&self) -> &Record {
        &self.record
    }

    fn record_mut(&mut self) -> &mut Record {
        &mut self.record
    }

    /// Passwords only change through the dedicated password operation.
    fn merge_update(&self, mut incoming: Self) -> CoreResult<Self> {
        incoming.password_hash = self.password_hash.clone();
        Ok(incoming)
    }

    fn validate(&self) -> ValidationResult<()> {
        validate_code("username", &self.username)?;
        if let Some(name) = &self.display_name {
            validate_name("displayName", name)?;
        }
        validate_email("email", self.email.as_deref())
    }

    fn unique_key(&self) -> Option<(&'static str, String)> {
        Some(("username", normalize_key(&self.username)))
    }

    fn migrate(doc: &mut Value) -> bool {
        migration::migrate_user(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_admin() {
        let mut user = User::new("root", Role::Admin);
        assert!(user.is_active_admin());
        user.active = false;
        assert!(!user.is_active_admin());
        user.active = true;
        user.record.archived = true;
        assert!(!user.is_active_admin());
    }

    #[test]
    fn test_update_keeps_password_hash() {
        let mut stored = User::new("dana", Role::Staff);
        stored.password_hash = "$argon2id$stored".to_string();
        let mut edit = stored.clone();
        edit.password_hash.clear();
        edit.role = Role::Manager;

        let merged = stored.merge_update(edit).unwrap();
        assert_eq!(merged.password_hash, "$argon2id$stored");
        assert_eq!(merged.role, Role::Manager);
    }

    #[test]
    fn test_username_unique_key_is_case_insensitive() {
        let user = User::new("Dana", Role::Staff);
        assert_eq!(user.unique_key(), Some(("username", "dana".to_string())));
    }
}
