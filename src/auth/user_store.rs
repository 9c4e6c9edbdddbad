//! User Storage
//! Mission: In-memory user directory with bcrypt credential verification
//!
//! The gateway persists nothing across restarts, so the directory is a
//! map seeded at startup rather than a database table.

use crate::auth::models::{User, UserRole};
use anyhow::{Context, Result};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

/// In-memory user store
#[derive(Default)]
pub struct UserStore {
    users: RwLock<HashMap<String, User>>,
}

impl UserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with the standard deployment accounts, one per role
    pub fn with_default_users() -> Result<Self> {
        let store = Self::new();
        store.create_user("admin", "admin123", UserRole::Admin)?;
        store.create_user("trader1", "trader123", UserRole::Trader)?;
        store.create_user("risk1", "risk123", UserRole::RiskManager)?;
        store.create_user("compliance1", "compliance123", UserRole::Compliance)?;
        Ok(store)
    }

    /// Create a new user with a bcrypt-hashed password
    pub fn create_user(&self, username: &str, password: &str, role: UserRole) -> Result<User> {
        let password_hash = hash(password, DEFAULT_COST).context("Failed to hash password")?;

        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash,
            role,
            created_at: Utc::now(),
        };

        let mut users = self.users.write();
        if users.contains_key(username) {
            anyhow::bail!("User already exists: {username}");
        }
        users.insert(username.to_string(), user.clone());

        info!("Created user: {} ({})", user.username, user.role.as_str());
        Ok(user)
    }

    pub fn get_user_by_username(&self, username: &str) -> Option<User> {
        self.users.read().get(username).cloned()
    }

    /// Verify username and password. Unknown users verify false rather
    /// than erroring, so callers cannot distinguish the two.
    pub fn verify_password(&self, username: &str, password: &str) -> Result<bool> {
        match self.get_user_by_username(username) {
            Some(user) => {
                verify(password, &user.password_hash).context("Failed to verify password")
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_accounts_seeded() {
        let store = UserStore::with_default_users().unwrap();

        for (username, role) in [
            ("admin", UserRole::Admin),
            ("trader1", UserRole::Trader),
            ("risk1", UserRole::RiskManager),
            ("compliance1", UserRole::Compliance),
        ] {
            let user = store.get_user_by_username(username).unwrap();
            assert_eq!(user.role, role);
        }
    }

    #[test]
    fn test_password_verification() {
        let store = UserStore::new();
        store
            .create_user("trader9", "hunter2", UserRole::Trader)
            .unwrap();

        assert!(store.verify_password("trader9", "hunter2").unwrap());
        assert!(!store.verify_password("trader9", "wrong").unwrap());
        assert!(!store.verify_password("nonexistent", "hunter2").unwrap());
    }

    #[test]
    fn test_duplicate_username_rejected() {
        let store = UserStore::new();
        store.create_user("dup", "pass", UserRole::Trader).unwrap();
        assert!(store.create_user("dup", "pass", UserRole::Admin).is_err());
    }
}
