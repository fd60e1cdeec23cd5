//! Patient and doctor accounts.
//!
//! Users live as one JSON list under [`USERS_KEY`]; the signed-in user is a
//! separate record under [`CURRENT_USER_KEY`], written on login and removed
//! on logout. Emails are compared case-insensitively and stored lower-cased.

use std::fmt;
use std::sync::Arc;

use curalink_core::{Field, KeyValueStore, Schema, StorageError, TextFormat, ValidationError};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::AccountError;
use crate::password::{hash_password, verify_password};
use crate::records::{load_list, save_list};

pub const USERS_KEY: &str = "curalink.users";
pub const CURRENT_USER_KEY: &str = "curalink.currentUser";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountRole {
    Patient,
    Doctor,
}

impl AccountRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Patient => "patient",
            Self::Doctor => "doctor",
        }
    }
}

impl fmt::Display for AccountRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted account. `password_hash` is an Argon2id PHC string.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredUser {
    pub email: String,
    pub password_hash: String,
    pub role: AccountRole,
}

/// The signed-in identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub email: String,
    pub role: AccountRole,
}

impl CurrentUser {
    pub fn require(&self, role: AccountRole) -> Result<(), AccountError> {
        if self.role == role {
            Ok(())
        } else {
            Err(AccountError::Forbidden { required: role })
        }
    }

    /// The part of the email before `@`, used as a display name.
    pub fn display_name(&self) -> &str {
        self.email
            .split('@')
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or("User")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub role: AccountRole,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub role: AccountRole,
}

const PASSWORD_TOO_SHORT: &str = "Password must be at least 6 characters.";
const ROLES: [&str; 2] = ["patient", "doctor"];

fn signup_schema() -> Schema {
    Schema::new()
        .field(Field::formatted("email", TextFormat::Email).trimmed())
        .field(Field::text("password").min(6).message(PASSWORD_TOO_SHORT))
        .field(Field::text("confirmPassword").min(6).message(PASSWORD_TOO_SHORT))
        .field(Field::one_of("role", ROLES).message("Please select a role."))
}

fn login_schema() -> Schema {
    Schema::new()
        .field(Field::formatted("email", TextFormat::Email).trimmed())
        .field(Field::text("password").message("Password is required."))
        .field(Field::one_of("role", ROLES).message("Please select a role."))
}

fn check<T: Serialize>(schema: &Schema, request: &T) -> Result<(), ValidationError> {
    let value = serde_json::to_value(request)
        .map_err(|e| ValidationError::new("(root)", e.to_string()))?;
    schema.validate(&value)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Sign-up, login, and logout against a [`KeyValueStore`].
pub struct AccountService {
    store: Arc<dyn KeyValueStore>,
    // Serialises read-modify-write of the user list.
    write: Mutex<()>,
}

impl AccountService {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            write: Mutex::new(()),
        }
    }

    /// Create an account. Does not sign the new user in.
    pub async fn signup(&self, request: SignupRequest) -> Result<CurrentUser, AccountError> {
        check(&signup_schema(), &request)?;
        if request.password != request.confirm_password {
            return Err(ValidationError::new("confirmPassword", "Passwords don't match.").into());
        }

        let email = normalize_email(&request.email);
        let password_hash = hash_password(&request.password)?;

        let _guard = self.write.lock().await;
        let mut users: Vec<StoredUser> = load_list(self.store.as_ref(), USERS_KEY).await?;
        if users.iter().any(|u| u.email.eq_ignore_ascii_case(&email)) {
            debug!(%email, "Signup rejected: email already registered");
            return Err(AccountError::EmailTaken);
        }

        users.push(StoredUser {
            email: email.clone(),
            password_hash,
            role: request.role,
        });
        save_list(self.store.as_ref(), USERS_KEY, &users).await?;

        info!(%email, role = %request.role, "Account created");
        Ok(CurrentUser {
            email,
            role: request.role,
        })
    }

    /// Verify credentials without recording a signed-in user.
    ///
    /// Unknown email, wrong password, and wrong role all fail the same way.
    pub async fn authenticate(&self, request: &LoginRequest) -> Result<CurrentUser, AccountError> {
        check(&login_schema(), request)?;
        let email = normalize_email(&request.email);

        let users: Vec<StoredUser> = load_list(self.store.as_ref(), USERS_KEY).await?;
        users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(&email) && u.role == request.role)
            .filter(|u| verify_password(&request.password, &u.password_hash))
            .map(|u| CurrentUser {
                email: u.email.clone(),
                role: u.role,
            })
            .ok_or(AccountError::InvalidCredentials)
    }

    /// Verify credentials and record the signed-in user.
    pub async fn login(&self, request: LoginRequest) -> Result<CurrentUser, AccountError> {
        let current = self.authenticate(&request).await?;
        let raw = serde_json::to_string(&current).map_err(|e| StorageError::Encode {
            key: CURRENT_USER_KEY.into(),
            reason: e.to_string(),
        })?;
        self.store.set(CURRENT_USER_KEY, raw).await?;

        info!(email = %current.email, role = %current.role, "Signed in");
        Ok(current)
    }

    pub async fn logout(&self) -> Result<(), AccountError> {
        self.store.remove(CURRENT_USER_KEY).await?;
        debug!("Signed out");
        Ok(())
    }

    /// The signed-in user, if any.
    pub async fn current_user(&self) -> Result<Option<CurrentUser>, AccountError> {
        let Some(raw) = self.store.get(CURRENT_USER_KEY).await? else {
            return Ok(None);
        };
        let user = serde_json::from_str(&raw).map_err(|e| StorageError::Corrupted {
            key: CURRENT_USER_KEY.into(),
            reason: e.to_string(),
        })?;
        Ok(Some(user))
    }

    /// The signed-in user, or [`AccountError::NotSignedIn`].
    pub async fn require_current(&self) -> Result<CurrentUser, AccountError> {
        self.current_user().await?.ok_or(AccountError::NotSignedIn)
    }
}
