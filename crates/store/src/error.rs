use curalink_core::{StorageError, ValidationError};
use thiserror::Error;

use crate::accounts::AccountRole;

/// Failures of account, prescription, and testimonial operations.
#[derive(Debug, Error)]
pub enum AccountError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("An account with this email already exists.")]
    EmailTaken,

    #[error("Invalid email, password, or role.")]
    InvalidCredentials,

    #[error("You need to be logged in to do that.")]
    NotSignedIn,

    #[error("Only {required} accounts can do that.")]
    Forbidden { required: AccountRole },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Password hashing failed: {0}")]
    Hashing(String),
}
