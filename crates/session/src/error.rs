use curalink_core::ValidationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("No audio was captured.")]
    EmptyRecording,

    #[error("Doctor responder '{responder}' failed: {reason}")]
    Responder { responder: String, reason: String },
}
