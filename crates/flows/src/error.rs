//! Why a flow produced no usable output.
//!
//! `Flow::run` never returns these: it logs the error and returns the
//! flow's fixed fallback output instead.

use std::time::Duration;

use curalink_core::{ProviderError, ValidationError};

use crate::template::TemplateError;

#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("Invalid input: {0}")]
    InvalidInput(ValidationError),

    #[error("Prompt rendering failed: {0}")]
    Template(#[from] TemplateError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Response contained no JSON object")]
    NoJson,

    #[error("Response is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Response does not match the output schema: {0}")]
    InvalidOutput(ValidationError),
}
