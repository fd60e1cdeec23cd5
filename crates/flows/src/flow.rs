//! The generic flow invoker.
//!
//! A [`FlowSpec`] declares one use case: its schemas, its prompt, how to
//! repair model output, and what to return when generation fails. [`Flow`]
//! runs the fixed pipeline around it:
//!
//! ```text
//! input ─▶ validate ─▶ render ─▶ provider ─▶ extract JSON ─▶ validate ─▶ finish
//!            │                        (any failure here) ──────────────▶ fallback
//!            └─▶ ValidationError (returned to caller, provider never called)
//! ```

use std::sync::Arc;

use curalink_core::{Schema, ValidationError};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::FlowError;
use crate::runner::FlowRunner;
use crate::template::{Rendered, Template, TemplateError};

/// Declaration of a single use case.
pub trait FlowSpec: Send + Sync + 'static {
    /// Wire name of the flow (e.g., `chatWithDoctor`).
    const NAME: &'static str;

    type Input: Serialize + Send + Sync;
    type Output: DeserializeOwned + Send;

    fn input_schema(&self) -> Schema;

    fn output_schema(&self) -> Schema;

    /// Prompt template source.
    fn template(&self) -> &'static str;

    /// Extra render context beyond the input record.
    fn prompt_context(&self, input: Value) -> Value {
        input
    }

    /// Post-process a schema-valid model output.
    fn finish(&self, input: &Self::Input, output: Self::Output) -> Self::Output;

    /// Output returned when generation fails.
    fn fallback(&self, input: &Self::Input) -> Self::Output;
}

/// A flow ready to run: parsed template, built schemas, shared runner.
pub struct Flow<S: FlowSpec> {
    spec: S,
    input_schema: Schema,
    output_schema: Schema,
    template: Template,
    runner: Arc<FlowRunner>,
}

impl<S: FlowSpec> Flow<S> {
    pub fn new(spec: S, runner: Arc<FlowRunner>) -> Result<Self, TemplateError> {
        Ok(Self {
            input_schema: spec.input_schema(),
            output_schema: spec.output_schema(),
            template: Template::parse(spec.template())?,
            spec,
            runner,
        })
    }

    pub fn name(&self) -> &'static str {
        S::NAME
    }

    pub fn spec(&self) -> &S {
        &self.spec
    }

    pub fn input_schema(&self) -> &Schema {
        &self.input_schema
    }

    pub fn output_schema(&self) -> &Schema {
        &self.output_schema
    }

    /// Validate an input record, returning its JSON form.
    pub fn check(&self, input: &S::Input) -> Result<Value, ValidationError> {
        let value = serde_json::to_value(input)
            .map_err(|e| ValidationError::new("(root)", e.to_string()))?;
        self.input_schema.validate(&value).inspect_err(|e| {
            debug!(flow = S::NAME, field = %e.field, reason = %e.message, "Rejected flow input");
        })?;
        Ok(value)
    }

    /// Render the prompt for a valid input without calling the provider.
    pub fn render(&self, input: &S::Input) -> Result<Rendered, FlowError> {
        let value = self.check(input).map_err(FlowError::InvalidInput)?;
        Ok(self.template.render(&self.spec.prompt_context(value))?)
    }

    /// Run the flow.
    ///
    /// Only input validation errors are returned; every later failure is
    /// logged and replaced by the flow's fallback output.
    pub async fn run(&self, input: S::Input) -> Result<S::Output, ValidationError> {
        let value = self.check(&input)?;

        match self.generate(value).await {
            Ok(output) => Ok(self.spec.finish(&input, output)),
            Err(error) => {
                warn!(flow = S::NAME, %error, fallback = true, "Flow failed, returning fallback output");
                Ok(self.spec.fallback(&input))
            }
        }
    }

    async fn generate(&self, input: Value) -> Result<S::Output, FlowError> {
        let prompt = self.template.render(&self.spec.prompt_context(input))?;
        let value = self
            .runner
            .generate(S::NAME, &self.output_schema, prompt)
            .await?;
        Ok(serde_json::from_value(value)?)
    }
}
