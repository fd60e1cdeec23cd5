//! # curalink-flows
//!
//! The AI-flow contract layer. Each use case is a [`FlowSpec`]: typed input
//! and output records, their schemas, a prompt template, and a repair /
//! fallback policy. [`Flow`] runs the shared pipeline, and [`FlowSet`]
//! bundles every flow behind one provider.
//!
//! Callers only ever see two outcomes: a policy-compliant output record, or
//! a [`ValidationError`](curalink_core::ValidationError) for bad input.

pub mod chat;
pub mod error;
pub mod flow;
pub mod follow_up;
pub mod policy;
pub mod recommend;
pub mod runner;
pub mod summarize;
pub mod template;
pub mod transcribe;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use curalink_config::DoctorEntry;

pub use chat::{ChatWithDoctor, ChatWithDoctorInput, ChatWithDoctorOutput};
pub use error::FlowError;
pub use flow::{Flow, FlowSpec};
pub use follow_up::{
    FollowUpSuggestionsInput, FollowUpSuggestionsOutput, GenerateFollowUpSuggestions, Suggestion,
};
pub use recommend::{RecommendDoctorSpecialty, RecommendSpecialtyInput, RecommendSpecialtyOutput};
pub use runner::{FlowRunner, FlowSettings};
pub use summarize::{SummarizeConsultation, SummarizeConsultationInput, SummarizeConsultationOutput};
pub use template::{Rendered, Template, TemplateError};
pub use transcribe::{
    TranscribeConsultation, TranscribeConsultationInput, TranscribeConsultationOutput,
};

/// Every flow, sharing one runner.
pub struct FlowSet {
    pub chat: Flow<ChatWithDoctor>,
    pub summarize: Flow<SummarizeConsultation>,
    pub transcribe: Flow<TranscribeConsultation>,
    pub follow_ups: Flow<GenerateFollowUpSuggestions>,
    pub recommend: Flow<RecommendDoctorSpecialty>,
}

impl FlowSet {
    pub fn new(runner: Arc<FlowRunner>, doctors: Vec<DoctorEntry>) -> Result<Self, TemplateError> {
        Ok(Self {
            chat: Flow::new(ChatWithDoctor, runner.clone())?,
            summarize: Flow::new(SummarizeConsultation, runner.clone())?,
            transcribe: Flow::new(TranscribeConsultation, runner.clone())?,
            follow_ups: Flow::new(GenerateFollowUpSuggestions, runner.clone())?,
            recommend: Flow::new(RecommendDoctorSpecialty::new(doctors), runner)?,
        })
    }

    /// Names of all flows, in wire form.
    pub fn names(&self) -> [&'static str; 5] {
        [
            self.chat.name(),
            self.summarize.name(),
            self.transcribe.name(),
            self.follow_ups.name(),
            self.recommend.name(),
        ]
    }
}
