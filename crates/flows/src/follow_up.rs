//! `generateFollowUpSuggestions`: general wellness tips after a consultation.
//!
//! Output always carries the disclaimer entry and at least three
//! suggestions; see [`crate::policy::apply_follow_up_policy`].

use curalink_core::{Field, FieldKind, Schema};
use serde::{Deserialize, Serialize};

use crate::flow::FlowSpec;
use crate::policy::{FOLLOW_UP_DISCLAIMER, apply_follow_up_policy};

/// Most suggestions kept from the model before the policy runs.
pub const MAX_MODEL_SUGGESTIONS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub title: String,
    pub detail: String,
}

impl Suggestion {
    pub fn new(title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowUpSuggestionsInput {
    pub consultation_summary: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowUpSuggestionsOutput {
    pub suggestions: Vec<Suggestion>,
}

const TEMPLATE: &str = r#"You are an assistant offering general, non-prescriptive follow-up suggestions after a telehealth consultation.
Offer wellness tips, self-care reminders, or topics the patient may want to research or raise with their doctor at a future appointment.

Rules:
- Do not give medical advice, diagnoses, or treatment plans.
- Do not suggest specific medications or dosages.
- Do not make urgent recommendations.
- Do not interpret or expand on medical conditions mentioned in the summary.
- Keep every suggestion general and safe.
- Give 3 or 4 suggestions.

Consultation summary:
{{consultationSummary}}

One suggestion must state exactly: "Disclaimer: {{disclaimer}}""#;

pub struct GenerateFollowUpSuggestions;

impl FlowSpec for GenerateFollowUpSuggestions {
    const NAME: &'static str = "generateFollowUpSuggestions";
    type Input = FollowUpSuggestionsInput;
    type Output = FollowUpSuggestionsOutput;

    fn input_schema(&self) -> Schema {
        Schema::new().field(
            Field::text("consultationSummary")
                .trimmed()
                .describe("The summary of the telehealth consultation."),
        )
    }

    fn output_schema(&self) -> Schema {
        let suggestion = Schema::new()
            .field(
                Field::text("title")
                    .describe("A concise title for the suggestion."),
            )
            .field(
                Field::text("detail")
                    .describe("A short explanation or action point. Not medical advice."),
            );
        Schema::new().field(
            Field::list("suggestions", FieldKind::Object(suggestion)).describe(
                "General follow-up suggestions or wellness tips. These are not medical advice.",
            ),
        )
    }

    fn template(&self) -> &'static str {
        TEMPLATE
    }

    fn prompt_context(&self, mut input: serde_json::Value) -> serde_json::Value {
        input["disclaimer"] = FOLLOW_UP_DISCLAIMER.into();
        input
    }

    fn finish(&self, _input: &Self::Input, mut output: Self::Output) -> Self::Output {
        output.suggestions.truncate(MAX_MODEL_SUGGESTIONS);
        apply_follow_up_policy(&mut output.suggestions);
        output
    }

    fn fallback(&self, _input: &Self::Input) -> Self::Output {
        let mut suggestions = Vec::new();
        apply_follow_up_policy(&mut suggestions);
        FollowUpSuggestionsOutput { suggestions }
    }
}
