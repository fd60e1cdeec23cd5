//! `summarizeConsultation`: a short summary of a consultation transcript.

use curalink_core::{Field, Schema};
use serde::{Deserialize, Serialize};

use crate::flow::FlowSpec;

pub const SUMMARY_FALLBACK: &str =
    "A summary is not available right now. Please try again later or review the full transcript.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarizeConsultationInput {
    pub consultation_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarizeConsultationOutput {
    pub summary: String,
}

const TEMPLATE: &str = r#"You are an assistant that summarizes telehealth consultations for healthcare providers.

Write a concise summary of the consultation transcript below. Highlight the key discussion points, any diagnoses, and any recommendations.

Consultation transcript:
{{consultationText}}"#;

pub struct SummarizeConsultation;

impl FlowSpec for SummarizeConsultation {
    const NAME: &'static str = "summarizeConsultation";
    type Input = SummarizeConsultationInput;
    type Output = SummarizeConsultationOutput;

    fn input_schema(&self) -> Schema {
        Schema::new().field(
            Field::text("consultationText")
                .trimmed()
                .describe("The full text of the consultation transcript."),
        )
    }

    fn output_schema(&self) -> Schema {
        Schema::new().field(
            Field::text("summary")
                .trimmed()
                .describe("A concise summary of the consultation."),
        )
    }

    fn template(&self) -> &'static str {
        TEMPLATE
    }

    fn finish(&self, _input: &Self::Input, output: Self::Output) -> Self::Output {
        output
    }

    fn fallback(&self, _input: &Self::Input) -> Self::Output {
        SummarizeConsultationOutput {
            summary: SUMMARY_FALLBACK.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Reply, scripted_flow};
    use serde_json::json;

    fn input(text: &str) -> SummarizeConsultationInput {
        SummarizeConsultationInput {
            consultation_text: text.into(),
        }
    }

    #[tokio::test]
    async fn passes_summary_through() {
        let (flow, provider) = scripted_flow(
            SummarizeConsultation,
            vec![Reply::text(
                "```json\n{\"summary\": \"Patient reports a dry cough; advised rest.\"}\n```",
            )],
        );
        let output = flow
            .run(input("Doctor: How are you?\nPatient: I have a dry cough."))
            .await
            .unwrap();
        assert_eq!(output.summary, "Patient reports a dry cough; advised rest.");

        let prompt = provider.last_request().unwrap().messages[0].content.clone();
        assert!(prompt.ends_with("Patient: I have a dry cough."));
    }

    #[tokio::test]
    async fn empty_transcript_rejected() {
        let (flow, provider) = scripted_flow(SummarizeConsultation, vec![]);
        let err = flow.run(input("  ")).await.unwrap_err();
        assert_eq!(err.field, "consultationText");
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn missing_summary_field_falls_back() {
        let (flow, _) = scripted_flow(
            SummarizeConsultation,
            vec![Reply::json(json!({ "notes": "something else" }))],
        );
        let output = flow.run(input("Doctor: Hello")).await.unwrap();
        assert_eq!(output.summary, SUMMARY_FALLBACK);
    }
}
