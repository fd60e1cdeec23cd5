//! `recommendDoctorSpecialty`: map described symptoms onto an offered
//! specialty, optionally naming a listed doctor.

use curalink_config::DoctorEntry;
use curalink_core::schema::absent_as_default;
use curalink_core::{Field, FieldKind, Schema};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::flow::FlowSpec;
use crate::policy::{
    GENERAL_MEDICINE, RECOMMENDATION_DISCLAIMER, ensure_reasoning_disclaimer, normalize_specialty,
    vet_suggested_doctor,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendSpecialtyInput {
    pub symptoms: String,
    pub available_specialties: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendSpecialtyOutput {
    pub recommended_specialty: String,
    #[serde(default, deserialize_with = "absent_as_default")]
    pub reasoning: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_doctor: Option<String>,
}

const TEMPLATE: &str = r#"You are an assistant helping a patient choose which kind of doctor to see.
Based on the symptoms below, recommend exactly one specialty from the available list.
Do not diagnose. If no specialty clearly fits, recommend General Medicine.
Your reasoning must include the sentence "This is not medical advice."

Symptoms:
{{symptoms}}

Available specialties: {{#each availableSpecialties}}{{this}}{{#unless @last}}, {{/unless}}{{/each}}
{{#if doctors}}

Doctors on staff:
{{#each doctors}}
- {{this.name}} ({{this.specialty}})
{{/each}}
You may suggest one of these doctors if their specialty matches your recommendation.
{{/if}}"#;

/// Reasoning returned when no recommendation could be generated.
pub fn fallback_reasoning() -> String {
    format!(
        "Could not determine a specific specialty. It's always a good starting point to consult with General Medicine for a comprehensive evaluation. {RECOMMENDATION_DISCLAIMER}"
    )
}

/// Recommendation flow over a fixed doctor directory.
pub struct RecommendDoctorSpecialty {
    doctors: Vec<DoctorEntry>,
}

impl RecommendDoctorSpecialty {
    pub fn new(doctors: Vec<DoctorEntry>) -> Self {
        Self { doctors }
    }

    pub fn doctors(&self) -> &[DoctorEntry] {
        &self.doctors
    }
}

impl FlowSpec for RecommendDoctorSpecialty {
    const NAME: &'static str = "recommendDoctorSpecialty";
    type Input = RecommendSpecialtyInput;
    type Output = RecommendSpecialtyOutput;

    fn input_schema(&self) -> Schema {
        Schema::new()
            .field(
                Field::text("symptoms")
                    .trimmed()
                    .min(10)
                    .message("Please describe your symptoms in at least 10 characters.")
                    .describe("The symptoms described by the patient."),
            )
            .field(
                Field::list("availableSpecialties", FieldKind::Text(None))
                    .describe("The specialties the patient can choose from."),
            )
    }

    fn output_schema(&self) -> Schema {
        Schema::new()
            .field(
                Field::text("recommendedSpecialty")
                    .trimmed()
                    .describe("One specialty from the available list."),
            )
            .field(
                Field::text("reasoning")
                    .optional()
                    .describe("Why this specialty fits. Must state that this is not medical advice."),
            )
            .field(
                Field::text("suggestedDoctor")
                    .optional()
                    .describe("A listed doctor practising the recommended specialty."),
            )
    }

    fn template(&self) -> &'static str {
        TEMPLATE
    }

    fn prompt_context(&self, mut input: Value) -> Value {
        let doctors: Vec<Value> = self
            .doctors
            .iter()
            .map(|d| serde_json::json!({ "name": d.name, "specialty": d.specialty }))
            .collect();
        input["doctors"] = Value::Array(doctors);
        input
    }

    fn finish(&self, input: &Self::Input, mut output: Self::Output) -> Self::Output {
        output.recommended_specialty =
            normalize_specialty(&output.recommended_specialty, &input.available_specialties);
        ensure_reasoning_disclaimer(&mut output.reasoning);
        output.suggested_doctor = vet_suggested_doctor(
            output.suggested_doctor.as_deref(),
            &output.recommended_specialty,
            &self.doctors,
        );
        output
    }

    fn fallback(&self, _input: &Self::Input) -> Self::Output {
        RecommendSpecialtyOutput {
            recommended_specialty: GENERAL_MEDICINE.to_string(),
            reasoning: fallback_reasoning(),
            suggested_doctor: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{RECOMMENDATION_PHRASE, contains_ignore_case};
    use crate::testing::{Reply, scripted_flow};
    use curalink_core::ProviderError;
    use serde_json::json;

    fn specialties() -> Vec<String> {
        ["Cardiology", "Gastroenterology", "General Medicine"]
            .map(String::from)
            .to_vec()
    }

    fn spec() -> RecommendDoctorSpecialty {
        RecommendDoctorSpecialty::new(vec![
            DoctorEntry::new("Dr. Emily Carter", "Cardiology"),
            DoctorEntry::new("Dr. Johnathan Lee", "Gastroenterology"),
            DoctorEntry::new("Dr. Sarah Green", "General Medicine"),
        ])
    }

    fn input(symptoms: &str) -> RecommendSpecialtyInput {
        RecommendSpecialtyInput {
            symptoms: symptoms.into(),
            available_specialties: specialties(),
        }
    }

    #[tokio::test]
    async fn cough_and_fever_scenario() {
        let (flow, _) = scripted_flow(
            spec(),
            vec![Reply::json(json!({
                "recommendedSpecialty": "General Medicine",
                "reasoning": "A cough with mild fever is commonly assessed by a general practitioner first.",
                "suggestedDoctor": "Dr. Sarah Green (General Medicine)"
            }))],
        );
        let output = flow
            .run(input("persistent dry cough and mild fever for five days"))
            .await
            .unwrap();

        assert!(specialties().contains(&output.recommended_specialty));
        assert!(contains_ignore_case(&output.reasoning, RECOMMENDATION_PHRASE));
        assert_eq!(
            output.suggested_doctor.as_deref(),
            Some("Dr. Sarah Green (General Medicine)")
        );
    }

    #[tokio::test]
    async fn unknown_specialty_becomes_general_medicine() {
        let (flow, _) = scripted_flow(
            spec(),
            vec![Reply::json(json!({
                "recommendedSpecialty": "Pulmonology",
                "reasoning": "Lung symptoms. This is not medical advice.",
                "suggestedDoctor": "Dr. Emily Carter (Cardiology)"
            }))],
        );
        let output = flow
            .run(input("shortness of breath when climbing stairs"))
            .await
            .unwrap();

        assert_eq!(output.recommended_specialty, GENERAL_MEDICINE);
        assert_eq!(output.reasoning, "Lung symptoms. This is not medical advice.");
        assert_eq!(output.suggested_doctor, None);
    }

    #[tokio::test]
    async fn specialty_case_is_canonicalised() {
        let (flow, _) = scripted_flow(
            spec(),
            vec![Reply::json(json!({
                "recommendedSpecialty": "cardiology",
                "reasoning": "Palpitations are a heart concern."
            }))],
        );
        let output = flow
            .run(input("heart palpitations after coffee"))
            .await
            .unwrap();
        assert_eq!(output.recommended_specialty, "Cardiology");
        assert!(output.reasoning.ends_with(RECOMMENDATION_DISCLAIMER));
    }

    #[tokio::test]
    async fn missing_reasoning_keeps_recommendation() {
        let (flow, _) = scripted_flow(
            spec(),
            vec![Reply::json(json!({ "recommendedSpecialty": "Cardiology" }))],
        );
        let output = flow
            .run(input("chest tightness when climbing stairs"))
            .await
            .unwrap();
        assert_eq!(output.recommended_specialty, "Cardiology");
        assert_eq!(output.reasoning, RECOMMENDATION_DISCLAIMER);
        assert_eq!(output.suggested_doctor, None);
    }

    #[tokio::test]
    async fn null_reasoning_keeps_recommendation() {
        let (flow, _) = scripted_flow(
            spec(),
            vec![Reply::json(json!({
                "recommendedSpecialty": "Gastroenterology",
                "reasoning": null
            }))],
        );
        let output = flow
            .run(input("stomach cramps after every meal"))
            .await
            .unwrap();
        assert_eq!(output.recommended_specialty, "Gastroenterology");
        assert!(contains_ignore_case(&output.reasoning, RECOMMENDATION_PHRASE));
    }

    #[tokio::test]
    async fn failure_falls_back_to_general_medicine() {
        let (flow, _) = scripted_flow(
            spec(),
            vec![Reply::Error(ProviderError::Network("connection reset".into()))],
        );
        let output = flow
            .run(input("stomach ache after every meal"))
            .await
            .unwrap();
        assert_eq!(output.recommended_specialty, GENERAL_MEDICINE);
        assert_eq!(output.reasoning, fallback_reasoning());
        assert!(contains_ignore_case(&output.reasoning, RECOMMENDATION_PHRASE));
        assert_eq!(output.suggested_doctor, None);
    }

    #[tokio::test]
    async fn schema_invalid_reply_falls_back() {
        let (flow, _) = scripted_flow(spec(), vec![Reply::json(json!({ "reasoning": "hmm" }))]);
        let output = flow.run(input("recurring headaches at night")).await.unwrap();
        assert_eq!(output.recommended_specialty, GENERAL_MEDICINE);
    }

    #[tokio::test]
    async fn short_symptoms_rejected_with_message() {
        let (flow, provider) = scripted_flow(spec(), vec![]);
        let err = flow.run(input("  cough   ")).await.unwrap_err();
        assert_eq!(err.field, "symptoms");
        assert_eq!(
            err.message,
            "Please describe your symptoms in at least 10 characters."
        );
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn recommendation_always_in_offered_set() {
        let answers = ["Cardiology", "Neurology", "", "GASTROENTEROLOGY", "General Medicine "];
        for answer in answers {
            let (flow, _) = scripted_flow(
                spec(),
                vec![Reply::json(json!({
                    "recommendedSpecialty": answer,
                    "reasoning": "Because."
                }))],
            );
            let output = flow.run(input("tiredness and dizziness daily")).await.unwrap();
            let mut allowed = specialties();
            allowed.push(GENERAL_MEDICINE.to_string());
            assert!(allowed.contains(&output.recommended_specialty), "{answer:?}");
            assert!(contains_ignore_case(&output.reasoning, RECOMMENDATION_PHRASE));
        }
    }

    #[test]
    fn prompt_lists_specialties_and_doctors() {
        let (flow, _) = scripted_flow(spec(), vec![]);
        let rendered = flow.render(&input("persistent dry cough")).unwrap();
        assert!(
            rendered
                .text
                .contains("Available specialties: Cardiology, Gastroenterology, General Medicine\n")
        );
        assert!(rendered.text.contains("- Dr. Johnathan Lee (Gastroenterology)"));
    }
}
