//! `chatWithDoctor`: one reply from the simulated doctor.
//!
//! The caller resends the whole conversation each turn; nothing is kept
//! between calls.

use curalink_core::{ChatTurn, Field, FieldKind, Schema};
use serde::{Deserialize, Serialize};

use crate::flow::FlowSpec;

/// Reply used when the model gives nothing usable.
pub const CHAT_FALLBACK: &str =
    "I'm sorry, I'm having a little trouble understanding. Could you please rephrase that?";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatWithDoctorInput {
    pub patient_message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_history: Option<Vec<ChatTurn>>,
}

impl ChatWithDoctorInput {
    pub fn new(patient_message: impl Into<String>) -> Self {
        Self {
            patient_message: patient_message.into(),
            chat_history: None,
        }
    }

    pub fn with_history(mut self, history: Vec<ChatTurn>) -> Self {
        self.chat_history = Some(history);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatWithDoctorOutput {
    pub doctor_response: String,
}

const TEMPLATE: &str = r#"You are Dr. GenAI, a friendly and empathetic assistant in a telehealth chat.
Keep your replies concise, helpful, and conversational.
Do not give medical advice. You may ask clarifying questions or offer general wellness tips when appropriate.
If the patient describes symptoms, acknowledge them and ask for more detail, and remind them that this is not a diagnosis and that they should consult a human doctor about any medical concern.

Chat history:
{{#if chatHistory}}
{{#each chatHistory}}
{{this.sender}}: {{this.text}}
{{/each}}
{{else}}
No previous messages.
{{/if}}

Patient's latest message: {{patientMessage}}

Write Dr. GenAI's next reply."#;

pub struct ChatWithDoctor;

impl FlowSpec for ChatWithDoctor {
    const NAME: &'static str = "chatWithDoctor";
    type Input = ChatWithDoctorInput;
    type Output = ChatWithDoctorOutput;

    fn input_schema(&self) -> Schema {
        let turn = Schema::new()
            .field(Field::one_of("sender", ["patient", "doctor"]))
            .field(Field::text("text").optional());
        Schema::new()
            .field(
                Field::text("patientMessage")
                    .trimmed()
                    .describe("The latest message from the patient."),
            )
            .field(
                Field::list("chatHistory", FieldKind::Object(turn))
                    .optional()
                    .describe("The conversation so far."),
            )
    }

    fn output_schema(&self) -> Schema {
        Schema::new().field(
            Field::text("doctorResponse")
                .trimmed()
                .describe("The doctor's reply to the patient."),
        )
    }

    fn template(&self) -> &'static str {
        TEMPLATE
    }

    fn finish(&self, input: &Self::Input, output: Self::Output) -> Self::Output {
        if output.doctor_response.trim().is_empty() {
            return self.fallback(input);
        }
        output
    }

    fn fallback(&self, _input: &Self::Input) -> Self::Output {
        ChatWithDoctorOutput {
            doctor_response: CHAT_FALLBACK.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Reply, scripted_flow};
    use curalink_core::ProviderError;
    use serde_json::json;

    fn history() -> Vec<ChatTurn> {
        vec![
            ChatTurn::doctor("Hello, how can I help you today?"),
            ChatTurn::patient("I've been feeling tired."),
        ]
    }

    #[tokio::test]
    async fn returns_model_reply() {
        let (flow, provider) = scripted_flow(
            ChatWithDoctor,
            vec![Reply::json(json!({ "doctorResponse": "How long has this been going on?" }))],
        );
        let output = flow
            .run(ChatWithDoctorInput::new("I have a headache").with_history(history()))
            .await
            .unwrap();
        assert_eq!(output.doctor_response, "How long has this been going on?");
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn empty_message_rejected_before_provider_call() {
        for history in [None, Some(Vec::new()), Some(history())] {
            for message in ["", "   ", "\n\t"] {
                let (flow, provider) = scripted_flow(ChatWithDoctor, vec![]);
                let input = ChatWithDoctorInput {
                    patient_message: message.into(),
                    chat_history: history.clone(),
                };
                let err = flow.run(input).await.unwrap_err();
                assert_eq!(err.field, "patientMessage");
                assert_eq!(provider.calls(), 0);
            }
        }
    }

    #[tokio::test]
    async fn provider_error_resolves_to_fallback() {
        let (flow, _) = scripted_flow(
            ChatWithDoctor,
            vec![Reply::Error(ProviderError::ApiError {
                status_code: 503,
                message: "overloaded".into(),
            })],
        );
        let output = flow.run(ChatWithDoctorInput::new("Hello?")).await.unwrap();
        assert_eq!(output.doctor_response, CHAT_FALLBACK);
    }

    #[tokio::test]
    async fn null_response_resolves_to_fallback() {
        let (flow, _) = scripted_flow(ChatWithDoctor, vec![Reply::text("null")]);
        let output = flow.run(ChatWithDoctorInput::new("Hello?")).await.unwrap();
        assert_eq!(output.doctor_response, CHAT_FALLBACK);
    }

    #[tokio::test]
    async fn blank_reply_resolves_to_fallback() {
        let (flow, _) = scripted_flow(
            ChatWithDoctor,
            vec![Reply::json(json!({ "doctorResponse": "   " }))],
        );
        let output = flow.run(ChatWithDoctorInput::new("Hello?")).await.unwrap();
        assert_eq!(output.doctor_response, CHAT_FALLBACK);
    }

    #[tokio::test]
    async fn prompt_lists_history_in_order() {
        let (flow, provider) = scripted_flow(
            ChatWithDoctor,
            vec![Reply::json(json!({ "doctorResponse": "Noted." }))],
        );
        flow.run(ChatWithDoctorInput::new("It started yesterday").with_history(history()))
            .await
            .unwrap();

        let prompt = provider.last_request().unwrap().messages[0].content.clone();
        let doctor = prompt.find("doctor: Hello, how can I help you today?").unwrap();
        let patient = prompt.find("patient: I've been feeling tired.").unwrap();
        assert!(doctor < patient);
        assert!(prompt.contains("Patient's latest message: It started yesterday"));
        assert!(!prompt.contains("No previous messages."));
    }

    #[test]
    fn prompt_without_history() {
        let (flow, _) = scripted_flow(ChatWithDoctor, vec![]);
        let rendered = flow.render(&ChatWithDoctorInput::new("Hi")).unwrap();
        assert!(rendered.text.contains("No previous messages."));
        assert!(rendered.media.is_empty());
    }

    #[test]
    fn history_block_lines_leave_no_blank_lines() {
        let (flow, _) = scripted_flow(ChatWithDoctor, vec![]);
        let with_history = flow
            .render(&ChatWithDoctorInput::new("It started yesterday").with_history(history()))
            .unwrap();
        let (_, tail) = with_history.text.split_once("Chat history:\n").unwrap();
        assert_eq!(
            tail,
            "doctor: Hello, how can I help you today?\n\
             patient: I've been feeling tired.\n\
             \n\
             Patient's latest message: It started yesterday\n\
             \n\
             Write Dr. GenAI's next reply."
        );

        let without_history = flow.render(&ChatWithDoctorInput::new("Hi")).unwrap();
        let (_, tail) = without_history.text.split_once("Chat history:\n").unwrap();
        assert_eq!(
            tail,
            "No previous messages.\n\nPatient's latest message: Hi\n\nWrite Dr. GenAI's next reply."
        );
    }

    #[test]
    fn rendering_is_deterministic() {
        let (flow, _) = scripted_flow(ChatWithDoctor, vec![]);
        let input = ChatWithDoctorInput::new("My throat hurts").with_history(history());
        let first = flow.render(&input).unwrap();
        assert_eq!(flow.render(&input).unwrap(), first);
        assert_eq!(flow.render(&input.clone()).unwrap(), first);
    }

    #[test]
    fn wire_format_is_camel_case() {
        let input = ChatWithDoctorInput::new("Hi").with_history(vec![ChatTurn::patient("Hello")]);
        let value = serde_json::to_value(&input).unwrap();
        assert_eq!(
            value,
            json!({
                "patientMessage": "Hi",
                "chatHistory": [{ "sender": "patient", "text": "Hello" }]
            })
        );
        let output: ChatWithDoctorOutput =
            serde_json::from_value(json!({ "doctorResponse": "ok" })).unwrap();
        assert_eq!(output.doctor_response, "ok");
    }
}
