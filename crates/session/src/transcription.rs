//! Recorded consultation audio → transcript, and optionally a debrief.

use std::sync::Arc;

use curalink_core::DataUri;
use curalink_flows::{
    FlowSet, FollowUpSuggestionsInput, Suggestion, SummarizeConsultationInput,
    TranscribeConsultationInput,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::SessionError;

/// Everything produced from one recording.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsultationNotes {
    pub transcription: String,
    pub summary: String,
    pub suggestions: Vec<Suggestion>,
}

pub struct TranscriptionPipeline {
    flows: Arc<FlowSet>,
}

impl TranscriptionPipeline {
    pub fn new(flows: Arc<FlowSet>) -> Self {
        Self { flows }
    }

    /// Transcribe raw recorded audio of the given MIME type.
    pub async fn transcribe(&self, mime_type: &str, audio: &[u8]) -> Result<String, SessionError> {
        if audio.is_empty() {
            return Err(SessionError::EmptyRecording);
        }
        let uri = DataUri::encode(mime_type, audio);
        info!(mime_type, bytes = audio.len(), "Transcribing recording");

        let output = self
            .flows
            .transcribe
            .run(TranscribeConsultationInput {
                audio_data_uri: uri.to_string(),
            })
            .await?;
        Ok(output.transcription)
    }

    /// Transcribe, summarize, and suggest follow-ups in one pass.
    ///
    /// An empty transcript skips the later flows rather than feeding them
    /// nothing.
    pub async fn debrief(&self, mime_type: &str, audio: &[u8]) -> Result<ConsultationNotes, SessionError> {
        let transcription = self.transcribe(mime_type, audio).await?;
        if transcription.trim().is_empty() {
            return Ok(ConsultationNotes {
                transcription,
                summary: String::new(),
                suggestions: Vec::new(),
            });
        }

        let summary = self
            .flows
            .summarize
            .run(SummarizeConsultationInput {
                consultation_text: transcription.clone(),
            })
            .await?
            .summary;
        let suggestions = self
            .flows
            .follow_ups
            .run(FollowUpSuggestionsInput {
                consultation_summary: summary.clone(),
            })
            .await?
            .suggestions;

        Ok(ConsultationNotes {
            transcription,
            summary,
            suggestions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use curalink_core::{Message, Provider, ProviderError, ProviderRequest, ProviderResponse};
    use curalink_flows::{FlowRunner, FlowSettings};
    use curalink_flows::policy::FOLLOW_UP_DISCLAIMER;
    use std::sync::Mutex;

    /// Answers each flow by its structured-output name.
    struct FlowAwareProvider {
        requests: Mutex<Vec<ProviderRequest>>,
    }

    #[async_trait]
    impl Provider for FlowAwareProvider {
        fn name(&self) -> &str {
            "flow-aware"
        }

        async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            let flow = request
                .response_schema
                .as_ref()
                .map(|s| s.name.clone())
                .unwrap_or_default();
            self.requests.lock().unwrap().push(request);
            let body = match flow.as_str() {
                "transcribeConsultation" => r#"{"transcription":"Patient: my knee feels better."}"#,
                "summarizeConsultation" => r#"{"summary":"Knee pain is improving."}"#,
                "generateFollowUpSuggestions" => {
                    r#"{"suggestions":[{"title":"Gentle walks","detail":"Keep moving a little each day."}]}"#
                }
                other => return Err(ProviderError::ModelNotFound(other.into())),
            };
            Ok(ProviderResponse {
                message: Message::assistant(body),
                usage: None,
                model: "test".into(),
            })
        }
    }

    fn pipeline() -> (TranscriptionPipeline, Arc<FlowAwareProvider>) {
        let provider = Arc::new(FlowAwareProvider {
            requests: Mutex::new(Vec::new()),
        });
        let runner = Arc::new(FlowRunner::new(provider.clone(), FlowSettings::default()));
        let flows = Arc::new(FlowSet::new(runner, Vec::new()).unwrap());
        (TranscriptionPipeline::new(flows), provider)
    }

    #[tokio::test]
    async fn recording_is_sent_as_attachment() {
        let (pipeline, provider) = pipeline();
        let text = pipeline.transcribe("audio/webm", b"fake-audio").await.unwrap();
        assert_eq!(text, "Patient: my knee feels better.");

        let requests = provider.requests.lock().unwrap();
        let attachments = &requests[0].messages[0].attachments;
        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0].mime_type, "audio/webm");
        assert_eq!(attachments[0].bytes().unwrap(), b"fake-audio");
    }

    #[tokio::test]
    async fn empty_recording_rejected_before_any_call() {
        let (pipeline, provider) = pipeline();
        let err = pipeline.transcribe("audio/webm", &[]).await.unwrap_err();
        assert!(matches!(err, SessionError::EmptyRecording));
        assert!(provider.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn debrief_chains_all_three_flows() {
        let (pipeline, provider) = pipeline();
        let notes = pipeline.debrief("audio/wav", b"RIFF....").await.unwrap();

        assert_eq!(notes.summary, "Knee pain is improving.");
        assert!(notes.suggestions.len() >= 3);
        assert!(notes.suggestions.iter().any(|s| s.detail == FOLLOW_UP_DISCLAIMER));
        assert_eq!(provider.requests.lock().unwrap().len(), 3);
    }
}
