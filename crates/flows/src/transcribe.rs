//! `transcribeConsultation`: speech to text for a recorded consultation.

use curalink_core::{Field, Schema, TextFormat};
use serde::{Deserialize, Serialize};

use crate::flow::FlowSpec;

pub const TRANSCRIPTION_FALLBACK: &str =
    "Transcription is not available for this recording. Please try recording again.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscribeConsultationInput {
    /// `data:<mimetype>;base64,<encoded_data>`
    pub audio_data_uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscribeConsultationOutput {
    pub transcription: String,
}

const TEMPLATE: &str = r#"Transcribe the following audio from a telehealth consultation.
Be accurate, paying close attention to medical terminology and to variations in accents and dialects.

Audio: {{media url=audioDataUri}}"#;

pub struct TranscribeConsultation;

impl FlowSpec for TranscribeConsultation {
    const NAME: &'static str = "transcribeConsultation";
    type Input = TranscribeConsultationInput;
    type Output = TranscribeConsultationOutput;

    fn input_schema(&self) -> Schema {
        Schema::new().field(
            Field::formatted("audioDataUri", TextFormat::DataUri).describe(
                "Audio as a data URI with a MIME type and base64 data: 'data:<mimetype>;base64,<encoded_data>'.",
            ),
        )
    }

    fn output_schema(&self) -> Schema {
        Schema::new().field(
            Field::text("transcription")
                .optional()
                .describe("The transcription of the consultation audio."),
        )
    }

    fn template(&self) -> &'static str {
        TEMPLATE
    }

    fn finish(&self, _input: &Self::Input, output: Self::Output) -> Self::Output {
        output
    }

    fn fallback(&self, _input: &Self::Input) -> Self::Output {
        TranscribeConsultationOutput {
            transcription: TRANSCRIPTION_FALLBACK.to_string(),
        }
    }
}
