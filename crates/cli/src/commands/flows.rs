//! One-shot flow commands: `summarize`, `transcribe`, `suggest`, `recommend`.

use std::path::Path;

use anyhow::{Context, Result};
use curalink_flows::{FollowUpSuggestionsInput, RecommendSpecialtyInput, SummarizeConsultationInput};
use curalink_session::TranscriptionPipeline;

use super::{arg_or_stdin, build_flows, load_config};

pub async fn summarize(text: Option<String>) -> Result<()> {
    let config = load_config()?;
    let flows = build_flows(&config)?;
    let consultation_text = arg_or_stdin(text)?;

    let output = flows
        .summarize
        .run(SummarizeConsultationInput { consultation_text })
        .await?;
    println!("{}", output.summary);
    Ok(())
}

pub async fn transcribe(file: &Path, mime: Option<String>, debrief: bool) -> Result<()> {
    let config = load_config()?;
    let pipeline = TranscriptionPipeline::new(build_flows(&config)?);

    let audio = tokio::fs::read(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let mime_type = mime.unwrap_or_else(|| guess_audio_mime(file).to_string());

    if debrief {
        let notes = pipeline.debrief(&mime_type, &audio).await?;
        println!("{}", serde_json::to_string_pretty(&notes)?);
    } else {
        println!("{}", pipeline.transcribe(&mime_type, &audio).await?);
    }
    Ok(())
}

pub async fn suggest(summary: Option<String>) -> Result<()> {
    let config = load_config()?;
    let flows = build_flows(&config)?;
    let consultation_summary = arg_or_stdin(summary)?;

    let output = flows
        .follow_ups
        .run(FollowUpSuggestionsInput {
            consultation_summary,
        })
        .await?;
    for suggestion in output.suggestions {
        println!("• {}: {}", suggestion.title, suggestion.detail);
    }
    Ok(())
}

pub async fn recommend(symptoms: String, specialties: Vec<String>) -> Result<()> {
    let config = load_config()?;
    let flows = build_flows(&config)?;
    let available_specialties = if specialties.is_empty() {
        config.directory.departments.clone()
    } else {
        specialties
    };

    let output = flows
        .recommend
        .run(RecommendSpecialtyInput {
            symptoms,
            available_specialties,
        })
        .await?;
    println!("Specialty: {}", output.recommended_specialty);
    if let Some(doctor) = &output.suggested_doctor {
        println!("Doctor:    {doctor}");
    }
    println!("\n{}", output.reasoning);
    Ok(())
}

/// MIME type for a recording, by file extension. Unknown extensions are
/// treated as browser-recorded WebM.
pub fn guess_audio_mime(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "wav" => "audio/wav",
        "mp3" => "audio/mpeg",
        "ogg" | "oga" | "opus" => "audio/ogg",
        "m4a" | "mp4" => "audio/mp4",
        "flac" => "audio/flac",
        _ => "audio/webm",
    }
}
