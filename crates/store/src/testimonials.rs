//! Patient testimonials shown on the landing page.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use curalink_core::{Clock, Field, KeyValueStore, Schema, ValidationError};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::error::AccountError;
use crate::records::{load_list, save_list};

pub const TESTIMONIALS_KEY: &str = "curalink.testimonials";

/// Role label given to every submitted testimonial.
pub const SUBMITTED_ROLE: &str = "Verified User";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestimonialDraft {
    pub author: String,
    pub quote: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Testimonial {
    pub id: String,
    pub author: String,
    pub quote: String,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
}

/// Testimonials shown before and after anything submitted.
pub fn featured() -> Vec<Testimonial> {
    [
        (
            "Arjun Kumar",
            "The telehealth consultation was incredibly convenient and the doctor was very attentive. I got the help I needed without leaving home!",
            "Verified Patient",
        ),
        (
            "Meera Iyer",
            "Booking an appointment and speaking to a specialist took minutes. Highly recommend it.",
            "Returning Patient",
        ),
        (
            "Deepak Chopra",
            "I was hesitant about online consultations, but the experience was seamless and professional. The AI transcription was a great bonus!",
            "First-time User",
        ),
    ]
    .into_iter()
    .enumerate()
    .map(|(i, (author, quote, role))| Testimonial {
        id: format!("featured-{}", i + 1),
        author: author.into(),
        quote: quote.into(),
        role: role.into(),
        submitted_at: None,
    })
    .collect()
}

fn draft_schema() -> Schema {
    Schema::new()
        .field(
            Field::text("author")
                .trimmed()
                .min(2)
                .max(50)
                .message("Name must be at least 2 characters."),
        )
        .field(
            Field::text("quote")
                .trimmed()
                .min(10)
                .max(500)
                .message("Testimonial must be at least 10 characters."),
        )
}

pub struct TestimonialService {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    write: Mutex<()>,
}

impl TestimonialService {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            write: Mutex::new(()),
        }
    }

    pub async fn submit(&self, draft: TestimonialDraft) -> Result<Testimonial, AccountError> {
        let author = draft.author.trim();
        let quote = draft.quote.trim();
        check_lengths(author, quote)?;

        let testimonial = Testimonial {
            id: Uuid::new_v4().to_string(),
            author: author.to_string(),
            quote: quote.to_string(),
            role: SUBMITTED_ROLE.to_string(),
            submitted_at: Some(self.clock.now()),
        };

        let _guard = self.write.lock().await;
        let mut list: Vec<Testimonial> = load_list(self.store.as_ref(), TESTIMONIALS_KEY).await?;
        list.push(testimonial.clone());
        save_list(self.store.as_ref(), TESTIMONIALS_KEY, &list).await?;

        info!(id = %testimonial.id, "Testimonial submitted");
        Ok(testimonial)
    }

    /// Submitted testimonials, newest first, followed by the featured ones.
    pub async fn list(&self) -> Result<Vec<Testimonial>, AccountError> {
        let mut list: Vec<Testimonial> = load_list(self.store.as_ref(), TESTIMONIALS_KEY).await?;
        list.reverse();
        list.extend(featured());
        Ok(list)
    }
}

fn check_lengths(author: &str, quote: &str) -> Result<(), ValidationError> {
    let value = serde_json::json!({ "author": author, "quote": quote });
    draft_schema().validate(&value).map_err(|mut e| {
        // Over-long input gets its own wording.
        let too_long = match e.field.as_str() {
            "author" => author.chars().count() > 50,
            "quote" => quote.chars().count() > 500,
            _ => false,
        };
        if too_long {
            e.message = if e.field == "author" {
                "Name is too long.".into()
            } else {
                "Testimonial is too long.".into()
            };
        }
        e
    })
}
