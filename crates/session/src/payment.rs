//! Mock consultation payment.
//!
//! No money moves. Card details are sanity-checked, settlement takes a fixed
//! delay on the injected clock, and a session is only ever charged once.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Datelike, Utc};
use curalink_core::{Clock, Field, Schema, TextFormat, ValidationError};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

/// How long a mock payment takes to settle.
pub const SETTLEMENT_DELAY: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetails {
    pub card_holder_name: String,
    pub card_number: String,
    /// `MM/YY`
    pub expiry_date: String,
    pub cvv: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub id: String,
    pub card_holder_name: String,
    pub card_last4: String,
    pub paid_at: DateTime<Utc>,
}

fn card_schema() -> Schema {
    Schema::new()
        .field(
            Field::text("cardHolderName")
                .trimmed()
                .message("Please enter the card holder's name."),
        )
        .field(
            Field::formatted("cvv", TextFormat::Digits)
                .trimmed()
                .min(3)
                .max(4)
                .message("Please enter a valid CVV."),
        )
}

impl PaymentDetails {
    /// Check the card fields; returns the digits of the card number.
    ///
    /// The card number may carry spaces or dashes and the expiry depends on
    /// `now`, so those two are checked outside the schema.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<String, ValidationError> {
        let value = serde_json::to_value(self)
            .map_err(|e| ValidationError::new("(root)", e.to_string()))?;
        card_schema().validate(&value)?;

        let digits: String = self
            .card_number
            .chars()
            .filter(|c| !matches!(c, ' ' | '-'))
            .collect();
        if !(13..=19).contains(&digits.len()) || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(ValidationError::new(
                "cardNumber",
                "Please enter a valid card number.",
            ));
        }

        let (month, year) = parse_expiry(self.expiry_date.trim()).ok_or_else(|| {
            ValidationError::new("expiryDate", "Expiry date must be in MM/YY format.")
        })?;
        if (year, month) < (now.year(), now.month()) {
            return Err(ValidationError::new("expiryDate", "This card has expired."));
        }

        Ok(digits)
    }
}

/// `MM/YY` → (month, four-digit year).
fn parse_expiry(text: &str) -> Option<(u32, i32)> {
    let (mm, yy) = text.split_once('/')?;
    if mm.len() != 2 || yy.len() != 2 {
        return None;
    }
    let month: u32 = mm.parse().ok()?;
    let year: i32 = yy.parse().ok()?;
    (1..=12).contains(&month).then_some((month, 2000 + year))
}

/// Takes the consultation fee for one session.
pub struct PaymentDesk {
    clock: Arc<dyn Clock>,
    delay: Duration,
    receipt: Mutex<Option<Receipt>>,
}

impl PaymentDesk {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_delay(clock, SETTLEMENT_DELAY)
    }

    pub fn with_delay(clock: Arc<dyn Clock>, delay: Duration) -> Self {
        Self {
            clock,
            delay,
            receipt: Mutex::new(None),
        }
    }

    /// Pay, or return the existing receipt if this session is already paid.
    ///
    /// The lock is held through settlement so concurrent attempts resolve to
    /// the same receipt.
    pub async fn pay(&self, details: PaymentDetails) -> Result<Receipt, ValidationError> {
        let mut slot = self.receipt.lock().await;
        if let Some(receipt) = slot.as_ref() {
            return Ok(receipt.clone());
        }

        let digits = details.validate(self.clock.now())?;
        self.clock.sleep(self.delay).await;

        let receipt = Receipt {
            id: Uuid::new_v4().to_string(),
            card_holder_name: details.card_holder_name.trim().to_string(),
            card_last4: digits[digits.len() - 4..].to_string(),
            paid_at: self.clock.now(),
        };
        info!(receipt = %receipt.id, "Mock payment settled");
        *slot = Some(receipt.clone());
        Ok(receipt)
    }

    pub async fn receipt(&self) -> Option<Receipt> {
        self.receipt.lock().await.clone()
    }

    pub async fn is_paid(&self) -> bool {
        self.receipt.lock().await.is_some()
    }

    /// Forget the receipt so another demo payment can be made.
    pub async fn reset(&self) {
        self.receipt.lock().await.take();
    }
}
