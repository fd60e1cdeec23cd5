//! Prescriptions issued by doctors and read by their patients.
//!
//! Each patient's prescriptions are one JSON list keyed by their lower-cased
//! email. Records are only ever appended.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use curalink_core::{Clock, Field, KeyValueStore, Schema, TextFormat, ValidationError};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::accounts::{AccountRole, CurrentUser};
use crate::error::AccountError;
use crate::records::{load_list, save_list};

pub const PRESCRIPTIONS_KEY_PREFIX: &str = "curalink.prescriptions.";

/// Storage key holding a patient's prescriptions.
pub fn prescriptions_key(patient_email: &str) -> String {
    format!("{PRESCRIPTIONS_KEY_PREFIX}{}", patient_email.trim().to_lowercase())
}

/// What a doctor fills in on the prescription pad.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionDraft {
    pub patient_name: String,
    pub patient_email: String,
    pub medication: String,
    pub dosage: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    /// `YYYY-MM-DD`; today when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prescription_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctor_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctor_contact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clinic_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clinic_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredPrescription {
    pub id: String,
    pub doctor_name: String,
    pub doctor_contact: String,
    pub clinic_name: String,
    pub clinic_address: String,
    pub patient_name: String,
    pub patient_email: String,
    pub prescription_date: String,
    pub medication: String,
    pub dosage: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    pub issued_date: DateTime<Utc>,
}

fn draft_schema() -> Schema {
    Schema::new()
        .field(Field::text("patientName").trimmed().message("Please enter the patient's name."))
        .field(Field::formatted("patientEmail", TextFormat::Email).trimmed())
        .field(Field::text("medication").trimmed().message("Please enter the medication."))
        .field(Field::text("dosage").trimmed().message("Please enter the dosage."))
        .field(Field::text("instructions").optional().max(2000))
        .field(Field::formatted("prescriptionDate", TextFormat::Date).optional())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub struct PrescriptionService {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    write: Mutex<()>,
}

impl PrescriptionService {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            write: Mutex::new(()),
        }
    }

    /// Issue a prescription. Only doctors may do this.
    pub async fn issue(
        &self,
        issuer: &CurrentUser,
        draft: PrescriptionDraft,
    ) -> Result<StoredPrescription, AccountError> {
        issuer.require(AccountRole::Doctor)?;

        let value = serde_json::to_value(&draft)
            .map_err(|e| ValidationError::new("(root)", e.to_string()))?;
        draft_schema().validate(&value)?;

        let now = self.clock.now();
        let prescription = StoredPrescription {
            id: Uuid::new_v4().to_string(),
            doctor_name: non_empty(draft.doctor_name)
                .unwrap_or_else(|| format!("Dr. {}", issuer.display_name())),
            doctor_contact: non_empty(draft.doctor_contact).unwrap_or_else(|| issuer.email.clone()),
            clinic_name: non_empty(draft.clinic_name).unwrap_or_default(),
            clinic_address: non_empty(draft.clinic_address).unwrap_or_default(),
            patient_name: draft.patient_name.trim().to_string(),
            patient_email: draft.patient_email.trim().to_lowercase(),
            prescription_date: non_empty(draft.prescription_date)
                .unwrap_or_else(|| now.format("%Y-%m-%d").to_string()),
            medication: draft.medication.trim().to_string(),
            dosage: draft.dosage.trim().to_string(),
            instructions: non_empty(draft.instructions),
            issued_date: now,
        };

        let key = prescriptions_key(&prescription.patient_email);
        let _guard = self.write.lock().await;
        let mut list: Vec<StoredPrescription> = load_list(self.store.as_ref(), &key).await?;
        list.push(prescription.clone());
        save_list(self.store.as_ref(), &key, &list).await?;

        info!(
            id = %prescription.id,
            doctor = %issuer.email,
            patient = %prescription.patient_email,
            "Prescription issued"
        );
        Ok(prescription)
    }

    /// A patient's own prescriptions, newest first.
    pub async fn list_for(&self, viewer: &CurrentUser) -> Result<Vec<StoredPrescription>, AccountError> {
        viewer.require(AccountRole::Patient)?;
        let mut list: Vec<StoredPrescription> =
            load_list(self.store.as_ref(), &prescriptions_key(&viewer.email)).await?;
        list.reverse();
        list.sort_by(|a, b| b.issued_date.cmp(&a.issued_date));
        Ok(list)
    }
}
