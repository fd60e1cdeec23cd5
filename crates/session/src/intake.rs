//! The pre-consultation patient information form.

use chrono::NaiveDate;
use curalink_core::{Field, Schema, TextFormat, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Raw form values as submitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntakeForm {
    pub full_name: String,
    /// `YYYY-MM-DD`
    pub date_of_birth: String,
    pub email: String,
    pub phone: String,
    pub reason_for_consultation: String,
    pub medical_specialty: String,
}

/// A validated intake, ready to start a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsultationIntake {
    pub id: String,
    pub full_name: String,
    pub date_of_birth: NaiveDate,
    pub email: String,
    pub phone: String,
    pub reason_for_consultation: String,
    pub medical_specialty: String,
}

fn intake_schema(specialties: &[String]) -> Schema {
    Schema::new()
        .field(
            Field::text("fullName")
                .trimmed()
                .min(2)
                .max(100)
                .message("Full name must be at least 2 characters."),
        )
        .field(
            Field::formatted("dateOfBirth", TextFormat::Date)
                .trimmed()
                .message("Date of birth is required."),
        )
        .field(Field::formatted("email", TextFormat::Email).trimmed())
        .field(
            Field::text("phone")
                .trimmed()
                .min(10)
                .max(15)
                .message("Phone number must be at least 10 digits."),
        )
        .field(
            Field::text("reasonForConsultation")
                .trimmed()
                .min(10)
                .max(500)
                .message("Reason must be at least 10 characters."),
        )
        .field(
            Field::one_of("medicalSpecialty", specialties.iter().cloned())
                .message("Please select a medical specialty."),
        )
}

impl IntakeForm {
    /// Validate against the offered specialties, with `today` bounding the
    /// date of birth.
    pub fn submit(
        &self,
        specialties: &[String],
        today: NaiveDate,
    ) -> Result<ConsultationIntake, ValidationError> {
        let value = serde_json::to_value(self)
            .map_err(|e| ValidationError::new("(root)", e.to_string()))?;
        intake_schema(specialties).validate(&value)?;

        let phone = self.phone.trim();
        if phone.chars().filter(char::is_ascii_digit).count() < 10 {
            return Err(ValidationError::new(
                "phone",
                "Phone number must be at least 10 digits.",
            ));
        }

        let date_of_birth = NaiveDate::parse_from_str(self.date_of_birth.trim(), "%Y-%m-%d")
            .map_err(|_| ValidationError::new("dateOfBirth", "Date of birth is required."))?;
        let earliest = NaiveDate::from_ymd_opt(1900, 1, 1).unwrap_or(NaiveDate::MIN);
        if date_of_birth < earliest || date_of_birth > today {
            return Err(ValidationError::new(
                "dateOfBirth",
                "Please enter a valid date of birth.",
            ));
        }

        Ok(ConsultationIntake {
            id: Uuid::new_v4().to_string(),
            full_name: self.full_name.trim().to_string(),
            date_of_birth,
            email: self.email.trim().to_lowercase(),
            phone: phone.to_string(),
            reason_for_consultation: self.reason_for_consultation.trim().to_string(),
            medical_specialty: self.medical_specialty.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn specialties() -> Vec<String> {
        curalink_config::DirectoryConfig::default().intake_specialties
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 1).unwrap()
    }

    fn form() -> IntakeForm {
        IntakeForm {
            full_name: "Jane Doe".into(),
            date_of_birth: "1990-04-12".into(),
            email: "Jane@Example.com".into(),
            phone: "+1 555 010 9999".into(),
            reason_for_consultation: "Recurring headaches in the afternoon".into(),
            medical_specialty: "Neurology".into(),
        }
    }

    fn rejects(form: IntakeForm, field: &str, message: &str) {
        let err = form.submit(&specialties(), today()).unwrap_err();
        assert_eq!(err.field, field);
        assert_eq!(err.message, message);
    }

    #[test]
    fn valid_form_produces_intake() {
        let intake = form().submit(&specialties(), today()).unwrap();
        assert_eq!(intake.email, "jane@example.com");
        assert_eq!(intake.date_of_birth, NaiveDate::from_ymd_opt(1990, 4, 12).unwrap());
        assert_eq!(intake.medical_specialty, "Neurology");
    }

    #[test]
    fn field_messages() {
        rejects(
            IntakeForm { full_name: "J".into(), ..form() },
            "fullName",
            "Full name must be at least 2 characters.",
        );
        rejects(
            IntakeForm { email: "jane".into(), ..form() },
            "email",
            "Invalid email address.",
        );
        rejects(
            IntakeForm { phone: "12345".into(), ..form() },
            "phone",
            "Phone number must be at least 10 digits.",
        );
        rejects(
            IntakeForm { phone: "phone-number".into(), ..form() },
            "phone",
            "Phone number must be at least 10 digits.",
        );
        rejects(
            IntakeForm { reason_for_consultation: "headache".into(), ..form() },
            "reasonForConsultation",
            "Reason must be at least 10 characters.",
        );
        rejects(
            IntakeForm { medical_specialty: "Astrology".into(), ..form() },
            "medicalSpecialty",
            "Please select a medical specialty.",
        );
        rejects(
            IntakeForm { date_of_birth: String::new(), ..form() },
            "dateOfBirth",
            "Date of birth is required.",
        );
    }

    #[test]
    fn date_of_birth_bounds() {
        rejects(
            IntakeForm { date_of_birth: "2026-06-02".into(), ..form() },
            "dateOfBirth",
            "Please enter a valid date of birth.",
        );
        rejects(
            IntakeForm { date_of_birth: "1899-12-31".into(), ..form() },
            "dateOfBirth",
            "Please enter a valid date of birth.",
        );
        let intake = IntakeForm { date_of_birth: "2026-06-01".into(), ..form() }
            .submit(&specialties(), today())
            .unwrap();
        assert_eq!(intake.date_of_birth, today());
    }
}
