//! Safety text and deterministic defaults for health-adjacent output.
//!
//! Every repair here is idempotent: applying it to output that already
//! satisfies the rule changes nothing.

use curalink_config::DoctorEntry;

use crate::follow_up::Suggestion;

/// The specialty used when nothing better is known.
pub const GENERAL_MEDICINE: &str = "General Medicine";

/// Sentence every follow-up suggestion list must carry.
pub const FOLLOW_UP_DISCLAIMER: &str = "These are general suggestions and not medical advice. Always consult your healthcare provider for any medical concerns or before making changes to your health regimen.";

/// Title of the injected follow-up disclaimer entry.
pub const FOLLOW_UP_DISCLAIMER_TITLE: &str = "Important Disclaimer";

/// Phrase a recommendation's reasoning must contain.
pub const RECOMMENDATION_PHRASE: &str = "this is not medical advice";

/// Text appended to reasoning that lacks [`RECOMMENDATION_PHRASE`].
pub const RECOMMENDATION_DISCLAIMER: &str = "This is not medical advice. Please consult a qualified healthcare professional for any medical concerns or diagnosis.";

/// Suggestions used to pad short lists, in order of preference.
const GENERAL_SUGGESTIONS: [(&str, &str); 3] = [
    (
        "Keep a Symptom Journal",
        "Note any changes in how you feel so you can discuss them with your doctor at your next appointment.",
    ),
    (
        "Stay Hydrated",
        "Drink water regularly throughout the day to support your overall wellbeing.",
    ),
    (
        "Prioritize Rest",
        "Aim for consistent, good-quality sleep to help your body recover.",
    ),
];

/// Minimum number of suggestions returned to callers.
pub const MIN_SUGGESTIONS: usize = 3;

/// Case-insensitive substring test.
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Append the recommendation disclaimer unless the phrase is already there.
///
/// Returns `true` when text was appended.
pub fn ensure_reasoning_disclaimer(reasoning: &mut String) -> bool {
    if contains_ignore_case(reasoning, RECOMMENDATION_PHRASE) {
        return false;
    }
    let trimmed = reasoning.trim_end().len();
    reasoning.truncate(trimmed);
    if !reasoning.is_empty() {
        reasoning.push(' ');
    }
    reasoning.push_str(RECOMMENDATION_DISCLAIMER);
    true
}

/// The dedicated disclaimer suggestion.
pub fn disclaimer_suggestion() -> Suggestion {
    Suggestion::new(FOLLOW_UP_DISCLAIMER_TITLE, FOLLOW_UP_DISCLAIMER)
}

/// Whether any suggestion carries the disclaimer sentence.
pub fn has_follow_up_disclaimer(suggestions: &[Suggestion]) -> bool {
    suggestions.iter().any(|s| {
        contains_ignore_case(&s.detail, FOLLOW_UP_DISCLAIMER)
            || contains_ignore_case(&s.title, FOLLOW_UP_DISCLAIMER)
    })
}

/// Guarantee the disclaimer entry and at least [`MIN_SUGGESTIONS`] entries.
///
/// General suggestions are added before the disclaimer, which is appended
/// last when missing. An empty list becomes the general set plus the
/// disclaimer.
pub fn apply_follow_up_policy(suggestions: &mut Vec<Suggestion>) {
    let needs_disclaimer = !has_follow_up_disclaimer(suggestions);
    let target = MIN_SUGGESTIONS - usize::from(needs_disclaimer);

    for (title, detail) in GENERAL_SUGGESTIONS {
        if suggestions.len() >= target {
            break;
        }
        if !suggestions.iter().any(|s| s.title.eq_ignore_ascii_case(title)) {
            suggestions.push(Suggestion::new(title, detail));
        }
    }

    if needs_disclaimer {
        suggestions.push(disclaimer_suggestion());
    }
}

/// Map a model-chosen specialty onto the offered list.
///
/// Matching ignores case and surrounding whitespace; the offered spelling
/// is returned. Anything unrecognised becomes General Medicine.
pub fn normalize_specialty(candidate: &str, available: &[String]) -> String {
    let candidate = candidate.trim();
    available
        .iter()
        .find(|s| s.trim().eq_ignore_ascii_case(candidate))
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| GENERAL_MEDICINE.to_string())
}

/// Keep a suggested doctor only when they are listed and practise the
/// recommended specialty. Returns the canonical `Dr. Name (Specialty)` form.
pub fn vet_suggested_doctor(
    suggested: Option<&str>,
    recommended: &str,
    doctors: &[DoctorEntry],
) -> Option<String> {
    let suggested = suggested?.trim();
    let name = suggested
        .split_once('(')
        .map_or(suggested, |(name, _)| name)
        .trim();
    doctors
        .iter()
        .find(|d| d.name.eq_ignore_ascii_case(name))
        .filter(|d| d.specialty.eq_ignore_ascii_case(recommended))
        .map(|d| format!("{} ({})", d.name, d.specialty))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn specialties() -> Vec<String> {
        ["Cardiology", "Gastroenterology", "General Medicine"]
            .map(String::from)
            .to_vec()
    }

    fn doctors() -> Vec<DoctorEntry> {
        vec![
            DoctorEntry::new("Dr. Emily Carter", "Cardiology"),
            DoctorEntry::new("Dr. Sarah Green", "General Medicine"),
        ]
    }

    #[test]
    fn reasoning_disclaimer_appended_once() {
        let mut reasoning = String::from("Chest pain points to the heart.  ");
        assert!(ensure_reasoning_disclaimer(&mut reasoning));
        assert_eq!(
            reasoning,
            format!("Chest pain points to the heart. {RECOMMENDATION_DISCLAIMER}")
        );

        let before = reasoning.clone();
        assert!(!ensure_reasoning_disclaimer(&mut reasoning));
        assert_eq!(reasoning, before);
    }

    #[test]
    fn reasoning_disclaimer_check_ignores_case() {
        let mut reasoning = String::from("See a cardiologist. THIS IS NOT MEDICAL ADVICE.");
        assert!(!ensure_reasoning_disclaimer(&mut reasoning));
    }

    #[test]
    fn empty_reasoning_gets_bare_disclaimer() {
        let mut reasoning = String::new();
        ensure_reasoning_disclaimer(&mut reasoning);
        assert_eq!(reasoning, RECOMMENDATION_DISCLAIMER);
    }

    #[test]
    fn empty_suggestions_become_general_set_with_disclaimer() {
        let mut suggestions = Vec::new();
        apply_follow_up_policy(&mut suggestions);
        assert_eq!(suggestions.len(), 3);
        assert_eq!(suggestions[2], disclaimer_suggestion());
        assert!(has_follow_up_disclaimer(&suggestions));
    }

    #[test]
    fn disclaimer_appended_to_full_list() {
        let mut suggestions = vec![
            Suggestion::new("Walk daily", "A short walk helps."),
            Suggestion::new("Stretch", "Gentle stretches in the morning."),
            Suggestion::new("Sleep", "Keep a regular bedtime."),
            Suggestion::new("Hydrate", "Drink water."),
        ];
        apply_follow_up_policy(&mut suggestions);
        assert_eq!(suggestions.len(), 5);
        assert_eq!(suggestions[4].title, FOLLOW_UP_DISCLAIMER_TITLE);
    }

    #[test]
    fn model_disclaimer_is_recognised() {
        let mut suggestions = vec![
            Suggestion::new("Gentle exercise", "Keep up the physiotherapy routine."),
            Suggestion::new(
                "Disclaimer",
                format!("Disclaimer: {}", FOLLOW_UP_DISCLAIMER.to_uppercase()),
            ),
        ];
        apply_follow_up_policy(&mut suggestions);
        assert_eq!(suggestions.len(), 3);
        assert_eq!(
            suggestions
                .iter()
                .filter(|s| s.title == FOLLOW_UP_DISCLAIMER_TITLE)
                .count(),
            0
        );
    }

    #[test]
    fn policy_is_idempotent() {
        let mut suggestions = vec![Suggestion::new("Stay Hydrated", "Water helps.")];
        apply_follow_up_policy(&mut suggestions);
        let once = suggestions.clone();
        apply_follow_up_policy(&mut suggestions);
        assert_eq!(suggestions, once);
        assert_eq!(
            suggestions
                .iter()
                .filter(|s| s.detail == FOLLOW_UP_DISCLAIMER)
                .count(),
            1
        );
        // The model's own "Stay Hydrated" is not duplicated by padding.
        assert_eq!(
            suggestions
                .iter()
                .filter(|s| s.title == "Stay Hydrated")
                .count(),
            1
        );
    }

    #[test]
    fn specialty_normalization() {
        let available = specialties();
        assert_eq!(normalize_specialty("cardiology ", &available), "Cardiology");
        assert_eq!(normalize_specialty("Dermatology", &available), GENERAL_MEDICINE);
        assert_eq!(normalize_specialty("", &available), GENERAL_MEDICINE);
        assert_eq!(normalize_specialty("Cardiology", &[]), GENERAL_MEDICINE);
    }

    #[test]
    fn suggested_doctor_must_match_specialty() {
        let doctors = doctors();
        assert_eq!(
            vet_suggested_doctor(Some("Dr. Emily Carter (Cardiology)"), "Cardiology", &doctors),
            Some("Dr. Emily Carter (Cardiology)".into())
        );
        assert_eq!(
            vet_suggested_doctor(Some("dr. emily carter"), "Cardiology", &doctors),
            Some("Dr. Emily Carter (Cardiology)".into())
        );
        assert_eq!(
            vet_suggested_doctor(Some("Dr. Emily Carter (Cardiology)"), "General Medicine", &doctors),
            None
        );
        assert_eq!(
            vet_suggested_doctor(Some("Dr. Who (Cardiology)"), "Cardiology", &doctors),
            None
        );
        assert_eq!(vet_suggested_doctor(None, "Cardiology", &doctors), None);
    }
}
