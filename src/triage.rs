// ============================================================================
// File: src/triage.rs
// Labelled-field extraction from free-text appointment advice
// ============================================================================

use serde::Serialize;

/// Structured view of an appointment recommendation.
///
/// Fields the model did not echo as a labelled line are left empty.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct AppointmentRecommendation {
    pub urgency: String,
    pub specialist: String,
    pub duration: String,
    pub preparation: String,
    pub considerations: String,
}

impl AppointmentRecommendation {
    pub fn from_response(text: &str) -> Self {
        Self {
            urgency: extract_field(text, "urgency"),
            specialist: extract_field(text, "specialist"),
            duration: extract_field(text, "duration"),
            preparation: extract_field(text, "preparation"),
            considerations: extract_field(text, "considerations"),
        }
    }

    /// Label/value pairs in display order
    pub fn fields(&self) -> [(&'static str, &str); 5] {
        [
            ("Urgency", self.urgency.as_str()),
            ("Specialist", self.specialist.as_str()),
            ("Duration", self.duration.as_str()),
            ("Preparation", self.preparation.as_str()),
            ("Considerations", self.considerations.as_str()),
        ]
    }

    pub fn is_empty(&self) -> bool {
        self.fields().iter().all(|(_, value)| value.is_empty())
    }
}

/// Value of the first line mentioning `keyword`, read after its first colon.
///
/// Matching ignores ASCII case. Returns an empty string when no line matches
/// or the matching line has no colon.
pub fn extract_field(text: &str, keyword: &str) -> String {
    let keyword = keyword.to_ascii_lowercase();

    text.lines()
        .find(|line| line.to_ascii_lowercase().contains(&keyword))
        .and_then(|line| line.split_once(':'))
        .map(|(_, value)| value.trim().to_string())
        .unwrap_or_default()
}
