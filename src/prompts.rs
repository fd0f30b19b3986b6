// ============================================================================
// File: src/prompts.rs
// System prompts and message composition for the three assistant tasks
// ============================================================================

use crate::models::Message;

pub const MEDICAL_ASSISTANT_PROMPT: &str = "You are a medical AI assistant for QuantiCure. Focus on:
1. Analyzing symptoms and history
2. Suggesting relevant questions
3. Identifying drug interactions
4. Explaining medical terms simply
5. Providing evidence-based info

Be professional and clear. Defer to healthcare providers when uncertain.";

pub const APPOINTMENT_SCHEDULER_PROMPT: &str = "You are QuantiCure's scheduling assistant. Focus on:
1. Assessing appointment urgency
2. Matching specialists to conditions
3. Setting appropriate duration
4. Listing preparation requirements
5. Providing visit guidelines

Prioritize patient care and safety.";

pub const DATA_ANALYST_PROMPT: &str =
    "You are a medical data analyst. Provide clear, actionable insights from medical data.";

/// Flatten multi-line patient context into a single `Context:` line.
///
/// Returns `None` for empty context so no context line is emitted.
pub fn context_line(patient_context: &str) -> Option<String> {
    if patient_context.is_empty() {
        return None;
    }
    let joined = patient_context.split('\n').collect::<Vec<_>>().join(" | ");
    Some(format!("Context: {}", joined))
}

/// Messages for an open medical question.
///
/// Layout: system prompt, the caller's history in order, then the new user
/// message. With context the user content is `Context: ...\n\nQuery: <text>`,
/// otherwise it is the raw query.
pub fn medical_query(
    user_message: &str,
    patient_context: Option<&str>,
    history: &[Message],
) -> Vec<Message> {
    let content = match patient_context.and_then(context_line) {
        Some(context) => format!("{}\n\nQuery: {}", context, user_message),
        None => user_message.to_string(),
    };

    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(Message::system(MEDICAL_ASSISTANT_PROMPT));
    messages.extend_from_slice(history);
    messages.push(Message::user(content));
    messages
}

/// Messages asking for appointment triage advice
pub fn appointment_recommendation(symptoms: &str, patient_history: &str) -> Vec<Message> {
    vec![
        Message::system(APPOINTMENT_SCHEDULER_PROMPT),
        Message::user(format!(
            "Patient Info:\n\
             Symptoms: {}\n\
             History: {}\n\
             \n\
             Provide:\n\
             1. Urgency level\n\
             2. Specialist type\n\
             3. Duration\n\
             4. Preparations\n\
             5. Special notes",
            symptoms, patient_history
        )),
    ]
}

/// Messages asking for an analysis of labs, vitals and medications
pub fn lab_analysis(lab_results: &str, vital_signs: &str, medications: &str) -> Vec<Message> {
    vec![
        Message::system(DATA_ANALYST_PROMPT),
        Message::user(format!(
            "Analyze:\n\
             \n\
             Labs: {}\n\
             Vitals: {}\n\
             Meds: {}\n\
             \n\
             Provide:\n\
             1. Key findings\n\
             2. Concerns\n\
             3. Follow-up needs\n\
             4. Drug interactions\n\
             5. Monitoring plan",
            lab_results, vital_signs, medications
        )),
    ]
}
