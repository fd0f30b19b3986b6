// ============================================================================
// File: src/markdown.rs
// Markdown export of chat transcripts and assistant reports
// ============================================================================

use anyhow::Result;
use chrono::Local;
use std::fs;
use std::path::Path;

use crate::models::{Message, Role};
use crate::triage::AppointmentRecommendation;

/// What a command produced, borrowed for export
pub enum Report<'a> {
    Chat {
        patient_context: Option<&'a str>,
        history: &'a [Message],
    },
    Triage {
        symptoms: &'a str,
        patient_history: &'a str,
        advice: &'a str,
        recommendation: &'a AppointmentRecommendation,
    },
    Analysis {
        lab_results: &'a str,
        vital_signs: &'a str,
        medications: &'a str,
        analysis: &'a str,
    },
}

pub struct MarkdownExporter<'a> {
    model: &'a str,
    report: Report<'a>,
}

impl<'a> MarkdownExporter<'a> {
    pub fn new(model: &'a str, report: Report<'a>) -> Self {
        Self { model, report }
    }

    pub fn export(&self, path: &Path) -> Result<()> {
        fs::write(path, self.render())?;
        Ok(())
    }

    pub fn render(&self) -> String {
        let mut content = String::new();

        self.write_header(&mut content);
        match &self.report {
            Report::Chat {
                patient_context,
                history,
            } => {
                if let Some(context) = patient_context {
                    write_section(&mut content, "Patient Context", context);
                }
                write_transcript(&mut content, history);
            }
            Report::Triage {
                symptoms,
                patient_history,
                advice,
                recommendation,
            } => {
                write_section(&mut content, "Symptoms", symptoms);
                write_section(&mut content, "History", patient_history);
                write_recommendation(&mut content, recommendation);
                write_section(&mut content, "Full Advice", advice);
            }
            Report::Analysis {
                lab_results,
                vital_signs,
                medications,
                analysis,
            } => {
                write_section(&mut content, "Labs", lab_results);
                write_section(&mut content, "Vitals", vital_signs);
                write_section(&mut content, "Medications", medications);
                write_section(&mut content, "Analysis", analysis);
            }
        }

        content
    }

    fn write_header(&self, content: &mut String) {
        let title = match self.report {
            Report::Chat { .. } => "Medical Assistant Transcript",
            Report::Triage { .. } => "Appointment Recommendation",
            Report::Analysis { .. } => "Medical Data Analysis",
        };
        content.push_str(&format!("# QuantiCure {}\n\n", title));
        content.push_str(&format!("**Date**: {}\n\n", Local::now().format("%Y-%m-%d %H:%M:%S")));
        content.push_str(&format!("**Model**: {}\n\n", self.model));
    }
}

fn write_section(content: &mut String, heading: &str, body: &str) {
    content.push_str(&format!("## {}\n\n", heading));
    content.push_str(body.trim_end());
    content.push_str("\n\n");
}

fn write_recommendation(content: &mut String, recommendation: &AppointmentRecommendation) {
    content.push_str("## Recommendation\n\n");
    content.push_str("| Field | Value |\n|---|---|\n");
    for (label, value) in recommendation.fields() {
        let value = if value.is_empty() { "-" } else { value };
        content.push_str(&format!("| {} | {} |\n", label, value.replace('|', "\\|")));
    }
    content.push('\n');
}

fn write_transcript(content: &mut String, history: &[Message]) {
    content.push_str("## Conversation\n\n");

    for message in history {
        let speaker = match message.role {
            Role::User => "Patient",
            Role::Assistant => "Assistant",
            Role::System => continue,
        };
        content.push_str(&format!("#### {}\n\n", speaker));
        for line in message.content.lines() {
            content.push_str(&format!("{}\n", line));
        }
        content.push_str("\n---\n\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_transcript_lists_turns_in_order() {
        let history = vec![
            Message::user("Is aspirin safe with warfarin?"),
            Message::assistant("It raises bleeding risk.\nAsk your doctor."),
        ];
        let exporter = MarkdownExporter::new(
            "test/model",
            Report::Chat {
                patient_context: Some("On warfarin"),
                history: &history,
            },
        );

        let markdown = exporter.render();

        assert!(markdown.starts_with("# QuantiCure Medical Assistant Transcript\n\n"));
        assert!(markdown.contains("**Model**: test/model"));
        assert!(markdown.contains("## Patient Context\n\nOn warfarin\n\n"));
        let patient = markdown.find("#### Patient").unwrap();
        let assistant = markdown.find("#### Assistant").unwrap();
        assert!(patient < assistant);
        assert!(markdown.contains("It raises bleeding risk.\nAsk your doctor.\n"));
    }

    #[test]
    fn triage_report_tabulates_fields() {
        let recommendation = AppointmentRecommendation {
            urgency: "High".to_string(),
            specialist: "Rheumatologist".to_string(),
            ..AppointmentRecommendation::default()
        };
        let exporter = MarkdownExporter::new(
            "test/model",
            Report::Triage {
                symptoms: "joint pain",
                patient_history: "RA",
                advice: "Urgency: High\nSpecialist: Rheumatologist",
                recommendation: &recommendation,
            },
        );

        let markdown = exporter.render();

        assert!(markdown.contains("| Urgency | High |"));
        assert!(markdown.contains("| Duration | - |"));
        assert!(markdown.contains("## Full Advice\n\nUrgency: High"));
    }

    #[test]
    fn export_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analysis.md");
        let exporter = MarkdownExporter::new(
            "test/model",
            Report::Analysis {
                lab_results: "LDL 190",
                vital_signs: "BP 140/90",
                medications: "none",
                analysis: "Elevated LDL.",
            },
        );

        exporter.export(&path).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("# QuantiCure Medical Data Analysis"));
        assert!(written.contains("## Analysis\n\nElevated LDL.\n"));
    }
}
