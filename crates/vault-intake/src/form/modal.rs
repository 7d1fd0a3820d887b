use std::fmt;

use super::client::RelayClientError;
use crate::relay::Outcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Success,
    Info,
    Error,
}

/// Message shown to the applicant once a submission resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Modal {
    pub title: String,
    pub message: String,
    pub tone: Tone,
    /// Violations to fix, listed under the message.
    pub items: Vec<String>,
}

impl Modal {
    fn new(title: &str, message: impl Into<String>, tone: Tone) -> Self {
        Self {
            title: title.to_string(),
            message: message.into(),
            tone,
            items: Vec::new(),
        }
    }

    /// Chosen purely from the outcome string.
    pub fn for_outcome(outcome: &Outcome) -> Self {
        match outcome {
            Outcome::Approved => {
                Self::new("Approved!", "Your Vault is now unlocked 🔓", Tone::Success)
            }
            Outcome::ManualReview => Self::new(
                "Pending Review",
                "Your application is in the Vault review process. We'll follow up shortly.",
                Tone::Info,
            ),
            Outcome::Denied => Self::new(
                "Not Approved",
                "Thanks for applying, but your Vault application did not meet our requirements.",
                Tone::Error,
            ),
            Outcome::Other(raw) => Self::new("Received", format!("Outcome: {raw}"), Tone::Info),
        }
    }

    pub fn for_error(err: &RelayClientError) -> Self {
        let mut modal = Self::new("Submission error", err.to_string(), Tone::Error);
        modal.items = err.violations();
        modal
    }
}

impl fmt::Display for Modal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[{}]", self.title)?;
        write!(f, "{}", self.message)?;
        if !self.items.is_empty() {
            write!(f, "\nFix the following:")?;
            for item in &self.items {
                write!(f, "\n  - {item}")?;
            }
        }
        Ok(())
    }
}
