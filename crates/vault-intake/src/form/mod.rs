//! Form client: holds what the applicant typed, checks it against the shared
//! schema, submits it to the relay, and turns the reply into a modal.

pub mod client;
pub mod modal;


use std::sync::atomic::{AtomicBool, Ordering};

use crate::relay::Outcome;
use crate::schema::{Application, ApplicationDraft, ApplicationField, ValidationErrors};

pub use client::{RelayClient, RelayClientError};
pub use modal::{Modal, Tone};

const STATE_CODE_LENGTH: usize = 2;
const SSN_LENGTH: usize = 9;

/// Apply the as-you-type conveniences for `field`.
pub fn normalize_input(field: ApplicationField, raw: &str) -> String {
    match field {
        ApplicationField::AddressState => {
            raw.to_uppercase().chars().take(STATE_CODE_LENGTH).collect()
        }
        ApplicationField::DocumentSsn => raw
            .chars()
            .filter(char::is_ascii_digit)
            .take(SSN_LENGTH)
            .collect(),
        _ => raw.to_string(),
    }
}

/// Field values plus the errors from the last client-side check.
#[derive(Debug, Clone, Default)]
pub struct FormState {
    draft: ApplicationDraft,
    errors: Option<ValidationErrors>,
}

impl FormState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record keystrokes for `field`. The country input is read-only.
    pub fn input(&mut self, field: ApplicationField, raw: &str) {
        if field == ApplicationField::AddressCountryCode {
            return;
        }
        self.draft.set(field, normalize_input(field, raw));
    }

    pub fn value(&self, field: ApplicationField) -> &str {
        self.draft.get(field)
    }

    pub fn field_error(&self, field: ApplicationField) -> Option<&str> {
        self.errors.as_ref().and_then(|errors| errors.message_for(field))
    }

    /// Run the shared schema, remembering per-field errors for display.
    pub fn validate(&mut self) -> Result<Application, ValidationErrors> {
        let result = self.draft.validate();
        self.errors = result.as_ref().err().cloned();
        result
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Submit button state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    Submitting,
}

#[derive(Debug, thiserror::Error)]
pub enum FormError {
    /// Client-side validation failed; nothing was sent.
    #[error(transparent)]
    Invalid(#[from] ValidationErrors),
    /// The submit control is disabled while a request is outstanding.
    #[error("a submission is already in flight")]
    Busy,
}

struct SubmitGuard<'a> {
    busy: &'a AtomicBool,
}

impl<'a> SubmitGuard<'a> {
    fn acquire(busy: &'a AtomicBool) -> Option<Self> {
        busy.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { busy })
    }
}

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

pub struct FormClient {
    relay: RelayClient,
    busy: AtomicBool,
}

impl FormClient {
    pub fn new(relay: RelayClient) -> Self {
        Self {
            relay,
            busy: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> SubmissionState {
        if self.busy.load(Ordering::Acquire) {
            SubmissionState::Submitting
        } else {
            SubmissionState::Idle
        }
    }

    pub fn button_label(&self) -> &'static str {
        match self.state() {
            SubmissionState::Idle => "Submit",
            SubmissionState::Submitting => "Submitting…",
        }
    }

    /// Validate, then send one request to the relay. Relay failures come back
    /// as an error modal rather than an `Err`; the form is cleared only on
    /// approval.
    pub async fn submit(&self, form: &mut FormState) -> Result<Modal, FormError> {
        let application = form.validate()?;
        let _guard = SubmitGuard::acquire(&self.busy).ok_or(FormError::Busy)?;

        let modal = match self.relay.submit(&application).await {
            Ok(result) => {
                if result.outcome == Outcome::Approved {
                    form.reset();
                }
                Modal::for_outcome(&result.outcome)
            }
            Err(err) => {
                tracing::debug!(error = %err, "submission failed");
                Modal::for_error(&err)
            }
        };

        Ok(modal)
    }
}
