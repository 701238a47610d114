// src/submit.rs
//! End-to-end submission flow: validate, assemble, deliver with retries,
//! classify the terminal outcome

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::country::CountryRegistry;
use crate::payload::{build_payload, ApplicationForm};
use crate::retry::{execute_with_retry, RetryPolicy};
use crate::transport::SubmissionTransport;
use crate::validation::{validate_all, FieldSpec, ValidationReport};

/// Server-side validation errors arrive prefixed with this glyph and are
/// shown to the applicant verbatim.
pub const VALIDATION_MARKER: &str = "⚠";

/// The intake service reports a duplicate application with this phrase
/// somewhere in its message.
pub const DUPLICATE_MARKER: &str = "ya aplicó anteriormente";

const DUPLICATE_MESSAGE: &str = "Our records show you have already applied for this position.";
const CONNECTION_FAILURE_MESSAGE: &str =
    "We could not send your application. Please check your connection and try again in a few minutes.";
const SUCCESS_MESSAGE: &str = "Your application was received. Thank you!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// The applicant can fix this and resubmit.
    UserCorrectable,
    /// The application already exists server-side; retrying cannot help.
    Duplicate,
    /// Network or service trouble; worth trying again later.
    Connection,
}

impl FailureClass {
    pub fn code(&self) -> &'static str {
        match self {
            Self::UserCorrectable => "VALIDATION_REJECTED",
            Self::Duplicate => "DUPLICATE_SUBMISSION",
            Self::Connection => "CONNECTION_FAILED",
        }
    }
}

/// Terminal result of one submit call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Accepted {
        message: String,
        application_id: Option<String>,
    },
    Invalid {
        field_id: String,
        message: String,
    },
    Failed {
        class: FailureClass,
        message: String,
    },
    /// Another submission was already running; nothing was sent.
    InFlight,
}

/// Three-way classification of a terminal delivery failure, by message
/// content. The markers are the contract with the intake service; there is
/// no structured error-code field to lean on.
pub fn classify_failure(raw: &str) -> (FailureClass, String) {
    if raw.contains(VALIDATION_MARKER) {
        (FailureClass::UserCorrectable, raw.trim().to_string())
    } else if raw.contains(DUPLICATE_MARKER) {
        (FailureClass::Duplicate, DUPLICATE_MESSAGE.to_string())
    } else {
        (FailureClass::Connection, CONNECTION_FAILURE_MESSAGE.to_string())
    }
}

/// The form surface the orchestrator writes back to: busy flag, field
/// errors, focus steering and the single message banner. Implementations
/// must tolerate being called from any task.
pub trait SubmissionView: Send + Sync {
    fn set_busy(&self, _busy: bool) {}
    fn show_field_error(&self, _field_id: &str, _message: &str) {}
    fn focus_field(&self, _field_id: &str) {}
    fn show_failure(&self, _message: &str) {}
    fn show_success(&self, _message: &str) {}
    fn clear_form(&self) {}
}

/// View that swallows every update. Useful for headless validation runs.
pub struct NullView;

impl SubmissionView for NullView {}

/// Drives one submission at a time through validate -> assemble -> deliver.
/// The busy flag is owned here, per instance; a second submit while one is
/// running is a no-op.
pub struct SubmissionOrchestrator<T: SubmissionTransport> {
    fields: Vec<FieldSpec>,
    registry: CountryRegistry,
    transport: T,
    policy: RetryPolicy,
    view: Arc<dyn SubmissionView>,
    busy: AtomicBool,
}

impl<T: SubmissionTransport> SubmissionOrchestrator<T> {
    pub fn new(
        fields: Vec<FieldSpec>,
        registry: CountryRegistry,
        transport: T,
        policy: RetryPolicy,
        view: Arc<dyn SubmissionView>,
    ) -> Self {
        Self {
            fields,
            registry,
            transport,
            policy,
            view,
            busy: AtomicBool::new(false),
        }
    }

    pub fn registry(&self) -> &CountryRegistry {
        &self.registry
    }

    /// Local dry-run validation; no network side effects.
    pub fn validate(&self, form: &ApplicationForm) -> ValidationReport {
        validate_all(&self.fields, form, &self.registry)
    }

    /// Run one submission to a terminal outcome. The submit control is
    /// re-enabled on every exit path.
    pub async fn submit(&self, form: &ApplicationForm) -> SubmissionOutcome {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Submission already in flight, ignoring submit");
            return SubmissionOutcome::InFlight;
        }

        self.view.set_busy(true);
        let outcome = self.run(form).await;
        self.busy.store(false, Ordering::SeqCst);
        self.view.set_busy(false);
        outcome
    }

    async fn run(&self, form: &ApplicationForm) -> SubmissionOutcome {
        let report = self.validate(form);
        if let Some(failure) = report.first_failure() {
            let message = failure
                .message
                .clone()
                .unwrap_or_else(|| "Invalid input".to_string());
            warn!(field = %failure.field_id, "Validation failed: {}", message);
            self.view.show_field_error(&failure.field_id, &message);
            self.view.focus_field(&failure.field_id);
            return SubmissionOutcome::Invalid {
                field_id: failure.field_id.clone(),
                message,
            };
        }

        let payload = match build_payload(&self.fields, form, &self.registry) {
            Ok(payload) => payload,
            Err(e) => {
                error!("Failed to assemble payload: {}", e);
                let message = format!("Could not prepare your application: {}", e);
                self.view.show_failure(&message);
                return SubmissionOutcome::Failed {
                    class: FailureClass::UserCorrectable,
                    message,
                };
            }
        };

        info!(submission_id = %payload.submission_id, "Submitting application");

        let attempts = AtomicU32::new(0);
        let delivery = execute_with_retry(
            || {
                let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                debug!(
                    attempt,
                    submission_id = %payload.submission_id,
                    "Delivering application"
                );
                let payload = &payload;
                async move { self.transport.deliver(payload).await }
            },
            &self.policy,
        )
        .await;

        match delivery {
            Ok(receipt) => {
                info!(
                    submission_id = %payload.submission_id,
                    attempts = attempts.load(Ordering::SeqCst),
                    "Application accepted"
                );
                self.view.clear_form();
                let message = if receipt.message.is_empty() {
                    SUCCESS_MESSAGE.to_string()
                } else {
                    receipt.message.clone()
                };
                self.view.show_success(&message);
                SubmissionOutcome::Accepted {
                    message,
                    application_id: receipt.application_id,
                }
            }
            Err(e) => {
                let (class, message) = classify_failure(&format!("{:#}", e));
                error!(
                    class = class.code(),
                    attempts = attempts.load(Ordering::SeqCst),
                    "Application delivery failed: {:#}",
                    e
                );
                self.view.show_failure(&message);
                SubmissionOutcome::Failed { class, message }
            }
        }
    }
}
