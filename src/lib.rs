use anyhow::Result;
use std::sync::Arc;

pub mod cli;
pub mod country;
pub mod environment;
pub mod payload;
pub mod retry;
pub mod submit;
pub mod transport;
pub mod utils;
pub mod validation;

pub use country::{CountryEntry, CountryRegistry};
pub use environment::EnvironmentConfig;
pub use payload::{ApplicationForm, ApplicationPayload, FileAttachment};
pub use retry::{execute_with_retry, execute_with_retry_if, RetryPolicy};
pub use submit::{
    FailureClass, NullView, SubmissionOrchestrator, SubmissionOutcome, SubmissionView,
};
pub use transport::{IntakeServiceClient, SubmissionTransport};
pub use validation::{validate_all, validate_field, FieldSpec, FieldType, ValidationResult};

/// The wired-up submission pipeline: country registry, field set, retry
/// policy and HTTP transport, all taken from the environment config.
pub struct SubmissionPipeline {
    orchestrator: SubmissionOrchestrator<IntakeServiceClient>,
}

impl SubmissionPipeline {
    pub fn from_environment(
        config: &EnvironmentConfig,
        view: Arc<dyn SubmissionView>,
    ) -> Result<Self> {
        let registry = CountryRegistry::from_dataset_path(config.country_dataset_path.as_deref());
        let transport =
            IntakeServiceClient::new(config.intake_url.clone(), config.request_timeout_seconds)?;
        let fields = validation::default_application_fields(&config.uploads);

        Ok(Self {
            orchestrator: SubmissionOrchestrator::new(
                fields,
                registry,
                transport,
                config.retry,
                view,
            ),
        })
    }

    /// Run one submission to a terminal outcome.
    pub async fn submit(&self, form: &ApplicationForm) -> SubmissionOutcome {
        self.orchestrator.submit(form).await
    }

    /// Dry-run validation without any network side effects.
    pub fn validate(&self, form: &ApplicationForm) -> validation::ValidationReport {
        self.orchestrator.validate(form)
    }

    pub fn registry(&self) -> &CountryRegistry {
        self.orchestrator.registry()
    }
}
