// src/cli.rs
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::environment::EnvironmentConfig;
use crate::payload::{ApplicationForm, FileAttachment};
use crate::submit::{SubmissionOutcome, SubmissionView};
use crate::SubmissionPipeline;

#[derive(Parser)]
#[command(name = "aplica")]
#[command(about = "Submit job applications to the intake service")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Validate an application and send it to the intake endpoint
    Submit {
        /// JSON file with the form values
        #[arg(long)]
        form: PathBuf,
        /// CV to attach (pdf, doc or docx)
        #[arg(long)]
        cv: Option<PathBuf>,
    },
    /// Validate an application locally without sending anything
    Validate {
        #[arg(long)]
        form: PathBuf,
        #[arg(long)]
        cv: Option<PathBuf>,
    },
    /// List the countries the registry can resolve
    Countries,
}

/// Form surface for terminal runs: every UI update becomes a printed line.
pub struct ConsoleView;

impl SubmissionView for ConsoleView {
    fn show_field_error(&self, field_id: &str, message: &str) {
        println!("✗ {}: {}", field_id, message);
    }

    fn show_failure(&self, message: &str) {
        println!("✗ {}", message);
    }

    fn show_success(&self, message: &str) {
        println!("✓ {}", message);
    }
}

pub async fn run(cli: Cli, config: EnvironmentConfig) -> Result<()> {
    match cli.command {
        Command::Submit { form, cv } => {
            let form_data = load_form(&form, cv.as_deref()).await?;
            let pipeline = SubmissionPipeline::from_environment(&config, Arc::new(ConsoleView))?;

            match pipeline.submit(&form_data).await {
                SubmissionOutcome::Accepted { application_id, .. } => {
                    if let Some(id) = application_id {
                        info!(application_id = %id, "Application registered");
                    }
                    Ok(())
                }
                SubmissionOutcome::Invalid { field_id, .. } => {
                    anyhow::bail!("Application rejected locally: fix field '{}'", field_id)
                }
                SubmissionOutcome::Failed { class, .. } => {
                    anyhow::bail!("Submission failed ({})", class.code())
                }
                SubmissionOutcome::InFlight => {
                    anyhow::bail!("A submission is already running")
                }
            }
        }

        Command::Validate { form, cv } => {
            let form_data = load_form(&form, cv.as_deref()).await?;
            let pipeline = SubmissionPipeline::from_environment(&config, Arc::new(ConsoleView))?;

            let report = pipeline.validate(&form_data);
            if report.valid() {
                println!("✓ Application is valid");
                Ok(())
            } else {
                for failure in report.failures() {
                    println!(
                        "✗ {}: {}",
                        failure.field_id,
                        failure.message.as_deref().unwrap_or("invalid")
                    );
                }
                anyhow::bail!("Validation failed")
            }
        }

        Command::Countries => {
            let pipeline = SubmissionPipeline::from_environment(&config, Arc::new(ConsoleView))?;
            for country in pipeline.registry().countries() {
                println!(
                    "{} {} (+{}) [{}]",
                    country.flag, country.display_name, country.calling_code, country.iso_code
                );
            }
            Ok(())
        }
    }
}

/// Build the in-memory form from a JSON object file plus an optional CV
/// attachment. Strings become field values, arrays become multi-select
/// choices.
async fn load_form(path: &Path, cv: Option<&Path>) -> Result<ApplicationForm> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read form file: {}", path.display()))?;

    let parsed: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse form file: {}", path.display()))?;

    let object = parsed
        .as_object()
        .ok_or_else(|| anyhow::anyhow!("Form file must be a JSON object"))?;

    let mut form = ApplicationForm::new();
    for (key, value) in object {
        match value {
            serde_json::Value::String(text) => form.set_value(key, text),
            serde_json::Value::Array(items) => {
                let selected = items
                    .iter()
                    .filter_map(|item| item.as_str().map(String::from))
                    .collect();
                form.set_choices(key, selected);
            }
            serde_json::Value::Null => {}
            other => form.set_value(key, &other.to_string()),
        }
    }

    if let Some(cv_path) = cv {
        let data = tokio::fs::read(cv_path)
            .await
            .with_context(|| format!("Failed to read CV file: {}", cv_path.display()))?;
        let file_name = cv_path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| anyhow::anyhow!("CV path has no file name: {}", cv_path.display()))?;
        form.attach(FileAttachment::new("cv", file_name, data)?);
    }

    Ok(form)
}
