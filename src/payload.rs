// src/payload.rs
//! In-memory form state and outbound payload assembly

use anyhow::{Context, Result};
use chrono::Utc;
use std::collections::HashMap;
use uuid::Uuid;

use crate::country::CountryRegistry;
use crate::utils::{extract_digits, infer_content_type};
use crate::validation::{FieldSpec, FieldType};

/// The select field whose value carries the applicant's ISO country code.
pub const COUNTRY_FIELD_ID: &str = "country";

/// One file the applicant attached to the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAttachment {
    pub field_id: String,
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl FileAttachment {
    pub fn new(field_id: &str, file_name: &str, data: Vec<u8>) -> Result<Self> {
        let content_type = infer_content_type(file_name)?;
        Ok(Self {
            field_id: field_id.to_string(),
            file_name: file_name.to_string(),
            content_type: content_type.to_string(),
            data,
        })
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// What the validator sees for one field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldInput<'a> {
    Text(&'a str),
    Choices(&'a [String]),
    Attachment(&'a FileAttachment),
    Missing,
}

/// Transient form state for one submission. Nothing here survives past a
/// terminal outcome.
#[derive(Debug, Default, Clone)]
pub struct ApplicationForm {
    values: HashMap<String, String>,
    choices: HashMap<String, Vec<String>>,
    attachments: HashMap<String, FileAttachment>,
}

impl ApplicationForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_value(&mut self, field_id: &str, value: &str) {
        self.values.insert(field_id.to_string(), value.to_string());
    }

    pub fn set_choices(&mut self, field_id: &str, selected: Vec<String>) {
        self.choices.insert(field_id.to_string(), selected);
    }

    pub fn attach(&mut self, attachment: FileAttachment) {
        self.attachments
            .insert(attachment.field_id.clone(), attachment);
    }

    pub fn value(&self, field_id: &str) -> Option<&str> {
        self.values.get(field_id).map(String::as_str)
    }

    pub fn choices(&self, field_id: &str) -> Option<&[String]> {
        self.choices.get(field_id).map(Vec::as_slice)
    }

    pub fn attachment(&self, field_id: &str) -> Option<&FileAttachment> {
        self.attachments.get(field_id)
    }

    pub fn selected_country(&self) -> Option<&str> {
        self.value(COUNTRY_FIELD_ID)
    }

    pub fn input_for(&self, spec: &FieldSpec) -> FieldInput<'_> {
        match spec.field_type {
            FieldType::File => self
                .attachment(&spec.id)
                .map(FieldInput::Attachment)
                .unwrap_or(FieldInput::Missing),
            FieldType::MultiSelect => self
                .choices(&spec.id)
                .map(FieldInput::Choices)
                .unwrap_or(FieldInput::Missing),
            _ => self
                .value(&spec.id)
                .map(FieldInput::Text)
                .unwrap_or(FieldInput::Missing),
        }
    }
}

/// The assembled outbound payload: flat text fields plus attachments,
/// stamped with a client-side submission id and timestamp.
#[derive(Debug, Clone)]
pub struct ApplicationPayload {
    pub submission_id: String,
    pub submitted_at: String,
    pub fields: Vec<(String, String)>,
    pub attachments: Vec<FileAttachment>,
}

/// Merge the validated form into one payload. The phone is normalized to
/// `+<calling code> <national digits>` and each multi-select collapses to a
/// single comma-separated value.
pub fn build_payload(
    fields: &[FieldSpec],
    form: &ApplicationForm,
    registry: &CountryRegistry,
) -> Result<ApplicationPayload> {
    let mut text_fields: Vec<(String, String)> = Vec::new();
    let mut attachments: Vec<FileAttachment> = Vec::new();

    for spec in fields {
        match spec.field_type {
            FieldType::File => {
                if let Some(attachment) = form.attachment(&spec.id) {
                    attachments.push(attachment.clone());
                }
            }
            FieldType::MultiSelect => {
                if let Some(selected) = form.choices(&spec.id) {
                    if !selected.is_empty() {
                        text_fields.push((spec.id.clone(), selected.join(", ")));
                    }
                }
            }
            FieldType::Tel => {
                let Some(raw) = form.value(&spec.id) else {
                    continue;
                };
                let iso = form
                    .selected_country()
                    .ok_or_else(|| anyhow::anyhow!("Phone given without a country selection"))?;
                let entry = registry.resolve(iso).with_context(|| {
                    format!("Country '{}' is unknown to every resolver tier", iso)
                })?;
                let digits = extract_digits(raw);
                text_fields.push((spec.id.clone(), format!("+{} {}", entry.calling_code, digits)));
            }
            _ => {
                if let Some(value) = form.value(&spec.id) {
                    let trimmed = value.trim();
                    if !trimmed.is_empty() {
                        let normalized = if spec.id == COUNTRY_FIELD_ID {
                            trimmed.to_uppercase()
                        } else {
                            trimmed.to_string()
                        };
                        text_fields.push((spec.id.clone(), normalized));
                    }
                }
            }
        }
    }

    Ok(ApplicationPayload {
        submission_id: Uuid::new_v4().to_string(),
        submitted_at: Utc::now().to_rfc3339(),
        fields: text_fields,
        attachments,
    })
}

impl ApplicationPayload {
    pub fn field(&self, field_id: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(id, _)| id == field_id)
            .map(|(_, value)| value.as_str())
    }

    /// One multipart form per attempt: every field as a text part, every
    /// attachment as a file part with filename and MIME type.
    pub fn to_multipart(&self) -> Result<reqwest::multipart::Form> {
        let mut form = reqwest::multipart::Form::new()
            .text("submission_id", self.submission_id.clone())
            .text("submitted_at", self.submitted_at.clone());

        for (field_id, value) in &self.fields {
            form = form.text(field_id.clone(), value.clone());
        }

        for attachment in &self.attachments {
            let part = reqwest::multipart::Part::bytes(attachment.data.clone())
                .file_name(attachment.file_name.clone())
                .mime_str(&attachment.content_type)
                .context("Failed to create multipart part")?;
            form = form.part(attachment.field_id.clone(), part);
        }

        Ok(form)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::country::{CountryRegistry, MinimalFallbackSource, StaticTableSource};
    use crate::validation::default_application_fields;
    use crate::environment::UploadConfig;

    fn test_registry() -> CountryRegistry {
        CountryRegistry::with_sources(vec![
            Box::new(StaticTableSource),
            Box::new(MinimalFallbackSource),
        ])
    }

    fn filled_form() -> ApplicationForm {
        let mut form = ApplicationForm::new();
        form.set_value("full_name", "Ana Horvat");
        form.set_value("email", "ana.horvat@example.com");
        form.set_value("country", "HR");
        form.set_value("phone", "95 1234567");
        form.set_value("position", "Backend Engineer");
        form.set_choices(
            "areas",
            vec!["Distributed systems".to_string(), "Tooling".to_string()],
        );
        form.attach(FileAttachment::new("cv", "cv.pdf", vec![0x25, 0x50, 0x44, 0x46]).unwrap());
        form
    }

    #[test]
    fn phone_is_normalized_to_calling_code_plus_digits() {
        let fields = default_application_fields(&UploadConfig::default());
        let payload = build_payload(&fields, &filled_form(), &test_registry()).unwrap();
        assert_eq!(payload.field("phone"), Some("+385 951234567"));
    }

    #[test]
    fn multi_select_collapses_to_one_value() {
        let fields = default_application_fields(&UploadConfig::default());
        let payload = build_payload(&fields, &filled_form(), &test_registry()).unwrap();
        assert_eq!(payload.field("areas"), Some("Distributed systems, Tooling"));
    }

    #[test]
    fn payload_carries_attachments_and_metadata() {
        let fields = default_application_fields(&UploadConfig::default());
        let payload = build_payload(&fields, &filled_form(), &test_registry()).unwrap();

        assert_eq!(payload.attachments.len(), 1);
        assert_eq!(payload.attachments[0].file_name, "cv.pdf");
        assert_eq!(payload.attachments[0].content_type, "application/pdf");
        assert!(!payload.submission_id.is_empty());
        assert!(!payload.submitted_at.is_empty());
    }

    #[test]
    fn country_value_is_uppercased() {
        let fields = default_application_fields(&UploadConfig::default());
        let mut form = filled_form();
        form.set_value("country", "hr");
        let payload = build_payload(&fields, &form, &test_registry()).unwrap();
        assert_eq!(payload.field("country"), Some("HR"));
    }

    #[test]
    fn empty_optional_fields_are_left_out() {
        let fields = default_application_fields(&UploadConfig::default());
        let mut form = filled_form();
        form.set_value("cover_letter", "   ");
        let payload = build_payload(&fields, &form, &test_registry()).unwrap();
        assert_eq!(payload.field("cover_letter"), None);
    }
}
