// src/validation.rs
//! Local field and file validation, run before anything touches the network

use crate::country::{CountryContext, CountryRegistry, GENERIC_MAX_DIGITS, GENERIC_MIN_DIGITS};
use crate::environment::UploadConfig;
use crate::payload::{ApplicationForm, FieldInput, COUNTRY_FIELD_ID};
use crate::utils::{extract_digits, format_file_size, get_file_extension};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Email,
    Tel,
    TextArea,
    Select,
    MultiSelect,
    File,
}

/// Declares one form field and its constraints.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub id: String,
    pub label: String,
    pub field_type: FieldType,
    pub required: bool,
    pub max_length: Option<usize>,
    pub max_file_size: Option<u64>,
    pub accepted_extensions: Vec<String>,
}

impl FieldSpec {
    pub fn new(id: &str, label: &str, field_type: FieldType) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            field_type,
            required: false,
            max_length: None,
            max_file_size: None,
            accepted_extensions: Vec::new(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    pub fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.max_file_size = Some(max_file_size);
        self
    }

    pub fn with_accepted_extensions(mut self, extensions: &[String]) -> Self {
        self.accepted_extensions = extensions.to_vec();
        self
    }
}

/// Outcome of validating one field. Ephemeral: applied to the UI and
/// discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub field_id: String,
    pub is_valid: bool,
    pub message: Option<String>,
}

impl ValidationResult {
    pub fn ok(field_id: &str) -> Self {
        Self {
            field_id: field_id.to_string(),
            is_valid: true,
            message: None,
        }
    }

    pub fn invalid(field_id: &str, message: String) -> Self {
        Self {
            field_id: field_id.to_string(),
            is_valid: false,
            message: Some(message),
        }
    }
}

/// Every failure from one validation pass. `first_failure` identifies the
/// field the UI should focus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    pub results: Vec<ValidationResult>,
}

impl ValidationReport {
    pub fn valid(&self) -> bool {
        self.results.iter().all(|r| r.is_valid)
    }

    pub fn first_failure(&self) -> Option<&ValidationResult> {
        self.results.iter().find(|r| !r.is_valid)
    }

    pub fn failures(&self) -> impl Iterator<Item = &ValidationResult> {
        self.results.iter().filter(|r| !r.is_valid)
    }
}

/// Validate one field. The required check always runs first; a `tel` field
/// without a country context is invalid, never silently skipped.
pub fn validate_field(
    spec: &FieldSpec,
    input: &FieldInput<'_>,
    country: Option<&CountryContext>,
) -> ValidationResult {
    let empty = match input {
        FieldInput::Missing => true,
        FieldInput::Text(value) => value.trim().is_empty(),
        FieldInput::Choices(selected) => selected.is_empty(),
        FieldInput::Attachment(_) => false,
    };

    if empty {
        if spec.required {
            return ValidationResult::invalid(&spec.id, format!("{} is required", spec.label));
        }
        return ValidationResult::ok(&spec.id);
    }

    match spec.field_type {
        FieldType::Text | FieldType::TextArea => validate_text(spec, input),
        FieldType::Email => validate_email(spec, input),
        FieldType::Tel => validate_phone(spec, input, country),
        FieldType::Select | FieldType::MultiSelect => ValidationResult::ok(&spec.id),
        FieldType::File => validate_file(spec, input),
    }
}

fn validate_text(spec: &FieldSpec, input: &FieldInput<'_>) -> ValidationResult {
    let FieldInput::Text(value) = input else {
        return ValidationResult::ok(&spec.id);
    };

    if let Some(max_length) = spec.max_length {
        if value.chars().count() > max_length {
            return ValidationResult::invalid(
                &spec.id,
                format!("{} must be {} characters or fewer", spec.label, max_length),
            );
        }
    }
    ValidationResult::ok(&spec.id)
}

fn validate_email(spec: &FieldSpec, input: &FieldInput<'_>) -> ValidationResult {
    let FieldInput::Text(value) = input else {
        return ValidationResult::ok(&spec.id);
    };

    if is_plausible_email(value.trim()) {
        ValidationResult::ok(&spec.id)
    } else {
        ValidationResult::invalid(
            &spec.id,
            format!("{} must be a valid email address", spec.label),
        )
    }
}

// Permissive local@domain.tld shape only; deliverability is the server's
// problem.
fn is_plausible_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') || value.contains(' ') {
        return false;
    }
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    !host.is_empty() && tld.len() >= 2
}

fn validate_phone(
    spec: &FieldSpec,
    input: &FieldInput<'_>,
    country: Option<&CountryContext>,
) -> ValidationResult {
    let FieldInput::Text(value) = input else {
        return ValidationResult::ok(&spec.id);
    };

    let Some(context) = country else {
        return ValidationResult::invalid(
            &spec.id,
            "Select a country before entering a phone number".to_string(),
        );
    };

    let digits = extract_digits(value);
    let (min_digits, max_digits) = match context.pattern {
        Some(pattern) => (pattern.min_digits, pattern.max_digits),
        None => (GENERIC_MIN_DIGITS, GENERIC_MAX_DIGITS),
    };

    if digits.len() < min_digits || digits.len() > max_digits {
        let bounds = if min_digits == max_digits {
            format!("{} digits", min_digits)
        } else {
            format!("{}-{} digits", min_digits, max_digits)
        };
        return ValidationResult::invalid(
            &spec.id,
            format!(
                "Enter a valid phone number for {} ({}, e.g. {})",
                context.entry.display_name, bounds, context.format_hint
            ),
        );
    }
    ValidationResult::ok(&spec.id)
}

fn validate_file(spec: &FieldSpec, input: &FieldInput<'_>) -> ValidationResult {
    let FieldInput::Attachment(attachment) = input else {
        return ValidationResult::ok(&spec.id);
    };

    if let Some(max_size) = spec.max_file_size {
        if attachment.size() > max_size {
            return ValidationResult::invalid(
                &spec.id,
                format!(
                    "{} is too large: {} (max {})",
                    spec.label,
                    format_file_size(attachment.size()),
                    format_file_size(max_size)
                ),
            );
        }
    }

    if !spec.accepted_extensions.is_empty() {
        let extension = get_file_extension(&attachment.file_name).unwrap_or_default();
        if !spec.accepted_extensions.contains(&extension) {
            return ValidationResult::invalid(
                &spec.id,
                format!(
                    "{}: unsupported file type '.{}' (accepted: {})",
                    spec.label,
                    extension,
                    spec.accepted_extensions.join(", ")
                ),
            );
        }
    }
    ValidationResult::ok(&spec.id)
}

/// Validate the whole form. Collects every failure so callers can either
/// focus the first one or render them all.
pub fn validate_all(
    fields: &[FieldSpec],
    form: &ApplicationForm,
    registry: &CountryRegistry,
) -> ValidationReport {
    let country = form
        .selected_country()
        .and_then(|iso| registry.context_for(iso));

    let mut results = Vec::with_capacity(fields.len());
    for spec in fields {
        let input = form.input_for(spec);
        let mut result = validate_field(spec, &input, country.as_ref());

        // A selected country no tier can resolve is a field error, not a
        // registry failure.
        if result.is_valid && spec.id == COUNTRY_FIELD_ID && country.is_none() {
            if let FieldInput::Text(value) = input {
                if !value.trim().is_empty() {
                    result =
                        ValidationResult::invalid(&spec.id, "Select a valid country".to_string());
                }
            }
        }

        results.push(result);
    }

    ValidationReport { results }
}

/// The intake form's field set. Upload limits come from configuration.
pub fn default_application_fields(uploads: &UploadConfig) -> Vec<FieldSpec> {
    vec![
        FieldSpec::new("full_name", "Full name", FieldType::Text)
            .required()
            .with_max_length(120),
        FieldSpec::new("email", "Email", FieldType::Email).required(),
        FieldSpec::new("country", "Country", FieldType::Select).required(),
        FieldSpec::new("phone", "Phone number", FieldType::Tel).required(),
        FieldSpec::new("position", "Position", FieldType::Select).required(),
        FieldSpec::new("areas", "Areas of interest", FieldType::MultiSelect),
        FieldSpec::new("cover_letter", "Cover letter", FieldType::TextArea).with_max_length(2000),
        FieldSpec::new("cv", "CV", FieldType::File)
            .required()
            .with_max_file_size(uploads.max_file_size_bytes)
            .with_accepted_extensions(&uploads.accepted_extensions),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::country::{CountryRegistry, MinimalFallbackSource, StaticTableSource};
    use crate::payload::FileAttachment;

    fn test_registry() -> CountryRegistry {
        CountryRegistry::with_sources(vec![
            Box::new(StaticTableSource),
            Box::new(MinimalFallbackSource),
        ])
    }

    fn croatia_context() -> CountryContext {
        test_registry().context_for("HR").unwrap()
    }

    #[test]
    fn required_check_runs_before_format_checks() {
        let spec = FieldSpec::new("email", "Email", FieldType::Email).required();
        let result = validate_field(&spec, &FieldInput::Text("   "), None);
        assert!(!result.is_valid);
        assert_eq!(result.message.as_deref(), Some("Email is required"));
    }

    #[test]
    fn empty_optional_field_is_valid() {
        let spec = FieldSpec::new("cover_letter", "Cover letter", FieldType::TextArea);
        let result = validate_field(&spec, &FieldInput::Missing, None);
        assert!(result.is_valid);
    }

    #[test]
    fn email_shape_is_checked_permissively() {
        let spec = FieldSpec::new("email", "Email", FieldType::Email).required();

        let valid = ["ana@example.com", "a.b+c@sub.example.co"];
        for address in valid {
            assert!(
                validate_field(&spec, &FieldInput::Text(address), None).is_valid,
                "expected {} to be accepted",
                address
            );
        }

        let invalid = ["plainaddress", "no@tld", "two@@example.com", "a b@example.com"];
        for address in invalid {
            assert!(
                !validate_field(&spec, &FieldInput::Text(address), None).is_valid,
                "expected {} to be rejected",
                address
            );
        }
    }

    #[test]
    fn phone_without_country_context_is_invalid() {
        let spec = FieldSpec::new("phone", "Phone number", FieldType::Tel).required();
        let result = validate_field(&spec, &FieldInput::Text("95 1234567"), None);
        assert!(!result.is_valid);
        assert!(result.message.unwrap().contains("Select a country"));
    }

    #[test]
    fn phone_is_checked_against_the_country_pattern() {
        let spec = FieldSpec::new("phone", "Phone number", FieldType::Tel).required();
        let context = croatia_context();

        assert!(validate_field(&spec, &FieldInput::Text("95 1234567"), Some(&context)).is_valid);
        assert!(!validate_field(&spec, &FieldInput::Text("95 12"), Some(&context)).is_valid);
        assert!(
            !validate_field(&spec, &FieldInput::Text("95 1234567890"), Some(&context)).is_valid
        );
    }

    #[test]
    fn phone_falls_back_to_generic_digit_bounds() {
        let spec = FieldSpec::new("phone", "Phone number", FieldType::Tel).required();
        let context = CountryContext {
            entry: test_registry().resolve("PA").unwrap(),
            pattern: None,
            format_hint: "XXX XXX XXXX".to_string(),
        };

        assert!(validate_field(&spec, &FieldInput::Text("1234567"), Some(&context)).is_valid);
        assert!(!validate_field(&spec, &FieldInput::Text("123456"), Some(&context)).is_valid);
    }

    #[test]
    fn phone_error_message_carries_the_format_hint() {
        let spec = FieldSpec::new("phone", "Phone number", FieldType::Tel).required();
        let context = croatia_context();

        let result = validate_field(&spec, &FieldInput::Text("12"), Some(&context));
        let message = result.message.unwrap();
        assert!(message.contains("8-9 digits"));
        assert!(message.contains("XX XXX XXXX"));
    }

    #[test]
    fn overlong_text_reports_the_limit() {
        let spec = FieldSpec::new("full_name", "Full name", FieldType::Text)
            .required()
            .with_max_length(10);
        let result = validate_field(&spec, &FieldInput::Text("a name far too long"), None);
        assert!(!result.is_valid);
        assert!(result.message.unwrap().contains("10 characters"));
    }

    #[test]
    fn oversize_file_reports_both_sizes() {
        let spec = FieldSpec::new("cv", "CV", FieldType::File)
            .required()
            .with_max_file_size(5 * 1024 * 1024);
        let attachment =
            FileAttachment::new("cv", "cv.pdf", vec![0u8; 6 * 1024 * 1024]).unwrap();

        let result = validate_field(&spec, &FieldInput::Attachment(&attachment), None);
        assert!(!result.is_valid);
        let message = result.message.unwrap();
        assert!(message.contains("6 MB"));
        assert!(message.contains("5 MB"));
    }

    #[test]
    fn unaccepted_extension_is_rejected() {
        let spec = FieldSpec::new("cv", "CV", FieldType::File)
            .required()
            .with_accepted_extensions(&["pdf".to_string(), "docx".to_string()]);
        let attachment = FileAttachment {
            field_id: "cv".to_string(),
            file_name: "cv.txt".to_string(),
            content_type: "text/plain".to_string(),
            data: vec![1, 2, 3],
        };

        let result = validate_field(&spec, &FieldInput::Attachment(&attachment), None);
        assert!(!result.is_valid);
        assert!(result.message.unwrap().contains(".txt"));
    }

    #[test]
    fn validation_is_idempotent_for_identical_inputs() {
        let spec = FieldSpec::new("phone", "Phone number", FieldType::Tel).required();
        let context = croatia_context();
        let input = FieldInput::Text("95 1234567");

        let first = validate_field(&spec, &input, Some(&context));
        let second = validate_field(&spec, &input, Some(&context));
        assert_eq!(first, second);
    }

    #[test]
    fn validate_all_reports_the_first_failing_field() {
        let registry = test_registry();
        let fields = vec![
            FieldSpec::new("full_name", "Full name", FieldType::Text).required(),
            FieldSpec::new("email", "Email", FieldType::Email).required(),
        ];

        let mut form = ApplicationForm::new();
        form.set_value("full_name", "Ana Horvat");

        let report = validate_all(&fields, &form, &registry);
        assert!(!report.valid());
        assert_eq!(report.first_failure().unwrap().field_id, "email");
    }

    #[test]
    fn unresolvable_country_selection_is_a_field_error() {
        let registry = test_registry();
        let fields = vec![FieldSpec::new("country", "Country", FieldType::Select).required()];

        let mut form = ApplicationForm::new();
        form.set_value("country", "ZZ");

        let report = validate_all(&fields, &form, &registry);
        let failure = report.first_failure().unwrap();
        assert_eq!(failure.field_id, "country");
        assert_eq!(failure.message.as_deref(), Some("Select a valid country"));
    }
}
