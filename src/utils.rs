// src/utils.rs
use anyhow::Result;

/// Human-readable file size for validation messages, e.g. "2.3 MB".
pub fn format_file_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = 1024.0 * 1024.0;

    let value = bytes as f64;
    if value >= MB {
        let mb = value / MB;
        if (mb - mb.round()).abs() < 0.05 {
            format!("{:.0} MB", mb.round())
        } else {
            format!("{:.1} MB", mb)
        }
    } else if value >= KB {
        format!("{:.0} KB", (value / KB).round())
    } else {
        format!("{} B", bytes)
    }
}

/// Get file extension in lowercase
pub fn get_file_extension(filename: &str) -> Option<String> {
    std::path::Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
}

/// The digits an applicant actually typed, ignoring spaces, dashes and
/// other punctuation.
pub fn extract_digits(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// MIME type for an attachment, by extension.
pub fn infer_content_type(file_name: &str) -> Result<&'static str> {
    match get_file_extension(file_name).as_deref() {
        Some("pdf") => Ok("application/pdf"),
        Some("doc") => Ok("application/msword"),
        Some("docx") => {
            Ok("application/vnd.openxmlformats-officedocument.wordprocessingml.document")
        }
        _ => anyhow::bail!("Unsupported file format: {}", file_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(512), "512 B");
        assert_eq!(format_file_size(2048), "2 KB");
        assert_eq!(format_file_size(5 * 1024 * 1024), "5 MB");
        assert_eq!(format_file_size(6 * 1024 * 1024), "6 MB");
        assert_eq!(format_file_size(2_411_725), "2.3 MB");
    }

    #[test]
    fn test_get_file_extension() {
        assert_eq!(get_file_extension("cv.pdf"), Some("pdf".to_string()));
        assert_eq!(get_file_extension("resume.DOCX"), Some("docx".to_string()));
        assert_eq!(get_file_extension("noext"), None);
    }

    #[test]
    fn test_extract_digits() {
        assert_eq!(extract_digits("95 1234567"), "951234567");
        assert_eq!(extract_digits("(55) 1234-5678"), "5512345678");
        assert_eq!(extract_digits("no digits"), "");
    }

    #[test]
    fn test_infer_content_type() {
        assert_eq!(infer_content_type("cv.pdf").unwrap(), "application/pdf");
        assert!(infer_content_type("cv.docx").is_ok());
        assert!(infer_content_type("cv.exe").is_err());
    }
}
