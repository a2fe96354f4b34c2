use crate::utils::error::{AppError, Result};
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn invalid(field: &str, value: impl ToString, reason: impl Into<String>) -> AppError {
    AppError::InvalidConfigValueError {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

/// Absolute http(s) URL.
pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(invalid(field_name, url_str, "URL is required"));
    }

    let url = Url::parse(url_str).map_err(|e| invalid(field_name, url_str, format!("not a URL: {}", e)))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(invalid(field_name, url_str, format!("scheme {} is not http(s)", scheme))),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(invalid(field_name, path, "path is required"));
    }
    if path.contains('\0') {
        return Err(invalid(field_name, path, "path contains a NUL byte"));
    }
    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(invalid(field_name, value, format!("must be at least {}", min_value)));
    }
    Ok(())
}

/// Extension check is case-insensitive: `CODIGOS.CSV` passes for `["csv"]`.
pub fn validate_file_extension(field_name: &str, file: &str, allowed_extensions: &[&str]) -> Result<()> {
    let extension = std::path::Path::new(file)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    match extension {
        Some(ext) if allowed_extensions.contains(&ext.as_str()) => Ok(()),
        Some(ext) => Err(invalid(
            field_name,
            file,
            format!(".{} not accepted (expected {})", ext, allowed_extensions.join(", ")),
        )),
        None => Err(invalid(field_name, file, "file name has no extension")),
    }
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(field_name, value, "must not be blank"));
    }
    Ok(())
}

pub fn validate_min_length(field_name: &str, value: &str, min_len: usize) -> Result<()> {
    if value.len() < min_len {
        // never echo secrets back
        return Err(invalid(field_name, "<redacted>", format!("must be at least {} bytes", min_len)));
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(invalid(field_name, value, format!("must be within {}..={}", min, max)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("lookup_base_url", "https://example.com").is_ok());
        assert!(validate_url("lookup_base_url", "http://example.com").is_ok());
        assert!(validate_url("lookup_base_url", "").is_err());
        assert!(validate_url("lookup_base_url", "invalid-url").is_err());
        assert!(validate_url("lookup_base_url", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_positive_number() {
        assert!(validate_positive_number("page_size", 5, 1).is_ok());
        assert!(validate_positive_number("page_size", 0, 1).is_err());
    }

    #[test]
    fn test_validate_file_extension() {
        assert!(validate_file_extension("csvFile", "codigos.csv", &["csv"]).is_ok());
        assert!(validate_file_extension("csvFile", "CODIGOS.CSV", &["csv"]).is_ok());
        assert!(validate_file_extension("csvFile", "codigos.txt", &["csv"]).is_err());
        assert!(validate_file_extension("csvFile", "codigos", &["csv"]).is_err());
    }

    #[test]
    fn test_validate_min_length_redacts_value() {
        let err = validate_min_length("session_secret", "short", 32).unwrap_err();
        assert!(!err.to_string().contains("short"));
    }
}
