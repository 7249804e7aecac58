use crate::errors::{AppError, AppResult};

const MAX_NAME_LENGTH: usize = 120;
const MAX_EMAIL_LENGTH: usize = 254;

/// Validate a free-text name field: trimmed, non-empty, bounded, and free of
/// control characters. Returns the cleaned value.
pub fn display_name(field: &str, value: &str) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::bad_request(format!("{} must not be empty", field)));
    }
    if trimmed.chars().count() > MAX_NAME_LENGTH {
        return Err(AppError::bad_request(format!(
            "{} must be at most {} characters",
            field, MAX_NAME_LENGTH
        )));
    }
    if trimmed.chars().any(char::is_control) {
        return Err(AppError::bad_request(format!(
            "{} must not contain control characters",
            field
        )));
    }
    Ok(trimmed.to_string())
}

/// Structural email check; full RFC validation belongs to a mail service,
/// not this API. Returns the cleaned, lowercased address.
pub fn email_address(value: &str) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.len() > MAX_EMAIL_LENGTH {
        return Err(AppError::bad_request("email is missing or too long"));
    }
    if trimmed.chars().any(|c| c.is_control() || c.is_whitespace()) {
        return Err(AppError::bad_request("email must not contain whitespace"));
    }
    match trimmed.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => {
            Ok(trimmed.to_ascii_lowercase())
        }
        _ => Err(AppError::bad_request("email is not a valid address")),
    }
}
