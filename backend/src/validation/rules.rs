//! Common validation rules shared across request payloads.

use validator::ValidationError;

const MAX_DECLINE_NOTE_LENGTH: usize = 2000;
const MAX_REASON_CODE_LENGTH: usize = 64;

/// Validates a decline reason code.
///
/// Requirements:
/// - Non-empty, at most 64 characters
/// - Lowercase alphanumeric and underscores only
pub fn validate_reason_code(code: &str) -> Result<(), ValidationError> {
    if code.is_empty() || code.len() > MAX_REASON_CODE_LENGTH {
        return Err(ValidationError::new("reason_code_invalid_length"));
    }

    if !code
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        return Err(ValidationError::new("reason_code_invalid_characters"));
    }

    Ok(())
}

/// Validates the free-text decline note length.
pub fn validate_decline_note(note: &str) -> Result<(), ValidationError> {
    if note.chars().count() > MAX_DECLINE_NOTE_LENGTH {
        return Err(ValidationError::new("decline_note_too_long"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_code_rejects_empty() {
        assert!(validate_reason_code("").is_err());
    }

    #[test]
    fn reason_code_rejects_uppercase_and_spaces() {
        assert!(validate_reason_code("Not Clinical").is_err());
    }

    #[test]
    fn reason_code_accepts_valid() {
        assert!(validate_reason_code("outside_scope_of_service").is_ok());
    }

    #[test]
    fn decline_note_rejects_over_limit() {
        let note = "x".repeat(MAX_DECLINE_NOTE_LENGTH + 1);
        assert!(validate_decline_note(&note).is_err());
    }

    #[test]
    fn decline_note_accepts_empty_and_normal() {
        assert!(validate_decline_note("").is_ok());
        assert!(validate_decline_note("insufficient clinical history").is_ok());
    }
}
