//! Validation helpers for DTOs.

use validator::ValidationError;

const MAX_NAME_CHARS: usize = 32;

/// Validates that a PIN is exactly 4 ASCII digits.
///
/// # Examples
///
/// ```ignore
/// validate_pin("0042") // Ok
/// validate_pin("42")   // Err - too short
/// validate_pin("12a4") // Err - not a digit
/// ```
pub fn validate_pin(pin: &str) -> Result<(), ValidationError> {
    if pin.len() != 4 || !pin.chars().all(|c| c.is_ascii_digit()) {
        let mut err = ValidationError::new("pin_format");
        err.message = Some("PIN must be exactly 4 digits".into());
        return Err(err);
    }

    Ok(())
}

/// Validates a contestant display name: non-blank, at most 32 characters, no control characters.
pub fn validate_display_name(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        let mut err = ValidationError::new("name_blank");
        err.message = Some("Name must not be blank".into());
        return Err(err);
    }

    let count = trimmed.chars().count();
    if count > MAX_NAME_CHARS {
        let mut err = ValidationError::new("name_length");
        err.message =
            Some(format!("Name must be at most {MAX_NAME_CHARS} characters (got {count})").into());
        return Err(err);
    }

    if trimmed.chars().any(char::is_control) {
        let mut err = ValidationError::new("name_format");
        err.message = Some("Name must not contain control characters".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_pin() {
        assert!(validate_pin("0042").is_ok());
        assert!(validate_pin("9999").is_ok());
        assert!(validate_pin("123").is_err()); // too short
        assert!(validate_pin("12345").is_err()); // too long
        assert!(validate_pin("12a4").is_err());
        assert!(validate_pin("١٢٣٤").is_err()); // non-ascii digits
    }

    #[test]
    fn test_validate_display_name() {
        assert!(validate_display_name("Ana").is_ok());
        assert!(validate_display_name("   ").is_err());
        assert!(validate_display_name(&"a".repeat(33)).is_err());
        assert!(validate_display_name("tab\there").is_err());
    }
}
