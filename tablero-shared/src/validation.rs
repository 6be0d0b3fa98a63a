//! Input checks that run before any persistence context is opened.
//!
//! Every helper returns a `Result` so callers branch on bad input instead of
//! unwinding.

pub const USERNAME_MAX_LEN: usize = 32;
pub const REASON_MAX_LEN: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("{field} must be a positive identifier, got {value}")]
    InvalidId { field: &'static str, value: i64 },
}

/// Trims surrounding whitespace and checks the length bounds.
pub fn username<'a>(field: &'static str, value: &'a str) -> Result<&'a str, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty { field });
    }
    if trimmed.chars().count() > USERNAME_MAX_LEN {
        return Err(ValidationError::TooLong { field, max: USERNAME_MAX_LEN });
    }
    Ok(trimmed)
}

pub fn positive_id(field: &'static str, value: i64) -> Result<i64, ValidationError> {
    if value <= 0 {
        return Err(ValidationError::InvalidId { field, value });
    }
    Ok(value)
}

pub fn reason<'a>(field: &'static str, value: &'a str) -> Result<&'a str, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty { field });
    }
    if trimmed.chars().count() > REASON_MAX_LEN {
        return Err(ValidationError::TooLong { field, max: REASON_MAX_LEN });
    }
    Ok(trimmed)
}
