//! API key token validation utilities

use thiserror::Error;

/// Errors that can occur when validating a key token
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TokenValidationError {
    #[error("API key token cannot be empty")]
    Empty,

    #[error("API key token must be exactly {0} characters")]
    WrongLength(usize),

    #[error("API key token contains invalid character: '{0}'. Only alphanumeric characters are allowed")]
    InvalidCharacter(char),
}

/// Length of every issued key token
pub const TOKEN_LENGTH: usize = 32;

/// Validate a key token
///
/// Rules:
/// - Exactly 32 characters
/// - ASCII alphanumeric only (the 62-symbol issuance alphabet)
pub fn validate_token(token: &str) -> Result<(), TokenValidationError> {
    if token.is_empty() {
        return Err(TokenValidationError::Empty);
    }

    if token.len() != TOKEN_LENGTH {
        return Err(TokenValidationError::WrongLength(TOKEN_LENGTH));
    }

    if let Some(c) = token.chars().find(|c| !c.is_ascii_alphanumeric()) {
        return Err(TokenValidationError::InvalidCharacter(c));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_token() {
        assert!(validate_token(&"a".repeat(32)).is_ok());
        assert!(validate_token("A1b2C3d4E5f6G7h8I9j0K1l2M3n4O5p6").is_ok());
    }

    #[test]
    fn test_empty_token() {
        assert_eq!(validate_token(""), Err(TokenValidationError::Empty));
    }

    #[test]
    fn test_wrong_length() {
        assert_eq!(
            validate_token("short"),
            Err(TokenValidationError::WrongLength(32))
        );
        assert_eq!(
            validate_token(&"a".repeat(33)),
            Err(TokenValidationError::WrongLength(32))
        );
    }

    #[test]
    fn test_invalid_character() {
        let mut token = "a".repeat(31);
        token.push('_');
        assert_eq!(
            validate_token(&token),
            Err(TokenValidationError::InvalidCharacter('_'))
        );

        let mut token = "a".repeat(31);
        token.push(' ');
        assert_eq!(
            validate_token(&token),
            Err(TokenValidationError::InvalidCharacter(' '))
        );
    }
}
