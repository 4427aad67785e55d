//! API key token generation
//!
//! Generates the opaque tokens handed to callers at issuance.

use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::domain::api_key::TOKEN_LENGTH;

/// Generator for key tokens
///
/// Tokens are 32 characters drawn from the 62-symbol alphanumeric alphabet
/// (~190 bits), sampled from the thread-local CSPRNG. Uniqueness is enforced
/// by the store, not the generator; the issuance path retries on collision.
#[derive(Debug, Clone, Default)]
pub struct KeyTokenGenerator;

impl KeyTokenGenerator {
    /// Create a new generator
    pub fn new() -> Self {
        Self
    }

    /// Generate a fresh token
    pub fn generate(&self) -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(TOKEN_LENGTH)
            .map(char::from)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::api_key::validate_token;

    #[test]
    fn test_token_length() {
        let generator = KeyTokenGenerator::new();
        assert_eq!(generator.generate().len(), TOKEN_LENGTH);
    }

    #[test]
    fn test_token_alphabet() {
        let generator = KeyTokenGenerator::new();
        let token = generator.generate();

        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
        assert!(validate_token(&token).is_ok());
    }

    #[test]
    fn test_token_uniqueness() {
        let generator = KeyTokenGenerator::new();

        let token1 = generator.generate();
        let token2 = generator.generate();
        assert_ne!(token1, token2);
    }
}
