//! Template reference type
//!
//! Templates are owned by an external registry; this crate only carries an
//! opaque identifier and validates its shape, never its existence.

use serde::{Deserialize, Serialize};
use thiserror::Error;

const MAX_TEMPLATE_ID_LENGTH: usize = 100;

/// Errors for malformed template identifiers
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TemplateIdError {
    #[error("template id cannot be empty")]
    Empty,

    #[error("template id exceeds maximum length of {0} characters")]
    TooLong(usize),

    #[error("template id contains invalid character: '{0}'")]
    InvalidCharacter(char),
}

/// Identifier of an externally-managed document template
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TemplateId(String);

impl TemplateId {
    /// Create a new TemplateId after validation
    pub fn new(id: impl Into<String>) -> Result<Self, TemplateIdError> {
        let id = id.into();

        if id.is_empty() {
            return Err(TemplateIdError::Empty);
        }

        if id.len() > MAX_TEMPLATE_ID_LENGTH {
            return Err(TemplateIdError::TooLong(MAX_TEMPLATE_ID_LENGTH));
        }

        if let Some(c) = id
            .chars()
            .find(|c| !c.is_ascii_alphanumeric() && *c != '-' && *c != '_')
        {
            return Err(TemplateIdError::InvalidCharacter(c));
        }

        Ok(Self(id))
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TemplateId {
    type Error = TemplateIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TemplateId> for String {
    fn from(id: TemplateId) -> Self {
        id.0
    }
}

impl std::fmt::Display for TemplateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
