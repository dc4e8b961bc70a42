//! SAML Name ID types.
//!
//! Name identifiers are used to identify subjects in SAML assertions.

use serde::{Deserialize, Serialize};

use super::NameIdFormat;

/// SAML Name ID.
///
/// Represents the identifier of a subject in a SAML assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameId {
    /// The actual identifier value.
    pub value: String,

    /// The format of the name identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl NameId {
    /// Creates a new name ID with the given value and no format.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            format: None,
        }
    }

    /// Creates a new email name ID.
    #[must_use]
    pub fn email(email: impl Into<String>) -> Self {
        Self::new(email).with_format(NameIdFormat::Email)
    }

    /// Creates a new persistent name ID.
    #[must_use]
    pub fn persistent(value: impl Into<String>) -> Self {
        Self::new(value).with_format(NameIdFormat::Persistent)
    }

    /// Creates a new transient name ID.
    #[must_use]
    pub fn transient(value: impl Into<String>) -> Self {
        Self::new(value).with_format(NameIdFormat::Transient)
    }

    /// Sets the format for this name ID.
    #[must_use]
    pub fn with_format(mut self, format: NameIdFormat) -> Self {
        self.format = Some(format.uri().to_string());
        self
    }

    /// Returns the parsed name ID format.
    #[must_use]
    pub fn parsed_format(&self) -> NameIdFormat {
        self.format
            .as_deref()
            .and_then(NameIdFormat::from_uri)
            .unwrap_or_default()
    }
}
