//! SAML error types.
//!
//! Every failure in the engine surfaces as a typed variant to the immediate
//! caller; nothing is retried internally and nothing is logged-and-swallowed.
//! Proceeding on an unverified signature or an expired window is a security
//! defect, so the taxonomy keeps those outcomes distinct.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::metadata::FetchError;
use crate::types::{status_codes, sub_status_codes};

/// Result type for SAML operations.
pub type SamlResult<T> = Result<T, SamlError>;

/// SAML protocol errors.
#[derive(Debug, Error)]
pub enum SamlError {
    /// Required configuration is missing before an operation that needs it.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Key material could not be decoded.
    #[error("key decode error: {0}")]
    KeyDecode(#[from] websso_crypto::KeyDecodeError),

    /// Partner metadata retrieval or parsing failed.
    #[error("metadata fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// A message tree could not be serialized to XML.
    #[error("marshal error: {0}")]
    Marshal(String),

    /// XML parsing error.
    #[error("XML parsing error: {0}")]
    XmlParse(String),

    /// Missing required element or attribute.
    #[error("missing required element: {0}")]
    MissingElement(String),

    /// XML signature validation failed.
    #[error("signature validation failed: {0}")]
    SignatureInvalid(String),

    /// XML signature creation failed.
    #[error("signature creation failed: {0}")]
    SignatureCreation(String),

    /// The response carried no assertion.
    #[error("response contains no assertion")]
    NoAssertion,

    /// The identity provider reported a non-success status.
    #[error("authentication failed: {0}")]
    AuthnFailed(String),

    /// The current time falls outside the assertion's validity window.
    #[error("time window violated: now {now} outside [{not_before}, {not_on_or_after})")]
    TimeWindowViolated {
        /// Start of the validity window.
        not_before: DateTime<Utc>,
        /// End of the validity window (exclusive).
        not_on_or_after: DateTime<Utc>,
        /// The instant that was checked.
        now: DateTime<Utc>,
    },

    /// The response does not correlate with the request that triggered it.
    #[error("InResponseTo mismatch: expected {expected}, got {actual}")]
    InResponseToMismatch {
        /// The id of the request awaiting a response.
        expected: String,
        /// The id the response actually referenced.
        actual: String,
    },

    /// HTTP method with no matching binding.
    #[error("unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    /// A required transport parameter was absent.
    #[error("missing parameter: {0}")]
    MissingParameter(String),

    /// Base64 decoding error.
    #[error("base64 decode error: {0}")]
    Base64Decode(String),

    /// Deflate compression or decompression error.
    #[error("deflate error: {0}")]
    Deflate(String),

    /// Cryptographic operation error.
    #[error("crypto error: {0}")]
    Crypto(String),
}

impl SamlError {
    /// Returns the SAML status code for this error.
    ///
    /// Used when turning a failed operation into a failure `Response`.
    #[must_use]
    pub fn status_code(&self) -> &'static str {
        match self {
            Self::XmlParse(_)
            | Self::MissingElement(_)
            | Self::MissingParameter(_)
            | Self::Base64Decode(_)
            | Self::Deflate(_)
            | Self::SignatureInvalid(_)
            | Self::NoAssertion
            | Self::TimeWindowViolated { .. }
            | Self::InResponseToMismatch { .. }
            | Self::UnsupportedMethod(_) => status_codes::REQUESTER,
            _ => status_codes::RESPONDER,
        }
    }

    /// Returns a sub-status code if applicable.
    #[must_use]
    pub fn sub_status_code(&self) -> Option<&'static str> {
        match self {
            Self::UnsupportedMethod(_) => Some(sub_status_codes::REQUEST_UNSUPPORTED),
            _ => None,
        }
    }
}

impl From<quick_xml::Error> for SamlError {
    fn from(err: quick_xml::Error) -> Self {
        Self::XmlParse(err.to_string())
    }
}

impl From<base64::DecodeError> for SamlError {
    fn from(err: base64::DecodeError) -> Self {
        Self::Base64Decode(err.to_string())
    }
}

impl From<std::io::Error> for SamlError {
    fn from(err: std::io::Error) -> Self {
        Self::Deflate(err.to_string())
    }
}

impl From<websso_crypto::SignatureError> for SamlError {
    fn from(err: websso_crypto::SignatureError) -> Self {
        Self::Crypto(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_status_codes() {
        let err = SamlError::NoAssertion;
        assert_eq!(
            err.status_code(),
            "urn:oasis:names:tc:SAML:2.0:status:Requester"
        );

        let err = SamlError::Configuration("missing issuer".to_string());
        assert_eq!(
            err.status_code(),
            "urn:oasis:names:tc:SAML:2.0:status:Responder"
        );
    }

    #[test]
    fn unsupported_method_has_sub_status() {
        let err = SamlError::UnsupportedMethod("PUT".to_string());
        assert_eq!(
            err.sub_status_code(),
            Some("urn:oasis:names:tc:SAML:2.0:status:RequestUnsupported")
        );
    }
}
