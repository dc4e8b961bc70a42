//! Web Browser SSO flow plumbing.
//!
//! Transport-agnostic entry points: routing an incoming HTTP method to
//! the right binding decoder, and consuming a response at the service
//! provider side. Each validation step of response processing fails
//! closed and is independently exercisable.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::bindings::{DecodedMessage, HttpPostBinding, HttpRedirectBinding};
use crate::error::{SamlError, SamlResult};
use crate::signature::XmlSignatureValidator;
use crate::types::{Conditions, Response};
use crate::xml;

/// Routes an incoming request to the binding its HTTP method implies.
///
/// GET carries the HTTP-Redirect binding, POST the HTTP-POST binding;
/// anything else is a protocol error. `params` holds the query or form
/// parameters, already URL-decoded.
pub fn decode_incoming(
    method: &str,
    params: &HashMap<String, String>,
) -> SamlResult<DecodedMessage> {
    let get = |key: &str| params.get(key).map(String::as_str);

    match method {
        "GET" => HttpRedirectBinding::decode(
            get("SAMLRequest"),
            get("SAMLResponse"),
            get("RelayState"),
            get("Signature"),
            get("SigAlg"),
        ),
        "POST" => HttpPostBinding::decode(
            get("SAMLRequest"),
            get("SAMLResponse"),
            get("RelayState"),
        ),
        other => Err(SamlError::UnsupportedMethod(other.to_string())),
    }
}

/// Checks a validity window against a point in time.
///
/// Both bounds are required; `NotOnOrAfter` is exclusive, per its name.
pub fn check_time_window(conditions: &Conditions, now: DateTime<Utc>) -> SamlResult<()> {
    let not_before = conditions
        .not_before
        .ok_or_else(|| SamlError::MissingElement("Conditions NotBefore".to_string()))?;
    let not_on_or_after = conditions
        .not_on_or_after
        .ok_or_else(|| SamlError::MissingElement("Conditions NotOnOrAfter".to_string()))?;

    if now < not_before || now >= not_on_or_after {
        return Err(SamlError::TimeWindowViolated {
            not_before,
            not_on_or_after,
            now,
        });
    }

    Ok(())
}

/// Checks that a response answers the request it claims to.
pub fn verify_in_response_to(response: &Response, expected_request_id: &str) -> SamlResult<()> {
    let actual = response.in_response_to.as_deref().unwrap_or("");
    if actual != expected_request_id {
        return Err(SamlError::InResponseToMismatch {
            expected: expected_request_id.to_string(),
            actual: actual.to_string(),
        });
    }
    Ok(())
}

/// The outcome of successfully processing a response.
#[derive(Debug, Clone)]
pub struct AuthenticatedSubject {
    /// The subject's NameID value.
    pub name_id: String,

    /// The NameID format URI, when stamped.
    pub name_id_format: Option<String>,

    /// The issuer of the accepted assertion.
    pub issuer: String,

    /// The session index from the authentication statement, when present.
    pub session_index: Option<String>,
}

/// Service-provider-side response consumer.
///
/// Parses, verifies, and extracts the authenticated subject from a
/// response document. Only the first assertion of a response is acted
/// on.
pub struct ResponseProcessor {
    validator: Option<XmlSignatureValidator>,
}

impl ResponseProcessor {
    /// Creates a processor that verifies assertion signatures with the
    /// given validator.
    #[must_use]
    pub const fn new(validator: XmlSignatureValidator) -> Self {
        Self {
            validator: Some(validator),
        }
    }

    /// Creates a processor that skips signature verification.
    ///
    /// Only appropriate when authenticity is established by an outer
    /// channel.
    #[must_use]
    pub const fn without_signature_verification() -> Self {
        Self { validator: None }
    }

    /// Processes a response document at the current time.
    pub fn process(&self, document: &str) -> SamlResult<AuthenticatedSubject> {
        self.process_at(document, Utc::now())
    }

    /// Processes a response document against an explicit point in time.
    ///
    /// Steps, in order: parse; reject non-success status; require at
    /// least one assertion; verify the signature over the raw document;
    /// check the first assertion's validity window; extract the subject.
    pub fn process_at(
        &self,
        document: &str,
        now: DateTime<Utc>,
    ) -> SamlResult<AuthenticatedSubject> {
        let response = xml::parse_response(document)?;

        if !response.is_success() {
            let detail = response
                .status
                .status_message
                .as_deref()
                .unwrap_or(&response.status.status_code.value)
                .to_string();
            return Err(SamlError::AuthnFailed(detail));
        }

        let assertion = response.first_assertion().ok_or(SamlError::NoAssertion)?;

        if let Some(ref validator) = self.validator {
            validator.validate(document)?;
        }

        let conditions = assertion
            .conditions
            .as_ref()
            .ok_or_else(|| SamlError::MissingElement("Conditions".to_string()))?;
        check_time_window(conditions, now)?;

        let name_id = assertion
            .subject
            .as_ref()
            .and_then(|s| s.name_id.as_ref())
            .ok_or_else(|| SamlError::MissingElement("Subject NameID".to_string()))?;

        Ok(AuthenticatedSubject {
            name_id: name_id.value.clone(),
            name_id_format: name_id.format.clone(),
            issuer: assertion.issuer.clone(),
            session_index: assertion
                .authn_statement
                .as_ref()
                .and_then(|s| s.session_index.clone()),
        })
    }
}
