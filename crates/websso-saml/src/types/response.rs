//! SAML Response types.
//!
//! Protocol response returned by an identity provider to a service
//! provider's assertion consumer service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Assertion, Status, SAML_VERSION};

/// SAML Response.
///
/// The protocol message an identity provider returns to a service
/// provider. A success response carries at least one assertion; a failure
/// response carries a non-success status and no assertions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Unique identifier for this response.
    pub id: String,

    /// Version of the SAML protocol (always "2.0").
    #[serde(default = "default_version")]
    pub version: String,

    /// Timestamp when this response was issued.
    pub issue_instant: DateTime<Utc>,

    /// The entity ID of the identity provider issuing the response.
    pub issuer: String,

    /// The request ID this response answers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_response_to: Option<String>,

    /// The URL this response is sent to.
    ///
    /// Empty when no consumer endpoint could be resolved; an empty
    /// destination is never written to the wire.
    #[serde(default)]
    pub destination: String,

    /// The status of the response.
    pub status: Status,

    /// Assertions carried by this response.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assertions: Vec<Assertion>,

    /// Whether the assertions in this response have been signed.
    #[serde(skip)]
    pub signed: bool,
}

fn default_version() -> String {
    SAML_VERSION.to_string()
}

impl Response {
    /// Creates a new success response with a fresh unique id.
    #[must_use]
    pub fn success(issuer: impl Into<String>) -> Self {
        Self::with_status(issuer, Status::success())
    }

    /// Creates a new response with the given status.
    #[must_use]
    pub fn with_status(issuer: impl Into<String>, status: Status) -> Self {
        Self {
            id: format!("_id{}", uuid::Uuid::new_v4()),
            version: SAML_VERSION.to_string(),
            issue_instant: Utc::now(),
            issuer: issuer.into(),
            in_response_to: None,
            destination: String::new(),
            status,
            assertions: Vec::new(),
            signed: false,
        }
    }

    /// Creates a new response with a custom ID and the given status.
    #[must_use]
    pub fn with_id(id: impl Into<String>, issuer: impl Into<String>, status: Status) -> Self {
        Self {
            id: id.into(),
            ..Self::with_status(issuer, status)
        }
    }

    /// Sets the request ID this response answers.
    #[must_use]
    pub fn in_response_to(mut self, request_id: impl Into<String>) -> Self {
        self.in_response_to = Some(request_id.into());
        self
    }

    /// Sets the destination URL.
    #[must_use]
    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = destination.into();
        self
    }

    /// Adds an assertion.
    #[must_use]
    pub fn with_assertion(mut self, assertion: Assertion) -> Self {
        self.assertions.push(assertion);
        self
    }

    /// Returns true if this response carries a success status.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Returns the first assertion, if any.
    ///
    /// Consumers act on the first assertion only; additional assertions
    /// are ignored.
    #[must_use]
    pub fn first_assertion(&self) -> Option<&Assertion> {
        self.assertions.first()
    }

    /// Validates the basic structure of this response.
    pub fn validate(&self) -> Result<(), String> {
        if self.id.is_empty() {
            return Err("ID is required".to_string());
        }
        if self.version != SAML_VERSION {
            return Err(format!("Unsupported SAML version: {}", self.version));
        }
        if self.issuer.is_empty() {
            return Err("Issuer is required".to_string());
        }
        Ok(())
    }
}
