//! SAML AuthnRequest types.
//!
//! Authentication request message sent by a service provider to an
//! identity provider.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{SamlBinding, SAML_VERSION};

/// SAML Authentication Request.
///
/// An authentication request message sent from a service provider to an
/// identity provider requesting authentication of a principal. The `id` is
/// globally unique per issuance and is the correlation key for the
/// eventual response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthnRequest {
    /// Unique identifier for this request.
    pub id: String,

    /// Version of the SAML protocol (always "2.0").
    #[serde(default = "default_version")]
    pub version: String,

    /// Timestamp when this request was issued.
    pub issue_instant: DateTime<Utc>,

    /// The entity ID of the service provider issuing the request.
    pub issuer: String,

    /// The URL where the response should be sent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assertion_consumer_service_url: Option<String>,

    /// Index into the IdP's assertion consumer service table, as an
    /// alternative to an explicit URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assertion_consumer_service_index: Option<u32>,

    /// The URL this request is sent to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,

    /// Binding to use for the response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol_binding: Option<String>,

    /// Whether the IdP must authenticate the user directly.
    ///
    /// Serialized only when true.
    #[serde(default)]
    pub force_authn: bool,

    /// A human-readable name for the requesting provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_name: Option<String>,
}

fn default_version() -> String {
    SAML_VERSION.to_string()
}

impl AuthnRequest {
    /// Creates a new authentication request with a fresh unique id.
    #[must_use]
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            id: format!("_id{}", uuid::Uuid::new_v4()),
            version: SAML_VERSION.to_string(),
            issue_instant: Utc::now(),
            issuer: issuer.into(),
            assertion_consumer_service_url: None,
            assertion_consumer_service_index: None,
            destination: None,
            protocol_binding: None,
            force_authn: false,
            provider_name: None,
        }
    }

    /// Creates a new authentication request with a custom ID.
    #[must_use]
    pub fn with_id(id: impl Into<String>, issuer: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::new(issuer)
        }
    }

    /// Sets the assertion consumer service URL.
    #[must_use]
    pub fn with_acs_url(mut self, url: impl Into<String>) -> Self {
        self.assertion_consumer_service_url = Some(url.into());
        self
    }

    /// Sets the assertion consumer service index.
    #[must_use]
    pub const fn with_acs_index(mut self, index: u32) -> Self {
        self.assertion_consumer_service_index = Some(index);
        self
    }

    /// Sets the destination URL.
    #[must_use]
    pub fn with_destination(mut self, url: impl Into<String>) -> Self {
        self.destination = Some(url.into());
        self
    }

    /// Sets the protocol binding for the response.
    #[must_use]
    pub fn with_binding(mut self, binding: SamlBinding) -> Self {
        self.protocol_binding = Some(binding.uri().to_string());
        self
    }

    /// Sets force authentication.
    #[must_use]
    pub const fn force_authn(mut self, force: bool) -> Self {
        self.force_authn = force;
        self
    }

    /// Sets the provider name.
    #[must_use]
    pub fn with_provider_name(mut self, name: impl Into<String>) -> Self {
        self.provider_name = Some(name.into());
        self
    }

    /// Returns the parsed protocol binding.
    #[must_use]
    pub fn parsed_binding(&self) -> Option<SamlBinding> {
        self.protocol_binding
            .as_deref()
            .and_then(SamlBinding::from_uri)
    }

    /// Validates the basic structure of this request.
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn authn_request_creation() {
        let request = AuthnRequest::new("https://sp.example.com")
            .with_acs_url("https://sp.example.com/acs")
            .with_destination("https://idp.example.com/sso")
            .with_binding(SamlBinding::HttpPost)
            .force_authn(true);

        assert!(!request.id.is_empty());
        assert_eq!(request.version, "2.0");
        assert_eq!(request.issuer, "https://sp.example.com");
        assert_eq!(
            request.assertion_consumer_service_url.as_deref(),
            Some("https://sp.example.com/acs")
        );
        assert!(request.force_authn);
        assert_eq!(request.parsed_binding(), Some(SamlBinding::HttpPost));
    }

    #[test]
    fn request_ids_are_unique() {
        let ids: HashSet<String> = (0..10_000)
            .map(|_| AuthnRequest::new("https://sp.example.com").id)
            .collect();
        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn authn_request_validation() {
        let request = AuthnRequest::new("https://sp.example.com");
        assert!(request.validate().is_ok());

        let mut invalid = request.clone();
        invalid.id = String::new();
        assert!(invalid.validate().is_err());

        let mut invalid = request.clone();
        invalid.issuer = String::new();
        assert!(invalid.validate().is_err());

        let mut invalid = request;
        invalid.version = "1.1".to_string();
        assert!(invalid.validate().is_err());
    }
}
