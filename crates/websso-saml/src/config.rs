//! Engine configuration.
//!
//! One configuration struct per side of the flow. All behavior is
//! constructor-injected through these structs; there is no process-global
//! state.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::{AuthnContextClass, NameIdFormat, SamlBinding};

/// Service provider configuration.
///
/// Drives AuthnRequest construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpConfig {
    /// Entity ID this SP issues requests under.
    pub issuer: String,

    /// Human-readable provider name carried on requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_name: Option<String>,

    /// The IdP SSO endpoint requests are sent to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,

    /// Where the IdP should deliver the response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assertion_consumer_service_url: Option<String>,

    /// Index into the IdP's consumer endpoint table, as an alternative to
    /// an explicit URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assertion_consumer_service_index: Option<u32>,

    /// Binding requested for the response.
    #[serde(default)]
    pub protocol_binding: SamlBinding,

    /// Whether the IdP must re-authenticate the user.
    #[serde(default)]
    pub force_authn: bool,
}

impl SpConfig {
    /// Creates a configuration with the given issuer and defaults
    /// elsewhere.
    #[must_use]
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            provider_name: None,
            destination: None,
            assertion_consumer_service_url: None,
            assertion_consumer_service_index: None,
            protocol_binding: SamlBinding::default(),
            force_authn: false,
        }
    }

    /// Sets the IdP SSO endpoint.
    #[must_use]
    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = Some(destination.into());
        self
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

    /// Sets the provider name.
    #[must_use]
    pub fn with_provider_name(mut self, name: impl Into<String>) -> Self {
        self.provider_name = Some(name.into());
        self
    }

    /// Sets the response binding.
    #[must_use]
    pub const fn with_binding(mut self, binding: SamlBinding) -> Self {
        self.protocol_binding = binding;
        self
    }

    /// Requests forced re-authentication.
    #[must_use]
    pub const fn force_authn(mut self, force: bool) -> Self {
        self.force_authn = force;
        self
    }
}

/// Default assertion validity in minutes.
pub const DEFAULT_VALIDITY_MINUTES: i64 = 5;

/// Identity provider configuration.
///
/// Drives response and assertion construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdpConfig {
    /// Entity ID this IdP issues responses under.
    pub issuer: String,

    /// Assertion validity window in minutes. Values below one are raised
    /// to one at issuance.
    #[serde(default = "default_validity_minutes")]
    pub validity_minutes: i64,

    /// NameID format stamped on issued subjects.
    #[serde(default)]
    pub name_id_format: NameIdFormat,

    /// Authentication context class reported in assertions.
    #[serde(default = "default_authn_context")]
    pub authn_context_class: AuthnContextClass,

    /// Table of assertion consumer endpoints addressable by index.
    #[serde(default)]
    pub acs_index_table: HashMap<u32, String>,

    /// Prefix response IDs with `#` for simpleSAMLphp interoperability.
    #[serde(default)]
    pub simple_samlphp_compat: bool,

    /// Whether issued assertions are signed.
    #[serde(default = "default_true")]
    pub sign_assertions: bool,
}

fn default_validity_minutes() -> i64 {
    DEFAULT_VALIDITY_MINUTES
}

fn default_authn_context() -> AuthnContextClass {
    AuthnContextClass::Password
}

fn default_true() -> bool {
    true
}

impl IdpConfig {
    /// Creates a configuration with the given issuer and defaults
    /// elsewhere.
    #[must_use]
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            validity_minutes: DEFAULT_VALIDITY_MINUTES,
            name_id_format: NameIdFormat::default(),
            authn_context_class: AuthnContextClass::Password,
            acs_index_table: HashMap::new(),
            simple_samlphp_compat: false,
            sign_assertions: true,
        }
    }

    /// Sets the assertion validity window.
    #[must_use]
    pub const fn with_validity_minutes(mut self, minutes: i64) -> Self {
        self.validity_minutes = minutes;
        self
    }

    /// Sets the issued NameID format.
    #[must_use]
    pub const fn with_name_id_format(mut self, format: NameIdFormat) -> Self {
        self.name_id_format = format;
        self
    }

    /// Sets the reported authentication context class.
    #[must_use]
    pub const fn with_authn_context(mut self, class: AuthnContextClass) -> Self {
        self.authn_context_class = class;
        self
    }

    /// Registers a consumer endpoint under an index.
    #[must_use]
    pub fn with_acs_endpoint(mut self, index: u32, url: impl Into<String>) -> Self {
        self.acs_index_table.insert(index, url.into());
        self
    }

    /// Enables simpleSAMLphp-compatible response IDs.
    #[must_use]
    pub const fn simple_samlphp_compat(mut self, enabled: bool) -> Self {
        self.simple_samlphp_compat = enabled;
        self
    }

    /// Controls assertion signing.
    #[must_use]
    pub const fn sign_assertions(mut self, sign: bool) -> Self {
        self.sign_assertions = sign;
        self
    }
}
