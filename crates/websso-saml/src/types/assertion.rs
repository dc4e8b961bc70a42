//! SAML Assertion types.
//!
//! Assertions contain statements about a subject made by an issuer.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{AuthnContextClass, NameId, SAML_VERSION};

/// Clock-drift tolerance applied to the start of a validity window.
///
/// `NotBefore` is backdated by this amount so that a partner whose clock
/// runs slightly behind does not reject a freshly issued assertion.
pub const NOT_BEFORE_SKEW_SECONDS: i64 = 10;

/// SAML Assertion.
///
/// A package of information that supplies one or more statements made
/// by a SAML authority (the issuer).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assertion {
    /// Unique identifier for this assertion.
    pub id: String,

    /// Version of the SAML protocol (always "2.0").
    #[serde(default = "default_version")]
    pub version: String,

    /// Timestamp when this assertion was issued.
    pub issue_instant: DateTime<Utc>,

    /// The entity ID of the identity provider that issued this assertion.
    pub issuer: String,

    /// The subject of this assertion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<Subject>,

    /// Conditions that must be evaluated for the assertion to be valid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Conditions>,

    /// Authentication statement describing how the subject authenticated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authn_statement: Option<AuthnStatement>,

    /// Whether this assertion has been signed.
    #[serde(skip)]
    pub signed: bool,
}

fn default_version() -> String {
    SAML_VERSION.to_string()
}

impl Assertion {
    /// Creates a new assertion.
    #[must_use]
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            id: format!("_id{}", uuid::Uuid::new_v4()),
            version: SAML_VERSION.to_string(),
            issue_instant: Utc::now(),
            issuer: issuer.into(),
            subject: None,
            conditions: None,
            authn_statement: None,
            signed: false,
        }
    }

    /// Creates a new assertion with a custom ID.
    #[must_use]
    pub fn with_id(id: impl Into<String>, issuer: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::new(issuer)
        }
    }

    /// Sets the subject.
    #[must_use]
    pub fn with_subject(mut self, subject: Subject) -> Self {
        self.subject = Some(subject);
        self
    }

    /// Sets the conditions.
    #[must_use]
    pub fn with_conditions(mut self, conditions: Conditions) -> Self {
        self.conditions = Some(conditions);
        self
    }

    /// Sets the authentication statement.
    #[must_use]
    pub fn with_authn_statement(mut self, statement: AuthnStatement) -> Self {
        self.authn_statement = Some(statement);
        self
    }

    /// Returns the subject's name ID value, if any.
    #[must_use]
    pub fn name_id_value(&self) -> Option<&str> {
        self.subject
            .as_ref()
            .and_then(|s| s.name_id.as_ref())
            .map(|n| n.value.as_str())
    }
}

/// Subject of an assertion.
///
/// Identifies the principal that is the subject of all statements in the
/// assertion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
    /// The name identifier for the subject.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_id: Option<NameId>,

    /// Subject confirmation data.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subject_confirmations: Vec<SubjectConfirmation>,
}

impl Subject {
    /// Creates a new subject with a name ID.
    #[must_use]
    pub fn new(name_id: NameId) -> Self {
        Self {
            name_id: Some(name_id),
            subject_confirmations: Vec::new(),
        }
    }

    /// Adds a subject confirmation.
    #[must_use]
    pub fn with_confirmation(mut self, confirmation: SubjectConfirmation) -> Self {
        self.subject_confirmations.push(confirmation);
        self
    }
}

/// Subject confirmation.
///
/// Information that allows the assertion consumer to confirm the subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectConfirmation {
    /// The confirmation method.
    pub method: String,

    /// Additional confirmation data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_confirmation_data: Option<SubjectConfirmationData>,
}

impl SubjectConfirmation {
    /// Bearer confirmation method URI.
    pub const BEARER: &'static str = "urn:oasis:names:tc:SAML:2.0:cm:bearer";

    /// Creates a bearer confirmation.
    #[must_use]
    pub fn bearer() -> Self {
        Self {
            method: Self::BEARER.to_string(),
            subject_confirmation_data: None,
        }
    }

    /// Sets the confirmation data.
    #[must_use]
    pub fn with_data(mut self, data: SubjectConfirmationData) -> Self {
        self.subject_confirmation_data = Some(data);
        self
    }
}

/// Subject confirmation data.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubjectConfirmationData {
    /// The request ID that this assertion responds to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_response_to: Option<String>,

    /// Time after which the subject can no longer be confirmed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_on_or_after: Option<DateTime<Utc>>,

    /// The location to which the assertion can be presented.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
}

impl SubjectConfirmationData {
    /// Creates confirmation data tying an assertion to the request it
    /// answers.
    ///
    /// The confirmation deadline is the same instant the assertion's
    /// conditions expire.
    #[must_use]
    pub fn for_request(
        request_id: impl Into<String>,
        recipient: impl Into<String>,
        not_on_or_after: DateTime<Utc>,
    ) -> Self {
        Self {
            in_response_to: Some(request_id.into()),
            not_on_or_after: Some(not_on_or_after),
            recipient: Some(recipient.into()),
        }
    }
}

/// Conditions for assertion validity.
///
/// The validity window every issued assertion carries; consumers check it
/// as a distinct validation step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Conditions {
    /// Time before which the assertion is not valid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_before: Option<DateTime<Utc>>,

    /// Time at or after which the assertion is not valid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_on_or_after: Option<DateTime<Utc>>,
}

impl Conditions {
    /// Creates a validity window anchored at `issue_instant`.
    ///
    /// `NotBefore` is backdated by [`NOT_BEFORE_SKEW_SECONDS`];
    /// `NotOnOrAfter` is `issue_instant + validity_minutes`, with a floor
    /// of one minute.
    #[must_use]
    pub fn for_window(issue_instant: DateTime<Utc>, validity_minutes: i64) -> Self {
        let minutes = validity_minutes.max(1);
        Self {
            not_before: Some(issue_instant - Duration::seconds(NOT_BEFORE_SKEW_SECONDS)),
            not_on_or_after: Some(issue_instant + Duration::minutes(minutes)),
        }
    }
}

/// Authentication statement.
///
/// Describes the act of authentication performed by the subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthnStatement {
    /// The time of authentication.
    pub authn_instant: DateTime<Utc>,

    /// The session index (for session management).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_index: Option<String>,

    /// The authentication context.
    pub authn_context: AuthnContext,
}

impl AuthnStatement {
    /// Creates a new authentication statement.
    #[must_use]
    pub fn new(context_class: AuthnContextClass) -> Self {
        Self {
            authn_instant: Utc::now(),
            session_index: Some(format!("_session{}", uuid::Uuid::new_v4())),
            authn_context: AuthnContext::class_ref(context_class),
        }
    }
}

/// Authentication context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthnContext {
    /// Authentication context class reference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authn_context_class_ref: Option<String>,
}

impl AuthnContext {
    /// Creates an authentication context with a class reference.
    #[must_use]
    pub fn class_ref(class: AuthnContextClass) -> Self {
        Self {
            authn_context_class_ref: Some(class.uri().to_string()),
        }
    }
}
