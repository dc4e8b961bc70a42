//! SAML message construction.
//!
//! Builds protocol messages from the per-side configuration structs.
//! Success and failure responses are distinct paths: a failure response
//! carries status information only and never an assertion.

use crate::config::{IdpConfig, SpConfig};
use crate::error::{SamlError, SamlResult};
use crate::types::{
    Assertion, AuthnRequest, AuthnStatement, Conditions, NameId, NameIdFormat, Response, Status,
    Subject, SubjectConfirmation, SubjectConfirmationData,
};

/// Builds an AuthnRequest from service provider configuration.
///
/// Every call produces a fresh unique request ID and a current UTC issue
/// instant.
pub fn build_authn_request(config: &SpConfig) -> SamlResult<AuthnRequest> {
    if config.issuer.is_empty() {
        return Err(SamlError::Configuration(
            "SP issuer is required".to_string(),
        ));
    }
    let destination = config.destination.as_deref().ok_or_else(|| {
        SamlError::Configuration("SP destination (IdP SSO endpoint) is required".to_string())
    })?;

    let mut request = AuthnRequest::new(&config.issuer)
        .with_destination(destination)
        .with_binding(config.protocol_binding)
        .force_authn(config.force_authn);

    if let Some(ref acs_url) = config.assertion_consumer_service_url {
        request = request.with_acs_url(acs_url);
    }
    if let Some(index) = config.assertion_consumer_service_index {
        request = request.with_acs_index(index);
    }
    if let Some(ref name) = config.provider_name {
        request = request.with_provider_name(name);
    }

    Ok(request)
}

/// Resolves where a response to `request` should be delivered.
///
/// The request's explicit consumer URL wins; otherwise its consumer index
/// is looked up in the IdP's endpoint table; with neither, the
/// destination is left empty and never serialized.
#[must_use]
pub fn resolve_destination(config: &IdpConfig, request: &AuthnRequest) -> String {
    if let Some(ref url) = request.assertion_consumer_service_url {
        return url.clone();
    }
    if let Some(index) = request.assertion_consumer_service_index {
        if let Some(url) = config.acs_index_table.get(&index) {
            return url.clone();
        }
    }
    String::new()
}

fn response_id(config: &IdpConfig) -> String {
    let id = format!("_id{}", uuid::Uuid::new_v4());
    if config.simple_samlphp_compat {
        format!("#{id}")
    } else {
        id
    }
}

/// Builds a success response for an authenticated principal.
///
/// The assertion's validity window is anchored at its issue instant; the
/// bearer confirmation deadline coincides with the window's end and ties
/// the assertion back to the request ID.
pub fn build_success_response(
    config: &IdpConfig,
    request: &AuthnRequest,
    login_id: &str,
) -> SamlResult<Response> {
    if config.issuer.is_empty() {
        return Err(SamlError::Configuration(
            "IdP issuer is required".to_string(),
        ));
    }

    let destination = resolve_destination(config, request);

    let name_id = if config.name_id_format == NameIdFormat::Unspecified {
        NameId::new(login_id)
    } else {
        NameId::new(login_id).with_format(config.name_id_format)
    };

    let assertion = Assertion::new(&config.issuer);
    let conditions = Conditions::for_window(assertion.issue_instant, config.validity_minutes);
    let window_end = conditions.not_on_or_after.unwrap_or(assertion.issue_instant);

    let mut confirmation_data =
        SubjectConfirmationData::for_request(&request.id, &destination, window_end);
    if destination.is_empty() {
        confirmation_data.recipient = None;
    }

    let assertion = assertion
        .with_subject(
            Subject::new(name_id)
                .with_confirmation(SubjectConfirmation::bearer().with_data(confirmation_data)),
        )
        .with_conditions(conditions)
        .with_authn_statement(AuthnStatement::new(config.authn_context_class));

    let response = Response::with_id(response_id(config), &config.issuer, Status::success())
        .in_response_to(&request.id)
        .with_destination(destination)
        .with_assertion(assertion);

    Ok(response)
}

/// Builds a failure response carrying only status information.
pub fn build_failure_response(
    config: &IdpConfig,
    request: &AuthnRequest,
    status: Status,
) -> SamlResult<Response> {
    if config.issuer.is_empty() {
        return Err(SamlError::Configuration(
            "IdP issuer is required".to_string(),
        ));
    }
    if status.is_success() {
        return Err(SamlError::Configuration(
            "Failure response requires a non-success status".to_string(),
        ));
    }

    Ok(
        Response::with_id(response_id(config), &config.issuer, status)
            .in_response_to(&request.id)
            .with_destination(resolve_destination(config, request)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AuthnContextClass, SamlBinding, NOT_BEFORE_SKEW_SECONDS};
    use chrono::Duration;

    fn sp_config() -> SpConfig {
        SpConfig::new("https://sp.example.com")
            .with_destination("https://idp.example.com/sso")
            .with_acs_url("https://sp.example.com/acs")
    }

    fn idp_config() -> IdpConfig {
        IdpConfig::new("https://idp.example.com")
    }

    #[test]
    fn authn_request_from_config() {
        let request = build_authn_request(&sp_config()).unwrap();
        assert_eq!(request.issuer, "https://sp.example.com");
        assert_eq!(request.destination.as_deref(), Some("https://idp.example.com/sso"));
        assert_eq!(request.parsed_binding(), Some(SamlBinding::HttpPost));
        assert!(!request.force_authn);
    }

    #[test]
    fn authn_request_requires_destination() {
        let config = SpConfig::new("https://sp.example.com");
        let err = build_authn_request(&config).unwrap_err();
        assert!(matches!(err, SamlError::Configuration(_)));
    }

    #[test]
    fn destination_prefers_explicit_acs_url() {
        let config = idp_config().with_acs_endpoint(3, "https://table.example/acs");
        let request = build_authn_request(&sp_config()).unwrap();
        assert_eq!(
            resolve_destination(&config, &request),
            "https://sp.example.com/acs"
        );
    }

    #[test]
    fn destination_falls_back_to_index_table() {
        let config = idp_config().with_acs_endpoint(3, "https://sp.example/acs");
        let request = AuthnRequest::new("https://sp.example.com").with_acs_index(3);
        assert_eq!(resolve_destination(&config, &request), "https://sp.example/acs");
    }

    #[test]
    fn destination_empty_when_unresolvable() {
        let config = idp_config();
        let request = AuthnRequest::new("https://sp.example.com").with_acs_index(9);
        assert_eq!(resolve_destination(&config, &request), "");
    }

    #[test]
    fn success_response_correlates_and_windows() {
        let request = build_authn_request(&sp_config()).unwrap();
        let config = idp_config().with_validity_minutes(7);

        let response = build_success_response(&config, &request, "alice").unwrap();
        assert!(response.is_success());
        assert_eq!(response.in_response_to.as_deref(), Some(request.id.as_str()));
        assert_eq!(response.destination, "https://sp.example.com/acs");

        let assertion = response.first_assertion().unwrap();
        assert_eq!(assertion.name_id_value(), Some("alice"));

        let conditions = assertion.conditions.as_ref().unwrap();
        let not_before = conditions.not_before.unwrap();
        let not_on_or_after = conditions.not_on_or_after.unwrap();
        assert!(not_before < not_on_or_after);
        assert_eq!(
            assertion.issue_instant - not_before,
            Duration::seconds(NOT_BEFORE_SKEW_SECONDS)
        );
        assert_eq!(not_on_or_after - assertion.issue_instant, Duration::minutes(7));

        let confirmation = &assertion.subject.as_ref().unwrap().subject_confirmations[0];
        let data = confirmation.subject_confirmation_data.as_ref().unwrap();
        assert_eq!(data.in_response_to.as_deref(), Some(request.id.as_str()));
        assert_eq!(data.recipient.as_deref(), Some("https://sp.example.com/acs"));
        assert_eq!(data.not_on_or_after, Some(not_on_or_after));

        let statement = assertion.authn_statement.as_ref().unwrap();
        assert_eq!(
            statement.authn_context.authn_context_class_ref.as_deref(),
            Some(AuthnContextClass::Password.uri())
        );
    }

    #[test]
    fn simple_samlphp_response_ids_are_hash_prefixed() {
        let request = build_authn_request(&sp_config()).unwrap();
        let config = idp_config().simple_samlphp_compat(true);

        let response = build_success_response(&config, &request, "alice").unwrap();
        assert!(response.id.starts_with('#'));

        let plain = build_success_response(&idp_config(), &request, "alice").unwrap();
        assert!(!plain.id.starts_with('#'));
    }

    #[test]
    fn failure_response_has_status_only() {
        let request = build_authn_request(&sp_config()).unwrap();
        let response = build_failure_response(
            &idp_config(),
            &request,
            Status::authn_failed("Invalid credentials"),
        )
        .unwrap();

        assert!(!response.is_success());
        assert!(response.assertions.is_empty());
        assert_eq!(response.in_response_to.as_deref(), Some(request.id.as_str()));
    }

    #[test]
    fn failure_response_rejects_success_status() {
        let request = build_authn_request(&sp_config()).unwrap();
        let err =
            build_failure_response(&idp_config(), &request, Status::success()).unwrap_err();
        assert!(matches!(err, SamlError::Configuration(_)));
    }
}
