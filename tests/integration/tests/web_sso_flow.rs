//! Full Web Browser SSO exchanges across both bindings.

use std::collections::HashMap;

use websso_saml::bindings::{HttpPostBinding, HttpRedirectBinding, SamlMessageType};
use websso_saml::builder;
use websso_saml::flow::{decode_incoming, verify_in_response_to, ResponseProcessor};
use websso_saml::signature::SignatureConfig;
use websso_saml::{SamlError, xml};

use crate::common::{self, TestCredentials};

fn post_params(param: &str, value: &str, relay_state: Option<&str>) -> HashMap<String, String> {
    let mut params = HashMap::from([(param.to_string(), value.to_string())]);
    if let Some(rs) = relay_state {
        params.insert(
            "RelayState".to_string(),
            HttpPostBinding::encode_relay_state(rs),
        );
    }
    params
}

#[test]
fn post_binding_login_round_trip() -> anyhow::Result<()> {
    let idp_credentials = TestCredentials::generate()?;

    // Service provider: build the request and put it on the wire.
    let request = builder::build_authn_request(&common::sp_config())?;
    let encoded = HttpPostBinding::encode_message(&xml::serialize_authn_request(&request)?);
    let params = post_params("SAMLRequest", &encoded, Some("/deep/link?page=2"));

    // Identity provider: decode, parse, authenticate, answer.
    let incoming = decode_incoming("POST", &params)?;
    assert_eq!(incoming.message_type, SamlMessageType::Request);
    assert_eq!(incoming.relay_state.as_deref(), Some("/deep/link?page=2"));

    let parsed_request = xml::parse_authn_request(&incoming.xml)?;
    assert_eq!(parsed_request.issuer, common::SP_ISSUER);
    assert_eq!(parsed_request.id, request.id);

    let response = builder::build_success_response(&common::idp_config(), &parsed_request, "alice")?;
    let assertion_id = response.first_assertion().unwrap().id.clone();
    let document = xml::serialize_response(&response)?;
    let signed = idp_credentials.signer()?.sign(&document, &assertion_id)?;

    let encoded_response = HttpPostBinding::encode_message(&signed);
    let response_params = post_params(
        "SAMLResponse",
        &encoded_response,
        incoming.relay_state.as_deref(),
    );

    // Service provider: decode, verify, extract the subject.
    let returned = decode_incoming("POST", &response_params)?;
    assert_eq!(returned.message_type, SamlMessageType::Response);
    assert_eq!(returned.relay_state.as_deref(), Some("/deep/link?page=2"));

    let subject = ResponseProcessor::new(idp_credentials.validator()?).process(&returned.xml)?;
    assert_eq!(subject.name_id, "alice");
    assert_eq!(subject.issuer, common::IDP_ISSUER);

    let parsed_response = xml::parse_response(&returned.xml)?;
    verify_in_response_to(&parsed_response, &request.id)?;
    assert_eq!(parsed_response.destination, common::SP_ACS_URL);

    Ok(())
}

#[test]
fn redirect_binding_login_round_trip() -> anyhow::Result<()> {
    let idp_credentials = TestCredentials::generate()?;

    let request = builder::build_authn_request(&common::sp_config())?;
    let request_xml = xml::serialize_authn_request(&request)?;
    let url = HttpRedirectBinding::encode_request(
        &request_xml,
        common::IDP_SSO_URL,
        Some("opaque-state"),
    )?;

    let incoming = HttpRedirectBinding::decode_url(&url)?;
    assert_eq!(incoming.message_type, SamlMessageType::Request);
    assert_eq!(incoming.relay_state.as_deref(), Some("opaque-state"));
    assert_eq!(incoming.xml, request_xml);

    let parsed_request = xml::parse_authn_request(&incoming.xml)?;
    let response =
        builder::build_success_response(&common::idp_config(), &parsed_request, "bob")?;
    let assertion_id = response.first_assertion().unwrap().id.clone();
    let signed = idp_credentials
        .signer()?
        .sign(&xml::serialize_response(&response)?, &assertion_id)?;

    let response_url =
        HttpRedirectBinding::encode_response(&signed, common::SP_ACS_URL, Some("opaque-state"))?;
    let returned = HttpRedirectBinding::decode_url(&response_url)?;

    let subject = ResponseProcessor::new(idp_credentials.validator()?).process(&returned.xml)?;
    assert_eq!(subject.name_id, "bob");

    Ok(())
}

#[test]
fn redirect_binding_detached_signature_round_trip() -> anyhow::Result<()> {
    let sp_credentials = TestCredentials::generate()?;

    let request = builder::build_authn_request(&common::sp_config())?;
    let request_xml = xml::serialize_authn_request(&request)?;

    let encoded = HttpRedirectBinding::encode_message(&request_xml)?;
    let signer = sp_credentials.signer()?;
    let signature = signer.sign_redirect_binding(&encoded, Some("state"), true)?;
    let sig_alg = SignatureConfig::default().algorithm.uri();

    let url = HttpRedirectBinding::encode_signed_request(
        &request_xml,
        common::IDP_SSO_URL,
        Some("state"),
        sig_alg,
        &signature,
    )?;

    // Identity provider: recover the covered query and check the signature.
    let signed_query = HttpRedirectBinding::extract_signed_query(&url)?;
    sp_credentials
        .validator()?
        .validate_redirect_binding(&signed_query, &signature, sig_alg)?;

    // A tampered RelayState breaks the signature.
    let tampered = signed_query.replace("RelayState=state", "RelayState=evil");
    assert!(sp_credentials
        .validator()?
        .validate_redirect_binding(&tampered, &signature, sig_alg)
        .is_err());

    Ok(())
}

#[test]
fn tampered_response_is_rejected() -> anyhow::Result<()> {
    let idp_credentials = TestCredentials::generate()?;

    let request = builder::build_authn_request(&common::sp_config())?;
    let response = builder::build_success_response(&common::idp_config(), &request, "alice")?;
    let assertion_id = response.first_assertion().unwrap().id.clone();
    let signed = idp_credentials
        .signer()?
        .sign(&xml::serialize_response(&response)?, &assertion_id)?;

    let tampered = signed.replace("alice", "mallory");
    let err = ResponseProcessor::new(idp_credentials.validator()?)
        .process(&tampered)
        .unwrap_err();
    assert!(matches!(err, SamlError::SignatureInvalid(_)));

    Ok(())
}

#[test]
fn response_signed_by_unknown_idp_is_rejected() -> anyhow::Result<()> {
    let real_idp = TestCredentials::generate()?;
    let impostor = TestCredentials::generate()?;

    let request = builder::build_authn_request(&common::sp_config())?;
    let response = builder::build_success_response(&common::idp_config(), &request, "alice")?;
    let assertion_id = response.first_assertion().unwrap().id.clone();
    let signed = impostor
        .signer()?
        .sign(&xml::serialize_response(&response)?, &assertion_id)?;

    // The service provider trusts only the real identity provider.
    let err = ResponseProcessor::new(real_idp.validator()?)
        .process(&signed)
        .unwrap_err();
    assert!(matches!(err, SamlError::SignatureInvalid(_)));

    Ok(())
}

#[test]
fn response_to_a_different_request_is_rejected() -> anyhow::Result<()> {
    let first = builder::build_authn_request(&common::sp_config())?;
    let second = builder::build_authn_request(&common::sp_config())?;
    assert_ne!(first.id, second.id);

    let response = builder::build_success_response(&common::idp_config(), &first, "alice")?;
    let document = xml::serialize_response(&response)?;
    let parsed = xml::parse_response(&document)?;

    verify_in_response_to(&parsed, &first.id)?;
    let err = verify_in_response_to(&parsed, &second.id).unwrap_err();
    assert!(matches!(err, SamlError::InResponseToMismatch { .. }));

    Ok(())
}

#[test]
fn consumer_index_resolves_through_idp_table() -> anyhow::Result<()> {
    let idp = common::idp_config().with_acs_endpoint(3, "https://sp.example/acs");

    let sp = websso_saml::config::SpConfig::new(common::SP_ISSUER)
        .with_destination(common::IDP_SSO_URL)
        .with_acs_index(3);
    let request = builder::build_authn_request(&sp)?;

    let response = builder::build_success_response(&idp, &request, "alice")?;
    assert_eq!(response.destination, "https://sp.example/acs");

    // An index the identity provider does not know leaves the destination
    // unset, and the serialized response carries no Destination attribute.
    let unknown = websso_saml::config::SpConfig::new(common::SP_ISSUER)
        .with_destination(common::IDP_SSO_URL)
        .with_acs_index(9);
    let request = builder::build_authn_request(&unknown)?;
    let response = builder::build_success_response(&idp, &request, "alice")?;
    assert_eq!(response.destination, "");
    assert!(!xml::serialize_response(&response)?.contains("Destination="));

    Ok(())
}

#[test]
fn request_ids_never_collide() -> anyhow::Result<()> {
    let mut seen = std::collections::HashSet::new();
    for _ in 0..1000 {
        let request = builder::build_authn_request(&common::sp_config())?;
        assert!(seen.insert(request.id));
    }
    Ok(())
}
