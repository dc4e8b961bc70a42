//! Trust establishment from identity provider metadata.

use std::time::Duration;

use websso_saml::builder;
use websso_saml::metadata::{
    idp_metadata_xml, parse_idp_metadata, MetadataConfig, MetadataTrustStore,
};
use websso_saml::xml;

use crate::common::{self, TestCredentials};

fn signed_response(credentials: &TestCredentials) -> anyhow::Result<String> {
    let request = builder::build_authn_request(&common::sp_config())?;
    let response = builder::build_success_response(&common::idp_config(), &request, "alice")?;
    let assertion_id = response.first_assertion().unwrap().id.clone();
    Ok(credentials
        .signer()?
        .sign(&xml::serialize_response(&response)?, &assertion_id)?)
}

#[test]
fn published_metadata_yields_a_working_verifier() -> anyhow::Result<()> {
    let idp_credentials = TestCredentials::generate()?;

    // The identity provider publishes its certificate; the service
    // provider derives its verifier from the published document alone.
    let document = idp_metadata_xml(
        common::IDP_ISSUER,
        common::IDP_SSO_URL,
        idp_credentials.certificate.certificate_der()?,
    );

    let record = parse_idp_metadata(&document)?;
    assert_eq!(record.entity_id, common::IDP_ISSUER);
    assert!(!record.from_backing_file);

    let signed = signed_response(&idp_credentials)?;
    record.verifier().validate(&signed)?;

    // The verifier rejects documents signed by anyone else.
    let other = TestCredentials::generate()?;
    assert!(record.verifier().validate(&signed_response(&other)?).is_err());

    Ok(())
}

#[test]
fn backing_file_keeps_trust_through_an_outage() -> anyhow::Result<()> {
    let idp_credentials = TestCredentials::generate()?;

    let dir = std::env::temp_dir().join(format!("websso-trust-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir)?;
    let backing = dir.join("metadata-backing-file.xml");

    let document = idp_metadata_xml(
        common::IDP_ISSUER,
        common::IDP_SSO_URL,
        idp_credentials.certificate.certificate_der()?,
    );
    std::fs::write(&backing, &document)?;

    // The metadata endpoint is unreachable; the last mirrored document
    // still establishes trust, and that trust verifies real signatures.
    let config = MetadataConfig::new("http://127.0.0.1:1/metadata")
        .with_backing_file(&backing)
        .with_timeout(Duration::from_millis(500));
    let record = MetadataTrustStore::new(config).fetch_trust()?;

    assert!(record.from_backing_file);
    assert_eq!(record.entity_id, common::IDP_ISSUER);

    let signed = signed_response(&idp_credentials)?;
    record.verifier().validate(&signed)?;

    std::fs::remove_dir_all(&dir).ok();
    Ok(())
}
