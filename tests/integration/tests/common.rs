//! Shared helpers for the end-to-end tests.

use rcgen::{CertificateParams, KeyPair, PKCS_RSA_SHA256};
use websso_saml::config::{IdpConfig, SpConfig};
use websso_saml::keys::{CertificateMaterial, PrivateKeyMaterial};
use websso_saml::signature::{XmlSignatureValidator, XmlSigner};

pub const SP_ISSUER: &str = "sp1";
pub const IDP_ISSUER: &str = "https://idp.example.com";
pub const IDP_SSO_URL: &str = "https://idp.example.com/sso";
pub const SP_ACS_URL: &str = "https://sp.example.com/acs";

/// Freshly minted RSA signing credentials.
pub struct TestCredentials {
    pub key: PrivateKeyMaterial,
    pub certificate: CertificateMaterial,
}

impl TestCredentials {
    pub fn generate() -> anyhow::Result<Self> {
        let key_pair = KeyPair::generate_for(&PKCS_RSA_SHA256)?;
        let cert = CertificateParams::default().self_signed(&key_pair)?;
        Ok(Self {
            key: PrivateKeyMaterial::from_pem(key_pair.serialize_pem()),
            certificate: CertificateMaterial::from_pem(cert.pem()),
        })
    }

    pub fn signer(&self) -> anyhow::Result<XmlSigner> {
        Ok(XmlSigner::from_key_material(&self.key, Some(&self.certificate))?)
    }

    pub fn validator(&self) -> anyhow::Result<XmlSignatureValidator> {
        let der = self.certificate.certificate_der()?.to_vec();
        Ok(XmlSignatureValidator::new(vec![der]))
    }
}

pub fn sp_config() -> SpConfig {
    SpConfig::new(SP_ISSUER)
        .with_destination(IDP_SSO_URL)
        .with_acs_url(SP_ACS_URL)
}

pub fn idp_config() -> IdpConfig {
    IdpConfig::new(IDP_ISSUER)
}
