//! XML Signature creation.
//!
//! Signs a single element of a SAML document by ID, inserting the
//! resulting `<ds:Signature>` after the element's Issuer. The digest is
//! computed over the marshaled element subtree before insertion, so
//! validators that strip the signature recover the signed bytes exactly.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::{SamlError, SamlResult};
use crate::keys::{CertificateMaterial, PrivateKeyMaterial};
use crate::xml;

use super::{SignatureAlgorithm, SignatureConfig};

/// XML document signer.
pub struct XmlSigner {
    private_key_der: Vec<u8>,
    certificate_der: Option<Vec<u8>>,
    config: SignatureConfig,
}

impl XmlSigner {
    /// Creates a new signer with an RSA private key.
    #[must_use]
    pub fn new(private_key_der: Vec<u8>, certificate_der: Option<Vec<u8>>) -> Self {
        Self {
            private_key_der,
            certificate_der,
            config: SignatureConfig::default(),
        }
    }

    /// Creates a signer from lazily decoded key material.
    pub fn from_key_material(
        key: &PrivateKeyMaterial,
        certificate: Option<&CertificateMaterial>,
    ) -> SamlResult<Self> {
        let private_key_der = key.key_der()?.to_vec();
        let certificate_der = certificate
            .map(|c| c.certificate_der().map(<[u8]>::to_vec))
            .transpose()?;
        Ok(Self::new(private_key_der, certificate_der))
    }

    /// Sets the signature configuration.
    #[must_use]
    pub fn with_config(mut self, config: SignatureConfig) -> Self {
        self.config = config;
        self
    }

    /// Signs the element carrying `reference_id` within an XML document.
    ///
    /// Returns the document with the `<ds:Signature>` element inserted
    /// after the signed element's Issuer.
    pub fn sign(&self, document: &str, reference_id: &str) -> SamlResult<String> {
        let (element_start, insert_position) =
            find_element_and_insert_position(document, reference_id)?;

        let element = xml::extract_element_at(document, element_start)?;
        let canonical_element = canonicalize(&element);

        let digest = calculate_digest(&canonical_element, self.config.algorithm)?;
        let digest_b64 = STANDARD.encode(digest);

        let signed_info = build_signed_info(
            reference_id,
            &digest_b64,
            self.config.algorithm,
            self.config.canonicalization,
        );
        let canonical_signed_info = canonicalize(&signed_info);

        let signature_value = self.sign_data(canonical_signed_info.as_bytes())?;
        let signature_b64 = STANDARD.encode(signature_value);

        let signature_element = build_signature_element(
            &signed_info,
            &signature_b64,
            self.certificate_der.as_deref(),
            &self.config,
        );

        Ok(format!(
            "{}{}{}",
            &document[..insert_position],
            signature_element,
            &document[insert_position..]
        ))
    }

    /// Creates a detached signature for the HTTP-Redirect binding.
    ///
    /// The signature covers the encoded query string parameters, not the
    /// XML document itself. Returns the base64-encoded signature value.
    pub fn sign_redirect_binding(
        &self,
        saml_message: &str,
        relay_state: Option<&str>,
        is_request: bool,
    ) -> SamlResult<String> {
        let param_name = if is_request {
            "SAMLRequest"
        } else {
            "SAMLResponse"
        };

        let mut to_sign = format!("{}={}", param_name, urlencoding::encode(saml_message));
        if let Some(rs) = relay_state {
            to_sign.push_str(&format!("&RelayState={}", urlencoding::encode(rs)));
        }
        to_sign.push_str(&format!(
            "&SigAlg={}",
            urlencoding::encode(self.config.algorithm.uri())
        ));

        let signature = self.sign_data(to_sign.as_bytes())?;
        Ok(STANDARD.encode(signature))
    }

    fn sign_data(&self, data: &[u8]) -> SamlResult<Vec<u8>> {
        if self.config.algorithm.is_deprecated() {
            return Err(SamlError::SignatureCreation(
                "Refusing to produce SHA-1 signatures".to_string(),
            ));
        }

        websso_crypto::rsa_sign(
            &self.private_key_der,
            data,
            self.config.algorithm.crypto_algorithm(),
        )
        .map_err(|e| SamlError::SignatureCreation(format!("RSA signing failed: {e}")))
    }
}

/// Finds the element to sign and the position for the signature.
fn find_element_and_insert_position(xml: &str, reference_id: &str) -> SamlResult<(usize, usize)> {
    let id_pattern = format!("ID=\"{reference_id}\"");
    let alt_pattern = format!("Id=\"{reference_id}\"");

    let id_pos = xml
        .find(&id_pattern)
        .or_else(|| xml.find(&alt_pattern))
        .ok_or_else(|| {
            SamlError::SignatureCreation(format!("Element with ID '{reference_id}' not found"))
        })?;

    let mut tag_start = id_pos;
    while tag_start > 0 && xml.as_bytes()[tag_start - 1] != b'<' {
        tag_start -= 1;
    }
    if tag_start > 0 {
        tag_start -= 1;
    }

    let tag_end = xml[id_pos..]
        .find('>')
        .map(|pos| id_pos + pos + 1)
        .ok_or_else(|| SamlError::SignatureCreation("Malformed XML element".to_string()))?;

    // The signature goes after the element's Issuer when present.
    let insert_pos = find_issuer_end(xml, tag_end).unwrap_or(tag_end);

    Ok((tag_start, insert_pos))
}

/// Finds the end of the Issuer element after the given position.
fn find_issuer_end(xml: &str, after: usize) -> Option<usize> {
    let search_area = &xml[after..];
    for pattern in &["</saml:Issuer>", "</Issuer>", "</saml2:Issuer>"] {
        if let Some(pos) = search_area.find(pattern) {
            return Some(after + pos + pattern.len());
        }
    }
    None
}

/// Whitespace-normalizing canonicalization.
///
/// Both signing and validation run the same normalization over documents
/// this crate marshals, so the two sides agree byte for byte.
pub(crate) fn canonicalize(xml: &str) -> String {
    xml.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Calculates the digest of canonicalized data.
pub(crate) fn calculate_digest(data: &str, algorithm: SignatureAlgorithm) -> SamlResult<Vec<u8>> {
    Ok(websso_crypto::hash(
        algorithm.hash_algorithm(),
        data.as_bytes(),
    ))
}

/// Builds the SignedInfo element.
pub(crate) fn build_signed_info(
    reference_id: &str,
    digest_b64: &str,
    algorithm: SignatureAlgorithm,
    canonicalization: super::CanonicalizationAlgorithm,
) -> String {
    format!(
        r##"<ds:SignedInfo xmlns:ds="http://www.w3.org/2000/09/xmldsig#">
<ds:CanonicalizationMethod Algorithm="{}"/>
<ds:SignatureMethod Algorithm="{}"/>
<ds:Reference URI="#{}">
<ds:Transforms>
<ds:Transform Algorithm="http://www.w3.org/2000/09/xmldsig#enveloped-signature"/>
<ds:Transform Algorithm="{}"/>
</ds:Transforms>
<ds:DigestMethod Algorithm="{}"/>
<ds:DigestValue>{}</ds:DigestValue>
</ds:Reference>
</ds:SignedInfo>"##,
        canonicalization.uri(),
        algorithm.uri(),
        reference_id,
        canonicalization.uri(),
        algorithm.digest_uri(),
        digest_b64
    )
}

/// Builds the complete Signature element.
fn build_signature_element(
    signed_info: &str,
    signature_value: &str,
    certificate_der: Option<&[u8]>,
    config: &SignatureConfig,
) -> String {
    let mut signature = format!(
        r#"<ds:Signature xmlns:ds="http://www.w3.org/2000/09/xmldsig#">
{signed_info}
<ds:SignatureValue>{signature_value}</ds:SignatureValue>"#
    );

    if config.include_certificate {
        if let Some(cert) = certificate_der {
            let cert_b64 = STANDARD.encode(cert);
            signature.push_str(&format!(
                r#"
<ds:KeyInfo>
<ds:X509Data>
<ds:X509Certificate>{cert_b64}</ds:X509Certificate>
</ds:X509Data>
</ds:KeyInfo>"#
            ));
        }
    }

    signature.push_str("\n</ds:Signature>");
    signature
}
