//! XML Signature validation.
//!
//! Fail-closed validation of `<ds:Signature>` elements against a set of
//! trusted certificates. Any missing part, digest mismatch, unknown
//! algorithm, or key mismatch is a validation failure.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::{SamlError, SamlResult};
use crate::xml;

use super::signer::{build_signed_info, calculate_digest, canonicalize};
use super::{SignatureAlgorithm, XmlSignature};

/// XML signature validator.
pub struct XmlSignatureValidator {
    trusted_certificates: Vec<Vec<u8>>,
    allow_sha1: bool,
}

impl XmlSignatureValidator {
    /// Creates a new validator with the given trusted DER certificates.
    #[must_use]
    pub fn new(trusted_certificates: Vec<Vec<u8>>) -> Self {
        Self {
            trusted_certificates,
            allow_sha1: false,
        }
    }

    /// Creates a validator from PEM-encoded certificates.
    pub fn from_pem(certificates_pem: &[&str]) -> SamlResult<Self> {
        let mut certs = Vec::new();
        for pem in certificates_pem {
            certs.push(websso_crypto::decode_certificate_pem(pem)?);
        }
        Ok(Self::new(certs))
    }

    /// Accepts SHA-1 based signatures from legacy partners.
    #[must_use]
    pub const fn allow_sha1(mut self, allow: bool) -> Self {
        self.allow_sha1 = allow;
        self
    }

    /// Validates the signature embedded in an XML document.
    ///
    /// Verifies both the digest over the referenced element and the
    /// signature over SignedInfo. Returns the parsed signature on success.
    pub fn validate(&self, document: &str) -> SamlResult<XmlSignature> {
        let signature = extract_signature(document)?;

        if signature.algorithm.is_deprecated() && !self.allow_sha1 {
            return Err(SamlError::SignatureInvalid(
                "SHA-1 signatures are not allowed".to_string(),
            ));
        }

        let cert = self.find_certificate(&signature)?;

        self.verify_digest(document, &signature)?;
        self.verify_signature(&signature, &cert)?;

        Ok(signature)
    }

    /// Validates a detached signature for the HTTP-Redirect binding.
    pub fn validate_redirect_binding(
        &self,
        signed_query: &str,
        signature_b64: &str,
        sig_alg: &str,
    ) -> SamlResult<()> {
        let algorithm = SignatureAlgorithm::from_uri(sig_alg).ok_or_else(|| {
            SamlError::SignatureInvalid(format!("Unknown signature algorithm: {sig_alg}"))
        })?;

        if algorithm.is_deprecated() && !self.allow_sha1 {
            return Err(SamlError::SignatureInvalid(
                "SHA-1 signatures are not allowed".to_string(),
            ));
        }

        let signature = STANDARD
            .decode(signature_b64)
            .map_err(|e| SamlError::SignatureInvalid(format!("Invalid signature encoding: {e}")))?;

        for cert_der in &self.trusted_certificates {
            if verify_with_certificate(signed_query.as_bytes(), &signature, cert_der, algorithm)
                .is_ok()
            {
                return Ok(());
            }
        }

        Err(SamlError::SignatureInvalid(
            "Signature verification failed with all trusted certificates".to_string(),
        ))
    }

    /// Picks the certificate to validate against.
    ///
    /// An embedded certificate is used only when it matches a trusted one;
    /// an unknown embedded certificate never widens trust.
    fn find_certificate(&self, signature: &XmlSignature) -> SamlResult<Vec<u8>> {
        if let Some(ref cert_b64) = signature.x509_certificate {
            let cert_der = STANDARD.decode(cert_b64).map_err(|e| {
                SamlError::SignatureInvalid(format!("Invalid certificate encoding: {e}"))
            })?;

            if self.trusted_certificates.iter().any(|tc| tc == &cert_der) {
                return Ok(cert_der);
            }
        }

        self.trusted_certificates
            .first()
            .cloned()
            .ok_or_else(|| SamlError::SignatureInvalid("No trusted certificate".to_string()))
    }

    fn verify_digest(&self, document: &str, signature: &XmlSignature) -> SamlResult<()> {
        let reference_id = signature
            .reference_uri
            .strip_prefix('#')
            .unwrap_or(&signature.reference_uri);

        let element = xml::extract_element_by_id(document, reference_id)
            .map_err(|e| SamlError::SignatureInvalid(e.to_string()))?;

        let element_without_sig = remove_signature_element(&element);
        let canonical = canonicalize(&element_without_sig);

        let calculated = calculate_digest(&canonical, signature.algorithm)?;
        if STANDARD.encode(calculated) != signature.digest_value {
            return Err(SamlError::SignatureInvalid(
                "Digest value mismatch".to_string(),
            ));
        }

        Ok(())
    }

    fn verify_signature(&self, signature: &XmlSignature, cert_der: &[u8]) -> SamlResult<()> {
        let signed_info = build_signed_info(
            signature
                .reference_uri
                .strip_prefix('#')
                .unwrap_or(&signature.reference_uri),
            &signature.digest_value,
            signature.algorithm,
            signature.canonicalization,
        );
        let canonical_signed_info = canonicalize(&signed_info);

        let signature_bytes = STANDARD
            .decode(&signature.signature_value)
            .map_err(|e| SamlError::SignatureInvalid(format!("Invalid signature encoding: {e}")))?;

        verify_with_certificate(
            canonical_signed_info.as_bytes(),
            &signature_bytes,
            cert_der,
            signature.algorithm,
        )
    }
}

/// Verifies a signature using the public key of a certificate.
fn verify_with_certificate(
    data: &[u8],
    signature: &[u8],
    cert_der: &[u8],
    algorithm: SignatureAlgorithm,
) -> SamlResult<()> {
    let public_key = websso_crypto::public_key_from_certificate(cert_der)
        .map_err(|e| SamlError::SignatureInvalid(format!("Unusable certificate: {e}")))?;

    let valid =
        websso_crypto::rsa_verify(&public_key, data, signature, algorithm.crypto_algorithm())
            .map_err(|e| {
                SamlError::SignatureInvalid(format!("Signature verification error: {e}"))
            })?;

    if valid {
        Ok(())
    } else {
        Err(SamlError::SignatureInvalid(
            "Signature verification failed".to_string(),
        ))
    }
}

/// Extracts signature information from an XML document.
fn extract_signature(document: &str) -> SamlResult<XmlSignature> {
    document
        .find("<ds:Signature")
        .or_else(|| document.find("<Signature"))
        .ok_or_else(|| SamlError::SignatureInvalid("No Signature element found".to_string()))?;

    let algorithm = xml::extract_attribute(document, "SignatureMethod", "Algorithm")
        .and_then(|uri| SignatureAlgorithm::from_uri(&uri))
        .ok_or_else(|| SamlError::SignatureInvalid("Invalid signature algorithm".to_string()))?;

    let canonicalization = xml::extract_attribute(document, "CanonicalizationMethod", "Algorithm")
        .and_then(|uri| super::CanonicalizationAlgorithm::from_uri(&uri))
        .unwrap_or_default();

    let reference_uri = xml::extract_attribute(document, "Reference", "URI")
        .ok_or_else(|| SamlError::SignatureInvalid("No Reference URI found".to_string()))?;

    let digest_value = xml::extract_element_content(document, "DigestValue")
        .ok_or_else(|| SamlError::SignatureInvalid("No DigestValue found".to_string()))?;

    let signature_value = xml::extract_element_content(document, "SignatureValue")
        .ok_or_else(|| SamlError::SignatureInvalid("No SignatureValue found".to_string()))?;

    let x509_certificate = xml::extract_element_content(document, "X509Certificate");

    Ok(XmlSignature {
        algorithm,
        canonicalization,
        reference_uri,
        digest_value: strip_whitespace(&digest_value),
        signature_value: strip_whitespace(&signature_value),
        x509_certificate: x509_certificate.map(|s| strip_whitespace(&s)),
    })
}

fn strip_whitespace(value: &str) -> String {
    value.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Removes the first Signature element from XML content.
fn remove_signature_element(xml: &str) -> String {
    let patterns = [
        ("<ds:Signature", "</ds:Signature>"),
        ("<Signature", "</Signature>"),
    ];

    for (open, close) in &patterns {
        if let Some(start) = xml.find(open) {
            if let Some(end_offset) = xml[start..].find(close) {
                let end = start + end_offset + close.len();
                return format!("{}{}", &xml[..start], &xml[end..]);
            }
        }
    }
    xml.to_string()
}
