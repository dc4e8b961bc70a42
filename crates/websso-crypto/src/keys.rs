//! PEM and X.509 key material decoding.
//!
//! Decoding is a pure function of the input bytes: the same malformed input
//! fails the same way every time, so callers may safely memoize the first
//! successful result.

use aws_lc_rs::signature::RsaKeyPair;
use base64::Engine;
use thiserror::Error;
use x509_parser::oid_registry::OID_PKCS1_RSAENCRYPTION;
use x509_parser::prelude::*;

/// Error type for key material decoding.
#[derive(Debug, Error)]
pub enum KeyDecodeError {
    /// The input is not valid PEM or the inner encoding is corrupt.
    #[error("malformed key encoding: {0}")]
    MalformedEncoding(String),

    /// The key uses an algorithm this engine does not support.
    #[error("unsupported key algorithm: {0}")]
    UnsupportedAlgorithm(String),
}

/// Extracts DER data from a PEM string with the given label.
///
/// Returns `None` if the header/footer markers are absent or the base64
/// payload does not decode.
#[must_use]
pub fn pem_to_der(pem: &str, label: &str) -> Option<Vec<u8>> {
    let begin = format!("-----BEGIN {label}-----");
    let end = format!("-----END {label}-----");

    let start = pem.find(&begin)? + begin.len();
    let end_pos = pem.find(&end)?;

    let b64_data: String = pem[start..end_pos]
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    base64::engine::general_purpose::STANDARD
        .decode(&b64_data)
        .ok()
}

/// Decodes a PEM-encoded RSA private key to DER.
///
/// Accepts both PKCS#8 (`PRIVATE KEY`) and PKCS#1 (`RSA PRIVATE KEY`)
/// framing, and validates that the result parses as an RSA key.
///
/// # Errors
///
/// Returns [`KeyDecodeError::MalformedEncoding`] if the PEM framing or
/// base64 payload is invalid, [`KeyDecodeError::UnsupportedAlgorithm`] if
/// the DER is not an RSA private key.
pub fn decode_private_key_pem(pem: &str) -> Result<Vec<u8>, KeyDecodeError> {
    let der = pem_to_der(pem, "PRIVATE KEY")
        .or_else(|| pem_to_der(pem, "RSA PRIVATE KEY"))
        .ok_or_else(|| {
            KeyDecodeError::MalformedEncoding("missing or corrupt private key PEM".to_string())
        })?;

    validate_rsa_private_key(&der)?;
    Ok(der)
}

/// Decodes a PEM-encoded X.509 certificate to DER.
///
/// # Errors
///
/// Returns [`KeyDecodeError::MalformedEncoding`] if the PEM framing,
/// base64 payload, or certificate structure is invalid.
pub fn decode_certificate_pem(pem: &str) -> Result<Vec<u8>, KeyDecodeError> {
    let der = pem_to_der(pem, "CERTIFICATE").ok_or_else(|| {
        KeyDecodeError::MalformedEncoding("missing or corrupt certificate PEM".to_string())
    })?;

    X509Certificate::from_der(&der)
        .map_err(|e| KeyDecodeError::MalformedEncoding(format!("invalid certificate DER: {e}")))?;

    Ok(der)
}

/// Validates that DER bytes parse as an RSA private key.
///
/// # Errors
///
/// Returns [`KeyDecodeError::UnsupportedAlgorithm`] if the bytes are not an
/// RSA private key in PKCS#1 or PKCS#8 form.
pub fn validate_rsa_private_key(der: &[u8]) -> Result<(), KeyDecodeError> {
    RsaKeyPair::from_der(der)
        .or_else(|_| RsaKeyPair::from_pkcs8(der))
        .map_err(|e| KeyDecodeError::UnsupportedAlgorithm(format!("not an RSA private key: {e}")))?;
    Ok(())
}

/// Extracts the RSA public key from an X.509 certificate.
///
/// Returns the `RSAPublicKey` structure (the SubjectPublicKeyInfo bit-string
/// payload) in DER, the form the verification primitives consume.
///
/// # Errors
///
/// Returns [`KeyDecodeError::MalformedEncoding`] if the certificate does
/// not parse, [`KeyDecodeError::UnsupportedAlgorithm`] if the certified key
/// is not RSA.
pub fn public_key_from_certificate(cert_der: &[u8]) -> Result<Vec<u8>, KeyDecodeError> {
    let (_, cert) = X509Certificate::from_der(cert_der)
        .map_err(|e| KeyDecodeError::MalformedEncoding(format!("invalid certificate: {e}")))?;

    let spki = cert.public_key();
    if spki.algorithm.algorithm != OID_PKCS1_RSAENCRYPTION {
        return Err(KeyDecodeError::UnsupportedAlgorithm(format!(
            "certificate public key is not RSA (OID {})",
            spki.algorithm.algorithm
        )));
    }

    Ok(spki.subject_public_key.data.to_vec())
}
