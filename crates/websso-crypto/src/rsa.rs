//! RSA PKCS#1 v1.5 signatures for XML-DSig.
//!
//! SHA-1 is accepted for verification of legacy peers only; requesting a
//! SHA-1 signature is an error. New signatures default to SHA-256 at the
//! protocol layer.

use aws_lc_rs::{
    rand::SystemRandom,
    signature::{self, RsaKeyPair, UnparsedPublicKey},
};
use thiserror::Error;

/// Error type for signature operations.
#[derive(Debug, Error)]
pub enum SignatureError {
    /// Signing failed.
    #[error("signing failed: {0}")]
    Signing(String),

    /// Invalid key format.
    #[error("invalid key format: {0}")]
    InvalidKey(String),

    /// Algorithm not supported for the requested operation.
    #[error("algorithm not supported: {0}")]
    UnsupportedAlgorithm(String),
}

/// RSA PKCS#1 v1.5 signature algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsaAlgorithm {
    /// RSA with SHA-1 (verification only, legacy peers).
    Sha1,
    /// RSA with SHA-256.
    Sha256,
    /// RSA with SHA-384.
    Sha384,
    /// RSA with SHA-512.
    Sha512,
}

impl RsaAlgorithm {
    /// Returns the XML-DSig signature algorithm URI.
    #[must_use]
    pub const fn xml_dsig_uri(self) -> &'static str {
        match self {
            Self::Sha1 => "http://www.w3.org/2000/09/xmldsig#rsa-sha1",
            Self::Sha256 => "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256",
            Self::Sha384 => "http://www.w3.org/2001/04/xmldsig-more#rsa-sha384",
            Self::Sha512 => "http://www.w3.org/2001/04/xmldsig-more#rsa-sha512",
        }
    }

    /// Returns true if this algorithm is considered weak.
    #[must_use]
    pub const fn is_deprecated(self) -> bool {
        matches!(self, Self::Sha1)
    }
}

/// Signs data with an RSA private key.
///
/// # Arguments
///
/// * `key_der` - RSA private key in DER format (PKCS#1 or PKCS#8)
/// * `data` - Data to sign
/// * `algorithm` - Signature algorithm
///
/// # Errors
///
/// Returns [`SignatureError::UnsupportedAlgorithm`] for SHA-1 (signing with
/// it is refused), [`SignatureError::InvalidKey`] if the key does not
/// parse, [`SignatureError::Signing`] if the operation fails.
pub fn rsa_sign(
    key_der: &[u8],
    data: &[u8],
    algorithm: RsaAlgorithm,
) -> Result<Vec<u8>, SignatureError> {
    let padding: &'static dyn signature::RsaEncoding = match algorithm {
        RsaAlgorithm::Sha1 => {
            return Err(SignatureError::UnsupportedAlgorithm(
                "refusing to create RSA-SHA1 signatures".to_string(),
            ));
        }
        RsaAlgorithm::Sha256 => &signature::RSA_PKCS1_SHA256,
        RsaAlgorithm::Sha384 => &signature::RSA_PKCS1_SHA384,
        RsaAlgorithm::Sha512 => &signature::RSA_PKCS1_SHA512,
    };

    let key_pair = RsaKeyPair::from_der(key_der)
        .or_else(|_| RsaKeyPair::from_pkcs8(key_der))
        .map_err(|e| SignatureError::InvalidKey(format!("invalid RSA key: {e}")))?;

    let rng = SystemRandom::new();
    let mut sig = vec![0u8; key_pair.public_modulus_len()];

    key_pair
        .sign(padding, &rng, data, &mut sig)
        .map_err(|e| SignatureError::Signing(format!("RSA signing failed: {e}")))?;

    Ok(sig)
}

/// Verifies an RSA signature.
///
/// The public key is the DER `RSAPublicKey` structure, as extracted from a
/// certificate by [`crate::keys::public_key_from_certificate`].
///
/// Returns `Ok(false)` on signature mismatch; errors are reserved for
/// malformed inputs that never reach the comparison.
///
/// # Errors
///
/// This function currently reports all verification problems through the
/// `Ok(false)` path and does not error.
pub fn rsa_verify(
    public_key_der: &[u8],
    data: &[u8],
    sig: &[u8],
    algorithm: RsaAlgorithm,
) -> Result<bool, SignatureError> {
    use aws_lc_rs::signature::{
        RSA_PKCS1_2048_8192_SHA1_FOR_LEGACY_USE_ONLY, RSA_PKCS1_2048_8192_SHA256,
        RSA_PKCS1_2048_8192_SHA384, RSA_PKCS1_2048_8192_SHA512,
    };

    let verification_alg: &dyn signature::VerificationAlgorithm = match algorithm {
        RsaAlgorithm::Sha1 => &RSA_PKCS1_2048_8192_SHA1_FOR_LEGACY_USE_ONLY,
        RsaAlgorithm::Sha256 => &RSA_PKCS1_2048_8192_SHA256,
        RsaAlgorithm::Sha384 => &RSA_PKCS1_2048_8192_SHA384,
        RsaAlgorithm::Sha512 => &RSA_PKCS1_2048_8192_SHA512,
    };

    let public_key = UnparsedPublicKey::new(verification_alg, public_key_der);

    match public_key.verify(data, sig) {
        Ok(()) => Ok(true),
        Err(_) => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{decode_certificate_pem, decode_private_key_pem, public_key_from_certificate};
    use rcgen::{CertificateParams, KeyPair, PKCS_RSA_SHA256};

    fn test_key_and_public() -> (Vec<u8>, Vec<u8>) {
        let key_pair = KeyPair::generate_for(&PKCS_RSA_SHA256).expect("generate RSA key");
        let cert = CertificateParams::default()
            .self_signed(&key_pair)
            .expect("self-sign certificate");

        let key_der = decode_private_key_pem(&key_pair.serialize_pem()).expect("key der");
        let cert_der = decode_certificate_pem(&cert.pem()).expect("cert der");
        let public_der = public_key_from_certificate(&cert_der).expect("public key");
        (key_der, public_der)
    }

    #[test]
    fn algorithm_uris() {
        assert!(RsaAlgorithm::Sha1.xml_dsig_uri().ends_with("rsa-sha1"));
        assert!(RsaAlgorithm::Sha256.xml_dsig_uri().contains("sha256"));
        assert!(RsaAlgorithm::Sha512.xml_dsig_uri().contains("sha512"));
    }

    #[test]
    fn only_sha1_is_deprecated() {
        assert!(RsaAlgorithm::Sha1.is_deprecated());
        assert!(!RsaAlgorithm::Sha256.is_deprecated());
        assert!(!RsaAlgorithm::Sha384.is_deprecated());
    }

    #[test]
    fn sign_and_verify_roundtrip() {
        let (key_der, public_der) = test_key_and_public();
        let data = b"canonical signed info";

        let sig = rsa_sign(&key_der, data, RsaAlgorithm::Sha256).expect("sign");
        assert!(rsa_verify(&public_der, data, &sig, RsaAlgorithm::Sha256).expect("verify"));
    }

    #[test]
    fn verify_rejects_tampered_data() {
        let (key_der, public_der) = test_key_and_public();

        let sig = rsa_sign(&key_der, b"original", RsaAlgorithm::Sha256).expect("sign");
        assert!(!rsa_verify(&public_der, b"tampered", &sig, RsaAlgorithm::Sha256).expect("verify"));
    }

    #[test]
    fn verify_rejects_foreign_key() {
        let (key_der, _) = test_key_and_public();
        let (_, other_public) = test_key_and_public();

        let sig = rsa_sign(&key_der, b"data", RsaAlgorithm::Sha256).expect("sign");
        assert!(!rsa_verify(&other_public, b"data", &sig, RsaAlgorithm::Sha256).expect("verify"));
    }

    #[test]
    fn sha1_signing_is_refused() {
        let (key_der, _) = test_key_and_public();
        let err = rsa_sign(&key_der, b"data", RsaAlgorithm::Sha1).unwrap_err();
        assert!(matches!(err, SignatureError::UnsupportedAlgorithm(_)));
    }
}
