//! Lazily decoded signing key material.
//!
//! PEM text is carried around in configuration; the DER form is decoded on
//! first use and memoized. Decoding runs at most effectively once even
//! under concurrent first access, and a decode failure is reported to
//! every caller.

use once_cell::sync::OnceCell;

use crate::error::{SamlError, SamlResult};

/// An RSA private key held as PEM text and decoded on demand.
#[derive(Debug)]
pub struct PrivateKeyMaterial {
    pem: String,
    der: OnceCell<Vec<u8>>,
}

impl PrivateKeyMaterial {
    /// Wraps PEM text without decoding it.
    #[must_use]
    pub fn from_pem(pem: impl Into<String>) -> Self {
        Self {
            pem: pem.into(),
            der: OnceCell::new(),
        }
    }

    /// Returns the PEM text as provided.
    #[must_use]
    pub fn pem(&self) -> &str {
        &self.pem
    }

    /// Returns the DER-encoded key, decoding and validating it on first
    /// call.
    pub fn key_der(&self) -> SamlResult<&[u8]> {
        self.der
            .get_or_try_init(|| websso_crypto::decode_private_key_pem(&self.pem))
            .map(Vec::as_slice)
            .map_err(SamlError::from)
    }
}

impl Clone for PrivateKeyMaterial {
    fn clone(&self) -> Self {
        // The memoized DER is not carried over; the clone re-decodes on
        // first use.
        Self::from_pem(self.pem.clone())
    }
}

/// An X.509 certificate held as PEM text and decoded on demand.
#[derive(Debug)]
pub struct CertificateMaterial {
    pem: String,
    der: OnceCell<Vec<u8>>,
}

impl CertificateMaterial {
    /// Wraps PEM text without decoding it.
    #[must_use]
    pub fn from_pem(pem: impl Into<String>) -> Self {
        Self {
            pem: pem.into(),
            der: OnceCell::new(),
        }
    }

    /// Returns the PEM text as provided.
    #[must_use]
    pub fn pem(&self) -> &str {
        &self.pem
    }

    /// Returns the DER-encoded certificate, decoding and validating it on
    /// first call.
    pub fn certificate_der(&self) -> SamlResult<&[u8]> {
        self.der
            .get_or_try_init(|| websso_crypto::decode_certificate_pem(&self.pem))
            .map(Vec::as_slice)
            .map_err(SamlError::from)
    }

    /// Extracts the RSA public key carried by the certificate.
    pub fn public_key_der(&self) -> SamlResult<Vec<u8>> {
        let der = self.certificate_der()?;
        websso_crypto::public_key_from_certificate(der).map_err(SamlError::from)
    }
}

impl Clone for CertificateMaterial {
    fn clone(&self) -> Self {
        Self::from_pem(self.pem.clone())
    }
}
