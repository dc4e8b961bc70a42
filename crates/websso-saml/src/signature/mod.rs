//! XML Signature support.
//!
//! XML Digital Signature (XML-DSig) creation and validation for SAML
//! assertions and protocol messages, plus the detached signature used by
//! the HTTP-Redirect binding.
//!
//! RSA-SHA256 is the default; RSA-SHA384 and RSA-SHA512 are available.
//! SHA-1 signatures can be accepted during validation for legacy partners
//! but are never produced.

mod signer;
mod validator;

pub use signer::*;
pub use validator::*;

use crate::types::{canonicalization_algorithms, digest_algorithms, signature_algorithms};

/// Signature algorithm selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignatureAlgorithm {
    /// RSA with SHA-256 (recommended).
    #[default]
    RsaSha256,
    /// RSA with SHA-384.
    RsaSha384,
    /// RSA with SHA-512.
    RsaSha512,
    /// Legacy RSA with SHA-1 (accepted only when explicitly allowed).
    RsaSha1,
}

impl SignatureAlgorithm {
    /// Returns the URI for this signature algorithm.
    #[must_use]
    pub const fn uri(&self) -> &'static str {
        match self {
            Self::RsaSha256 => signature_algorithms::RSA_SHA256,
            Self::RsaSha384 => signature_algorithms::RSA_SHA384,
            Self::RsaSha512 => signature_algorithms::RSA_SHA512,
            Self::RsaSha1 => signature_algorithms::RSA_SHA1,
        }
    }

    /// Returns the corresponding digest algorithm URI.
    #[must_use]
    pub const fn digest_uri(&self) -> &'static str {
        match self {
            Self::RsaSha256 => digest_algorithms::SHA256,
            Self::RsaSha384 => digest_algorithms::SHA384,
            Self::RsaSha512 => digest_algorithms::SHA512,
            Self::RsaSha1 => digest_algorithms::SHA1,
        }
    }

    /// Parses a signature algorithm from its URI.
    #[must_use]
    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri {
            signature_algorithms::RSA_SHA256 => Some(Self::RsaSha256),
            signature_algorithms::RSA_SHA384 => Some(Self::RsaSha384),
            signature_algorithms::RSA_SHA512 => Some(Self::RsaSha512),
            signature_algorithms::RSA_SHA1 => Some(Self::RsaSha1),
            _ => None,
        }
    }

    /// Returns true if this algorithm uses a deprecated hash (SHA-1).
    #[must_use]
    pub const fn is_deprecated(&self) -> bool {
        matches!(self, Self::RsaSha1)
    }

    pub(crate) const fn crypto_algorithm(&self) -> websso_crypto::RsaAlgorithm {
        match self {
            Self::RsaSha256 => websso_crypto::RsaAlgorithm::Sha256,
            Self::RsaSha384 => websso_crypto::RsaAlgorithm::Sha384,
            Self::RsaSha512 => websso_crypto::RsaAlgorithm::Sha512,
            Self::RsaSha1 => websso_crypto::RsaAlgorithm::Sha1,
        }
    }

    pub(crate) const fn hash_algorithm(&self) -> websso_crypto::HashAlgorithm {
        match self {
            Self::RsaSha256 => websso_crypto::HashAlgorithm::Sha256,
            Self::RsaSha384 => websso_crypto::HashAlgorithm::Sha384,
            Self::RsaSha512 => websso_crypto::HashAlgorithm::Sha512,
            Self::RsaSha1 => websso_crypto::HashAlgorithm::Sha1,
        }
    }
}

/// Canonicalization algorithm selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CanonicalizationAlgorithm {
    /// Exclusive C14N without comments (recommended).
    #[default]
    ExclusiveC14N,
    /// Exclusive C14N with comments.
    ExclusiveC14NWithComments,
    /// C14N without comments.
    C14N,
    /// C14N with comments.
    C14NWithComments,
}

impl CanonicalizationAlgorithm {
    /// Returns the URI for this canonicalization algorithm.
    #[must_use]
    pub const fn uri(&self) -> &'static str {
        match self {
            Self::ExclusiveC14N => canonicalization_algorithms::EXCLUSIVE_C14N,
            Self::ExclusiveC14NWithComments => {
                canonicalization_algorithms::EXCLUSIVE_C14N_WITH_COMMENTS
            }
            Self::C14N => canonicalization_algorithms::C14N,
            Self::C14NWithComments => canonicalization_algorithms::C14N_WITH_COMMENTS,
        }
    }

    /// Parses a canonicalization algorithm from its URI.
    #[must_use]
    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri {
            canonicalization_algorithms::EXCLUSIVE_C14N => Some(Self::ExclusiveC14N),
            canonicalization_algorithms::EXCLUSIVE_C14N_WITH_COMMENTS => {
                Some(Self::ExclusiveC14NWithComments)
            }
            canonicalization_algorithms::C14N => Some(Self::C14N),
            canonicalization_algorithms::C14N_WITH_COMMENTS => Some(Self::C14NWithComments),
            _ => None,
        }
    }
}

/// XML Signature structure.
///
/// Represents the `<ds:Signature>` element in signed SAML documents.
#[derive(Debug, Clone)]
pub struct XmlSignature {
    /// The signature algorithm used.
    pub algorithm: SignatureAlgorithm,
    /// The canonicalization algorithm used.
    pub canonicalization: CanonicalizationAlgorithm,
    /// The reference URI (typically the ID of the signed element).
    pub reference_uri: String,
    /// The digest value (base64 encoded).
    pub digest_value: String,
    /// The signature value (base64 encoded).
    pub signature_value: String,
    /// Optional X.509 certificate (base64 encoded, DER format).
    pub x509_certificate: Option<String>,
}

/// Configuration for signature creation.
#[derive(Debug, Clone)]
pub struct SignatureConfig {
    /// The signature algorithm to use.
    pub algorithm: SignatureAlgorithm,
    /// The canonicalization algorithm to use.
    pub canonicalization: CanonicalizationAlgorithm,
    /// Whether to embed the X.509 certificate in the signature's KeyInfo.
    pub include_certificate: bool,
}

impl Default for SignatureConfig {
    fn default() -> Self {
        Self {
            algorithm: SignatureAlgorithm::RsaSha256,
            canonicalization: CanonicalizationAlgorithm::ExclusiveC14N,
            include_certificate: true,
        }
    }
}

impl SignatureConfig {
    /// Creates a new signature configuration with the given algorithm.
    #[must_use]
    pub const fn with_algorithm(algorithm: SignatureAlgorithm) -> Self {
        Self {
            algorithm,
            canonicalization: CanonicalizationAlgorithm::ExclusiveC14N,
            include_certificate: true,
        }
    }
}
