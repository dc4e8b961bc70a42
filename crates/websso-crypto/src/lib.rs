//! # websso-crypto
//!
//! Cryptographic operations for the websso SAML engine, built on aws-lc-rs.
//!
//! This crate is the engine's crypto collaborator: message digests, PEM
//! key/certificate decoding, and RSA PKCS#1 v1.5 signatures as used by
//! XML-DSig. SHA-1 is carried for interoperability with legacy SAML peers
//! and is restricted to verification; new signatures use SHA-256 or
//! stronger.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod hash;
pub mod keys;
pub mod rsa;

pub use hash::{hash, sha1, sha256, sha384, sha512, HashAlgorithm};
pub use keys::{
    decode_certificate_pem, decode_private_key_pem, pem_to_der, public_key_from_certificate,
    validate_rsa_private_key, KeyDecodeError,
};
pub use rsa::{rsa_sign, rsa_verify, RsaAlgorithm, SignatureError};
