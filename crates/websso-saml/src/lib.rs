//! SAML 2.0 Web Browser SSO protocol engine.
//!
//! This crate implements the protocol core shared by a Service Provider and
//! an Identity Provider:
//!
//! - **Message construction** - AuthnRequest and Response/Assertion graphs
//!   with correct identifiers, timestamps, and validity windows
//! - **XML signature** - signing an Assertion subtree and fail-closed
//!   verification against a trusted certificate
//! - **POST and Redirect bindings** - base64 and DEFLATE+base64+URL wire
//!   encodings, including RelayState handling
//! - **Metadata trust** - fetching partner metadata with a backing-file
//!   cache and deriving a verifier from the published certificate
//! - **Receive-side processing** - decoding incoming envelopes and
//!   extracting the authenticated subject from a verified response
//!
//! # Architecture
//!
//! - [`types`] - Core SAML types and data structures
//! - [`builder`] - AuthnRequest and Response construction policies
//! - [`signature`] - XML signature signing and validation
//! - [`bindings`] - POST and Redirect binding implementations
//! - [`metadata`] - Partner metadata fetch, cache, and trust extraction
//! - [`keys`] - Memoized PEM key material
//! - [`flow`] - Transport-facing decode and response processing
//! - [`error`] - Error types for SAML operations
//!
//! The HTTP transport itself is out of scope: callers hand in request
//! method + parameters and receive redirect URLs or form documents back.
//!
//! # SAML Specifications
//!
//! - [SAML 2.0 Core](https://docs.oasis-open.org/security/saml/v2.0/saml-core-2.0-os.pdf)
//! - [SAML 2.0 Bindings](https://docs.oasis-open.org/security/saml/v2.0/saml-bindings-2.0-os.pdf)
//! - [XML Signature](https://www.w3.org/TR/xmldsig-core1/)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bindings;
pub mod builder;
pub mod config;
pub mod error;
pub mod flow;
pub mod keys;
pub mod metadata;
pub mod signature;
pub mod types;
pub mod xml;

pub use error::{SamlError, SamlResult};
pub use types::*;
