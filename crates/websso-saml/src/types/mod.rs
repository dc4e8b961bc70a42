//! SAML 2.0 types and data structures.
//!
//! Core message model for Web Browser SSO: requests, responses, assertions,
//! and the constants the wire format is built from.

mod assertion;
mod authn_request;
mod constants;
mod name_id;
mod response;
mod status;

pub use assertion::*;
pub use authn_request::*;
pub use constants::*;
pub use name_id::*;
pub use response::*;
pub use status::*;
