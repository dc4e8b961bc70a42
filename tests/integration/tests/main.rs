//! End-to-end tests for the websso SAML engine.
//!
//! These tests exercise complete Web Browser SSO exchanges: request
//! construction at the service provider, response issuance and signing at
//! the identity provider, wire encoding through both bindings, and
//! verification back at the service provider.

mod common;

mod trust;
mod web_sso_flow;
