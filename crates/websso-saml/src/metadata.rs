//! IdP metadata trust establishment.
//!
//! A service provider learns the identity provider's signing certificate
//! from a published metadata document. The document is fetched over HTTP
//! with a bounded timeout; a successful fetch is mirrored to a backing
//! file so that a later fetch failure can fall back to the last known
//! good copy.

use std::path::PathBuf;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::signature::XmlSignatureValidator;
use crate::types::{SamlBinding, METADATA_NS, SAMLP_NS, XMLDSIG_NS};
use crate::xml::xml_escape;

/// Default backing file for the last successfully fetched document.
pub const DEFAULT_BACKING_FILE: &str = "metadata-backing-file.xml";

/// Default fetch timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(60_000);

/// Errors raised while establishing trust from remote metadata.
///
/// The variants keep network trouble, unparseable documents, and documents
/// that parse but carry no usable certificate apart, so callers can react
/// differently to each.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The metadata endpoint did not answer within the configured timeout.
    #[error("Metadata fetch timed out: {0}")]
    NetworkTimeout(String),

    /// The metadata endpoint could not be reached or answered with an error.
    #[error("Metadata fetch failed: {0}")]
    Network(String),

    /// The fetched document is not well-formed metadata.
    #[error("Malformed metadata document: {0}")]
    MalformedDocument(String),

    /// The document parsed but carries no usable signing certificate.
    #[error("Metadata carries no signing certificate: {0}")]
    MissingCertificate(String),

    /// The backing file could not be read or written.
    #[error("Metadata backing file error: {0}")]
    BackingFile(String),
}

/// Configuration for fetching IdP metadata.
#[derive(Debug, Clone)]
pub struct MetadataConfig {
    /// URL of the metadata document.
    pub url: String,

    /// Local mirror of the last successfully fetched document.
    pub backing_file: PathBuf,

    /// Fetch timeout.
    pub timeout: Duration,
}

impl MetadataConfig {
    /// Creates a configuration with the default backing file and timeout.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            backing_file: PathBuf::from(DEFAULT_BACKING_FILE),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sets the backing file path.
    #[must_use]
    pub fn with_backing_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.backing_file = path.into();
        self
    }

    /// Sets the fetch timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Trust material extracted from an IdP metadata document.
#[derive(Debug, Clone)]
pub struct MetadataTrustRecord {
    /// The IdP entity ID the metadata describes.
    pub entity_id: String,

    /// The DER-encoded signing certificate.
    pub certificate_der: Vec<u8>,

    /// When this record was established.
    pub fetched_at: DateTime<Utc>,

    /// Whether the record came from the backing file rather than the
    /// network.
    pub from_backing_file: bool,
}

impl MetadataTrustRecord {
    /// Builds a signature validator trusting this record's certificate.
    #[must_use]
    pub fn verifier(&self) -> XmlSignatureValidator {
        XmlSignatureValidator::new(vec![self.certificate_der.clone()])
    }
}

/// Fetches and caches IdP metadata trust material.
pub struct MetadataTrustStore {
    config: MetadataConfig,
}

impl MetadataTrustStore {
    /// Creates a trust store with the given configuration.
    #[must_use]
    pub const fn new(config: MetadataConfig) -> Self {
        Self { config }
    }

    /// Fetches the metadata document and extracts the signing certificate.
    ///
    /// A successful fetch refreshes the backing file. When the network
    /// fetch fails, the backing file is tried before the network error is
    /// surfaced; timeouts are reported as [`FetchError::NetworkTimeout`].
    pub fn fetch_trust(&self) -> Result<MetadataTrustRecord, FetchError> {
        match self.fetch_remote() {
            Ok(document) => {
                let record = parse_idp_metadata(&document)?;
                if let Err(e) = std::fs::write(&self.config.backing_file, &document) {
                    tracing::warn!(
                        path = %self.config.backing_file.display(),
                        "Failed to refresh metadata backing file: {e}"
                    );
                }
                Ok(MetadataTrustRecord {
                    from_backing_file: false,
                    ..record
                })
            }
            Err(network_error) => {
                tracing::warn!(
                    url = %self.config.url,
                    "Metadata fetch failed, falling back to backing file: {network_error}"
                );
                match self.read_backing_file() {
                    Ok(document) => {
                        let record = parse_idp_metadata(&document)?;
                        Ok(MetadataTrustRecord {
                            from_backing_file: true,
                            ..record
                        })
                    }
                    Err(_) => Err(network_error),
                }
            }
        }
    }

    fn fetch_remote(&self) -> Result<String, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(self.config.timeout)
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let response = client
            .get(&self.config.url)
            .send()
            .map_err(classify_reqwest_error)?;

        let response = response
            .error_for_status()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        response.text().map_err(classify_reqwest_error)
    }

    fn read_backing_file(&self) -> Result<String, FetchError> {
        std::fs::read_to_string(&self.config.backing_file)
            .map_err(|e| FetchError::BackingFile(e.to_string()))
    }
}

fn classify_reqwest_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::NetworkTimeout(e.to_string())
    } else {
        FetchError::Network(e.to_string())
    }
}

/// Parses an IdP metadata document into a trust record.
///
/// Looks for the first signing `KeyDescriptor` inside an
/// `IDPSSODescriptor` whose protocol support covers SAML 2.0. A
/// descriptor without a `use` attribute counts as a signing descriptor.
pub fn parse_idp_metadata(document: &str) -> Result<MetadataTrustRecord, FetchError> {
    let mut reader = Reader::from_str(document);
    reader.config_mut().trim_text(true);

    let mut entity_id = None;
    let mut in_idp_descriptor = false;
    let mut in_signing_descriptor = false;
    let mut certificate_b64 = None;
    let mut saw_idp_descriptor = false;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| FetchError::MalformedDocument(e.to_string()))?;
        match event {
            Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                b"EntityDescriptor" => {
                    for attr in e.attributes() {
                        let attr =
                            attr.map_err(|e| FetchError::MalformedDocument(e.to_string()))?;
                        if attr.key.local_name().as_ref() == b"entityID" {
                            entity_id = Some(
                                attr.unescape_value()
                                    .map_err(|e| FetchError::MalformedDocument(e.to_string()))?
                                    .into_owned(),
                            );
                        }
                    }
                }
                b"IDPSSODescriptor" => {
                    let mut supports_saml2 = true;
                    for attr in e.attributes() {
                        let attr =
                            attr.map_err(|e| FetchError::MalformedDocument(e.to_string()))?;
                        if attr.key.local_name().as_ref() == b"protocolSupportEnumeration" {
                            let value = attr
                                .unescape_value()
                                .map_err(|e| FetchError::MalformedDocument(e.to_string()))?;
                            supports_saml2 = value.contains(SAMLP_NS);
                        }
                    }
                    in_idp_descriptor = supports_saml2;
                    saw_idp_descriptor |= supports_saml2;
                }
                b"KeyDescriptor" if in_idp_descriptor => {
                    let mut usage = None;
                    for attr in e.attributes() {
                        let attr =
                            attr.map_err(|e| FetchError::MalformedDocument(e.to_string()))?;
                        if attr.key.local_name().as_ref() == b"use" {
                            usage = Some(
                                attr.unescape_value()
                                    .map_err(|e| FetchError::MalformedDocument(e.to_string()))?
                                    .into_owned(),
                            );
                        }
                    }
                    in_signing_descriptor =
                        matches!(usage.as_deref(), None | Some("signing"));
                }
                b"X509Certificate" if in_signing_descriptor && certificate_b64.is_none() => {
                    let text = reader
                        .read_text(e.name())
                        .map_err(|e| FetchError::MalformedDocument(e.to_string()))?;
                    certificate_b64 = Some(text.into_owned());
                }
                _ => {}
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"IDPSSODescriptor" => in_idp_descriptor = false,
                b"KeyDescriptor" => in_signing_descriptor = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    let entity_id = entity_id
        .ok_or_else(|| FetchError::MalformedDocument("No EntityDescriptor entityID".to_string()))?;

    if !saw_idp_descriptor {
        return Err(FetchError::MalformedDocument(
            "No SAML 2.0 IDPSSODescriptor".to_string(),
        ));
    }

    let certificate_b64 = certificate_b64.ok_or_else(|| {
        FetchError::MissingCertificate(format!("No signing certificate for '{entity_id}'"))
    })?;

    let compact: String = certificate_b64
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    let certificate_der = STANDARD
        .decode(compact)
        .map_err(|e| FetchError::MalformedDocument(format!("Invalid certificate base64: {e}")))?;

    Ok(MetadataTrustRecord {
        entity_id,
        certificate_der,
        fetched_at: Utc::now(),
        from_backing_file: false,
    })
}

/// Generates an IdP metadata document describing this deployment's signing
/// certificate and SSO endpoint.
#[must_use]
pub fn idp_metadata_xml(entity_id: &str, sso_url: &str, certificate_der: &[u8]) -> String {
    let certificate_b64 = STANDARD.encode(certificate_der);

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<md:EntityDescriptor xmlns:md="{md}" entityID="{entity_id}">
    <md:IDPSSODescriptor protocolSupportEnumeration="{samlp}">
        <md:KeyDescriptor use="signing">
            <ds:KeyInfo xmlns:ds="{ds}">
                <ds:X509Data>
                    <ds:X509Certificate>{cert}</ds:X509Certificate>
                </ds:X509Data>
            </ds:KeyInfo>
        </md:KeyDescriptor>
        <md:SingleSignOnService Binding="{post}" Location="{sso}"/>
        <md:SingleSignOnService Binding="{redirect}" Location="{sso}"/>
    </md:IDPSSODescriptor>
</md:EntityDescriptor>"#,
        md = METADATA_NS,
        samlp = SAMLP_NS,
        ds = XMLDSIG_NS,
        entity_id = xml_escape(entity_id),
        cert = certificate_b64,
        post = SamlBinding::HttpPost.uri(),
        redirect = SamlBinding::HttpRedirect.uri(),
        sso = xml_escape(sso_url),
    )
}
