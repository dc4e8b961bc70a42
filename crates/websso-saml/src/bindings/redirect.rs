//! HTTP-Redirect Binding implementation.
//!
//! SAML messages travel in URL query parameters: raw DEFLATE compressed
//! (no zlib header), base64-encoded, then URL-encoded. RelayState is
//! carried as-is for this binding.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use std::io::{Read, Write};

use crate::error::{SamlError, SamlResult};

use super::{DecodedMessage, SamlMessageType};

/// HTTP-Redirect binding encoder/decoder.
pub struct HttpRedirectBinding;

impl HttpRedirectBinding {
    /// Compresses and base64-encodes a message for the redirect binding.
    ///
    /// The result is the raw parameter value, before URL encoding.
    pub fn encode_message(xml: &str) -> SamlResult<String> {
        let compressed = deflate_compress(xml.as_bytes())?;
        Ok(STANDARD.encode(compressed))
    }

    /// Decodes a redirect-binding parameter value back to XML.
    pub fn decode_message(encoded: &str) -> SamlResult<String> {
        let b64_decoded = STANDARD
            .decode(encoded)
            .map_err(|e| SamlError::Base64Decode(e.to_string()))?;

        let xml_bytes = deflate_decompress(&b64_decoded)?;
        String::from_utf8(xml_bytes)
            .map_err(|e| SamlError::XmlParse(format!("Invalid UTF-8 in message: {e}")))
    }

    /// Encodes a SAML request into a redirect URL.
    pub fn encode_request(
        xml: &str,
        destination: &str,
        relay_state: Option<&str>,
    ) -> SamlResult<String> {
        let encoded = Self::encode_message(xml)?;
        Self::build_redirect_url(destination, &encoded, SamlMessageType::Request, relay_state)
    }

    /// Encodes a SAML response into a redirect URL.
    pub fn encode_response(
        xml: &str,
        destination: &str,
        relay_state: Option<&str>,
    ) -> SamlResult<String> {
        let encoded = Self::encode_message(xml)?;
        Self::build_redirect_url(destination, &encoded, SamlMessageType::Response, relay_state)
    }

    /// Builds a redirect URL carrying an already-encoded message.
    ///
    /// An existing `SAMLRequest`, `SAMLResponse`, or `RelayState` query
    /// parameter on the destination is replaced rather than duplicated;
    /// other query parameters survive untouched. RelayState is appended
    /// only when non-empty.
    pub fn build_redirect_url(
        destination: &str,
        encoded_message: &str,
        message_type: SamlMessageType,
        relay_state: Option<&str>,
    ) -> SamlResult<String> {
        let mut url = url::Url::parse(destination)
            .map_err(|e| SamlError::Marshal(format!("Invalid destination URL: {e}")))?;

        let retained: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| {
                !matches!(key.as_ref(), "SAMLRequest" | "SAMLResponse" | "RelayState")
            })
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        url.set_query(None);
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &retained {
                pairs.append_pair(key, value);
            }
            pairs.append_pair(message_type.form_param(), encoded_message);
            if let Some(rs) = relay_state.filter(|rs| !rs.is_empty()) {
                pairs.append_pair("RelayState", rs);
            }
        }

        Ok(url.to_string())
    }

    /// Encodes a signed SAML request into a redirect URL.
    ///
    /// The detached signature covers the query parameters, not the XML.
    pub fn encode_signed_request(
        xml: &str,
        destination: &str,
        relay_state: Option<&str>,
        sig_alg: &str,
        signature: &str,
    ) -> SamlResult<String> {
        let mut url = Self::encode_request(xml, destination, relay_state)?;
        url.push_str(&format!("&SigAlg={}", urlencoding::encode(sig_alg)));
        url.push_str(&format!("&Signature={}", urlencoding::encode(signature)));
        Ok(url)
    }

    /// Encodes a signed SAML response into a redirect URL.
    pub fn encode_signed_response(
        xml: &str,
        destination: &str,
        relay_state: Option<&str>,
        sig_alg: &str,
        signature: &str,
    ) -> SamlResult<String> {
        let mut url = Self::encode_response(xml, destination, relay_state)?;
        url.push_str(&format!("&SigAlg={}", urlencoding::encode(sig_alg)));
        url.push_str(&format!("&Signature={}", urlencoding::encode(signature)));
        Ok(url)
    }

    /// Decodes a SAML message from redirect query parameters.
    ///
    /// Parameter values are expected URL-decoded already, the way a query
    /// parser hands them over.
    pub fn decode(
        saml_request: Option<&str>,
        saml_response: Option<&str>,
        relay_state: Option<&str>,
        signature: Option<&str>,
        sig_alg: Option<&str>,
    ) -> SamlResult<DecodedMessage> {
        let (encoded, message_type) = if let Some(req) = saml_request {
            (req, SamlMessageType::Request)
        } else if let Some(resp) = saml_response {
            (resp, SamlMessageType::Response)
        } else {
            return Err(SamlError::MissingParameter(
                "SAMLRequest or SAMLResponse".to_string(),
            ));
        };

        let xml = Self::decode_message(encoded)?;

        Ok(DecodedMessage {
            xml,
            message_type,
            relay_state: relay_state.map(String::from),
            signature: signature.map(String::from),
            sig_alg: sig_alg.map(String::from),
        })
    }

    /// Decodes a message from a full redirect URL.
    pub fn decode_url(url: &str) -> SamlResult<DecodedMessage> {
        let parsed = url::Url::parse(url)
            .map_err(|e| SamlError::Marshal(format!("Invalid URL: {e}")))?;

        let mut saml_request = None;
        let mut saml_response = None;
        let mut relay_state = None;
        let mut signature = None;
        let mut sig_alg = None;

        for (key, value) in parsed.query_pairs() {
            match key.as_ref() {
                "SAMLRequest" => saml_request = Some(value.into_owned()),
                "SAMLResponse" => saml_response = Some(value.into_owned()),
                "RelayState" => relay_state = Some(value.into_owned()),
                "Signature" => signature = Some(value.into_owned()),
                "SigAlg" => sig_alg = Some(value.into_owned()),
                _ => {}
            }
        }

        Self::decode(
            saml_request.as_deref(),
            saml_response.as_deref(),
            relay_state.as_deref(),
            signature.as_deref(),
            sig_alg.as_deref(),
        )
    }

    /// Extracts the portion of a redirect URL's query string covered by a
    /// detached signature: the message parameter, RelayState when present,
    /// and SigAlg. The Signature parameter itself is excluded.
    pub fn extract_signed_query(url: &str) -> SamlResult<String> {
        let parsed = url::Url::parse(url)
            .map_err(|e| SamlError::Marshal(format!("Invalid URL: {e}")))?;

        let mut parts = Vec::new();
        for (key, value) in parsed.query_pairs() {
            match key.as_ref() {
                "SAMLRequest" | "SAMLResponse" | "RelayState" | "SigAlg" => {
                    parts.push(format!("{}={}", key, urlencoding::encode(&value)));
                }
                _ => {}
            }
        }

        if parts.is_empty() {
            return Err(SamlError::MissingParameter(
                "SAMLRequest or SAMLResponse".to_string(),
            ));
        }

        Ok(parts.join("&"))
    }
}

/// Compresses data using raw DEFLATE (no zlib header).
fn deflate_compress(data: &[u8]) -> SamlResult<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| SamlError::Deflate(format!("Compression error: {e}")))?;
    encoder
        .finish()
        .map_err(|e| SamlError::Deflate(format!("Compression finish error: {e}")))
}

/// Decompresses raw DEFLATE data.
fn deflate_decompress(data: &[u8]) -> SamlResult<Vec<u8>> {
    let mut decoder = DeflateDecoder::new(data);
    let mut decompressed = Vec::new();
    decoder
        .read_to_end(&mut decompressed)
        .map_err(|e| SamlError::Deflate(format!("Decompression error: {e}")))?;
    Ok(decompressed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_and_decode_request() {
        let xml = r#"<samlp:AuthnRequest>test content here</samlp:AuthnRequest>"#;
        let url = HttpRedirectBinding::encode_request(
            xml,
            "https://idp.example.com/sso",
            Some("state123"),
        )
        .unwrap();

        assert!(url.starts_with("https://idp.example.com/sso?"));
        assert!(url.contains("SAMLRequest="));
        assert!(url.contains("RelayState=state123"));

        let decoded = HttpRedirectBinding::decode_url(&url).unwrap();
        assert_eq!(decoded.xml, xml);
        assert_eq!(decoded.message_type, SamlMessageType::Request);
        assert_eq!(decoded.relay_state.as_deref(), Some("state123"));
    }

    #[test]
    fn encode_and_decode_response() {
        let xml = r#"<samlp:Response>test response</samlp:Response>"#;
        let url =
            HttpRedirectBinding::encode_response(xml, "https://sp.example.com/acs", None).unwrap();

        assert!(url.contains("SAMLResponse="));
        assert!(!url.contains("RelayState"));

        let decoded = HttpRedirectBinding::decode_url(&url).unwrap();
        assert_eq!(decoded.xml, xml);
        assert_eq!(decoded.message_type, SamlMessageType::Response);
    }

    #[test]
    fn multibyte_message_round_trip() {
        let xml = format!(
            "<samlp:AuthnRequest ProviderName=\"{}\"/>",
            "\u{d615}\u{c2a4}-\u{00e9}\u{00e8}-\u{1f310}"
        );
        let url =
            HttpRedirectBinding::encode_request(&xml, "https://idp.example.com/sso", None).unwrap();
        let decoded = HttpRedirectBinding::decode_url(&url).unwrap();
        assert_eq!(decoded.xml, xml);
    }

    #[test]
    fn empty_relay_state_is_omitted() {
        let url = HttpRedirectBinding::encode_request(
            "<Test/>",
            "https://idp.example.com/sso",
            Some(""),
        )
        .unwrap();
        assert!(!url.contains("RelayState"));
    }

    #[test]
    fn existing_saml_params_are_replaced() {
        let url = HttpRedirectBinding::encode_request(
            "<Test/>",
            "https://idp.example.com/sso?SAMLRequest=stale&RelayState=old&keep=1",
            Some("fresh"),
        )
        .unwrap();

        assert_eq!(url.matches("SAMLRequest=").count(), 1);
        assert!(!url.contains("SAMLRequest=stale"));
        assert!(url.contains("RelayState=fresh"));
        assert!(!url.contains("RelayState=old"));
        assert!(url.contains("keep=1"));
    }

    #[test]
    fn deflate_roundtrip() {
        let original = b"Test data for compression";
        let compressed = deflate_compress(original).unwrap();
        let decompressed = deflate_decompress(&compressed).unwrap();
        assert_eq!(decompressed, original);
    }

    #[test]
    fn compressed_form_is_raw_deflate() {
        // A zlib header would start with 0x78; raw DEFLATE output must not
        // be a zlib stream.
        let compressed = deflate_compress(b"<samlp:AuthnRequest/>").unwrap();
        let mut zlib = flate2::read::ZlibDecoder::new(compressed.as_slice());
        let mut out = Vec::new();
        assert!(zlib.read_to_end(&mut out).is_err());
    }

    #[test]
    fn extract_signed_query_excludes_signature() {
        let url = "https://idp.example.com/sso?SAMLRequest=abc&RelayState=xyz&SigAlg=rsa-sha256&Signature=sig";
        let query = HttpRedirectBinding::extract_signed_query(url).unwrap();

        assert!(query.contains("SAMLRequest="));
        assert!(query.contains("RelayState="));
        assert!(query.contains("SigAlg="));
        assert!(!query.contains("Signature="));
    }
}
