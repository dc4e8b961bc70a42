//! HTTP-POST Binding implementation.
//!
//! SAML messages travel base64-encoded in an auto-submitting HTML form.
//! RelayState is itself base64-encoded on the wire for this binding; a
//! non-empty value that does not decode is a transport error.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::{SamlError, SamlResult};

use super::{DecodedMessage, SamlMessageType};

/// HTTP-POST binding encoder/decoder.
pub struct HttpPostBinding;

impl HttpPostBinding {
    /// Base64-encodes a message for the POST binding (no line breaks).
    #[must_use]
    pub fn encode_message(xml: &str) -> String {
        STANDARD.encode(xml)
    }

    /// Base64-encodes a RelayState value for the POST wire format.
    #[must_use]
    pub fn encode_relay_state(relay_state: &str) -> String {
        STANDARD.encode(relay_state)
    }

    /// Encodes a SAML request into an auto-submitting HTML form.
    #[must_use]
    pub fn encode_request(xml: &str, destination: &str, relay_state: Option<&str>) -> String {
        Self::encode(xml, destination, relay_state, SamlMessageType::Request)
    }

    /// Encodes a SAML response into an auto-submitting HTML form.
    #[must_use]
    pub fn encode_response(xml: &str, destination: &str, relay_state: Option<&str>) -> String {
        Self::encode(xml, destination, relay_state, SamlMessageType::Response)
    }

    fn encode(
        xml: &str,
        destination: &str,
        relay_state: Option<&str>,
        message_type: SamlMessageType,
    ) -> String {
        let encoded = Self::encode_message(xml);
        let param_name = message_type.form_param();

        let relay_state_input = relay_state
            .map(|rs| {
                format!(
                    r#"<input type="hidden" name="RelayState" value="{}"/>"#,
                    html_escape(&Self::encode_relay_state(rs))
                )
            })
            .unwrap_or_default();

        format!(
            r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>SAML POST Binding</title>
</head>
<body onload="document.forms[0].submit()">
    <noscript>
        <p>JavaScript is disabled. Click the button below to continue.</p>
    </noscript>
    <form method="post" action="{}">
        <input type="hidden" name="{}" value="{}"/>
        {}
        <noscript>
            <input type="submit" value="Continue"/>
        </noscript>
    </form>
</body>
</html>"#,
            html_escape(destination),
            param_name,
            encoded,
            relay_state_input
        )
    }

    /// Decodes a SAML message from HTTP-POST form parameters.
    ///
    /// RelayState is base64-decoded; an absent or empty value passes
    /// through untouched, anything else must decode to UTF-8 text.
    pub fn decode(
        saml_request: Option<&str>,
        saml_response: Option<&str>,
        relay_state: Option<&str>,
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

        let decoded = STANDARD
            .decode(encoded)
            .map_err(|e| SamlError::Base64Decode(e.to_string()))?;

        let xml = String::from_utf8(decoded)
            .map_err(|e| SamlError::XmlParse(format!("Invalid UTF-8 in message: {e}")))?;

        let relay_state = relay_state
            .map(|rs| {
                if rs.is_empty() {
                    return Ok(String::new());
                }
                let bytes = STANDARD
                    .decode(rs)
                    .map_err(|e| SamlError::Base64Decode(format!("Invalid RelayState: {e}")))?;
                String::from_utf8(bytes)
                    .map_err(|e| SamlError::XmlParse(format!("Invalid UTF-8 in RelayState: {e}")))
            })
            .transpose()?;

        Ok(DecodedMessage {
            xml,
            message_type,
            relay_state,
            signature: None,
            sig_alg: None,
        })
    }
}

/// Escapes HTML special characters.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract_form_value(html: &str, param: &str) -> String {
        let marker = format!("name=\"{param}\" value=\"");
        let start = html.find(&marker).unwrap() + marker.len();
        let end = html[start..].find('"').unwrap();
        html[start..start + end].to_string()
    }

    #[test]
    fn encode_and_decode_request() {
        let xml = r#"<samlp:AuthnRequest>test</samlp:AuthnRequest>"#;
        let html =
            HttpPostBinding::encode_request(xml, "https://idp.example.com", Some("state123"));

        assert!(html.contains("SAMLRequest"));
        assert!(html.contains("RelayState"));
        assert!(html.contains("https://idp.example.com"));

        let encoded = extract_form_value(&html, "SAMLRequest");
        assert!(!encoded.contains('\n'));

        let relay = extract_form_value(&html, "RelayState");
        let decoded = HttpPostBinding::decode(Some(&encoded), None, Some(&relay)).unwrap();
        assert_eq!(decoded.xml, xml);
        assert_eq!(decoded.message_type, SamlMessageType::Request);
        assert_eq!(decoded.relay_state.as_deref(), Some("state123"));
    }

    #[test]
    fn encode_and_decode_response() {
        let xml = r#"<samlp:Response>test</samlp:Response>"#;
        let html = HttpPostBinding::encode_response(xml, "https://sp.example.com", None);

        assert!(html.contains("SAMLResponse"));

        let encoded = extract_form_value(&html, "SAMLResponse");
        let decoded = HttpPostBinding::decode(None, Some(&encoded), None).unwrap();
        assert_eq!(decoded.xml, xml);
        assert_eq!(decoded.message_type, SamlMessageType::Response);
        assert!(decoded.relay_state.is_none());
    }

    #[test]
    fn relay_state_is_base64_on_the_wire() {
        let html = HttpPostBinding::encode_request(
            "<x/>",
            "https://idp.example.com",
            Some("target=/app?next=1"),
        );
        let relay = extract_form_value(&html, "RelayState");
        assert_ne!(relay, "target=/app?next=1");
        assert_eq!(
            STANDARD.decode(&relay).unwrap(),
            b"target=/app?next=1".to_vec()
        );
    }

    #[test]
    fn multibyte_message_round_trip() {
        let xml = format!(
            "<samlp:Response><saml:NameID>{}</saml:NameID></samlp:Response>",
            "\u{6d4b}\u{8bd5}-\u{1f512}"
        );
        let encoded = HttpPostBinding::encode_message(&xml);
        let decoded = HttpPostBinding::decode(None, Some(&encoded), None).unwrap();
        assert_eq!(decoded.xml, xml);
    }

    #[test]
    fn raw_relay_state_is_rejected() {
        let encoded = HttpPostBinding::encode_message("<x/>");

        // A raw (unencoded) RelayState must not slip through.
        let err = HttpPostBinding::decode(Some(&encoded), None, Some("target=/app?next=1"))
            .unwrap_err();
        assert!(matches!(err, SamlError::Base64Decode(_)));

        // Empty values pass through untouched.
        let decoded = HttpPostBinding::decode(Some(&encoded), None, Some("")).unwrap();
        assert_eq!(decoded.relay_state.as_deref(), Some(""));
    }

    #[test]
    fn decode_missing_message() {
        let err = HttpPostBinding::decode(None, None, None).unwrap_err();
        assert!(matches!(err, SamlError::MissingParameter(_)));
    }

    #[test]
    fn html_escape_special_chars() {
        let input = r#"<script>alert("xss")</script>"#;
        let escaped = html_escape(input);
        assert!(!escaped.contains('<'));
        assert!(!escaped.contains('>'));
        assert!(!escaped.contains('"'));
    }
}
