//! SAML XML marshaling and unmarshaling.
//!
//! Serialization uses string templates; parsing of full protocol messages
//! goes through `quick-xml`. A handful of string-scanning helpers are
//! shared with the signature module, which operates on raw document text
//! so that signed bytes are never re-serialized.

use chrono::{DateTime, Utc};
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{SamlError, SamlResult};
use crate::types::{
    Assertion, AuthnContext, AuthnRequest, AuthnStatement, Conditions, NameId, Response, Status,
    StatusCode, Subject, SubjectConfirmation, SubjectConfirmationData, SAMLP_NS, SAML_NS,
};

/// Escapes a string for use in XML text content or attribute values.
#[must_use]
pub fn xml_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Formats a timestamp as an `xs:dateTime` in UTC.
#[must_use]
pub fn format_instant(instant: DateTime<Utc>) -> String {
    instant.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Parses an `xs:dateTime` timestamp into UTC.
pub fn parse_instant(value: &str) -> SamlResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| SamlError::XmlParse(format!("Invalid timestamp '{value}': {e}")))
}

fn push_attr(attrs: &mut String, name: &str, value: &str) {
    attrs.push_str(&format!(" {}=\"{}\"", name, xml_escape(value)));
}

/// Serializes an AuthnRequest to XML.
///
/// `ForceAuthn` is written only when set; optional attributes are omitted
/// entirely rather than serialized empty.
pub fn serialize_authn_request(request: &AuthnRequest) -> SamlResult<String> {
    request.validate().map_err(SamlError::Marshal)?;

    let mut attrs = String::new();
    if let Some(ref destination) = request.destination {
        push_attr(&mut attrs, "Destination", destination);
    }
    if let Some(ref acs_url) = request.assertion_consumer_service_url {
        push_attr(&mut attrs, "AssertionConsumerServiceURL", acs_url);
    }
    if let Some(index) = request.assertion_consumer_service_index {
        push_attr(&mut attrs, "AssertionConsumerServiceIndex", &index.to_string());
    }
    if let Some(ref binding) = request.protocol_binding {
        push_attr(&mut attrs, "ProtocolBinding", binding);
    }
    if let Some(ref name) = request.provider_name {
        push_attr(&mut attrs, "ProviderName", name);
    }
    if request.force_authn {
        attrs.push_str(" ForceAuthn=\"true\"");
    }

    Ok(format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<samlp:AuthnRequest xmlns:samlp="{samlp}" xmlns:saml="{saml}" ID="{id}" Version="{version}" IssueInstant="{instant}"{attrs}>
<saml:Issuer>{issuer}</saml:Issuer>
</samlp:AuthnRequest>"#,
        samlp = SAMLP_NS,
        saml = SAML_NS,
        id = xml_escape(&request.id),
        version = xml_escape(&request.version),
        instant = format_instant(request.issue_instant),
        attrs = attrs,
        issuer = xml_escape(&request.issuer),
    ))
}

/// Serializes a Response to XML.
///
/// An empty destination is not written to the wire.
pub fn serialize_response(response: &Response) -> SamlResult<String> {
    response.validate().map_err(SamlError::Marshal)?;

    let mut attrs = String::new();
    if let Some(ref in_response_to) = response.in_response_to {
        push_attr(&mut attrs, "InResponseTo", in_response_to);
    }
    if !response.destination.is_empty() {
        push_attr(&mut attrs, "Destination", &response.destination);
    }

    let assertions_xml: String = response
        .assertions
        .iter()
        .map(|a| serialize_assertion(a))
        .collect::<SamlResult<Vec<_>>>()?
        .join("\n");

    Ok(format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<samlp:Response xmlns:samlp="{samlp}" xmlns:saml="{saml}" ID="{id}" Version="{version}" IssueInstant="{instant}"{attrs}>
<saml:Issuer>{issuer}</saml:Issuer>
{status}{assertions}
</samlp:Response>"#,
        samlp = SAMLP_NS,
        saml = SAML_NS,
        id = xml_escape(&response.id),
        version = xml_escape(&response.version),
        instant = format_instant(response.issue_instant),
        attrs = attrs,
        issuer = xml_escape(&response.issuer),
        status = serialize_status(&response.status),
        assertions = if assertions_xml.is_empty() {
            String::new()
        } else {
            format!("\n{assertions_xml}")
        },
    ))
}

fn serialize_status(status: &Status) -> String {
    let code = if let Some(sub) = status.status_code.status_code.as_deref() {
        format!(
            "<samlp:StatusCode Value=\"{}\">\n<samlp:StatusCode Value=\"{}\"/>\n</samlp:StatusCode>",
            xml_escape(&status.status_code.value),
            xml_escape(&sub.value),
        )
    } else {
        format!(
            "<samlp:StatusCode Value=\"{}\"/>",
            xml_escape(&status.status_code.value)
        )
    };

    let message = status
        .status_message
        .as_deref()
        .map(|m| format!("\n<samlp:StatusMessage>{}</samlp:StatusMessage>", xml_escape(m)))
        .unwrap_or_default();

    format!("<samlp:Status>\n{code}{message}\n</samlp:Status>")
}

/// Serializes an Assertion to XML.
pub fn serialize_assertion(assertion: &Assertion) -> SamlResult<String> {
    let subject_xml = assertion
        .subject
        .as_ref()
        .map(serialize_subject)
        .unwrap_or_default();

    let conditions_xml = assertion
        .conditions
        .as_ref()
        .map(serialize_conditions)
        .unwrap_or_default();

    let statement_xml = assertion
        .authn_statement
        .as_ref()
        .map(serialize_authn_statement)
        .unwrap_or_default();

    Ok(format!(
        r#"<saml:Assertion xmlns:saml="{saml}" ID="{id}" Version="{version}" IssueInstant="{instant}">
<saml:Issuer>{issuer}</saml:Issuer>{subject}{conditions}{statement}
</saml:Assertion>"#,
        saml = SAML_NS,
        id = xml_escape(&assertion.id),
        version = xml_escape(&assertion.version),
        instant = format_instant(assertion.issue_instant),
        issuer = xml_escape(&assertion.issuer),
        subject = subject_xml,
        conditions = conditions_xml,
        statement = statement_xml,
    ))
}

fn serialize_subject(subject: &Subject) -> String {
    let name_id_xml = subject
        .name_id
        .as_ref()
        .map(|name_id| {
            let format_attr = name_id
                .format
                .as_deref()
                .map(|f| format!(" Format=\"{}\"", xml_escape(f)))
                .unwrap_or_default();
            format!(
                "\n<saml:NameID{}>{}</saml:NameID>",
                format_attr,
                xml_escape(&name_id.value)
            )
        })
        .unwrap_or_default();

    let confirmations: String = subject
        .subject_confirmations
        .iter()
        .map(serialize_subject_confirmation)
        .collect();

    format!("\n<saml:Subject>{name_id_xml}{confirmations}\n</saml:Subject>")
}

fn serialize_subject_confirmation(confirmation: &SubjectConfirmation) -> String {
    let data_xml = confirmation
        .subject_confirmation_data
        .as_ref()
        .map(|data| {
            let mut attrs = String::new();
            if let Some(ref in_response_to) = data.in_response_to {
                push_attr(&mut attrs, "InResponseTo", in_response_to);
            }
            if let Some(not_on_or_after) = data.not_on_or_after {
                push_attr(&mut attrs, "NotOnOrAfter", &format_instant(not_on_or_after));
            }
            if let Some(ref recipient) = data.recipient {
                push_attr(&mut attrs, "Recipient", recipient);
            }
            format!("\n<saml:SubjectConfirmationData{attrs}/>")
        })
        .unwrap_or_default();

    format!(
        "\n<saml:SubjectConfirmation Method=\"{}\">{}\n</saml:SubjectConfirmation>",
        xml_escape(&confirmation.method),
        data_xml
    )
}

fn serialize_conditions(conditions: &Conditions) -> String {
    let mut attrs = String::new();
    if let Some(not_before) = conditions.not_before {
        push_attr(&mut attrs, "NotBefore", &format_instant(not_before));
    }
    if let Some(not_on_or_after) = conditions.not_on_or_after {
        push_attr(&mut attrs, "NotOnOrAfter", &format_instant(not_on_or_after));
    }
    format!("\n<saml:Conditions{attrs}/>")
}

fn serialize_authn_statement(statement: &AuthnStatement) -> String {
    let session_attr = statement
        .session_index
        .as_deref()
        .map(|s| format!(" SessionIndex=\"{}\"", xml_escape(s)))
        .unwrap_or_default();

    let class_ref = statement
        .authn_context
        .authn_context_class_ref
        .as_deref()
        .map(|c| format!("\n<saml:AuthnContextClassRef>{}</saml:AuthnContextClassRef>", xml_escape(c)))
        .unwrap_or_default();

    format!(
        "\n<saml:AuthnStatement AuthnInstant=\"{}\"{}>\n<saml:AuthnContext>{}\n</saml:AuthnContext>\n</saml:AuthnStatement>",
        format_instant(statement.authn_instant),
        session_attr,
        class_ref
    )
}

fn attr_error(e: impl std::fmt::Display) -> SamlError {
    SamlError::XmlParse(format!("Invalid XML attribute: {e}"))
}

/// Parses an AuthnRequest from XML.
pub fn parse_authn_request(xml: &str) -> SamlResult<AuthnRequest> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut id = None;
    let mut version = None;
    let mut issue_instant = None;
    let mut issuer = None;
    let mut request = AuthnRequest::new("");

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e)
                if e.local_name().as_ref() == b"AuthnRequest" =>
            {
                for attr in e.attributes() {
                    let attr = attr.map_err(attr_error)?;
                    let value = attr.unescape_value().map_err(attr_error)?.into_owned();
                    match attr.key.local_name().as_ref() {
                        b"ID" => id = Some(value),
                        b"Version" => version = Some(value),
                        b"IssueInstant" => issue_instant = Some(parse_instant(&value)?),
                        b"Destination" => request.destination = Some(value),
                        b"AssertionConsumerServiceURL" => {
                            request.assertion_consumer_service_url = Some(value);
                        }
                        b"AssertionConsumerServiceIndex" => {
                            request.assertion_consumer_service_index =
                                Some(value.parse().map_err(|e| {
                                    SamlError::XmlParse(format!("Invalid ACS index: {e}"))
                                })?);
                        }
                        b"ProtocolBinding" => request.protocol_binding = Some(value),
                        b"ProviderName" => request.provider_name = Some(value),
                        b"ForceAuthn" => request.force_authn = value == "true",
                        _ => {}
                    }
                }
            }
            Event::Start(e) if e.local_name().as_ref() == b"Issuer" => {
                issuer = Some(reader.read_text(e.name())?.into_owned());
            }
            Event::Eof => break,
            _ => {}
        }
    }

    request.id = id.ok_or_else(|| SamlError::MissingElement("AuthnRequest ID".to_string()))?;
    request.version = version
        .ok_or_else(|| SamlError::MissingElement("AuthnRequest Version".to_string()))?;
    request.issue_instant = issue_instant
        .ok_or_else(|| SamlError::MissingElement("AuthnRequest IssueInstant".to_string()))?;
    request.issuer = issuer.ok_or_else(|| SamlError::MissingElement("Issuer".to_string()))?;

    request
        .validate()
        .map_err(SamlError::XmlParse)?;

    Ok(request)
}

#[derive(Default)]
struct AssertionAcc {
    id: Option<String>,
    version: Option<String>,
    issue_instant: Option<DateTime<Utc>>,
    issuer: Option<String>,
    name_id: Option<NameId>,
    confirmation_method: Option<String>,
    confirmation_data: Option<SubjectConfirmationData>,
    conditions: Option<Conditions>,
    authn_instant: Option<DateTime<Utc>>,
    session_index: Option<String>,
    authn_context_class_ref: Option<String>,
}

impl AssertionAcc {
    fn build(self) -> SamlResult<Assertion> {
        let id = self
            .id
            .ok_or_else(|| SamlError::MissingElement("Assertion ID".to_string()))?;
        let issuer = self
            .issuer
            .ok_or_else(|| SamlError::MissingElement("Assertion Issuer".to_string()))?;

        let mut assertion = Assertion::with_id(id, issuer);
        if let Some(version) = self.version {
            assertion.version = version;
        }
        if let Some(instant) = self.issue_instant {
            assertion.issue_instant = instant;
        }

        if let Some(name_id) = self.name_id {
            let mut subject = Subject::new(name_id);
            if let Some(method) = self.confirmation_method {
                let mut confirmation = SubjectConfirmation {
                    method,
                    subject_confirmation_data: None,
                };
                confirmation.subject_confirmation_data = self.confirmation_data;
                subject = subject.with_confirmation(confirmation);
            }
            assertion.subject = Some(subject);
        }

        assertion.conditions = self.conditions;

        if let Some(class_ref) = self.authn_context_class_ref {
            assertion.authn_statement = Some(AuthnStatement {
                authn_instant: self.authn_instant.unwrap_or_else(Utc::now),
                session_index: self.session_index,
                authn_context: AuthnContext {
                    authn_context_class_ref: Some(class_ref),
                },
            });
        }

        Ok(assertion)
    }
}

/// Parses a Response from XML.
///
/// Signature elements embedded in the document are skipped here; signature
/// verification works on the raw text separately.
pub fn parse_response(xml: &str) -> SamlResult<Response> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut id = None;
    let mut version = None;
    let mut issue_instant = None;
    let mut issuer = None;
    let mut in_response_to = None;
    let mut destination = String::new();
    let mut status_codes: Vec<String> = Vec::new();
    let mut status_message = None;
    let mut assertions = Vec::new();

    let mut in_assertion = false;
    let mut in_signature = false;
    let mut acc = AssertionAcc::default();

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.local_name().as_ref() == b"Signature" => {
                in_signature = true;
            }
            Event::Empty(e) if e.local_name().as_ref() == b"Signature" => {}
            Event::End(e) if e.local_name().as_ref() == b"Signature" => {
                in_signature = false;
            }
            _ if in_signature => {}
            Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                b"Response" => {
                    for attr in e.attributes() {
                        let attr = attr.map_err(attr_error)?;
                        let value = attr.unescape_value().map_err(attr_error)?.into_owned();
                        match attr.key.local_name().as_ref() {
                            b"ID" => id = Some(value),
                            b"Version" => version = Some(value),
                            b"IssueInstant" => issue_instant = Some(parse_instant(&value)?),
                            b"InResponseTo" => in_response_to = Some(value),
                            b"Destination" => destination = value,
                            _ => {}
                        }
                    }
                }
                b"Assertion" => {
                    in_assertion = true;
                    acc = AssertionAcc::default();
                    for attr in e.attributes() {
                        let attr = attr.map_err(attr_error)?;
                        let value = attr.unescape_value().map_err(attr_error)?.into_owned();
                        match attr.key.local_name().as_ref() {
                            b"ID" => acc.id = Some(value),
                            b"Version" => acc.version = Some(value),
                            b"IssueInstant" => acc.issue_instant = Some(parse_instant(&value)?),
                            _ => {}
                        }
                    }
                }
                b"Issuer" => {
                    let value = reader.read_text(e.name())?.into_owned();
                    if in_assertion {
                        acc.issuer = Some(value);
                    } else {
                        issuer = Some(value);
                    }
                }
                b"StatusCode" => {
                    for attr in e.attributes() {
                        let attr = attr.map_err(attr_error)?;
                        if attr.key.local_name().as_ref() == b"Value" {
                            status_codes
                                .push(attr.unescape_value().map_err(attr_error)?.into_owned());
                        }
                    }
                }
                b"StatusMessage" => {
                    status_message = Some(reader.read_text(e.name())?.into_owned());
                }
                b"NameID" => {
                    let mut format = None;
                    for attr in e.attributes() {
                        let attr = attr.map_err(attr_error)?;
                        if attr.key.local_name().as_ref() == b"Format" {
                            format = Some(attr.unescape_value().map_err(attr_error)?.into_owned());
                        }
                    }
                    let value = reader.read_text(e.name())?.into_owned();
                    acc.name_id = Some(NameId { value, format });
                }
                b"SubjectConfirmation" => {
                    for attr in e.attributes() {
                        let attr = attr.map_err(attr_error)?;
                        if attr.key.local_name().as_ref() == b"Method" {
                            acc.confirmation_method =
                                Some(attr.unescape_value().map_err(attr_error)?.into_owned());
                        }
                    }
                }
                b"SubjectConfirmationData" => {
                    let mut data = SubjectConfirmationData::default();
                    for attr in e.attributes() {
                        let attr = attr.map_err(attr_error)?;
                        let value = attr.unescape_value().map_err(attr_error)?.into_owned();
                        match attr.key.local_name().as_ref() {
                            b"InResponseTo" => data.in_response_to = Some(value),
                            b"NotOnOrAfter" => {
                                data.not_on_or_after = Some(parse_instant(&value)?);
                            }
                            b"Recipient" => data.recipient = Some(value),
                            _ => {}
                        }
                    }
                    acc.confirmation_data = Some(data);
                }
                b"Conditions" => {
                    let mut conditions = Conditions::default();
                    for attr in e.attributes() {
                        let attr = attr.map_err(attr_error)?;
                        let value = attr.unescape_value().map_err(attr_error)?.into_owned();
                        match attr.key.local_name().as_ref() {
                            b"NotBefore" => conditions.not_before = Some(parse_instant(&value)?),
                            b"NotOnOrAfter" => {
                                conditions.not_on_or_after = Some(parse_instant(&value)?);
                            }
                            _ => {}
                        }
                    }
                    acc.conditions = Some(conditions);
                }
                b"AuthnStatement" => {
                    for attr in e.attributes() {
                        let attr = attr.map_err(attr_error)?;
                        let value = attr.unescape_value().map_err(attr_error)?.into_owned();
                        match attr.key.local_name().as_ref() {
                            b"AuthnInstant" => acc.authn_instant = Some(parse_instant(&value)?),
                            b"SessionIndex" => acc.session_index = Some(value),
                            _ => {}
                        }
                    }
                }
                b"AuthnContextClassRef" => {
                    acc.authn_context_class_ref = Some(reader.read_text(e.name())?.into_owned());
                }
                _ => {}
            },
            Event::End(e) if e.local_name().as_ref() == b"Assertion" => {
                in_assertion = false;
                assertions.push(std::mem::take(&mut acc).build()?);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let status_code_value = status_codes
        .first()
        .cloned()
        .ok_or_else(|| SamlError::MissingElement("StatusCode".to_string()))?;
    let mut status_code = StatusCode::new(status_code_value);
    if let Some(sub) = status_codes.get(1) {
        status_code = status_code.with_sub_status(StatusCode::new(sub.clone()));
    }

    let mut response = Response::with_id(
        id.ok_or_else(|| SamlError::MissingElement("Response ID".to_string()))?,
        issuer.ok_or_else(|| SamlError::MissingElement("Issuer".to_string()))?,
        Status {
            status_code,
            status_message,
        },
    );
    response.version =
        version.ok_or_else(|| SamlError::MissingElement("Response Version".to_string()))?;
    response.issue_instant = issue_instant
        .ok_or_else(|| SamlError::MissingElement("Response IssueInstant".to_string()))?;
    response.in_response_to = in_response_to;
    response.destination = destination;
    response.assertions = assertions;

    response.validate().map_err(SamlError::XmlParse)?;

    Ok(response)
}

const NS_PREFIXES: &[&str] = &["samlp:", "saml:", "saml2:", "ds:", "md:"];

/// Extracts an attribute value from the first occurrence of an element,
/// with or without a namespace prefix.
pub(crate) fn extract_attribute(xml: &str, element: &str, attribute: &str) -> Option<String> {
    let mut patterns = vec![format!("<{element}")];
    for prefix in NS_PREFIXES {
        patterns.push(format!("<{prefix}{element}"));
    }

    for pattern in &patterns {
        if let Some(pos) = xml.find(pattern.as_str()) {
            let end = xml[pos..].find('>')?;
            let element_str = &xml[pos..pos + end];

            let attr_pattern = format!("{attribute}=\"");
            if let Some(attr_start) = element_str.find(&attr_pattern) {
                let value_start = attr_start + attr_pattern.len();
                let value_end = element_str[value_start..].find('"')?;
                return Some(element_str[value_start..value_start + value_end].to_string());
            }
        }
    }
    None
}

/// Extracts the text content of the first occurrence of an element, with
/// or without a namespace prefix. Attributes on the opening tag are
/// tolerated.
pub(crate) fn extract_element_content(xml: &str, element: &str) -> Option<String> {
    let mut patterns = vec![(format!("<{element}"), format!("</{element}>"))];
    for prefix in NS_PREFIXES {
        patterns.push((format!("<{prefix}{element}"), format!("</{prefix}{element}>")));
    }

    for (open, close) in &patterns {
        if let Some(start) = xml.find(open.as_str()) {
            // Reject prefix collisions like "<SignatureValue" matching "<Signature".
            let after = xml[start + open.len()..].chars().next()?;
            if after != '>' && after != ' ' && after != '/' && after != '\n' {
                continue;
            }
            let tag_end = start + xml[start..].find('>')?;
            if xml.as_bytes().get(tag_end - 1) == Some(&b'/') {
                return Some(String::new());
            }
            let content_start = tag_end + 1;
            let end = xml[content_start..].find(close.as_str())?;
            return Some(xml[content_start..content_start + end].trim().to_string());
        }
    }
    None
}

/// Extracts the complete subtree of the element carrying the given ID.
pub(crate) fn extract_element_by_id(xml: &str, reference_id: &str) -> SamlResult<String> {
    let id_pattern = format!("ID=\"{reference_id}\"");
    let alt_pattern = format!("Id=\"{reference_id}\"");

    let pos = xml
        .find(&id_pattern)
        .or_else(|| xml.find(&alt_pattern))
        .ok_or_else(|| {
            SamlError::MissingElement(format!("Element with ID '{reference_id}' not found"))
        })?;

    let mut start = pos;
    while start > 0 && xml.as_bytes()[start - 1] != b'<' {
        start -= 1;
    }
    if start > 0 {
        start -= 1;
    }

    extract_element_at(xml, start)
}

/// Extracts a complete XML element starting at the given byte offset.
pub(crate) fn extract_element_at(xml: &str, start: usize) -> SamlResult<String> {
    let xml_bytes = xml.as_bytes();

    let mut name_end = start + 1;
    while name_end < xml.len() && xml_bytes[name_end] != b' ' && xml_bytes[name_end] != b'>' {
        name_end += 1;
    }
    let full_tag_name = &xml[start + 1..name_end];

    let close_pattern = format!("</{full_tag_name}>");
    if let Some(close_pos) = xml[start..].find(&close_pattern) {
        return Ok(xml[start..start + close_pos + close_pattern.len()].to_string());
    }

    // Fall back to the local name when the closing tag carries a different
    // prefix arrangement.
    let local_name = full_tag_name.split(':').next_back().unwrap_or(full_tag_name);
    let close_pattern = format!("</{local_name}");
    let close_pos = xml[start..].find(&close_pattern).ok_or_else(|| {
        SamlError::XmlParse(format!("Unclosed XML element '{full_tag_name}'"))
    })?;
    let end_pos = xml[start + close_pos..]
        .find('>')
        .map(|pos| start + close_pos + pos + 1)
        .ok_or_else(|| SamlError::XmlParse("Malformed closing tag".to_string()))?;

    Ok(xml[start..end_pos].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AuthnContextClass, SamlBinding};

    #[test]
    fn authn_request_round_trip() {
        let request = AuthnRequest::new("https://sp.example.com")
            .with_acs_url("https://sp.example.com/acs?tenant=a&b=c")
            .with_destination("https://idp.example.com/sso")
            .with_binding(SamlBinding::HttpPost)
            .with_provider_name("Example SP")
            .force_authn(true);

        let xml = serialize_authn_request(&request).unwrap();
        assert!(xml.contains("ForceAuthn=\"true\""));
        assert!(xml.contains("tenant=a&amp;b=c"));

        let parsed = parse_authn_request(&xml).unwrap();
        assert_eq!(parsed.id, request.id);
        assert_eq!(parsed.issuer, request.issuer);
        assert_eq!(
            parsed.assertion_consumer_service_url.as_deref(),
            Some("https://sp.example.com/acs?tenant=a&b=c")
        );
        assert!(parsed.force_authn);
        assert_eq!(parsed.provider_name.as_deref(), Some("Example SP"));
    }

    #[test]
    fn force_authn_omitted_when_false() {
        let request = AuthnRequest::new("https://sp.example.com");
        let xml = serialize_authn_request(&request).unwrap();
        assert!(!xml.contains("ForceAuthn"));

        let parsed = parse_authn_request(&xml).unwrap();
        assert!(!parsed.force_authn);
    }

    #[test]
    fn response_round_trip() {
        let assertion = Assertion::new("https://idp.example.com")
            .with_subject(
                Subject::new(NameId::new("alice")).with_confirmation(
                    SubjectConfirmation::bearer().with_data(SubjectConfirmationData::for_request(
                        "_req1",
                        "https://sp.example.com/acs",
                        Utc::now() + chrono::Duration::minutes(5),
                    )),
                ),
            )
            .with_conditions(Conditions::for_window(Utc::now(), 5))
            .with_authn_statement(AuthnStatement::new(AuthnContextClass::Password));

        let response = Response::success("https://idp.example.com")
            .in_response_to("_req1")
            .with_destination("https://sp.example.com/acs")
            .with_assertion(assertion);

        let xml = serialize_response(&response).unwrap();
        let parsed = parse_response(&xml).unwrap();

        assert_eq!(parsed.id, response.id);
        assert!(parsed.is_success());
        assert_eq!(parsed.in_response_to.as_deref(), Some("_req1"));
        assert_eq!(parsed.destination, "https://sp.example.com/acs");

        let assertion = parsed.first_assertion().unwrap();
        assert_eq!(assertion.name_id_value(), Some("alice"));
        let conditions = assertion.conditions.as_ref().unwrap();
        assert!(conditions.not_before.is_some());
        assert!(conditions.not_on_or_after.is_some());
        let statement = assertion.authn_statement.as_ref().unwrap();
        assert_eq!(
            statement.authn_context.authn_context_class_ref.as_deref(),
            Some(AuthnContextClass::Password.uri())
        );
    }

    #[test]
    fn failure_response_round_trip() {
        let response = Response::with_status(
            "https://idp.example.com",
            Status::authn_failed("Invalid credentials"),
        )
        .in_response_to("_req2");

        let xml = serialize_response(&response).unwrap();
        assert!(!xml.contains("Destination"));
        assert!(!xml.contains("<saml:Assertion"));

        let parsed = parse_response(&xml).unwrap();
        assert!(!parsed.is_success());
        assert!(parsed.assertions.is_empty());
        assert_eq!(
            parsed.status.status_code.sub_status_value(),
            Some(crate::types::sub_status_codes::AUTHN_FAILED)
        );
        assert_eq!(
            parsed.status.status_message.as_deref(),
            Some("Invalid credentials")
        );
    }

    #[test]
    fn multibyte_name_id_survives_round_trip() {
        let name = "L\u{e9}a-\u{6d4b}\u{8bd5}-\u{1f511}";
        let assertion =
            Assertion::new("https://idp.example.com").with_subject(Subject::new(NameId::new(name)));
        let response = Response::success("https://idp.example.com").with_assertion(assertion);

        let xml = serialize_response(&response).unwrap();
        let parsed = parse_response(&xml).unwrap();
        assert_eq!(
            parsed.first_assertion().and_then(Assertion::name_id_value),
            Some(name)
        );
    }

    #[test]
    fn escaping() {
        assert_eq!(xml_escape("a&b<c>\"d\""), "a&amp;b&lt;c&gt;&quot;d&quot;");
    }

    #[test]
    fn extract_helpers() {
        let xml = r##"<ds:Reference URI="#_123"><ds:DigestValue>abc</ds:DigestValue></ds:Reference>"##;
        assert_eq!(
            extract_attribute(xml, "Reference", "URI").as_deref(),
            Some("#_123")
        );
        assert_eq!(
            extract_element_content(xml, "DigestValue").as_deref(),
            Some("abc")
        );
    }

    #[test]
    fn extract_subtree_by_id() {
        let xml = r#"<samlp:Response ID="_r"><saml:Assertion ID="_a"><saml:Issuer>idp</saml:Issuer></saml:Assertion></samlp:Response>"#;
        let subtree = extract_element_by_id(xml, "_a").unwrap();
        assert!(subtree.starts_with("<saml:Assertion"));
        assert!(subtree.ends_with("</saml:Assertion>"));
    }
}
