//! Typed decoders for the messages the provider accepts.
//!
//! Incoming documents are parsed into a small element tree first and mapped
//! onto the value objects from there. Namespace prefixes are not significant
//! for any of the accepted messages, so elements and attributes are matched
//! by local name.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use flate2::read::DeflateDecoder;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::Read;

use crate::constants::ENCODING_DEFLATE;
use crate::error::XmlError;
use crate::md::{
    EncryptionMethodType, EndpointType, EntityDescriptorType, IndexedEndpointType,
    KeyDescriptorType, SpSsoDescriptorType,
};
use crate::saml::{
    AssertionType, AttributeStatementType, AttributeType, AudienceRestrictionType, ConditionsType,
    NameIdType, SubjectType,
};
use crate::samlp::{
    AttributeQueryType, AuthnRequestType, LogoutRequestType, ResponseType, StatusCodeType,
    StatusType,
};
use crate::xml_dsig::{KeyInfoType, SignatureType, X509DataType};

/// Reverses the transfer encoding of a SAML message.
///
/// When `is_base64` is set the message is Base64-decoded first. An empty
/// `encoding` returns the bytes as-is, the DEFLATE URL-encoding inflates
/// them, anything else is rejected.
pub fn inflate_and_decode(
    encoding: &str,
    is_base64: bool,
    message: &str,
) -> Result<Vec<u8>, XmlError> {
    let data = if is_base64 {
        let compact: String = message.chars().filter(|c| !c.is_whitespace()).collect();
        STANDARD.decode(compact)?
    } else {
        message.as_bytes().to_vec()
    };

    match encoding {
        "" => Ok(data),
        ENCODING_DEFLATE => {
            let mut inflated = Vec::new();
            DeflateDecoder::new(data.as_slice()).read_to_end(&mut inflated)?;
            Ok(inflated)
        }
        other => Err(XmlError::MalformedEncoding(format!(
            "unknown encoding {other}"
        ))),
    }
}

/// Decodes an `AuthnRequest` from its transfer representation.
pub fn decode_authn_request(encoding: &str, message: &str) -> Result<AuthnRequestType, XmlError> {
    let data = inflate_and_decode(encoding, true, message)?;
    let root = parse_document(&data)?;
    expect_root(&root, "AuthnRequest")?;

    Ok(AuthnRequestType {
        id: root.attr("ID"),
        version: root.attr("Version"),
        issue_instant: root.attr("IssueInstant"),
        destination: root.attr("Destination"),
        protocol_binding: root.attr("ProtocolBinding"),
        assertion_consumer_service_url: root.attr("AssertionConsumerServiceURL"),
        assertion_consumer_service_index: root.attr("AssertionConsumerServiceIndex"),
        issuer: root.child("Issuer").map(map_name_id).unwrap_or_default(),
        conditions: root.child("Conditions").map(map_conditions),
        signature: root.child("Signature").map(map_signature),
    })
}

/// Decodes a `LogoutRequest` from its transfer representation.
pub fn decode_logout_request(encoding: &str, message: &str) -> Result<LogoutRequestType, XmlError> {
    let data = inflate_and_decode(encoding, true, message)?;
    let root = parse_document(&data)?;
    expect_root(&root, "LogoutRequest")?;

    Ok(LogoutRequestType {
        id: root.attr("ID"),
        version: root.attr("Version"),
        issue_instant: root.attr("IssueInstant"),
        not_on_or_after: root.attr("NotOnOrAfter"),
        destination: root.attr("Destination"),
        issuer: root.child("Issuer").map(map_name_id).unwrap_or_default(),
        name_id: root.child("NameID").map(map_name_id).unwrap_or_default(),
        session_index: root.children("SessionIndex").map(|e| e.text()).collect(),
    })
}

/// Decodes a `Response` from its transfer representation.
pub fn decode_response(
    encoding: &str,
    is_base64: bool,
    message: &str,
) -> Result<ResponseType, XmlError> {
    let data = inflate_and_decode(encoding, is_base64, message)?;
    let root = parse_document(&data)?;
    expect_root(&root, "Response")?;

    Ok(ResponseType {
        id: root.attr("ID"),
        version: root.attr("Version"),
        issue_instant: root.attr("IssueInstant"),
        destination: root.attr("Destination"),
        in_response_to: root.attr("InResponseTo"),
        issuer: root.child("Issuer").map(map_name_id),
        status: root.child("Status").map(map_status).unwrap_or_default(),
        assertion: root.child("Assertion").map(map_assertion),
    })
}

/// Decodes a standalone `Signature` element.
pub fn decode_signature(
    encoding: &str,
    is_base64: bool,
    message: &str,
) -> Result<SignatureType, XmlError> {
    let data = inflate_and_decode(encoding, is_base64, message)?;
    let root = parse_document(&data)?;
    expect_root(&root, "Signature")?;
    Ok(map_signature(&root))
}

/// Decodes an `AttributeQuery` out of a SOAP envelope body.
pub fn decode_attribute_query(envelope: &str) -> Result<AttributeQueryType, XmlError> {
    let root = parse_document(envelope.as_bytes())?;
    expect_root(&root, "Envelope")?;
    let query = root
        .child("Body")
        .and_then(|body| body.child("AttributeQuery"))
        .ok_or_else(|| XmlError::MalformedXml("no AttributeQuery in envelope".to_string()))?;

    Ok(AttributeQueryType {
        id: query.attr("ID"),
        version: query.attr("Version"),
        issue_instant: query.attr("IssueInstant"),
        destination: query.attr("Destination"),
        issuer: query.child("Issuer").map(map_name_id).unwrap_or_default(),
        subject: query.child("Subject").map(map_subject).unwrap_or_default(),
        attribute: query.children("Attribute").map(map_attribute).collect(),
        signature: query.child("Signature").map(map_signature),
    })
}

/// Parses SP metadata into an `EntityDescriptor`.
pub fn parse_entity_descriptor(data: &[u8]) -> Result<EntityDescriptorType, XmlError> {
    let root = parse_document(data)?;
    expect_root(&root, "EntityDescriptor")?;

    Ok(EntityDescriptorType {
        entity_id: root.attr("entityID"),
        id: root.attr("ID"),
        valid_until: root.attr("validUntil"),
        sp_sso_descriptor: root.child("SPSSODescriptor").map(map_sp_sso_descriptor),
        idp_sso_descriptor: None,
        attribute_authority_descriptor: None,
    })
}

/// Collects the signing certificates out of key descriptors.
///
/// Descriptors with `use="encryption"` are skipped; an unset `use` counts as
/// signing.
#[must_use]
pub fn certs_from_key_descriptors(key_descriptors: &[KeyDescriptorType]) -> Vec<String> {
    let mut certs = Vec::new();
    for descriptor in key_descriptors {
        if !matches!(descriptor.use_.as_str(), "" | "signing") {
            continue;
        }
        for x509_data in &descriptor.key_info.x509_data {
            if !x509_data.x509_certificate.is_empty() {
                certs.push(x509_data.x509_certificate.clone());
            }
        }
    }
    certs
}

fn map_name_id(el: &Element) -> NameIdType {
    NameIdType {
        format: el.attr("Format"),
        text: el.text(),
    }
}

fn map_status(el: &Element) -> StatusType {
    StatusType {
        status_code: StatusCodeType {
            value: el.child("StatusCode").map(|c| c.attr("Value")).unwrap_or_default(),
        },
        status_message: el.child_text("StatusMessage"),
    }
}

fn map_conditions(el: &Element) -> ConditionsType {
    ConditionsType {
        not_before: el.attr("NotBefore"),
        not_on_or_after: el.attr("NotOnOrAfter"),
        audience_restriction: el
            .children("AudienceRestriction")
            .map(|restriction| AudienceRestrictionType {
                audience: restriction.children("Audience").map(|a| a.text()).collect(),
            })
            .collect(),
    }
}

fn map_subject(el: &Element) -> SubjectType {
    SubjectType {
        name_id: el.child("NameID").map(map_name_id),
        subject_confirmation: Vec::new(),
    }
}

fn map_attribute(el: &Element) -> AttributeType {
    AttributeType {
        name: el.attr("Name"),
        friendly_name: el.attr("FriendlyName"),
        name_format: el.attr("NameFormat"),
        attribute_value: el.children("AttributeValue").map(|v| v.text()).collect(),
    }
}

fn map_assertion(el: &Element) -> AssertionType {
    AssertionType {
        id: el.attr("ID"),
        version: el.attr("Version"),
        issue_instant: el.attr("IssueInstant"),
        issuer: el.child("Issuer").map(map_name_id).unwrap_or_default(),
        subject: el.child("Subject").map(map_subject),
        conditions: el.child("Conditions").map(map_conditions),
        attribute_statement: el
            .children("AttributeStatement")
            .map(|statement| AttributeStatementType {
                attribute: statement.children("Attribute").map(map_attribute).collect(),
            })
            .collect(),
        authn_statement: Vec::new(),
    }
}

fn map_signature(el: &Element) -> SignatureType {
    SignatureType {
        signature_method: el
            .child("SignedInfo")
            .and_then(|si| si.child("SignatureMethod"))
            .map(|m| m.attr("Algorithm"))
            .unwrap_or_default(),
        signature_value: el.child_text("SignatureValue"),
        key_info: el.child("KeyInfo").map(|ki| KeyInfoType {
            key_name: ki.children("KeyName").map(|n| n.text()).collect(),
            x509_data: ki
                .children("X509Data")
                .map(|data| X509DataType {
                    x509_certificate: data.child_text("X509Certificate"),
                })
                .collect(),
        }),
    }
}

fn map_key_descriptor(el: &Element) -> KeyDescriptorType {
    KeyDescriptorType {
        use_: el.attr("use"),
        key_info: el
            .child("KeyInfo")
            .map(|ki| KeyInfoType {
                key_name: ki.children("KeyName").map(|n| n.text()).collect(),
                x509_data: ki
                    .children("X509Data")
                    .map(|data| X509DataType {
                        x509_certificate: data.child_text("X509Certificate"),
                    })
                    .collect(),
            })
            .unwrap_or_default(),
        encryption_method: el
            .children("EncryptionMethod")
            .map(|m| EncryptionMethodType {
                algorithm: m.attr("Algorithm"),
            })
            .collect(),
    }
}

fn map_sp_sso_descriptor(el: &Element) -> SpSsoDescriptorType {
    SpSsoDescriptorType {
        authn_requests_signed: el.attr("AuthnRequestsSigned"),
        want_assertions_signed: el.attr("WantAssertionsSigned"),
        protocol_support_enumeration: el.attr("protocolSupportEnumeration"),
        key_descriptor: el.children("KeyDescriptor").map(map_key_descriptor).collect(),
        single_logout_service: el
            .children("SingleLogoutService")
            .map(|e| EndpointType {
                binding: e.attr("Binding"),
                location: e.attr("Location"),
                response_location: e.attr("ResponseLocation"),
            })
            .collect(),
        assertion_consumer_service: el
            .children("AssertionConsumerService")
            .map(|e| IndexedEndpointType {
                binding: e.attr("Binding"),
                location: e.attr("Location"),
                index: e.attr("index"),
                is_default: e.attr("isDefault"),
            })
            .collect(),
    }
}

fn expect_root(root: &Element, name: &str) -> Result<(), XmlError> {
    if root.name == name {
        Ok(())
    } else {
        Err(XmlError::MalformedXml(format!(
            "expected {name}, found {}",
            root.name
        )))
    }
}

/// A parsed XML element, names reduced to their local part.
struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Element>,
    text: String,
}

impl Element {
    fn attr(&self, name: &str) -> String {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.clone())
            .unwrap_or_default()
    }

    fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    fn children<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |c| c.name == name)
    }

    fn child_text(&self, name: &str) -> String {
        self.child(name).map(Element::text).unwrap_or_default()
    }

    fn text(&self) -> String {
        self.text.trim().to_string()
    }
}

fn parse_document(data: &[u8]) -> Result<Element, XmlError> {
    let text = std::str::from_utf8(data)
        .map_err(|e| XmlError::MalformedXml(format!("invalid utf-8: {e}")))?;
    let mut reader = Reader::from_str(text);
    let mut stack: Vec<Element> = Vec::new();
    let mut root = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| XmlError::MalformedXml(e.to_string()))?;
        match event {
            Event::Start(start) => {
                stack.push(element_from_start(&start)?);
            }
            Event::Empty(start) => {
                let element = element_from_start(&start)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| XmlError::MalformedXml("unbalanced end tag".to_string()))?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(text) => {
                if let Some(open) = stack.last_mut() {
                    open.text.push_str(
                        &text
                            .unescape()
                            .map_err(|e| XmlError::MalformedXml(e.to_string()))?,
                    );
                }
            }
            Event::CData(cdata) => {
                if let Some(open) = stack.last_mut() {
                    open.text.push_str(&String::from_utf8_lossy(&cdata));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(XmlError::MalformedXml("unclosed element".to_string()));
    }
    root.ok_or_else(|| XmlError::MalformedXml("empty document".to_string()))
}

fn element_from_start(start: &quick_xml::events::BytesStart<'_>) -> Result<Element, XmlError> {
    let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| XmlError::MalformedXml(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| XmlError::MalformedXml(e.to_string()))?
            .into_owned();
        attributes.push((key, value));
    }
    Ok(Element {
        name,
        attributes,
        children: Vec::new(),
        text: String::new(),
    })
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), XmlError> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(element);
            Ok(())
        }
        None if root.is_none() => {
            *root = Some(element);
            Ok(())
        }
        None => Err(XmlError::MalformedXml(
            "multiple root elements".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::deflate_and_base64;

    const AUTHN_REQUEST: &str = r#"<samlp:AuthnRequest xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" ID="id-123" Version="2.0" IssueInstant="2022-04-26T09:47:45.495Z" Destination="http://localhost:50002/saml/SSO" AssertionConsumerServiceURL="http://localhost:8000/saml/acs" ProtocolBinding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST"><saml:Issuer Format="urn:oasis:names:tc:SAML:2.0:nameid-format:entity">http://localhost:8000/saml/metadata</saml:Issuer><samlp:NameIDPolicy Format="urn:oasis:names:tc:SAML:2.0:nameid-format:transient" AllowCreate="true"/></samlp:AuthnRequest>"#;

    #[test]
    fn authn_request_plain_base64() {
        use base64::engine::general_purpose::STANDARD;
        use base64::Engine;

        let encoded = STANDARD.encode(AUTHN_REQUEST);
        let request = decode_authn_request("", &encoded).unwrap();
        assert_eq!(request.id, "id-123");
        assert_eq!(request.version, "2.0");
        assert_eq!(request.issuer.text, "http://localhost:8000/saml/metadata");
        assert_eq!(
            request.assertion_consumer_service_url,
            "http://localhost:8000/saml/acs"
        );
        assert_eq!(request.destination, "http://localhost:50002/saml/SSO");
        assert!(request.signature.is_none());
    }

    #[test]
    fn authn_request_deflated() {
        let encoded = deflate_and_base64(AUTHN_REQUEST.as_bytes()).unwrap();
        let request = decode_authn_request(ENCODING_DEFLATE, &encoded).unwrap();
        assert_eq!(request.id, "id-123");
    }

    #[test]
    fn unknown_encoding_is_rejected() {
        let err = inflate_and_decode("urn:example:bogus", false, "x").unwrap_err();
        assert!(matches!(err, XmlError::MalformedEncoding(_)));
    }

    #[test]
    fn invalid_base64_is_rejected() {
        let err = inflate_and_decode("", true, "!!not-base64!!").unwrap_err();
        assert!(matches!(err, XmlError::MalformedEncoding(_)));
    }

    #[test]
    fn malformed_xml_is_rejected() {
        use base64::engine::general_purpose::STANDARD;
        use base64::Engine;

        let encoded = STANDARD.encode("<samlp:AuthnRequest><unclosed>");
        let err = decode_authn_request("", &encoded).unwrap_err();
        assert!(matches!(err, XmlError::MalformedXml(_)));
    }

    #[test]
    fn entity_descriptor_with_acs_and_certs() {
        let metadata = r#"<EntityDescriptor xmlns="urn:oasis:names:tc:SAML:2.0:metadata" entityID="http://sp.example.com/metadata">
  <SPSSODescriptor protocolSupportEnumeration="urn:oasis:names:tc:SAML:2.0:protocol" AuthnRequestsSigned="true">
    <KeyDescriptor use="encryption">
      <KeyInfo xmlns="http://www.w3.org/2000/09/xmldsig#"><X509Data><X509Certificate>ENCCERT</X509Certificate></X509Data></KeyInfo>
    </KeyDescriptor>
    <KeyDescriptor use="signing">
      <KeyInfo xmlns="http://www.w3.org/2000/09/xmldsig#"><X509Data><X509Certificate>SIGNCERT</X509Certificate></X509Data></KeyInfo>
    </KeyDescriptor>
    <SingleLogoutService Binding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST" Location="http://sp.example.com/slo"/>
    <AssertionConsumerService Binding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST" Location="http://sp.example.com/acs" index="1" isDefault="true"/>
    <AssertionConsumerService Binding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-Redirect" Location="http://sp.example.com/acs2" index="2"/>
  </SPSSODescriptor>
</EntityDescriptor>"#;

        let descriptor = parse_entity_descriptor(metadata.as_bytes()).unwrap();
        assert_eq!(descriptor.entity_id, "http://sp.example.com/metadata");
        let sp = descriptor.sp_sso_descriptor.unwrap();
        assert_eq!(sp.authn_requests_signed, "true");
        assert_eq!(sp.assertion_consumer_service.len(), 2);
        assert_eq!(sp.assertion_consumer_service[0].index, "1");
        assert_eq!(sp.assertion_consumer_service[0].is_default, "true");
        assert_eq!(sp.single_logout_service.len(), 1);

        let certs = certs_from_key_descriptors(&sp.key_descriptor);
        assert_eq!(certs, vec!["SIGNCERT".to_string()]);
    }

    #[test]
    fn attribute_query_envelope() {
        let envelope = r#"<soap:Envelope xmlns:soap="http://www.w3.org/2003/05/soap-envelope">
  <soap:Body>
    <samlp:AttributeQuery xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" ID="query-1" Version="2.0" IssueInstant="2022-04-26T09:47:45Z" Destination="http://localhost:50002/saml/SSO">
      <saml:Issuer>http://sp.example.com/metadata</saml:Issuer>
      <saml:Subject><saml:NameID Format="urn:oasis:names:tc:SAML:1.1:nameid-format:emailAddress">user@example.com</saml:NameID></saml:Subject>
      <saml:Attribute Name="Email" NameFormat="urn:oasis:names:tc:SAML:2.0:attrname-format:basic"/>
    </samlp:AttributeQuery>
  </soap:Body>
</soap:Envelope>"#;

        let query = decode_attribute_query(envelope).unwrap();
        assert_eq!(query.id, "query-1");
        assert_eq!(query.issuer.text, "http://sp.example.com/metadata");
        assert_eq!(
            query.subject.name_id.as_ref().unwrap().text,
            "user@example.com"
        );
        assert_eq!(query.attribute.len(), 1);
        assert_eq!(query.attribute[0].name, "Email");
    }

    #[test]
    fn attribute_query_requires_envelope() {
        let err = decode_attribute_query("<samlp:AttributeQuery/>").unwrap_err();
        assert!(matches!(err, XmlError::MalformedXml(_)));
    }

    #[test]
    fn signature_certificates_are_extracted() {
        use base64::engine::general_purpose::STANDARD;
        use base64::Engine;

        let xml = r#"<samlp:AuthnRequest xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" ID="id-1" Version="2.0"><saml:Issuer xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion">sp</saml:Issuer><ds:Signature xmlns:ds="http://www.w3.org/2000/09/xmldsig#"><ds:SignedInfo><ds:SignatureMethod Algorithm="http://www.w3.org/2000/09/xmldsig#rsa-sha1"/></ds:SignedInfo><ds:SignatureValue>c2ln</ds:SignatureValue><ds:KeyInfo><ds:X509Data><ds:X509Certificate>CERTDATA</ds:X509Certificate></ds:X509Data></ds:KeyInfo></ds:Signature></samlp:AuthnRequest>"#;
        let request = decode_authn_request("", &STANDARD.encode(xml)).unwrap();
        let signature = request.signature.unwrap();
        assert_eq!(
            signature.signature_method,
            "http://www.w3.org/2000/09/xmldsig#rsa-sha1"
        );
        assert_eq!(signature.signature_value, "c2ln");
        assert_eq!(
            signature.key_info.unwrap().x509_data[0].x509_certificate,
            "CERTDATA"
        );
    }
}
