//! XML marshalling and the redirect-binding transfer encoding.
//!
//! Marshalled documents are compact (no indentation); signing and signature
//! verification operate on this text form.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Write;

use crate::constants::{DS_NS, MD_NS, SAMLP_NS, SAML_NS};
use crate::error::XmlError;
use crate::md::{
    AttributeAuthorityDescriptorType, ContactType, EndpointType, EntityDescriptorType,
    IdpSsoDescriptorType, KeyDescriptorType, OrganizationType,
};
use crate::saml::{AssertionType, AttributeType, NameIdType};
use crate::samlp::{LogoutResponseType, ResponseType, StatusType};

/// The document header prepended to every marshalled message.
pub const XML_HEADER: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

/// Applies raw DEFLATE (level 9) followed by standard Base64.
///
/// Used exclusively for the HTTP-Redirect binding payload.
pub fn deflate_and_base64(data: &[u8]) -> Result<String, XmlError> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::new(9));
    encoder.write_all(data)?;
    let compressed = encoder.finish()?;
    Ok(STANDARD.encode(compressed))
}

/// Marshals a `Response`.
pub fn marshal_response(response: &ResponseType) -> Result<String, XmlError> {
    let mut xml = XmlBuilder::new();
    write_response(&mut xml, response)?;
    Ok(format!("{XML_HEADER}{}", xml.finish()?))
}

/// Marshals a `LogoutResponse`.
pub fn marshal_logout_response(response: &LogoutResponseType) -> Result<String, XmlError> {
    let mut xml = XmlBuilder::new();

    let mut attrs = vec![
        ("xmlns:samlp", SAMLP_NS.to_string()),
        ("xmlns:saml", SAML_NS.to_string()),
        ("ID", response.id.clone()),
        ("Version", response.version.clone()),
        ("IssueInstant", response.issue_instant.clone()),
    ];
    push_attr(&mut attrs, "InResponseTo", &response.in_response_to);
    push_attr(&mut attrs, "Destination", &response.destination);
    xml.start("samlp:LogoutResponse", &attrs)?;

    if let Some(issuer) = &response.issuer {
        write_issuer(&mut xml, issuer)?;
    }
    write_status(&mut xml, &response.status)?;

    xml.end("samlp:LogoutResponse")?;
    Ok(format!("{XML_HEADER}{}", xml.finish()?))
}

/// Marshals an `EntityDescriptor` published by the IdP.
pub fn marshal_entity_descriptor(descriptor: &EntityDescriptorType) -> Result<String, XmlError> {
    let mut xml = XmlBuilder::new();

    let mut attrs = vec![
        ("xmlns:md", MD_NS.to_string()),
        ("xmlns:ds", DS_NS.to_string()),
        ("xmlns:saml", SAML_NS.to_string()),
        ("entityID", descriptor.entity_id.clone()),
    ];
    push_attr(&mut attrs, "ID", &descriptor.id);
    push_attr(&mut attrs, "validUntil", &descriptor.valid_until);
    xml.start("md:EntityDescriptor", &attrs)?;

    if let Some(idp) = &descriptor.idp_sso_descriptor {
        write_idp_sso_descriptor(&mut xml, idp)?;
    }
    if let Some(aa) = &descriptor.attribute_authority_descriptor {
        write_attribute_authority_descriptor(&mut xml, aa)?;
    }

    xml.end("md:EntityDescriptor")?;
    Ok(format!("{XML_HEADER}{}", xml.finish()?))
}

fn write_response(xml: &mut XmlBuilder, response: &ResponseType) -> Result<(), XmlError> {
    let mut attrs = vec![
        ("xmlns:samlp", SAMLP_NS.to_string()),
        ("xmlns:saml", SAML_NS.to_string()),
        ("ID", response.id.clone()),
        ("Version", response.version.clone()),
        ("IssueInstant", response.issue_instant.clone()),
    ];
    push_attr(&mut attrs, "InResponseTo", &response.in_response_to);
    push_attr(&mut attrs, "Destination", &response.destination);
    xml.start("samlp:Response", &attrs)?;

    if let Some(issuer) = &response.issuer {
        write_issuer(xml, issuer)?;
    }
    write_status(xml, &response.status)?;
    if let Some(assertion) = &response.assertion {
        write_assertion(xml, assertion)?;
    }

    xml.end("samlp:Response")
}

fn write_issuer(xml: &mut XmlBuilder, issuer: &NameIdType) -> Result<(), XmlError> {
    let mut attrs = Vec::new();
    push_attr(&mut attrs, "Format", &issuer.format);
    xml.text_element("saml:Issuer", &attrs, &issuer.text)
}

fn write_status(xml: &mut XmlBuilder, status: &StatusType) -> Result<(), XmlError> {
    xml.start("samlp:Status", &[])?;
    xml.empty(
        "samlp:StatusCode",
        &[("Value", status.status_code.value.clone())],
    )?;
    if !status.status_message.is_empty() {
        xml.text_element("samlp:StatusMessage", &[], &status.status_message)?;
    }
    xml.end("samlp:Status")
}

fn write_assertion(xml: &mut XmlBuilder, assertion: &AssertionType) -> Result<(), XmlError> {
    xml.start(
        "saml:Assertion",
        &[
            ("ID", assertion.id.clone()),
            ("Version", assertion.version.clone()),
            ("IssueInstant", assertion.issue_instant.clone()),
        ],
    )?;
    write_issuer(xml, &assertion.issuer)?;

    if let Some(subject) = &assertion.subject {
        xml.start("saml:Subject", &[])?;
        if let Some(name_id) = &subject.name_id {
            let mut attrs = Vec::new();
            push_attr(&mut attrs, "Format", &name_id.format);
            xml.text_element("saml:NameID", &attrs, &name_id.text)?;
        }
        for confirmation in &subject.subject_confirmation {
            xml.start(
                "saml:SubjectConfirmation",
                &[("Method", confirmation.method.clone())],
            )?;
            if let Some(data) = &confirmation.subject_confirmation_data {
                let mut attrs = Vec::new();
                push_attr(&mut attrs, "InResponseTo", &data.in_response_to);
                push_attr(&mut attrs, "NotOnOrAfter", &data.not_on_or_after);
                push_attr(&mut attrs, "Recipient", &data.recipient);
                push_attr(&mut attrs, "Address", &data.address);
                xml.empty("saml:SubjectConfirmationData", &attrs)?;
            }
            xml.end("saml:SubjectConfirmation")?;
        }
        xml.end("saml:Subject")?;
    }

    if let Some(conditions) = &assertion.conditions {
        let mut attrs = Vec::new();
        push_attr(&mut attrs, "NotBefore", &conditions.not_before);
        push_attr(&mut attrs, "NotOnOrAfter", &conditions.not_on_or_after);
        xml.start("saml:Conditions", &attrs)?;
        for restriction in &conditions.audience_restriction {
            xml.start("saml:AudienceRestriction", &[])?;
            for audience in &restriction.audience {
                xml.text_element("saml:Audience", &[], audience)?;
            }
            xml.end("saml:AudienceRestriction")?;
        }
        xml.end("saml:Conditions")?;
    }

    for statement in &assertion.attribute_statement {
        xml.start("saml:AttributeStatement", &[])?;
        for attribute in &statement.attribute {
            write_attribute(xml, attribute)?;
        }
        xml.end("saml:AttributeStatement")?;
    }

    for statement in &assertion.authn_statement {
        xml.start(
            "saml:AuthnStatement",
            &[
                ("AuthnInstant", statement.authn_instant.clone()),
                ("SessionIndex", statement.session_index.clone()),
            ],
        )?;
        xml.start("saml:AuthnContext", &[])?;
        xml.text_element(
            "saml:AuthnContextClassRef",
            &[],
            &statement.authn_context.authn_context_class_ref,
        )?;
        xml.end("saml:AuthnContext")?;
        xml.end("saml:AuthnStatement")?;
    }

    xml.end("saml:Assertion")
}

fn write_attribute(xml: &mut XmlBuilder, attribute: &AttributeType) -> Result<(), XmlError> {
    let mut attrs = vec![("Name", attribute.name.clone())];
    push_attr(&mut attrs, "FriendlyName", &attribute.friendly_name);
    push_attr(&mut attrs, "NameFormat", &attribute.name_format);
    xml.start("saml:Attribute", &attrs)?;
    for value in &attribute.attribute_value {
        xml.text_element("saml:AttributeValue", &[], value)?;
    }
    xml.end("saml:Attribute")
}

fn write_idp_sso_descriptor(
    xml: &mut XmlBuilder,
    descriptor: &IdpSsoDescriptorType,
) -> Result<(), XmlError> {
    let mut attrs = Vec::new();
    push_attr(&mut attrs, "ID", &descriptor.id);
    push_attr(
        &mut attrs,
        "WantAuthnRequestsSigned",
        &descriptor.want_authn_requests_signed,
    );
    push_attr(&mut attrs, "validUntil", &descriptor.valid_until);
    push_attr(&mut attrs, "cacheDuration", &descriptor.cache_duration);
    push_attr(&mut attrs, "errorURL", &descriptor.error_url);
    attrs.push((
        "protocolSupportEnumeration",
        descriptor.protocol_support_enumeration.clone(),
    ));
    xml.start("md:IDPSSODescriptor", &attrs)?;

    for key_descriptor in &descriptor.key_descriptor {
        write_key_descriptor(xml, key_descriptor)?;
    }
    if let Some(organization) = &descriptor.organization {
        write_organization(xml, organization)?;
    }
    for contact in &descriptor.contact_person {
        write_contact_person(xml, contact)?;
    }
    for service in &descriptor.single_logout_service {
        write_endpoint(xml, "md:SingleLogoutService", service)?;
    }
    for format in &descriptor.name_id_format {
        xml.text_element("md:NameIDFormat", &[], format)?;
    }
    for service in &descriptor.single_sign_on_service {
        write_endpoint(xml, "md:SingleSignOnService", service)?;
    }
    for profile in &descriptor.attribute_profile {
        xml.text_element("md:AttributeProfile", &[], profile)?;
    }
    for attribute in &descriptor.attribute {
        write_attribute(xml, attribute)?;
    }

    xml.end("md:IDPSSODescriptor")
}

fn write_attribute_authority_descriptor(
    xml: &mut XmlBuilder,
    descriptor: &AttributeAuthorityDescriptorType,
) -> Result<(), XmlError> {
    let mut attrs = Vec::new();
    push_attr(&mut attrs, "ID", &descriptor.id);
    push_attr(&mut attrs, "validUntil", &descriptor.valid_until);
    push_attr(&mut attrs, "cacheDuration", &descriptor.cache_duration);
    push_attr(&mut attrs, "errorURL", &descriptor.error_url);
    attrs.push((
        "protocolSupportEnumeration",
        descriptor.protocol_support_enumeration.clone(),
    ));
    xml.start("md:AttributeAuthorityDescriptor", &attrs)?;

    for key_descriptor in &descriptor.key_descriptor {
        write_key_descriptor(xml, key_descriptor)?;
    }
    if let Some(organization) = &descriptor.organization {
        write_organization(xml, organization)?;
    }
    for contact in &descriptor.contact_person {
        write_contact_person(xml, contact)?;
    }
    for service in &descriptor.attribute_service {
        write_endpoint(xml, "md:AttributeService", service)?;
    }
    for format in &descriptor.name_id_format {
        xml.text_element("md:NameIDFormat", &[], format)?;
    }
    for profile in &descriptor.attribute_profile {
        xml.text_element("md:AttributeProfile", &[], profile)?;
    }
    for attribute in &descriptor.attribute {
        write_attribute(xml, attribute)?;
    }

    xml.end("md:AttributeAuthorityDescriptor")
}

fn write_key_descriptor(
    xml: &mut XmlBuilder,
    descriptor: &KeyDescriptorType,
) -> Result<(), XmlError> {
    let mut attrs = Vec::new();
    push_attr(&mut attrs, "use", &descriptor.use_);
    xml.start("md:KeyDescriptor", &attrs)?;

    xml.start("ds:KeyInfo", &[])?;
    for name in &descriptor.key_info.key_name {
        xml.text_element("ds:KeyName", &[], name)?;
    }
    for data in &descriptor.key_info.x509_data {
        xml.start("ds:X509Data", &[])?;
        xml.text_element("ds:X509Certificate", &[], &data.x509_certificate)?;
        xml.end("ds:X509Data")?;
    }
    xml.end("ds:KeyInfo")?;

    for method in &descriptor.encryption_method {
        xml.empty(
            "md:EncryptionMethod",
            &[("Algorithm", method.algorithm.clone())],
        )?;
    }

    xml.end("md:KeyDescriptor")
}

fn write_endpoint(xml: &mut XmlBuilder, name: &str, endpoint: &EndpointType) -> Result<(), XmlError> {
    let mut attrs = vec![
        ("Binding", endpoint.binding.clone()),
        ("Location", endpoint.location.clone()),
    ];
    push_attr(&mut attrs, "ResponseLocation", &endpoint.response_location);
    xml.empty(name, &attrs)
}

fn write_organization(
    xml: &mut XmlBuilder,
    organization: &OrganizationType,
) -> Result<(), XmlError> {
    xml.start("md:Organization", &[])?;
    for name in &organization.organization_name {
        xml.text_element("md:OrganizationName", &[], name)?;
    }
    for name in &organization.organization_display_name {
        xml.text_element("md:OrganizationDisplayName", &[], name)?;
    }
    for url in &organization.organization_url {
        xml.text_element("md:OrganizationURL", &[], url)?;
    }
    xml.end("md:Organization")
}

fn write_contact_person(xml: &mut XmlBuilder, contact: &ContactType) -> Result<(), XmlError> {
    xml.start(
        "md:ContactPerson",
        &[("contactType", contact.contact_type.clone())],
    )?;
    if !contact.company.is_empty() {
        xml.text_element("md:Company", &[], &contact.company)?;
    }
    if !contact.given_name.is_empty() {
        xml.text_element("md:GivenName", &[], &contact.given_name)?;
    }
    if !contact.sur_name.is_empty() {
        xml.text_element("md:SurName", &[], &contact.sur_name)?;
    }
    for address in &contact.email_address {
        xml.text_element("md:EmailAddress", &[], address)?;
    }
    for number in &contact.telephone_number {
        xml.text_element("md:TelephoneNumber", &[], number)?;
    }
    xml.end("md:ContactPerson")
}

fn push_attr(attrs: &mut Vec<(&'static str, String)>, name: &'static str, value: &str) {
    if !value.is_empty() {
        attrs.push((name, value.to_string()));
    }
}

/// Thin wrapper around `quick_xml::Writer` for compact documents.
struct XmlBuilder {
    writer: Writer<Vec<u8>>,
}

impl XmlBuilder {
    fn new() -> Self {
        Self {
            writer: Writer::new(Vec::new()),
        }
    }

    fn start(&mut self, name: &str, attrs: &[(&str, String)]) -> Result<(), XmlError> {
        let mut start = BytesStart::new(name);
        for (key, value) in attrs {
            start.push_attribute((*key, value.as_str()));
        }
        self.write(Event::Start(start))
    }

    fn empty(&mut self, name: &str, attrs: &[(&str, String)]) -> Result<(), XmlError> {
        let mut start = BytesStart::new(name);
        for (key, value) in attrs {
            start.push_attribute((*key, value.as_str()));
        }
        self.write(Event::Empty(start))
    }

    fn end(&mut self, name: &str) -> Result<(), XmlError> {
        self.write(Event::End(BytesEnd::new(name)))
    }

    fn text_element(
        &mut self,
        name: &str,
        attrs: &[(&str, String)],
        text: &str,
    ) -> Result<(), XmlError> {
        self.start(name, attrs)?;
        self.write(Event::Text(BytesText::new(text)))?;
        self.end(name)
    }

    fn write(&mut self, event: Event<'_>) -> Result<(), XmlError> {
        self.writer
            .write_event(event)
            .map_err(|e| XmlError::MalformedXml(e.to_string()))
    }

    fn finish(self) -> Result<String, XmlError> {
        String::from_utf8(self.writer.into_inner())
            .map_err(|e| XmlError::MalformedXml(e.to_string()))
    }
}
