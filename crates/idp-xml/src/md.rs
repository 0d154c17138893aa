//! Metadata namespace value objects (`urn:oasis:names:tc:SAML:2.0:metadata`).

use crate::saml::AttributeType;
use crate::xml_dsig::KeyInfoType;

/// A plain metadata endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointType {
    /// Binding URI.
    pub binding: String,
    /// Endpoint location.
    pub location: String,
    /// Optional response location.
    pub response_location: String,
}

/// An indexed metadata endpoint (assertion consumer services).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexedEndpointType {
    /// Binding URI.
    pub binding: String,
    /// Endpoint location.
    pub location: String,
    /// Index, kept as received (may be non-numeric).
    pub index: String,
    /// `"true"` when this is the default endpoint.
    pub is_default: String,
}

/// An encryption method of a key descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncryptionMethodType {
    /// Algorithm URI.
    pub algorithm: String,
}

/// A key descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyDescriptorType {
    /// Key use (`signing`, `encryption` or empty for both).
    pub use_: String,
    /// Key material.
    pub key_info: KeyInfoType,
    /// Supported encryption methods.
    pub encryption_method: Vec<EncryptionMethodType>,
}

/// An SP SSO descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpSsoDescriptorType {
    /// `"true"` when the SP signs its authentication requests.
    pub authn_requests_signed: String,
    /// `"true"` when the SP requires signed assertions.
    pub want_assertions_signed: String,
    /// Supported protocols.
    pub protocol_support_enumeration: String,
    /// Key descriptors.
    pub key_descriptor: Vec<KeyDescriptorType>,
    /// Single logout services.
    pub single_logout_service: Vec<EndpointType>,
    /// Assertion consumer services, in document order.
    pub assertion_consumer_service: Vec<IndexedEndpointType>,
}

/// An IdP SSO descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdpSsoDescriptorType {
    /// Descriptor ID.
    pub id: String,
    /// `"true"` when the IdP requires signed authentication requests.
    pub want_authn_requests_signed: String,
    /// Descriptor validity.
    pub valid_until: String,
    /// Opaque cache duration.
    pub cache_duration: String,
    /// Error page URL.
    pub error_url: String,
    /// Supported protocols.
    pub protocol_support_enumeration: String,
    /// Single sign-on services.
    pub single_sign_on_service: Vec<EndpointType>,
    /// Single logout services.
    pub single_logout_service: Vec<EndpointType>,
    /// Supported name ID formats.
    pub name_id_format: Vec<String>,
    /// Supported attribute profiles.
    pub attribute_profile: Vec<String>,
    /// Supported attributes, values left empty for discovery.
    pub attribute: Vec<AttributeType>,
    /// Key descriptors.
    pub key_descriptor: Vec<KeyDescriptorType>,
    /// Organisation block.
    pub organization: Option<OrganizationType>,
    /// Contact persons.
    pub contact_person: Vec<ContactType>,
}

/// An attribute authority descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeAuthorityDescriptorType {
    /// Descriptor ID.
    pub id: String,
    /// Descriptor validity.
    pub valid_until: String,
    /// Opaque cache duration.
    pub cache_duration: String,
    /// Error page URL.
    pub error_url: String,
    /// Supported protocols.
    pub protocol_support_enumeration: String,
    /// SOAP attribute services.
    pub attribute_service: Vec<EndpointType>,
    /// Supported name ID formats.
    pub name_id_format: Vec<String>,
    /// Supported attribute profiles.
    pub attribute_profile: Vec<String>,
    /// Supported attributes, values left empty for discovery.
    pub attribute: Vec<AttributeType>,
    /// Key descriptors.
    pub key_descriptor: Vec<KeyDescriptorType>,
    /// Organisation block.
    pub organization: Option<OrganizationType>,
    /// Contact persons.
    pub contact_person: Vec<ContactType>,
}

/// An organisation block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrganizationType {
    /// Registered names.
    pub organization_name: Vec<String>,
    /// Display names.
    pub organization_display_name: Vec<String>,
    /// URLs.
    pub organization_url: Vec<String>,
}

/// A contact person block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactType {
    /// Contact type attribute value.
    pub contact_type: String,
    /// Company name.
    pub company: String,
    /// Given name.
    pub given_name: String,
    /// Surname.
    pub sur_name: String,
    /// Email addresses.
    pub email_address: Vec<String>,
    /// Telephone numbers.
    pub telephone_number: Vec<String>,
}

/// An entity descriptor, parsed from SP metadata or published by the IdP.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityDescriptorType {
    /// The entity ID.
    pub entity_id: String,
    /// Descriptor ID.
    pub id: String,
    /// Descriptor validity.
    pub valid_until: String,
    /// SP role descriptor.
    pub sp_sso_descriptor: Option<SpSsoDescriptorType>,
    /// IdP role descriptor.
    pub idp_sso_descriptor: Option<IdpSsoDescriptorType>,
    /// Attribute authority role descriptor.
    pub attribute_authority_descriptor: Option<AttributeAuthorityDescriptorType>,
}
