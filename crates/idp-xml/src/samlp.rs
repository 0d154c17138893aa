//! Protocol namespace value objects (`urn:oasis:names:tc:SAML:2.0:protocol`).

use crate::saml::{AssertionType, AttributeType, ConditionsType, NameIdType, SubjectType};
use crate::xml_dsig::SignatureType;

/// A status code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusCodeType {
    /// Status code URI.
    pub value: String,
}

/// A response status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusType {
    /// Top level status code.
    pub status_code: StatusCodeType,
    /// Optional human readable message.
    pub status_message: String,
}

/// An authentication request sent by a service provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthnRequestType {
    /// Request ID.
    pub id: String,
    /// SAML version.
    pub version: String,
    /// Issue instant.
    pub issue_instant: String,
    /// Destination the SP addressed; empty when omitted.
    pub destination: String,
    /// Requested response binding URI; empty when omitted.
    pub protocol_binding: String,
    /// Requested ACS URL; empty when omitted.
    pub assertion_consumer_service_url: String,
    /// Requested ACS index; empty when omitted, kept as received.
    pub assertion_consumer_service_index: String,
    /// Issuing service provider.
    pub issuer: NameIdType,
    /// Request conditions.
    pub conditions: Option<ConditionsType>,
    /// Embedded signature, POST binding only.
    pub signature: Option<SignatureType>,
}

/// A logout request sent by a service provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogoutRequestType {
    /// Request ID.
    pub id: String,
    /// SAML version.
    pub version: String,
    /// Issue instant.
    pub issue_instant: String,
    /// End of the request validity window; empty when omitted.
    pub not_on_or_after: String,
    /// Destination the SP addressed; empty when omitted.
    pub destination: String,
    /// Issuing service provider.
    pub issuer: NameIdType,
    /// Subject to log out.
    pub name_id: NameIdType,
    /// Session indexes to terminate.
    pub session_index: Vec<String>,
}

/// A logout response issued by the provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogoutResponseType {
    /// Response ID.
    pub id: String,
    /// ID of the answered request.
    pub in_response_to: String,
    /// SAML version.
    pub version: String,
    /// Issue instant.
    pub issue_instant: String,
    /// Destination, the resolved SLO URL; empty when unknown.
    pub destination: String,
    /// Issuing entity.
    pub issuer: Option<NameIdType>,
    /// Response status.
    pub status: StatusType,
}

/// An attribute query received over SOAP.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeQueryType {
    /// Query ID.
    pub id: String,
    /// SAML version.
    pub version: String,
    /// Issue instant.
    pub issue_instant: String,
    /// Destination the SP addressed; empty when omitted.
    pub destination: String,
    /// Issuing service provider.
    pub issuer: NameIdType,
    /// Queried subject.
    pub subject: SubjectType,
    /// Requested attributes; empty means all.
    pub attribute: Vec<AttributeType>,
    /// Embedded signature.
    pub signature: Option<SignatureType>,
}

/// A response issued by the provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseType {
    /// Response ID.
    pub id: String,
    /// SAML version.
    pub version: String,
    /// Issue instant.
    pub issue_instant: String,
    /// Destination, the resolved ACS URL; empty when the body is returned
    /// inline.
    pub destination: String,
    /// ID of the answered request.
    pub in_response_to: String,
    /// Issuing entity.
    pub issuer: Option<NameIdType>,
    /// Response status.
    pub status: StatusType,
    /// The single assertion of a successful response.
    pub assertion: Option<AssertionType>,
}
