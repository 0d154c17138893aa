//! Provider configuration.
//!
//! All configuration is supplied as plain structs at construction time; how
//! the values are loaded (files, environment, flags) is up to the embedder.

use std::time::Duration;

use crate::endpoint::Endpoint;

/// Configuration of the metadata endpoint itself.
#[derive(Debug, Clone)]
pub struct MetadataConfig {
    /// Relative path of the metadata endpoint.
    pub path: String,
    /// Optional fixed absolute URL of the metadata endpoint.
    pub url: Option<String>,
    /// When set, the published `EntityDescriptor` is signed with this
    /// algorithm using the metadata signing key.
    pub signature_algorithm: Option<String>,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            path: "/metadata".to_string(),
            url: None,
            signature_algorithm: None,
        }
    }
}

/// Metadata content settings of the identity provider.
#[derive(Debug, Clone)]
pub struct MetadataIdpConfig {
    /// Lifetime advertised as `ValidUntil`, relative to the request time.
    pub valid_until_duration: Duration,
    /// Opaque `CacheDuration` passthrough (e.g. `PT5M`).
    pub cache_duration: Option<String>,
    /// Optional `ErrorURL` advertised in the descriptors.
    pub error_url: Option<String>,
}

impl Default for MetadataIdpConfig {
    fn default() -> Self {
        Self {
            valid_until_duration: Duration::from_secs(5 * 60),
            cache_duration: None,
            error_url: None,
        }
    }
}

/// Configuration of the identity provider core.
#[derive(Debug, Clone)]
pub struct IdentityProviderConfig {
    /// Metadata content settings.
    pub metadata: MetadataIdpConfig,

    /// Signature algorithm URI used for issued responses.
    pub signature_algorithm: String,
    /// Digest algorithm URI advertised in metadata.
    pub digest_algorithm: String,
    /// When set, an encryption `KeyDescriptor` with this algorithm is
    /// published in metadata.
    pub encryption_algorithm: Option<String>,

    /// Whether the IdP requires signed authentication requests.
    pub want_authn_requests_signed: bool,
    /// Allow plain-http issuers (development only).
    pub insecure: bool,

    /// Endpoint overrides; defaults are used for unset entries.
    pub endpoints: Option<EndpointConfig>,
}

impl Default for IdentityProviderConfig {
    fn default() -> Self {
        Self {
            metadata: MetadataIdpConfig::default(),
            signature_algorithm: "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256".to_string(),
            digest_algorithm: "http://www.w3.org/2001/04/xmlenc#sha256".to_string(),
            encryption_algorithm: None,
            want_authn_requests_signed: false,
            insecure: false,
            endpoints: None,
        }
    }
}

/// Per-endpoint path overrides.
#[derive(Debug, Clone, Default)]
pub struct EndpointConfig {
    /// Certificate download endpoint.
    pub certificate: Option<Endpoint>,
    /// Login-UI callback endpoint.
    pub callback: Option<Endpoint>,
    /// Single sign-on endpoint.
    pub single_sign_on: Option<Endpoint>,
    /// Single logout endpoint.
    pub single_logout: Option<Endpoint>,
    /// SOAP attribute query endpoint.
    pub attribute: Option<Endpoint>,
}

/// Organisation advertised in metadata.
#[derive(Debug, Clone)]
pub struct Organisation {
    /// Registered name.
    pub name: String,
    /// Display name.
    pub display_name: String,
    /// Organisation URL.
    pub url: String,
}

/// Contact person advertised in metadata.
#[derive(Debug, Clone)]
pub struct ContactPerson {
    /// Kind of contact.
    pub contact_type: ContactType,
    /// Company name.
    pub company: String,
    /// Given name.
    pub given_name: String,
    /// Surname.
    pub sur_name: String,
    /// Email address.
    pub email_address: String,
    /// Telephone number.
    pub telephone_number: String,
}

/// SAML metadata contact types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactType {
    /// Technical contact.
    Technical,
    /// Support contact.
    Support,
    /// Administrative contact.
    Administrative,
    /// Billing contact.
    Billing,
    /// Other contact.
    Other,
}

impl ContactType {
    /// Returns the metadata attribute value.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Technical => "technical",
            Self::Support => "support",
            Self::Administrative => "administrative",
            Self::Billing => "billing",
            Self::Other => "other",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_valid_until_defaults_to_five_minutes() {
        let config = MetadataIdpConfig::default();
        assert_eq!(config.valid_until_duration, Duration::from_secs(300));
    }

    #[test]
    fn contact_type_values() {
        assert_eq!(ContactType::Technical.as_str(), "technical");
        assert_eq!(ContactType::Other.as_str(), "other");
    }
}
