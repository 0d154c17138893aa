//! Registered service providers.

use openssl::pkey::{PKey, Public};

use idp_crypto::{parse_certificates, verify_post_signature, verify_redirect_signature};
use idp_xml::decode::{certs_from_key_descriptors, parse_entity_descriptor};
use idp_xml::md::EntityDescriptorType;

use crate::error::ProviderError;

/// A service provider registered with the IdP.
///
/// Built from the SP's metadata document; storage supplies the raw metadata
/// and the login URL prefix.
pub struct ServiceProvider {
    /// Storage identifier (application ID).
    pub id: String,
    /// Parsed SP metadata.
    pub metadata: EntityDescriptorType,
    signer_public_key: Option<PKey<Public>>,
    default_login_url: String,
}

impl ServiceProvider {
    /// Parses SP metadata and extracts the signing certificate.
    ///
    /// At most one signing certificate is supported; metadata carrying more
    /// is rejected.
    pub fn new(
        id: impl Into<String>,
        metadata_xml: &[u8],
        default_login_url: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let metadata = parse_entity_descriptor(metadata_xml)?;

        let cert_strs = metadata
            .sp_sso_descriptor
            .as_ref()
            .map(|descriptor| certs_from_key_descriptors(&descriptor.key_descriptor))
            .unwrap_or_default();
        let certs = parse_certificates(&cert_strs)?;
        if certs.len() > 1 {
            return Err(ProviderError::InvalidRequest(
                "more than one signing certificate for a service provider is not supported"
                    .to_string(),
            ));
        }
        let signer_public_key = match certs.first() {
            Some(cert) => Some(cert.public_key().map_err(idp_crypto::SignatureError::from)?),
            None => None,
        };

        Ok(Self {
            id: id.into(),
            metadata,
            signer_public_key,
            default_login_url: default_login_url.into(),
        })
    }

    /// The SP's entity ID.
    #[must_use]
    pub fn entity_id(&self) -> &str {
        &self.metadata.entity_id
    }

    /// The login UI URL for a stored request.
    #[must_use]
    pub fn login_url(&self, request_id: &str) -> String {
        format!("{}{request_id}", self.default_login_url)
    }

    /// Verifies the enveloped signature of a POST-binding request document.
    pub fn validate_post_signature(&self, request_xml: &str) -> Result<(), ProviderError> {
        let cert_strs = self
            .metadata
            .sp_sso_descriptor
            .as_ref()
            .map(|descriptor| certs_from_key_descriptors(&descriptor.key_descriptor))
            .unwrap_or_default();
        let certs = parse_certificates(&cert_strs)?;
        verify_post_signature(request_xml, &certs)?;
        Ok(())
    }

    /// Verifies a redirect-binding detached signature.
    pub fn validate_redirect_signature(
        &self,
        request: &str,
        relay_state: &str,
        sig_alg: &str,
        signature: &str,
    ) -> Result<(), ProviderError> {
        let public_key = self.signer_public_key.as_ref().ok_or_else(|| {
            ProviderError::InvalidRequest(
                "can not validate signature without a certificate for this service provider"
                    .to_string(),
            )
        })?;
        verify_redirect_signature(request, relay_state, sig_alg, signature, public_key)?;
        Ok(())
    }
}
