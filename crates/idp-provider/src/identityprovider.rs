//! The long-lived identity provider object.
//!
//! Owns the configuration, the storage port and the service provider cache.
//! One instance serves all requests; per-request state lives in the handler
//! contexts.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use idp_core::{Endpoint, EndpointConfig, IdentityProviderConfig};
use idp_crypto::SignatureAlgorithm;
use idp_xml::md::{AttributeAuthorityDescriptorType, IdpSsoDescriptorType};

use crate::error::ProviderError;
use crate::metadata::idp_descriptors;
use crate::serviceprovider::ServiceProvider;
use crate::storage::{CertificateAndKey, Storage};
use crate::time::DEFAULT_TIME_FORMAT;

const DEFAULT_CERTIFICATE_ENDPOINT: &str = "certificate";
const DEFAULT_CALLBACK_ENDPOINT: &str = "login";
const DEFAULT_SINGLE_SIGN_ON_ENDPOINT: &str = "SSO";
const DEFAULT_SINGLE_LOGOUT_ENDPOINT: &str = "SLO";
const DEFAULT_ATTRIBUTE_ENDPOINT: &str = "attribute";

const DEFAULT_EXPIRATION: Duration = Duration::from_secs(5 * 60);

/// The resolved endpoint set of the provider.
#[derive(Debug, Clone)]
pub struct Endpoints {
    /// Certificate download endpoint.
    pub certificate: Endpoint,
    /// Login-UI callback endpoint.
    pub callback: Endpoint,
    /// Single sign-on endpoint.
    pub single_sign_on: Endpoint,
    /// Single logout endpoint.
    pub single_logout: Endpoint,
    /// SOAP attribute query endpoint.
    pub attribute: Endpoint,
}

fn endpoint_config_to_endpoints(config: Option<&EndpointConfig>) -> Endpoints {
    let mut endpoints = Endpoints {
        certificate: Endpoint::new(DEFAULT_CERTIFICATE_ENDPOINT),
        callback: Endpoint::new(DEFAULT_CALLBACK_ENDPOINT),
        single_sign_on: Endpoint::new(DEFAULT_SINGLE_SIGN_ON_ENDPOINT),
        single_logout: Endpoint::new(DEFAULT_SINGLE_LOGOUT_ENDPOINT),
        attribute: Endpoint::new(DEFAULT_ATTRIBUTE_ENDPOINT),
    };

    if let Some(config) = config {
        if let Some(endpoint) = &config.certificate {
            endpoints.certificate = endpoint.clone();
        }
        if let Some(endpoint) = &config.callback {
            endpoints.callback = endpoint.clone();
        }
        if let Some(endpoint) = &config.single_sign_on {
            endpoints.single_sign_on = endpoint.clone();
        }
        if let Some(endpoint) = &config.single_logout {
            endpoints.single_logout = endpoint.clone();
        }
        if let Some(endpoint) = &config.attribute {
            endpoints.attribute = endpoint.clone();
        }
    }
    endpoints
}

/// The SAML identity provider.
pub struct IdentityProvider {
    pub(crate) conf: IdentityProviderConfig,
    pub(crate) storage: Arc<dyn Storage>,
    pub(crate) metadata_endpoint: Endpoint,
    pub(crate) endpoints: Endpoints,
    pub(crate) signature_algorithm: SignatureAlgorithm,
    pub(crate) time_format: String,
    pub(crate) expiration: Duration,
    service_providers: Mutex<Vec<Arc<ServiceProvider>>>,
}

impl IdentityProvider {
    /// Creates the identity provider.
    ///
    /// Fails when the configured signature algorithm is not supported.
    pub fn new(
        metadata_endpoint: Endpoint,
        conf: IdentityProviderConfig,
        storage: Arc<dyn Storage>,
        time_format: Option<String>,
    ) -> Result<Self, ProviderError> {
        let signature_algorithm = SignatureAlgorithm::from_uri(&conf.signature_algorithm)?;
        let endpoints = endpoint_config_to_endpoints(conf.endpoints.as_ref());

        Ok(Self {
            conf,
            storage,
            metadata_endpoint,
            endpoints,
            signature_algorithm,
            time_format: time_format.unwrap_or_else(|| DEFAULT_TIME_FORMAT.to_string()),
            expiration: DEFAULT_EXPIRATION,
            service_providers: Mutex::new(Vec::new()),
        })
    }

    /// The IdP entity ID under the given issuer.
    #[must_use]
    pub fn entity_id(&self, issuer: &str) -> String {
        self.metadata_endpoint.absolute(issuer)
    }

    /// The configured endpoint set.
    #[must_use]
    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Resolves a service provider: cache first, storage on a miss.
    pub async fn get_service_provider(
        &self,
        entity_id: &str,
    ) -> Result<Arc<ServiceProvider>, ProviderError> {
        if let Some(sp) = self
            .cache()
            .iter()
            .find(|sp| sp.entity_id() == entity_id)
            .cloned()
        {
            return Ok(sp);
        }

        match self.storage.get_entity_by_id(entity_id).await? {
            Some(sp) => {
                let sp = Arc::new(sp);
                self.cache().push(sp.clone());
                Ok(sp)
            }
            None => Err(ProviderError::UnknownServiceProvider(entity_id.to_string())),
        }
    }

    /// Removes a service provider from the cache.
    pub fn delete_service_provider(&self, entity_id: &str) {
        self.cache().retain(|sp| sp.entity_id() != entity_id);
    }

    /// Builds the role descriptors published in metadata for the given
    /// issuer.
    pub async fn get_metadata(
        &self,
        issuer: &str,
    ) -> Result<(IdpSsoDescriptorType, AttributeAuthorityDescriptorType), ProviderError> {
        let signing_key = self.response_signing_key().await?;
        Ok(idp_descriptors(
            &self.conf,
            &self.endpoints,
            &self.entity_id(issuer),
            issuer,
            &signing_key.certificate,
        ))
    }

    pub(crate) async fn response_signing_key(&self) -> Result<CertificateAndKey, ProviderError> {
        Ok(self.storage.get_response_signing_key().await?)
    }

    fn cache(&self) -> MutexGuard<'_, Vec<Arc<ServiceProvider>>> {
        match self.service_providers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
