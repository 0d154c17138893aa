//! The storage port required of the embedder.
//!
//! The core never persists anything itself: pending authentication requests,
//! registered service providers, user attributes and signing key material
//! all live behind these traits. Requests are abandoned by dropping the
//! handler future, so cancellation needs no explicit plumbing.

use async_trait::async_trait;
use openssl::pkey::{PKey, Private};

use idp_xml::samlp::AuthnRequestType;

use crate::attributes::Attributes;
use crate::error::StorageError;
use crate::serviceprovider::ServiceProvider;

/// A certificate (DER) paired with its RSA private key.
#[derive(Clone)]
pub struct CertificateAndKey {
    /// DER encoded certificate.
    pub certificate: Vec<u8>,
    /// The RSA private key.
    pub key: PKey<Private>,
}

/// A persisted authentication request.
///
/// Created when an AuthnRequest passes validation, read back by the login
/// callback. The core never mutates it.
pub trait AuthRequest: Send + Sync {
    /// Storage identifier of the persisted request.
    fn id(&self) -> &str;
    /// The application the request belongs to.
    fn application_id(&self) -> &str;
    /// Relay state echoed back to the SP.
    fn relay_state(&self) -> &str;
    /// The resolved assertion consumer service URL.
    fn acs_url(&self) -> &str;
    /// The resolved response binding.
    fn binding(&self) -> &str;
    /// The ID of the originating AuthnRequest.
    fn auth_request_id(&self) -> &str;
    /// The issuer of the originating AuthnRequest.
    fn issuer(&self) -> &str;
    /// The destination of the originating AuthnRequest.
    fn destination(&self) -> &str;
    /// The authenticated subject, set after login.
    fn user_id(&self) -> &str;
    /// Whether the login UI completed authentication.
    fn done(&self) -> bool;
}

/// Key material for the provider itself.
#[async_trait]
pub trait EntityStorage: Send + Sync {
    /// The CA certificate and key, for optional chain validation.
    async fn get_ca(&self) -> Result<CertificateAndKey, StorageError>;
    /// The key used to sign published metadata.
    async fn get_metadata_signing_key(&self) -> Result<CertificateAndKey, StorageError>;
}

/// Service provider resolution and response signing material.
#[async_trait]
pub trait IdentityProviderStorage: Send + Sync {
    /// Resolves a service provider by entity ID; `None` when unknown.
    async fn get_entity_by_id(
        &self,
        entity_id: &str,
    ) -> Result<Option<ServiceProvider>, StorageError>;

    /// Resolves the audience entity ID for an application.
    async fn get_entity_id_by_app_id(&self, app_id: &str) -> Result<String, StorageError>;

    /// The key used to sign issued responses.
    async fn get_response_signing_key(&self) -> Result<CertificateAndKey, StorageError>;
}

/// Persistence of pending authentication requests.
#[async_trait]
pub trait AuthStorage: Send + Sync {
    /// Persists a validated AuthnRequest.
    ///
    /// Two calls with the same request ID must fail the second call.
    async fn create_auth_request(
        &self,
        request: &AuthnRequestType,
        acs_url: &str,
        binding: &str,
        relay_state: &str,
        application_id: &str,
    ) -> Result<Box<dyn AuthRequest>, StorageError>;

    /// Loads a persisted request by its storage identifier.
    async fn auth_request_by_id(&self, id: &str) -> Result<Box<dyn AuthRequest>, StorageError>;
}

/// Subject attribute resolution.
#[async_trait]
pub trait UserStorage: Send + Sync {
    /// Fills `attributes` for a user resolved by user ID.
    async fn set_userinfo_by_user_id(
        &self,
        application_id: &str,
        attributes: &mut Attributes,
        user_id: &str,
        attribute_indexes: &[i32],
    ) -> Result<(), StorageError>;

    /// Fills `attributes` for a user resolved by login name.
    async fn set_userinfo_by_login_name(
        &self,
        attributes: &mut Attributes,
        login_name: &str,
        attribute_indexes: &[i32],
    ) -> Result<(), StorageError>;
}

/// The combined storage port.
#[async_trait]
pub trait Storage:
    EntityStorage + IdentityProviderStorage + AuthStorage + UserStorage + Send + Sync
{
    /// Readiness of the backend; drives the `/ready` probe.
    async fn health(&self) -> Result<(), StorageError>;
}
