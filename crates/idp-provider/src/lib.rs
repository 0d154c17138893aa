//! # idp-provider
//!
//! The SAML 2.0 identity provider protocol engine: terminates browser and
//! back-channel flows from registered service providers, delegates subject
//! authentication to a login UI, and issues signed SAML responses.
//!
//! The crate is organised around the flows it serves:
//!
//! - [`sso`] / [`login`] - AuthnRequest intake and the post-login callback
//! - [`logout`] - LogoutRequest handling
//! - [`attribute_query`] - SOAP AttributeQuery handling
//! - [`metadata`] - the published IdP `EntityDescriptor`
//! - [`provider`] - router assembly, health probes, certificate download
//!
//! Persistence of requests, users and key material is behind the
//! [`storage::Storage`] port; the login UI is reached by redirect and calls
//! back by request id.

#![forbid(unsafe_code)]

pub mod attribute_query;
pub mod attributes;
pub mod checker;
pub mod error;
mod form;
pub mod identityprovider;
pub mod login;
pub mod logout;
pub mod metadata;
pub mod post;
pub mod provider;
pub mod redirect;
pub mod response;
pub mod serviceprovider;
pub mod sso;
pub mod storage;
#[cfg(test)]
pub(crate) mod testutil;
pub mod time;

pub use attributes::Attributes;
pub use error::{ProviderError, StorageError};
pub use identityprovider::IdentityProvider;
pub use provider::{Config, Provider};
pub use serviceprovider::ServiceProvider;
pub use storage::{
    AuthRequest, AuthStorage, CertificateAndKey, EntityStorage, IdentityProviderStorage, Storage,
    UserStorage,
};

/// Creates a fresh SAML message ID.
#[must_use]
pub fn new_id() -> String {
    format!("_{}", uuid::Uuid::new_v4())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_prefixed_and_unique() {
        let a = new_id();
        let b = new_id();
        assert!(a.starts_with('_'));
        assert_eq!(a.len(), 37);
        assert_ne!(a, b);
    }
}
