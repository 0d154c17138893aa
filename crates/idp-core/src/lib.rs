//! # idp-core
//!
//! Shared primitives for the SAML Identity Provider:
//!
//! - [`Endpoint`] - relative endpoint paths with optional absolute overrides
//! - [`IssuerResolver`] - per-request issuer derivation (static or host-based)
//! - configuration structs consumed at provider construction

#![forbid(unsafe_code)]

pub mod config;
pub mod endpoint;
pub mod issuer;

pub use config::{
    ContactPerson, ContactType, EndpointConfig, IdentityProviderConfig, MetadataConfig,
    MetadataIdpConfig, Organisation,
};
pub use endpoint::Endpoint;
pub use issuer::{validate_issuer, IssuerError, IssuerResolver};
