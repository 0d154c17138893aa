//! # idp-xml
//!
//! SAML 2.0 value objects and the codec between them and their transfer
//! representations:
//!
//! - [`saml`], [`samlp`], [`md`], [`xml_dsig`], [`soap`] - typed value
//!   objects for the assertion, protocol, metadata, signature and SOAP
//!   namespaces
//! - [`encode`] - XML marshalling and the DEFLATE+Base64 redirect encoding
//! - [`decode`] - typed decoders for the messages the provider accepts

#![forbid(unsafe_code)]

pub mod constants;
pub mod decode;
pub mod encode;
pub mod error;
pub mod md;
pub mod saml;
pub mod samlp;
pub mod soap;
pub mod xml_dsig;

pub use error::XmlError;
