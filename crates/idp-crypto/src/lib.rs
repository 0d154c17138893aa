//! # idp-crypto
//!
//! The cryptographic surface of the SAML IdP:
//!
//! - enveloped XML-DSig signatures over marshalled SAML documents
//! - detached signatures over redirect-binding query strings
//! - certificate parsing for SP metadata key descriptors
//!
//! The signer and validator are stateless; key material is passed per call.

#![forbid(unsafe_code)]

pub mod algorithm;
pub mod certificates;
pub mod error;
pub mod signer;
#[cfg(test)]
mod testutil;
pub mod validator;

pub use algorithm::SignatureAlgorithm;
pub use certificates::{certificate_to_pem, parse_certificates};
pub use error::SignatureError;
pub use signer::{query_escape, sign_enveloped, sign_redirect_query};
pub use validator::{verify_post_signature, verify_redirect_signature};
