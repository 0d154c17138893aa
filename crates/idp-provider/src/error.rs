//! Provider error types and their mapping onto SAML status codes.

use thiserror::Error;

use idp_crypto::SignatureError;
use idp_xml::constants::status_code;
use idp_xml::XmlError;

/// Errors raised by the storage port.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The requested entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// An entity with the same identity already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The storage backend failed.
    #[error("storage error: {0}")]
    Internal(String),
}

/// Errors raised while processing a SAML flow.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// No service provider is registered under the issuer.
    #[error("unknown service provider: {0}")]
    UnknownServiceProvider(String),

    /// Signing or signature verification failed.
    #[error(transparent)]
    Signature(#[from] SignatureError),

    /// The message could not be decoded.
    #[error(transparent)]
    Xml(#[from] XmlError),

    /// The storage port failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The request violates a protocol requirement.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The login UI reported the authentication as not completed.
    #[error("authentication not done")]
    AuthnFailed,

    /// Userinfo could not be loaded for the subject.
    #[error("failed to load userinfo: {0}")]
    UserInfo(String),

    /// An internal invariant failed.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ProviderError {
    /// The SAML status code reported to the service provider for this error.
    #[must_use]
    pub fn status_code(&self) -> &'static str {
        match self {
            Self::UnknownServiceProvider(_)
            | Self::Signature(_)
            | Self::Xml(_)
            | Self::InvalidRequest(_) => status_code::REQUEST_DENIED,
            Self::AuthnFailed => status_code::AUTHN_FAILED,
            Self::UserInfo(_) => status_code::INVALID_ATTR_NAME_OR_VALUE,
            Self::Storage(_) | Self::Internal(_) => status_code::RESPONDER,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_map_to_saml_statuses() {
        assert_eq!(
            ProviderError::UnknownServiceProvider("sp".into()).status_code(),
            status_code::REQUEST_DENIED
        );
        assert_eq!(
            ProviderError::AuthnFailed.status_code(),
            status_code::AUTHN_FAILED
        );
        assert_eq!(
            ProviderError::UserInfo("x".into()).status_code(),
            status_code::INVALID_ATTR_NAME_OR_VALUE
        );
        assert_eq!(
            ProviderError::Storage(StorageError::Internal("x".into())).status_code(),
            status_code::RESPONDER
        );
    }
}
