//! Signature error types.

use thiserror::Error;

/// Errors produced by signing and signature verification.
#[derive(Debug, Error)]
pub enum SignatureError {
    /// The signature algorithm URI is not supported.
    #[error("invalid signing method {0}")]
    InvalidSignatureAlgorithm(String),

    /// A request was required for verification but none was provided.
    #[error("no request provided but required")]
    NoRequest,

    /// A signature was required for verification but none was provided.
    #[error("no signature provided but required")]
    NoSignature,

    /// A signature algorithm was required but none was provided.
    #[error("no signature algorithm provided but required")]
    NoSigAlg,

    /// No `Signature` element was found in the document.
    #[error("no signature element found")]
    MissingSignature,

    /// The digest over the referenced element does not match.
    #[error("digest value mismatch")]
    DigestMismatch,

    /// The signature value does not verify against any known key.
    #[error("signature verification failed: {0}")]
    BadSignature(String),

    /// A certificate could not be parsed.
    #[error("failed to parse certificate: {0}")]
    MalformedCertificate(String),

    /// No certificate is available for verification.
    #[error("no certificate available for verification")]
    NoCertificate,

    /// An underlying cryptographic operation failed.
    #[error("crypto error: {0}")]
    Crypto(String),
}

impl From<openssl::error::ErrorStack> for SignatureError {
    fn from(err: openssl::error::ErrorStack) -> Self {
        Self::Crypto(err.to_string())
    }
}
