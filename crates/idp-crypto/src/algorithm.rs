//! Signature algorithm selection.

use openssl::hash::MessageDigest;

use crate::error::SignatureError;

/// XML-DSig signature method URIs supported for issued and received
/// signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    /// RSA with SHA-1, kept for interoperability with legacy SPs.
    RsaSha1,
    /// RSA with SHA-256.
    RsaSha256,
    /// RSA with SHA-512.
    RsaSha512,
}

impl SignatureAlgorithm {
    /// Returns the signature method URI.
    #[must_use]
    pub const fn uri(&self) -> &'static str {
        match self {
            Self::RsaSha1 => "http://www.w3.org/2000/09/xmldsig#rsa-sha1",
            Self::RsaSha256 => "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256",
            Self::RsaSha512 => "http://www.w3.org/2001/04/xmldsig-more#rsa-sha512",
        }
    }

    /// Parses a signature method URI.
    ///
    /// Any URI outside the supported set fails with
    /// [`SignatureError::InvalidSignatureAlgorithm`].
    pub fn from_uri(uri: &str) -> Result<Self, SignatureError> {
        match uri {
            "http://www.w3.org/2000/09/xmldsig#rsa-sha1" => Ok(Self::RsaSha1),
            "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256" => Ok(Self::RsaSha256),
            "http://www.w3.org/2001/04/xmldsig-more#rsa-sha512" => Ok(Self::RsaSha512),
            other => Err(SignatureError::InvalidSignatureAlgorithm(other.to_string())),
        }
    }

    /// Returns the message digest paired with the signature method.
    #[must_use]
    pub fn message_digest(&self) -> MessageDigest {
        match self {
            Self::RsaSha1 => MessageDigest::sha1(),
            Self::RsaSha256 => MessageDigest::sha256(),
            Self::RsaSha512 => MessageDigest::sha512(),
        }
    }
}

/// Digest method URIs accepted in incoming signatures.
pub(crate) fn digest_from_uri(uri: &str) -> MessageDigest {
    match uri {
        "http://www.w3.org/2000/09/xmldsig#sha1" => MessageDigest::sha1(),
        "http://www.w3.org/2001/04/xmlenc#sha512" => MessageDigest::sha512(),
        _ => MessageDigest::sha256(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uri_roundtrip() {
        for alg in [
            SignatureAlgorithm::RsaSha1,
            SignatureAlgorithm::RsaSha256,
            SignatureAlgorithm::RsaSha512,
        ] {
            assert_eq!(SignatureAlgorithm::from_uri(alg.uri()).unwrap(), alg);
        }
    }

    #[test]
    fn unsupported_uri_is_rejected() {
        let err =
            SignatureAlgorithm::from_uri("http://www.w3.org/2001/04/xmldsig-more#rsa-sha384")
                .unwrap_err();
        assert!(matches!(err, SignatureError::InvalidSignatureAlgorithm(_)));
    }
}
