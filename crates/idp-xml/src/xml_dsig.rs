//! Signature namespace value objects (`http://www.w3.org/2000/09/xmldsig#`).
//!
//! Only the parts the provider inspects are modelled: the signature value and
//! the certificates carried in `KeyInfo`. Digest verification works on the
//! raw document text and lives in `idp-crypto`.

/// X.509 data inside a `KeyInfo`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct X509DataType {
    /// Base64 DER certificate, whitespace preserved as received.
    pub x509_certificate: String,
}

/// Key material reference of a signature or key descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyInfoType {
    /// Optional key names.
    pub key_name: Vec<String>,
    /// Certificates.
    pub x509_data: Vec<X509DataType>,
}

/// An XML-DSig signature as far as the provider inspects it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignatureType {
    /// Signature method algorithm URI.
    pub signature_method: String,
    /// Base64 signature value.
    pub signature_value: String,
    /// Key material the signer presented.
    pub key_info: Option<KeyInfoType>,
}

impl SignatureType {
    /// Whether a non-empty signature value is present.
    #[must_use]
    pub fn has_value(&self) -> bool {
        !self.signature_value.trim().is_empty()
    }
}
