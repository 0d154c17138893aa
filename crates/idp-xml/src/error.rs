//! Codec error types.

use thiserror::Error;

/// Errors produced by the XML and transfer-encoding codec.
#[derive(Debug, Error)]
pub enum XmlError {
    /// The XML document could not be parsed into the expected type.
    #[error("malformed xml: {0}")]
    MalformedXml(String),

    /// The transfer encoding (Base64, DEFLATE or the SAMLEncoding value)
    /// is invalid or unknown.
    #[error("malformed encoding: {0}")]
    MalformedEncoding(String),
}

impl From<quick_xml::Error> for XmlError {
    fn from(err: quick_xml::Error) -> Self {
        Self::MalformedXml(err.to_string())
    }
}

impl From<base64::DecodeError> for XmlError {
    fn from(err: base64::DecodeError) -> Self {
        Self::MalformedEncoding(err.to_string())
    }
}

impl From<std::io::Error> for XmlError {
    fn from(err: std::io::Error) -> Self {
        Self::MalformedEncoding(err.to_string())
    }
}
