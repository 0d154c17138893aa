//! Certificate parsing for metadata key descriptors.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use openssl::x509::X509;

use crate::error::SignatureError;

/// Parses certificates out of metadata `X509Certificate` values.
///
/// Values may carry arbitrary whitespace and an optional
/// `BEGIN/END CERTIFICATE` fence around the Base64 DER payload.
pub fn parse_certificates(cert_strs: &[String]) -> Result<Vec<X509>, SignatureError> {
    let mut certs = Vec::new();
    for cert_str in cert_strs {
        let compact: String = cert_str.chars().filter(|c| !c.is_whitespace()).collect();
        let compact = compact
            .trim_start_matches("-----BEGINCERTIFICATE-----")
            .trim_end_matches("-----ENDCERTIFICATE-----");
        let der = STANDARD
            .decode(compact)
            .map_err(|e| SignatureError::MalformedCertificate(e.to_string()))?;
        let cert =
            X509::from_der(&der).map_err(|e| SignatureError::MalformedCertificate(e.to_string()))?;
        certs.push(cert);
    }
    Ok(certs)
}

/// PEM-encodes a DER certificate.
pub fn certificate_to_pem(der: &[u8]) -> Result<String, SignatureError> {
    let cert =
        X509::from_der(der).map_err(|e| SignatureError::MalformedCertificate(e.to_string()))?;
    let pem = cert.to_pem()?;
    String::from_utf8(pem).map_err(|e| SignatureError::MalformedCertificate(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{keypair, self_signed};

    #[test]
    fn parses_bare_base64() {
        let cert = self_signed(&keypair());
        let b64 = STANDARD.encode(cert.to_der().unwrap());

        let parsed = parse_certificates(&[b64]).unwrap();
        assert_eq!(parsed.len(), 1);
    }

    #[test]
    fn parses_fenced_and_wrapped_pem() {
        let cert = self_signed(&keypair());
        let pem = String::from_utf8(cert.to_pem().unwrap()).unwrap();

        let parsed = parse_certificates(&[pem]).unwrap();
        assert_eq!(parsed.len(), 1);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_certificates(&["!!".to_string()]).is_err());
    }

    #[test]
    fn pem_encoding_roundtrips() {
        let cert = self_signed(&keypair());
        let pem = certificate_to_pem(&cert.to_der().unwrap()).unwrap();
        assert!(pem.starts_with("-----BEGIN CERTIFICATE-----"));
    }
}
