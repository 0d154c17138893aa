//! Signature verification.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use openssl::pkey::{PKey, Public};
use openssl::sign::Verifier;
use openssl::x509::X509;

use crate::algorithm::{digest_from_uri, SignatureAlgorithm};
use crate::error::SignatureError;
use crate::signer::{
    canonicalize, extract_element, find_element_and_insert_position, query_escape,
    rebuild_signed_info, remove_own_signature,
};

/// Verifies the first enveloped signature inside `xml` against the SP's
/// signing certificates.
pub fn verify_post_signature(xml: &str, certs: &[X509]) -> Result<(), SignatureError> {
    if certs.is_empty() {
        return Err(SignatureError::NoCertificate);
    }

    let signature = extract_signature(xml)?;
    let algorithm = SignatureAlgorithm::from_uri(&signature.signature_method)?;

    verify_digest(xml, &signature)?;

    let signed_info = rebuild_signed_info(
        &signature.reference_uri,
        &signature.digest_value,
        &signature.signature_method,
        &signature.digest_method,
    );
    let canonical_signed_info = canonicalize(&signed_info);
    let signature_bytes = STANDARD
        .decode(&signature.signature_value)
        .map_err(|e| SignatureError::BadSignature(e.to_string()))?;

    for cert in certs {
        let public_key = cert.public_key()?;
        if verify_bytes(
            canonical_signed_info.as_bytes(),
            &signature_bytes,
            &public_key,
            algorithm,
        )? {
            return Ok(());
        }
    }

    Err(SignatureError::BadSignature(
        "no known certificate verifies the signature".to_string(),
    ))
}

/// Verifies a redirect-binding detached signature.
///
/// The canonical query is rebuilt from the received values:
/// `SAMLRequest=…[&RelayState=…]&SigAlg=…` with every component
/// percent-encoded; `Signature` is never part of the signed bytes.
pub fn verify_redirect_signature(
    raw_request: &str,
    relay_state: &str,
    sig_alg: &str,
    signature_b64: &str,
    public_key: &PKey<Public>,
) -> Result<(), SignatureError> {
    if raw_request.is_empty() {
        return Err(SignatureError::NoRequest);
    }
    if signature_b64.is_empty() {
        return Err(SignatureError::NoSignature);
    }
    if sig_alg.is_empty() {
        return Err(SignatureError::NoSigAlg);
    }

    let algorithm = SignatureAlgorithm::from_uri(sig_alg)?;

    let signed_query = if relay_state.is_empty() {
        format!(
            "SAMLRequest={}&SigAlg={}",
            query_escape(raw_request),
            query_escape(sig_alg)
        )
    } else {
        format!(
            "SAMLRequest={}&RelayState={}&SigAlg={}",
            query_escape(raw_request),
            query_escape(relay_state),
            query_escape(sig_alg)
        )
    };

    let signature = STANDARD
        .decode(signature_b64)
        .map_err(|e| SignatureError::BadSignature(e.to_string()))?;

    if verify_bytes(signed_query.as_bytes(), &signature, public_key, algorithm)? {
        Ok(())
    } else {
        Err(SignatureError::BadSignature(
            "redirect signature does not verify".to_string(),
        ))
    }
}

fn verify_bytes(
    data: &[u8],
    signature: &[u8],
    public_key: &PKey<Public>,
    algorithm: SignatureAlgorithm,
) -> Result<bool, SignatureError> {
    let mut verifier = Verifier::new(algorithm.message_digest(), public_key)?;
    verifier.update(data)?;
    Ok(verifier.verify(signature).unwrap_or(false))
}

struct ExtractedSignature {
    signature_method: String,
    digest_method: String,
    reference_uri: String,
    digest_value: String,
    signature_value: String,
}

fn extract_signature(xml: &str) -> Result<ExtractedSignature, SignatureError> {
    if !xml.contains("<ds:Signature") && !xml.contains("<Signature") {
        return Err(SignatureError::MissingSignature);
    }

    let signature_method = extract_attribute(xml, "SignatureMethod", "Algorithm")
        .ok_or(SignatureError::MissingSignature)?;
    let digest_method =
        extract_attribute(xml, "DigestMethod", "Algorithm").unwrap_or_default();
    let reference_uri =
        extract_attribute(xml, "Reference", "URI").ok_or(SignatureError::MissingSignature)?;
    let digest_value =
        extract_element_content(xml, "DigestValue").ok_or(SignatureError::MissingSignature)?;
    let signature_value =
        extract_element_content(xml, "SignatureValue").ok_or(SignatureError::MissingSignature)?;

    Ok(ExtractedSignature {
        signature_method,
        digest_method,
        reference_uri,
        digest_value: strip_whitespace(&digest_value),
        signature_value: strip_whitespace(&signature_value),
    })
}

fn verify_digest(xml: &str, signature: &ExtractedSignature) -> Result<(), SignatureError> {
    let reference_id = signature
        .reference_uri
        .strip_prefix('#')
        .unwrap_or(&signature.reference_uri);

    let (element_start, insert_position) = find_element_and_insert_position(xml, reference_id)?;
    let element = extract_element(xml, element_start)?;

    let canonical = canonicalize(&remove_own_signature(&element, insert_position - element_start));
    let digest = openssl::hash::hash(digest_from_uri(&signature.digest_method), canonical.as_bytes())?;

    if STANDARD.encode(digest) != signature.digest_value {
        return Err(SignatureError::DigestMismatch);
    }
    Ok(())
}

fn strip_whitespace(value: &str) -> String {
    value.chars().filter(|c| !c.is_whitespace()).collect()
}

fn extract_attribute(xml: &str, element: &str, attribute: &str) -> Option<String> {
    for pattern in [format!("<ds:{element}"), format!("<{element}")] {
        if let Some(pos) = xml.find(&pattern) {
            let end = xml[pos..].find('>')?;
            let element_str = &xml[pos..pos + end];
            let attr_pattern = format!("{attribute}=\"");
            if let Some(attr_start) = element_str.find(&attr_pattern) {
                let value_start = attr_start + attr_pattern.len();
                let value_end = element_str[value_start..].find('"')?;
                return Some(element_str[value_start..value_start + value_end].to_string());
            }
        }
    }
    None
}

fn extract_element_content(xml: &str, element: &str) -> Option<String> {
    for (open, close) in [
        (format!("<ds:{element}>"), format!("</ds:{element}>")),
        (format!("<{element}>"), format!("</{element}>")),
    ] {
        if let Some(start) = xml.find(&open) {
            let content_start = start + open.len();
            if let Some(end) = xml[content_start..].find(&close) {
                return Some(xml[content_start..content_start + end].to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signer::{sign_enveloped, sign_redirect_query};
    use crate::testutil::{keypair, self_signed};

    const RESPONSE_DOC: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<samlp:Response xmlns:samlp=\"urn:oasis:names:tc:SAML:2.0:protocol\" xmlns:saml=\"urn:oasis:names:tc:SAML:2.0:assertion\" ID=\"_resp1\" Version=\"2.0\" IssueInstant=\"2024-01-01T00:00:00.000000Z\"><saml:Issuer>https://idp.example.com</saml:Issuer><samlp:Status><samlp:StatusCode Value=\"urn:oasis:names:tc:SAML:2.0:status:Success\"/></samlp:Status><saml:Assertion ID=\"_a1\" Version=\"2.0\" IssueInstant=\"2024-01-01T00:00:00.000000Z\"><saml:Issuer>https://idp.example.com</saml:Issuer><saml:Subject><saml:NameID>user</saml:NameID></saml:Subject></saml:Assertion></samlp:Response>";

    #[test]
    fn post_signature_roundtrip() {
        let key = keypair();
        let cert = self_signed(&key);
        let cert_der = cert.to_der().unwrap();

        let signed = sign_enveloped(
            RESPONSE_DOC,
            "_resp1",
            &key,
            &cert_der,
            SignatureAlgorithm::RsaSha256,
        )
        .unwrap();

        assert!(signed.contains("<ds:Signature"));
        verify_post_signature(&signed, &[cert]).unwrap();
    }

    #[test]
    fn tampering_breaks_the_digest() {
        let key = keypair();
        let cert = self_signed(&key);
        let cert_der = cert.to_der().unwrap();

        let signed = sign_enveloped(
            RESPONSE_DOC,
            "_resp1",
            &key,
            &cert_der,
            SignatureAlgorithm::RsaSha256,
        )
        .unwrap();

        let tampered = signed.replace(">user<", ">mallory<");
        let err = verify_post_signature(&tampered, &[cert]).unwrap_err();
        assert!(matches!(err, SignatureError::DigestMismatch));
    }

    #[test]
    fn wrong_certificate_is_rejected() {
        let key = keypair();
        let cert_der = self_signed(&key).to_der().unwrap();
        let other_cert = self_signed(&keypair());

        let signed = sign_enveloped(
            RESPONSE_DOC,
            "_resp1",
            &key,
            &cert_der,
            SignatureAlgorithm::RsaSha256,
        )
        .unwrap();

        let err = verify_post_signature(&signed, &[other_cert]).unwrap_err();
        assert!(matches!(err, SignatureError::BadSignature(_)));
    }

    #[test]
    fn assertion_level_signature_roundtrip() {
        let key = keypair();
        let cert = self_signed(&key);
        let cert_der = cert.to_der().unwrap();

        // Sign the assertion first, then the response covering it.
        let signed = sign_enveloped(
            RESPONSE_DOC,
            "_a1",
            &key,
            &cert_der,
            SignatureAlgorithm::RsaSha256,
        )
        .unwrap();
        let signed = sign_enveloped(
            &signed,
            "_resp1",
            &key,
            &cert_der,
            SignatureAlgorithm::RsaSha256,
        )
        .unwrap();

        // The first signature in document order is the response signature.
        verify_post_signature(&signed, &[cert]).unwrap();
    }

    #[test]
    fn redirect_signature_roundtrip() {
        let key = keypair();
        let public_key = openssl::pkey::PKey::public_key_from_pem(
            &key.public_key_to_pem().unwrap(),
        )
        .unwrap();

        let raw_request = "nJJBj9MwEIX/ijX3";
        let relay_state = "state-1";
        let sig_alg = SignatureAlgorithm::RsaSha256;

        let signed_query = format!(
            "SAMLRequest={}&RelayState={}&SigAlg={}",
            query_escape(raw_request),
            query_escape(relay_state),
            query_escape(sig_alg.uri())
        );
        let signature = sign_redirect_query(&signed_query, &key, sig_alg).unwrap();
        let signature_b64 = STANDARD.encode(signature);

        verify_redirect_signature(raw_request, relay_state, sig_alg.uri(), &signature_b64, &public_key)
            .unwrap();

        // Mutating any component must break verification.
        assert!(verify_redirect_signature(
            raw_request,
            "other-state",
            sig_alg.uri(),
            &signature_b64,
            &public_key
        )
        .is_err());
    }

    #[test]
    fn missing_fields_are_distinct_errors() {
        let key = keypair();
        let public_key =
            openssl::pkey::PKey::public_key_from_pem(&key.public_key_to_pem().unwrap()).unwrap();

        assert!(matches!(
            verify_redirect_signature("", "rs", "alg", "sig", &public_key),
            Err(SignatureError::NoRequest)
        ));
        assert!(matches!(
            verify_redirect_signature("req", "rs", "alg", "", &public_key),
            Err(SignatureError::NoSignature)
        ));
        assert!(matches!(
            verify_redirect_signature("req", "rs", "", "sig", &public_key),
            Err(SignatureError::NoSigAlg)
        ));
    }
}
