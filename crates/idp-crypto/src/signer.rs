//! Signature creation.
//!
//! Enveloped signatures are built over the marshalled document text: the
//! digest covers the referenced element (minus any signature element), the
//! resulting `ds:Signature` is inserted after the element's `Issuer` child.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use openssl::hash::MessageDigest;
use openssl::pkey::{PKey, Private};
use openssl::sign::Signer;

use crate::algorithm::SignatureAlgorithm;
use crate::error::SignatureError;

pub(crate) const EXCLUSIVE_C14N: &str = "http://www.w3.org/2001/10/xml-exc-c14n#";
pub(crate) const ENVELOPED_SIGNATURE: &str =
    "http://www.w3.org/2000/09/xmldsig#enveloped-signature";
pub(crate) const DIGEST_SHA256: &str = "http://www.w3.org/2001/04/xmlenc#sha256";

/// Signs the element referenced by `reference_id` inside `xml` and returns
/// the document with the `ds:Signature` element inserted.
pub fn sign_enveloped(
    xml: &str,
    reference_id: &str,
    key: &PKey<Private>,
    cert_der: &[u8],
    algorithm: SignatureAlgorithm,
) -> Result<String, SignatureError> {
    let (element_start, insert_position) = find_element_and_insert_position(xml, reference_id)?;

    let element = extract_element(xml, element_start)?;
    let canonical = canonicalize(&remove_own_signature(&element, insert_position - element_start));
    let digest = openssl::hash::hash(MessageDigest::sha256(), canonical.as_bytes())?;
    let digest_b64 = STANDARD.encode(digest);

    let signed_info = build_signed_info(reference_id, &digest_b64, algorithm.uri());
    let canonical_signed_info = canonicalize(&signed_info);

    let signature = sign_bytes(canonical_signed_info.as_bytes(), key, algorithm)?;
    let signature_element = build_signature_element(
        &signed_info,
        &STANDARD.encode(signature),
        &STANDARD.encode(cert_der),
    );

    let mut signed = String::with_capacity(xml.len() + signature_element.len());
    signed.push_str(&xml[..insert_position]);
    signed.push_str(&signature_element);
    signed.push_str(&xml[insert_position..]);
    Ok(signed)
}

/// Signs a redirect-binding canonical query string.
///
/// The caller supplies the query with every component already
/// percent-encoded; `Signature` must not be part of it.
pub fn sign_redirect_query(
    query: &str,
    key: &PKey<Private>,
    algorithm: SignatureAlgorithm,
) -> Result<Vec<u8>, SignatureError> {
    sign_bytes(query.as_bytes(), key, algorithm)
}

/// Percent-encodes a query component the way SAML peers build the signed
/// redirect query (space becomes `+`).
#[must_use]
pub fn query_escape(value: &str) -> String {
    urlencoding::encode(value).replace("%20", "+")
}

fn sign_bytes(
    data: &[u8],
    key: &PKey<Private>,
    algorithm: SignatureAlgorithm,
) -> Result<Vec<u8>, SignatureError> {
    let mut signer = Signer::new(algorithm.message_digest(), key)?;
    signer.update(data)?;
    Ok(signer.sign_to_vec()?)
}

/// Collapses whitespace runs; the shared canonical form used for digest and
/// `SignedInfo` computation on both the signing and the verifying side.
pub(crate) fn canonicalize(xml: &str) -> String {
    xml.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Removes the element's own signature: the signature sitting at the
/// position where this signer inserts it (right after the `Issuer` child).
/// Signatures of nested elements are part of the signed content and stay.
pub(crate) fn remove_own_signature(element: &str, own_offset: usize) -> String {
    let rest = &element[own_offset..];
    for (open, close) in [
        ("<ds:Signature", "</ds:Signature>"),
        ("<Signature", "</Signature>"),
    ] {
        if rest.starts_with(open) {
            if let Some(end_offset) = rest.find(close) {
                let end = own_offset + end_offset + close.len();
                return format!("{}{}", &element[..own_offset], &element[end..]);
            }
        }
    }
    element.to_string()
}

/// Locates the element carrying the reference ID and the position where the
/// signature is inserted (after the element's `Issuer` child when present).
pub(crate) fn find_element_and_insert_position(
    xml: &str,
    reference_id: &str,
) -> Result<(usize, usize), SignatureError> {
    let id_pattern = format!("ID=\"{reference_id}\"");
    let alt_pattern = format!("Id=\"{reference_id}\"");

    let id_position = xml
        .find(&id_pattern)
        .or_else(|| xml.find(&alt_pattern))
        .ok_or_else(|| {
            SignatureError::Crypto(format!("element with ID '{reference_id}' not found"))
        })?;

    let tag_start = xml[..id_position]
        .rfind('<')
        .ok_or_else(|| SignatureError::Crypto("malformed element".to_string()))?;

    let tag_end = xml[id_position..]
        .find('>')
        .map(|pos| id_position + pos + 1)
        .ok_or_else(|| SignatureError::Crypto("malformed element".to_string()))?;

    let insert_position = find_issuer_end(xml, tag_end).unwrap_or(tag_end);
    Ok((tag_start, insert_position))
}

fn find_issuer_end(xml: &str, after: usize) -> Option<usize> {
    let search_area = &xml[after..];
    for pattern in ["</saml:Issuer>", "</Issuer>", "</saml2:Issuer>"] {
        if let Some(pos) = search_area.find(pattern) {
            return Some(after + pos + pattern.len());
        }
    }
    None
}

/// Extracts the complete element starting at `start`.
pub(crate) fn extract_element(xml: &str, start: usize) -> Result<String, SignatureError> {
    let rest = &xml[start + 1..];
    let name_len = rest
        .find(|c: char| c == ' ' || c == '>' || c == '/')
        .ok_or_else(|| SignatureError::Crypto("malformed element".to_string()))?;
    let full_tag_name = &rest[..name_len];

    let close_pattern = format!("</{full_tag_name}>");
    if let Some(close_pos) = xml[start..].find(&close_pattern) {
        let end = start + close_pos + close_pattern.len();
        return Ok(xml[start..end].to_string());
    }

    // Self-closing element.
    if let Some(end_offset) = xml[start..].find("/>") {
        return Ok(xml[start..start + end_offset + 2].to_string());
    }

    Err(SignatureError::Crypto(format!(
        "unclosed element '{full_tag_name}'"
    )))
}

fn build_signed_info(reference_id: &str, digest_b64: &str, algorithm_uri: &str) -> String {
    format!(
        "<ds:SignedInfo xmlns:ds=\"http://www.w3.org/2000/09/xmldsig#\">\
<ds:CanonicalizationMethod Algorithm=\"{EXCLUSIVE_C14N}\"/>\
<ds:SignatureMethod Algorithm=\"{algorithm_uri}\"/>\
<ds:Reference URI=\"#{reference_id}\">\
<ds:Transforms>\
<ds:Transform Algorithm=\"{ENVELOPED_SIGNATURE}\"/>\
<ds:Transform Algorithm=\"{EXCLUSIVE_C14N}\"/>\
</ds:Transforms>\
<ds:DigestMethod Algorithm=\"{DIGEST_SHA256}\"/>\
<ds:DigestValue>{digest_b64}</ds:DigestValue>\
</ds:Reference>\
</ds:SignedInfo>"
    )
}

/// Rebuilds the `SignedInfo` text for verification; must stay in sync with
/// [`build_signed_info`].
pub(crate) fn rebuild_signed_info(
    reference_uri: &str,
    digest_value: &str,
    algorithm_uri: &str,
    digest_uri: &str,
) -> String {
    format!(
        "<ds:SignedInfo xmlns:ds=\"http://www.w3.org/2000/09/xmldsig#\">\
<ds:CanonicalizationMethod Algorithm=\"{EXCLUSIVE_C14N}\"/>\
<ds:SignatureMethod Algorithm=\"{algorithm_uri}\"/>\
<ds:Reference URI=\"{reference_uri}\">\
<ds:Transforms>\
<ds:Transform Algorithm=\"{ENVELOPED_SIGNATURE}\"/>\
<ds:Transform Algorithm=\"{EXCLUSIVE_C14N}\"/>\
</ds:Transforms>\
<ds:DigestMethod Algorithm=\"{digest_uri}\"/>\
<ds:DigestValue>{digest_value}</ds:DigestValue>\
</ds:Reference>\
</ds:SignedInfo>"
    )
}

fn build_signature_element(signed_info: &str, signature_b64: &str, cert_b64: &str) -> String {
    format!(
        "<ds:Signature xmlns:ds=\"http://www.w3.org/2000/09/xmldsig#\">\
{signed_info}\
<ds:SignatureValue>{signature_b64}</ds:SignatureValue>\
<ds:KeyInfo><ds:X509Data><ds:X509Certificate>{cert_b64}</ds:X509Certificate></ds:X509Data></ds:KeyInfo>\
</ds:Signature>"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_escape_matches_peer_encoding() {
        assert_eq!(query_escape("response!"), "response%21");
        assert_eq!(query_escape("a b"), "a+b");
        assert_eq!(
            query_escape("http://www.w3.org/2000/09/xmldsig#rsa-sha1"),
            "http%3A%2F%2Fwww.w3.org%2F2000%2F09%2Fxmldsig%23rsa-sha1"
        );
        assert_eq!(query_escape("base64+/="), "base64%2B%2F%3D");
    }

    #[test]
    fn canonicalize_collapses_whitespace() {
        assert_eq!(
            canonicalize("<a>\n  <b>text  here</b>\n</a>"),
            "<a> <b>text here</b> </a>"
        );
    }

    #[test]
    fn remove_own_signature_only_strips_at_the_insertion_point() {
        let xml = "<Root><ds:Signature>sig</ds:Signature><Data>content</Data></Root>";
        let stripped = remove_own_signature(xml, "<Root>".len());
        assert_eq!(stripped, "<Root><Data>content</Data></Root>");

        // A nested signature further in is part of the signed content.
        let xml = "<Root><Data><ds:Signature>inner</ds:Signature></Data></Root>";
        let untouched = remove_own_signature(xml, "<Root>".len());
        assert_eq!(untouched, xml);
    }

    #[test]
    fn insert_position_is_after_issuer() {
        let xml = r#"<samlp:Response ID="_r1"><saml:Issuer>idp</saml:Issuer><samlp:Status/></samlp:Response>"#;
        let (start, insert) = find_element_and_insert_position(xml, "_r1").unwrap();
        assert_eq!(start, 0);
        assert_eq!(&xml[insert..insert + 13], "<samlp:Status");
    }

    #[test]
    fn extract_element_finds_matching_close() {
        let xml = r#"<outer><saml:Assertion ID="_a1"><saml:Issuer>x</saml:Issuer></saml:Assertion></outer>"#;
        let (start, _) = find_element_and_insert_position(xml, "_a1").unwrap();
        let element = extract_element(xml, start).unwrap();
        assert!(element.starts_with("<saml:Assertion"));
        assert!(element.ends_with("</saml:Assertion>"));
    }
}
