//! Redirect-binding signature handling.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use idp_crypto::{query_escape, sign_redirect_query, SignatureAlgorithm};
use idp_xml::encode::{deflate_and_base64, marshal_response};
use idp_xml::md::{EntityDescriptorType, IdpSsoDescriptorType};
use idp_xml::samlp::ResponseType;

use idp_xml::constants::REDIRECT_BINDING;

use crate::error::ProviderError;
use crate::response::ResponseState;
use crate::storage::CertificateAndKey;

/// Whether a redirect-binding request signature must be verified.
///
/// Verification applies when the SP declares its requests signed, the IdP
/// requires signed requests, or a signature was supplied anyway.
pub(crate) fn signature_redirect_verification_necessary(
    idp_metadata: &IdpSsoDescriptorType,
    sp_metadata: &EntityDescriptorType,
    signature: &str,
    protocol_binding: &str,
) -> bool {
    let sp_requires = sp_metadata
        .sp_sso_descriptor
        .as_ref()
        .map_or(true, |descriptor| descriptor.authn_requests_signed == "true");
    let idp_requires = idp_metadata.want_authn_requests_signed == "true";

    (sp_requires || idp_requires || !signature.is_empty()) && protocol_binding == REDIRECT_BINDING
}

/// Builds the redirect query in the canonical segment order.
///
/// Empty segments are omitted; every component is percent-encoded. The same
/// composition (with an empty `Signature`) is the byte sequence covered by
/// the redirect signature.
#[must_use]
pub fn build_redirect_query(
    response: &str,
    relay_state: &str,
    sig_alg: &str,
    signature: &str,
) -> String {
    let mut query = format!("SAMLResponse={}", query_escape(response));
    if !relay_state.is_empty() {
        query.push_str(&format!("&RelayState={}", query_escape(relay_state)));
    }
    if !signature.is_empty() {
        query.push_str(&format!("&Signature={}", query_escape(signature)));
    }
    if !sig_alg.is_empty() {
        query.push_str(&format!("&SigAlg={}", query_escape(sig_alg)));
    }
    query
}

/// Signs the redirect query for a response and records signature and
/// algorithm on the response state.
pub(crate) fn create_redirect_signature(
    response_state: &mut ResponseState,
    saml_response: &ResponseType,
    signing_key: &CertificateAndKey,
    algorithm: SignatureAlgorithm,
) -> Result<(), ProviderError> {
    let xml = marshal_response(saml_response)?;
    let encoded = deflate_and_base64(xml.as_bytes())?;

    let signed_query = build_redirect_query(
        &encoded,
        &response_state.relay_state,
        algorithm.uri(),
        "",
    );
    let signature = sign_redirect_query(&signed_query, &signing_key.key, algorithm)?;

    response_state.signature = STANDARD.encode(signature);
    response_state.sig_alg = algorithm.uri().to_string();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use idp_xml::md::SpSsoDescriptorType;

    fn sp_metadata(signed: &str) -> EntityDescriptorType {
        EntityDescriptorType {
            sp_sso_descriptor: Some(SpSsoDescriptorType {
                authn_requests_signed: signed.to_string(),
                ..SpSsoDescriptorType::default()
            }),
            ..EntityDescriptorType::default()
        }
    }

    fn idp_metadata(want_signed: &str) -> IdpSsoDescriptorType {
        IdpSsoDescriptorType {
            want_authn_requests_signed: want_signed.to_string(),
            ..IdpSsoDescriptorType::default()
        }
    }

    #[test]
    fn verification_necessity() {
        // A provided signature alone triggers verification.
        assert!(signature_redirect_verification_necessary(
            &idp_metadata("false"),
            &sp_metadata("false"),
            "sig",
            REDIRECT_BINDING,
        ));
        // SP declaring signed requests triggers it.
        assert!(signature_redirect_verification_necessary(
            &idp_metadata("false"),
            &sp_metadata("true"),
            "",
            REDIRECT_BINDING,
        ));
        // The IdP requiring signed requests triggers it.
        assert!(signature_redirect_verification_necessary(
            &idp_metadata("true"),
            &sp_metadata("false"),
            "",
            REDIRECT_BINDING,
        ));
        // Nothing requires it.
        assert!(!signature_redirect_verification_necessary(
            &idp_metadata("false"),
            &sp_metadata("false"),
            "",
            REDIRECT_BINDING,
        ));
        // Never for the POST binding.
        assert!(!signature_redirect_verification_necessary(
            &idp_metadata("true"),
            &sp_metadata("true"),
            "sig",
            idp_xml::constants::POST_BINDING,
        ));
    }

    #[test]
    fn query_composition_is_literal() {
        assert_eq!(
            build_redirect_query("response!", "relayState!", "sigAlg!", "sig!"),
            "SAMLResponse=response%21&RelayState=relayState%21&Signature=sig%21&SigAlg=sigAlg%21"
        );
    }

    #[test]
    fn empty_segments_are_omitted() {
        assert_eq!(
            build_redirect_query("resp", "", "", ""),
            "SAMLResponse=resp"
        );
        assert_eq!(
            build_redirect_query("resp", "rs", "", ""),
            "SAMLResponse=resp&RelayState=rs"
        );
        assert_eq!(
            build_redirect_query("resp", "", "alg", ""),
            "SAMLResponse=resp&SigAlg=alg"
        );
    }
}
