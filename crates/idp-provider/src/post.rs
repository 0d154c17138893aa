//! POST-binding signature handling.

use idp_crypto::{sign_enveloped, SignatureAlgorithm};
use idp_xml::constants::POST_BINDING;
use idp_xml::md::{EntityDescriptorType, IdpSsoDescriptorType};
use idp_xml::xml_dsig::SignatureType;

use crate::error::ProviderError;
use crate::storage::CertificateAndKey;

/// Whether the request carries a non-empty embedded signature value.
pub(crate) fn signature_post_provided(signature: Option<&SignatureType>) -> bool {
    signature.is_some_and(SignatureType::has_value)
}

/// Whether a POST-binding embedded signature must be verified.
pub(crate) fn signature_post_verification_necessary(
    idp_metadata: &IdpSsoDescriptorType,
    sp_metadata: &EntityDescriptorType,
    signature: Option<&SignatureType>,
    protocol_binding: &str,
) -> bool {
    let sp_requires = sp_metadata
        .sp_sso_descriptor
        .as_ref()
        .map_or(true, |descriptor| descriptor.authn_requests_signed == "true");
    let idp_requires = idp_metadata.want_authn_requests_signed == "true";

    (sp_requires || idp_requires || signature_post_provided(signature))
        && protocol_binding == POST_BINDING
}

/// Enveloped-signs a marshalled response for POST delivery: the assertion
/// first, then the response covering it.
pub(crate) fn create_post_signature(
    response_xml: &str,
    assertion_id: &str,
    response_id: &str,
    signing_key: &CertificateAndKey,
    algorithm: SignatureAlgorithm,
) -> Result<String, ProviderError> {
    let signed = sign_enveloped(
        response_xml,
        assertion_id,
        &signing_key.key,
        &signing_key.certificate,
        algorithm,
    )?;
    let signed = sign_enveloped(
        &signed,
        response_id,
        &signing_key.key,
        &signing_key.certificate,
        algorithm,
    )?;
    Ok(signed)
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

    fn signature(value: &str) -> SignatureType {
        SignatureType {
            signature_value: value.to_string(),
            ..SignatureType::default()
        }
    }

    #[test]
    fn provided_requires_a_value() {
        assert!(!signature_post_provided(None));
        assert!(!signature_post_provided(Some(&signature(""))));
        assert!(!signature_post_provided(Some(&signature("  "))));
        assert!(signature_post_provided(Some(&signature("c2ln"))));
    }

    #[test]
    fn verification_necessity() {
        let sig = signature("c2ln");
        assert!(signature_post_verification_necessary(
            &idp_metadata("false"),
            &sp_metadata("false"),
            Some(&sig),
            POST_BINDING,
        ));
        assert!(signature_post_verification_necessary(
            &idp_metadata("false"),
            &sp_metadata("true"),
            None,
            POST_BINDING,
        ));
        assert!(!signature_post_verification_necessary(
            &idp_metadata("false"),
            &sp_metadata("false"),
            None,
            POST_BINDING,
        ));
        // Never for the redirect binding.
        assert!(!signature_post_verification_necessary(
            &idp_metadata("true"),
            &sp_metadata("true"),
            Some(&sig),
            idp_xml::constants::REDIRECT_BINDING,
        ));
    }
}
