//! The published IdP metadata.

use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response as HttpResponse};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use std::sync::Arc;

use idp_core::{ContactPerson, IdentityProviderConfig, Organisation};
use idp_crypto::sign_enveloped;
use idp_xml::constants::{
    key_use, ATTRIBUTE_PROFILE_BASIC, NAMEID_FORMAT_PERSISTENT, POST_BINDING, REDIRECT_BINDING,
    SAMLP_NS, SOAP_BINDING,
};
use idp_xml::encode::marshal_entity_descriptor;
use idp_xml::md::{
    AttributeAuthorityDescriptorType, ContactType, EncryptionMethodType, EndpointType,
    EntityDescriptorType, IdpSsoDescriptorType, KeyDescriptorType, OrganizationType,
};
use idp_xml::saml::AttributeType;
use idp_xml::xml_dsig::{KeyInfoType, X509DataType};

use crate::attributes::Attributes;
use crate::identityprovider::Endpoints;
use crate::new_id;
use crate::provider::{request_issuer, AppState};
use crate::time::format_valid_until;

/// GET handler publishing the `EntityDescriptor`.
pub(crate) async fn metadata_handler(
    State(app): State<Arc<AppState>>,
    request: Request,
) -> HttpResponse {
    let issuer = request_issuer(&request);

    let (idp_descriptor, aa_descriptor) = match app.idp.get_metadata(&issuer).await {
        Ok(descriptors) => descriptors,
        Err(err) => {
            tracing::error!(error = %err, "error while getting metadata");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("error while getting metadata: {err}"),
            )
                .into_response();
        }
    };

    let descriptor = entity_descriptor(
        app.idp.entity_id(&issuer),
        idp_descriptor,
        aa_descriptor,
        app.organisation.as_ref(),
        app.contact_person.as_ref(),
    );

    let mut xml = match marshal_entity_descriptor(&descriptor) {
        Ok(xml) => xml,
        Err(err) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("failed to respond with metadata: {err}"),
            )
                .into_response()
        }
    };

    if let Some(algorithm) = app.metadata_signature_algorithm {
        let signing_key = match app.idp.storage.get_metadata_signing_key().await {
            Ok(key) => key,
            Err(err) => {
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("failed to read metadata signing key: {err}"),
                )
                    .into_response()
            }
        };
        xml = match sign_enveloped(
            &xml,
            &descriptor.id,
            &signing_key.key,
            &signing_key.certificate,
            algorithm,
        ) {
            Ok(signed) => signed,
            Err(err) => {
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("failed to sign metadata: {err}"),
                )
                    .into_response()
            }
        };
    }

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/samlmetadata+xml")],
        xml,
    )
        .into_response()
}

/// Builds the role descriptors for the IdP and its attribute authority.
pub(crate) fn idp_descriptors(
    conf: &IdentityProviderConfig,
    endpoints: &Endpoints,
    entity_id: &str,
    issuer: &str,
    cert_der: &[u8],
) -> (IdpSsoDescriptorType, AttributeAuthorityDescriptorType) {
    let key_descriptors = idp_key_descriptors(conf, entity_id, cert_der);
    let valid_until =
        format_valid_until(Utc::now() + chrono::Duration::from_std(conf.metadata.valid_until_duration).unwrap_or_else(|_| chrono::Duration::minutes(5)));
    let cache_duration = conf.metadata.cache_duration.clone().unwrap_or_default();
    let error_url = conf.metadata.error_url.clone().unwrap_or_default();

    let sso_location = endpoints.single_sign_on.absolute(issuer);
    let slo_location = endpoints.single_logout.absolute(issuer);

    let idp = IdpSsoDescriptorType {
        id: new_id(),
        want_authn_requests_signed: if conf.want_authn_requests_signed {
            "true".to_string()
        } else {
            "false".to_string()
        },
        valid_until: valid_until.clone(),
        cache_duration: cache_duration.clone(),
        error_url: error_url.clone(),
        protocol_support_enumeration: SAMLP_NS.to_string(),
        single_sign_on_service: vec![
            EndpointType {
                binding: REDIRECT_BINDING.to_string(),
                location: sso_location.clone(),
                response_location: String::new(),
            },
            EndpointType {
                binding: POST_BINDING.to_string(),
                location: sso_location,
                response_location: String::new(),
            },
        ],
        single_logout_service: vec![
            EndpointType {
                binding: REDIRECT_BINDING.to_string(),
                location: slo_location.clone(),
                response_location: String::new(),
            },
            EndpointType {
                binding: POST_BINDING.to_string(),
                location: slo_location,
                response_location: String::new(),
            },
        ],
        name_id_format: vec![NAMEID_FORMAT_PERSISTENT.to_string()],
        attribute_profile: vec![ATTRIBUTE_PROFILE_BASIC.to_string()],
        attribute: discovery_attributes(),
        key_descriptor: key_descriptors.clone(),
        organization: None,
        contact_person: Vec::new(),
    };

    let attribute_authority = AttributeAuthorityDescriptorType {
        id: new_id(),
        valid_until,
        cache_duration,
        error_url,
        protocol_support_enumeration: SAMLP_NS.to_string(),
        attribute_service: vec![EndpointType {
            binding: SOAP_BINDING.to_string(),
            location: endpoints.attribute.absolute(issuer),
            response_location: String::new(),
        }],
        name_id_format: vec![NAMEID_FORMAT_PERSISTENT.to_string()],
        attribute_profile: vec![ATTRIBUTE_PROFILE_BASIC.to_string()],
        attribute: discovery_attributes(),
        key_descriptor: key_descriptors,
        organization: None,
        contact_person: Vec::new(),
    };

    (idp, attribute_authority)
}

fn idp_key_descriptors(
    conf: &IdentityProviderConfig,
    entity_id: &str,
    cert_der: &[u8],
) -> Vec<KeyDescriptorType> {
    let cert_b64 = STANDARD.encode(cert_der);

    let mut descriptors = vec![KeyDescriptorType {
        use_: key_use::SIGNING.to_string(),
        key_info: KeyInfoType {
            key_name: vec![format!("{entity_id} IDP {}", key_use::SIGNING)],
            x509_data: vec![X509DataType {
                x509_certificate: cert_b64.clone(),
            }],
        },
        encryption_method: Vec::new(),
    }];

    if let Some(algorithm) = &conf.encryption_algorithm {
        descriptors.push(KeyDescriptorType {
            use_: key_use::ENCRYPTION.to_string(),
            key_info: KeyInfoType {
                key_name: vec![format!("{entity_id} IDP {}", key_use::ENCRYPTION)],
                x509_data: vec![X509DataType {
                    x509_certificate: cert_b64,
                }],
            },
            encryption_method: vec![EncryptionMethodType {
                algorithm: algorithm.clone(),
            }],
        });
    }

    descriptors
}

/// The attribute block advertised for discovery: every supported attribute
/// name, values blanked.
fn discovery_attributes() -> Vec<AttributeType> {
    let mut attrs = Attributes::default();
    attrs.set_email("empty");
    attrs.set_full_name("empty");
    attrs.set_given_name("empty");
    attrs.set_surname("empty");
    attrs.set_user_id("empty");
    attrs.set_username("empty");

    let mut saml = attrs.get_saml();
    for attr in &mut saml {
        for value in &mut attr.attribute_value {
            value.clear();
        }
    }
    saml
}

/// Assembles the entity descriptor, attaching organisation and contact
/// blocks to both role descriptors.
pub(crate) fn entity_descriptor(
    entity_id: String,
    mut idp: IdpSsoDescriptorType,
    mut attribute_authority: AttributeAuthorityDescriptorType,
    organisation: Option<&Organisation>,
    contact_person: Option<&ContactPerson>,
) -> EntityDescriptorType {
    if let Some(organisation) = organisation {
        let organization = OrganizationType {
            organization_name: vec![organisation.name.clone()],
            organization_display_name: vec![organisation.display_name.clone()],
            organization_url: vec![organisation.url.clone()],
        };
        idp.organization = Some(organization.clone());
        attribute_authority.organization = Some(organization);
    }

    if let Some(contact) = contact_person {
        let contact = ContactType {
            contact_type: contact.contact_type.as_str().to_string(),
            company: contact.company.clone(),
            given_name: contact.given_name.clone(),
            sur_name: contact.sur_name.clone(),
            email_address: vec![contact.email_address.clone()],
            telephone_number: vec![contact.telephone_number.clone()],
        };
        idp.contact_person = vec![contact.clone()];
        attribute_authority.contact_person = vec![contact];
    }

    EntityDescriptorType {
        entity_id,
        id: new_id(),
        valid_until: String::new(),
        sp_sso_descriptor: None,
        idp_sso_descriptor: Some(idp),
        attribute_authority_descriptor: Some(attribute_authority),
    }
}
