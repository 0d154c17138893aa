//! AuthnRequest intake.
//!
//! One handler serves both bindings: the binding is Redirect when the query
//! string carries `SAMLRequest`, POST otherwise. The validation and IO run
//! as an ordered step sequence; each failing step answers with the SAML
//! status it owes the service provider.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response as HttpResponse};
use chrono::Utc;

use idp_xml::constants::{
    status_code, ENCODING_DEFLATE, POST_BINDING, REDIRECT_BINDING,
};
use idp_xml::decode::{decode_authn_request, inflate_and_decode};
use idp_xml::md::{EntityDescriptorType, IdpSsoDescriptorType, IndexedEndpointType};
use idp_xml::samlp::AuthnRequestType;
use idp_xml::xml_dsig::SignatureType;

use crate::checker::{Checker, StepFuture};
use crate::error::ProviderError;
use crate::form::{form_value, parse_urlencoded};
use crate::identityprovider::IdentityProvider;
use crate::post::signature_post_verification_necessary;
use crate::provider::{read_form_body, request_issuer, AppState};
use crate::redirect::signature_redirect_verification_necessary;
use crate::response::ResponseState;
use crate::serviceprovider::ServiceProvider;
use crate::time::check_request_window;

/// The form fields of an AuthnRequest over either binding.
#[derive(Debug, Clone, Default)]
pub(crate) struct AuthRequestForm {
    pub auth_request: String,
    pub encoding: String,
    pub relay_state: String,
    pub sig_alg: String,
    pub sig: String,
    pub binding: String,
}

pub(crate) struct SsoContext {
    idp: Arc<IdentityProvider>,
    idp_metadata: IdpSsoDescriptorType,
    raw_query: String,
    raw_body: String,
    form: AuthRequestForm,
    request: AuthnRequestType,
    sp: Option<Arc<ServiceProvider>>,
    acs_index: Option<i32>,
    login_url: String,
    response: ResponseState,
}

impl SsoContext {
    fn sp(&self) -> Result<&ServiceProvider, ProviderError> {
        self.sp
            .as_deref()
            .ok_or_else(|| ProviderError::Internal("service provider not resolved".to_string()))
    }
}

/// GET/POST handler for the single sign-on endpoint.
pub(crate) async fn sso_handler(
    State(app): State<Arc<AppState>>,
    request: Request,
) -> HttpResponse {
    let issuer = request_issuer(&request);
    let idp = app.idp.clone();

    let idp_metadata = match idp.get_metadata(&issuer).await {
        Ok((idp_metadata, _)) => idp_metadata,
        Err(err) => {
            tracing::error!(error = %err, "failed to read idp metadata");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("failed to read idp metadata: {err}"),
            )
                .into_response();
        }
    };

    let raw_query = request.uri().query().unwrap_or_default().to_string();
    let raw_body = read_form_body(request).await;

    let mut ctx = SsoContext {
        response: ResponseState {
            issuer: idp.entity_id(&issuer),
            ..ResponseState::default()
        },
        idp,
        idp_metadata,
        raw_query,
        raw_body,
        form: AuthRequestForm::default(),
        request: AuthnRequestType::default(),
        sp: None,
        acs_index: None,
        login_url: String::new(),
    };

    let checker = Checker::new()
        // parse form to cover POST and REDIRECT binding
        .with_logic_step(step_parse_form, fail_form_parse)
        .with_value_not_empty_check(
            "SAMLRequest",
            |ctx: &SsoContext| ctx.form.auth_request.clone(),
            fail_no_auth_request,
        )
        // a signature algorithm without a signature is always a fault
        .with_conditional_value_not_empty(
            |ctx: &SsoContext| !ctx.form.sig_alg.is_empty(),
            "Signature",
            |ctx: &SsoContext| ctx.form.sig.clone(),
            fail_sig_alg_without_signature,
        )
        .with_logic_step(step_decode_request, fail_decode)
        .with_logic_step(step_find_service_provider, fail_unknown_service_provider)
        .with_conditional_logic_step(
            certificate_check_necessary,
            step_check_certificate,
            fail_certificate,
        )
        .with_conditional_logic_step(
            redirect_signature_verification_necessary,
            step_verify_redirect_signature,
            fail_signature,
        )
        .with_conditional_logic_step(
            post_signature_verification_necessary,
            step_verify_post_signature,
            fail_signature,
        )
        .with_value_step(step_resolve_acs)
        .with_value_not_empty_check(
            "acsUrl",
            |ctx: &SsoContext| ctx.response.acs_url.clone(),
            fail_no_acs_url,
        )
        .with_value_not_empty_check(
            "protocol binding",
            |ctx: &SsoContext| ctx.response.protocol_binding.clone(),
            fail_no_protocol_binding,
        )
        .with_logic_step(step_check_request_content, fail_request_content)
        .with_logic_step(step_persist_request, fail_persist);

    if let Some(response) = checker.run(&mut ctx).await {
        return response;
    }

    match ctx.response.protocol_binding.as_str() {
        REDIRECT_BINDING | POST_BINDING => Redirect::to(&ctx.login_url).into_response(),
        other => {
            tracing::error!("unsupported binding: {other}");
            ctx.response.send_back(&ctx.response.make_failed_response(
                status_code::UNSUPPORTED_BINDING,
                &format!("unsupported binding: {other}"),
                &ctx.idp.time_format,
            ))
        }
    }
}

fn step_parse_form(ctx: &mut SsoContext) -> StepFuture<'_> {
    Box::pin(async move {
        let query_pairs = parse_urlencoded(&ctx.raw_query)
            .map_err(|err| ProviderError::InvalidRequest(format!("failed to parse form: {err}")))?;
        let body_pairs = parse_urlencoded(&ctx.raw_body)
            .map_err(|err| ProviderError::InvalidRequest(format!("failed to parse form: {err}")))?;

        let binding = if query_pairs.iter().any(|(key, _)| key == "SAMLRequest") {
            REDIRECT_BINDING
        } else {
            POST_BINDING
        };

        let value = |name: &str| {
            let body_value = form_value(&body_pairs, name);
            if body_value.is_empty() {
                form_value(&query_pairs, name)
            } else {
                body_value
            }
        };

        let mut form = AuthRequestForm {
            auth_request: value("SAMLRequest"),
            encoding: value("SAMLEncoding"),
            relay_state: value("RelayState"),
            sig_alg: value("SigAlg"),
            sig: value("Signature"),
            binding: binding.to_string(),
        };
        if form.encoding.is_empty() && form.binding == REDIRECT_BINDING {
            form.encoding = ENCODING_DEFLATE.to_string();
        }

        ctx.response.sig_alg = form.sig_alg.clone();
        ctx.response.relay_state = form.relay_state.clone();
        ctx.form = form;
        Ok(())
    })
}

fn step_decode_request(ctx: &mut SsoContext) -> StepFuture<'_> {
    Box::pin(async move {
        let request = decode_authn_request(&ctx.form.encoding, &ctx.form.auth_request)?;
        ctx.response.request_id = request.id.clone();
        ctx.request = request;
        Ok(())
    })
}

fn step_find_service_provider(ctx: &mut SsoContext) -> StepFuture<'_> {
    Box::pin(async move {
        let sp = ctx.idp.get_service_provider(&ctx.request.issuer.text).await?;
        ctx.response.audience = sp.entity_id().to_string();
        ctx.sp = Some(sp);
        Ok(())
    })
}

fn certificate_check_necessary(ctx: &SsoContext) -> bool {
    let request_has_key_info = ctx
        .request
        .signature
        .as_ref()
        .is_some_and(|signature| signature.key_info.is_some());
    let sp_has_key_descriptors = ctx.sp.as_ref().is_some_and(|sp| {
        sp.metadata
            .sp_sso_descriptor
            .as_ref()
            .is_some_and(|descriptor| !descriptor.key_descriptor.is_empty())
    });
    request_has_key_info && sp_has_key_descriptors
}

fn step_check_certificate(ctx: &mut SsoContext) -> StepFuture<'_> {
    Box::pin(async move {
        let sp = ctx.sp()?;
        check_certificate(ctx.request.signature.as_ref(), &sp.metadata)
    })
}

fn redirect_signature_verification_necessary(ctx: &SsoContext) -> bool {
    ctx.sp.as_ref().is_some_and(|sp| {
        signature_redirect_verification_necessary(
            &ctx.idp_metadata,
            &sp.metadata,
            &ctx.form.sig,
            &ctx.form.binding,
        )
    })
}

fn step_verify_redirect_signature(ctx: &mut SsoContext) -> StepFuture<'_> {
    Box::pin(async move {
        let sp = ctx.sp()?;
        sp.validate_redirect_signature(
            &ctx.form.auth_request,
            &ctx.form.relay_state,
            &ctx.form.sig_alg,
            &ctx.form.sig,
        )
    })
}

fn post_signature_verification_necessary(ctx: &SsoContext) -> bool {
    ctx.sp.as_ref().is_some_and(|sp| {
        signature_post_verification_necessary(
            &ctx.idp_metadata,
            &sp.metadata,
            ctx.request.signature.as_ref(),
            &ctx.form.binding,
        )
    })
}

fn step_verify_post_signature(ctx: &mut SsoContext) -> StepFuture<'_> {
    Box::pin(async move {
        let data = inflate_and_decode("", true, &ctx.form.auth_request)?;
        let xml = String::from_utf8(data)
            .map_err(|err| ProviderError::InvalidRequest(format!("invalid request: {err}")))?;
        ctx.sp()?.validate_post_signature(&xml)
    })
}

fn step_resolve_acs(ctx: &mut SsoContext) {
    if !ctx.request.assertion_consumer_service_index.is_empty() {
        if let Ok(index) = ctx.request.assertion_consumer_service_index.parse::<i32>() {
            ctx.acs_index = Some(index);
        }
    }

    let services: &[IndexedEndpointType] = ctx
        .sp
        .as_ref()
        .and_then(|sp| sp.metadata.sp_sso_descriptor.as_ref())
        .map(|descriptor| descriptor.assertion_consumer_service.as_slice())
        .unwrap_or_default();

    let (acs_url, protocol_binding) = get_acs_url_and_binding_for_response(
        services,
        &ctx.request.protocol_binding,
        &ctx.request.assertion_consumer_service_url,
        ctx.acs_index,
    );
    ctx.response.acs_url = acs_url;
    ctx.response.protocol_binding = protocol_binding;
}

fn step_check_request_content(ctx: &mut SsoContext) -> StepFuture<'_> {
    Box::pin(async move {
        let sp = ctx.sp()?;
        check_request_required_content(&ctx.idp_metadata, sp, &ctx.request)
    })
}

fn step_persist_request(ctx: &mut SsoContext) -> StepFuture<'_> {
    Box::pin(async move {
        let (application_id, login_prefix) = {
            let sp = ctx.sp()?;
            (sp.id.clone(), sp.login_url(""))
        };
        let stored = ctx
            .idp
            .storage
            .create_auth_request(
                &ctx.request,
                &ctx.response.acs_url,
                &ctx.response.protocol_binding,
                &ctx.form.relay_state,
                &application_id,
            )
            .await?;
        ctx.login_url = format!("{login_prefix}{}", stored.id());
        Ok(())
    })
}

fn fail_form_parse(_ctx: &SsoContext, err: &ProviderError) -> HttpResponse {
    (StatusCode::INTERNAL_SERVER_ERROR, format!("{err}")).into_response()
}

fn fail_no_auth_request(ctx: &SsoContext, _err: &ProviderError) -> HttpResponse {
    denied(ctx, "no auth request provided".to_string())
}

fn fail_sig_alg_without_signature(ctx: &SsoContext, _err: &ProviderError) -> HttpResponse {
    denied(
        ctx,
        "signature algorithm provided but no signature".to_string(),
    )
}

fn fail_decode(ctx: &SsoContext, _err: &ProviderError) -> HttpResponse {
    denied(ctx, "failed to decode request".to_string())
}

fn fail_unknown_service_provider(ctx: &SsoContext, err: &ProviderError) -> HttpResponse {
    denied(
        ctx,
        format!("failed to find registered serviceprovider: {err}"),
    )
}

fn fail_certificate(ctx: &SsoContext, err: &ProviderError) -> HttpResponse {
    denied(
        ctx,
        format!("failed to validate certificate from request: {err}"),
    )
}

fn fail_signature(ctx: &SsoContext, err: &ProviderError) -> HttpResponse {
    denied(ctx, format!("failed to verify signature: {err}"))
}

fn fail_no_acs_url(ctx: &SsoContext, _err: &ProviderError) -> HttpResponse {
    unsupported(ctx, "missing usable assertion consumer url".to_string())
}

fn fail_no_protocol_binding(ctx: &SsoContext, _err: &ProviderError) -> HttpResponse {
    unsupported(ctx, "missing usable protocol binding".to_string())
}

fn fail_request_content(ctx: &SsoContext, err: &ProviderError) -> HttpResponse {
    denied(ctx, format!("failed to validate request content: {err}"))
}

fn fail_persist(ctx: &SsoContext, err: &ProviderError) -> HttpResponse {
    ctx.response.send_back(&ctx.response.make_failed_response(
        status_code::RESPONDER,
        &format!("failed to persist request: {err}"),
        &ctx.idp.time_format,
    ))
}

fn denied(ctx: &SsoContext, message: String) -> HttpResponse {
    ctx.response.send_back(&ctx.response.make_failed_response(
        status_code::REQUEST_DENIED,
        &message,
        &ctx.idp.time_format,
    ))
}

fn unsupported(ctx: &SsoContext, message: String) -> HttpResponse {
    ctx.response.send_back(&ctx.response.make_failed_response(
        status_code::UNSUPPORTED_BINDING,
        &message,
        &ctx.idp.time_format,
    ))
}

/// Requires the certificate used to sign the request to be known from the
/// SP's metadata: byte-identical `X509Certificate` match, no chain building.
pub(crate) fn check_certificate(
    signature: Option<&SignatureType>,
    metadata: &EntityDescriptorType,
) -> Result<(), ProviderError> {
    let descriptor = metadata
        .sp_sso_descriptor
        .as_ref()
        .filter(|descriptor| !descriptor.key_descriptor.is_empty())
        .ok_or_else(|| {
            ProviderError::InvalidRequest(
                "no certificate known for this service provider".to_string(),
            )
        })?;

    let key_info = signature
        .and_then(|signature| signature.key_info.as_ref())
        .filter(|key_info| !key_info.x509_data.is_empty())
        .ok_or_else(|| {
            ProviderError::InvalidRequest("no certificate provided in request".to_string())
        })?;

    for key_descriptor in &descriptor.key_descriptor {
        for sp_x509_data in &key_descriptor.key_info.x509_data {
            for request_x509_data in &key_info.x509_data {
                if sp_x509_data.x509_certificate == request_x509_data.x509_certificate {
                    return Ok(());
                }
            }
        }
    }

    Err(ProviderError::InvalidRequest(
        "unknown certificate used to sign request".to_string(),
    ))
}

pub(crate) fn check_request_required_content(
    idp_metadata: &IdpSsoDescriptorType,
    sp: &ServiceProvider,
    request: &AuthnRequestType,
) -> Result<(), ProviderError> {
    if let Some(conditions) = &request.conditions {
        if !conditions.not_before.is_empty() || !conditions.not_on_or_after.is_empty() {
            check_request_window(&conditions.not_before, &conditions.not_on_or_after, Utc::now())?;
        }
    }

    if request.id.is_empty() {
        return Err(ProviderError::InvalidRequest(
            "ID is missing in request".to_string(),
        ));
    }
    if request.version.is_empty() {
        return Err(ProviderError::InvalidRequest(
            "version is missing in request".to_string(),
        ));
    }
    if request.issuer.text.is_empty() {
        return Err(ProviderError::InvalidRequest(
            "issuer is missing in request".to_string(),
        ));
    }
    if request.issuer.text != sp.entity_id() {
        return Err(ProviderError::InvalidRequest(
            "issuer in request not equal entityID of service provider".to_string(),
        ));
    }

    verify_request_destination(idp_metadata, &request.destination)
}

/// Some SPs provide no destination in their requests; an empty destination
/// is accepted for interoperability.
pub(crate) fn verify_request_destination(
    metadata: &IdpSsoDescriptorType,
    destination: &str,
) -> Result<(), ProviderError> {
    if destination.is_empty() {
        return Ok(());
    }
    let known = metadata
        .single_sign_on_service
        .iter()
        .any(|service| service.location == destination);
    if known {
        Ok(())
    } else {
        Err(ProviderError::InvalidRequest(
            "destination of request is unknown".to_string(),
        ))
    }
}

/// Resolves the ACS URL and binding for the response.
///
/// Tried in order: exact URL+binding match, index match, first entry with
/// the requested binding, the default entry, the entry with the smallest
/// numeric index, the first entry in document order. Non-numeric indexes
/// skip a candidate, never abort the resolution.
#[must_use]
pub fn get_acs_url_and_binding_for_response(
    services: &[IndexedEndpointType],
    request_protocol_binding: &str,
    request_acs_url: &str,
    request_acs_index: Option<i32>,
) -> (String, String) {
    if !request_acs_url.is_empty() {
        for service in services {
            if service.binding == request_protocol_binding && service.location == request_acs_url {
                return (service.location.clone(), service.binding.clone());
            }
        }
    }

    if let Some(index) = request_acs_index {
        for service in services {
            if let Ok(service_index) = service.index.parse::<i32>() {
                if service_index == index {
                    return (service.location.clone(), service.binding.clone());
                }
            }
        }
    }

    for service in services {
        if service.binding == request_protocol_binding {
            return (service.location.clone(), service.binding.clone());
        }
    }

    for service in services {
        if service.is_default == "true" {
            return (service.location.clone(), service.binding.clone());
        }
    }

    let mut min_index: Option<i32> = None;
    let mut best: Option<&IndexedEndpointType> = None;
    for service in services {
        let Ok(service_index) = service.index.parse::<i32>() else {
            continue;
        };
        if min_index.map_or(true, |current| service_index < current) {
            min_index = Some(service_index);
            best = Some(service);
        }
    }
    if let Some(service) = best {
        if !service.location.is_empty() && !service.binding.is_empty() {
            return (service.location.clone(), service.binding.clone());
        }
    }

    if let Some(service) = services.first() {
        return (service.location.clone(), service.binding.clone());
    }

    (String::new(), String::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(
        index: &str,
        is_default: &str,
        binding: &str,
        location: &str,
    ) -> IndexedEndpointType {
        IndexedEndpointType {
            binding: binding.to_string(),
            location: location.to_string(),
            index: index.to_string(),
            is_default: is_default.to_string(),
        }
    }

    #[test]
    fn default_entry_wins_over_order() {
        let services = [
            service("1", "true", REDIRECT_BINDING, "redirect"),
            service("2", "", POST_BINDING, "post"),
        ];
        assert_eq!(
            get_acs_url_and_binding_for_response(&services, REDIRECT_BINDING, "", None),
            ("redirect".to_string(), REDIRECT_BINDING.to_string())
        );
    }

    #[test]
    fn binding_match_picks_the_requested_binding() {
        let services = [
            service("", "", REDIRECT_BINDING, "redirect"),
            service("", "", POST_BINDING, "post"),
        ];
        assert_eq!(
            get_acs_url_and_binding_for_response(&services, POST_BINDING, "", None),
            ("post".to_string(), POST_BINDING.to_string())
        );
        assert_eq!(
            get_acs_url_and_binding_for_response(&services, REDIRECT_BINDING, "", None),
            ("redirect".to_string(), REDIRECT_BINDING.to_string())
        );
    }

    #[test]
    fn exact_url_and_binding_match_is_preferred() {
        let services = [
            service("1", "", POST_BINDING, "http://sp/acs"),
            service("2", "", POST_BINDING, "http://sp/other"),
        ];
        assert_eq!(
            get_acs_url_and_binding_for_response(&services, POST_BINDING, "http://sp/other", None),
            ("http://sp/other".to_string(), POST_BINDING.to_string())
        );
    }

    #[test]
    fn index_match_applies_when_no_url_is_requested() {
        let services = [
            service("1", "", REDIRECT_BINDING, "redirect"),
            service("2", "", POST_BINDING, "post"),
        ];
        assert_eq!(
            get_acs_url_and_binding_for_response(&services, "", "", Some(2)),
            ("post".to_string(), POST_BINDING.to_string())
        );
    }

    #[test]
    fn lowest_numeric_index_is_the_fallback() {
        let services = [
            service("7", "", "other-binding", "seven"),
            service("3", "", "other-binding", "three"),
            service("x", "", "other-binding", "broken"),
        ];
        assert_eq!(
            get_acs_url_and_binding_for_response(&services, REDIRECT_BINDING, "", None),
            ("three".to_string(), "other-binding".to_string())
        );
    }

    #[test]
    fn first_entry_when_nothing_else_matches() {
        let services = [
            service("x", "", "other-binding", "first"),
            service("y", "", "other-binding", "second"),
        ];
        assert_eq!(
            get_acs_url_and_binding_for_response(&services, REDIRECT_BINDING, "", None),
            ("first".to_string(), "other-binding".to_string())
        );
    }

    #[test]
    fn no_services_resolves_to_empty() {
        assert_eq!(
            get_acs_url_and_binding_for_response(&[], REDIRECT_BINDING, "", None),
            (String::new(), String::new())
        );
    }

    #[test]
    fn destination_must_match_an_sso_location_when_present() {
        let metadata = IdpSsoDescriptorType {
            single_sign_on_service: vec![idp_xml::md::EndpointType {
                binding: REDIRECT_BINDING.to_string(),
                location: "https://idp.example.com/SSO".to_string(),
                response_location: String::new(),
            }],
            ..IdpSsoDescriptorType::default()
        };
        verify_request_destination(&metadata, "").unwrap();
        verify_request_destination(&metadata, "https://idp.example.com/SSO").unwrap();
        assert!(verify_request_destination(&metadata, "https://evil.example.com/SSO").is_err());
    }
}
