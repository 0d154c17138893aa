//! SOAP AttributeQuery handling.
//!
//! The back-channel endpoint: an SP posts a SOAP-enveloped AttributeQuery,
//! the provider answers with a signed assertion carrying the requested
//! attributes. Failures on this endpoint are plain HTTP errors; there is no
//! browser to relay a SAML status through.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response as HttpResponse};

use idp_xml::decode::decode_attribute_query;
use idp_xml::encode::marshal_response;
use idp_xml::md::IdpSsoDescriptorType;
use idp_xml::samlp::AttributeQueryType;
use idp_xml::soap::wrap_response;

use crate::attributes::Attributes;
use crate::checker::{Checker, StepFuture};
use crate::error::ProviderError;
use crate::identityprovider::IdentityProvider;
use crate::post::{create_post_signature, signature_post_provided};
use crate::provider::{request_issuer, AppState};
use crate::response::make_attribute_query_response;
use crate::serviceprovider::ServiceProvider;
use crate::sso::{check_certificate, verify_request_destination};

const SOAP_CONTENT_TYPE: &str = "application/soap+xml";

pub(crate) struct AttributeQueryContext {
    idp: Arc<IdentityProvider>,
    idp_metadata: IdpSsoDescriptorType,
    entity_id: String,
    body: String,
    query: AttributeQueryType,
    sp: Option<Arc<ServiceProvider>>,
    response: Option<idp_xml::samlp::ResponseType>,
    response_xml: String,
}

impl AttributeQueryContext {
    fn sp(&self) -> Result<&ServiceProvider, ProviderError> {
        self.sp
            .as_deref()
            .ok_or_else(|| ProviderError::Internal("service provider not resolved".to_string()))
    }
}

/// POST handler for the SOAP attribute query endpoint.
pub(crate) async fn attribute_query_handler(
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

    let is_soap = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.starts_with(SOAP_CONTENT_TYPE))
        .unwrap_or(false);
    if !is_soap {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("failed to parse body: expected {SOAP_CONTENT_TYPE}"),
        )
            .into_response();
    }

    let body = match axum::body::to_bytes(request.into_body(), usize::MAX).await {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(err) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("failed to parse body: {err}"),
            )
                .into_response()
        }
    };

    let mut ctx = AttributeQueryContext {
        entity_id: idp.entity_id(&issuer),
        idp,
        idp_metadata,
        body,
        query: AttributeQueryType::default(),
        sp: None,
        response: None,
        response_xml: String::new(),
    };

    let checker = Checker::new()
        .with_logic_step(step_decode_query, |_, err| {
            internal(format!("failed to decode request: {err}"))
        })
        .with_logic_step(step_find_service_provider, |_, err| {
            internal(format!("failed to find registered serviceprovider: {err}"))
        })
        .with_conditional_logic_step(
            certificate_check_necessary,
            step_check_certificate,
            |_, err| internal(format!("failed to validate certificate from request: {err}")),
        )
        .with_conditional_logic_step(
            signature_provided,
            step_verify_signature,
            |_, err| internal(format!("failed to extract signature from request: {err}")),
        )
        .with_logic_step(step_verify_destination, |_, err| {
            internal(format!("failed to verify request destination: {err}"))
        })
        .with_logic_step(step_build_response, |_, err| {
            internal(format!("failed to get userinfo: {err}"))
        })
        .with_logic_step(step_sign_response, |_, err| {
            internal(format!("failed to sign response: {err}"))
        });

    if let Some(response) = checker.run(&mut ctx).await {
        return response;
    }

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, SOAP_CONTENT_TYPE)],
        wrap_response(&ctx.response_xml),
    )
        .into_response()
}

fn step_decode_query(ctx: &mut AttributeQueryContext) -> StepFuture<'_> {
    Box::pin(async move {
        ctx.query = decode_attribute_query(&ctx.body)?;
        Ok(())
    })
}

fn step_find_service_provider(ctx: &mut AttributeQueryContext) -> StepFuture<'_> {
    Box::pin(async move {
        let sp = ctx.idp.get_service_provider(&ctx.query.issuer.text).await?;
        ctx.sp = Some(sp);
        Ok(())
    })
}

fn certificate_check_necessary(ctx: &AttributeQueryContext) -> bool {
    let request_has_key_info = ctx
        .query
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

fn step_check_certificate(ctx: &mut AttributeQueryContext) -> StepFuture<'_> {
    Box::pin(async move {
        let sp = ctx.sp()?;
        check_certificate(ctx.query.signature.as_ref(), &sp.metadata)
    })
}

fn signature_provided(ctx: &AttributeQueryContext) -> bool {
    signature_post_provided(ctx.query.signature.as_ref())
}

fn step_verify_signature(ctx: &mut AttributeQueryContext) -> StepFuture<'_> {
    Box::pin(async move { ctx.sp()?.validate_post_signature(&ctx.body) })
}

fn step_verify_destination(ctx: &mut AttributeQueryContext) -> StepFuture<'_> {
    Box::pin(async move { verify_request_destination(&ctx.idp_metadata, &ctx.query.destination) })
}

fn step_build_response(ctx: &mut AttributeQueryContext) -> StepFuture<'_> {
    Box::pin(async move {
        let login_name = ctx
            .query
            .subject
            .name_id
            .as_ref()
            .map(|name_id| name_id.text.clone())
            .unwrap_or_default();

        let mut attributes = Attributes::default();
        ctx.idp
            .storage
            .set_userinfo_by_login_name(&mut attributes, &login_name, &[])
            .await
            .map_err(|err| ProviderError::UserInfo(err.to_string()))?;

        let sp_entity_id = ctx.sp()?.entity_id().to_string();
        ctx.response = Some(make_attribute_query_response(
            &ctx.query.id,
            &ctx.entity_id,
            &sp_entity_id,
            &attributes,
            &ctx.query.attribute,
            &ctx.idp.time_format,
            ctx.idp.expiration,
        ));
        Ok(())
    })
}

fn step_sign_response(ctx: &mut AttributeQueryContext) -> StepFuture<'_> {
    Box::pin(async move {
        let signing_key = ctx.idp.response_signing_key().await?;
        let response = ctx
            .response
            .as_ref()
            .ok_or_else(|| ProviderError::Internal("response not built".to_string()))?;

        let xml = marshal_response(response)?;
        let assertion_id = response
            .assertion
            .as_ref()
            .map(|assertion| assertion.id.clone())
            .unwrap_or_default();

        ctx.response_xml = create_post_signature(
            &xml,
            &assertion_id,
            &response.id,
            &signing_key,
            ctx.idp.signature_algorithm,
        )?;
        Ok(())
    })
}

fn internal(message: String) -> HttpResponse {
    (StatusCode::INTERNAL_SERVER_ERROR, message).into_response()
}
