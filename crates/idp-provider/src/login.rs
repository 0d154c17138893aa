//! The login-UI callback.
//!
//! After the login UI finished, it redirects back with the stored request
//! id. The callback loads the pending request, resolves the subject's
//! attributes, builds the response and signs it according to the stored
//! binding: POST binding enveloped-signs the assertion and the response,
//! redirect binding signs the query string only.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response as HttpResponse};

use idp_xml::constants::{status_code, POST_BINDING, REDIRECT_BINDING};
use idp_xml::encode::marshal_response;

use crate::attributes::Attributes;
use crate::error::ProviderError;
use crate::form::{form_value, parse_urlencoded};
use crate::identityprovider::IdentityProvider;
use crate::post::create_post_signature;
use crate::provider::{read_form_body, request_issuer, AppState};
use crate::redirect::create_redirect_signature;
use crate::response::ResponseState;
use crate::storage::AuthRequest;

/// GET/POST handler for the login-UI callback.
pub(crate) async fn callback_handler(
    State(app): State<Arc<AppState>>,
    request: Request,
) -> HttpResponse {
    let issuer = request_issuer(&request);
    let idp = app.idp.clone();

    let mut response = ResponseState {
        issuer: idp.entity_id(&issuer),
        ..ResponseState::default()
    };

    let raw_query = request.uri().query().unwrap_or_default().to_string();
    let raw_body = read_form_body(request).await;
    let pairs = match parse_urlencoded(&raw_query).and_then(|mut query| {
        parse_urlencoded(&raw_body).map(|mut body| {
            body.append(&mut query);
            body
        })
    }) {
        Ok(pairs) => pairs,
        Err(err) => {
            tracing::error!(error = %err, "failed to parse form");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("failed to parse form: {err}"),
            )
                .into_response();
        }
    };

    let request_id = form_value(&pairs, "id");
    if request_id.is_empty() {
        tracing::error!("no requestID provided");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "no requestID provided".to_string(),
        )
            .into_response();
    }

    let auth_request = match idp.storage.auth_request_by_id(&request_id).await {
        Ok(auth_request) => auth_request,
        Err(err) => {
            tracing::error!(error = %err, "failed to get request");
            return response.send_back(&response.make_failed_response(
                status_code::REQUEST_DENIED,
                &format!("failed to get request: {err}"),
                &idp.time_format,
            ));
        }
    };
    response.request_id = auth_request.auth_request_id().to_string();
    response.relay_state = auth_request.relay_state().to_string();
    response.protocol_binding = auth_request.binding().to_string();
    response.acs_url = auth_request.acs_url().to_string();

    let entity_id = match idp
        .storage
        .get_entity_id_by_app_id(auth_request.application_id())
        .await
    {
        Ok(entity_id) => entity_id,
        Err(err) => {
            tracing::error!(error = %err, "failed to get entityID");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("failed to get entityID: {err}"),
            )
                .into_response();
        }
    };
    response.audience = entity_id;

    match login_response(&idp, auth_request.as_ref(), &mut response).await {
        Ok(http_response) => http_response,
        Err(err) => {
            tracing::error!(error = %err, "failed to create response");
            response.send_back(&response.make_failed_response(
                err.status_code(),
                &format!("failed to create response: {err}"),
                &idp.time_format,
            ))
        }
    }
}

async fn login_response(
    idp: &IdentityProvider,
    auth_request: &dyn AuthRequest,
    response: &mut ResponseState,
) -> Result<HttpResponse, ProviderError> {
    if !auth_request.done() {
        return Err(ProviderError::AuthnFailed);
    }

    let mut attributes = Attributes::default();
    idp.storage
        .set_userinfo_by_user_id(
            auth_request.application_id(),
            &mut attributes,
            auth_request.user_id(),
            &[],
        )
        .await
        .map_err(|err| ProviderError::UserInfo(err.to_string()))?;

    let signing_key = idp.response_signing_key().await?;
    let saml_response =
        response.make_successful_response(&attributes, &idp.time_format, idp.expiration);

    match response.protocol_binding.as_str() {
        POST_BINDING => {
            let xml = marshal_response(&saml_response)?;
            let assertion_id = saml_response
                .assertion
                .as_ref()
                .map(|assertion| assertion.id.clone())
                .unwrap_or_default();
            let signed = create_post_signature(
                &xml,
                &assertion_id,
                &saml_response.id,
                &signing_key,
                idp.signature_algorithm,
            )
            .map_err(|err| ProviderError::Internal(format!("failed to sign response: {err}")))?;
            Ok(response.deliver(signed))
        }
        REDIRECT_BINDING => {
            create_redirect_signature(
                response,
                &saml_response,
                &signing_key,
                idp.signature_algorithm,
            )
            .map_err(|err| ProviderError::Internal(format!("failed to sign response: {err}")))?;
            Ok(response.send_back(&saml_response))
        }
        _ => Ok(response.send_back(&saml_response)),
    }
}
