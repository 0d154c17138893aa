//! LogoutRequest handling.
//!
//! The logout response is always delivered through a POST auto-submit form
//! targeting the SP's first single logout service entry; binding preference
//! is not enforced in this revision.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::response::{Html, IntoResponse, Response as HttpResponse};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;

use idp_xml::constants::status_code;
use idp_xml::decode::decode_logout_request;
use idp_xml::encode::marshal_logout_response;
use idp_xml::saml::NameIdType;
use idp_xml::samlp::{LogoutRequestType, LogoutResponseType, StatusCodeType, StatusType};

use crate::checker::{Checker, StepFuture};
use crate::error::ProviderError;
use crate::form::{form_value, parse_urlencoded};
use crate::identityprovider::IdentityProvider;
use crate::new_id;
use crate::provider::{read_form_body, request_issuer, AppState};
use crate::response::{get_issuer, html_escape, send_error};
use crate::serviceprovider::ServiceProvider;
use crate::time::{check_request_window, format_instant};

/// The form fields of a LogoutRequest.
#[derive(Debug, Clone, Default)]
pub(crate) struct LogoutRequestForm {
    pub logout_request: String,
    pub encoding: String,
    pub relay_state: String,
}

/// Per-request scratch pad for the logout flow.
#[derive(Debug, Clone, Default)]
pub struct LogoutResponseState {
    /// Relay state echoed back to the SP.
    pub relay_state: String,
    /// The resolved single logout URL; empty when the SP advertises none.
    pub logout_url: String,
    /// ID of the request being answered.
    pub request_id: String,
    /// The IdP entity ID for this request.
    pub issuer: String,
}

impl LogoutResponseState {
    /// Builds the logout response for a completed logout.
    #[must_use]
    pub fn make_successful_logout_response(&self, time_format: &str) -> LogoutResponseType {
        make_logout_response(
            &self.request_id,
            &self.logout_url,
            &format_instant(Utc::now(), time_format),
            status_code::SUCCESS,
            "",
            get_issuer(&self.issuer),
        )
    }

    /// Builds the logout response for a refused request.
    #[must_use]
    pub fn make_denied_logout_response(
        &self,
        message: &str,
        time_format: &str,
    ) -> LogoutResponseType {
        make_logout_response(
            &self.request_id,
            &self.logout_url,
            &format_instant(Utc::now(), time_format),
            status_code::REQUEST_DENIED,
            message,
            get_issuer(&self.issuer),
        )
    }

    /// Delivers a logout response through the POST auto-submit template.
    #[must_use]
    pub fn send_back(&self, response: &LogoutResponseType) -> HttpResponse {
        let xml = match marshal_logout_response(response) {
            Ok(xml) => xml,
            Err(err) => return send_error(&err),
        };
        let encoded = STANDARD.encode(xml.as_bytes());
        Html(render_logout_form(&self.logout_url, &self.relay_state, &encoded)).into_response()
    }
}

/// Builds a `LogoutResponse` with the given status.
#[must_use]
pub fn make_logout_response(
    request_id: &str,
    logout_url: &str,
    issue_instant: &str,
    status: &str,
    message: &str,
    issuer: NameIdType,
) -> LogoutResponseType {
    LogoutResponseType {
        id: new_id(),
        in_response_to: request_id.to_string(),
        version: "2.0".to_string(),
        issue_instant: issue_instant.to_string(),
        destination: logout_url.to_string(),
        issuer: Some(issuer),
        status: StatusType {
            status_code: StatusCodeType {
                value: status.to_string(),
            },
            status_message: message.to_string(),
        },
    }
}

pub(crate) struct LogoutContext {
    idp: Arc<IdentityProvider>,
    raw_query: String,
    raw_body: String,
    form: LogoutRequestForm,
    logout_request: LogoutRequestType,
    sp: Option<Arc<ServiceProvider>>,
    response: LogoutResponseState,
}

/// GET/POST handler for the single logout endpoint.
pub(crate) async fn logout_handler(
    State(app): State<Arc<AppState>>,
    request: Request,
) -> HttpResponse {
    let issuer = request_issuer(&request);
    let idp = app.idp.clone();

    let raw_query = request.uri().query().unwrap_or_default().to_string();
    let raw_body = read_form_body(request).await;

    let mut ctx = LogoutContext {
        response: LogoutResponseState {
            issuer: idp.entity_id(&issuer),
            ..LogoutResponseState::default()
        },
        idp,
        raw_query,
        raw_body,
        form: LogoutRequestForm::default(),
        logout_request: LogoutRequestType::default(),
        sp: None,
    };

    let checker = Checker::new()
        .with_logic_step(step_parse_form, fail_form_parse)
        .with_logic_step(step_decode_request, fail_decode)
        .with_logic_step(step_check_request_window, fail_window)
        .with_logic_step(step_find_service_provider, fail_unknown_service_provider)
        .with_value_step(step_resolve_logout_url);

    if let Some(response) = checker.run(&mut ctx).await {
        return response;
    }

    let http_response = ctx
        .response
        .send_back(&ctx.response.make_successful_logout_response(&ctx.idp.time_format));
    tracing::info!(
        "logout request for user {}",
        ctx.logout_request.name_id.text
    );
    http_response
}

fn step_parse_form(ctx: &mut LogoutContext) -> StepFuture<'_> {
    Box::pin(async move {
        let query_pairs = parse_urlencoded(&ctx.raw_query)?;
        let body_pairs = parse_urlencoded(&ctx.raw_body)?;
        let value = |name: &str| {
            let body_value = form_value(&body_pairs, name);
            if body_value.is_empty() {
                form_value(&query_pairs, name)
            } else {
                body_value
            }
        };

        ctx.form = LogoutRequestForm {
            logout_request: value("SAMLRequest"),
            encoding: value("SAMLEncoding"),
            relay_state: value("RelayState"),
        };
        ctx.response.relay_state = ctx.form.relay_state.clone();
        Ok(())
    })
}

fn step_decode_request(ctx: &mut LogoutContext) -> StepFuture<'_> {
    Box::pin(async move {
        let request = decode_logout_request(&ctx.form.encoding, &ctx.form.logout_request)?;
        ctx.response.request_id = request.id.clone();
        ctx.logout_request = request;
        Ok(())
    })
}

fn step_check_request_window(ctx: &mut LogoutContext) -> StepFuture<'_> {
    Box::pin(async move {
        check_request_window(
            &ctx.logout_request.issue_instant,
            &ctx.logout_request.not_on_or_after,
            Utc::now(),
        )
    })
}

fn step_find_service_provider(ctx: &mut LogoutContext) -> StepFuture<'_> {
    Box::pin(async move {
        let sp = ctx
            .idp
            .get_service_provider(&ctx.logout_request.issuer.text)
            .await?;
        ctx.sp = Some(sp);
        Ok(())
    })
}

fn step_resolve_logout_url(ctx: &mut LogoutContext) {
    if let Some(service) = ctx
        .sp
        .as_ref()
        .and_then(|sp| sp.metadata.sp_sso_descriptor.as_ref())
        .and_then(|descriptor| descriptor.single_logout_service.first())
    {
        ctx.response.logout_url = service.location.clone();
    }
}

fn fail_form_parse(ctx: &LogoutContext, err: &ProviderError) -> HttpResponse {
    denied(ctx, format!("failed to parse form: {err}"))
}

fn fail_decode(ctx: &LogoutContext, err: &ProviderError) -> HttpResponse {
    denied(ctx, format!("failed to decode request: {err}"))
}

fn fail_window(ctx: &LogoutContext, err: &ProviderError) -> HttpResponse {
    denied(ctx, format!("failed to validate request: {err}"))
}

fn fail_unknown_service_provider(ctx: &LogoutContext, err: &ProviderError) -> HttpResponse {
    denied(
        ctx,
        format!("failed to find registered serviceprovider: {err}"),
    )
}

fn denied(ctx: &LogoutContext, message: String) -> HttpResponse {
    ctx.response.send_back(
        &ctx.response
            .make_denied_logout_response(&message, &ctx.idp.time_format),
    )
}

/// Renders the logout POST auto-submit form.
fn render_logout_form(logout_url: &str, relay_state: &str, saml_response: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>SAML Logout</title>
</head>
<body onload="document.forms[0].submit()">
    <noscript>
        <p>JavaScript is disabled. Click the button below to continue.</p>
    </noscript>
    <form method="post" action="{}">
        <input type="hidden" name="RelayState" value="{}"/>
        <input type="hidden" name="SAMLResponse" value="{}"/>
        <noscript>
            <input type="submit" value="Continue"/>
        </noscript>
    </form>
</body>
</html>"#,
        html_escape(logout_url),
        html_escape(relay_state),
        saml_response
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logout_response_shape() {
        let state = LogoutResponseState {
            request_id: "req-9".to_string(),
            logout_url: "http://sp.example.com/slo".to_string(),
            issuer: "https://idp.example.com/metadata".to_string(),
            relay_state: String::new(),
        };
        let response =
            state.make_successful_logout_response(crate::time::DEFAULT_TIME_FORMAT);
        assert!(response.id.starts_with('_'));
        assert_eq!(response.in_response_to, "req-9");
        assert_eq!(response.destination, "http://sp.example.com/slo");
        assert_eq!(response.status.status_code.value, status_code::SUCCESS);

        let denied = state.make_denied_logout_response(
            "failed to decode request",
            crate::time::DEFAULT_TIME_FORMAT,
        );
        assert_eq!(denied.status.status_code.value, status_code::REQUEST_DENIED);
        assert_eq!(denied.status.status_message, "failed to decode request");
    }

    #[test]
    fn logout_form_carries_the_response() {
        let html = render_logout_form("http://sp.example.com/slo", "rs", "QkFTRTY0");
        assert!(html.contains(r#"action="http://sp.example.com/slo""#));
        assert!(html.contains(r#"name="SAMLResponse" value="QkFTRTY0""#));
        assert!(html.contains(r#"name="RelayState" value="rs""#));
    }
}
