//! Response assembly and delivery.
//!
//! [`ResponseState`] is the per-request scratch pad carried through the step
//! sequence; it builds the typed SAML responses and delivers them over the
//! resolved binding (inline XML, POST auto-submit form, or 302 redirect with
//! a signed query).

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response as HttpResponse};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;

use idp_xml::constants::{
    status_code, AUTHN_CONTEXT_PASSWORD_PROTECTED_TRANSPORT, CONFIRMATION_METHOD_BEARER,
    NAMEID_FORMAT_ENTITY, POST_BINDING, REDIRECT_BINDING,
};
use idp_xml::encode::{deflate_and_base64, marshal_response};
use idp_xml::saml::{
    AssertionType, AttributeStatementType, AttributeType, AudienceRestrictionType,
    AuthnContextType, AuthnStatementType, ConditionsType, NameIdType, SubjectConfirmationDataType,
    SubjectConfirmationType, SubjectType,
};
use idp_xml::samlp::{ResponseType, StatusCodeType, StatusType};

use crate::attributes::Attributes;
use crate::new_id;
use crate::redirect::build_redirect_query;
use crate::time::format_instant;

/// Per-request response scratch pad.
///
/// Never persisted; filled step by step while a request is processed.
#[derive(Debug, Clone, Default)]
pub struct ResponseState {
    /// The resolved response binding.
    pub protocol_binding: String,
    /// Relay state echoed back to the SP.
    pub relay_state: String,
    /// The resolved ACS URL; empty means the body is returned inline.
    pub acs_url: String,
    /// Base64 redirect-binding signature, set after signing.
    pub signature: String,
    /// Signature algorithm URI of the redirect signature.
    pub sig_alg: String,

    /// ID of the request being answered.
    pub request_id: String,
    /// The IdP entity ID for this request.
    pub issuer: String,
    /// The SP entity ID the assertion is restricted to.
    pub audience: String,
    /// Client address the assertion is issued for.
    pub send_ip: String,
}

impl ResponseState {
    /// Builds a response without an assertion carrying the given status.
    #[must_use]
    pub fn make_failed_response(
        &self,
        status: &str,
        message: &str,
        time_format: &str,
    ) -> ResponseType {
        let now = format_instant(Utc::now(), time_format);
        make_response(
            new_id(),
            &self.request_id,
            &self.acs_url,
            &now,
            status,
            message,
            &self.issuer,
        )
    }

    /// Builds a successful response asserting the subject's identity.
    #[must_use]
    pub fn make_successful_response(
        &self,
        attributes: &Attributes,
        time_format: &str,
        expiration: Duration,
    ) -> ResponseType {
        let now = Utc::now();
        let issue_instant = format_instant(now, time_format);
        let until_instant = format_instant(
            now + chrono::Duration::from_std(expiration).unwrap_or_else(|_| {
                chrono::Duration::minutes(5)
            }),
            time_format,
        );
        self.make_assertion_response(&issue_instant, &until_instant, attributes)
    }

    fn make_assertion_response(
        &self,
        issue_instant: &str,
        until_instant: &str,
        attributes: &Attributes,
    ) -> ResponseType {
        let mut response = make_response(
            new_id(),
            &self.request_id,
            &self.acs_url,
            issue_instant,
            status_code::SUCCESS,
            "",
            &self.issuer,
        );
        response.assertion = Some(make_assertion(
            &self.request_id,
            &self.acs_url,
            &self.send_ip,
            issue_instant,
            until_instant,
            &self.issuer,
            attributes.get_name_id(),
            attributes.get_saml(),
            &self.audience,
            true,
        ));
        response
    }

    /// Delivers a typed response over the resolved binding.
    #[must_use]
    pub fn send_back(&self, response: &ResponseType) -> HttpResponse {
        match marshal_response(response) {
            Ok(xml) => self.deliver(xml),
            Err(err) => send_error(&err),
        }
    }

    /// Delivers an already marshalled (possibly signed) response document.
    #[must_use]
    pub fn deliver(&self, xml: String) -> HttpResponse {
        if self.acs_url.is_empty() {
            return (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "application/samlp+xml")],
                xml,
            )
                .into_response();
        }

        match self.protocol_binding.as_str() {
            POST_BINDING => {
                let encoded = STANDARD.encode(xml.as_bytes());
                Html(render_post_form(&self.acs_url, &self.relay_state, &encoded)).into_response()
            }
            REDIRECT_BINDING => {
                let encoded = match deflate_and_base64(xml.as_bytes()) {
                    Ok(encoded) => encoded,
                    Err(err) => return send_error(&err),
                };
                let query = build_redirect_query(
                    &encoded,
                    &self.relay_state,
                    &self.sig_alg,
                    &self.signature,
                );
                let location = format!("{}?{query}", self.acs_url);
                HttpResponse::builder()
                    .status(StatusCode::FOUND)
                    .header(header::LOCATION, location)
                    .body(Body::empty())
                    .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
            }
            other => {
                tracing::error!("no binding to send back response: {other}");
                StatusCode::OK.into_response()
            }
        }
    }
}

/// The 500 produced when a response cannot be written at all.
pub(crate) fn send_error(err: &dyn std::fmt::Display) -> HttpResponse {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("failed to send response: {err}"),
    )
        .into_response()
}

/// The issuer element used on responses and assertions.
#[must_use]
pub fn get_issuer(entity_id: &str) -> NameIdType {
    NameIdType::new(NAMEID_FORMAT_ENTITY, entity_id)
}

pub(crate) fn make_response(
    id: String,
    request_id: &str,
    acs_url: &str,
    issue_instant: &str,
    status: &str,
    message: &str,
    issuer: &str,
) -> ResponseType {
    ResponseType {
        id,
        version: "2.0".to_string(),
        issue_instant: issue_instant.to_string(),
        destination: acs_url.to_string(),
        in_response_to: request_id.to_string(),
        issuer: Some(get_issuer(issuer)),
        status: StatusType {
            status_code: StatusCodeType {
                value: status.to_string(),
            },
            status_message: message.to_string(),
        },
        assertion: None,
    }
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn make_assertion(
    request_id: &str,
    acs_url: &str,
    send_ip: &str,
    issue_instant: &str,
    until_instant: &str,
    issuer: &str,
    name_id: NameIdType,
    attributes: Vec<AttributeType>,
    audience: &str,
    authn: bool,
) -> AssertionType {
    let id = new_id();

    let mut assertion = AssertionType {
        id: id.clone(),
        version: "2.0".to_string(),
        issue_instant: issue_instant.to_string(),
        issuer: get_issuer(issuer),
        subject: Some(SubjectType {
            name_id: Some(name_id),
            subject_confirmation: vec![SubjectConfirmationType {
                method: CONFIRMATION_METHOD_BEARER.to_string(),
                subject_confirmation_data: Some(SubjectConfirmationDataType {
                    in_response_to: request_id.to_string(),
                    not_on_or_after: until_instant.to_string(),
                    recipient: acs_url.to_string(),
                    address: send_ip.to_string(),
                }),
            }],
        }),
        conditions: Some(ConditionsType {
            not_before: issue_instant.to_string(),
            not_on_or_after: until_instant.to_string(),
            audience_restriction: vec![AudienceRestrictionType {
                audience: vec![audience.to_string()],
            }],
        }),
        attribute_statement: vec![AttributeStatementType {
            attribute: attributes,
        }],
        authn_statement: Vec::new(),
    };

    if authn {
        assertion.authn_statement = vec![AuthnStatementType {
            authn_instant: issue_instant.to_string(),
            session_index: id,
            authn_context: AuthnContextType {
                authn_context_class_ref: AUTHN_CONTEXT_PASSWORD_PROTECTED_TRANSPORT.to_string(),
            },
        }];
    }

    assertion
}

/// Builds the response to an attribute query: the asserted attributes
/// intersected with the requested ones by `(name, name_format)`; an empty
/// request list selects all. No authn statement, no destination.
#[must_use]
pub fn make_attribute_query_response(
    request_id: &str,
    issuer: &str,
    entity_id: &str,
    attributes: &Attributes,
    queried_attrs: &[AttributeType],
    time_format: &str,
    expiration: Duration,
) -> ResponseType {
    let now = Utc::now();
    let issue_instant = format_instant(now, time_format);
    let until_instant = format_instant(
        now + chrono::Duration::from_std(expiration).unwrap_or_else(|_| chrono::Duration::minutes(5)),
        time_format,
    );

    let attrs_saml = attributes.get_saml();
    let provided: Vec<AttributeType> = if queried_attrs.is_empty() {
        attrs_saml
    } else {
        attrs_saml
            .into_iter()
            .filter(|attr| {
                queried_attrs
                    .iter()
                    .any(|queried| queried.name == attr.name && queried.name_format == attr.name_format)
            })
            .collect()
    };

    let mut response = make_response(
        new_id(),
        request_id,
        "",
        &issue_instant,
        status_code::SUCCESS,
        "",
        issuer,
    );
    response.assertion = Some(make_assertion(
        request_id,
        "",
        "",
        &issue_instant,
        &until_instant,
        issuer,
        attributes.get_name_id(),
        provided,
        entity_id,
        false,
    ));
    response
}

/// Renders the POST-binding auto-submit form.
#[must_use]
pub(crate) fn render_post_form(acs_url: &str, relay_state: &str, saml_response: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>SAML Response</title>
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
        html_escape(acs_url),
        html_escape(relay_state),
        saml_response
    )
}

/// Escapes HTML attribute and text content.
pub(crate) fn html_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::DEFAULT_TIME_FORMAT;
    use idp_xml::decode::decode_response;

    fn state() -> ResponseState {
        ResponseState {
            request_id: "req-1".to_string(),
            issuer: "https://idp.example.com/saml/metadata".to_string(),
            audience: "https://sp.example.com/metadata".to_string(),
            acs_url: "https://sp.example.com/acs".to_string(),
            protocol_binding: POST_BINDING.to_string(),
            ..ResponseState::default()
        }
    }

    fn attributes() -> Attributes {
        let mut attrs = Attributes::default();
        attrs.set_email("user@example.com");
        attrs.set_username("user");
        attrs
    }

    #[test]
    fn successful_response_carries_one_assertion() {
        let response = state().make_successful_response(
            &attributes(),
            DEFAULT_TIME_FORMAT,
            Duration::from_secs(300),
        );

        assert!(response.id.starts_with('_'));
        assert_eq!(response.in_response_to, "req-1");
        assert_eq!(response.destination, "https://sp.example.com/acs");
        assert_eq!(response.status.status_code.value, status_code::SUCCESS);

        let assertion = response.assertion.unwrap();
        let conditions = assertion.conditions.unwrap();
        assert_eq!(conditions.not_before, assertion.issue_instant);
        assert_eq!(conditions.audience_restriction.len(), 1);
        assert_eq!(
            conditions.audience_restriction[0].audience,
            vec!["https://sp.example.com/metadata".to_string()]
        );

        let subject = assertion.subject.unwrap();
        let data = subject.subject_confirmation[0]
            .subject_confirmation_data
            .clone()
            .unwrap();
        assert_eq!(data.in_response_to, "req-1");
        assert_eq!(data.not_on_or_after, conditions.not_on_or_after);
        assert_eq!(data.recipient, "https://sp.example.com/acs");

        assert_eq!(assertion.authn_statement.len(), 1);
        assert_eq!(assertion.authn_statement[0].session_index, assertion.id);
        assert_eq!(
            assertion.authn_statement[0].authn_context.authn_context_class_ref,
            AUTHN_CONTEXT_PASSWORD_PROTECTED_TRANSPORT
        );
    }

    #[test]
    fn failed_response_has_no_assertion() {
        let response = state().make_failed_response(
            status_code::REQUEST_DENIED,
            "failed to decode request",
            DEFAULT_TIME_FORMAT,
        );
        assert!(response.assertion.is_none());
        assert_eq!(response.status.status_code.value, status_code::REQUEST_DENIED);
        assert_eq!(response.status.status_message, "failed to decode request");
    }

    #[test]
    fn attribute_query_selects_requested_attributes() {
        let queried = vec![AttributeType {
            name: "Email".to_string(),
            name_format: idp_xml::constants::ATTRIBUTE_NAME_FORMAT_BASIC.to_string(),
            ..AttributeType::default()
        }];
        let response = make_attribute_query_response(
            "query-1",
            "https://idp.example.com",
            "https://sp.example.com",
            &attributes(),
            &queried,
            DEFAULT_TIME_FORMAT,
            Duration::from_secs(300),
        );
        let assertion = response.assertion.unwrap();
        assert!(assertion.authn_statement.is_empty());
        let attrs = &assertion.attribute_statement[0].attribute;
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs[0].name, "Email");
        assert_eq!(response.destination, "");
    }

    #[test]
    fn attribute_query_without_request_list_selects_all() {
        let response = make_attribute_query_response(
            "query-1",
            "https://idp.example.com",
            "https://sp.example.com",
            &attributes(),
            &[],
            DEFAULT_TIME_FORMAT,
            Duration::from_secs(300),
        );
        let assertion = response.assertion.unwrap();
        assert_eq!(assertion.attribute_statement[0].attribute.len(), 2);
    }

    #[test]
    fn inline_delivery_when_no_acs_url() {
        let mut state = state();
        state.acs_url = String::new();
        let response = state.make_failed_response(
            status_code::REQUEST_DENIED,
            "unknown issuer",
            DEFAULT_TIME_FORMAT,
        );
        let http = state.send_back(&response);
        assert_eq!(http.status(), StatusCode::OK);
        assert_eq!(
            http.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/samlp+xml"
        );
    }

    #[test]
    fn post_delivery_renders_the_form() {
        let state = state();
        let response = state.make_successful_response(
            &attributes(),
            DEFAULT_TIME_FORMAT,
            Duration::from_secs(300),
        );
        let marshalled = marshal_response(&response).unwrap();
        let html = render_post_form(
            &state.acs_url,
            &state.relay_state,
            &STANDARD.encode(marshalled.as_bytes()),
        );

        assert!(html.contains(r#"action="https://sp.example.com/acs""#));
        let value_start = html.find("name=\"SAMLResponse\" value=\"").unwrap() + 27;
        let value_end = html[value_start..].find('"').unwrap();
        let encoded = &html[value_start..value_start + value_end];
        let decoded = decode_response("", true, encoded).unwrap();
        assert_eq!(decoded.in_response_to, "req-1");
        assert_eq!(decoded.status.status_code.value, status_code::SUCCESS);
    }

    #[test]
    fn redirect_delivery_sets_location() {
        let mut state = state();
        state.protocol_binding = REDIRECT_BINDING.to_string();
        state.relay_state = "state-1".to_string();
        let response = state.make_failed_response(
            status_code::REQUEST_DENIED,
            "denied",
            DEFAULT_TIME_FORMAT,
        );
        let http = state.send_back(&response);
        assert_eq!(http.status(), StatusCode::FOUND);
        let location = http.headers().get(header::LOCATION).unwrap().to_str().unwrap();
        assert!(location.starts_with("https://sp.example.com/acs?SAMLResponse="));
        assert!(location.contains("&RelayState=state-1"));
    }

    #[test]
    fn html_escaping_covers_specials() {
        let escaped = html_escape(r#"<script>alert("x")</script>"#);
        assert!(!escaped.contains('<'));
        assert!(!escaped.contains('"'));
    }
}
