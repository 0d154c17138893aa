//! SOAP 1.2 envelope handling for the attribute query exchange.
//!
//! Queries are decoded via [`crate::decode::decode_attribute_query`]; this
//! module wraps the (already signed) response document into an envelope.

use crate::constants::SOAP_NS;
use crate::encode::XML_HEADER;

/// Wraps a marshalled SAML response into a SOAP response envelope.
///
/// The inner document header is dropped; the envelope carries its own.
#[must_use]
pub fn wrap_response(response_xml: &str) -> String {
    let body = strip_header(response_xml);
    format!(
        "{XML_HEADER}<soap:Envelope xmlns:soap=\"{SOAP_NS}\"><soap:Body>{body}</soap:Body></soap:Envelope>"
    )
}

fn strip_header(xml: &str) -> &str {
    let trimmed = xml.trim_start();
    if trimmed.starts_with("<?xml") {
        match trimmed.find("?>") {
            Some(pos) => trimmed[pos + 2..].trim_start(),
            None => trimmed,
        }
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode_attribute_query;

    #[test]
    fn wraps_and_strips_inner_header() {
        let wrapped = wrap_response("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<samlp:Response/>");
        assert!(wrapped.starts_with(XML_HEADER));
        assert!(wrapped.contains("<soap:Body><samlp:Response/></soap:Body>"));
        assert_eq!(wrapped.matches("<?xml").count(), 1);
    }

    #[test]
    fn envelope_shape_matches_decoder_expectations() {
        // A query envelope and a response envelope share the same outer shape.
        let envelope = wrap_response("<samlp:Response/>");
        assert!(decode_attribute_query(&envelope).is_err());
        assert!(envelope.contains("soap:Envelope"));
    }
}
