//! Strict form decoding.
//!
//! Query strings and urlencoded bodies are decoded strictly: an invalid
//! percent escape fails the whole form, before any SAML processing starts.

use crate::error::ProviderError;

/// Decodes an `application/x-www-form-urlencoded` string into pairs.
pub(crate) fn parse_urlencoded(input: &str) -> Result<Vec<(String, String)>, ProviderError> {
    let mut pairs = Vec::new();
    if input.is_empty() {
        return Ok(pairs);
    }
    for segment in input.split('&') {
        if segment.is_empty() {
            continue;
        }
        let (key, value) = segment.split_once('=').unwrap_or((segment, ""));
        pairs.push((decode_component(key)?, decode_component(value)?));
    }
    Ok(pairs)
}

/// Returns the first value under `name`, empty when absent.
pub(crate) fn form_value(pairs: &[(String, String)], name: &str) -> String {
    pairs
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.clone())
        .unwrap_or_default()
}

fn decode_component(component: &str) -> Result<String, ProviderError> {
    let bytes = component.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let hi = bytes.get(i + 1).and_then(|b| (*b as char).to_digit(16));
                let lo = bytes.get(i + 2).and_then(|b| (*b as char).to_digit(16));
                match (hi, lo) {
                    (Some(hi), Some(lo)) => {
                        decoded.push((hi * 16 + lo) as u8);
                        i += 3;
                    }
                    _ => {
                        let end = (i + 3).min(component.len());
                        return Err(ProviderError::InvalidRequest(format!(
                            "invalid URL escape {:?}",
                            &component[i..end]
                        )));
                    }
                }
            }
            b'+' => {
                decoded.push(b' ');
                i += 1;
            }
            byte => {
                decoded.push(byte);
                i += 1;
            }
        }
    }
    String::from_utf8(decoded)
        .map_err(|e| ProviderError::InvalidRequest(format!("invalid form value: {e}")))
}
