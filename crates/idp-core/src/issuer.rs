//! Per-request issuer resolution.
//!
//! The issuer is the base URL under which the provider is reachable for the
//! current request. It can either be pinned statically or derived from the
//! `Forwarded` (RFC 7239) and `Host` headers on every request.

use thiserror::Error;
use url::Url;

/// Issuer validation errors. These fail provider construction.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IssuerError {
    /// No issuer was configured.
    #[error("missing issuer")]
    Empty,

    /// The issuer is not a parseable URL.
    #[error("invalid url for issuer")]
    InvalidUrl,

    /// The issuer URL carries no host.
    #[error("host for issuer missing")]
    MissingHost,

    /// The issuer URL must use https unless insecure mode is enabled.
    #[error("scheme for issuer must be `https`")]
    HttpsRequired,

    /// Issuer paths must not carry fragments or query strings.
    #[error("no fragments or query allowed for issuer")]
    InvalidPath,
}

/// Validates a static issuer URL.
pub fn validate_issuer(issuer: &str, allow_insecure: bool) -> Result<(), IssuerError> {
    if issuer.is_empty() {
        return Err(IssuerError::Empty);
    }
    let url = Url::parse(issuer).map_err(|_| IssuerError::InvalidUrl)?;
    if url.host_str().is_none() {
        return Err(IssuerError::MissingHost);
    }
    if url.scheme() != "https" && !(allow_insecure && url.scheme() == "http") {
        return Err(IssuerError::HttpsRequired);
    }
    validate_issuer_path(&url)
}

fn validate_issuer_path(url: &Url) -> Result<(), IssuerError> {
    if url.fragment().is_some() || url.query().is_some() {
        return Err(IssuerError::InvalidPath);
    }
    Ok(())
}

/// Derives the issuer URL for each incoming request.
#[derive(Debug, Clone)]
pub enum IssuerResolver {
    /// A fixed issuer, independent of the request.
    Static(String),
    /// Issuer built from the request host (`Forwarded` header first) and a
    /// fixed path.
    FromHost {
        /// Path appended to the resolved host.
        path: String,
        /// Emit `http` instead of `https` URLs.
        allow_insecure: bool,
    },
}

impl IssuerResolver {
    /// Creates a resolver for a fixed, validated issuer URL.
    pub fn static_issuer(issuer: &str, allow_insecure: bool) -> Result<Self, IssuerError> {
        validate_issuer(issuer, allow_insecure)?;
        Ok(Self::Static(issuer.to_string()))
    }

    /// Creates a resolver deriving the issuer from the request host.
    ///
    /// `path` must not carry a query string or fragment.
    pub fn from_host(path: &str, allow_insecure: bool) -> Result<Self, IssuerError> {
        if path.contains('?') || path.contains('#') {
            return Err(IssuerError::InvalidPath);
        }
        Ok(Self::FromHost {
            path: path.to_string(),
            allow_insecure,
        })
    }

    /// Resolves the issuer for a request.
    ///
    /// `forwarded` is the raw value of the `Forwarded` header, `host` the
    /// value of the `Host` header. The first parseable `host=` parameter of
    /// the `Forwarded` header wins, the `Host` header is the fallback.
    #[must_use]
    pub fn resolve(&self, forwarded: Option<&str>, host: &str) -> String {
        match self {
            Self::Static(issuer) => issuer.clone(),
            Self::FromHost {
                path,
                allow_insecure,
            } => {
                let host = forwarded
                    .and_then(host_from_forwarded)
                    .unwrap_or_else(|| host.to_string());
                dynamic_issuer(&host, path, *allow_insecure)
            }
        }
    }
}

/// Extracts the first `host=` parameter from a `Forwarded` header value.
fn host_from_forwarded(value: &str) -> Option<String> {
    for element in value.split(',') {
        for pair in element.split(';') {
            let mut parts = pair.splitn(2, '=');
            let key = parts.next().unwrap_or("").trim();
            if key.eq_ignore_ascii_case("host") {
                let host = parts.next().unwrap_or("").trim().trim_matches('"');
                if !host.is_empty() {
                    return Some(host.to_string());
                }
            }
        }
    }
    None
}

fn dynamic_issuer(host: &str, path: &str, allow_insecure: bool) -> String {
    let scheme = if allow_insecure { "http" } else { "https" };
    let path = if !path.is_empty() && !path.starts_with('/') {
        format!("/{path}")
    } else {
        path.to_string()
    };
    format!("{scheme}://{host}{path}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_issuer() {
        assert_eq!(validate_issuer("", false), Err(IssuerError::Empty));
    }

    #[test]
    fn rejects_missing_host() {
        assert_eq!(
            validate_issuer("https:///saml", false),
            Err(IssuerError::MissingHost)
        );
    }

    #[test]
    fn rejects_fragment_and_query() {
        assert_eq!(
            validate_issuer("https://idp.example.com/saml#frag", false),
            Err(IssuerError::InvalidPath)
        );
        assert_eq!(
            validate_issuer("https://idp.example.com/saml?x=1", false),
            Err(IssuerError::InvalidPath)
        );
    }

    #[test]
    fn rejects_http_unless_insecure() {
        assert_eq!(
            validate_issuer("http://idp.example.com", false),
            Err(IssuerError::HttpsRequired)
        );
        assert!(validate_issuer("http://idp.example.com", true).is_ok());
    }

    #[test]
    fn accepts_https() {
        assert!(validate_issuer("https://idp.example.com/saml", false).is_ok());
    }

    #[test]
    fn static_resolver_ignores_request() {
        let resolver = IssuerResolver::static_issuer("https://idp.example.com", false).unwrap();
        assert_eq!(
            resolver.resolve(Some("host=other.example.com"), "fallback"),
            "https://idp.example.com"
        );
    }

    #[test]
    fn forwarded_host_wins_over_host_header() {
        let resolver = IssuerResolver::from_host("/saml", false).unwrap();
        assert_eq!(
            resolver.resolve(
                Some("for=192.0.2.60;proto=https;host=example.com"),
                "internal:8080"
            ),
            "https://example.com/saml"
        );
    }

    #[test]
    fn host_header_is_fallback() {
        let resolver = IssuerResolver::from_host("/saml", false).unwrap();
        assert_eq!(
            resolver.resolve(None, "idp.example.com"),
            "https://idp.example.com/saml"
        );
        assert_eq!(
            resolver.resolve(Some("for=192.0.2.60"), "idp.example.com"),
            "https://idp.example.com/saml"
        );
    }

    #[test]
    fn quoted_forwarded_host() {
        let resolver = IssuerResolver::from_host("", false).unwrap();
        assert_eq!(
            resolver.resolve(Some("host=\"example.com\""), "fallback"),
            "https://example.com"
        );
    }

    #[test]
    fn from_host_rejects_query_and_fragment() {
        assert!(IssuerResolver::from_host("/saml?x", false).is_err());
        assert!(IssuerResolver::from_host("/saml#frag", false).is_err());
    }
}
