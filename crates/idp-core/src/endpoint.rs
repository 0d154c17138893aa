//! Endpoint paths.
//!
//! An endpoint is addressed relative to the issuer of the current request.
//! An absolute URL can be configured to pin the endpoint to a fixed location
//! regardless of the resolved issuer.

/// A provider endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    relative_path: String,
    absolute_url: Option<String>,
}

impl Endpoint {
    /// Creates an endpoint served under the given relative path.
    #[must_use]
    pub fn new(relative_path: impl Into<String>) -> Self {
        Self {
            relative_path: normalize_path(relative_path.into()),
            absolute_url: None,
        }
    }

    /// Creates an endpoint with a fixed absolute URL.
    #[must_use]
    pub fn with_url(relative_path: impl Into<String>, absolute_url: impl Into<String>) -> Self {
        Self {
            relative_path: normalize_path(relative_path.into()),
            absolute_url: Some(absolute_url.into()),
        }
    }

    /// Returns the relative path, always starting with a `/`.
    #[must_use]
    pub fn relative(&self) -> &str {
        &self.relative_path
    }

    /// Returns the absolute URL of the endpoint for the given issuer.
    ///
    /// The configured absolute URL wins when present.
    #[must_use]
    pub fn absolute(&self, issuer: &str) -> String {
        match &self.absolute_url {
            Some(url) => url.clone(),
            None => format!("{}{}", issuer.trim_end_matches('/'), self.relative_path),
        }
    }
}

fn normalize_path(path: String) -> String {
    if path.starts_with('/') {
        path
    } else {
        format!("/{path}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_path_gets_leading_slash() {
        let endpoint = Endpoint::new("SSO");
        assert_eq!(endpoint.relative(), "/SSO");
    }

    #[test]
    fn absolute_joins_issuer_and_path() {
        let endpoint = Endpoint::new("/saml/SSO");
        assert_eq!(
            endpoint.absolute("https://idp.example.com"),
            "https://idp.example.com/saml/SSO"
        );
        assert_eq!(
            endpoint.absolute("https://idp.example.com/"),
            "https://idp.example.com/saml/SSO"
        );
    }

    #[test]
    fn configured_url_wins() {
        let endpoint = Endpoint::with_url("/saml/SSO", "http://localhost:50002/saml/SSO");
        assert_eq!(
            endpoint.absolute("https://idp.example.com"),
            "http://localhost:50002/saml/SSO"
        );
    }
}
