//! Provider assembly: router, middleware and infrastructure endpoints.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response as HttpResponse};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use idp_core::{
    ContactPerson, Endpoint, IdentityProviderConfig, IssuerResolver, MetadataConfig, Organisation,
};
use idp_crypto::{certificate_to_pem, SignatureAlgorithm};

use crate::attribute_query::attribute_query_handler;
use crate::error::ProviderError;
use crate::identityprovider::IdentityProvider;
use crate::login::callback_handler;
use crate::logout::logout_handler;
use crate::metadata::metadata_handler;
use crate::sso::sso_handler;
use crate::storage::Storage;

/// Provider configuration.
pub struct Config {
    /// Metadata endpoint configuration.
    pub metadata: MetadataConfig,
    /// Identity provider configuration.
    pub idp: IdentityProviderConfig,
    /// Optional organisation published in metadata.
    pub organisation: Option<Organisation>,
    /// Optional contact person published in metadata.
    pub contact_person: Option<ContactPerson>,
    /// Custom instant format; the ISO 8601 default applies when unset.
    pub time_format: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            metadata: MetadataConfig::default(),
            idp: IdentityProviderConfig::default(),
            organisation: None,
            contact_person: None,
            time_format: None,
        }
    }
}

pub(crate) struct AppState {
    pub idp: Arc<IdentityProvider>,
    pub metadata_signature_algorithm: Option<SignatureAlgorithm>,
    pub organisation: Option<Organisation>,
    pub contact_person: Option<ContactPerson>,
}

/// The issuer resolved for the current request, stored in request
/// extensions by the issuer middleware.
#[derive(Debug, Clone)]
pub(crate) struct RequestIssuer(pub String);

/// The assembled SAML provider.
///
/// One long-lived object; [`Provider::router`] returns the axum router the
/// embedder mounts (optionally under a path prefix) and layers with its own
/// interceptors.
pub struct Provider {
    state: Arc<AppState>,
    issuer_resolver: IssuerResolver,
}

impl Provider {
    /// Creates the provider.
    ///
    /// Fails when a configured signature algorithm is unsupported; issuer
    /// validation already happened when the resolver was built.
    pub fn new(
        storage: Arc<dyn Storage>,
        config: Config,
        issuer_resolver: IssuerResolver,
    ) -> Result<Self, ProviderError> {
        let metadata_signature_algorithm = config
            .metadata
            .signature_algorithm
            .as_deref()
            .map(SignatureAlgorithm::from_uri)
            .transpose()?;

        let metadata_endpoint = match &config.metadata.url {
            Some(url) => Endpoint::with_url(config.metadata.path.clone(), url.clone()),
            None => Endpoint::new(config.metadata.path.clone()),
        };

        let idp = Arc::new(IdentityProvider::new(
            metadata_endpoint,
            config.idp,
            storage,
            config.time_format,
        )?);

        Ok(Self {
            state: Arc::new(AppState {
                idp,
                metadata_signature_algorithm,
                organisation: config.organisation,
                contact_person: config.contact_person,
            }),
            issuer_resolver,
        })
    }

    /// The identity provider behind this provider.
    #[must_use]
    pub fn identity_provider(&self) -> Arc<IdentityProvider> {
        self.state.idp.clone()
    }

    /// Storage readiness, as exposed through `/ready`.
    pub async fn health(&self) -> Result<(), ProviderError> {
        Ok(self.state.idp.storage.health().await?)
    }

    /// Builds the router serving every provider endpoint.
    ///
    /// CORS allows any origin with credentials; SP trust is established by
    /// metadata, not by origin checks. Additional interceptors are tower
    /// layers applied by the embedder on the returned router.
    #[must_use]
    pub fn router(&self) -> Router {
        let endpoints = self.state.idp.endpoints().clone();
        let metadata_path = self.state.idp.metadata_endpoint.relative().to_string();

        let cors = CorsLayer::new()
            .allow_origin(AllowOrigin::mirror_request())
            .allow_credentials(true)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

        Router::new()
            .route("/healthz", get(health_handler))
            .route("/ready", get(ready_handler))
            .route(&metadata_path, get(metadata_handler))
            .route(endpoints.certificate.relative(), get(certificate_handler))
            .route(
                endpoints.callback.relative(),
                get(callback_handler).post(callback_handler),
            )
            .route(
                endpoints.single_sign_on.relative(),
                get(sso_handler).post(sso_handler),
            )
            .route(
                endpoints.single_logout.relative(),
                get(logout_handler).post(logout_handler),
            )
            .route(endpoints.attribute.relative(), post(attribute_query_handler))
            .layer(middleware::from_fn_with_state(
                self.issuer_resolver.clone(),
                issuer_middleware,
            ))
            .layer(TraceLayer::new_for_http())
            .layer(cors)
            .with_state(self.state.clone())
    }
}

/// Stores the resolved issuer in the request extensions.
async fn issuer_middleware(
    State(resolver): State<IssuerResolver>,
    mut request: Request,
    next: Next,
) -> HttpResponse {
    let forwarded = request
        .headers()
        .get("forwarded")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let host = request
        .headers()
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .or_else(|| {
            request
                .uri()
                .authority()
                .map(|authority| authority.to_string())
        })
        .unwrap_or_default();

    let issuer = resolver.resolve(forwarded.as_deref(), &host);
    request.extensions_mut().insert(RequestIssuer(issuer));
    next.run(request).await
}

/// Reads the issuer a middleware stored for this request.
pub(crate) fn request_issuer(request: &Request) -> String {
    request
        .extensions()
        .get::<RequestIssuer>()
        .map(|issuer| issuer.0.clone())
        .unwrap_or_default()
}

/// Reads a urlencoded POST body; empty for anything else.
pub(crate) async fn read_form_body(request: Request) -> String {
    let is_form = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.starts_with("application/x-www-form-urlencoded"))
        .unwrap_or(false);
    if request.method() != Method::POST || !is_form {
        return String::new();
    }
    match axum::body::to_bytes(request.into_body(), usize::MAX).await {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(err) => {
            tracing::error!(error = %err, "failed to read request body");
            String::new()
        }
    }
}

async fn health_handler() -> StatusCode {
    StatusCode::OK
}

async fn ready_handler(State(app): State<Arc<AppState>>) -> HttpResponse {
    match app.idp.storage.health().await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => {
            tracing::error!(error = %err, "storage not ready");
            (StatusCode::SERVICE_UNAVAILABLE, format!("not ready: {err}")).into_response()
        }
    }
}

/// Serves the PEM response-signing certificate as a download.
async fn certificate_handler(State(app): State<Arc<AppState>>) -> HttpResponse {
    let signing_key = match app.idp.response_signing_key().await {
        Ok(key) => key,
        Err(err) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("failed to read certificate: {err}"),
            )
                .into_response()
        }
    };
    match certificate_to_pem(&signing_key.certificate) {
        Ok(pem) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "application/pkix-cert"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=idp.crt",
                ),
            ],
            pem,
        )
            .into_response(),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("failed to pem encode certificate: {err}"),
        )
            .into_response(),
    }
}
