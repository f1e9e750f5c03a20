//! Origin allow-list for HTTP routes and sync upgrades.
//!
//! A request without an `Origin` header (same-origin or non-browser client)
//! is allowed. A request with an `Origin` is allowed only on an exact match
//! with the list; anything else, including a header that is not valid UTF-8,
//! is rejected.

use std::collections::BTreeSet;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, HeaderValue, Method};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::warn;

use crate::error::{ServerError, ServerResult};

#[derive(Clone, Debug, Default)]
pub struct OriginPolicy {
    allowed: BTreeSet<String>,
}

impl OriginPolicy {
    pub fn new<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: origins.into_iter().map(Into::into).collect(),
        }
    }

    pub fn origins(&self) -> impl Iterator<Item = &str> {
        self.allowed.iter().map(String::as_str)
    }

    /// Whether a request carrying `origin` may proceed.
    pub fn allows(&self, origin: Option<&str>) -> bool {
        match origin {
            None => true,
            Some(o) => self.allowed.contains(o),
        }
    }

    /// Check the `Origin` header of a request.
    pub fn check(&self, headers: &HeaderMap) -> ServerResult<()> {
        let Some(value) = headers.get(header::ORIGIN) else {
            return Ok(());
        };
        match value.to_str() {
            Ok(origin) if self.allows(Some(origin)) => Ok(()),
            Ok(origin) => Err(ServerError::AccessDenied(origin.to_string())),
            Err(_) => Err(ServerError::AccessDenied("<invalid origin>".into())),
        }
    }

    /// CORS response headers for the allowed origins.
    ///
    /// Entries that cannot be sent as an exact origin (`*`, or anything that
    /// is not a valid header value) are left out with a warning.
    pub fn cors_layer(&self) -> CorsLayer {
        let origins: Vec<HeaderValue> = self
            .allowed
            .iter()
            .filter_map(|o| match HeaderValue::from_str(o) {
                Ok(value) if o != "*" => Some(value),
                _ => {
                    warn!(origin = %o, "skipping unusable CORS origin");
                    None
                }
            })
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE])
    }
}

/// Middleware rejecting requests whose origin is not on the list.
pub async fn enforce_origin(
    State(policy): State<Arc<OriginPolicy>>,
    request: Request,
    next: Next,
) -> Response {
    if let Err(e) = policy.check(request.headers()) {
        warn!(uri = %request.uri(), error = %e, "rejected request");
        return e.into_response();
    }
    next.run(request).await
}
