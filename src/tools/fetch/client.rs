use super::egress::{EgressPath, Route};
use super::types::{RawResponse, TransportFailure};
use crate::config::FetchConfig;
use crate::error::Result;
use reqwest::blocking::Client;
use reqwest::cookie::Jar;
use reqwest::header::HeaderMap;
use reqwest::{redirect, Proxy};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// One outbound GET, fully decided: where it goes, how, and with which headers.
#[derive(Debug, Clone, Copy)]
pub struct AttemptRequest<'a> {
    pub url: &'a Url,
    pub path: &'a EgressPath,
    pub headers: &'a HeaderMap,
    pub timeout: Duration,
}

impl AttemptRequest<'_> {
    /// Whether a proxy carries this request (the path may map only one scheme).
    pub fn is_proxied(&self) -> bool {
        self.path.proxy_for(self.url.scheme()).is_some()
    }
}

/// Performs a single HTTP attempt. No retries, no classification.
pub trait Transport: Send + Sync {
    fn name(&self) -> &'static str;
    fn get(&self, request: &AttemptRequest<'_>) -> std::result::Result<RawResponse, TransportFailure>;
}

/// Blocking reqwest transport with one client per egress path.
///
/// Clients share a cookie jar, so cookies set during warm-up travel with the
/// API call whichever path it takes.
pub struct ReqwestTransport {
    clients: HashMap<EgressPath, Client>,
}

impl ReqwestTransport {
    /// Build clients for every path in the pool plus the direct path.
    pub fn new(cfg: &FetchConfig) -> Result<Self> {
        let jar = Arc::new(Jar::default());
        let mut clients = HashMap::new();
        for path in cfg
            .egress
            .iter()
            .cloned()
            .chain(std::iter::once(EgressPath::direct()))
        {
            if clients.contains_key(&path) {
                continue;
            }
            let client = build_client_for_path(&path, cfg, Arc::clone(&jar))?;
            clients.insert(path, client);
        }
        Ok(Self { clients })
    }
}

impl Transport for ReqwestTransport {
    fn name(&self) -> &'static str {
        "reqwest-blocking"
    }

    fn get(&self, request: &AttemptRequest<'_>) -> std::result::Result<RawResponse, TransportFailure> {
        let client = self.clients.get(request.path).ok_or_else(|| {
            TransportFailure::Network(format!("no client configured for {}", request.path))
        })?;
        let proxied = request.is_proxied();

        let response = client
            .get(request.url.clone())
            .headers(request.headers.clone())
            .timeout(request.timeout)
            .send()
            .map_err(|e| classify_transport_error(&e, proxied))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| classify_transport_error(&e, proxied))?;

        Ok(RawResponse { status, body })
    }
}

/// Build a reqwest client routed through `path`.
///
/// Clients that proxy HTTPS skip certificate verification: the free proxies in
/// the pool routinely present self-signed or mismatched certificates. Every
/// other client keeps full verification, and all of them ignore system proxy
/// settings.
pub(crate) fn build_client_for_path(
    path: &EgressPath,
    cfg: &FetchConfig,
    jar: Arc<Jar>,
) -> Result<Client> {
    let mut builder = Client::builder()
        .cookie_provider(jar)
        .redirect(redirect::Policy::limited(cfg.redirect_limit))
        .gzip(true)
        .brotli(true)
        .deflate(true)
        .timeout(cfg.request_timeout());

    match &path.route {
        Route::Direct => {
            builder = builder.no_proxy();
        }
        Route::Proxy { http, https } => {
            builder = builder.no_proxy();
            if let Some(endpoint) = http {
                builder = builder.proxy(Proxy::http(endpoint.as_str())?);
            }
            if let Some(endpoint) = https {
                builder = builder.proxy(Proxy::https(endpoint.as_str())?);
            }
        }
    }
    if accepts_invalid_certs(path) {
        builder = builder.danger_accept_invalid_certs(true);
    }

    Ok(builder.build()?)
}

/// Only a path that tunnels HTTPS through a proxy skips verification. An
/// http-only proxy path sends HTTPS straight to the target, so it verifies.
pub(crate) fn accepts_invalid_certs(path: &EgressPath) -> bool {
    matches!(&path.route, Route::Proxy { https: Some(_), .. })
}

/// Attribute a transport error.
///
/// reqwest does not say *which* hop failed, so attribution is decided from
/// what we know: a connect-phase failure while a proxy was engaged is the
/// proxy's fault. Everything else (timeouts after connecting, body errors,
/// any failure on the direct path) is generic.
pub(crate) fn classify_transport_error(err: &reqwest::Error, proxied: bool) -> TransportFailure {
    let cause = error_chain(err);
    if proxied && err.is_connect() {
        TransportFailure::Proxy(cause)
    } else {
        TransportFailure::Network(cause)
    }
}

fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        out.push_str(": ");
        out.push_str(&inner.to_string());
        source = inner.source();
    }
    out
}
