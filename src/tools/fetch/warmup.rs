//! Landing-page visit before the real API call.
//!
//! Primes cookies the way a browser tab would. Strictly best-effort: the
//! outcome is logged and dropped, never returned.

use super::client::{AttemptRequest, Transport};
use super::egress::EgressPath;
use super::headers::IdentityGenerator;
use rand::Rng;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

/// Visit `base_url` over the direct path.
pub fn visit<R: Rng + ?Sized>(
    transport: &dyn Transport,
    identities: &IdentityGenerator,
    rng: &mut R,
    base_url: &Url,
    timeout: Duration,
) {
    let identity = identities.generate(rng);
    let direct = EgressPath::direct();
    let request = AttemptRequest {
        url: base_url,
        path: &direct,
        headers: identity.headers(),
        timeout,
    };

    info!(url = %base_url, "visiting landing page");
    match transport.get(&request) {
        Ok(response) => info!(status = response.status.as_u16(), "landing page visited"),
        Err(failure) => warn!(error = %failure, "landing page unreachable, continuing"),
    }
}
