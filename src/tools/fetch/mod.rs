mod client;
mod retry;
mod utils;

pub mod egress;
pub mod headers;
pub mod profile;
pub mod types;
pub mod warmup;

// Re-export types for public use
pub use client::{AttemptRequest, ReqwestTransport, Transport};
pub use egress::{EgressId, EgressPath, EgressSelector, Route};
pub use headers::{IdentityGenerator, RequestIdentity};
pub use profile::BrowserFamily;
pub use retry::Fetcher;
pub use types::*;
pub use utils::{Sleeper, ThreadSleeper};

use crate::config::FetchConfig;
use crate::error::Result;
use url::Url;

/// Fetch JSON from `url` with the given configuration.
///
/// Runs the whole session: landing-page warm-up (unless disabled), a human
/// pause, then up to `config.max_attempts` attempts rotating egress paths and
/// identities. Setup problems (invalid config, client build failures) are the
/// only errors; running out of attempts is reported as
/// [`FetchResult::ExhaustedFailure`] inside the report.
///
/// # Examples
/// ```no_run
/// use qfetch::config::FetchConfig;
/// use qfetch::tools::fetch::fetch_json;
///
/// # fn example() -> qfetch::Result<()> {
/// let url = url::Url::parse("https://www.sofascore.com/api/v1/sport/tennis/scheduled-events/2025-01-19").unwrap();
/// let report = fetch_json(&url, FetchConfig::default())?;
/// println!("{} attempts in {}ms", report.attempts.len(), report.duration_ms);
/// if let Some(payload) = report.result.payload() {
///     println!("{payload}");
/// }
/// # Ok(())
/// # }
/// ```
pub fn fetch_json(url: &Url, config: FetchConfig) -> Result<FetchReport> {
    let mut fetcher = Fetcher::new(config)?;
    Ok(fetcher.run(url))
}
