//! Fetch configuration and its defaults.
//!
//! Everything is code-first: [`FetchConfig::default`] reproduces the setup the
//! CLI runs with, and callers tweak it through the `with_*` methods. Nothing
//! is read from the environment.

use crate::error::{FetchError, Result};
use crate::tools::fetch::egress::{EgressPath, Route};
use crate::tools::fetch::profile::BrowserFamily;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://www.sofascore.com";
pub const DEFAULT_API_PATH: &str = "/api/v1/sport/{sport}/scheduled-events/{date}";
pub const DEFAULT_SPORT: &str = "tennis";
pub const DEFAULT_MAX_ATTEMPTS: usize = 5;

/// Inclusive range of milliseconds a pause is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    /// Draw a duration uniformly from the range.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.max_ms <= self.min_ms {
            return Duration::from_millis(self.min_ms);
        }
        Duration::from_millis(rng.gen_range(self.min_ms..=self.max_ms))
    }

    fn validate(&self, name: &str) -> Result<()> {
        if self.min_ms > self.max_ms {
            return Err(FetchError::config(format!(
                "{name}: min_ms ({}) is greater than max_ms ({})",
                self.min_ms, self.max_ms
            )));
        }
        Ok(())
    }
}

/// Pools the identity generator draws from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    pub user_agents: Vec<String>,
    pub languages: Vec<String>,
    /// `sec-ch-ua-platform` values (unquoted), only used for Chromium user agents.
    pub platforms: Vec<String>,
    /// Probability of adding `DNT: 1`.
    pub dnt_probability: f64,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            user_agents: vec![
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".into(),
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".into(),
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0".into(),
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15".into(),
                "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".into(),
            ],
            languages: vec![
                "fr-FR,fr;q=0.9,en;q=0.8".into(),
                "en-US,en;q=0.9,fr;q=0.8".into(),
                "fr-FR,fr;q=0.8,en-US;q=0.5,en;q=0.3".into(),
            ],
            platforms: vec!["Windows".into(), "macOS".into(), "Linux".into()],
            dnt_probability: 0.5,
        }
    }
}

impl IdentityConfig {
    fn validate(&self) -> Result<()> {
        if self.user_agents.is_empty() {
            return Err(FetchError::config("identity: no user agents configured"));
        }
        if self.languages.is_empty() {
            return Err(FetchError::config("identity: no languages configured"));
        }
        let has_chromium = self
            .user_agents
            .iter()
            .any(|ua| BrowserFamily::from_user_agent(ua).sends_client_hints());
        if has_chromium && self.platforms.is_empty() {
            return Err(FetchError::config(
                "identity: chromium user agents need at least one platform",
            ));
        }
        if !(0.0..=1.0).contains(&self.dnt_probability) {
            return Err(FetchError::config(format!(
                "identity: dnt_probability {} is outside 0..=1",
                self.dnt_probability
            )));
        }
        Ok(())
    }
}

/// The static egress pool: direct first, then the high-anonymity HTTPS
/// proxies (preferred), then plain HTTP fallbacks.
pub fn default_egress_pool() -> Vec<EgressPath> {
    vec![
        EgressPath::direct(),
        EgressPath::proxy(
            "fr-https-1",
            Some("http://51.38.191.151:80"),
            Some("https://51.38.191.151:80"),
        )
        .preferred(),
        EgressPath::proxy(
            "fr-https-2",
            Some("http://51.38.230.146:443"),
            Some("https://51.38.230.146:443"),
        )
        .preferred(),
        EgressPath::proxy(
            "fr-http-1",
            Some("http://51.15.228.52:8080"),
            Some("http://51.15.228.52:8080"),
        ),
        EgressPath::proxy(
            "fr-http-2",
            Some("http://188.165.49.152:80"),
            Some("http://188.165.49.152:80"),
        ),
        EgressPath::proxy(
            "fr-http-3",
            Some("http://217.182.210.152:80"),
            Some("http://217.182.210.152:80"),
        ),
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub base_url: String,
    /// Path template; `{sport}` and `{date}` are substituted.
    pub api_path: String,
    pub max_attempts: usize,
    pub request_timeout_ms: u64,
    pub warmup_timeout_ms: u64,
    pub redirect_limit: usize,
    pub warmup: bool,
    /// Pause before every attempt but the first (and before the API call after warm-up).
    pub human_delay: DelayRange,
    /// Pause between attempts, whatever the outcome.
    pub backoff_delay: DelayRange,
    /// Extra pause after a 429.
    pub rate_limit_delay: DelayRange,
    pub egress: Vec<EgressPath>,
    pub identity: IdentityConfig,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            api_path: DEFAULT_API_PATH.into(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            request_timeout_ms: 30_000,
            warmup_timeout_ms: 15_000,
            redirect_limit: 10,
            warmup: true,
            human_delay: DelayRange::new(1_000, 5_000),
            backoff_delay: DelayRange::new(3_000, 8_000),
            rate_limit_delay: DelayRange::new(10_000, 30_000),
            egress: default_egress_pool(),
            identity: IdentityConfig::default(),
        }
    }
}

impl FetchConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_egress(mut self, egress: Vec<EgressPath>) -> Self {
        self.egress = egress;
        self
    }

    /// Reduce the pool to the direct path only.
    pub fn direct_only(mut self) -> Self {
        self.egress = vec![EgressPath::direct()];
        self
    }

    pub fn without_warmup(mut self) -> Self {
        self.warmup = false;
        self
    }

    /// Zero every pause; handy for tests and local mirrors.
    pub fn without_delays(mut self) -> Self {
        self.human_delay = DelayRange::new(0, 0);
        self.backoff_delay = DelayRange::new(0, 0);
        self.rate_limit_delay = DelayRange::new(0, 0);
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn warmup_timeout(&self) -> Duration {
        Duration::from_millis(self.warmup_timeout_ms)
    }

    /// Parsed `base_url`; only http(s) is accepted.
    pub fn site(&self) -> Result<Url> {
        let url = Url::parse(&self.base_url)?;
        match url.scheme() {
            "http" | "https" if url.host_str().is_some() => Ok(url),
            _ => Err(FetchError::InvalidUrl(self.base_url.clone())),
        }
    }

    /// Full URL of the scheduled-events endpoint for `sport` on `date`.
    pub fn api_url(&self, sport: &str, date: &str) -> Result<Url> {
        let path = self
            .api_path
            .replace("{sport}", sport)
            .replace("{date}", date);
        Ok(self.site()?.join(&path)?)
    }

    pub fn validate(&self) -> Result<()> {
        self.site()?;
        if self.egress.is_empty() {
            return Err(FetchError::config("egress pool is empty"));
        }
        for path in &self.egress {
            path.validate()?;
        }
        if self.request_timeout_ms == 0 || self.warmup_timeout_ms == 0 {
            return Err(FetchError::config("timeouts must be greater than zero"));
        }
        self.human_delay.validate("human_delay")?;
        self.backoff_delay.validate("backoff_delay")?;
        self.rate_limit_delay.validate("rate_limit_delay")?;
        self.identity.validate()?;
        Ok(())
    }

    /// Number of proxied paths in the pool.
    pub fn proxy_count(&self) -> usize {
        self.egress
            .iter()
            .filter(|p| matches!(p.route, Route::Proxy { .. }))
            .count()
    }
}
