use super::client::{AttemptRequest, ReqwestTransport, Transport};
use super::egress::{EgressPath, EgressSelector};
use super::headers::{IdentityGenerator, RequestIdentity};
use super::types::*;
use super::utils::{classify_response, Sleeper, ThreadSleeper};
use super::warmup;
use crate::config::{DelayRange, FetchConfig};
use crate::error::Result;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use url::Url;

/// Retry orchestrator.
///
/// Owns the egress pool for its whole lifetime, so quarantine decisions made
/// during one fetch carry over to the next. Attempts are strictly sequential
/// and every delay blocks the calling thread.
pub struct Fetcher {
    config: FetchConfig,
    site: Url,
    selector: EgressSelector,
    identities: IdentityGenerator,
    transport: Box<dyn Transport>,
    sleeper: Box<dyn Sleeper>,
    rng: StdRng,
}

impl Fetcher {
    /// Fetcher backed by reqwest, real sleeps and an entropy-seeded RNG.
    pub fn new(config: FetchConfig) -> Result<Self> {
        config.validate()?;
        let transport = ReqwestTransport::new(&config)?;
        Self::with_parts(
            config,
            Box::new(transport),
            Box::new(ThreadSleeper),
            StdRng::from_entropy(),
        )
    }

    /// Fetcher with injected transport, sleeper and RNG.
    pub fn with_parts(
        config: FetchConfig,
        transport: Box<dyn Transport>,
        sleeper: Box<dyn Sleeper>,
        rng: StdRng,
    ) -> Result<Self> {
        config.validate()?;
        let site = config.site()?;
        let selector = EgressSelector::new(config.egress.clone())?;
        let identities = IdentityGenerator::new(&config.identity, &site)?;
        debug!(
            transport = transport.name(),
            egress = selector.len(),
            "fetcher ready"
        );
        Ok(Self {
            config,
            site,
            selector,
            identities,
            transport,
            sleeper,
            rng,
        })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    pub fn selector(&self) -> &EgressSelector {
        &self.selector
    }

    /// Fetch `url`, trying at most `max_attempts` times.
    pub fn fetch(&mut self, url: &Url, max_attempts: usize) -> FetchResult {
        self.fetch_with_report(url, max_attempts).into_result()
    }

    /// [`fetch`](Self::fetch) plus per-attempt telemetry.
    pub fn fetch_with_report(&mut self, url: &Url, max_attempts: usize) -> FetchReport {
        let started_at = Utc::now();
        let start = Instant::now();
        let mut attempts = Vec::new();

        for attempt in 0..max_attempts {
            info!(attempt = attempt + 1, max_attempts, url = %url, "attempt");

            if attempt > 0 {
                self.pause(PauseKind::Human, self.config.human_delay);
            }

            let (id, path) = self.selector.select_next(&mut self.rng);
            let path = path.clone();
            let identity = self.identities.generate_for(&mut self.rng, url);
            info!(
                egress = %path,
                browser = identity.family().name(),
                "sending request"
            );

            let attempt_start = Instant::now();
            let outcome = self.attempt(url, &path, &identity);
            attempts.push(AttemptRecord {
                attempt: attempt + 1,
                egress: path.label.clone(),
                outcome: outcome.kind(),
                duration_ms: attempt_start.elapsed().as_millis() as u64,
            });

            if outcome.penalizes_path() {
                self.selector.mark_failed(id);
            }

            match outcome {
                AttemptOutcome::Success(payload) => {
                    info!(attempt = attempt + 1, egress = %path, "JSON payload received");
                    return FetchReport {
                        url: url.to_string(),
                        started_at,
                        duration_ms: start.elapsed().as_millis() as u64,
                        attempts,
                        result: FetchResult::Success(payload),
                    };
                }
                AttemptOutcome::Parse(detail) => {
                    warn!(egress = %path, %detail, "response is not JSON");
                }
                AttemptOutcome::Forbidden => {
                    warn!(egress = %path, "403 forbidden");
                }
                AttemptOutcome::RateLimited => {
                    warn!(egress = %path, "429 too many requests");
                    self.pause(PauseKind::RateLimit, self.config.rate_limit_delay);
                }
                AttemptOutcome::OtherHttp(status) => {
                    warn!(egress = %path, status, "unexpected HTTP status");
                }
                AttemptOutcome::Transport(failure) => {
                    warn!(egress = %path, error = %failure, "request failed");
                }
            }

            if attempt + 1 < max_attempts {
                self.pause(PauseKind::Backoff, self.config.backoff_delay);
            }
        }

        error!(max_attempts, url = %url, "all attempts failed");
        FetchReport {
            url: url.to_string(),
            started_at,
            duration_ms: start.elapsed().as_millis() as u64,
            attempts,
            result: FetchResult::ExhaustedFailure,
        }
    }

    /// Best-effort landing page visit; see [`warmup::visit`].
    pub fn warm_up(&mut self) {
        warmup::visit(
            self.transport.as_ref(),
            &self.identities,
            &mut self.rng,
            &self.site,
            self.config.warmup_timeout(),
        );
    }

    /// Full browsing session: warm-up (if enabled), a human pause, then the
    /// retry loop with the configured attempt budget.
    pub fn run(&mut self, url: &Url) -> FetchReport {
        if self.config.warmup {
            self.warm_up();
            self.pause(PauseKind::Human, self.config.human_delay);
        }
        let max_attempts = self.config.max_attempts;
        self.fetch_with_report(url, max_attempts)
    }

    fn attempt(&self, url: &Url, path: &EgressPath, identity: &RequestIdentity) -> AttemptOutcome {
        let request = AttemptRequest {
            url,
            path,
            headers: identity.headers(),
            timeout: self.config.request_timeout(),
        };
        match self.transport.get(&request) {
            Ok(response) => {
                info!(status = response.status.as_u16(), "response received");
                classify_response(&response)
            }
            Err(failure) => AttemptOutcome::Transport(failure),
        }
    }

    fn pause(&mut self, kind: PauseKind, range: DelayRange) {
        let duration = range.sample(&mut self.rng);
        info!(
            pause = kind.name(),
            ms = duration.as_millis() as u64,
            "waiting"
        );
        self.sleeper.pause(kind, duration);
    }
}
