//! Egress paths and the selector that rotates through them.

use crate::error::{FetchError, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tracing::{debug, warn};
use url::Url;

/// How a request leaves the machine.
///
/// A proxy maps `http` and `https` traffic independently, so a pool entry can
/// tunnel HTTPS through a plain-HTTP proxy or the other way around. A scheme
/// without a mapping goes out directly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Route {
    Direct,
    Proxy {
        #[serde(default)]
        http: Option<String>,
        #[serde(default)]
        https: Option<String>,
    },
}

/// One network route in the pool.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EgressPath {
    pub label: String,
    pub route: Route,
    /// Preferred paths win selection whenever one of them is available.
    #[serde(default)]
    pub preferred: bool,
}

impl EgressPath {
    pub fn direct() -> Self {
        Self {
            label: "direct".into(),
            route: Route::Direct,
            preferred: false,
        }
    }

    pub fn proxy(label: impl Into<String>, http: Option<&str>, https: Option<&str>) -> Self {
        Self {
            label: label.into(),
            route: Route::Proxy {
                http: http.map(str::to_string),
                https: https.map(str::to_string),
            },
            preferred: false,
        }
    }

    pub fn preferred(mut self) -> Self {
        self.preferred = true;
        self
    }

    pub fn is_direct(&self) -> bool {
        matches!(self.route, Route::Direct)
    }

    /// Proxy URL handling `scheme` traffic, if any.
    pub fn proxy_for(&self, scheme: &str) -> Option<&str> {
        match &self.route {
            Route::Direct => None,
            Route::Proxy { http, https } => match scheme {
                "http" => http.as_deref(),
                "https" => https.as_deref(),
                _ => None,
            },
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.label.trim().is_empty() {
            return Err(FetchError::config("egress path with an empty label"));
        }
        let Route::Proxy { http, https } = &self.route else {
            return Ok(());
        };
        if http.is_none() && https.is_none() {
            return Err(FetchError::config(format!(
                "proxy {} maps neither http nor https",
                self.label
            )));
        }
        for endpoint in [http, https].into_iter().flatten() {
            let url = Url::parse(endpoint).map_err(|e| {
                FetchError::config(format!("proxy {}: {endpoint}: {e}", self.label))
            })?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(FetchError::config(format!(
                    "proxy {}: unsupported scheme {}",
                    self.label,
                    url.scheme()
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Display for EgressPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.route {
            Route::Direct => write!(f, "{} (no proxy)", self.label),
            Route::Proxy { http, https } => {
                let endpoint = https.as_deref().or(http.as_deref()).unwrap_or("?");
                write!(f, "{} via {endpoint}", self.label)
            }
        }
    }
}

/// Position of a path in its pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EgressId(pub usize);

impl fmt::Display for EgressId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Static pool plus the paths quarantined for the current cycle.
///
/// Failed paths are never dropped: once every path has failed the quarantine
/// is lifted and the whole pool becomes selectable again.
#[derive(Debug, Clone)]
pub struct EgressSelector {
    paths: Vec<EgressPath>,
    failed: BTreeSet<usize>,
}

impl EgressSelector {
    pub fn new(paths: Vec<EgressPath>) -> Result<Self> {
        if paths.is_empty() {
            return Err(FetchError::config("egress pool is empty"));
        }
        Ok(Self {
            paths,
            failed: BTreeSet::new(),
        })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn paths(&self) -> &[EgressPath] {
        &self.paths
    }

    pub fn get(&self, id: EgressId) -> Option<&EgressPath> {
        self.paths.get(id.0)
    }

    /// Ids not quarantined in this cycle, in pool order.
    pub fn available(&self) -> Vec<EgressId> {
        (0..self.paths.len())
            .filter(|i| !self.failed.contains(i))
            .map(EgressId)
            .collect()
    }

    pub fn is_failed(&self, id: EgressId) -> bool {
        self.failed.contains(&id.0)
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    /// Pick the next path to try.
    pub fn select_next<R: Rng + ?Sized>(&mut self, rng: &mut R) -> (EgressId, &EgressPath) {
        let mut available = self.available();
        if available.is_empty() {
            warn!(pool = self.paths.len(), "every egress path failed, resetting pool");
            self.reset();
            available = self.available();
        }

        let preferred: Vec<EgressId> = available
            .iter()
            .copied()
            .filter(|id| self.paths[id.0].preferred)
            .collect();
        let candidates = if preferred.is_empty() {
            &available
        } else {
            &preferred
        };

        let id = candidates[rng.gen_range(0..candidates.len())];
        debug!(
            egress = %self.paths[id.0],
            candidates = candidates.len(),
            failed = self.failed.len(),
            "selected egress path"
        );
        (id, &self.paths[id.0])
    }

    /// Quarantine a path until the next reset. Unknown ids are ignored.
    pub fn mark_failed(&mut self, id: EgressId) {
        if id.0 >= self.paths.len() {
            return;
        }
        if self.failed.insert(id.0) {
            warn!(egress = %self.paths[id.0], "egress path marked failed");
        }
    }

    pub fn reset(&mut self) {
        self.failed.clear();
    }
}
