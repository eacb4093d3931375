use super::profile::{chrome_major_version, BrowserFamily};
use crate::config::IdentityConfig;
use crate::error::{FetchError, Result};
use rand::Rng;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE, CACHE_CONTROL,
    CONNECTION, DNT, ORIGIN, PRAGMA, REFERER, USER_AGENT,
};
use url::Url;

const ACCEPT_JSON: &str = "application/json, text/plain, */*";
const ACCEPT_ENCODINGS: &str = "gzip, deflate, br";
const FALLBACK_CHROME_VERSION: u32 = 120;

pub const SEC_CH_UA: &str = "sec-ch-ua";
pub const SEC_CH_UA_MOBILE: &str = "sec-ch-ua-mobile";
pub const SEC_CH_UA_PLATFORM: &str = "sec-ch-ua-platform";

/// Client-hint headers only a Chromium browser would send.
pub const CLIENT_HINT_HEADERS: [&str; 3] = [SEC_CH_UA, SEC_CH_UA_MOBILE, SEC_CH_UA_PLATFORM];

/// Headers every identity carries, whatever the browser.
pub const BASELINE_HEADERS: [&str; 12] = [
    "user-agent",
    "accept",
    "accept-language",
    "accept-encoding",
    "referer",
    "origin",
    "connection",
    "cache-control",
    "pragma",
    "sec-fetch-dest",
    "sec-fetch-mode",
    "sec-fetch-site",
];

/// Headers presented with one attempt.
#[derive(Debug, Clone)]
pub struct RequestIdentity {
    family: BrowserFamily,
    headers: HeaderMap,
}

impl RequestIdentity {
    pub fn family(&self) -> BrowserFamily {
        self.family
    }

    pub fn user_agent(&self) -> &str {
        self.headers
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }

    pub fn has_client_hints(&self) -> bool {
        CLIENT_HINT_HEADERS
            .iter()
            .any(|name| self.headers.contains_key(*name))
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn into_headers(self) -> HeaderMap {
        self.headers
    }
}

#[derive(Debug, Clone)]
struct AgentEntry {
    family: BrowserFamily,
    user_agent: HeaderValue,
    /// `sec-ch-ua` brand list matching the agent's Chrome version.
    brands: Option<HeaderValue>,
}

/// Produces a fresh, self-consistent [`RequestIdentity`] per attempt.
///
/// Every configured value is validated up front, so [`generate`](Self::generate)
/// cannot fail.
#[derive(Debug, Clone)]
pub struct IdentityGenerator {
    agents: Vec<AgentEntry>,
    languages: Vec<HeaderValue>,
    platforms: Vec<HeaderValue>,
    referer: HeaderValue,
    origin: HeaderValue,
    dnt_probability: f64,
}

impl IdentityGenerator {
    /// Build a generator whose `Referer`/`Origin` point at `site`.
    pub fn new(cfg: &IdentityConfig, site: &Url) -> Result<Self> {
        let agents = cfg
            .user_agents
            .iter()
            .map(|ua| {
                let family = BrowserFamily::from_user_agent(ua);
                let brands = if family.sends_client_hints() {
                    Some(header_value("sec-ch-ua", &brand_list(ua))?)
                } else {
                    None
                };
                Ok(AgentEntry {
                    family,
                    user_agent: header_value("user-agent", ua)?,
                    brands,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let languages = cfg
            .languages
            .iter()
            .map(|l| header_value("accept-language", l))
            .collect::<Result<Vec<_>>>()?;

        let platforms = cfg
            .platforms
            .iter()
            .map(|p| header_value("sec-ch-ua-platform", &format!("\"{p}\"")))
            .collect::<Result<Vec<_>>>()?;

        if agents.is_empty() {
            return Err(FetchError::config("identity: no user agents configured"));
        }
        if languages.is_empty() {
            return Err(FetchError::config("identity: no languages configured"));
        }
        if platforms.is_empty() && agents.iter().any(|a| a.brands.is_some()) {
            return Err(FetchError::config(
                "identity: chromium user agents need at least one platform",
            ));
        }

        let origin = site.origin().ascii_serialization();
        Ok(Self {
            agents,
            languages,
            platforms,
            referer: header_value("referer", &format!("{origin}/"))?,
            origin: header_value("origin", &origin)?,
            dnt_probability: if cfg.dnt_probability.is_nan() {
                0.0
            } else {
                cfg.dnt_probability.clamp(0.0, 1.0)
            },
        })
    }

    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> RequestIdentity {
        let agent = &self.agents[rng.gen_range(0..self.agents.len())];
        let language = &self.languages[rng.gen_range(0..self.languages.len())];

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, agent.user_agent.clone());
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_JSON));
        headers.insert(ACCEPT_LANGUAGE, language.clone());
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static(ACCEPT_ENCODINGS));
        headers.insert(REFERER, self.referer.clone());
        headers.insert(ORIGIN, self.origin.clone());
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
        headers.insert(
            HeaderName::from_static("sec-fetch-dest"),
            HeaderValue::from_static("empty"),
        );
        headers.insert(
            HeaderName::from_static("sec-fetch-mode"),
            HeaderValue::from_static("cors"),
        );
        headers.insert(
            HeaderName::from_static("sec-fetch-site"),
            HeaderValue::from_static("same-origin"),
        );

        if rng.gen_bool(self.dnt_probability) {
            headers.insert(DNT, HeaderValue::from_static("1"));
        }

        if let Some(brands) = &agent.brands {
            let platform = &self.platforms[rng.gen_range(0..self.platforms.len())];
            headers.insert(HeaderName::from_static(SEC_CH_UA), brands.clone());
            headers.insert(
                HeaderName::from_static(SEC_CH_UA_MOBILE),
                HeaderValue::from_static("?0"),
            );
            headers.insert(HeaderName::from_static(SEC_CH_UA_PLATFORM), platform.clone());
        }

        RequestIdentity {
            family: agent.family,
            headers,
        }
    }

    /// Like [`generate`](Self::generate), with `Referer`/`Origin` taken from
    /// `target` so the fetch-metadata triad stays truthful when the request
    /// leaves the configured site.
    pub fn generate_for<R: Rng + ?Sized>(&self, rng: &mut R, target: &Url) -> RequestIdentity {
        let mut identity = self.generate(rng);
        let origin = target.origin();
        if !origin.is_tuple() {
            return identity;
        }
        let origin = origin.ascii_serialization();
        if self.origin == origin.as_str() {
            return identity;
        }
        if let (Ok(referer), Ok(origin)) = (
            HeaderValue::from_str(&format!("{origin}/")),
            HeaderValue::from_str(&origin),
        ) {
            identity.headers.insert(REFERER, referer);
            identity.headers.insert(ORIGIN, origin);
        }
        identity
    }
}

fn brand_list(ua: &str) -> String {
    let version = chrome_major_version(ua).unwrap_or(FALLBACK_CHROME_VERSION);
    format!(
        "\"Not_A Brand\";v=\"8\", \"Chromium\";v=\"{version}\", \"Google Chrome\";v=\"{version}\""
    )
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| FetchError::header(name, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn generator() -> IdentityGenerator {
        let site = Url::parse("https://www.sofascore.com").unwrap();
        IdentityGenerator::new(&IdentityConfig::default(), &site).unwrap()
    }

    #[test]
    fn baseline_headers_always_present() {
        let generator = generator();
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..200 {
            let identity = generator.generate(&mut rng);
            for name in BASELINE_HEADERS.iter() {
                assert!(identity.headers().contains_key(*name), "missing {name}");
            }
        }
    }

    #[test]
    fn client_hints_only_with_chromium() {
        let generator = generator();
        let mut rng = StdRng::seed_from_u64(5);
        let mut chromium = 0;
        let mut others = 0;
        for _ in 0..500 {
            let identity = generator.generate(&mut rng);
            if identity.has_client_hints() {
                assert_eq!(identity.family(), BrowserFamily::Chromium);
                assert_eq!(
                    BrowserFamily::from_user_agent(identity.user_agent()),
                    BrowserFamily::Chromium
                );
            }
            if identity.family() == BrowserFamily::Chromium {
                chromium += 1;
                for name in CLIENT_HINT_HEADERS.iter() {
                    assert!(identity.headers().contains_key(*name));
                }
            } else {
                others += 1;
                assert!(!identity.has_client_hints());
            }
        }
        assert!(chromium > 0 && others > 0);
    }

    #[test]
    fn referer_and_origin_follow_site() {
        let site = Url::parse("https://api.example.org/some/path").unwrap();
        let generator = IdentityGenerator::new(&IdentityConfig::default(), &site).unwrap();
        let identity = generator.generate(&mut StdRng::seed_from_u64(0));
        let headers = identity.headers();
        assert_eq!(
            headers.get(REFERER).and_then(|v| v.to_str().ok()),
            Some("https://api.example.org/")
        );
        assert_eq!(
            headers.get(ORIGIN).and_then(|v| v.to_str().ok()),
            Some("https://api.example.org")
        );
        assert_eq!(
            headers.get("sec-fetch-site").and_then(|v| v.to_str().ok()),
            Some("same-origin")
        );
    }

    #[test]
    fn referer_and_origin_follow_fetched_url() {
        let generator = generator();
        let mut rng = StdRng::seed_from_u64(4);

        let foreign = Url::parse("http://127.0.0.1:8080/api/v1/items?page=2").unwrap();
        let identity = generator.generate_for(&mut rng, &foreign);
        assert_eq!(
            identity.headers().get(REFERER).and_then(|v| v.to_str().ok()),
            Some("http://127.0.0.1:8080/")
        );
        assert_eq!(
            identity.headers().get(ORIGIN).and_then(|v| v.to_str().ok()),
            Some("http://127.0.0.1:8080")
        );

        let same = Url::parse("https://www.sofascore.com/api/v1/sport/tennis/scheduled-events/2025-01-19").unwrap();
        let identity = generator.generate_for(&mut rng, &same);
        assert_eq!(
            identity.headers().get(ORIGIN).and_then(|v| v.to_str().ok()),
            Some("https://www.sofascore.com")
        );
        for name in BASELINE_HEADERS {
            assert!(identity.headers().contains_key(name));
        }
    }

    #[test]
    fn chrome_on_ios_gets_no_client_hints() {
        let mut cfg = IdentityConfig::default();
        cfg.user_agents = vec![
            "Mozilla/5.0 (iPhone; CPU iPhone OS 17_2 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) CriOS/120.0.6099.119 Mobile/15E148 Safari/604.1".into(),
        ];
        cfg.platforms.clear();
        let site = Url::parse("https://www.sofascore.com").unwrap();
        let generator = IdentityGenerator::new(&cfg, &site).unwrap();
        let identity = generator.generate(&mut StdRng::seed_from_u64(8));
        assert!(!identity.has_client_hints());
    }

    #[test]
    fn brand_list_tracks_chrome_version() {
        let mut cfg = IdentityConfig::default();
        cfg.user_agents = vec![
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36".into(),
        ];
        cfg.platforms = vec!["Windows".into()];
        let site = Url::parse("https://www.sofascore.com").unwrap();
        let generator = IdentityGenerator::new(&cfg, &site).unwrap();
        let identity = generator.generate(&mut StdRng::seed_from_u64(1));
        let brands = identity.headers().get(SEC_CH_UA).unwrap().to_str().unwrap();
        assert!(brands.contains("\"Google Chrome\";v=\"131\""));
        assert_eq!(
            identity
                .headers()
                .get(SEC_CH_UA_PLATFORM)
                .and_then(|v| v.to_str().ok()),
            Some("\"Windows\"")
        );
        assert_eq!(
            identity
                .headers()
                .get(SEC_CH_UA_MOBILE)
                .and_then(|v| v.to_str().ok()),
            Some("?0")
        );
    }

    #[test]
    fn dnt_follows_probability() {
        let site = Url::parse("https://www.sofascore.com").unwrap();
        let mut cfg = IdentityConfig::default();
        cfg.dnt_probability = 0.0;
        let never = IdentityGenerator::new(&cfg, &site).unwrap();
        cfg.dnt_probability = 1.0;
        let always = IdentityGenerator::new(&cfg, &site).unwrap();

        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..50 {
            assert!(!never.generate(&mut rng).headers().contains_key(DNT));
            assert!(always.generate(&mut rng).headers().contains_key(DNT));
        }
    }

    #[test]
    fn rejects_invalid_header_values() {
        let site = Url::parse("https://www.sofascore.com").unwrap();
        let mut cfg = IdentityConfig::default();
        cfg.languages = vec!["en\nUS".into()];
        let err = IdentityGenerator::new(&cfg, &site).unwrap_err();
        assert!(matches!(err, FetchError::InvalidHeader { .. }));
    }
}
