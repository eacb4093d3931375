//! Browser Families
//!
//! Client hints are only coherent for the family that actually sends them:
//! - `Chromium` → Chrome, Edge, Opera, Brave (sends `sec-ch-ua*`)
//! - `Firefox` → Gecko (never sends client hints)
//! - `Safari` → WebKit (never sends client hints)
//! - `Other` → anything we cannot recognise (treated like a non-Chromium browser)

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BrowserFamily {
    /// Chrome and its derivatives
    Chromium,

    /// Firefox
    Firefox,

    /// Safari (desktop or mobile)
    Safari,

    /// Unknown user agent
    Other,
}

impl BrowserFamily {
    /// Classify a user agent string.
    ///
    /// Order matters: Chromium user agents also advertise `Safari/`, and
    /// Firefox on iOS advertises neither `Chrome/` nor `Firefox/`. Chrome on
    /// iOS (`CriOS/`) runs on WebKit and sends no client hints, so it is Safari.
    pub fn from_user_agent(ua: &str) -> Self {
        if ua.contains("Firefox/") || ua.contains("FxiOS/") {
            Self::Firefox
        } else if ua.contains("CriOS/") {
            Self::Safari
        } else if ua.contains("Chrome/") || ua.contains("Chromium/") {
            Self::Chromium
        } else if ua.contains("Safari/") {
            Self::Safari
        } else {
            Self::Other
        }
    }

    pub fn sends_client_hints(&self) -> bool {
        matches!(self, Self::Chromium)
    }

    /// Browser Family Name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Chromium => "Chromium",
            Self::Firefox => "Firefox",
            Self::Safari => "Safari",
            Self::Other => "Other",
        }
    }
}

/// Major Chrome version advertised by a Chromium user agent (`Chrome/120.0.0.0` → `120`).
pub fn chrome_major_version(ua: &str) -> Option<u32> {
    let rest = ua.split("Chrome/").nth(1)?;
    rest.split('.').next()?.parse().ok()
}
