use crate::config::FetchConfig;
use crate::error::{FetchError, Result};
use crate::tools::fetch::{fetch_json, FetchReport};
use chrono::{NaiveDate, Utc};
use serde_json::Value;

const DATE_FORMAT: &str = "%Y-%m-%d";

/* ------------ public facade ------------ */

/// Scheduled events of `sport` on `date` (`YYYY-MM-DD`).
///
/// The date and sport are validated before anything goes on the wire.
pub fn fetch_scheduled_events(sport: &str, date: &str, config: FetchConfig) -> Result<FetchReport> {
    let date = parse_date(date)?;
    validate_sport(sport)?;
    let url = config.api_url(sport, &date.format(DATE_FORMAT).to_string())?;
    fetch_json(&url, config)
}

/// Today's UTC date in the endpoint's format.
pub fn today() -> String {
    Utc::now().date_naive().format(DATE_FORMAT).to_string()
}

pub fn parse_date(date: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date.trim(), DATE_FORMAT)
        .map_err(|_| FetchError::InvalidDate(date.to_string()))
}

fn validate_sport(sport: &str) -> Result<()> {
    let ok = !sport.is_empty()
        && sport
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if ok {
        Ok(())
    } else {
        Err(FetchError::config(format!("invalid sport slug {sport:?}")))
    }
}

/// Number of entries in the payload's `events` array, if it has one.
pub fn count_events(payload: &Value) -> Option<usize> {
    payload.get("events").and_then(Value::as_array).map(Vec::len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_iso_dates_only() {
        assert!(parse_date("2025-01-19").is_ok());
        assert!(parse_date(" 2025-01-19 ").is_ok());
        assert!(matches!(parse_date("19/01/2025"), Err(FetchError::InvalidDate(_))));
        assert!(parse_date("2025-02-30").is_err());
    }

    #[test]
    fn today_is_parseable() {
        assert!(parse_date(&today()).is_ok());
    }

    #[test]
    fn rejects_bad_input_before_fetching() {
        let cfg = FetchConfig::default();
        assert!(matches!(
            fetch_scheduled_events("tennis", "tomorrow", cfg.clone()),
            Err(FetchError::InvalidDate(_))
        ));
        assert!(matches!(
            fetch_scheduled_events("../admin", "2025-01-19", cfg),
            Err(FetchError::InvalidConfig(_))
        ));
    }

    #[test]
    fn counts_events() {
        assert_eq!(count_events(&json!({"events": [1, 2, 3]})), Some(3));
        assert_eq!(count_events(&json!({"events": []})), Some(0));
        assert_eq!(count_events(&json!({"data": []})), None);
    }
}
