use qfetch::tools::fetch::{EgressPath, FetchReport, FetchResult, Fetcher, OutcomeKind};
use qfetch::FetchConfig;
use serde_json::json;
use wiremock::matchers::{header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const EVENTS_PATH: &str = "/api/v1/sport/tennis/scheduled-events/2025-01-19";

fn local_config(server: &MockServer) -> FetchConfig {
    FetchConfig::default()
        .with_base_url(server.uri())
        .direct_only()
        .without_delays()
}

/// The blocking client owns its own runtime, so build and drop it off the async workers.
async fn run_blocking(cfg: FetchConfig) -> (FetchReport, usize) {
    tokio::task::spawn_blocking(move || {
        let url = cfg.api_url("tennis", "2025-01-19").unwrap();
        let mut fetcher = Fetcher::new(cfg).unwrap();
        let report = fetcher.run(&url);
        (report, fetcher.selector().failed_count())
    })
    .await
    .unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn fetches_json_with_browser_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(EVENTS_PATH))
        .and(header_exists("user-agent"))
        .and(header_exists("accept-language"))
        .and(header("sec-fetch-mode", "cors"))
        .and(header("referer", format!("{}/", server.uri()).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"events": [{"id": 7}]})))
        .expect(1)
        .mount(&server)
        .await;

    let (report, _) = run_blocking(local_config(&server).without_warmup()).await;

    assert_eq!(
        report.result,
        FetchResult::Success(json!({"events": [{"id": 7}]}))
    );
    assert_eq!(report.attempts.len(), 1);
    assert_eq!(report.attempts[0].egress, "direct");
}

#[tokio::test(flavor = "multi_thread")]
async fn warm_up_cookies_reach_the_api_call() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "session=abc; Path=/")
                .set_body_string("<html></html>"),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(EVENTS_PATH))
        .and(header("cookie", "session=abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"events": []})))
        .expect(1)
        .mount(&server)
        .await;

    let (report, _) = run_blocking(local_config(&server)).await;

    assert!(report.result.is_success());
}

#[tokio::test(flavor = "multi_thread")]
async fn recovers_from_rate_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(EVENTS_PATH))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(EVENTS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"events": []})))
        .mount(&server)
        .await;

    let (report, failed) = run_blocking(local_config(&server).without_warmup()).await;

    let kinds: Vec<OutcomeKind> = report.attempts.iter().map(|a| a.outcome).collect();
    assert_eq!(kinds, vec![OutcomeKind::RateLimited, OutcomeKind::Success]);
    assert_eq!(failed, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn stops_after_attempt_budget() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(EVENTS_PATH))
        .respond_with(ResponseTemplate::new(403))
        .expect(3)
        .mount(&server)
        .await;

    let cfg = local_config(&server).without_warmup().with_max_attempts(3);
    let (report, _) = run_blocking(cfg).await;

    assert_eq!(report.result, FetchResult::ExhaustedFailure);
    assert!(report
        .attempts
        .iter()
        .all(|a| a.outcome == OutcomeKind::Forbidden));
}

#[tokio::test(flavor = "multi_thread")]
async fn dead_proxy_is_attributed_and_quarantined() {
    let server = MockServer::start().await;

    let dead = EgressPath::proxy("dead", Some("http://127.0.0.1:1"), None).preferred();
    let cfg = local_config(&server)
        .without_warmup()
        .with_egress(vec![EgressPath::direct(), dead])
        .with_max_attempts(1);
    let (report, failed) = run_blocking(cfg).await;

    assert_eq!(report.attempts[0].egress, "dead");
    assert_eq!(report.attempts[0].outcome, OutcomeKind::ProxyTransportError);
    assert_eq!(failed, 1);
}
