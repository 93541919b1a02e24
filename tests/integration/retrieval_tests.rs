//! Integration tests for result retrieval
//!
//! These tests use wiremock to stand in for the education-board site and its
//! fallback sources, and drive the full retrieval cycle end-to-end.

use result_relay::config::Config;
use result_relay::{Board, Exam, FailureKind, HealthStatus, ResultFetcher, ResultQuery};
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FORM_PATH: &str = "/ebr.app/home/";
const ALTERNATE_PATH: &str = "/v2/result";
const FALLBACK_PATH: &str = "/api/result";

/// Creates a test configuration pointing every endpoint at the mock server
fn create_test_config(base_url: &str, with_fallback: bool) -> Config {
    let mut config = Config::default();
    config.fetcher.base_url = base_url.to_string();
    config.fetcher.fallback_urls = if with_fallback {
        vec![format!("{}{}", base_url, FALLBACK_PATH)]
    } else {
        Vec::new()
    };
    config.fetcher.form_timeout_ms = 2_000;
    config.fetcher.alternate_timeout_ms = 2_000;
    config.fetcher.token_page_timeout_ms = 2_000;
    config.fetcher.token_submit_timeout_ms = 2_000;
    config.fetcher.fallback_timeout_ms = 2_000;
    // No waiting between attempts
    config.retry.backoff_ms = vec![0, 0, 0];
    config
}

fn dhaka_ssc() -> ResultQuery {
    ResultQuery::new(Board::Dhaka, Exam::Ssc, "100200", "2000300040", None).unwrap()
}

fn form_page(token: &str) -> String {
    format!(
        r#"<html><body><form method="post">
             <input type="hidden" name="_token" value="{}">
             <select name="board"></select><input name="roll"><input name="reg">
           </form></body></html>"#,
        token
    )
}

fn result_page(name: &str) -> String {
    format!(
        r#"<html><body><div id="result-display">
             <table class="info">
               <tr><td>Roll No</td><td>100200</td><td>Name</td><td>{}</td></tr>
               <tr><td>Father's Name</td><td>ABUL KASHEM</td><td>Mother's Name</td><td>SALMA KHATUN</td></tr>
               <tr><td>Institute</td><td>MOTIJHEEL GOVT. BOYS' HIGH SCHOOL</td><td>Group</td><td>Science</td></tr>
               <tr><td>GPA</td><td>5.00</td><td>Result</td><td>PASSED</td></tr>
             </table>
             <table class="marks">
               <tr><th>Subject</th><th>Marks</th><th>Grade</th><th>GPA</th></tr>
               <tr><td>Bangla</td><td>85</td><td>A+</td><td>5.00</td></tr>
               <tr><td>English</td><td>81</td><td>A+</td><td>5.00</td></tr>
             </table>
           </div></body></html>"#,
        name
    )
}

fn json_result(name: &str) -> serde_json::Value {
    json!({
        "success": true,
        "result": {
            "student_name": name,
            "roll": "100200",
            "registration": "2000300040",
            "gpa": "4.50",
            "subjects": [{"name": "Bangla", "marks": "75", "grade": "A", "gpa": "4.00"}]
        }
    })
}

/// Answers every upstream endpoint with HTTP 500
async fn mount_failing_upstream(server: &MockServer) {
    for p in [FORM_PATH, ALTERNATE_PATH, FALLBACK_PATH] {
        Mock::given(path(p))
            .respond_with(ResponseTemplate::new(500))
            .mount(server)
            .await;
    }
}

async fn request_count(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .map(|requests| requests.len())
        .unwrap_or(0)
}

#[tokio::test]
async fn test_form_submission_with_token() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(FORM_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(form_page("tok-42")))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(FORM_PATH))
        .and(body_string_contains("_token=tok-42"))
        .and(body_string_contains("roll=100200"))
        .and(body_string_contains("reg=2000300040"))
        .respond_with(ResponseTemplate::new(200).set_body_string(result_page("RAFIQ ISLAM")))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = ResultFetcher::new(create_test_config(&server.uri(), true)).unwrap();
    let record = fetcher.fetch_result(&dhaka_ssc()).await.unwrap();

    assert_eq!(record.student_name, "RAFIQ ISLAM");
    assert_eq!(record.father_name, "ABUL KASHEM");
    assert_eq!(record.gpa, "5.00");
    assert_eq!(record.registration, "2000300040");
    assert_eq!(record.subjects.len(), 2);

    let metrics = fetcher.monitor().metrics();
    assert_eq!(metrics.total_requests, 1);
    assert_eq!(metrics.successful_requests, 1);
    assert_eq!(fetcher.cache_stats().size, 1);
}

#[tokio::test]
async fn test_repeat_query_served_from_cache() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(FORM_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(form_page("t")))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(FORM_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(result_page("RAFIQ ISLAM")))
        .mount(&server)
        .await;

    let fetcher = ResultFetcher::new(create_test_config(&server.uri(), false)).unwrap();
    let query = dhaka_ssc();

    let first = fetcher.fetch_result(&query).await.unwrap();
    let after_first = request_count(&server).await;
    let second = fetcher.fetch_result(&query).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(request_count(&server).await, after_first);

    // Cache hits are not counted as monitored requests by default
    assert_eq!(fetcher.monitor().metrics().total_requests, 1);
}

#[tokio::test]
async fn test_cache_hits_recorded_when_enabled() {
    let server = MockServer::start().await;
    let mut config = create_test_config(&server.uri(), false);
    config.monitor.record_cache_hits = true;

    let fetcher = ResultFetcher::new(config).unwrap();
    let query =
        ResultQuery::new(Board::Rajshahi, Exam::Hsc, "123456", "1234567890", None).unwrap();

    // First call is the demo path, the second a cache hit
    fetcher.fetch_result(&query).await.unwrap();
    fetcher.fetch_result(&query).await.unwrap();

    let metrics = fetcher.monitor().metrics();
    assert_eq!(metrics.total_requests, 1);
    assert_eq!(metrics.successful_requests, 1);
}

#[tokio::test]
async fn test_demo_identity_makes_no_requests() {
    let server = MockServer::start().await;
    mount_failing_upstream(&server).await;

    let fetcher = ResultFetcher::new(create_test_config(&server.uri(), true)).unwrap();
    let query =
        ResultQuery::new(Board::Comilla, Exam::Ssc, "123456", "1234567890", None).unwrap();
    let record = fetcher.fetch_result(&query).await.unwrap();

    assert_eq!(record.student_name, "MD. DEMO STUDENT");
    assert_eq!(record.roll, "123456");
    assert_eq!(record.registration, "1234567890");
    assert_eq!(record.subjects.len(), 7);
    assert_eq!(request_count(&server).await, 0);
}

#[tokio::test]
async fn test_demo_disabled_goes_upstream() {
    let server = MockServer::start().await;
    mount_failing_upstream(&server).await;

    let mut config = create_test_config(&server.uri(), false);
    config.demo.enabled = false;
    let fetcher = ResultFetcher::new(config).unwrap();
    let query =
        ResultQuery::new(Board::Comilla, Exam::Ssc, "123456", "1234567890", None).unwrap();

    let err = fetcher.fetch_result(&query).await.unwrap_err();
    assert_eq!(err.kind(), Some(FailureKind::Retrieval));
    assert!(request_count(&server).await > 0);
}

#[tokio::test]
async fn test_alternate_endpoint_json_on_second_attempt() {
    let server = MockServer::start().await;

    Mock::given(path(FORM_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(ALTERNATE_PATH))
        .and(body_string_contains("roll=100200"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json_result("SABRINA KHAN")))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = ResultFetcher::new(create_test_config(&server.uri(), true)).unwrap();
    let record = fetcher.fetch_result(&dhaka_ssc()).await.unwrap();

    assert_eq!(record.student_name, "SABRINA KHAN");
    assert_eq!(record.gpa, "4.50");
    assert_eq!(record.father_name, "N/A");

    let metrics = fetcher.monitor().metrics();
    assert_eq!(metrics.successful_requests, 1);
    assert_eq!(metrics.consecutive_failures, 0);
}

#[tokio::test]
async fn test_token_scrape_on_third_attempt() {
    let server = MockServer::start().await;

    // The first form submission is rejected, the alternate endpoint is missing
    Mock::given(method("GET"))
        .and(path(FORM_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(form_page("fresh")))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(FORM_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(result_page("NAFISA RAHMAN")))
        .up_to_n_times(1)
        .with_priority(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(FORM_PATH))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(ALTERNATE_PATH))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let fetcher = ResultFetcher::new(create_test_config(&server.uri(), false)).unwrap();
    let record = fetcher.fetch_result(&dhaka_ssc()).await.unwrap();

    assert_eq!(record.student_name, "NAFISA RAHMAN");
    assert_eq!(fetcher.monitor().metrics().successful_requests, 1);
}

#[tokio::test]
async fn test_fallback_source_after_strategies_fail() {
    let server = MockServer::start().await;

    Mock::given(path(FORM_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(path(ALTERNATE_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(FALLBACK_PATH))
        .and(query_param("board", "dhaka"))
        .and(query_param("exam", "ssc"))
        .and(query_param("roll", "100200"))
        .and(query_param("reg", "2000300040"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json_result("FALLBACK STUDENT")))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = ResultFetcher::new(create_test_config(&server.uri(), true)).unwrap();
    let record = fetcher.fetch_result(&dhaka_ssc()).await.unwrap();

    assert_eq!(record.student_name, "FALLBACK STUDENT");
    assert_eq!(fetcher.cache_stats().size, 1);
    assert_eq!(fetcher.monitor().metrics().successful_requests, 1);
}

#[tokio::test]
async fn test_all_avenues_fail() {
    let server = MockServer::start().await;
    mount_failing_upstream(&server).await;

    let fetcher = ResultFetcher::new(create_test_config(&server.uri(), true)).unwrap();
    let err = fetcher.fetch_result(&dhaka_ssc()).await.unwrap_err();

    assert_eq!(err.kind(), Some(FailureKind::Retrieval));
    assert_eq!(err.to_string(), "The result server responded with HTTP 500");

    let metrics = fetcher.monitor().metrics();
    assert_eq!(metrics.total_requests, 1);
    assert_eq!(metrics.failed_requests, 1);
    assert_eq!(metrics.consecutive_failures, 1);
    assert!(metrics.last_failure_time.is_some());
    assert!(!metrics.captcha_enforcement_detected);
    assert!(fetcher.cache().is_empty());
}

#[tokio::test]
async fn test_no_record_message_surfaces() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(FORM_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(form_page("t")))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(FORM_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><body><p>No Record Found</p></body></html>"),
        )
        .mount(&server)
        .await;

    let fetcher = ResultFetcher::new(create_test_config(&server.uri(), false)).unwrap();
    let err = fetcher.fetch_result(&dhaka_ssc()).await.unwrap_err();

    // The unmounted alternate endpoint answers 404 on the second attempt
    assert_eq!(err.kind(), Some(FailureKind::Retrieval));
    assert!(err.to_string().starts_with("No result found"));
}

#[tokio::test]
async fn test_captcha_demand_turns_health_critical() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(FORM_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(form_page("t")))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(FORM_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body><div class="alert-danger">Please complete the captcha to continue</div></body></html>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(path(ALTERNATE_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let fetcher = ResultFetcher::new(create_test_config(&server.uri(), false)).unwrap();
    let err = fetcher.fetch_result(&dhaka_ssc()).await.unwrap_err();
    assert_eq!(err.kind(), Some(FailureKind::Retrieval));

    assert_eq!(fetcher.monitor().health_status(), HealthStatus::Critical);
    let report = fetcher.health_report();
    assert!(!report.is_healthy);
    assert!(report.metrics.captcha_enforcement_detected);
    assert!(!report.recommendations.is_empty());
}

#[tokio::test]
async fn test_concurrent_retrievals_share_state() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(FORM_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(form_page("t")))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(FORM_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(result_page("SHARED")))
        .mount(&server)
        .await;

    let fetcher = ResultFetcher::new(create_test_config(&server.uri(), false)).unwrap();
    let a = ResultQuery::new(Board::Dhaka, Exam::Ssc, "100200", "2000300040", None).unwrap();
    let b = ResultQuery::new(Board::Sylhet, Exam::Hsc, "100200", "2000300040", None).unwrap();

    let (fa, fb) = (fetcher.clone(), fetcher.clone());
    let (ra, rb) = tokio::join!(
        tokio::spawn(async move { fa.fetch_result(&a).await }),
        tokio::spawn(async move { fb.fetch_result(&b).await }),
    );

    assert!(ra.unwrap().is_ok());
    assert!(rb.unwrap().is_ok());
    assert_eq!(fetcher.cache_stats().size, 2);
    assert_eq!(fetcher.monitor().metrics().successful_requests, 2);
}

#[tokio::test]
async fn test_clear_cache_forces_refetch() {
    let server = MockServer::start().await;
    let fetcher = ResultFetcher::new(create_test_config(&server.uri(), false)).unwrap();
    let query =
        ResultQuery::new(Board::Madrasah, Exam::Jsc, "123456", "1234567890", None).unwrap();

    fetcher.fetch_result(&query).await.unwrap();
    assert_eq!(fetcher.cache_stats().size, 1);

    fetcher.clear_cache();
    assert_eq!(fetcher.cache_stats().size, 0);
    assert!(fetcher.cache_stats().entries.is_empty());
}
