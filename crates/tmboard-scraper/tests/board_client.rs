//! Integration tests for `BoardClient`.
//!
//! Uses `wiremock` to stand up a local HTTP server per test so no real
//! network traffic is made.

use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tmboard_core::{BoardTable, MalformedRowPolicy};
use tmboard_scraper::{
    BoardClient, ExtractError, ExtractOptions, PageFetcher, ScraperError, TableRows,
};

const RESULTS_PAGE: &str = "<html><body><table>\
    <tr><th>#</th><th>Player</th><th>Finishes</th><th>Avg</th><th>Avg finished</th></tr>\
    <tr><td>1</td><td><a href=players.php?pid=1><span style='color:#ffffff;'>A</span>b</a></td>\
    <td>5</td><td>1.5</td><td>2.5</td></tr>\
    <tr><td>2</td><td><a href=players.php?pid=2>Plain&nbsp;Name</a></td>\
    <td>4</td><td>2.0</td><td>2.25</td></tr>\
    </table></body></html>";

/// 5-second timeout, no retries.
fn test_client() -> BoardClient {
    BoardClient::new(5, "tmboard-test/0.1", 0, 0).expect("failed to build test BoardClient")
}

#[tokio::test]
async fn fetch_html_returns_page_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/results.php"))
        .respond_with(ResponseTemplate::new(200).set_body_string(RESULTS_PAGE))
        .mount(&server)
        .await;

    let body = test_client()
        .fetch_page(&format!("{}/results.php", server.uri()))
        .await
        .expect("page body");
    assert!(body.contains("players.php?pid=1"));
}

#[tokio::test]
async fn fetch_table_extracts_rows_in_page_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/results.php"))
        .respond_with(ResponseTemplate::new(200).set_body_string(RESULTS_PAGE))
        .mount(&server)
        .await;

    let rows = test_client()
        .fetch_table(
            BoardTable::Results,
            &format!("{}/results.php", server.uri()),
            &ExtractOptions::default(),
        )
        .await
        .expect("rows");

    let TableRows::Results(rows) = rows else {
        panic!("expected results rows");
    };
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].name_formatted, "$<$fffA$>b");
    assert_eq!(rows[1].nickname, "Plain Name");
    assert_eq!(rows[1].name_formatted, "Plain Name");
}

#[tokio::test]
async fn not_found_is_reported_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/results.php"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let client = BoardClient::new(5, "tmboard-test/0.1", 3, 0).expect("client");
    let err = client
        .fetch_html(&format!("{}/results.php", server.uri()))
        .await
        .unwrap_err();
    assert!(
        matches!(err, ScraperError::UnexpectedStatus { status: 404, .. }),
        "got: {err:?}"
    );
}

#[tokio::test]
async fn server_error_is_retried_until_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/maps.php"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/maps.php"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<table></table>"))
        .mount(&server)
        .await;

    let client = BoardClient::new(5, "tmboard-test/0.1", 2, 0).expect("client");
    let body = client
        .fetch_html(&format!("{}/maps.php", server.uri()))
        .await
        .expect("retry should succeed");
    assert_eq!(body, "<table></table>");
}

#[tokio::test]
async fn slow_response_is_a_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/results.php"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(RESULTS_PAGE)
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let client = BoardClient::new(1, "tmboard-test/0.1", 0, 0).expect("client");
    let err = client
        .fetch_html(&format!("{}/results.php", server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(err, ScraperError::Timeout { .. }), "got: {err:?}");
}

#[tokio::test]
async fn malformed_page_surfaces_extract_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/results.php"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("<table><tr><td>1</td><td>x</td></tr></table>"),
        )
        .mount(&server)
        .await;

    let err = test_client()
        .fetch_table(
            BoardTable::Results,
            &format!("{}/results.php", server.uri()),
            &ExtractOptions::with_policy(MalformedRowPolicy::Abort),
        )
        .await
        .unwrap_err();
    assert!(
        matches!(
            err,
            ScraperError::Extract(ExtractError::MalformedRow { cells: 2, .. })
        ),
        "got: {err:?}"
    );
}
