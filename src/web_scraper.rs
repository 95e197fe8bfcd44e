use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use scraper::{Html, Selector};
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::date::ChartDate;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                                  (KHTML, like Gecko) Chrome/137.0.0.0 Safari/537.36";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const TITLE_SELECTOR: &str = "h3.c-title";

/// Credit rows share the title markup on the chart page.
const EXCLUDED_TERMS: [&str; 3] = ["Songwriter(s):", "Producer(s):", "Imprint/Promotion Label:"];

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("Failed to build chart URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("Failed to fetch chart data: {0}")]
    Request(#[from] reqwest::Error),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChartSource: Send + Sync {
    /// Ranked chart titles for `date`. An empty list means the page was
    /// reachable but listed nothing.
    async fn fetch_titles(&self, date: &ChartDate) -> Result<Vec<String>, ChartError>;
}

pub struct ChartClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ChartClient {
    pub fn new(base_url: Url) -> Result<Self, ChartError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self { http, base_url })
    }

    fn chart_url(&self, date: &ChartDate) -> Result<Url, ChartError> {
        Ok(self.base_url.join(&format!("{date}/"))?)
    }

    async fn fetch_page(&self, url: Url) -> Result<String, reqwest::Error> {
        self.http.get(url).send().await?.error_for_status()?.text().await
    }
}

#[async_trait]
impl ChartSource for ChartClient {
    async fn fetch_titles(&self, date: &ChartDate) -> Result<Vec<String>, ChartError> {
        let url = self.chart_url(date)?;
        info!("Fetching chart from {}", url);

        let body = match self.fetch_page(url).await {
            Ok(body) => body,
            Err(e) => {
                warn!("Failed to fetch chart data: {}", e);
                return Err(e.into());
            }
        };

        let titles = extract_titles(&body);
        if titles.is_empty() {
            info!("No songs found for date {}", date);
        }

        Ok(titles)
    }
}

/// Pulls the chart titles out of a chart page, in page order.
pub fn extract_titles(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse(TITLE_SELECTOR) else {
        return Vec::new();
    };

    clean_titles(
        document
            .select(&selector)
            .map(|element| element.text().collect::<String>()),
    )
}

pub fn clean_titles<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    raw.into_iter()
        .filter_map(|text| {
            let text = text.as_ref().trim();
            let excluded = EXCLUDED_TERMS.iter().any(|term| text.contains(term));
            (!text.is_empty() && !excluded).then(|| text.to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    use super::*;

    /// Answers a single request with `response` and hands back the raw request.
    async fn serve_once(response: String) -> (Url, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
            String::from_utf8_lossy(&request).into_owned()
        });

        let base = Url::parse(&format!("http://{addr}/charts/hot-100/")).unwrap();
        (base, handle)
    }

    fn http_response(status: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
    }

    #[test]
    fn drops_credit_rows_and_trims() {
        let titles = clean_titles([
            "Shape of You",
            "Songwriter(s): Ed Sheeran",
            "  Perfect  ",
            "Producer(s): Benny Blanco",
        ]);

        assert_eq!(titles, vec!["Shape of You", "Perfect"]);
    }

    #[test]
    fn drops_blank_and_label_rows() {
        let titles = clean_titles(["   ", "Imprint/Promotion Label: Atlantic", "\n\tHello\n"]);
        assert_eq!(titles, vec!["Hello"]);
    }

    #[test]
    fn keeps_duplicate_titles_in_rank_order() {
        let titles = clean_titles(["Stay", "Heat Waves", "Stay"]);
        assert_eq!(titles, vec!["Stay", "Heat Waves", "Stay"]);
    }

    #[test]
    fn extracts_titles_from_chart_markup() {
        let html = r##"
            <html><body>
              <ul class="o-chart-results-list-row">
                <li>
                  <h3 id="title-of-a-story" class="c-title a-no-trucate">
                    Blinding Lights
                  </h3>
                  <span class="c-label">The Weeknd</span>
                </li>
                <li>
                  <h3 class="c-title">Songwriter(s):</h3>
                  <h3 class="c-title">Producer(s):</h3>
                </li>
                <li>
                  <h3 class="c-title"><a href="#">Levitating</a></h3>
                </li>
                <li>
                  <h2 class="c-title">Not a title heading</h2>
                  <h3 class="c-heading">Wrong class</h3>
                </li>
              </ul>
            </body></html>
        "##;

        assert_eq!(extract_titles(html), vec!["Blinding Lights", "Levitating"]);
    }

    #[test]
    fn page_without_titles_yields_nothing() {
        let html = "<html><body><p>This chart is not available.</p></body></html>";
        assert!(extract_titles(html).is_empty());
    }

    #[test]
    fn chart_url_appends_date_segment() {
        let base = Url::parse("https://www.billboard.com/charts/hot-100/").unwrap();
        let client = ChartClient::new(base).unwrap();
        let date = ChartDate::parse("2020-05-16").unwrap();

        assert_eq!(
            client.chart_url(&date).unwrap().as_str(),
            "https://www.billboard.com/charts/hot-100/2020-05-16/"
        );
    }

    #[tokio::test]
    async fn fetches_titles_with_browser_user_agent() {
        let body = r#"<html><body>
            <h3 class="c-title">Rockstar</h3>
            <h3 class="c-title">Songwriter(s): Post Malone</h3>
            <h3 class="c-title">Perfect</h3>
        </body></html>"#;
        let (base, server) = serve_once(http_response("200 OK", body)).await;
        let client = ChartClient::new(base).unwrap();
        let date = ChartDate::parse("2018-01-06").unwrap();

        let titles = client.fetch_titles(&date).await.unwrap();
        let request = server.await.unwrap();

        assert_eq!(titles, vec!["Rockstar", "Perfect"]);
        assert!(request.starts_with("GET /charts/hot-100/2018-01-06/ "));
        assert!(request.to_lowercase().contains("user-agent: mozilla/5.0"));
    }

    #[tokio::test]
    async fn error_status_is_a_request_error() {
        let (base, server) =
            serve_once(http_response("503 Service Unavailable", "")).await;
        let client = ChartClient::new(base).unwrap();
        let date = ChartDate::parse("2018-01-06").unwrap();

        let err = client.fetch_titles(&date).await.unwrap_err();
        server.await.unwrap();

        match err {
            ChartError::Request(e) => {
                assert_eq!(e.status(), Some(reqwest::StatusCode::SERVICE_UNAVAILABLE))
            }
            other => panic!("expected request error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_host_is_a_request_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let base = Url::parse(&format!("http://{addr}/charts/hot-100/")).unwrap();
        let client = ChartClient::new(base).unwrap();
        let date = ChartDate::parse("2018-01-06").unwrap();

        let err = client.fetch_titles(&date).await.unwrap_err();
        assert!(matches!(err, ChartError::Request(_)));
    }
}
