//! Schedule page download client.
//!
//! Fetches timetable pages from the operator's site, follows
//! parser-signalled redirects, and bounds concurrent fetches with a
//! semaphore so the external source is not hammered by a route batch or a
//! refresh cycle. Page fetching sits behind a trait so redirect handling is
//! testable without a network.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use reqwest::Url;
use tokio::sync::Semaphore;

use crate::domain::{FerrySchedule, LocationId};

use super::error::ScheduleError;
use super::parser::{self, HtmlParseResult};

/// Default base URL for the published schedule endpoint.
const DEFAULT_BASE_URL: &str = "https://www.bcferries.com/routes-fares/schedules/daily/";

/// Default maximum concurrent page fetches.
const DEFAULT_MAX_CONCURRENT: usize = 5;

/// Parser-signalled redirects followed before giving up.
const MAX_REDIRECTS: usize = 3;

/// Configuration for the schedule client.
#[derive(Debug, Clone)]
pub struct ScheduleClientConfig {
    /// Base URL the route code and date are appended to.
    pub base_url: String,
    /// Maximum concurrent page fetches.
    pub max_concurrent: usize,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl ScheduleClientConfig {
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            timeout_secs: 30,
        }
    }

    /// Set a custom base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set maximum concurrent fetches.
    pub fn with_max_concurrent(mut self, n: usize) -> Self {
        self.max_concurrent = n;
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

impl Default for ScheduleClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Fetches one page of markup. The HTTP implementation is swapped for
/// canned pages in tests.
pub trait PageFetcher: Send + Sync {
    fn fetch_page(&self, url: &Url) -> impl Future<Output = Result<String, ScheduleError>> + Send;
}

/// `reqwest`-backed page fetcher.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    http: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout_secs: u64) -> Result<Self, ScheduleError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self { http })
    }
}

impl PageFetcher for HttpFetcher {
    async fn fetch_page(&self, url: &Url) -> Result<String, ScheduleError> {
        let response = self.http.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScheduleError::Download {
                url: url.to_string(),
                message: format!("status {}", status.as_u16()),
            });
        }
        Ok(response.text().await?)
    }
}

/// Downloads and parses schedules for a route and date.
pub struct ScheduleClient<F = HttpFetcher> {
    fetcher: F,
    base_url: String,
    semaphore: Arc<Semaphore>,
}

impl ScheduleClient<HttpFetcher> {
    /// Create a new client over HTTP with the given configuration.
    pub fn new(config: &ScheduleClientConfig) -> Result<Self, ScheduleError> {
        Ok(Self::with_fetcher(
            config,
            HttpFetcher::new(config.timeout_secs)?,
        ))
    }
}

impl<F: PageFetcher> ScheduleClient<F> {
    /// Create a client over a custom page fetcher.
    pub fn with_fetcher(config: &ScheduleClientConfig, fetcher: F) -> Self {
        Self {
            fetcher,
            base_url: config.base_url.clone(),
            semaphore: Arc::new(Semaphore::new(config.max_concurrent)),
        }
    }

    fn download_url(
        &self,
        origin: &LocationId,
        destination: &LocationId,
        date: NaiveDate,
    ) -> Result<Url, ScheduleError> {
        let raw = format!(
            "{}{}-{}?&scheduleDate={}",
            self.base_url,
            origin,
            destination,
            date.format("%m/%d/%Y")
        );
        Url::parse(&raw).map_err(|err| ScheduleError::Download {
            url: raw.clone(),
            message: format!("invalid schedule url: {err}"),
        })
    }

    /// Fetches the schedule for one route and date, following
    /// parser-signalled redirects.
    ///
    /// # Errors
    ///
    /// Transport failures and unrecognized pages carry the URL involved. A
    /// redirect to any URL already visited in this attempt fails as a
    /// redirect loop; chains longer than the bounded count fail distinctly.
    pub async fn fetch_schedule(
        &self,
        origin: &LocationId,
        destination: &LocationId,
        date: NaiveDate,
    ) -> Result<FerrySchedule, ScheduleError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| ScheduleError::Download {
                url: self.base_url.clone(),
                message: "fetch pool closed".to_string(),
            })?;

        let mut url = self.download_url(origin, destination, date)?;
        tracing::info!(origin = %origin, destination = %destination, date = %date, "fetching schedule");

        let mut visited = vec![url.to_string()];
        loop {
            let html = self.fetcher.fetch_page(&url).await?;
            match parser::parse_schedule_html(&html, &url, date)? {
                HtmlParseResult::Redirect(target) => {
                    if visited.len() > MAX_REDIRECTS {
                        return Err(ScheduleError::TooManyRedirects {
                            url: url.to_string(),
                        });
                    }
                    if visited.contains(&target) {
                        return Err(ScheduleError::RedirectLoop { url: target });
                    }
                    url = Url::parse(&target).map_err(|err| ScheduleError::Parse {
                        url: target.clone(),
                        message: format!("invalid redirect url: {err}"),
                    })?;
                    visited.push(target);
                }
                HtmlParseResult::Schedule { sailings, notes } => {
                    tracing::info!(origin = %origin, destination = %destination, date = %date, "fetched schedule");
                    return Ok(FerrySchedule {
                        date,
                        origin: origin.clone(),
                        destination: destination.clone(),
                        sailings,
                        url: url.to_string(),
                        notes,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Canned pages keyed by exact URL; anything else is a 404.
    struct CannedPages {
        pages: HashMap<String, String>,
    }

    impl CannedPages {
        fn new(pages: &[(&str, &str)]) -> Self {
            Self {
                pages: pages
                    .iter()
                    .map(|(url, page)| (url.to_string(), page.to_string()))
                    .collect(),
            }
        }
    }

    impl PageFetcher for CannedPages {
        async fn fetch_page(&self, url: &Url) -> Result<String, ScheduleError> {
            self.pages
                .get(url.as_str())
                .cloned()
                .ok_or_else(|| ScheduleError::Download {
                    url: url.to_string(),
                    message: "status 404".to_string(),
                })
        }
    }

    fn config() -> ScheduleClientConfig {
        ScheduleClientConfig::new().with_base_url("https://example.test/daily/")
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 7).unwrap()
    }

    const INITIAL_URL: &str = "https://example.test/daily/AAA-BBB?&scheduleDate=08/07/2026";

    const DAILY_PAGE: &str = r#"
        <table id="dailyScheduleTableOnward"><tbody>
          <tr><td></td><td>9:25 AM</td><td>11:00 AM</td><td>1h 35m</td></tr>
        </tbody></table>
    "#;

    /// A date-range selector whose second entry matches Aug 2026 and points
    /// at `path`.
    fn redirect_page(path: &str) -> String {
        format!(
            r#"<div id="dateRangeModal">
                 <a href="/dummy?dateRange=20250101-20250201">Winter</a>
                 <a href="{path}?dateRange=20260801-20260930">Summer</a>
               </div>"#
        )
    }

    #[tokio::test]
    async fn fetches_and_parses_a_daily_page() {
        let fetcher = CannedPages::new(&[(INITIAL_URL, DAILY_PAGE)]);
        let client = ScheduleClient::with_fetcher(&config(), fetcher);

        let schedule = client
            .fetch_schedule(&LocationId::new("AAA"), &LocationId::new("BBB"), date())
            .await
            .unwrap();

        assert_eq!(schedule.origin, LocationId::new("AAA"));
        assert_eq!(schedule.sailings.len(), 1);
        assert_eq!(schedule.url, INITIAL_URL);
    }

    #[tokio::test]
    async fn follows_a_seasonal_redirect() {
        let target = "https://example.test/seasonal?dateRange=20260801-20260930";
        let fetcher = CannedPages::new(&[
            (INITIAL_URL, &redirect_page("/seasonal")),
            (target, DAILY_PAGE),
        ]);
        let client = ScheduleClient::with_fetcher(&config(), fetcher);

        let schedule = client
            .fetch_schedule(&LocationId::new("AAA"), &LocationId::new("BBB"), date())
            .await
            .unwrap();

        // The final URL, not the original request URL, lands in the record.
        assert_eq!(schedule.url, target);
        assert_eq!(schedule.sailings.len(), 1);
    }

    #[tokio::test]
    async fn revisiting_a_url_is_a_redirect_loop() {
        let first = "https://example.test/a?dateRange=20260801-20260930";
        let second = "https://example.test/b?dateRange=20260801-20260930";
        let fetcher = CannedPages::new(&[
            (INITIAL_URL, &redirect_page("/a")),
            (first, &redirect_page("/b")),
            // Points straight back at the first target.
            (second, &redirect_page("/a")),
        ]);
        let client = ScheduleClient::with_fetcher(&config(), fetcher);

        let result = client
            .fetch_schedule(&LocationId::new("AAA"), &LocationId::new("BBB"), date())
            .await;

        match result {
            Err(ScheduleError::RedirectLoop { url }) => assert_eq!(url, first),
            other => panic!("expected redirect loop, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn redirect_chains_are_bounded() {
        let a = "https://example.test/a?dateRange=20260801-20260930";
        let b = "https://example.test/b?dateRange=20260801-20260930";
        let c = "https://example.test/c?dateRange=20260801-20260930";
        let fetcher = CannedPages::new(&[
            (INITIAL_URL, &redirect_page("/a")),
            (a, &redirect_page("/b")),
            (b, &redirect_page("/c")),
            (c, &redirect_page("/d")),
        ]);
        let client = ScheduleClient::with_fetcher(&config(), fetcher);

        let result = client
            .fetch_schedule(&LocationId::new("AAA"), &LocationId::new("BBB"), date())
            .await;

        assert!(matches!(
            result,
            Err(ScheduleError::TooManyRedirects { .. })
        ));
    }

    #[tokio::test]
    async fn transport_failure_is_a_download_error() {
        let fetcher = CannedPages::new(&[]);
        let client = ScheduleClient::with_fetcher(&config(), fetcher);

        let result = client
            .fetch_schedule(&LocationId::new("AAA"), &LocationId::new("BBB"), date())
            .await;

        match result {
            Err(ScheduleError::Download { url, message }) => {
                assert_eq!(url, INITIAL_URL);
                assert_eq!(message, "status 404");
            }
            other => panic!("expected download error, got {other:?}"),
        }
    }
}
