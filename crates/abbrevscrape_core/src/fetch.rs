use std::thread::sleep;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use tracing::{debug, info};

use crate::error::ScrapeError;
use crate::listing::{ListingMarkers, parse_listing_page};

/// Raw outcome of one GET: the status code and the decoded body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageResponse {
    pub status: u16,
    pub body: String,
}

/// Where listing pages come from.
///
/// `get` reports transport failures as [`ScrapeError::FetchFailed`]; status
/// handling is left to the caller. `pause` is the politeness wait between pages.
pub trait ListingSource {
    fn get(&mut self, url: &str) -> Result<PageResponse, ScrapeError>;

    fn pause(&mut self, delay: Duration) {
        sleep(delay);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSourceConfig {
    pub user_agent: String,
    pub timeout_ms: u64,
}

/// Blocking HTTP source. The client is built on the first request.
pub struct HttpListingSource {
    client: Option<Client>,
    config: HttpSourceConfig,
    request_count: usize,
}

impl HttpListingSource {
    pub fn new(config: HttpSourceConfig) -> Self {
        Self {
            client: None,
            config,
            request_count: 0,
        }
    }

    pub fn request_count(&self) -> usize {
        self.request_count
    }

    fn client(&mut self, url: &str) -> Result<&Client, ScrapeError> {
        let client = match self.client.take() {
            Some(client) => client,
            None => Client::builder()
                .timeout(Duration::from_millis(self.config.timeout_ms))
                .build()
                .map_err(|error| ScrapeError::FetchFailed {
                    url: url.to_string(),
                    reason: format!("failed to build HTTP client: {error}"),
                })?,
        };
        Ok(self.client.insert(client))
    }
}

impl ListingSource for HttpListingSource {
    fn get(&mut self, url: &str) -> Result<PageResponse, ScrapeError> {
        self.request_count += 1;
        let fetch_failed = |error: reqwest::Error| ScrapeError::FetchFailed {
            url: url.to_string(),
            reason: error.to_string(),
        };

        let user_agent = self.config.user_agent.clone();
        let response = self
            .client(url)?
            .get(url)
            .header("User-Agent", user_agent)
            .header("Accept", "text/html")
            .send()
            .map_err(fetch_failed)?;
        let status = response.status().as_u16();
        let body = response.text().map_err(fetch_failed)?;
        Ok(PageResponse { status, body })
    }
}

/// Everything `fetch_listing` needs to walk one paginated listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingRequest {
    /// Absolute URL of the first page.
    pub start_url: String,
    /// Prefix joined with each relative next-page href.
    pub site_root: String,
    pub max_pages: i64,
    pub delay_seconds: f64,
    pub markers: ListingMarkers,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingHarvest {
    pub candidates: Vec<String>,
    pub pages_fetched: usize,
}

/// Reject page budgets and delays that would make the crawl pointless or impolite.
///
/// Returns the pause to take between pages.
pub fn validate_request(request: &ListingRequest) -> Result<Duration, ScrapeError> {
    if request.max_pages < 0 || request.delay_seconds < 0.0 {
        return Err(ScrapeError::InvalidArgument(
            "page count and delay cannot be negative".to_string(),
        ));
    }
    if request.max_pages == 0 {
        return Err(ScrapeError::InvalidArgument(
            "page count cannot be zero".to_string(),
        ));
    }
    if request.delay_seconds.is_nan() || request.delay_seconds < 1.0 {
        return Err(ScrapeError::InvalidArgument(format!(
            "delay of {} seconds is too short; it must be at least one second",
            request.delay_seconds
        )));
    }
    Duration::try_from_secs_f64(request.delay_seconds).map_err(|_| {
        ScrapeError::InvalidArgument(format!(
            "delay of {} seconds is too long",
            request.delay_seconds
        ))
    })
}

/// Walk the listing from `start_url`, following next-page links for at most
/// `max_pages` pages, and return every raw entry text in page order.
pub fn fetch_listing<S: ListingSource + ?Sized>(
    source: &mut S,
    request: &ListingRequest,
) -> Result<ListingHarvest, ScrapeError> {
    let delay = validate_request(request)?;

    let mut harvest = ListingHarvest::default();
    let mut url = request.start_url.clone();

    for page_number in 1..=request.max_pages {
        if page_number > 1 {
            source.pause(delay);
        }
        info!(page = page_number, %url, "fetching listing page");
        let response = source.get(&url)?;
        if response.status != StatusCode::OK.as_u16() {
            return Err(ScrapeError::FetchFailed {
                url,
                reason: format!("unexpected HTTP status {} (expected 200)", response.status),
            });
        }
        harvest.pages_fetched += 1;

        let page = parse_listing_page(&url, &response.body, &request.markers)?;
        debug!(page = page_number, entries = page.entries.len(), "parsed listing page");
        harvest.candidates.extend(page.entries);

        match page.next_href {
            Some(href) => url = format!("{}{}", request.site_root, href),
            None => {
                debug!(page = page_number, "no next-page link; listing complete");
                break;
            }
        }
    }

    Ok(harvest)
}
