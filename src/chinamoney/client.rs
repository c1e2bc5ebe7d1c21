// src/chinamoney/client.rs
use crate::chinamoney::models::{BondItem, BondListResponse, BondRow};
use crate::utils::error::FetchError;
use reqwest::header::{self, HeaderMap, HeaderValue};
use std::time::Duration;

pub const BOND_LIST_URL: &str = "https://www.chinamoney.com.cn/ags/ms/cm-u-bond-md/BondMarketInfoListEN";

// The endpoint rejects requests that do not look like they came from its own page.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=UTF-8";
const ORIGIN: &str = "https://www.chinamoney.com.cn";
const REFERER: &str = "https://www.chinamoney.com.cn/english/bdInfo/";

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Query and pacing settings for one bond list download.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub api_url: String,
    /// ChinaMoney bond type code, `100001` is treasury bonds.
    pub bond_type_code: String,
    pub issue_year: String,
    pub page_size: u32,
    /// Fixed pause between pages. There is no retry or backoff.
    pub page_delay: Duration,
    /// Text written to the `Bond Type` column.
    pub bond_type_label: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            api_url: BOND_LIST_URL.to_string(),
            bond_type_code: "100001".to_string(),
            issue_year: "2023".to_string(),
            page_size: 15,
            page_delay: Duration::from_millis(150),
            bond_type_label: "Treasury Bond".to_string(),
        }
    }
}

/// Anything that can hand out pages of the bond list, 1-based.
#[allow(async_fn_in_trait)]
pub trait PageSource {
    async fn fetch_page(&self, page_no: u32) -> Result<Vec<BondItem>, FetchError>;
}

/// Creates a reqwest client configured for the ChinaMoney API.
fn build_client() -> Result<reqwest::Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(header::ACCEPT, HeaderValue::from_static("application/json, text/plain, */*"));
    headers.insert(header::ORIGIN, HeaderValue::from_static(ORIGIN));
    headers.insert(header::REFERER, HeaderValue::from_static(REFERER));

    reqwest::Client::builder()
        .user_agent(BROWSER_USER_AGENT)
        .default_headers(headers)
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .no_proxy() // Ignore proxy environment variables
        .build()
}

pub struct BondClient {
    http: reqwest::Client,
    config: FetchConfig,
}

impl BondClient {
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let http = build_client()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

impl PageSource for BondClient {
    async fn fetch_page(&self, page_no: u32) -> Result<Vec<BondItem>, FetchError> {
        let payload = [
            ("bondType", self.config.bond_type_code.clone()),
            ("issueYear", self.config.issue_year.clone()),
            ("pageNo", page_no.to_string()),
            ("pageSize", self.config.page_size.to_string()),
        ];

        tracing::debug!("Requesting page {} from {}", page_no, self.config.api_url);
        let response = self
            .http
            .post(&self.config.api_url)
            .header(header::CONTENT_TYPE, FORM_CONTENT_TYPE)
            .form(&payload)
            .send()
            .await?; // Propagates reqwest::Error as FetchError::Network

        let status = response.status();
        if !status.is_success() {
            tracing::error!("HTTP error status: {} for page {}", status, page_no);
            return Err(FetchError::Http(status));
        }

        let body: BondListResponse = response.json().await?;
        Ok(body.into_items())
    }
}

/// Result of walking every page.
#[derive(Debug, Default)]
pub struct FetchSummary {
    pub rows: Vec<BondRow>,
    /// Non-empty pages read.
    pub pages: u32,
}

/// Reads pages from 1 upwards until one comes back empty.
pub async fn fetch_all<S: PageSource>(source: &S, config: &FetchConfig) -> Result<FetchSummary, FetchError> {
    let mut summary = FetchSummary::default();
    let mut page_no = 1;

    loop {
        let items = source.fetch_page(page_no).await?;
        if items.is_empty() {
            tracing::debug!("Page {} is empty, stopping", page_no);
            break;
        }

        let count = items.len();
        summary.rows.extend(
            items
                .into_iter()
                .map(|item| BondRow::from_item(item, &config.bond_type_label)),
        );
        summary.pages += 1;
        tracing::info!("page {}: +{}", page_no, count);

        page_no += 1;
        if !config.page_delay.is_zero() {
            tokio::time::sleep(config.page_delay).await;
        }
    }

    Ok(summary)
}
