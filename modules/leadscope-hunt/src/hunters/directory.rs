use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rand::Rng;
use regex::Regex;
use spider_transformations::transformation::content::{
    transform_content_input, ReturnFormat, TransformConfig, TransformInput,
};
use tokio::sync::Semaphore;
use tracing::{info, warn};

use leadscope_common::{normalize_email, normalize_phone, CandidateRecord, HuntError};

use super::{Hunter, HuntQuery};

/// Max concurrent Chromium processes. Each instance is heavy (~100MB+ RSS,
/// multiple child processes); container PID/memory limits are easy to hit.
const MAX_CONCURRENT_CHROME: usize = 2;

/// Max retry attempts for transient Chrome failures (e.g. "Cannot fork").
const CHROME_MAX_ATTEMPTS: u32 = 3;
/// Base backoff duration for Chrome retries. Actual delay is base * 3^attempt + jitter.
const CHROME_RETRY_BASE: Duration = Duration::from_secs(3);

/// Hunter that renders a business-directory listing page with headless
/// Chromium and extracts schema.org/LocalBusiness microdata blocks.
pub struct DirectoryHunter {
    base_url: String,
    max_records: usize,
    semaphore: Semaphore,
    selectors: ListingSelectors,
}

/// Compiled selector regexes for one LocalBusiness block.
struct ListingSelectors {
    name: Regex,
    telephone: Regex,
    email: Regex,
    url: Regex,
    street: Regex,
    locality: Regex,
    region: Regex,
    employees: Regex,
}

impl ListingSelectors {
    fn new() -> Self {
        let text = |prop: &str| {
            Regex::new(&format!(r#"itemprop="{prop}"[^>]*>\s*([^<]+?)\s*<"#)).expect("valid regex")
        };
        Self {
            name: text("name"),
            telephone: text("telephone"),
            email: text("email"),
            url: Regex::new(r#"itemprop="url"[^>]*href="([^"]+)""#).expect("valid regex"),
            street: text("streetAddress"),
            locality: text("addressLocality"),
            region: text("addressRegion"),
            employees: text("numberOfEmployees"),
        }
    }

    fn text<'a>(&self, re: &Regex, block: &'a str) -> Option<&'a str> {
        re.captures(block).map(|c| c.get(1).unwrap().as_str())
    }
}

impl DirectoryHunter {
    pub fn new(base_url: &str, max_records: usize) -> Self {
        info!(
            base_url,
            max_concurrent = MAX_CONCURRENT_CHROME,
            "Using DirectoryHunter (dump-dom + microdata extraction)"
        );
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            max_records,
            semaphore: Semaphore::new(MAX_CONCURRENT_CHROME),
            selectors: ListingSelectors::new(),
        }
    }

    fn listing_url(&self, query: &HuntQuery) -> Result<String> {
        let mut parsed = url::Url::parse(&self.base_url).context("Invalid directory base URL")?;
        {
            let mut pairs = parsed.query_pairs_mut();
            if let Some(ref industry) = query.industry {
                pairs.append_pair("industry", industry);
            }
            if let Some(ref region) = query.region {
                pairs.append_pair("region", region);
            }
        }
        Ok(parsed.to_string())
    }

    /// Launch Chrome --dump-dom and return raw stdout bytes.
    /// Retries up to CHROME_MAX_ATTEMPTS on transient fork/launch failures
    /// with exponential backoff (3s, 9s) plus random jitter (0-1s).
    async fn run_chrome(&self, url: &str) -> Result<Vec<u8>> {
        let parsed = url::Url::parse(url).context("Invalid URL")?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            anyhow::bail!("Only http/https URLs are allowed, got: {}", parsed.scheme());
        }

        let chrome_bin = std::env::var("CHROME_BIN").unwrap_or_else(|_| "chromium".to_string());

        for attempt in 0..CHROME_MAX_ATTEMPTS {
            let tmp_dir = tempfile::tempdir().context("Failed to create temp profile dir")?;

            let result = tokio::time::timeout(
                Duration::from_secs(30),
                tokio::process::Command::new(&chrome_bin)
                    .args([
                        "--headless",
                        "--no-sandbox",
                        "--disable-gpu",
                        "--disable-dev-shm-usage",
                        &format!("--user-data-dir={}", tmp_dir.path().display()),
                        "--dump-dom",
                        url,
                    ])
                    .output(),
            )
            .await;

            match result {
                Ok(Ok(output)) => {
                    if output.status.success() {
                        if output.stdout.is_empty() && attempt + 1 < CHROME_MAX_ATTEMPTS {
                            self.backoff(url, attempt, "Chrome returned empty DOM").await;
                            continue;
                        }
                        return Ok(output.stdout);
                    }
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    if (stderr.contains("Cannot fork")
                        || stderr.contains("Resource temporarily unavailable"))
                        && attempt + 1 < CHROME_MAX_ATTEMPTS
                    {
                        self.backoff(url, attempt, "Chrome cannot fork").await;
                        continue;
                    }
                    warn!(url, stderr = %stderr, "Chrome exited with error");
                    return Ok(Vec::new());
                }
                Ok(Err(e)) => {
                    let msg = e.to_string();
                    if (msg.contains("Cannot fork")
                        || msg.contains("Resource temporarily unavailable"))
                        && attempt + 1 < CHROME_MAX_ATTEMPTS
                    {
                        self.backoff(url, attempt, "Chrome launch failed").await;
                        continue;
                    }
                    anyhow::bail!("Failed to run Chrome for {url}: {e}");
                }
                Err(_) => {
                    if attempt + 1 < CHROME_MAX_ATTEMPTS {
                        self.backoff(url, attempt, "Chrome timed out").await;
                        continue;
                    }
                    anyhow::bail!("Chrome timed out after 30s for {url}");
                }
            }
        }

        Ok(Vec::new())
    }

    async fn backoff(&self, url: &str, attempt: u32, reason: &str) {
        let backoff = CHROME_RETRY_BASE * 3u32.pow(attempt);
        let jitter = Duration::from_millis(rand::rng().random_range(0..1000));
        warn!(
            url,
            attempt = attempt + 1,
            backoff_secs = backoff.as_secs(),
            "{reason}, retrying after backoff"
        );
        tokio::time::sleep(backoff + jitter).await;
    }

    /// Split rendered HTML into LocalBusiness microdata blocks and extract
    /// one candidate per block. Missing properties are simply absent fields.
    fn parse_listings(&self, html: &str, query: &HuntQuery) -> Vec<CandidateRecord> {
        let mut records = Vec::new();

        // First chunk precedes the first block marker; skip it.
        for block in html
            .split(r#"itemtype="https://schema.org/LocalBusiness""#)
            .skip(1)
        {
            // Bound each block at 8KB so one listing's regexes cannot read
            // into the page footer.
            let mut end = block.len().min(8192);
            while !block.is_char_boundary(end) {
                end -= 1;
            }
            let block = &block[..end];

            let Some(name) = self.selectors.text(&self.selectors.name, block) else {
                continue;
            };

            let mut record = CandidateRecord::new(name.trim(), self.name());
            record.phone = self
                .selectors
                .text(&self.selectors.telephone, block)
                .and_then(normalize_phone);
            record.email = self
                .selectors
                .text(&self.selectors.email, block)
                .and_then(normalize_email);
            record.website = self
                .selectors
                .text(&self.selectors.url, block)
                .map(|s| s.trim().to_string());
            record.address = self
                .selectors
                .text(&self.selectors.street, block)
                .map(|s| s.trim().to_string());
            record.city = self
                .selectors
                .text(&self.selectors.locality, block)
                .map(|s| s.trim().to_string());
            record.region = self
                .selectors
                .text(&self.selectors.region, block)
                .map(|s| s.trim().to_string());
            record.employee_count = self
                .selectors
                .text(&self.selectors.employees, block)
                .and_then(|s| s.chars().filter(|c| c.is_ascii_digit()).collect::<String>().parse().ok());
            record.industry = query.industry.clone();

            let description = clean_fragment(block);
            if !description.is_empty() {
                record.description = Some(description);
            }

            records.push(record);
            if records.len() >= self.max_records {
                break;
            }
        }

        records
    }
}

#[async_trait]
impl Hunter for DirectoryHunter {
    async fn collect(&self, query: &HuntQuery) -> Result<Vec<CandidateRecord>, HuntError> {
        let url = self
            .listing_url(query)
            .map_err(|e| HuntError::source_unavailable(self.name(), e))?;

        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| HuntError::source_unavailable(self.name(), "Chrome semaphore closed"))?;

        info!(url = url.as_str(), hunter = self.name(), "Scraping directory listing");

        let html = self
            .run_chrome(&url)
            .await
            .map_err(|e| HuntError::source_unavailable(self.name(), e))?;

        if html.is_empty() {
            return Err(HuntError::source_unavailable(
                self.name(),
                "empty DOM after retries",
            ));
        }

        let html = String::from_utf8_lossy(&html);
        let records = self.parse_listings(&html, query);
        info!(
            url = url.as_str(),
            count = records.len(),
            "Directory listing parsed"
        );
        Ok(records)
    }

    fn name(&self) -> &str {
        "directory"
    }
}

/// Readability-clean an HTML fragment into short plain text, truncated on a
/// char boundary at 280 bytes.
fn clean_fragment(html: &str) -> String {
    let config = TransformConfig {
        readability: false,
        main_content: false,
        return_format: ReturnFormat::Markdown,
        filter_images: true,
        filter_svg: true,
        clean_html: true,
    };
    let input = TransformInput {
        url: None,
        content: html.as_bytes(),
        screenshot_bytes: None,
        encoding: None,
        selector_config: None,
        ignore_tags: None,
    };

    let text = transform_content_input(input, &config);
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");

    if text.len() <= 280 {
        return text;
    }
    let mut end = 280;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING_HTML: &str = r#"
        <div itemscope itemtype="https://schema.org/LocalBusiness">
          <h3 itemprop="name">Acme Fabrication Inc</h3>
          <span itemprop="telephone">(512) 555-0100</span>
          <span itemprop="email">sales@acmefab.example.com</span>
          <a itemprop="url" href="https://acmefab.example.com">site</a>
          <span itemprop="streetAddress">400 Foundry Rd</span>
          <span itemprop="addressLocality">Austin</span>
          <span itemprop="addressRegion">TX</span>
          <span itemprop="numberOfEmployees">120</span>
        </div>
        <div itemscope itemtype="https://schema.org/LocalBusiness">
          <h3 itemprop="name">Barton Springs Tooling</h3>
          <span itemprop="addressLocality">Austin</span>
        </div>
    "#;

    fn hunter() -> DirectoryHunter {
        DirectoryHunter::new("https://directory.example.com/listings", 50)
    }

    fn query() -> HuntQuery {
        HuntQuery::builder().industry("manufacturing").build()
    }

    #[test]
    fn parses_full_and_sparse_blocks() {
        let records = hunter().parse_listings(LISTING_HTML, &query());
        assert_eq!(records.len(), 2);

        let full = &records[0];
        assert_eq!(full.name, "Acme Fabrication Inc");
        assert_eq!(full.phone.as_deref(), Some("5125550100"));
        assert_eq!(full.email.as_deref(), Some("sales@acmefab.example.com"));
        assert_eq!(full.website.as_deref(), Some("https://acmefab.example.com"));
        assert_eq!(full.city.as_deref(), Some("Austin"));
        assert_eq!(full.employee_count, Some(120));
        assert_eq!(full.industry.as_deref(), Some("manufacturing"));

        // Sparse block: absent properties stay None, never an error.
        let sparse = &records[1];
        assert_eq!(sparse.name, "Barton Springs Tooling");
        assert!(sparse.phone.is_none());
        assert!(sparse.website.is_none());
    }

    #[test]
    fn caps_output_volume() {
        let mut hunter = hunter();
        hunter.max_records = 1;
        let records = hunter.parse_listings(LISTING_HTML, &query());
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn block_without_name_is_skipped() {
        let html = r#"<div itemtype="https://schema.org/LocalBusiness">
            <span itemprop="telephone">(512) 555-0199</span></div>"#;
        let records = hunter().parse_listings(html, &query());
        assert!(records.is_empty());
    }

    #[test]
    fn listing_url_carries_query() {
        let q = HuntQuery::builder()
            .industry("manufacturing")
            .region("TX")
            .build();
        let url = hunter().listing_url(&q).unwrap();
        assert!(url.contains("industry=manufacturing"));
        assert!(url.contains("region=TX"));
    }
}
