use anyhow::{Context, Result, bail};
use scraper::Selector;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::warn;
use url::Url;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ScraperConfig {
    #[serde(default)]
    pub portal: PortalConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
}

impl ScraperConfig {
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.portal.listing_url)
            .with_context(|| format!("portal.listing_url is not a url: {}", self.portal.listing_url))?;

        for (name, selector) in [
            ("portal.list_container", &self.portal.list_container),
            ("portal.latest_tab", &self.portal.latest_tab),
            ("portal.row_selector", &self.portal.row_selector),
        ] {
            if Selector::parse(selector).is_err() {
                bail!("{name} is not a valid css selector: {selector}");
            }
        }

        if self.browser.listing_timeout_secs == 0 || self.browser.detail_timeout_secs == 0 {
            bail!("browser timeouts must be greater than zero");
        }

        if self.browser.mode == BrowserMode::Snapshot && self.browser.snapshot_dir.is_none() {
            bail!("browser.snapshot_dir is required for snapshot mode");
        }

        if let Some(webhook) = &self.notify.webhook_url {
            Url::parse(webhook)
                .with_context(|| format!("notify.webhook_url is not a url: {webhook}"))?;
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PortalConfig {
    #[serde(default = "default_listing_url")]
    pub listing_url: String,
    #[serde(default = "default_list_container")]
    pub list_container: String,
    #[serde(default = "default_latest_tab")]
    pub latest_tab: String,
    #[serde(default = "default_row_selector")]
    pub row_selector: String,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            listing_url: default_listing_url(),
            list_container: default_list_container(),
            latest_tab: default_latest_tab(),
            row_selector: default_row_selector(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BrowserMode {
    #[default]
    Chrome,
    Snapshot,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrowserConfig {
    #[serde(default)]
    pub mode: BrowserMode,
    #[serde(default = "default_true")]
    pub headless: bool,
    #[serde(default)]
    pub sandbox: bool,
    #[serde(default = "default_listing_timeout_secs")]
    pub listing_timeout_secs: u64,
    #[serde(default = "default_container_timeout_secs")]
    pub container_timeout_secs: u64,
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    #[serde(default = "default_detail_timeout_secs")]
    pub detail_timeout_secs: u64,
    #[serde(default = "default_detail_settle_ms")]
    pub detail_settle_ms: u64,
    #[serde(default = "default_true")]
    pub fetch_details: bool,
    #[serde(default)]
    pub snapshot_dir: Option<PathBuf>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            mode: BrowserMode::Chrome,
            headless: true,
            sandbox: false,
            listing_timeout_secs: default_listing_timeout_secs(),
            container_timeout_secs: default_container_timeout_secs(),
            settle_ms: default_settle_ms(),
            detail_timeout_secs: default_detail_timeout_secs(),
            detail_settle_ms: default_detail_settle_ms(),
            fetch_details: true,
            snapshot_dir: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotifyConfig {
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default = "default_notify_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout_secs: default_notify_timeout_secs(),
        }
    }
}

/// Loads and validates a config file. A missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<ScraperConfig> {
    let config = if path.exists() {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        toml::from_str::<ScraperConfig>(&text)
            .with_context(|| format!("failed to parse toml in {}", path.display()))?
    } else {
        warn!(config = %path.display(), "config file not found; using defaults");
        ScraperConfig::default()
    };

    config
        .validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(config)
}

pub fn sanitize_for_path(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .trim_matches('-')
        .to_string()
}

fn default_true() -> bool {
    true
}

fn default_listing_url() -> String {
    "https://eproc2.bihar.gov.in/EPSV2Web/openarea/tenderListingPage.action".to_string()
}

fn default_list_container() -> String {
    "#latestTenders".to_string()
}

fn default_latest_tab() -> String {
    r##"a[href="#latestTenders"]"##.to_string()
}

fn default_row_selector() -> String {
    "#latestTenders table tbody tr".to_string()
}

fn default_listing_timeout_secs() -> u64 {
    60
}

fn default_container_timeout_secs() -> u64 {
    30
}

fn default_settle_ms() -> u64 {
    3000
}

fn default_detail_timeout_secs() -> u64 {
    60
}

fn default_detail_settle_ms() -> u64 {
    1500
}

fn default_store_path() -> PathBuf {
    PathBuf::from("data/state/tenders.json")
}

fn default_notify_timeout_secs() -> u64 {
    10
}
