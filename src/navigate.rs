use crate::config::{BrowserConfig, BrowserMode, PortalConfig, sanitize_for_path};
use crate::error::{DetailFetchError, NavigationError};
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Rendered HTML of one page and the URL it was loaded from.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub url: String,
    pub html: String,
}

/// Source of rendered pages for one run.
pub trait Navigator {
    /// Loads the listing with the latest tenders view active.
    fn load_listing(&mut self) -> Result<RenderedPage, NavigationError>;

    /// Loads one detail page. The page is released before this returns.
    fn load_detail(&mut self, url: &str) -> Result<RenderedPage, DetailFetchError>;
}

impl<N: Navigator + ?Sized> Navigator for Box<N> {
    fn load_listing(&mut self) -> Result<RenderedPage, NavigationError> {
        (**self).load_listing()
    }

    fn load_detail(&mut self, url: &str) -> Result<RenderedPage, DetailFetchError> {
        (**self).load_detail(url)
    }
}

impl<N: Navigator + ?Sized> Navigator for &mut N {
    fn load_listing(&mut self) -> Result<RenderedPage, NavigationError> {
        (**self).load_listing()
    }

    fn load_detail(&mut self, url: &str) -> Result<RenderedPage, DetailFetchError> {
        (**self).load_detail(url)
    }
}

/// Opens the navigator selected by `browser.mode`.
pub fn open_navigator(
    portal: &PortalConfig,
    settings: &BrowserConfig,
) -> Result<Box<dyn Navigator>, NavigationError> {
    match settings.mode {
        BrowserMode::Chrome => Ok(Box::new(ChromeNavigator::launch(portal, settings)?)),
        BrowserMode::Snapshot => {
            let root = settings.snapshot_dir.as_deref().ok_or_else(|| {
                NavigationError::Launch("browser.snapshot_dir is not configured".to_string())
            })?;
            Ok(Box::new(SnapshotNavigator::new(root, &portal.listing_url)))
        }
    }
}

/// Drives a headless Chrome launched with its own temporary profile.
pub struct ChromeNavigator {
    browser: Browser,
    portal: PortalConfig,
    settings: BrowserConfig,
}

impl ChromeNavigator {
    pub fn launch(portal: &PortalConfig, settings: &BrowserConfig) -> Result<Self, NavigationError> {
        let args = vec![
            OsStr::new("--disable-blink-features=AutomationControlled"),
            OsStr::new("--no-first-run"),
            OsStr::new("--no-default-browser-check"),
            OsStr::new("--disable-extensions"),
            OsStr::new("--disable-setuid-sandbox"),
        ];

        let options = LaunchOptions::default_builder()
            .headless(settings.headless)
            .sandbox(settings.sandbox)
            .idle_browser_timeout(Duration::from_secs(
                settings.listing_timeout_secs.max(settings.detail_timeout_secs) * 2,
            ))
            .args(args)
            .build()
            .map_err(|err| NavigationError::Launch(err.to_string()))?;

        let browser = Browser::new(options).map_err(|err| NavigationError::Launch(err.to_string()))?;
        info!(headless = settings.headless, "browser launched");

        Ok(Self {
            browser,
            portal: portal.clone(),
            settings: settings.clone(),
        })
    }

    fn open_tab(&self) -> anyhow::Result<TabGuard> {
        let tab = self.browser.new_tab()?;
        Ok(TabGuard(tab))
    }
}

impl Navigator for ChromeNavigator {
    fn load_listing(&mut self) -> Result<RenderedPage, NavigationError> {
        let url = self.portal.listing_url.clone();
        let load_err = |err: anyhow::Error| NavigationError::Load {
            url: url.clone(),
            message: err.to_string(),
        };

        let tab = self.open_tab().map_err(load_err)?;
        tab.set_default_timeout(Duration::from_secs(self.settings.listing_timeout_secs));

        info!(%url, "loading listing");
        tab.navigate_to(&url).map_err(load_err)?;
        tab.wait_until_navigated().map_err(load_err)?;

        tab.wait_for_element_with_custom_timeout(
            &self.portal.list_container,
            Duration::from_secs(self.settings.container_timeout_secs),
        )
        .map_err(|_| NavigationError::ContainerMissing {
            selector: self.portal.list_container.clone(),
            timeout_secs: self.settings.container_timeout_secs,
        })?;

        let script = format!(
            "(() => {{ const tab = document.querySelector({}); if (tab) {{ tab.click(); return true; }} return false; }})()",
            serde_json::to_string(&self.portal.latest_tab)
                .map_err(|err| NavigationError::TabSwitch(err.to_string()))?
        );
        let clicked = tab
            .evaluate(&script, false)
            .map_err(|err| NavigationError::TabSwitch(err.to_string()))?
            .value
            .and_then(|value| value.as_bool())
            .unwrap_or(false);
        if !clicked {
            warn!(selector = %self.portal.latest_tab, "latest tenders tab not found; using current view");
        }

        std::thread::sleep(Duration::from_millis(self.settings.settle_ms));

        let html = tab.get_content().map_err(load_err)?;
        debug!(%url, bytes = html.len(), "listing rendered");
        Ok(RenderedPage { url, html })
    }

    fn load_detail(&mut self, url: &str) -> Result<RenderedPage, DetailFetchError> {
        let timeout_secs = self.settings.detail_timeout_secs;
        let load_err = |err: anyhow::Error| DetailFetchError::Load {
            url: url.to_string(),
            timeout_secs,
            message: err.to_string(),
        };

        let tab = self.open_tab().map_err(|err| DetailFetchError::Open {
            url: url.to_string(),
            message: err.to_string(),
        })?;
        tab.set_default_timeout(Duration::from_secs(timeout_secs));

        tab.navigate_to(url).map_err(load_err)?;
        tab.wait_until_navigated().map_err(load_err)?;
        std::thread::sleep(Duration::from_millis(self.settings.detail_settle_ms));

        let html = tab.get_content().map_err(load_err)?;
        debug!(%url, bytes = html.len(), "detail rendered");
        Ok(RenderedPage {
            url: url.to_string(),
            html,
        })
    }
}

/// Closes its tab when dropped, on every exit path.
struct TabGuard(Arc<Tab>);

impl std::ops::Deref for TabGuard {
    type Target = Tab;

    fn deref(&self) -> &Tab {
        &self.0
    }
}

impl Drop for TabGuard {
    fn drop(&mut self) {
        if let Err(err) = self.0.close(false) {
            warn!(error = %err, "failed to close browser tab");
        }
    }
}

/// Replays pages saved on disk: `listing.html` plus `details/<sanitized-url>.html`.
#[derive(Debug, Clone)]
pub struct SnapshotNavigator {
    root: PathBuf,
    listing_url: String,
}

impl SnapshotNavigator {
    pub fn new(root: &Path, listing_url: &str) -> Self {
        Self {
            root: root.to_path_buf(),
            listing_url: listing_url.to_string(),
        }
    }

    pub fn listing_path(&self) -> PathBuf {
        self.root.join("listing.html")
    }

    pub fn detail_path(&self, url: &str) -> PathBuf {
        self.root.join("details").join(snapshot_file_name(url))
    }
}

impl Navigator for SnapshotNavigator {
    fn load_listing(&mut self) -> Result<RenderedPage, NavigationError> {
        let path = self.listing_path();
        let html = std::fs::read_to_string(&path).map_err(|source| NavigationError::Snapshot {
            path: path.display().to_string(),
            source,
        })?;
        info!(snapshot = %path.display(), bytes = html.len(), "loaded listing snapshot");
        Ok(RenderedPage {
            url: self.listing_url.clone(),
            html,
        })
    }

    fn load_detail(&mut self, url: &str) -> Result<RenderedPage, DetailFetchError> {
        let path = self.detail_path(url);
        if !path.exists() {
            return Err(DetailFetchError::NotFound {
                url: url.to_string(),
                path: path.display().to_string(),
            });
        }
        let html = std::fs::read_to_string(&path).map_err(|source| DetailFetchError::Snapshot {
            path: path.display().to_string(),
            source,
        })?;
        Ok(RenderedPage {
            url: url.to_string(),
            html,
        })
    }
}

/// File name a detail URL is saved under in a snapshot directory.
pub fn snapshot_file_name(url: &str) -> String {
    format!("{}.html", sanitize_for_path(url))
}
