// spider_chrome re-exports chromiumoxide API
use super::locator::Locator;
use super::page::{ElementState, LocatorSnapshot, PageActions, PageState};
use crate::config::SuiteConfig;
use crate::error::{BrowserError, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use chromiumoxide_fetcher::{BrowserFetcher, BrowserFetcherOptions};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);
const SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Placeholder replaced by `Locator::to_js()` in the scripts below
const ELEMENTS: &str = "__ELEMENTS__";
/// Placeholder replaced by a JSON string literal
const VALUE: &str = "__VALUE__";

const ELEMENT_STATE_JS: &str = r#"
(() => {
    const els = __ELEMENTS__;
    if (!els.length) return { present: false, visible: false, enabled: false };
    const el = els[0];
    const rect = el.getBoundingClientRect();
    const style = window.getComputedStyle(el);
    return {
        present: true,
        visible: rect.width > 0 && rect.height > 0
            && style.visibility !== 'hidden' && style.display !== 'none',
        enabled: !el.disabled && el.getAttribute('aria-disabled') !== 'true',
    };
})()
"#;

const TEXTS_JS: &str = r#"
__ELEMENTS__.map(el => (el.innerText || el.textContent || '').trim())
"#;

const VALUE_JS: &str = r#"
(() => {
    const els = __ELEMENTS__;
    return els.length && 'value' in els[0] ? String(els[0].value) : null;
})()
"#;

const ATTRIBUTE_JS: &str = r#"
(() => {
    const els = __ELEMENTS__;
    return els.length ? els[0].getAttribute(__VALUE__) : null;
})()
"#;

const OUTER_HTML_JS: &str = r#"
(() => {
    const els = __ELEMENTS__;
    return els.length ? els[0].outerHTML : null;
})()
"#;

const CLICK_JS: &str = r#"
(() => {
    const els = __ELEMENTS__;
    if (!els.length) return false;
    els[0].scrollIntoView({ block: 'center' });
    els[0].click();
    return true;
})()
"#;

// Native setter + input/change events so framework-bound inputs see the edit
const FILL_JS: &str = r#"
(() => {
    const els = __ELEMENTS__;
    if (!els.length) return false;
    const el = els[0];
    el.focus();
    const proto = el instanceof HTMLTextAreaElement
        ? HTMLTextAreaElement.prototype
        : HTMLInputElement.prototype;
    Object.getOwnPropertyDescriptor(proto, 'value').set.call(el, __VALUE__);
    el.dispatchEvent(new Event('input', { bubbles: true }));
    el.dispatchEvent(new Event('change', { bubbles: true }));
    return true;
})()
"#;

const SELECT_JS: &str = r#"
(() => {
    const els = __ELEMENTS__;
    if (!els.length || !(els[0] instanceof HTMLSelectElement)) return false;
    els[0].value = __VALUE__;
    els[0].dispatchEvent(new Event('change', { bubbles: true }));
    return true;
})()
"#;

pub struct ChromeDriver {
    browser: Browser,
    temp_dir: Option<PathBuf>,
}

/// Connection mode for Chrome browser
pub enum ConnectionMode {
    /// Sandboxed mode - launches Chrome using system installation
    Sandboxed {
        chrome_path: Option<String>,
        no_sandbox: bool,
        headless: bool,
    },
    /// Advanced mode - connects to existing Chrome on debug port
    DebugPort(u16),
}

impl ConnectionMode {
    pub fn from_config(config: &SuiteConfig) -> Self {
        match config.debug_port {
            Some(port) => ConnectionMode::DebugPort(port),
            None => ConnectionMode::Sandboxed {
                chrome_path: config.chrome_path.clone(),
                no_sandbox: config.no_sandbox,
                headless: config.headless,
            },
        }
    }
}

impl ChromeDriver {
    /// Current page, excluding Chrome's internal pages
    async fn get_active_page(&self) -> Result<Page> {
        let pages = self.browser.pages().await?;

        for page in pages.iter() {
            if let Ok(Some(url)) = page.url().await {
                if !url.starts_with("chrome://") {
                    return Ok(page.clone());
                }
            }
        }

        if let Some(page) = pages.last() {
            return Ok(page.clone());
        }

        self.browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::Other(format!("Failed to create page: {}", e)))
    }

    /// Launch or connect according to the suite configuration
    pub async fn from_config(config: &SuiteConfig) -> Result<Self> {
        Self::new(ConnectionMode::from_config(config)).await
    }

    /// Connect to existing Chrome on debug port (advanced mode)
    pub async fn connect_debug_port(port: u16) -> Result<Self> {
        Self::new(ConnectionMode::DebugPort(port)).await
    }

    /// Create new ChromeDriver with specified connection mode
    pub async fn new(mode: ConnectionMode) -> Result<Self> {
        let (browser, temp_dir) = match mode {
            ConnectionMode::Sandboxed {
                chrome_path,
                no_sandbox,
                headless,
            } => {
                // One profile directory per session so parallel runs never share state
                let unique_id = chrono::Utc::now()
                    .timestamp_nanos_opt()
                    .unwrap_or_default();
                let temp_dir =
                    std::env::temp_dir().join(format!("ui-e2e-chrome-{}", unique_id));
                std::fs::create_dir_all(&temp_dir).map_err(|e| {
                    BrowserError::LaunchFailed(format!("Failed to create temp directory: {}", e))
                })?;

                let mut config = if headless {
                    BrowserConfig::builder()
                } else {
                    BrowserConfig::builder().with_head()
                };
                config = config.user_data_dir(&temp_dir);

                if no_sandbox {
                    config = config.arg("--no-sandbox");
                }

                if let Some(path) = chrome_path {
                    config = config.chrome_executable(path);
                } else {
                    match Self::ensure_chrome_installed().await {
                        Ok(path) => {
                            config = config.chrome_executable(path);
                        }
                        Err(e) => {
                            log::warn!("Auto-download failed ({}), trying system Chrome", e);
                        }
                    }
                }

                let config = config.build().map_err(|e| {
                    BrowserError::LaunchFailed(format!(
                        "{}. Set E2E_CHROME_PATH or pass --chrome-path; \
                         on Linux CI try E2E_NO_SANDBOX=1",
                        e
                    ))
                })?;

                let (browser, mut handler) = Browser::launch(config)
                    .await
                    .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

                tokio::spawn(async move {
                    while (handler.next().await).is_some() {
                        // Handle browser events
                    }
                });

                log::info!("Chrome launched (headless: {})", headless);
                (browser, Some(temp_dir))
            }
            ConnectionMode::DebugPort(port) => {
                let url = format!("http://localhost:{}", port);
                let (browser, mut handler) = Browser::connect(&url).await.map_err(|e| {
                    BrowserError::ConnectionFailed(format!(
                        "Failed to connect to Chrome on port {}. \
                         Make sure Chrome is running with --remote-debugging-port={}: {}",
                        port, port, e
                    ))
                })?;

                tokio::spawn(async move {
                    while (handler.next().await).is_some() {
                        // Handle browser events
                    }
                });

                log::info!("Connected to Chrome on port {}", port);
                (browser, None)
            }
        };

        Ok(Self { browser, temp_dir })
    }

    /// Navigate the active page and wait for the load to finish
    pub async fn navigate(&self, url: &str) -> Result<()> {
        use chromiumoxide::cdp::browser_protocol::page::NavigateParams;

        log::info!("🌐 Navigating to {}", url);
        let page = self.get_active_page().await?;

        let params = NavigateParams::builder()
            .url(url)
            .build()
            .map_err(|e| BrowserError::NavigationFailed(format!("Invalid URL {}: {}", url, e)))?;

        let response = page.execute(params).await.map_err(|e| {
            if e.to_string().contains("oneshot canceled") {
                BrowserError::NavigationFailed(
                    "Browser connection lost. The browser may have been closed or crashed."
                        .to_string(),
                )
            } else {
                BrowserError::NavigationFailed(format!("Failed to navigate to {}: {}", url, e))
            }
        })?;

        if let Some(error_text) = response.result.error_text.clone() {
            return Err(BrowserError::NavigationFailed(format!(
                "Navigation to {} failed: {}",
                url, error_text
            )));
        }

        self.wait_for_load(&page, url).await
    }

    /// Reload the active page and wait for the load to finish
    pub async fn reload(&self) -> Result<()> {
        use chromiumoxide::cdp::browser_protocol::page::ReloadParams;

        let page = self.get_active_page().await?;
        let url = page.url().await?.unwrap_or_default();
        log::info!("🔄 Reloading {}", url);

        page.execute(ReloadParams::default())
            .await
            .map_err(|e| BrowserError::NavigationFailed(format!("Reload failed: {}", e)))?;

        self.wait_for_load(&page, &url).await
    }

    async fn wait_for_load(&self, page: &Page, url: &str) -> Result<()> {
        match tokio::time::timeout(NAVIGATION_TIMEOUT, page.wait_for_navigation()).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                log::warn!("Could not wait for navigation of {}: {}", url, e);
            }
            Err(_) => {
                return Err(BrowserError::NavigationFailed(format!(
                    "Page load of {} did not finish within {}s",
                    url,
                    NAVIGATION_TIMEOUT.as_secs()
                )));
            }
        }

        // Let client-side rendering settle
        tokio::time::sleep(SETTLE_DELAY).await;
        log::debug!("✓ Loaded {}", url);
        Ok(())
    }

    pub async fn current_url(&self) -> Result<String> {
        let page = self.get_active_page().await?;
        page.url()
            .await
            .map_err(|e| BrowserError::Other(e.to_string()))?
            .ok_or(BrowserError::NoPage)
    }

    pub async fn title(&self) -> Result<String> {
        let page = self.get_active_page().await?;
        page.get_title()
            .await
            .map_err(|e| BrowserError::Other(e.to_string()))?
            .ok_or(BrowserError::NoPage)
    }

    pub async fn get_page_source(&self) -> Result<String> {
        let page = self.get_active_page().await?;
        page.content()
            .await
            .map_err(|e| BrowserError::Other(e.to_string()))
    }

    pub async fn screenshot(&self) -> Result<Vec<u8>> {
        let page = self.get_active_page().await?;
        page.screenshot(chromiumoxide::page::ScreenshotParams::default())
            .await
            .map_err(|e| BrowserError::Other(format!("Failed to take screenshot: {}", e)))
    }

    pub async fn screenshot_to_file(&self, path: &Path) -> Result<()> {
        let data = self.screenshot().await?;
        tokio::fs::write(path, data).await?;
        Ok(())
    }

    /// Execute arbitrary JavaScript in the page context
    pub async fn execute_script(&self, script: &str) -> Result<serde_json::Value> {
        let page = self.get_active_page().await?;

        let result = page
            .evaluate(script)
            .await
            .map_err(|e| BrowserError::ScriptFailed(e.to_string()))?;

        Ok(result.into_value().unwrap_or(serde_json::Value::Null))
    }

    /// Execute JavaScript and deserialize the result
    pub async fn execute_script_typed<T: serde::de::DeserializeOwned>(
        &self,
        script: &str,
    ) -> Result<T> {
        let page = self.get_active_page().await?;

        let result = page
            .evaluate(script)
            .await
            .map_err(|e| BrowserError::ScriptFailed(e.to_string()))?;

        result
            .into_value()
            .map_err(|e| BrowserError::ScriptFailed(format!("Failed to deserialize result: {}", e)))
    }

    async fn run_on(&self, template: &str, locator: &Locator) -> Result<serde_json::Value> {
        self.execute_script(&template.replace(ELEMENTS, &locator.to_js()))
            .await
    }

    async fn run_with_value(
        &self,
        template: &str,
        locator: &Locator,
        value: &str,
    ) -> Result<serde_json::Value> {
        let literal = serde_json::Value::String(value.to_string()).to_string();
        let script = template
            .replace(ELEMENTS, &locator.to_js())
            .replace(VALUE, &literal);
        self.execute_script(&script).await
    }

    fn expect_found(result: serde_json::Value, locator: &Locator) -> Result<()> {
        if result.as_bool() == Some(true) {
            Ok(())
        } else {
            Err(BrowserError::ElementNotFound(locator.to_string()))
        }
    }

    fn optional_string(value: serde_json::Value) -> Option<String> {
        value.as_str().map(str::to_string)
    }

    /// True if the browser connection still answers within two seconds
    pub async fn is_alive(&self) -> bool {
        match self.browser.pages().await {
            Ok(pages) => match pages.first() {
                Some(page) => matches!(
                    tokio::time::timeout(Duration::from_secs(2), page.url()).await,
                    Ok(Ok(_))
                ),
                None => true,
            },
            Err(_) => false,
        }
    }

    pub async fn close(mut self) -> Result<()> {
        self.browser
            .close()
            .await
            .map_err(|e| BrowserError::Other(e.to_string()))?;
        Ok(())
    }

    /// Ensure Chrome is installed, downloading if necessary
    async fn ensure_chrome_installed() -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| BrowserError::Other("Cannot determine cache directory".to_string()))?
            .join("ui-e2e")
            .join("chrome");

        tokio::fs::create_dir_all(&cache_dir).await?;

        let marker = cache_dir.join(".downloaded");
        if marker.exists() {
            if let Some(executable) = Self::find_chrome_in_cache(&cache_dir) {
                return Ok(executable);
            }
        }

        log::info!("📥 Downloading Chrome for Testing (first run only)...");
        let fetcher = BrowserFetcher::new(
            BrowserFetcherOptions::builder()
                .with_path(&cache_dir)
                .build()
                .map_err(|e| BrowserError::Other(format!("Fetcher config failed: {}", e)))?,
        );

        let info = fetcher
            .fetch()
            .await
            .map_err(|e| BrowserError::Other(format!("Chrome download failed: {}", e)))?;

        tokio::fs::write(&marker, "downloaded").await?;
        log::info!("✅ Chrome downloaded to {}", info.executable_path.display());

        Ok(info.executable_path)
    }

    fn find_chrome_in_cache(cache_dir: &Path) -> Option<PathBuf> {
        [
            "chrome",
            "chrome.exe",
            "chrome-linux/chrome",
            "chrome-mac/Chromium.app/Contents/MacOS/Chromium",
            "chrome-win/chrome.exe",
        ]
        .iter()
        .map(|p| cache_dir.join(p))
        .find(|p| p.exists())
    }
}

#[async_trait]
impl PageState for ChromeDriver {
    async fn element_state(&self, locator: &Locator) -> Result<ElementState> {
        self.execute_script_typed(&ELEMENT_STATE_JS.replace(ELEMENTS, &locator.to_js()))
            .await
    }

    async fn count(&self, locator: &Locator) -> Result<usize> {
        self.execute_script_typed(&format!("{}.length", locator.to_js()))
            .await
    }

    async fn texts(&self, locator: &Locator) -> Result<Vec<String>> {
        self.execute_script_typed(&TEXTS_JS.replace(ELEMENTS, &locator.to_js()))
            .await
    }

    async fn value(&self, locator: &Locator) -> Result<Option<String>> {
        Ok(Self::optional_string(self.run_on(VALUE_JS, locator).await?))
    }

    async fn attribute(&self, locator: &Locator, name: &str) -> Result<Option<String>> {
        Ok(Self::optional_string(
            self.run_with_value(ATTRIBUTE_JS, locator, name).await?,
        ))
    }

    async fn outer_html(&self, locator: &Locator) -> Result<Option<String>> {
        Ok(Self::optional_string(
            self.run_on(OUTER_HTML_JS, locator).await?,
        ))
    }

    async fn snapshot(&self, locators: &[Locator]) -> Result<Vec<LocatorSnapshot>> {
        let lists: Vec<String> = locators.iter().map(Locator::to_js).collect();
        let script = format!(
            "[{}].map(els => ({{ count: els.length, \
             visible: els.length > 0 && els[0].getBoundingClientRect().height > 0 \
                 && window.getComputedStyle(els[0]).display !== 'none', \
             last_text: els.length ? (els[els.length - 1].innerText || '').trim() : null }}))",
            lists.join(", ")
        );
        self.execute_script_typed(&script).await
    }
}

#[async_trait]
impl PageActions for ChromeDriver {
    async fn click(&self, locator: &Locator) -> Result<()> {
        log::debug!("click {}", locator);
        Self::expect_found(self.run_on(CLICK_JS, locator).await?, locator)
    }

    async fn fill(&self, locator: &Locator, value: &str) -> Result<()> {
        log::debug!("fill {} ({} chars)", locator, value.len());
        Self::expect_found(self.run_with_value(FILL_JS, locator, value).await?, locator)
    }

    async fn select(&self, locator: &Locator, value: &str) -> Result<()> {
        log::debug!("select '{}' in {}", value, locator);
        Self::expect_found(
            self.run_with_value(SELECT_JS, locator, value).await?,
            locator,
        )
    }

    async fn navigate(&self, url: &str) -> Result<()> {
        ChromeDriver::navigate(self, url).await
    }

    async fn reload(&self) -> Result<()> {
        ChromeDriver::reload(self).await
    }
}

impl Drop for ChromeDriver {
    fn drop(&mut self) {
        if let Some(temp_dir) = &self.temp_dir {
            if temp_dir.exists() {
                let _ = std::fs::remove_dir_all(temp_dir);
            }
        }
    }
}
