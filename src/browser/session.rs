use anyhow::{Context, Result};
use std::time::{Duration, Instant};
use thirtyfour::prelude::*;
use tracing::{debug, error};

use crate::browser::fingerprint::Fingerprint;
use crate::cli::config::BrowserSettings;

/// A headless-browser session scoped to exactly one page load.
///
/// The session is owned by the request that launched it and is torn down
/// on every exit path: `close()` on the happy path, the `Drop` guard when
/// the future is cancelled or an error unwinds past the caller.
pub struct BrowserSession {
    config: BrowserSettings,
    driver: Option<WebDriver>,
}

impl BrowserSession {
    /// Launch a new browser session with the given identity
    pub async fn launch(
        config: BrowserSettings,
        fingerprint: &Fingerprint,
        proxy: Option<&str>,
    ) -> Result<Self> {
        let mut caps = DesiredCapabilities::chrome();

        caps.add_chrome_arg(&format!("--user-agent={}", fingerprint.user_agent))?;
        caps.add_chrome_arg(&format!(
            "--lang={}",
            fingerprint.accept_language.split(',').next().unwrap_or("en-US")
        ))?;
        caps.add_chrome_arg(&format!(
            "--window-size={},{}",
            fingerprint.viewport.width, fingerprint.viewport.height
        ))?;

        if config.headless {
            caps.set_headless()?;
        }

        if let Some(proxy) = proxy {
            caps.add_chrome_arg(&format!("--proxy-server={}", proxy))?;
        }

        // Keep the automation banner and flags out of the rendered page
        caps.add_chrome_arg("--disable-blink-features=AutomationControlled")?;
        caps.add_chrome_arg("--disable-dev-shm-usage")?;
        caps.add_chrome_option("excludeSwitches", serde_json::json!(["enable-automation"]))?;
        caps.add_chrome_option("useAutomationExtension", serde_json::json!(false))?;

        let driver = WebDriver::new(&config.webdriver_url, caps)
            .await
            .context("Failed to connect to WebDriver")?;

        driver
            .set_page_load_timeout(Duration::from_secs(config.navigation_timeout_secs))
            .await?;

        debug!("Browser session launched with fingerprint: {}", fingerprint.name);

        Ok(Self { config, driver: Some(driver) })
    }

    /// Navigate to a URL, wait for the document to settle, and return the
    /// serialized page source.
    ///
    /// Readiness is polled from the live DOM: the document must report
    /// `readyState == "complete"` continuously for the configured settle
    /// window. The whole wait is bounded by the navigation timeout, so a
    /// page that never settles still yields whatever has rendered by then.
    pub async fn render(&self, url: &str) -> Result<String> {
        let driver = self.driver.as_ref().context("Browser session already closed")?;

        debug!("Navigating to: {}", url);
        driver
            .goto(url)
            .await
            .context(format!("Failed to navigate to URL: {}", url))?;

        self.wait_for_quiescence(driver).await;

        let source = driver.source().await.context("Failed to get page source")?;

        Ok(source)
    }

    async fn wait_for_quiescence(&self, driver: &WebDriver) {
        let deadline = Instant::now() + Duration::from_secs(self.config.navigation_timeout_secs);
        let settle = Duration::from_millis(self.config.settle_millis);
        let mut complete_since: Option<Instant> = None;

        while Instant::now() < deadline {
            let ready = match driver.execute("return document.readyState;", vec![]).await {
                Ok(ret) => ret
                    .convert::<String>()
                    .map(|state| state == "complete")
                    .unwrap_or(false),
                Err(e) => {
                    debug!("readyState poll failed: {}", e);
                    false
                }
            };

            if ready {
                let since = *complete_since.get_or_insert_with(Instant::now);
                if since.elapsed() >= settle {
                    return;
                }
            } else {
                complete_since = None;
            }

            tokio::time::sleep(Duration::from_millis(250)).await;
        }

        debug!("Navigation timeout reached before the page settled");
    }

    /// Close the browser session
    pub async fn close(&mut self) -> Result<()> {
        if let Some(driver) = self.driver.take() {
            if let Err(e) = driver.quit().await {
                error!("Error closing browser session: {}", e);
            }
            debug!("Browser session closed");
        }

        Ok(())
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        if let Some(driver) = self.driver.take() {
            // Quit must not be skipped even when the request is abandoned
            tokio::spawn(async move {
                if let Err(e) = driver.quit().await {
                    error!("Error closing browser session during drop: {}", e);
                }
            });
        }
    }
}
