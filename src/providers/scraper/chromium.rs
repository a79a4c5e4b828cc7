use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use serde::Deserialize;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info};

use super::{bounded, BrowserLauncher, LabelProbe, PageSession};
use crate::config::SyncSwapCfg;
use crate::shared::{AprError, ScrapeError};

const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(250);
const CLOSE_TIMEOUT: Duration = Duration::from_secs(10);

/// Launches a headless Chromium with a single blank page
pub struct ChromiumLauncher {
    cfg: SyncSwapCfg,
}

impl ChromiumLauncher {
    pub fn new(cfg: SyncSwapCfg) -> Self {
        Self { cfg }
    }

    fn browser_config(&self) -> Result<BrowserConfig, AprError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .arg("--disable-setuid-sandbox")
            .window_size(self.cfg.window_width, self.cfg.window_height)
            .request_timeout(self.cfg.navigation_timeout());

        if !self.cfg.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &self.cfg.chrome_executable {
            builder = builder.chrome_executable(path);
        }

        builder.build().map_err(AprError::BrowserLaunch)
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self) -> Result<Box<dyn PageSession>, AprError> {
        let (mut browser, mut handler) = Browser::launch(self.browser_config()?)
            .await
            .map_err(|e| AprError::BrowserLaunch(e.to_string()))?;

        // The CDP handler has to be polled for the browser to make progress
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser handler stopped: {}", e);
                    break;
                }
            }
        });

        let opened = bounded("opening a page", self.cfg.navigation_timeout(), async {
            browser
                .new_page("about:blank")
                .await
                .map_err(|e| ScrapeError::Navigation(e.to_string()))
        })
        .await;

        let page = match opened {
            Ok(page) => page,
            Err(e) => {
                let _ = shutdown(&mut browser).await;
                handler_task.abort();
                return Err(AprError::BrowserLaunch(format!("open page: {e}")));
            }
        };

        info!("🌐 Browser session started");
        Ok(Box::new(ChromiumSession {
            browser,
            page,
            handler_task,
            step_timeout: self.cfg.selector_timeout(),
        }))
    }
}

/// Close and reap the browser process without waiting past `CLOSE_TIMEOUT`
async fn shutdown(browser: &mut Browser) -> Result<(), ScrapeError> {
    bounded("closing the browser", CLOSE_TIMEOUT, async {
        let closed = browser.close().await;
        let _ = browser.wait().await;
        closed.map(|_| ()).map_err(|e| ScrapeError::Shutdown(e.to_string()))
    })
    .await
}

struct ChromiumSession {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
    /// Upper bound for CDP calls that take no explicit timeout
    step_timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct ProbeOutcome {
    text: Option<String>,
    error: Option<String>,
}

fn probe_script(probe: &LabelProbe) -> Result<String, ScrapeError> {
    let quote = |s: &str| serde_json::to_string(s).map_err(|e| ScrapeError::Probe(e.to_string()));
    Ok(format!(
        r#"(() => {{
  const label = Array.from(document.querySelectorAll({content}))
    .find((el) => el.textContent && el.textContent.trim() === {label});
  if (!label) return {{ error: "label not found" }};
  const container = label.closest({container});
  if (!container) return {{ error: "container not found" }};
  const value = container.querySelector({value});
  if (!value) return {{ error: "value element not found" }};
  if (!value.textContent) return {{ error: "no text content" }};
  return {{ text: value.textContent }};
}})()"#,
        content = quote(&probe.content_selector)?,
        label = quote(&probe.label)?,
        container = quote(&probe.container_selector)?,
        value = quote(&probe.value_selector)?,
    ))
}

#[async_trait]
impl PageSession for ChromiumSession {
    async fn goto(&mut self, url: &str, timeout: Duration) -> Result<(), ScrapeError> {
        debug!("Navigating to {}", url);
        let page = &self.page;
        bounded("navigating", timeout, async move {
            page.goto(url)
                .await
                .map(|_| ())
                .map_err(|e| ScrapeError::Navigation(e.to_string()))
        })
        .await
    }

    async fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> Result<(), ScrapeError> {
        // The deadline covers the lookups too; a CDP call can stall on its own
        let page = &self.page;
        bounded("waiting for selector", timeout, async move {
            loop {
                if page.find_element(selector).await.is_ok() {
                    return Ok(());
                }
                sleep(SELECTOR_POLL_INTERVAL).await;
            }
        })
        .await
    }

    async fn probe_text(&mut self, probe: &LabelProbe) -> Result<String, ScrapeError> {
        let script = probe_script(probe)?;
        let page = &self.page;
        let outcome: ProbeOutcome = bounded("evaluating the page probe", self.step_timeout, async move {
            page.evaluate(script)
                .await
                .map_err(|e| ScrapeError::Probe(e.to_string()))?
                .into_value::<ProbeOutcome>()
                .map_err(|e| ScrapeError::Probe(e.to_string()))
        })
        .await?;

        match (outcome.text, outcome.error) {
            (Some(text), _) => Ok(text),
            (None, Some(error)) => Err(ScrapeError::SelectorNotFound(error)),
            (None, None) => Err(ScrapeError::Probe("empty probe result".to_string())),
        }
    }

    async fn close(self: Box<Self>) -> Result<(), ScrapeError> {
        let ChromiumSession { mut browser, page, handler_task, .. } = *self;
        drop(page);

        let closed = shutdown(&mut browser).await;
        handler_task.abort();
        info!("🌐 Browser session closed");
        closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_script_escapes_strings() {
        let probe = LabelProbe {
            content_selector: ".MuiTypography-root".to_string(),
            label: "Fee \"APR\" (24h)".to_string(),
            container_selector: ".col".to_string(),
            value_selector: ".fade-text".to_string(),
        };
        let script = probe_script(&probe).unwrap();
        assert!(script.contains(r#"document.querySelectorAll(".MuiTypography-root")"#));
        assert!(script.contains(r#"=== "Fee \"APR\" (24h)""#));
        assert!(script.contains(r#"label.closest(".col")"#));
        assert!(script.contains(r#"container.querySelector(".fade-text")"#));
    }

    #[test]
    fn test_browser_config_builds() {
        let launcher = ChromiumLauncher::new(SyncSwapCfg {
            chrome_executable: Some("/usr/bin/chromium".to_string()),
            ..SyncSwapCfg::default()
        });
        assert!(launcher.browser_config().is_ok());
    }
}
