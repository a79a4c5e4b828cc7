//! Fee APR scraped from rendered pool pages (no public API for these pools)

pub mod chromium;

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use super::AprProvider;
use crate::config::SyncSwapCfg;
use crate::math::parse_percent;
use crate::opportunity::types::AprResult;
use crate::shared::{AprError, ScrapeError};

pub use chromium::ChromiumLauncher;

/// APR recorded for an address whose scrape failed
pub const SCRAPE_FAILED_APR: f64 = -1.0;

/// Run one browser step under `limit`; an elapsed limit is reported as `Timeout`
pub(crate) async fn bounded<T, F>(step: &'static str, limit: Duration, step_future: F) -> Result<T, ScrapeError>
where
    F: Future<Output = Result<T, ScrapeError>>,
{
    match tokio::time::timeout(limit, step_future).await {
        Ok(result) => result,
        Err(_) => Err(ScrapeError::Timeout { step, secs: limit.as_secs() }),
    }
}

/// Where the value sits on the page: the element whose text equals `label`
/// among `content_selector` matches, then `value_selector` inside its
/// closest `container_selector` ancestor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelProbe {
    pub content_selector: String,
    pub label: String,
    pub container_selector: String,
    pub value_selector: String,
}

impl From<&SyncSwapCfg> for LabelProbe {
    fn from(cfg: &SyncSwapCfg) -> Self {
        Self {
            content_selector: cfg.content_selector.clone(),
            label: cfg.label_text.clone(),
            container_selector: cfg.container_selector.clone(),
            value_selector: cfg.value_selector.clone(),
        }
    }
}

/// Starts a browser with one page ready for navigation
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn PageSession>, AprError>;
}

/// A single browser page, reused serially across addresses
#[async_trait]
pub trait PageSession: Send {
    async fn goto(&mut self, url: &str, timeout: Duration) -> Result<(), ScrapeError>;

    async fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> Result<(), ScrapeError>;

    /// Raw text of the value node located by `probe`
    async fn probe_text(&mut self, probe: &LabelProbe) -> Result<String, ScrapeError>;

    /// Shuts the whole browser down
    async fn close(self: Box<Self>) -> Result<(), ScrapeError>;
}

/// Scrapes the displayed "Fee APR (24h)" figure for each pool address
pub struct ScrapeAprProvider {
    launcher: Arc<dyn BrowserLauncher>,
    cfg: SyncSwapCfg,
    probe: LabelProbe,
}

impl ScrapeAprProvider {
    pub fn new(launcher: Arc<dyn BrowserLauncher>, cfg: SyncSwapCfg) -> Self {
        let probe = LabelProbe::from(&cfg);
        Self { launcher, cfg, probe }
    }

    async fn scrape_one(&self, page: &mut dyn PageSession, address: &str) -> Result<f64, ScrapeError> {
        page.goto(&self.cfg.pool_url(address), self.cfg.navigation_timeout()).await?;
        page.wait_for_selector(&self.probe.content_selector, self.cfg.selector_timeout())
            .await?;

        // Client-side rendering keeps filling values in after the selector shows up
        tokio::time::sleep(self.cfg.settle_delay()).await;

        let text = bounded(
            "reading the APR value",
            self.cfg.selector_timeout(),
            page.probe_text(&self.probe),
        )
        .await?;
        parse_percent(&text).ok_or(ScrapeError::Parse(text))
    }

    async fn scrape_all(&self, page: &mut dyn PageSession, addresses: &[String]) -> AprResult {
        let mut results = AprResult::new();
        for address in addresses {
            let apr = match self.scrape_one(page, address).await {
                Ok(apr) => {
                    info!("✅ Scraped Fee APR for {}: {}%", address, apr);
                    apr
                }
                Err(e) => {
                    warn!("⚠️ Error scraping APR for {}: {}", address, e);
                    SCRAPE_FAILED_APR
                }
            };
            results.insert(address.clone(), apr);
        }
        results
    }
}

#[async_trait]
impl AprProvider for ScrapeAprProvider {
    fn name(&self) -> &str {
        "syncswap"
    }

    async fn compute_base_apr(&self, identifiers: &[String]) -> Result<AprResult, AprError> {
        if identifiers.is_empty() {
            return Ok(AprResult::new());
        }

        let mut session = self.launcher.launch().await.map_err(|e| {
            error!("❌ Could not start browser for syncswap: {}", e);
            e
        })?;

        info!("🌐 Scraping {} syncswap pools", identifiers.len());
        let results = self.scrape_all(session.as_mut(), identifiers).await;

        if let Err(e) = bounded("closing the browser", self.cfg.selector_timeout(), session.close()).await {
            warn!("⚠️ Browser did not close cleanly: {}", e);
        }
        Ok(results)
    }
}


#[cfg(test)]
mod tests {
    use super::fakes::FakeLauncher;
    use super::*;
    use std::sync::atomic::Ordering;

    fn cfg() -> SyncSwapCfg {
        SyncSwapCfg {
            pool_url_template: "https://pages.test/pool/{address}".to_string(),
            settle_delay_ms: 0,
            ..SyncSwapCfg::default()
        }
    }

    fn url(address: &str) -> String {
        format!("https://pages.test/pool/{address}")
    }

    #[tokio::test]
    async fn test_one_failed_address_gets_sentinel() {
        let mut launcher = FakeLauncher::default();
        launcher.pages.insert(url("0xA"), Ok("12.5%".to_string()));
        launcher.pages.insert(url("0xB"), Err("timeout".to_string()));
        launcher.pages.insert(url("0xC"), Ok("0.00%".to_string()));
        let launcher = Arc::new(launcher);

        let provider = ScrapeAprProvider::new(launcher.clone(), cfg());
        let ids = vec!["0xA".to_string(), "0xB".to_string(), "0xC".to_string()];
        let result = provider.compute_base_apr(&ids).await.unwrap();

        assert_eq!(result.len(), 3);
        assert_eq!(result["0xA"], 12.5);
        assert_eq!(result["0xB"], SCRAPE_FAILED_APR);
        assert_eq!(result["0xC"], 0.0);
        assert!(launcher.closed.load(Ordering::SeqCst));
        assert_eq!(launcher.launches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_addresses_visited_in_order() {
        let mut launcher = FakeLauncher::default();
        for a in ["0x3", "0x1", "0x2"] {
            launcher.pages.insert(url(a), Ok("1%".to_string()));
        }
        let launcher = Arc::new(launcher);

        let provider = ScrapeAprProvider::new(launcher.clone(), cfg());
        let ids = vec!["0x3".to_string(), "0x1".to_string(), "0x2".to_string()];
        provider.compute_base_apr(&ids).await.unwrap();

        let visited = launcher.visited.lock().unwrap().clone();
        assert_eq!(visited, vec![url("0x3"), url("0x1"), url("0x2")]);
    }

    #[tokio::test]
    async fn test_unparseable_value_gets_sentinel() {
        let mut launcher = FakeLauncher::default();
        launcher.pages.insert(url("0xA"), Ok("--".to_string()));
        let launcher = Arc::new(launcher);

        let provider = ScrapeAprProvider::new(launcher.clone(), cfg());
        let result = provider.compute_base_apr(&["0xA".to_string()]).await.unwrap();
        assert_eq!(result["0xA"], SCRAPE_FAILED_APR);
        assert!(launcher.closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_launch_failure_propagates() {
        let launcher = Arc::new(FakeLauncher { fail_launch: true, ..FakeLauncher::default() });
        let provider = ScrapeAprProvider::new(launcher.clone(), cfg());

        let err = provider.compute_base_apr(&["0xA".to_string()]).await.unwrap_err();
        assert!(matches!(err, AprError::BrowserLaunch(_)));
    }

    #[tokio::test]
    async fn test_empty_batch_skips_browser() {
        let launcher = Arc::new(FakeLauncher::default());
        let provider = ScrapeAprProvider::new(launcher.clone(), cfg());

        let result = provider.compute_base_apr(&[]).await.unwrap();
        assert!(result.is_empty());
        assert_eq!(launcher.launches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_stalled_page_read_times_out_to_sentinel() {
        let mut launcher = FakeLauncher::default();
        launcher.pages.insert(url("0xA"), Ok("hang".to_string()));
        launcher.pages.insert(url("0xB"), Ok("3.5%".to_string()));
        let launcher = Arc::new(launcher);

        let provider = ScrapeAprProvider::new(
            launcher.clone(),
            SyncSwapCfg { selector_timeout_secs: 1, ..cfg() },
        );
        let ids = vec!["0xA".to_string(), "0xB".to_string()];
        let result = provider.compute_base_apr(&ids).await.unwrap();

        assert_eq!(result["0xA"], SCRAPE_FAILED_APR);
        assert_eq!(result["0xB"], 3.5);
        assert!(launcher.closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_stalled_close_does_not_block_results() {
        let mut launcher = FakeLauncher { hang_on_close: true, ..FakeLauncher::default() };
        launcher.pages.insert(url("0xA"), Ok("2%".to_string()));
        let launcher = Arc::new(launcher);

        let provider = ScrapeAprProvider::new(
            launcher.clone(),
            SyncSwapCfg { selector_timeout_secs: 1, ..cfg() },
        );
        let result = provider.compute_base_apr(&["0xA".to_string()]).await.unwrap();
        assert_eq!(result["0xA"], 2.0);
    }

    #[tokio::test]
    async fn test_bounded_step_times_out() {
        let err = bounded(
            "waiting for selector",
            Duration::from_millis(20),
            std::future::pending::<Result<(), ScrapeError>>(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ScrapeError::Timeout { step: "waiting for selector", secs: 0 }));

        let ok = bounded("navigating", Duration::from_secs(1), async { Ok::<_, ScrapeError>(7) }).await;
        assert_eq!(ok.unwrap(), 7);
    }

    #[test]
    fn test_probe_from_config() {
        let probe = LabelProbe::from(&SyncSwapCfg::default());
        assert_eq!(probe.label, "Fee APR (24h)");
        assert_eq!(probe.container_selector, ".col");
        assert_eq!(probe.value_selector, ".fade-text");
    }
}
