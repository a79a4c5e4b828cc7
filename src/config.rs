use anyhow::{Context, Result};
use serde::Deserialize;
use std::{fs, path::Path, time::Duration};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AggregatorCfg {
    pub base_url: String,
    pub chain_id: u64,
    pub action: String,
    pub status: String,
    pub items: u32,
}

impl Default for AggregatorCfg {
    fn default() -> Self {
        Self {
            base_url: "https://api.merkl.xyz/v4".to_string(),
            chain_id: 324, // zkSync Era
            action: "POOL".to_string(),
            status: "LIVE".to_string(),
            items: 100,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpCfg {
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpCfg {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: concat!("yield-scout/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl HttpCfg {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Shared reqwest client for every HTTP source
    pub fn build_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.timeout())
            .user_agent(self.user_agent.clone())
            .build()
            .context("build HTTP client")
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PancakeSwapCfg {
    pub subgraph_url: String,
}

impl Default for PancakeSwapCfg {
    fn default() -> Self {
        Self {
            subgraph_url: "https://api.studio.thegraph.com/query/45376/exchange-v3-zksync/version/latest"
                .to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KoiCfg {
    /// Gateway URL, `{api_key}` is substituted
    pub subgraph_url: String,
    pub api_key: Option<String>,
}

impl Default for KoiCfg {
    fn default() -> Self {
        Self {
            subgraph_url:
                "https://gateway.thegraph.com/api/{api_key}/subgraphs/id/3gLgwpvmNybVfKeVLKcFLnpLvbtiwTQ4rLceVP7gWcjT"
                    .to_string(),
            api_key: None,
        }
    }
}

impl KoiCfg {
    /// Resolved endpoint, `None` when the template needs a key and none is set
    pub fn endpoint(&self) -> Option<String> {
        if !self.subgraph_url.contains("{api_key}") {
            return Some(self.subgraph_url.clone());
        }
        match self.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Some(self.subgraph_url.replace("{api_key}", key)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MaverickCfg {
    pub tickers_url: String,
    pub chain_id: u64,
    /// Pool fee tier in percent (0.02 = 0.02%)
    pub fee_tier_percent: f64,
}

impl Default for MaverickCfg {
    fn default() -> Self {
        Self {
            tickers_url: "https://app.mav.xyz/api/v2/api/latest/tickers".to_string(),
            chain_id: 324,
            fee_tier_percent: 0.02,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncSwapCfg {
    /// Pool page URL, `{address}` is substituted
    pub pool_url_template: String,
    pub navigation_timeout_secs: u64,
    pub selector_timeout_secs: u64,
    pub settle_delay_ms: u64,
    pub content_selector: String,
    pub label_text: String,
    pub container_selector: String,
    pub value_selector: String,
    pub headless: bool,
    pub chrome_executable: Option<String>,
    pub window_width: u32,
    pub window_height: u32,
}

impl Default for SyncSwapCfg {
    fn default() -> Self {
        Self {
            pool_url_template: "https://syncswap.xyz/pool/{address}".to_string(),
            navigation_timeout_secs: 60,
            selector_timeout_secs: 30,
            settle_delay_ms: 5000,
            content_selector: ".MuiTypography-root".to_string(),
            label_text: "Fee APR (24h)".to_string(),
            container_selector: ".col".to_string(),
            value_selector: ".fade-text".to_string(),
            headless: true,
            chrome_executable: None,
            window_width: 1280,
            window_height: 800,
        }
    }
}

impl SyncSwapCfg {
    pub fn pool_url(&self, address: &str) -> String {
        self.pool_url_template.replace("{address}", address)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    pub fn selector_timeout(&self) -> Duration {
        Duration::from_secs(self.selector_timeout_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub aggregator: AggregatorCfg,
    pub http: HttpCfg,
    pub pancakeswap: PancakeSwapCfg,
    pub koi: KoiCfg,
    pub maverick: MaverickCfg,
    pub syncswap: SyncSwapCfg,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let s = fs::read_to_string(path.as_ref())
            .with_context(|| format!("read {}", path.as_ref().display()))?;
        Self::from_toml(&s)
    }

    pub fn from_toml(s: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(s).context("parse Config.toml")?;
        Ok(cfg)
    }
}
