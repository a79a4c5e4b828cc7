use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::{AprProvider, IdentifierIndex};
use crate::math::daily_volume_apr;
use crate::opportunity::types::AprResult;
use crate::shared::{null_as_default, AprError};

/// One entry of the `/latest/tickers` feed.
///
/// Numbers are optional: the feed reports `null` for pools without recent
/// trades or liquidity, and such pools are skipped rather than failing the batch.
#[derive(Debug, Clone, Deserialize)]
pub struct PoolTicker {
    #[serde(default, deserialize_with = "null_as_default")]
    pub ticker_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub base_currency: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub target_currency: String,
    #[serde(default)]
    pub last_price: Option<f64>,
    #[serde(default)]
    pub base_volume: Option<f64>,
    #[serde(default)]
    pub target_volume: Option<f64>,
    pub pool_id: String,
    #[serde(default)]
    pub liquidity_in_usd: Option<f64>,
}

impl PoolTicker {
    /// Fee APR, or `None` when the ticker fails the invalid-data guard
    /// (missing numbers, no liquidity, no price, negative volume)
    pub fn fee_apr(&self, fee_tier_percent: f64) -> Option<f64> {
        match (self.target_volume, self.last_price, self.liquidity_in_usd) {
            (Some(volume), Some(price), Some(liquidity))
                if liquidity > 0.0 && price > 0.0 && volume >= 0.0 =>
            {
                Some(daily_volume_apr(volume, price, fee_tier_percent, liquidity))
            }
            _ => None,
        }
    }
}

/// Base APR from a REST ticker feed (24h volume and liquidity per pool)
pub struct TickerAprProvider {
    http_client: Client,
    tickers_url: String,
    chain_id: u64,
    fee_tier_percent: f64,
}

impl TickerAprProvider {
    pub fn new(
        http_client: Client,
        tickers_url: impl Into<String>,
        chain_id: u64,
        fee_tier_percent: f64,
    ) -> Self {
        Self {
            http_client,
            tickers_url: tickers_url.into(),
            chain_id,
            fee_tier_percent,
        }
    }

    async fn fetch_tickers(&self) -> Result<Vec<PoolTicker>, AprError> {
        debug!("Fetching tickers from {}", self.tickers_url);

        let response = self
            .http_client
            .get(&self.tickers_url)
            .query(&[("chainId", self.chain_id)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AprError::Status(response.status()));
        }

        let entries = response
            .json::<Vec<serde_json::Value>>()
            .await
            .map_err(|e| AprError::Schema(format!("expected ticker array: {e}")))?;

        // One malformed entry only costs that pool
        Ok(entries
            .into_iter()
            .filter_map(|entry| match serde_json::from_value::<PoolTicker>(entry) {
                Ok(ticker) => Some(ticker),
                Err(e) => {
                    debug!("Skipping malformed ticker: {}", e);
                    None
                }
            })
            .collect())
    }
}

#[async_trait]
impl AprProvider for TickerAprProvider {
    fn name(&self) -> &str {
        "maverick"
    }

    async fn compute_base_apr(&self, identifiers: &[String]) -> Result<AprResult, AprError> {
        let index = IdentifierIndex::new(identifiers);
        let mut result = AprResult::new();
        if index.is_empty() {
            return Ok(result);
        }

        let tickers = match self.fetch_tickers().await {
            Ok(tickers) => tickers,
            Err(e) => {
                warn!("⚠️ Maverick APR unavailable: {}", e);
                return Ok(result);
            }
        };

        for ticker in tickers.iter().filter(|t| !index.originals(&t.pool_id).is_empty()) {
            match ticker.fee_apr(self.fee_tier_percent) {
                Some(apr) => {
                    index.assign(&mut result, &ticker.pool_id, apr);
                }
                None => debug!("Skipping ticker {} ({}): invalid data", ticker.ticker_id, ticker.pool_id),
            }
        }

        info!(
            "✅ maverick: computed base APR for {}/{} pools",
            result.len(),
            identifiers.len()
        );
        Ok(result)
    }
}
