// src/app.rs
use anyhow::{anyhow, Result};
use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::Config;
use crate::opportunity::enhancer::{enhance, without_base_apr};
use crate::opportunity::{FetchParams, OpportunityFetcher, ProtocolKey};
use crate::providers::scraper::ChromiumLauncher;
use crate::providers::{
    AprProvider, ScrapeAprProvider, SubgraphAprProvider, SubgraphVariant, TickerAprProvider,
};
use crate::report::{rank, RankedReport};

/// Output switches for the final render
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputOpts {
    pub json: bool,
    pub hyperlinks: bool,
}

/// Fetch -> concurrent per-protocol enhancement -> rank
pub struct Pipeline {
    fetcher: OpportunityFetcher,
    params: FetchParams,
    providers: BTreeMap<ProtocolKey, Arc<dyn AprProvider>>,
}

impl Pipeline {
    pub fn new(
        fetcher: OpportunityFetcher,
        params: FetchParams,
        providers: BTreeMap<ProtocolKey, Arc<dyn AprProvider>>,
    ) -> Self {
        Self { fetcher, params, providers }
    }

    /// Wire the production sources from configuration
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let http_client = cfg.http.build_client()?;

        let koi_endpoint = cfg.koi.endpoint();
        if koi_endpoint.is_none() {
            warn!("⚠️ Koi subgraph API key not set, koi base APR will be 0");
        }

        let mut providers: BTreeMap<ProtocolKey, Arc<dyn AprProvider>> = BTreeMap::new();
        providers.insert(
            ProtocolKey::Koi,
            Arc::new(SubgraphAprProvider::new(
                "koi",
                http_client.clone(),
                koi_endpoint,
                SubgraphVariant::Hourly,
            )),
        );
        providers.insert(
            ProtocolKey::PancakeSwap,
            Arc::new(SubgraphAprProvider::new(
                "pancakeswap",
                http_client.clone(),
                Some(cfg.pancakeswap.subgraph_url.clone()),
                SubgraphVariant::Daily,
            )),
        );
        providers.insert(
            ProtocolKey::SyncSwap,
            Arc::new(ScrapeAprProvider::new(
                Arc::new(ChromiumLauncher::new(cfg.syncswap.clone())),
                cfg.syncswap.clone(),
            )),
        );
        providers.insert(
            ProtocolKey::Maverick,
            Arc::new(TickerAprProvider::new(
                http_client.clone(),
                cfg.maverick.tickers_url.clone(),
                cfg.maverick.chain_id,
                cfg.maverick.fee_tier_percent,
            )),
        );

        let fetcher = OpportunityFetcher::new(http_client, cfg.aggregator.base_url.clone());
        Ok(Self::new(fetcher, FetchParams::from(&cfg.aggregator), providers))
    }

    /// One snapshot. Fails only when the aggregator gives nothing back.
    pub async fn run_once(&self) -> Result<RankedReport> {
        let mut grouped = self
            .fetcher
            .fetch_opportunities(&self.params)
            .await
            .ok_or_else(|| anyhow!("no opportunities received from aggregator"))?;

        if grouped.is_empty() {
            warn!("⚠️ Aggregator returned no opportunities for supported protocols");
        }
        for key in grouped.keys() {
            info!("📊 {}: {} opportunities", key, grouped.get(key).len());
        }

        let mut branches = Vec::new();
        for key in ProtocolKey::ALL {
            let opportunities = grouped.take(key);
            let provider = self.providers.get(&key).cloned();
            branches.push(async move {
                match provider {
                    Some(provider) => enhance(opportunities, provider.as_ref()).await,
                    None => {
                        if !opportunities.is_empty() {
                            warn!("⚠️ No APR provider for {}, ranking on boost APR only", key);
                        }
                        without_base_apr(opportunities)
                    }
                }
            });
        }

        // All branches run concurrently on this task; one slow source does not stall the others
        let enhanced = join_all(branches).await;
        Ok(rank(enhanced))
    }
}

pub async fn run(cfg: Config, output: OutputOpts) -> Result<()> {
    let run_id = Uuid::new_v4();
    let span = info_span!("scout", %run_id);

    async move {
        info!("Starting yield scout for chain {}", cfg.aggregator.chain_id);
        let pipeline = Pipeline::from_config(&cfg)?;
        let report = pipeline.run_once().await?.with_run_id(run_id);

        if report.is_empty() {
            warn!("⚠️ Nothing to rank");
        }

        if output.json {
            println!("{}", report.to_json()?);
        } else {
            println!();
            print!("{}", report.render(output.hyperlinks));
        }
        info!("✅ Report with {} opportunities done", report.len());
        Ok::<(), anyhow::Error>(())
    }
    .instrument(span)
    .await
}
