use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{info, warn};

use super::{AprProvider, IdentifierIndex};
use crate::math::weekly_fee_apr;
use crate::opportunity::types::AprResult;
use crate::shared::AprError;

/// Fee bucket granularity of a Uniswap-v3 style subgraph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubgraphVariant {
    /// `poolDayData`, trailing 7 days
    Daily,
    /// `poolHourData`, trailing 168 hours
    Hourly,
}

impl SubgraphVariant {
    /// Buckets making up one trailing week
    pub fn buckets_per_week(&self) -> usize {
        match self {
            SubgraphVariant::Daily => 7,
            SubgraphVariant::Hourly => 168,
        }
    }

    pub fn query(&self) -> String {
        let (field, order_by) = match self {
            SubgraphVariant::Daily => ("poolDayData", "date"),
            SubgraphVariant::Hourly => ("poolHourData", "periodStartUnix"),
        };
        format!(
            r#"{{
  pools(first: 1000) {{
    id
    totalValueLockedUSD
    {field}(first: {n}, orderBy: {order_by}, orderDirection: desc) {{
      feesUSD
    }}
  }}
}}"#,
            n = self.buckets_per_week(),
        )
    }
}

#[derive(Debug, Deserialize)]
struct SubgraphResponse {
    data: Option<SubgraphData>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct SubgraphData {
    pools: Option<Vec<SubgraphPool>>,
}

#[derive(Debug, Deserialize)]
struct SubgraphPool {
    id: String,
    #[serde(rename = "totalValueLockedUSD")]
    total_value_locked_usd: String,
    #[serde(default, alias = "poolDayData", alias = "poolHourData")]
    buckets: Vec<FeeBucket>,
}

#[derive(Debug, Deserialize)]
struct FeeBucket {
    #[serde(rename = "feesUSD")]
    fees_usd: String,
}

/// Base APR from a GraphQL subgraph's trailing week of fee buckets
pub struct SubgraphAprProvider {
    name: String,
    http_client: Client,
    endpoint: Option<String>,
    variant: SubgraphVariant,
}

impl SubgraphAprProvider {
    /// `endpoint = None` marks the subgraph as not configured (e.g. no API key)
    pub fn new(
        name: impl Into<String>,
        http_client: Client,
        endpoint: Option<String>,
        variant: SubgraphVariant,
    ) -> Self {
        Self {
            name: name.into(),
            http_client,
            endpoint,
            variant,
        }
    }

    async fn fetch_pools(&self) -> Result<Vec<SubgraphPool>, AprError> {
        let endpoint = self
            .endpoint
            .as_deref()
            .ok_or_else(|| AprError::NotConfigured(format!("{} subgraph endpoint", self.name)))?;

        let response = self
            .http_client
            .post(endpoint)
            .json(&serde_json::json!({ "query": self.variant.query() }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AprError::Status(response.status()));
        }

        let body: SubgraphResponse = response
            .json()
            .await
            .map_err(|e| AprError::Schema(e.to_string()))?;

        if let Some(first) = body.errors.first() {
            return Err(AprError::Schema(format!("GraphQL error: {}", first.message)));
        }

        body.data
            .and_then(|data| data.pools)
            .ok_or_else(|| AprError::Schema("missing data.pools".to_string()))
    }

    fn pool_apr(&self, pool: &SubgraphPool) -> Result<f64, String> {
        let weekly_fees = pool
            .buckets
            .iter()
            .take(self.variant.buckets_per_week())
            .map(|bucket| parse_usd("feesUSD", &bucket.fees_usd))
            .sum::<Result<f64, _>>()?;

        let tvl_usd = parse_usd("totalValueLockedUSD", &pool.total_value_locked_usd)?;

        Ok(weekly_fee_apr(weekly_fees, tvl_usd))
    }
}

/// Decimal USD string; `NaN` and infinities are rejected
fn parse_usd(field: &str, raw: &str) -> Result<f64, String> {
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        Ok(value) => Err(format!("bad {field}: {value}")),
        Err(e) => Err(format!("bad {field}: {e}")),
    }
}

#[async_trait]
impl AprProvider for SubgraphAprProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn compute_base_apr(&self, identifiers: &[String]) -> Result<AprResult, AprError> {
        let index = IdentifierIndex::new(identifiers);
        let mut result = AprResult::new();
        if index.is_empty() {
            return Ok(result);
        }

        let pools = match self.fetch_pools().await {
            Ok(pools) => pools,
            Err(e) => {
                warn!("⚠️ {} APR unavailable: {}", self.name, e);
                return Ok(result);
            }
        };

        if pools.is_empty() {
            warn!("⚠️ No {} pools found", self.name);
            return Ok(result);
        }

        for pool in pools.iter().filter(|p| !index.originals(&p.id).is_empty()) {
            match self.pool_apr(pool) {
                Ok(apr) => {
                    index.assign(&mut result, &pool.id, apr);
                }
                Err(e) => warn!("⚠️ Skipping {} pool {}: {}", self.name, pool.id, e),
            }
        }

        info!(
            "✅ {}: computed base APR for {}/{} pools",
            self.name,
            result.len(),
            identifiers.len()
        );
        Ok(result)
    }
}
