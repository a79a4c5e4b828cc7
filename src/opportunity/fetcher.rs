use reqwest::Client;
use tracing::{debug, error, info, warn};

use crate::config::AggregatorCfg;
use crate::opportunity::types::{Opportunity, ProtocolKey, ProtocolOpportunities};
use crate::shared::FetchError;

/// Query filters sent to the aggregator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchParams {
    pub chain_id: u64,
    pub action: String,
    pub status: String,
    pub items: u32,
}

impl From<&AggregatorCfg> for FetchParams {
    fn from(cfg: &AggregatorCfg) -> Self {
        Self {
            chain_id: cfg.chain_id,
            action: cfg.action.clone(),
            status: cfg.status.clone(),
            items: cfg.items,
        }
    }
}

/// Client for the opportunity aggregator (Merkl v4)
pub struct OpportunityFetcher {
    http_client: Client,
    base_url: String,
}

impl OpportunityFetcher {
    pub fn new(http_client: Client, base_url: impl Into<String>) -> Self {
        Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Fetch live opportunities and group them by supported protocol.
    ///
    /// Opportunities from unmapped protocols are dropped. Any transport or
    /// parse failure is logged and reported as `None`.
    pub async fn fetch_opportunities(&self, params: &FetchParams) -> Option<ProtocolOpportunities> {
        match self.fetch_raw(params).await {
            Ok(raw) => Some(partition(raw)),
            Err(e) => {
                error!("❌ Error fetching opportunities: {}", e);
                None
            }
        }
    }

    async fn fetch_raw(&self, params: &FetchParams) -> Result<Vec<Opportunity>, FetchError> {
        let url = format!("{}/opportunities", self.base_url);
        info!("🔍 Fetching opportunities from: {}", url);

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("chainId", params.chain_id.to_string()),
                ("action", params.action.clone()),
                ("status", params.status.clone()),
                ("items", params.items.to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status()));
        }

        let body = response.bytes().await?;
        let records: Vec<serde_json::Value> =
            serde_json::from_slice(&body).map_err(|e| FetchError::Schema(e.to_string()))?;

        let received = records.len();
        let opportunities: Vec<Opportunity> = records
            .into_iter()
            .filter_map(|record| match serde_json::from_value::<Opportunity>(record) {
                Ok(opportunity) => Some(opportunity),
                Err(e) => {
                    warn!("⚠️ Skipping malformed opportunity: {}", e);
                    None
                }
            })
            .collect();

        info!("✅ Received {} opportunities ({} usable)", received, opportunities.len());
        Ok(opportunities)
    }
}

fn partition(raw: Vec<Opportunity>) -> ProtocolOpportunities {
    raw.into_iter()
        .filter_map(|opportunity| match ProtocolKey::from_protocol_id(&opportunity.protocol.id) {
            Some(key) => Some((key, opportunity)),
            None => {
                debug!(
                    "Skipping {} ({}): protocol {} not supported",
                    opportunity.name, opportunity.identifier, opportunity.protocol.id
                );
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn raw(protocol_id: &str, identifier: &str) -> serde_json::Value {
        json!({
            "chainId": 324,
            "identifier": identifier,
            "name": format!("{protocol_id} {identifier}"),
            "apr": 1.5,
            "protocol": { "id": protocol_id }
        })
    }

    fn params() -> FetchParams {
        FetchParams::from(&AggregatorCfg::default())
    }

    #[tokio::test]
    async fn test_partitions_by_protocol_and_drops_unmapped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/opportunities"))
            .and(query_param("chainId", "324"))
            .and(query_param("action", "POOL"))
            .and(query_param("status", "LIVE"))
            .and(query_param("items", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                raw("koi", "0x1"),
                raw("uniswap-v3", "0x2"),
                raw("pancakeswap-v3", "0x3"),
                raw("koi", "0x4"),
                raw("syncswap", "0x5"),
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = OpportunityFetcher::new(Client::new(), server.uri());
        let grouped = fetcher.fetch_opportunities(&params()).await.unwrap();

        assert_eq!(grouped.len(), 4);
        let koi: Vec<_> = grouped.get(ProtocolKey::Koi).iter().map(|o| o.identifier.clone()).collect();
        assert_eq!(koi, vec!["0x1", "0x4"]);
        assert_eq!(grouped.get(ProtocolKey::PancakeSwap).len(), 1);
        assert_eq!(grouped.get(ProtocolKey::SyncSwap).len(), 1);
        assert!(grouped.get(ProtocolKey::Maverick).is_empty());
        assert!(grouped.keys().all(|k| k != ProtocolKey::Maverick));
    }

    #[tokio::test]
    async fn test_bad_record_does_not_sink_the_batch() {
        let mut null_tvl = raw("koi", "0x2");
        null_tvl["tvl"] = serde_json::Value::Null;
        null_tvl["apr"] = serde_json::Value::Null;
        let no_identifier = json!({ "name": "broken", "protocol": { "id": "koi" } });

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/opportunities"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                raw("koi", "0x1"),
                null_tvl,
                no_identifier,
            ])))
            .mount(&server)
            .await;

        let fetcher = OpportunityFetcher::new(Client::new(), server.uri());
        let grouped = fetcher.fetch_opportunities(&params()).await.unwrap();

        let koi = grouped.get(ProtocolKey::Koi);
        assert_eq!(koi.len(), 2);
        assert_eq!(koi[1].identifier, "0x2");
        assert_eq!(koi[1].tvl, 0.0);
        assert_eq!(koi[1].apr, 0.0);
    }

    #[tokio::test]
    async fn test_http_error_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/opportunities"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let fetcher = OpportunityFetcher::new(Client::new(), server.uri());
        assert!(fetcher.fetch_opportunities(&params()).await.is_none());
    }

    #[tokio::test]
    async fn test_unexpected_shape_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/opportunities"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
            .mount(&server)
            .await;

        let fetcher = OpportunityFetcher::new(Client::new(), format!("{}/", server.uri()));
        assert!(fetcher.fetch_opportunities(&params()).await.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_is_none() {
        // Nothing listens on port 9 (discard) in the test environment
        let fetcher = OpportunityFetcher::new(Client::new(), "http://127.0.0.1:9");
        assert!(fetcher.fetch_opportunities(&params()).await.is_none());
    }
}
