//! Base APR providers, one per data source

pub mod scraper;
pub mod subgraph;
pub mod ticker;

use async_trait::async_trait;
use std::collections::HashMap;

use crate::opportunity::types::AprResult;
use crate::shared::AprError;

pub use scraper::{ScrapeAprProvider, SCRAPE_FAILED_APR};
pub use subgraph::{SubgraphAprProvider, SubgraphVariant};
pub use ticker::TickerAprProvider;

/// Computes base (fee) APR for a batch of pool identifiers
#[async_trait]
pub trait AprProvider: Send + Sync {
    /// Short source name for logs
    fn name(&self) -> &str;

    /// Keys of the returned mapping are the caller's identifiers with their
    /// original casing; pools the source has no data for are left out.
    ///
    /// An `Err` means the whole source is unavailable for this run.
    async fn compute_base_apr(&self, identifiers: &[String]) -> Result<AprResult, AprError>;
}

/// Case-insensitive lookup from source ids back to caller identifiers
pub(crate) struct IdentifierIndex<'a> {
    by_lower: HashMap<String, Vec<&'a str>>,
}

impl<'a> IdentifierIndex<'a> {
    pub(crate) fn new(identifiers: &'a [String]) -> Self {
        let mut by_lower: HashMap<String, Vec<&'a str>> = HashMap::new();
        for id in identifiers {
            let originals = by_lower.entry(id.to_lowercase()).or_default();
            if !originals.contains(&id.as_str()) {
                originals.push(id);
            }
        }
        Self { by_lower }
    }

    /// Caller identifiers matching `source_id`, ignoring case
    pub(crate) fn originals(&self, source_id: &str) -> &[&'a str] {
        self.by_lower
            .get(&source_id.to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.by_lower.is_empty()
    }

    /// Record `apr` under every caller identifier matching `source_id`
    pub(crate) fn assign(&self, result: &mut AprResult, source_id: &str, apr: f64) -> bool {
        let originals = self.originals(source_id);
        for original in originals {
            result.insert((*original).to_string(), apr);
        }
        !originals.is_empty()
    }
}
