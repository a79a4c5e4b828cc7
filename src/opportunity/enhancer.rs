use tracing::{error, info};

use crate::opportunity::types::{AprResult, EnhancedOpportunity, Opportunity};
use crate::providers::AprProvider;

/// Attach a base APR to every opportunity of one protocol.
///
/// The provider is called once for the whole batch, and not at all for an
/// empty batch. Pools missing from the result get `0`; negative sentinels
/// from a provider are kept as-is so failures show up in the ranking.
pub async fn enhance(
    opportunities: Vec<Opportunity>,
    provider: &dyn AprProvider,
) -> Vec<EnhancedOpportunity> {
    if opportunities.is_empty() {
        return Vec::new();
    }

    let identifiers: Vec<String> = opportunities.iter().map(|o| o.identifier.clone()).collect();
    info!("🔧 Computing {} base APR for {} pools", provider.name(), identifiers.len());

    let aprs = match provider.compute_base_apr(&identifiers).await {
        Ok(aprs) => aprs,
        Err(e) => {
            error!("❌ {} provider unavailable, base APR defaults to 0: {}", provider.name(), e);
            AprResult::new()
        }
    };

    opportunities
        .into_iter()
        .map(|opportunity| {
            let base_apr = aprs.get(&opportunity.identifier).copied().unwrap_or(0.0);
            EnhancedOpportunity::new(opportunity, base_apr)
        })
        .collect()
}

/// Opportunities without a provider still rank, on boost APR alone
pub fn without_base_apr(opportunities: Vec<Opportunity>) -> Vec<EnhancedOpportunity> {
    opportunities
        .into_iter()
        .map(|opportunity| EnhancedOpportunity::new(opportunity, 0.0))
        .collect()
}

#[cfg(test)]
pub(crate) mod fakes {
    use async_trait::async_trait;
    use std::sync::Mutex;

    use crate::opportunity::types::AprResult;
    use crate::providers::AprProvider;
    use crate::shared::AprError;

    /// Provider returning a fixed mapping and recording each call
    #[derive(Default)]
    pub struct StaticProvider {
        pub aprs: AprResult,
        pub unavailable: bool,
        pub calls: Mutex<Vec<Vec<String>>>,
    }

    impl StaticProvider {
        pub fn with(aprs: &[(&str, f64)]) -> Self {
            Self {
                aprs: aprs.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
                ..Self::default()
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl AprProvider for StaticProvider {
        fn name(&self) -> &str {
            "static"
        }

        async fn compute_base_apr(&self, identifiers: &[String]) -> Result<AprResult, AprError> {
            self.calls.lock().unwrap().push(identifiers.to_vec());
            if self.unavailable {
                return Err(AprError::BrowserLaunch("unavailable".to_string()));
            }
            Ok(self.aprs.clone())
        }
    }
}
