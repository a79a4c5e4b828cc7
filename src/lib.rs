//! Yield Scout - ranks zkSync liquidity pools by fee APR plus boost APR
//! Aggregator opportunities are enhanced with a locally computed base APR per protocol

pub mod app;
pub mod config;
pub mod math;
pub mod opportunity;
pub mod providers;
pub mod report;
pub mod shared;

// Re-export main types for convenience
pub use app::{OutputOpts, Pipeline};
pub use config::Config;
pub use opportunity::{EnhancedOpportunity, Opportunity, OpportunityFetcher, ProtocolKey};
pub use providers::AprProvider;
pub use report::{rank, RankedReport};
