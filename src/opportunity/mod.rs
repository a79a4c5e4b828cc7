pub mod enhancer;
pub mod fetcher;
pub mod types;

pub use enhancer::enhance;
pub use fetcher::{FetchParams, OpportunityFetcher};
pub use types::{AprResult, EnhancedOpportunity, Opportunity, ProtocolKey, ProtocolOpportunities};
