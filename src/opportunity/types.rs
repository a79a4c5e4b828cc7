use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::shared::null_as_default;

/// Pool identifier (caller casing) -> base APR in percent.
/// A missing key means no APR was computed for that pool.
pub type AprResult = HashMap<String, f64>;

/// Protocols the scout knows how to enhance
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolKey {
    Koi,
    PancakeSwap,
    SyncSwap,
    Maverick,
}

impl ProtocolKey {
    pub const ALL: [ProtocolKey; 4] = [
        ProtocolKey::Koi,
        ProtocolKey::PancakeSwap,
        ProtocolKey::SyncSwap,
        ProtocolKey::Maverick,
    ];

    /// Translate an aggregator protocol id; unsupported ids map to `None`
    pub fn from_protocol_id(id: &str) -> Option<Self> {
        match id {
            "koi" => Some(ProtocolKey::Koi),
            "pancakeswap-v3" => Some(ProtocolKey::PancakeSwap),
            "syncswap" => Some(ProtocolKey::SyncSwap),
            "maverick" => Some(ProtocolKey::Maverick),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProtocolKey::Koi => "koi",
            ProtocolKey::PancakeSwap => "pancakeswap",
            ProtocolKey::SyncSwap => "syncswap",
            ProtocolKey::Maverick => "maverick",
        }
    }
}

impl fmt::Display for ProtocolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Chain {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub icon: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Protocol {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub icon: String,
}

/// One yield-bearing pool position as reported by the aggregator.
///
/// Reward, TVL and APR breakdown records are kept as opaque JSON; nothing
/// here reads them, they are only passed through to the JSON report.
/// The aggregator sends `null` for unknown numbers; those read as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Opportunity {
    #[serde(default, deserialize_with = "null_as_default")]
    pub chain_id: u64,
    #[serde(default, rename = "type", deserialize_with = "null_as_default")]
    pub kind: String,
    /// Pool address
    pub identifier: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub deposit_url: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub action: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tvl: f64,
    /// Boost APR in percent
    #[serde(default, deserialize_with = "null_as_default")]
    pub apr: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub daily_rewards: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tokens: Vec<serde_json::Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub chain: Chain,
    pub protocol: Protocol,
    #[serde(default)]
    pub apr_record: Option<serde_json::Value>,
    #[serde(default)]
    pub tvl_record: Option<serde_json::Value>,
    #[serde(default)]
    pub rewards_record: Option<serde_json::Value>,
}

impl Opportunity {
    /// Deposit link, blank strings count as absent
    pub fn deposit_link(&self) -> Option<&str> {
        self.deposit_url.as_deref().map(str::trim).filter(|url| !url.is_empty())
    }
}

/// Opportunity with a locally computed base APR attached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancedOpportunity {
    #[serde(flatten)]
    pub opportunity: Opportunity,
    /// Percent; `-1` means the scrape for this pool failed
    pub base_apr: f64,
}

impl EnhancedOpportunity {
    pub fn new(opportunity: Opportunity, base_apr: f64) -> Self {
        Self { opportunity, base_apr }
    }

    pub fn boost_apr(&self) -> f64 {
        self.opportunity.apr
    }

    pub fn total_apr(&self) -> f64 {
        self.opportunity.apr + self.base_apr
    }
}

/// Fetched opportunities grouped by protocol, fetch order kept per group
#[derive(Debug, Clone, Default)]
pub struct ProtocolOpportunities {
    groups: BTreeMap<ProtocolKey, Vec<Opportunity>>,
}

impl ProtocolOpportunities {
    pub fn push(&mut self, key: ProtocolKey, opportunity: Opportunity) {
        self.groups.entry(key).or_default().push(opportunity);
    }

    /// Opportunities for one protocol, empty when none were fetched
    pub fn get(&self, key: ProtocolKey) -> &[Opportunity] {
        self.groups.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn take(&mut self, key: ProtocolKey) -> Vec<Opportunity> {
        self.groups.remove(&key).unwrap_or_default()
    }

    pub fn keys(&self) -> impl Iterator<Item = ProtocolKey> + '_ {
        self.groups.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FromIterator<(ProtocolKey, Opportunity)> for ProtocolOpportunities {
    fn from_iter<I: IntoIterator<Item = (ProtocolKey, Opportunity)>>(iter: I) -> Self {
        let mut grouped = Self::default();
        for (key, opportunity) in iter {
            grouped.push(key, opportunity);
        }
        grouped
    }
}
