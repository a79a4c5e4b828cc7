// src/report.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use uuid::Uuid;

use crate::opportunity::types::{EnhancedOpportunity, ProtocolKey};

pub const NO_DEPOSIT_LINK: &str = "No deposit link";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedEntry {
    pub rank: usize,
    pub name: String,
    pub protocol: Option<ProtocolKey>,
    pub identifier: String,
    pub total_apr: f64,
    pub base_apr: f64,
    pub boost_apr: f64,
    pub deposit_url: Option<String>,
}

impl RankedEntry {
    fn from_enhanced(rank: usize, enhanced: &EnhancedOpportunity) -> Self {
        let opportunity = &enhanced.opportunity;
        Self {
            rank,
            name: opportunity.name.clone(),
            protocol: ProtocolKey::from_protocol_id(&opportunity.protocol.id),
            identifier: opportunity.identifier.clone(),
            total_apr: enhanced.total_apr(),
            base_apr: enhanced.base_apr,
            boost_apr: enhanced.boost_apr(),
            deposit_url: opportunity.deposit_link().map(str::to_string),
        }
    }

    /// `rank. name | total% (Base: b% + Boost: x%) | link`
    pub fn render_line(&self, hyperlinks: bool) -> String {
        let link = match (&self.deposit_url, hyperlinks) {
            // OSC 8 terminal hyperlink
            (Some(url), true) => format!("\u{1b}]8;;{url}\u{7}Deposit\u{1b}]8;;\u{7}"),
            (Some(url), false) => format!("Deposit: {url}"),
            (None, _) => NO_DEPOSIT_LINK.to_string(),
        };
        format!(
            "{}. {} | {:.2}% (Base: {:.2}% + Boost: {:.2}%) | {}",
            self.rank, self.name, self.total_apr, self.base_apr, self.boost_apr, link
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedReport {
    pub run_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub entries: Vec<RankedEntry>,
}

impl RankedReport {
    pub fn with_run_id(mut self, run_id: Uuid) -> Self {
        self.run_id = run_id;
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn render(&self, hyperlinks: bool) -> String {
        let mut out = format!("Found {} opportunities sorted by total APR:\n", self.entries.len());
        for entry in &self.entries {
            let _ = writeln!(out, "{}", entry.render_line(hyperlinks));
        }
        out
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Merge every protocol's list and order by total APR, highest first.
///
/// The sort is stable: equal totals keep their input order.
pub fn rank(lists: Vec<Vec<EnhancedOpportunity>>) -> RankedReport {
    let mut merged: Vec<EnhancedOpportunity> = lists.into_iter().flatten().collect();
    merged.sort_by(|a, b| b.total_apr().total_cmp(&a.total_apr()));

    let entries = merged
        .iter()
        .enumerate()
        .map(|(i, enhanced)| RankedEntry::from_enhanced(i + 1, enhanced))
        .collect();

    RankedReport {
        run_id: Uuid::nil(),
        timestamp: Utc::now(),
        entries,
    }
}
