//! Reputation → rank label mapping

use fret_common::config::RankTier;
use fret_common::{Error, Result};

/// Rank tiers sorted by threshold, highest first
#[derive(Debug, Clone)]
pub struct RankTable {
    tiers: Vec<RankTier>,
}

impl RankTable {
    /// Build a table from configured tiers
    ///
    /// Fails unless a tier with threshold 0 exists and thresholds are unique,
    /// so `evaluate` is total.
    pub fn from_tiers(tiers: &[RankTier]) -> Result<Self> {
        let mut sorted = tiers.to_vec();
        sorted.sort_by(|a, b| b.threshold.cmp(&a.threshold));

        if sorted.windows(2).any(|w| w[0].threshold == w[1].threshold) {
            return Err(Error::Config("rank thresholds must be unique".to_string()));
        }
        if sorted.last().map(|t| t.threshold) != Some(0) {
            return Err(Error::Config(
                "rank table needs a tier with threshold 0".to_string(),
            ));
        }

        Ok(Self { tiers: sorted })
    }

    /// Label of the highest tier whose threshold is at most `reputation`
    pub fn evaluate(&self, reputation: u32) -> &str {
        self.tiers
            .iter()
            .find(|t| t.threshold <= reputation)
            .map(|t| t.label.as_str())
            // Unreachable: construction guarantees a 0 tier
            .unwrap_or_default()
    }

    /// Rank given to a brand-new learner
    pub fn default_rank(&self) -> &str {
        self.evaluate(0)
    }
}
