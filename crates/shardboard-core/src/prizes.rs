use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::RankingError;
use crate::types::{Rank, Shards};

/// Minimum shards awarded to any prize winner, however many share the rank.
pub const MINIMUM_PRIZE_SHARDS: Shards = 1;

/// Pools for the top ranks before splitting for ties.
pub const DEFAULT_PRIZE_POOLS: [(Rank, Shards); 3] = [(1, 50), (2, 25), (3, 10)];

/// One configured tier: the pool shared by everybody holding `rank`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PrizeTier {
    pub rank: Rank,
    pub pool: Shards,
}

/// Per-rank prize pools, fixed for the duration of a computation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrizeTable {
    pools: BTreeMap<Rank, Shards>,
    minimum_award: Shards,
}

impl Default for PrizeTable {
    fn default() -> Self {
        Self {
            pools: DEFAULT_PRIZE_POOLS.into_iter().collect(),
            minimum_award: MINIMUM_PRIZE_SHARDS,
        }
    }
}

impl PrizeTable {
    pub fn from_tiers(tiers: &[PrizeTier], minimum_award: Shards) -> Result<Self, RankingError> {
        let mut pools = BTreeMap::new();
        for tier in tiers {
            if tier.rank == 0 {
                return Err(RankingError::InvalidPrizeRank(tier.rank));
            }
            if tier.pool == 0 {
                return Err(RankingError::InvalidPrizeTable("prize pools must be positive"));
            }
            if pools.insert(tier.rank, tier.pool).is_some() {
                return Err(RankingError::InvalidPrizeTable("prize tier configured twice"));
            }
        }
        Ok(Self {
            pools,
            minimum_award,
        })
    }

    pub fn pool_for(&self, rank: Rank) -> Option<Shards> {
        self.pools.get(&rank).copied()
    }

    pub fn minimum_award(&self) -> Shards {
        self.minimum_award
    }

    pub fn tiers(&self) -> impl Iterator<Item = PrizeTier> + '_ {
        self.pools
            .iter()
            .map(|(&rank, &pool)| PrizeTier { rank, pool })
    }

    /// Shards each of `winners` tied participants receive at `rank`.
    ///
    /// The pool is floor-divided; the remainder is not distributed. A share
    /// below the minimum award is raised to it, so very crowded ties can pay
    /// out more than the pool.
    pub fn split(&self, rank: Rank, winners: usize) -> Option<Shards> {
        let pool = self.pool_for(rank)?;
        if winners == 0 {
            return None;
        }
        let per_winner = pool / winners as Shards;
        Some(per_winner.max(self.minimum_award))
    }
}
