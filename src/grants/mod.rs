use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use shardboard_core::{Category, PrizeResult};

use crate::ledger::{Hash32, LedgerMutation, PrizeCredit};

/// Crediting one leaderboard's prizes for a campaign.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PrizeGrant {
    pub campaign: String,
    pub category: Category,
}

impl PrizeGrant {
    pub fn new(campaign: impl Into<String>, category: Category) -> Self {
        Self {
            campaign: campaign.into(),
            category,
        }
    }

    pub fn credits(&self, prizes: &PrizeResult) -> Vec<PrizeCredit> {
        prizes
            .iter()
            .filter(|(_, award)| award.shards > 0)
            .map(|(&account, award)| PrizeCredit {
                account,
                rank: award.rank,
                amount: award.shards,
            })
            .collect()
    }

    pub fn mutations(&self, prizes: &PrizeResult) -> Vec<LedgerMutation> {
        let awards = self.credits(prizes);
        if awards.is_empty() {
            return vec![];
        }
        vec![LedgerMutation::AwardPrizes {
            campaign: self.campaign.clone(),
            category: self.category,
            awards,
        }]
    }

    /// Deterministic over campaign, category and awards, so the ledger
    /// rejects a second grant of the same standings.
    pub fn receipt_id(&self, prizes: &PrizeResult) -> Hash32 {
        let mut hasher = Sha256::new();
        hasher.update(b"shardboard-grant-v1");
        hasher.update((self.campaign.len() as u64).to_le_bytes());
        hasher.update(self.campaign.as_bytes());
        hasher.update(self.category.as_str().as_bytes());
        for credit in self.credits(prizes) {
            hasher.update(credit.account.to_le_bytes());
            hasher.update(credit.rank.to_le_bytes());
            hasher.update(credit.amount.to_le_bytes());
        }
        Hash32(hasher.finalize().into())
    }

    pub fn total(&self, prizes: &PrizeResult) -> u64 {
        self.credits(prizes).iter().map(|c| c.amount).sum()
    }
}
