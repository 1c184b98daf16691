use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Caller-provided participant key (a user id upstream).
pub type ParticipantId = u64;
/// Signed so that a negative count from a caller is representable and rejected.
pub type Score = i64;
pub type Rank = u32;
pub type Shards = u64;

/// One entry of a ranking computation.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Participant {
    pub id: ParticipantId,
    pub score: Score,
}

impl Participant {
    pub fn new(id: ParticipantId, score: Score) -> Self {
        Self { id, score }
    }

    /// Only participants with a positive score receive a rank or a prize.
    pub fn qualifies(&self) -> bool {
        self.score > 0
    }
}

/// Leaderboard category. Only [`Category::Referrals`] awards prizes.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    #[default]
    Referrals,
    Posters,
    Shards,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Referrals, Category::Posters, Category::Shards];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Referrals => "referrals",
            Category::Posters => "posters",
            Category::Shards => "shards",
        }
    }

    /// Lenient parse used for request parameters: anything unknown or blank
    /// lands on the referral leaderboard.
    pub fn parse_or_default(value: &str) -> Self {
        value.parse().unwrap_or_default()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategory(pub String);

impl fmt::Display for UnknownCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown leaderboard category {:?}", self.0)
    }
}

impl std::error::Error for UnknownCategory {}

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// Shards awarded to one participant together with the rank that earned them.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PrizeAward {
    pub rank: Rank,
    pub shards: Shards,
}

/// Participant id => dense rank. Zero-score participants are absent.
pub type RankResult = BTreeMap<ParticipantId, Rank>;

/// Participant id => award. Ranks without a prize pool are absent.
pub type PrizeResult = BTreeMap<ParticipantId, PrizeAward>;
