use thiserror::Error;

use crate::types::{ParticipantId, Rank, Score};

/// Canonical error type exposed by the leaderboard primitives.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RankingError {
    /// A participant reached the engine with a negative score.
    #[error("invalid score {score} for participant {participant}")]
    InvalidScore {
        participant: ParticipantId,
        score: Score,
    },

    /// The same identifier appeared more than once in one computation.
    #[error("duplicate participant {0}")]
    DuplicateParticipant(ParticipantId),

    /// Prize tiers start at rank 1.
    #[error("prize tier rank must be at least 1, got {0}")]
    InvalidPrizeRank(Rank),

    /// A tier was configured twice or with an empty pool.
    #[error("invalid prize table: {0}")]
    InvalidPrizeTable(&'static str),
}
