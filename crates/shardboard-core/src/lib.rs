//! Core primitives for the Shardboard leaderboard.
//!
//! This crate exposes the pure computations behind a referral leaderboard:
//!
//! * [`ranking`]: dense ranking of participants and tie-split prize
//!   distribution, gated to the first page of the referral category.
//! * [`prizes`]: the per-rank prize pools and the split rule.
//! * [`leaderboard`]: page assembly over raw members (search, ordering,
//!   pagination, redaction) feeding the ranking engine.
//! * [`types`]: participant, category and result types shared by the above.
//!
//! Nothing here performs IO. Crediting awarded shards is left to the caller's
//! ledger.
//!
//! ```rust
//! use shardboard_core::{calculate_prizes, calculate_ranks, Category, Participant};
//!
//! let participants = [
//!     Participant::new(1, 10),
//!     Participant::new(2, 10),
//!     Participant::new(3, 5),
//!     Participant::new(4, 0),
//! ];
//! let ranks = calculate_ranks(&participants, Category::Referrals, 1).unwrap();
//! assert_eq!(ranks.get(&1), Some(&1));
//! assert_eq!(ranks.get(&3), Some(&2));
//! assert!(!ranks.contains_key(&4));
//!
//! let prizes = calculate_prizes(&ranks, Category::Referrals);
//! assert_eq!(prizes[&1].shards, 25);
//! assert_eq!(prizes[&3].shards, 25);
//! ```

pub mod leaderboard;
pub mod prizes;
pub mod ranking;
pub mod types;

mod error;

pub use error::RankingError;
pub use leaderboard::{
    build_page, LeaderboardMember, LeaderboardPage, LeaderboardQuery, LeaderboardRow,
    DEFAULT_PAGE_SIZE,
};
pub use prizes::{PrizeTable, PrizeTier, MINIMUM_PRIZE_SHARDS};
pub use ranking::{calculate_prizes, calculate_ranks, is_eligible, RankingEngine};
pub use types::{
    Category, Participant, ParticipantId, PrizeAward, PrizeResult, Rank, RankResult, Score,
    Shards,
};
