//! Dense ranking and prize distribution.
//!
//! Ranks are dense: participants with the same score share a rank and the
//! next distinct score gets the following rank (1, 1, 2, 2, 3...). Prizes
//! are only awarded on the first page of the referral leaderboard; every
//! other (category, page) combination yields empty results.
use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::error::RankingError;
use crate::prizes::PrizeTable;
use crate::types::{
    Category, Participant, PrizeAward, PrizeResult, Rank, RankResult, Score, Shards,
};

/// The only category that ranks and awards prizes.
pub const PRIZE_CATEGORY: Category = Category::Referrals;

/// The only page that ranks and awards prizes.
pub const PRIZE_PAGE: u32 = 1;

/// Shared gate for both ranking and prize distribution.
pub fn is_eligible(category: Category, page: u32) -> bool {
    category == PRIZE_CATEGORY && page == PRIZE_PAGE
}

#[derive(Clone, Debug)]
pub struct RankingEngine {
    category: Category,
    page: u32,
    prizes: PrizeTable,
}

impl RankingEngine {
    pub fn new(category: Category, page: u32, prizes: PrizeTable) -> Self {
        Self {
            category,
            page,
            prizes,
        }
    }

    pub fn with_default_prizes(category: Category, page: u32) -> Self {
        Self::new(category, page, PrizeTable::default())
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn prizes(&self) -> &PrizeTable {
        &self.prizes
    }

    pub fn is_eligible(&self) -> bool {
        is_eligible(self.category, self.page)
    }

    /// Assign dense ranks to every participant with a positive score.
    ///
    /// Input order does not matter; participants are sorted by score
    /// descending before ranks are handed out.
    pub fn calculate_ranks(&self, participants: &[Participant]) -> Result<RankResult, RankingError> {
        if !self.is_eligible() {
            debug!(category = %self.category, page = self.page, "ranking skipped");
            return Ok(RankResult::new());
        }
        validate(participants)?;

        let mut ordered: Vec<&Participant> =
            participants.iter().filter(|p| p.qualifies()).collect();
        ordered.sort_by(|a, b| b.score.cmp(&a.score));

        let mut ranks = RankResult::new();
        let mut current_rank: Rank = 0;
        let mut previous: Option<Score> = None;
        for participant in ordered {
            if previous != Some(participant.score) {
                current_rank += 1;
                previous = Some(participant.score);
            }
            ranks.insert(participant.id, current_rank);
        }

        debug!(
            ranked = ranks.len(),
            levels = current_rank,
            skipped = participants.len() - ranks.len(),
            "ranks calculated"
        );
        Ok(ranks)
    }

    /// Split each rank's pool evenly among the participants holding it.
    pub fn calculate_prizes(&self, ranks: &RankResult) -> PrizeResult {
        if !self.is_eligible() {
            debug!(category = %self.category, page = self.page, "prize distribution skipped");
            return PrizeResult::new();
        }

        let mut winners_at: BTreeMap<Rank, usize> = BTreeMap::new();
        for rank in ranks.values() {
            *winners_at.entry(*rank).or_default() += 1;
        }

        let per_winner: BTreeMap<Rank, Shards> = winners_at
            .into_iter()
            .filter_map(|(rank, winners)| self.prizes.split(rank, winners).map(|s| (rank, s)))
            .collect();

        ranks
            .iter()
            .filter_map(|(id, rank)| {
                per_winner
                    .get(rank)
                    .map(|&shards| (*id, PrizeAward { rank: *rank, shards }))
            })
            .collect()
    }
}

/// Rank `participants` for a category and page with the default prize table.
pub fn calculate_ranks(
    participants: &[Participant],
    category: Category,
    page: u32,
) -> Result<RankResult, RankingError> {
    RankingEngine::with_default_prizes(category, page).calculate_ranks(participants)
}

/// Distribute the default prize pools over a precomputed rank result.
///
/// A rank result only exists for the prize page, so the category is the
/// part of the gate that can still differ here.
pub fn calculate_prizes(ranks: &RankResult, category: Category) -> PrizeResult {
    RankingEngine::with_default_prizes(category, PRIZE_PAGE).calculate_prizes(ranks)
}

fn validate(participants: &[Participant]) -> Result<(), RankingError> {
    let mut seen = BTreeSet::new();
    for participant in participants {
        if participant.score < 0 {
            return Err(RankingError::InvalidScore {
                participant: participant.id,
                score: participant.score,
            });
        }
        if !seen.insert(participant.id) {
            return Err(RankingError::DuplicateParticipant(participant.id));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::prizes::PrizeTier;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::{Rng, SeedableRng};

    fn leaders() -> Vec<Participant> {
        vec![
            Participant::new(1, 10),
            Participant::new(2, 10),
            Participant::new(3, 5),
            Participant::new(4, 0),
        ]
    }

    fn random_participants(rng: &mut StdRng, len: usize) -> Vec<Participant> {
        (0..len as u64)
            .map(|id| Participant::new(id + 1, rng.gen_range(0..8)))
            .collect()
    }

    #[test]
    fn ranks_are_empty_for_other_categories() {
        assert!(calculate_ranks(&leaders(), Category::Posters, 1).unwrap().is_empty());
        assert!(calculate_ranks(&leaders(), Category::Shards, 1).unwrap().is_empty());
    }

    #[test]
    fn ranks_are_empty_after_first_page() {
        assert!(calculate_ranks(&leaders(), Category::Referrals, 2).unwrap().is_empty());
        assert!(calculate_ranks(&leaders(), Category::Referrals, 0).unwrap().is_empty());
    }

    #[test]
    fn ties_share_a_dense_rank() {
        let ranks = calculate_ranks(&leaders(), Category::Referrals, 1).unwrap();
        assert_eq!(ranks.get(&1), Some(&1));
        assert_eq!(ranks.get(&2), Some(&1));
        assert_eq!(ranks.get(&3), Some(&2));
        assert_eq!(ranks.get(&4), None);
        assert_eq!(ranks.len(), 3);
    }

    #[test]
    fn ties_do_not_skip_following_ranks() {
        let participants = [
            Participant::new(10, 7),
            Participant::new(11, 7),
            Participant::new(12, 7),
            Participant::new(13, 3),
            Participant::new(14, 1),
            Participant::new(15, 1),
        ];
        let ranks = calculate_ranks(&participants, Category::Referrals, 1).unwrap();
        assert_eq!(ranks[&12], 1);
        assert_eq!(ranks[&13], 2);
        assert_eq!(ranks[&14], 3);
        assert_eq!(ranks[&15], 3);
    }

    #[test]
    fn unsorted_input_is_sorted_before_ranking() {
        let participants = [
            Participant::new(1, 2),
            Participant::new(2, 9),
            Participant::new(3, 0),
            Participant::new(4, 5),
        ];
        let ranks = calculate_ranks(&participants, Category::Referrals, 1).unwrap();
        assert_eq!(ranks[&2], 1);
        assert_eq!(ranks[&4], 2);
        assert_eq!(ranks[&1], 3);
        assert!(!ranks.contains_key(&3));
    }

    #[test]
    fn empty_input_gives_empty_results() {
        let ranks = calculate_ranks(&[], Category::Referrals, 1).unwrap();
        assert!(ranks.is_empty());
        assert!(calculate_prizes(&ranks, Category::Referrals).is_empty());
    }

    #[test]
    fn all_zero_scores_rank_nobody() {
        let participants = [Participant::new(1, 0), Participant::new(2, 0)];
        let ranks = calculate_ranks(&participants, Category::Referrals, 1).unwrap();
        assert!(ranks.is_empty());
    }

    #[test]
    fn negative_score_fails_fast() {
        let participants = [Participant::new(1, 4), Participant::new(2, -3)];
        let err = calculate_ranks(&participants, Category::Referrals, 1).unwrap_err();
        assert_eq!(
            err,
            RankingError::InvalidScore {
                participant: 2,
                score: -3
            }
        );
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let participants = [Participant::new(1, 4), Participant::new(1, 2)];
        let err = calculate_ranks(&participants, Category::Referrals, 1).unwrap_err();
        assert_eq!(err, RankingError::DuplicateParticipant(1));
    }

    #[test]
    fn ineligible_requests_do_not_inspect_input() {
        let participants = [Participant::new(1, -1)];
        assert!(calculate_ranks(&participants, Category::Posters, 1).unwrap().is_empty());
    }

    #[test]
    fn prizes_split_evenly_with_ties() {
        let ranks = calculate_ranks(&leaders(), Category::Referrals, 1).unwrap();
        let prizes = calculate_prizes(&ranks, Category::Referrals);
        assert_eq!(prizes[&1], PrizeAward { rank: 1, shards: 25 });
        assert_eq!(prizes[&2], PrizeAward { rank: 1, shards: 25 });
        assert_eq!(prizes[&3], PrizeAward { rank: 2, shards: 25 });
        assert!(!prizes.contains_key(&4));
    }

    #[test]
    fn prizes_are_empty_for_other_categories() {
        let ranks = calculate_ranks(&leaders(), Category::Referrals, 1).unwrap();
        assert!(calculate_prizes(&ranks, Category::Shards).is_empty());
        assert!(calculate_prizes(&ranks, Category::Posters).is_empty());
    }

    #[test]
    fn engine_rechecks_page_for_prizes() {
        let ranks = calculate_ranks(&leaders(), Category::Referrals, 1).unwrap();
        let second_page = RankingEngine::with_default_prizes(Category::Referrals, 2);
        assert!(second_page.calculate_prizes(&ranks).is_empty());
    }

    #[test]
    fn ranks_beyond_the_table_get_nothing() {
        let participants: Vec<Participant> =
            (1..=5).map(|id| Participant::new(id, 10 - id as Score)).collect();
        let ranks = calculate_ranks(&participants, Category::Referrals, 1).unwrap();
        let prizes = calculate_prizes(&ranks, Category::Referrals);
        assert_eq!(prizes.len(), 3);
        assert_eq!(prizes[&1].shards, 50);
        assert_eq!(prizes[&2].shards, 25);
        assert_eq!(prizes[&3].shards, 10);
        assert!(!prizes.contains_key(&4));
        assert!(!prizes.contains_key(&5));
    }

    #[test]
    fn uneven_split_floors_each_share() {
        let participants = [
            Participant::new(1, 9),
            Participant::new(2, 9),
            Participant::new(3, 9),
            Participant::new(4, 4),
        ];
        let ranks = calculate_ranks(&participants, Category::Referrals, 1).unwrap();
        let prizes = calculate_prizes(&ranks, Category::Referrals);
        for id in 1..=3 {
            assert_eq!(prizes[&id].shards, 16);
        }
        let total: Shards = (1..=3).map(|id| prizes[&id].shards).sum();
        assert_eq!(total, 48);
        assert_eq!(prizes[&4].shards, 25);
    }

    #[test]
    fn crowded_tie_gets_minimum_award() {
        let participants: Vec<Participant> = (1..=14)
            .map(|id| Participant::new(id, if id <= 2 { 30 } else if id == 3 { 20 } else { 1 }))
            .collect();
        let ranks = calculate_ranks(&participants, Category::Referrals, 1).unwrap();
        let prizes = calculate_prizes(&ranks, Category::Referrals);
        // eleven participants share the 10 shard pool for third place
        for id in 4..=14 {
            assert_eq!(prizes[&id], PrizeAward { rank: 3, shards: 1 });
        }
    }

    #[test]
    fn custom_prize_table_is_respected() {
        let table = PrizeTable::from_tiers(
            &[PrizeTier { rank: 1, pool: 100 }, PrizeTier { rank: 2, pool: 9 }],
            0,
        )
        .unwrap();
        let engine = RankingEngine::new(Category::Referrals, 1, table);
        let ranks = engine.calculate_ranks(&leaders()).unwrap();
        let prizes = engine.calculate_prizes(&ranks);
        assert_eq!(prizes[&1].shards, 50);
        assert_eq!(prizes[&3].shards, 9);
    }

    #[test]
    fn distinct_levels_match_distinct_ranks() {
        let mut rng = StdRng::seed_from_u64(7);
        for len in 0..40 {
            let participants = random_participants(&mut rng, len);
            let ranks = calculate_ranks(&participants, Category::Referrals, 1).unwrap();

            let levels: BTreeSet<Score> = participants
                .iter()
                .filter(|p| p.qualifies())
                .map(|p| p.score)
                .collect();
            let distinct_ranks: BTreeSet<Rank> = ranks.values().copied().collect();
            assert_eq!(levels.len(), distinct_ranks.len());

            // highest level is rank 1, each lower level one more
            for (idx, score) in levels.iter().rev().enumerate() {
                for p in participants.iter().filter(|p| p.score == *score) {
                    assert_eq!(ranks[&p.id], idx as Rank + 1);
                }
            }
            for p in participants.iter().filter(|p| !p.qualifies()) {
                assert!(!ranks.contains_key(&p.id));
            }
        }
    }

    #[test]
    fn input_order_is_irrelevant() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut participants = random_participants(&mut rng, 30);
        let expected = calculate_ranks(&participants, Category::Referrals, 1).unwrap();
        for _ in 0..10 {
            participants.shuffle(&mut rng);
            let ranks = calculate_ranks(&participants, Category::Referrals, 1).unwrap();
            assert_eq!(ranks, expected);
            assert_eq!(
                calculate_prizes(&ranks, Category::Referrals),
                calculate_prizes(&expected, Category::Referrals)
            );
        }
    }

    #[test]
    fn paid_total_matches_split_rule() {
        let mut rng = StdRng::seed_from_u64(3);
        let table = PrizeTable::default();
        for _ in 0..50 {
            let participants = random_participants(&mut rng, 20);
            let ranks = calculate_ranks(&participants, Category::Referrals, 1).unwrap();
            let prizes = calculate_prizes(&ranks, Category::Referrals);
            for tier in table.tiers() {
                let winners: Vec<&PrizeAward> =
                    prizes.values().filter(|a| a.rank == tier.rank).collect();
                if winners.is_empty() {
                    continue;
                }
                let paid: Shards = winners.iter().map(|a| a.shards).sum();
                let count = winners.len() as Shards;
                let expected = if tier.pool / count >= 1 {
                    tier.pool - tier.pool % count
                } else {
                    count
                };
                assert_eq!(paid, expected);
            }
        }
    }

    #[test]
    fn repeated_calls_are_identical() {
        let engine = RankingEngine::with_default_prizes(Category::Referrals, 1);
        let first = engine.calculate_ranks(&leaders()).unwrap();
        let second = engine.calculate_ranks(&leaders()).unwrap();
        assert_eq!(first, second);
        assert_eq!(engine.calculate_prizes(&first), engine.calculate_prizes(&second));
    }
}
