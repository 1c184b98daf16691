//! Leaderboard page assembly.
//!
//! Takes the raw member list for a campaign, applies the category ordering,
//! search and pagination, then hands the visible page to the
//! [`RankingEngine`](crate::ranking::RankingEngine). Banned members never
//! appear; members who opted out keep their position with a redacted name.
use serde::{Deserialize, Serialize};

use crate::error::RankingError;
use crate::prizes::PrizeTable;
use crate::ranking::RankingEngine;
use crate::types::{Category, Participant, ParticipantId, Rank, Score, Shards};

pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Shown instead of the display name of members who opted out.
pub const REDACTED_NAME: &str = "Anonymous";

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LeaderboardMember {
    pub id: ParticipantId,
    pub display_name: String,
    #[serde(default)]
    pub referral_count: Score,
    /// Completed referrals within the current campaign, when scoped to one.
    #[serde(default)]
    pub campaign_referral_count: Option<Score>,
    #[serde(default)]
    pub poster_count: Score,
    #[serde(default)]
    pub total_shards: Score,
    #[serde(default)]
    pub opted_out: bool,
    #[serde(default)]
    pub banned: bool,
}

impl LeaderboardMember {
    pub fn score(&self, category: Category) -> Score {
        match category {
            Category::Referrals => self.campaign_referral_count.unwrap_or(self.referral_count),
            Category::Posters => self.poster_count,
            Category::Shards => self.total_shards,
        }
    }

    fn matches(&self, needle: &str) -> bool {
        self.display_name.to_lowercase().contains(needle)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeaderboardQuery {
    pub category: Category,
    /// 1-based; 0 is treated as the first page.
    pub page: u32,
    pub search: Option<String>,
    pub page_size: usize,
}

impl Default for LeaderboardQuery {
    fn default() -> Self {
        Self {
            category: Category::default(),
            page: 1,
            search: None,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LeaderboardRow {
    /// 1-based position across all pages.
    pub position: usize,
    pub id: ParticipantId,
    pub display_name: String,
    pub score: Score,
    pub redacted: bool,
    pub rank: Option<Rank>,
    pub prize: Option<Shards>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LeaderboardPage {
    pub category: Category,
    pub page: u32,
    pub total_pages: u32,
    pub total_members: usize,
    pub rows: Vec<LeaderboardRow>,
}

impl LeaderboardPage {
    pub fn prize_total(&self) -> Shards {
        self.rows.iter().filter_map(|r| r.prize).sum()
    }
}

pub fn build_page(
    members: &[LeaderboardMember],
    query: &LeaderboardQuery,
    prizes: &PrizeTable,
) -> Result<LeaderboardPage, RankingError> {
    let category = query.category;
    let page = query.page.max(1);
    let page_size = query.page_size.max(1);

    let needle = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);

    let mut visible: Vec<&LeaderboardMember> = members
        .iter()
        .filter(|m| !m.banned)
        .filter(|m| needle.as_deref().map_or(true, |n| m.matches(n)))
        .collect();
    visible.sort_by(|a, b| {
        b.score(category)
            .cmp(&a.score(category))
            .then_with(|| a.id.cmp(&b.id))
    });

    let total_members = visible.len();
    let total_pages = total_members.div_ceil(page_size).max(1) as u32;
    // An offset past usize::MAX lies beyond the last member anyway.
    let offset = (page as usize - 1)
        .checked_mul(page_size)
        .unwrap_or(usize::MAX);
    let rows_on_page: Vec<&LeaderboardMember> =
        visible.into_iter().skip(offset).take(page_size).collect();

    let participants: Vec<Participant> = rows_on_page
        .iter()
        .map(|m| Participant::new(m.id, m.score(category)))
        .collect();
    let engine = RankingEngine::new(category, page, prizes.clone());
    let ranks = engine.calculate_ranks(&participants)?;
    let awards = engine.calculate_prizes(&ranks);

    let rows = rows_on_page
        .into_iter()
        .enumerate()
        .map(|(idx, m)| LeaderboardRow {
            position: offset + idx + 1,
            id: m.id,
            display_name: if m.opted_out {
                REDACTED_NAME.to_string()
            } else {
                m.display_name.clone()
            },
            score: m.score(category),
            redacted: m.opted_out,
            rank: ranks.get(&m.id).copied(),
            prize: awards.get(&m.id).map(|a| a.shards),
        })
        .collect();

    Ok(LeaderboardPage {
        category,
        page,
        total_pages,
        total_members,
        rows,
    })
}
