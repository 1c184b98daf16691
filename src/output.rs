/// Output formatting: terminal tables and JSON.
use serde::Serialize;
use shardboard_core::LeaderboardPage;

use crate::ledger::{AccountId, Hash32, LedgerState};

/// Widest display name in characters, at least as wide as "Name".
fn name_width(page: &LeaderboardPage) -> usize {
    page.rows
        .iter()
        .map(|r| r.display_name.chars().count())
        .max()
        .unwrap_or(4)
        .max(4)
}

/// Print a leaderboard page as a terminal table.
pub fn print_table(page: &LeaderboardPage) {
    let name_width = name_width(page);

    println!(
        "{} leaderboard, page {}/{} ({} members)",
        page.category, page.page, page.total_pages, page.total_members
    );
    println!("    # | {:<name_width$} |   Score | Rank | Prize", "Name");
    println!("------|-{}-|---------|------|------", "-".repeat(name_width));

    for row in &page.rows {
        let rank = row.rank.map(|r| r.to_string()).unwrap_or_else(|| "-".into());
        let prize = row.prize.map(|p| p.to_string()).unwrap_or_else(|| "-".into());
        println!(
            "{:>5} | {:<name_width$} | {:>7} | {:>4} | {:>5}",
            row.position, row.display_name, row.score, rank, prize,
        );
    }

    let total = page.prize_total();
    if total > 0 {
        println!("\nPrize shards on this page: {total}");
    }
}

/// Print a leaderboard page as pretty JSON.
pub fn print_json(page: &LeaderboardPage) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(page)?);
    Ok(())
}

#[derive(Serialize)]
struct GrantSummary<'a> {
    campaign: &'a str,
    receipt: Hash32,
    winners: usize,
    shards: u64,
    height: u64,
}

pub fn print_grant_summary(
    campaign: &str,
    receipt: Hash32,
    winners: usize,
    shards: u64,
    ledger: &LedgerState,
    json: bool,
) -> Result<(), serde_json::Error> {
    if json {
        let summary = GrantSummary {
            campaign,
            receipt,
            winners,
            shards,
            height: ledger.meta.height,
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "Granted {shards} shards to {winners} winners for campaign {campaign} (receipt {receipt}, height {})",
            ledger.meta.height
        );
    }
    Ok(())
}

/// Print an account's balance and transaction history.
pub fn print_account(ledger: &LedgerState, account: AccountId) {
    println!("Account {account}: {} shards", ledger.balance(account));
    for tx in ledger.transactions_for(account) {
        println!(
            "  {:>+7} {:<18} -> {:>7}  {}",
            tx.amount,
            tx.kind.as_str(),
            tx.balance_after,
            tx.description.as_deref().unwrap_or(""),
        );
    }
}
