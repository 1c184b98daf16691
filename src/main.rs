mod config;
mod grants;
mod ledger;
mod output;

use std::{
    fs,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use clap::Parser;
use shardboard_core::{
    build_page, Category, LeaderboardMember, LeaderboardQuery, ParticipantId, PrizeAward,
    PrizeResult, RankingEngine,
};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{config_path, create_default_config, load_config, ShardboardConfig};
use crate::grants::PrizeGrant;
use crate::ledger::{LedgerSnapshot, LedgerState, TransactionKind};

pub fn bail(msg: impl std::fmt::Display) -> ! {
    eprintln!("error: {msg}");
    std::process::exit(2);
}

#[derive(Parser)]
#[command(
    name = "shardboard",
    version,
    about = "Rank referral leaderboards and grant shard prizes"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Render one page of a leaderboard with ranks and prizes
    Rank(RankArgs),
    /// Credit the referral leaderboard prizes into a ledger file
    Grant(GrantArgs),
    /// Credit (positive) or debit (negative) shards by hand
    Adjust(AdjustArgs),
    /// Show an account's balance and history
    Balance(BalanceArgs),
    /// Create a default config file at ~/.config/shardboard/config.toml
    Init(InitArgs),
}

#[derive(clap::Args)]
struct RankArgs {
    /// JSON array of leaderboard members
    #[arg(short, long)]
    input: PathBuf,

    /// referrals, posters or shards (anything else falls back to referrals)
    #[arg(short, long, default_value = "referrals")]
    category: String,

    #[arg(short, long, default_value_t = 1)]
    page: u32,

    /// Case-insensitive display name filter
    #[arg(short, long)]
    search: Option<String>,

    #[arg(long)]
    page_size: Option<usize>,

    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    json: bool,
}

#[derive(clap::Args)]
struct GrantArgs {
    #[arg(short, long)]
    input: PathBuf,

    /// Ledger snapshot; created when missing
    #[arg(short, long)]
    ledger: PathBuf,

    #[arg(long)]
    campaign: Option<String>,

    #[arg(long)]
    page_size: Option<usize>,

    /// Unix seconds recorded on the ledger batch (default: now)
    #[arg(long)]
    timestamp: Option<u64>,

    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    json: bool,
}

#[derive(clap::Args)]
struct AdjustArgs {
    #[arg(short, long)]
    ledger: PathBuf,

    #[arg(short, long)]
    account: ParticipantId,

    #[arg(long, allow_negative_numbers = true)]
    amount: i64,

    /// Recorded transaction type (default: admin-grant / admin-debit by sign)
    #[arg(short, long, value_enum)]
    kind: Option<TransactionKind>,

    #[arg(short, long)]
    reason: Option<String>,
}

#[derive(clap::Args)]
struct BalanceArgs {
    #[arg(short, long)]
    ledger: PathBuf,

    #[arg(short, long)]
    account: ParticipantId,
}

#[derive(clap::Args)]
struct InitArgs {
    /// Write somewhere other than the default location
    #[arg(long)]
    path: Option<PathBuf>,
}

fn resolve_config(explicit: Option<&Path>) -> ShardboardConfig {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => match config_path() {
            Ok(p) => p,
            Err(e) => {
                warn!("{e}, using built-in defaults");
                return ShardboardConfig::default();
            }
        },
    };
    load_config(&path).unwrap_or_else(|e| bail(e))
}

fn read_members(path: &Path) -> Vec<LeaderboardMember> {
    let bytes = fs::read(path)
        .unwrap_or_else(|e| bail(format!("failed to read {}: {e}", path.display())));
    serde_json::from_slice(&bytes)
        .unwrap_or_else(|e| bail(format!("failed to parse members in {}: {e}", path.display())))
}

fn load_ledger(path: &Path) -> LedgerState {
    if !path.exists() {
        info!("no ledger at {}, starting empty", path.display());
        return LedgerState::new();
    }
    let bytes = fs::read(path)
        .unwrap_or_else(|e| bail(format!("failed to read ledger {}: {e}", path.display())));
    let snapshot: LedgerSnapshot = serde_json::from_slice(&bytes)
        .unwrap_or_else(|e| bail(format!("failed to parse ledger {}: {e}", path.display())));
    LedgerState::from_snapshot(snapshot).unwrap_or_else(|e| bail(e))
}

fn write_ledger(path: &Path, ledger: &LedgerState) -> Result<(), String> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| format!("failed to create {}: {e}", parent.display()))?;
    }
    let json = serde_json::to_vec_pretty(&ledger.snapshot()).map_err(|e| e.to_string())?;
    fs::write(path, json)
        .map_err(|e| format!("failed to write ledger {}: {e}", path.display()))
}

fn save_ledger(path: &Path, ledger: &LedgerState) {
    write_ledger(path, ledger).unwrap_or_else(|e| bail(e));
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn rank_cmd(args: RankArgs) {
    let config = resolve_config(args.config.as_deref());
    let prizes = config.prize_table().unwrap_or_else(|e| bail(e));
    let members = read_members(&args.input);

    let query = LeaderboardQuery {
        category: Category::parse_or_default(&args.category),
        page: args.page,
        search: args.search,
        page_size: args.page_size.unwrap_or_else(|| config.page_size()),
    };
    info!(category = %query.category, page = query.page, members = members.len(), "building leaderboard page");
    let page = build_page(&members, &query, &prizes).unwrap_or_else(|e| bail(e));

    if args.json {
        output::print_json(&page).unwrap_or_else(|e| bail(e));
    } else {
        output::print_table(&page);
    }
}

fn grant_cmd(args: GrantArgs) {
    let config = resolve_config(args.config.as_deref());
    let prizes = config.prize_table().unwrap_or_else(|e| bail(e));
    let campaign = args
        .campaign
        .or(config.campaign.clone())
        .unwrap_or_else(|| bail("missing --campaign (or `campaign` in config)"));
    let members = read_members(&args.input);

    let engine = RankingEngine::new(Category::Referrals, 1, prizes);
    let query = LeaderboardQuery {
        category: engine.category(),
        page: engine.page(),
        search: None,
        page_size: args.page_size.unwrap_or_else(|| config.page_size()),
    };
    let page = build_page(&members, &query, engine.prizes()).unwrap_or_else(|e| bail(e));
    let awards: PrizeResult = page
        .rows
        .iter()
        .filter_map(|row| {
            let award = PrizeAward {
                rank: row.rank?,
                shards: row.prize?,
            };
            Some((row.id, award))
        })
        .collect();

    let grant = PrizeGrant::new(campaign, engine.category());
    let mutations = grant.mutations(&awards);
    if mutations.is_empty() {
        warn!("no qualifying participants, nothing to grant");
        return;
    }
    let receipt = grant.receipt_id(&awards);

    let mut ledger = load_ledger(&args.ledger);
    if ledger.has_receipt(&receipt) {
        bail(format!(
            "these standings were already granted for campaign {} (receipt {receipt})",
            grant.campaign
        ));
    }
    ledger
        .apply_mutations(&mutations, receipt, args.timestamp.unwrap_or_else(now_unix))
        .unwrap_or_else(|e| bail(e));
    save_ledger(&args.ledger, &ledger);

    output::print_grant_summary(
        &grant.campaign,
        receipt,
        grant.credits(&awards).len(),
        grant.total(&awards),
        &ledger,
        args.json,
    )
    .unwrap_or_else(|e| bail(e));
}

fn adjust_cmd(args: AdjustArgs) {
    let mut ledger = load_ledger(&args.ledger);
    let amount = args.amount.unsigned_abs();
    let result = if args.amount >= 0 {
        let kind = args.kind.unwrap_or(TransactionKind::AdminGrant);
        ledger.credit_shards(args.account, amount, kind, args.reason)
    } else {
        let kind = args.kind.unwrap_or(TransactionKind::AdminDebit);
        ledger.debit_shards(args.account, amount, kind, args.reason)
    };
    let balance_after = result.map(|tx| tx.balance_after).unwrap_or_else(|e| bail(e));
    save_ledger(&args.ledger, &ledger);
    println!("Account {} balance → {balance_after}", args.account);
}

fn balance_cmd(args: BalanceArgs) {
    let ledger = load_ledger(&args.ledger);
    output::print_account(&ledger, args.account);
}

fn init_cmd(args: InitArgs) {
    let path = match args.path {
        Some(p) => p,
        None => config_path().unwrap_or_else(|e| bail(e)),
    };
    create_default_config(&path).unwrap_or_else(|e| bail(e));
    println!("Config written → {}", path.display());
}

fn main() {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Rank(args) => rank_cmd(args),
        Commands::Grant(args) => grant_cmd(args),
        Commands::Adjust(args) => adjust_cmd(args),
        Commands::Balance(args) => balance_cmd(args),
        Commands::Init(args) => init_cmd(args),
    }
}
