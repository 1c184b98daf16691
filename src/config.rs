/// Config file loading and creation for the shardboard CLI.
///
/// Config lives at ~/.config/shardboard/config.toml.
/// All fields are optional; CLI flags override config values.
use serde::Deserialize;
use shardboard_core::{PrizeTable, PrizeTier, RankingError, DEFAULT_PAGE_SIZE, MINIMUM_PRIZE_SHARDS};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("HOME environment variable not set")]
    NoHome,
    #[error("failed to read config at {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("config file already exists at {0}")]
    AlreadyExists(PathBuf),
    #[error("failed to write config to {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Prizes(#[from] RankingError),
}

#[derive(Deserialize, Default, Debug)]
pub struct ShardboardConfig {
    pub page_size: Option<usize>,
    pub campaign: Option<String>,
    pub prizes: Option<PrizesConfig>,
}

#[derive(Deserialize, Debug)]
pub struct PrizesConfig {
    pub minimum_award: Option<u64>,
    #[serde(default)]
    pub tiers: Vec<PrizeTier>,
}

impl ShardboardConfig {
    pub fn page_size(&self) -> usize {
        self.page_size.unwrap_or(DEFAULT_PAGE_SIZE)
    }

    /// A `[prizes]` table without tiers keeps the default pools.
    pub fn prize_table(&self) -> Result<PrizeTable, ConfigError> {
        let Some(prizes) = &self.prizes else {
            return Ok(PrizeTable::default());
        };
        let minimum = prizes.minimum_award.unwrap_or(MINIMUM_PRIZE_SHARDS);
        let table = if prizes.tiers.is_empty() {
            let defaults: Vec<PrizeTier> = PrizeTable::default().tiers().collect();
            PrizeTable::from_tiers(&defaults, minimum)?
        } else {
            PrizeTable::from_tiers(&prizes.tiers, minimum)?
        };
        Ok(table)
    }
}

const DEFAULT_CONFIG_TEMPLATE: &str = "\
# shardboard configuration
# All values here can be overridden by CLI flags.

# Rows per leaderboard page. Only page 1 of the referral leaderboard is ranked.
# page_size = 50

# Campaign id used in grant receipts when --campaign is not given
# campaign = \"spring-giveaway\"

# Prize pools per rank, split evenly between tied participants.
# Shares are rounded down; nobody gets less than minimum_award.
# [prizes]
# minimum_award = 1
#
# [[prizes.tiers]]
# rank = 1
# pool = 50
#
# [[prizes.tiers]]
# rank = 2
# pool = 25
#
# [[prizes.tiers]]
# rank = 3
# pool = 10
";

/// Returns the default config path: ~/.config/shardboard/config.toml
pub fn config_path() -> Result<PathBuf, ConfigError> {
    let home = std::env::var("HOME").map_err(|_| ConfigError::NoHome)?;
    Ok(PathBuf::from(home)
        .join(".config")
        .join("shardboard")
        .join("config.toml"))
}

/// Load config from a file path. Returns default (all None) if file doesn't exist.
pub fn load_config(path: &Path) -> Result<ShardboardConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => parse_config(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ShardboardConfig::default()),
        Err(source) => Err(ConfigError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn parse_config(content: &str) -> Result<ShardboardConfig, toml::de::Error> {
    toml::from_str(content)
}

/// Create the default config file. Errors if it already exists.
pub fn create_default_config(path: &Path) -> Result<(), ConfigError> {
    if path.exists() {
        return Err(ConfigError::AlreadyExists(path.to_path_buf()));
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    std::fs::write(path, DEFAULT_CONFIG_TEMPLATE).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}
