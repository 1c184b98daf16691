use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use shardboard_core::{Category, ParticipantId, Rank};
use tracing::{debug, info};

pub type AccountId = ParticipantId;
pub type Amount = u64;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("account {account} holds {available} shards, {requested} requested")]
    InsufficientShards {
        account: AccountId,
        available: Amount,
        requested: Amount,
    },
    #[error("unknown account {account}")]
    UnknownAccount { account: AccountId },
    #[error("shard amounts must be non-zero")]
    ZeroAmount,
    #[error("shard amount {amount} exceeds the largest recordable transaction")]
    AmountTooLarge { amount: Amount },
    #[error("balance of account {account} would overflow")]
    BalanceOverflow { account: AccountId },
    #[error("duplicate receipt detected")]
    DuplicateReceipt,
    #[error("snapshot merkle root {stored} does not match balances ({computed})")]
    SnapshotRootMismatch { stored: Hash32, computed: Hash32 },
}

/// 32-byte digest, hex encoded on the wire.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Hash32(pub [u8; 32]);

impl Hash32 {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash32({})", self.to_hex())
    }
}

impl Serialize for Hash32 {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash32 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        let bytes = hex::decode(&encoded).map_err(D::Error::custom)?;
        let digest: [u8; 32] = bytes
            .try_into()
            .map_err(|_| D::Error::custom("expected 32 bytes of hex"))?;
        Ok(Hash32(digest))
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Referral,
    Poster,
    Purchase,
    AdminGrant,
    AdminDebit,
    Refund,
    LeaderboardPrize,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Referral => "referral",
            TransactionKind::Poster => "poster",
            TransactionKind::Purchase => "purchase",
            TransactionKind::AdminGrant => "admin_grant",
            TransactionKind::AdminDebit => "admin_debit",
            TransactionKind::Refund => "refund",
            TransactionKind::LeaderboardPrize => "leaderboard_prize",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShardTransaction {
    pub account: AccountId,
    /// Positive for credits, negative for debits.
    pub amount: i64,
    pub kind: TransactionKind,
    pub description: Option<String>,
    pub balance_after: Amount,
    pub receipt: Option<Hash32>,
}

/// Shards owed to one leaderboard winner.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PrizeCredit {
    pub account: AccountId,
    pub rank: Rank,
    pub amount: Amount,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerMutation {
    AwardPrizes {
        campaign: String,
        category: Category,
        awards: Vec<PrizeCredit>,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SnapshotMetadata {
    pub height: u64,
    pub timestamp: u64,
    pub previous_receipt: Option<Hash32>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub meta: SnapshotMetadata,
    pub balances: BTreeMap<AccountId, Amount>,
    pub transactions: Vec<ShardTransaction>,
    pub receipts: BTreeSet<Hash32>,
    pub merkle_root: Hash32,
}

#[derive(Clone, Debug, Default)]
pub struct LedgerState {
    pub meta: SnapshotMetadata,
    balances: BTreeMap<AccountId, Amount>,
    transactions: Vec<ShardTransaction>,
    applied_receipts: BTreeSet<Hash32>,
}

impl LedgerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore a ledger, refusing snapshots whose balances were edited.
    pub fn from_snapshot(snapshot: LedgerSnapshot) -> Result<Self, LedgerError> {
        let computed = compute_merkle_root(&snapshot.balances);
        if computed != snapshot.merkle_root {
            return Err(LedgerError::SnapshotRootMismatch {
                stored: snapshot.merkle_root,
                computed,
            });
        }
        Ok(Self {
            meta: snapshot.meta,
            balances: snapshot.balances,
            transactions: snapshot.transactions,
            applied_receipts: snapshot.receipts,
        })
    }

    pub fn balance(&self, account: AccountId) -> Amount {
        self.balances.get(&account).copied().unwrap_or_default()
    }

    #[cfg(test)]
    pub fn transactions(&self) -> &[ShardTransaction] {
        &self.transactions
    }

    pub fn transactions_for(&self, account: AccountId) -> impl Iterator<Item = &ShardTransaction> {
        self.transactions.iter().filter(move |t| t.account == account)
    }

    pub fn has_receipt(&self, receipt_id: &Hash32) -> bool {
        self.applied_receipts.contains(receipt_id)
    }

    pub fn credit_shards(
        &mut self,
        account: AccountId,
        amount: Amount,
        kind: TransactionKind,
        description: Option<String>,
    ) -> Result<&ShardTransaction, LedgerError> {
        self.record_credit(account, amount, kind, description, None)
    }

    pub fn debit_shards(
        &mut self,
        account: AccountId,
        amount: Amount,
        kind: TransactionKind,
        description: Option<String>,
    ) -> Result<&ShardTransaction, LedgerError> {
        self.record_debit(account, amount, kind, description, None)
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            meta: self.meta.clone(),
            balances: self.balances.clone(),
            transactions: self.transactions.clone(),
            receipts: self.applied_receipts.clone(),
            merkle_root: compute_merkle_root(&self.balances),
        }
    }

    /// Apply a batch under `receipt_id`. Either every mutation lands or none
    /// does; a receipt is accepted at most once.
    pub fn apply_mutations(
        &mut self,
        mutations: &[LedgerMutation],
        receipt_id: Hash32,
        timestamp: u64,
    ) -> Result<(), LedgerError> {
        if self.applied_receipts.contains(&receipt_id) {
            return Err(LedgerError::DuplicateReceipt);
        }

        let mut staged = self.clone();
        for mutation in mutations {
            match mutation {
                LedgerMutation::AwardPrizes {
                    campaign,
                    category,
                    awards,
                } => {
                    for award in awards {
                        staged.record_credit(
                            award.account,
                            award.amount,
                            TransactionKind::LeaderboardPrize,
                            Some(format!(
                                "campaign:{campaign} {category} leaderboard rank {}",
                                award.rank
                            )),
                            Some(receipt_id),
                        )?;
                    }
                }
            }
        }

        staged.meta.height += 1;
        staged.meta.timestamp = timestamp;
        staged.meta.previous_receipt = Some(receipt_id);
        staged.applied_receipts.insert(receipt_id);
        *self = staged;

        info!(
            receipt = %receipt_id,
            height = self.meta.height,
            mutations = mutations.len(),
            "ledger batch applied"
        );
        Ok(())
    }

    fn record_credit(
        &mut self,
        account: AccountId,
        amount: Amount,
        kind: TransactionKind,
        description: Option<String>,
        receipt: Option<Hash32>,
    ) -> Result<&ShardTransaction, LedgerError> {
        let signed = signed_amount(amount)?;
        // Balances stay within i64 so history sums never overflow.
        let balance_after = self
            .balance(account)
            .checked_add(amount)
            .filter(|b| i64::try_from(*b).is_ok())
            .ok_or(LedgerError::BalanceOverflow { account })?;
        self.balances.insert(account, balance_after);
        debug!(account, amount, balance_after, ?kind, "shards credited");
        self.push(ShardTransaction {
            account,
            amount: signed,
            kind,
            description,
            balance_after,
            receipt,
        })
    }

    fn record_debit(
        &mut self,
        account: AccountId,
        amount: Amount,
        kind: TransactionKind,
        description: Option<String>,
        receipt: Option<Hash32>,
    ) -> Result<&ShardTransaction, LedgerError> {
        let signed = signed_amount(amount)?;
        let balance = self
            .balances
            .get_mut(&account)
            .ok_or(LedgerError::UnknownAccount { account })?;
        if *balance < amount {
            return Err(LedgerError::InsufficientShards {
                account,
                available: *balance,
                requested: amount,
            });
        }
        *balance -= amount;
        let balance_after = *balance;
        debug!(account, amount, balance_after, ?kind, "shards debited");
        self.push(ShardTransaction {
            account,
            amount: -signed,
            kind,
            description,
            balance_after,
            receipt,
        })
    }

    fn push(&mut self, transaction: ShardTransaction) -> Result<&ShardTransaction, LedgerError> {
        self.transactions.push(transaction);
        Ok(&self.transactions[self.transactions.len() - 1])
    }
}

fn signed_amount(amount: Amount) -> Result<i64, LedgerError> {
    if amount == 0 {
        return Err(LedgerError::ZeroAmount);
    }
    i64::try_from(amount).map_err(|_| LedgerError::AmountTooLarge { amount })
}

fn compute_merkle_root(balances: &BTreeMap<AccountId, Amount>) -> Hash32 {
    let leaves: Vec<[u8; 32]> = balances
        .iter()
        .map(|(account, balance)| {
            let mut hasher = Sha256::new();
            hasher.update(b"acct");
            hasher.update(account.to_le_bytes());
            hasher.update(balance.to_le_bytes());
            hasher.finalize().into()
        })
        .collect();
    Hash32(build_merkle(leaves))
}

fn build_merkle(mut leaves: Vec<[u8; 32]>) -> [u8; 32] {
    if leaves.is_empty() {
        return Sha256::digest(b"shard-ledger-empty").into();
    }
    while leaves.len() > 1 {
        let mut next = Vec::with_capacity(leaves.len().div_ceil(2));
        for chunk in leaves.chunks(2) {
            let mut hasher = Sha256::new();
            hasher.update(b"node");
            hasher.update(chunk[0]);
            if chunk.len() == 2 {
                hasher.update(chunk[1]);
            } else {
                hasher.update(chunk[0]);
            }
            next.push(hasher.finalize().into());
        }
        leaves = next;
    }
    leaves[0]
}
