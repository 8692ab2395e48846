//! Accounts and authority records (§3).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::asset::Asset;
use crate::types::{AccountName, ObjectId, PublicKey, Timestamp};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Account {
    pub id: ObjectId,
    pub name: AccountName,
    pub memo_key: PublicKey,
    pub balance: Asset,
    /// Staked "common token" balance — vested, non-transferable voting weight.
    pub common_tokens_balance: Asset,
    /// In-flight withdrawal amount set up by `withdraw_common_tokens`.
    pub withdrawn: Asset,
    pub to_withdraw: Asset,
    pub withdraw_rate: Asset,
    pub next_vesting_withdrawal: Option<Timestamp>,
    pub recovery_account: AccountName,
    /// Accounts that recently changed their owner authority: recovery
    /// against that older owner key is legal within the bounded window
    /// (§4.3); this records when the change took effect.
    pub last_owner_update: Timestamp,
    pub created_at: Timestamp,
    pub proxy: Option<AccountName>,
    pub witnesses_voted_for: u16,
}

/// One weighted slot of an authority: threshold plus weighted accounts and
/// weighted keys (§3 authority record).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Authority {
    pub weight_threshold: u32,
    pub account_auths: BTreeMap<AccountName, u16>,
    pub key_auths: BTreeMap<PublicKey, u16>,
}

impl Authority {
    pub fn is_empty(&self) -> bool {
        self.account_auths.is_empty() && self.key_auths.is_empty()
    }
}

/// Keyed by account: `owner`, `active`, and per-operation-tag overrides
/// of `active` (§3).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthorityRecord {
    pub id: ObjectId,
    pub account: AccountName,
    pub owner: Authority,
    pub active: Authority,
    /// Operation tag (matches `Operation` discriminant name) → override
    /// authority used in place of `active` for that operation (§4.2).
    pub active_overrides: BTreeMap<String, Authority>,
    pub last_owner_update: Timestamp,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AccountRecoveryRequest {
    pub id: ObjectId,
    pub account_to_recover: AccountName,
    pub new_owner_authority: Authority,
    pub expires_at: Timestamp,
}
