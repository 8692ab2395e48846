//! Deferred multi-sig proposals (§3, §4.6).

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::transaction::Transaction;
use crate::types::{AccountName, ExternalId, ObjectId, PublicKey, Timestamp};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ObjectId,
    pub external_id: ExternalId,
    pub proposed_transaction: Transaction,
    pub proposer: AccountName,
    pub expiration_time: Timestamp,
    pub review_period_seconds: Option<u32>,
    pub active_approvals: BTreeSet<AccountName>,
    pub owner_approvals: BTreeSet<AccountName>,
    pub key_approvals: BTreeSet<PublicKey>,
    pub is_completed: bool,
}

impl Proposal {
    /// Collects the pre-approved weights `verify_authority` should treat
    /// as already satisfied for this proposal's current approval sets
    /// (§4.6 `is_authorized_to_execute`).
    pub fn preapproved_active(&self) -> &BTreeSet<AccountName> {
        &self.active_approvals
    }

    pub fn preapproved_owner(&self) -> &BTreeSet<AccountName> {
        &self.owner_approvals
    }
}
