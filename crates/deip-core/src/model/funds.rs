//! Vesting balances and budgets (§3): the two scheduled fund-flow records
//! a block's post-apply sweep advances.

use serde::{Deserialize, Serialize};

use crate::asset::Asset;
use crate::types::{AccountName, ObjectId, Timestamp};

/// A vested grant that unlocks linearly after `cliff_seconds`, paying out
/// once per `period_seconds` until `total_duration_seconds` has elapsed.
/// Invariants: `total_duration_seconds > cliff_seconds >= 0` and
/// `total_duration_seconds % period_seconds == 0` (§3).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VestingBalance {
    pub id: ObjectId,
    pub owner: AccountName,
    pub balance: Asset,
    pub withdrawn: Asset,
    pub cliff_seconds: i64,
    pub total_duration_seconds: i64,
    pub period_seconds: i64,
    pub start_time: Timestamp,
}

impl VestingBalance {
    /// Number of whole periods elapsed since `start_time + cliff_seconds`,
    /// capped at the total number of periods in the grant. Zero before the
    /// cliff has passed (§8 boundary: pays nothing at `cliff - 1`, pays
    /// the first period exactly at `cliff`).
    pub fn periods_vested(&self, now: Timestamp) -> i64 {
        let elapsed = now - (self.start_time + self.cliff_seconds);
        if elapsed < 0 {
            return 0;
        }
        let total_periods = self.total_duration_seconds / self.period_seconds;
        let elapsed_periods = elapsed / self.period_seconds + 1;
        elapsed_periods.min(total_periods)
    }
}

/// A per-block payout source. `owner` may be the root genesis account for
/// chain-level budgets created outside any user's balance (grounded on
/// the original's fund budget / account budget split).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Budget {
    pub id: ObjectId,
    pub owner: AccountName,
    pub balance: Asset,
    pub per_block: Asset,
    pub deadline: Timestamp,
    pub last_allocated_block: u64,
    pub created_at: Timestamp,
}

impl Budget {
    /// True once this budget has nothing left to pay out or has reached
    /// its deadline; the sweep closes it and returns any remainder.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.balance.amount <= 0 || now >= self.deadline
    }
}
