//! Vesting balances and budgets (§3, §4.8 post-apply fund-flow sweeps).
//! Both are scheduled payout sources the pipeline advances once per
//! block; grounded on the original's fund-budget allocation pass.

use deip_core::error::DeipError;
use deip_core::model::{Budget, VestingBalance};
use deip_core::types::{AccountName, Timestamp};
use deip_core::virtual_op::VirtualOperation;

use deip_chainbase::Database;

use crate::services::accounts::transfer_balance_in;

/// Pays out any vesting balance whose next period has matured since its
/// last payout, crediting `owner`'s core-asset balance with exactly one
/// period's share and bumping `withdrawn` so the next sweep doesn't
/// double-pay (§3 `VestingBalance::periods_vested`).
pub fn process_vesting_withdrawals(db: &mut Database, now: Timestamp) -> Result<Vec<VirtualOperation>, DeipError> {
    let owners: Vec<AccountName> = db.iter::<VestingBalance>().map(|(_, v)| v.owner.clone()).collect();

    let mut emitted = Vec::new();
    for owner in owners {
        for vb in db.vesting_balances_for(&owner) {
            let id = vb.id;
            let total_periods = vb.total_duration_seconds / vb.period_seconds;
            let per_period = vb.balance.checked_add(&vb.withdrawn)?.amount / total_periods.max(1);
            let vested_periods = vb.periods_vested(now);
            let already_paid_periods = if per_period == 0 { vested_periods } else { vb.withdrawn.amount / per_period };
            let owed_periods = (vested_periods - already_paid_periods).max(0);
            if owed_periods == 0 {
                continue;
            }
            let remaining = vb.balance;
            let mut payout = deip_core::asset::Asset::new(per_period * owed_periods, remaining.symbol);
            if payout.amount > remaining.amount {
                payout = remaining;
            }
            if payout.amount <= 0 {
                continue;
            }

            let new_balance = db.get::<VestingBalance>(id)?.balance.checked_sub(&payout)?;
            let new_withdrawn = db.get::<VestingBalance>(id)?.withdrawn.checked_add(&payout)?;
            db.modify::<VestingBalance>(id, |v| {
                v.balance = new_balance;
                v.withdrawn = new_withdrawn;
            })?;
            transfer_balance_in(db, &owner, payout)?;
            emitted.push(VirtualOperation::FillVestingWithdraw {
                from_account: owner.clone(),
                to_account: owner.clone(),
                withdrawn: new_withdrawn,
                deposited: payout,
            });
        }
    }
    Ok(emitted)
}

/// Pays every budget's `per_block` share to its owner once per block,
/// closing (and refunding any undistributed remainder of) any budget
/// that has run dry or passed its deadline (original `allocate_cash` /
/// `close_budget`).
pub fn process_budgets(db: &mut Database, head_block_num: u64, now: Timestamp) -> Result<(), DeipError> {
    let candidates: Vec<deip_core::types::ObjectId> = db.all_budgets().into_iter().map(|(id, _)| id).collect();

    for id in candidates {
        let budget = db.get::<Budget>(id)?.clone();
        if budget.last_allocated_block >= head_block_num {
            continue;
        }

        let payout = if budget.per_block.amount <= budget.balance.amount { budget.per_block } else { budget.balance };
        if payout.amount > 0 {
            let new_balance = budget.balance.checked_sub(&payout)?;
            db.modify::<Budget>(id, |b| b.balance = new_balance)?;
            transfer_balance_in(db, &budget.owner, payout)?;
        }

        let budget = db.get::<Budget>(id)?.clone();
        if budget.is_expired(now) {
            if budget.balance.amount > 0 {
                transfer_balance_in(db, &budget.owner, budget.balance)?;
            }
            db.remove_budget(id)?;
        } else {
            db.modify::<Budget>(id, |b| b.last_allocated_block = head_block_num)?;
        }
    }
    Ok(())
}
