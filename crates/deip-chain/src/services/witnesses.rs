//! Witness registration and vote/proxy bookkeeping (§4.3 witness
//! categories, §4.7 scheduler inputs). The scheduler itself lives in a
//! separate crate; this module only keeps the vote totals it reads
//! correct as accounts register, vote, or move balance.

use deip_core::error::DeipError;
use deip_core::model::{Witness, WitnessScheduleSlot};
use deip_core::types::{AccountName, PublicKey, Timestamp};

use deip_chainbase::Database;

use crate::services::accounts::recompute_witness_votes;

/// Registers a new witness, or updates an existing one's signing key
/// in place (§4.3 `witness_update`). A missed-block counter reset is
/// intentionally not part of this path: only the scheduler clears it,
/// on a successful confirmed block.
pub fn witness_update(db: &mut Database, owner: &AccountName, signing_key: PublicKey, now: Timestamp) -> Result<(), DeipError> {
    match db.find_witness(owner) {
        Some(w) => {
            let id = w.id;
            db.modify::<Witness>(id, |w| w.signing_key = signing_key)?;
        }
        None => {
            db.create_witness(|id| Witness {
                id,
                owner: owner.clone(),
                signing_key,
                votes: 0,
                schedule: WitnessScheduleSlot::None,
                virtual_last_update: 0,
                virtual_position: 0,
                virtual_scheduled_time: 0,
                total_missed: 0,
                last_confirmed_block_num: 0,
                created_at: now,
            });
        }
    }
    Ok(())
}

/// Casts (or, if the pair already exists, leaves unchanged) `voter`'s
/// vote for `witness`, then refreshes the witness's vote total.
pub fn account_witness_vote(db: &mut Database, voter: &AccountName, witness: &AccountName, approve: bool) -> Result<(), DeipError> {
    db.get_witness(witness)?;
    db.get_account_by_name(voter)?;

    if approve {
        if db.find_witness_vote(witness, voter).is_none() {
            db.create_witness_vote(witness.clone(), voter.clone())?;
        }
    } else if db.find_witness_vote(witness, voter).is_some() {
        db.remove_witness_vote(witness, voter)?;
    }

    recompute_witness_votes(db, witness)
}

/// Sets (or clears) `account`'s voting proxy, then recomputes every
/// witness `account` had directly voted for — their weight now flows
/// through (or no longer flows through) the new proxy chain (§4.3).
pub fn account_witness_proxy(db: &mut Database, account: &AccountName, proxy: Option<AccountName>) -> Result<(), DeipError> {
    let affected = witnesses_voted_by(db, account);
    crate::services::accounts::set_voting_proxy(db, account, proxy)?;
    for witness in affected {
        recompute_witness_votes(db, &witness)?;
    }
    Ok(())
}

/// Recomputes every witness `account` directly votes for — used whenever
/// `account`'s own stake changes (e.g. staking more common tokens),
/// since that stake is what those witnesses' vote totals are built from.
pub fn recompute_affected_witnesses(db: &mut Database, account: &AccountName) -> Result<(), DeipError> {
    for witness in witnesses_voted_by(db, account) {
        recompute_witness_votes(db, &witness)?;
    }
    Ok(())
}

fn witnesses_voted_by(db: &Database, account: &AccountName) -> Vec<AccountName> {
    db.all_witnesses()
        .into_iter()
        .filter(|w| db.find_witness_vote(&w.owner, account).is_some())
        .map(|w| w.owner.clone())
        .collect()
}
