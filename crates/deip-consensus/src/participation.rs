//! Missed-block accounting and irreversibility advance (§4.7). Both read
//! the same rolling per-witness bookkeeping the scheduler maintains, so
//! they live next to it rather than inside `deip-chain`.

use deip_core::constants::MAX_WITNESS_MISSED_BLOCKS;
use deip_core::error::DeipError;
use deip_core::model::{DynamicGlobalProperties, Witness};
use deip_core::types::{AccountName, PublicKey};

use deip_chainbase::Database;

/// Records that `witness`'s scheduled slot passed without a block:
/// increments `total_missed`, clearing the signing key once the chain-wide
/// limit is reached within the current shuffle window so the witness must
/// re-register before producing again.
pub fn record_missed_slot(db: &mut Database, witness: &AccountName) -> Result<(), DeipError> {
    let id = db.get_witness(witness)?.id;
    let total_missed = db.get_witness(witness)?.total_missed + 1;
    db.modify::<Witness>(id, |w| {
        w.total_missed = total_missed;
        if total_missed >= MAX_WITNESS_MISSED_BLOCKS {
            w.signing_key = PublicKey([0u8; 33]);
        }
    })?;
    Ok(())
}

/// Records that `witness` produced the current block, `slots_elapsed`
/// slots after the previous one: advances `current_aslot` by that many
/// slots, shifts the rolling participation bitset the same distance
/// (every skipped slot is a zero bit), and stores the witness's own
/// confirmation of this block number.
pub fn record_produced_slot(db: &mut Database, witness: &AccountName, head_block_num: u64, slots_elapsed: u64) -> Result<(), DeipError> {
    let witness_id = db.get_witness(witness)?.id;
    db.modify::<Witness>(witness_id, |w| {
        w.last_confirmed_block_num = head_block_num;
    })?;

    let props_id = db.dynamic_global_properties().id;
    let shift = slots_elapsed.max(1).min(128) as u32;
    db.modify::<DynamicGlobalProperties>(props_id, |p| {
        p.recent_slots_filled = if shift >= 128 { 1 } else { (p.recent_slots_filled << shift) | 1 };
        p.current_aslot += slots_elapsed.max(1);
    })?;
    Ok(())
}

/// Advances `last_irreversible_block_num` to the median
/// `last_confirmed_block_num` across the active schedule — monotonic,
/// since a witness only reports a block number it actually produced.
pub fn advance_irreversibility(db: &mut Database) -> Result<(), DeipError> {
    let schedule = db.witness_schedule().current_shuffled_witnesses.clone();
    if schedule.is_empty() {
        return Ok(());
    }
    let mut confirmed: Vec<u64> = schedule.iter().filter_map(|name| db.find_witness(name)).map(|w| w.last_confirmed_block_num).collect();
    if confirmed.is_empty() {
        return Ok(());
    }
    confirmed.sort_unstable();
    let median = confirmed[confirmed.len() / 2];

    let props_id = db.dynamic_global_properties().id;
    if median > db.dynamic_global_properties().last_irreversible_block_num {
        db.modify::<DynamicGlobalProperties>(props_id, |p| p.last_irreversible_block_num = median)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use deip_core::asset::Asset;
    use deip_core::model::{Witness, WitnessSchedule, WitnessScheduleSlot};
    use deip_core::types::Sha256Digest;

    fn seed_db_with_witness(name: &str) -> Database {
        let mut db = Database::new();
        db.create(|id| DynamicGlobalProperties {
            id,
            head_block_number: 0,
            head_block_id: Sha256Digest([0u8; 32]),
            head_block_time: 0,
            current_witness: AccountName::new_unchecked(name),
            current_supply: Asset::core(0),
            maximum_block_size: 131_072,
            current_aslot: 0,
            recent_slots_filled: 0,
            last_irreversible_block_num: 0,
        });
        db.create_witness(|id| Witness {
            id,
            owner: AccountName::new_unchecked(name),
            signing_key: PublicKey([1u8; 33]),
            votes: 1,
            schedule: WitnessScheduleSlot::Top20,
            virtual_last_update: 0,
            virtual_position: 0,
            virtual_scheduled_time: 0,
            total_missed: 0,
            last_confirmed_block_num: 0,
            created_at: 0,
        });
        db.create(|id| WitnessSchedule {
            id,
            current_shuffled_witnesses: vec![AccountName::new_unchecked(name)],
            current_virtual_time: 0,
            next_shuffle_block_num: 1,
            num_scheduled_witnesses: 1,
            top_voted_witnesses: 1,
            runner_witnesses: 0,
            witness_pay_normalization_factor: 0,
            majority_version: 0,
            median_maximum_block_size: 131_072,
        });
        db
    }

    #[test]
    fn missed_blocks_clear_the_signing_key_once_the_limit_is_reached() {
        let mut db = seed_db_with_witness("witness0");
        let name = AccountName::new_unchecked("witness0");
        for _ in 0..MAX_WITNESS_MISSED_BLOCKS {
            record_missed_slot(&mut db, &name).unwrap();
        }
        assert_eq!(db.get_witness(&name).unwrap().signing_key, PublicKey([0u8; 33]));
    }

    #[test]
    fn irreversibility_advances_to_the_median_confirmed_block() {
        let mut db = seed_db_with_witness("witness0");
        let name = AccountName::new_unchecked("witness0");
        record_produced_slot(&mut db, &name, 5, 1).unwrap();
        advance_irreversibility(&mut db).unwrap();
        assert_eq!(db.dynamic_global_properties().last_irreversible_block_num, 5);
    }
}
