//! Witness schedule shuffle (§4.7): every `next_shuffle_block_num` blocks,
//! rank witnesses by vote, add one virtual-time runner, and shuffle the
//! result with a PRNG seeded from the schedule's own virtual clock so every
//! node reshuffles identically.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use deip_core::constants::{MAX_RUNNER_WITNESSES, MAX_VOTED_WITNESSES, VIRTUAL_SCHEDULE_LAP_LENGTH};
use deip_core::error::DeipError;
use deip_core::model::{Witness, WitnessSchedule};
use deip_core::types::AccountName;

use deip_chainbase::Database;

/// Runs one shuffle round if `head_block_num` has reached the schedule's
/// `next_shuffle_block_num`; a no-op on every other block.
pub fn maybe_shuffle(db: &mut Database, head_block_num: u64) -> Result<(), DeipError> {
    if head_block_num < db.witness_schedule().next_shuffle_block_num {
        return Ok(());
    }
    shuffle_witnesses(db)
}

fn shuffle_witnesses(db: &mut Database) -> Result<(), DeipError> {
    let mut ranked: Vec<&Witness> = db.all_witnesses();
    ranked.sort_by(|a, b| b.votes.cmp(&a.votes).then_with(|| a.owner.cmp(&b.owner)));

    let top: Vec<AccountName> = ranked.iter().take(MAX_VOTED_WITNESSES).map(|w| w.owner.clone()).collect();
    let remaining: Vec<AccountName> = ranked.iter().skip(MAX_VOTED_WITNESSES).map(|w| w.owner.clone()).collect();

    let mut selected = top;
    if let Some(runner) = pick_runner(db, &remaining)? {
        selected.push(runner);
    }

    for name in &selected {
        let id = db.get_witness(name)?.id;
        db.modify::<Witness>(id, |w| w.total_missed = 0)?;
    }

    let schedule_id = db.witness_schedule().id;
    let seed = seed_from_virtual_time(db.witness_schedule().current_virtual_time);
    let mut rng = ChaCha8Rng::from_seed(seed);
    selected.shuffle(&mut rng);

    let num_scheduled = selected.len() as u8;
    let round_length = selected.len().max(1) as u64;
    db.modify::<WitnessSchedule>(schedule_id, |s| {
        s.current_shuffled_witnesses = selected;
        s.num_scheduled_witnesses = num_scheduled;
        s.top_voted_witnesses = top_count(num_scheduled);
        s.runner_witnesses = num_scheduled.saturating_sub(top_count(num_scheduled));
        s.next_shuffle_block_num += round_length;
    })?;
    Ok(())
}

fn top_count(num_scheduled: u8) -> u8 {
    num_scheduled.min(MAX_VOTED_WITNESSES as u8)
}

fn seed_from_virtual_time(virtual_time: u128) -> [u8; 32] {
    let mut seed = [0u8; 32];
    seed[..16].copy_from_slice(&virtual_time.to_le_bytes());
    seed
}

/// Picks the runner witness with the smallest `virtual_scheduled_time`
/// among `candidates`, then advances its virtual-time bookkeeping by one
/// lap so it falls to the back of the rotation (§4.7).
fn pick_runner(db: &mut Database, candidates: &[AccountName]) -> Result<Option<AccountName>, DeipError> {
    if candidates.is_empty() || MAX_RUNNER_WITNESSES == 0 {
        return Ok(None);
    }
    let winner = candidates
        .iter()
        .min_by_key(|name| db.get_witness(name).map(|w| w.virtual_scheduled_time).unwrap_or(u128::MAX))
        .cloned();
    let Some(winner) = winner else {
        return Ok(None);
    };

    let witness = db.get_witness(&winner)?;
    let votes = witness.votes.max(1) as u128;
    let next_scheduled_time =
        witness.virtual_last_update + (VIRTUAL_SCHEDULE_LAP_LENGTH.saturating_sub(witness.virtual_position)) / votes;
    let witness_id = witness.id;

    db.modify::<Witness>(witness_id, |w| {
        w.virtual_position = 0;
        w.virtual_scheduled_time = next_scheduled_time;
        w.virtual_last_update = next_scheduled_time;
    })?;
    Ok(Some(winner))
}

#[cfg(test)]
mod tests {
    use super::*;
    use deip_core::asset::Asset;
    use deip_core::model::DynamicGlobalProperties;
    use deip_core::types::{PublicKey, Sha256Digest};

    fn seed_witness(db: &mut Database, name: &str, votes: u64) {
        let owner = AccountName::new_unchecked(name);
        db.create_witness(|id| Witness {
            id,
            owner,
            signing_key: PublicKey([1u8; 33]),
            votes,
            schedule: deip_core::model::WitnessScheduleSlot::None,
            virtual_last_update: 0,
            virtual_position: 0,
            virtual_scheduled_time: 0,
            total_missed: 0,
            last_confirmed_block_num: 0,
            created_at: 0,
        });
    }

    fn seed_db() -> Database {
        let mut db = Database::new();
        db.create(|id| DynamicGlobalProperties {
            id,
            head_block_number: 0,
            head_block_id: Sha256Digest([0u8; 32]),
            head_block_time: 0,
            current_witness: AccountName::new_unchecked("initminer"),
            current_supply: Asset::core(0),
            maximum_block_size: 131_072,
            current_aslot: 0,
            recent_slots_filled: 0,
            last_irreversible_block_num: 0,
        });
        db.create(|id| WitnessSchedule {
            id,
            current_shuffled_witnesses: vec![],
            current_virtual_time: 0,
            next_shuffle_block_num: 1,
            num_scheduled_witnesses: 0,
            top_voted_witnesses: 0,
            runner_witnesses: 0,
            witness_pay_normalization_factor: 0,
            majority_version: 0,
            median_maximum_block_size: 131_072,
        });
        db
    }

    #[test]
    fn shuffle_selects_every_registered_witness_when_below_the_cap() {
        let mut db = seed_db();
        for i in 0..5 {
            seed_witness(&mut db, &format!("witness{i}"), (5 - i) as u64);
        }
        maybe_shuffle(&mut db, 1).unwrap();
        assert_eq!(db.witness_schedule().current_shuffled_witnesses.len(), 5);
        assert_eq!(db.witness_schedule().num_scheduled_witnesses, 5);
    }

    #[test]
    fn shuffle_is_a_no_op_before_the_next_shuffle_block() {
        let mut db = seed_db();
        seed_witness(&mut db, "witness0", 1);
        maybe_shuffle(&mut db, 1).unwrap();
        let first_round_end = db.witness_schedule().next_shuffle_block_num;
        maybe_shuffle(&mut db, first_round_end - 1).unwrap();
        assert_eq!(db.witness_schedule().next_shuffle_block_num, first_round_end);
    }
}
