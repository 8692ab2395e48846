//! Witnesses, scheduling state, and the chain-wide properties the
//! scheduler and pipeline maintain each block (§3, §4.7).

use serde::{Deserialize, Serialize};

use crate::asset::Asset;
use crate::types::{AccountName, BlockId, ObjectId, PublicKey, Timestamp};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WitnessScheduleSlot {
    Top20,
    Timeshare,
    None,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Witness {
    pub id: ObjectId,
    pub owner: AccountName,
    pub signing_key: PublicKey,
    pub votes: u64,
    pub schedule: WitnessScheduleSlot,
    /// 128-bit fixed point virtual-time bookkeeping (§4.7 runner rotation).
    pub virtual_last_update: u128,
    pub virtual_position: u128,
    pub virtual_scheduled_time: u128,
    pub total_missed: u32,
    pub last_confirmed_block_num: u64,
    pub created_at: Timestamp,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WitnessVote {
    pub id: ObjectId,
    pub witness: AccountName,
    pub account: AccountName,
}

/// Current shuffled schedule plus the scalars the slot-math and pay
/// formulas read every block (§3 witness schedule).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WitnessSchedule {
    pub id: ObjectId,
    pub current_shuffled_witnesses: Vec<AccountName>,
    pub current_virtual_time: u128,
    pub next_shuffle_block_num: u64,
    pub num_scheduled_witnesses: u8,
    pub top_voted_witnesses: u8,
    pub runner_witnesses: u8,
    pub witness_pay_normalization_factor: u64,
    pub majority_version: u32,
    pub median_maximum_block_size: u32,
}

/// Process-wide counters and the head pointer maintained on every block
/// application (§3 dynamic global properties).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DynamicGlobalProperties {
    pub id: ObjectId,
    pub head_block_number: u64,
    pub head_block_id: BlockId,
    pub head_block_time: Timestamp,
    pub current_witness: AccountName,
    pub current_supply: Asset,
    pub maximum_block_size: u32,
    pub current_aslot: u64,
    /// Rolling 128-slot participation bitset, low bit = most recent slot.
    pub recent_slots_filled: u128,
    pub last_irreversible_block_num: u64,
}

/// Ring-buffer entry: `block_num mod 2^16 → block_id`, for TaPOS (§3, §6).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BlockSummary {
    pub id: ObjectId,
    pub block_id: BlockId,
}
