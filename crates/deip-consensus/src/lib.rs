//! Witness scheduler (§4.7): the DPoS consensus layer sitting on top of
//! `deip-chainbase`/`deip-core`. Witness and schedule state already lives
//! in chainbase tables, so this crate has no state of its own — every
//! function here takes the database it reads and mutates directly rather
//! than mirroring a second copy of the schedule in memory.

pub mod participation;
pub mod scheduler;
pub mod slot;

pub use participation::{advance_irreversibility, record_missed_slot, record_produced_slot};
pub use scheduler::maybe_shuffle;
pub use slot::{get_scheduled_witness, slot_at_time, slot_time};
