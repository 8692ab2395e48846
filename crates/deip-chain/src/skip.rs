//! Validation-skip flags (§4.8): "legal only when replaying from a trusted
//! block log and must never be honored over the network." Named booleans
//! rather than a bitmask, since nothing here serializes the raw integer
//! across a wire boundary the way the original `validation_steps` enum did.

/// Every flag defaults to `false` — `SkipFlags::default()` is full
/// validation, matching `skip_nothing` in the original design.
#[derive(Debug, Default, Clone, Copy)]
pub struct SkipFlags {
    /// Skip the block's witness signature check (used while reindexing
    /// from a trusted block log).
    pub witness_signature: bool,
    /// Skip TaPOS reference/expiration checking.
    pub tapos_check: bool,
    /// Skip authority resolution against a transaction's signatures.
    pub authority_check: bool,
    /// Skip the transaction Merkle root check against the block header.
    pub merkle_check: bool,
    /// Skip the scheduled-witness-for-slot check.
    pub witness_schedule_check: bool,
}
