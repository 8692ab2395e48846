//! Fork database (§4.8 step 1, §8 scenario 6): tracks the chain of
//! applied-but-not-yet-irreversible blocks alongside the undo-session
//! stack each one left open in [`deip_chainbase::Database`]. A reorg
//! pops sessions back to the common ancestor and re-applies the new
//! fork's blocks; a failed re-apply restores the original chain.

use std::collections::VecDeque;

use deip_core::block::Block;
use deip_core::error::{DeipError, ForkError};
use deip_core::types::{BlockId, Sha256Digest};
use deip_core::virtual_op::VirtualOperation;

use deip_chainbase::Database;

use crate::events::PipelineHooks;
use crate::pipeline::push_block_with_hooks;

/// One applied block still held open as an undo session. Sessions are a
/// stack, so `linked` must stay in the same order they were pushed:
/// index 0 is the oldest (bottommost session), the back is the head.
struct LinkedBlock {
    block_id: BlockId,
    previous_id: BlockId,
    block_number: u64,
    block: Block,
}

#[derive(Default)]
pub struct ForkDatabase {
    linked: VecDeque<LinkedBlock>,
}

impl ForkDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn head_id(&self) -> Option<BlockId> {
        self.linked.back().map(|b| b.block_id)
    }

    pub fn is_linked_to_head(&self, previous_id: &BlockId) -> bool {
        self.head_id().as_ref() == Some(previous_id)
    }

    fn position_of(&self, block_id: &BlockId) -> Option<usize> {
        self.linked.iter().position(|b| &b.block_id == block_id)
    }

    /// Applies `block` against the current head (§4.8 step 2 onward) and
    /// records it as a new, still-reversible link in the chain.
    pub fn push(&mut self, db: &mut Database, block: Block, chain_id: &Sha256Digest) -> Result<BlockId, DeipError> {
        self.push_with_hooks(db, block, chain_id, &PipelineHooks::default()).map(|(block_id, _)| block_id)
    }

    /// Same as [`Self::push`], additionally dispatching the pipeline's
    /// notifications and tenant enforcement (§6 event stream, §4.2)
    /// through `hooks`, and returning the virtual operations the block's
    /// transactions and sweeps emitted.
    pub fn push_with_hooks(
        &mut self,
        db: &mut Database,
        block: Block,
        chain_id: &Sha256Digest,
        hooks: &PipelineHooks<'_>,
    ) -> Result<(BlockId, Vec<VirtualOperation>), DeipError> {
        let previous_id = block.header.previous_id;
        let virtual_ops = push_block_with_hooks(db, &block, chain_id, hooks)?;
        let header_bytes = block.canonical_header_bytes();
        let block_id = deip_crypto::sha256(&header_bytes);
        let block_number = db.dynamic_global_properties().head_block_number;
        self.linked.push_back(LinkedBlock { block_id, previous_id, block_number, block });
        Ok((block_id, virtual_ops))
    }

    /// Pops every linked block back to (but not including) `fork_point`,
    /// replaying each one's undo session in LIFO order. Returns the
    /// popped blocks oldest-first, so a caller that needs to restore the
    /// original chain can re-push them in the same order.
    pub fn pop_to(&mut self, db: &mut Database, fork_point: &BlockId) -> Result<Vec<Block>, DeipError> {
        let keep = match self.position_of(fork_point) {
            Some(idx) => idx + 1,
            None if self.linked.is_empty() => 0,
            None => return Err(ForkError::Disconnected(fork_point.to_hex()).into()),
        };
        let mut popped = Vec::new();
        while self.linked.len() > keep {
            let link = self.linked.pop_back().expect("checked len() > keep");
            db.undo()?;
            popped.push(link.block);
        }
        popped.reverse();
        Ok(popped)
    }

    /// Switches the chain onto `new_blocks`, attached after `fork_point`.
    /// If any block fails to re-apply, the original chain (`original`,
    /// as returned by [`Self::pop_to`]) is re-pushed and the reorg is
    /// reported as failed rather than left half-applied.
    pub fn reorg(
        &mut self,
        db: &mut Database,
        fork_point: &BlockId,
        original: Vec<Block>,
        new_blocks: Vec<Block>,
        chain_id: &Sha256Digest,
    ) -> Result<(), DeipError> {
        self.reorg_with_hooks(db, fork_point, original, new_blocks, chain_id, &PipelineHooks::default())
    }

    /// Same as [`Self::reorg`], threading `hooks` through every block it
    /// pushes, on either the new fork or the restored original.
    pub fn reorg_with_hooks(
        &mut self,
        db: &mut Database,
        fork_point: &BlockId,
        original: Vec<Block>,
        new_blocks: Vec<Block>,
        chain_id: &Sha256Digest,
        hooks: &PipelineHooks<'_>,
    ) -> Result<(), DeipError> {
        for block in new_blocks {
            if let Err(err) = self.push_with_hooks(db, block, chain_id, hooks) {
                self.pop_to(db, fork_point)?;
                for block in original {
                    self.push_with_hooks(db, block, chain_id, hooks)?;
                }
                return Err(err);
            }
        }
        Ok(())
    }

    /// Commits every linked block whose number is now at or below the
    /// irreversible block number, discarding their undo sessions from
    /// the bottom of the stack so only still-reversible recent blocks
    /// remain undo-able.
    pub fn finalize(&mut self, db: &mut Database) -> Result<(), DeipError> {
        let lib = db.dynamic_global_properties().last_irreversible_block_num;
        while let Some(front) = self.linked.front() {
            if front.block_number > lib {
                break;
            }
            db.commit_oldest()?;
            self.linked.pop_front();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use deip_core::asset::Asset;
    use deip_core::block::BlockHeader;
    use deip_core::model::{DynamicGlobalProperties, WitnessSchedule};
    use deip_core::types::{AccountName, Sha256Digest, Signature};

    use deip_chainbase::Database;

    use crate::skip::SkipFlags;
    use crate::PipelineHooks;

    use super::*;

    const CHAIN_ID: Sha256Digest = Sha256Digest([7u8; 32]);

    /// These blocks carry no real witness signature — the tests below
    /// exercise fork-stack mechanics, not header validation, the same
    /// way §4.8's `skip_witness_signature` is meant for trusted replay.
    fn replay_hooks() -> PipelineHooks<'static> {
        PipelineHooks { skip: SkipFlags { witness_signature: true, ..Default::default() }, ..Default::default() }
    }

    fn seed_db() -> Database {
        let mut db = Database::new();
        db.create(|id| DynamicGlobalProperties {
            id,
            head_block_number: 0,
            head_block_id: Sha256Digest([0u8; 32]),
            head_block_time: 0,
            current_witness: AccountName::new_unchecked("nobody"),
            current_supply: Asset::core(0),
            maximum_block_size: 131_072,
            current_aslot: 0,
            recent_slots_filled: u128::MAX,
            last_irreversible_block_num: 0,
        });
        db.create(|id| WitnessSchedule {
            id,
            current_shuffled_witnesses: vec![],
            current_virtual_time: 0,
            next_shuffle_block_num: u64::MAX,
            num_scheduled_witnesses: 0,
            top_voted_witnesses: 0,
            runner_witnesses: 0,
            witness_pay_normalization_factor: 0,
            majority_version: 0,
            median_maximum_block_size: 131_072,
        });
        db
    }

    fn block(previous_id: BlockId, timestamp: i64) -> Block {
        Block {
            header: BlockHeader {
                previous_id,
                timestamp,
                witness: AccountName::new_unchecked("nobody"),
                transaction_merkle_root: Sha256Digest([0u8; 32]),
                extensions: vec![],
            },
            witness_signature: Signature([0u8; 65]),
            transactions: vec![],
        }
    }

    #[test]
    fn pushed_blocks_stay_reversible_until_finalize() {
        let mut db = seed_db();
        let mut fork_db = ForkDatabase::new();

        let genesis_id = db.dynamic_global_properties().head_block_id;
        let b1 = block(genesis_id, 3);
        let (b1_id, _) = fork_db.push_with_hooks(&mut db, b1, &CHAIN_ID, &replay_hooks()).expect("block 1 applies");
        assert_eq!(db.session_depth(), 1);

        let b2 = block(b1_id, 6);
        fork_db.push_with_hooks(&mut db, b2, &CHAIN_ID, &replay_hooks()).expect("block 2 applies");
        assert_eq!(db.session_depth(), 2);

        fork_db.pop_to(&mut db, &genesis_id).expect("pop back to genesis");
        assert_eq!(db.session_depth(), 0);
        assert_eq!(db.dynamic_global_properties().head_block_number, 0);
    }

    #[test]
    fn reorg_onto_a_longer_fork_replaces_the_short_one() {
        let mut db = seed_db();
        let mut fork_db = ForkDatabase::new();

        let genesis_id = db.dynamic_global_properties().head_block_id;
        let short = block(genesis_id, 3);
        fork_db.push_with_hooks(&mut db, short.clone(), &CHAIN_ID, &replay_hooks()).expect("short fork applies");

        let popped = fork_db.pop_to(&mut db, &genesis_id).expect("pop to genesis");
        assert_eq!(popped.len(), 1);

        let long_1 = block(genesis_id, 3);
        let long_1_id = deip_crypto::sha256(&long_1.canonical_header_bytes());
        let long_2 = block(long_1_id, 6);
        fork_db
            .reorg_with_hooks(&mut db, &genesis_id, popped, vec![long_1, long_2], &CHAIN_ID, &replay_hooks())
            .expect("reorg onto the longer fork");

        assert_eq!(db.dynamic_global_properties().head_block_number, 2);
        assert_eq!(db.session_depth(), 2);
    }
}
