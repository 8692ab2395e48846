//! Evaluator context (§9 "global mutable state → writer-owned state plus
//! explicit context"): every evaluator and service takes this instead of
//! reaching for an ambient singleton.

use deip_core::types::{TxId, Timestamp};
use deip_core::virtual_op::VirtualOperation;

use deip_chainbase::Database;

/// Threaded through evaluators and services for the duration of one
/// transaction. `virtual_ops` accumulates in operation order so the
/// pipeline can hand them to post-apply hooks after the transaction
/// session commits.
pub struct EvalContext<'a> {
    pub db: &'a mut Database,
    pub head_block_time: Timestamp,
    pub current_tx_id: TxId,
    pub current_op_index: u16,
    pub virtual_ops: Vec<VirtualOperation>,
}

impl<'a> EvalContext<'a> {
    pub fn new(db: &'a mut Database, head_block_time: Timestamp, current_tx_id: TxId) -> Self {
        Self { db, head_block_time, current_tx_id, current_op_index: 0, virtual_ops: Vec::new() }
    }

    pub fn emit(&mut self, op: VirtualOperation) {
        self.virtual_ops.push(op);
    }
}
