//! Synchronous event dispatch (§5, §6): every subscriber sees its own
//! snapshot of what happened rather than a live database handle, since
//! handlers run under the write lock and must not mutate anything.

use deip_core::block::Block;
use deip_core::operation::Operation;
use deip_core::transaction::SignedTransaction;
use deip_core::types::{AccountName, BlockId, TxId};
use deip_core::virtual_op::VirtualOperation;

use crate::skip::SkipFlags;

#[derive(Clone, Debug)]
pub enum Notification {
    PreApplyOperation { tx_id: TxId, op_index: u16, op: Operation },
    PostApplyOperation { tx_id: TxId, op_index: u16, op: Operation },
    OnPendingTransaction { transaction: SignedTransaction },
    OnPreApplyTransaction { transaction: SignedTransaction },
    OnAppliedTransaction { tx_id: TxId, transaction: SignedTransaction, virtual_ops: Vec<VirtualOperation> },
    AppliedBlock { block_id: BlockId, block: Block, virtual_ops: Vec<VirtualOperation> },
}

/// Dispatched synchronously under the write lock (§5): a handler runs to
/// completion before the next pipeline step resumes, and must not block
/// or reach back into the database it was called from inside of.
#[derive(Default)]
pub struct Notifier {
    subscribers: Vec<Box<dyn Fn(&Notification) + Send + Sync>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, handler: impl Fn(&Notification) + Send + Sync + 'static) {
        self.subscribers.push(Box::new(handler));
    }

    pub fn emit(&self, notification: Notification) {
        for subscriber in &self.subscribers {
            subscriber(&notification);
        }
    }
}

/// Everything the pipeline needs from the node that isn't part of the
/// chain state itself: the event subscribers, the tenant this node is
/// bound to (§6 `tenant` config option), if any, and which validation
/// steps to skip (§4.8, only legal when replaying a trusted block log).
/// `Default` gives the no-subscribers, no-tenant, full-validation
/// behavior of plain block/chain replay.
#[derive(Default, Clone, Copy)]
pub struct PipelineHooks<'a> {
    pub notifier: Option<&'a Notifier>,
    pub tenant: Option<&'a AccountName>,
    pub skip: SkipFlags,
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use deip_core::block::BlockHeader;
    use deip_core::types::{AccountName, Sha256Digest, Signature};

    use super::*;

    fn sample_block() -> Block {
        Block {
            header: BlockHeader {
                previous_id: Sha256Digest([0u8; 32]),
                timestamp: 3,
                witness: AccountName::new_unchecked("nobody"),
                transaction_merkle_root: Sha256Digest([0u8; 32]),
                extensions: vec![],
            },
            witness_signature: Signature([0u8; 65]),
            transactions: vec![],
        }
    }

    #[test]
    fn every_subscriber_sees_every_notification() {
        let mut notifier = Notifier::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_a = Arc::clone(&seen);
        let seen_b = Arc::clone(&seen);
        notifier.subscribe(move |_| {
            seen_a.fetch_add(1, Ordering::SeqCst);
        });
        notifier.subscribe(move |_| {
            seen_b.fetch_add(1, Ordering::SeqCst);
        });

        notifier.emit(Notification::AppliedBlock {
            block_id: Sha256Digest([0u8; 32]),
            block: sample_block(),
            virtual_ops: vec![],
        });

        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }
}
