//! The node (§5, §6): owns the one writer side of the chain and a
//! read-locked [`Database`] snapshot anything else in the process can
//! borrow. Nothing here runs a network or an RPC server — those are out
//! of scope (§1) — but the four in-process collaboration points §1/§6
//! name (read lock, transaction submission, the event stream, virtual
//! operations) are all exposed from here.

use std::sync::{Arc, RwLock, RwLockReadGuard};

use tracing::info;

use deip_chain::{push_transaction_with_hooks, Notification, Notifier, PipelineHooks, SkipFlags};
use deip_chainbase::Database;
use deip_core::block::Block;
use deip_core::transaction::SignedTransaction;
use deip_core::types::{AccountName, Sha256Digest, TxId};
use deip_core::virtual_op::VirtualOperation;
use deip_genesis::GenesisRecord;

use crate::config::NodeConfig;
use crate::error::NodeError;

/// A single writer's view of the chain. `state` is the only part shared
/// outside the writer — everything else here (mempool, fork stack,
/// subscribers) is owned exclusively by whoever drives `submit_transaction`
/// and `push_block`, matching §5's single-writer model.
pub struct Node {
    state: Arc<RwLock<Database>>,
    fork_db: deip_chain::ForkDatabase,
    notifier: Notifier,
    pending: Vec<SignedTransaction>,
    chain_id: Sha256Digest,
    skip: SkipFlags,
    tenant: Option<AccountName>,
    flush_interval_blocks: u64,
    blocks_since_flush: u64,
    /// Stands in for the real append-only block log a storage layer would
    /// maintain (§6 "Process state files"); encoding that file is out of
    /// scope here, so the node just keeps every applied block in memory.
    block_log: Vec<Block>,
}

impl Node {
    /// Builds a fresh node from a genesis record, applying it into a new
    /// database. `config.chain_id_override` bypasses the record's own
    /// chain-id self-check — only meaningful for trusted local replay, per
    /// §6, which is why it is paired with the `skip_*` flags rather than a
    /// plain boolean toggle.
    pub fn bootstrap(config: NodeConfig, record: &GenesisRecord) -> Result<Self, NodeError> {
        let mut db = Database::new();
        let chain_id = match config.chain_id_override {
            Some(forced) => deip_genesis::apply_genesis_with_chain_id_override(&mut db, record, forced)?,
            None => deip_genesis::apply_genesis(&mut db, record)?,
        };
        info!(chain_id = %chain_id, "genesis applied");

        Ok(Self {
            state: Arc::new(RwLock::new(db)),
            fork_db: deip_chain::ForkDatabase::new(),
            notifier: Notifier::new(),
            pending: Vec::new(),
            chain_id,
            skip: config.skip,
            tenant: config.tenant,
            flush_interval_blocks: config.flush_interval_blocks,
            blocks_since_flush: 0,
            block_log: Vec::new(),
        })
    }

    /// Loads the genesis record from `path` and builds a node from it.
    pub fn bootstrap_from_file(config: NodeConfig) -> Result<Self, NodeError> {
        let path = config.genesis_path.clone();
        let json = std::fs::read_to_string(&path).map_err(|e| NodeError::GenesisIo(path.display().to_string(), e))?;
        let record: GenesisRecord = serde_json::from_str(&json).map_err(|e| NodeError::GenesisParse(e.to_string()))?;
        Self::bootstrap(config, &record)
    }

    pub fn chain_id(&self) -> Sha256Digest {
        self.chain_id
    }

    /// A read-lock snapshot of the chain state (§5): callers see a
    /// consistent view and block only if the writer is mid-step, never
    /// the other way around.
    pub fn read(&self) -> RwLockReadGuard<'_, Database> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Registers a handler for every notification the pipeline emits
    /// (§6 event stream). Handlers run synchronously under the write lock
    /// and must not block or try to re-enter the node.
    pub fn subscribe(&mut self, handler: impl Fn(&Notification) + Send + Sync + 'static) {
        self.notifier.subscribe(handler);
    }

    /// Validates and applies `stx` standalone, then queues it into the
    /// mempool so a later `push_block` can drop it from `pending` once
    /// it is actually included (§4.8, §5 "pending transaction queue").
    pub fn submit_transaction(&mut self, stx: SignedTransaction) -> Result<(TxId, Vec<VirtualOperation>), NodeError> {
        let mut db = self.state.write().map_err(|_| NodeError::LockPoisoned)?;
        let (head_block_time, head_block_num) = {
            let props = db.dynamic_global_properties();
            (props.head_block_time, props.head_block_number)
        };
        let hooks = PipelineHooks { notifier: Some(&self.notifier), tenant: self.tenant.as_ref(), skip: self.skip };
        let result = push_transaction_with_hooks(&mut db, &stx, &self.chain_id, head_block_time, head_block_num, &hooks)?;
        self.notifier.emit(Notification::OnPendingTransaction { transaction: stx.clone() });
        self.pending.push(stx);
        Ok(result)
    }

    /// Applies `block` through the fork database (§4.8 step 1 onward),
    /// then reconciles the mempool: transactions the block included are
    /// dropped outright, the rest are re-pushed against the new head and
    /// dropped if they no longer apply (§4.8 step 7).
    pub fn push_block(&mut self, block: Block) -> Result<Vec<VirtualOperation>, NodeError> {
        let included: std::collections::HashSet<TxId> =
            block.transactions.iter().map(|stx| deip_crypto::tx_id_from_body(&stx.transaction.canonical_bytes())).collect();

        let mut db = self.state.write().map_err(|_| NodeError::LockPoisoned)?;
        let hooks = PipelineHooks { notifier: Some(&self.notifier), tenant: self.tenant.as_ref(), skip: self.skip };

        let (_, virtual_ops) = self.fork_db.push_with_hooks(&mut db, block.clone(), &self.chain_id, &hooks)?;
        self.block_log.push(block);

        let retained = std::mem::take(&mut self.pending);
        let (head_block_time, head_block_num) = {
            let props = db.dynamic_global_properties();
            (props.head_block_time, props.head_block_number)
        };
        for stx in retained {
            let tx_id = deip_crypto::tx_id_from_body(&stx.transaction.canonical_bytes());
            if included.contains(&tx_id) {
                continue;
            }
            if push_transaction_with_hooks(&mut db, &stx, &self.chain_id, head_block_time, head_block_num, &hooks).is_ok() {
                self.pending.push(stx);
            }
        }

        self.fork_db.finalize(&mut db)?;

        self.blocks_since_flush += 1;
        if self.blocks_since_flush >= self.flush_interval_blocks {
            info!(blocks = self.blocks_since_flush, log_len = self.block_log.len(), "block log flush point reached");
            self.blocks_since_flush = 0;
        }

        Ok(virtual_ops)
    }

    pub fn pending_transactions(&self) -> &[SignedTransaction] {
        &self.pending
    }
}
