//! Transaction and block application pipeline (§4.8). Stateless shape
//! checks run first, then TaPOS/expiration, then authority, and only once
//! all three pass does any evaluator touch the database — each inside its
//! own undo session so a mid-transaction failure cannot leak partial state
//! into the block session around it.

use tracing::{debug, warn};

use deip_core::block::Block;
use deip_core::error::{BlockValidationError, DeipError, TaposError};
use deip_core::model::DynamicGlobalProperties;
use deip_core::transaction::{SignedTransaction, Transaction};
use deip_core::types::{Sha256Digest, Timestamp, TxId};
use deip_core::virtual_op::VirtualOperation;

use deip_chainbase::Database;
use deip_consensus::{advance_irreversibility, get_scheduled_witness, maybe_shuffle, record_missed_slot, record_produced_slot, slot_at_time};

use crate::context::EvalContext;
use crate::evaluators::apply_operation;
use crate::events::{Notification, PipelineHooks};
use crate::services::{authority, expertise, funds, proposals};
use crate::token_sale;
use crate::validation;

/// Checks header linkage, timestamp alignment, the transaction Merkle
/// root, and the witness's signature over the header (§4.8 step 2).
fn verify_block_header(db: &Database, block: &Block, props: &DynamicGlobalProperties, hooks: &PipelineHooks<'_>) -> Result<(), DeipError> {
    if block.header.previous_id != props.head_block_id {
        return Err(BlockValidationError::PreviousIdMismatch.into());
    }
    if block.header.timestamp % deip_core::constants::BLOCK_INTERVAL_SECS != 0 {
        return Err(BlockValidationError::MisalignedTimestamp { got: block.header.timestamp }.into());
    }
    if block.header.timestamp <= props.head_block_time {
        return Err(BlockValidationError::TimestampNotMonotonic { got: block.header.timestamp, parent: props.head_block_time }.into());
    }
    if !hooks.skip.merkle_check {
        let tx_ids: Vec<TxId> = block.transactions.iter().map(|stx| deip_crypto::tx_id_from_body(&stx.transaction.canonical_bytes())).collect();
        if deip_crypto::merkle_root(&tx_ids) != block.header.transaction_merkle_root {
            return Err(BlockValidationError::MerkleRootMismatch.into());
        }
    }
    if !hooks.skip.witness_signature {
        let witness = db.find_witness(&block.header.witness).ok_or_else(|| BlockValidationError::WitnessNotScheduled)?;
        let header_bytes = block.canonical_header_bytes();
        let header_digest = deip_crypto::sha256(&header_bytes);
        deip_crypto::verify_prehash(&witness.signing_key, &header_digest.0, &block.witness_signature)
            .map_err(|_| BlockValidationError::InvalidWitnessSignature)?;
    }
    Ok(())
}

fn check_tapos(db: &Database, tx: &Transaction, head_block_time: Timestamp, head_block_num: u64) -> Result<(), DeipError> {
    if tx.expiration <= head_block_time {
        return Err(TaposError::Expired { expiration: tx.expiration, head_time: head_block_time }.into());
    }
    if tx.expiration - head_block_time > deip_core::constants::DEIP_MAX_TIME_UNTIL_EXPIRATION {
        return Err(TaposError::ExpirationTooFar { max: deip_core::constants::DEIP_MAX_TIME_UNTIL_EXPIRATION as u32 }.into());
    }
    if tx.ref_block_num == 0 && tx.ref_block_prefix == 0 && head_block_num == 0 {
        return Ok(());
    }
    let summary = db
        .block_summary_at(tx.ref_block_num as u64)
        .ok_or(TaposError::UnknownRefBlock { ref_block_num: tx.ref_block_num })?;
    if summary.block_id.low_u32() != tx.ref_block_prefix {
        return Err(TaposError::RefBlockPrefixMismatch { ref_block_num: tx.ref_block_num }.into());
    }
    Ok(())
}

fn apply_ops(ctx: &mut EvalContext<'_>, ops: &[deip_core::operation::Operation], hooks: &PipelineHooks<'_>, tx_id: TxId) -> Result<(), DeipError> {
    for (index, op) in ops.iter().enumerate() {
        ctx.current_op_index = index as u16;
        if let Some(notifier) = hooks.notifier {
            notifier.emit(Notification::PreApplyOperation { tx_id, op_index: ctx.current_op_index, op: op.clone() });
        }
        apply_operation(ctx, op)?;
        if let Some(notifier) = hooks.notifier {
            notifier.emit(Notification::PostApplyOperation { tx_id, op_index: ctx.current_op_index, op: op.clone() });
        }
    }
    Ok(())
}

/// Validates and applies one signed transaction against the chain's
/// current state (§4.8): shape → TaPOS → authority → evaluate, each step
/// failing closed before the next runs. The caller decides whether the
/// transaction session should nest under an outer block session or stand
/// on its own (mempool admission).
pub fn push_transaction(
    db: &mut Database,
    stx: &SignedTransaction,
    chain_id: &Sha256Digest,
    head_block_time: Timestamp,
    head_block_num: u64,
) -> Result<(TxId, Vec<VirtualOperation>), DeipError> {
    push_transaction_with_hooks(db, stx, chain_id, head_block_time, head_block_num, &PipelineHooks::default())
}

/// Same as [`push_transaction`], additionally dispatching
/// `pre_apply_operation`/`post_apply_operation` for each operation and
/// `on_pre_apply_transaction`/`on_applied_transaction` around the whole
/// transaction through `hooks.notifier` (§6 event stream), and — when
/// `hooks.tenant` is set — requiring a tenant co-signature (§4.2).
pub fn push_transaction_with_hooks(
    db: &mut Database,
    stx: &SignedTransaction,
    chain_id: &Sha256Digest,
    head_block_time: Timestamp,
    head_block_num: u64,
    hooks: &PipelineHooks<'_>,
) -> Result<(TxId, Vec<VirtualOperation>), DeipError> {
    validation::validate_operations(&stx.transaction.operations)?;
    if !hooks.skip.tapos_check {
        check_tapos(db, &stx.transaction, head_block_time, head_block_num)?;
    }

    let body_bytes = stx.transaction.canonical_bytes();
    let digest = deip_crypto::signing_digest(chain_id, &body_bytes);
    if !hooks.skip.authority_check {
        authority::verify_transaction_authority(db, &stx.transaction.operations, &stx.signatures, &digest.0)?;
    }
    if let Some(tenant) = hooks.tenant {
        authority::verify_tenant_affirmation(db, tenant, stx.tenant_signature.as_ref(), &digest.0)?;
    }
    let tx_id = deip_crypto::tx_id_from_body(&body_bytes);

    if let Some(notifier) = hooks.notifier {
        notifier.emit(Notification::OnPreApplyTransaction { transaction: stx.clone() });
    }

    let nested_in_block = db.session_depth() > 0;
    db.start_undo_session();
    let mut ctx = EvalContext::new(db, head_block_time, tx_id);
    let outcome = apply_ops(&mut ctx, &stx.transaction.operations, hooks, tx_id);
    let virtual_ops = ctx.virtual_ops;

    match outcome {
        Ok(()) => {
            // Squash into the enclosing block session when there is one,
            // so a later block-level failure still undoes this
            // transaction; a standalone (mempool) call has no parent and
            // commits outright.
            if nested_in_block {
                db.squash()?;
            } else {
                db.commit()?;
            }
            debug!(tx_id = %tx_id, ops = stx.transaction.operations.len(), "transaction applied");
            if let Some(notifier) = hooks.notifier {
                notifier.emit(Notification::OnAppliedTransaction { tx_id, transaction: stx.clone(), virtual_ops: virtual_ops.clone() });
            }
            Ok((tx_id, virtual_ops))
        }
        Err(err) => {
            db.undo()?;
            Err(err)
        }
    }
}

/// Runs the post-apply sweeps that do not originate from any submitted
/// transaction (§4.8): token-sale clock/cap transitions, proposal and
/// expertise-allocation-proposal expirations, vesting withdrawals, and
/// budget allocation. Returns every virtual operation they emit, in a
/// fixed order so the notification stream stays deterministic.
fn run_post_apply_sweeps(db: &mut Database, head_block_num: u64, now: Timestamp) -> Result<Vec<VirtualOperation>, DeipError> {
    let mut emitted = Vec::new();
    emitted.extend(token_sale::process_token_sales(db, now)?);
    emitted.extend(proposals::expire_proposals(db, now)?);
    expertise::expire_allocation_proposals(db, now)?;
    emitted.extend(funds::process_vesting_withdrawals(db, now)?);
    funds::process_budgets(db, head_block_num, now)?;
    Ok(emitted)
}

/// Validates and applies a full block (§4.8): structural checks, then
/// the scheduled-witness check, then every contained transaction in
/// order, then the per-block sweeps and consensus bookkeeping (missed
/// slots, shuffle, irreversibility) — all inside one undo session so a
/// single bad transaction fails the whole block rather than leaving it
/// half-applied.
pub fn push_block(db: &mut Database, block: &Block, chain_id: &Sha256Digest) -> Result<Vec<VirtualOperation>, DeipError> {
    push_block_with_hooks(db, block, chain_id, &PipelineHooks::default())
}

/// Same as [`push_block`], additionally dispatching `applied_block` (and,
/// through each contained transaction, the per-operation and
/// per-transaction notifications) through `hooks.notifier`, and enforcing
/// a tenant co-signature on every contained transaction when `hooks.tenant`
/// is set.
pub fn push_block_with_hooks(db: &mut Database, block: &Block, chain_id: &Sha256Digest, hooks: &PipelineHooks<'_>) -> Result<Vec<VirtualOperation>, DeipError> {
    let props = db.dynamic_global_properties().clone();
    verify_block_header(db, block, &props, hooks)?;

    let schedule = db.witness_schedule().current_shuffled_witnesses.clone();
    let slots_elapsed = slot_at_time(props.head_block_time, deip_core::constants::BLOCK_INTERVAL_SECS, block.header.timestamp);
    if !hooks.skip.witness_schedule_check && !schedule.is_empty() {
        let expected = get_scheduled_witness(&schedule, props.current_aslot, slots_elapsed);
        if expected != Some(&block.header.witness) {
            return Err(BlockValidationError::WrongSlotWitness {
                expected: expected.map(|w| w.to_string()).unwrap_or_default(),
                got: block.header.witness.to_string(),
            }
            .into());
        }
    }

    db.start_undo_session();
    let head_block_num = props.head_block_number + 1;
    let mut all_virtual_ops = Vec::new();

    let result: Result<(), DeipError> = (|| {
        for k in 1..slots_elapsed {
            if let Some(missed_witness) = get_scheduled_witness(&schedule, props.current_aslot, k) {
                record_missed_slot(db, missed_witness)?;
            }
        }

        for stx in &block.transactions {
            let (_, ops) = push_transaction_with_hooks(db, stx, chain_id, block.header.timestamp, head_block_num, hooks)?;
            all_virtual_ops.extend(ops);
        }
        all_virtual_ops.extend(run_post_apply_sweeps(db, head_block_num, block.header.timestamp)?);

        let header_bytes = block.canonical_header_bytes();
        let block_id = deip_crypto::sha256(&header_bytes);
        db.set_block_summary(head_block_num, block_id);

        let props_id = db.dynamic_global_properties().id;
        db.modify::<DynamicGlobalProperties>(props_id, |p| {
            p.head_block_number = head_block_num;
            p.head_block_id = block_id;
            p.head_block_time = block.header.timestamp;
            p.current_witness = block.header.witness.clone();
        })?;

        record_produced_slot(db, &block.header.witness, head_block_num, slots_elapsed)?;
        maybe_shuffle(db, head_block_num)?;
        advance_irreversibility(db)?;
        Ok(())
    })();

    match result {
        Ok(()) => {
            // The block's session stays open rather than committing: it
            // remains one undo away so the fork database can pop back to
            // this point for a reorg. It only becomes permanent once
            // irreversibility passes it (`ForkDatabase::finalize`).
            debug!(block_num = head_block_num, txs = block.transactions.len(), "block applied");
            if let Some(notifier) = hooks.notifier {
                let block_id = deip_crypto::sha256(&block.canonical_header_bytes());
                notifier.emit(Notification::AppliedBlock { block_id, block: block.clone(), virtual_ops: all_virtual_ops.clone() });
            }
            Ok(all_virtual_ops)
        }
        Err(err) => {
            db.undo()?;
            warn!(block_num = head_block_num, error = %err, "block rejected");
            Err(err)
        }
    }
}
