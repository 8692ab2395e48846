//! Deferred multi-sig proposals (§4.6): a proposal carries a batch of
//! operations that only apply once enough approvals accumulate (or are
//! pre-authorized to execute immediately on creation).

use deip_core::error::{DeipError, EvaluationError};
use deip_core::model::Proposal;
use deip_core::operation::Operation;
use deip_core::types::{AccountName, ExternalId, PublicKey, Timestamp};
use deip_core::virtual_op::VirtualOperation;

use deip_authority::{verify_authority, VerifyAuthorityInput};
use deip_chainbase::Database;

use crate::services::authority::DbAuthorityLookup;

/// True once a proposal's accumulated approvals satisfy every one of its
/// pending operations' authority requirements (§4.6
/// `is_authorized_to_execute`). Signature verification has already
/// happened at the transaction level that approved it; here we only
/// check the approval *sets*, so an all-zero signing digest is fine —
/// `verify_authority` never needs to recover a key when every requirement
/// is already pre-approved.
fn is_authorized_to_execute(db: &Database, proposal: &Proposal) -> bool {
    let lookup = DbAuthorityLookup(db);
    verify_authority(
        VerifyAuthorityInput {
            ops: &proposal.proposed_transaction.operations,
            signatures: &[],
            signing_digest: &[0u8; 32],
            preapproved_active: proposal.preapproved_active(),
            preapproved_owner: proposal.preapproved_owner(),
            max_recursion_depth: deip_core::constants::MAX_AUTHORITY_RECURSION_DEPTH,
        },
        &lookup,
    )
    .is_ok()
}

pub fn create_proposal(
    db: &mut Database,
    external_id: ExternalId,
    proposed_ops: Vec<Operation>,
    proposer: AccountName,
    expiration_time: Timestamp,
    review_period_seconds: Option<u32>,
    now: Timestamp,
) -> Result<(), DeipError> {
    if expiration_time <= now || expiration_time - now > deip_core::constants::DEIP_MAX_TIME_UNTIL_EXPIRATION {
        return Err(EvaluationError::ProposalExpired.into());
    }
    db.create_proposal(|id| Proposal {
        id,
        external_id,
        proposed_transaction: deip_core::transaction::Transaction {
            operations: proposed_ops,
            ref_block_num: 0,
            ref_block_prefix: 0,
            expiration: expiration_time,
            extensions: Vec::new(),
        },
        proposer,
        expiration_time,
        review_period_seconds,
        active_approvals: Default::default(),
        owner_approvals: Default::default(),
        key_approvals: Default::default(),
        is_completed: false,
    })?;
    Ok(())
}

/// Applies an approval-set delta and, once every operation's authority
/// requirement is met, marks the proposal completed (actually running the
/// contained operations happens in the pipeline, which reads
/// `is_completed` after this call — §4.8).
#[allow(clippy::too_many_arguments)]
pub fn update_proposal(
    db: &mut Database,
    external_id: &ExternalId,
    active_to_add: Vec<AccountName>,
    active_to_remove: Vec<AccountName>,
    owner_to_add: Vec<AccountName>,
    owner_to_remove: Vec<AccountName>,
    key_to_add: Vec<PublicKey>,
    key_to_remove: Vec<PublicKey>,
    now: Timestamp,
) -> Result<bool, DeipError> {
    let proposal = db.get_proposal(external_id)?;
    if proposal.is_completed {
        return Err(EvaluationError::ProposalAlreadyResolved.into());
    }
    if proposal.expiration_time <= now {
        return Err(EvaluationError::ProposalExpired.into());
    }
    let id = proposal.id;

    db.modify::<Proposal>(id, |p| {
        for a in active_to_add {
            p.active_approvals.insert(a);
        }
        for a in active_to_remove {
            p.active_approvals.remove(&a);
        }
        for a in owner_to_add {
            p.owner_approvals.insert(a);
        }
        for a in owner_to_remove {
            p.owner_approvals.remove(&a);
        }
        for k in key_to_add {
            p.key_approvals.insert(k);
        }
        for k in key_to_remove {
            p.key_approvals.remove(&k);
        }
    })?;

    let proposal = db.get::<Proposal>(id)?.clone();
    if is_authorized_to_execute(db, &proposal) {
        db.modify::<Proposal>(id, |p| p.is_completed = true)?;
        return Ok(true);
    }
    Ok(false)
}

/// Withdraws a proposal outright; only the original proposer may (§4.6).
pub fn delete_proposal(db: &mut Database, external_id: &ExternalId, requester: &AccountName) -> Result<(), DeipError> {
    let proposal = db.get_proposal(external_id)?;
    if &proposal.proposer != requester {
        return Err(EvaluationError::Other("only the proposer may delete a pending proposal".into()).into());
    }
    db.remove_proposal(external_id)?;
    Ok(())
}

/// Periodic sweep: proposals whose expiration has passed without
/// completing are dropped outright (§4.6, §4.8 post-apply pass).
pub fn expire_proposals(db: &mut Database, now: Timestamp) -> Result<Vec<VirtualOperation>, DeipError> {
    let expired: Vec<ExternalId> = db
        .all_proposals()
        .into_iter()
        .filter(|(_, p)| !p.is_completed && p.expiration_time <= now)
        .map(|(_, p)| p.external_id)
        .collect();
    let mut emitted = Vec::new();
    for external_id in expired {
        db.remove_proposal(&external_id)?;
        emitted.push(VirtualOperation::ProposalExpired { proposal_external_id: external_id });
    }
    Ok(emitted)
}
