//! Expertise tokens and expertise-allocation proposals (§4.3 "expertise
//! allocation proposal" category).

use deip_core::error::{DeipError, EvaluationError};
use deip_core::model::{ExpertiseAllocationProposal, ExpertiseAllocationProposalStatus, ExpertiseAllocationProposalVote};
use deip_core::types::{AccountName, DisciplineId, ExternalId, ObjectId, Timestamp};

use deip_chainbase::Database;

pub fn create_allocation_proposal(
    db: &mut Database,
    external_id: ExternalId,
    claimer: AccountName,
    discipline: DisciplineId,
    quorum_percent: u16,
    expires_at: Timestamp,
) -> Result<ObjectId, DeipError> {
    db.create_allocation_proposal(|id| ExpertiseAllocationProposal {
        id,
        external_id,
        claimer,
        discipline,
        quorum_percent,
        total_voted_expertise: 0,
        expires_at,
        status: ExpertiseAllocationProposalStatus::Active,
    })
}

/// Casts (or changes) `voter`'s vote. `requested_weight` is clamped to the
/// voter's actual expertise balance in the proposal's discipline — a
/// client cannot claim more weight than it holds (§4.3). Resolves the
/// proposal if the quorum has now been met.
pub fn vote(
    db: &mut Database,
    external_id: ExternalId,
    voter: AccountName,
    is_upvote: bool,
    requested_weight: i64,
) -> Result<(), DeipError> {
    let proposal = db
        .find_allocation_proposal_by_external_id(&external_id)
        .ok_or_else(|| EvaluationError::UnknownProposal(external_id.to_string()))?
        .clone();
    if proposal.status != ExpertiseAllocationProposalStatus::Active {
        return Err(EvaluationError::ProposalAlreadyResolved.into());
    }
    let proposal_id = proposal.id;

    let available = db.expertise_amount(&voter, proposal.discipline);
    if available <= 0 {
        return Err(EvaluationError::InsufficientExpertise.into());
    }
    let weight = requested_weight.clamp(0, available);
    if weight == 0 {
        return Err(EvaluationError::InsufficientExpertise.into());
    }

    if let Some(existing) = db.find_allocation_vote(proposal_id, &voter) {
        let existing_id = existing.id;
        let existing_weight = existing.weight;
        let existing_upvote = existing.is_upvote;
        db.modify::<ExpertiseAllocationProposalVote>(existing_id, |v| {
            v.is_upvote = is_upvote;
            v.weight = weight;
        })?;
        let delta = signed(weight, is_upvote) - signed(existing_weight, existing_upvote);
        db.modify::<ExpertiseAllocationProposal>(proposal_id, |p| p.total_voted_expertise += delta)?;
    } else {
        db.create::<ExpertiseAllocationProposalVote>(|id| ExpertiseAllocationProposalVote {
            id,
            proposal_id,
            voter: voter.clone(),
            is_upvote,
            weight,
        });
        db.modify::<ExpertiseAllocationProposal>(proposal_id, |p| p.total_voted_expertise += signed(weight, is_upvote))?;
    }

    resolve_if_quorum_met(db, proposal_id)
}

fn signed(weight: i64, is_upvote: bool) -> i64 {
    if is_upvote {
        weight
    } else {
        -weight
    }
}

fn resolve_if_quorum_met(db: &mut Database, proposal_id: ObjectId) -> Result<(), DeipError> {
    let proposal = db.get::<ExpertiseAllocationProposal>(proposal_id)?.clone();
    let total_supply: i64 = db
        .iter::<deip_core::model::ExpertiseToken>()
        .filter(|(_, t)| t.discipline == proposal.discipline)
        .map(|(_, t)| t.amount)
        .sum();
    if total_supply <= 0 {
        return Ok(());
    }
    let quorum_threshold = (total_supply as i128 * proposal.quorum_percent as i128 / 10_000) as i64;
    if proposal.total_voted_expertise >= quorum_threshold {
        db.modify::<ExpertiseAllocationProposal>(proposal_id, |p| p.status = ExpertiseAllocationProposalStatus::Accepted)?;
        db.upsert_expertise_token(proposal.claimer.clone(), proposal.discipline, quorum_threshold.max(1));
    } else if proposal.total_voted_expertise <= -quorum_threshold {
        db.modify::<ExpertiseAllocationProposal>(proposal_id, |p| p.status = ExpertiseAllocationProposalStatus::Rejected)?;
    }
    Ok(())
}

/// Periodic sweep: proposals whose deadline has passed without resolving
/// are rejected outright.
pub fn expire_allocation_proposals(db: &mut Database, now: Timestamp) -> Result<(), DeipError> {
    let expired: Vec<ObjectId> = db
        .active_allocation_proposals()
        .into_iter()
        .filter(|(_, p)| p.expires_at <= now)
        .map(|(id, _)| id)
        .collect();
    for id in expired {
        db.modify::<ExpertiseAllocationProposal>(id, |p| p.status = ExpertiseAllocationProposalStatus::Rejected)?;
    }
    Ok(())
}
