//! Expertise tokens, ECI contribution history, and expertise-allocation
//! proposals (§3, §4.4).

use serde::{Deserialize, Serialize};

use crate::types::{AccountName, DisciplineId, ExternalId, ObjectId, Timestamp};

/// `(account, discipline) → amount`; unique per pair (§3).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExpertiseToken {
    pub id: ObjectId,
    pub account: AccountName,
    pub discipline: DisciplineId,
    pub amount: i64,
}

/// `(discipline, research, research_content) → eci` with history (§3, §4.4).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExpertiseContribution {
    pub id: ObjectId,
    pub discipline: DisciplineId,
    pub research_external_id: ExternalId,
    pub research_content_external_id: ExternalId,
    pub eci: i64,
}

/// One entry of the `*_eci_history` virtual-operation trail (§4.4): every
/// ECI change is appended here so indexers can reproduce deltas
/// deterministically without re-running the pricing formula.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EciHistoryRecord {
    pub id: ObjectId,
    pub discipline: DisciplineId,
    pub source_type: EciSource,
    pub source_id: ExternalId,
    pub previous: i64,
    pub new: i64,
    pub timestamp: Timestamp,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EciSource {
    ResearchContent,
    Research,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpertiseAllocationProposalStatus {
    Active,
    Accepted,
    Rejected,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExpertiseAllocationProposal {
    pub id: ObjectId,
    /// Derived deterministically from the creating transaction (§4.3),
    /// since the operation that creates one carries no external id of
    /// its own — this is what later votes address it by.
    pub external_id: ExternalId,
    pub claimer: AccountName,
    pub discipline: DisciplineId,
    pub quorum_percent: u16,
    pub total_voted_expertise: i64,
    pub expires_at: Timestamp,
    pub status: ExpertiseAllocationProposalStatus,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExpertiseAllocationProposalVote {
    pub id: ObjectId,
    pub proposal_id: ObjectId,
    pub voter: AccountName,
    pub is_upvote: bool,
    pub weight: i64,
}
