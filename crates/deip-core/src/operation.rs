//! Every state-changing operation the chain accepts is one variant of
//! [`Operation`] (§4.3). Evaluators are a dispatch table from variant tag
//! to function; authority requirements are read off the variant, not
//! provided by virtual method overrides (§9).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::asset::Asset;
use crate::model::account::Authority;
use crate::model::research::ResearchContentType;
use crate::types::{AccountName, DisciplineId, ExternalId, PublicKey, Sha256Digest, Timestamp};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum Operation {
    // ── Value transfer ───────────────────────────────────────────────────────
    Transfer {
        from: AccountName,
        to: AccountName,
        amount: Asset,
        memo: Option<String>,
    },
    TransferToCommonTokens {
        from: AccountName,
        to: AccountName,
        amount: Asset,
    },
    WithdrawCommonTokens {
        account: AccountName,
        total_common_tokens_amount: Asset,
    },
    SetWithdrawCommonTokensRoute {
        from: AccountName,
        to: AccountName,
        percent: u16,
        auto_common_token: bool,
    },

    // ── Account lifecycle ────────────────────────────────────────────────────
    CreateAccountByFaucets {
        creator: AccountName,
        new_account_name: AccountName,
        memo_key: PublicKey,
        owner: Authority,
        active: Authority,
        recovery_account: AccountName,
    },
    UpdateAccount {
        account: AccountName,
        memo_key: Option<PublicKey>,
        active: Option<Authority>,
    },
    UpdateOwnerAuthority {
        account: AccountName,
        owner: Authority,
    },
    RequestAccountRecovery {
        recovery_account: AccountName,
        account_to_recover: AccountName,
        new_owner_authority: Authority,
    },
    RecoverAccount {
        account_to_recover: AccountName,
        new_owner_authority: Authority,
        recent_owner_authority: Authority,
    },
    ChangeRecoveryAccount {
        account_to_recover: AccountName,
        new_recovery_account: AccountName,
    },
    UpdateVotingProxy {
        account: AccountName,
        proxy: Option<AccountName>,
    },

    // ── Witness ───────────────────────────────────────────────────────────────
    WitnessUpdate {
        owner: AccountName,
        signing_key: PublicKey,
    },
    AccountWitnessVote {
        account: AccountName,
        witness: AccountName,
        approve: bool,
    },
    AccountWitnessProxy {
        account: AccountName,
        proxy: Option<AccountName>,
    },

    // ── Research ──────────────────────────────────────────────────────────────
    CreateResearch {
        external_id: ExternalId,
        research_group: AccountName,
        description_hash: Sha256Digest,
        disciplines: Vec<DisciplineId>,
        review_share_percent: u16,
        compensation_share_percent: u16,
        is_private: bool,
    },
    CreateResearchContent {
        external_id: ExternalId,
        research_external_id: ExternalId,
        content_type: ResearchContentType,
        content_hash: Sha256Digest,
        authors: Vec<AccountName>,
        references: Vec<ExternalId>,
    },
    CreateReview {
        external_id: ExternalId,
        research_content_external_id: ExternalId,
        is_positive: bool,
        author: AccountName,
        expertise_tokens_amount_per_discipline: BTreeMap<DisciplineId, i64>,
        assessment_model_version: u16,
        criteria_scores: BTreeMap<String, u8>,
    },
    CreateReviewVote {
        review_external_id: ExternalId,
        discipline: DisciplineId,
        voter: AccountName,
        weight: i64,
    },

    // ── Token sale ────────────────────────────────────────────────────────────
    CreateResearchTokenSale {
        external_id: ExternalId,
        research_external_id: ExternalId,
        research_group: AccountName,
        security_tokens_on_sale: Asset,
        start_time: Timestamp,
        end_time: Timestamp,
        soft_cap: Asset,
        hard_cap: Asset,
    },
    ContributeToTokenSale {
        research_token_sale_external_id: ExternalId,
        contributor: AccountName,
        amount: Asset,
    },

    // ── Proposal ──────────────────────────────────────────────────────────────
    CreateProposal {
        external_id: ExternalId,
        proposed_ops: Vec<Operation>,
        proposer: AccountName,
        expiration_time: Timestamp,
        review_period_seconds: Option<u32>,
    },
    UpdateProposal {
        external_id: ExternalId,
        active_approvals_to_add: Vec<AccountName>,
        active_approvals_to_remove: Vec<AccountName>,
        owner_approvals_to_add: Vec<AccountName>,
        owner_approvals_to_remove: Vec<AccountName>,
        key_approvals_to_add: Vec<PublicKey>,
        key_approvals_to_remove: Vec<PublicKey>,
    },
    DeleteProposal {
        external_id: ExternalId,
        requester: AccountName,
    },

    // ── Expertise allocation proposal ────────────────────────────────────────
    CreateExpertiseAllocationProposal {
        claimer: AccountName,
        discipline: DisciplineId,
        quorum_percent: u16,
        expires_at: Timestamp,
    },
    VoteForExpertiseAllocationProposal {
        proposal_external_id: ExternalId,
        voter: AccountName,
        is_upvote: bool,
        weight: i64,
    },
}

impl Operation {
    /// Stable name matching the variant, used as the `active_override`
    /// lookup key in an [`crate::model::account::AuthorityRecord`] (§4.2).
    pub fn tag(&self) -> &'static str {
        match self {
            Operation::Transfer { .. } => "transfer",
            Operation::TransferToCommonTokens { .. } => "transfer_to_common_tokens",
            Operation::WithdrawCommonTokens { .. } => "withdraw_common_tokens",
            Operation::SetWithdrawCommonTokensRoute { .. } => "set_withdraw_common_tokens_route",
            Operation::CreateAccountByFaucets { .. } => "create_account_by_faucets",
            Operation::UpdateAccount { .. } => "update_account",
            Operation::UpdateOwnerAuthority { .. } => "update_owner_authority",
            Operation::RequestAccountRecovery { .. } => "request_account_recovery",
            Operation::RecoverAccount { .. } => "recover_account",
            Operation::ChangeRecoveryAccount { .. } => "change_recovery_account",
            Operation::UpdateVotingProxy { .. } => "update_voting_proxy",
            Operation::WitnessUpdate { .. } => "witness_update",
            Operation::AccountWitnessVote { .. } => "account_witness_vote",
            Operation::AccountWitnessProxy { .. } => "account_witness_proxy",
            Operation::CreateResearch { .. } => "create_research",
            Operation::CreateResearchContent { .. } => "create_research_content",
            Operation::CreateReview { .. } => "create_review",
            Operation::CreateReviewVote { .. } => "create_review_vote",
            Operation::CreateResearchTokenSale { .. } => "create_research_token_sale",
            Operation::ContributeToTokenSale { .. } => "contribute_to_token_sale",
            Operation::CreateProposal { .. } => "create_proposal",
            Operation::UpdateProposal { .. } => "update_proposal",
            Operation::DeleteProposal { .. } => "delete_proposal",
            Operation::CreateExpertiseAllocationProposal { .. } => {
                "create_expertise_allocation_proposal"
            }
            Operation::VoteForExpertiseAllocationProposal { .. } => {
                "vote_for_expertise_allocation_proposal"
            }
        }
    }

    /// Account names whose `active` authority (or override, for this
    /// operation's tag) must be satisfied. Owner-authority requirements
    /// are returned by [`Operation::required_owner_auths`] instead (§4.2).
    pub fn required_active_auths(&self) -> Vec<&AccountName> {
        match self {
            Operation::Transfer { from, .. } => vec![from],
            Operation::TransferToCommonTokens { from, .. } => vec![from],
            Operation::WithdrawCommonTokens { account, .. } => vec![account],
            Operation::SetWithdrawCommonTokensRoute { from, .. } => vec![from],
            Operation::CreateAccountByFaucets { creator, .. } => vec![creator],
            Operation::UpdateAccount { account, .. } => vec![account],
            Operation::RequestAccountRecovery { recovery_account, .. } => vec![recovery_account],
            Operation::RecoverAccount { account_to_recover, .. } => vec![account_to_recover],
            Operation::ChangeRecoveryAccount { account_to_recover, .. } => {
                vec![account_to_recover]
            }
            Operation::UpdateVotingProxy { account, .. } => vec![account],
            Operation::WitnessUpdate { owner, .. } => vec![owner],
            Operation::AccountWitnessVote { account, .. } => vec![account],
            Operation::AccountWitnessProxy { account, .. } => vec![account],
            Operation::CreateResearch { research_group, .. } => vec![research_group],
            Operation::CreateResearchContent { authors, .. } => authors.iter().collect(),
            Operation::CreateReview { author, .. } => vec![author],
            Operation::CreateReviewVote { voter, .. } => vec![voter],
            Operation::CreateResearchTokenSale { research_group, .. } => vec![research_group],
            Operation::ContributeToTokenSale { contributor, .. } => vec![contributor],
            Operation::CreateProposal { proposer, .. } => vec![proposer],
            Operation::UpdateProposal { active_approvals_to_add, .. } => active_approvals_to_add.iter().collect(),
            Operation::DeleteProposal { requester, .. } => vec![requester],
            Operation::CreateExpertiseAllocationProposal { claimer, .. } => vec![claimer],
            Operation::VoteForExpertiseAllocationProposal { voter, .. } => vec![voter],
        }
    }

    /// Account names whose `owner` authority must be satisfied (§4.2):
    /// only owner-authority-changing operations require this directly.
    pub fn required_owner_auths(&self) -> Vec<&AccountName> {
        match self {
            Operation::UpdateOwnerAuthority { account, .. } => vec![account],
            Operation::UpdateProposal { owner_approvals_to_add, .. } => owner_approvals_to_add.iter().collect(),
            _ => vec![],
        }
    }
}
