//! Operation evaluators (§4.3): one pure state-transition per
//! [`Operation`] variant, dispatched by tag. Each evaluator reads before
//! it writes, and any virtual operations it produces are appended to the
//! [`EvalContext`] passed in rather than returned directly, so the
//! pipeline can collect them uniformly across evaluators and services.

use deip_core::error::{DeipError, EvaluationError, ValidationError};
use deip_core::model::{Research, ResearchContent, ResearchGroup, Review, ReviewVote};
use deip_core::operation::Operation;
use deip_core::types::ExternalId;
use deip_core::virtual_op::VirtualOperation;

use crate::context::EvalContext;
use crate::services::{accounts, expertise, proposals, research, witnesses};
use crate::{eci, token_sale};

/// Derives a stable external id for operations that create a new record
/// but carry no external id of their own, from the enclosing
/// transaction id and this operation's position within it (§4.3).
fn derive_external_id(ctx: &EvalContext<'_>) -> ExternalId {
    let mut bytes = Vec::with_capacity(34);
    bytes.extend_from_slice(&ctx.current_tx_id.0);
    bytes.extend_from_slice(&ctx.current_op_index.to_le_bytes());
    let digest = deip_crypto::sha256(&bytes);
    let mut out = [0u8; 20];
    out.copy_from_slice(&digest.0[..20]);
    ExternalId(out)
}

pub fn apply_operation(ctx: &mut EvalContext<'_>, op: &Operation) -> Result<(), DeipError> {
    match op.clone() {
        Operation::Transfer { from, to, amount, .. } => {
            accounts::transfer_balance(ctx.db, &from, &to, amount)
        }
        Operation::TransferToCommonTokens { from, to, amount } => {
            accounts::transfer_to_common_tokens(ctx.db, &from, &to, amount)?;
            witnesses::recompute_affected_witnesses(ctx.db, &to)
        }
        Operation::WithdrawCommonTokens { account, total_common_tokens_amount } => {
            let rate = deip_core::asset::Asset::new(
                total_common_tokens_amount.amount / 13,
                total_common_tokens_amount.symbol,
            );
            let next = Some(ctx.head_block_time + deip_core::constants::BLOCK_INTERVAL_SECS * 7 * 24 * 60 * 20);
            accounts::withdraw_common_tokens(ctx.db, &account, total_common_tokens_amount, rate, next)
        }
        Operation::SetWithdrawCommonTokensRoute { .. } => {
            // Withdraw routing to a third party is out of scope for this
            // chain's simplified vesting model (§ Non-goals).
            Ok(())
        }

        Operation::CreateAccountByFaucets { creator, new_account_name, memo_key, owner, active, recovery_account } => {
            accounts::create_account_by_faucets(ctx.db, new_account_name.clone(), memo_key, owner, active, recovery_account, ctx.head_block_time)?;
            ctx.emit(VirtualOperation::AccountCreated { new_account_name, creator });
            Ok(())
        }
        Operation::UpdateAccount { account, memo_key, active } => {
            accounts::update_account(ctx.db, &account, memo_key, active)
        }
        Operation::UpdateOwnerAuthority { account, owner } => {
            accounts::update_owner_authority(ctx.db, &account, owner, ctx.head_block_time)
        }
        Operation::RequestAccountRecovery { recovery_account, account_to_recover, new_owner_authority } => {
            accounts::request_account_recovery(ctx.db, &recovery_account, &account_to_recover, new_owner_authority, ctx.head_block_time)
        }
        Operation::RecoverAccount { account_to_recover, new_owner_authority, recent_owner_authority } => {
            accounts::recover_account(ctx.db, &account_to_recover, &new_owner_authority, &recent_owner_authority, ctx.head_block_time)?;
            ctx.emit(VirtualOperation::AccountRecovered { account: account_to_recover });
            Ok(())
        }
        Operation::ChangeRecoveryAccount { account_to_recover, new_recovery_account } => {
            accounts::change_recovery_account(ctx.db, &account_to_recover, new_recovery_account)
        }
        Operation::UpdateVotingProxy { account, proxy } => witnesses::account_witness_proxy(ctx.db, &account, proxy),

        Operation::WitnessUpdate { owner, signing_key } => witnesses::witness_update(ctx.db, &owner, signing_key, ctx.head_block_time),
        Operation::AccountWitnessVote { account, witness, approve } => {
            witnesses::account_witness_vote(ctx.db, &account, &witness, approve)
        }
        Operation::AccountWitnessProxy { account, proxy } => witnesses::account_witness_proxy(ctx.db, &account, proxy),

        Operation::CreateResearch {
            external_id,
            research_group,
            description_hash,
            disciplines,
            review_share_percent,
            compensation_share_percent,
            is_private,
        } => {
            if ctx.db.find_research_group(&research_group).is_none() {
                let mut members = std::collections::BTreeMap::new();
                members.insert(research_group.clone(), deip_core::constants::FULL_MEMBER_WEIGHT_BASIS_POINTS);
                ctx.db.create_research_group(|id| ResearchGroup {
                    id,
                    account: research_group.clone(),
                    description: String::new(),
                    members,
                    created_at: ctx.head_block_time,
                });
            }
            ctx.db.create_research(|id| Research {
                id,
                external_id,
                research_group,
                description_hash,
                disciplines: disciplines.into_iter().collect(),
                review_share_percent,
                compensation_share_percent,
                is_private,
                is_finished: false,
                eci_per_discipline: Default::default(),
                number_of_positive_reviews: 0,
                number_of_negative_reviews: 0,
                members: Default::default(),
                owned_tokens_percent: deip_core::constants::FULL_MEMBER_WEIGHT_BASIS_POINTS,
                created_at: ctx.head_block_time,
            })?;
            Ok(())
        }
        Operation::CreateResearchContent { external_id, research_external_id, content_type, content_hash, authors, references } => {
            ctx.db.get_research(&research_external_id)?;
            ctx.db.create_research_content(|id| ResearchContent {
                id,
                external_id,
                research_external_id,
                content_type,
                content_hash,
                authors: authors.into_iter().collect(),
                references: references.into_iter().collect(),
                activity_window_start: ctx.head_block_time,
                activity_window_end: ctx.head_block_time,
                activity_round: 0,
                eci_per_discipline: Default::default(),
                created_at: ctx.head_block_time,
            })?;
            Ok(())
        }
        Operation::CreateReview {
            external_id,
            research_content_external_id,
            is_positive,
            author,
            expertise_tokens_amount_per_discipline,
            assessment_model_version,
            criteria_scores,
        } => {
            let content = ctx.db.get_research_content(&research_content_external_id)?.clone();
            let disciplines: std::collections::BTreeSet<_> = expertise_tokens_amount_per_discipline.keys().copied().collect();
            ctx.db.create_review(|id| Review {
                id,
                external_id,
                research_content_external_id,
                is_positive,
                author,
                disciplines: disciplines.clone(),
                expertise_tokens_amount_per_discipline,
                assessment_model_version,
                criteria_scores,
                created_at: ctx.head_block_time,
            })?;

            let research_id = ctx.db.get_research(&content.research_external_id)?.id;
            ctx.db.modify::<Research>(research_id, |r| {
                if is_positive {
                    r.number_of_positive_reviews += 1;
                } else {
                    r.number_of_negative_reviews += 1;
                }
            })?;

            for discipline in disciplines {
                let virtual_op = eci::recompute_content_eci(ctx.db, research_content_external_id, discipline, ctx.head_block_time)?;
                ctx.emit(virtual_op);
            }
            Ok(())
        }
        Operation::CreateReviewVote { review_external_id, discipline, voter, weight } => {
            let review = ctx.db.find_review(&review_external_id).cloned().ok_or_else(|| {
                EvaluationError::UnknownResearchContent(review_external_id.to_string())
            })?;
            ctx.db.create::<ReviewVote>(|id| ReviewVote {
                id,
                review_external_id,
                discipline,
                voter,
                weight,
                created_at: ctx.head_block_time,
            });
            let virtual_op = eci::recompute_content_eci(ctx.db, review.research_content_external_id, discipline, ctx.head_block_time)?;
            ctx.emit(virtual_op);
            Ok(())
        }

        Operation::CreateResearchTokenSale {
            external_id,
            research_external_id,
            research_group,
            security_tokens_on_sale,
            start_time,
            end_time,
            soft_cap,
            hard_cap,
        } => {
            let owning_group = ctx.db.get_research(&research_external_id)?.research_group.clone();
            if owning_group != research_group {
                return Err(ValidationError::Other("only the owning research group may list a token sale".into()).into());
            }
            ctx.db.create_token_sale(|id| deip_core::model::ResearchTokenSale {
                id,
                external_id,
                research_external_id,
                security_tokens_on_sale,
                security_token_symbol: security_tokens_on_sale.symbol,
                start_time,
                end_time,
                soft_cap,
                hard_cap,
                status: deip_core::model::ResearchTokenSaleStatus::Inactive,
                total_amount_collected: deip_core::asset::Asset::zero(soft_cap.symbol),
            })?;
            Ok(())
        }
        Operation::ContributeToTokenSale { research_token_sale_external_id, contributor, amount } => {
            let emitted = token_sale::contribute(ctx.db, research_token_sale_external_id, &contributor, amount, ctx.head_block_time)?;
            for op in emitted {
                ctx.emit(op);
            }
            Ok(())
        }

        Operation::CreateProposal { external_id, proposed_ops, proposer, expiration_time, review_period_seconds } => {
            proposals::create_proposal(ctx.db, external_id, proposed_ops, proposer, expiration_time, review_period_seconds, ctx.head_block_time)
        }
        Operation::UpdateProposal {
            external_id,
            active_approvals_to_add,
            active_approvals_to_remove,
            owner_approvals_to_add,
            owner_approvals_to_remove,
            key_approvals_to_add,
            key_approvals_to_remove,
        } => {
            let completed = proposals::update_proposal(
                ctx.db,
                &external_id,
                active_approvals_to_add,
                active_approvals_to_remove,
                owner_approvals_to_add,
                owner_approvals_to_remove,
                key_approvals_to_add,
                key_approvals_to_remove,
                ctx.head_block_time,
            )?;
            if completed {
                let proposed_ops = ctx.db.get_proposal(&external_id)?.proposed_transaction.operations.clone();
                for nested in &proposed_ops {
                    apply_operation(ctx, nested)?;
                }
                ctx.db.remove_proposal(&external_id)?;
                ctx.emit(VirtualOperation::ProposalExecuted { proposal_external_id: external_id });
            }
            Ok(())
        }
        Operation::DeleteProposal { external_id, requester } => proposals::delete_proposal(ctx.db, &external_id, &requester),

        Operation::CreateExpertiseAllocationProposal { claimer, discipline, quorum_percent, expires_at } => {
            let external_id = derive_external_id(ctx);
            expertise::create_allocation_proposal(ctx.db, external_id, claimer, discipline, quorum_percent, expires_at)?;
            Ok(())
        }
        Operation::VoteForExpertiseAllocationProposal { proposal_external_id, voter, is_upvote, weight } => {
            expertise::vote(ctx.db, proposal_external_id, voter, is_upvote, weight)
        }
    }
}

pub use research::validate_member_weights;
