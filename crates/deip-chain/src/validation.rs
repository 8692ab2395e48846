//! Stateless operation validation (§4.3, §4.8 "validate before evaluate"):
//! shape and range checks that never need to touch the database, run
//! before an operation reaches its evaluator or even an authority check.

use deip_core::constants::MAX_MEMO_LENGTH;
use deip_core::error::{DeipError, ValidationError};
use deip_core::model::account::Authority;
use deip_core::operation::Operation;

fn validate_authority(authority: &Authority) -> Result<(), DeipError> {
    if authority.weight_threshold == 0 {
        return Err(ValidationError::ZeroWeightThreshold.into());
    }
    if authority.is_empty() {
        return Err(ValidationError::EmptyAuthority.into());
    }
    Ok(())
}

fn positive(amount: i64) -> Result<(), DeipError> {
    if amount <= 0 {
        return Err(ValidationError::ZeroAmount.into());
    }
    Ok(())
}

/// Checks one operation's shape in isolation, independent of chain state
/// (§4.3). Authority requirements and cross-record references are checked
/// later, by `deip-authority` and the evaluator respectively.
pub fn validate_operation(op: &Operation) -> Result<(), DeipError> {
    match op {
        Operation::Transfer { from, to, amount, memo } => {
            positive(amount.amount)?;
            if memo.as_ref().is_some_and(|m| m.len() > MAX_MEMO_LENGTH) {
                return Err(ValidationError::MemoTooLong { max: MAX_MEMO_LENGTH }.into());
            }
            if from == to {
                return Err(deip_core::error::EvaluationError::SelfTransfer.into());
            }
            Ok(())
        }
        Operation::TransferToCommonTokens { amount, .. } => positive(amount.amount),
        Operation::WithdrawCommonTokens { total_common_tokens_amount, .. } => {
            if total_common_tokens_amount.amount < 0 {
                return Err(ValidationError::ZeroAmount.into());
            }
            Ok(())
        }
        Operation::SetWithdrawCommonTokensRoute { from, to, percent } => {
            if from == to {
                return Err(ValidationError::Other("cannot route withdrawals to self".into()).into());
            }
            if *percent > deip_core::constants::FULL_MEMBER_WEIGHT_BASIS_POINTS {
                return Err(ValidationError::Other("percent exceeds 100%".into()).into());
            }
            Ok(())
        }

        Operation::CreateAccountByFaucets { owner, active, .. } => {
            validate_authority(owner)?;
            validate_authority(active)
        }
        Operation::UpdateAccount { active, .. } => {
            if let Some(active) = active {
                validate_authority(active)?;
            }
            Ok(())
        }
        Operation::UpdateOwnerAuthority { owner, .. } => validate_authority(owner),
        Operation::RequestAccountRecovery { new_owner_authority, .. } => validate_authority(new_owner_authority),
        Operation::RecoverAccount { account_to_recover: _, new_owner_authority, recent_owner_authority } => {
            if new_owner_authority == recent_owner_authority {
                return Err(ValidationError::Other(
                    "new owner authority must differ from the recent owner authority".into(),
                )
                .into());
            }
            validate_authority(new_owner_authority)?;
            validate_authority(recent_owner_authority)
        }
        Operation::ChangeRecoveryAccount { account_to_recover, new_recovery_account } => {
            if account_to_recover == new_recovery_account {
                return Err(ValidationError::Other("recovery account cannot be the account itself".into()).into());
            }
            Ok(())
        }
        Operation::UpdateVotingProxy { account, proxy } | Operation::AccountWitnessProxy { account, proxy } => {
            if proxy.as_ref() == Some(account) {
                return Err(ValidationError::Other("cannot proxy to self".into()).into());
            }
            Ok(())
        }

        Operation::WitnessUpdate { .. } | Operation::AccountWitnessVote { .. } => Ok(()),

        Operation::CreateResearch { review_share_percent, compensation_share_percent, .. } => {
            if *review_share_percent > deip_core::constants::FULL_MEMBER_WEIGHT_BASIS_POINTS
                || *compensation_share_percent > deip_core::constants::FULL_MEMBER_WEIGHT_BASIS_POINTS
            {
                return Err(ValidationError::Other("share percent exceeds 100%".into()).into());
            }
            Ok(())
        }
        Operation::CreateResearchContent { authors, .. } => {
            if authors.is_empty() {
                return Err(ValidationError::Other("research content must name at least one author".into()).into());
            }
            Ok(())
        }
        Operation::CreateReview { expertise_tokens_amount_per_discipline, .. } => {
            if expertise_tokens_amount_per_discipline.is_empty() {
                return Err(ValidationError::Other("review must commit expertise in at least one discipline".into()).into());
            }
            if expertise_tokens_amount_per_discipline.values().any(|&e| e < 0) {
                return Err(ValidationError::Other("committed expertise cannot be negative".into()).into());
            }
            Ok(())
        }
        Operation::CreateReviewVote { weight, .. } => positive(*weight),

        Operation::CreateResearchTokenSale { start_time, end_time, soft_cap, hard_cap, .. } => {
            if end_time <= start_time {
                return Err(ValidationError::Other("token sale end_time must be after start_time".into()).into());
            }
            positive(soft_cap.amount)?;
            positive(hard_cap.amount)?;
            if hard_cap.amount < soft_cap.amount {
                return Err(ValidationError::Other("hard cap cannot be below soft cap".into()).into());
            }
            Ok(())
        }
        Operation::ContributeToTokenSale { amount, .. } => positive(amount.amount),

        Operation::CreateProposal { proposed_ops, expiration_time: _, .. } => {
            if proposed_ops.is_empty() {
                return Err(ValidationError::EmptyOperationList.into());
            }
            for nested in proposed_ops {
                validate_operation(nested)?;
            }
            Ok(())
        }
        Operation::UpdateProposal { .. } | Operation::DeleteProposal { .. } => Ok(()),

        Operation::CreateExpertiseAllocationProposal { quorum_percent, .. } => {
            if *quorum_percent == 0 || *quorum_percent > deip_core::constants::FULL_MEMBER_WEIGHT_BASIS_POINTS {
                return Err(ValidationError::Other("quorum_percent must be in (0%, 100%]".into()).into());
            }
            Ok(())
        }
        Operation::VoteForExpertiseAllocationProposal { weight, .. } => positive(*weight),
    }
}

pub fn validate_operations(ops: &[Operation]) -> Result<(), DeipError> {
    if ops.is_empty() {
        return Err(ValidationError::EmptyOperationList.into());
    }
    for op in ops {
        validate_operation(op)?;
    }
    Ok(())
}
