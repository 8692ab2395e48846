//! Research token sale state machine (§4.5).

use deip_core::asset::Asset;
use deip_core::constants::MIN_TOKEN_SALE_CONTRIBUTION;
use deip_core::error::{DeipError, EvaluationError};
use deip_core::model::{Account, Research, ResearchTokenSale, ResearchTokenSaleContribution, ResearchTokenSaleStatus};
use deip_core::types::{AccountName, ExternalId, Timestamp};
use deip_core::virtual_op::VirtualOperation;

use deip_chainbase::Database;

/// Accepts (or accumulates) a contribution, rejecting anything outside the
/// sale's active window, below the minimum, or past the hard cap (§4.5).
/// Returns any virtual operations triggered by a hard-cap crossing.
pub fn contribute(
    db: &mut Database,
    sale_external_id: ExternalId,
    contributor: &AccountName,
    amount: Asset,
    now: Timestamp,
) -> Result<Vec<VirtualOperation>, DeipError> {
    if amount.amount < MIN_TOKEN_SALE_CONTRIBUTION {
        return Err(EvaluationError::ContributionTooLow { min: MIN_TOKEN_SALE_CONTRIBUTION }.into());
    }

    let sale = db.get_token_sale(&sale_external_id)?;
    if sale.status != ResearchTokenSaleStatus::Active {
        return Err(EvaluationError::TokenSaleNotActive.into());
    }
    if now < sale.start_time || now >= sale.end_time {
        return Err(EvaluationError::TokenSaleNotActive.into());
    }
    let remaining = sale.hard_cap.checked_sub(&sale.total_amount_collected)?;
    if amount.amount > remaining.amount {
        return Err(EvaluationError::Other("contribution exceeds remaining hard cap capacity".into()).into());
    }

    let contributor_id = db.get_account_by_name(contributor)?.id;
    let new_balance = db.get::<Account>(contributor_id)?.balance.checked_sub(&amount)?;
    db.modify::<Account>(contributor_id, |a| a.balance = new_balance)?;

    match db.find_token_sale_contribution(&sale_external_id, contributor) {
        Some(existing) => {
            let id = existing.id;
            let new_amount = existing.amount.checked_add(&amount)?;
            db.modify::<ResearchTokenSaleContribution>(id, |c| c.amount = new_amount)?;
        }
        None => {
            db.create_token_sale_contribution(|id| ResearchTokenSaleContribution {
                id,
                research_token_sale_external_id: sale_external_id,
                contributor: contributor.clone(),
                amount,
                contributed_at: now,
            });
        }
    }

    let sale_id = db.get_token_sale(&sale_external_id)?.id;
    let new_total = db.get::<ResearchTokenSale>(sale_id)?.total_amount_collected.checked_add(&amount)?;
    db.modify::<ResearchTokenSale>(sale_id, |s| s.total_amount_collected = new_total)?;

    let sale_after = db.get::<ResearchTokenSale>(sale_id)?;
    if sale_after.total_amount_collected.amount >= sale_after.hard_cap.amount {
        return transition(db, sale_external_id, ResearchTokenSaleStatus::CollectingFunds, now);
    }
    Ok(Vec::new())
}

/// Advances any sale whose clock or cap condition crossed a boundary since
/// the last block (§4.5 "processing runs on every block post-apply").
pub fn process_token_sales(db: &mut Database, now: Timestamp) -> Result<Vec<VirtualOperation>, DeipError> {
    let candidates: Vec<(ExternalId, ResearchTokenSaleStatus, Timestamp, bool)> = db
        .all_token_sales()
        .into_iter()
        .map(|s| (s.external_id, s.status, s.end_time, s.total_amount_collected.amount >= s.soft_cap.amount))
        .collect();

    let mut emitted = Vec::new();
    for (external_id, status, end_time, met_soft_cap) in candidates {
        match status {
            ResearchTokenSaleStatus::Inactive => {
                let sale = db.get_token_sale(&external_id)?;
                if now >= sale.start_time {
                    emitted.extend(transition(db, external_id, ResearchTokenSaleStatus::Active, now)?);
                }
            }
            ResearchTokenSaleStatus::Active if now >= end_time => {
                let next =
                    if met_soft_cap { ResearchTokenSaleStatus::CollectingFunds } else { ResearchTokenSaleStatus::Refunding };
                emitted.extend(transition(db, external_id, next, now)?);
            }
            _ => {}
        }
    }
    Ok(emitted)
}

fn transition(
    db: &mut Database,
    external_id: ExternalId,
    to: ResearchTokenSaleStatus,
    now: Timestamp,
) -> Result<Vec<VirtualOperation>, DeipError> {
    let sale_id = db.get_token_sale(&external_id)?.id;
    let from = db.get::<ResearchTokenSale>(sale_id)?.status;
    db.modify::<ResearchTokenSale>(sale_id, |s| s.status = to)?;

    let mut emitted = vec![VirtualOperation::ResearchTokenSaleStatusChanged {
        research_token_sale_external_id: external_id,
        from_status: format!("{from:?}"),
        to_status: format!("{to:?}"),
    }];

    match to {
        ResearchTokenSaleStatus::CollectingFunds => emitted.extend(issue_tokens_pro_rata(db, external_id)?),
        ResearchTokenSaleStatus::Refunding => {
            emitted.extend(refund_all(db, external_id, now)?);
            let sale_id = db.get_token_sale(&external_id)?.id;
            db.modify::<ResearchTokenSale>(sale_id, |s| s.status = ResearchTokenSaleStatus::Expired)?;
            emitted.push(VirtualOperation::ResearchTokenSaleStatusChanged {
                research_token_sale_external_id: external_id,
                from_status: format!("{:?}", ResearchTokenSaleStatus::Refunding),
                to_status: format!("{:?}", ResearchTokenSaleStatus::Expired),
            });
        }
        _ => {}
    }
    Ok(emitted)
}

/// Issues security tokens to every contributor in proportion to their
/// contribution (§4.5 "issues security tokens pro-rata") by admitting them
/// as research members; the contributor's `Research::members` entry records
/// that they now hold a stake in the research this sale financed.
fn issue_tokens_pro_rata(db: &mut Database, external_id: ExternalId) -> Result<Vec<VirtualOperation>, DeipError> {
    let sale_id = db.get_token_sale(&external_id)?.id;
    let sale = db.get::<ResearchTokenSale>(sale_id)?.clone();
    let contributions: Vec<(AccountName, i64)> =
        db.contributions_for_sale(&external_id).into_iter().map(|c| (c.contributor.clone(), c.amount.amount)).collect();
    let total_collected = sale.total_amount_collected.amount.max(1);

    let research_id = db.get_research(&sale.research_external_id)?.id;
    let mut emitted = Vec::new();
    for (contributor, contributed) in contributions {
        let share = (sale.security_tokens_on_sale.amount as i128 * contributed as i128 / total_collected as i128) as i64;
        let issued = Asset::new(share, sale.security_token_symbol);
        db.modify::<Research>(research_id, |r| {
            r.members.insert(contributor.clone());
        })?;
        emitted.push(VirtualOperation::TokenSaleTokensIssued {
            research_token_sale_external_id: external_id,
            recipient: contributor,
            amount: issued,
        });
    }
    Ok(emitted)
}

fn refund_all(db: &mut Database, external_id: ExternalId, _now: Timestamp) -> Result<Vec<VirtualOperation>, DeipError> {
    let contributions: Vec<(AccountName, Asset)> =
        db.contributions_for_sale(&external_id).into_iter().map(|c| (c.contributor.clone(), c.amount)).collect();

    let mut emitted = Vec::new();
    for (contributor, amount) in contributions {
        let account_id = db.get_account_by_name(&contributor)?.id;
        let new_balance = db.get::<Account>(account_id)?.balance.checked_add(&amount)?;
        db.modify::<Account>(account_id, |a| a.balance = new_balance)?;
        emitted.push(VirtualOperation::TokenSaleContributionRefunded {
            research_token_sale_external_id: external_id,
            contributor,
            amount,
        });
    }
    Ok(emitted)
}
