//! Research, research content, and research group mutators (§4.3 research
//! category). ECI bookkeeping itself lives in [`crate::eci`]; this module
//! only owns the plain record shape invariants.

use deip_core::error::{DeipError, ValidationError};
use deip_core::model::{Research, ResearchGroup};
use deip_core::types::{AccountName, ExternalId};

use deip_chainbase::Database;

/// A research group's member weights must sum to exactly 100% (§3, §8).
pub fn validate_member_weights(group: &ResearchGroup) -> Result<(), DeipError> {
    if group.total_weight_basis_points() != deip_core::constants::FULL_MEMBER_WEIGHT_BASIS_POINTS as u32 {
        return Err(ValidationError::Other(format!(
            "research group member weights sum to {}, expected {}",
            group.total_weight_basis_points(),
            deip_core::constants::FULL_MEMBER_WEIGHT_BASIS_POINTS
        ))
        .into());
    }
    Ok(())
}

pub fn finish_research(db: &mut Database, external_id: &ExternalId) -> Result<(), DeipError> {
    let id = db.get_research(external_id)?.id;
    db.modify::<Research>(id, |r| r.is_finished = true)?;
    Ok(())
}

pub fn set_owned_tokens_percent(db: &mut Database, external_id: &ExternalId, percent: u16) -> Result<(), DeipError> {
    if percent > 10_000 {
        return Err(ValidationError::Other("owned_tokens_percent out of range".into()).into());
    }
    let id = db.get_research(external_id)?.id;
    db.modify::<Research>(id, |r| r.owned_tokens_percent = percent)?;
    Ok(())
}

/// Adds `account` to a research's member set (used when a token sale issues
/// tokens or a proposal admits a new member).
pub fn add_research_member(db: &mut Database, external_id: &ExternalId, account: AccountName) -> Result<(), DeipError> {
    let id = db.get_research(external_id)?.id;
    db.modify::<Research>(id, |r| {
        r.members.insert(account);
    })?;
    Ok(())
}
