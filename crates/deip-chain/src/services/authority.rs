//! Adapts [`Database`] to the storage-free authority solver in
//! `deip-authority` (§4.2). Shared by the proposal engine, which checks
//! approval sets against an all-zero digest, and the pipeline, which
//! checks real signatures against a transaction's signing digest.

use std::collections::BTreeSet;

use deip_core::error::{AuthorityError, DeipError};
use deip_core::model::account::Authority;
use deip_core::operation::Operation;
use deip_core::types::{AccountName, Signature};

use deip_authority::{verify_authority, AuthorityLookup, VerifyAuthorityInput};
use deip_chainbase::Database;
use deip_crypto::recover_public_key;

pub struct DbAuthorityLookup<'a>(pub &'a Database);

impl AuthorityLookup for DbAuthorityLookup<'_> {
    fn get_active(&self, account: &AccountName) -> Option<Authority> {
        self.0.find_authority_record(account).map(|r| r.active.clone())
    }
    fn get_owner(&self, account: &AccountName) -> Option<Authority> {
        self.0.find_authority_record(account).map(|r| r.owner.clone())
    }
    fn get_active_override(&self, account: &AccountName, op_tag: &str) -> Option<Authority> {
        self.0.find_authority_record(account).and_then(|r| r.active_overrides.get(op_tag).cloned())
    }
}

/// Checks that `signatures` satisfy every operation's authority requirement
/// against `signing_digest`, with no approvals pre-authorized (§4.2, used
/// for ordinary signed transactions — proposals pre-approve instead).
pub fn verify_transaction_authority(
    db: &Database,
    ops: &[Operation],
    signatures: &[Signature],
    signing_digest: &[u8; 32],
) -> Result<(), DeipError> {
    let lookup = DbAuthorityLookup(db);
    let empty = BTreeSet::new();
    verify_authority(
        VerifyAuthorityInput {
            ops,
            signatures,
            signing_digest,
            preapproved_active: &empty,
            preapproved_owner: &empty,
            max_recursion_depth: deip_core::constants::MAX_AUTHORITY_RECURSION_DEPTH,
        },
        &lookup,
    )
}

/// Tenant co-signature (§4.2): validated after the normal authority
/// check, and only when the node has a configured tenant. The tenant
/// external id is realized as the tenant's account name — DEIP accounts
/// are already identified by a human-readable name, so no separate
/// external-id-to-account table exists for this lookup.
pub fn verify_tenant_affirmation(
    db: &Database,
    tenant: &AccountName,
    tenant_signature: Option<&Signature>,
    signing_digest: &[u8; 32],
) -> Result<(), DeipError> {
    let sig = tenant_signature.ok_or_else(|| AuthorityError::MissingAuthority {
        account: tenant.to_string(),
        level: "tenant".to_string(),
    })?;
    let key = recover_public_key(sig, signing_digest).map_err(|_| AuthorityError::UnrecoverableSignature)?;
    let authority = db
        .find_authority_record(tenant)
        .map(|r| r.active.clone())
        .ok_or_else(|| AuthorityError::MissingAuthority { account: tenant.to_string(), level: "active".to_string() })?;

    let weight = authority.key_auths.get(&key).copied().unwrap_or(0) as u64;
    if weight >= authority.weight_threshold as u64 {
        Ok(())
    } else {
        Err(AuthorityError::ThresholdNotMet { need: authority.weight_threshold, got: weight as u32 }.into())
    }
}
