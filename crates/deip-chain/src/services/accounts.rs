//! Account balances, authority records, recovery, and witness-vote proxying
//! (§4.3 account lifecycle, witness categories).

use deip_core::asset::Asset;
use deip_core::constants::{
    ACCOUNT_RECOVERY_REQUEST_EXPIRATION_SECS, MAX_PROXY_RECURSION_DEPTH, OWNER_AUTH_RECOVERY_WINDOW_SECS,
};
use deip_core::error::{DeipError, EvaluationError};
use deip_core::model::account::Authority;
use deip_core::model::{Account, AuthorityRecord, Witness};
use deip_core::types::{AccountName, PublicKey, Timestamp};

use deip_chainbase::Database;

/// Registers a brand new account and its authority record in one step
/// (§4.3 `create_account_by_faucets`) — DEIP accounts are faucet-created
/// rather than paid for directly, so there is no balance debit here.
#[allow(clippy::too_many_arguments)]
pub fn create_account_by_faucets(
    db: &mut Database,
    new_account_name: AccountName,
    memo_key: PublicKey,
    owner: Authority,
    active: Authority,
    recovery_account: AccountName,
    now: Timestamp,
) -> Result<(), DeipError> {
    db.create_account(|id| Account {
        id,
        name: new_account_name.clone(),
        memo_key,
        balance: Asset::core(0),
        common_tokens_balance: Asset::core(0),
        withdrawn: Asset::core(0),
        to_withdraw: Asset::core(0),
        withdraw_rate: Asset::core(0),
        next_vesting_withdrawal: None,
        recovery_account,
        last_owner_update: now,
        created_at: now,
        proxy: None,
        witnesses_voted_for: 0,
    })?;
    db.create_authority_record(|id| AuthorityRecord {
        id,
        account: new_account_name,
        owner,
        active,
        active_overrides: Default::default(),
        last_owner_update: now,
    });
    Ok(())
}

pub fn update_account(
    db: &mut Database,
    account: &AccountName,
    memo_key: Option<PublicKey>,
    active: Option<Authority>,
) -> Result<(), DeipError> {
    if let Some(memo_key) = memo_key {
        let id = db.get_account_by_name(account)?.id;
        db.modify::<Account>(id, |a| a.memo_key = memo_key)?;
    }
    if let Some(active) = active {
        let record_id = db
            .find_authority_record(account)
            .ok_or_else(|| EvaluationError::UnknownAccount(account.to_string()))?
            .id;
        db.modify::<AuthorityRecord>(record_id, |r| r.active = active)?;
    }
    Ok(())
}

/// Files a recovery request on behalf of `account_to_recover`'s recovery
/// account (§4.3 `request_account_recovery`). Only the account's
/// registered `recovery_account` may do this; the caller validates that
/// via the operation's `required_active_auths` before reaching here.
pub fn request_account_recovery(
    db: &mut Database,
    recovery_account: &AccountName,
    account_to_recover: &AccountName,
    new_owner_authority: Authority,
    now: Timestamp,
) -> Result<(), DeipError> {
    let account = db.get_account_by_name(account_to_recover)?;
    if &account.recovery_account != recovery_account {
        return Err(EvaluationError::RecoveryNotActive(account_to_recover.to_string()).into());
    }
    db.put_account_recovery_request(
        account_to_recover.clone(),
        new_owner_authority,
        now + ACCOUNT_RECOVERY_REQUEST_EXPIRATION_SECS,
    );
    Ok(())
}

/// Completes a recovery: the caller must present both the pending
/// request's `new_owner_authority` and an owner authority that was
/// actually in force within the last recovery window, proving they held
/// the account before it was compromised (§4.3 `recover_account`).
pub fn recover_account(
    db: &mut Database,
    account_to_recover: &AccountName,
    new_owner_authority: &Authority,
    recent_owner_authority: &Authority,
    now: Timestamp,
) -> Result<(), DeipError> {
    let request = db
        .find_account_recovery_request(account_to_recover)
        .ok_or_else(|| EvaluationError::RecoveryNotActive(account_to_recover.to_string()))?;
    if request.expires_at <= now {
        return Err(EvaluationError::RecoveryNotActive(account_to_recover.to_string()).into());
    }
    if &request.new_owner_authority != new_owner_authority {
        return Err(EvaluationError::RecoveryNotActive(account_to_recover.to_string()).into());
    }

    let record = db
        .find_authority_record(account_to_recover)
        .ok_or_else(|| EvaluationError::UnknownAccount(account_to_recover.to_string()))?;
    let account = db.get_account_by_name(account_to_recover)?;
    let within_window = account.last_owner_update + OWNER_AUTH_RECOVERY_WINDOW_SECS >= now;
    if &record.owner != recent_owner_authority && !within_window {
        return Err(EvaluationError::RecoveryNotActive(account_to_recover.to_string()).into());
    }

    update_owner_authority(db, account_to_recover, new_owner_authority.clone(), now)?;
    db.remove_account_recovery_request(account_to_recover)?;
    Ok(())
}

pub fn change_recovery_account(
    db: &mut Database,
    account_to_recover: &AccountName,
    new_recovery_account: AccountName,
) -> Result<(), DeipError> {
    set_recovery_account(db, account_to_recover, new_recovery_account)
}

/// Credits `account`'s core-asset balance without debiting anyone —
/// used by the budget and vesting sweeps, which pay out of a record
/// that already owns the funds rather than another account's balance.
pub fn transfer_balance_in(db: &mut Database, account: &AccountName, amount: Asset) -> Result<(), DeipError> {
    let id = db.get_account_by_name(account)?.id;
    let new_balance = db.get::<Account>(id)?.balance.checked_add(&amount)?;
    db.modify::<Account>(id, |a| a.balance = new_balance)?;
    Ok(())
}

pub fn transfer_balance(db: &mut Database, from: &AccountName, to: &AccountName, amount: Asset) -> Result<(), DeipError> {
    let from_id = db.get_account_by_name(from)?.id;
    let to_id = db.get_account_by_name(to)?.id;

    let new_from_balance = db.get::<Account>(from_id)?.balance.checked_sub(&amount)?;
    db.modify::<Account>(from_id, |account| account.balance = new_from_balance)?;
    let new_to_balance = db.get::<Account>(to_id)?.balance.checked_add(&amount)?;
    db.modify::<Account>(to_id, |account| account.balance = new_to_balance)?;
    Ok(())
}

pub fn transfer_to_common_tokens(db: &mut Database, from: &AccountName, to: &AccountName, amount: Asset) -> Result<(), DeipError> {
    let from_id = db.get_account_by_name(from)?.id;
    let to_id = db.get_account_by_name(to)?.id;

    let new_from_balance = db.get::<Account>(from_id)?.balance.checked_sub(&amount)?;
    db.modify::<Account>(from_id, |account| account.balance = new_from_balance)?;
    let new_to_common = db.get::<Account>(to_id)?.common_tokens_balance.checked_add(&amount)?;
    db.modify::<Account>(to_id, |account| account.common_tokens_balance = new_to_common)?;
    Ok(())
}

pub fn withdraw_common_tokens(
    db: &mut Database,
    account: &AccountName,
    to_withdraw: Asset,
    withdraw_rate: Asset,
    next_withdrawal: Option<Timestamp>,
) -> Result<(), DeipError> {
    let id = db.get_account_by_name(account)?.id;
    db.modify::<Account>(id, |a| {
        a.to_withdraw = to_withdraw;
        a.withdraw_rate = withdraw_rate;
        a.next_vesting_withdrawal = next_withdrawal;
    })?;
    Ok(())
}

pub fn set_recovery_account(db: &mut Database, account: &AccountName, new_recovery_account: AccountName) -> Result<(), DeipError> {
    let id = db.get_account_by_name(account)?.id;
    db.modify::<Account>(id, |a| a.recovery_account = new_recovery_account)?;
    Ok(())
}

pub fn set_voting_proxy(db: &mut Database, account: &AccountName, proxy: Option<AccountName>) -> Result<(), DeipError> {
    let id = db.get_account_by_name(account)?.id;
    db.modify::<Account>(id, |a| a.proxy = proxy)?;
    Ok(())
}

/// Walks the proxy chain from `account`, returning the final account whose
/// vote weight actually counts, bounded by `MAX_PROXY_RECURSION_DEPTH`
/// (§4.3: "via proxy chain up to depth 4").
pub fn resolve_proxy_chain(db: &Database, account: &AccountName) -> Result<AccountName, DeipError> {
    let mut current = account.clone();
    for _ in 0..MAX_PROXY_RECURSION_DEPTH {
        let record = db.get_account_by_name(&current)?;
        match &record.proxy {
            Some(next) if next != &current => current = next.clone(),
            _ => return Ok(current),
        }
    }
    Ok(current)
}

/// Authority record accessors shared by the account and witness evaluators.
pub fn authority_record(db: &Database, account: &AccountName) -> Result<&AuthorityRecord, DeipError> {
    db.find_authority_record(account)
        .ok_or_else(|| EvaluationError::UnknownAccount(account.to_string()).into())
}

pub fn update_owner_authority(db: &mut Database, account: &AccountName, new_owner: deip_core::model::Authority, now: Timestamp) -> Result<(), DeipError> {
    let record_id = db
        .find_authority_record(account)
        .ok_or_else(|| EvaluationError::UnknownAccount(account.to_string()))?
        .id;
    db.modify::<AuthorityRecord>(record_id, |r| {
        r.owner = new_owner;
        r.last_owner_update = now;
    })?;
    let account_id = db.get_account_by_name(account)?.id;
    db.modify::<Account>(account_id, |a| a.last_owner_update = now)?;
    Ok(())
}

/// Recomputes `witness.votes` as the sum of staked common-token weight over
/// every direct and proxied voter (§4.3). Called after any vote, proxy, or
/// balance change that could move a witness's vote total.
pub fn recompute_witness_votes(db: &mut Database, witness: &AccountName) -> Result<(), DeipError> {
    let voters: Vec<AccountName> = db
        .iter::<deip_core::model::WitnessVote>()
        .filter(|(_, v)| &v.witness == witness)
        .map(|(_, v)| v.account.clone())
        .collect();

    let mut total: u64 = 0;
    for voter in voters {
        let final_voter = resolve_proxy_chain(db, &voter)?;
        let acc = db.get_account_by_name(&final_voter)?;
        total += acc.common_tokens_balance.amount.max(0) as u64;
    }

    let witness_id = db.get_witness(witness)?.id;
    db.modify::<Witness>(witness_id, |w| w.votes = total)?;
    Ok(())
}
