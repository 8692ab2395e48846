use std::collections::{BTreeSet, HashSet};

use deip_core::error::{AuthorityError, DeipError};
use deip_core::model::account::Authority;
use deip_core::operation::Operation;
use deip_core::types::{AccountName, PublicKey, Signature};
use deip_crypto::recover_public_key;

/// Storage access the solver needs, supplied by the caller (`deip-chain`'s
/// account service) so this crate stays free of a chainbase dependency.
pub trait AuthorityLookup {
    fn get_active(&self, account: &AccountName) -> Option<Authority>;
    fn get_owner(&self, account: &AccountName) -> Option<Authority>;
    /// An `active_override` for `account` under the given operation tag, if
    /// one is registered (§4.2 step 2).
    fn get_active_override(&self, account: &AccountName, op_tag: &str) -> Option<Authority>;
}

pub struct VerifyAuthorityInput<'a> {
    pub ops: &'a [Operation],
    pub signatures: &'a [Signature],
    pub signing_digest: &'a [u8; 32],
    pub preapproved_active: &'a BTreeSet<AccountName>,
    pub preapproved_owner: &'a BTreeSet<AccountName>,
    pub max_recursion_depth: u8,
}

/// §4.2 `verify_authority`. Fails closed: any required authority left
/// unsatisfied, any unrecoverable signature, or any recovered signature
/// that contributed to no authority is rejected.
pub fn verify_authority(
    input: VerifyAuthorityInput<'_>,
    lookup: &impl AuthorityLookup,
) -> Result<(), DeipError> {
    let mut recovered_keys = Vec::with_capacity(input.signatures.len());
    let mut seen = HashSet::new();
    for sig in input.signatures {
        let key = recover_public_key(sig, input.signing_digest)
            .map_err(|_| AuthorityError::UnrecoverableSignature)?;
        if !seen.insert(key.clone()) {
            return Err(AuthorityError::DuplicateSignature.into());
        }
        recovered_keys.push(key);
    }
    let mut used = vec![false; recovered_keys.len()];

    for op in input.ops {
        for account in op.required_owner_auths() {
            let authority = lookup
                .get_owner(account)
                .ok_or_else(|| AuthorityError::MissingAuthority {
                    account: account.to_string(),
                    level: "owner".to_string(),
                })?;
            satisfy(
                account,
                &authority,
                "owner",
                &recovered_keys,
                &mut used,
                input.preapproved_owner,
                input.preapproved_active,
                lookup,
                0,
                input.max_recursion_depth,
            )?;
        }
        for account in op.required_active_auths() {
            let authority = lookup
                .get_active_override(account, op.tag())
                .or_else(|| lookup.get_active(account))
                .ok_or_else(|| AuthorityError::MissingAuthority {
                    account: account.to_string(),
                    level: "active".to_string(),
                })?;
            satisfy(
                account,
                &authority,
                "active",
                &recovered_keys,
                &mut used,
                input.preapproved_owner,
                input.preapproved_active,
                lookup,
                0,
                input.max_recursion_depth,
            )?;
        }
    }

    if used.iter().any(|&u| !u) {
        return Err(AuthorityError::IrrelevantSignature.into());
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn satisfy(
    account: &AccountName,
    authority: &Authority,
    level: &str,
    recovered_keys: &[PublicKey],
    used: &mut [bool],
    preapproved_owner: &BTreeSet<AccountName>,
    preapproved_active: &BTreeSet<AccountName>,
    lookup: &impl AuthorityLookup,
    depth: u8,
    max_depth: u8,
) -> Result<(), DeipError> {
    if depth > max_depth {
        return Err(AuthorityError::RecursionDepthExceeded { max: max_depth }.into());
    }

    let preapproved = match level {
        "owner" => preapproved_owner.contains(account),
        _ => preapproved_active.contains(account),
    };
    if preapproved {
        return Ok(());
    }

    let mut total_weight: u64 = 0;

    for (key, weight) in &authority.key_auths {
        if let Some(idx) = recovered_keys.iter().position(|k| k == key) {
            used[idx] = true;
            total_weight += *weight as u64;
        }
    }

    for (sub_account, weight) in &authority.account_auths {
        let sub_authority = match level {
            "owner" => lookup.get_owner(sub_account),
            _ => lookup.get_active(sub_account),
        };
        let Some(sub_authority) = sub_authority else {
            continue;
        };
        if satisfy(
            sub_account,
            &sub_authority,
            level,
            recovered_keys,
            used,
            preapproved_owner,
            preapproved_active,
            lookup,
            depth + 1,
            max_depth,
        )
        .is_ok()
        {
            total_weight += *weight as u64;
        }
    }

    if total_weight >= authority.weight_threshold as u64 {
        Ok(())
    } else {
        Err(AuthorityError::ThresholdNotMet { need: authority.weight_threshold, got: total_weight as u32 }.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deip_core::types::AccountName;
    use std::collections::BTreeMap;

    struct MapLookup {
        active: BTreeMap<AccountName, Authority>,
        owner: BTreeMap<AccountName, Authority>,
    }

    impl AuthorityLookup for MapLookup {
        fn get_active(&self, account: &AccountName) -> Option<Authority> {
            self.active.get(account).cloned()
        }
        fn get_owner(&self, account: &AccountName) -> Option<Authority> {
            self.owner.get(account).cloned()
        }
        fn get_active_override(&self, _account: &AccountName, _op_tag: &str) -> Option<Authority> {
            None
        }
    }

    fn single_key_authority(key: &PublicKey, weight: u16) -> Authority {
        let mut key_auths = BTreeMap::new();
        key_auths.insert(key.clone(), weight);
        Authority { weight_threshold: weight as u32, account_auths: BTreeMap::new(), key_auths }
    }

    #[test]
    fn single_signature_satisfies_single_key_authority() {
        let keypair = deip_crypto::KeyPair::generate();
        let alice = AccountName::new_unchecked("alice");
        let mut active = BTreeMap::new();
        active.insert(alice.clone(), single_key_authority(&keypair.public_key, 1));
        let lookup = MapLookup { active, owner: BTreeMap::new() };

        let digest = [1u8; 32];
        let sig = keypair.sign_prehash(&digest);
        let op = deip_core::operation::Operation::Transfer {
            from: alice.clone(),
            to: AccountName::new_unchecked("bob"),
            amount: deip_core::asset::Asset::core(1),
            memo: None,
        };
        let ops = vec![op];
        let sigs = vec![sig];
        let preapproved = BTreeSet::new();

        let result = verify_authority(
            VerifyAuthorityInput {
                ops: &ops,
                signatures: &sigs,
                signing_digest: &digest,
                preapproved_active: &preapproved,
                preapproved_owner: &preapproved,
                max_recursion_depth: 2,
            },
            &lookup,
        );
        assert!(result.is_ok());
    }

    #[test]
    fn irrelevant_signature_is_rejected() {
        let keypair = deip_crypto::KeyPair::generate();
        let unrelated = deip_crypto::KeyPair::generate();
        let alice = AccountName::new_unchecked("alice");
        let mut active = BTreeMap::new();
        active.insert(alice.clone(), single_key_authority(&keypair.public_key, 1));
        let lookup = MapLookup { active, owner: BTreeMap::new() };

        let digest = [2u8; 32];
        let sig = keypair.sign_prehash(&digest);
        let extra_sig = unrelated.sign_prehash(&digest);
        let op = deip_core::operation::Operation::Transfer {
            from: alice.clone(),
            to: AccountName::new_unchecked("bob"),
            amount: deip_core::asset::Asset::core(1),
            memo: None,
        };
        let ops = vec![op];
        let sigs = vec![sig, extra_sig];
        let preapproved = BTreeSet::new();

        let result = verify_authority(
            VerifyAuthorityInput {
                ops: &ops,
                signatures: &sigs,
                signing_digest: &digest,
                preapproved_active: &preapproved,
                preapproved_owner: &preapproved,
                max_recursion_depth: 2,
            },
            &lookup,
        );
        assert!(matches!(result, Err(DeipError::Authority(AuthorityError::IrrelevantSignature))));
    }

    fn delegating_authority(delegate: &AccountName, weight: u16) -> Authority {
        let mut account_auths = BTreeMap::new();
        account_auths.insert(delegate.clone(), weight);
        Authority { weight_threshold: weight as u32, account_auths, key_auths: BTreeMap::new() }
    }

    /// A chain of account delegations exactly `max_recursion_depth` deep
    /// (§8 "authority recursion at depth MAX_DEPTH succeeds; at
    /// MAX_DEPTH + 1 fails"). `a0 -> a1 -> a2`, with `a2` holding the key
    /// that actually signs, bottoms out at recursion depth 2.
    #[test]
    fn recursion_at_the_depth_limit_succeeds_one_deeper_fails() {
        let keypair = deip_crypto::KeyPair::generate();
        let a0 = AccountName::new_unchecked("a0");
        let a1 = AccountName::new_unchecked("a1");
        let a2 = AccountName::new_unchecked("a2");

        let mut active = BTreeMap::new();
        active.insert(a0.clone(), delegating_authority(&a1, 1));
        active.insert(a1.clone(), delegating_authority(&a2, 1));
        active.insert(a2.clone(), single_key_authority(&keypair.public_key, 1));
        let lookup = MapLookup { active, owner: BTreeMap::new() };

        let digest = [3u8; 32];
        let sig = keypair.sign_prehash(&digest);
        let op = deip_core::operation::Operation::Transfer {
            from: a0.clone(),
            to: AccountName::new_unchecked("bob"),
            amount: deip_core::asset::Asset::core(1),
            memo: None,
        };
        let ops = vec![op];
        let sigs = vec![sig];
        let preapproved = BTreeSet::new();

        let at_limit = verify_authority(
            VerifyAuthorityInput {
                ops: &ops,
                signatures: &sigs,
                signing_digest: &digest,
                preapproved_active: &preapproved,
                preapproved_owner: &preapproved,
                max_recursion_depth: 2,
            },
            &lookup,
        );
        assert!(at_limit.is_ok(), "a 2-hop delegation chain must satisfy a depth-2 limit");

        let one_deeper = verify_authority(
            VerifyAuthorityInput {
                ops: &ops,
                signatures: &sigs,
                signing_digest: &digest,
                preapproved_active: &preapproved,
                preapproved_owner: &preapproved,
                max_recursion_depth: 1,
            },
            &lookup,
        );
        assert!(one_deeper.is_err(), "the same chain must fail once the limit no longer reaches the signing account");
    }
}
