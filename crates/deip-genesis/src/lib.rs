//! Genesis construction (§6): builds the chain's founding state directly
//! into a [`Database`], with no parent block, no signatures, and no open
//! undo session — this is the one place state is written that can never
//! be rolled back.

pub mod params;

pub use params::{
    GenesisAccount, GenesisAsset, GenesisBalance, GenesisExpertToken, GenesisProposal, GenesisRecord, GenesisReview,
    GenesisResearch, GenesisResearchContent, GenesisResearchGroup, GenesisVestingBalance, GenesisWitnessCandidate,
};

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::info;

use deip_core::asset::Asset;
use deip_core::constants::FULL_MEMBER_WEIGHT_BASIS_POINTS;
use deip_core::error::DeipError;
use deip_core::model::account::Authority;
use deip_core::model::{Account, AuthorityRecord, DynamicGlobalProperties, Research, ResearchContent, ResearchGroup, Review, VestingBalance, Witness, WitnessSchedule, WitnessScheduleSlot};
use deip_core::types::{AccountName, Sha256Digest};

/// Failures specific to constructing genesis state — distinct from
/// `DeipError` because they can only ever happen once, before any block
/// exists, and have no bearing on the ordinary transaction/block error
/// surface (§7 names no "genesis" category).
#[derive(Debug, Error)]
pub enum GenesisError {
    #[error("genesis chain id mismatch: record declares {declared}, computed {computed}")]
    ChainIdMismatch { declared: String, computed: String },

    #[error("genesis supply mismatch: declared {declared:?}, allocated {allocated:?}")]
    SupplyMismatch { declared: Asset, allocated: Asset },

    #[error("research group {group} member weights sum to {sum_basis_points}, must equal {expected_basis_points}")]
    InvalidMemberWeights { group: String, sum_basis_points: u32, expected_basis_points: u16 },

    #[error(transparent)]
    Chain(#[from] DeipError),
}

/// Computes the chain id a [`GenesisRecord`] commits to: the sha256 of its
/// canonical encoding with `initial_chain_id` zeroed out.
pub fn compute_chain_id(record: &GenesisRecord) -> Sha256Digest {
    let zeroed = record.with_zeroed_chain_id();
    let bytes = bincode::serialize(&zeroed).expect("genesis record serialization is infallible");
    deip_crypto::sha256(&bytes)
}

fn single_key_authority(key: &deip_core::types::PublicKey) -> Authority {
    let mut key_auths = BTreeMap::new();
    key_auths.insert(key.clone(), 1);
    Authority { weight_threshold: 1, account_auths: BTreeMap::new(), key_auths }
}

/// Builds the chain's genesis state into `db`, which must be freshly
/// constructed. Returns the verified chain id on success, matching the
/// record's own `initial_chain_id` — callers past this point can treat it
/// as the chain's identity for signing digests.
pub fn apply_genesis(db: &mut deip_chainbase::Database, record: &GenesisRecord) -> Result<Sha256Digest, GenesisError> {
    let computed = compute_chain_id(record);
    if computed != record.initial_chain_id {
        return Err(GenesisError::ChainIdMismatch { declared: record.initial_chain_id.to_hex(), computed: computed.to_hex() });
    }
    write_genesis_state(db, record, computed)?;
    Ok(computed)
}

/// Same as [`apply_genesis`] but trusts `chain_id` instead of deriving and
/// checking it against the record's self-reference (§6 `chain_id_override`
/// config option) — legal only when replaying from a trusted block log,
/// never over the network, same restriction as the pipeline's skip flags.
pub fn apply_genesis_with_chain_id_override(
    db: &mut deip_chainbase::Database,
    record: &GenesisRecord,
    chain_id: Sha256Digest,
) -> Result<Sha256Digest, GenesisError> {
    write_genesis_state(db, record, chain_id)?;
    Ok(chain_id)
}

fn write_genesis_state(db: &mut deip_chainbase::Database, record: &GenesisRecord, chain_id: Sha256Digest) -> Result<(), GenesisError> {
    info!(timestamp = record.initial_timestamp, "applying genesis state");

    for declared in &record.disciplines {
        info!(discipline = declared, "genesis: discipline declared");
    }
    for asset in &record.assets {
        deip_core::asset::AssetSymbol::new(&asset.ticker, asset.precision)?;
        info!(ticker = %asset.ticker, precision = asset.precision, "genesis: asset symbol declared");
    }

    for account in &record.accounts {
        create_account(db, account)?;
    }
    info!(count = record.accounts.len(), "genesis: accounts created");

    let mut allocated = Asset::zero(record.init_supply.symbol);
    for balance in &record.account_balances {
        let id = db.get_account_by_name(&balance.account)?.id;
        db.modify::<Account>(id, |a| a.balance = balance.amount)?;
        allocated = allocated.checked_add(&balance.amount)?;
    }
    info!(count = record.account_balances.len(), "genesis: account balances allocated");

    for candidate in &record.witness_candidates {
        db.create_witness(|id| Witness {
            id,
            owner: candidate.owner.clone(),
            signing_key: candidate.signing_key.clone(),
            votes: 0,
            schedule: WitnessScheduleSlot::None,
            virtual_last_update: 0,
            virtual_position: 0,
            virtual_scheduled_time: 0,
            total_missed: 0,
            last_confirmed_block_num: 0,
            created_at: record.initial_timestamp,
        });
    }
    info!(count = record.witness_candidates.len(), "genesis: witness candidates registered");

    for token in &record.expert_tokens {
        db.upsert_expertise_token(token.account.clone(), token.discipline, token.amount);
    }
    info!(count = record.expert_tokens.len(), "genesis: expertise tokens seeded");

    for group in &record.research_groups {
        let sum_basis_points: u32 = group.members.values().map(|&w| w as u32).sum();
        if sum_basis_points != FULL_MEMBER_WEIGHT_BASIS_POINTS as u32 {
            return Err(GenesisError::InvalidMemberWeights {
                group: group.account.to_string(),
                sum_basis_points,
                expected_basis_points: FULL_MEMBER_WEIGHT_BASIS_POINTS,
            });
        }
        db.create_research_group(|id| ResearchGroup {
            id,
            account: group.account.clone(),
            description: group.description.clone(),
            members: group.members.clone(),
            created_at: group.created_at,
        });
    }
    info!(count = record.research_groups.len(), "genesis: research groups created");

    for research in &record.researches {
        db.create_research(|id| Research {
            id,
            external_id: research.external_id,
            research_group: research.research_group.clone(),
            description_hash: research.description_hash,
            disciplines: research.disciplines.iter().copied().collect(),
            review_share_percent: research.review_share_percent,
            compensation_share_percent: research.compensation_share_percent,
            is_private: research.is_private,
            is_finished: false,
            eci_per_discipline: BTreeMap::new(),
            number_of_positive_reviews: 0,
            number_of_negative_reviews: 0,
            members: research.members.iter().cloned().collect(),
            owned_tokens_percent: research.owned_tokens_percent,
            created_at: research.created_at,
        })?;
    }
    info!(count = record.researches.len(), "genesis: researches created");

    for content in &record.research_contents {
        db.create_research_content(|id| ResearchContent {
            id,
            external_id: content.external_id,
            research_external_id: content.research_external_id,
            content_type: content.content_type,
            content_hash: content.content_hash,
            authors: content.authors.iter().cloned().collect(),
            references: content.references.iter().copied().collect(),
            activity_window_start: content.created_at,
            activity_window_end: content.created_at,
            activity_round: 0,
            eci_per_discipline: BTreeMap::new(),
            created_at: content.created_at,
        })?;
    }
    info!(count = record.research_contents.len(), "genesis: research content created");

    for review in &record.research_content_reviews {
        db.create_review(|id| Review {
            id,
            external_id: review.external_id,
            research_content_external_id: review.research_content_external_id,
            is_positive: review.is_positive,
            author: review.author.clone(),
            disciplines: review.disciplines.iter().copied().collect(),
            expertise_tokens_amount_per_discipline: review.expertise_tokens_amount_per_discipline.clone(),
            assessment_model_version: 0,
            criteria_scores: review.criteria_scores.clone(),
            created_at: review.created_at,
        })?;
    }
    info!(count = record.research_content_reviews.len(), "genesis: reviews created");

    for vesting in &record.vesting_balances {
        db.create_vesting_balance(|id| VestingBalance {
            id,
            owner: vesting.owner.clone(),
            balance: vesting.balance,
            withdrawn: Asset::zero(vesting.balance.symbol),
            cliff_seconds: vesting.cliff_seconds,
            total_duration_seconds: vesting.total_duration_seconds,
            period_seconds: vesting.period_seconds,
            start_time: vesting.start_time,
        });
        allocated = allocated.checked_add(&vesting.balance)?;
    }
    info!(count = record.vesting_balances.len(), "genesis: vesting balances created");

    for proposal in &record.proposals {
        db.create_proposal(|id| deip_core::model::Proposal {
            id,
            external_id: proposal.external_id,
            proposed_transaction: proposal.proposed_transaction.clone(),
            proposer: proposal.proposer.clone(),
            expiration_time: proposal.expiration_time,
            review_period_seconds: proposal.review_period_seconds,
            active_approvals: Default::default(),
            owner_approvals: Default::default(),
            key_approvals: Default::default(),
            is_completed: false,
        })?;
    }
    info!(count = record.proposals.len(), "genesis: proposals created");

    if allocated != record.init_supply {
        return Err(GenesisError::SupplyMismatch { declared: record.init_supply, allocated });
    }
    info!(total = ?allocated, "genesis: supply verified");

    let first_witness = record.witness_candidates.first().map(|w| w.owner.clone()).unwrap_or_else(|| record.registrar.clone());
    db.create(|id| DynamicGlobalProperties {
        id,
        head_block_number: 0,
        head_block_id: Sha256Digest([0u8; 32]),
        head_block_time: record.initial_timestamp,
        current_witness: first_witness,
        current_supply: record.init_supply,
        maximum_block_size: 131_072,
        current_aslot: 0,
        recent_slots_filled: 0,
        last_irreversible_block_num: 0,
    });
    db.create(|id| WitnessSchedule {
        id,
        current_shuffled_witnesses: Vec::new(),
        current_virtual_time: 0,
        next_shuffle_block_num: 1,
        num_scheduled_witnesses: 0,
        top_voted_witnesses: 0,
        runner_witnesses: 0,
        witness_pay_normalization_factor: 0,
        majority_version: 0,
        median_maximum_block_size: 131_072,
    });

    info!(chain_id = %chain_id, "genesis state committed");
    Ok(())
}

fn create_account(db: &mut deip_chainbase::Database, account: &GenesisAccount) -> Result<(), DeipError> {
    let name = account.name.clone();
    db.create_account(|id| Account {
        id,
        name: name.clone(),
        memo_key: account.memo_key.clone(),
        balance: Asset::core(0),
        common_tokens_balance: Asset::core(0),
        withdrawn: Asset::core(0),
        to_withdraw: Asset::core(0),
        withdraw_rate: Asset::core(0),
        next_vesting_withdrawal: None,
        recovery_account: account.recovery_account.clone(),
        last_owner_update: 0,
        created_at: 0,
        proxy: None,
        witnesses_voted_for: 0,
    })?;
    db.create_authority_record(|id| AuthorityRecord {
        id,
        account: name,
        owner: single_key_authority(&account.owner_key),
        active: single_key_authority(&account.active_key),
        active_overrides: BTreeMap::new(),
        last_owner_update: 0,
    });
    Ok(())
}

/// The reserved "null" account name genesis attributes unallocated
/// authority to — no record is created for it, it is purely a sentinel
/// for callers building a [`GenesisRecord`] by hand.
pub fn null_account() -> AccountName {
    AccountName::new_unchecked("null")
}

#[cfg(test)]
mod tests {
    use super::*;
    use deip_crypto::KeyPair;

    fn sample_record() -> GenesisRecord {
        let registrar = AccountName::new_unchecked("initminer");
        let witness_key = KeyPair::generate();
        let account_key = KeyPair::generate();

        let mut record = GenesisRecord {
            initial_timestamp: 1_700_000_000,
            initial_chain_id: Sha256Digest([0u8; 32]),
            init_supply: Asset::core(1_000),
            registrar: registrar.clone(),
            accounts: vec![GenesisAccount {
                name: registrar.clone(),
                memo_key: account_key.public_key.clone(),
                owner_key: account_key.public_key.clone(),
                active_key: account_key.public_key.clone(),
                recovery_account: registrar.clone(),
            }],
            witness_candidates: vec![GenesisWitnessCandidate { owner: registrar.clone(), signing_key: witness_key.public_key }],
            assets: vec![GenesisAsset { ticker: "DEIP".to_string(), precision: 6 }],
            account_balances: vec![GenesisBalance { account: registrar.clone(), amount: Asset::core(1_000) }],
            disciplines: vec![1, 2],
            expert_tokens: vec![],
            research_groups: vec![],
            researches: vec![],
            research_contents: vec![],
            research_content_reviews: vec![],
            vesting_balances: vec![],
            proposals: vec![],
        };
        record.initial_chain_id = compute_chain_id(&record);
        record
    }

    #[test]
    fn genesis_applies_and_supply_balances_exactly() {
        let mut db = deip_chainbase::Database::new();
        let record = sample_record();
        let chain_id = apply_genesis(&mut db, &record).expect("genesis must succeed");
        assert_eq!(chain_id, record.initial_chain_id);

        let account = db.get_account_by_name(&AccountName::new_unchecked("initminer")).unwrap();
        assert_eq!(account.balance, Asset::core(1_000));
        assert_eq!(db.dynamic_global_properties().current_supply, Asset::core(1_000));
    }

    #[test]
    fn tampering_with_the_record_breaks_the_chain_id_commitment() {
        let mut db = deip_chainbase::Database::new();
        let mut record = sample_record();
        record.init_supply = Asset::core(2_000);

        let err = apply_genesis(&mut db, &record).unwrap_err();
        assert!(matches!(err, GenesisError::ChainIdMismatch { .. }));
    }

    #[test]
    fn unbalanced_allocations_are_rejected() {
        let mut db = deip_chainbase::Database::new();
        let mut record = sample_record();
        record.account_balances[0].amount = Asset::core(500);
        record.initial_chain_id = compute_chain_id(&record);

        let err = apply_genesis(&mut db, &record).unwrap_err();
        assert!(matches!(err, GenesisError::SupplyMismatch { .. }));
    }

    #[test]
    fn chain_id_override_bypasses_the_self_reference_check() {
        let mut db = deip_chainbase::Database::new();
        let mut record = sample_record();
        record.initial_chain_id = Sha256Digest([0xab; 32]); // deliberately wrong

        let forced = Sha256Digest([0xcd; 32]);
        let chain_id = apply_genesis_with_chain_id_override(&mut db, &record, forced).expect("override skips the hash check");
        assert_eq!(chain_id, forced);
        assert!(db.get_account_by_name(&AccountName::new_unchecked("initminer")).is_ok());
    }

    #[test]
    fn research_group_weights_must_sum_to_full_basis_points() {
        let mut db = deip_chainbase::Database::new();
        let mut record = sample_record();
        let mut members = BTreeMap::new();
        members.insert(AccountName::new_unchecked("initminer"), 5_000u16);
        record.research_groups.push(GenesisResearchGroup {
            account: AccountName::new_unchecked("researchers"),
            description: "incomplete group".to_string(),
            members,
            created_at: record.initial_timestamp,
        });
        record.initial_chain_id = compute_chain_id(&record);

        let err = apply_genesis(&mut db, &record).unwrap_err();
        assert!(matches!(err, GenesisError::InvalidMemberWeights { .. }));
    }
}
