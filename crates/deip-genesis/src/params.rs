//! The declarative genesis record (§6) and its nested allocation lists.
//! Every field mirrors a table `apply_genesis` seeds directly; there is no
//! field here that does not correspond to a row it writes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use deip_core::asset::Asset;
use deip_core::model::research::ResearchContentType;
use deip_core::transaction::Transaction;
use deip_core::types::{AccountName, DisciplineId, ExternalId, PublicKey, Sha256Digest, Timestamp};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenesisAccount {
    pub name: AccountName,
    pub memo_key: PublicKey,
    pub owner_key: PublicKey,
    pub active_key: PublicKey,
    pub recovery_account: AccountName,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenesisWitnessCandidate {
    pub owner: AccountName,
    pub signing_key: PublicKey,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenesisAsset {
    pub ticker: String,
    pub precision: u8,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenesisBalance {
    pub account: AccountName,
    pub amount: Asset,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenesisExpertToken {
    pub account: AccountName,
    pub discipline: DisciplineId,
    pub amount: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenesisResearchGroup {
    pub account: AccountName,
    pub description: String,
    pub members: BTreeMap<AccountName, u16>,
    pub created_at: Timestamp,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenesisResearch {
    pub external_id: ExternalId,
    pub research_group: AccountName,
    pub description_hash: Sha256Digest,
    pub disciplines: Vec<DisciplineId>,
    pub review_share_percent: u16,
    pub compensation_share_percent: u16,
    pub is_private: bool,
    pub members: Vec<AccountName>,
    pub owned_tokens_percent: u16,
    pub created_at: Timestamp,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenesisResearchContent {
    pub external_id: ExternalId,
    pub research_external_id: ExternalId,
    pub content_type: ResearchContentType,
    pub content_hash: Sha256Digest,
    pub authors: Vec<AccountName>,
    pub references: Vec<ExternalId>,
    pub created_at: Timestamp,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenesisReview {
    pub external_id: ExternalId,
    pub research_content_external_id: ExternalId,
    pub is_positive: bool,
    pub author: AccountName,
    pub disciplines: Vec<DisciplineId>,
    pub expertise_tokens_amount_per_discipline: BTreeMap<DisciplineId, i64>,
    pub criteria_scores: BTreeMap<String, u8>,
    pub created_at: Timestamp,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenesisVestingBalance {
    pub owner: AccountName,
    pub balance: Asset,
    pub cliff_seconds: i64,
    pub total_duration_seconds: i64,
    pub period_seconds: i64,
    pub start_time: Timestamp,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenesisProposal {
    pub external_id: ExternalId,
    pub proposed_transaction: Transaction,
    pub proposer: AccountName,
    pub expiration_time: Timestamp,
    pub review_period_seconds: Option<u32>,
}

/// The founding document (§6): everything a node needs to construct the
/// chain's initial state with no parent block and no signatures. Hashing
/// the canonical encoding of this record with `initial_chain_id` zeroed
/// must reproduce the value stored in that same field — the self-reference
/// check that lets `initial_chain_id` double as both a field of the
/// record and a commitment to its own contents.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenesisRecord {
    pub initial_timestamp: Timestamp,
    pub initial_chain_id: Sha256Digest,
    pub init_supply: Asset,
    pub registrar: AccountName,
    pub accounts: Vec<GenesisAccount>,
    pub witness_candidates: Vec<GenesisWitnessCandidate>,
    pub assets: Vec<GenesisAsset>,
    pub account_balances: Vec<GenesisBalance>,
    pub disciplines: Vec<DisciplineId>,
    pub expert_tokens: Vec<GenesisExpertToken>,
    pub research_groups: Vec<GenesisResearchGroup>,
    pub researches: Vec<GenesisResearch>,
    pub research_contents: Vec<GenesisResearchContent>,
    pub research_content_reviews: Vec<GenesisReview>,
    pub vesting_balances: Vec<GenesisVestingBalance>,
    pub proposals: Vec<GenesisProposal>,
}

impl GenesisRecord {
    /// The record with `initial_chain_id` zeroed, as fed to the hash that
    /// the real `initial_chain_id` must match.
    pub fn with_zeroed_chain_id(&self) -> Self {
        let mut zeroed = self.clone();
        zeroed.initial_chain_id = Sha256Digest([0u8; 32]);
        zeroed
    }
}
