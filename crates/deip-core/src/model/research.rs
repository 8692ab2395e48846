//! Research artifacts: research, content, groups, reviews, and token
//! sales (§3, §4.4, §4.5).

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::asset::{Asset, AssetSymbol};
use crate::types::{AccountName, DisciplineId, ExternalId, ObjectId, Sha256Digest, Timestamp};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Research {
    pub id: ObjectId,
    pub external_id: ExternalId,
    pub research_group: AccountName,
    pub description_hash: Sha256Digest,
    pub disciplines: BTreeSet<DisciplineId>,
    pub review_share_percent: u16,
    pub compensation_share_percent: u16,
    pub is_private: bool,
    pub is_finished: bool,
    /// Per-discipline aggregated ECI (§4.4): sum of content ECI in that
    /// discipline across all content belonging to this research.
    pub eci_per_discipline: BTreeMap<DisciplineId, i64>,
    pub number_of_positive_reviews: u32,
    pub number_of_negative_reviews: u32,
    pub members: BTreeSet<AccountName>,
    pub owned_tokens_percent: u16,
    pub created_at: Timestamp,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResearchContentType {
    Announcement,
    FinalResult,
    Milestone,
    Review,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResearchContent {
    pub id: ObjectId,
    pub external_id: ExternalId,
    pub research_external_id: ExternalId,
    pub content_type: ResearchContentType,
    pub content_hash: Sha256Digest,
    pub authors: BTreeSet<AccountName>,
    pub references: BTreeSet<ExternalId>,
    pub activity_window_start: Timestamp,
    pub activity_window_end: Timestamp,
    pub activity_round: u32,
    pub eci_per_discipline: BTreeMap<DisciplineId, i64>,
    pub created_at: Timestamp,
}

/// A research group's member weights, in basis points, summing to
/// `FULL_MEMBER_WEIGHT_BASIS_POINTS` (§3, §8 invariant).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResearchGroup {
    pub id: ObjectId,
    /// The account name that also names the group.
    pub account: AccountName,
    pub description: String,
    pub members: BTreeMap<AccountName, u16>,
    pub created_at: Timestamp,
}

impl ResearchGroup {
    pub fn total_weight_basis_points(&self) -> u32 {
        self.members.values().map(|&w| w as u32).sum()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Review {
    pub id: ObjectId,
    pub external_id: ExternalId,
    pub research_content_external_id: ExternalId,
    pub is_positive: bool,
    pub author: AccountName,
    pub disciplines: BTreeSet<DisciplineId>,
    /// Expertise committed per discipline for this review (`E_r` in §4.4).
    pub expertise_tokens_amount_per_discipline: BTreeMap<DisciplineId, i64>,
    pub assessment_model_version: u16,
    pub criteria_scores: BTreeMap<String, u8>,
    pub created_at: Timestamp,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReviewVote {
    pub id: ObjectId,
    pub review_external_id: ExternalId,
    pub discipline: DisciplineId,
    pub voter: AccountName,
    pub weight: i64,
    pub created_at: Timestamp,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResearchTokenSaleStatus {
    Inactive,
    Active,
    CollectingFunds,
    Finished,
    Expired,
    Refunding,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResearchTokenSale {
    pub id: ObjectId,
    pub external_id: ExternalId,
    pub research_external_id: ExternalId,
    pub security_tokens_on_sale: Asset,
    pub security_token_symbol: AssetSymbol,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub soft_cap: Asset,
    pub hard_cap: Asset,
    pub status: ResearchTokenSaleStatus,
    pub total_amount_collected: Asset,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResearchTokenSaleContribution {
    pub id: ObjectId,
    pub research_token_sale_external_id: ExternalId,
    pub contributor: AccountName,
    pub amount: Asset,
    pub contributed_at: Timestamp,
}
