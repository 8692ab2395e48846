//! Virtual operations (§4.3, §6): state-change events synthesized by the
//! chain itself, never present in a submitted transaction, delivered to
//! the same post-apply notification stream as real operations but
//! carrying [`VirtualOperation::is_virtual`] `true`.

use serde::{Deserialize, Serialize};

use crate::asset::Asset;
use crate::model::expertise::EciSource;
use crate::types::{AccountName, DisciplineId, ExternalId, Timestamp};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum VirtualOperation {
    AccountCreated {
        new_account_name: AccountName,
        creator: AccountName,
    },
    FillVestingWithdraw {
        from_account: AccountName,
        to_account: AccountName,
        withdrawn: Asset,
        deposited: Asset,
    },
    EciHistory {
        discipline: DisciplineId,
        source_type: EciSource,
        source_id: ExternalId,
        previous: i64,
        new: i64,
        timestamp: Timestamp,
        criteria_snapshot: Option<String>,
    },
    ResearchTokenSaleStatusChanged {
        research_token_sale_external_id: ExternalId,
        from_status: String,
        to_status: String,
    },
    TokenSaleContributionRefunded {
        research_token_sale_external_id: ExternalId,
        contributor: AccountName,
        amount: Asset,
    },
    TokenSaleTokensIssued {
        research_token_sale_external_id: ExternalId,
        recipient: AccountName,
        amount: Asset,
    },
    ProposalExecuted {
        proposal_external_id: ExternalId,
    },
    ProposalExpired {
        proposal_external_id: ExternalId,
    },
    WitnessMissedBlock {
        witness: AccountName,
        total_missed: u32,
    },
    AccountRecovered {
        account: AccountName,
    },
}

impl VirtualOperation {
    /// Always `true`; kept as a method (rather than a bare constant) so
    /// callers that serialize operations generically can call it
    /// uniformly across real and virtual operations.
    pub fn is_virtual(&self) -> bool {
        true
    }
}
