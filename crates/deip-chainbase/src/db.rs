//! The object database (§4.1): one [`PrimaryTable`] per record type plus
//! the secondary indices each domain table declares, all owned by a
//! single [`Database`] so undo actions can reach back into any table
//! regardless of which one triggered the mutation.

use deip_core::error::{DeipError, UndoError};
use deip_core::model::*;
use deip_core::types::ObjectId;

use crate::session::SessionStack;
use crate::table::PrimaryTable;

/// Maps a record type onto the [`PrimaryTable`] that stores it. Blanket
/// `create`/`get`/`find`/`remove`/`modify` on [`Database`] are generic
/// over this trait; only the mapping itself is written per type.
pub trait TableAccess: Sized + Clone + 'static {
    fn table(db: &Database) -> &PrimaryTable<Self>;
    fn table_mut(db: &mut Database) -> &mut PrimaryTable<Self>;
}

macro_rules! table_access {
    ($ty:ty, $field:ident) => {
        impl TableAccess for $ty {
            fn table(db: &Database) -> &PrimaryTable<Self> {
                &db.$field
            }
            fn table_mut(db: &mut Database) -> &mut PrimaryTable<Self> {
                &mut db.$field
            }
        }
    };
}

#[derive(Default)]
pub struct Database {
    pub(crate) sessions: SessionStack,

    // ── Secondary indices (§4.1 "additional indices declared per table") ────
    pub(crate) account_by_name: std::collections::BTreeMap<deip_core::types::AccountName, ObjectId>,
    pub(crate) authority_record_by_account:
        std::collections::BTreeMap<deip_core::types::AccountName, ObjectId>,
    pub(crate) account_recovery_request_by_account:
        std::collections::BTreeMap<deip_core::types::AccountName, ObjectId>,
    pub(crate) witness_by_owner: std::collections::BTreeMap<deip_core::types::AccountName, ObjectId>,
    pub(crate) witness_vote_by_pair:
        std::collections::BTreeMap<(deip_core::types::AccountName, deip_core::types::AccountName), ObjectId>,
    pub(crate) block_summary_by_slot: std::collections::BTreeMap<u16, ObjectId>,
    pub(crate) research_by_external_id:
        std::collections::BTreeMap<deip_core::types::ExternalId, ObjectId>,
    pub(crate) research_content_by_external_id:
        std::collections::BTreeMap<deip_core::types::ExternalId, ObjectId>,
    pub(crate) research_content_by_research:
        std::collections::BTreeMap<deip_core::types::ExternalId, Vec<ObjectId>>,
    pub(crate) research_group_by_account:
        std::collections::BTreeMap<deip_core::types::AccountName, ObjectId>,
    pub(crate) review_by_external_id: std::collections::BTreeMap<deip_core::types::ExternalId, ObjectId>,
    pub(crate) review_by_content:
        std::collections::BTreeMap<deip_core::types::ExternalId, Vec<ObjectId>>,
    pub(crate) research_token_sale_by_external_id:
        std::collections::BTreeMap<deip_core::types::ExternalId, ObjectId>,
    pub(crate) research_token_sale_by_research:
        std::collections::BTreeMap<deip_core::types::ExternalId, Vec<ObjectId>>,
    pub(crate) token_sale_contribution_by_pair: std::collections::BTreeMap<
        (deip_core::types::ExternalId, deip_core::types::AccountName),
        ObjectId,
    >,
    pub(crate) token_sale_contribution_by_sale:
        std::collections::BTreeMap<deip_core::types::ExternalId, Vec<ObjectId>>,
    pub(crate) expertise_token_by_pair:
        std::collections::BTreeMap<(deip_core::types::AccountName, deip_core::types::DisciplineId), ObjectId>,
    pub(crate) proposal_by_external_id:
        std::collections::BTreeMap<deip_core::types::ExternalId, ObjectId>,
    pub(crate) allocation_proposal_by_external_id:
        std::collections::BTreeMap<deip_core::types::ExternalId, ObjectId>,
    pub(crate) vesting_balance_by_owner:
        std::collections::BTreeMap<deip_core::types::AccountName, Vec<ObjectId>>,
    pub(crate) budget_by_owner:
        std::collections::BTreeMap<deip_core::types::AccountName, Vec<ObjectId>>,

    pub(crate) accounts: PrimaryTable<Account>,
    pub(crate) authority_records: PrimaryTable<AuthorityRecord>,
    pub(crate) account_recovery_requests: PrimaryTable<AccountRecoveryRequest>,

    pub(crate) witnesses: PrimaryTable<Witness>,
    pub(crate) witness_votes: PrimaryTable<WitnessVote>,
    pub(crate) witness_schedule: PrimaryTable<WitnessSchedule>,
    pub(crate) dynamic_global_properties: PrimaryTable<DynamicGlobalProperties>,
    pub(crate) block_summaries: PrimaryTable<BlockSummary>,

    pub(crate) research: PrimaryTable<Research>,
    pub(crate) research_content: PrimaryTable<ResearchContent>,
    pub(crate) research_groups: PrimaryTable<ResearchGroup>,
    pub(crate) reviews: PrimaryTable<Review>,
    pub(crate) review_votes: PrimaryTable<ReviewVote>,

    pub(crate) research_token_sales: PrimaryTable<ResearchTokenSale>,
    pub(crate) research_token_sale_contributions: PrimaryTable<ResearchTokenSaleContribution>,

    pub(crate) expertise_tokens: PrimaryTable<ExpertiseToken>,
    pub(crate) expertise_contributions: PrimaryTable<ExpertiseContribution>,
    pub(crate) eci_history: PrimaryTable<EciHistoryRecord>,
    pub(crate) expertise_allocation_proposals: PrimaryTable<ExpertiseAllocationProposal>,
    pub(crate) expertise_allocation_proposal_votes: PrimaryTable<ExpertiseAllocationProposalVote>,

    pub(crate) proposals: PrimaryTable<Proposal>,

    pub(crate) vesting_balances: PrimaryTable<VestingBalance>,
    pub(crate) budgets: PrimaryTable<Budget>,
}

table_access!(Account, accounts);
table_access!(AuthorityRecord, authority_records);
table_access!(AccountRecoveryRequest, account_recovery_requests);
table_access!(Witness, witnesses);
table_access!(WitnessVote, witness_votes);
table_access!(WitnessSchedule, witness_schedule);
table_access!(DynamicGlobalProperties, dynamic_global_properties);
table_access!(BlockSummary, block_summaries);
table_access!(Research, research);
table_access!(ResearchContent, research_content);
table_access!(ResearchGroup, research_groups);
table_access!(Review, reviews);
table_access!(ReviewVote, review_votes);
table_access!(ResearchTokenSale, research_token_sales);
table_access!(ResearchTokenSaleContribution, research_token_sale_contributions);
table_access!(ExpertiseToken, expertise_tokens);
table_access!(ExpertiseContribution, expertise_contributions);
table_access!(EciHistoryRecord, eci_history);
table_access!(ExpertiseAllocationProposal, expertise_allocation_proposals);
table_access!(ExpertiseAllocationProposalVote, expertise_allocation_proposal_votes);
table_access!(Proposal, proposals);
table_access!(VestingBalance, vesting_balances);
table_access!(Budget, budgets);

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Session lifecycle (§4.1) ─────────────────────────────────────────────

    pub fn session_depth(&self) -> usize {
        self.sessions.depth()
    }

    /// Opens a new undo session nested under any currently open one.
    pub fn start_undo_session(&mut self) {
        self.sessions.start();
    }

    /// Drops the topmost session's pre-image log, making its changes
    /// durable to the parent (or to the head, if this was outermost).
    pub fn commit(&mut self) -> Result<(), DeipError> {
        self.sessions.commit()
    }

    /// Finalizes the oldest open session, leaving every session above it
    /// (more recent blocks) still undo-able. The fork database calls this
    /// as the irreversible block number advances past a block's session.
    pub fn commit_oldest(&mut self) -> Result<(), DeipError> {
        self.sessions.commit_oldest()
    }

    /// Merges the topmost session's log into its parent without
    /// discarding the ability to undo those changes later.
    pub fn squash(&mut self) -> Result<(), DeipError> {
        self.sessions.squash()
    }

    /// Replays the topmost session's pre-images in reverse, restoring
    /// the database to the state before that session was started.
    pub fn undo(&mut self) -> Result<(), DeipError> {
        let log = self.sessions.pop_for_undo()?;
        log.replay(self);
        Ok(())
    }

    /// Unwinds every live session (§4.1).
    pub fn undo_all(&mut self) -> Result<(), DeipError> {
        while self.sessions.depth() > 0 {
            self.undo()?;
        }
        Ok(())
    }

    // ── Generic primary-table operations (§4.1) ─────────────────────────────

    /// Allocates an id, builds the record, and inserts it into the
    /// primary table. Secondary indices are the caller's responsibility —
    /// domain wrappers in `crate::tables` call this and then maintain
    /// their own index maps plus the matching undo action.
    pub fn create<T: TableAccess>(&mut self, init: impl FnOnce(ObjectId) -> T) -> ObjectId {
        let id = T::table_mut(self).alloc_id();
        let value = init(id);
        T::table_mut(self).insert(id, value);
        self.sessions.record(Box::new(move |db| {
            T::table_mut(db).remove(id);
            T::table_mut(db).rollback_next_id(id);
        }));
        id
    }

    pub fn get<T: TableAccess>(&self, id: ObjectId) -> Result<&T, DeipError> {
        T::table(self)
            .get(id)
            .ok_or_else(|| DeipError::Other(format!("object {id} not found")))
    }

    pub fn find<T: TableAccess>(&self, id: ObjectId) -> Option<&T> {
        T::table(self).get(id)
    }

    /// Applies `mutator` to the record at `id`, recording its pre-image so
    /// undo can restore it verbatim, even if the mutation turns out to be
    /// a no-op (§4.1: modify must still be treated as idempotent under undo).
    pub fn modify<T: TableAccess>(
        &mut self,
        id: ObjectId,
        mutator: impl FnOnce(&mut T),
    ) -> Result<(), DeipError> {
        let pre_image = T::table(self)
            .get(id)
            .cloned()
            .ok_or_else(|| DeipError::Other(format!("object {id} not found")))?;
        let slot = T::table_mut(self)
            .get_mut(id)
            .ok_or_else(|| DeipError::Other(format!("object {id} not found")))?;
        mutator(slot);
        self.sessions.record(Box::new(move |db| {
            if let Some(slot) = T::table_mut(db).get_mut(id) {
                *slot = pre_image;
            }
        }));
        Ok(())
    }

    /// Removes the record at `id` from the primary table, recording it so
    /// undo can reinsert it with the same id (not a freshly allocated one).
    pub fn remove<T: TableAccess>(&mut self, id: ObjectId) -> Result<T, DeipError> {
        let removed = T::table_mut(self)
            .remove(id)
            .ok_or_else(|| DeipError::Other(format!("object {id} not found")))?;
        let pre_image = removed.clone();
        self.sessions.record(Box::new(move |db| {
            T::table_mut(db).insert(id, pre_image);
        }));
        Ok(removed)
    }

    pub fn iter<T: TableAccess>(&self) -> impl Iterator<Item = (&ObjectId, &T)> {
        T::table(self).iter()
    }

    pub fn len<T: TableAccess>(&self) -> usize {
        T::table(self).len()
    }
}

impl Database {
    /// §4.1 failure model: any uniqueness violation or missing key during
    /// a block's evaluation is fatal to the current (transaction-level)
    /// session — evaluators call this to unwind just that transaction
    /// without disturbing the block session beneath it.
    pub fn fail_transaction(&mut self) -> Result<(), DeipError> {
        if self.sessions.depth() == 0 {
            return Err(UndoError::NoSessionOpen.into());
        }
        self.undo()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deip_core::asset::Asset;
    use deip_core::types::AccountName;

    fn sample_budget(db: &mut Database, per_block: i64) -> ObjectId {
        db.create::<Budget>(|id| Budget {
            id,
            owner: AccountName::new_unchecked("genesis-fund"),
            balance: Asset::core(1_000),
            per_block: Asset::core(per_block),
            deadline: 10_000,
            last_allocated_block: 0,
            created_at: 0,
        })
    }

    #[test]
    fn create_then_undo_frees_the_id() {
        let mut db = Database::new();
        db.start_undo_session();
        let id = sample_budget(&mut db, 5);
        assert_eq!(db.get::<Budget>(id).unwrap().per_block.amount, 5);
        db.undo().unwrap();
        assert!(db.find::<Budget>(id).is_none());

        db.start_undo_session();
        let second_id = sample_budget(&mut db, 7);
        assert_eq!(second_id, id, "undoing a creation must roll the allocator back, not leave a gap");
        db.commit().unwrap();
    }

    #[test]
    fn modify_is_reverted_by_undo() {
        let mut db = Database::new();
        db.start_undo_session();
        let id = sample_budget(&mut db, 1);
        db.commit().unwrap();

        db.start_undo_session();
        db.modify::<Budget>(id, |budget| budget.per_block.amount = 99).unwrap();
        assert_eq!(db.get::<Budget>(id).unwrap().per_block.amount, 99);
        db.undo().unwrap();
        assert_eq!(db.get::<Budget>(id).unwrap().per_block.amount, 1);
    }

    #[test]
    fn remove_is_reverted_by_undo() {
        let mut db = Database::new();
        db.start_undo_session();
        let id = sample_budget(&mut db, 3);
        db.commit().unwrap();

        db.start_undo_session();
        let removed = db.remove::<Budget>(id).unwrap();
        assert_eq!(removed.per_block.amount, 3);
        assert!(db.find::<Budget>(id).is_none());
        db.undo().unwrap();
        assert_eq!(db.get::<Budget>(id).unwrap().per_block.amount, 3);
    }

    #[test]
    fn nested_sessions_squash_into_parent() {
        let mut db = Database::new();
        db.start_undo_session();
        let id = sample_budget(&mut db, 1);
        db.start_undo_session();
        db.modify::<Budget>(id, |budget| budget.per_block.amount = 2).unwrap();
        db.squash().unwrap();
        assert_eq!(db.session_depth(), 1);
        assert_eq!(db.get::<Budget>(id).unwrap().per_block.amount, 2);
        db.undo().unwrap();
        assert!(db.find::<Budget>(id).is_none(), "squashed session still undoes both the create and the modify");
    }

    #[test]
    fn squash_past_the_outermost_session_is_an_error() {
        let mut db = Database::new();
        db.start_undo_session();
        assert!(matches!(db.squash(), Err(DeipError::Undo(UndoError::PastCommitPoint))));
    }

    #[test]
    fn commit_with_no_open_session_is_an_error() {
        let mut db = Database::new();
        assert!(matches!(db.commit(), Err(DeipError::Undo(UndoError::NoSessionOpen))));
    }

    #[test]
    fn fail_transaction_requires_an_open_session() {
        let mut db = Database::new();
        assert!(matches!(db.fail_transaction(), Err(DeipError::Undo(UndoError::NoSessionOpen))));
        db.start_undo_session();
        let id = sample_budget(&mut db, 4);
        db.fail_transaction().unwrap();
        assert!(db.find::<Budget>(id).is_none());
    }
}
