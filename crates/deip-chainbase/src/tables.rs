//! Domain-level table operations (§4.1): each function wraps a generic
//! [`Database`] primary-table operation and keeps the matching secondary
//! index in sync, recording the index-side undo action alongside the
//! primary one so `undo` restores both without the session stack needing
//! to know anything about index shapes.

use deip_core::error::{DeipError, EvaluationError, ValidationError};
use deip_core::model::*;
use deip_core::types::{AccountName, DisciplineId, ExternalId, ObjectId};

use crate::db::Database;

fn multi_insert<K: Ord + Clone>(index: &mut std::collections::BTreeMap<K, Vec<ObjectId>>, key: K, id: ObjectId) {
    index.entry(key).or_default().push(id);
}

fn multi_remove<K: Ord>(index: &mut std::collections::BTreeMap<K, Vec<ObjectId>>, key: &K, id: ObjectId) {
    if let Some(ids) = index.get_mut(key) {
        ids.retain(|&existing| existing != id);
        if ids.is_empty() {
            index.remove(key);
        }
    }
}

// ── Accounts ──────────────────────────────────────────────────────────────────

impl Database {
    pub fn find_account_by_name(&self, name: &AccountName) -> Option<&Account> {
        self.account_by_name.get(name).and_then(|&id| self.find::<Account>(id))
    }

    pub fn get_account_by_name(&self, name: &AccountName) -> Result<&Account, DeipError> {
        self.find_account_by_name(name)
            .ok_or_else(|| EvaluationError::UnknownAccount(name.to_string()).into())
    }

    pub fn create_account(&mut self, init: impl FnOnce(ObjectId) -> Account) -> Result<ObjectId, DeipError> {
        let probe = init(0);
        if self.account_by_name.contains_key(&probe.name) {
            return Err(EvaluationError::AccountAlreadyExists(probe.name.to_string()).into());
        }
        let name = probe.name.clone();
        let id = self.create::<Account>(move |assigned_id| {
            let mut account = probe;
            account.id = assigned_id;
            account
        });
        self.account_by_name.insert(name.clone(), id);
        self.sessions.record(Box::new(move |db| {
            db.account_by_name.remove(&name);
        }));
        Ok(id)
    }
}

// ── Authority records ────────────────────────────────────────────────────────

impl Database {
    pub fn find_authority_record(&self, account: &AccountName) -> Option<&AuthorityRecord> {
        self.authority_record_by_account.get(account).and_then(|&id| self.find::<AuthorityRecord>(id))
    }

    pub fn create_authority_record(
        &mut self,
        init: impl FnOnce(ObjectId) -> AuthorityRecord,
    ) -> ObjectId {
        let probe = init(0);
        let account = probe.account.clone();
        let id = self.create::<AuthorityRecord>(move |assigned_id| {
            let mut record = probe;
            record.id = assigned_id;
            record
        });
        self.authority_record_by_account.insert(account.clone(), id);
        self.sessions.record(Box::new(move |db| {
            db.authority_record_by_account.remove(&account);
        }));
        id
    }
}

// ── Account recovery requests ────────────────────────────────────────────────

impl Database {
    pub fn find_account_recovery_request(&self, account: &AccountName) -> Option<&AccountRecoveryRequest> {
        self.account_recovery_request_by_account.get(account).and_then(|&id| self.find::<AccountRecoveryRequest>(id))
    }

    /// Files (or replaces) the pending recovery request for `account`
    /// (§4.3: only the most recent filing is honored).
    pub fn put_account_recovery_request(
        &mut self,
        account_to_recover: AccountName,
        new_owner_authority: deip_core::model::account::Authority,
        expires_at: deip_core::types::Timestamp,
    ) -> ObjectId {
        if self.account_recovery_request_by_account.contains_key(&account_to_recover) {
            let _ = self.remove_account_recovery_request(&account_to_recover);
        }
        let account = account_to_recover.clone();
        let id = self.create::<AccountRecoveryRequest>(move |assigned_id| AccountRecoveryRequest {
            id: assigned_id,
            account_to_recover,
            new_owner_authority,
            expires_at,
        });
        self.account_recovery_request_by_account.insert(account.clone(), id);
        self.sessions.record(Box::new(move |db| {
            db.account_recovery_request_by_account.remove(&account);
        }));
        id
    }

    pub fn remove_account_recovery_request(&mut self, account: &AccountName) -> Result<(), DeipError> {
        let id = *self
            .account_recovery_request_by_account
            .get(account)
            .ok_or_else(|| DeipError::Other("no pending recovery request".into()))?;
        self.remove::<AccountRecoveryRequest>(id)?;
        self.account_recovery_request_by_account.remove(account);
        let account = account.clone();
        self.sessions.record(Box::new(move |db| {
            db.account_recovery_request_by_account.insert(account.clone(), id);
        }));
        Ok(())
    }
}

// ── Witnesses ─────────────────────────────────────────────────────────────────

impl Database {
    pub fn find_witness(&self, owner: &AccountName) -> Option<&Witness> {
        self.witness_by_owner.get(owner).and_then(|&id| self.find::<Witness>(id))
    }

    pub fn get_witness(&self, owner: &AccountName) -> Result<&Witness, DeipError> {
        self.find_witness(owner).ok_or_else(|| EvaluationError::UnknownWitness(owner.to_string()).into())
    }

    pub fn create_witness(&mut self, init: impl FnOnce(ObjectId) -> Witness) -> ObjectId {
        let probe = init(0);
        let owner = probe.owner.clone();
        let id = self.create::<Witness>(move |assigned_id| {
            let mut witness = probe;
            witness.id = assigned_id;
            witness
        });
        self.witness_by_owner.insert(owner.clone(), id);
        self.sessions.record(Box::new(move |db| {
            db.witness_by_owner.remove(&owner);
        }));
        id
    }

    pub fn all_witnesses(&self) -> Vec<&Witness> {
        self.iter::<Witness>().map(|(_, w)| w).collect()
    }

    pub fn find_witness_vote(&self, witness: &AccountName, account: &AccountName) -> Option<&WitnessVote> {
        self.witness_vote_by_pair
            .get(&(witness.clone(), account.clone()))
            .and_then(|&id| self.find::<WitnessVote>(id))
    }

    pub fn create_witness_vote(&mut self, witness: AccountName, account: AccountName) -> Result<ObjectId, DeipError> {
        let key = (witness.clone(), account.clone());
        if self.witness_vote_by_pair.contains_key(&key) {
            return Err(ValidationError::Other("duplicate witness vote".into()).into());
        }
        let id = self.create::<WitnessVote>(move |assigned_id| WitnessVote {
            id: assigned_id,
            witness: witness.clone(),
            account: account.clone(),
        });
        self.witness_vote_by_pair.insert(key.clone(), id);
        self.sessions.record(Box::new(move |db| {
            db.witness_vote_by_pair.remove(&key);
        }));
        Ok(id)
    }

    pub fn remove_witness_vote(&mut self, witness: &AccountName, account: &AccountName) -> Result<(), DeipError> {
        let key = (witness.clone(), account.clone());
        let id = *self
            .witness_vote_by_pair
            .get(&key)
            .ok_or_else(|| DeipError::Other("witness vote not found".into()))?;
        self.remove::<WitnessVote>(id)?;
        self.witness_vote_by_pair.remove(&key);
        self.sessions.record(Box::new(move |db| {
            db.witness_vote_by_pair.insert(key.clone(), id);
        }));
        Ok(())
    }
}

// ── Dynamic global properties / witness schedule / block summary ────────────

impl Database {
    pub fn dynamic_global_properties(&self) -> &DynamicGlobalProperties {
        self.iter::<DynamicGlobalProperties>()
            .next()
            .map(|(_, props)| props)
            .expect("dynamic global properties are created once at genesis")
    }

    pub fn witness_schedule(&self) -> &WitnessSchedule {
        self.iter::<WitnessSchedule>()
            .next()
            .map(|(_, s)| s)
            .expect("witness schedule is created once at genesis")
    }

    /// Looks up the block id stored at `block_num mod 2^16` for TaPOS (§6).
    pub fn block_summary_at(&self, block_num: u64) -> Option<&BlockSummary> {
        let slot = (block_num % deip_core::constants::BLOCK_SUMMARY_WINDOW as u64) as u16;
        self.block_summary_by_slot.get(&slot).and_then(|&id| self.find::<BlockSummary>(id))
    }

    /// Overwrites the ring-buffer slot for `block_num` with `block_id`,
    /// creating the row the first time this slot is used and modifying it
    /// afterward (§3 block summary).
    pub fn set_block_summary(&mut self, block_num: u64, block_id: deip_core::types::BlockId) {
        let slot = (block_num % deip_core::constants::BLOCK_SUMMARY_WINDOW as u64) as u16;
        if let Some(&id) = self.block_summary_by_slot.get(&slot) {
            let _ = self.modify::<BlockSummary>(id, |row| row.block_id = block_id);
        } else {
            let id = self.create::<BlockSummary>(|assigned_id| BlockSummary { id: assigned_id, block_id });
            self.block_summary_by_slot.insert(slot, id);
            self.sessions.record(Box::new(move |db| {
                db.block_summary_by_slot.remove(&slot);
            }));
        }
    }
}

// ── Research / content / groups ──────────────────────────────────────────────

impl Database {
    pub fn find_research(&self, external_id: &ExternalId) -> Option<&Research> {
        self.research_by_external_id.get(external_id).and_then(|&id| self.find::<Research>(id))
    }

    pub fn get_research(&self, external_id: &ExternalId) -> Result<&Research, DeipError> {
        self.find_research(external_id)
            .ok_or_else(|| EvaluationError::UnknownResearch(external_id.to_string()).into())
    }

    pub fn create_research(&mut self, init: impl FnOnce(ObjectId) -> Research) -> Result<ObjectId, DeipError> {
        let probe = init(0);
        if self.research_by_external_id.contains_key(&probe.external_id) {
            return Err(ValidationError::Other("research external id already exists".into()).into());
        }
        let external_id = probe.external_id;
        let id = self.create::<Research>(move |assigned_id| {
            let mut research = probe;
            research.id = assigned_id;
            research
        });
        self.research_by_external_id.insert(external_id, id);
        self.sessions.record(Box::new(move |db| {
            db.research_by_external_id.remove(&external_id);
        }));
        Ok(id)
    }

    pub fn find_research_content(&self, external_id: &ExternalId) -> Option<&ResearchContent> {
        self.research_content_by_external_id.get(external_id).and_then(|&id| self.find::<ResearchContent>(id))
    }

    pub fn get_research_content(&self, external_id: &ExternalId) -> Result<&ResearchContent, DeipError> {
        self.find_research_content(external_id)
            .ok_or_else(|| EvaluationError::UnknownResearchContent(external_id.to_string()).into())
    }

    pub fn research_content_for(&self, research_external_id: &ExternalId) -> Vec<&ResearchContent> {
        self.research_content_by_research
            .get(research_external_id)
            .into_iter()
            .flatten()
            .filter_map(|&id| self.find::<ResearchContent>(id))
            .collect()
    }

    pub fn create_research_content(
        &mut self,
        init: impl FnOnce(ObjectId) -> ResearchContent,
    ) -> Result<ObjectId, DeipError> {
        let probe = init(0);
        if self.research_content_by_external_id.contains_key(&probe.external_id) {
            return Err(ValidationError::Other("research content external id already exists".into()).into());
        }
        let external_id = probe.external_id;
        let research_external_id = probe.research_external_id;
        let id = self.create::<ResearchContent>(move |assigned_id| {
            let mut content = probe;
            content.id = assigned_id;
            content
        });
        self.research_content_by_external_id.insert(external_id, id);
        multi_insert(&mut self.research_content_by_research, research_external_id, id);
        self.sessions.record(Box::new(move |db| {
            db.research_content_by_external_id.remove(&external_id);
            multi_remove(&mut db.research_content_by_research, &research_external_id, id);
        }));
        Ok(id)
    }

    pub fn find_research_group(&self, account: &AccountName) -> Option<&ResearchGroup> {
        self.research_group_by_account.get(account).and_then(|&id| self.find::<ResearchGroup>(id))
    }

    pub fn get_research_group(&self, account: &AccountName) -> Result<&ResearchGroup, DeipError> {
        self.find_research_group(account)
            .ok_or_else(|| EvaluationError::UnknownResearchGroup(account.to_string()).into())
    }

    pub fn create_research_group(&mut self, init: impl FnOnce(ObjectId) -> ResearchGroup) -> ObjectId {
        let probe = init(0);
        let account = probe.account.clone();
        let id = self.create::<ResearchGroup>(move |assigned_id| {
            let mut group = probe;
            group.id = assigned_id;
            group
        });
        self.research_group_by_account.insert(account.clone(), id);
        self.sessions.record(Box::new(move |db| {
            db.research_group_by_account.remove(&account);
        }));
        id
    }
}

// ── Reviews ───────────────────────────────────────────────────────────────────

impl Database {
    pub fn find_review(&self, external_id: &ExternalId) -> Option<&Review> {
        self.review_by_external_id.get(external_id).and_then(|&id| self.find::<Review>(id))
    }

    pub fn reviews_for_content(&self, content_external_id: &ExternalId) -> Vec<&Review> {
        self.review_by_content
            .get(content_external_id)
            .into_iter()
            .flatten()
            .filter_map(|&id| self.find::<Review>(id))
            .collect()
    }

    pub fn create_review(&mut self, init: impl FnOnce(ObjectId) -> Review) -> Result<ObjectId, DeipError> {
        let probe = init(0);
        if self.review_by_external_id.contains_key(&probe.external_id) {
            return Err(ValidationError::Other("review external id already exists".into()).into());
        }
        let existing_author = self
            .reviews_for_content(&probe.research_content_external_id)
            .into_iter()
            .any(|r| r.author == probe.author);
        if existing_author {
            return Err(EvaluationError::DuplicateReview(probe.author.to_string()).into());
        }
        let external_id = probe.external_id;
        let content_external_id = probe.research_content_external_id;
        let id = self.create::<Review>(move |assigned_id| {
            let mut review = probe;
            review.id = assigned_id;
            review
        });
        self.review_by_external_id.insert(external_id, id);
        multi_insert(&mut self.review_by_content, content_external_id, id);
        self.sessions.record(Box::new(move |db| {
            db.review_by_external_id.remove(&external_id);
            multi_remove(&mut db.review_by_content, &content_external_id, id);
        }));
        Ok(id)
    }

    pub fn review_votes_for(&self, review_external_id: &ExternalId, discipline: DisciplineId) -> Vec<&ReviewVote> {
        self.iter::<ReviewVote>()
            .filter(|(_, v)| v.review_external_id == *review_external_id && v.discipline == discipline)
            .map(|(_, v)| v)
            .collect()
    }
}

// ── Research token sales ──────────────────────────────────────────────────────

impl Database {
    pub fn find_token_sale(&self, external_id: &ExternalId) -> Option<&ResearchTokenSale> {
        self.research_token_sale_by_external_id.get(external_id).and_then(|&id| self.find::<ResearchTokenSale>(id))
    }

    pub fn get_token_sale(&self, external_id: &ExternalId) -> Result<&ResearchTokenSale, DeipError> {
        self.find_token_sale(external_id)
            .ok_or_else(|| EvaluationError::UnknownTokenSale(external_id.to_string()).into())
    }

    pub fn token_sale_id(&self, external_id: &ExternalId) -> Option<ObjectId> {
        self.research_token_sale_by_external_id.get(external_id).copied()
    }

    pub fn all_token_sales(&self) -> Vec<&ResearchTokenSale> {
        self.iter::<ResearchTokenSale>().map(|(_, s)| s).collect()
    }

    pub fn create_token_sale(
        &mut self,
        init: impl FnOnce(ObjectId) -> ResearchTokenSale,
    ) -> Result<ObjectId, DeipError> {
        let probe = init(0);
        if self.research_token_sale_by_external_id.contains_key(&probe.external_id) {
            return Err(ValidationError::Other("token sale external id already exists".into()).into());
        }
        let external_id = probe.external_id;
        let research_external_id = probe.research_external_id;
        let id = self.create::<ResearchTokenSale>(move |assigned_id| {
            let mut sale = probe;
            sale.id = assigned_id;
            sale
        });
        self.research_token_sale_by_external_id.insert(external_id, id);
        multi_insert(&mut self.research_token_sale_by_research, research_external_id, id);
        self.sessions.record(Box::new(move |db| {
            db.research_token_sale_by_external_id.remove(&external_id);
            multi_remove(&mut db.research_token_sale_by_research, &research_external_id, id);
        }));
        Ok(id)
    }

    pub fn find_token_sale_contribution(
        &self,
        sale_external_id: &ExternalId,
        contributor: &AccountName,
    ) -> Option<&ResearchTokenSaleContribution> {
        self.token_sale_contribution_by_pair
            .get(&(*sale_external_id, contributor.clone()))
            .and_then(|&id| self.find::<ResearchTokenSaleContribution>(id))
    }

    pub fn contributions_for_sale(&self, sale_external_id: &ExternalId) -> Vec<&ResearchTokenSaleContribution> {
        self.token_sale_contribution_by_sale
            .get(sale_external_id)
            .into_iter()
            .flatten()
            .filter_map(|&id| self.find::<ResearchTokenSaleContribution>(id))
            .collect()
    }

    pub fn create_token_sale_contribution(
        &mut self,
        init: impl FnOnce(ObjectId) -> ResearchTokenSaleContribution,
    ) -> ObjectId {
        let probe = init(0);
        let key = (probe.research_token_sale_external_id, probe.contributor.clone());
        let sale_external_id = probe.research_token_sale_external_id;
        let id = self.create::<ResearchTokenSaleContribution>(move |assigned_id| {
            let mut contribution = probe;
            contribution.id = assigned_id;
            contribution
        });
        self.token_sale_contribution_by_pair.insert(key.clone(), id);
        multi_insert(&mut self.token_sale_contribution_by_sale, sale_external_id, id);
        self.sessions.record(Box::new(move |db| {
            db.token_sale_contribution_by_pair.remove(&key);
            multi_remove(&mut db.token_sale_contribution_by_sale, &sale_external_id, id);
        }));
        id
    }
}

// ── Expertise tokens / contributions / allocation proposals ─────────────────

impl Database {
    pub fn find_expertise_token(&self, account: &AccountName, discipline: DisciplineId) -> Option<&ExpertiseToken> {
        self.expertise_token_by_pair
            .get(&(account.clone(), discipline))
            .and_then(|&id| self.find::<ExpertiseToken>(id))
    }

    pub fn expertise_amount(&self, account: &AccountName, discipline: DisciplineId) -> i64 {
        self.find_expertise_token(account, discipline).map(|t| t.amount).unwrap_or(0)
    }

    pub fn upsert_expertise_token(&mut self, account: AccountName, discipline: DisciplineId, delta: i64) {
        let key = (account.clone(), discipline);
        if let Some(&id) = self.expertise_token_by_pair.get(&key) {
            let _ = self.modify::<ExpertiseToken>(id, |t| t.amount += delta);
        } else {
            let id = self.create::<ExpertiseToken>(|assigned_id| ExpertiseToken {
                id: assigned_id,
                account: account.clone(),
                discipline,
                amount: delta,
            });
            self.expertise_token_by_pair.insert(key.clone(), id);
            self.sessions.record(Box::new(move |db| {
                db.expertise_token_by_pair.remove(&key);
            }));
        }
    }

    pub fn find_expertise_contribution(
        &self,
        discipline: DisciplineId,
        research_content_external_id: &ExternalId,
    ) -> Option<&ExpertiseContribution> {
        self.iter::<ExpertiseContribution>()
            .map(|(_, c)| c)
            .find(|c| c.discipline == discipline && c.research_content_external_id == *research_content_external_id)
    }

    pub fn upsert_expertise_contribution(
        &mut self,
        discipline: DisciplineId,
        research_external_id: ExternalId,
        research_content_external_id: ExternalId,
        new_eci: i64,
    ) {
        let existing = self
            .iter::<ExpertiseContribution>()
            .find(|(_, c)| {
                c.discipline == discipline && c.research_content_external_id == research_content_external_id
            })
            .map(|(&id, _)| id);
        match existing {
            Some(id) => {
                let _ = self.modify::<ExpertiseContribution>(id, |c| c.eci = new_eci);
            }
            None => {
                self.create::<ExpertiseContribution>(|assigned_id| ExpertiseContribution {
                    id: assigned_id,
                    discipline,
                    research_external_id,
                    research_content_external_id,
                    eci: new_eci,
                });
            }
        }
    }

    pub fn find_allocation_proposal(&self, id: ObjectId) -> Option<&ExpertiseAllocationProposal> {
        self.find::<ExpertiseAllocationProposal>(id)
    }

    pub fn find_allocation_proposal_by_external_id(&self, external_id: &ExternalId) -> Option<&ExpertiseAllocationProposal> {
        self.allocation_proposal_by_external_id.get(external_id).and_then(|&id| self.find::<ExpertiseAllocationProposal>(id))
    }

    pub fn create_allocation_proposal(
        &mut self,
        init: impl FnOnce(ObjectId) -> ExpertiseAllocationProposal,
    ) -> Result<ObjectId, DeipError> {
        let probe = init(0);
        if self.allocation_proposal_by_external_id.contains_key(&probe.external_id) {
            return Err(ValidationError::Other("expertise allocation proposal external id already exists".into()).into());
        }
        let external_id = probe.external_id;
        let id = self.create::<ExpertiseAllocationProposal>(move |assigned_id| {
            let mut proposal = probe;
            proposal.id = assigned_id;
            proposal
        });
        self.allocation_proposal_by_external_id.insert(external_id, id);
        self.sessions.record(Box::new(move |db| {
            db.allocation_proposal_by_external_id.remove(&external_id);
        }));
        Ok(id)
    }

    pub fn active_allocation_proposals(&self) -> Vec<(ObjectId, &ExpertiseAllocationProposal)> {
        self.iter::<ExpertiseAllocationProposal>()
            .filter(|(_, p)| p.status == ExpertiseAllocationProposalStatus::Active)
            .map(|(&id, p)| (id, p))
            .collect()
    }

    pub fn find_allocation_vote(&self, proposal_id: ObjectId, voter: &AccountName) -> Option<&ExpertiseAllocationProposalVote> {
        self.iter::<ExpertiseAllocationProposalVote>()
            .map(|(_, v)| v)
            .find(|v| v.proposal_id == proposal_id && v.voter == *voter)
    }
}

// ── Proposals ─────────────────────────────────────────────────────────────────

impl Database {
    pub fn find_proposal(&self, external_id: &ExternalId) -> Option<&Proposal> {
        self.proposal_by_external_id.get(external_id).and_then(|&id| self.find::<Proposal>(id))
    }

    pub fn get_proposal(&self, external_id: &ExternalId) -> Result<&Proposal, DeipError> {
        self.find_proposal(external_id)
            .ok_or_else(|| EvaluationError::UnknownProposal(external_id.to_string()).into())
    }

    pub fn proposal_id(&self, external_id: &ExternalId) -> Option<ObjectId> {
        self.proposal_by_external_id.get(external_id).copied()
    }

    pub fn all_proposals(&self) -> Vec<(ObjectId, &Proposal)> {
        self.iter::<Proposal>().map(|(&id, p)| (id, p)).collect()
    }

    pub fn create_proposal(&mut self, init: impl FnOnce(ObjectId) -> Proposal) -> Result<ObjectId, DeipError> {
        let probe = init(0);
        if self.proposal_by_external_id.contains_key(&probe.external_id) {
            return Err(ValidationError::Other("proposal external id already exists".into()).into());
        }
        let external_id = probe.external_id;
        let id = self.create::<Proposal>(move |assigned_id| {
            let mut proposal = probe;
            proposal.id = assigned_id;
            proposal
        });
        self.proposal_by_external_id.insert(external_id, id);
        self.sessions.record(Box::new(move |db| {
            db.proposal_by_external_id.remove(&external_id);
        }));
        Ok(id)
    }

    pub fn remove_proposal(&mut self, external_id: &ExternalId) -> Result<(), DeipError> {
        let id = *self
            .proposal_by_external_id
            .get(external_id)
            .ok_or_else(|| EvaluationError::UnknownProposal(external_id.to_string()))?;
        self.remove::<Proposal>(id)?;
        self.proposal_by_external_id.remove(external_id);
        let external_id = *external_id;
        self.sessions.record(Box::new(move |db| {
            db.proposal_by_external_id.insert(external_id, id);
        }));
        Ok(())
    }
}

// ── Vesting balances / budgets ────────────────────────────────────────────────

impl Database {
    pub fn vesting_balances_for(&self, owner: &AccountName) -> Vec<&VestingBalance> {
        self.vesting_balance_by_owner
            .get(owner)
            .into_iter()
            .flatten()
            .filter_map(|&id| self.find::<VestingBalance>(id))
            .collect()
    }

    pub fn create_vesting_balance(&mut self, init: impl FnOnce(ObjectId) -> VestingBalance) -> ObjectId {
        let probe = init(0);
        let owner = probe.owner.clone();
        let id = self.create::<VestingBalance>(move |assigned_id| {
            let mut vb = probe;
            vb.id = assigned_id;
            vb
        });
        multi_insert(&mut self.vesting_balance_by_owner, owner.clone(), id);
        self.sessions.record(Box::new(move |db| {
            multi_remove(&mut db.vesting_balance_by_owner, &owner, id);
        }));
        id
    }

    pub fn budgets_for(&self, owner: &AccountName) -> Vec<&Budget> {
        self.budget_by_owner
            .get(owner)
            .into_iter()
            .flatten()
            .filter_map(|&id| self.find::<Budget>(id))
            .collect()
    }

    pub fn all_budgets(&self) -> Vec<(ObjectId, &Budget)> {
        self.iter::<Budget>().map(|(&id, b)| (id, b)).collect()
    }

    pub fn create_budget(&mut self, init: impl FnOnce(ObjectId) -> Budget) -> ObjectId {
        let probe = init(0);
        let owner = probe.owner.clone();
        let id = self.create::<Budget>(move |assigned_id| {
            let mut budget = probe;
            budget.id = assigned_id;
            budget
        });
        multi_insert(&mut self.budget_by_owner, owner.clone(), id);
        self.sessions.record(Box::new(move |db| {
            multi_remove(&mut db.budget_by_owner, &owner, id);
        }));
        id
    }

    pub fn remove_budget(&mut self, id: ObjectId) -> Result<(), DeipError> {
        let removed = self.remove::<Budget>(id)?;
        let owner = removed.owner.clone();
        multi_remove(&mut self.budget_by_owner, &owner, id);
        self.sessions.record(Box::new(move |db| {
            multi_insert(&mut db.budget_by_owner, owner.clone(), id);
        }));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deip_core::asset::Asset;
    use deip_core::types::PublicKey;

    fn name(s: &str) -> AccountName {
        AccountName::new_unchecked(s)
    }

    fn dummy_key() -> PublicKey {
        PublicKey([0u8; 33])
    }

    fn seed_account(db: &mut Database, account: &str) -> ObjectId {
        db.create_account(|id| Account {
            id,
            name: name(account),
            memo_key: dummy_key(),
            balance: Asset::core(0),
            common_tokens_balance: Asset::core(0),
            withdrawn: Asset::core(0),
            to_withdraw: Asset::core(0),
            withdraw_rate: Asset::core(0),
            next_vesting_withdrawal: None,
            recovery_account: name(account),
            last_owner_update: 0,
            created_at: 0,
            proxy: None,
            witnesses_voted_for: 0,
        })
        .unwrap()
    }

    #[test]
    fn account_lookup_by_name_round_trips_through_undo() {
        let mut db = Database::new();
        db.start_undo_session();
        let id = seed_account(&mut db, "alice");
        assert_eq!(db.find_account_by_name(&name("alice")).unwrap().id, id);

        db.undo().unwrap();
        assert!(db.find_account_by_name(&name("alice")).is_none());
    }

    #[test]
    fn duplicate_account_name_is_rejected() {
        let mut db = Database::new();
        db.start_undo_session();
        seed_account(&mut db, "alice");
        let err = db.create_account(|id| Account {
            id,
            name: name("alice"),
            memo_key: dummy_key(),
            balance: Asset::core(0),
            common_tokens_balance: Asset::core(0),
            withdrawn: Asset::core(0),
            to_withdraw: Asset::core(0),
            withdraw_rate: Asset::core(0),
            next_vesting_withdrawal: None,
            recovery_account: name("alice"),
            last_owner_update: 0,
            created_at: 0,
            proxy: None,
            witnesses_voted_for: 0,
        });
        assert!(matches!(err, Err(DeipError::Evaluation(EvaluationError::AccountAlreadyExists(_)))));
    }

    #[test]
    fn witness_vote_pair_is_unique_and_undoable() {
        let mut db = Database::new();
        db.start_undo_session();
        seed_account(&mut db, "witness-a");
        seed_account(&mut db, "voter-one");

        db.create_witness_vote(name("witness-a"), name("voter-one")).unwrap();
        assert!(db.find_witness_vote(&name("witness-a"), &name("voter-one")).is_some());

        let duplicate = db.create_witness_vote(name("witness-a"), name("voter-one"));
        assert!(duplicate.is_err(), "the same account cannot vote twice for the same witness");

        db.remove_witness_vote(&name("witness-a"), &name("voter-one")).unwrap();
        assert!(db.find_witness_vote(&name("witness-a"), &name("voter-one")).is_none());
    }

    #[test]
    fn block_summary_ring_buffer_overwrites_on_wraparound() {
        let mut db = Database::new();
        db.start_undo_session();
        let window = deip_core::constants::BLOCK_SUMMARY_WINDOW as u64;

        let first_id = deip_core::types::Sha256Digest([1u8; 32]);
        let second_id = deip_core::types::Sha256Digest([2u8; 32]);
        db.set_block_summary(10, first_id);
        assert_eq!(db.block_summary_at(10).unwrap().block_id, first_id);

        db.set_block_summary(10 + window, second_id);
        assert_eq!(
            db.block_summary_at(10 + window).unwrap().block_id,
            second_id,
            "wraparound reuses the same slot rather than growing the table"
        );
    }

    #[test]
    fn research_content_is_indexed_both_by_id_and_by_parent_research() {
        let mut db = Database::new();
        db.start_undo_session();
        let research_id = ExternalId::from_hex(&"11".repeat(20)).unwrap();
        let content_id = ExternalId::from_hex(&"22".repeat(20)).unwrap();

        db.create_research(|id| Research {
            id,
            external_id: research_id,
            research_group: name("group-one"),
            description_hash: deip_core::types::Sha256Digest([0u8; 32]),
            disciplines: Default::default(),
            review_share_percent: 0,
            compensation_share_percent: 0,
            is_private: false,
            is_finished: false,
            eci_per_discipline: Default::default(),
            number_of_positive_reviews: 0,
            number_of_negative_reviews: 0,
            members: Default::default(),
            owned_tokens_percent: 10_000,
            created_at: 0,
        })
        .unwrap();

        db.create_research_content(|id| ResearchContent {
            id,
            external_id: content_id,
            research_external_id: research_id,
            content_type: ResearchContentType::Announcement,
            content_hash: deip_core::types::Sha256Digest([0u8; 32]),
            authors: Default::default(),
            references: Default::default(),
            activity_window_start: 0,
            activity_window_end: 0,
            activity_round: 0,
            eci_per_discipline: Default::default(),
            created_at: 0,
        })
        .unwrap();

        assert!(db.find_research_content(&content_id).is_some());
        assert_eq!(db.research_content_for(&research_id).len(), 1);

        db.undo().unwrap();
        assert!(db.find_research_content(&content_id).is_none());
        assert!(db.research_content_for(&research_id).is_empty());
    }

    #[test]
    fn token_sale_contribution_is_indexed_by_pair_and_by_sale() {
        let mut db = Database::new();
        db.start_undo_session();
        let sale_id = ExternalId::from_hex(&"33".repeat(20)).unwrap();

        let first = db.create_token_sale_contribution(|id| ResearchTokenSaleContribution {
            id,
            research_token_sale_external_id: sale_id,
            contributor: name("contributor"),
            amount: Asset::core(100),
            contributed_at: 0,
        });
        assert_eq!(db.contributions_for_sale(&sale_id).len(), 1);
        assert_eq!(db.find_token_sale_contribution(&sale_id, &name("contributor")).unwrap().id, first);
    }
}
