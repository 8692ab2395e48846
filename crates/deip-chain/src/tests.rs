//! End-to-end pipeline tests against an in-memory database. Each test
//! builds the minimal genesis-like state it needs by hand rather than
//! going through `deip-genesis`, since the chain-core should behave the
//! same whether state arrived via genesis or ordinary blocks.

use std::collections::BTreeMap;

use deip_core::asset::Asset;
use deip_core::model::account::Authority;
use deip_core::model::{Account, AuthorityRecord, DynamicGlobalProperties, Witness, WitnessSchedule, WitnessScheduleSlot};
use deip_core::operation::Operation;
use deip_core::transaction::{SignedTransaction, Transaction};
use deip_core::types::{AccountName, PublicKey, Sha256Digest};
use deip_crypto::KeyPair;

use deip_chainbase::Database;

use crate::pipeline::{push_block, push_transaction};

const CHAIN_ID: Sha256Digest = Sha256Digest([7u8; 32]);
const GENESIS_TIME: i64 = 1_700_000_000;

fn single_key_authority(key: &PublicKey) -> Authority {
    let mut key_auths = BTreeMap::new();
    key_auths.insert(key.clone(), 1);
    Authority { weight_threshold: 1, account_auths: BTreeMap::new(), key_auths }
}

/// Registers an account with a freshly generated keypair and funds its
/// transferable balance, returning the keypair so tests can sign with it.
fn seed_account(db: &mut Database, name: &str, balance: i64) -> KeyPair {
    let keypair = KeyPair::generate();
    let account_name = AccountName::new_unchecked(name);
    let authority = single_key_authority(&keypair.public_key);
    db.create_account(|id| Account {
        id,
        name: account_name.clone(),
        memo_key: keypair.public_key.clone(),
        balance: Asset::core(balance),
        common_tokens_balance: Asset::core(0),
        withdrawn: Asset::core(0),
        to_withdraw: Asset::core(0),
        withdraw_rate: Asset::core(0),
        next_vesting_withdrawal: None,
        recovery_account: account_name.clone(),
        last_owner_update: GENESIS_TIME,
        created_at: GENESIS_TIME,
        proxy: None,
        witnesses_voted_for: 0,
    })
    .expect("seed account creation cannot fail");
    db.create_authority_record(|id| AuthorityRecord {
        id,
        account: account_name,
        owner: authority.clone(),
        active: authority,
        active_overrides: Default::default(),
        last_owner_update: GENESIS_TIME,
    });
    keypair
}

fn seed_db() -> Database {
    let mut db = Database::new();
    db.create(|id| DynamicGlobalProperties {
        id,
        head_block_number: 0,
        head_block_id: Sha256Digest([0u8; 32]),
        head_block_time: GENESIS_TIME,
        current_witness: AccountName::new_unchecked("initminer"),
        current_supply: Asset::core(0),
        maximum_block_size: 131_072,
        current_aslot: 0,
        recent_slots_filled: u128::MAX,
        last_irreversible_block_num: 0,
    });
    db.create(|id| WitnessSchedule {
        id,
        current_shuffled_witnesses: vec![],
        current_virtual_time: 0,
        next_shuffle_block_num: u64::MAX,
        num_scheduled_witnesses: 0,
        top_voted_witnesses: 0,
        runner_witnesses: 0,
        witness_pay_normalization_factor: 0,
        majority_version: 0,
        median_maximum_block_size: 131_072,
    });
    db
}

fn signed_transfer(from: &KeyPair, from_name: &str, to_name: &str, amount: i64, expiration: i64) -> SignedTransaction {
    let transaction = Transaction {
        ref_block_num: 0,
        ref_block_prefix: 0,
        expiration,
        operations: vec![Operation::Transfer {
            from: AccountName::new_unchecked(from_name),
            to: AccountName::new_unchecked(to_name),
            amount: Asset::core(amount),
            memo: None,
        }],
        extensions: vec![],
    };
    let digest = deip_crypto::signing_digest(&CHAIN_ID, &transaction.canonical_bytes());
    let signature = from.sign_prehash(&digest.0);
    SignedTransaction { transaction, signatures: vec![signature], tenant_signature: None }
}

#[test]
fn transfer_with_valid_signature_moves_balance() {
    let mut db = seed_db();
    let alice = seed_account(&mut db, "alice", 1_000);
    seed_account(&mut db, "bob", 0);

    let stx = signed_transfer(&alice, "alice", "bob", 300, GENESIS_TIME + 60);
    let (_, virtual_ops) = push_transaction(&mut db, &stx, &CHAIN_ID, GENESIS_TIME, 0).expect("transfer applies");
    assert!(virtual_ops.is_empty());

    let alice_balance = db.get_account_by_name(&AccountName::new_unchecked("alice")).unwrap().balance;
    let bob_balance = db.get_account_by_name(&AccountName::new_unchecked("bob")).unwrap().balance;
    assert_eq!(alice_balance, Asset::core(700));
    assert_eq!(bob_balance, Asset::core(300));
}

#[test]
fn transfer_signed_by_the_wrong_key_is_rejected() {
    let mut db = seed_db();
    seed_account(&mut db, "alice", 1_000);
    seed_account(&mut db, "bob", 0);
    let impostor = KeyPair::generate();

    let stx = signed_transfer(&impostor, "alice", "bob", 300, GENESIS_TIME + 60);
    let result = push_transaction(&mut db, &stx, &CHAIN_ID, GENESIS_TIME, 0);
    assert!(result.is_err());

    let alice_balance = db.get_account_by_name(&AccountName::new_unchecked("alice")).unwrap().balance;
    assert_eq!(alice_balance, Asset::core(1_000), "a rejected transaction must leave balances untouched");
}

#[test]
fn overdrawing_transfer_is_rejected_and_leaves_no_partial_state() {
    let mut db = seed_db();
    let alice = seed_account(&mut db, "alice", 100);
    seed_account(&mut db, "bob", 0);

    let stx = signed_transfer(&alice, "alice", "bob", 500, GENESIS_TIME + 60);
    let result = push_transaction(&mut db, &stx, &CHAIN_ID, GENESIS_TIME, 0);
    assert!(result.is_err());

    let alice_balance = db.get_account_by_name(&AccountName::new_unchecked("alice")).unwrap().balance;
    let bob_balance = db.get_account_by_name(&AccountName::new_unchecked("bob")).unwrap().balance;
    assert_eq!(alice_balance, Asset::core(100));
    assert_eq!(bob_balance, Asset::core(0));
}

#[test]
fn expired_transaction_is_rejected() {
    let mut db = seed_db();
    let alice = seed_account(&mut db, "alice", 1_000);
    seed_account(&mut db, "bob", 0);

    let stx = signed_transfer(&alice, "alice", "bob", 300, GENESIS_TIME - 1);
    let result = push_transaction(&mut db, &stx, &CHAIN_ID, GENESIS_TIME, 0);
    assert!(matches!(result, Err(deip_core::error::DeipError::Tapos(_))));
}

/// Builds and signs a one-transaction block's header the way a real
/// witness would: Merkle root over its transaction ids, signature over
/// the header bytes with the witness's own key.
fn sign_block(witness_key: &KeyPair, header: deip_core::block::BlockHeader, transactions: Vec<SignedTransaction>) -> deip_core::block::Block {
    let mut block = deip_core::block::Block { header, witness_signature: deip_core::types::Signature([0u8; 65]), transactions };
    let header_digest = deip_crypto::sha256(&block.canonical_header_bytes());
    block.witness_signature = witness_key.sign_prehash(&header_digest.0);
    block
}

#[test]
fn push_block_advances_head_and_applies_its_transactions() {
    let mut db = seed_db();
    let alice = seed_account(&mut db, "alice", 1_000);
    seed_account(&mut db, "bob", 0);
    let witness_key = KeyPair::generate();
    db.create_witness(|id| Witness {
        id,
        owner: AccountName::new_unchecked("initminer"),
        signing_key: witness_key.public_key.clone(),
        votes: 0,
        schedule: WitnessScheduleSlot::None,
        virtual_last_update: 0,
        virtual_position: 0,
        virtual_scheduled_time: 0,
        total_missed: 0,
        last_confirmed_block_num: 0,
        created_at: GENESIS_TIME,
    });

    let stx = signed_transfer(&alice, "alice", "bob", 250, GENESIS_TIME + 60);
    let merkle_root = deip_crypto::merkle_root(&[deip_crypto::tx_id_from_body(&stx.transaction.canonical_bytes())]);
    let header = deip_core::block::BlockHeader {
        previous_id: db.dynamic_global_properties().head_block_id,
        timestamp: GENESIS_TIME + deip_core::constants::BLOCK_INTERVAL_SECS,
        witness: AccountName::new_unchecked("initminer"),
        transaction_merkle_root: merkle_root,
        extensions: vec![],
    };
    let block = sign_block(&witness_key, header, vec![stx]);

    push_block(&mut db, &block, &CHAIN_ID).expect("block applies");

    let props = db.dynamic_global_properties();
    assert_eq!(props.head_block_number, 1);
    assert_eq!(props.head_block_time, GENESIS_TIME + deip_core::constants::BLOCK_INTERVAL_SECS);

    let bob_balance = db.get_account_by_name(&AccountName::new_unchecked("bob")).unwrap().balance;
    assert_eq!(bob_balance, Asset::core(250));
}

#[test]
fn proposal_executes_its_nested_transfer_once_quorum_is_met() {
    let mut db = seed_db();
    let alice = seed_account(&mut db, "alice", 1_000);
    let bob = seed_account(&mut db, "bob", 0);

    let external_id = deip_core::types::ExternalId([1u8; 20]);
    let nested_transfer = Operation::Transfer {
        from: AccountName::new_unchecked("alice"),
        to: AccountName::new_unchecked("bob"),
        amount: Asset::core(150),
        memo: None,
    };
    let create = Transaction {
        ref_block_num: 0,
        ref_block_prefix: 0,
        expiration: GENESIS_TIME + 60,
        operations: vec![Operation::CreateProposal {
            external_id,
            proposed_ops: vec![nested_transfer],
            proposer: AccountName::new_unchecked("bob"),
            expiration_time: GENESIS_TIME + 3_600,
            review_period_seconds: None,
        }],
        extensions: vec![],
    };
    let create_digest = deip_crypto::signing_digest(&CHAIN_ID, &create.canonical_bytes());
    let create_stx = SignedTransaction {
        transaction: create,
        signatures: vec![bob.sign_prehash(&create_digest.0)],
        tenant_signature: None,
    };
    push_transaction(&mut db, &create_stx, &CHAIN_ID, GENESIS_TIME, 0).expect("proposal creation applies");

    let approve = Transaction {
        ref_block_num: 0,
        ref_block_prefix: 0,
        expiration: GENESIS_TIME + 60,
        operations: vec![Operation::UpdateProposal {
            external_id,
            active_approvals_to_add: vec![AccountName::new_unchecked("alice")],
            active_approvals_to_remove: vec![],
            owner_approvals_to_add: vec![],
            owner_approvals_to_remove: vec![],
            key_approvals_to_add: vec![],
            key_approvals_to_remove: vec![],
        }],
        extensions: vec![],
    };
    let approve_digest = deip_crypto::signing_digest(&CHAIN_ID, &approve.canonical_bytes());
    let approve_stx = SignedTransaction {
        transaction: approve,
        signatures: vec![alice.sign_prehash(&approve_digest.0)],
        tenant_signature: None,
    };
    let (_, virtual_ops) = push_transaction(&mut db, &approve_stx, &CHAIN_ID, GENESIS_TIME, 0).expect("approval applies");

    let bob_balance = db.get_account_by_name(&AccountName::new_unchecked("bob")).unwrap().balance;
    assert_eq!(bob_balance, Asset::core(150), "quorum should have executed the nested transfer");
    assert!(db.get_proposal(&external_id).is_err(), "a completed proposal is removed");
    assert!(virtual_ops.iter().any(|op| matches!(op, deip_core::virtual_op::VirtualOperation::ProposalExecuted { .. })));
}
