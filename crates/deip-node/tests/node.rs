//! End-to-end tests against `Node` directly — no subprocess, no RPC: the
//! node's only interfaces are the read lock, transaction submission, and
//! the event stream (§1, §5, §6), so that is what these exercise.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use deip_chain::SkipFlags;
use deip_core::asset::Asset;
use deip_core::block::{Block, BlockHeader};
use deip_core::operation::Operation;
use deip_core::transaction::{SignedTransaction, Transaction};
use deip_core::types::{AccountName, Sha256Digest, Signature};
use deip_crypto::KeyPair;
use deip_genesis::{GenesisAccount, GenesisBalance, GenesisRecord, GenesisWitnessCandidate};
use deip_node::{Node, NodeConfig};

const GENESIS_TIME: i64 = 1_700_000_000;

fn account(name: &str, keypair: &KeyPair) -> GenesisAccount {
    GenesisAccount {
        name: AccountName::new_unchecked(name),
        memo_key: keypair.public_key.clone(),
        owner_key: keypair.public_key.clone(),
        active_key: keypair.public_key.clone(),
        recovery_account: AccountName::new_unchecked(name),
    }
}

/// Builds a minimal, self-consistent genesis record (one witness, two
/// funded accounts) and returns it alongside the keypairs that can sign
/// for each named account.
fn genesis_fixture() -> (GenesisRecord, KeyPair, KeyPair, KeyPair) {
    let initminer = KeyPair::generate();
    let alice = KeyPair::generate();
    let bob = KeyPair::generate();

    let mut record = GenesisRecord {
        initial_timestamp: GENESIS_TIME,
        initial_chain_id: Sha256Digest([0u8; 32]),
        init_supply: Asset::core(2_000),
        registrar: AccountName::new_unchecked("initminer"),
        accounts: vec![account("initminer", &initminer), account("alice", &alice), account("bob", &bob)],
        witness_candidates: vec![GenesisWitnessCandidate { owner: AccountName::new_unchecked("initminer"), signing_key: initminer.public_key.clone() }],
        assets: vec![],
        account_balances: vec![
            GenesisBalance { account: AccountName::new_unchecked("alice"), amount: Asset::core(1_000) },
            GenesisBalance { account: AccountName::new_unchecked("bob"), amount: Asset::core(1_000) },
        ],
        disciplines: vec![],
        expert_tokens: vec![],
        research_groups: vec![],
        researches: vec![],
        research_contents: vec![],
        research_content_reviews: vec![],
        vesting_balances: vec![],
        proposals: vec![],
    };
    record.initial_chain_id = deip_genesis::compute_chain_id(&record);
    (record, initminer, alice, bob)
}

fn config() -> NodeConfig {
    NodeConfig {
        genesis_path: "unused-in-these-tests".into(),
        chain_id_override: None,
        skip: SkipFlags::default(),
        flush_interval_blocks: 10_000,
        tenant: None,
    }
}

fn signed_transfer(from: &KeyPair, from_name: &str, to_name: &str, amount: i64, expiration: i64, chain_id: &Sha256Digest) -> SignedTransaction {
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
    let digest = deip_crypto::signing_digest(chain_id, &transaction.canonical_bytes());
    let signature = from.sign_prehash(&digest.0);
    SignedTransaction { transaction, signatures: vec![signature], tenant_signature: None }
}

fn sign_block(witness_key: &KeyPair, header: BlockHeader, transactions: Vec<SignedTransaction>) -> Block {
    let mut block = Block { header, witness_signature: Signature([0u8; 65]), transactions };
    let header_digest = deip_crypto::sha256(&block.canonical_header_bytes());
    block.witness_signature = witness_key.sign_prehash(&header_digest.0);
    block
}

#[test]
fn bootstrap_applies_genesis_and_exposes_a_read_snapshot() {
    let (record, _initminer, _alice, _bob) = genesis_fixture();
    let node = Node::bootstrap(config(), &record).expect("genesis applies");

    assert_eq!(node.chain_id(), record.initial_chain_id);
    let snapshot = node.read();
    assert_eq!(snapshot.get_account_by_name(&AccountName::new_unchecked("alice")).unwrap().balance, Asset::core(1_000));
}

#[test]
fn submit_transaction_moves_balance_and_queues_into_the_mempool() {
    let (record, _initminer, alice, _bob) = genesis_fixture();
    let mut node = Node::bootstrap(config(), &record).expect("genesis applies");
    let chain_id = node.chain_id();

    let stx = signed_transfer(&alice, "alice", "bob", 100, GENESIS_TIME + 60, &chain_id);
    node.submit_transaction(stx).expect("transfer applies");

    assert_eq!(node.pending_transactions().len(), 1);
    let snapshot = node.read();
    assert_eq!(snapshot.get_account_by_name(&AccountName::new_unchecked("bob")).unwrap().balance, Asset::core(1_100));
}

#[test]
fn push_block_drops_included_transactions_from_the_mempool() {
    let (record, initminer, alice, _bob) = genesis_fixture();
    let mut node = Node::bootstrap(config(), &record).expect("genesis applies");
    let chain_id = node.chain_id();

    let stx = signed_transfer(&alice, "alice", "bob", 250, GENESIS_TIME + 60, &chain_id);
    node.submit_transaction(stx.clone()).expect("transfer applies standalone");
    assert_eq!(node.pending_transactions().len(), 1);

    let merkle_root = deip_crypto::merkle_root(&[deip_crypto::tx_id_from_body(&stx.transaction.canonical_bytes())]);
    let header = {
        let snapshot = node.read();
        BlockHeader {
            previous_id: snapshot.dynamic_global_properties().head_block_id,
            timestamp: GENESIS_TIME + deip_core::constants::BLOCK_INTERVAL_SECS,
            witness: AccountName::new_unchecked("initminer"),
            transaction_merkle_root: merkle_root,
            extensions: vec![],
        }
    };
    let block = sign_block(&initminer, header, vec![stx]);

    node.push_block(block).expect("block applies");

    assert!(node.pending_transactions().is_empty(), "the included transaction should have been dropped from the mempool");
    let snapshot = node.read();
    assert_eq!(snapshot.dynamic_global_properties().head_block_number, 1);
}

#[test]
fn subscribers_see_applied_block_notifications() {
    let (record, initminer, _alice, _bob) = genesis_fixture();
    let mut node = Node::bootstrap(config(), &record).expect("genesis applies");

    let applied_blocks = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&applied_blocks);
    node.subscribe(move |notification| {
        if matches!(notification, deip_chain::Notification::AppliedBlock { .. }) {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    });

    let header = {
        let snapshot = node.read();
        BlockHeader {
            previous_id: snapshot.dynamic_global_properties().head_block_id,
            timestamp: GENESIS_TIME + deip_core::constants::BLOCK_INTERVAL_SECS,
            witness: AccountName::new_unchecked("initminer"),
            transaction_merkle_root: deip_crypto::merkle_root(&[]),
            extensions: vec![],
        }
    };
    let block = sign_block(&initminer, header, vec![]);
    node.push_block(block).expect("empty block applies");

    assert_eq!(applied_blocks.load(Ordering::SeqCst), 1);
}

#[test]
fn chain_id_override_bypasses_the_self_reference_check() {
    let (mut record, _initminer, _alice, _bob) = genesis_fixture();
    record.initial_chain_id = Sha256Digest([9u8; 32]);
    let forced = Sha256Digest([5u8; 32]);

    let mut cfg = config();
    cfg.chain_id_override = Some(forced);
    let node = Node::bootstrap(cfg, &record).expect("override bypasses the hash check");
    assert_eq!(node.chain_id(), forced);

    // Without the override, the same mismatched record is rejected.
    let err = Node::bootstrap(config(), &record);
    assert!(err.is_err(), "a mismatched chain id must fail when no override is given");
}
