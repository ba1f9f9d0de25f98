//! Ledger scenarios run end to end through the public API.
//!
//! Each test drives a fresh [`Harness`] through a sequence of operations and
//! checks balances, supply, escrow, and the emitted events afterwards.

use token_protocol::config::{CROSS_CHAIN_COMMAND_NAME_TRANSFER, MODULE_NAME};
use token_protocol::genesis::{
    GenesisEscrowEntry, GenesisStore, GenesisSupplyEntry, GenesisUserEntry,
};
use token_protocol::interop::{
    CcmStatus, CrossChainMessage, CrossChainMessageContext, CrossChainTransferMessageParams,
    RecoverContext, TransferCrossChainParams,
};
use token_protocol::storage::{Record, Substore, UserAccount};
use token_protocol::test_utils::*;
use token_protocol::{GenesisError, TokenError, TokenEvent, TokenEventResult, TokenId};

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

fn send_native(h: &mut Harness, amount: u64) {
    send_native_paying_in(h, amount, BASE_TOKEN);
}

fn send_native_paying_in(h: &mut Harness, amount: u64, message_fee_token_id: TokenId) {
    let params = TransferCrossChainParams {
        token_id: NATIVE_TOKEN,
        amount,
        receiving_chain_id: PARTNER_CHAIN,
        recipient_address: BOB,
        data: String::new(),
        message_fee: 0,
        message_fee_token_id,
    };
    h.run(|m, ctx| m.transfer_cross_chain(ctx, ALICE, &params))
        .expect("cross-chain transfer");
}

fn recovery_proof(total: u64) -> RecoverContext {
    let mut store_key = CAROL.as_bytes().to_vec();
    store_key.extend_from_slice(NATIVE_TOKEN.as_bytes());
    RecoverContext {
        terminated_chain_id: PARTNER_CHAIN,
        substore_prefix: Substore::User.prefix(),
        store_key,
        store_value: UserAccount::with_available(total).encode().expect("encode"),
    }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn mint_to_fresh_account() {
    let mut h = Harness::new();
    h.run(|m, ctx| m.initialize_token(ctx, NATIVE_TOKEN)).unwrap();
    h.run(|m, ctx| m.mint(ctx, ALICE, NATIVE_TOKEN, 100)).unwrap();

    // the initialization fee goes to the fee payer, not out of the minted amount
    assert_eq!(h.available(ALICE, NATIVE_TOKEN), 100);
    assert_eq!(h.supply(NATIVE_TOKEN), 100);
    assert_eq!(h.fee_charges(), vec![USER_FEE]);
}

#[test]
fn transfer_to_fresh_account() {
    let mut h = Harness::new().with_native_balances(&[(ALICE, 100)]);
    h.run(|m, ctx| m.transfer(ctx, ALICE, BOB, NATIVE_TOKEN, 30))
        .unwrap();

    assert_eq!(h.available(ALICE, NATIVE_TOKEN), 70);
    assert_eq!(h.available(BOB, NATIVE_TOKEN), 30);
    assert_eq!(h.supply(NATIVE_TOKEN), 100);
    assert_eq!(h.fee_charges(), vec![USER_FEE, USER_FEE]);
    assert_eq!(
        h.last_event().event,
        TokenEvent::Transfer {
            sender: ALICE,
            recipient: BOB,
            token_id: NATIVE_TOKEN,
            amount: 30,
        }
    );
}

#[test]
fn cross_chain_transfer_puts_value_in_flight() {
    let mut h = Harness::new().with_native_balances(&[(ALICE, 100)]);
    send_native(&mut h, 40);

    assert_eq!(h.available(ALICE, NATIVE_TOKEN), 60);
    assert_eq!(h.escrow(PARTNER_CHAIN, NATIVE_TOKEN), 40);
    assert_eq!(h.supply(NATIVE_TOKEN), 100);
    assert_eq!(h.interop.sent().len(), 1);
}

#[test]
fn recovery_drains_matching_escrow() {
    let mut h = Harness::new().with_native_balances(&[(ALICE, 100)]);
    send_native(&mut h, 40);

    let proof = recovery_proof(40);
    h.run(|m, ctx| m.recover(ctx, &proof)).unwrap();
    assert_eq!(h.escrow(PARTNER_CHAIN, NATIVE_TOKEN), 0);
    assert_eq!(h.available(CAROL, NATIVE_TOKEN), 40);
    assert_eq!(h.supply(NATIVE_TOKEN), 100);
}

#[test]
fn recovery_beyond_escrow_changes_nothing() {
    let mut h = Harness::new().with_native_balances(&[(ALICE, 100)]);
    send_native(&mut h, 40);
    let before = h.store.clone();

    let proof = recovery_proof(50);
    let err = h.run(|m, ctx| m.recover(ctx, &proof)).unwrap_err();
    assert!(matches!(err, TokenError::InsufficientEscrow { .. }));
    assert_eq!(h.store, before);
    assert_eq!(
        h.last_event().result,
        TokenEventResult::RecoverFailInsufficientEscrow
    );
}

#[test]
fn genesis_with_wrong_supply_refused() {
    let genesis = GenesisStore {
        user_substore: vec![GenesisUserEntry {
            address: ALICE,
            token_id: NATIVE_TOKEN,
            available_balance: 60,
            locked_balances: Vec::new(),
        }],
        supply_substore: vec![GenesisSupplyEntry {
            token_id: NATIVE_TOKEN,
            total_supply: 99,
        }],
        escrow_substore: vec![GenesisEscrowEntry {
            escrow_chain_id: PARTNER_CHAIN,
            token_id: NATIVE_TOKEN,
            amount: 40,
        }],
        ..GenesisStore::default()
    };
    let mut h = Harness::new();
    let err = h
        .method
        .init_genesis_state(&mut h.store, &genesis)
        .unwrap_err();
    assert!(matches!(
        err,
        TokenError::Genesis(GenesisError::SupplyMismatch {
            stored: 99,
            computed: 100,
            ..
        })
    ));
    assert!(h.store.is_empty());
}

// ---------------------------------------------------------------------------
// Round Trips
// ---------------------------------------------------------------------------

#[test]
fn lock_unlock_round_trip_restores_account() {
    let mut h = Harness::new().with_native_balances(&[(ALICE, 100)]);
    h.run(|m, ctx| m.lock(ctx, ALICE, "pos", NATIVE_TOKEN, 35))
        .unwrap();
    assert_eq!(h.available(ALICE, NATIVE_TOKEN), 65);

    h.run(|m, ctx| m.unlock(ctx, ALICE, "pos", NATIVE_TOKEN, 35))
        .unwrap();
    assert_eq!(h.available(ALICE, NATIVE_TOKEN), 100);
    assert!(h
        .method
        .get_locked_amounts(&h.store, ALICE, NATIVE_TOKEN)
        .unwrap()
        .is_empty());
}

#[test]
fn token_leaves_and_returns_home() {
    let mut h = Harness::new().with_native_balances(&[(ALICE, 100)]);
    send_native(&mut h, 40);

    let ccm = CrossChainMessage {
        module: MODULE_NAME.to_string(),
        cross_chain_command: CROSS_CHAIN_COMMAND_NAME_TRANSFER.to_string(),
        nonce: 3,
        fee: 0,
        sending_chain_id: PARTNER_CHAIN,
        receiving_chain_id: OWN_CHAIN,
        params: CrossChainTransferMessageParams {
            token_id: NATIVE_TOKEN,
            amount: 40,
            sender_address: BOB,
            recipient_address: CAROL,
            data: String::new(),
        }
        .encode()
        .unwrap(),
        status: CcmStatus::Ok,
    };
    h.run(|m, ctx| m.execute_cross_chain_transfer(ctx, &ccm))
        .unwrap();

    assert_eq!(h.available(CAROL, NATIVE_TOKEN), 40);
    assert_eq!(h.escrow(PARTNER_CHAIN, NATIVE_TOKEN), 0);
    h.method.verify_conservation(&h.store).unwrap();
}

#[test]
fn under_collateralized_relay_flags_sender() {
    let mut h = Harness::new().with_native_balances(&[(ALICE, 100)]);
    h.interop.set_fee_token(PARTNER_CHAIN, NATIVE_TOKEN);
    send_native_paying_in(&mut h, 5, NATIVE_TOKEN);

    let message = CrossChainMessageContext {
        ccm: CrossChainMessage {
            module: "nft".to_string(),
            cross_chain_command: "transfer".to_string(),
            nonce: 9,
            fee: 6,
            sending_chain_id: PARTNER_CHAIN,
            receiving_chain_id: OWN_CHAIN,
            params: Vec::new(),
            status: CcmStatus::Ok,
        },
        transaction_sender: RELAYER,
    };
    assert!(h.method.verify_cross_chain_message(&h.store, &message).is_err());
    let err = h
        .run(|m, ctx| m.before_cross_chain_command_execution(ctx, &message))
        .unwrap_err();
    assert_eq!(
        h.last_event().result,
        TokenEventResult::FailInsufficientBalance
    );
    assert_eq!(h.method.flag_offending_chain(&err).unwrap(), Some(PARTNER_CHAIN));
    assert_eq!(h.interop.terminated(), vec![PARTNER_CHAIN]);
    assert_eq!(h.available(RELAYER, NATIVE_TOKEN), 0);
}
