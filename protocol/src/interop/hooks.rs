//! Hooks the interoperability dispatcher runs around a received message.
//!
//! The fee token of a message is looked up from the channel to the chain
//! whose escrow pays it, every time it is needed. An escrow that cannot
//! cover what a message claims is a fault of the chain that sent it: the
//! error carries that chain (see [`TokenError::offending_chain`]) and is
//! returned to the dispatcher, which decides whether to terminate it.

use tracing::warn;

use super::{CrossChainMessageContext, CrossChainTransferMessageParams};
use crate::error::{TokenError, TokenResult};
use crate::events::{TokenEvent, TokenEventResult};
use crate::identifiers::ChainId;
use crate::ledger::{MethodContext, TokenMethod};
use crate::storage::KvStore;

/// Escrow shortfalls in the relayer payout are reported as a balance
/// failure of the hook.
fn classify_execution_failure(err: &TokenError) -> TokenEventResult {
    match err {
        TokenError::InsufficientEscrow { .. } => TokenEventResult::FailInsufficientBalance,
        other => other.event_result(),
    }
}

impl TokenMethod {
    /// Admission check for a received message: if the fee token is native
    /// here, the sending chain's escrow must cover the fee. Never writes or
    /// emits.
    pub fn verify_cross_chain_message(
        &self,
        store: &dyn KvStore,
        message: &CrossChainMessageContext,
    ) -> TokenResult<()> {
        let ccm = &message.ccm;
        let fee_token_id = self
            .interop()
            .get_channel(ccm.sending_chain_id)?
            .message_fee_token_id;
        if self.is_native_token(fee_token_id) {
            self.check_escrow(store, ccm.sending_chain_id, fee_token_id, ccm.fee)?;
        }
        Ok(())
    }

    /// Pays the relayer of a message its fee before the command runs. A fee
    /// in a native token is drawn from the sending chain's escrow.
    pub fn before_cross_chain_command_execution(
        &self,
        ctx: &mut MethodContext<'_>,
        message: &CrossChainMessageContext,
    ) -> TokenResult<()> {
        let ccm = &message.ccm;
        let relayer = message.transaction_sender;
        let message_fee_token_id = self
            .interop()
            .get_channel(ccm.sending_chain_id)?
            .message_fee_token_id;
        let event = TokenEvent::BeforeCccExecution {
            relayer,
            sending_chain_id: ccm.sending_chain_id,
            message_fee_token_id,
            fee: ccm.fee,
        };
        self.execute_with(ctx, event, classify_execution_failure, |ctx| {
            if self.is_native_token(message_fee_token_id) {
                if let Err(err) = self.debit_escrow(
                    ctx.store_mut(),
                    ccm.sending_chain_id,
                    message_fee_token_id,
                    ccm.fee,
                ) {
                    warn!(
                        sending_chain_id = %ccm.sending_chain_id,
                        fee = ccm.fee,
                        error = %err,
                        "escrow cannot pay relayer fee"
                    );
                    return Err(err);
                }
            }
            self.credit_available_with_create(
                ctx.store_mut(),
                relayer,
                message_fee_token_id,
                ccm.fee,
            )
        })
    }

    /// Re-books a message passing through this chain towards a third one:
    /// the fee, and for token transfers the transferred amount, move from
    /// the sending chain's escrow to the receiving chain's.
    pub fn before_cross_chain_message_forwarding(
        &self,
        ctx: &mut MethodContext<'_>,
        message: &CrossChainMessageContext,
    ) -> TokenResult<()> {
        let ccm = &message.ccm;
        let message_fee_token_id = self
            .interop()
            .get_channel(ccm.receiving_chain_id)?
            .message_fee_token_id;
        let transfer = if ccm.is_token_transfer() {
            Some(CrossChainTransferMessageParams::decode(&ccm.params)?)
        } else {
            None
        };
        let event = TokenEvent::BeforeCcmForwarding {
            sending_chain_id: ccm.sending_chain_id,
            receiving_chain_id: ccm.receiving_chain_id,
            message_fee_token_id,
            fee: ccm.fee,
        };
        self.execute(ctx, event, |ctx| {
            if self.is_native_token(message_fee_token_id) {
                self.move_escrow(
                    ctx.store_mut(),
                    ccm.sending_chain_id,
                    ccm.receiving_chain_id,
                    message_fee_token_id,
                    ccm.fee,
                )
                .map_err(|err| {
                    warn!(
                        sending_chain_id = %ccm.sending_chain_id,
                        error = %err,
                        "escrow cannot cover forwarded message fee"
                    );
                    err
                })?;
            }
            if let Some(transfer) = transfer.filter(|t| self.is_native_token(t.token_id)) {
                self.move_escrow(
                    ctx.store_mut(),
                    ccm.sending_chain_id,
                    ccm.receiving_chain_id,
                    transfer.token_id,
                    transfer.amount,
                )
                .map_err(|err| {
                    warn!(
                        sending_chain_id = %ccm.sending_chain_id,
                        error = %err,
                        "escrow cannot cover forwarded transfer"
                    );
                    err
                })?;
            }
            Ok(())
        })
    }

    /// Terminates the chain a hook failure is attributed to, if any.
    /// Returns the terminated chain.
    pub fn flag_offending_chain(&self, err: &TokenError) -> TokenResult<Option<ChainId>> {
        let Some(chain_id) = err.offending_chain() else {
            return Ok(None);
        };
        warn!(%chain_id, error = %err, "terminating chain for under-collateralized escrow");
        self.interop().terminate_chain(chain_id)?;
        Ok(Some(chain_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CROSS_CHAIN_COMMAND_NAME_TRANSFER, MODULE_NAME};
    use crate::identifiers::TokenId;
    use crate::interop::{CcmStatus, CrossChainMessage};
    use crate::test_utils::*;

    fn message(sending: ChainId, receiving: ChainId, fee: u64) -> CrossChainMessageContext {
        CrossChainMessageContext {
            ccm: CrossChainMessage {
                module: "nft".to_string(),
                cross_chain_command: "transfer".to_string(),
                nonce: 3,
                fee,
                sending_chain_id: sending,
                receiving_chain_id: receiving,
                params: Vec::new(),
                status: CcmStatus::Ok,
            },
            transaction_sender: RELAYER,
        }
    }

    fn token_transfer(
        sending: ChainId,
        receiving: ChainId,
        fee: u64,
        token_id: TokenId,
        amount: u64,
    ) -> CrossChainMessageContext {
        let mut msg = message(sending, receiving, fee);
        msg.ccm.module = MODULE_NAME.to_string();
        msg.ccm.cross_chain_command = CROSS_CHAIN_COMMAND_NAME_TRANSFER.to_string();
        msg.ccm.params = CrossChainTransferMessageParams {
            token_id,
            amount,
            sender_address: ALICE,
            recipient_address: BOB,
            data: String::new(),
        }
        .encode()
        .unwrap();
        msg
    }

    fn with_escrow(h: &mut Harness, chain_id: ChainId, amount: u64) {
        h.run(|m, ctx| {
            m.initialize_token(ctx, NATIVE_TOKEN)?;
            m.mint(ctx, ALICE, NATIVE_TOKEN, amount)?;
            m.transfer_cross_chain(
                ctx,
                ALICE,
                &crate::interop::TransferCrossChainParams {
                    token_id: NATIVE_TOKEN,
                    amount,
                    receiving_chain_id: chain_id,
                    recipient_address: BOB,
                    data: String::new(),
                    message_fee: 0,
                    message_fee_token_id: m.interop().get_message_fee_token_id(chain_id)?,
                },
            )
        })
        .unwrap();
    }

    #[test]
    fn verify_checks_escrow_without_side_effects() {
        let mut h = Harness::new();
        h.interop.set_fee_token(PARTNER_CHAIN, NATIVE_TOKEN);
        with_escrow(&mut h, PARTNER_CHAIN, 10);
        let events = h.events.len();

        assert!(h
            .method
            .verify_cross_chain_message(&h.store, &message(PARTNER_CHAIN, OWN_CHAIN, 10))
            .is_ok());
        let err = h
            .method
            .verify_cross_chain_message(&h.store, &message(PARTNER_CHAIN, OWN_CHAIN, 11))
            .unwrap_err();
        assert_eq!(err.offending_chain(), Some(PARTNER_CHAIN));
        assert_eq!(h.events.len(), events);
    }

    #[test]
    fn foreign_fee_token_needs_no_escrow() {
        let h = Harness::new();
        assert!(h
            .method
            .verify_cross_chain_message(&h.store, &message(PARTNER_CHAIN, OWN_CHAIN, 1_000))
            .is_ok());
    }

    #[test]
    fn relayer_paid_from_sending_chain_escrow() {
        let mut h = Harness::new();
        h.interop.set_fee_token(PARTNER_CHAIN, NATIVE_TOKEN);
        with_escrow(&mut h, PARTNER_CHAIN, 50);

        let msg = message(PARTNER_CHAIN, OWN_CHAIN, 20);
        h.run(|m, ctx| m.before_cross_chain_command_execution(ctx, &msg))
            .unwrap();
        assert_eq!(h.escrow(PARTNER_CHAIN, NATIVE_TOKEN), 30);
        assert_eq!(h.available(RELAYER, NATIVE_TOKEN), 20);
        assert_eq!(h.supply(NATIVE_TOKEN), 50);
        assert!(matches!(
            h.last_event().event,
            TokenEvent::BeforeCccExecution { fee: 20, .. }
        ));
    }

    #[test]
    fn relayer_paid_in_foreign_fee_token_without_escrow() {
        let mut h = Harness::new();
        let msg = message(PARTNER_CHAIN, OWN_CHAIN, 20);
        h.run(|m, ctx| m.before_cross_chain_command_execution(ctx, &msg))
            .unwrap();
        assert_eq!(h.available(RELAYER, BASE_TOKEN), 20);
    }

    #[test]
    fn escrow_shortfall_fails_and_names_sender() {
        let mut h = Harness::new();
        h.interop.set_fee_token(PARTNER_CHAIN, NATIVE_TOKEN);
        with_escrow(&mut h, PARTNER_CHAIN, 5);
        let before = h.store.clone();

        let msg = message(PARTNER_CHAIN, OWN_CHAIN, 6);
        let err = h
            .run(|m, ctx| m.before_cross_chain_command_execution(ctx, &msg))
            .unwrap_err();
        assert_eq!(h.store, before);
        let last = h.last_event();
        assert_eq!(last.result, TokenEventResult::FailInsufficientBalance);
        assert!(last.no_revert);

        assert_eq!(h.method.flag_offending_chain(&err).unwrap(), Some(PARTNER_CHAIN));
        assert_eq!(h.interop.terminated(), vec![PARTNER_CHAIN]);
        assert_eq!(
            h.method
                .flag_offending_chain(&TokenError::Overflow("x"))
                .unwrap(),
            None
        );
    }

    #[test]
    fn zero_fee_message_needs_no_escrow_bucket() {
        let mut h = Harness::new();
        h.interop.set_fee_token(PARTNER_CHAIN, NATIVE_TOKEN);
        let msg = message(PARTNER_CHAIN, OWN_CHAIN, 0);

        h.method.verify_cross_chain_message(&h.store, &msg).unwrap();
        h.run(|m, ctx| m.before_cross_chain_command_execution(ctx, &msg))
            .unwrap();
        assert!(h.last_event().result.is_success());
        assert!(!h
            .method
            .user_account_exists(&h.store, RELAYER, NATIVE_TOKEN)
            .unwrap());
        assert!(h.store.is_empty());
    }

    #[test]
    fn missing_escrow_bucket_names_sender() {
        let mut h = Harness::new();
        h.interop.set_fee_token(PARTNER_CHAIN, NATIVE_TOKEN);
        let msg = message(PARTNER_CHAIN, OWN_CHAIN, 1);
        let err = h
            .run(|m, ctx| m.before_cross_chain_command_execution(ctx, &msg))
            .unwrap_err();
        assert!(matches!(err, TokenError::InsufficientEscrow { escrowed: 0, .. }));
        assert_eq!(err.offending_chain(), Some(PARTNER_CHAIN));
    }

    #[test]
    fn zero_fee_forwarding_needs_no_escrow_bucket() {
        let mut h = Harness::new();
        h.interop.set_fee_token(PARTNER_CHAIN, NATIVE_TOKEN);
        h.interop.set_fee_token(THIRD_CHAIN, NATIVE_TOKEN);

        let plain = message(PARTNER_CHAIN, THIRD_CHAIN, 0);
        h.run(|m, ctx| m.before_cross_chain_message_forwarding(ctx, &plain))
            .unwrap();
        let empty_transfer = token_transfer(PARTNER_CHAIN, THIRD_CHAIN, 0, NATIVE_TOKEN, 0);
        h.run(|m, ctx| m.before_cross_chain_message_forwarding(ctx, &empty_transfer))
            .unwrap();

        assert_eq!(h.events.len(), 2);
        assert!(h.events.records().iter().all(|r| r.result.is_success()));
        assert!(h.store.is_empty());
    }

    #[test]
    fn forwarding_moves_fee_and_amount_between_escrows() {
        let mut h = Harness::new();
        h.interop.set_fee_token(PARTNER_CHAIN, NATIVE_TOKEN);
        h.interop.set_fee_token(THIRD_CHAIN, NATIVE_TOKEN);
        with_escrow(&mut h, PARTNER_CHAIN, 100);

        let forwarded = token_transfer(PARTNER_CHAIN, THIRD_CHAIN, 4, NATIVE_TOKEN, 60);
        h.run(|m, ctx| m.before_cross_chain_message_forwarding(ctx, &forwarded))
            .unwrap();
        assert_eq!(h.escrow(PARTNER_CHAIN, NATIVE_TOKEN), 36);
        assert_eq!(h.escrow(THIRD_CHAIN, NATIVE_TOKEN), 64);
        assert_eq!(h.supply(NATIVE_TOKEN), 100);
    }

    #[test]
    fn forwarding_foreign_transfer_moves_only_fee() {
        let mut h = Harness::new();
        h.interop.set_fee_token(THIRD_CHAIN, NATIVE_TOKEN);
        with_escrow(&mut h, PARTNER_CHAIN, 10);

        let forwarded = token_transfer(PARTNER_CHAIN, THIRD_CHAIN, 3, FOREIGN_TOKEN, 500);
        h.run(|m, ctx| m.before_cross_chain_message_forwarding(ctx, &forwarded))
            .unwrap();
        assert_eq!(h.escrow(PARTNER_CHAIN, NATIVE_TOKEN), 7);
        assert_eq!(h.escrow(THIRD_CHAIN, NATIVE_TOKEN), 3);
    }

    #[test]
    fn forwarding_shortfall_rolls_back_fee_move() {
        let mut h = Harness::new();
        h.interop.set_fee_token(THIRD_CHAIN, NATIVE_TOKEN);
        with_escrow(&mut h, PARTNER_CHAIN, 10);
        let before = h.store.clone();

        let forwarded = token_transfer(PARTNER_CHAIN, THIRD_CHAIN, 2, NATIVE_TOKEN, 9);
        let err = h
            .run(|m, ctx| m.before_cross_chain_message_forwarding(ctx, &forwarded))
            .unwrap_err();
        assert!(matches!(
            err,
            TokenError::InsufficientEscrow {
                escrowed: 8,
                required: 9,
                ..
            }
        ));
        assert_eq!(err.offending_chain(), Some(PARTNER_CHAIN));
        assert_eq!(h.store, before);
        assert_eq!(h.last_event().result, TokenEventResult::FailInsufficientEscrow);
    }
}
