//! The `transferCrossChain` command as executed on the receiving chain.
//!
//! `verify` runs at admission and is read-only. `execute` credits the
//! recipient, or the original sender if the message bounced. Tokens that
//! come home are released from the sending chain's escrow; foreign tokens
//! are credited as they are, provided this chain supports them.

use super::{CcmStatus, CrossChainMessage, CrossChainTransferMessageParams};
use crate::error::{TokenError, TokenResult};
use crate::events::TokenEvent;
use crate::ledger::{MethodContext, TokenMethod};
use crate::storage::KvStore;

impl TokenMethod {
    /// Decodes and checks an inbound transfer message against the current
    /// state. Returns the decoded parameters.
    pub fn verify_cross_chain_transfer(
        &self,
        store: &dyn KvStore,
        ccm: &CrossChainMessage,
    ) -> TokenResult<CrossChainTransferMessageParams> {
        if !ccm.is_token_transfer() {
            return Err(TokenError::InvalidMessage(format!(
                "{}:{} is not a token transfer",
                ccm.module, ccm.cross_chain_command
            )));
        }
        if ccm.receiving_chain_id != self.own_chain_id() {
            return Err(TokenError::InvalidMessage(format!(
                "message is addressed to chain {}",
                ccm.receiving_chain_id
            )));
        }
        let params = CrossChainTransferMessageParams::decode(&ccm.params)?;
        let token_id = params.token_id;
        if self.is_native_token(token_id) {
            self.check_escrow(store, ccm.sending_chain_id, token_id, params.amount)?;
        } else if !token_id.is_native_to(ccm.sending_chain_id) {
            return Err(TokenError::InvalidTokenId {
                token_id,
                receiving_chain_id: ccm.receiving_chain_id,
            });
        } else if !self.is_token_supported(store, token_id)? {
            return Err(TokenError::UnsupportedToken(token_id));
        }
        Ok(params)
    }

    /// Applies an inbound transfer message.
    pub fn execute_cross_chain_transfer(
        &self,
        ctx: &mut MethodContext<'_>,
        ccm: &CrossChainMessage,
    ) -> TokenResult<()> {
        let params = self.verify_cross_chain_transfer(ctx.store(), ccm)?;
        let recipient = if ccm.status == CcmStatus::Ok {
            params.recipient_address
        } else {
            params.sender_address
        };
        let event = TokenEvent::CcmTransfer {
            sender: params.sender_address,
            recipient,
            token_id: params.token_id,
            amount: params.amount,
            sending_chain_id: ccm.sending_chain_id,
        };
        self.execute(ctx, event, |ctx| {
            if self.is_native_token(params.token_id) {
                self.debit_escrow(
                    ctx.store_mut(),
                    ccm.sending_chain_id,
                    params.token_id,
                    params.amount,
                )?;
            }
            self.credit_available_with_create(
                ctx.store_mut(),
                recipient,
                params.token_id,
                params.amount,
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CROSS_CHAIN_COMMAND_NAME_TRANSFER, MODULE_NAME};
    use crate::identifiers::{ChainId, TokenId};
    use crate::interop::TransferCrossChainParams;
    use crate::test_utils::*;

    fn inbound(
        sending: ChainId,
        token_id: TokenId,
        amount: u64,
        status: CcmStatus,
    ) -> CrossChainMessage {
        CrossChainMessage {
            module: MODULE_NAME.to_string(),
            cross_chain_command: CROSS_CHAIN_COMMAND_NAME_TRANSFER.to_string(),
            nonce: 1,
            fee: 0,
            sending_chain_id: sending,
            receiving_chain_id: OWN_CHAIN,
            params: CrossChainTransferMessageParams {
                token_id,
                amount,
                sender_address: ALICE,
                recipient_address: BOB,
                data: String::new(),
            }
            .encode()
            .unwrap(),
            status,
        }
    }

    fn send_out(h: &mut Harness, amount: u64) {
        let params = TransferCrossChainParams {
            token_id: NATIVE_TOKEN,
            amount,
            receiving_chain_id: PARTNER_CHAIN,
            recipient_address: BOB,
            data: String::new(),
            message_fee: 0,
            message_fee_token_id: BASE_TOKEN,
        };
        h.run(|m, ctx| m.transfer_cross_chain(ctx, ALICE, &params))
            .unwrap();
    }

    #[test]
    fn foreign_token_needs_support() {
        let mut h = Harness::new();
        let ccm = inbound(PARTNER_CHAIN, FOREIGN_TOKEN, 25, CcmStatus::Ok);
        assert!(matches!(
            h.run(|m, ctx| m.execute_cross_chain_transfer(ctx, &ccm)),
            Err(TokenError::UnsupportedToken(_))
        ));
        assert!(h.events.is_empty());

        h.run(|m, ctx| m.support_token_id(ctx, FOREIGN_TOKEN)).unwrap();
        h.run(|m, ctx| m.execute_cross_chain_transfer(ctx, &ccm)).unwrap();
        assert_eq!(h.available(BOB, FOREIGN_TOKEN), 25);
        assert!(h.fee_charges().is_empty());
        assert!(matches!(
            h.last_event().event,
            TokenEvent::CcmTransfer { amount: 25, .. }
        ));
    }

    #[test]
    fn token_must_belong_to_sender_or_receiver() {
        let h = Harness::new();
        let ccm = inbound(PARTNER_CHAIN, THIRD_TOKEN, 1, CcmStatus::Ok);
        assert!(matches!(
            h.method.verify_cross_chain_transfer(&h.store, &ccm),
            Err(TokenError::InvalidTokenId { .. })
        ));
        let mut misaddressed = inbound(PARTNER_CHAIN, FOREIGN_TOKEN, 1, CcmStatus::Ok);
        misaddressed.receiving_chain_id = THIRD_CHAIN;
        assert!(matches!(
            h.method.verify_cross_chain_transfer(&h.store, &misaddressed),
            Err(TokenError::InvalidMessage(_))
        ));
    }

    #[test]
    fn returning_native_token_released_from_escrow() {
        let mut h = Harness::new().with_native_balances(&[(ALICE, 100)]);
        send_out(&mut h, 40);
        assert_eq!(h.escrow(PARTNER_CHAIN, NATIVE_TOKEN), 40);

        let ccm = inbound(PARTNER_CHAIN, NATIVE_TOKEN, 30, CcmStatus::Ok);
        h.run(|m, ctx| m.execute_cross_chain_transfer(ctx, &ccm)).unwrap();
        assert_eq!(h.escrow(PARTNER_CHAIN, NATIVE_TOKEN), 10);
        assert_eq!(h.available(BOB, NATIVE_TOKEN), 30);
        assert_eq!(h.supply(NATIVE_TOKEN), 100);

        let too_much = inbound(PARTNER_CHAIN, NATIVE_TOKEN, 11, CcmStatus::Ok);
        let err = h
            .method
            .verify_cross_chain_transfer(&h.store, &too_much)
            .unwrap_err();
        assert_eq!(err.offending_chain(), Some(PARTNER_CHAIN));
    }

    #[test]
    fn zero_amount_native_transfer_needs_no_escrow_bucket() {
        let mut h = Harness::new();
        let ccm = inbound(PARTNER_CHAIN, NATIVE_TOKEN, 0, CcmStatus::Ok);
        h.run(|m, ctx| m.execute_cross_chain_transfer(ctx, &ccm)).unwrap();

        assert!(h.last_event().result.is_success());
        assert!(!h
            .method
            .escrow_account_exists(&h.store, PARTNER_CHAIN, NATIVE_TOKEN)
            .unwrap());
        assert!(!h
            .method
            .user_account_exists(&h.store, BOB, NATIVE_TOKEN)
            .unwrap());
    }

    #[test]
    fn bounced_message_refunds_sender() {
        let mut h = Harness::new().with_native_balances(&[(ALICE, 100)]);
        send_out(&mut h, 40);

        let ccm = inbound(PARTNER_CHAIN, NATIVE_TOKEN, 40, CcmStatus::ModuleNotSupported);
        h.run(|m, ctx| m.execute_cross_chain_transfer(ctx, &ccm)).unwrap();
        assert_eq!(h.available(ALICE, NATIVE_TOKEN), 100);
        assert_eq!(h.available(BOB, NATIVE_TOKEN), 0);
        assert_eq!(h.escrow(PARTNER_CHAIN, NATIVE_TOKEN), 0);
    }
}
