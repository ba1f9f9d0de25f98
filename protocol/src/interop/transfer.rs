//! Outbound cross-chain transfers and message-fee payment.

use std::collections::BTreeMap;

use tracing::debug;

use super::{
    CrossChainMessageContext, CrossChainTransferMessageParams, SendRequest,
    TransferCrossChainParams,
};
use crate::config::{CROSS_CHAIN_COMMAND_NAME_TRANSFER, MODULE_NAME};
use crate::error::{TokenError, TokenResult};
use crate::events::TokenEvent;
use crate::identifiers::{Address, ChainId, TokenId};
use crate::ledger::{MethodContext, TokenMethod};

impl TokenMethod {
    /// Sends `params.amount` of `params.token_id` from `sender` to a
    /// recipient on `params.receiving_chain_id`.
    ///
    /// Tokens native to this chain move into the escrow bucket of the
    /// receiving chain; tokens native to the receiving chain simply leave
    /// the local ledger. The message fee itself is collected later, when the
    /// interoperability layer calls [`before_send_ccm`](Self::before_send_ccm),
    /// but the sender must already be able to cover it here.
    pub fn transfer_cross_chain(
        &self,
        ctx: &mut MethodContext<'_>,
        sender: Address,
        params: &TransferCrossChainParams,
    ) -> TokenResult<()> {
        params.validate(self.own_chain_id())?;
        if params.amount == 0 {
            return Ok(());
        }
        let token_id = params.token_id;
        let receiving_chain_id = params.receiving_chain_id;

        let message_fee_token_id = self.interop().get_message_fee_token_id(receiving_chain_id)?;
        if message_fee_token_id != params.message_fee_token_id {
            return Err(TokenError::InvalidMessage(format!(
                "message fee token {} does not match channel fee token {}",
                params.message_fee_token_id, message_fee_token_id
            )));
        }

        let message = CrossChainTransferMessageParams {
            token_id,
            amount: params.amount,
            sender_address: sender,
            recipient_address: params.recipient_address,
            data: params.data.clone(),
        }
        .encode()?;

        let event = TokenEvent::TransferCrossChain {
            sender,
            recipient: params.recipient_address,
            token_id,
            amount: params.amount,
            receiving_chain_id,
        };
        self.execute(ctx, event, |ctx| {
            let mut required: BTreeMap<TokenId, u64> = BTreeMap::new();
            required.insert(token_id, params.amount);
            let fee_entry = required.entry(message_fee_token_id).or_insert(0);
            *fee_entry = fee_entry
                .checked_add(params.message_fee)
                .ok_or(TokenError::Overflow("transfer amount plus message fee"))?;
            for (required_token, amount) in required.iter().filter(|(_, amount)| **amount > 0) {
                self.check_available(ctx.store(), sender, *required_token, *amount)?;
            }
            if !self.is_native_token(token_id) && !token_id.is_native_to(receiving_chain_id) {
                return Err(TokenError::InvalidTokenId {
                    token_id,
                    receiving_chain_id,
                });
            }

            if self.is_native_token(token_id) {
                self.initialize_escrow_account(ctx, receiving_chain_id, token_id)?;
            }
            self.debit_available(ctx.store_mut(), sender, token_id, params.amount)?;
            if self.is_native_token(token_id) {
                self.credit_escrow_with_create(
                    ctx.store_mut(),
                    receiving_chain_id,
                    token_id,
                    params.amount,
                )?;
            }

            let accepted = self.interop().send(SendRequest {
                sender,
                module: MODULE_NAME.to_string(),
                cross_chain_command: CROSS_CHAIN_COMMAND_NAME_TRANSFER.to_string(),
                receiving_chain_id,
                fee: params.message_fee,
                params: message,
            })?;
            if !accepted {
                return Err(TokenError::Interop(format!(
                    "message to chain {receiving_chain_id} was not accepted"
                )));
            }
            debug!(%sender, %token_id, %receiving_chain_id, amount = params.amount, "cross-chain transfer sent");
            Ok(())
        })
    }

    /// Debits `fee` from `payer` for a message towards `receiving_chain_id`.
    /// If the fee token is native here, the fee is parked in the escrow of
    /// the receiving chain.
    pub fn pay_message_fee(
        &self,
        ctx: &mut MethodContext<'_>,
        payer: Address,
        receiving_chain_id: ChainId,
        fee: u64,
    ) -> TokenResult<()> {
        if receiving_chain_id == self.own_chain_id() {
            return Err(TokenError::SameChain(receiving_chain_id));
        }
        let message_fee_token_id = self.interop().get_message_fee_token_id(receiving_chain_id)?;
        let event = TokenEvent::PayMessageFee {
            payer,
            receiving_chain_id,
            message_fee_token_id,
            fee,
        };
        self.execute(ctx, event, |ctx| {
            self.debit_available(ctx.store_mut(), payer, message_fee_token_id, fee)?;
            if self.is_native_token(message_fee_token_id) {
                self.initialize_escrow_account(ctx, receiving_chain_id, message_fee_token_id)?;
                self.credit_escrow_with_create(
                    ctx.store_mut(),
                    receiving_chain_id,
                    message_fee_token_id,
                    fee,
                )?;
            }
            Ok(())
        })
    }

    /// Hook run before an outbound message is queued: the transaction
    /// sender pays the message fee.
    pub fn before_send_ccm(
        &self,
        ctx: &mut MethodContext<'_>,
        message: &CrossChainMessageContext,
    ) -> TokenResult<()> {
        self.pay_message_fee(
            ctx,
            message.transaction_sender,
            message.ccm.receiving_chain_id,
            message.ccm.fee,
        )
    }
}
