//! Account lifecycle and balance mutations.
//!
//! Zero amounts are no-ops and emit nothing. Account creation on the credit
//! side goes through [`TokenMethod::initialize_user_account`], which charges
//! the initialization fee to the transaction's fee payer; the credited
//! amount itself is never reduced.

use super::{MethodContext, TokenMethod};
use crate::error::{TokenError, TokenResult};
use crate::events::TokenEvent;
use crate::identifiers::{Address, ChainId, TokenId};
use crate::interop::{validate_module, TransferParams};
use crate::storage::{EscrowRecord, StoreKey, SupplyRecord, UserAccount};

impl TokenMethod {
    /// Creates the supply record of a native token at zero.
    pub fn initialize_token(&self, ctx: &mut MethodContext<'_>, token_id: TokenId) -> TokenResult<()> {
        if !self.is_native_token(token_id) {
            return Err(TokenError::NotNativeToken(token_id));
        }
        self.execute(ctx, TokenEvent::InitializeToken { token_id }, |ctx| {
            let key = StoreKey::Supply { token_id };
            if self.stores().supply.has(ctx.store(), &key)? {
                return Err(TokenError::TokenAlreadyInitialized(token_id));
            }
            self.stores()
                .supply
                .set(ctx.store_mut(), &key, &SupplyRecord::default())?;
            Ok(())
        })
    }

    /// Creates an empty account, charging the user account initialization
    /// fee. Does nothing if the account exists.
    pub fn initialize_user_account(
        &self,
        ctx: &mut MethodContext<'_>,
        address: Address,
        token_id: TokenId,
    ) -> TokenResult<()> {
        let key = StoreKey::User { address, token_id };
        if self.stores().user.has(ctx.store(), &key)? {
            return Ok(());
        }
        let initialization_fee = self.config().user_account_initialization_fee;
        let event = TokenEvent::InitializeUserAccount {
            address,
            token_id,
            initialization_fee,
        };
        self.execute(ctx, event, |ctx| {
            self.fee().pay_fee(ctx.store_mut(), initialization_fee)?;
            self.stores()
                .user
                .set(ctx.store_mut(), &key, &UserAccount::default())?;
            Ok(())
        })
    }

    /// Opens the escrow bucket of a native token towards `chain_id`,
    /// charging the escrow initialization fee. Does nothing if it exists.
    pub fn initialize_escrow_account(
        &self,
        ctx: &mut MethodContext<'_>,
        chain_id: ChainId,
        token_id: TokenId,
    ) -> TokenResult<()> {
        if chain_id == self.own_chain_id() {
            return Err(TokenError::SameChain(chain_id));
        }
        if !self.is_native_token(token_id) {
            return Err(TokenError::NotNativeToken(token_id));
        }
        let key = StoreKey::Escrow { chain_id, token_id };
        if self.stores().escrow.has(ctx.store(), &key)? {
            return Ok(());
        }
        let initialization_fee = self.config().escrow_account_initialization_fee;
        let event = TokenEvent::InitializeEscrowAccount {
            chain_id,
            token_id,
            initialization_fee,
        };
        self.execute(ctx, event, |ctx| {
            self.fee().pay_fee(ctx.store_mut(), initialization_fee)?;
            self.stores()
                .escrow
                .set(ctx.store_mut(), &key, &EscrowRecord::default())?;
            Ok(())
        })
    }

    /// Issues `amount` new units of a native token to `address`.
    pub fn mint(
        &self,
        ctx: &mut MethodContext<'_>,
        address: Address,
        token_id: TokenId,
        amount: u64,
    ) -> TokenResult<()> {
        if amount == 0 {
            return Ok(());
        }
        if !self.is_native_token(token_id) {
            return Err(TokenError::NotNativeToken(token_id));
        }
        let event = TokenEvent::Mint {
            address,
            token_id,
            amount,
        };
        self.execute(ctx, event, |ctx| {
            let supply_key = StoreKey::Supply { token_id };
            let supply = self
                .stores()
                .supply
                .find(ctx.store(), &supply_key)?
                .ok_or(TokenError::SupplyNotInitialized(token_id))?;
            let total_supply = supply
                .total_supply
                .checked_add(amount)
                .ok_or(TokenError::Overflow("total supply"))?;

            let user_key = StoreKey::User { address, token_id };
            let current = self
                .stores()
                .user
                .get_or_default(ctx.store(), &user_key)?
                .available_balance;
            if current.checked_add(amount).is_none() {
                return Err(TokenError::Overflow("available balance"));
            }

            self.initialize_user_account(ctx, address, token_id)?;
            self.credit_available_with_create(ctx.store_mut(), address, token_id, amount)?;
            self.stores()
                .supply
                .set(ctx.store_mut(), &supply_key, &SupplyRecord { total_supply })?;
            Ok(())
        })
    }

    /// Destroys `amount` of the available balance of `address`. The supply
    /// record shrinks only for native tokens.
    pub fn burn(
        &self,
        ctx: &mut MethodContext<'_>,
        address: Address,
        token_id: TokenId,
        amount: u64,
    ) -> TokenResult<()> {
        if amount == 0 {
            return Ok(());
        }
        let event = TokenEvent::Burn {
            address,
            token_id,
            amount,
        };
        self.execute(ctx, event, |ctx| {
            self.debit_available(ctx.store_mut(), address, token_id, amount)?;
            if self.is_native_token(token_id) {
                let key = StoreKey::Supply { token_id };
                let supply = self
                    .stores()
                    .supply
                    .find(ctx.store(), &key)?
                    .ok_or(TokenError::SupplyNotInitialized(token_id))?;
                let total_supply = supply
                    .total_supply
                    .checked_sub(amount)
                    .ok_or(TokenError::Overflow("total supply underflow"))?;
                self.stores()
                    .supply
                    .set(ctx.store_mut(), &key, &SupplyRecord { total_supply })?;
            }
            Ok(())
        })
    }

    /// Moves `amount` of available balance from `sender` to `recipient`.
    pub fn transfer(
        &self,
        ctx: &mut MethodContext<'_>,
        sender: Address,
        recipient: Address,
        token_id: TokenId,
        amount: u64,
    ) -> TokenResult<()> {
        if amount == 0 {
            return Ok(());
        }
        let event = TokenEvent::Transfer {
            sender,
            recipient,
            token_id,
            amount,
        };
        self.execute(ctx, event, |ctx| {
            self.debit_available(ctx.store_mut(), sender, token_id, amount)?;
            self.initialize_user_account(ctx, recipient, token_id)?;
            self.credit_available_with_create(ctx.store_mut(), recipient, token_id, amount)
        })
    }

    /// The local `transfer` command: validates the parameters, then
    /// transfers from the transaction sender.
    pub fn transfer_command(
        &self,
        ctx: &mut MethodContext<'_>,
        sender: Address,
        params: &TransferParams,
    ) -> TokenResult<()> {
        params.validate()?;
        self.transfer(
            ctx,
            sender,
            params.recipient_address,
            params.token_id,
            params.amount,
        )
    }

    /// Moves `amount` from the available balance into the locked entry of
    /// `module`.
    pub fn lock(
        &self,
        ctx: &mut MethodContext<'_>,
        address: Address,
        module: &str,
        token_id: TokenId,
        amount: u64,
    ) -> TokenResult<()> {
        validate_module(module)?;
        if amount == 0 {
            return Ok(());
        }
        let event = TokenEvent::Lock {
            address,
            module: module.to_string(),
            token_id,
            amount,
        };
        self.execute(ctx, event, |ctx| {
            let key = StoreKey::User { address, token_id };
            self.check_available(ctx.store(), address, token_id, amount)?;
            let mut account = self.stores().user.get(ctx.store(), &key)?;
            account.available_balance -= amount;
            account.add_locked(module, amount)?;
            self.stores().user.set(ctx.store_mut(), &key, &account)?;
            Ok(())
        })
    }

    /// Returns `amount` from the locked entry of `module` to the available
    /// balance. An entry reaching zero is removed.
    pub fn unlock(
        &self,
        ctx: &mut MethodContext<'_>,
        address: Address,
        module: &str,
        token_id: TokenId,
        amount: u64,
    ) -> TokenResult<()> {
        validate_module(module)?;
        if amount == 0 {
            return Ok(());
        }
        let event = TokenEvent::Unlock {
            address,
            module: module.to_string(),
            token_id,
            amount,
        };
        self.execute(ctx, event, |ctx| {
            let key = StoreKey::User { address, token_id };
            let mut account = self.stores().user.find(ctx.store(), &key)?.ok_or_else(|| {
                TokenError::InsufficientLockedAmount {
                    address,
                    token_id,
                    module: module.to_string(),
                    locked: 0,
                    required: amount,
                }
            })?;
            account.remove_locked(address, token_id, module, amount)?;
            account.credit_available(amount)?;
            self.stores().user.set(ctx.store_mut(), &key, &account)?;
            Ok(())
        })
    }
}
