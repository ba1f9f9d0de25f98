//! # Token Events
//!
//! Every ledger operation reports its outcome as exactly one [`TokenEvent`]
//! paired with a [`TokenEventResult`]. Successful events live and die with
//! the transaction that produced them. Failure events are recorded as
//! *no-revert*: the host discards the failing transaction's writes but keeps
//! the event, so auditors can see what was attempted and why it failed.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::identifiers::{Address, ChainId, TokenId};

/// Result code attached to every emitted event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum TokenEventResult {
    Successful = 0,
    FailInsufficientBalance = 1,
    FailInsufficientLockedAmount = 2,
    FailInsufficientEscrow = 3,
    FailOverflow = 4,
    FailInvalidTokenId = 5,
    FailUnsupportedToken = 6,
    RecoverFailInvalidInputs = 7,
    RecoverFailInsufficientEscrow = 8,
    FailProtocolViolation = 9,
}

impl TokenEventResult {
    pub fn is_success(self) -> bool {
        self == TokenEventResult::Successful
    }
}

/// Payload of an emitted event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "camelCase")]
pub enum TokenEvent {
    Transfer {
        sender: Address,
        recipient: Address,
        token_id: TokenId,
        amount: u64,
    },
    TransferCrossChain {
        sender: Address,
        recipient: Address,
        token_id: TokenId,
        amount: u64,
        receiving_chain_id: ChainId,
    },
    CcmTransfer {
        sender: Address,
        recipient: Address,
        token_id: TokenId,
        amount: u64,
        sending_chain_id: ChainId,
    },
    Mint {
        address: Address,
        token_id: TokenId,
        amount: u64,
    },
    Burn {
        address: Address,
        token_id: TokenId,
        amount: u64,
    },
    Lock {
        address: Address,
        module: String,
        token_id: TokenId,
        amount: u64,
    },
    Unlock {
        address: Address,
        module: String,
        token_id: TokenId,
        amount: u64,
    },
    InitializeToken {
        token_id: TokenId,
    },
    InitializeUserAccount {
        address: Address,
        token_id: TokenId,
        initialization_fee: u64,
    },
    InitializeEscrowAccount {
        chain_id: ChainId,
        token_id: TokenId,
        initialization_fee: u64,
    },
    /// `address` and `token_id` are absent when the proof could not be
    /// decoded far enough to name them.
    Recover {
        terminated_chain_id: ChainId,
        address: Option<Address>,
        token_id: Option<TokenId>,
        amount: u64,
    },
    BeforeCccExecution {
        relayer: Address,
        sending_chain_id: ChainId,
        message_fee_token_id: TokenId,
        fee: u64,
    },
    BeforeCcmForwarding {
        sending_chain_id: ChainId,
        receiving_chain_id: ChainId,
        message_fee_token_id: TokenId,
        fee: u64,
    },
    PayMessageFee {
        payer: Address,
        receiving_chain_id: ChainId,
        message_fee_token_id: TokenId,
        fee: u64,
    },
    AllTokensSupported,
    AllTokensSupportRemoved,
    AllTokensFromChainSupported {
        chain_id: ChainId,
    },
    AllTokensFromChainSupportRemoved {
        chain_id: ChainId,
    },
    TokenIdSupported {
        token_id: TokenId,
    },
    TokenIdSupportRemoved {
        token_id: TokenId,
    },
}

/// One recorded event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub event: TokenEvent,
    pub result: TokenEventResult,
    /// Survives the rollback of the transaction that emitted it.
    pub no_revert: bool,
}

/// Event sink for one unit of work.
#[derive(Clone, Debug, Default)]
pub struct EventQueue {
    records: Vec<EventRecord>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a successful outcome.
    pub fn emit(&mut self, event: TokenEvent) {
        debug!(?event, "token event");
        self.records.push(EventRecord {
            event,
            result: TokenEventResult::Successful,
            no_revert: false,
        });
    }

    /// Records a failed outcome. Failure events are never reverted.
    pub fn emit_failure(&mut self, event: TokenEvent, result: TokenEventResult) {
        debug!(?event, ?result, "token event failed");
        self.records.push(EventRecord {
            event,
            result,
            no_revert: true,
        });
    }

    /// Appends every record of a committed child queue.
    pub fn commit(&mut self, child: EventQueue) {
        self.records.extend(child.records);
    }

    /// Appends only the no-revert records of a rolled-back child queue.
    pub fn revert(&mut self, child: EventQueue) {
        self.records
            .extend(child.records.into_iter().filter(|r| r.no_revert));
    }

    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn last(&self) -> Option<&EventRecord> {
        self.records.last()
    }

    pub fn into_records(self) -> Vec<EventRecord> {
        self.records
    }
}
