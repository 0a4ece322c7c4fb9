//! Structured actions produced by decoders

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use super::trace::TraceItem;

/// A protocol-level interpretation of one or more calls/logs.
///
/// The serde tag is the name of the decoder that produced the action and is
/// also the key the registry uses to route formatting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Action {
    #[serde(rename = "comet-supply")]
    Supply(SupplyAction),
    #[serde(rename = "comet-withdraw")]
    Withdraw(WithdrawAction),
    #[serde(rename = "erc20-transfer")]
    Transfer(TransferAction),
    #[serde(rename = "erc20-approve")]
    Approval(ApprovalAction),
}

impl Action {
    /// Name of the decoder that produced this action
    pub fn name(&self) -> &'static str {
        match self {
            Action::Supply(_) => "comet-supply",
            Action::Withdraw(_) => "comet-withdraw",
            Action::Transfer(_) => "erc20-transfer",
            Action::Approval(_) => "erc20-approve",
        }
    }
}

/// Asset supplied into a lending market
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyAction {
    /// Account that sent the call
    pub operator: Address,
    /// Account whose funds are supplied
    pub supplier: Address,
    /// Account credited with the supply
    pub recipient: Address,
    /// Market contract that received the call
    pub market: Address,
    pub supply_token: Address,
    pub amount: U256,
}

/// Asset withdrawn from a lending market
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawAction {
    pub operator: Address,
    /// Account whose position is debited
    pub owner: Address,
    /// Account receiving the tokens
    pub recipient: Address,
    pub market: Address,
    pub withdraw_token: Address,
    pub amount: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferAction {
    pub token: Address,
    pub from: Address,
    pub to: Address,
    pub amount: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalAction {
    pub token: Address,
    pub owner: Address,
    pub spender: Address,
    pub amount: U256,
}

/// An action together with the trace item it was decoded from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedAction {
    pub item: TraceItem,
    #[serde(flatten)]
    pub action: Action,
}

impl DecodedAction {
    pub fn name(&self) -> &'static str {
        self.action.name()
    }
}
