//! Generic ERC-20 decoders, matched on any contract

use alloy_primitives::U256;
use async_trait::async_trait;

use crate::core::{Action, ApprovalAction, CallNode, LogEvent, TraceTree, TransferAction};
use crate::decode::{CallMatcher, DecodeState, Decoder};
use crate::domain::abi::{FunctionSignature, SignatureError};
use crate::domain::erc20::{self, APPROVAL_TOPIC, TRANSFER_TOPIC};
use crate::format::{DisplayRow, FormatContext};

/// `transfer` / `transferFrom` calls and standalone `Transfer` events
#[derive(Debug, Clone)]
pub struct Erc20TransferDecoder {
    matcher: CallMatcher,
}

impl Erc20TransferDecoder {
    pub fn new() -> Result<Self, SignatureError> {
        Ok(Self {
            matcher: CallMatcher::new(&[
                "transfer(address to,uint256 amount)",
                "transferFrom(address from,address to,uint256 amount)",
            ])?
            .direct_calls_only(),
        })
    }
}

#[async_trait]
impl Decoder for Erc20TransferDecoder {
    fn name(&self) -> &'static str {
        "erc20-transfer"
    }

    fn signatures(&self) -> &[FunctionSignature] {
        self.matcher.signatures()
    }

    async fn decode_call(
        &self,
        state: &mut DecodeState,
        tree: &TraceTree,
        node: &CallNode,
    ) -> Option<Action> {
        let matched = self.matcher.decode(state, node)?;

        let to = matched.args.address("to")?;
        let amount = matched.args.uint("amount")?;
        let from = matched.args.address("from").unwrap_or(node.from);

        state.consume_known_transfer(tree, Some(node.id));
        state.request_metadata(node.to);

        Some(Action::Transfer(TransferAction {
            token: node.to,
            from,
            to,
            amount,
        }))
    }

    async fn decode_log(
        &self,
        state: &mut DecodeState,
        _tree: &TraceTree,
        log: &LogEvent,
    ) -> Option<Action> {
        if state.is_consumed(log) {
            return None;
        }
        let (from, to, amount) = erc20::decode_pair_event(log, TRANSFER_TOPIC)?;

        state.consume(log);
        state.request_metadata(log.emitter);

        Some(Action::Transfer(TransferAction {
            token: log.emitter,
            from,
            to,
            amount,
        }))
    }

    fn format(&self, action: &Action, ctx: &FormatContext<'_>) -> Option<DisplayRow> {
        let Action::Transfer(transfer) = action else {
            return None;
        };

        Some(
            DisplayRow::new("transfer", "#3f7f5f")
                .add("from", ctx.address(transfer.from))
                .add("to", ctx.address(transfer.to))
                .add("amount", ctx.token_amount(transfer.token, transfer.amount)),
        )
    }
}

/// `approve` calls and standalone `Approval` events
#[derive(Debug, Clone)]
pub struct Erc20ApprovalDecoder {
    matcher: CallMatcher,
}

impl Erc20ApprovalDecoder {
    pub fn new() -> Result<Self, SignatureError> {
        Ok(Self {
            matcher: CallMatcher::new(&["approve(address spender,uint256 amount)"])?
                .direct_calls_only(),
        })
    }
}

#[async_trait]
impl Decoder for Erc20ApprovalDecoder {
    fn name(&self) -> &'static str {
        "erc20-approve"
    }

    fn signatures(&self) -> &[FunctionSignature] {
        self.matcher.signatures()
    }

    async fn decode_call(
        &self,
        state: &mut DecodeState,
        tree: &TraceTree,
        node: &CallNode,
    ) -> Option<Action> {
        let matched = self.matcher.decode(state, node)?;

        let spender = matched.args.address("spender")?;
        let amount = matched.args.uint("amount")?;

        state.consume_with_events(tree, node, APPROVAL_TOPIC);
        state.request_metadata(node.to);

        Some(Action::Approval(ApprovalAction {
            token: node.to,
            owner: node.from,
            spender,
            amount,
        }))
    }

    async fn decode_log(
        &self,
        state: &mut DecodeState,
        _tree: &TraceTree,
        log: &LogEvent,
    ) -> Option<Action> {
        if state.is_consumed(log) {
            return None;
        }
        let (owner, spender, amount) = erc20::decode_pair_event(log, APPROVAL_TOPIC)?;

        state.consume(log);
        state.request_metadata(log.emitter);

        Some(Action::Approval(ApprovalAction {
            token: log.emitter,
            owner,
            spender,
            amount,
        }))
    }

    fn format(&self, action: &Action, ctx: &FormatContext<'_>) -> Option<DisplayRow> {
        let Action::Approval(approval) = action else {
            return None;
        };

        let amount = if approval.amount == U256::MAX {
            "unlimited".to_string()
        } else {
            ctx.token_amount(approval.token, approval.amount)
        };
        Some(
            DisplayRow::new("approve", "#8a6d3b")
                .add("owner", ctx.address(approval.owner))
                .add("spender", ctx.address(approval.spender))
                .add("amount", amount),
        )
    }
}
