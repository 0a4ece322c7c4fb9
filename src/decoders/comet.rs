//! Compound III (Comet) market decoders

use alloy_primitives::{address, Address};
use async_trait::async_trait;
use tracing::debug;

use crate::core::{Action, CallKind, CallNode, SupplyAction, TraceTree, WithdrawAction};
use crate::decode::{CallMatcher, ConsumptionPlan, DecodeState, Decoder, Role, Step, Target};
use crate::domain::abi::{FunctionSignature, SignatureError};
use crate::format::{DisplayRow, FormatContext};

/// cUSDCv3 on mainnet
pub const DEFAULT_COMET_MARKET: Address = address!("c3d688B66703497DAA19211EEdff47f25384cdc3");

const SUPPLY_SIGNATURES: [&str; 3] = [
    "supply(address asset,uint amount)",
    "supplyTo(address dst,address asset,uint amount)",
    "supplyFrom(address from,address dst,address asset,uint amount)",
];

const WITHDRAW_SIGNATURES: [&str; 3] = [
    "withdraw(address asset,uint amount)",
    "withdrawTo(address to,address asset,uint amount)",
    "withdrawFrom(address src,address to,address asset,uint amount)",
];

fn market_matcher(
    signatures: &[&str],
    markets: impl IntoIterator<Item = Address>,
) -> Result<CallMatcher, SignatureError> {
    Ok(CallMatcher::new(signatures)?
        .scoped_to(std::iter::once(DEFAULT_COMET_MARKET).chain(markets))
        .direct_calls_only())
}

// The market proxy delegatecalls into the implementation, which makes the
// token transfer as its first plain call and emits the market event last.
fn market_plan() -> ConsumptionPlan {
    ConsumptionPlan::new()
        .with(Role::new(
            "token transfer",
            [Step::Child(0), Step::FirstChildOfKind(CallKind::Call)],
            Target::KnownTransfer,
        ))
        .with(Role::new("market event", [Step::Child(0)], Target::LastLog))
}

/// `supply`, `supplyTo` and `supplyFrom` on a Comet market
#[derive(Debug, Clone)]
pub struct CometSupplyDecoder {
    matcher: CallMatcher,
    plan: ConsumptionPlan,
}

impl CometSupplyDecoder {
    /// Decoder for the default market plus `markets`
    pub fn new(markets: impl IntoIterator<Item = Address>) -> Result<Self, SignatureError> {
        Ok(Self {
            matcher: market_matcher(&SUPPLY_SIGNATURES, markets)?,
            plan: market_plan(),
        })
    }
}

#[async_trait]
impl Decoder for CometSupplyDecoder {
    fn name(&self) -> &'static str {
        "comet-supply"
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

        let asset = matched.args.address("asset")?;
        let amount = matched.args.uint("amount")?;
        let supplier = if matched.is("supplyFrom") {
            matched.args.address("from")?
        } else {
            node.from
        };
        let recipient = matched.args.address("dst").unwrap_or(supplier);

        state.consume(node);
        let report = self.plan.apply(state, tree, node);
        debug!(node = %node.id, function = %matched.signature.name, ?report, "comet supply");

        state.request_metadata(node.to);
        state.request_metadata(asset);

        Some(Action::Supply(SupplyAction {
            operator: node.from,
            supplier,
            recipient,
            market: node.to,
            supply_token: asset,
            amount,
        }))
    }

    fn format(&self, action: &Action, ctx: &FormatContext<'_>) -> Option<DisplayRow> {
        let Action::Supply(supply) = action else {
            return None;
        };

        let mut row = DisplayRow::new("supply", "#645e9d")
            .add("operator", ctx.address(supply.operator))
            .add("supplier", ctx.address(supply.supplier));
        if supply.recipient != supply.supplier {
            row = row.add("recipient", ctx.address(supply.recipient));
        }
        Some(
            row.add("market", ctx.address(supply.market))
                .add("amount", ctx.token_amount(supply.supply_token, supply.amount)),
        )
    }
}

/// `withdraw`, `withdrawTo` and `withdrawFrom` on a Comet market
#[derive(Debug, Clone)]
pub struct CometWithdrawDecoder {
    matcher: CallMatcher,
    plan: ConsumptionPlan,
}

impl CometWithdrawDecoder {
    pub fn new(markets: impl IntoIterator<Item = Address>) -> Result<Self, SignatureError> {
        Ok(Self {
            matcher: market_matcher(&WITHDRAW_SIGNATURES, markets)?,
            plan: market_plan(),
        })
    }
}

#[async_trait]
impl Decoder for CometWithdrawDecoder {
    fn name(&self) -> &'static str {
        "comet-withdraw"
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

        let asset = matched.args.address("asset")?;
        let amount = matched.args.uint("amount")?;
        let owner = matched.args.address("src").unwrap_or(node.from);
        let recipient = matched.args.address("to").unwrap_or(node.from);

        state.consume(node);
        let report = self.plan.apply(state, tree, node);
        debug!(node = %node.id, function = %matched.signature.name, ?report, "comet withdraw");

        state.request_metadata(node.to);
        state.request_metadata(asset);

        Some(Action::Withdraw(WithdrawAction {
            operator: node.from,
            owner,
            recipient,
            market: node.to,
            withdraw_token: asset,
            amount,
        }))
    }

    fn format(&self, action: &Action, ctx: &FormatContext<'_>) -> Option<DisplayRow> {
        let Action::Withdraw(withdraw) = action else {
            return None;
        };

        let mut row = DisplayRow::new("withdraw", "#9d5e7a")
            .add("operator", ctx.address(withdraw.operator))
            .add("owner", ctx.address(withdraw.owner));
        if withdraw.recipient != withdraw.owner {
            row = row.add("recipient", ctx.address(withdraw.recipient));
        }
        Some(
            row.add("market", ctx.address(withdraw.market))
                .add("amount", ctx.token_amount(withdraw.withdraw_token, withdraw.amount)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CallFrame, NodeId};
    use crate::format::DisplayConfig;
    use crate::metadata::{MetadataTable, TokenMetadata};
    use alloy_primitives::{Bytes, U256};
    use alloy_sol_types::SolCall;

    alloy_sol_types::sol! {
        function withdrawTo(address to, address asset, uint256 amount);
        function withdrawFrom(address src, address to, address asset, uint256 amount);
    }

    fn usdc() -> Address {
        address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48")
    }

    fn call(to: Address, input: Vec<u8>) -> TraceTree {
        TraceTree::from_frame(&CallFrame {
            kind: CallKind::Call,
            from: Address::repeat_byte(0x01),
            to: Some(to),
            input: Bytes::from(input),
            value: None,
            calls: vec![],
            logs: vec![],
        })
    }

    #[tokio::test]
    async fn test_withdraw_variants() {
        let decoder = CometWithdrawDecoder::new([]).unwrap();
        let to = Address::repeat_byte(0x0b);
        let src = Address::repeat_byte(0x0c);

        let tree = call(
            DEFAULT_COMET_MARKET,
            withdrawToCall { to, asset: usdc(), amount: U256::from(5) }.abi_encode(),
        );
        let mut state = DecodeState::new();
        let Some(Action::Withdraw(action)) =
            decoder.decode_call(&mut state, &tree, tree.root().unwrap()).await
        else {
            panic!("expected a withdraw");
        };
        assert_eq!(action.owner, Address::repeat_byte(0x01));
        assert_eq!(action.recipient, to);
        assert!(state.is_consumed(NodeId(0)));
        assert_eq!(state.pending_metadata(), &[DEFAULT_COMET_MARKET, usdc()]);

        let tree = call(
            DEFAULT_COMET_MARKET,
            withdrawFromCall { src, to, asset: usdc(), amount: U256::from(5) }.abi_encode(),
        );
        let mut state = DecodeState::new();
        let Some(Action::Withdraw(action)) =
            decoder.decode_call(&mut state, &tree, tree.root().unwrap()).await
        else {
            panic!("expected a withdraw");
        };
        assert_eq!(action.owner, src);
        assert_eq!(action.operator, Address::repeat_byte(0x01));
    }

    #[tokio::test]
    async fn test_configured_market_is_in_scope() {
        let extra = Address::repeat_byte(0xcc);
        let input = withdrawToCall {
            to: Address::repeat_byte(0x0b),
            asset: usdc(),
            amount: U256::from(1),
        }
        .abi_encode();
        let tree = call(extra, input);

        let default_only = CometWithdrawDecoder::new([]).unwrap();
        let configured = CometWithdrawDecoder::new([extra]).unwrap();

        let mut state = DecodeState::new();
        assert!(default_only
            .decode_call(&mut state, &tree, tree.root().unwrap())
            .await
            .is_none());
        assert_eq!(state, DecodeState::new());
        assert!(configured
            .decode_call(&mut state, &tree, tree.root().unwrap())
            .await
            .is_some());
    }

    #[test]
    fn test_format_supply_row() {
        let decoder = CometSupplyDecoder::new([]).unwrap();
        let operator = Address::repeat_byte(0x01);
        let action = Action::Supply(SupplyAction {
            operator,
            supplier: operator,
            recipient: operator,
            market: DEFAULT_COMET_MARKET,
            supply_token: usdc(),
            amount: U256::from(1_500_000u64),
        });

        let config = DisplayConfig::default();
        let metadata: MetadataTable = [
            (usdc(), TokenMetadata::new("USDC", 6)),
            (DEFAULT_COMET_MARKET, TokenMetadata::new("cUSDCv3", 6)),
        ]
        .into_iter()
        .collect();
        let row = decoder
            .format(&action, &FormatContext::new(&config, &metadata))
            .unwrap();

        assert_eq!(row.title, "supply");
        assert_eq!(row.color, "#645e9d");
        assert_eq!(row.field("amount"), Some("1.5 USDC"));
        assert_eq!(row.field("market"), Some("cUSDCv3 (0xc3d6..cdc3)"));
        assert!(row.field("recipient").is_none());

        let without_metadata = decoder
            .format(&action, &FormatContext::new(&config, &MetadataTable::new()))
            .unwrap();
        assert_eq!(without_metadata.field("amount"), Some("1500000"));
    }
}
