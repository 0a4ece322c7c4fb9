//! Decoder contract and the shared call-matching plumbing

use std::collections::HashSet;

use alloy_primitives::Address;
use async_trait::async_trait;
use tracing::trace;

use super::state::DecodeState;
use crate::core::{Action, CallKind, CallNode, LogEvent, TraceTree};
use crate::domain::abi::{DecodedArgs, FunctionSignature, SignatureError};
use crate::format::{DisplayRow, FormatContext};

/// A protocol- or action-specific decoder.
///
/// `decode_call` and `decode_log` either return `None` with the state
/// untouched, or return an action after consuming everything that belongs
/// to it. A decoder may await inside a decode call; the `&mut` borrow on the
/// state keeps that call exclusive for its whole duration.
#[async_trait]
pub trait Decoder: Send + Sync {
    /// Stable name, used as action tag and formatting route
    fn name(&self) -> &'static str;

    /// Signatures this decoder recognizes
    fn signatures(&self) -> &[FunctionSignature];

    async fn decode_call(
        &self,
        state: &mut DecodeState,
        tree: &TraceTree,
        node: &CallNode,
    ) -> Option<Action>;

    async fn decode_log(
        &self,
        _state: &mut DecodeState,
        _tree: &TraceTree,
        _log: &LogEvent,
    ) -> Option<Action> {
        None
    }

    /// Display row for an action this decoder produced
    fn format(&self, action: &Action, ctx: &FormatContext<'_>) -> Option<DisplayRow>;
}

/// A node that passed every precondition, with its decoded inputs
#[derive(Debug, Clone)]
pub struct CallMatch<'a> {
    pub signature: &'a FunctionSignature,
    pub args: DecodedArgs,
}

impl CallMatch<'_> {
    /// Whether the matched signature has the given function name
    pub fn is(&self, name: &str) -> bool {
        self.signature.name == name
    }
}

/// Ordered precondition checks shared by call decoders
#[derive(Debug, Clone)]
pub struct CallMatcher {
    signatures: Vec<FunctionSignature>,
    scope: Option<HashSet<Address>>,
    direct_only: bool,
}

impl CallMatcher {
    pub fn new(signatures: &[&str]) -> Result<Self, SignatureError> {
        let signatures = signatures
            .iter()
            .map(|s| FunctionSignature::parse(s))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            signatures,
            scope: None,
            direct_only: false,
        })
    }

    /// Only match calls whose target is one of `addresses`
    pub fn scoped_to(mut self, addresses: impl IntoIterator<Item = Address>) -> Self {
        self.scope
            .get_or_insert_with(HashSet::new)
            .extend(addresses);
        self
    }

    /// Only match plain `call`s
    pub fn direct_calls_only(mut self) -> Self {
        self.direct_only = true;
        self
    }

    pub fn signatures(&self) -> &[FunctionSignature] {
        &self.signatures
    }

    /// Run the preconditions in order: not consumed, target in scope,
    /// selector known, call kind allowed. Never touches the state.
    pub fn matches(&self, state: &DecodeState, node: &CallNode) -> Option<&FunctionSignature> {
        if state.is_consumed(node) {
            return None;
        }

        if let Some(scope) = &self.scope {
            if !scope.contains(&node.to) {
                return None;
            }
        }

        let signature = self.signatures.iter().find(|s| s.matches(&node.calldata))?;

        if self.direct_only && node.kind != CallKind::Call {
            return None;
        }

        Some(signature)
    }

    /// [`matches`](Self::matches) plus input decoding. Calldata that does
    /// not decode under the matched layout is a non-match.
    pub fn decode(&self, state: &DecodeState, node: &CallNode) -> Option<CallMatch<'_>> {
        let signature = self.matches(state, node)?;
        match signature.decode_inputs(&node.calldata) {
            Ok(args) => Some(CallMatch { signature, args }),
            Err(err) => {
                trace!(node = %node.id, signature = %signature, %err, "calldata does not decode");
                None
            }
        }
    }
}
