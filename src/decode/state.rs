//! Per-pass traversal state: what has been consumed and which addresses
//! need display metadata.

use std::collections::{BTreeSet, HashSet};

use alloy_primitives::{Address, B256};
use tracing::debug;

use crate::core::{CallKind, CallNode, NodeId, TraceItem, TraceTree};
use crate::domain::erc20;

/// Mutable state of one decode pass over one tree.
///
/// Decoders receive it by `&mut`, so the check-then-consume sequence of a
/// single decode call cannot interleave with another decode call on the
/// same tree. Call [`DecodeState::finalize`] once the pass is over.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeState {
    consumed: BTreeSet<TraceItem>,
    metadata_queue: Vec<Address>,
    requested: HashSet<Address>,
}

impl DecodeState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_consumed(&self, item: impl Into<TraceItem>) -> bool {
        self.consumed.contains(&item.into())
    }

    /// Mark an item consumed. Returns `false` if it already was.
    pub fn consume(&mut self, item: impl Into<TraceItem>) -> bool {
        self.consumed.insert(item.into())
    }

    /// Consume a token transfer call that is an implementation detail of a
    /// higher-level action, together with the `Transfer` events it emitted.
    /// A proxied token forwards the call to its implementation, so the
    /// delegate hops and their events go with it.
    ///
    /// Nothing happens when the node is absent or does not call
    /// `transfer`/`transferFrom`.
    pub fn consume_known_transfer(&mut self, tree: &TraceTree, node: Option<NodeId>) -> bool {
        let Some(node) = node.and_then(|id| tree.node(id)) else {
            debug!(?node, "expected transfer call is absent");
            return false;
        };

        if !erc20::is_transfer_call(node) {
            debug!(node = %node.id, "expected transfer call has a different selector");
            return false;
        }

        self.consume_with_events(tree, node, erc20::TRANSFER_TOPIC);
        true
    }

    /// Consume `node`, its events with `topic`, and the delegatecall chain
    /// that forwards the same calldata to an implementation.
    pub fn consume_with_events(&mut self, tree: &TraceTree, node: &CallNode, topic: B256) {
        let mut current = node;
        loop {
            self.consume(current.id);
            for log in tree.logs_of(current) {
                if log.topic0() == Some(&topic) {
                    self.consume(log.id);
                }
            }

            let Some(inner) = tree.children(current).find(|child| {
                child.kind == CallKind::DelegateCall && child.calldata == node.calldata
            }) else {
                break;
            };
            current = inner;
        }
    }

    /// Queue an address for metadata resolution; repeats are ignored
    pub fn request_metadata(&mut self, address: Address) {
        if self.requested.insert(address) {
            self.metadata_queue.push(address);
        }
    }

    pub fn pending_metadata(&self) -> &[Address] {
        &self.metadata_queue
    }

    pub fn consumed_count(&self) -> usize {
        self.consumed.len()
    }

    /// End the pass. The returned value is read-only.
    pub fn finalize(self) -> FinalizedState {
        FinalizedState {
            consumed: self.consumed,
            metadata_requests: self.metadata_queue,
        }
    }
}

/// Decode state after the pass completed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FinalizedState {
    consumed: BTreeSet<TraceItem>,
    metadata_requests: Vec<Address>,
}

impl FinalizedState {
    pub fn is_consumed(&self, item: impl Into<TraceItem>) -> bool {
        self.consumed.contains(&item.into())
    }

    /// Consumed items in id order
    pub fn consumed(&self) -> impl Iterator<Item = &TraceItem> {
        self.consumed.iter()
    }

    /// Distinct addresses in first-request order
    pub fn metadata_requests(&self) -> &[Address] {
        &self.metadata_requests
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CallFrame, CallKind, LogFrame, LogId};
    use alloy_primitives::{Bytes, U256};
    use alloy_sol_types::SolCall;

    fn transfer_tree(calldata: Bytes) -> TraceTree {
        let token = Address::repeat_byte(0xaa);
        let frame = CallFrame {
            kind: CallKind::Call,
            from: Address::repeat_byte(1),
            to: Some(Address::repeat_byte(2)),
            input: Bytes::new(),
            value: None,
            calls: vec![CallFrame {
                kind: CallKind::Call,
                from: Address::repeat_byte(2),
                to: Some(token),
                input: calldata,
                value: None,
                calls: vec![],
                logs: vec![
                    LogFrame {
                        address: token,
                        topics: vec![
                            erc20::TRANSFER_TOPIC,
                            Address::repeat_byte(2).into_word(),
                            Address::repeat_byte(3).into_word(),
                        ],
                        data: U256::from(7).to_be_bytes::<32>().to_vec().into(),
                    },
                    LogFrame {
                        address: token,
                        topics: vec![erc20::APPROVAL_TOPIC],
                        data: Bytes::new(),
                    },
                ],
            }],
            logs: vec![],
        };
        TraceTree::from_frame(&frame)
    }

    #[test]
    fn test_consume_is_idempotent() {
        let mut state = DecodeState::new();

        assert!(!state.is_consumed(NodeId(1)));
        assert!(state.consume(NodeId(1)));
        assert!(!state.consume(NodeId(1)));
        assert!(state.is_consumed(NodeId(1)));
        assert_eq!(state.consumed_count(), 1);

        // node and log ids live in separate spaces
        assert!(!state.is_consumed(LogId(1)));
    }

    #[test]
    fn test_metadata_requests_deduplicate() {
        let mut state = DecodeState::new();
        let a = Address::repeat_byte(1);
        let b = Address::repeat_byte(2);

        state.request_metadata(a);
        state.request_metadata(b);
        state.request_metadata(a);

        assert_eq!(state.pending_metadata(), &[a, b]);
        assert_eq!(state.finalize().metadata_requests(), &[a, b]);
    }

    #[test]
    fn test_consume_known_transfer() {
        let calldata = erc20::transferCall {
            to: Address::repeat_byte(3),
            amount: U256::from(7),
        }
        .abi_encode();
        let tree = transfer_tree(calldata.into());
        let mut state = DecodeState::new();

        assert!(state.consume_known_transfer(&tree, Some(NodeId(1))));
        assert!(state.is_consumed(NodeId(1)));
        assert!(state.is_consumed(LogId(0)));
        // only Transfer events go with the call
        assert!(!state.is_consumed(LogId(1)));
    }

    #[test]
    fn test_consume_known_transfer_follows_proxy() {
        let token = Address::repeat_byte(0xaa);
        let calldata: Bytes = erc20::transferFromCall {
            from: Address::repeat_byte(2),
            to: Address::repeat_byte(3),
            amount: U256::from(7),
        }
        .abi_encode()
        .into();

        // the token proxy forwards to its implementation, which emits the event
        let tree = TraceTree::from_frame(&CallFrame {
            kind: CallKind::Call,
            from: Address::repeat_byte(2),
            to: Some(token),
            input: calldata.clone(),
            value: None,
            calls: vec![CallFrame {
                kind: CallKind::DelegateCall,
                from: token,
                to: Some(Address::repeat_byte(0xbb)),
                input: calldata,
                value: None,
                calls: vec![],
                logs: vec![LogFrame {
                    address: token,
                    topics: vec![
                        erc20::TRANSFER_TOPIC,
                        Address::repeat_byte(2).into_word(),
                        Address::repeat_byte(3).into_word(),
                    ],
                    data: U256::from(7).to_be_bytes::<32>().to_vec().into(),
                }],
            }],
            logs: vec![],
        });
        let mut state = DecodeState::new();

        assert!(state.consume_known_transfer(&tree, Some(NodeId(0))));
        assert!(state.is_consumed(NodeId(0)));
        assert!(state.is_consumed(NodeId(1)));
        assert!(state.is_consumed(LogId(0)));
    }

    #[test]
    fn test_consume_known_transfer_is_defensive() {
        let tree = transfer_tree(Bytes::from_static(&[0xde, 0xad, 0xbe, 0xef]));
        let mut state = DecodeState::new();

        assert!(!state.consume_known_transfer(&tree, None));
        assert!(!state.consume_known_transfer(&tree, Some(NodeId(9))));
        assert!(!state.consume_known_transfer(&tree, Some(NodeId(1))));
        assert_eq!(state, DecodeState::new());
    }

    #[test]
    fn test_finalized_state_is_read_only_view() {
        let mut state = DecodeState::new();
        state.consume(LogId(2));
        state.consume(NodeId(5));
        state.consume(NodeId(0));

        let finalized = state.finalize();
        let consumed: Vec<_> = finalized.consumed().copied().collect();
        assert_eq!(
            consumed,
            vec![
                TraceItem::Node(NodeId(0)),
                TraceItem::Node(NodeId(5)),
                TraceItem::Log(LogId(2))
            ]
        );
        assert!(finalized.is_consumed(NodeId(5)));
    }
}
