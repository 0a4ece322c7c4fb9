//! Call tree and log model consumed by the decode pass
//!
//! The tree is an arena: nodes and logs live in flat tables and refer to
//! each other by index. A log points back at the node that emitted it
//! through a [`NodeId`], never through an owning reference.

use std::fmt;
use std::str::FromStr;

use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading a trace
#[derive(Debug, Error)]
pub enum TraceError {
    #[error("unknown call kind '{0}'")]
    UnknownCallKind(String),
    #[error("failed to parse trace JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Index of a call node inside a [`TraceTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub usize);

/// Index of a log event inside a [`TraceTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "call#{}", self.0)
    }
}

impl fmt::Display for LogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "log#{}", self.0)
    }
}

/// Identity of anything a decoder can consume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum TraceItem {
    Node(NodeId),
    Log(LogId),
}

impl From<NodeId> for TraceItem {
    fn from(id: NodeId) -> Self {
        TraceItem::Node(id)
    }
}

impl From<LogId> for TraceItem {
    fn from(id: LogId) -> Self {
        TraceItem::Log(id)
    }
}

impl From<&CallNode> for TraceItem {
    fn from(node: &CallNode) -> Self {
        TraceItem::Node(node.id)
    }
}

impl From<&LogEvent> for TraceItem {
    fn from(log: &LogEvent) -> Self {
        TraceItem::Log(log.id)
    }
}

impl fmt::Display for TraceItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceItem::Node(id) => id.fmt(f),
            TraceItem::Log(id) => id.fmt(f),
        }
    }
}

/// Call type as reported by the tracer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum CallKind {
    Call,
    DelegateCall,
    StaticCall,
    Create,
}

impl FromStr for CallKind {
    type Err = TraceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "call" => Ok(CallKind::Call),
            "delegatecall" | "callcode" => Ok(CallKind::DelegateCall),
            "staticcall" => Ok(CallKind::StaticCall),
            "create" | "create2" => Ok(CallKind::Create),
            _ => Err(TraceError::UnknownCallKind(s.to_string())),
        }
    }
}

impl TryFrom<String> for CallKind {
    type Error = TraceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for CallKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CallKind::Call => "call",
            CallKind::DelegateCall => "delegatecall",
            CallKind::StaticCall => "staticcall",
            CallKind::Create => "create",
        };
        f.write_str(s)
    }
}

/// Raw call frame as produced by a call tracer (geth `callTracer` shape)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallFrame {
    #[serde(rename = "type", alias = "kind")]
    pub kind: CallKind,
    pub from: Address,
    #[serde(default)]
    pub to: Option<Address>,
    #[serde(alias = "calldata", default)]
    pub input: Bytes,
    #[serde(default)]
    pub value: Option<U256>,
    #[serde(alias = "children", default)]
    pub calls: Vec<CallFrame>,
    #[serde(default)]
    pub logs: Vec<LogFrame>,
}

/// Raw log as attached to a call frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogFrame {
    #[serde(alias = "emitter")]
    pub address: Address,
    #[serde(default)]
    pub topics: Vec<B256>,
    #[serde(default)]
    pub data: Bytes,
}

/// A trace file holds one transaction or a batch of them
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TraceFile {
    Single(CallFrame),
    Batch(Vec<CallFrame>),
}

impl TraceFile {
    pub fn from_json(input: &str) -> Result<Self, TraceError> {
        Ok(serde_json::from_str(input)?)
    }

    /// Flatten every frame into its own tree
    pub fn into_trees(self) -> Vec<TraceTree> {
        match self {
            TraceFile::Single(frame) => vec![TraceTree::from_frame(&frame)],
            TraceFile::Batch(frames) => frames.iter().map(TraceTree::from_frame).collect(),
        }
    }
}

/// One call in the flattened tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallNode {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub depth: usize,
    pub kind: CallKind,
    pub from: Address,
    pub to: Address,
    pub calldata: Bytes,
    pub value: U256,
    pub children: Vec<NodeId>,
    pub logs: Vec<LogId>,
}

impl CallNode {
    /// First four bytes of calldata, if present
    pub fn selector(&self) -> Option<[u8; 4]> {
        self.calldata.get(..4).and_then(|s| s.try_into().ok())
    }
}

/// One emitted event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    pub id: LogId,
    /// Node that emitted this log
    pub node: NodeId,
    pub emitter: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
}

impl LogEvent {
    pub fn topic0(&self) -> Option<&B256> {
        self.topics.first()
    }
}

/// Arena-backed call tree. Node ids follow pre-order, the root is `NodeId(0)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraceTree {
    nodes: Vec<CallNode>,
    logs: Vec<LogEvent>,
}

impl TraceTree {
    /// Flatten a nested call frame into an arena
    pub fn from_frame(frame: &CallFrame) -> Self {
        let mut tree = Self::default();
        tree.flatten(frame, None, 0);
        tree
    }

    pub fn from_json(input: &str) -> Result<Self, TraceError> {
        let frame: CallFrame = serde_json::from_str(input)?;
        Ok(Self::from_frame(&frame))
    }

    fn flatten(&mut self, frame: &CallFrame, parent: Option<NodeId>, depth: usize) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(CallNode {
            id,
            parent,
            depth,
            kind: frame.kind,
            from: frame.from,
            to: frame.to.unwrap_or(Address::ZERO),
            calldata: frame.input.clone(),
            value: frame.value.unwrap_or(U256::ZERO),
            children: Vec::with_capacity(frame.calls.len()),
            logs: Vec::with_capacity(frame.logs.len()),
        });

        for log in &frame.logs {
            let log_id = LogId(self.logs.len());
            self.logs.push(LogEvent {
                id: log_id,
                node: id,
                emitter: log.address,
                topics: log.topics.clone(),
                data: log.data.clone(),
            });
            self.nodes[id.0].logs.push(log_id);
        }

        for child in &frame.calls {
            let child_id = self.flatten(child, Some(id), depth + 1);
            self.nodes[id.0].children.push(child_id);
        }

        id
    }

    pub fn root(&self) -> Option<&CallNode> {
        self.nodes.first()
    }

    pub fn node(&self, id: NodeId) -> Option<&CallNode> {
        self.nodes.get(id.0)
    }

    pub fn log(&self, id: LogId) -> Option<&LogEvent> {
        self.logs.get(id.0)
    }

    /// All nodes in pre-order
    pub fn nodes(&self) -> &[CallNode] {
        &self.nodes
    }

    /// All logs in emission order
    pub fn logs(&self) -> &[LogEvent] {
        &self.logs
    }

    pub fn children<'a>(&'a self, node: &'a CallNode) -> impl Iterator<Item = &'a CallNode> + 'a {
        node.children.iter().filter_map(|id| self.node(*id))
    }

    pub fn logs_of<'a>(&'a self, node: &'a CallNode) -> impl Iterator<Item = &'a LogEvent> + 'a {
        node.logs.iter().filter_map(|id| self.log(*id))
    }

    /// Node that emitted the given log
    pub fn owner(&self, log: &LogEvent) -> Option<&CallNode> {
        self.node(log.node)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
