pub mod action;
pub mod trace;

pub use action::{
    Action, ApprovalAction, DecodedAction, SupplyAction, TransferAction, WithdrawAction,
};
pub use trace::{
    CallFrame, CallKind, CallNode, LogEvent, LogFrame, LogId, NodeId, TraceError, TraceFile,
    TraceItem, TraceTree,
};
