//! Declarative consumption plans
//!
//! A decoder lists the side-effect calls and logs that belong to its action
//! as relative roles from the matched node. The plan is evaluated after a
//! full match; roles whose path does not exist in the trace are skipped.

use alloy_primitives::B256;
use tracing::debug;

use super::state::DecodeState;
use crate::core::{CallKind, CallNode, NodeId, TraceTree};

/// One hop from a node to one of its children
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Child at a fixed position
    Child(usize),
    /// First child of the given call kind
    FirstChildOfKind(CallKind),
    LastChild,
}

/// What to consume once the path resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// The node itself
    Node,
    /// The node, only if it is a token transfer call (see
    /// [`DecodeState::consume_known_transfer`])
    KnownTransfer,
    /// Last log emitted by the node
    LastLog,
    /// Every log of the node whose first topic matches
    LogsWithTopic(B256),
}

/// A path from the matched node plus the target at its end
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub label: &'static str,
    pub path: Vec<Step>,
    pub target: Target,
}

impl Role {
    pub fn new(label: &'static str, path: impl Into<Vec<Step>>, target: Target) -> Self {
        Self {
            label,
            path: path.into(),
            target,
        }
    }

    /// Follow the path; `None` as soon as a hop is missing
    pub fn resolve<'a>(&self, tree: &'a TraceTree, start: &'a CallNode) -> Option<&'a CallNode> {
        self.path.iter().try_fold(start, |node, step| {
            let mut children = tree.children(node);
            match step {
                Step::Child(index) => children.nth(*index),
                Step::FirstChildOfKind(kind) => children.find(|child| child.kind == *kind),
                Step::LastChild => children.last(),
            }
        })
    }
}

/// Outcome of applying a plan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanReport {
    pub applied: usize,
    pub skipped: usize,
}

/// Ordered list of roles consumed along with a matched node
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsumptionPlan {
    roles: Vec<Role>,
}

impl ConsumptionPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, role: Role) -> Self {
        self.roles.push(role);
        self
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    /// Consume every role that resolves under `node`
    pub fn apply(&self, state: &mut DecodeState, tree: &TraceTree, node: &CallNode) -> PlanReport {
        let mut report = PlanReport::default();

        for role in &self.roles {
            let applied = match role.resolve(tree, node) {
                Some(target) => consume_target(state, tree, target, role.target),
                None => false,
            };

            if applied {
                report.applied += 1;
            } else {
                debug!(role = role.label, node = %node.id, "consumption role skipped");
                report.skipped += 1;
            }
        }

        report
    }
}

fn consume_target(
    state: &mut DecodeState,
    tree: &TraceTree,
    node: &CallNode,
    target: Target,
) -> bool {
    match target {
        Target::Node => {
            state.consume(node.id);
            true
        }
        Target::KnownTransfer => state.consume_known_transfer(tree, Some(node.id)),
        Target::LastLog => match node.logs.last() {
            Some(log) => {
                state.consume(*log);
                true
            }
            None => false,
        },
        Target::LogsWithTopic(topic) => {
            let mut any = false;
            for log in tree.logs_of(node) {
                if log.topic0() == Some(&topic) {
                    state.consume(log.id);
                    any = true;
                }
            }
            any
        }
    }
}

/// Node reached by following `path` from `start`, for decoders that need
/// to read a role before consuming it
pub fn resolve_path(tree: &TraceTree, start: &CallNode, path: &[Step]) -> Option<NodeId> {
    Role::new("lookup", path.to_vec(), Target::Node)
        .resolve(tree, start)
        .map(|node| node.id)
}
