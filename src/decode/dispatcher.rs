//! Decoder registry and the decode pass

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, warn};

use super::decoder::Decoder;
use super::state::{DecodeState, FinalizedState};
use crate::core::{Action, CallNode, DecodedAction, TraceTree};
use crate::domain::abi::{FunctionSignature, SignatureError, SignatureIndex};
use crate::format::{DisplayRow, FormatContext};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("decoder '{0}' is already registered")]
    DuplicateName(&'static str),
    #[error(transparent)]
    Signature(#[from] SignatureError),
}

/// Dispatch priority. Lower values are tried first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Priority(pub u16);

impl Priority {
    /// Decoders bound to specific contracts or narrow call shapes
    pub const SCOPED: Priority = Priority(10);
    /// Fallback decoders that match any contract
    pub const GENERIC: Priority = Priority(100);
}

struct Registered {
    priority: Priority,
    decoder: Arc<dyn Decoder>,
}

/// Everything one pass produced
#[derive(Debug, Clone, Default)]
pub struct DecodeOutcome {
    /// Actions in visit order
    pub actions: Vec<DecodedAction>,
    pub state: FinalizedState,
}

/// Ordered set of decoders. First match wins per call node or log.
#[derive(Default)]
pub struct DecoderRegistry {
    decoders: Vec<Registered>,
    signatures: SignatureIndex,
}

impl fmt::Debug for DecoderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecoderRegistry")
            .field("decoders", &self.names().collect::<Vec<_>>())
            .field("signatures", &self.signatures.len())
            .finish()
    }
}

impl DecoderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a decoder. Among equal priorities, earlier registrations run first.
    pub fn register(
        &mut self,
        priority: Priority,
        decoder: impl Decoder + 'static,
    ) -> Result<&mut Self, RegistryError> {
        let name = decoder.name();
        if self.get(name).is_some() {
            return Err(RegistryError::DuplicateName(name));
        }

        for signature in decoder.signatures() {
            if let Some(collision) = self.signatures.insert(name, signature) {
                warn!(
                    selector = %hex::encode(collision.selector),
                    existing = %collision.existing,
                    rejected = %collision.rejected,
                    decoder = name,
                    "selector collision between registered signatures"
                );
            }
        }

        let position = self.decoders.partition_point(|r| r.priority <= priority);
        self.decoders.insert(
            position,
            Registered {
                priority,
                decoder: Arc::new(decoder),
            },
        );
        Ok(self)
    }

    /// Decoder names in dispatch order
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.decoders.iter().map(|r| r.decoder.name())
    }

    pub fn get(&self, name: &str) -> Option<&dyn Decoder> {
        self.decoders
            .iter()
            .find(|r| r.decoder.name() == name)
            .map(|r| r.decoder.as_ref())
    }

    pub fn signatures(&self) -> &SignatureIndex {
        &self.signatures
    }

    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }

    /// Run one pass over `tree`: call nodes in pre-order first, then logs.
    ///
    /// Each unconsumed item is offered to decoders in priority order and the
    /// first one returning an action claims it. The pass never aborts.
    pub async fn decode(&self, tree: &TraceTree) -> DecodeOutcome {
        let mut state = DecodeState::new();
        let mut actions = Vec::new();

        for node in tree.nodes() {
            for registered in &self.decoders {
                if state.is_consumed(node) {
                    break;
                }
                let decoder = &registered.decoder;
                let Some(action) = decoder.decode_call(&mut state, tree, node).await else {
                    continue;
                };

                state.consume(node);
                debug!(decoder = decoder.name(), node = %node.id, "decoded call");
                actions.push(DecodedAction {
                    item: node.into(),
                    action,
                });
                break;
            }
        }

        for log in tree.logs() {
            for registered in &self.decoders {
                if state.is_consumed(log) {
                    break;
                }
                let decoder = &registered.decoder;
                let Some(action) = decoder.decode_log(&mut state, tree, log).await else {
                    continue;
                };

                state.consume(log);
                debug!(decoder = decoder.name(), log = %log.id, "decoded log");
                actions.push(DecodedAction {
                    item: log.into(),
                    action,
                });
                break;
            }
        }

        debug!(
            actions = actions.len(),
            consumed = state.consumed_count(),
            metadata = state.pending_metadata().len(),
            "decode pass finished"
        );

        DecodeOutcome {
            actions,
            state: state.finalize(),
        }
    }

    /// Calls left unconsumed after a pass whose selector a registered
    /// decoder knows, e.g. a market call outside every decoder's scope
    pub fn undecoded_calls<'a>(
        &'a self,
        tree: &'a TraceTree,
        state: &FinalizedState,
    ) -> Vec<(&'a CallNode, &'a FunctionSignature)> {
        tree.nodes()
            .iter()
            .filter(|node| !state.is_consumed(*node))
            .filter_map(|node| Some((node, self.signatures.lookup(node.selector()?)?)))
            .collect()
    }

    /// Decode independent trees concurrently on the current task
    pub async fn decode_batch(&self, trees: &[TraceTree]) -> Vec<DecodeOutcome> {
        futures::future::join_all(trees.iter().map(|tree| self.decode(tree))).await
    }

    /// Decode independent trees on separate tokio tasks. Output order
    /// follows input order; a task that panicked yields an empty outcome.
    pub async fn decode_parallel(self: Arc<Self>, trees: Vec<TraceTree>) -> Vec<DecodeOutcome> {
        let handles: Vec<_> = trees
            .into_iter()
            .map(|tree| {
                let registry = Arc::clone(&self);
                tokio::spawn(async move { registry.decode(&tree).await })
            })
            .collect();

        let mut outcomes = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(err) => {
                    error!(%err, "decode task failed");
                    outcomes.push(DecodeOutcome::default());
                }
            }
        }
        outcomes
    }

    /// Route an action to the decoder that produced it
    pub fn format(&self, action: &Action, ctx: &FormatContext<'_>) -> Option<DisplayRow> {
        self.get(action.name())?.format(action, ctx)
    }
}
