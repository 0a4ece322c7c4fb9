//! Decode orchestration
//!
//! A [`DecoderRegistry`] walks a [`TraceTree`](crate::core::TraceTree) once,
//! offering every unconsumed call and log to its decoders in priority order.
//! Decoders claim what they recognize through the shared [`DecodeState`].

pub mod decoder;
pub mod dispatcher;
pub mod plan;
pub mod state;

pub use decoder::{CallMatch, CallMatcher, Decoder};
pub use dispatcher::{DecodeOutcome, DecoderRegistry, Priority, RegistryError};
pub use plan::{resolve_path, ConsumptionPlan, PlanReport, Role, Step, Target};
pub use state::{DecodeState, FinalizedState};
