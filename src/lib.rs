//! Decode call traces into protocol-level actions.
//!
//! A trace is flattened into a [`core::TraceTree`], decoded by a
//! [`decode::DecoderRegistry`] in one pass per tree, and the resulting
//! actions are rendered through [`format`] once the token metadata queued
//! during the pass has been resolved by [`metadata::MetadataResolver`].

pub mod config;
pub mod core;
pub mod decode;
pub mod decoders;
pub mod domain;
pub mod format;
pub mod logging;
pub mod metadata;
pub mod store;
