//! JSON rendering of decode results

use alloy_primitives::Address;
use serde::Serialize;

use crate::core::{DecodedAction, TraceItem};
use crate::decode::DecodeOutcome;
use crate::metadata::MetadataTable;

/// One decoded tree, without internal pass state
#[derive(Serialize)]
struct ExportableTrace<'a> {
    index: usize,
    actions: &'a [DecodedAction],
    consumed: Vec<TraceItem>,
    #[serde(skip_serializing_if = "<[Address]>::is_empty")]
    metadata_requests: &'a [Address],
}

#[derive(Serialize)]
struct ExportDocument<'a> {
    traces: Vec<ExportableTrace<'a>>,
    tokens: &'a MetadataTable,
}

impl<'a> ExportableTrace<'a> {
    fn new(index: usize, outcome: &'a DecodeOutcome) -> Self {
        Self {
            index,
            actions: &outcome.actions,
            consumed: outcome.state.consumed().copied().collect(),
            metadata_requests: outcome.state.metadata_requests(),
        }
    }
}

/// Pretty-printed JSON document of decoded traces and resolved tokens
pub fn render(
    outcomes: &[DecodeOutcome],
    tokens: &MetadataTable,
) -> Result<String, serde_json::Error> {
    let document = ExportDocument {
        traces: outcomes
            .iter()
            .enumerate()
            .map(|(index, outcome)| ExportableTrace::new(index, outcome))
            .collect(),
        tokens,
    };

    serde_json::to_string_pretty(&document)
}
