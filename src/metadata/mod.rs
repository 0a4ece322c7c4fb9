//! Token display metadata
//!
//! Decoders only queue addresses. After a pass, the queued addresses are
//! resolved through a [`MetadataProvider`] by the [`MetadataResolver`], and
//! the resulting [`MetadataTable`] is handed to formatting.

mod providers;
mod resolver;

use alloy_primitives::Address;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use providers::{FallbackProvider, StaticProvider};
pub use resolver::{MetadataResolver, MetadataTable};

/// Symbol and decimals of a token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub symbol: String,
    pub decimals: u8,
}

impl TokenMetadata {
    pub fn new(symbol: impl Into<String>, decimals: u8) -> Self {
        Self {
            symbol: symbol.into(),
            decimals,
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum MetadataError {
    #[error("no metadata for {0}")]
    NotFound(Address),
    #[error("metadata lookup for {address} failed: {reason}")]
    Unavailable { address: Address, reason: String },
}

/// Source of token metadata
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn token_metadata(&self, address: Address) -> Result<TokenMetadata, MetadataError>;
}
