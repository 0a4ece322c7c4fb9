//! Built-in decoders
//!
//! Market-scoped decoders go first so that their side-effect transfers are
//! consumed before the generic token decoders see them.

pub mod comet;
pub mod erc20;

use alloy_primitives::Address;

use crate::decode::{DecoderRegistry, Priority, RegistryError};

pub use comet::{CometSupplyDecoder, CometWithdrawDecoder, DEFAULT_COMET_MARKET};
pub use erc20::{Erc20ApprovalDecoder, Erc20TransferDecoder};

/// Registry with every built-in decoder. `markets` extends the default
/// Comet market set.
pub fn default_registry(markets: &[Address]) -> Result<DecoderRegistry, RegistryError> {
    let mut registry = DecoderRegistry::new();
    registry
        .register(Priority::SCOPED, CometSupplyDecoder::new(markets.iter().copied())?)?
        .register(Priority::SCOPED, CometWithdrawDecoder::new(markets.iter().copied())?)?
        .register(Priority::GENERIC, Erc20TransferDecoder::new()?)?
        .register(Priority::GENERIC, Erc20ApprovalDecoder::new()?)?;
    Ok(registry)
}
