//! ABI domain models
//!
//! Signature parsing, selector matching and calldata decoding on top of
//! alloy-dyn-abi.

mod decoder;
mod registry;
mod signature;

pub use decoder::{CalldataError, DecodedArg, DecodedArgs};
pub use registry::{SelectorCollision, SignatureIndex};
pub use signature::{has_selector, FunctionSignature, ParamSpec, SignatureError};
