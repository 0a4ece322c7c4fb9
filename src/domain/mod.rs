//! Domain layer - chain-agnostic ABI models and well-known interfaces

pub mod abi;
pub mod erc20;
