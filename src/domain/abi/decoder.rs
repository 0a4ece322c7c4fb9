//! Calldata decoding against a parsed signature

use alloy_dyn_abi::{DynSolType, DynSolValue};
use alloy_primitives::{Address, U256};
use thiserror::Error;

use super::FunctionSignature;

/// Errors raised while decoding calldata
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalldataError {
    #[error("calldata too short (need at least 4 bytes for selector)")]
    TooShort,
    #[error("selector mismatch: got 0x{got}, expected 0x{expected}")]
    SelectorMismatch { got: String, expected: String },
    #[error("failed to decode calldata: {0}")]
    Decode(String),
}

/// A decoded function argument
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedArg {
    /// Parameter name (or "arg{n}" if unnamed)
    pub name: String,
    /// Solidity type (e.g., "address", "uint256", "(uint256,address)")
    pub kind: String,
    pub value: DynSolValue,
}

/// Decoded arguments of one call, addressable by parameter name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedArgs {
    args: Vec<DecodedArg>,
}

impl DecodedArgs {
    pub fn get(&self, name: &str) -> Option<&DynSolValue> {
        self.args.iter().find(|a| a.name == name).map(|a| &a.value)
    }

    pub fn address(&self, name: &str) -> Option<Address> {
        self.get(name).and_then(DynSolValue::as_address)
    }

    pub fn uint(&self, name: &str) -> Option<U256> {
        self.get(name).and_then(DynSolValue::as_uint).map(|(value, _)| value)
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }
}

impl FunctionSignature {
    /// Decode `calldata` (selector included) according to this signature
    pub fn decode_inputs(&self, calldata: &[u8]) -> Result<DecodedArgs, CalldataError> {
        if calldata.len() < 4 {
            return Err(CalldataError::TooShort);
        }

        if calldata[..4] != self.selector {
            return Err(CalldataError::SelectorMismatch {
                got: hex::encode(&calldata[..4]),
                expected: hex::encode(self.selector),
            });
        }

        let values = if self.inputs.is_empty() {
            Vec::new()
        } else {
            let decoded = DynSolType::Tuple(self.input_types())
                .abi_decode_params(&calldata[4..])
                .map_err(|e| CalldataError::Decode(e.to_string()))?;

            match decoded {
                DynSolValue::Tuple(values) => values,
                other => vec![other],
            }
        };

        let args = self
            .inputs
            .iter()
            .zip(values)
            .enumerate()
            .map(|(idx, (param, value))| DecodedArg {
                name: if param.name.trim().is_empty() {
                    format!("arg{}", idx)
                } else {
                    param.name.clone()
                },
                kind: param.kind.clone(),
                value,
            })
            .collect();

        Ok(DecodedArgs { args })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // transfer(0x1234567890123456789012345678901234567890, 1000)
    const TRANSFER: &str = "a9059cbb000000000000000000000000123456789012345678901234567890123456789000000000000000000000000000000000000000000000000000000000000003e8";

    #[test]
    fn test_decode_named_args() {
        let sig = FunctionSignature::parse("transfer(address to,uint256 amount)").unwrap();
        let calldata = hex::decode(TRANSFER).unwrap();

        let args = sig.decode_inputs(&calldata).unwrap();

        assert_eq!(args.len(), 2);
        assert_eq!(
            args.address("to"),
            Some("0x1234567890123456789012345678901234567890".parse().unwrap())
        );
        assert_eq!(args.uint("amount"), Some(U256::from(1000)));
    }

    #[test]
    fn test_unnamed_args_fall_back_to_position() {
        let sig = FunctionSignature::parse("transfer(address,uint256)").unwrap();
        let args = sig.decode_inputs(&hex::decode(TRANSFER).unwrap()).unwrap();

        assert_eq!(args.uint("arg1"), Some(U256::from(1000)));
        assert!(args.address("to").is_none());
    }

    #[test]
    fn test_selector_mismatch() {
        let sig = FunctionSignature::parse("approve(address,uint256)").unwrap();
        let result = sig.decode_inputs(&hex::decode(TRANSFER).unwrap());

        assert!(matches!(result, Err(CalldataError::SelectorMismatch { .. })));
    }

    #[test]
    fn test_truncated_params() {
        let sig = FunctionSignature::parse("transfer(address,uint256)").unwrap();
        let calldata = hex::decode(&TRANSFER[..40]).unwrap();

        assert!(matches!(sig.decode_inputs(&calldata), Err(CalldataError::Decode(_))));
        assert_eq!(sig.decode_inputs(&[0xa9]), Err(CalldataError::TooShort));
    }
}
