//! Human-readable function signatures and selector matching

use std::fmt;
use std::str::FromStr;

use alloy_dyn_abi::{DynSolType, Specifier};
use alloy_json_abi::{Function, Param};
use thiserror::Error;

/// Errors raised while parsing a signature string
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("invalid signature '{signature}': {reason}")]
    Parse { signature: String, reason: String },
    #[error("invalid parameter type '{ty}': {reason}")]
    InvalidType { ty: String, reason: String },
}

/// A function parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    /// Parameter name (may be empty)
    pub name: String,
    /// Canonical Solidity type (e.g., "uint256", "(address,uint256)[]")
    pub kind: String,
    pub(crate) ty: DynSolType,
}

impl ParamSpec {
    fn resolve(param: &Param) -> Result<Self, SignatureError> {
        let kind = param.selector_type().into_owned();
        let ty = param.resolve().map_err(|e| SignatureError::InvalidType {
            ty: kind.clone(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            name: param.name.clone(),
            kind,
            ty,
        })
    }
}

/// A parsed function signature with its selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSignature {
    /// 4-byte function selector
    pub selector: [u8; 4],
    /// Function name
    pub name: String,
    /// Canonical signature (e.g., "transfer(address,uint256)")
    pub signature: String,
    /// Input parameters
    pub inputs: Vec<ParamSpec>,
}

impl FunctionSignature {
    /// Parse `name(type1 [name1],type2 [name2],...)`.
    ///
    /// A leading `function` keyword, data locations and a trailing
    /// `returns (...)` clause are accepted and ignored. Types are normalized
    /// (`uint` becomes `uint256`) before the selector is computed.
    pub fn parse(text: &str) -> Result<Self, SignatureError> {
        let function = Function::parse(text.trim()).map_err(|e| SignatureError::Parse {
            signature: text.trim().to_string(),
            reason: e.to_string(),
        })?;

        let inputs = function
            .inputs
            .iter()
            .map(ParamSpec::resolve)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            selector: function.selector().0,
            signature: function.signature(),
            name: function.name,
            inputs,
        })
    }

    /// Get selector as hex string
    pub fn selector_hex(&self) -> String {
        format!("0x{}", hex::encode(self.selector))
    }

    /// Whether `calldata` starts with this signature's selector
    pub fn matches(&self, calldata: &[u8]) -> bool {
        calldata.len() >= 4 && calldata[..4] == self.selector
    }

    pub(crate) fn input_types(&self) -> Vec<DynSolType> {
        self.inputs.iter().map(|p| p.ty.clone()).collect()
    }
}

impl FromStr for FunctionSignature {
    type Err = SignatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for FunctionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.signature)
    }
}

/// Whether `calldata` carries the selector of `signature`.
///
/// Calldata shorter than a selector, or a signature that does not parse,
/// is a non-match.
pub fn has_selector(calldata: &[u8], signature: &str) -> bool {
    FunctionSignature::parse(signature)
        .map(|sig| sig.matches(calldata))
        .unwrap_or(false)
}
