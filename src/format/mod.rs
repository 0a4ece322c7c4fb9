//! Display rows for decoded actions
//!
//! Formatting reads resolved metadata and display options only; it never
//! touches decode state.

pub mod json;

use std::fmt;

use alloy_primitives::{Address, U256};
use serde::Deserialize;

use crate::config::short_addr;
use crate::metadata::MetadataTable;

/// User-facing display options
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Maximum fractional digits shown for token amounts
    pub amount_precision: usize,
    /// Shorten addresses to `0x1234..abcd`
    pub truncate_addresses: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            amount_precision: 4,
            truncate_addresses: true,
        }
    }
}

/// One rendered action: a title, a category color and labelled values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayRow {
    pub title: String,
    pub color: String,
    pub fields: Vec<(String, String)>, // (label, value) pairs
}

impl DisplayRow {
    pub fn new(title: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            color: color.into(),
            fields: Vec::new(),
        }
    }

    pub fn add(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((label.into(), value.into()));
        self
    }

    pub fn field(&self, label: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for DisplayRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = self
            .fields
            .iter()
            .map(|(k, v)| format!("{}: {}", k, v))
            .collect::<Vec<_>>()
            .join(" | ");
        if fields.is_empty() {
            write!(f, "{}", self.title)
        } else {
            write!(f, "{} - {}", self.title, fields)
        }
    }
}

/// What a formatter may read
#[derive(Debug, Clone, Copy)]
pub struct FormatContext<'a> {
    pub config: &'a DisplayConfig,
    pub metadata: &'a MetadataTable,
}

impl<'a> FormatContext<'a> {
    pub fn new(config: &'a DisplayConfig, metadata: &'a MetadataTable) -> Self {
        Self { config, metadata }
    }

    /// Address as shown to the user, with the token symbol when known
    pub fn address(&self, address: Address) -> String {
        let rendered = if self.config.truncate_addresses {
            short_addr(&address.to_checksum(None))
        } else {
            address.to_checksum(None)
        };

        match self.metadata.get(&address) {
            Some(token) => format!("{} ({})", token.symbol, rendered),
            None => rendered,
        }
    }

    /// Amount of `token` scaled by its decimals; the raw integer when the
    /// token's metadata is unknown
    pub fn token_amount(&self, token: Address, amount: U256) -> String {
        match self.metadata.get(&token) {
            Some(meta) => format!(
                "{} {}",
                scale_amount(amount, meta.decimals, self.config.amount_precision),
                meta.symbol
            ),
            None => amount.to_string(),
        }
    }
}

/// `value / 10^decimals`, with at most `precision` fractional digits and no
/// trailing zeros. Extra digits are truncated. Decimals whose scale does not
/// fit in 256 bits yield the raw integer.
pub fn scale_amount(value: U256, decimals: u8, precision: usize) -> String {
    if decimals == 0 {
        return value.to_string();
    }

    let Some(divisor) = U256::from(10u64).checked_pow(U256::from(decimals)) else {
        return value.to_string();
    };
    let whole = value / divisor;
    let frac = value % divisor;

    if frac.is_zero() {
        return whole.to_string();
    }

    let frac_str = format!("{:0>width$}", frac.to_string(), width = decimals as usize);
    let shown = &frac_str[..precision.min(frac_str.len())];
    let trimmed = shown.trim_end_matches('0');
    if trimmed.is_empty() {
        whole.to_string()
    } else {
        format!("{}.{}", whole, trimmed)
    }
}
