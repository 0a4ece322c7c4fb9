use std::fs;
use std::path::{Path, PathBuf};

use alloy_primitives::Address;
use anyhow::{Context, Result};
use serde::Deserialize;

use crate::format::DisplayConfig;
use crate::metadata::TokenMetadata;

#[derive(Debug, Clone, Deserialize)]
pub struct TokenSpec {
    pub address: Address,
    pub symbol: Option<String>,
    pub decimals: Option<u8>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DecodeConfig {
    /// Extra Comet market addresses
    pub markets: Vec<Address>,
    /// Metadata lookups in flight at once
    pub metadata_concurrency: usize,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            markets: Vec::new(),
            metadata_concurrency: 8,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub display: DisplayConfig,

    #[serde(default)]
    pub decode: DecodeConfig,

    #[serde(default)]
    pub tokens: Vec<TokenSpec>,

    /// SQLite token cache; defaults to the data dir
    pub token_store: Option<PathBuf>,

    /// Default tracing filter, overridden by `RUST_LOG`
    pub log_level: Option<String>,
}

impl TokenSpec {
    pub fn display_symbol(&self) -> String {
        self.symbol
            .clone()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| short_addr(&self.address.to_checksum(None)))
    }

    /// Metadata for this entry; decimals default to 18
    pub fn metadata(&self) -> TokenMetadata {
        TokenMetadata::new(self.display_symbol(), self.decimals.unwrap_or(18))
    }
}

impl Config {
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("parse config")
    }

    pub fn token_store_path(&self) -> Option<PathBuf> {
        self.token_store
            .clone()
            .or_else(|| data_dir().map(|dir| dir.join("tokens.sqlite3")))
    }
}

/// Load config from `explicit` or the default location. An explicit path
/// must exist; a missing default file yields the defaults.
pub fn load(explicit: Option<&Path>) -> Result<Config> {
    if let Some(path) = explicit {
        let content = fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        return Config::parse(&content).with_context(|| format!("in {}", path.display()));
    }

    let Some(path) = config_path() else {
        return Ok(Config::default());
    };
    match fs::read_to_string(&path) {
        Ok(content) => Config::parse(&content).with_context(|| format!("in {}", path.display())),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Config::default()),
        Err(err) => Err(err).with_context(|| format!("read config {}", path.display())),
    }
}

pub fn config_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os("POKE_DECODE_CONFIG").map(PathBuf::from) {
        return Some(path);
    }
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from) {
        return Some(xdg.join("poke-decode").join("config.toml"));
    }
    if let Some(home) = std::env::var_os("HOME").map(PathBuf::from) {
        return Some(home.join(".config").join("poke-decode").join("config.toml"));
    }

    directories::ProjectDirs::from("io", "poke", "poke-decode")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

pub fn data_dir() -> Option<PathBuf> {
    if let Some(xdg) = std::env::var_os("XDG_DATA_HOME").map(PathBuf::from) {
        return Some(xdg.join("poke-decode"));
    }
    if let Some(home) = std::env::var_os("HOME").map(PathBuf::from) {
        return Some(home.join(".local").join("share").join("poke-decode"));
    }
    directories::ProjectDirs::from("io", "poke", "poke-decode")
        .map(|dirs| dirs.data_dir().to_path_buf())
}

/// `0x1234..abcd` form of an address string
pub(crate) fn short_addr(value: &str) -> String {
    let value = value.trim();
    if value.len() <= 10 {
        return value.to_string();
    }
    format!("{}..{}", &value[..6], &value[value.len() - 4..])
}
