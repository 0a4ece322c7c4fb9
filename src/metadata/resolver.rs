//! Deduplicating metadata resolution with bounded concurrency

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use alloy_primitives::Address;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use super::{MetadataProvider, TokenMetadata};

const DEFAULT_CONCURRENCY: usize = 8;

/// Resolved metadata keyed by address. Addresses whose lookup failed are
/// absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MetadataTable {
    tokens: BTreeMap<Address, TokenMetadata>,
}

impl MetadataTable {
    pub const fn new() -> Self {
        Self {
            tokens: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, address: Address, metadata: TokenMetadata) {
        self.tokens.insert(address, metadata);
    }

    pub fn get(&self, address: &Address) -> Option<&TokenMetadata> {
        self.tokens.get(address)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Address, &TokenMetadata)> {
        self.tokens.iter()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl FromIterator<(Address, TokenMetadata)> for MetadataTable {
    fn from_iter<I: IntoIterator<Item = (Address, TokenMetadata)>>(iter: I) -> Self {
        Self {
            tokens: iter.into_iter().collect(),
        }
    }
}

impl Extend<(Address, TokenMetadata)> for MetadataTable {
    fn extend<I: IntoIterator<Item = (Address, TokenMetadata)>>(&mut self, iter: I) {
        self.tokens.extend(iter);
    }
}

/// Resolves each distinct address at most once. Concurrent requests for
/// the same address share one lookup; failed lookups are retried on the
/// next request.
pub struct MetadataResolver {
    provider: Arc<dyn MetadataProvider>,
    cells: Mutex<HashMap<Address, Arc<OnceCell<TokenMetadata>>>>,
    concurrency: usize,
}

impl MetadataResolver {
    pub fn new(provider: Arc<dyn MetadataProvider>) -> Self {
        Self {
            provider,
            cells: Mutex::new(HashMap::new()),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Maximum number of lookups in flight during [`resolve_all`](Self::resolve_all)
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    fn cell(&self, address: Address) -> Arc<OnceCell<TokenMetadata>> {
        let mut cells = self.cells.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(cells.entry(address).or_default())
    }

    pub async fn resolve(&self, address: Address) -> Option<TokenMetadata> {
        let cell = self.cell(address);
        let result = cell
            .get_or_try_init(|| self.provider.token_metadata(address))
            .await;

        match result {
            Ok(metadata) => Some(metadata.clone()),
            Err(err) => {
                warn!(provider = self.provider.name(), %address, %err, "metadata unavailable");
                None
            }
        }
    }

    /// Resolve a batch of addresses, deduplicated, in no particular order
    pub async fn resolve_all(
        &self,
        addresses: impl IntoIterator<Item = Address>,
    ) -> MetadataTable {
        let mut seen = HashSet::new();
        let distinct: Vec<Address> = addresses.into_iter().filter(|a| seen.insert(*a)).collect();
        debug!(addresses = distinct.len(), concurrency = self.concurrency, "resolving metadata");

        stream::iter(distinct)
            .map(|address| async move { (address, self.resolve(address).await) })
            .buffer_unordered(self.concurrency)
            .filter_map(|(address, metadata)| async move { metadata.map(|m| (address, m)) })
            .collect::<MetadataTable>()
            .await
    }

    /// Number of addresses with a successful cached lookup
    pub fn cached(&self) -> usize {
        let cells = self.cells.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        cells.values().filter(|cell| cell.initialized()).count()
    }
}
