use std::collections::HashMap;
use std::sync::Arc;

use alloy_primitives::Address;
use async_trait::async_trait;
use tracing::trace;

use super::{MetadataError, MetadataProvider, TokenMetadata};

/// Fixed token table, usually filled from the `[[tokens]]` config section
#[derive(Debug, Clone, Default)]
pub struct StaticProvider {
    tokens: HashMap<Address, TokenMetadata>,
}

impl StaticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, address: Address, metadata: TokenMetadata) -> Self {
        self.tokens.insert(address, metadata);
        self
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl FromIterator<(Address, TokenMetadata)> for StaticProvider {
    fn from_iter<I: IntoIterator<Item = (Address, TokenMetadata)>>(iter: I) -> Self {
        Self {
            tokens: iter.into_iter().collect(),
        }
    }
}

#[async_trait]
impl MetadataProvider for StaticProvider {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn token_metadata(&self, address: Address) -> Result<TokenMetadata, MetadataError> {
        self.tokens
            .get(&address)
            .cloned()
            .ok_or(MetadataError::NotFound(address))
    }
}

/// Tries providers in order and returns the first success
#[derive(Clone, Default)]
pub struct FallbackProvider {
    providers: Vec<Arc<dyn MetadataProvider>>,
}

impl FallbackProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, provider: impl MetadataProvider + 'static) -> Self {
        self.providers.push(Arc::new(provider));
        self
    }
}

#[async_trait]
impl MetadataProvider for FallbackProvider {
    fn name(&self) -> &'static str {
        "fallback"
    }

    async fn token_metadata(&self, address: Address) -> Result<TokenMetadata, MetadataError> {
        let mut last_err = MetadataError::NotFound(address);
        for provider in &self.providers {
            match provider.token_metadata(address).await {
                Ok(metadata) => return Ok(metadata),
                Err(err) => {
                    trace!(provider = provider.name(), %address, %err, "provider miss");
                    last_err = err;
                }
            }
        }
        Err(last_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Broken;

    #[async_trait]
    impl MetadataProvider for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }

        async fn token_metadata(&self, address: Address) -> Result<TokenMetadata, MetadataError> {
            Err(MetadataError::Unavailable {
                address,
                reason: "offline".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_static_lookup() {
        let usdc = Address::repeat_byte(0xa0);
        let provider = StaticProvider::new().with(usdc, TokenMetadata::new("USDC", 6));

        assert_eq!(provider.token_metadata(usdc).await.unwrap().symbol, "USDC");
        assert!(matches!(
            provider.token_metadata(Address::ZERO).await,
            Err(MetadataError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_fallback_order() {
        let usdc = Address::repeat_byte(0xa0);
        let provider = FallbackProvider::new()
            .with(Broken)
            .with(StaticProvider::new().with(usdc, TokenMetadata::new("USDC", 6)))
            .with(StaticProvider::new().with(usdc, TokenMetadata::new("OTHER", 18)));

        assert_eq!(
            provider.token_metadata(usdc).await.unwrap(),
            TokenMetadata::new("USDC", 6)
        );
    }

    #[tokio::test]
    async fn test_fallback_reports_last_error() {
        let provider = FallbackProvider::new().with(StaticProvider::new()).with(Broken);

        let err = provider.token_metadata(Address::ZERO).await.unwrap_err();
        assert!(matches!(err, MetadataError::Unavailable { .. }));

        let empty = FallbackProvider::new();
        assert!(matches!(
            empty.token_metadata(Address::ZERO).await,
            Err(MetadataError::NotFound(_))
        ));
    }
}
