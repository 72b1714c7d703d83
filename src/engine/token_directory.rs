use alloy::primitives::Address;
use anyhow::Result;
use log::{info, warn};
use moka::future::Cache;

use crate::{
    chain::ChainReader,
    db::{models::Token, Store},
    utils::address_to_string,
};

/// Decimals assumed for a token whose `decimals()` call fails.
const DEFAULT_DECIMALS: u8 = 0;

/// Deduplicating registry of token metadata.
///
/// A token is read from chain at most once: lookups go cache, then store,
/// then RPC, and whatever the RPC answered (including fallbacks) is persisted
/// and never refreshed.
pub struct TokenDirectory {
    cache: Cache<String, Token>,
}

impl Default for TokenDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenDirectory {
    pub fn new() -> Self {
        // Token sets are small and immutable, no TTL needed
        let cache = Cache::builder().max_capacity(10_000).build();

        Self { cache }
    }

    /// Get the token record for `address`, creating it on first sight.
    pub async fn resolve<R: ChainReader, S: Store>(
        &self,
        reader: &R,
        store: &mut S,
        address: Address,
    ) -> Result<Token> {
        let id = address_to_string(address);

        if let Some(token) = self.cache.get(&id).await {
            return Ok(token);
        }

        if let Some(token) = store.load::<Token>(&id).await? {
            self.cache.insert(id, token.clone()).await;
            return Ok(token);
        }

        let metadata = reader.token_metadata(address).await;
        if metadata.decimals.is_none() {
            warn!("Token {} did not answer decimals(), assuming {}", id, DEFAULT_DECIMALS);
        }

        let token = Token::new(
            id.clone(),
            metadata.symbol.unwrap_or_default(),
            metadata.name.unwrap_or_default(),
            metadata.decimals.unwrap_or(DEFAULT_DECIMALS),
        );
        store.upsert(&token).await?;
        info!("Registered token {} ({}, {} decimals)", token.address, token.symbol, token.decimals);

        self.cache.insert(id, token.clone()).await;
        Ok(token)
    }

    /// Resolve every address in order.
    pub async fn resolve_all<R: ChainReader, S: Store>(
        &self,
        reader: &R,
        store: &mut S,
        addresses: &[Address],
    ) -> Result<Vec<Token>> {
        let mut tokens = Vec::with_capacity(addresses.len());
        for address in addresses {
            tokens.push(self.resolve(reader, store, *address).await?);
        }
        Ok(tokens)
    }
}
