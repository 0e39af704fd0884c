//! Top-level context owning the resources shared by block processing.

use crate::block::{Header, HeaderBuilder};
use crate::cache::SignerCache;
use crate::config::Config;
use crate::error::Result;
use std::sync::Arc;
use tracing::info;

pub struct Context {
    config: Config,
    signer_cache: Arc<SignerCache>,
}

impl Context {
    pub fn new(config: Config) -> Self {
        let signer_cache = Arc::new(SignerCache::new(config.signer_cache.capacity));
        info!(
            signer_cache_capacity = config.signer_cache.capacity,
            "chainstate context ready"
        );
        Context {
            config,
            signer_cache,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn signer_cache(&self) -> Arc<SignerCache> {
        Arc::clone(&self.signer_cache)
    }

    /// Builder whose headers share this context's signer cache.
    pub fn header_builder(&self) -> HeaderBuilder {
        HeaderBuilder::new().signer_cache(self.signer_cache())
    }

    pub fn decode_header(&self, bytes: &[u8]) -> Result<Header> {
        Ok(Header::decode(bytes)?.with_signer_cache(self.signer_cache()))
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
