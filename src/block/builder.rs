use super::header::{Header, HeaderBody};
use crate::cache::SignerCache;
use crate::types::{Address, BlockId, Bytes32};
use std::sync::Arc;

/// Fluent builder for [`Header`]. Unset fields are zero.
#[derive(Default)]
pub struct HeaderBuilder {
    body: HeaderBody,
    signer_cache: Option<Arc<SignerCache>>,
}

impl HeaderBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parent_id(mut self, id: BlockId) -> Self {
        self.body.parent_id = id;
        self
    }

    pub fn timestamp(mut self, timestamp: u64) -> Self {
        self.body.timestamp = timestamp;
        self
    }

    pub fn gas_limit(mut self, gas_limit: u64) -> Self {
        self.body.gas_limit = gas_limit;
        self
    }

    pub fn beneficiary(mut self, beneficiary: Address) -> Self {
        self.body.beneficiary = beneficiary;
        self
    }

    pub fn gas_used(mut self, gas_used: u64) -> Self {
        self.body.gas_used = gas_used;
        self
    }

    pub fn total_score(mut self, total_score: u64) -> Self {
        self.body.total_score = total_score;
        self
    }

    pub fn txs_root(mut self, root: Bytes32) -> Self {
        self.body.txs_root = root;
        self
    }

    pub fn state_root(mut self, root: Bytes32) -> Self {
        self.body.state_root = root;
        self
    }

    pub fn receipts_root(mut self, root: Bytes32) -> Self {
        self.body.receipts_root = root;
        self
    }

    pub fn signature(mut self, signature: Vec<u8>) -> Self {
        self.body.signature = signature;
        self
    }

    pub fn signer_cache(mut self, cache: Arc<SignerCache>) -> Self {
        self.signer_cache = Some(cache);
        self
    }

    pub fn build(self) -> Header {
        Header::from_body(self.body, self.signer_cache)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_sets_every_field() {
        let root = |b: u8| Bytes32::from_slice_padded(&[b]);
        let header = HeaderBuilder::new()
            .parent_id(root(1))
            .timestamp(2)
            .gas_limit(3)
            .beneficiary(Address::from_slice_padded(&[4]))
            .gas_used(5)
            .total_score(6)
            .txs_root(root(7))
            .state_root(root(8))
            .receipts_root(root(9))
            .signature(vec![10])
            .build();

        assert_eq!(header.parent_id(), root(1));
        assert_eq!(header.timestamp(), 2);
        assert_eq!(header.gas_limit(), 3);
        assert_eq!(header.beneficiary(), Address::from_slice_padded(&[4]));
        assert_eq!(header.gas_used(), 5);
        assert_eq!(header.total_score(), 6);
        assert_eq!(header.txs_root(), root(7));
        assert_eq!(header.state_root(), root(8));
        assert_eq!(header.receipts_root(), root(9));
        assert_eq!(header.signature(), &[10]);
    }

    #[test]
    fn test_default_builder_is_genesis() {
        let header = HeaderBuilder::new().build();
        assert_eq!(header.number(), 0);
        assert_eq!(header.chain_tag(), 0);
    }
}
