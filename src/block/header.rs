use super::number;
use crate::cache::SignerCache;
use crate::crypto::{self, KeyPair};
use crate::error::Result;
use crate::types::{Address, BlockId, Bytes32};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(super) struct HeaderBody {
    pub(super) parent_id: BlockId,
    pub(super) timestamp: u64,
    pub(super) gas_limit: u64,
    pub(super) beneficiary: Address,

    pub(super) gas_used: u64,
    pub(super) total_score: u64,

    pub(super) txs_root: Bytes32,
    pub(super) state_root: Bytes32,
    pub(super) receipts_root: Bytes32,

    pub(super) signature: Vec<u8>,
}

/// Values derived from the body, each filled in at most once.
#[derive(Debug, Clone, Default)]
struct Derived {
    signing_hash: OnceCell<Bytes32>,
    signer: OnceCell<Address>,
    id: OnceCell<BlockId>,
}

/// Immutable block header.
///
/// Signing hash, signer and ID are computed lazily and memoized; headers can be
/// shared between threads and queried concurrently. A header only changes by
/// producing a new one, see [`Header::with_signature`].
#[derive(Clone)]
pub struct Header {
    body: HeaderBody,
    derived: Derived,
    signer_cache: Option<Arc<SignerCache>>,
}

impl Header {
    pub(super) fn from_body(body: HeaderBody, signer_cache: Option<Arc<SignerCache>>) -> Self {
        Header {
            body,
            derived: Derived::default(),
            signer_cache,
        }
    }

    /// Attaches a shared signer cache used by [`signer`](Self::signer).
    pub fn with_signer_cache(mut self, cache: Arc<SignerCache>) -> Self {
        self.signer_cache = Some(cache);
        self
    }

    pub fn parent_id(&self) -> BlockId {
        self.body.parent_id
    }

    /// Sequential number, inferred from the parent ID.
    pub fn number(&self) -> u32 {
        let parent_num = number(&self.body.parent_id);
        if parent_num == 0 {
            let mut cleared = self.body.parent_id;
            cleared.0[31] = 0;
            if cleared.is_zero() {
                // no parent: this is genesis
                return 0;
            }
            // parent is genesis, whose ID has no number prefix
            return 1;
        }
        parent_num.wrapping_add(1)
    }

    /// Chain tag, inherited from the parent ID's last byte.
    pub fn chain_tag(&self) -> u8 {
        self.body.parent_id.0[31]
    }

    pub fn timestamp(&self) -> u64 {
        self.body.timestamp
    }

    pub fn gas_limit(&self) -> u64 {
        self.body.gas_limit
    }

    pub fn beneficiary(&self) -> Address {
        self.body.beneficiary
    }

    pub fn gas_used(&self) -> u64 {
        self.body.gas_used
    }

    /// Score accumulated from genesis up to and including this block.
    pub fn total_score(&self) -> u64 {
        self.body.total_score
    }

    pub fn txs_root(&self) -> Bytes32 {
        self.body.txs_root
    }

    pub fn state_root(&self) -> Bytes32 {
        self.body.state_root
    }

    pub fn receipts_root(&self) -> Bytes32 {
        self.body.receipts_root
    }

    pub fn signature(&self) -> &[u8] {
        &self.body.signature
    }

    fn write_signing_fields(&self, hasher: &mut Keccak256) {
        let body = &self.body;
        hasher.update(body.parent_id);
        hasher.update(body.timestamp.to_be_bytes());
        hasher.update(body.gas_limit.to_be_bytes());
        hasher.update(body.beneficiary);
        hasher.update(body.gas_used.to_be_bytes());
        hasher.update(body.total_score.to_be_bytes());
        hasher.update(body.txs_root);
        hasher.update(body.state_root);
        hasher.update(body.receipts_root);
    }

    /// Hash of every field except the signature; this is what gets signed.
    pub fn signing_hash(&self) -> Bytes32 {
        *self.derived.signing_hash.get_or_init(|| {
            let mut hasher = Keccak256::new();
            self.write_signing_fields(&mut hasher);
            Bytes32(hasher.finalize().into())
        })
    }

    /// Hash of the fully signed header, used as the signer cache key.
    fn signed_hash(&self) -> Bytes32 {
        let mut hasher = Keccak256::new();
        self.write_signing_fields(&mut hasher);
        hasher.update((self.body.signature.len() as u64).to_be_bytes());
        hasher.update(&self.body.signature);
        Bytes32(hasher.finalize().into())
    }

    /// Block ID: `number ‖ keccak256(signing_hash ‖ signer)[4..31] ‖ chain_tag`.
    /// For genesis the signing hash stands in for the keccak.
    ///
    /// If the signer cannot be recovered the hash part is left zero, so the ID
    /// still carries number and chain tag but identifies nothing. Callers that
    /// need a trustworthy ID must check [`signer`](Self::signer) themselves.
    pub fn id(&self) -> BlockId {
        *self.derived.id.get_or_init(|| {
            let number = self.number();
            let mut id = if number == 0 {
                self.signing_hash()
            } else {
                match self.signer() {
                    Ok(signer) => {
                        let mut hasher = Keccak256::new();
                        hasher.update(self.signing_hash());
                        hasher.update(signer);
                        Bytes32(hasher.finalize().into())
                    }
                    Err(err) => {
                        warn!(number, error = %err, "signer recovery failed, block id degraded");
                        Bytes32::ZERO
                    }
                }
            };
            id.0[..4].copy_from_slice(&number.to_be_bytes());
            id.0[31] = self.chain_tag();
            id
        })
    }

    /// Address that signed this header.
    ///
    /// Successful recoveries are memoized on the header and stored in the
    /// attached [`SignerCache`]; failures are returned every time.
    pub fn signer(&self) -> Result<Address> {
        self.derived
            .signer
            .get_or_try_init(|| self.recover_signer())
            .copied()
    }

    fn recover_signer(&self) -> Result<Address> {
        let cache = match &self.signer_cache {
            Some(cache) => cache,
            None => return crypto::recover_address(&self.signing_hash(), &self.body.signature),
        };

        let key = self.signed_hash();
        if let Some(signer) = cache.get(&key) {
            debug!(%key, "signer cache hit");
            return Ok(signer);
        }
        let signer = crypto::recover_address(&self.signing_hash(), &self.body.signature)?;
        cache.put(key, signer);
        Ok(signer)
    }

    /// Copy of this header carrying `signature`. The receiver is left untouched.
    pub fn with_signature(&self, signature: &[u8]) -> Header {
        let mut body = self.body.clone();
        body.signature = signature.to_vec();
        Header::from_body(body, self.signer_cache.clone())
    }

    /// Signs the signing hash with `keypair` and returns the signed copy.
    pub fn sign(&self, keypair: &KeyPair) -> Header {
        let signature = keypair.sign_digest(&self.signing_hash());
        self.with_signature(&signature)
    }

    /// Binary encoding of all fields, signature included.
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(&self.body)?)
    }

    /// Decodes a header produced by [`encode`](Self::encode). No cache is attached.
    pub fn decode(bytes: &[u8]) -> Result<Header> {
        let body: HeaderBody = bincode::deserialize(bytes)?;
        Ok(Header::from_body(body, None))
    }
}

impl PartialEq for Header {
    fn eq(&self, other: &Self) -> bool {
        self.body == other.body
    }
}

impl Eq for Header {}

impl fmt::Debug for Header {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Header")
            .field("number", &self.number())
            .field("body", &self.body)
            .finish()
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let signer = match self.signer() {
            Ok(signer) => signer.to_string(),
            Err(_) => "N/A".to_string(),
        };
        writeln!(f, "Header({}):", self.id())?;
        writeln!(f, "\tNumber:\t\t{}", self.number())?;
        writeln!(f, "\tParentID:\t{}", self.body.parent_id)?;
        writeln!(f, "\tTimestamp:\t{}", self.body.timestamp)?;
        writeln!(f, "\tSigner:\t\t{}", signer)?;
        writeln!(f, "\tBeneficiary:\t{}", self.body.beneficiary)?;
        writeln!(f, "\tGasLimit:\t{}", self.body.gas_limit)?;
        writeln!(f, "\tGasUsed:\t{}", self.body.gas_used)?;
        writeln!(f, "\tTotalScore:\t{}", self.body.total_score)?;
        writeln!(f, "\tTxsRoot:\t{}", self.body.txs_root)?;
        writeln!(f, "\tStateRoot:\t{}", self.body.state_root)?;
        writeln!(f, "\tReceiptsRoot:\t{}", self.body.receipts_root)?;
        write!(f, "\tSignature:\t0x{}", hex::encode(&self.body.signature))
    }
}
