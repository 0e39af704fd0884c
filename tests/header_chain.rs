//! Integration tests for block header identity along a signed chain

use chainstate::block::{genesis_parent_id, number, Header, HeaderBuilder};
use chainstate::cache::SignerCache;
use chainstate::context::Context;
use chainstate::crypto::{keccak256, KeyPair};
use chainstate::types::Bytes32;
use std::sync::Arc;

/// Helper to build a genesis header followed by `len` signed blocks
fn build_chain(ctx: &Context, chain_tag: u8, len: u32, keypair: &KeyPair) -> Vec<Header> {
    let genesis = ctx
        .header_builder()
        .parent_id(genesis_parent_id(chain_tag))
        .timestamp(1_000)
        .gas_limit(10_000_000)
        .state_root(keccak256(b"genesis-state"))
        .build();

    let mut chain = vec![genesis];
    for i in 0..len {
        let parent = chain.last().cloned().expect("chain is never empty");
        let header = ctx
            .header_builder()
            .parent_id(parent.id())
            .timestamp(parent.timestamp() + 10)
            .gas_limit(parent.gas_limit())
            .gas_used(u64::from(i) * 21_000)
            .beneficiary(keypair.address())
            .total_score(parent.total_score() + 1)
            .txs_root(keccak256(&i.to_be_bytes()))
            .build()
            .sign(keypair);
        chain.push(header);
    }
    chain
}

#[test]
fn test_id_embeds_number_along_chain() {
    let ctx = Context::default();
    let keypair = KeyPair::generate();
    let chain = build_chain(&ctx, 0x4a, 12, &keypair);

    for (height, header) in chain.iter().enumerate() {
        assert_eq!(header.number() as usize, height);
        assert_eq!(number(&header.id()), header.number());
    }
}

#[test]
fn test_chain_tag_inherited_by_every_descendant() {
    let ctx = Context::default();
    let keypair = KeyPair::generate();
    let chain = build_chain(&ctx, 0x9c, 6, &keypair);

    let genesis_tag = chain[0].chain_tag();
    assert_eq!(genesis_tag, 0x9c);
    for header in &chain {
        assert_eq!(header.chain_tag(), genesis_tag);
        assert_eq!(header.id().0[31], genesis_tag);
    }
}

#[test]
fn test_genesis_id_is_patched_signing_hash() {
    let ctx = Context::default();
    let keypair = KeyPair::generate();
    let genesis = build_chain(&ctx, 7, 0, &keypair).remove(0);

    assert_eq!(genesis.number(), 0);
    let id = genesis.id();
    let hash = genesis.signing_hash();
    assert_eq!(&id.0[4..31], &hash.0[4..31]);
    assert_eq!(&id.0[..4], &[0, 0, 0, 0]);
    assert_eq!(id.0[31], 7);
}

#[test]
fn test_signers_recovered_for_whole_chain() {
    let ctx = Context::default();
    let keypair = KeyPair::generate();
    let chain = build_chain(&ctx, 1, 5, &keypair);

    for header in &chain[1..] {
        assert_eq!(header.signer().unwrap(), keypair.address());
    }
    // genesis is never signed
    assert!(chain[0].signer().is_err());
}

#[test]
fn test_distinct_signers_give_distinct_ids() {
    let ctx = Context::default();
    let genesis = ctx.header_builder().parent_id(genesis_parent_id(3)).build();
    let unsigned = ctx.header_builder().parent_id(genesis.id()).timestamp(5).build();

    let a = unsigned.sign(&KeyPair::generate());
    let b = unsigned.sign(&KeyPair::generate());
    assert_eq!(a.signing_hash(), b.signing_hash());
    assert_ne!(a.id(), b.id());
    assert_eq!(number(&a.id()), number(&b.id()));
}

#[test]
fn test_copy_on_write_signing() {
    let keypair = KeyPair::generate();
    let genesis = HeaderBuilder::new().parent_id(genesis_parent_id(2)).build();
    let unsigned = HeaderBuilder::new().parent_id(genesis.id()).build();

    let id_before = unsigned.id();
    let signed = unsigned.sign(&keypair);
    let resigned = signed.with_signature(&[0u8; 65]);

    assert!(unsigned.signature().is_empty());
    assert_eq!(unsigned.id(), id_before);
    assert!(unsigned.signer().is_err());
    assert_eq!(signed.signer().unwrap(), keypair.address());
    assert_eq!(signed.signature().len(), 65);
    assert_eq!(resigned.signing_hash(), signed.signing_hash());
}

#[test]
fn test_signer_cache_hits_across_decoded_copies() {
    let cache = Arc::new(SignerCache::new(SignerCache::DEFAULT_CAPACITY));
    let keypair = KeyPair::generate();
    let genesis = HeaderBuilder::new().parent_id(genesis_parent_id(1)).build();
    let header = HeaderBuilder::new()
        .parent_id(genesis.id())
        .signer_cache(Arc::clone(&cache))
        .build()
        .sign(&keypair);

    assert_eq!(header.signer().unwrap(), header.signer().unwrap());
    assert_eq!(cache.stats().misses, 1);
    assert_eq!(cache.stats().hits, 0);

    for _ in 0..3 {
        let copy = Header::decode(&header.encode().unwrap())
            .unwrap()
            .with_signer_cache(Arc::clone(&cache));
        assert_eq!(copy.signer().unwrap(), keypair.address());
        assert_eq!(copy.id(), header.id());
    }
    assert_eq!(cache.stats().hits, 3);
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_signer_cache_bounded() {
    let cache = Arc::new(SignerCache::new(4));
    let keypair = KeyPair::generate();
    let genesis = HeaderBuilder::new().parent_id(genesis_parent_id(1)).build();

    for ts in 0..10u64 {
        let header = HeaderBuilder::new()
            .parent_id(genesis.id())
            .timestamp(ts)
            .signer_cache(Arc::clone(&cache))
            .build()
            .sign(&keypair);
        header.signer().unwrap();
    }
    assert_eq!(cache.len(), 4);
}

#[test]
fn test_degraded_id_for_bad_signature() {
    let genesis = HeaderBuilder::new().parent_id(genesis_parent_id(8)).build();
    let header = HeaderBuilder::new()
        .parent_id(genesis.id())
        .signature(vec![1, 2, 3])
        .build();

    let id = header.id();
    assert_eq!(number(&id), 1);
    assert_eq!(id.0[31], 8);
    assert!(id.0[4..31].iter().all(|b| *b == 0));
    assert_ne!(id, Bytes32::ZERO);
}
