#![forbid(unsafe_code)]
//! Builds a small signed header chain or runs a scripted execution against an
//! in-memory store, printing what comes out.

use chainstate::block::{genesis_parent_id, number, Header};
use chainstate::config::load_config;
use chainstate::context::Context;
use chainstate::crypto::{keccak256, KeyPair};
use chainstate::state::MemoryState;
use chainstate::statedb::StateDb;
use chainstate::telemetry::init_logging;
use chainstate::types::{Address, Amount, Bytes32, Log};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "chainstate.toml")]
    config: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Builds a genesis header plus signed descendants
    Chain {
        /// Number of blocks after genesis
        #[arg(long, default_value_t = 3)]
        blocks: u32,
        /// Chain tag carried by every block ID
        #[arg(long, default_value_t = 0x27)]
        chain_tag: u8,
        /// Print headers as a JSON array
        #[arg(long)]
        json: bool,
    },
    /// Runs a nested call with a reverted inner frame
    Execute,
}

#[derive(Serialize)]
struct HeaderSummary {
    number: u32,
    id: String,
    parent_id: String,
    chain_tag: u8,
    signer: Option<String>,
    timestamp: u64,
    total_score: u64,
}

impl HeaderSummary {
    fn from_header(header: &Header) -> Self {
        Self {
            number: header.number(),
            id: header.id().to_string(),
            parent_id: header.parent_id().to_string(),
            chain_tag: header.chain_tag(),
            signer: header.signer().ok().map(|s| s.to_string()),
            timestamp: header.timestamp(),
            total_score: header.total_score(),
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    init_logging(&config.logging);

    let ctx = Context::new(config);
    match cli.command {
        Commands::Chain {
            blocks,
            chain_tag,
            json,
        } => build_chain(&ctx, blocks, chain_tag, json)?,
        Commands::Execute => execute(),
    }
    Ok(())
}

fn build_chain(
    ctx: &Context,
    blocks: u32,
    chain_tag: u8,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let keypair = KeyPair::generate();
    let genesis = ctx
        .header_builder()
        .parent_id(genesis_parent_id(chain_tag))
        .timestamp(1_530_316_800)
        .gas_limit(10_000_000)
        .state_root(keccak256(b"genesis"))
        .build();

    let mut chain = vec![genesis];
    for _ in 0..blocks {
        let parent = &chain[chain.len() - 1];
        let header = ctx
            .header_builder()
            .parent_id(parent.id())
            .timestamp(parent.timestamp() + 10)
            .gas_limit(parent.gas_limit())
            .beneficiary(keypair.address())
            .total_score(parent.total_score() + 1)
            .build()
            .sign(&keypair);
        chain.push(header);
    }

    for header in &chain {
        if number(&header.id()) != header.number() || header.chain_tag() != chain_tag {
            error!(number = header.number(), "block id does not embed its number and tag");
            return Err(format!("inconsistent block id at #{}", header.number()).into());
        }
    }
    info!(blocks = chain.len(), signer = %keypair.address(), "chain built");

    if json {
        let summaries: Vec<_> = chain.iter().map(HeaderSummary::from_header).collect();
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    } else {
        for header in &chain {
            println!("{}\n", header);
        }
    }
    Ok(())
}

fn execute() {
    let alice = Address::from_slice_padded(b"alice");
    let contract = Address::from_slice_padded(b"contract");

    let mut db = StateDb::new(MemoryState::new());
    db.snapshot();
    db.add_balance(&alice, Amount::new(1_000));
    db.add_log(Log::new(alice, vec![keccak256(b"Funded")], Vec::new()));

    let inner = db.snapshot();
    db.sub_balance(&alice, Amount::new(400));
    db.add_balance(&contract, Amount::new(400));
    db.set_code(&contract, vec![0x60, 0x00, 0x60, 0x00, 0xfd]);
    db.set_state(&contract, &Bytes32::ZERO, keccak256(b"slot"));
    db.add_log(Log::new(contract, vec![keccak256(b"Called")], Vec::new()));
    db.add_refund(Amount::new(15_000));
    db.revert_to_snapshot(inner);

    let outputs = db.collect_outputs();
    println!("alice balance:    {}", db.get_balance(&alice));
    println!("contract exists:  {}", db.exists(&contract));
    println!("refund:           {}", db.get_refund());
    println!("logs:             {}", outputs.logs.len());
    for addr in &outputs.affected_addresses {
        println!("affected:         {}", addr);
    }
}
