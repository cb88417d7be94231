//! # tapcommit
//!
//! Command-line front end for Taproot script-tree commitments.
//!
//! ## Usage Examples
//!
//! ```bash
//! # Fresh internal key
//! tapcommit keygen
//!
//! # Commit two leaves under a key and save the record
//! tapcommit commit --internal-key 50be5f...b4d3 --leaf 51 --leaf 52
//!
//! # Control block for the second leaf of the saved record
//! tapcommit control-block --leaf-index 1
//!
//! # Check a revealed script against an address
//! tapcommit verify --address tb1p... --script a820... --control-block c150...
//!
//! # Decode a control block
//! tapcommit inspect c150be5f...
//!
//! # Full hash-lock commit and reveal walk-through
//! tapcommit hashlock-demo
//! ```
//!
//! The network and record path default to `TAPCOMMIT_NETWORK` and
//! `TAPCOMMIT_RECORD_FILE` (a `.env` file is honoured).

use anyhow::{anyhow, bail, Context, Result};
use bitcoin::secp256k1::Secp256k1;
use bitcoin::{Network, ScriptBuf};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tapcommit::address::{decode_address, encode_address, format_short};
use tapcommit::config::{parse_network, taproot::NUMS_INTERNAL_KEY, Settings};
use tapcommit::control_block::verify_control_block;
use tapcommit::spend::verify_script_path;
use tapcommit::utils::keys::{generate_keypair, parse_keypair, parse_x_only};
use tapcommit::{
    CommitmentRecord, ControlBlock, ExecutionContext, Leaf, LeafScript, ScriptTree,
    TaprootSpend, TemplateInterpreter, TreeShape,
};

/// Private key of the hash-lock walk-through; never use it for real funds
const DEMO_PRIVATE_KEY: &str = "82a3ddde60ca9ebece3ef5af4e02b0f44113703520895047c32d081d762e29ac";

#[derive(Parser)]
#[command(name = "tapcommit")]
#[command(about = "Taproot script-tree commitments: Merkle roots, key tweaking and control blocks")]
struct Cli {
    /// Network for addresses (bitcoin, testnet, signet, regtest)
    #[arg(long, global = true)]
    network: Option<String>,

    /// Commitment record file
    #[arg(long, global = true)]
    record: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a random internal keypair
    Keygen,
    /// Commit a script tree into an internal key and save the record
    Commit {
        /// Internal x-only public key (hex); the NUMS key when omitted
        #[arg(short, long)]
        internal_key: Option<String>,
        /// Leaf script in hex; repeat for a balanced tree
        #[arg(short, long)]
        leaf: Vec<String>,
        /// Add a SHA256 hash-lock leaf for this preimage
        #[arg(long)]
        hash_lock: Vec<String>,
        /// JSON file with a nested tree shape, instead of --leaf
        #[arg(short, long, conflicts_with = "leaf")]
        tree: Option<PathBuf>,
    },
    /// Print the control block for one leaf of the saved record
    ControlBlock {
        /// Leaf position in the record's tree
        #[arg(short = 'i', long, conflicts_with = "script")]
        leaf_index: Option<usize>,
        /// Leaf script in hex
        #[arg(short, long)]
        script: Option<String>,
    },
    /// Verify that a script is committed in an output key or address
    Verify {
        /// P2TR address of the output
        #[arg(short, long, conflicts_with = "output_key")]
        address: Option<String>,
        /// X-only output key (hex)
        #[arg(short, long)]
        output_key: Option<String>,
        /// Revealed leaf script (hex)
        #[arg(short, long)]
        script: String,
        /// Control block (hex)
        #[arg(short, long)]
        control_block: String,
    },
    /// Decode a control block
    Inspect {
        /// Control block (hex)
        control_block: String,
        /// Leaf script (hex) to compute the implied Merkle root
        #[arg(short, long)]
        script: Option<String>,
    },
    /// Commit to a hash lock and walk through its reveal
    HashlockDemo {
        /// Preimage locked by the script
        #[arg(short, long, default_value = "helloworld")]
        preimage: String,
        /// Internal private key (hex)
        #[arg(long, default_value = DEMO_PRIVATE_KEY)]
        private_key: String,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut settings = Settings::from_env()?;
    if let Some(network) = &cli.network {
        settings.network = parse_network(network)?;
    }
    if let Some(record) = cli.record {
        settings.record_file = record;
    }

    match cli.command {
        Commands::Keygen => keygen(settings.network),
        Commands::Commit {
            internal_key,
            leaf,
            hash_lock,
            tree,
        } => commit(&settings, internal_key.as_deref(), &leaf, &hash_lock, tree),
        Commands::ControlBlock { leaf_index, script } => {
            control_block(&settings, leaf_index, script.as_deref())
        }
        Commands::Verify {
            address,
            output_key,
            script,
            control_block,
        } => verify(address.as_deref(), output_key.as_deref(), &script, &control_block),
        Commands::Inspect {
            control_block,
            script,
        } => inspect(&control_block, script.as_deref()),
        Commands::HashlockDemo {
            preimage,
            private_key,
        } => hashlock_demo(settings.network, &preimage, &private_key),
    }
}

fn keygen(network: Network) -> Result<()> {
    let secp = Secp256k1::new();
    let keypair = generate_keypair(&secp);
    let (internal_key, _) = keypair.x_only_public_key();
    let key_only = tapcommit::tweak_public_key(&secp, &internal_key, None)?;

    println!("🔑 New internal key");
    println!("  Private key: {}", keypair.secret_key().display_secret());
    println!("  Internal key: {}", internal_key);
    println!(
        "  Key-only address: {}",
        encode_address(&key_only.output_key, network)
    );
    Ok(())
}

fn commit(
    settings: &Settings,
    internal_key: Option<&str>,
    leaves: &[String],
    hash_locks: &[String],
    tree_file: Option<PathBuf>,
) -> Result<()> {
    let secp = Secp256k1::verification_only();
    let internal_key = match internal_key {
        Some(key) => parse_x_only(key)?,
        None => {
            log::warn!("No internal key given, committing to the NUMS key; key path is disabled");
            parse_x_only(NUMS_INTERNAL_KEY)?
        }
    };

    let tree = match tree_file {
        Some(path) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("reading tree from {}", path.display()))?;
            let mut shape = TreeShape::from_json(&json)?;
            for preimage in hash_locks {
                let leaf = LeafScript::hash_lock(preimage.as_bytes()).to_leaf()?;
                shape = TreeShape::branch(shape, TreeShape::Leaf(leaf));
            }
            ScriptTree::from_shape(&shape)?
        }
        None => {
            let mut all = leaves
                .iter()
                .map(|hex| Leaf::from_hex(hex))
                .collect::<Result<Vec<_>, _>>()?;
            for preimage in hash_locks {
                all.push(LeafScript::hash_lock(preimage.as_bytes()).to_leaf()?);
            }
            ScriptTree::balanced(all)?
        }
    };

    let mut spend = TaprootSpend::new(internal_key);
    spend.freeze_tree(Arc::new(tree.clone()))?;
    let tweak = spend.tweak(&secp)?;
    let record = CommitmentRecord::new(internal_key, &tree, &tweak, settings.network);

    println!("🌳 Script tree: {} leaves, depth {}", tree.leaf_count(), tree.depth());
    match tree.merkle_root() {
        Some(root) => println!("  Merkle root: {}", root),
        None => println!("  Merkle root: none (key-only)"),
    }
    println!("  Internal key: {}", internal_key);
    println!("  Output key: {}", tweak);
    println!("  Address: {}", record.address);

    record.save(&settings.record_file)?;
    println!("💾 Saved to {}", settings.record_file.display());
    Ok(())
}

fn control_block(settings: &Settings, leaf_index: Option<usize>, script: Option<&str>) -> Result<()> {
    let secp = Secp256k1::verification_only();
    let record = CommitmentRecord::load(&settings.record_file)
        .with_context(|| format!("loading {}", settings.record_file.display()))?;
    let restored = record.restore(&secp)?;
    let tree = &restored.tree;

    let leaf_id = match (leaf_index, script) {
        (Some(index), _) => tree
            .leaves()
            .nth(index)
            .map(|(id, _)| id)
            .ok_or_else(|| anyhow!("tree has {} leaves, no leaf {}", tree.leaf_count(), index))?,
        (None, Some(hex)) => {
            let leaf = Leaf::from_hex(hex)?;
            tree.find_leaf(leaf.script(), leaf.version())
                .ok_or_else(|| anyhow!("script {} is not a leaf of the committed tree", hex))?
        }
        (None, None) if tree.leaf_count() == 1 => tree
            .leaves()
            .next()
            .map(|(id, _)| id)
            .ok_or_else(|| anyhow!("tree is empty"))?,
        (None, None) => bail!("tree has {} leaves; pass --leaf-index or --script", tree.leaf_count()),
    };

    let block = ControlBlock::build(tree, leaf_id, restored.internal_key, restored.tweak.parity)?;
    let script = tree
        .leaf(leaf_id)
        .map(|leaf| leaf.script().to_owned())
        .ok_or_else(|| anyhow!("leaf {} vanished from the tree", leaf_id))?;

    println!("🧾 Control block for leaf {} of {}", leaf_id, format_short(&restored.address));
    println!("  Depth: {}", block.merkle_branch.len());
    println!("  Size: {} bytes", block.size());
    println!("  Control block: {}", hex::encode(block.serialize()));
    println!("  Script: {}", hex::encode(script.as_bytes()));
    if let Some(template) = LeafScript::from_script(&script) {
        println!("  Template: {}", template);
    }
    println!();
    println!("  Witness: [<stack items>..., script, control block]");
    Ok(())
}

fn verify(
    address: Option<&str>,
    output_key: Option<&str>,
    script_hex: &str,
    control_block_hex: &str,
) -> Result<()> {
    let secp = Secp256k1::verification_only();
    let output_key = match (address, output_key) {
        (Some(address), _) => decode_address(address)?.0,
        (None, Some(key)) => parse_x_only(key)?,
        (None, None) => bail!("pass --address or --output-key"),
    };
    let script = ScriptBuf::from_bytes(hex::decode(script_hex)?);
    let control_block = hex::decode(control_block_hex)?;

    match verify_control_block(&secp, &output_key, &script, &control_block) {
        Ok(parsed) => {
            println!(
                "✅ Script is committed in {} at depth {}",
                output_key,
                parsed.merkle_branch.len()
            );
            Ok(())
        }
        Err(e) if e.is_verification_failure() => {
            println!("❌ {}", e);
            Err(e.into())
        }
        Err(e) => Err(e.into()),
    }
}

fn inspect(control_block_hex: &str, script_hex: Option<&str>) -> Result<()> {
    let block = ControlBlock::decode(&hex::decode(control_block_hex)?)?;

    println!("🔍 Control block ({} bytes)", block.size());
    println!("  Leaf version: {}", block.leaf_version);
    println!("  Output key parity: {}", block.output_key_parity.to_u8());
    println!("  Internal key: {}", block.internal_key);
    println!("  Path depth: {}", block.merkle_branch.len());
    for (level, sibling) in block.merkle_branch.iter().enumerate() {
        println!("    [{}] {}", level, sibling);
    }

    if let Some(hex) = script_hex {
        let script = ScriptBuf::from_bytes(hex::decode(hex)?);
        let root = block.merkle_root_for(&script);
        let secp = Secp256k1::verification_only();
        let tweak = tapcommit::tweak_public_key(&secp, &block.internal_key, Some(root))?;
        println!("  Implied Merkle root: {}", root);
        println!("  Implied output key: {}", tweak);
        if tweak.parity != block.output_key_parity {
            log::warn!("Parity bit does not match the implied output key");
        }
    }
    Ok(())
}

fn hashlock_demo(network: Network, preimage: &str, private_key: &str) -> Result<()> {
    let secp = Secp256k1::new();
    let keypair = parse_keypair(&secp, private_key)?;
    let (internal_key, _) = keypair.x_only_public_key();
    let template = LeafScript::hash_lock(preimage.as_bytes());
    let leaf = template.to_leaf()?;
    let tree = Arc::new(ScriptTree::single(leaf.clone()));
    let leaf_id = tree
        .find_leaf(leaf.script(), leaf.version())
        .ok_or_else(|| anyhow!("hash-lock leaf missing from its own tree"))?;

    println!("=== Commit ===");
    println!("  Script: {}", hex::encode(leaf.script().as_bytes()));
    println!("  Leaf hash: {}", leaf.leaf_hash());
    let mut spend = TaprootSpend::new(internal_key);
    spend.freeze_tree(Arc::clone(&tree))?;
    let tweak = spend.tweak(&secp)?;
    println!("  Internal key: {}", internal_key);
    println!("  Output key: {}", tweak);
    println!("  Address: {}", spend.address(network)?);

    println!();
    println!("=== Reveal ===");
    let control_block = spend.script_path(leaf_id)?.serialize();
    println!("  Control block: {}", hex::encode(&control_block));
    let witness = spend.witness_script_path(vec![preimage.as_bytes().to_vec()])?.clone();
    for (i, item) in witness.iter().enumerate() {
        println!("  Witness[{}]: {}", i, hex::encode(item));
    }

    println!();
    println!("=== Verify ===");
    let interpreter = TemplateInterpreter::new();
    let ctx = ExecutionContext::default();
    verify_script_path(&secp, &tweak.output_key, &witness, &interpreter, &ctx)?;
    println!("  ✅ Correct preimage accepted");

    let mut wrong = witness.to_vec();
    wrong[0] = format!("{}!", preimage).into_bytes();
    match verify_script_path(
        &secp,
        &tweak.output_key,
        &bitcoin::Witness::from_slice(&wrong),
        &interpreter,
        &ctx,
    ) {
        Err(e) => println!("  ❌ Wrong preimage rejected: {}", e),
        Ok(_) => bail!("wrong preimage was accepted"),
    }

    let mut tampered = witness.to_vec();
    if let Some(block) = tampered.last_mut() {
        block[0] ^= 1;
    }
    match verify_script_path(
        &secp,
        &tweak.output_key,
        &bitcoin::Witness::from_slice(&tampered),
        &interpreter,
        &ctx,
    ) {
        Err(e) => println!("  ❌ Tampered control block rejected: {}", e),
        Ok(_) => bail!("tampered control block was accepted"),
    }
    Ok(())
}
