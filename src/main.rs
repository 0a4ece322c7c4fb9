use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use poke_decode::config::{self, Config};
use poke_decode::core::TraceFile;
use poke_decode::decoders::default_registry;
use poke_decode::format::{json, FormatContext};
use poke_decode::logging;
use poke_decode::metadata::{FallbackProvider, MetadataProvider, MetadataResolver, StaticProvider};
use poke_decode::store::TokenStore;

#[derive(Debug, Parser)]
#[command(
    name = "poke-decode",
    version,
    about = "Decode transaction call traces into protocol actions"
)]
struct Args {
    /// Call trace JSON: one call frame or an array of frames
    trace: PathBuf,

    /// Config file (default: $POKE_DECODE_CONFIG or ~/.config/poke-decode/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print a JSON document instead of display rows
    #[arg(long)]
    json: bool,

    /// Show full addresses
    #[arg(long)]
    full_addresses: bool,

    /// Fractional digits shown for token amounts
    #[arg(long)]
    precision: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = config::load(args.config.as_deref())?;
    logging::init(config.log_level.as_deref());

    if args.full_addresses {
        config.display.truncate_addresses = false;
    }
    if let Some(precision) = args.precision {
        config.display.amount_precision = precision;
    }

    let input = fs::read_to_string(&args.trace)
        .with_context(|| format!("read trace {}", args.trace.display()))?;
    let trees = TraceFile::from_json(&input)
        .with_context(|| format!("parse trace {}", args.trace.display()))?
        .into_trees();

    let registry = Arc::new(default_registry(&config.decode.markets)?);
    info!(trees = trees.len(), decoders = registry.len(), "decoding");
    let outcomes = Arc::clone(&registry).decode_parallel(trees.clone()).await;

    let resolver = MetadataResolver::new(metadata_provider(&config))
        .with_concurrency(config.decode.metadata_concurrency);
    let requests = outcomes
        .iter()
        .flat_map(|outcome| outcome.state.metadata_requests().iter().copied());
    let tokens = resolver.resolve_all(requests).await;

    if args.json {
        println!("{}", json::render(&outcomes, &tokens)?);
        return Ok(());
    }

    let ctx = FormatContext::new(&config.display, &tokens);
    for (index, (tree, outcome)) in trees.iter().zip(&outcomes).enumerate() {
        if outcomes.len() > 1 {
            println!("# trace {index}");
        }
        if outcome.actions.is_empty() {
            println!("(no decoded actions)");
        }
        for decoded in &outcome.actions {
            match registry.format(&decoded.action, &ctx) {
                Some(row) => println!("[{}] {}", decoded.item, row),
                None => warn!(action = decoded.name(), "no formatter for action"),
            }
        }
        for (node, signature) in registry.undecoded_calls(tree, &outcome.state) {
            println!("[{}] undecoded {} -> {}", node.id, signature, ctx.address(node.to));
        }
    }

    Ok(())
}

/// Config tokens first, then the local token store when it opens
fn metadata_provider(config: &Config) -> Arc<dyn MetadataProvider> {
    let configured: StaticProvider = config
        .tokens
        .iter()
        .map(|token| (token.address, token.metadata()))
        .collect();
    let mut provider = FallbackProvider::new().with(configured);

    let Some(path) = config.token_store_path() else {
        return Arc::new(provider);
    };
    match TokenStore::open(&path) {
        Ok(store) => {
            for token in &config.tokens {
                if let Err(err) = store.put(token.address, &token.metadata()) {
                    warn!(address = %token.address, "failed to cache token: {err:#}");
                }
            }
            provider = provider.with(store);
        }
        Err(err) => warn!(path = %path.display(), "token store unavailable: {err:#}"),
    }
    Arc::new(provider)
}
