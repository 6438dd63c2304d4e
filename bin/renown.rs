use std::{str::FromStr, sync::Arc};

use anyhow::{bail, Context};
use clap::Parser;
use jemallocator::Jemalloc;
use log::{error, info, LevelFilter};
use simple_logger::SimpleLogger;

#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use renown::{
    cache::check_store, utils::parse_wallet_address, AnalysisReport, CacheStore,
    ContractCacheStore, RpcLedger, Settings, WalletAnalyzer,
};

/// Scan wallets on-chain, update their cached metrics and print reputation reports.
#[derive(Parser, Debug)]
#[command(name = "renown", version)]
struct Args {
    /// Wallet addresses to analyze
    #[arg(required = true)]
    wallets: Vec<String>,

    /// Write updated metrics back to the cache contract
    #[arg(long)]
    commit: bool,

    /// Config file path, extension optional
    #[arg(long, default_value = "config")]
    config: String,

    /// Overrides `log_level` from the config file
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main()]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let settings = Settings::from_file(&args.config).with_context(|| {
        format!("Failed to load {}. Please ensure it exists and is valid", args.config)
    })?;

    let level = args.log_level.as_deref().unwrap_or(&settings.log_level);
    SimpleLogger::new()
        .with_level(LevelFilter::from_str(level).unwrap_or(LevelFilter::Info))
        .init()
        .context("Failed to install logger")?;

    tokio::select! {
        result = run(args, settings) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal (Ctrl+C), exiting...");
            Ok(())
        },
    }
}

async fn run(args: Args, settings: Settings) -> anyhow::Result<()> {
    let weights = settings.reputation.weights;
    weights.validate().context("Invalid reputation weights")?;

    // Reject malformed input before touching the network
    let wallets = args
        .wallets
        .iter()
        .map(|input| parse_wallet_address(input))
        .collect::<Result<Vec<_>, _>>()?;

    let ledger = RpcLedger::connect(&settings.rpc)
        .await
        .context("Failed to connect to the ledger node")?;

    let cache = ContractCacheStore::new(&settings.cache, &settings.rpc.url)
        .context("Failed to set up the cache contract")?;
    check_store(&cache).await;

    if args.commit && !cache.can_write() {
        info!("No owner key configured, results will not be committed");
    }

    let analyzer = WalletAnalyzer::new(Arc::new(ledger), Arc::new(cache), &settings.scanner);

    let mut failed = 0usize;
    for wallet in wallets {
        let analysis = match analyzer.analyze(wallet, args.commit).await {
            Ok(analysis) => analysis,
            Err(e) => {
                error!("Analysis of {} failed: {}", wallet, e);
                failed += 1;
                continue;
            },
        };

        let reputation = analysis.reputation(&weights)?;
        let report = AnalysisReport::new(&analysis, reputation);
        println!("{}", serde_json::to_string_pretty(&report)?);

        if analysis.commit.is_failure() {
            failed += 1;
        }
    }

    if failed > 0 {
        bail!("{} wallet(s) could not be analyzed or committed", failed);
    }

    Ok(())
}
