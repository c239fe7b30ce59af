use clap::{ArgAction, Args, Parser, Subcommand};
use color_eyre::eyre::{eyre, Context, Result};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

use trace_analysis::community::ComponentOracle;
use trace_analysis::engine::{AnalysisEngine, AnalysisReport, EngineConfig};
use trace_data::chain::ChainSource;
use trace_data::store::GraphStore;

#[derive(Debug, Clone)]
struct AppContext {
    db_path: String,
    rpc_url: Option<String>,
}

#[derive(Parser, Debug)]
#[command(name = "txtrace")]
#[command(about = "Transaction graph forensics toolkit")]
#[command(version)]
struct Cli {
    #[arg(long, short = 'v', action = ArgAction::Count, global = true)]
    verbose: u8,

    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    #[arg(long, global = true, default_value = "data/trace.sqlite")]
    db_path: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch transfers for a set of addresses and store them as a graph.
    Ingest(IngestArgs),
    /// Run the full analysis pipeline over a seed address set.
    Analyze(AnalyzeArgs),
    /// Show graph store counts.
    Status,
}

#[derive(Args, Debug)]
struct IngestArgs {
    /// Watched addresses (repeatable).
    #[arg(long, required = true)]
    address: Vec<String>,

    #[arg(long)]
    from_block: Option<u64>,

    #[arg(long)]
    to_block: Option<u64>,
}

/// Arguments for the `analyze` subcommand.
///
/// Fetches transfers for the seeds, rebuilds the stored graph, and runs
/// clustering, cycle, anomaly, washing, and community analysis.
#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// Seed addresses (repeatable).
    #[arg(long, required = true)]
    address: Vec<String>,

    #[arg(long)]
    from_block: Option<u64>,

    #[arg(long)]
    to_block: Option<u64>,

    /// Maximum simple-cycle length. Enumeration cost grows fast with
    /// this bound on dense graphs.
    #[arg(long, default_value_t = 6)]
    max_cycle_length: usize,

    /// Output format: table (default) or json.
    #[arg(long, default_value = "table")]
    output: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet)?;

    let ctx = AppContext {
        db_path: cli.db_path,
        rpc_url: std::env::var("TRACE_RPC_URL").ok(),
    };

    match cli.command {
        Commands::Ingest(args) => handle_ingest(&ctx, args).await,
        Commands::Analyze(args) => handle_analyze(&ctx, args).await,
        Commands::Status => handle_status(&ctx),
    }
}

fn init_tracing(verbose: u8, quiet: bool) -> Result<()> {
    let level = if quiet {
        Level::WARN
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level.as_str()))
        .wrap_err("failed to initialize tracing filter")?;

    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}

/// Resolves the `[from, to]` block range, defaulting to the latest
/// 1000 blocks when bounds are omitted.
async fn resolve_range(
    source: &ChainSource,
    from_block: Option<u64>,
    to_block: Option<u64>,
) -> Result<(u64, u64)> {
    let end = match to_block {
        Some(end) => end,
        None => source.latest_block().await?,
    };
    let start = from_block.unwrap_or(end.saturating_sub(1000));
    if start > end {
        return Err(eyre!(
            "invalid range: from-block {} is greater than to-block {}",
            start,
            end
        ));
    }
    Ok((start, end))
}

async fn handle_ingest(ctx: &AppContext, args: IngestArgs) -> Result<()> {
    let rpc_url = ctx
        .rpc_url
        .as_deref()
        .ok_or_else(|| eyre!("TRACE_RPC_URL is required for ingest command"))?;

    let store = GraphStore::new(&ctx.db_path).wrap_err("failed to open SQLite store")?;
    let source = ChainSource::new(rpc_url).await?;
    let (start, end) = resolve_range(&source, args.from_block, args.to_block).await?;

    let transfers = source
        .fetch_transfers(&args.address, start, end)
        .await
        .wrap_err("failed to fetch transfers")?;
    let transfers = trace_data::intake::normalize_transfers(transfers);

    let saved = store
        .save_graph(&transfers)
        .wrap_err("failed to save transfer graph")?;

    info!(
        from_block = start,
        to_block = end,
        saved,
        db_path = %ctx.db_path,
        "ingest command finished"
    );
    Ok(())
}

async fn handle_analyze(ctx: &AppContext, args: AnalyzeArgs) -> Result<()> {
    let rpc_url = ctx
        .rpc_url
        .as_deref()
        .ok_or_else(|| eyre!("TRACE_RPC_URL is required for analyze command"))?;

    let store = GraphStore::new(&ctx.db_path).wrap_err("failed to open SQLite store")?;
    let source = ChainSource::new(rpc_url).await?;
    let (start, end) = resolve_range(&source, args.from_block, args.to_block).await?;

    let transfers = source
        .fetch_transfers(&args.address, start, end)
        .await
        .wrap_err("failed to fetch transfers")?;

    let oracle = ComponentOracle;
    let config = EngineConfig {
        max_cycle_length: args.max_cycle_length,
        ..EngineConfig::default()
    };
    let engine = AnalysisEngine::new(&store, &oracle, config);
    let report = engine.analyze(&args.address, transfers)?;

    match args.output.as_str() {
        "json" => {
            let json = serde_json::to_string_pretty(&report)
                .wrap_err("failed to serialize analysis report")?;
            println!("{json}");
        }
        "table" => print_report_tables(&report),
        other => return Err(eyre!("unknown output format '{}'; use 'table' or 'json'", other)),
    }

    Ok(())
}

fn print_report_tables(report: &AnalysisReport) {
    let mut clusters = Table::new();
    clusters.load_preset(UTF8_BORDERS_ONLY);
    clusters.set_header(vec!["cluster", "members"]);
    for (idx, cluster) in report.clusters.iter().enumerate() {
        clusters.add_row(vec![format!("cluster_{idx}"), cluster.join(", ")]);
    }
    println!("{clusters}");

    let mut cycles = Table::new();
    cycles.load_preset(UTF8_BORDERS_ONLY);
    cycles.set_header(vec!["cycle", "length", "total value"]);
    for cycle in &report.cycles {
        cycles.add_row(vec![
            cycle.nodes.join(" → "),
            cycle.nodes.len().to_string(),
            cycle.total_value.to_string(),
        ]);
    }
    println!("{cycles}");

    let mut anomalies = Table::new();
    anomalies.load_preset(UTF8_BORDERS_ONLY);
    anomalies.set_header(vec!["node", "degree", "total value", "verdict"]);
    for info in report.anomalies.iter().filter(|a| a.score == 1) {
        anomalies.add_row(vec![
            info.node.clone(),
            info.degree.to_string(),
            info.total_value.to_string(),
            "anomaly".to_string(),
        ]);
    }
    println!("{anomalies}");

    let mut washing = Table::new();
    washing.load_preset(UTF8_BORDERS_ONLY);
    washing.set_header(vec!["tx hash", "mixing", "defi"]);
    for info in report.washing.iter().filter(|w| w.mixing || w.defi) {
        washing.add_row(vec![
            info.hash.clone(),
            info.mixing.to_string(),
            info.defi.to_string(),
        ]);
    }
    println!("{washing}");

    let mut communities = Table::new();
    communities.load_preset(UTF8_BORDERS_ONLY);
    communities.set_header(vec!["community", "members"]);
    for community in &report.communities.communities {
        communities.add_row(vec![community.id.to_string(), community.members.join(", ")]);
    }
    println!("{communities}");
}

fn handle_status(ctx: &AppContext) -> Result<()> {
    let store = GraphStore::new(&ctx.db_path).wrap_err("failed to open SQLite store")?;

    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["metric", "count"]);
    table.add_row(vec![
        "addresses".to_string(),
        store.node_count().wrap_err("failed to count nodes")?.to_string(),
    ]);
    table.add_row(vec![
        "transfers".to_string(),
        store.edge_count().wrap_err("failed to count edges")?.to_string(),
    ]);
    println!("{table}");

    Ok(())
}
