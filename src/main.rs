//! Manifold betting tools entry point.

use std::time::Duration;

use anyhow::Context;
use clap::{Args as ClapArgs, Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rust_decimal::Decimal;
use time::OffsetDateTime;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use manifold_bets::cache::CachedClient;
use manifold_bets::config::Config;
use manifold_bets::forecast::{simulate_series, ForecastEngine, HttpFetcher};
use manifold_bets::market::{ManifoldClient, MarketApi, MarketFilter, ResolvedMarkets, SnapshotStore};
use manifold_bets::pricing::BetThresholds;
use manifold_bets::registry::{registry_stub, Registry};
use manifold_bets::strategy::{
    bet_random, bet_single, ArbBetter, ArbParams, ArbSettings, RandomSettings, Sizing,
    ValueBetter, ValueParams, ValueSettings,
};

const RULE: &str = "======================================================================";

/// Betting tools for Manifold prediction markets.
#[derive(Parser, Debug)]
#[command(name = "manifold-bets")]
#[command(about = "Value, arbitrage and random betting on Manifold markets")]
#[command(version)]
struct Args {
    /// Enable verbose logging (also logs markets without a bet).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Bet registry markets toward their forecast.
    Value(ValueArgs),

    /// Bet pairs of registry markets on the same event toward each other.
    Arb(ArbArgs),

    /// Place small random bets on snapshot markets.
    Random(RandomArgs),

    /// Print registry stubs for snapshot markets not yet tracked.
    FindMarkets(FindArgs),

    /// Download all markets into a dated snapshot.
    Snapshot,

    /// Simulate best-of-n series from a per-game win probability.
    SimulateSeries(SeriesArgs),

    /// Check configuration validity.
    CheckConfig,

    /// Check account balance and connection.
    CheckBalance,
}

#[derive(ClapArgs, Debug)]
struct ValueArgs {
    /// Amount to bet.
    #[arg(short, long, default_value = "10")]
    amount: Decimal,

    /// Minimum bet amount.
    #[arg(long, default_value = "1")]
    min_bet: Decimal,

    /// Margin to trigger a bet, in percent.
    #[arg(short, long, default_value = "2")]
    margin: Decimal,

    /// Do not trade within this many percent of 0 and 100.
    #[arg(short, long, default_value = "5")]
    tail: Decimal,

    /// Number of rounds.
    #[arg(short, long, default_value = "1")]
    repeat: u32,

    /// Log bets instead of placing them.
    #[arg(short, long)]
    dry_run: bool,

    /// Size bets with the Kelly criterion instead of a fixed amount.
    #[arg(short = 'k', long)]
    use_kelly: bool,

    /// Kelly scale factor.
    #[arg(long, default_value = "0.1")]
    kelly_scale: Decimal,

    /// Seconds to sleep after each bet.
    #[arg(short, long, default_value = "8")]
    sleep: u64,

    /// Question filter; a leading '-' negates it.
    #[arg(short, long, allow_hyphen_values = true)]
    filter: Option<String>,

    /// Maximum group position in shares.
    #[arg(long, default_value = "1000")]
    max_shares: Decimal,

    /// Only place bets that shrink a position.
    #[arg(short, long)]
    liquidation: bool,
}

#[derive(ClapArgs, Debug)]
struct ArbArgs {
    /// Base amount per leg.
    #[arg(short, long, default_value = "10")]
    amount: Decimal,

    /// Minimum leg amount.
    #[arg(long, default_value = "1")]
    min_bet: Decimal,

    /// Margin to trigger a bet, in percent (at least 1).
    #[arg(short, long, default_value = "1")]
    margin: Decimal,

    /// Number of rounds.
    #[arg(short, long, default_value = "1")]
    repeat: u32,

    /// Log bets instead of placing them.
    #[arg(short, long)]
    dry_run: bool,

    /// Seconds to sleep after each pair bet.
    #[arg(short, long, default_value = "8")]
    sleep: u64,

    /// Question filter; a leading '-' negates it.
    #[arg(short, long, allow_hyphen_values = true)]
    filter: Option<String>,
}

#[derive(ClapArgs, Debug)]
struct SelectArgs {
    /// Terms that must appear in the question.
    #[arg(short, long)]
    question: Option<String>,

    /// Terms that must not appear in the question.
    #[arg(long)]
    neg_question: Option<String>,

    /// Creator to look for.
    #[arg(short, long)]
    creator: Option<String>,

    /// Creator to avoid.
    #[arg(long)]
    neg_creator: Option<String>,

    /// Include markets already in the registry.
    #[arg(short, long)]
    include_registry: bool,

    /// Only markets not updated for about three months.
    #[arg(short, long)]
    old: bool,
}

#[derive(ClapArgs, Debug)]
struct RandomArgs {
    /// Amount per bet.
    #[arg(short, long, default_value = "1")]
    amount: Decimal,

    /// Maximum number of markets to bet on.
    #[arg(short, long, default_value = "10")]
    limit: usize,

    /// Bet on this market only.
    #[arg(long)]
    market: Option<String>,

    /// Log bets instead of placing them.
    #[arg(short, long)]
    dry_run: bool,

    /// Seconds to sleep after each bet.
    #[arg(short, long, default_value = "8")]
    sleep: u64,

    #[command(flatten)]
    select: SelectArgs,
}

#[derive(ClapArgs, Debug)]
struct FindArgs {
    /// Also list non-binary markets.
    #[arg(long)]
    all_kinds: bool,

    #[command(flatten)]
    select: SelectArgs,
}

#[derive(ClapArgs, Debug)]
struct SeriesArgs {
    /// Probability of team 1 winning a game.
    #[arg(short, long, default_value = "0.5")]
    p_team1: f64,

    /// Number of series to simulate.
    #[arg(short, long, default_value = "10000")]
    n_simulations: u64,

    /// Games per series.
    #[arg(short = 'g', long, default_value = "7")]
    n_games: u32,

    /// Seed for reproducible runs.
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Initialize logging
    let filter = if args.verbose {
        EnvFilter::new("manifold_bets=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match args.command {
        Command::Value(value) => cmd_value(value).await,
        Command::Arb(arb) => cmd_arb(arb).await,
        Command::Random(random) => cmd_random(random).await,
        Command::FindMarkets(find) => cmd_find_markets(find),
        Command::Snapshot => cmd_snapshot().await,
        Command::SimulateSeries(series) => cmd_simulate_series(series),
        Command::CheckConfig => cmd_check_config(),
        Command::CheckBalance => cmd_check_balance().await,
    }
}

/// Percent argument as a fraction.
fn percent(value: Decimal) -> Decimal {
    value / Decimal::ONE_HUNDRED
}

/// Load and validate the configuration for commands that bet.
fn load_betting_config() -> anyhow::Result<Config> {
    info!("Loading configuration...");
    let config = Config::load().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(anyhow::anyhow!("Configuration validation failed: {}", e));
    }
    Ok(config)
}

fn market_client(config: &Config) -> anyhow::Result<CachedClient<ManifoldClient>> {
    let client = ManifoldClient::new(config)?;
    Ok(CachedClient::new(client, config.market_cache_ttl()))
}

/// Registry at the configured path; a missing file is an empty registry.
fn load_registry(config: &Config) -> anyhow::Result<Registry> {
    if !config.registry_path.exists() {
        warn!(path = %config.registry_path.display(), "No registry file, using an empty registry");
        return Ok(Registry::default());
    }
    Ok(Registry::load(&config.registry_path)?)
}

fn market_filter(select: SelectArgs, registry: &Registry, binary_only: bool) -> MarketFilter {
    MarketFilter {
        binary_only,
        question: select.question,
        neg_question: select.neg_question,
        creator: select.creator,
        neg_creator: select.neg_creator,
        exclude_ids: if select.include_registry {
            Default::default()
        } else {
            registry.ids().map(str::to_string).collect()
        },
        old: select.old,
    }
}

/// Bet registry markets toward their forecast.
async fn cmd_value(args: ValueArgs) -> anyhow::Result<()> {
    let thresholds = BetThresholds::new(percent(args.margin), percent(args.tail))?;
    let sizing = if args.use_kelly {
        Sizing::Kelly {
            scale: args.kelly_scale,
        }
    } else {
        Sizing::Fixed(args.amount)
    };
    let params = ValueParams {
        min_bet: args.min_bet,
        max_shares: args.max_shares,
        liquidation_only: args.liquidation,
        ..ValueParams::new(thresholds, sizing)
    };

    let config = load_betting_config()?;
    info!(
        amount = %args.amount,
        min_bet = %args.min_bet,
        margin = %thresholds.margin(),
        tail = %thresholds.tail(),
        repeat = args.repeat,
        dry_run = args.dry_run,
        use_kelly = args.use_kelly,
        kelly_scale = %args.kelly_scale,
        max_shares = %args.max_shares,
        liquidation = args.liquidation,
        "Value betting settings"
    );
    info!("Mode: {}", if args.dry_run { "DRY RUN" } else { "LIVE BETTING" });

    let client = market_client(&config)?;
    let engine = ForecastEngine::new(HttpFetcher::new(&config)?);
    let registry = load_registry(&config)?;
    let mut resolved = ResolvedMarkets::load(&config.resolved_markets_path)?;
    let mut rng = StdRng::from_entropy();

    let settings = ValueSettings {
        params,
        dry_run: args.dry_run,
        question_filter: args.filter,
        sleep: Duration::from_secs(args.sleep),
    };
    let mut better = ValueBetter::new(&client, &engine, &registry, &mut resolved, settings);
    let bets_made = better.run(args.repeat, &mut rng).await?;

    info!(bets_made, "Value betting finished");
    Ok(())
}

/// Bet registry pairs toward each other.
async fn cmd_arb(args: ArbArgs) -> anyhow::Result<()> {
    let mut params = ArbParams::new(percent(args.margin), args.amount)?;
    params.min_bet = args.min_bet;

    let config = load_betting_config()?;
    info!(
        amount = %args.amount,
        min_bet = %args.min_bet,
        margin = %params.margin(),
        repeat = args.repeat,
        dry_run = args.dry_run,
        "Arbitrage settings"
    );

    let client = market_client(&config)?;
    let registry = load_registry(&config)?;
    let mut resolved = ResolvedMarkets::load(&config.resolved_markets_path)?;
    let mut rng = StdRng::from_entropy();

    let settings = ArbSettings {
        params,
        dry_run: args.dry_run,
        question_filter: args.filter,
        sleep: Duration::from_secs(args.sleep),
    };

    let mut pairs_bet = 0;
    for round in 1..=args.repeat {
        info!(round, repeat = args.repeat, "Starting arbitrage round");
        let pairs = registry.pairs(&resolved, &mut rng);
        let mut better = ArbBetter::new(&client, &mut resolved, settings.clone());
        let summary = better.run(&pairs).await?;
        pairs_bet += summary.pairs_bet;
        if summary.balance_exhausted {
            break;
        }
    }

    info!(pairs_bet, "Arbitrage finished");
    Ok(())
}

/// Random bets on snapshot markets, or on one market.
async fn cmd_random(args: RandomArgs) -> anyhow::Result<()> {
    let config = load_betting_config()?;
    let client = ManifoldClient::new(&config)?;
    let mut rng = StdRng::from_entropy();

    if let Some(market_id) = args.market.as_deref() {
        let placement = bet_single(&client, market_id, args.amount, args.dry_run, &mut rng).await?;
        info!(market_id, ?placement, "Single random bet");
        return Ok(());
    }

    let registry = load_registry(&config)?;
    let markets = SnapshotStore::new(&config.snapshot_dir).latest()?;
    let filter = market_filter(args.select, &registry, false);
    let candidates = filter.apply(&markets, OffsetDateTime::now_utc());
    info!(snapshot = markets.len(), candidates = candidates.len(), "Selected markets");

    let settings = RandomSettings {
        amount: args.amount,
        limit: args.limit,
        dry_run: args.dry_run,
        sleep: Duration::from_secs(args.sleep),
    };
    let count = bet_random(&client, &candidates, &settings, &mut rng).await?;
    println!("Successfully bet on {} markets.", count);
    Ok(())
}

/// Print registry stubs for untracked snapshot markets.
fn cmd_find_markets(args: FindArgs) -> anyhow::Result<()> {
    let config = Config::load()?;
    let registry = load_registry(&config)?;
    let markets = SnapshotStore::new(&config.snapshot_dir).latest()?;
    let filter = market_filter(args.select, &registry, !args.all_kinds);

    let mut found = Registry::default();
    for market in filter.apply(&markets, OffsetDateTime::now_utc()) {
        let (id, entry) = registry_stub(market);
        found.insert(id, entry);
    }

    println!("{}", serde_json::to_string_pretty(&found)?);
    println!("Found {} markets.", found.len());
    Ok(())
}

/// Download all markets into today's snapshot.
async fn cmd_snapshot() -> anyhow::Result<()> {
    let config = Config::load()?;
    let client = ManifoldClient::new(&config)?;
    let store = SnapshotStore::new(&config.snapshot_dir);

    info!("Downloading all markets...");
    let markets = client.all_markets().await?;
    let today = chrono::Utc::now().date_naive();
    let path = store
        .save(&markets, today)
        .with_context(|| format!("saving snapshot to {}", store.dir().display()))?;
    info!(path = %path.display(), markets = markets.len(), "Snapshot saved");

    for removed in store.clean_up()? {
        info!(path = %removed.display(), "Removed old snapshot");
    }
    Ok(())
}

/// Monte-Carlo series results.
fn cmd_simulate_series(args: SeriesArgs) -> anyhow::Result<()> {
    if !(0.0..=1.0).contains(&args.p_team1) {
        anyhow::bail!("p-team1 must be between 0 and 1, got {}", args.p_team1);
    }
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let results = simulate_series(args.p_team1, args.n_simulations, args.n_games, &mut rng);
    let total = results.total().max(1) as f64;
    for ((wins_1, wins_2), n) in &results.scores {
        println!("{wins_1}-{wins_2}: {n:5} ({:5.2} %)", *n as f64 / total * 100.0);
    }
    println!("\nTeam 1 wins {:5.2} % of the series", results.team_1_share() * 100.0);
    Ok(())
}

/// Check configuration validity.
fn cmd_check_config() -> anyhow::Result<()> {
    println!("{RULE}");
    println!("MANIFOLD BETS - CONFIGURATION CHECK");
    println!("{RULE}");

    // Load configuration
    print!("Loading configuration... ");
    let config = match Config::load() {
        Ok(c) => {
            println!("OK");
            c
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration load failed"));
        }
    };

    // Validate configuration
    print!("Validating configuration... ");
    match config.validate() {
        Ok(()) => println!("OK"),
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration validation failed"));
        }
    }

    // Check registry
    print!("Loading registry... ");
    match load_registry(&config) {
        Ok(registry) => {
            println!("OK");
            println!("  Tracked markets: {}", registry.len());
            println!("  With forecast: {}", registry.forecasts().count());
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Registry invalid"));
        }
    }

    // Show configuration summary
    println!("----------------------------------------------------------------------");
    println!("Configuration Summary:");
    println!("  API URL: {}", config.manifold_api_url);
    println!("  Username: {}", config.manifold_username.as_deref().unwrap_or("-"));
    println!("  Registry: {}", config.registry_path.display());
    println!("  Resolved Markets: {}", config.resolved_markets_path.display());
    println!("  Snapshots: {}", config.snapshot_dir.display());
    println!("  HTTP Timeout: {}ms", config.http_timeout_ms);
    println!("  Market Cache: {}s", config.market_cache_seconds);
    println!("  Scrape Cache: {}s", config.scrape_cache_seconds);
    println!("{RULE}");
    println!("CONFIGURATION CHECK PASSED");
    println!("{RULE}");

    Ok(())
}

/// Check account balance and connection.
async fn cmd_check_balance() -> anyhow::Result<()> {
    println!("{RULE}");
    println!("MANIFOLD BETS - BALANCE CHECK");
    println!("{RULE}");

    let config = Config::load()?;
    config.validate().map_err(|e| anyhow::anyhow!(e))?;

    println!("Host: {}", config.manifold_api_url);
    println!("API Key: present");
    println!("{RULE}");

    // Create client
    print!("\n1. Creating client... ");
    let client = ManifoldClient::new(&config)?;
    println!("OK");

    // Get balance
    print!("\n2. Getting balance... ");
    match client.get_balance().await {
        Ok(balance) => {
            println!("OK");
            println!("   Balance: {:.0} M", balance);
        }
        Err(e) => {
            println!("FAILED");
            println!("   Error: {}", e);
        }
    }

    println!("\n{RULE}");
    println!("BALANCE CHECK COMPLETED");
    println!("{RULE}");

    Ok(())
}
