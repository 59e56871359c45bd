//! Teaswap CLI - swap TEA and SCID on TEA Sepolia from the terminal.
//!
//! The wallet is an in-process key (private key or mnemonic). Without one,
//! commands behave as the widget does when no wallet is installed.

#![allow(clippy::print_stdout)] // CLI program intentionally uses stdout

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use teaswap::prelude::*;
use teaswap::swap::SkipReason;
use teaswap::view::{self, format_address, format_balance};
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Teaswap - fixed-rate TEA/SCID swaps on TEA Sepolia
#[derive(Parser)]
#[command(name = "teaswap")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file path (JSON)
    #[arg(short, long, env = "TEASWAP_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Directory holding the persisted session flag
    #[arg(long, env = "TEASWAP_STATE_DIR", global = true)]
    state_dir: Option<PathBuf>,

    #[command(flatten)]
    wallet: WalletArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Wallet key material
#[derive(Args)]
struct WalletArgs {
    /// Hex private key of the wallet
    #[arg(long, env = "TEASWAP_PRIVATE_KEY", global = true, hide_env_values = true)]
    private_key: Option<String>,

    /// BIP39 mnemonic of the wallet
    #[arg(
        long,
        env = "TEASWAP_MNEMONIC",
        global = true,
        hide_env_values = true,
        conflicts_with = "private_key"
    )]
    mnemonic: Option<String>,

    /// HD derivation index used with --mnemonic
    #[arg(long, default_value_t = 0, global = true)]
    index: u32,

    /// JSON-RPC endpoint (defaults to the chain's first RPC URL)
    #[arg(long, env = "TEASWAP_RPC_URL", global = true)]
    rpc_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show connection state, account and network
    Status,

    /// Connect the wallet and remember the session
    Connect,

    /// Forget the session
    Disconnect,

    /// Quote the output for an input amount
    Quote(TradeArgs),

    /// Show balances of both tokens
    Balances,

    /// Execute a swap
    Swap(TradeArgs),
}

/// Arguments for the quote and swap commands
#[derive(Args)]
struct TradeArgs {
    /// Amount of the token being sold
    amount: String,

    /// Symbol of the token being sold
    #[arg(short, long, default_value = "TEA")]
    from: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("failed to create tokio runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match rt.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Initialize logging with the given verbosity level.
fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "teaswap={level},{}",
            if verbosity >= 2 { "alloy=debug" } else { "warn" }
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbosity >= 2)
        .init();
}

/// Main async entry point.
async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => SwapConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => SwapConfig::default(),
    };

    if let Commands::Quote(args) = &cli.command {
        return cmd_quote(&config, args);
    }

    let session = Arc::new(open_session(&cli, config).await?);
    let result = match cli.command {
        Commands::Status => cmd_status(&session).await,
        Commands::Connect => cmd_connect(&session).await,
        Commands::Disconnect => cmd_disconnect(&session).await,
        Commands::Balances => cmd_balances(Arc::clone(&session)).await,
        Commands::Swap(args) => cmd_swap(Arc::clone(&session), &args).await,
        Commands::Quote(_) => Ok(()),
    };

    for notice in session.notices().drain() {
        match notice {
            Notice::InstallWallet { ref url, .. } => println!("{notice}\n  {url}"),
            _ => println!("{notice}"),
        }
    }
    result
}

/// Build the session from the CLI wallet and state options.
async fn open_session(cli: &Cli, config: SwapConfig) -> anyhow::Result<WalletSession> {
    let state_dir = cli
        .state_dir
        .clone()
        .or_else(|| dirs_next::home_dir().map(|home| home.join(".teaswap")))
        .context("cannot determine a state directory; pass --state-dir")?;
    let store: Arc<dyn FlagStore> = Arc::new(FileStore::new(state_dir));

    let provider = open_wallet(&cli.wallet, &config)
        .await?
        .map(|wallet| Arc::new(wallet) as Arc<dyn Eip1193Provider>);

    let session = WalletSession::new(provider, store, config);
    session.restore().await;
    Ok(session)
}

async fn open_wallet(
    args: &WalletArgs,
    config: &SwapConfig,
) -> anyhow::Result<Option<LocalWallet>> {
    let builder = match (&args.private_key, &args.mnemonic) {
        (Some(key), _) => LocalWallet::builder().private_key(key),
        (None, Some(mnemonic)) => LocalWallet::builder().mnemonic(mnemonic).index(args.index),
        (None, None) => return Ok(None),
    };

    let rpc_url = args
        .rpc_url
        .as_deref()
        .or_else(|| config.chain.rpc_url())
        .context("no RPC URL configured")?;

    let wallet = builder
        .rpc_url(rpc_url)
        .chain(config.chain.clone())
        .build()
        .await
        .context("failed to open wallet")?;
    Ok(Some(wallet))
}

/// Show the session.
async fn cmd_status(session: &WalletSession) -> anyhow::Result<()> {
    let config = session.config();
    let snapshot = session.snapshot().await;

    println!("Wallet:    {}", if session.has_provider() { "present" } else { "not installed" });
    match session.state().await {
        ConnectionState::Disconnected | ConnectionState::Connecting => {
            println!("State:     disconnected");
        }
        ConnectionState::Connected(status) => {
            println!("State:     connected");
            if let Some(address) = snapshot.address {
                println!("Account:   {} ({address})", format_address(&address));
            }
            let network = match status {
                NetworkStatus::RightChain => config.chain.chain_name.clone(),
                NetworkStatus::WrongChain => format!(
                    "wrong network (chain {})",
                    snapshot.chain_id.map_or_else(|| "unknown".into(), |id| id.to_string())
                ),
            };
            println!("Network:   {network}");
        }
    }
    println!(
        "Reconnect: {}",
        if session.auto_reconnect().await { "on" } else { "off" }
    );
    Ok(())
}

/// Connect and remember the session.
async fn cmd_connect(session: &WalletSession) -> anyhow::Result<()> {
    if !session.snapshot().await.connected && !session.connect().await {
        bail!("wallet not connected");
    }
    cmd_status(session).await
}

/// Forget the session.
async fn cmd_disconnect(session: &WalletSession) -> anyhow::Result<()> {
    session.disconnect().await;
    println!(
        "{}",
        view::connect_button_label(false, &session.config().wallet_name)
    );
    Ok(())
}

/// Print the derived output amount.
fn cmd_quote(config: &SwapConfig, args: &TradeArgs) -> anyhow::Result<()> {
    let mut form = SwapForm::from_config(config);
    select_from(&mut form, config, &args.from)?;
    form.set_amount_from(args.amount.as_str());

    let output = form.amount_to();
    if output.is_empty() {
        bail!("invalid amount '{}'", args.amount);
    }
    println!(
        "{} {} = {output} {}",
        args.amount,
        form.token_from().symbol,
        form.token_to().symbol
    );
    Ok(())
}

/// Print both balances.
async fn cmd_balances(session: Arc<WalletSession>) -> anyhow::Result<()> {
    let mut ui = ready_interface(session).await?;
    let places = ui.session().config().balance_precision;
    if !ui.refresh_balances().await {
        bail!("balances unavailable: not connected to the required network");
    }
    let form = ui.form();
    println!(
        "{}: {}",
        form.token_from().symbol,
        format_balance(form.balance_from(), places)
    );
    println!(
        "{}: {}",
        form.token_to().symbol,
        format_balance(form.balance_to(), places)
    );
    Ok(())
}

/// Run a swap end to end.
async fn cmd_swap(session: Arc<WalletSession>, args: &TradeArgs) -> anyhow::Result<()> {
    let mut ui = ready_interface(session).await?;
    let config = Arc::clone(ui.session().config());
    select_from(ui.form_mut(), &config, &args.from)?;
    ui.form_mut().set_amount_from(args.amount.as_str());
    ui.refresh_balances().await;

    println!(
        "{} {} -> {} {}",
        args.amount,
        ui.form().token_from().symbol,
        ui.form().amount_to(),
        ui.form().token_to().symbol
    );
    println!("{}", ui.button().await.label);

    match ui.execute_swap().await {
        SwapOutcome::Completed { .. } => {
            if let Some(panel) = ui.receipt_panel() {
                println!("{}", panel.title);
                println!("{}", panel.message);
                println!("Transaction: {}", panel.short_hash);
                println!("Explorer:    {}", panel.explorer_url);
            }
            Ok(())
        }
        SwapOutcome::Skipped(SkipReason::EmptyAmount) => bail!("amount is empty"),
        SwapOutcome::Skipped(SkipReason::WrongChain) => {
            bail!("wallet is not on {}", config.chain.chain_name)
        }
        SwapOutcome::Skipped(reason) => bail!("swap skipped: {reason:?}"),
        SwapOutcome::NoWallet => bail!("no wallet configured"),
        SwapOutcome::ConnectRequested { .. } => bail!("wallet not connected"),
        SwapOutcome::Failed => bail!("swap failed"),
    }
}

/// A swap interface over a connected session on the required chain.
async fn ready_interface(session: Arc<WalletSession>) -> anyhow::Result<SwapInterface> {
    if !session.has_provider() {
        session.prompt_install();
        bail!("no wallet configured");
    }
    if !session.snapshot().await.connected && !session.connect().await {
        bail!("wallet not connected");
    }
    session.reconcile().await;
    Ok(SwapInterface::new(session))
}

/// Put the token named `symbol` on the "from" side.
fn select_from(form: &mut SwapForm, config: &SwapConfig, symbol: &str) -> anyhow::Result<()> {
    let token = config
        .tokens
        .by_symbol(symbol)
        .with_context(|| format!("unknown token '{symbol}'"))?;
    if token.address == form.token_to().address {
        form.flip_pair();
    }
    Ok(())
}
