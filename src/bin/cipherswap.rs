//! CipherSwap shell
//!
//! Interactive front-end for the workflow layer, running against the
//! in-process devnet.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use prettytable::{Cell, Row, Table};
use rustyline::history::DefaultHistory;
use rustyline::Editor;

use cipherswap_sdk::logging::LogLevel;
use cipherswap_sdk::notifier::StatusPhase;
use cipherswap_sdk::view::{format_date, format_fees, format_volume, short_address, Tab};
use cipherswap_sdk::{setup_logging, App, Config, LocalDevnet};

#[derive(Parser)]
#[command(name = "cipherswap")]
#[command(about = "CipherSwap private DEX shell", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Connect this address on start
    #[arg(short, long)]
    address: Option<String>,

    /// Seed the devnet with demo pools
    #[arg(long)]
    seed: bool,

    /// Run a single shell command and exit
    #[arg(trailing_var_arg = true)]
    command: Vec<String>,
}

#[derive(Parser)]
#[command(no_binary_name = true, disable_help_subcommand = true)]
struct ShellLine {
    #[command(subcommand)]
    command: ShellCommand,
}

#[derive(Subcommand)]
enum ShellCommand {
    /// Connect a wallet address
    Connect { address: String },
    /// Disconnect the wallet
    Disconnect,
    /// Switch tab (swap, pools, stats)
    Tab { tab: Tab },
    /// List cached pools
    Pools,
    /// Reload pools from the contract
    Refresh,
    /// Create a pool with encrypted liquidity
    NewPool {
        liquidity: String,
        /// Token pair, e.g. ETH/ZAMA
        #[arg(short, long)]
        pair: Option<String>,
    },
    /// Open a pool's detail
    Select { pool_id: String },
    /// Close the pool detail
    Close,
    /// Decrypt and verify the selected pool's liquidity
    Decrypt,
    /// Swap tokens
    Swap {
        input_amount: String,
        output_amount: String,
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: Option<String>,
    },
    /// Recent trades
    Trades,
    /// Pool statistics
    Stats,
    /// Current notification
    Status,
    /// Show commands
    Help,
    /// Leave the shell
    #[command(alias = "exit")]
    Quit,
}

const DEMO_CREATOR: &str = "0x3C44CdDdB6a900fa2b585dd299e03d12FA4293BC";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let config = Config::load_or_create(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    let mut logging = config.logging.clone().with_env_overrides();
    if cli.verbose {
        logging.level = LogLevel::Debug;
    }
    setup_logging(&logging)?;

    let (mut app, devnet) = App::with_devnet(config);
    if cli.seed {
        seed_demo_pools(&devnet).await?;
    }
    if let Some(address) = &cli.address {
        if let Err(e) = app.connect(address).await {
            print_error(&e.to_string());
        }
    }

    if !cli.command.is_empty() {
        run_line(&mut app, cli.command).await;
        return Ok(());
    }

    println!("CipherSwap shell on {}", app.config().network.network_name);
    println!("Type 'help' for available commands, 'quit' to exit");

    let mut rl = Editor::<(), DefaultHistory>::new()?;
    loop {
        let prompt = match app.address() {
            Some(address) => format!("cipherswap [{}]> ", short_address(&address)),
            None => "cipherswap> ".to_string(),
        };
        let line = match rl.readline(&prompt) {
            Ok(line) => line,
            Err(_) => break,
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if let Err(e) = rl.add_history_entry(input) {
            tracing::debug!(error = %e, "history entry not recorded");
        }

        let args = match shell_words::split(input) {
            Ok(args) => args,
            Err(e) => {
                print_error(&format!("Error parsing command: {}", e));
                continue;
            }
        };
        if !run_line(&mut app, args).await {
            break;
        }
    }

    println!("Goodbye!");
    Ok(())
}

/// Execute one shell line; false once the user asked to quit
async fn run_line(app: &mut App, args: Vec<String>) -> bool {
    let command = match ShellLine::try_parse_from(args) {
        Ok(line) => line.command,
        Err(e) => {
            eprintln!("{}", e);
            return true;
        }
    };

    match command {
        ShellCommand::Quit => return false,
        ShellCommand::Help => print_help(),
        ShellCommand::Connect { address } => {
            if let Err(e) = app.connect(&address).await {
                print_error(&e.to_string());
            } else {
                print_success(&format!("Connected {}", short_address(&address)));
            }
        }
        ShellCommand::Disconnect => {
            app.disconnect();
            print_success("Disconnected");
        }
        ShellCommand::Tab { tab } => {
            app.view_mut().active_tab = tab;
            match tab {
                Tab::Swap => print_swap_form(app),
                Tab::Pools => print_pools(app).await,
                Tab::Stats => print_stats(app).await,
            }
        }
        ShellCommand::Pools => print_pools(app).await,
        ShellCommand::Refresh => {
            if app.refresh().await.is_ok() {
                print_pools(app).await;
            }
        }
        ShellCommand::NewPool { liquidity, pair } => {
            let view = app.view_mut();
            view.open_create_pool();
            if let Some(pair) = pair {
                view.new_pool_form.token_pair = pair;
            }
            view.new_pool_form.set_liquidity(&liquidity);
            match app.submit_create_pool().await {
                Ok(created) => println!("{} {}", "Pool id:".bold(), created.pool_id),
                Err(e) => tracing::debug!(error = %e, "create pool did not complete"),
            }
        }
        ShellCommand::Select { pool_id } => {
            if app.select_pool(&pool_id).await {
                print_pool_detail(app);
            } else {
                print_error(&format!("Unknown pool {}", pool_id));
            }
        }
        ShellCommand::Close => app.view_mut().close_pool_detail(),
        ShellCommand::Decrypt => {
            if app.decrypt_selected().await.is_ok() {
                print_pool_detail(app);
            }
        }
        ShellCommand::Swap {
            input_amount,
            output_amount,
            from,
            to,
        } => {
            let form = &mut app.view_mut().swap_form;
            if let Some(from) = from {
                form.input_token = from;
            }
            if let Some(to) = to {
                form.output_token = to;
            }
            form.input_amount = input_amount;
            form.output_amount = output_amount;
            if let Ok(trade) = app.submit_swap().await {
                println!(
                    "{} {} {} -> {} {}",
                    "Traded".bold(),
                    trade.input_amount,
                    trade.input_token,
                    trade.output_amount,
                    trade.output_token
                );
            }
        }
        ShellCommand::Trades => print_trades(app).await,
        ShellCommand::Stats => print_stats(app).await,
        ShellCommand::Status => {}
    }

    print_status(app);
    true
}

async fn seed_demo_pools(devnet: &LocalDevnet) -> anyhow::Result<()> {
    let demo = [
        ("pool-demo-1", "ETH/ZAMA", 25_000, true),
        ("pool-demo-2", "ZAMA/USDC", 180_000, false),
        ("pool-demo-3", "ETH/USDC", 9_500, false),
    ];
    for (id, pair, liquidity, verified) in demo {
        devnet
            .seed_pool(id, pair, liquidity, DEMO_CREATOR, verified)
            .await?;
    }
    tracing::info!(pools = demo.len(), "seeded demo pools");
    Ok(())
}

fn print_success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message);
}

fn print_status(app: &App) {
    let status = app.status();
    if !status.visible {
        return;
    }
    let line = format!("{} {}", status.phase.icon(), status.message);
    match status.phase {
        StatusPhase::Pending => println!("{}", line.yellow()),
        StatusPhase::Success => println!("{}", line.green()),
        StatusPhase::Error => println!("{}", line.red()),
    }
}

fn print_table(headers: Vec<&str>, rows: Vec<Vec<String>>) {
    let mut table = Table::new();
    table.set_titles(Row::new(headers.iter().map(|h| Cell::new(h)).collect()));
    for row in rows {
        table.add_row(Row::new(row.iter().map(|c| Cell::new(c)).collect()));
    }
    table.printstd();
}

async fn print_pools(app: &App) {
    let pools = app.pools().await;
    if pools.is_empty() {
        println!("No pools");
        return;
    }
    let rows = pools
        .iter()
        .map(|pool| {
            vec![
                pool.id.clone(),
                pool.token_pair.clone(),
                format_volume(pool.public_volume),
                format_fees(pool.public_fees),
                short_address(&pool.creator),
                format_date(pool.created_at),
                if pool.is_verified { "yes" } else { "no" }.to_string(),
            ]
        })
        .collect();
    print_table(
        vec!["ID", "Pair", "Volume", "Fees", "Creator", "Created", "Verified"],
        rows,
    );
}

fn print_pool_detail(app: &App) {
    let view = app.view();
    let pool = match &view.selected_pool {
        Some(pool) => pool,
        None => return,
    };
    println!("{}", pool.token_pair.bold());
    println!("  id:        {}", pool.id);
    println!("  creator:   {}", short_address(&pool.creator));
    println!("  created:   {}", format_date(pool.created_at));
    println!("  volume:    {}", format_volume(pool.public_volume));
    println!("  fees:      {}", format_fees(pool.public_fees));
    if let Some(label) = view.liquidity_label() {
        println!("  liquidity: {}", label);
    }
    if let Some(label) = view.verify_button_label(app.is_decrypting()) {
        println!("  [{}]", label);
    }
}

fn print_swap_form(app: &App) {
    let form = &app.view().swap_form;
    println!(
        "Swap {} -> {}  (tokens: {})",
        form.input_token,
        form.output_token,
        app.config().tokens.join(", ")
    );
}

async fn print_trades(app: &App) {
    let trades = app.trades().await;
    if trades.is_empty() {
        println!("No trades");
        return;
    }
    let rows = trades
        .iter()
        .map(|trade| {
            vec![
                trade.id.clone(),
                format!("{} {}", trade.input_amount, trade.input_token),
                format!("{} {}", trade.output_amount, trade.output_token),
                short_address(&trade.trader),
                format_date(trade.executed_at),
            ]
        })
        .collect();
    print_table(vec!["ID", "Sold", "Bought", "Trader", "Date"], rows);
}

async fn print_stats(app: &App) {
    let stats = app.stats().await;
    print_table(
        vec!["Pools", "Verified", "Volume", "Fees"],
        vec![vec![
            stats.total_pools.to_string(),
            stats.verified_pools.to_string(),
            format_volume(stats.total_volume),
            format_fees(stats.total_fees),
        ]],
    );
}

fn print_help() {
    println!("Available commands:");
    println!("  connect <address>                      Connect a wallet");
    println!("  disconnect                             Disconnect the wallet");
    println!("  tab <swap|pools|stats>                 Switch tab");
    println!("  pools                                  List pools");
    println!("  refresh                                Reload pools");
    println!("  new-pool <liquidity> [--pair A/B]      Create a pool");
    println!("  select <pool-id>                       Show pool detail");
    println!("  close                                  Close pool detail");
    println!("  decrypt                                Decrypt selected pool liquidity");
    println!("  swap <in> <out> [--from T] [--to T]    Swap tokens");
    println!("  trades                                 Recent trades");
    println!("  stats                                  Pool statistics");
    println!("  status                                 Current notification");
    println!("  quit                                   Exit");
}
