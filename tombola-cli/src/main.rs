mod commands;
mod sim;

use clap::{Parser, Subcommand};
use sim::{SimEnv, ADMIN, ENGINE_ID, RESERVE_ACCOUNT};
use std::path::PathBuf;
use std::sync::Arc;
use tombola_core::{LotteryEngine, LotteryError, PayoutVault, Storage};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "tombola")]
#[command(about = "Stake-weighted transfer lottery - engine console")]
#[command(version)]
struct Cli {
    /// Data directory for the entry database and simulated environment
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Swap tokens into the pool and roll for a lottery entry
    Swap {
        /// Account making the transfer
        user: String,

        /// Token amount to swap (e.g. 1000 or 0.5)
        amount: String,

        /// Token being transferred
        #[arg(short, long, default_value = sim::DEFAULT_TOKEN)]
        token: String,

        /// USD value override (skips the oracle)
        #[arg(long)]
        usd: Option<String>,

        /// Processor identity submitting the transfer
        #[arg(long, default_value = sim::DEFAULT_PROCESSOR)]
        processor: String,
    },

    /// Deliver queued randomness callbacks
    Deliver {
        /// Deliver only this entry (e.g. local:3)
        #[arg(short, long)]
        key: Option<String>,

        /// Spoof the callback source identity
        #[arg(long)]
        source: Option<String>,
    },

    /// Sweep pending entries past the timeout
    Expire,

    /// Engine and reserve overview
    Status,

    /// List pending entries
    Entries,

    /// Lifetime stats, for one account or the whole leaderboard
    Stats {
        /// Account to inspect (all accounts when omitted)
        account: Option<String>,
    },

    /// Preview the win chance for an account and USD amount
    Quote {
        /// Account the quote is for
        account: String,

        /// Entry value in USD (e.g. 100 or 12.5)
        usd: String,
    },

    /// Top up wallets, the reserve, shares, fees, or stake
    #[command(subcommand)]
    Fund(commands::FundCommands),

    /// Engine administration and environment controls
    #[command(subcommand)]
    Admin(commands::AdminCommands),

    /// Run a batch of entries end to end
    Simulate {
        /// Number of transfers to submit
        #[arg(short, long, default_value_t = 200)]
        entries: u32,

        /// Comma-separated accounts to draw from
        #[arg(short, long, default_value = "alice,bob,carol")]
        users: String,

        /// USD value per entry
        #[arg(long, default_value = "5000")]
        usd: String,

        /// Seed for the user picker
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!(
            "tombola={}",
            log_level
        )))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Get data directory
    let data_dir = cli.data_dir.unwrap_or_else(|| {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tombola")
    });

    // Ensure data directory exists
    tokio::fs::create_dir_all(&data_dir).await?;

    // Simulated market, providers, and a fresh engine over the shared database
    let env = SimEnv::load(&data_dir.join("sim.json"))?;
    let storage = Arc::new(Storage::new(&data_dir.join("tombola.db")).await?);

    let settings = env.engine_settings();
    let vault = PayoutVault::new(RESERVE_ACCOUNT, env.token(), vec![env.share_vault()]);
    let engine = LotteryEngine::new(
        settings.config,
        ENGINE_ID,
        ADMIN,
        storage,
        env.providers(),
        vault,
    )?;
    for processor in &settings.processors {
        engine.authorize_processor(ADMIN, processor)?;
    }
    if settings.paused {
        engine.pause(ADMIN)?;
    }
    if settings.fee_balance > 0 {
        engine.fund_fees(ADMIN, settings.fee_balance)?;
    }

    // Execute command
    let result = match cli.command {
        Commands::Swap {
            user,
            amount,
            token,
            usd,
            processor,
        } => {
            commands::handle_swap(
                &engine,
                &env,
                &processor,
                &user,
                &token,
                &amount,
                usd.as_deref(),
            )
            .await
        }
        Commands::Deliver { key, source } => {
            commands::handle_deliver(&engine, &env, key.as_deref(), source.as_deref()).await
        }
        Commands::Expire => commands::handle_expire(&engine, &env).await,
        Commands::Status => commands::handle_status(&engine, &env).await,
        Commands::Entries => commands::handle_entries(&engine).await,
        Commands::Stats { account } => commands::handle_stats(&engine, account.as_deref()).await,
        Commands::Quote { account, usd } => commands::handle_quote(&engine, &account, &usd).await,
        Commands::Fund(cmd) => commands::handle_fund_command(cmd, &engine, &env).await,
        Commands::Admin(cmd) => commands::handle_admin_command(cmd, &engine, &env).await,
        Commands::Simulate {
            entries,
            users,
            usd,
            seed,
        } => commands::handle_simulate(&engine, &env, entries, &users, &usd, seed).await,
    };

    // Engine-held state survives between invocations through the environment file
    env.store_engine_settings(engine.config(), engine.is_paused(), engine.fee_balance());
    env.save()?;

    if let Err(e) = result {
        match e {
            LotteryError::Paused => {
                eprintln!("Error: Entry processing is paused");
                eprintln!("Resume with: tombola admin resume");
            }
            LotteryError::Unauthorized(msg) => {
                eprintln!("Error: Unauthorized: {}", msg);
            }
            LotteryError::UnknownEntry(key) => {
                eprintln!("Error: No pending entry '{}'", key);
                eprintln!("Use 'tombola entries' to see what is waiting");
            }
            LotteryError::InsufficientLiquidity { need, available } => {
                eprintln!("Error: Reserve cannot cover the payout");
                eprintln!("Need: {} units, Available: {} units", need, available);
                eprintln!("Top up with 'tombola fund jackpot <amount>'");
            }
            LotteryError::Token(msg) => {
                eprintln!("Error: Token transfer failed: {}", msg);
                eprintln!("Fund the account with 'tombola fund wallet <account> <amount>'");
            }
            _ => {
                eprintln!("Error: {}", e);
            }
        }
        std::process::exit(1);
    }

    Ok(())
}
