mod commands;
mod config;

use clap::{Parser, Subcommand};
use config::CliConfig;
use revolver_duel::{DuelEngine, DuelError};
use revolver_ledger::{LedgerError, PlayerId, SqliteLedger};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "revolver")]
#[command(about = "Revolver duels against the house, with a persistent ledger")]
#[command(version)]
struct Cli {
    /// Data directory for the ledger database
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON config file with optional "duel" and "ledger" sections
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a player's balance
    Balance {
        /// Player ID
        player: PlayerId,
    },
    /// Credit funds to a player
    Deposit {
        /// Player ID
        player: PlayerId,
        /// Amount to credit
        amount: i64,
    },
    /// Move funds between players
    Transfer {
        /// Sending player ID
        from: PlayerId,
        /// Receiving player ID
        to: PlayerId,
        /// Amount to move
        amount: i64,
    },
    /// Show a player's ledger entries
    History {
        /// Player ID
        player: PlayerId,
        /// Maximum number of entries
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
    /// Show the richest players
    Leaderboard {
        /// Number of players to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
    /// Play a duel against the house
    Duel {
        /// Player ID
        player: PlayerId,
        /// Amount to bet
        bet: i64,
        /// Seed for a reproducible match
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = CliConfig::load(cli.config.as_deref())?;
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }
    config.verbose |= cli.verbose;

    // Initialize logging
    let log_level = if config.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!(
            "revolver={},revolver_duel={},revolver_ledger={}",
            log_level, log_level, log_level
        )))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Ensure data directory exists
    tokio::fs::create_dir_all(&config.data_dir).await?;

    let ledger = Arc::new(SqliteLedger::with_config(&config.data_dir, config.ledger.clone()).await?);

    // Execute command
    let result = match cli.command {
        Commands::Balance { player } => commands::show_balance(&*ledger, player).await,
        Commands::Deposit { player, amount } => {
            commands::deposit(&*ledger, player, amount).await
        }
        Commands::Transfer { from, to, amount } => {
            commands::transfer(&*ledger, from, to, amount).await
        }
        Commands::History { player, limit } => {
            commands::show_history(&*ledger, player, limit).await
        }
        Commands::Leaderboard { limit } => commands::show_leaderboard(&ledger, limit).await,
        Commands::Duel { player, bet, seed } => {
            let mut duel_config = config.duel.clone();
            if seed.is_some() {
                duel_config.seed = seed;
            }
            match DuelEngine::new(duel_config, ledger.clone()) {
                Ok(engine) => commands::play_duel(&engine, &*ledger, player, bet).await,
                Err(e) => Err(e.into()),
            }
        }
    };

    if let Err(e) = result {
        report(&e);
        std::process::exit(1);
    }

    Ok(())
}

fn report(error: &anyhow::Error) {
    if let Some(e) = error.downcast_ref::<DuelError>() {
        match e {
            DuelError::SessionAlreadyActive(player) => {
                eprintln!("Error: Player {} is already in a duel", player);
            }
            DuelError::InsufficientFunds { need, available } => {
                eprintln!("Error: Insufficient funds");
                eprintln!("Need: {}, Available: {}", need, available);
                eprintln!("Use 'revolver deposit' to top up");
            }
            DuelError::InvalidBet(bet) => {
                eprintln!("Error: Bet must be greater than 0 (got {})", bet);
            }
            _ => eprintln!("Error: {}", e),
        }
        return;
    }

    match error.downcast_ref::<LedgerError>() {
        Some(LedgerError::InsufficientFunds { need, available }) => {
            eprintln!("Error: Insufficient funds");
            eprintln!("Need: {}, Available: {}", need, available);
        }
        Some(LedgerError::InvalidAmount(amount)) => {
            eprintln!("Error: Invalid amount: {}", amount);
        }
        _ => eprintln!("Error: {:#}", error),
    }
}
