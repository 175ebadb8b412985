use revolver_duel::{open_engine, DuelConfig, DuelEvent, Side};
use tempfile::tempdir;

/// Plays one seeded match on a throwaway ledger, always firing at the house.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let temp_dir = tempdir()?;
    println!("Using temporary directory: {:?}", temp_dir.path());

    let engine = open_engine(temp_dir.path(), DuelConfig::seeded(2024)).await?;
    let player = 1;

    let report = engine.start(player, 0, 50).await?;
    println!("Session {} started", report.session.id());

    let mut shots = 0;
    loop {
        let report = engine.choose_opponent(player).await?;
        shots += 1;

        for event in &report.events {
            if let DuelEvent::RoundEnded {
                round,
                winner,
                scoreboard,
            } = event
            {
                let who = if *winner == Side::Player { "player" } else { "house" };
                println!(
                    "Round {} to the {} ({}-{})",
                    round, who, scoreboard.player, scoreboard.opponent
                );
            }
        }

        if let Some(settlement) = report.settlement {
            println!(
                "\n{:?} after {} shots: payout {}, balance {}",
                settlement.outcome, shots, settlement.payout, settlement.balance_after
            );
            break;
        }
    }

    println!("\nExample completed successfully!");

    Ok(())
}
