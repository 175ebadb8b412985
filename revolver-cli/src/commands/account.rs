use comfy_table::{presets::UTF8_FULL, Table};
use revolver_ledger::{EntryReason, Ledger, LedgerError, PlayerId, SqliteLedger};

pub async fn show_balance(ledger: &dyn Ledger, player: PlayerId) -> anyhow::Result<()> {
    let balance = ledger.balance(player).await?;
    println!("Balance for player {}: {}", player, balance);
    Ok(())
}

pub async fn deposit(ledger: &dyn Ledger, player: PlayerId, amount: i64) -> anyhow::Result<()> {
    if amount <= 0 {
        return Err(LedgerError::InvalidAmount(amount).into());
    }

    let balance = ledger
        .adjust_balance(player, amount, EntryReason::Deposit)
        .await?;
    println!("Deposited {} for player {}", amount, player);
    println!("  New balance: {}", balance);
    Ok(())
}

pub async fn transfer(
    ledger: &dyn Ledger,
    from: PlayerId,
    to: PlayerId,
    amount: i64,
) -> anyhow::Result<()> {
    let (from_balance, to_balance) = ledger.transfer(from, to, amount).await?;
    println!("Transferred {} from player {} to player {}", amount, from, to);
    println!("  Player {}: {}", from, from_balance);
    println!("  Player {}: {}", to, to_balance);
    Ok(())
}

pub async fn show_history(
    ledger: &dyn Ledger,
    player: PlayerId,
    limit: usize,
) -> anyhow::Result<()> {
    println!("Ledger history for player {}:", player);

    let entries = ledger.history(player).await?;
    if entries.is_empty() {
        println!("No entries found.");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Date", "Reason", "Change", "Balance"]);

    for entry in entries.iter().take(limit) {
        let change = if entry.delta >= 0 {
            format!("+{}", entry.delta)
        } else {
            entry.delta.to_string()
        };

        table.add_row(vec![
            entry.timestamp.format("%Y-%m-%d %H:%M").to_string(),
            entry.reason.to_string(),
            change,
            entry.balance_after.to_string(),
        ]);
    }

    println!("{}", table);
    Ok(())
}

pub async fn show_leaderboard(ledger: &SqliteLedger, limit: usize) -> anyhow::Result<()> {
    let accounts = ledger.accounts().await?;
    if accounts.is_empty() {
        println!("No accounts yet.");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["#", "Player", "Balance"]);

    for (rank, (player, balance)) in accounts.iter().take(limit).enumerate() {
        table.add_row(vec![
            (rank + 1).to_string(),
            player.to_string(),
            balance.to_string(),
        ]);
    }

    println!("{}", table);
    Ok(())
}
