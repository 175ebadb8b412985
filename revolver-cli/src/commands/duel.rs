use anyhow::Context;
use dialoguer::Select;
use revolver_duel::{
    Action, DuelEngine, DuelError, DuelEvent, DuelNotice, MatchOutcome, ShotOutcome, Side,
};
use revolver_ledger::{Ledger, PlayerId};
use std::time::Duration;
use tokio::sync::broadcast::{self, error::TryRecvError};

/// The terminal counts as a single channel.
const TERMINAL_CHANNEL: u64 = 0;

const OPPONENT_THINKING: Duration = Duration::from_millis(900);
const SHOT_PAUSE: Duration = Duration::from_millis(400);

#[derive(Debug, Clone, Copy)]
enum Choice {
    Shoot(Action),
    Surrender,
}

pub async fn play_duel(
    engine: &DuelEngine,
    ledger: &dyn Ledger,
    player: PlayerId,
    bet: i64,
) -> anyhow::Result<()> {
    let mut notices = engine.subscribe();
    engine.start(player, TERMINAL_CHANNEL, bet).await?;

    loop {
        render_pending(&mut notices, player).await;

        let session = match engine.session(player).await {
            Ok(session) => session,
            Err(DuelError::NoActiveSession(_)) => break,
            Err(e) => return Err(e.into()),
        };

        // the forfeit clock started when the prompt opened, before the
        // paced rendering above
        let time_left = session
            .time_left()
            .unwrap_or_else(|| engine.config().choice_timeout());
        let choice = prompt_choice(time_left).await?;

        let result = match choice {
            Choice::Shoot(Action::ShootSelf) => engine.choose_self(player).await.map(|_| ()),
            Choice::Shoot(Action::ShootOpponent) => {
                engine.choose_opponent(player).await.map(|_| ())
            }
            Choice::Surrender => engine.surrender(player).await.map(|_| ()),
        };

        match result {
            Ok(()) => {}
            // the forfeit timer beat the answer
            Err(DuelError::NoActiveSession(_)) => {
                println!("Too slow! Duel {} was forfeited.", session.id());
            }
            Err(e) => return Err(e.into()),
        }
    }

    println!();
    println!("Balance for player {}: {}", player, ledger.balance(player).await?);
    Ok(())
}

async fn prompt_choice(time_left: Duration) -> anyhow::Result<Choice> {
    let prompt = prompt_text(time_left);
    let selection = tokio::task::spawn_blocking(move || {
        Select::new()
            .with_prompt(prompt)
            .items(&["Shoot yourself", "Shoot the opponent", "Surrender"])
            .default(0)
            .interact()
    })
    .await
    .context("Prompt task failed")??;

    Ok(match selection {
        0 => Choice::Shoot(Action::ShootSelf),
        1 => Choice::Shoot(Action::ShootOpponent),
        _ => Choice::Surrender,
    })
}

async fn render_pending(notices: &mut broadcast::Receiver<DuelNotice>, player: PlayerId) {
    loop {
        match notices.try_recv() {
            Ok(notice) if notice.player_id == player => render(&notice.event).await,
            Ok(_) => {}
            Err(TryRecvError::Lagged(missed)) => {
                tracing::warn!("Missed {} duel events", missed);
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
        }
    }
}

async fn render(event: &DuelEvent) {
    match event {
        DuelEvent::MatchStarted { bet, max_rounds } => {
            println!("Duel on! {} at stake over {} rounds.", bet, max_rounds);
        }
        DuelEvent::RoundStarted { round, lives } => {
            println!();
            println!("=== Round {} === ({} lives each)", round, lives);
        }
        DuelEvent::RevolverPrepared {
            chambers,
            bullets,
            commitment,
            reloaded,
            ..
        } => {
            if *reloaded {
                println!("The cylinder is spent. Reloading...");
            }
            println!("{} bullets loaded into {} chambers.", bullets, chambers);
            println!("  Commitment: {}", commitment);
        }
        DuelEvent::TurnPrompt {
            actor,
            chamber,
            chambers,
            player_lives,
            opponent_lives,
        } => {
            println!(
                "[chamber {}/{}] You: {} | Opponent: {}",
                chamber + 1,
                chambers,
                hearts(*player_lives),
                hearts(*opponent_lives)
            );
            if *actor == Side::Opponent {
                println!("The opponent is thinking...");
                tokio::time::sleep(OPPONENT_THINKING).await;
            }
        }
        DuelEvent::OpponentDecision { action, .. } => match action {
            Action::ShootSelf => println!("The opponent points the revolver at themself."),
            Action::ShootOpponent => println!("The opponent points the revolver at you."),
        },
        DuelEvent::Shot(shot) => {
            tokio::time::sleep(SHOT_PAUSE).await;
            println!("{}", describe_shot(shot));
        }
        DuelEvent::RevolverRevealed { layout, nonce, .. } => {
            let cylinder: Vec<&str> = layout
                .iter()
                .map(|&loaded| if loaded { "X" } else { "." })
                .collect();
            println!("Cylinder was [{}] (nonce {})", cylinder.join(" "), nonce);
        }
        DuelEvent::RoundEnded {
            round,
            winner,
            scoreboard,
        } => {
            let who = match winner {
                Side::Player => "You win",
                Side::Opponent => "The opponent wins",
            };
            println!(
                "{} round {}. Score: you {} - {} opponent",
                who, round, scoreboard.player, scoreboard.opponent
            );
        }
        DuelEvent::MatchEnded {
            outcome, payout, ..
        } => {
            println!();
            match outcome {
                MatchOutcome::PlayerWon => println!("You won the duel! +{}", payout),
                MatchOutcome::OpponentWon => println!("You lost the duel. {}", payout),
                MatchOutcome::Draw => println!("The duel is a draw. Bet returned."),
                MatchOutcome::Surrendered => println!("You surrendered. {}", payout),
                MatchOutcome::Forfeited => println!("Time ran out, duel forfeited. {}", payout),
            }
        }
    }
}

fn describe_shot(shot: &ShotOutcome) -> String {
    let at_self = shot.actor == shot.target;
    match (shot.loaded, shot.actor, at_self) {
        (true, Side::Player, true) => "BANG! You shot yourself.".to_string(),
        (true, Side::Player, false) => "BANG! You hit the opponent.".to_string(),
        (true, Side::Opponent, true) => "BANG! The opponent shot themself.".to_string(),
        (true, Side::Opponent, false) => "BANG! The opponent hit you.".to_string(),
        (false, Side::Player, true) => "*click* You survive and go again.".to_string(),
        (false, Side::Opponent, true) => {
            "*click* The opponent survives and goes again.".to_string()
        }
        (false, _, false) => "*click* Empty chamber.".to_string(),
    }
}

fn prompt_text(time_left: Duration) -> String {
    format!("Your move ({}s left)", time_left.as_secs())
}

fn hearts(lives: u32) -> String {
    "♥".repeat(lives as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shot(actor: Side, target: Side, loaded: bool) -> ShotOutcome {
        ShotOutcome {
            round: 1,
            chamber: 0,
            actor,
            target,
            loaded,
            player_lives: 3,
            opponent_lives: 3,
            next_turn: Side::Player,
            round_winner: None,
        }
    }

    #[test]
    fn test_describe_shot() {
        assert_eq!(
            describe_shot(&shot(Side::Opponent, Side::Player, true)),
            "BANG! The opponent hit you."
        );
        assert_eq!(
            describe_shot(&shot(Side::Player, Side::Player, false)),
            "*click* You survive and go again."
        );
    }

    #[test]
    fn test_prompt_shows_remaining_time() {
        assert_eq!(
            prompt_text(Duration::from_millis(27_600)),
            "Your move (27s left)"
        );
        assert_eq!(prompt_text(Duration::ZERO), "Your move (0s left)");
    }

    #[test]
    fn test_hearts() {
        assert_eq!(hearts(0), "");
        assert_eq!(hearts(3), "♥♥♥");
    }
}
