use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::io::{AsyncBufReadExt, BufReader};

use betsync::api::HttpProvider;
use betsync::config::Config;
use betsync::engine::{SyncEngine, SyncHandle};

/// Start defaults matching the provider's session form.
const DEFAULT_DURATION_MINUTES: u32 = 5;
const DEFAULT_TASK_INTERVAL_SECS: u32 = 15;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cfg = Config::load("config.toml").context("failed to load config")?;

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&cfg.general.log_level))
        .init();

    let session_id = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "demo-session".to_string());

    let provider = Arc::new(HttpProvider::new(cfg.provider.base_url.clone()));
    let handle = SyncEngine::spawn(provider, &cfg.poll);

    let session = handle
        .start(
            &session_id,
            DEFAULT_DURATION_MINUTES,
            DEFAULT_TASK_INTERVAL_SECS,
        )
        .await?;
    println!(
        "Session '{}' started for {} minutes",
        session.session_id, session.duration_minutes
    );
    println!("Commands: bid <ticket> <amount> | refresh | high | low | quit\n");

    let mut updates = handle.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                let remaining = snapshot
                    .time_remaining(Utc::now())
                    .map(|t| t.display())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "[{}] bids:{} total:{} bettors:{}",
                    remaining,
                    snapshot.total_count(),
                    snapshot.total_amount(),
                    snapshot.unique_participants()
                );
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if !run_command(&handle, line.trim()).await {
                    break;
                }
            }
        }
    }

    println!("Stopping session '{session_id}'...");
    if let Err(err) = handle.stop().await {
        eprintln!("Failed to stop session: {err}");
    }
    Ok(())
}

/// Returns false once the user asks to quit.
async fn run_command(handle: &SyncHandle, line: &str) -> bool {
    let parts: Vec<&str> = line.split_whitespace().collect();
    match parts.as_slice() {
        ["bid", ticket, amount] => match (ticket.parse::<u32>(), amount.parse::<Decimal>()) {
            (Ok(ticket), Ok(amount)) => match handle.submit_bid(ticket, amount).await {
                Ok(bid) => {
                    let snapshot = handle.snapshot();
                    println!(
                        "Bid of {} accepted; you have {} bid(s), your highest is {}",
                        bid.amount,
                        snapshot.bids_for(ticket).len(),
                        snapshot.highest_for(ticket)
                    );
                }
                Err(err) => eprintln!("Bid rejected: {err}"),
            },
            _ => eprintln!("Usage: bid <ticket> <amount>"),
        },
        ["refresh"] => {
            if let Err(err) = handle.refresh().await {
                eprintln!("Refresh failed: {err}");
            }
        }
        ["high"] => match handle.highest_bid().await {
            Ok(bid) => println!("Highest: {} by ticket {}", bid.amount, bid.participant_id),
            Err(err) => eprintln!("Highest unknown: {err}"),
        },
        ["low"] => match handle.lowest_bid().await {
            Ok(bid) => println!("Lowest: {} by ticket {}", bid.amount, bid.participant_id),
            Err(err) => eprintln!("Lowest unknown: {err}"),
        },
        ["quit"] | ["exit"] => return false,
        [] => {}
        _ => eprintln!("Commands: bid <ticket> <amount> | refresh | high | low | quit"),
    }
    true
}
