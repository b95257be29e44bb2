use comfy_table::{presets::UTF8_FULL, Table};
use tombola_core::{EntryKey, EntryOutcome, LotteryEngine, LotteryError, Result};

use super::{format_tokens, format_word, parse_entry_key};
use crate::sim::SimEnv;

/// Plays queued randomness callbacks into the engine.
///
/// Without a key every queued callback is delivered; with one only that
/// entry is resolved. `source` overrides the caller identity to exercise
/// the rejection path.
pub async fn handle_deliver(
    engine: &LotteryEngine,
    env: &SimEnv,
    key: Option<&str>,
    source: Option<&str>,
) -> Result<()> {
    let keys = match key {
        Some(raw) => vec![parse_entry_key(raw)?],
        None => env.queued(),
    };
    if keys.is_empty() {
        println!("No randomness callbacks queued. Open an entry with 'tombola swap' first.");
        return Ok(());
    }

    let deliveries = keys.into_iter().map(|key| {
        let word = env.word_for(key);
        let from = source
            .map(str::to_string)
            .unwrap_or_else(|| env.source_for(key).to_string());
        async move {
            let result = match key {
                EntryKey::Local(id) => engine.handle_local_callback(&from, id, &[word]).await,
                EntryKey::CrossDomain(id) => {
                    engine.handle_cross_domain_callback(&from, id, &[word]).await
                }
            };
            (key, word, result)
        }
    });
    let results = futures::future::join_all(deliveries).await;

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Entry", "Word", "Outcome", "Reward"]);

    let mut wins = 0usize;
    for (key, word, result) in results {
        match result {
            Ok(outcome) => {
                env.remove_queued(key);
                if outcome.won {
                    wins += 1;
                }
                table.add_row(outcome_row(key, word, &outcome));
            }
            Err(LotteryError::UnknownEntry(_)) => {
                // expired or already resolved, nothing left to deliver
                env.remove_queued(key);
                table.add_row(vec![
                    key.to_string(),
                    format_word(word),
                    "no matching entry".to_string(),
                    "-".to_string(),
                ]);
            }
            Err(LotteryError::AlreadyFulfilled(_)) => {
                env.remove_queued(key);
                table.add_row(vec![
                    key.to_string(),
                    format_word(word),
                    "already fulfilled".to_string(),
                    "-".to_string(),
                ]);
            }
            Err(e) => {
                // left queued so a correctly-sourced delivery can still land
                table.add_row(vec![
                    key.to_string(),
                    format_word(word),
                    format!("rejected: {e}"),
                    "-".to_string(),
                ]);
            }
        }
    }

    println!("{table}");
    if wins > 0 {
        println!();
        println!("{wins} winning entr{}!", if wins == 1 { "y" } else { "ies" });
    }
    Ok(())
}

fn outcome_row(key: EntryKey, word: u128, outcome: &EntryOutcome) -> Vec<String> {
    let (status, reward) = if !outcome.won {
        ("lost".to_string(), "-".to_string())
    } else if outcome.paid {
        (
            format!("WON ('{}')", outcome.caller),
            format_tokens(outcome.reward),
        )
    } else {
        (
            format!("WON ('{}'), payout failed", outcome.caller),
            format!("{} unpaid", format_tokens(outcome.reward)),
        )
    };
    vec![key.to_string(), format_word(word), status, reward]
}

/// Sweeps every pending entry past the configured timeout.
pub async fn handle_expire(engine: &LotteryEngine, env: &SimEnv) -> Result<()> {
    let pending = engine.pending_entries().await?;
    if pending.is_empty() {
        println!("No pending entries.");
        return Ok(());
    }

    let keys: Vec<EntryKey> = pending.iter().map(|e| e.key).collect();
    let removed = engine.expire_entries(&keys).await?;

    // queued callbacks for removed entries would only bounce off UnknownEntry
    for key in keys {
        if engine.pending_entry(key).await?.is_none() {
            env.remove_queued(key);
        }
    }

    if removed == 0 {
        println!(
            "Nothing to sweep: {} pending entr{} still within the timeout.",
            pending.len(),
            if pending.len() == 1 { "y is" } else { "ies are" }
        );
    } else {
        println!(
            "Swept {removed} expired entr{}.",
            if removed == 1 { "y" } else { "ies" }
        );
    }
    Ok(())
}
