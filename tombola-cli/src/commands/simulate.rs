use comfy_table::{presets::UTF8_FULL, Table};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tombola_core::{EntryKey, LotteryEngine, LotteryError, Result, PPM_SCALE};

use super::{format_tokens, format_usd, parse_usd};
use crate::sim::{SimEnv, DEFAULT_PROCESSOR, DEFAULT_TOKEN, TOKEN_SCALE};

struct WinRecord {
    key: EntryKey,
    caller: String,
    reward: u128,
    paid: bool,
}

/// Runs a batch of entries end to end: open, deliver randomness, settle.
pub async fn handle_simulate(
    engine: &LotteryEngine,
    env: &SimEnv,
    entries: u32,
    users: &str,
    usd: &str,
    seed: Option<u64>,
) -> Result<()> {
    let users: Vec<&str> = users
        .split(',')
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .collect();
    if users.is_empty() {
        return Err(LotteryError::invalid_input("At least one user is required"));
    }
    let usd_amount = parse_usd(usd)?;
    let mut rng = StdRng::seed_from_u64(seed.unwrap_or(42));

    println!(
        "Simulating {entries} entries of {} across {} user{}...",
        format_usd(usd_amount),
        users.len(),
        if users.len() == 1 { "" } else { "s" }
    );
    println!();

    let mut opened = 0u32;
    let mut skipped = 0u32;
    let mut expected_ppm: u128 = 0;
    let mut total_paid: u128 = 0;
    let mut winners: Vec<WinRecord> = Vec::new();

    for _ in 0..entries {
        let user = users[rng.random_range(0..users.len())];
        let Some(key) = engine
            .process_entry(DEFAULT_PROCESSOR, user, DEFAULT_TOKEN, TOKEN_SCALE, usd_amount)
            .await?
        else {
            skipped += 1;
            continue;
        };
        opened += 1;

        if let Some(entry) = engine.pending_entry(key).await? {
            expected_ppm += entry.win_probability_ppm as u128;
        }

        let word = env.word_for(key);
        let source = env.source_for(key);
        let outcome = match key {
            EntryKey::Local(id) => engine.handle_local_callback(source, id, &[word]).await?,
            EntryKey::CrossDomain(id) => {
                engine.handle_cross_domain_callback(source, id, &[word]).await?
            }
        };
        env.remove_queued(key);

        if outcome.won {
            if outcome.paid {
                total_paid += outcome.reward;
            }
            winners.push(WinRecord {
                key,
                caller: outcome.caller,
                reward: outcome.reward,
                paid: outcome.paid,
            });
        }
    }

    let reserve = engine.reserve_status().await?;

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.add_row(vec!["Entries opened".to_string(), opened.to_string()]);
    table.add_row(vec!["Entries skipped".to_string(), skipped.to_string()]);
    table.add_row(vec![
        "Expected wins".to_string(),
        format!("{:.2}", expected_ppm as f64 / PPM_SCALE as f64),
    ]);
    table.add_row(vec!["Actual wins".to_string(), winners.len().to_string()]);
    table.add_row(vec![
        format!("Total paid ({DEFAULT_TOKEN})"),
        format_tokens(total_paid),
    ]);
    table.add_row(vec![
        "Reserve capacity left".to_string(),
        format_tokens(reserve.payable_capacity),
    ]);
    println!("{table}");

    if !winners.is_empty() {
        println!();
        println!("Winners");
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(vec!["Entry", "Caller", "Reward", "Settled"]);
        for win in &winners {
            table.add_row(vec![
                win.key.to_string(),
                win.caller.clone(),
                format_tokens(win.reward),
                if win.paid { "paid" } else { "payout failed" }.to_string(),
            ]);
        }
        println!("{table}");
    }

    Ok(())
}
