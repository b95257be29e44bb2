use chrono::Utc;
use comfy_table::{presets::UTF8_FULL, Table};
use tombola_core::{LotteryEngine, Result, BPS_SCALE};

use super::{format_age, format_odds, format_ppm, format_tokens, format_usd, parse_usd};
use crate::sim::{SimEnv, DEFAULT_TOKEN};

/// Engine and reserve overview.
pub async fn handle_status(engine: &LotteryEngine, env: &SimEnv) -> Result<()> {
    let config = engine.config();
    let reserve = engine.reserve_status().await?;
    let pending = engine.pending_entries().await?;

    println!("Engine");
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.add_row(vec![
        "State".to_string(),
        if engine.is_paused() {
            "paused".to_string()
        } else {
            "active".to_string()
        },
    ]);
    table.add_row(vec![
        "Entry range".to_string(),
        format!(
            "{} - {}",
            format_usd(config.min_entry_usd),
            format_usd(config.max_entry_usd)
        ),
    ]);
    table.add_row(vec![
        "Base chance range".to_string(),
        format!(
            "{} - {}",
            format_ppm(config.min_win_chance_ppm),
            format_ppm(config.max_win_chance_ppm)
        ),
    ]);
    table.add_row(vec![
        "Boost cap".to_string(),
        format!("{:.2}x", config.max_boost_bps as f64 / BPS_SCALE as f64),
    ]);
    table.add_row(vec![
        "Chance cap".to_string(),
        format_ppm(config.max_win_probability_ppm),
    ]);
    table.add_row(vec![
        "Reward share".to_string(),
        format!("{:.2}% of capacity", config.reward_bps as f64 / 100.0),
    ]);
    table.add_row(vec![
        "Entry timeout".to_string(),
        format!("{}s", config.entry_timeout.as_secs()),
    ]);
    table.add_row(vec![
        "Randomness fee balance".to_string(),
        engine.fee_balance().to_string(),
    ]);
    table.add_row(vec!["Pending entries".to_string(), pending.len().to_string()]);
    table.add_row(vec![
        "Queued callbacks".to_string(),
        env.queued().len().to_string(),
    ]);
    println!("{table}");

    println!();
    println!("Reserve");
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.add_row(vec![
        format!("Direct balance ({DEFAULT_TOKEN})"),
        format_tokens(reserve.direct_balance),
    ]);
    for position in &reserve.positions {
        table.add_row(vec![
            format!("Position '{}'", position.name),
            format!(
                "{} shares worth {} {DEFAULT_TOKEN}",
                position.share_balance,
                format_tokens(position.asset_value)
            ),
        ]);
    }
    table.add_row(vec![
        "Payable capacity".to_string(),
        format_tokens(reserve.payable_capacity),
    ]);
    table.add_row(vec![
        "Next win pays".to_string(),
        format_tokens(reserve.reward_preview),
    ]);
    println!("{table}");

    Ok(())
}

/// Lists pending entries with their age against the timeout.
pub async fn handle_entries(engine: &LotteryEngine) -> Result<()> {
    let pending = engine.pending_entries().await?;
    if pending.is_empty() {
        println!("No pending entries.");
        return Ok(());
    }

    let timeout = engine.config().entry_timeout;
    let now = Utc::now();

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Entry", "Caller", "USD", "Chance", "Age", "State"]);
    for entry in &pending {
        let state = if entry.fulfilled {
            "delivering"
        } else if entry.is_expired(timeout, now) {
            "expired"
        } else {
            "waiting"
        };
        table.add_row(vec![
            entry.key.to_string(),
            entry.caller.clone(),
            format_usd(entry.usd_amount),
            format_ppm(entry.win_probability_ppm),
            format_age(entry.created_at),
            state.to_string(),
        ]);
    }
    println!("{table}");
    Ok(())
}

/// Lifetime stats for one account, or the leaderboard for all of them.
pub async fn handle_stats(engine: &LotteryEngine, account: Option<&str>) -> Result<()> {
    match account {
        Some(account) => {
            let stats = engine.user_stats(account).await?;
            println!("Stats for '{account}'");
            println!("  Entries:      {}", stats.total_entries);
            println!("  Volume:       {}", format_usd(stats.total_volume_usd));
            println!("  Wins:         {}", stats.total_wins);
            println!(
                "  Rewards:      {} {DEFAULT_TOKEN}",
                format_tokens(stats.total_rewards)
            );
            match stats.last_entry_time {
                Some(at) => println!("  Last entry:   {} ago", format_age(at)),
                None => println!("  Last entry:   never"),
            }
        }
        None => {
            let all = engine.all_stats().await?;
            if all.is_empty() {
                println!("No lottery activity recorded yet.");
                return Ok(());
            }
            let mut table = Table::new();
            table.load_preset(UTF8_FULL);
            table.set_header(vec![
                "Account",
                "Entries",
                "Volume",
                "Wins",
                "Rewards",
                "Last entry",
            ]);
            for stats in &all {
                table.add_row(vec![
                    stats.account.clone(),
                    stats.total_entries.to_string(),
                    format_usd(stats.total_volume_usd),
                    stats.total_wins.to_string(),
                    format_tokens(stats.total_rewards),
                    stats
                        .last_entry_time
                        .map(|at| format!("{} ago", format_age(at)))
                        .unwrap_or_else(|| "never".to_string()),
                ]);
            }
            println!("{table}");
        }
    }
    Ok(())
}

/// Previews the win chance an account would get for a USD amount.
pub async fn handle_quote(engine: &LotteryEngine, account: &str, usd: &str) -> Result<()> {
    let usd_amount = parse_usd(usd)?;
    let (base_ppm, chance_ppm, ctx) = engine.quote_chance(account, usd_amount).await;

    println!("Quote for '{account}' at {}", format_usd(usd_amount));
    if chance_ppm == 0 {
        let min = engine.config().min_entry_usd;
        println!("  No entry: below the {} minimum", format_usd(min));
        return Ok(());
    }

    println!("  Base chance:    {}", format_ppm(base_ppm));
    if ctx.boost_multiplier_bps > BPS_SCALE && ctx.locked_stake_usd > 0 {
        println!(
            "  Boost:          {:.2}x on {} of {} (stake {} locked)",
            ctx.boost_multiplier_bps as f64 / BPS_SCALE as f64,
            format_usd(ctx.boosted_portion_usd),
            format_usd(usd_amount),
            format_usd(ctx.locked_stake_usd),
        );
    } else {
        println!("  Boost:          none");
    }
    println!(
        "  Final chance:   {} ({})",
        format_ppm(chance_ppm),
        format_odds(chance_ppm)
    );
    Ok(())
}
