use tombola_core::{LotteryEngine, Result, Token};

use super::{format_ppm, format_tokens, format_usd, parse_tokens, parse_usd};
use crate::sim::{SimEnv, POOL_ACCOUNT};

/// Moves tokens into the pool and rolls the transfer for a lottery entry.
pub async fn handle_swap(
    engine: &LotteryEngine,
    env: &SimEnv,
    processor: &str,
    user: &str,
    token: &str,
    amount: &str,
    usd: Option<&str>,
) -> Result<()> {
    let amount = parse_tokens(amount)?;
    let usd_hint = match usd {
        Some(raw) => parse_usd(raw)?,
        None => 0,
    };

    env.token().transfer(user, POOL_ACCOUNT, amount).await?;
    println!(
        "Swapped {} {} from '{}' into the pool",
        format_tokens(amount),
        token,
        user
    );

    match engine
        .process_entry(processor, user, token, amount, usd_hint)
        .await?
    {
        Some(key) => {
            if let Some(entry) = engine.pending_entry(key).await? {
                println!();
                println!("Lottery entry {key} opened");
                println!("  USD value:  {}", format_usd(entry.usd_amount));
                println!("  Win chance: {}", format_ppm(entry.win_probability_ppm));
                println!();
                println!("Deliver its random word with: tombola deliver --key {key}");
            }
        }
        None => {
            println!();
            println!("Transfer processed without a lottery entry (reason in the log output)");
        }
    }

    Ok(())
}
