use std::time::Duration;

use clap::Subcommand;
use dialoguer::Confirm;
use tombola_core::{LotteryEngine, LotteryError, Result};

use super::{format_ppm, format_usd, parse_usd};
use crate::sim::SimEnv;

#[derive(Subcommand)]
pub enum AdminCommands {
    /// Pause entry processing (in-flight callbacks still settle)
    Pause {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
        /// Caller identity (must be the admin)
        #[arg(long = "as", default_value = "admin")]
        caller: String,
    },
    /// Resume entry processing
    Resume {
        #[arg(long = "as", default_value = "admin")]
        caller: String,
    },
    /// Set the reward fraction in basis points of payable capacity
    SetReward {
        /// 6900 pays 69% of capacity
        reward_bps: u64,
        #[arg(long = "as", default_value = "admin")]
        caller: String,
    },
    /// Set the probability curve endpoints
    SetCurve {
        /// Minimum qualifying entry in USD
        min_usd: String,
        /// Entry value earning the maximum base chance, in USD
        max_usd: String,
        /// Base chance at the minimum, in ppm
        min_ppm: u64,
        /// Base chance at the maximum, in ppm
        max_ppm: u64,
        #[arg(long = "as", default_value = "admin")]
        caller: String,
    },
    /// Set the pending-entry timeout
    SetTimeout {
        /// Seconds before an unfulfilled entry may be swept
        seconds: u64,
        #[arg(long = "as", default_value = "admin")]
        caller: String,
    },
    /// Set the boost multiplier cap and the global chance ceiling
    SetBoostLimits {
        /// Largest multiplier in basis points (25000 = 2.5x)
        max_boost_bps: u64,
        /// Ceiling on any boosted chance, in ppm
        max_win_ppm: u64,
        #[arg(long = "as", default_value = "admin")]
        caller: String,
    },
    /// Register a transfer processor identity
    Authorize {
        processor: String,
        #[arg(long = "as", default_value = "admin")]
        caller: String,
    },
    /// Remove a transfer processor identity
    Deauthorize {
        processor: String,
        #[arg(long = "as", default_value = "admin")]
        caller: String,
    },
    /// Toggle a simulated dependency (oracle, local, bridge) on or off
    Provider {
        /// oracle | local | bridge
        name: String,
        /// on | off
        state: String,
    },
    /// Set the simulated cross-domain bridge fee
    BridgeFee { fee: u128 },
    /// Set the simulated oracle price for a token
    Price {
        token: String,
        /// USD per whole token (e.g. 2 or 0.5)
        usd: String,
    },
}

pub async fn handle_admin_command(
    cmd: AdminCommands,
    engine: &LotteryEngine,
    env: &SimEnv,
) -> Result<()> {
    match cmd {
        AdminCommands::Pause { yes, caller } => {
            if !yes {
                let confirmed = Confirm::new()
                    .with_prompt("Pause entry processing? New transfers stop earning entries.")
                    .default(false)
                    .interact()
                    .map_err(|e| LotteryError::internal(e.to_string()))?;
                if !confirmed {
                    println!("Pause cancelled");
                    return Ok(());
                }
            }
            engine.pause(&caller)?;
            println!("Entry processing paused. Resume with: tombola admin resume");
        }

        AdminCommands::Resume { caller } => {
            engine.resume(&caller)?;
            println!("Entry processing resumed");
        }

        AdminCommands::SetReward { reward_bps, caller } => {
            engine.set_reward_bps(&caller, reward_bps)?;
            println!(
                "Wins now pay {:.2}% of payable capacity",
                reward_bps as f64 / 100.0
            );
        }

        AdminCommands::SetCurve {
            min_usd,
            max_usd,
            min_ppm,
            max_ppm,
            caller,
        } => {
            let min_entry = parse_usd(&min_usd)?;
            let max_entry = parse_usd(&max_usd)?;
            engine.set_curve(&caller, min_entry, max_entry, min_ppm, max_ppm)?;
            println!(
                "Curve set: {} at {} up to {} at {}",
                format_ppm(min_ppm),
                format_usd(min_entry),
                format_ppm(max_ppm),
                format_usd(max_entry)
            );
        }

        AdminCommands::SetTimeout { seconds, caller } => {
            engine.set_entry_timeout(&caller, Duration::from_secs(seconds))?;
            println!("Pending entries now expire after {seconds}s");
        }

        AdminCommands::SetBoostLimits {
            max_boost_bps,
            max_win_ppm,
            caller,
        } => {
            engine.set_boost_limits(&caller, max_boost_bps, max_win_ppm)?;
            println!(
                "Boost capped at {:.2}x, chance capped at {}",
                max_boost_bps as f64 / 10_000.0,
                format_ppm(max_win_ppm)
            );
        }

        AdminCommands::Authorize { processor, caller } => {
            engine.authorize_processor(&caller, &processor)?;
            env.add_processor(&processor);
            println!("'{processor}' may now submit transfers");
        }

        AdminCommands::Deauthorize { processor, caller } => {
            engine.deauthorize_processor(&caller, &processor)?;
            env.remove_processor(&processor);
            println!("'{processor}' removed from the processor set");
        }

        AdminCommands::Provider { name, state } => {
            let online = match state.as_str() {
                "on" => true,
                "off" => false,
                other => {
                    return Err(LotteryError::invalid_input(format!(
                        "Invalid state '{other}', expected on or off"
                    )))
                }
            };
            match name.as_str() {
                "oracle" => env.set_oracle_online(online),
                "local" => env.set_local_online(online),
                "bridge" => env.set_bridge_online(online),
                other => {
                    return Err(LotteryError::invalid_input(format!(
                        "Unknown provider '{other}', expected oracle, local or bridge"
                    )))
                }
            }
            println!(
                "Provider '{}' is now {}",
                name,
                if online { "online" } else { "offline" }
            );
        }

        AdminCommands::BridgeFee { fee } => {
            env.set_bridge_fee(fee);
            println!("Cross-domain randomness now quotes a fee of {fee}");
        }

        AdminCommands::Price { token, usd } => {
            let price = parse_usd(&usd)?;
            env.set_price(&token, price);
            println!("Oracle now prices {} at {}", token, format_usd(price));
        }
    }
    Ok(())
}
