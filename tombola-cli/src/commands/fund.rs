use clap::Subcommand;
use tombola_core::{LotteryEngine, Result};

use super::{format_tokens, format_usd, parse_tokens, parse_usd};
use crate::sim::{BoostStanding, SimEnv, DEFAULT_TOKEN, RESERVE_ACCOUNT};

#[derive(Subcommand)]
pub enum FundCommands {
    /// Mint reward tokens straight into the jackpot reserve
    Jackpot {
        /// Token amount (e.g. 1000 or 0.5)
        amount: String,
    },
    /// Mint reserve shares in the yield vault position
    Shares {
        /// Share count
        shares: u128,
    },
    /// Credit the engine's randomness fee balance
    Fees {
        /// Fee units to add
        amount: u128,
        /// Caller identity (must be the admin)
        #[arg(long = "as", default_value = "admin")]
        caller: String,
    },
    /// Mint reward tokens into a user wallet
    Wallet {
        /// Account to credit
        account: String,
        /// Token amount (e.g. 1000 or 0.5)
        amount: String,
    },
    /// Set an account's staking standing for boosted entries
    Stake {
        /// Account holding the stake
        account: String,
        /// Boost multiplier in basis points of 1x (15000 = 1.5x)
        multiplier_bps: u64,
        /// Locked stake value in USD (e.g. 500)
        locked_usd: String,
    },
}

pub async fn handle_fund_command(
    cmd: FundCommands,
    engine: &LotteryEngine,
    env: &SimEnv,
) -> Result<()> {
    match cmd {
        FundCommands::Jackpot { amount } => {
            let amount = parse_tokens(&amount)?;
            let balance = env.deposit(RESERVE_ACCOUNT, amount);
            println!(
                "Minted {} {DEFAULT_TOKEN} into the reserve (direct balance now {})",
                format_tokens(amount),
                format_tokens(balance)
            );
            let reserve = engine.reserve_status().await?;
            println!(
                "Payable capacity {} {DEFAULT_TOKEN}, next win pays {}",
                format_tokens(reserve.payable_capacity),
                format_tokens(reserve.reward_preview)
            );
        }

        FundCommands::Shares { shares } => {
            let held = env.mint_shares(RESERVE_ACCOUNT, shares);
            println!("Minted {shares} reserve shares (now holding {held})");
            let reserve = engine.reserve_status().await?;
            println!(
                "Payable capacity {} {DEFAULT_TOKEN}, next win pays {}",
                format_tokens(reserve.payable_capacity),
                format_tokens(reserve.reward_preview)
            );
        }

        FundCommands::Fees { amount, caller } => {
            let balance = engine.fund_fees(&caller, amount)?;
            println!("Randomness fee balance is now {balance}");
        }

        FundCommands::Wallet { account, amount } => {
            let amount = parse_tokens(&amount)?;
            let balance = env.deposit(&account, amount);
            println!(
                "Minted {} {DEFAULT_TOKEN} for '{}' (balance now {})",
                format_tokens(amount),
                account,
                format_tokens(balance)
            );
        }

        FundCommands::Stake {
            account,
            multiplier_bps,
            locked_usd,
        } => {
            let locked_usd = parse_usd(&locked_usd)?;
            env.set_boost(
                &account,
                BoostStanding {
                    multiplier_bps,
                    locked_usd,
                },
            );
            println!(
                "'{}' now boosts at {:.2}x over {} of locked stake",
                account,
                multiplier_bps as f64 / 10_000.0,
                format_usd(locked_usd)
            );
        }
    }
    Ok(())
}
