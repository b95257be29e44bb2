use crate::error::{LotteryError, Result};
use crate::types::{BPS_SCALE, PPM_SCALE, USD_SCALE};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Entries below this USD value never qualify.
    pub min_entry_usd: u64,
    /// Entries at or above this USD value get the maximum base chance.
    pub max_entry_usd: u64,
    /// Base chance at the minimum qualifying entry.
    pub min_win_chance_ppm: u64,
    /// Base chance at and above the maximum entry.
    pub max_win_chance_ppm: u64,
    /// Largest boost multiplier a caller can hold, in basis points of 1x.
    pub max_boost_bps: u64,
    /// Absolute ceiling on any boosted chance.
    pub max_win_probability_ppm: u64,
    /// Fraction of payable capacity a win pays, in basis points.
    pub reward_bps: u64,
    /// Age after which an unfulfilled entry may be swept.
    pub entry_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_entry_usd: 10 * USD_SCALE,      // $10
            max_entry_usd: 10_000 * USD_SCALE,  // $10,000
            min_win_chance_ppm: 40,             // 0.004%
            max_win_chance_ppm: 40_000,         // 4%
            max_boost_bps: 25_000,              // 2.5x
            max_win_probability_ppm: 100_000,   // 10%
            reward_bps: 6_900,                  // 69%
            entry_timeout: Duration::from_secs(3600), // 1 hour
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.min_entry_usd == 0 {
            return Err(LotteryError::config("Minimum entry must be greater than 0"));
        }

        if self.max_entry_usd <= self.min_entry_usd {
            return Err(LotteryError::config(
                "Maximum entry must be greater than minimum entry",
            ));
        }

        if self.max_win_chance_ppm < self.min_win_chance_ppm {
            return Err(LotteryError::config(
                "Maximum win chance cannot be below minimum win chance",
            ));
        }

        if self.max_win_probability_ppm == 0 || self.max_win_probability_ppm > PPM_SCALE {
            return Err(LotteryError::config(
                "Win probability cap must be between 1 ppm and 1,000,000 ppm",
            ));
        }

        if self.max_win_chance_ppm > self.max_win_probability_ppm {
            return Err(LotteryError::config(
                "Maximum win chance cannot exceed the win probability cap",
            ));
        }

        if self.max_boost_bps < BPS_SCALE {
            return Err(LotteryError::config("Boost cap cannot be below 1x"));
        }

        if self.max_boost_bps > 100 * BPS_SCALE {
            return Err(LotteryError::config("Boost cap cannot exceed 100x"));
        }

        if self.reward_bps == 0 || self.reward_bps > BPS_SCALE {
            return Err(LotteryError::config(
                "Reward fraction must be between 1 and 10,000 bps",
            ));
        }

        if self.entry_timeout < Duration::from_secs(60) {
            return Err(LotteryError::config("Entry timeout must be at least 60s"));
        }

        Ok(())
    }
}
