//! Maps a USD entry value onto a base win chance.
//!
//! The curve is flat-zero below the minimum entry, linear between the two
//! thresholds and flat at the maximum above them. All arithmetic is integer
//! and truncates toward zero.

use crate::config::EngineConfig;

/// Base win chance for `usd_amount`, in parts per million.
pub fn base_chance_ppm(config: &EngineConfig, usd_amount: u64) -> u64 {
    if usd_amount < config.min_entry_usd {
        return 0;
    }
    if usd_amount >= config.max_entry_usd {
        return config.max_win_chance_ppm;
    }

    // validate() guarantees max_entry_usd > min_entry_usd
    let span_usd = config.max_entry_usd - config.min_entry_usd;
    let span_ppm = config.max_win_chance_ppm - config.min_win_chance_ppm;
    let offset = usd_amount - config.min_entry_usd;

    let scaled = (span_ppm as u128 * offset as u128) / span_usd as u128;
    config.min_win_chance_ppm + scaled as u64
}
