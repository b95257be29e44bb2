//! Turns a random word into a win/lose decision and sizes rewards.

use crate::types::{BPS_SCALE, PPM_SCALE};

/// Decides an entry against a uniformly random 128-bit word.
///
/// The word domain is cut into `PPM_SCALE` equal-width buckets and the entry
/// wins when the word lands in the first `win_probability_ppm` of them.
/// Words in the truncated sliver above `bucket * PPM_SCALE` never win.
pub fn is_win(win_probability_ppm: u64, random_word: u128) -> bool {
    if win_probability_ppm == 0 {
        return false;
    }
    if win_probability_ppm >= PPM_SCALE {
        return true;
    }

    let bucket = u128::MAX / PPM_SCALE as u128;
    random_word < bucket * win_probability_ppm as u128
}

/// Reward for a win: `reward_bps` of the payable capacity, rounding down.
///
/// Split into quotient and remainder so the multiplication cannot overflow
/// u128 while yielding exactly `floor(capacity * bps / BPS_SCALE)`.
pub fn reward_amount(payable_capacity: u128, reward_bps: u64) -> u128 {
    let bps = reward_bps as u128;
    let scale = BPS_SCALE as u128;
    (payable_capacity / scale) * bps + (payable_capacity % scale) * bps / scale
}
