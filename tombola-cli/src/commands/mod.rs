mod admin;
mod deliver;
mod fund;
mod simulate;
mod status;
mod swap;

pub use admin::{handle_admin_command, AdminCommands};
pub use deliver::{handle_deliver, handle_expire};
pub use fund::{handle_fund_command, FundCommands};
pub use simulate::handle_simulate;
pub use status::{handle_entries, handle_quote, handle_stats, handle_status};
pub use swap::handle_swap;

use chrono::{DateTime, Utc};
use tombola_core::{EntryKey, LotteryError, ProviderKind, Result, PPM_SCALE, USD_SCALE};

use crate::sim::TOKEN_SCALE;

const DECIMALS: u32 = 6;

/// Parses a decimal string like "100" or "12.5" into 1e6-scaled units.
fn parse_scaled(input: &str, what: &str) -> Result<u128> {
    let input = input.trim();
    let (whole, frac) = match input.split_once('.') {
        Some((w, f)) => (w, f),
        None => (input, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(LotteryError::invalid_input(format!("Empty {what}")));
    }
    if frac.len() > DECIMALS as usize {
        return Err(LotteryError::invalid_input(format!(
            "{what} supports at most {DECIMALS} decimal places"
        )));
    }
    let whole_part: u128 = if whole.is_empty() {
        0
    } else {
        whole
            .parse()
            .map_err(|_| LotteryError::invalid_input(format!("Invalid {what}: '{input}'")))?
    };
    let frac_part: u128 = if frac.is_empty() {
        0
    } else {
        let digits: u128 = frac
            .parse()
            .map_err(|_| LotteryError::invalid_input(format!("Invalid {what}: '{input}'")))?;
        digits * 10u128.pow(DECIMALS - frac.len() as u32)
    };
    whole_part
        .checked_mul(10u128.pow(DECIMALS))
        .and_then(|v| v.checked_add(frac_part))
        .ok_or_else(|| LotteryError::invalid_input(format!("{what} too large: '{input}'")))
}

pub fn parse_usd(input: &str) -> Result<u64> {
    let scaled = parse_scaled(input, "USD amount")?;
    u64::try_from(scaled)
        .map_err(|_| LotteryError::invalid_input(format!("USD amount too large: '{input}'")))
}

pub fn parse_tokens(input: &str) -> Result<u128> {
    parse_scaled(input, "token amount")
}

pub fn parse_entry_key(input: &str) -> Result<EntryKey> {
    let parse = || -> Option<EntryKey> {
        let (provider, id) = input.split_once(':')?;
        let provider = ProviderKind::from_str(provider.trim())?;
        let request_id = id.trim().parse().ok()?;
        Some(provider.key(request_id))
    };
    parse().ok_or_else(|| {
        LotteryError::invalid_input(format!(
            "Invalid entry key '{input}', expected e.g. local:3 or cross-domain:7"
        ))
    })
}

pub fn format_usd(usd: u64) -> String {
    let whole = usd / USD_SCALE;
    let frac = usd % USD_SCALE;
    if frac == 0 {
        return format!("${whole}");
    }
    let frac = format!("{frac:06}");
    format!("${whole}.{}", frac.trim_end_matches('0'))
}

pub fn format_tokens(amount: u128) -> String {
    let whole = amount / TOKEN_SCALE;
    let frac = amount % TOKEN_SCALE;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{frac:06}");
    format!("{whole}.{}", frac.trim_end_matches('0'))
}

pub fn format_ppm(ppm: u64) -> String {
    format!("{:.4}%", ppm as f64 / (PPM_SCALE as f64 / 100.0))
}

/// One-in-N odds for a ppm chance, for human-sized numbers.
pub fn format_odds(ppm: u64) -> String {
    if ppm == 0 {
        return "no chance".to_string();
    }
    if ppm >= PPM_SCALE {
        return "certain".to_string();
    }
    format!("1 in {}", (PPM_SCALE + ppm / 2) / ppm)
}

pub fn format_age(created_at: DateTime<Utc>) -> String {
    let secs = Utc::now().signed_duration_since(created_at).num_seconds().max(0);
    if secs >= 3600 {
        format!("{}h{:02}m", secs / 3600, (secs % 3600) / 60)
    } else if secs >= 60 {
        format!("{}m{:02}s", secs / 60, secs % 60)
    } else {
        format!("{secs}s")
    }
}

/// First 16 hex digits of a random word, enough to eyeball determinism.
pub fn format_word(word: u128) -> String {
    format!("{:016x}..", (word >> 64) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_whole_and_fractional_amounts() {
        assert_eq!(parse_usd("100").unwrap(), 100_000_000);
        assert_eq!(parse_usd("12.5").unwrap(), 12_500_000);
        assert_eq!(parse_usd("0.000001").unwrap(), 1);
        assert_eq!(parse_usd(".25").unwrap(), 250_000);
        assert_eq!(parse_tokens("3.141592").unwrap(), 3_141_592);
    }

    #[test]
    fn rejects_malformed_amounts() {
        assert!(parse_usd("").is_err());
        assert!(parse_usd(".").is_err());
        assert!(parse_usd("1.2345678").is_err());
        assert!(parse_usd("ten").is_err());
        assert!(parse_usd("-5").is_err());
    }

    #[test]
    fn entry_keys_round_trip_through_display() {
        let key = parse_entry_key("local:3").unwrap();
        assert_eq!(key, EntryKey::Local(3));
        assert_eq!(parse_entry_key(&key.to_string()).unwrap(), key);

        let key = parse_entry_key("cross-domain:7").unwrap();
        assert_eq!(key, EntryKey::CrossDomain(7));

        assert!(parse_entry_key("local").is_err());
        assert!(parse_entry_key("oracle:1").is_err());
    }

    #[test]
    fn formats_trim_trailing_zeros() {
        assert_eq!(format_usd(100_000_000), "$100");
        assert_eq!(format_usd(12_500_000), "$12.5");
        assert_eq!(format_usd(1), "$0.000001");
        assert_eq!(format_tokens(2_000_000), "2");
        assert_eq!(format_tokens(2_100_000), "2.1");
    }

    #[test]
    fn odds_round_to_nearest() {
        assert_eq!(format_odds(400), "1 in 2500");
        assert_eq!(format_odds(40_000), "1 in 25");
        assert_eq!(format_odds(0), "no chance");
        assert_eq!(format_odds(1_000_000), "certain");
    }
}
