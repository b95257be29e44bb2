use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// USD amounts carry six decimal places ($1.00 == 1_000_000).
pub const USD_SCALE: u64 = 1_000_000;
/// Probabilities are expressed in parts per million (1_000_000 == 100%).
pub const PPM_SCALE: u64 = 1_000_000;
/// Multipliers and fractions are expressed in basis points (10_000 == 1x / 100%).
pub const BPS_SCALE: u64 = 10_000;

/// Identifies a pending entry by the provider that allocated its request id.
///
/// The two providers draw request ids from independent sequences, so the
/// numeric id alone is ambiguous. Keeping the provider in the key means a
/// callback can never be attributed to the wrong entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryKey {
    Local(u64),
    CrossDomain(u64),
}

impl EntryKey {
    pub fn provider(&self) -> ProviderKind {
        match self {
            EntryKey::Local(_) => ProviderKind::Local,
            EntryKey::CrossDomain(_) => ProviderKind::CrossDomain,
        }
    }

    pub fn request_id(&self) -> u64 {
        match self {
            EntryKey::Local(id) | EntryKey::CrossDomain(id) => *id,
        }
    }
}

impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider().as_str(), self.request_id())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderKind {
    Local,
    CrossDomain,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Local => "local",
            ProviderKind::CrossDomain => "cross-domain",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "local" => Some(ProviderKind::Local),
            "cross-domain" => Some(ProviderKind::CrossDomain),
            _ => None,
        }
    }

    pub fn key(&self, request_id: u64) -> EntryKey {
        match self {
            ProviderKind::Local => EntryKey::Local(request_id),
            ProviderKind::CrossDomain => EntryKey::CrossDomain(request_id),
        }
    }
}

/// An entry waiting for its random word.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingEntry {
    pub key: EntryKey,
    pub caller: String,
    pub usd_amount: u64,
    pub win_probability_ppm: u64,
    pub created_at: DateTime<Utc>,
    pub fulfilled: bool,
}

impl PendingEntry {
    pub fn is_expired(&self, timeout: std::time::Duration, now: DateTime<Utc>) -> bool {
        match chrono::Duration::from_std(timeout) {
            Ok(timeout) => now.signed_duration_since(self.created_at) > timeout,
            Err(_) => false,
        }
    }
}

/// How a caller's boost was derived, kept for logging and previews.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct BoostContext {
    pub boost_multiplier_bps: u64,
    pub locked_stake_usd: u64,
    pub boosted_portion_usd: u64,
    pub unboosted_portion_usd: u64,
}

/// Lifetime lottery counters for one caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserStats {
    pub account: String,
    pub total_entries: u64,
    pub total_volume_usd: u64,
    pub total_wins: u64,
    pub total_rewards: u128,
    pub last_entry_time: Option<DateTime<Utc>>,
}

impl UserStats {
    pub fn empty(account: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            total_entries: 0,
            total_volume_usd: 0,
            total_wins: 0,
            total_rewards: 0,
            last_entry_time: None,
        }
    }
}

/// Result of resolving one fulfilled entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryOutcome {
    pub key: EntryKey,
    pub caller: String,
    pub won: bool,
    /// Reward sized at fulfillment time; zero for losing entries.
    pub reward: u128,
    /// Whether the reward actually reached the winner.
    pub paid: bool,
}

/// Snapshot of the payout reserve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReserveStatus {
    pub direct_balance: u128,
    pub positions: Vec<SharePositionStatus>,
    pub payable_capacity: u128,
    /// What a win at this instant would pay.
    pub reward_preview: u128,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharePositionStatus {
    pub name: String,
    pub share_balance: u128,
    pub asset_value: u128,
}

/// How a payout was covered.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PayoutBreakdown {
    pub from_direct: u128,
    pub from_shares: u128,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_key_display_and_parts() {
        let key = EntryKey::Local(42);
        assert_eq!(key.to_string(), "local:42");
        assert_eq!(key.provider(), ProviderKind::Local);
        assert_eq!(key.request_id(), 42);

        let key = EntryKey::CrossDomain(7);
        assert_eq!(key.to_string(), "cross-domain:7");
        assert_eq!(ProviderKind::from_str("cross-domain"), Some(ProviderKind::CrossDomain));
        assert_eq!(ProviderKind::CrossDomain.key(7), key);
    }

    #[test]
    fn same_id_different_provider_are_distinct() {
        assert_ne!(EntryKey::Local(5), EntryKey::CrossDomain(5));
    }

    #[test]
    fn expiry_is_strictly_after_timeout() {
        let now = Utc::now();
        let entry = PendingEntry {
            key: EntryKey::Local(1),
            caller: "alice".to_string(),
            usd_amount: 50 * USD_SCALE,
            win_probability_ppm: 1000,
            created_at: now,
            fulfilled: false,
        };
        let timeout = std::time::Duration::from_secs(3600);
        assert!(!entry.is_expired(timeout, now + chrono::Duration::seconds(3600)));
        assert!(entry.is_expired(timeout, now + chrono::Duration::seconds(3601)));
    }
}
