use crate::error::Result;
use crate::storage::Storage;
use crate::types::UserStats;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

pub struct StatsStore<'a> {
    storage: &'a Storage,
}

impl<'a> StatsStore<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Bumps entry count and volume after a randomness request was accepted.
    pub async fn record_entry(
        &self,
        account: &str,
        usd_amount: u64,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let conn = self.storage.get_connection().await;

        let mut stats = load_or_default(&conn, account)?;
        stats.total_entries += 1;
        stats.total_volume_usd = stats.total_volume_usd.saturating_add(usd_amount);
        stats.last_entry_time = Some(at);
        save(&conn, &stats)?;

        Ok(())
    }

    /// Bumps the win counter; `paid_reward` is the amount actually
    /// transferred, zero when the payout failed.
    pub async fn record_win(&self, account: &str, paid_reward: u128) -> Result<()> {
        let conn = self.storage.get_connection().await;

        let mut stats = load_or_default(&conn, account)?;
        stats.total_wins += 1;
        stats.total_rewards = stats.total_rewards.saturating_add(paid_reward);
        save(&conn, &stats)?;

        Ok(())
    }

    pub async fn get(&self, account: &str) -> Result<UserStats> {
        let conn = self.storage.get_connection().await;
        load_or_default(&conn, account)
    }

    pub async fn list(&self) -> Result<Vec<UserStats>> {
        let conn = self.storage.get_connection().await;

        let mut stmt = conn.prepare(
            "SELECT account, total_entries, total_volume_usd, total_wins, total_rewards, last_entry_time
             FROM user_stats ORDER BY total_volume_usd DESC",
        )?;

        let stats_iter = stmt.query_map([], row_to_stats)?;

        let mut all = Vec::new();
        for stats in stats_iter {
            all.push(stats?);
        }

        Ok(all)
    }
}

fn load_or_default(conn: &Connection, account: &str) -> Result<UserStats> {
    let stats = conn
        .query_row(
            "SELECT account, total_entries, total_volume_usd, total_wins, total_rewards, last_entry_time
             FROM user_stats WHERE account = ?1",
            params![account],
            row_to_stats,
        )
        .optional()?;

    Ok(stats.unwrap_or_else(|| UserStats::empty(account)))
}

fn save(conn: &Connection, stats: &UserStats) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO user_stats
         (account, total_entries, total_volume_usd, total_wins, total_rewards, last_entry_time)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            stats.account,
            stats.total_entries as i64,
            stats.total_volume_usd as i64,
            stats.total_wins as i64,
            stats.total_rewards.to_string(),
            stats.last_entry_time.map(|t| t.timestamp()),
        ],
    )?;

    Ok(())
}

fn row_to_stats(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserStats> {
    let total_entries: i64 = row.get(1)?;
    let total_volume_usd: i64 = row.get(2)?;
    let total_wins: i64 = row.get(3)?;
    let rewards_str: String = row.get(4)?;
    let last_entry: Option<i64> = row.get(5)?;

    // rewards can exceed 64 bits, stored as a decimal string
    let total_rewards: u128 = rewards_str.parse().map_err(|_| {
        rusqlite::Error::InvalidColumnType(
            4,
            "total_rewards".to_string(),
            rusqlite::types::Type::Text,
        )
    })?;

    Ok(UserStats {
        account: row.get(0)?,
        total_entries: total_entries as u64,
        total_volume_usd: total_volume_usd as u64,
        total_wins: total_wins as u64,
        total_rewards,
        last_entry_time: last_entry.and_then(|ts| DateTime::from_timestamp(ts, 0)),
    })
}
