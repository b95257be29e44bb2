use crate::error::{LotteryError, Result};
use crate::storage::Storage;
use crate::types::{EntryKey, PendingEntry, ProviderKind};
use chrono::{DateTime, Utc};
use rusqlite::params;

pub struct EntryStore<'a> {
    storage: &'a Storage,
}

impl<'a> EntryStore<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    pub async fn insert(&self, entry: &PendingEntry) -> Result<()> {
        let conn = self.storage.get_connection().await;

        conn.execute(
            "INSERT INTO pending_entries
             (provider, request_id, caller, usd_amount, win_probability_ppm, created_at, fulfilled)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                entry.key.provider().as_str(),
                entry.key.request_id() as i64,
                entry.caller,
                entry.usd_amount as i64,
                entry.win_probability_ppm as i64,
                entry.created_at.timestamp(),
                entry.fulfilled,
            ],
        )?;

        Ok(())
    }

    pub async fn get(&self, key: EntryKey) -> Result<Option<PendingEntry>> {
        let conn = self.storage.get_connection().await;

        let mut stmt = conn.prepare(
            "SELECT provider, request_id, caller, usd_amount, win_probability_ppm, created_at, fulfilled
             FROM pending_entries WHERE provider = ?1 AND request_id = ?2",
        )?;

        let mut rows = stmt.query_map(
            params![key.provider().as_str(), key.request_id() as i64],
            row_to_entry,
        )?;

        match rows.next() {
            Some(entry) => Ok(Some(entry?)),
            None => Ok(None),
        }
    }

    /// Atomically claims an entry for fulfillment.
    ///
    /// The select and the fulfilled-flag update run under one connection
    /// lock, so a second callback for the same key always observes the flag
    /// and fails instead of resolving the entry twice.
    pub async fn take_for_fulfillment(&self, key: EntryKey) -> Result<PendingEntry> {
        let conn = self.storage.get_connection().await;

        let mut stmt = conn.prepare(
            "SELECT provider, request_id, caller, usd_amount, win_probability_ppm, created_at, fulfilled
             FROM pending_entries WHERE provider = ?1 AND request_id = ?2",
        )?;

        let mut rows = stmt.query_map(
            params![key.provider().as_str(), key.request_id() as i64],
            row_to_entry,
        )?;

        let mut entry = match rows.next() {
            Some(entry) => entry?,
            None => return Err(LotteryError::UnknownEntry(key)),
        };
        drop(rows);
        drop(stmt);

        if entry.fulfilled {
            return Err(LotteryError::AlreadyFulfilled(key));
        }

        conn.execute(
            "UPDATE pending_entries SET fulfilled = 1 WHERE provider = ?1 AND request_id = ?2",
            params![key.provider().as_str(), key.request_id() as i64],
        )?;

        entry.fulfilled = true;
        Ok(entry)
    }

    pub async fn delete(&self, key: EntryKey) -> Result<()> {
        let conn = self.storage.get_connection().await;

        conn.execute(
            "DELETE FROM pending_entries WHERE provider = ?1 AND request_id = ?2",
            params![key.provider().as_str(), key.request_id() as i64],
        )?;

        Ok(())
    }

    /// Deletes the entry only if it is unfulfilled and older than `cutoff`.
    ///
    /// Both conditions live in the statement itself, so an entry claimed by
    /// a concurrent fulfillment can never be swept.
    pub async fn delete_if_expired(&self, key: EntryKey, cutoff: DateTime<Utc>) -> Result<bool> {
        let conn = self.storage.get_connection().await;

        let removed = conn.execute(
            "DELETE FROM pending_entries
             WHERE provider = ?1 AND request_id = ?2 AND fulfilled = 0 AND created_at < ?3",
            params![
                key.provider().as_str(),
                key.request_id() as i64,
                cutoff.timestamp(),
            ],
        )?;

        Ok(removed > 0)
    }

    pub async fn list(&self) -> Result<Vec<PendingEntry>> {
        let conn = self.storage.get_connection().await;

        let mut stmt = conn.prepare(
            "SELECT provider, request_id, caller, usd_amount, win_probability_ppm, created_at, fulfilled
             FROM pending_entries ORDER BY created_at ASC, request_id ASC",
        )?;

        let entry_iter = stmt.query_map([], row_to_entry)?;

        let mut entries = Vec::new();
        for entry in entry_iter {
            entries.push(entry?);
        }

        Ok(entries)
    }

    pub async fn count(&self) -> Result<u64> {
        let conn = self.storage.get_connection().await;

        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM pending_entries", [], |row| row.get(0))?;

        Ok(count as u64)
    }
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<PendingEntry> {
    let provider_str: String = row.get(0)?;
    let request_id: i64 = row.get(1)?;
    let usd_amount: i64 = row.get(3)?;
    let win_probability_ppm: i64 = row.get(4)?;
    let created_timestamp: i64 = row.get(5)?;

    let provider = ProviderKind::from_str(&provider_str).ok_or_else(|| {
        rusqlite::Error::InvalidColumnType(0, "provider".to_string(), rusqlite::types::Type::Text)
    })?;

    Ok(PendingEntry {
        key: provider.key(request_id as u64),
        caller: row.get(2)?,
        usd_amount: usd_amount as u64,
        win_probability_ppm: win_probability_ppm as u64,
        created_at: DateTime::from_timestamp(created_timestamp, 0).unwrap_or_else(Utc::now),
        fulfilled: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_entry(key: EntryKey) -> PendingEntry {
        PendingEntry {
            key,
            caller: "alice".to_string(),
            usd_amount: 50_000_000,
            win_probability_ppm: 1_234,
            created_at: Utc::now(),
            fulfilled: false,
        }
    }

    #[tokio::test]
    async fn insert_get_delete_roundtrip() {
        let storage = Storage::in_memory().await.unwrap();
        let store = EntryStore::new(&storage);

        let entry = sample_entry(EntryKey::Local(1));
        store.insert(&entry).await.unwrap();

        let loaded = store.get(EntryKey::Local(1)).await.unwrap().unwrap();
        assert_eq!(loaded.caller, "alice");
        assert_eq!(loaded.usd_amount, 50_000_000);
        assert_eq!(loaded.win_probability_ppm, 1_234);
        assert!(!loaded.fulfilled);

        store.delete(EntryKey::Local(1)).await.unwrap();
        assert!(store.get(EntryKey::Local(1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn same_request_id_under_both_providers() {
        let storage = Storage::in_memory().await.unwrap();
        let store = EntryStore::new(&storage);

        store.insert(&sample_entry(EntryKey::Local(9))).await.unwrap();
        store
            .insert(&sample_entry(EntryKey::CrossDomain(9)))
            .await
            .unwrap();

        assert_eq!(store.count().await.unwrap(), 2);
        assert!(store.get(EntryKey::Local(9)).await.unwrap().is_some());
        assert!(store.get(EntryKey::CrossDomain(9)).await.unwrap().is_some());

        store.delete(EntryKey::Local(9)).await.unwrap();
        assert!(store.get(EntryKey::CrossDomain(9)).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn take_is_at_most_once() {
        let storage = Storage::in_memory().await.unwrap();
        let store = EntryStore::new(&storage);

        store.insert(&sample_entry(EntryKey::Local(3))).await.unwrap();

        let taken = store.take_for_fulfillment(EntryKey::Local(3)).await.unwrap();
        assert!(taken.fulfilled);

        let second = store.take_for_fulfillment(EntryKey::Local(3)).await;
        assert!(matches!(
            second,
            Err(LotteryError::AlreadyFulfilled(EntryKey::Local(3)))
        ));
    }

    #[tokio::test]
    async fn take_unknown_entry_fails() {
        let storage = Storage::in_memory().await.unwrap();
        let store = EntryStore::new(&storage);

        let result = store.take_for_fulfillment(EntryKey::CrossDomain(77)).await;
        assert!(matches!(
            result,
            Err(LotteryError::UnknownEntry(EntryKey::CrossDomain(77)))
        ));
    }

    #[tokio::test]
    async fn conditional_delete_spares_fresh_and_fulfilled_entries() {
        let storage = Storage::in_memory().await.unwrap();
        let store = EntryStore::new(&storage);

        let now = Utc::now();
        let cutoff = now - chrono::Duration::seconds(60);

        let mut stale = sample_entry(EntryKey::Local(1));
        stale.created_at = now - chrono::Duration::seconds(120);
        store.insert(&stale).await.unwrap();

        let fresh = sample_entry(EntryKey::Local(2));
        store.insert(&fresh).await.unwrap();

        let mut claimed = sample_entry(EntryKey::Local(3));
        claimed.created_at = now - chrono::Duration::seconds(120);
        store.insert(&claimed).await.unwrap();
        store.take_for_fulfillment(EntryKey::Local(3)).await.unwrap();

        assert!(store.delete_if_expired(EntryKey::Local(1), cutoff).await.unwrap());
        assert!(!store.delete_if_expired(EntryKey::Local(2), cutoff).await.unwrap());
        assert!(!store.delete_if_expired(EntryKey::Local(3), cutoff).await.unwrap());
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn list_orders_by_creation() {
        let storage = Storage::in_memory().await.unwrap();
        let store = EntryStore::new(&storage);

        let mut first = sample_entry(EntryKey::Local(10));
        first.created_at = Utc::now() - chrono::Duration::seconds(30);
        let second = sample_entry(EntryKey::CrossDomain(2));

        store.insert(&second).await.unwrap();
        store.insert(&first).await.unwrap();

        let entries = store.list().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].key, EntryKey::Local(10));
        assert_eq!(entries[1].key, EntryKey::CrossDomain(2));
    }
}
