pub mod entry_store;
pub mod stats_store;

pub use entry_store::EntryStore;
pub use stats_store::StatsStore;

use crate::error::{LotteryError, Result};
use rusqlite::Connection;
use std::path::Path;
use tokio::sync::Mutex;

/// Owns the SQLite connection. Every read-modify-write sequence runs under
/// one lock of `conn`, which is what serializes the engine's atomic steps.
pub struct Storage {
    conn: Mutex<Connection>,
}

impl Storage {
    pub async fn new(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                LotteryError::internal(format!("Failed to create directory: {}", e))
            })?;
        }

        let conn = Connection::open(db_path)?;
        let storage = Self {
            conn: Mutex::new(conn),
        };

        storage.init_schema().await?;
        Ok(storage)
    }

    /// In-memory database for tests and throwaway simulations.
    pub async fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let storage = Self {
            conn: Mutex::new(conn),
        };

        storage.init_schema().await?;
        Ok(storage)
    }

    async fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock().await;

        // Entries awaiting a random word
        conn.execute(
            "CREATE TABLE IF NOT EXISTS pending_entries (
                provider TEXT NOT NULL,
                request_id INTEGER NOT NULL,
                caller TEXT NOT NULL,
                usd_amount INTEGER NOT NULL,
                win_probability_ppm INTEGER NOT NULL,
                created_at INTEGER NOT NULL,
                fulfilled INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (provider, request_id)
            )",
            [],
        )?;

        // Lifetime per-caller counters
        conn.execute(
            "CREATE TABLE IF NOT EXISTS user_stats (
                account TEXT PRIMARY KEY,
                total_entries INTEGER NOT NULL DEFAULT 0,
                total_volume_usd INTEGER NOT NULL DEFAULT 0,
                total_wins INTEGER NOT NULL DEFAULT 0,
                total_rewards TEXT NOT NULL DEFAULT '0',
                last_entry_time INTEGER
            )",
            [],
        )?;

        Ok(())
    }

    pub async fn get_connection(&self) -> tokio::sync::MutexGuard<'_, Connection> {
        self.conn.lock().await
    }
}
