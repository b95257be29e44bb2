//! Tracks every lottery entry from randomness request to fulfillment.
//!
//! An entry is opened against whichever provider accepts the request: the
//! local source first, then the cross-domain bridge. Provider outages are
//! not errors here; `open_entry` reports them as `None` and the transfer
//! that triggered the entry proceeds without one.

use crate::error::{LotteryError, Result};
use crate::providers::{CrossDomainRandomness, LocalRandomness};
use crate::storage::{EntryStore, Storage};
use crate::types::{EntryKey, PendingEntry};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Duration;

pub struct RandomnessBroker {
    storage: Arc<Storage>,
    local: RwLock<Option<Arc<dyn LocalRandomness>>>,
    cross_domain: RwLock<Option<Arc<dyn CrossDomainRandomness>>>,
    /// Native-unit balance available for cross-domain request fees.
    fee_balance: Mutex<u128>,
}

impl RandomnessBroker {
    pub fn new(
        storage: Arc<Storage>,
        local: Option<Arc<dyn LocalRandomness>>,
        cross_domain: Option<Arc<dyn CrossDomainRandomness>>,
    ) -> Self {
        Self {
            storage,
            local: RwLock::new(local),
            cross_domain: RwLock::new(cross_domain),
            fee_balance: Mutex::new(0),
        }
    }

    pub fn set_local(&self, provider: Arc<dyn LocalRandomness>) {
        *self.local.write() = Some(provider);
    }

    pub fn set_cross_domain(&self, provider: Arc<dyn CrossDomainRandomness>) {
        *self.cross_domain.write() = Some(provider);
    }

    pub fn fund_fees(&self, amount: u128) -> u128 {
        let mut balance = self.fee_balance.lock();
        *balance = balance.saturating_add(amount);
        *balance
    }

    pub fn fee_balance(&self) -> u128 {
        *self.fee_balance.lock()
    }

    /// Requests a random word and records the pending entry.
    ///
    /// Returns `None` when no provider accepted the request; the caller
    /// treats that as "no entry this transfer".
    pub async fn open_entry(
        &self,
        caller: &str,
        usd_amount: u64,
        win_probability_ppm: u64,
        now: DateTime<Utc>,
    ) -> Result<Option<PendingEntry>> {
        let local = self.local.read().clone();
        if let Some(provider) = local {
            match provider.request_randomness().await {
                Ok(request_id) => {
                    let entry = self
                        .record_entry(EntryKey::Local(request_id), caller, usd_amount, win_probability_ppm, now)
                        .await?;
                    tracing::info!(
                        key = %entry.key,
                        caller,
                        chance_ppm = win_probability_ppm,
                        "Randomness requested from local source"
                    );
                    return Ok(Some(entry));
                }
                Err(e) => {
                    tracing::warn!(
                        caller,
                        error = %e,
                        "Local randomness unavailable, trying cross-domain"
                    );
                }
            }
        }

        let cross_domain = self.cross_domain.read().clone();
        if let Some(provider) = cross_domain {
            match provider.quote_fee().await {
                Ok(fee) => {
                    if !self.reserve_fee(fee) {
                        tracing::warn!(
                            caller,
                            need = %fee,
                            available = %self.fee_balance(),
                            "Fee balance cannot cover cross-domain request, entry skipped"
                        );
                        return Ok(None);
                    }

                    match provider.request_randomness(fee).await {
                        Ok((receipt, sequence_id)) => {
                            let entry = self
                                .record_entry(
                                    EntryKey::CrossDomain(sequence_id),
                                    caller,
                                    usd_amount,
                                    win_probability_ppm,
                                    now,
                                )
                                .await?;
                            tracing::info!(
                                key = %entry.key,
                                caller,
                                receipt,
                                fee = %fee,
                                "Randomness requested through cross-domain bridge"
                            );
                            return Ok(Some(entry));
                        }
                        Err(e) => {
                            self.refund_fee(fee);
                            tracing::warn!(
                                caller,
                                error = %e,
                                "Cross-domain randomness request failed"
                            );
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(caller, error = %e, "Cross-domain fee quote failed");
                }
            }
        }

        tracing::warn!(caller, "No randomness source available, lottery entry skipped");
        Ok(None)
    }

    /// Claims the entry for `key` after verifying the callback source.
    pub async fn take_for_fulfillment(&self, source: &str, key: EntryKey) -> Result<PendingEntry> {
        self.verify_source(key, source)?;
        EntryStore::new(&self.storage).take_for_fulfillment(key).await
    }

    /// Removes a fully processed entry.
    pub async fn discard(&self, key: EntryKey) -> Result<()> {
        EntryStore::new(&self.storage).delete(key).await
    }

    /// Sweeps the given keys, deleting those unfulfilled and older than
    /// `timeout`. Unknown keys are ignored. Returns how many were removed.
    pub async fn expire_entries(
        &self,
        keys: &[EntryKey],
        timeout: Duration,
        now: DateTime<Utc>,
    ) -> Result<usize> {
        let timeout = chrono::Duration::from_std(timeout)
            .map_err(|_| LotteryError::internal("entry timeout out of range"))?;
        let cutoff = now - timeout;

        let store = EntryStore::new(&self.storage);
        let mut removed = 0;
        for &key in keys {
            if store.delete_if_expired(key, cutoff).await? {
                tracing::info!(key = %key, "Expired lottery entry removed");
                removed += 1;
            }
        }

        if removed > 0 {
            tracing::info!(removed, "Expiry sweep finished");
        }
        Ok(removed)
    }

    pub async fn pending_entry(&self, key: EntryKey) -> Result<Option<PendingEntry>> {
        EntryStore::new(&self.storage).get(key).await
    }

    pub async fn pending_entries(&self) -> Result<Vec<PendingEntry>> {
        EntryStore::new(&self.storage).list().await
    }

    async fn record_entry(
        &self,
        key: EntryKey,
        caller: &str,
        usd_amount: u64,
        win_probability_ppm: u64,
        now: DateTime<Utc>,
    ) -> Result<PendingEntry> {
        let entry = PendingEntry {
            key,
            caller: caller.to_string(),
            usd_amount,
            win_probability_ppm,
            created_at: now,
            fulfilled: false,
        };
        EntryStore::new(&self.storage).insert(&entry).await?;
        Ok(entry)
    }

    fn verify_source(&self, key: EntryKey, source: &str) -> Result<()> {
        let expected = match key {
            EntryKey::Local(_) => self
                .local
                .read()
                .as_ref()
                .map(|p| p.identity().to_string()),
            EntryKey::CrossDomain(_) => self
                .cross_domain
                .read()
                .as_ref()
                .map(|p| p.identity().to_string()),
        };

        match expected {
            Some(expected) if expected == source => Ok(()),
            Some(expected) => Err(LotteryError::UnauthorizedCallback {
                got: source.to_string(),
                expected,
            }),
            None => Err(LotteryError::unauthorized(format!(
                "no {} randomness source configured",
                key.provider().as_str()
            ))),
        }
    }

    fn reserve_fee(&self, fee: u128) -> bool {
        let mut balance = self.fee_balance.lock();
        if *balance < fee {
            return false;
        }
        *balance -= fee;
        true
    }

    fn refund_fee(&self, fee: u128) {
        *self.fee_balance.lock() += fee;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{MockCrossDomain, MockLocal};

    async fn broker(
        local: Option<Arc<MockLocal>>,
        cross_domain: Option<Arc<MockCrossDomain>>,
    ) -> RandomnessBroker {
        let storage = Arc::new(Storage::in_memory().await.unwrap());
        RandomnessBroker::new(
            storage,
            local.map(|p| p as Arc<dyn LocalRandomness>),
            cross_domain.map(|p| p as Arc<dyn CrossDomainRandomness>),
        )
    }

    #[tokio::test]
    async fn prefers_the_local_source() {
        let local = Arc::new(MockLocal::new("vrf-local"));
        let cross = Arc::new(MockCrossDomain::new("vrf-bridge", 50));
        let broker = broker(Some(local), Some(cross)).await;
        broker.fund_fees(1_000);

        let entry = broker
            .open_entry("alice", 100_000_000, 2_000, Utc::now())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(entry.key, EntryKey::Local(1));
        assert_eq!(broker.fee_balance(), 1_000);
        assert_eq!(broker.pending_entries().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn falls_back_to_cross_domain_and_pays_the_fee() {
        let local = Arc::new(MockLocal::new("vrf-local"));
        local.set_failing(true);
        let cross = Arc::new(MockCrossDomain::new("vrf-bridge", 50));
        let broker = broker(Some(local), Some(cross)).await;
        broker.fund_fees(120);

        let entry = broker
            .open_entry("alice", 100_000_000, 2_000, Utc::now())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(entry.key, EntryKey::CrossDomain(1));
        assert_eq!(broker.fee_balance(), 70);
    }

    #[tokio::test]
    async fn underfunded_fee_balance_skips_the_entry() {
        let cross = Arc::new(MockCrossDomain::new("vrf-bridge", 50));
        let broker = broker(None, Some(cross)).await;
        broker.fund_fees(49);

        let entry = broker
            .open_entry("alice", 100_000_000, 2_000, Utc::now())
            .await
            .unwrap();

        assert!(entry.is_none());
        assert_eq!(broker.fee_balance(), 49);
        assert!(broker.pending_entries().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rising_fee_is_charged_per_entry_until_the_balance_runs_out() {
        let cross = Arc::new(MockCrossDomain::new("vrf-bridge", 30));
        let broker = broker(None, Some(cross.clone())).await;
        broker.fund_fees(100);

        let first = broker
            .open_entry("alice", 100_000_000, 2_000, Utc::now())
            .await
            .unwrap();
        assert!(first.is_some());
        assert_eq!(broker.fee_balance(), 70);

        cross.set_fee(60);
        let second = broker
            .open_entry("bob", 100_000_000, 2_000, Utc::now())
            .await
            .unwrap();
        assert!(second.is_some());
        assert_eq!(broker.fee_balance(), 10);

        let third = broker
            .open_entry("carol", 100_000_000, 2_000, Utc::now())
            .await
            .unwrap();
        assert!(third.is_none());
        assert_eq!(broker.fee_balance(), 10);
        assert_eq!(broker.pending_entries().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn rejected_request_refunds_the_fee() {
        let cross = Arc::new(MockCrossDomain::new("vrf-bridge", 50));
        cross.set_request_failing(true);
        let broker = broker(None, Some(cross)).await;
        broker.fund_fees(100);

        let entry = broker
            .open_entry("alice", 100_000_000, 2_000, Utc::now())
            .await
            .unwrap();

        assert!(entry.is_none());
        assert_eq!(broker.fee_balance(), 100);
    }

    #[tokio::test]
    async fn no_provider_means_no_entry() {
        let broker = broker(None, None).await;

        let entry = broker
            .open_entry("alice", 100_000_000, 2_000, Utc::now())
            .await
            .unwrap();

        assert!(entry.is_none());
        assert!(broker.pending_entries().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn callback_source_must_match_the_provider() {
        let local = Arc::new(MockLocal::new("vrf-local"));
        let broker = broker(Some(local), None).await;

        let entry = broker
            .open_entry("alice", 100_000_000, 2_000, Utc::now())
            .await
            .unwrap()
            .unwrap();

        let spoofed = broker.take_for_fulfillment("mallory", entry.key).await;
        assert!(matches!(
            spoofed,
            Err(LotteryError::UnauthorizedCallback { .. })
        ));

        let taken = broker
            .take_for_fulfillment("vrf-local", entry.key)
            .await
            .unwrap();
        assert!(taken.fulfilled);

        let again = broker.take_for_fulfillment("vrf-local", entry.key).await;
        assert!(matches!(again, Err(LotteryError::AlreadyFulfilled(_))));
    }

    #[tokio::test]
    async fn cross_domain_id_cannot_claim_a_local_entry() {
        let local = Arc::new(MockLocal::new("vrf-local"));
        let cross = Arc::new(MockCrossDomain::new("vrf-bridge", 0));
        let broker = broker(Some(local), Some(cross)).await;

        let entry = broker
            .open_entry("alice", 100_000_000, 2_000, Utc::now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(entry.key, EntryKey::Local(1));

        // same numeric id, wrong domain
        let result = broker
            .take_for_fulfillment("vrf-bridge", EntryKey::CrossDomain(1))
            .await;
        assert!(matches!(
            result,
            Err(LotteryError::UnknownEntry(EntryKey::CrossDomain(1)))
        ));
    }

    #[tokio::test]
    async fn expiry_removes_only_stale_unfulfilled_entries() {
        let local = Arc::new(MockLocal::new("vrf-local"));
        let broker = broker(Some(local), None).await;

        let now = Utc::now();
        let old = now - chrono::Duration::seconds(7_200);
        let stale = broker
            .open_entry("alice", 100_000_000, 2_000, old)
            .await
            .unwrap()
            .unwrap();
        let fresh = broker
            .open_entry("bob", 100_000_000, 2_000, now)
            .await
            .unwrap()
            .unwrap();
        let claimed = broker
            .open_entry("carol", 100_000_000, 2_000, old)
            .await
            .unwrap()
            .unwrap();
        broker
            .take_for_fulfillment("vrf-local", claimed.key)
            .await
            .unwrap();

        let keys = [stale.key, fresh.key, claimed.key, EntryKey::Local(999)];
        let removed = broker
            .expire_entries(&keys, Duration::from_secs(3600), now)
            .await
            .unwrap();

        assert_eq!(removed, 1);
        assert!(broker.pending_entry(stale.key).await.unwrap().is_none());
        assert!(broker.pending_entry(fresh.key).await.unwrap().is_some());
        assert!(broker.pending_entry(claimed.key).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn discard_removes_the_entry() {
        let local = Arc::new(MockLocal::new("vrf-local"));
        let broker = broker(Some(local), None).await;

        let entry = broker
            .open_entry("alice", 100_000_000, 2_000, Utc::now())
            .await
            .unwrap()
            .unwrap();
        broker.discard(entry.key).await.unwrap();

        assert!(broker.pending_entry(entry.key).await.unwrap().is_none());
    }
}
