//! The lottery engine facade.
//!
//! `process_entry` hangs a lottery entry off a token transfer that has
//! already happened; fulfillment callbacks resolve entries and pay winners.
//! Dependency outages degrade to "no entry" so the transfer stream is never
//! blocked, while protocol violations (spoofed callbacks, replayed
//! fulfillments, unauthorized admin calls) fail hard.

use crate::boost::BoostCalculator;
use crate::broker::RandomnessBroker;
use crate::config::EngineConfig;
use crate::curve;
use crate::error::{LotteryError, Result};
use crate::outcome;
use crate::providers::{
    BoostProvider, CrossDomainRandomness, LocalRandomness, PriceOracle, Providers,
};
use crate::storage::{StatsStore, Storage};
use crate::types::{BoostContext, EntryKey, EntryOutcome, PendingEntry, ReserveStatus, UserStats};
use crate::vault::PayoutVault;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub struct LotteryEngine {
    identity: String,
    admin: String,
    config: RwLock<EngineConfig>,
    paused: AtomicBool,
    processors: RwLock<HashSet<String>>,
    oracle: RwLock<Arc<dyn PriceOracle>>,
    boost: RwLock<BoostCalculator>,
    broker: RandomnessBroker,
    vault: PayoutVault,
    storage: Arc<Storage>,
}

impl LotteryEngine {
    pub fn new(
        config: EngineConfig,
        identity: impl Into<String>,
        admin: impl Into<String>,
        storage: Arc<Storage>,
        providers: Providers,
        vault: PayoutVault,
    ) -> Result<Self> {
        config.validate()?;

        let identity = identity.into();
        let admin = admin.into();
        if identity.is_empty() || admin.is_empty() {
            return Err(LotteryError::invalid_input(
                "engine and admin identities cannot be empty",
            ));
        }

        vault.authorize(&identity);
        vault.authorize(&admin);

        let broker = RandomnessBroker::new(
            storage.clone(),
            providers.local_randomness,
            providers.cross_domain_randomness,
        );

        tracing::info!(identity, admin, "Lottery engine initialized");

        Ok(Self {
            identity,
            admin,
            config: RwLock::new(config),
            paused: AtomicBool::new(false),
            processors: RwLock::new(HashSet::new()),
            oracle: RwLock::new(providers.oracle),
            boost: RwLock::new(BoostCalculator::new(providers.boost)),
            broker,
            vault,
            storage,
        })
    }

    /// Attaches a lottery entry to a finished token transfer.
    ///
    /// Returns the key of the pending entry, or `None` when the transfer
    /// did not qualify or a dependency was unavailable. Errors are reserved
    /// for boundary violations: unknown processor, paused engine, malformed
    /// input.
    pub async fn process_entry(
        &self,
        processor: &str,
        user: &str,
        token: &str,
        amount: u128,
        usd_value_hint: u64,
    ) -> Result<Option<EntryKey>> {
        if !self.processors.read().contains(processor) {
            return Err(LotteryError::unauthorized(format!(
                "{processor} is not a registered transfer processor"
            )));
        }
        if self.paused.load(Ordering::SeqCst) {
            return Err(LotteryError::Paused);
        }
        if user.is_empty() {
            return Err(LotteryError::invalid_input("user identity cannot be empty"));
        }
        if amount == 0 {
            return Err(LotteryError::invalid_input("transfer amount cannot be zero"));
        }

        let config = self.config.read().clone();

        let usd_amount = if usd_value_hint > 0 {
            usd_value_hint
        } else {
            let oracle = self.oracle.read().clone();
            match oracle.usd_value(token, amount).await {
                Ok(usd) => usd,
                Err(e) => {
                    tracing::warn!(user, token, error = %e, "Price oracle unavailable, entry skipped");
                    return Ok(None);
                }
            }
        };

        let base_ppm = curve::base_chance_ppm(&config, usd_amount);
        if base_ppm == 0 {
            tracing::debug!(user, usd_amount, "Transfer below minimum entry, no lottery entry");
            return Ok(None);
        }

        let calculator = self.boost.read().clone();
        let (chance_ppm, boost_ctx) = calculator
            .boosted_chance(&config, user, base_ppm, usd_amount)
            .await;

        let now = Utc::now();
        let Some(entry) = self
            .broker
            .open_entry(user, usd_amount, chance_ppm, now)
            .await?
        else {
            return Ok(None);
        };

        StatsStore::new(&self.storage)
            .record_entry(user, usd_amount, now)
            .await?;

        tracing::info!(
            key = %entry.key,
            user,
            usd_amount,
            base_ppm,
            chance_ppm,
            boosted_usd = boost_ctx.boosted_portion_usd,
            "Lottery entry created"
        );
        Ok(Some(entry.key))
    }

    /// Fulfillment callback from the local randomness source.
    pub async fn handle_local_callback(
        &self,
        source: &str,
        request_id: u64,
        random_words: &[u128],
    ) -> Result<EntryOutcome> {
        self.fulfill(source, EntryKey::Local(request_id), random_words)
            .await
    }

    /// Fulfillment callback relayed by the cross-domain bridge.
    pub async fn handle_cross_domain_callback(
        &self,
        source: &str,
        sequence_id: u64,
        random_words: &[u128],
    ) -> Result<EntryOutcome> {
        self.fulfill(source, EntryKey::CrossDomain(sequence_id), random_words)
            .await
    }

    async fn fulfill(
        &self,
        source: &str,
        key: EntryKey,
        random_words: &[u128],
    ) -> Result<EntryOutcome> {
        let word = random_words.first().copied().ok_or_else(|| {
            LotteryError::invalid_input("fulfillment carried no random words")
        })?;

        let entry = self.broker.take_for_fulfillment(source, key).await?;
        let config = self.config.read().clone();

        let won = outcome::is_win(entry.win_probability_ppm, word);
        let mut result = EntryOutcome {
            key,
            caller: entry.caller.clone(),
            won,
            reward: 0,
            paid: false,
        };

        if won {
            self.pay_winner(&entry, &config, &mut result).await;

            let paid_reward = if result.paid { result.reward } else { 0 };
            StatsStore::new(&self.storage)
                .record_win(&entry.caller, paid_reward)
                .await?;
        } else {
            tracing::debug!(key = %key, caller = %entry.caller, "Entry resolved as a loss");
        }

        self.broker.discard(key).await?;
        Ok(result)
    }

    /// Sizes and attempts the payout. Failures are logged, never returned:
    /// the fulfillment bookkeeping must complete regardless.
    async fn pay_winner(
        &self,
        entry: &PendingEntry,
        config: &EngineConfig,
        result: &mut EntryOutcome,
    ) {
        let capacity = match self.vault.payable_capacity().await {
            Ok(capacity) => capacity,
            Err(e) => {
                tracing::warn!(
                    key = %entry.key,
                    winner = %entry.caller,
                    error = %e,
                    "Reserve unavailable, win recorded without payout"
                );
                return;
            }
        };

        let reward = outcome::reward_amount(capacity, config.reward_bps);
        result.reward = reward;
        if reward == 0 {
            tracing::warn!(
                key = %entry.key,
                winner = %entry.caller,
                "Reserve is empty, win recorded without payout"
            );
            return;
        }

        match self.vault.pay(&self.identity, &entry.caller, reward).await {
            Ok(breakdown) => {
                result.paid = true;
                tracing::info!(
                    key = %entry.key,
                    winner = %entry.caller,
                    reward = %reward,
                    from_direct = %breakdown.from_direct,
                    from_shares = %breakdown.from_shares,
                    "Jackpot paid"
                );
            }
            Err(e) => {
                tracing::warn!(
                    key = %entry.key,
                    winner = %entry.caller,
                    reward = %reward,
                    error = %e,
                    "Payout failed, win recorded without transfer"
                );
            }
        }
    }

    /// Sweeps expired entries. Open to any caller; the deletion conditions
    /// make it safe to race against fulfillment.
    pub async fn expire_entries(&self, keys: &[EntryKey]) -> Result<usize> {
        let timeout = self.config.read().entry_timeout;
        self.broker.expire_entries(keys, timeout, Utc::now()).await
    }

    // ---- queries ----

    pub async fn user_stats(&self, account: &str) -> Result<UserStats> {
        StatsStore::new(&self.storage).get(account).await
    }

    pub async fn all_stats(&self) -> Result<Vec<UserStats>> {
        StatsStore::new(&self.storage).list().await
    }

    pub async fn pending_entry(&self, key: EntryKey) -> Result<Option<PendingEntry>> {
        self.broker.pending_entry(key).await
    }

    pub async fn pending_entries(&self) -> Result<Vec<PendingEntry>> {
        self.broker.pending_entries().await
    }

    pub async fn reserve_status(&self) -> Result<ReserveStatus> {
        let (direct_balance, positions) = self.vault.snapshot().await?;
        let payable_capacity =
            direct_balance + positions.iter().map(|p| p.asset_value).sum::<u128>();
        let reward_preview =
            outcome::reward_amount(payable_capacity, self.config.read().reward_bps);

        Ok(ReserveStatus {
            direct_balance,
            positions,
            payable_capacity,
            reward_preview,
        })
    }

    /// Chance preview for a hypothetical entry, without opening one.
    pub async fn quote_chance(
        &self,
        account: &str,
        usd_amount: u64,
    ) -> (u64, u64, BoostContext) {
        let config = self.config.read().clone();
        let base_ppm = curve::base_chance_ppm(&config, usd_amount);
        if base_ppm == 0 {
            return (0, 0, BoostContext::default());
        }

        let calculator = self.boost.read().clone();
        let (chance_ppm, ctx) = calculator
            .boosted_chance(&config, account, base_ppm, usd_amount)
            .await;
        (base_ppm, chance_ppm, ctx)
    }

    pub fn fee_balance(&self) -> u128 {
        self.broker.fee_balance()
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> EngineConfig {
        self.config.read().clone()
    }

    pub fn is_authorized_processor(&self, processor: &str) -> bool {
        self.processors.read().contains(processor)
    }

    // ---- admin surface ----

    pub fn pause(&self, caller: &str) -> Result<()> {
        self.ensure_admin(caller)?;
        self.paused.store(true, Ordering::SeqCst);
        tracing::warn!(caller, "Entry processing paused");
        Ok(())
    }

    pub fn resume(&self, caller: &str) -> Result<()> {
        self.ensure_admin(caller)?;
        self.paused.store(false, Ordering::SeqCst);
        tracing::info!(caller, "Entry processing resumed");
        Ok(())
    }

    pub fn authorize_processor(&self, caller: &str, processor: &str) -> Result<()> {
        self.ensure_admin(caller)?;
        if processor.is_empty() {
            return Err(LotteryError::invalid_input("processor identity cannot be empty"));
        }
        self.processors.write().insert(processor.to_string());
        tracing::info!(processor, "Transfer processor authorized");
        Ok(())
    }

    pub fn deauthorize_processor(&self, caller: &str, processor: &str) -> Result<()> {
        self.ensure_admin(caller)?;
        self.processors.write().remove(processor);
        tracing::info!(processor, "Transfer processor deauthorized");
        Ok(())
    }

    pub fn set_price_oracle(&self, caller: &str, oracle: Arc<dyn PriceOracle>) -> Result<()> {
        self.ensure_admin(caller)?;
        *self.oracle.write() = oracle;
        tracing::info!(caller, "Price oracle replaced");
        Ok(())
    }

    pub fn set_boost_provider(&self, caller: &str, provider: Arc<dyn BoostProvider>) -> Result<()> {
        self.ensure_admin(caller)?;
        *self.boost.write() = BoostCalculator::new(provider);
        tracing::info!(caller, "Boost provider replaced");
        Ok(())
    }

    pub fn set_local_randomness(
        &self,
        caller: &str,
        provider: Arc<dyn LocalRandomness>,
    ) -> Result<()> {
        self.ensure_admin(caller)?;
        self.broker.set_local(provider);
        tracing::info!(caller, "Local randomness source replaced");
        Ok(())
    }

    pub fn set_cross_domain_randomness(
        &self,
        caller: &str,
        provider: Arc<dyn CrossDomainRandomness>,
    ) -> Result<()> {
        self.ensure_admin(caller)?;
        self.broker.set_cross_domain(provider);
        tracing::info!(caller, "Cross-domain randomness source replaced");
        Ok(())
    }

    /// Adds to the balance the broker spends on cross-domain request fees.
    pub fn fund_fees(&self, caller: &str, amount: u128) -> Result<u128> {
        self.ensure_admin(caller)?;
        let balance = self.broker.fund_fees(amount);
        tracing::info!(caller, amount = %amount, balance = %balance, "Randomness fee balance funded");
        Ok(balance)
    }

    pub fn set_curve(
        &self,
        caller: &str,
        min_entry_usd: u64,
        max_entry_usd: u64,
        min_win_chance_ppm: u64,
        max_win_chance_ppm: u64,
    ) -> Result<()> {
        self.update_config(caller, "probability curve", |config| {
            config.min_entry_usd = min_entry_usd;
            config.max_entry_usd = max_entry_usd;
            config.min_win_chance_ppm = min_win_chance_ppm;
            config.max_win_chance_ppm = max_win_chance_ppm;
        })
    }

    pub fn set_reward_bps(&self, caller: &str, reward_bps: u64) -> Result<()> {
        self.update_config(caller, "reward fraction", |config| {
            config.reward_bps = reward_bps;
        })
    }

    pub fn set_entry_timeout(&self, caller: &str, timeout: Duration) -> Result<()> {
        self.update_config(caller, "entry timeout", |config| {
            config.entry_timeout = timeout;
        })
    }

    pub fn set_boost_limits(
        &self,
        caller: &str,
        max_boost_bps: u64,
        max_win_probability_ppm: u64,
    ) -> Result<()> {
        self.update_config(caller, "boost limits", |config| {
            config.max_boost_bps = max_boost_bps;
            config.max_win_probability_ppm = max_win_probability_ppm;
        })
    }

    fn update_config(
        &self,
        caller: &str,
        what: &str,
        mutate: impl FnOnce(&mut EngineConfig),
    ) -> Result<()> {
        self.ensure_admin(caller)?;

        let mut config = self.config.write();
        let mut candidate = config.clone();
        mutate(&mut candidate);
        candidate.validate()?;
        *config = candidate;

        tracing::info!(caller, what, "Engine configuration updated");
        Ok(())
    }

    fn ensure_admin(&self, caller: &str) -> Result<()> {
        if caller != self.admin {
            return Err(LotteryError::unauthorized(format!(
                "{caller} is not the engine administrator"
            )));
        }
        Ok(())
    }
}
