//! In-memory fakes for every provider trait, shared across unit tests.

use crate::error::{LotteryError, Result};
use crate::providers::{
    BoostProvider, CrossDomainRandomness, LocalRandomness, PriceOracle, ShareVault, Token,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

pub struct MockOracle {
    usd_value: u64,
    fail: AtomicBool,
}

impl MockOracle {
    /// Reports the same USD value for every transfer.
    pub fn fixed(usd_value: u64) -> Self {
        Self {
            usd_value,
            fail: AtomicBool::new(false),
        }
    }

    pub fn failing() -> Self {
        let oracle = Self::fixed(0);
        oracle.fail.store(true, Ordering::SeqCst);
        oracle
    }
}

#[async_trait]
impl PriceOracle for MockOracle {
    async fn usd_value(&self, _token: &str, _amount: u128) -> Result<u64> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(LotteryError::oracle("price feed offline"));
        }
        Ok(self.usd_value)
    }
}

pub struct MockBoost {
    multiplier_bps: u64,
    locked_usd: u64,
    fail_multiplier: bool,
    fail_stake: bool,
}

impl MockBoost {
    pub fn new(multiplier_bps: u64, locked_usd: u64) -> Self {
        Self {
            multiplier_bps,
            locked_usd,
            fail_multiplier: false,
            fail_stake: false,
        }
    }

    pub fn failing() -> Self {
        let mut boost = Self::new(0, 0);
        boost.fail_multiplier = true;
        boost
    }

    pub fn with_stake_failure(mut self) -> Self {
        self.fail_stake = true;
        self
    }
}

#[async_trait]
impl BoostProvider for MockBoost {
    async fn boost_multiplier_bps(&self, _account: &str) -> Result<u64> {
        if self.fail_multiplier {
            return Err(LotteryError::boost("staking registry offline"));
        }
        Ok(self.multiplier_bps)
    }

    async fn locked_stake_usd(&self, _account: &str) -> Result<u64> {
        if self.fail_stake {
            return Err(LotteryError::boost("staking registry offline"));
        }
        Ok(self.locked_usd)
    }
}

pub struct MockLocal {
    identity: String,
    next_id: AtomicU64,
    fail: AtomicBool,
}

impl MockLocal {
    pub fn new(identity: &str) -> Self {
        Self {
            identity: identity.to_string(),
            next_id: AtomicU64::new(1),
            fail: AtomicBool::new(false),
        }
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl LocalRandomness for MockLocal {
    fn identity(&self) -> &str {
        &self.identity
    }

    async fn request_randomness(&self) -> Result<u64> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(LotteryError::randomness("local source offline"));
        }
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst))
    }
}

pub struct MockCrossDomain {
    identity: String,
    fee: AtomicU64,
    next_id: AtomicU64,
    fail_quote: AtomicBool,
    fail_request: AtomicBool,
}

impl MockCrossDomain {
    pub fn new(identity: &str, fee: u64) -> Self {
        Self {
            identity: identity.to_string(),
            fee: AtomicU64::new(fee),
            next_id: AtomicU64::new(1),
            fail_quote: AtomicBool::new(false),
            fail_request: AtomicBool::new(false),
        }
    }

    pub fn set_fee(&self, fee: u64) {
        self.fee.store(fee, Ordering::SeqCst);
    }

    pub fn set_quote_failing(&self, fail: bool) {
        self.fail_quote.store(fail, Ordering::SeqCst);
    }

    pub fn set_request_failing(&self, fail: bool) {
        self.fail_request.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl CrossDomainRandomness for MockCrossDomain {
    fn identity(&self) -> &str {
        &self.identity
    }

    async fn quote_fee(&self) -> Result<u128> {
        if self.fail_quote.load(Ordering::SeqCst) {
            return Err(LotteryError::randomness("bridge quote unavailable"));
        }
        Ok(self.fee.load(Ordering::SeqCst) as u128)
    }

    async fn request_randomness(&self, max_fee: u128) -> Result<(String, u64)> {
        if self.fail_request.load(Ordering::SeqCst) {
            return Err(LotteryError::randomness("bridge rejected request"));
        }
        let fee = self.fee.load(Ordering::SeqCst) as u128;
        if max_fee < fee {
            return Err(LotteryError::randomness("fee below current quote"));
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        Ok((format!("msg-{id:04x}"), id))
    }
}

pub struct MockToken {
    balances: Mutex<HashMap<String, u128>>,
    fail_transfers: AtomicBool,
}

impl MockToken {
    pub fn new() -> Self {
        Self {
            balances: Mutex::new(HashMap::new()),
            fail_transfers: AtomicBool::new(false),
        }
    }

    pub fn deposit(&self, account: &str, amount: u128) {
        let mut balances = self.balances.lock();
        *balances.entry(account.to_string()).or_insert(0) += amount;
    }

    pub fn balance(&self, account: &str) -> u128 {
        self.balances.lock().get(account).copied().unwrap_or(0)
    }

    pub fn set_fail_transfers(&self, fail: bool) {
        self.fail_transfers.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Token for MockToken {
    async fn balance_of(&self, account: &str) -> Result<u128> {
        Ok(self.balance(account))
    }

    async fn transfer(&self, from: &str, to: &str, amount: u128) -> Result<()> {
        if self.fail_transfers.load(Ordering::SeqCst) {
            return Err(LotteryError::token("ledger rejected transfer"));
        }
        let mut balances = self.balances.lock();
        let from_balance = balances.get(from).copied().unwrap_or(0);
        if from_balance < amount {
            return Err(LotteryError::token(format!(
                "balance {from_balance} below transfer {amount}"
            )));
        }
        balances.insert(from.to_string(), from_balance - amount);
        *balances.entry(to.to_string()).or_insert(0) += amount;
        Ok(())
    }
}

/// Share vault over a [`MockToken`]; `rate_num / rate_den` tokens per share.
pub struct MockShareVault {
    name: String,
    token: Arc<MockToken>,
    shares: Mutex<HashMap<String, u128>>,
    rate_num: u128,
    rate_den: u128,
    fail_preview: AtomicBool,
    fail_convert: AtomicBool,
    fail_redeem: AtomicBool,
}

impl MockShareVault {
    pub fn new(name: &str, token: Arc<MockToken>, rate_num: u128, rate_den: u128) -> Self {
        Self {
            name: name.to_string(),
            token,
            shares: Mutex::new(HashMap::new()),
            rate_num,
            rate_den,
            fail_preview: AtomicBool::new(false),
            fail_convert: AtomicBool::new(false),
            fail_redeem: AtomicBool::new(false),
        }
    }

    pub fn mint_shares(&self, owner: &str, shares: u128) {
        let mut map = self.shares.lock();
        *map.entry(owner.to_string()).or_insert(0) += shares;
    }

    pub fn shares(&self, owner: &str) -> u128 {
        self.shares.lock().get(owner).copied().unwrap_or(0)
    }

    pub fn set_fail_preview(&self, fail: bool) {
        self.fail_preview.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_convert(&self, fail: bool) {
        self.fail_convert.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_redeem(&self, fail: bool) {
        self.fail_redeem.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ShareVault for MockShareVault {
    fn name(&self) -> &str {
        &self.name
    }

    async fn share_balance_of(&self, owner: &str) -> Result<u128> {
        Ok(self.shares(owner))
    }

    async fn convert_to_assets(&self, shares: u128) -> Result<u128> {
        Ok(shares * self.rate_num / self.rate_den)
    }

    async fn convert_to_shares(&self, assets: u128) -> Result<u128> {
        if self.fail_convert.load(Ordering::SeqCst) {
            return Err(LotteryError::share_vault("conversion unavailable"));
        }
        Ok(assets * self.rate_den / self.rate_num)
    }

    async fn preview_withdraw(&self, assets: u128) -> Result<u128> {
        if self.fail_preview.load(Ordering::SeqCst) {
            return Err(LotteryError::share_vault("preview unavailable"));
        }
        // shares rounded up so the withdrawal covers the full amount
        Ok((assets * self.rate_den + self.rate_num - 1) / self.rate_num)
    }

    async fn redeem(&self, owner: &str, shares: u128) -> Result<u128> {
        if self.fail_redeem.load(Ordering::SeqCst) {
            return Err(LotteryError::share_vault("redemption unavailable"));
        }
        let mut map = self.shares.lock();
        let held = map.get(owner).copied().unwrap_or(0);
        if held < shares {
            return Err(LotteryError::share_vault(format!(
                "share balance {held} below redemption {shares}"
            )));
        }
        map.insert(owner.to_string(), held - shares);
        drop(map);

        let assets = shares * self.rate_num / self.rate_den;
        self.token.deposit(owner, assets);
        Ok(assets)
    }
}
