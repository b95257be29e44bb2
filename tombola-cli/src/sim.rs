//! A JSON-persisted stand-in for everything the engine talks to.
//!
//! One file holds the token ledger, oracle prices, boost standings, both
//! randomness sources and the share vault, so the asynchronous gap between
//! a swap and its fulfillment callback is observable across invocations:
//! `tombola swap` queues a callback, `tombola deliver` plays it back.
//! Random words derive from a seed via SHA-256, making every run
//! reproducible.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tombola_core::{
    BoostProvider, CrossDomainRandomness, EngineConfig, EntryKey, LocalRandomness, LotteryError,
    PriceOracle, Providers, Result, ShareVault, Token, USD_SCALE,
};

/// The reward token has six decimals, like its USD quotes.
pub const TOKEN_SCALE: u128 = 1_000_000;

pub const ENGINE_ID: &str = "lottery-engine";
pub const ADMIN: &str = "admin";
pub const RESERVE_ACCOUNT: &str = "jackpot-reserve";
pub const POOL_ACCOUNT: &str = "amm-pool";
pub const LOCAL_IDENTITY: &str = "vrf-local";
pub const BRIDGE_IDENTITY: &str = "vrf-bridge";
pub const DEFAULT_PROCESSOR: &str = "transfer-hook";
pub const DEFAULT_TOKEN: &str = "TOMB";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoostStanding {
    pub multiplier_bps: u64,
    pub locked_usd: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    pub config: EngineConfig,
    pub paused: bool,
    pub fee_balance: u128,
    pub processors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimState {
    pub seed: u64,
    pub balances: HashMap<String, u128>,
    pub prices_usd: HashMap<String, u64>,
    pub oracle_online: bool,
    pub boosts: HashMap<String, BoostStanding>,
    pub local_online: bool,
    pub local_next_id: u64,
    pub bridge_online: bool,
    pub bridge_fee: u128,
    pub bridge_next_id: u64,
    pub queued: Vec<EntryKey>,
    pub shares: HashMap<String, u128>,
    pub share_rate_num: u128,
    pub share_rate_den: u128,
    pub engine: EngineSettings,
}

impl Default for SimState {
    fn default() -> Self {
        let mut prices_usd = HashMap::new();
        prices_usd.insert(DEFAULT_TOKEN.to_string(), 2 * USD_SCALE); // $2 per token

        Self {
            seed: 0x0074_6f6d_626f_6c61,
            balances: HashMap::new(),
            prices_usd,
            oracle_online: true,
            boosts: HashMap::new(),
            local_online: true,
            local_next_id: 0,
            bridge_online: true,
            bridge_fee: 25,
            bridge_next_id: 0,
            queued: Vec::new(),
            shares: HashMap::new(),
            share_rate_num: 1,
            share_rate_den: 1,
            engine: EngineSettings {
                config: EngineConfig::default(),
                paused: false,
                fee_balance: 0,
                processors: vec![DEFAULT_PROCESSOR.to_string()],
            },
        }
    }
}

#[derive(Clone)]
pub struct SimEnv {
    state: Arc<RwLock<SimState>>,
    path: PathBuf,
}

impl SimEnv {
    pub fn load(path: &Path) -> Result<Self> {
        let state = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_json::from_str(&content)?
        } else {
            tracing::debug!(path = %path.display(), "No environment file, starting fresh");
            SimState::default()
        };

        Ok(Self {
            state: Arc::new(RwLock::new(state)),
            path: path.to_path_buf(),
        })
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&*self.state.read())?;
        std::fs::write(&self.path, content)?;
        tracing::debug!(path = %self.path.display(), "Environment saved");
        Ok(())
    }

    pub fn providers(&self) -> Providers {
        Providers {
            oracle: Arc::new(SimOracle {
                state: self.state.clone(),
            }),
            boost: Arc::new(SimBoost {
                state: self.state.clone(),
            }),
            local_randomness: Some(Arc::new(SimLocal {
                state: self.state.clone(),
            })),
            cross_domain_randomness: Some(Arc::new(SimBridge {
                state: self.state.clone(),
            })),
        }
    }

    pub fn token(&self) -> Arc<SimToken> {
        Arc::new(SimToken {
            state: self.state.clone(),
        })
    }

    pub fn share_vault(&self) -> Arc<SimShareVault> {
        Arc::new(SimShareVault {
            state: self.state.clone(),
        })
    }

    pub fn engine_settings(&self) -> EngineSettings {
        self.state.read().engine.clone()
    }

    pub fn store_engine_settings(&self, config: EngineConfig, paused: bool, fee_balance: u128) {
        let mut state = self.state.write();
        state.engine.config = config;
        state.engine.paused = paused;
        state.engine.fee_balance = fee_balance;
    }

    pub fn add_processor(&self, processor: &str) {
        let mut state = self.state.write();
        if !state.engine.processors.iter().any(|p| p == processor) {
            state.engine.processors.push(processor.to_string());
        }
    }

    pub fn remove_processor(&self, processor: &str) {
        self.state
            .write()
            .engine
            .processors
            .retain(|p| p != processor);
    }

    pub fn deposit(&self, account: &str, amount: u128) -> u128 {
        let mut state = self.state.write();
        let balance = state.balances.entry(account.to_string()).or_insert(0);
        *balance += amount;
        *balance
    }

    pub fn balance(&self, account: &str) -> u128 {
        self.state.read().balances.get(account).copied().unwrap_or(0)
    }

    pub fn mint_shares(&self, owner: &str, shares: u128) -> u128 {
        let mut state = self.state.write();
        let held = state.shares.entry(owner.to_string()).or_insert(0);
        *held += shares;
        *held
    }

    pub fn set_price(&self, token: &str, usd: u64) {
        self.state
            .write()
            .prices_usd
            .insert(token.to_string(), usd);
    }

    pub fn set_oracle_online(&self, online: bool) {
        self.state.write().oracle_online = online;
    }

    pub fn set_local_online(&self, online: bool) {
        self.state.write().local_online = online;
    }

    pub fn set_bridge_online(&self, online: bool) {
        self.state.write().bridge_online = online;
    }

    pub fn set_bridge_fee(&self, fee: u128) {
        self.state.write().bridge_fee = fee;
    }

    pub fn set_boost(&self, account: &str, standing: BoostStanding) {
        self.state
            .write()
            .boosts
            .insert(account.to_string(), standing);
    }

    pub fn queued(&self) -> Vec<EntryKey> {
        self.state.read().queued.clone()
    }

    pub fn remove_queued(&self, key: EntryKey) {
        self.state.write().queued.retain(|&k| k != key);
    }

    /// Deterministic random word for a request, derived from the seed.
    pub fn word_for(&self, key: EntryKey) -> u128 {
        let seed = self.state.read().seed;
        let mut hasher = Sha256::new();
        hasher.update(seed.to_be_bytes());
        hasher.update(key.provider().as_str().as_bytes());
        hasher.update(key.request_id().to_be_bytes());
        let digest = hasher.finalize();

        let mut word = [0u8; 16];
        word.copy_from_slice(&digest[..16]);
        u128::from_be_bytes(word)
    }

    /// Source identity a genuine callback for `key` would carry.
    pub fn source_for(&self, key: EntryKey) -> &'static str {
        match key {
            EntryKey::Local(_) => LOCAL_IDENTITY,
            EntryKey::CrossDomain(_) => BRIDGE_IDENTITY,
        }
    }
}

pub struct SimOracle {
    state: Arc<RwLock<SimState>>,
}

#[async_trait]
impl PriceOracle for SimOracle {
    async fn usd_value(&self, token: &str, amount: u128) -> Result<u64> {
        let state = self.state.read();
        if !state.oracle_online {
            return Err(LotteryError::oracle("price feed offline"));
        }
        let price = state
            .prices_usd
            .get(token)
            .copied()
            .ok_or_else(|| LotteryError::oracle(format!("no price listed for {token}")))?;

        let usd = amount.saturating_mul(price as u128) / TOKEN_SCALE;
        Ok(u64::try_from(usd).unwrap_or(u64::MAX))
    }
}

pub struct SimBoost {
    state: Arc<RwLock<SimState>>,
}

#[async_trait]
impl BoostProvider for SimBoost {
    async fn boost_multiplier_bps(&self, account: &str) -> Result<u64> {
        Ok(self
            .state
            .read()
            .boosts
            .get(account)
            .map(|s| s.multiplier_bps)
            .unwrap_or(0))
    }

    async fn locked_stake_usd(&self, account: &str) -> Result<u64> {
        Ok(self
            .state
            .read()
            .boosts
            .get(account)
            .map(|s| s.locked_usd)
            .unwrap_or(0))
    }
}

pub struct SimLocal {
    state: Arc<RwLock<SimState>>,
}

#[async_trait]
impl LocalRandomness for SimLocal {
    fn identity(&self) -> &str {
        LOCAL_IDENTITY
    }

    async fn request_randomness(&self) -> Result<u64> {
        let mut state = self.state.write();
        if !state.local_online {
            return Err(LotteryError::randomness("local source offline"));
        }
        state.local_next_id += 1;
        let id = state.local_next_id;
        state.queued.push(EntryKey::Local(id));
        Ok(id)
    }
}

pub struct SimBridge {
    state: Arc<RwLock<SimState>>,
}

#[async_trait]
impl CrossDomainRandomness for SimBridge {
    fn identity(&self) -> &str {
        BRIDGE_IDENTITY
    }

    async fn quote_fee(&self) -> Result<u128> {
        let state = self.state.read();
        if !state.bridge_online {
            return Err(LotteryError::randomness("bridge offline"));
        }
        Ok(state.bridge_fee)
    }

    async fn request_randomness(&self, max_fee: u128) -> Result<(String, u64)> {
        let mut state = self.state.write();
        if !state.bridge_online {
            return Err(LotteryError::randomness("bridge offline"));
        }
        if max_fee < state.bridge_fee {
            return Err(LotteryError::randomness("fee below current quote"));
        }

        state.bridge_next_id += 1;
        let id = state.bridge_next_id;
        state.queued.push(EntryKey::CrossDomain(id));

        let mut hasher = Sha256::new();
        hasher.update(state.seed.to_be_bytes());
        hasher.update(b"receipt");
        hasher.update(id.to_be_bytes());
        let receipt = hex::encode(&hasher.finalize()[..8]);
        Ok((receipt, id))
    }
}

pub struct SimToken {
    state: Arc<RwLock<SimState>>,
}

#[async_trait]
impl Token for SimToken {
    async fn balance_of(&self, account: &str) -> Result<u128> {
        Ok(self.state.read().balances.get(account).copied().unwrap_or(0))
    }

    async fn transfer(&self, from: &str, to: &str, amount: u128) -> Result<()> {
        let mut state = self.state.write();
        let from_balance = state.balances.get(from).copied().unwrap_or(0);
        if from_balance < amount {
            return Err(LotteryError::token(format!(
                "{from} holds {from_balance}, cannot send {amount}"
            )));
        }
        state.balances.insert(from.to_string(), from_balance - amount);
        *state.balances.entry(to.to_string()).or_insert(0) += amount;
        Ok(())
    }
}

pub struct SimShareVault {
    state: Arc<RwLock<SimState>>,
}

#[async_trait]
impl ShareVault for SimShareVault {
    fn name(&self) -> &str {
        "yield-vault"
    }

    async fn share_balance_of(&self, owner: &str) -> Result<u128> {
        Ok(self.state.read().shares.get(owner).copied().unwrap_or(0))
    }

    async fn convert_to_assets(&self, shares: u128) -> Result<u128> {
        let state = self.state.read();
        Ok(shares * state.share_rate_num / state.share_rate_den)
    }

    async fn convert_to_shares(&self, assets: u128) -> Result<u128> {
        let state = self.state.read();
        Ok(assets * state.share_rate_den / state.share_rate_num)
    }

    async fn preview_withdraw(&self, assets: u128) -> Result<u128> {
        let state = self.state.read();
        Ok((assets * state.share_rate_den + state.share_rate_num - 1) / state.share_rate_num)
    }

    async fn redeem(&self, owner: &str, shares: u128) -> Result<u128> {
        let mut state = self.state.write();
        let held = state.shares.get(owner).copied().unwrap_or(0);
        if held < shares {
            return Err(LotteryError::share_vault(format!(
                "{owner} holds {held} shares, cannot redeem {shares}"
            )));
        }

        let assets = shares * state.share_rate_num / state.share_rate_den;
        state.shares.insert(owner.to_string(), held - shares);
        *state.balances.entry(owner.to_string()).or_insert(0) += assets;
        Ok(assets)
    }
}
