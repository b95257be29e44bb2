//! Trait seams for every external system the engine consumes.
//!
//! The engine never talks to a price feed, staking registry, randomness
//! source or token ledger directly; callers inject implementations of these
//! traits. Tests use in-memory fakes, the CLI uses a simulated environment.

pub mod randomness;
pub mod token;

use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

pub use randomness::{CrossDomainRandomness, LocalRandomness};
pub use token::{ShareVault, Token};

/// Values token transfers in USD (six decimals).
#[async_trait]
pub trait PriceOracle: Send + Sync {
    async fn usd_value(&self, token: &str, amount: u128) -> Result<u64>;
}

/// Reports a caller's boost standing from the staking system.
#[async_trait]
pub trait BoostProvider: Send + Sync {
    /// Caller's boost multiplier in basis points of 1x.
    async fn boost_multiplier_bps(&self, account: &str) -> Result<u64>;

    /// USD value of the caller's locked stake (six decimals).
    async fn locked_stake_usd(&self, account: &str) -> Result<u64>;
}

/// The full set of collaborators the engine is wired with.
#[derive(Clone)]
pub struct Providers {
    pub oracle: Arc<dyn PriceOracle>,
    pub boost: Arc<dyn BoostProvider>,
    pub local_randomness: Option<Arc<dyn LocalRandomness>>,
    pub cross_domain_randomness: Option<Arc<dyn CrossDomainRandomness>>,
}
