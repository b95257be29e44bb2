//! tombola - stake-weighted lottery engine for token transfer streams
//!
//! Every qualifying transfer earns a chance to win a share of a communal
//! reserve: USD value sets the base chance, locked stake boosts it, an
//! external randomness source decides it, and the payout vault settles it.

pub mod boost;
pub mod broker;
pub mod config;
pub mod curve;
pub mod engine;
pub mod error;
pub mod outcome;
pub mod providers;
pub mod storage;
pub mod types;
pub mod vault;

#[cfg(test)]
pub(crate) mod testutil;

pub use boost::BoostCalculator;
pub use broker::RandomnessBroker;
pub use config::EngineConfig;
pub use engine::LotteryEngine;
pub use error::{LotteryError, Result};
pub use providers::{
    BoostProvider, CrossDomainRandomness, LocalRandomness, PriceOracle, Providers, ShareVault,
    Token,
};
pub use storage::Storage;
pub use types::{
    BoostContext, EntryKey, EntryOutcome, PayoutBreakdown, PendingEntry, ProviderKind,
    ReserveStatus, SharePositionStatus, UserStats, BPS_SCALE, PPM_SCALE, USD_SCALE,
};
pub use vault::PayoutVault;
