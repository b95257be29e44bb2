use crate::error::Result;
use async_trait::async_trait;

/// The reward token ledger.
#[async_trait]
pub trait Token: Send + Sync {
    async fn balance_of(&self, account: &str) -> Result<u128>;

    /// Moves `amount` between accounts the caller controls.
    async fn transfer(&self, from: &str, to: &str, amount: u128) -> Result<()>;
}

/// A yield-bearing vault holding reward tokens against shares.
///
/// Redeeming burns shares from `owner` and credits the underlying tokens to
/// the owner's balance on the reward token ledger.
#[async_trait]
pub trait ShareVault: Send + Sync {
    /// Human-readable position name for status reporting.
    fn name(&self) -> &str;

    async fn share_balance_of(&self, owner: &str) -> Result<u128>;

    /// Underlying token value of `shares` at the current rate.
    async fn convert_to_assets(&self, shares: u128) -> Result<u128>;

    /// Shares worth `assets` at the current rate, rounding down.
    async fn convert_to_shares(&self, assets: u128) -> Result<u128>;

    /// Exact shares that must be burned to withdraw `assets`.
    async fn preview_withdraw(&self, assets: u128) -> Result<u128>;

    /// Burns `shares` from `owner`; returns the tokens credited back.
    async fn redeem(&self, owner: &str, shares: u128) -> Result<u128>;
}
