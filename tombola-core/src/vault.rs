//! The payout reserve: a token account plus yield-bearing share positions.
//!
//! Payouts redeem shares into the reserve account first and transfer to the
//! winner last, in one final step. An aborted payout therefore leaves the
//! recipient with nothing and the reserve's capacity intact, shifted from
//! shares into the direct balance at worst.

use crate::error::{LotteryError, Result};
use crate::providers::{ShareVault, Token};
use crate::types::{PayoutBreakdown, SharePositionStatus};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;

pub struct PayoutVault {
    account: String,
    token: Arc<dyn Token>,
    positions: Vec<Arc<dyn ShareVault>>,
    authorized: RwLock<HashSet<String>>,
}

impl PayoutVault {
    pub fn new(
        account: impl Into<String>,
        token: Arc<dyn Token>,
        positions: Vec<Arc<dyn ShareVault>>,
    ) -> Self {
        Self {
            account: account.into(),
            token,
            positions,
            authorized: RwLock::new(HashSet::new()),
        }
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn authorize(&self, caller: &str) {
        self.authorized.write().insert(caller.to_string());
    }

    pub fn deauthorize(&self, caller: &str) {
        self.authorized.write().remove(caller);
    }

    pub fn is_authorized(&self, caller: &str) -> bool {
        self.authorized.read().contains(caller)
    }

    pub async fn direct_balance(&self) -> Result<u128> {
        self.token.balance_of(&self.account).await
    }

    /// Direct balance plus the value of every share position.
    ///
    /// Positions whose valuation fails are counted as zero.
    pub async fn payable_capacity(&self) -> Result<u128> {
        let (direct, positions) = self.snapshot().await?;
        Ok(direct + positions.iter().map(|p| p.asset_value).sum::<u128>())
    }

    pub async fn snapshot(&self) -> Result<(u128, Vec<SharePositionStatus>)> {
        let direct = self.direct_balance().await?;

        let mut positions = Vec::with_capacity(self.positions.len());
        for position in &self.positions {
            let share_balance = match position.share_balance_of(&self.account).await {
                Ok(balance) => balance,
                Err(e) => {
                    tracing::warn!(
                        position = position.name(),
                        error = %e,
                        "Share balance unavailable, valuing position at zero"
                    );
                    positions.push(SharePositionStatus {
                        name: position.name().to_string(),
                        share_balance: 0,
                        asset_value: 0,
                    });
                    continue;
                }
            };

            let asset_value = match position.convert_to_assets(share_balance).await {
                Ok(value) => value,
                Err(e) => {
                    tracing::warn!(
                        position = position.name(),
                        error = %e,
                        "Share valuation unavailable, valuing position at zero"
                    );
                    0
                }
            };

            positions.push(SharePositionStatus {
                name: position.name().to_string(),
                share_balance,
                asset_value,
            });
        }

        Ok((direct, positions))
    }

    /// Pays `amount` to `recipient`, redeeming shares as needed.
    ///
    /// Either the recipient receives the full amount or the call fails with
    /// nothing sent; there is no partial payout.
    pub async fn pay(
        &self,
        caller: &str,
        recipient: &str,
        amount: u128,
    ) -> Result<PayoutBreakdown> {
        if !self.is_authorized(caller) {
            return Err(LotteryError::unauthorized(format!(
                "{caller} may not spend the reserve"
            )));
        }
        if recipient.is_empty() {
            return Err(LotteryError::invalid_input("recipient cannot be empty"));
        }
        if amount == 0 {
            return Err(LotteryError::invalid_input("payout amount cannot be zero"));
        }

        let direct = self.direct_balance().await?;

        if direct < amount {
            let mut shortfall = amount - direct;

            for position in &self.positions {
                if shortfall == 0 {
                    break;
                }

                let held = match position.share_balance_of(&self.account).await {
                    Ok(balance) => balance,
                    Err(e) => {
                        tracing::warn!(
                            position = position.name(),
                            error = %e,
                            "Share balance unavailable, skipping position"
                        );
                        continue;
                    }
                };
                if held == 0 {
                    continue;
                }

                let wanted = match shares_for_assets(position.as_ref(), shortfall).await {
                    Some(shares) => shares.min(held),
                    None => held,
                };
                if wanted == 0 {
                    continue;
                }

                let received = match position.redeem(&self.account, wanted).await {
                    Ok(assets) => assets,
                    Err(e) => {
                        tracing::warn!(
                            position = position.name(),
                            error = %e,
                            "Share redemption failed, skipping position"
                        );
                        continue;
                    }
                };

                tracing::debug!(
                    position = position.name(),
                    shares = %wanted,
                    received = %received,
                    "Redeemed reserve shares"
                );
                shortfall = shortfall.saturating_sub(received);
            }

            let available = self.direct_balance().await?;
            if available < amount {
                return Err(LotteryError::InsufficientLiquidity {
                    need: amount,
                    available,
                });
            }
        }

        self.token.transfer(&self.account, recipient, amount).await?;

        let from_direct = direct.min(amount);
        Ok(PayoutBreakdown {
            from_direct,
            from_shares: amount - from_direct,
        })
    }
}

/// Shares that must be redeemed to free up `assets`.
///
/// Tries the exact withdrawal preview, falls back to the conversion rate
/// (padded by one share for its floor rounding), and reports `None` when
/// neither quote is available so the caller drains the position instead.
async fn shares_for_assets(vault: &dyn ShareVault, assets: u128) -> Option<u128> {
    match vault.preview_withdraw(assets).await {
        Ok(shares) => return Some(shares),
        Err(e) => {
            tracing::debug!(
                position = vault.name(),
                error = %e,
                "Withdraw preview failed, trying conversion rate"
            );
        }
    }

    match vault.convert_to_shares(assets).await {
        Ok(shares) => Some(shares.saturating_add(1)),
        Err(e) => {
            tracing::debug!(
                position = vault.name(),
                error = %e,
                "Conversion unavailable, draining position"
            );
            None
        }
    }
}
