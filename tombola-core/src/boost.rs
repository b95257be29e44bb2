//! Stake-weighted boost applied on top of the base chance.
//!
//! Only the portion of an entry covered by the caller's locked stake is
//! boosted; the rest keeps the base chance. Both provider lookups fail open:
//! any error leaves the caller at the unboosted base chance.

use crate::config::EngineConfig;
use crate::providers::BoostProvider;
use crate::types::{BoostContext, BPS_SCALE};
use std::sync::Arc;

#[derive(Clone)]
pub struct BoostCalculator {
    provider: Arc<dyn BoostProvider>,
}

impl BoostCalculator {
    pub fn new(provider: Arc<dyn BoostProvider>) -> Self {
        Self { provider }
    }

    /// Effective win chance for `account`, with the inputs that shaped it.
    pub async fn boosted_chance(
        &self,
        config: &EngineConfig,
        account: &str,
        base_ppm: u64,
        usd_amount: u64,
    ) -> (u64, BoostContext) {
        let mut ctx = BoostContext {
            unboosted_portion_usd: usd_amount,
            ..Default::default()
        };

        if base_ppm == 0 || usd_amount == 0 {
            return (base_ppm, ctx);
        }

        let multiplier = match self.provider.boost_multiplier_bps(account).await {
            Ok(bps) => bps.min(config.max_boost_bps),
            Err(e) => {
                tracing::warn!(
                    account,
                    error = %e,
                    "Boost multiplier unavailable, using base chance"
                );
                return (base_ppm, ctx);
            }
        };
        ctx.boost_multiplier_bps = multiplier;

        // a multiplier at or below 1x can neither boost nor penalize
        if multiplier <= BPS_SCALE {
            return (base_ppm, ctx);
        }

        let locked = match self.provider.locked_stake_usd(account).await {
            Ok(usd) => usd,
            Err(e) => {
                tracing::warn!(
                    account,
                    error = %e,
                    "Locked stake unavailable, using base chance"
                );
                return (base_ppm, ctx);
            }
        };
        ctx.locked_stake_usd = locked;

        if locked == 0 {
            return (base_ppm, ctx);
        }

        let boosted = usd_amount.min(locked);
        let unboosted = usd_amount - boosted;
        ctx.boosted_portion_usd = boosted;
        ctx.unboosted_portion_usd = unboosted;

        // weighted average of base and multiplied chance over the two portions
        let weighted = base_ppm as u128 * unboosted as u128
            + base_ppm as u128 * boosted as u128 * multiplier as u128 / BPS_SCALE as u128;
        let chance = (weighted / usd_amount as u128) as u64;

        (chance.min(config.max_win_probability_ppm), ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MockBoost;
    use crate::types::USD_SCALE;

    fn config() -> EngineConfig {
        EngineConfig::default()
    }

    async fn chance_for(
        provider: MockBoost,
        base_ppm: u64,
        usd_amount: u64,
    ) -> (u64, BoostContext) {
        let calc = BoostCalculator::new(Arc::new(provider));
        calc.boosted_chance(&config(), "alice", base_ppm, usd_amount)
            .await
    }

    #[tokio::test]
    async fn no_stake_keeps_base_chance() {
        let (chance, ctx) = chance_for(MockBoost::new(20_000, 0), 1_000, 100 * USD_SCALE).await;
        assert_eq!(chance, 1_000);
        assert_eq!(ctx.boosted_portion_usd, 0);
    }

    #[tokio::test]
    async fn full_coverage_applies_full_multiplier() {
        // 2x multiplier, stake covers the whole entry
        let (chance, ctx) =
            chance_for(MockBoost::new(20_000, 1_000 * USD_SCALE), 1_000, 100 * USD_SCALE).await;
        assert_eq!(chance, 2_000);
        assert_eq!(ctx.boosted_portion_usd, 100 * USD_SCALE);
        assert_eq!(ctx.unboosted_portion_usd, 0);
    }

    #[tokio::test]
    async fn partial_coverage_blends_proportionally() {
        // $100 entry, $25 locked at 2x: 25% doubled, 75% at base
        let (chance, ctx) =
            chance_for(MockBoost::new(20_000, 25 * USD_SCALE), 1_000, 100 * USD_SCALE).await;
        assert_eq!(chance, 1_250);
        assert_eq!(ctx.boosted_portion_usd, 25 * USD_SCALE);
        assert_eq!(ctx.unboosted_portion_usd, 75 * USD_SCALE);
    }

    #[tokio::test]
    async fn multiplier_is_clamped_to_cap() {
        // provider reports 10x, config cap is 2.5x
        let (chance, ctx) =
            chance_for(MockBoost::new(100_000, 1_000 * USD_SCALE), 1_000, 100 * USD_SCALE).await;
        assert_eq!(chance, 2_500);
        assert_eq!(ctx.boost_multiplier_bps, 25_000);
    }

    #[tokio::test]
    async fn boosted_chance_never_exceeds_global_cap() {
        // 40_000 base at 2.5x would be 100_000, exactly the cap
        let (chance, _) =
            chance_for(MockBoost::new(25_000, u64::MAX / 2), 40_000, 10_000 * USD_SCALE).await;
        assert_eq!(chance, 100_000);

        let tight = EngineConfig {
            max_win_probability_ppm: 50_000,
            ..EngineConfig::default()
        };
        let calc = BoostCalculator::new(Arc::new(MockBoost::new(25_000, u64::MAX / 2)));
        let (chance, _) = calc
            .boosted_chance(&tight, "alice", 40_000, 10_000 * USD_SCALE)
            .await;
        assert_eq!(chance, 50_000);
    }

    #[tokio::test]
    async fn sub_one_multiplier_cannot_penalize() {
        let (chance, _) =
            chance_for(MockBoost::new(5_000, 1_000 * USD_SCALE), 1_000, 100 * USD_SCALE).await;
        assert_eq!(chance, 1_000);
    }

    #[tokio::test]
    async fn provider_failure_falls_back_to_base() {
        let (chance, ctx) = chance_for(MockBoost::failing(), 1_000, 100 * USD_SCALE).await;
        assert_eq!(chance, 1_000);
        assert_eq!(ctx.boost_multiplier_bps, 0);

        let (chance, _) =
            chance_for(MockBoost::new(20_000, 50 * USD_SCALE).with_stake_failure(), 1_000, 100 * USD_SCALE)
                .await;
        assert_eq!(chance, 1_000);
    }

    #[tokio::test]
    async fn more_stake_never_lowers_the_chance() {
        let base = 1_000;
        let usd = 100 * USD_SCALE;
        let mut last = 0;
        for locked in [0u64, 10, 25, 50, 75, 100, 200].map(|v| v * USD_SCALE) {
            let (chance, _) = chance_for(MockBoost::new(20_000, locked), base, usd).await;
            assert!(chance >= last, "chance dropped at locked={locked}");
            last = chance;
        }
    }
}
