//! Risk engine: health factor, borrow sizing and entry/exit/re-entry decisions.

use crate::domain::{GasConditions, MarketConditions, PriceTrend, RiskMetrics};

use super::StrategyPolicy;

/// Outcome of [`RiskEngine::should_exit_loop`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitDecision {
    pub should_exit: bool,
    /// Empty when `should_exit` is false.
    pub reason: String,
}

impl ExitDecision {
    fn exit(reason: &str) -> Self {
        Self {
            should_exit: true,
            reason: reason.to_string(),
        }
    }

    fn hold() -> Self {
        Self {
            should_exit: false,
            reason: String::new(),
        }
    }
}

/// Pure decision functions over one [`StrategyPolicy`].
#[derive(Debug, Clone, Copy)]
pub struct RiskEngine {
    policy: StrategyPolicy,
}

impl RiskEngine {
    pub fn new(policy: StrategyPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &StrategyPolicy {
        &self.policy
    }

    /// `collateral * liquidation_threshold / borrow`, or `+inf` with no debt.
    pub fn calculate_health_factor(&self, collateral_value_usd: f64, borrow_value_usd: f64) -> f64 {
        if borrow_value_usd == 0.0 {
            return f64::INFINITY;
        }
        collateral_value_usd * self.policy.liquidation_threshold / borrow_value_usd
    }

    /// Health factor after adding collateral and debt (both in asset units).
    pub fn project_health_factor(
        &self,
        current_collateral: f64,
        additional_collateral: f64,
        current_borrow: f64,
        additional_borrow: f64,
        collateral_price: f64,
        borrow_price: f64,
    ) -> f64 {
        self.calculate_health_factor(
            (current_collateral + additional_collateral) * collateral_price,
            (current_borrow + additional_borrow) * borrow_price,
        )
    }

    /// Largest USD borrow that keeps the position at the target health factor.
    pub fn calculate_max_safe_exposure(&self, collateral_value_usd: f64) -> f64 {
        collateral_value_usd * self.policy.liquidation_threshold / self.policy.target_health_factor
    }

    /// Borrow size in asset units, scaled down linearly as volatility
    /// approaches `max_volatility` (zero at or beyond it).
    pub fn calculate_optimal_borrow_amount(
        &self,
        collateral_value_usd: f64,
        price: f64,
        volatility: f64,
    ) -> f64 {
        if price <= 0.0 {
            return 0.0;
        }
        let max_safe = self.calculate_max_safe_exposure(collateral_value_usd);
        let adjustment = (1.0 - volatility / self.policy.max_volatility).max(0.0);
        max_safe * adjustment / price
    }

    pub fn assess_risk(&self, profit_loss_pct: f64, volatility: f64, health_factor: f64) -> RiskMetrics {
        RiskMetrics {
            volatility,
            projected_health_factor: health_factor * (1.0 - volatility),
            safety_margin: profit_loss_pct,
        }
    }

    pub fn should_enter_loop(&self, mc: &MarketConditions, current_profit_pct: f64) -> bool {
        (mc.is_favorable || mc.profit_potential > self.policy.min_profit_potential_pct)
            && mc.volatility < self.policy.max_volatility
            && mc.gas_conditions != GasConditions::High
            && current_profit_pct >= -self.policy.safety_margin_pct
    }

    /// Ordered exit checks; the first that matches supplies the reason.
    pub fn should_exit_loop(
        &self,
        health_factor: f64,
        mc: &MarketConditions,
        profit_loss_pct: f64,
    ) -> ExitDecision {
        if health_factor < self.policy.min_health_factor {
            return ExitDecision::exit("Health factor below minimum threshold");
        }
        if profit_loss_pct < -self.policy.safety_margin_pct {
            return ExitDecision::exit("Position showing loss beyond safety margin");
        }
        if mc.volatility > self.policy.critical_volatility {
            return ExitDecision::exit("Market volatility too high");
        }
        if mc.price_trend == PriceTrend::Down && profit_loss_pct > self.policy.profit_lock_pct {
            return ExitDecision::exit("Locking in profits in downward trend");
        }
        if mc.gas_conditions == GasConditions::High && profit_loss_pct > 0.0 {
            return ExitDecision::exit("High gas costs with existing profits");
        }
        ExitDecision::hold()
    }

    pub fn should_reenter_loop(&self, mc: &MarketConditions, last_exit_profit_pct: f64) -> bool {
        mc.is_favorable
            && mc.volatility < self.policy.max_volatility
            && mc.price_trend != PriceTrend::Down
            && mc.gas_conditions != GasConditions::High
            && last_exit_profit_pct >= -self.policy.safety_margin_pct
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> RiskEngine {
        RiskEngine::new(StrategyPolicy::default())
    }

    fn calm() -> MarketConditions {
        MarketConditions {
            is_favorable: true,
            volatility: 0.01,
            price_trend: PriceTrend::Stable,
            profit_potential: 3.0,
            gas_conditions: GasConditions::Low,
        }
    }

    #[test]
    fn test_health_factor_infinite_without_debt() {
        assert_eq!(engine().calculate_health_factor(10_000.0, 0.0), f64::INFINITY);
    }

    #[test]
    fn test_health_factor_formula() {
        let hf = engine().calculate_health_factor(10_000.0, 5_500.0);
        assert!((hf - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_project_health_factor() {
        let hf = engine().project_health_factor(4.0, 1.0, 2.0, 0.75, 2000.0, 2000.0);
        assert!((hf - 10_000.0 * 0.825 / 5_500.0).abs() < 1e-12);
    }

    #[test]
    fn test_optimal_borrow_targets_health_factor() {
        let borrow = engine().calculate_optimal_borrow_amount(10_000.0, 2000.0, 0.0);
        assert!((borrow - 2.75).abs() < 1e-12);
        let hf = engine().calculate_health_factor(10_000.0, borrow * 2000.0);
        assert!((hf - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_optimal_borrow_scales_with_volatility() {
        let half = engine().calculate_optimal_borrow_amount(10_000.0, 2000.0, 0.1);
        assert!((half - 1.375).abs() < 1e-12);
        assert_eq!(engine().calculate_optimal_borrow_amount(10_000.0, 2000.0, 0.25), 0.0);
    }

    #[test]
    fn test_should_enter_requires_all_conditions() {
        let e = engine();
        assert!(e.should_enter_loop(&calm(), 0.0));
        assert!(e.should_enter_loop(&calm(), -5.0));
        assert!(!e.should_enter_loop(&calm(), -5.01));

        let high_gas = MarketConditions {
            gas_conditions: GasConditions::High,
            ..calm()
        };
        assert!(!e.should_enter_loop(&high_gas, 0.0));

        let volatile = MarketConditions {
            volatility: 0.2,
            ..calm()
        };
        assert!(!e.should_enter_loop(&volatile, 0.0));

        let unfavorable_low_potential = MarketConditions {
            is_favorable: false,
            profit_potential: 1.0,
            ..calm()
        };
        assert!(!e.should_enter_loop(&unfavorable_low_potential, 0.0));

        let unfavorable_high_potential = MarketConditions {
            is_favorable: false,
            profit_potential: 1.5,
            ..calm()
        };
        assert!(e.should_enter_loop(&unfavorable_high_potential, 0.0));
    }

    #[test]
    fn test_exit_priority_order() {
        let e = engine();
        let chaotic = MarketConditions {
            volatility: 0.5,
            price_trend: PriceTrend::Down,
            gas_conditions: GasConditions::High,
            ..calm()
        };

        let d = e.should_exit_loop(1.05, &chaotic, -10.0);
        assert_eq!(d.reason, "Health factor below minimum threshold");

        let d = e.should_exit_loop(1.5, &chaotic, -10.0);
        assert_eq!(d.reason, "Position showing loss beyond safety margin");

        let d = e.should_exit_loop(1.5, &chaotic, 3.0);
        assert_eq!(d.reason, "Market volatility too high");

        let trending_down = MarketConditions {
            price_trend: PriceTrend::Down,
            gas_conditions: GasConditions::High,
            ..calm()
        };
        let d = e.should_exit_loop(1.5, &trending_down, 3.0);
        assert_eq!(d.reason, "Locking in profits in downward trend");

        let d = e.should_exit_loop(1.5, &trending_down, 1.0);
        assert_eq!(d.reason, "High gas costs with existing profits");
    }

    #[test]
    fn test_exit_hold() {
        let d = engine().should_exit_loop(f64::INFINITY, &calm(), 1.0);
        assert!(!d.should_exit);
        assert!(d.reason.is_empty());
    }

    #[test]
    fn test_should_reenter() {
        let e = engine();
        assert!(e.should_reenter_loop(&calm(), -5.0));
        assert!(!e.should_reenter_loop(&calm(), -6.0));

        let not_favorable = MarketConditions {
            is_favorable: false,
            ..calm()
        };
        assert!(!e.should_reenter_loop(&not_favorable, 1.0));

        let down = MarketConditions {
            price_trend: PriceTrend::Down,
            ..calm()
        };
        assert!(!e.should_reenter_loop(&down, 1.0));
    }

    #[test]
    fn test_decisions_are_pure() {
        let e = engine();
        let mc = calm();
        assert_eq!(e.should_exit_loop(1.3, &mc, -2.0), e.should_exit_loop(1.3, &mc, -2.0));
        assert_eq!(
            e.calculate_optimal_borrow_amount(12_345.0, 1800.0, 0.03),
            e.calculate_optimal_borrow_amount(12_345.0, 1800.0, 0.03)
        );
    }

    #[test]
    fn test_assess_risk_projects_health_factor() {
        let metrics = engine().assess_risk(2.0, 0.1, 1.5);
        assert!((metrics.projected_health_factor - 1.35).abs() < 1e-12);
        assert_eq!(metrics.safety_margin, 2.0);
    }
}
