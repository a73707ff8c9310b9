use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::errors::{LedgerError, Result};

/// building-level policy passed into every computation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingPolicyConfig {
    /// share of heating cost distributed by participation mills
    pub fixed_heating_pct: Rate,
    pub reserve_fund: ReserveFundPolicy,
    /// resident part of `shared` expenses, the owner pays the rest
    pub shared_resident_ratio: Rate,
    pub status_thresholds: StatusThresholds,
    /// tolerance for reconciliation checks
    pub reconciliation_tolerance: Money,
}

/// reserve fund collection plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReserveFundPolicy {
    pub goal: Money,
    pub duration_months: u32,
    /// flat monthly amount per apartment, overrides the goal-based split
    pub contribution_per_apartment: Option<Money>,
}

/// thresholds for balance status classification
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatusThresholds {
    /// balances within this distance of zero count as settled
    pub settled_tolerance: Money,
    /// debts above this are critical
    pub critical_debt: Money,
}

impl Default for StatusThresholds {
    fn default() -> Self {
        Self {
            settled_tolerance: Money::from_minor(30),
            critical_debt: Money::from_major(100),
        }
    }
}

impl ReserveFundPolicy {
    pub fn none() -> Self {
        Self {
            goal: Money::ZERO,
            duration_months: 0,
            contribution_per_apartment: None,
        }
    }

    /// whether anything is collected
    pub fn is_active(&self) -> bool {
        match self.contribution_per_apartment {
            Some(flat) => flat.is_positive(),
            None => self.goal.is_positive() && self.duration_months > 0,
        }
    }

    /// monthly contribution for an apartment with the given participation mills
    pub fn monthly_contribution(&self, participation_mills: Decimal) -> Money {
        if let Some(flat) = self.contribution_per_apartment {
            return flat;
        }
        if self.duration_months == 0 || !self.goal.is_positive() {
            return Money::ZERO;
        }

        let monthly_total = self.goal.as_decimal() / Decimal::from(self.duration_months);
        Money::from_decimal(monthly_total * participation_mills / dec!(1000))
    }
}

impl BuildingPolicyConfig {
    /// 30% fixed heating, 50/50 shared split, no reserve collection
    pub fn standard() -> Self {
        Self {
            fixed_heating_pct: Rate::from_percentage(30),
            reserve_fund: ReserveFundPolicy::none(),
            shared_resident_ratio: Rate::from_percentage(50),
            status_thresholds: StatusThresholds::default(),
            reconciliation_tolerance: Money::CENT,
        }
    }

    /// central boiler, larger fixed part for pipe losses
    pub fn central_heating(fixed_pct: u32) -> Self {
        Self {
            fixed_heating_pct: Rate::from_percentage(fixed_pct),
            ..Self::standard()
        }
    }

    /// per-apartment heating, charged purely on consumption
    pub fn autonomous_heating() -> Self {
        Self {
            fixed_heating_pct: Rate::ZERO,
            ..Self::standard()
        }
    }

    pub fn with_reserve_goal(mut self, goal: Money, duration_months: u32) -> Self {
        self.reserve_fund.goal = goal;
        self.reserve_fund.duration_months = duration_months;
        self
    }

    pub fn with_reserve_contribution(mut self, per_apartment: Money) -> Self {
        self.reserve_fund.contribution_per_apartment = Some(per_apartment);
        self
    }

    pub fn with_shared_resident_ratio(mut self, ratio: Rate) -> Self {
        self.shared_resident_ratio = ratio;
        self
    }

    pub fn with_status_thresholds(mut self, thresholds: StatusThresholds) -> Self {
        self.status_thresholds = thresholds;
        self
    }

    /// load from json and validate
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| {
            LedgerError::InvalidConfiguration {
                message: e.to_string(),
            }
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.fixed_heating_pct.is_unit_interval() {
            return Err(LedgerError::InvalidConfiguration {
                message: format!("fixed heating share {} outside 0-100%", self.fixed_heating_pct),
            });
        }

        if !self.shared_resident_ratio.is_unit_interval() {
            return Err(LedgerError::InvalidConfiguration {
                message: format!("shared resident ratio {} outside 0-100%", self.shared_resident_ratio),
            });
        }

        if self.reserve_fund.goal.is_negative() {
            return Err(LedgerError::NegativeAmount {
                field: "reserve_fund.goal".to_string(),
                amount: self.reserve_fund.goal,
            });
        }

        if let Some(flat) = self.reserve_fund.contribution_per_apartment {
            if flat.is_negative() {
                return Err(LedgerError::NegativeAmount {
                    field: "reserve_fund.contribution_per_apartment".to_string(),
                    amount: flat,
                });
            }
        }

        let thresholds = &self.status_thresholds;
        if thresholds.settled_tolerance.is_negative()
            || thresholds.critical_debt < thresholds.settled_tolerance
        {
            return Err(LedgerError::InvalidConfiguration {
                message: "critical debt threshold must exceed the settled tolerance".to_string(),
            });
        }

        if self.reconciliation_tolerance.is_negative() {
            return Err(LedgerError::NegativeAmount {
                field: "reconciliation_tolerance".to_string(),
                amount: self.reconciliation_tolerance,
            });
        }

        Ok(())
    }
}

impl Default for BuildingPolicyConfig {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_policy() {
        let policy = BuildingPolicyConfig::standard();
        assert_eq!(policy.fixed_heating_pct.as_decimal(), dec!(0.30));
        assert_eq!(policy.status_thresholds.settled_tolerance, Money::from_minor(30));
        assert_eq!(policy.status_thresholds.critical_debt, Money::from_major(100));
        assert!(!policy.reserve_fund.is_active());
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_reserve_goal_contribution() {
        let policy = BuildingPolicyConfig::standard()
            .with_reserve_goal(Money::from_major(12_000), 24);

        // 500 per month for the building, apartment holds 125 mills
        assert!(policy.reserve_fund.is_active());
        assert_eq!(
            policy.reserve_fund.monthly_contribution(dec!(125)),
            Money::from_minor(6250)
        );
    }

    #[test]
    fn test_flat_contribution_overrides_goal() {
        let policy = BuildingPolicyConfig::standard()
            .with_reserve_goal(Money::from_major(12_000), 24)
            .with_reserve_contribution(Money::from_major(15));

        assert_eq!(policy.reserve_fund.monthly_contribution(dec!(125)), Money::from_major(15));
        assert_eq!(policy.reserve_fund.monthly_contribution(dec!(300)), Money::from_major(15));
    }

    #[test]
    fn test_zero_duration_collects_nothing() {
        let policy = BuildingPolicyConfig::standard().with_reserve_goal(Money::from_major(1000), 0);
        assert!(!policy.reserve_fund.is_active());
        assert_eq!(policy.reserve_fund.monthly_contribution(dec!(100)), Money::ZERO);
    }

    #[test]
    fn test_invalid_fixed_pct_rejected() {
        let policy = BuildingPolicyConfig::central_heating(120);
        assert!(matches!(
            policy.validate(),
            Err(LedgerError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_json_round_trip() {
        let policy = BuildingPolicyConfig::autonomous_heating()
            .with_shared_resident_ratio(Rate::from_percentage(70));
        let json = serde_json::to_string(&policy).unwrap();
        let loaded = BuildingPolicyConfig::from_json(&json).unwrap();

        assert_eq!(loaded, policy);
        assert_eq!(loaded.fixed_heating_pct, Rate::ZERO);
    }

    #[test]
    fn test_malformed_json_is_configuration_error() {
        let err = BuildingPolicyConfig::from_json("{\"fixed_heating_pct\": ").unwrap_err();
        assert!(matches!(err, LedgerError::InvalidConfiguration { .. }));
    }
}
