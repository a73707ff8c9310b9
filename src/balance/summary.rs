use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::state::ApartmentFinancialState;
use crate::types::BalanceStatus;

use super::Reconciliation;

/// building-wide totals for the balances table footer
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BuildingSummary {
    pub apartment_count: usize,
    pub total_previous_balance: Money,
    pub total_expense_share: Money,
    pub total_reserve_fund_share: Money,
    pub total_payments: Money,
    pub total_net_obligation: Money,
    /// sum of positive net obligations
    pub total_debt: Money,
    /// sum of negative net obligations, as a positive amount
    pub total_credit: Money,
    pub paid_count: usize,
    pub overdue_count: usize,
    pub critical_count: usize,
    pub credit_count: usize,
    pub reconciliations: Vec<Reconciliation>,
}

impl BuildingSummary {
    pub fn from_reconciliations(
        states: &[ApartmentFinancialState],
        reconciliations: Vec<Reconciliation>,
    ) -> Self {
        let mut summary = BuildingSummary {
            apartment_count: states.len(),
            total_previous_balance: states.iter().map(|s| s.previous_balance).sum(),
            total_expense_share: states.iter().map(|s| s.expense_share).sum(),
            total_reserve_fund_share: states.iter().map(|s| s.reserve_fund_share).sum(),
            total_payments: states.iter().map(|s| s.total_payments).sum(),
            ..Default::default()
        };

        for rec in &reconciliations {
            summary.total_net_obligation += rec.net_obligation;
            if rec.net_obligation.is_positive() {
                summary.total_debt += rec.net_obligation;
            } else {
                summary.total_credit += rec.net_obligation.abs();
            }

            match rec.status {
                BalanceStatus::Paid => summary.paid_count += 1,
                BalanceStatus::Overdue => summary.overdue_count += 1,
                BalanceStatus::Critical => summary.critical_count += 1,
                BalanceStatus::Credit => summary.credit_count += 1,
            }
        }

        summary.reconciliations = reconciliations;
        summary
    }

    /// apartments the "pay" action applies to
    pub fn apartments_in_debt(&self) -> usize {
        self.overdue_count + self.critical_count
    }

    pub fn mismatch_count(&self) -> usize {
        self.reconciliations.iter().map(|r| r.mismatches.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use crate::balance::BalanceReconciler;
    use crate::config::BuildingPolicyConfig;
    use crate::decimal::Money;
    use crate::state::ApartmentFinancialState;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    #[test]
    fn test_building_totals() {
        let states = vec![
            ApartmentFinancialState::new(Uuid::new_v4(), "1", dec!(400))
                .with_previous_balance(Money::from_major(50))
                .with_expense_share(Money::from_major(80), Money::from_major(8)),
            ApartmentFinancialState::new(Uuid::new_v4(), "2", dec!(300))
                .with_expense_share(Money::from_major(60), Money::from_major(6))
                .with_total_payments(Money::from_major(60)),
            ApartmentFinancialState::new(Uuid::new_v4(), "3", dec!(300))
                .with_previous_balance(Money::from_major(-100))
                .with_expense_share(Money::from_major(60), Money::from_major(6)),
            ApartmentFinancialState::new(Uuid::new_v4(), "4", dec!(0))
                .with_previous_balance(Money::from_major(20)),
        ];

        let summary = BalanceReconciler::new(&BuildingPolicyConfig::standard()).reconcile_building(&states);

        assert_eq!(summary.apartment_count, 4);
        assert_eq!(summary.total_expense_share, Money::from_major(200));
        assert_eq!(summary.total_reserve_fund_share, Money::from_major(20));
        assert_eq!(summary.total_payments, Money::from_major(60));
        // 130 + 0 - 40 + 20
        assert_eq!(summary.total_net_obligation, Money::from_major(110));
        assert_eq!(summary.total_debt, Money::from_major(150));
        assert_eq!(summary.total_credit, Money::from_major(40));
        assert_eq!(summary.critical_count, 1);
        assert_eq!(summary.paid_count, 1);
        assert_eq!(summary.credit_count, 1);
        assert_eq!(summary.overdue_count, 1);
        assert_eq!(summary.apartments_in_debt(), 2);
        assert_eq!(summary.mismatch_count(), 0);
    }
}
