pub mod summary;

use serde::{Deserialize, Serialize};

use crate::config::{BuildingPolicyConfig, StatusThresholds};
use crate::decimal::Money;
use crate::events::Event;
use crate::shares::ApartmentShare;
use crate::state::ApartmentFinancialState;
use crate::types::{ApartmentId, BalanceStatus, BillingPeriod, PaymentId, PaymentRecord};

pub use summary::BuildingSummary;

/// a displayed component that does not add up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mismatch {
    pub apartment_id: ApartmentId,
    pub field: String,
    pub expected: Money,
    pub actual: Money,
}

/// outcome of reconciling one apartment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reconciliation {
    pub apartment_id: ApartmentId,
    pub net_obligation: Money,
    pub status: BalanceStatus,
    /// full-settlement amount offered to the user
    pub suggested_payment: Money,
    pub mismatches: Vec<Mismatch>,
}

impl Reconciliation {
    pub fn is_consistent(&self) -> bool {
        self.mismatches.is_empty()
    }

    /// events for the caller's event store
    pub fn events(&self) -> Vec<Event> {
        let mut events: Vec<Event> = self
            .mismatches
            .iter()
            .map(|m| Event::ReconciliationMismatch {
                apartment_id: m.apartment_id,
                field: m.field.clone(),
                expected: m.expected,
                actual: m.actual,
            })
            .collect();

        events.push(Event::StatusClassified {
            apartment_id: self.apartment_id,
            net_obligation: self.net_obligation,
            status: self.status,
        });
        events
    }
}

/// payments of one apartment summed per bucket
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PaymentTotals {
    pub total: Money,
    pub common_expense: Money,
    pub previous_obligations: Money,
    pub reserve_fund: Money,
    /// records whose buckets do not add up to their amount
    pub inconsistent: Vec<PaymentId>,
}

/// merges balance components into a net obligation and a status
#[derive(Debug, Clone, Copy)]
pub struct BalanceReconciler {
    thresholds: StatusThresholds,
    tolerance: Money,
}

impl BalanceReconciler {
    pub fn new(policy: &BuildingPolicyConfig) -> Self {
        Self {
            thresholds: policy.status_thresholds,
            tolerance: policy.reconciliation_tolerance,
        }
    }

    /// classify a net obligation, first match wins
    pub fn classify(&self, net_obligation: Money) -> BalanceStatus {
        let settled = self.thresholds.settled_tolerance;

        if net_obligation.abs() <= settled {
            BalanceStatus::Paid
        } else if net_obligation > self.thresholds.critical_debt {
            BalanceStatus::Critical
        } else if net_obligation > settled {
            BalanceStatus::Overdue
        } else {
            BalanceStatus::Credit
        }
    }

    pub fn reconcile(&self, state: &ApartmentFinancialState) -> Reconciliation {
        let net_obligation = state.computed_net_obligation();
        let status = self.classify(net_obligation);
        let mismatches = self.check_invariants(state);

        tracing::debug!(
            apartment_id = %state.apartment_id,
            net_obligation = %net_obligation,
            ?status,
            "balance reconciled"
        );

        Reconciliation {
            apartment_id: state.apartment_id,
            net_obligation,
            status,
            suggested_payment: net_obligation.clamp_non_negative(),
            mismatches,
        }
    }

    /// components that disagree beyond tolerance; logged, never fatal
    pub fn check_invariants(&self, state: &ApartmentFinancialState) -> Vec<Mismatch> {
        let mut mismatches = Vec::new();

        let split = state.resident_expenses + state.owner_expenses;
        if !split.approx_eq(state.expense_share, self.tolerance) {
            mismatches.push(Mismatch {
                apartment_id: state.apartment_id,
                field: "resident_expenses + owner_expenses".to_string(),
                expected: state.expense_share,
                actual: split,
            });
        }

        let computed = state.computed_net_obligation();
        if !state.net_obligation.approx_eq(computed, self.tolerance) {
            mismatches.push(Mismatch {
                apartment_id: state.apartment_id,
                field: "net_obligation".to_string(),
                expected: computed,
                actual: state.net_obligation,
            });
        }

        if state.reserve_fund_share > state.expense_share + self.tolerance {
            mismatches.push(Mismatch {
                apartment_id: state.apartment_id,
                field: "reserve_fund_share".to_string(),
                expected: state.expense_share,
                actual: state.reserve_fund_share,
            });
        }

        for m in &mismatches {
            tracing::warn!(
                apartment_id = %m.apartment_id,
                field = %m.field,
                expected = %m.expected,
                actual = %m.actual,
                "reconciliation mismatch"
            );
        }

        mismatches
    }

    /// state re-derived from a locally computed share
    pub fn apply_shares(
        &self,
        state: &ApartmentFinancialState,
        share: &ApartmentShare,
    ) -> ApartmentFinancialState {
        let mut corrected = state.clone();
        corrected.expense_share = share.expense_share;
        corrected.reserve_fund_share = share.reserve_fund_share;
        corrected.resident_expenses = share.resident_expenses;
        corrected.owner_expenses = share.owner_expenses;
        corrected.net_obligation = corrected.computed_net_obligation();
        corrected
    }

    pub fn reconcile_building(&self, states: &[ApartmentFinancialState]) -> BuildingSummary {
        let reconciliations = states.iter().map(|s| self.reconcile(s)).collect();
        BuildingSummary::from_reconciliations(states, reconciliations)
    }
}

/// sum an apartment's payments inside a period
pub fn total_payments_for(
    payments: &[PaymentRecord],
    apartment_id: ApartmentId,
    period: &BillingPeriod,
    tolerance: Money,
) -> PaymentTotals {
    let mut totals = PaymentTotals::default();

    for payment in payments
        .iter()
        .filter(|p| p.apartment_id == apartment_id && period.contains(p.date))
    {
        totals.total += payment.amount;
        totals.common_expense += payment.common_expense_amount;
        totals.previous_obligations += payment.previous_obligations_amount;
        totals.reserve_fund += payment.reserve_fund_amount;

        if !payment.bucket_total().approx_eq(payment.amount, tolerance) {
            tracing::warn!(
                payment_id = %payment.id,
                amount = %payment.amount,
                buckets = %payment.bucket_total(),
                "payment buckets do not add up"
            );
            totals.inconsistent.push(payment.id);
        }
    }

    totals
}

/// reconcile one apartment under a building policy
pub fn reconcile_balance(
    state: &ApartmentFinancialState,
    policy: &BuildingPolicyConfig,
) -> Reconciliation {
    BalanceReconciler::new(policy).reconcile(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PayerType, PaymentMethod};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn reconciler() -> BalanceReconciler {
        BalanceReconciler::new(&BuildingPolicyConfig::standard())
    }

    #[test]
    fn test_threshold_table() {
        let r = reconciler();
        assert_eq!(r.classify(Money::ZERO), BalanceStatus::Paid);
        assert_eq!(r.classify(Money::from_minor(30)), BalanceStatus::Paid);
        assert_eq!(r.classify(Money::from_minor(-30)), BalanceStatus::Paid);
        assert_eq!(r.classify(Money::from_minor(31)), BalanceStatus::Overdue);
        assert_eq!(r.classify(Money::from_major(100)), BalanceStatus::Overdue);
        assert_eq!(r.classify(Money::from_minor(10001)), BalanceStatus::Critical);
        assert_eq!(r.classify(Money::from_minor(-31)), BalanceStatus::Credit);
        assert_eq!(r.classify(Money::from_major(-5000)), BalanceStatus::Credit);
    }

    #[test]
    fn test_reconcile_critical_apartment() {
        let state = ApartmentFinancialState::new(Uuid::new_v4(), "A", dec!(100))
            .with_previous_balance(Money::from_major(50))
            .with_expense_share(Money::from_major(80), Money::from_major(10));

        let rec = reconcile_balance(&state, &BuildingPolicyConfig::standard());

        assert_eq!(rec.net_obligation, Money::from_major(130));
        assert_eq!(rec.status, BalanceStatus::Critical);
        assert_eq!(rec.suggested_payment, Money::from_major(130));
        assert!(rec.is_consistent());
    }

    #[test]
    fn test_credit_suggests_nothing() {
        let state = ApartmentFinancialState::new(Uuid::new_v4(), "A", dec!(100))
            .with_previous_balance(Money::from_major(-20));

        let rec = reconciler().reconcile(&state);
        assert_eq!(rec.status, BalanceStatus::Credit);
        assert_eq!(rec.suggested_payment, Money::ZERO);
    }

    #[test]
    fn test_mismatches_are_reported_not_fatal() {
        let mut state = ApartmentFinancialState::new(Uuid::new_v4(), "A", dec!(100))
            .with_expense_share(Money::from_major(80), Money::from_major(10))
            .with_payer_split(Money::from_major(30), Money::from_major(40));
        state.net_obligation = Money::from_major(75);

        let rec = reconciler().reconcile(&state);

        assert_eq!(rec.mismatches.len(), 2);
        assert_eq!(rec.mismatches[0].field, "resident_expenses + owner_expenses");
        assert_eq!(rec.mismatches[1].field, "net_obligation");
        assert_eq!(rec.mismatches[1].expected, Money::from_major(80));
        // recomputed value wins
        assert_eq!(rec.net_obligation, Money::from_major(80));
        assert_eq!(rec.events().len(), 3);
    }

    #[test]
    fn test_one_cent_difference_tolerated() {
        let mut state = ApartmentFinancialState::new(Uuid::new_v4(), "A", dec!(100))
            .with_expense_share(Money::from_major(80), Money::ZERO);
        state.net_obligation = Money::from_minor(8001);

        assert!(reconciler().check_invariants(&state).is_empty());
    }

    #[test]
    fn test_apply_shares_recomputes_net() {
        let state = ApartmentFinancialState::new(Uuid::new_v4(), "A", dec!(100))
            .with_previous_balance(Money::from_major(10))
            .with_total_payments(Money::from_major(5));
        let share = ApartmentShare {
            apartment_id: state.apartment_id,
            expense_share: Money::from_major(60),
            reserve_fund_share: Money::from_major(6),
            resident_expenses: Money::from_major(20),
            owner_expenses: Money::from_major(40),
        };

        let corrected = reconciler().apply_shares(&state, &share);

        assert_eq!(corrected.net_obligation, Money::from_major(65));
        assert!(reconciler().check_invariants(&corrected).is_empty());
    }

    #[test]
    fn test_total_payments_for_period() {
        let apt = Uuid::new_v4();
        let period = BillingPeriod::month(2024, 5).unwrap();
        let payment = |day: u32, month: u32, amount: i64, common: i64| PaymentRecord {
            id: Uuid::new_v4(),
            apartment_id: apt,
            date: NaiveDate::from_ymd_opt(2024, month, day).unwrap(),
            amount: Money::from_major(amount),
            common_expense_amount: Money::from_major(common),
            previous_obligations_amount: Money::ZERO,
            reserve_fund_amount: Money::ZERO,
            method: PaymentMethod::BankTransfer,
            payer_type: PayerType::Owner,
            reference: None,
        };
        let bad = payment(20, 5, 50, 45);
        let payments = vec![payment(3, 5, 40, 40), payment(28, 4, 99, 99), bad.clone()];

        let totals = total_payments_for(&payments, apt, &period, Money::CENT);

        assert_eq!(totals.total, Money::from_major(90));
        assert_eq!(totals.common_expense, Money::from_major(85));
        assert_eq!(totals.inconsistent, vec![bad.id]);
    }
}
