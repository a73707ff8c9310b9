pub mod submission;
pub mod waterfall;

use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::events::Event;
use crate::state::ApartmentFinancialState;
use crate::types::ApartmentId;

pub use submission::PaymentSubmission;
pub use waterfall::{allocate_payment, AllocationBucket, PaymentAllocation, PaymentAllocator};

/// what an apartment owes, per bucket
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OutstandingDebts {
    pub previous_debt: Money,
    pub reserve_due: Money,
    /// current-period share, reserve portion included
    pub current_due: Money,
}

impl OutstandingDebts {
    /// negative components are treated as nothing owed
    pub fn new(previous_debt: Money, reserve_due: Money, current_due: Money) -> Self {
        Self {
            previous_debt: previous_debt.clamp_non_negative(),
            reserve_due: reserve_due.clamp_non_negative(),
            current_due: current_due.clamp_non_negative(),
        }
    }

    pub fn from_state(state: &ApartmentFinancialState) -> Self {
        Self::new(
            state.previous_balance,
            state.reserve_fund_share,
            state.expense_share,
        )
    }

    /// current share without the reserve portion
    pub fn common_due(&self) -> Money {
        (self.current_due - self.reserve_due).clamp_non_negative()
    }

    pub fn total(&self) -> Money {
        self.previous_debt + self.current_due
    }
}

/// bucket amounts typed in by the user
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ManualAllocation {
    pub common_expense_amount: Money,
    pub previous_obligations_amount: Money,
    pub reserve_fund_amount: Money,
}

impl ManualAllocation {
    pub fn new(
        common_expense_amount: Money,
        previous_obligations_amount: Money,
        reserve_fund_amount: Money,
    ) -> Self {
        Self {
            common_expense_amount,
            previous_obligations_amount,
            reserve_fund_amount,
        }
    }

    pub fn total(&self) -> Money {
        self.common_expense_amount + self.previous_obligations_amount + self.reserve_fund_amount
    }

    /// accept the amounts as given; nothing is redistributed
    pub fn validate(&self) -> Result<PaymentAllocation> {
        for (field, amount) in [
            ("common_expense_amount", self.common_expense_amount),
            ("previous_obligations_amount", self.previous_obligations_amount),
            ("reserve_fund_amount", self.reserve_fund_amount),
        ] {
            if amount.is_negative() {
                return Err(LedgerError::NegativeAmount {
                    field: field.to_string(),
                    amount,
                });
            }
        }

        if !self.total().is_positive() {
            return Err(LedgerError::EmptyPayment);
        }

        Ok(PaymentAllocation {
            total: self.total(),
            previous_obligations_amount: self.previous_obligations_amount,
            reserve_fund_amount: self.reserve_fund_amount,
            common_expense_amount: self.common_expense_amount,
            advance_amount: Money::ZERO,
        })
    }
}

impl PaymentAllocation {
    pub fn event_for(&self, apartment_id: ApartmentId) -> Event {
        Event::PaymentAllocated {
            apartment_id,
            total: self.total,
            previous_obligations_amount: self.previous_obligations_amount,
            reserve_fund_amount: self.reserve_fund_amount,
            common_expense_amount: self.common_expense_amount,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    #[test]
    fn test_debts_from_state() {
        let state = ApartmentFinancialState::new(Uuid::new_v4(), "A", dec!(100))
            .with_previous_balance(Money::from_major(-20))
            .with_expense_share(Money::from_major(80), Money::from_major(10));

        let debts = OutstandingDebts::from_state(&state);

        assert_eq!(debts.previous_debt, Money::ZERO);
        assert_eq!(debts.reserve_due, Money::from_major(10));
        assert_eq!(debts.common_due(), Money::from_major(70));
        assert_eq!(debts.total(), Money::from_major(80));
    }

    #[test]
    fn test_manual_allocation_accepted_as_given() {
        let manual = ManualAllocation::new(Money::from_major(10), Money::ZERO, Money::from_major(5));

        let allocation = manual.validate().unwrap();

        assert_eq!(allocation.total, Money::from_major(15));
        assert_eq!(allocation.common_expense_amount, Money::from_major(10));
        assert_eq!(allocation.reserve_fund_amount, Money::from_major(5));
    }

    #[test]
    fn test_manual_allocation_rejects_negative_field() {
        let manual = ManualAllocation::new(Money::from_major(10), Money::from_major(-1), Money::ZERO);

        let err = manual.validate().unwrap_err();
        assert!(err.is_validation());
        assert_eq!(err.field(), Some("previous_obligations_amount"));
    }

    #[test]
    fn test_manual_allocation_rejects_all_zero() {
        let err = ManualAllocation::default().validate().unwrap_err();
        assert_eq!(err, LedgerError::EmptyPayment);
        assert_eq!(err.field(), Some("amount"));
    }

    #[test]
    fn test_allocation_event() {
        let apt = Uuid::new_v4();
        let allocation = ManualAllocation::new(Money::from_major(10), Money::ZERO, Money::ZERO)
            .validate()
            .unwrap();

        match allocation.event_for(apt) {
            Event::PaymentAllocated { apartment_id, total, .. } => {
                assert_eq!(apartment_id, apt);
                assert_eq!(total, Money::from_major(10));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
