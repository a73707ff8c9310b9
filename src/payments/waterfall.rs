use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::state::ApartmentFinancialState;

use super::OutstandingDebts;

/// payment buckets, in the order they are filled
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AllocationBucket {
    PreviousObligations = 1,
    ReserveFund = 2,
    CommonExpense = 3,
}

/// how a payment amount is split across buckets
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PaymentAllocation {
    pub total: Money,
    pub previous_obligations_amount: Money,
    pub reserve_fund_amount: Money,
    pub common_expense_amount: Money,
    /// part of the common bucket beyond what is currently due
    pub advance_amount: Money,
}

impl PaymentAllocation {
    pub fn bucket_total(&self) -> Money {
        self.previous_obligations_amount + self.reserve_fund_amount + self.common_expense_amount
    }

    pub fn amount_for(&self, bucket: AllocationBucket) -> Money {
        match bucket {
            AllocationBucket::PreviousObligations => self.previous_obligations_amount,
            AllocationBucket::ReserveFund => self.reserve_fund_amount,
            AllocationBucket::CommonExpense => self.common_expense_amount,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total.is_zero()
    }
}

/// splits a payment: previous obligations first, reserve fund second, common expenses last
#[derive(Debug, Clone, Copy, Default)]
pub struct PaymentAllocator;

impl PaymentAllocator {
    pub fn new() -> Self {
        Self
    }

    pub fn allocate(&self, debts: &OutstandingDebts, total_to_allocate: Money) -> Result<PaymentAllocation> {
        if total_to_allocate.is_negative() {
            return Err(LedgerError::NegativeAmount {
                field: "total_to_allocate".to_string(),
                amount: total_to_allocate,
            });
        }

        let mut remaining = total_to_allocate;
        let mut allocation = PaymentAllocation {
            total: total_to_allocate,
            ..Default::default()
        };

        for bucket in [
            AllocationBucket::PreviousObligations,
            AllocationBucket::ReserveFund,
            AllocationBucket::CommonExpense,
        ] {
            remaining = self.apply_to_bucket(bucket, remaining, debts, &mut allocation);
        }

        allocation.advance_amount =
            (allocation.common_expense_amount - debts.common_due()).clamp_non_negative();

        Ok(allocation)
    }

    /// full-settlement allocation for an apartment
    pub fn suggest(&self, state: &ApartmentFinancialState) -> Result<PaymentAllocation> {
        let suggested = state.computed_net_obligation().clamp_non_negative();
        self.allocate(&OutstandingDebts::from_state(state), suggested)
    }

    fn apply_to_bucket(
        &self,
        bucket: AllocationBucket,
        available: Money,
        debts: &OutstandingDebts,
        allocation: &mut PaymentAllocation,
    ) -> Money {
        let (due, applied_field) = match bucket {
            AllocationBucket::PreviousObligations => {
                (debts.previous_debt, &mut allocation.previous_obligations_amount)
            }
            AllocationBucket::ReserveFund => (debts.reserve_due, &mut allocation.reserve_fund_amount),
            // whatever is left goes to the current period, advances included
            AllocationBucket::CommonExpense => (available, &mut allocation.common_expense_amount),
        };

        let payment = available.min(due).clamp_non_negative();
        *applied_field = payment;

        available - payment
    }
}

/// split a payment amount across outstanding debts
pub fn allocate_payment(debts: &OutstandingDebts, total_to_allocate: Money) -> Result<PaymentAllocation> {
    PaymentAllocator::new().allocate(debts, total_to_allocate)
}
