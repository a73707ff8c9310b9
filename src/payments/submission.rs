use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::types::{ApartmentId, PayerType, PaymentMethod};

use super::{ManualAllocation, PaymentAllocation};

/// payment payload posted to the data source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentSubmission {
    pub apartment_id: ApartmentId,
    pub amount: Money,
    pub common_expense_amount: Money,
    pub previous_obligations_amount: Money,
    pub reserve_fund_amount: Money,
    pub date: NaiveDate,
    pub method: PaymentMethod,
    pub payer_type: PayerType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl PaymentSubmission {
    /// build from a computed allocation, dated today
    pub fn from_allocation(
        apartment_id: ApartmentId,
        allocation: &PaymentAllocation,
        method: PaymentMethod,
        payer_type: PayerType,
        time_provider: &SafeTimeProvider,
    ) -> Result<Self> {
        if !allocation.total.is_positive() {
            return Err(LedgerError::EmptyPayment);
        }

        let submission = Self {
            apartment_id,
            amount: allocation.total,
            common_expense_amount: allocation.common_expense_amount,
            previous_obligations_amount: allocation.previous_obligations_amount,
            reserve_fund_amount: allocation.reserve_fund_amount,
            date: time_provider.now().date_naive(),
            method,
            payer_type,
            reference: None,
            notes: None,
        };
        submission.validate()?;
        Ok(submission)
    }

    pub fn from_manual(
        apartment_id: ApartmentId,
        manual: &ManualAllocation,
        method: PaymentMethod,
        payer_type: PayerType,
        time_provider: &SafeTimeProvider,
    ) -> Result<Self> {
        let allocation = manual.validate()?;
        Self::from_allocation(apartment_id, &allocation, method, payer_type, time_provider)
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = date;
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn bucket_total(&self) -> Money {
        self.common_expense_amount + self.previous_obligations_amount + self.reserve_fund_amount
    }

    pub fn validate(&self) -> Result<()> {
        for (field, amount) in [
            ("amount", self.amount),
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

        if !self.amount.is_positive() {
            return Err(LedgerError::EmptyPayment);
        }

        let buckets = self.bucket_total();
        if buckets != self.amount {
            return Err(LedgerError::AllocationMismatch {
                buckets,
                total: self.amount,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payments::{allocate_payment, OutstandingDebts};
    use chrono::{TimeZone, Utc};
    use hourglass_rs::TimeSource;
    use uuid::Uuid;

    fn time() -> SafeTimeProvider {
        SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2024, 5, 17, 9, 30, 0).unwrap()
        ))
    }

    #[test]
    fn test_submission_dated_from_time_provider() {
        let debts = OutstandingDebts::new(Money::from_major(50), Money::from_major(10), Money::from_major(80));
        let allocation = allocate_payment(&debts, Money::from_major(130)).unwrap();

        let submission = PaymentSubmission::from_allocation(
            Uuid::new_v4(),
            &allocation,
            PaymentMethod::BankTransfer,
            PayerType::Owner,
            &time(),
        )
        .unwrap();

        assert_eq!(submission.date, NaiveDate::from_ymd_opt(2024, 5, 17).unwrap());
        assert_eq!(submission.amount, Money::from_major(130));
        assert_eq!(submission.previous_obligations_amount, Money::from_major(50));
        assert!(submission.validate().is_ok());
    }

    #[test]
    fn test_manual_submission() {
        let manual = ManualAllocation::new(Money::from_major(20), Money::ZERO, Money::from_major(5));

        let submission = PaymentSubmission::from_manual(
            Uuid::new_v4(),
            &manual,
            PaymentMethod::Cash,
            PayerType::Tenant,
            &time(),
        )
        .unwrap()
        .with_reference("receipt 114")
        .with_notes("paid at the office");

        assert_eq!(submission.amount, Money::from_major(25));
        assert_eq!(submission.reference.as_deref(), Some("receipt 114"));

        let json = serde_json::to_value(&submission).unwrap();
        assert_eq!(json["method"], "cash");
        assert_eq!(json["payer_type"], "tenant");
        let back: PaymentSubmission = serde_json::from_value(json).unwrap();
        assert_eq!(back, submission);
    }

    #[test]
    fn test_empty_allocation_not_submitted() {
        let err = PaymentSubmission::from_allocation(
            Uuid::new_v4(),
            &PaymentAllocation::default(),
            PaymentMethod::Cash,
            PayerType::Owner,
            &time(),
        )
        .unwrap_err();

        assert_eq!(err, LedgerError::EmptyPayment);
    }

    #[test]
    fn test_validate_detects_bucket_mismatch() {
        let manual = ManualAllocation::new(Money::from_major(20), Money::ZERO, Money::ZERO);
        let mut submission = PaymentSubmission::from_manual(
            Uuid::new_v4(),
            &manual,
            PaymentMethod::Card,
            PayerType::Owner,
            &time(),
        )
        .unwrap();
        submission.amount = Money::from_major(21);

        let err = submission.validate().unwrap_err();
        assert!(matches!(err, LedgerError::AllocationMismatch { .. }));
        assert_eq!(err.field(), Some("amount"));
    }
}
