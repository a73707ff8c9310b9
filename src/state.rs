use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::{round_to_cents, Money};
use crate::errors::{LedgerError, Result};
use crate::types::ApartmentId;

const MAX_MILLS: Decimal = Decimal::from_parts(1000, 0, 0, false, 0);

/// financial state of one apartment for one month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApartmentFinancialState {
    // identification
    pub apartment_id: ApartmentId,
    #[serde(default)]
    pub number: String,

    // weights
    pub participation_mills: Decimal,
    #[serde(default)]
    pub heating_mills: Option<Decimal>,

    // balances
    pub previous_balance: Money,
    /// includes the reserve fund portion
    pub expense_share: Money,
    pub reserve_fund_share: Money,
    pub resident_expenses: Money,
    pub owner_expenses: Money,
    pub total_payments: Money,

    /// as reported by the api, re-derived locally
    pub net_obligation: Money,
}

impl ApartmentFinancialState {
    /// new apartment with no balances
    pub fn new(apartment_id: ApartmentId, number: impl Into<String>, participation_mills: Decimal) -> Self {
        Self {
            apartment_id,
            number: number.into(),
            participation_mills,
            heating_mills: None,
            previous_balance: Money::ZERO,
            expense_share: Money::ZERO,
            reserve_fund_share: Money::ZERO,
            resident_expenses: Money::ZERO,
            owner_expenses: Money::ZERO,
            total_payments: Money::ZERO,
            net_obligation: Money::ZERO,
        }
    }

    pub fn with_heating_mills(mut self, mills: Decimal) -> Self {
        self.heating_mills = Some(mills);
        self
    }

    pub fn with_previous_balance(mut self, balance: Money) -> Self {
        self.previous_balance = balance;
        self.net_obligation = self.computed_net_obligation();
        self
    }

    /// set the current-period share; the whole share is owner-payable until a split is known
    pub fn with_expense_share(mut self, expense_share: Money, reserve_fund_share: Money) -> Self {
        self.expense_share = expense_share;
        self.reserve_fund_share = reserve_fund_share;
        self.resident_expenses = Money::ZERO;
        self.owner_expenses = expense_share;
        self.net_obligation = self.computed_net_obligation();
        self
    }

    pub fn with_payer_split(mut self, resident_expenses: Money, owner_expenses: Money) -> Self {
        self.resident_expenses = resident_expenses;
        self.owner_expenses = owner_expenses;
        self
    }

    pub fn with_total_payments(mut self, total_payments: Money) -> Self {
        self.total_payments = total_payments;
        self.net_obligation = self.computed_net_obligation();
        self
    }

    /// previous balance + expense share - payments
    pub fn computed_net_obligation(&self) -> Money {
        round_to_cents(
            self.previous_balance.as_decimal() + self.expense_share.as_decimal()
                - self.total_payments.as_decimal(),
        )
    }

    /// range and sign checks on the input fields
    pub fn validate(&self) -> Result<()> {
        check_mills(self.apartment_id, "participation_mills", self.participation_mills)?;
        if let Some(heating) = self.heating_mills {
            check_mills(self.apartment_id, "heating_mills", heating)?;
        }

        let non_negative = [
            ("expense_share", self.expense_share),
            ("reserve_fund_share", self.reserve_fund_share),
            ("resident_expenses", self.resident_expenses),
            ("owner_expenses", self.owner_expenses),
            ("total_payments", self.total_payments),
        ];
        for (field, amount) in non_negative {
            if amount.is_negative() {
                return Err(LedgerError::NegativeAmount {
                    field: field.to_string(),
                    amount,
                });
            }
        }

        Ok(())
    }
}

pub(crate) fn check_mills(apartment_id: ApartmentId, field: &str, mills: Decimal) -> Result<()> {
    if mills < Decimal::ZERO || mills > MAX_MILLS {
        return Err(LedgerError::InvalidMills {
            apartment_id,
            field: field.to_string(),
            mills,
        });
    }
    Ok(())
}
