use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::decimal::{round_to_cents, Money};
use crate::errors::{LedgerError, Result};
use crate::meters::{ConsumptionTable, HeatingSplitter};
use crate::state::ApartmentFinancialState;
use crate::types::{ApartmentId, DistributionType, ExpenseCategory, ExpenseRecord};

/// one apartment's cut of one expense, rounded to cents
pub type ShareLine = (ApartmentId, Money);

/// a rule that prorates an expense across apartments
pub trait DistributionRule {
    fn distribute(
        &self,
        expense: &ExpenseRecord,
        apartments: &[ApartmentFinancialState],
    ) -> Result<Vec<ShareLine>>;
}

/// amount * participation_mills / 1000
pub struct ParticipationMillsRule;

impl DistributionRule for ParticipationMillsRule {
    fn distribute(
        &self,
        expense: &ExpenseRecord,
        apartments: &[ApartmentFinancialState],
    ) -> Result<Vec<ShareLine>> {
        Ok(apartments
            .iter()
            .map(|apt| {
                let share = round_to_cents(
                    expense.amount.as_decimal() * apt.participation_mills / dec!(1000),
                );
                (apt.apartment_id, share)
            })
            .collect())
    }
}

/// amount * heating_mills / building heating mills
pub struct HeatingMillsRule;

impl DistributionRule for HeatingMillsRule {
    fn distribute(
        &self,
        expense: &ExpenseRecord,
        apartments: &[ApartmentFinancialState],
    ) -> Result<Vec<ShareLine>> {
        let total_mills: Decimal = apartments
            .iter()
            .map(|apt| apt.heating_mills.unwrap_or(Decimal::ZERO))
            .sum();

        if total_mills.is_zero() {
            return Err(LedgerError::ZeroHeatingMills {
                expense_id: expense.id,
            });
        }

        Ok(apartments
            .iter()
            .map(|apt| {
                let mills = apt.heating_mills.unwrap_or(Decimal::ZERO);
                let share = expense
                    .amount
                    .prorate(mills, total_mills)
                    .unwrap_or(Money::ZERO);
                (apt.apartment_id, share)
            })
            .collect())
    }
}

/// amount / apartment count
pub struct EqualRule;

impl DistributionRule for EqualRule {
    fn distribute(
        &self,
        expense: &ExpenseRecord,
        apartments: &[ApartmentFinancialState],
    ) -> Result<Vec<ShareLine>> {
        if apartments.is_empty() {
            return Err(LedgerError::NoApartments {
                expense_id: expense.id,
            });
        }

        let share = expense.amount / Decimal::from(apartments.len());
        Ok(apartments.iter().map(|apt| (apt.apartment_id, share)).collect())
    }
}

/// consumption-based split; heating meters use the fixed/variable heating split
pub struct MeterRule<'a> {
    tables: &'a [ConsumptionTable],
    heating: HeatingSplitter,
}

impl<'a> MeterRule<'a> {
    pub fn new(tables: &'a [ConsumptionTable], heating: HeatingSplitter) -> Self {
        Self { tables, heating }
    }

    /// categories with their own meter must find a matching table, others take the first one
    fn table_for(&self, category: &ExpenseCategory) -> Option<&'a ConsumptionTable> {
        let tables: &'a [ConsumptionTable] = self.tables;
        if category.has_own_meter() {
            tables.iter().find(|t| category.matches_meter(t.meter_type))
        } else {
            tables.first()
        }
    }
}

impl DistributionRule for MeterRule<'_> {
    fn distribute(
        &self,
        expense: &ExpenseRecord,
        apartments: &[ApartmentFinancialState],
    ) -> Result<Vec<ShareLine>> {
        let table = self
            .table_for(&expense.category)
            .ok_or(LedgerError::MissingConsumption {
                expense_id: expense.id,
            })?;

        if table.meter_type.is_heating() {
            return Ok(self
                .heating
                .split(expense.amount, apartments, table)
                .into_iter()
                .map(|split| (split.apartment_id, split.total_amount))
                .collect());
        }

        let total = table.total();
        if total.is_zero() {
            return Err(LedgerError::ZeroConsumption {
                expense_id: expense.id,
            });
        }

        Ok(apartments
            .iter()
            .map(|apt| {
                let share = expense
                    .amount
                    .prorate(table.consumption_of(apt.apartment_id), total)
                    .unwrap_or(Money::ZERO);
                (apt.apartment_id, share)
            })
            .collect())
    }
}

/// distribute one expense according to its distribution type
pub fn distribute_expense(
    expense: &ExpenseRecord,
    apartments: &[ApartmentFinancialState],
    tables: &[ConsumptionTable],
    heating: HeatingSplitter,
) -> Result<Vec<ShareLine>> {
    match expense.distribution_type {
        DistributionType::ByParticipationMills => ParticipationMillsRule.distribute(expense, apartments),
        DistributionType::ByHeatingMills => HeatingMillsRule.distribute(expense, apartments),
        DistributionType::Equal => EqualRule.distribute(expense, apartments),
        DistributionType::ByMeters => MeterRule::new(tables, heating).distribute(expense, apartments),
    }
}
