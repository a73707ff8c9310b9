use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::decimal::{round_to_cents, Money, Rate};
use crate::errors::{LedgerError, Result};
use crate::meters::ConsumptionTable;
use crate::state::ApartmentFinancialState;
use crate::types::HeatingChargeSplit;

/// splits a heating expense into a mills-based fixed part and a consumption-based variable part
#[derive(Debug, Clone, Copy)]
pub struct HeatingSplitter {
    fixed_pct: Rate,
}

impl HeatingSplitter {
    pub fn new(fixed_pct: Rate) -> Result<Self> {
        if !fixed_pct.is_unit_interval() {
            return Err(LedgerError::InvalidConfiguration {
                message: format!("fixed heating share {} outside 0-100%", fixed_pct),
            });
        }
        Ok(Self { fixed_pct })
    }

    pub fn fixed_pct(&self) -> Rate {
        self.fixed_pct
    }

    /// charge for a single apartment
    pub fn charge(
        &self,
        apartment: &ApartmentFinancialState,
        total_heating_expense: Money,
        consumption: Decimal,
        total_consumption: Decimal,
    ) -> HeatingChargeSplit {
        let total = total_heating_expense.as_decimal();

        let fixed_amount = round_to_cents(
            apartment.participation_mills / dec!(1000) * total * self.fixed_pct.as_decimal(),
        );

        let variable_amount = if total_consumption.is_zero() {
            Money::ZERO
        } else {
            round_to_cents(
                total * self.fixed_pct.complement().as_decimal() * consumption / total_consumption,
            )
        };

        HeatingChargeSplit {
            apartment_id: apartment.apartment_id,
            consumption,
            fixed_amount,
            variable_amount,
            total_amount: fixed_amount + variable_amount,
        }
    }

    /// charges for every apartment, in apartment order
    pub fn split(
        &self,
        total_heating_expense: Money,
        apartments: &[ApartmentFinancialState],
        table: &ConsumptionTable,
    ) -> Vec<HeatingChargeSplit> {
        let total_consumption = table.total();

        apartments
            .iter()
            .map(|apartment| {
                self.charge(
                    apartment,
                    total_heating_expense,
                    table.consumption_of(apartment.apartment_id),
                    total_consumption,
                )
            })
            .collect()
    }
}
