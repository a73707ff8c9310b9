use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{LedgerError, Result};

pub type BuildingId = Uuid;
pub type ApartmentId = Uuid;
pub type ExpenseId = Uuid;
pub type PaymentId = Uuid;

/// how one expense is prorated across apartments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionType {
    ByParticipationMills,
    ByHeatingMills,
    ByMeters,
    Equal,
}

/// who is liable for an expense
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayerResponsibility {
    Owner,
    Resident,
    Shared,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseCategory {
    Heating,
    Elevator,
    Reserve,
    Management,
    Cleaning,
    Electricity,
    Water,
    Other(String),
}

impl ExpenseCategory {
    /// heating, water and electricity are charged from their own meters
    pub fn has_own_meter(&self) -> bool {
        MeterType::ALL.iter().any(|m| self.matches_meter(*m))
    }

    /// meter types whose consumption tables fit this category
    pub fn matches_meter(&self, meter_type: MeterType) -> bool {
        match self {
            ExpenseCategory::Heating => meter_type.is_heating(),
            ExpenseCategory::Water => meter_type == MeterType::Water,
            ExpenseCategory::Electricity => meter_type == MeterType::Electricity,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeterType {
    Water,
    Electricity,
    HeatingHours,
    HeatingKwh,
}

impl MeterType {
    pub const ALL: [MeterType; 4] = [
        MeterType::Water,
        MeterType::Electricity,
        MeterType::HeatingHours,
        MeterType::HeatingKwh,
    ];

    pub fn is_heating(&self) -> bool {
        matches!(self, MeterType::HeatingHours | MeterType::HeatingKwh)
    }
}

impl fmt::Display for MeterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MeterType::Water => "water",
            MeterType::Electricity => "electricity",
            MeterType::HeatingHours => "heating_hours",
            MeterType::HeatingKwh => "heating_kwh",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    BankTransfer,
    Check,
    Card,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayerType {
    Owner,
    Tenant,
    Other,
}

/// balance status of an apartment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceStatus {
    /// settled within tolerance
    Paid,
    /// severe overdue
    Critical,
    /// owes more than tolerance
    Overdue,
    /// building owes the apartment
    Credit,
}

impl BalanceStatus {
    /// whether the "pay" action applies
    pub fn accepts_payment(&self) -> bool {
        matches!(self, BalanceStatus::Overdue | BalanceStatus::Critical)
    }
}

/// inclusive billing period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BillingPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl BillingPeriod {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(LedgerError::InvalidPeriod {
                message: format!("start {} is after end {}", start, end),
            });
        }
        Ok(Self { start, end })
    }

    /// calendar month
    pub fn month(year: i32, month: u32) -> Result<Self> {
        let start = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
            LedgerError::InvalidPeriod {
                message: format!("invalid month {}-{}", year, month),
            }
        })?;
        let next = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)
        };
        let end = next
            .and_then(|d| d.pred_opt())
            .ok_or_else(|| LedgerError::InvalidPeriod {
                message: format!("invalid month {}-{}", year, month),
            })?;
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// `YYYY-MM` label of the starting month
    pub fn month_label(&self) -> String {
        format!("{:04}-{:02}", self.start.year(), self.start.month())
    }
}

/// an expense as delivered by the api
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseRecord {
    pub id: ExpenseId,
    pub title: String,
    pub amount: Money,
    pub date: NaiveDate,
    pub category: ExpenseCategory,
    pub distribution_type: DistributionType,
    pub payer_responsibility: PayerResponsibility,
}

/// a recorded payment split into buckets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: PaymentId,
    pub apartment_id: ApartmentId,
    pub date: NaiveDate,
    pub amount: Money,
    pub common_expense_amount: Money,
    pub previous_obligations_amount: Money,
    pub reserve_fund_amount: Money,
    pub method: PaymentMethod,
    pub payer_type: PayerType,
    #[serde(default)]
    pub reference: Option<String>,
}

impl PaymentRecord {
    pub fn bucket_total(&self) -> Money {
        self.common_expense_amount + self.previous_obligations_amount + self.reserve_fund_amount
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeterReading {
    pub apartment_id: ApartmentId,
    pub meter_type: MeterType,
    pub reading_date: NaiveDate,
    pub value: Decimal,
}

/// heating cost of one apartment for one period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatingChargeSplit {
    pub apartment_id: ApartmentId,
    pub consumption: Decimal,
    pub fixed_amount: Money,
    pub variable_amount: Money,
    pub total_amount: Money,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_period() {
        let feb = BillingPeriod::month(2024, 2).unwrap();
        assert_eq!(feb.start, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(feb.end, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert_eq!(feb.month_label(), "2024-02");

        let dec = BillingPeriod::month(2023, 12).unwrap();
        assert_eq!(dec.end, NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());

        assert!(BillingPeriod::month(2024, 13).is_err());
    }

    #[test]
    fn test_period_bounds() {
        let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        let period = BillingPeriod::new(start, end).unwrap();

        assert!(period.contains(start));
        assert!(period.contains(end));
        assert!(!period.contains(NaiveDate::from_ymd_opt(2024, 4, 1).unwrap()));
        assert!(BillingPeriod::new(end, start).is_err());
    }

    #[test]
    fn test_category_meter_match() {
        assert!(ExpenseCategory::Heating.matches_meter(MeterType::HeatingKwh));
        assert!(ExpenseCategory::Heating.matches_meter(MeterType::HeatingHours));
        assert!(!ExpenseCategory::Heating.matches_meter(MeterType::Water));
        assert!(ExpenseCategory::Water.matches_meter(MeterType::Water));
        assert!(!ExpenseCategory::Elevator.matches_meter(MeterType::Water));
    }

    #[test]
    fn test_distribution_type_wire_names() {
        let json = serde_json::to_string(&DistributionType::ByParticipationMills).unwrap();
        assert_eq!(json, "\"by_participation_mills\"");
        let parsed: PayerResponsibility = serde_json::from_str("\"shared\"").unwrap();
        assert_eq!(parsed, PayerResponsibility::Shared);
    }
}
