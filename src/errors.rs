use rust_decimal::Decimal;
use thiserror::Error;

use crate::decimal::Money;
use crate::types::{ApartmentId, ExpenseId, MeterType};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("negative amount in {field}: {amount}")]
    NegativeAmount {
        field: String,
        amount: Money,
    },

    #[error("invalid amount: {message}")]
    InvalidAmount {
        message: String,
    },

    #[error("invalid {field} for apartment {apartment_id}: {mills} (expected 0-1000)")]
    InvalidMills {
        apartment_id: ApartmentId,
        field: String,
        mills: Decimal,
    },

    #[error("reading regression for apartment {apartment_id} ({meter_type}): current {current} < previous {previous}")]
    ReadingRegression {
        apartment_id: ApartmentId,
        meter_type: MeterType,
        previous: Decimal,
        current: Decimal,
    },

    #[error("negative {meter_type} reading for apartment {apartment_id}: {value}")]
    NegativeReading {
        apartment_id: ApartmentId,
        meter_type: MeterType,
        value: Decimal,
    },

    #[error("empty payment")]
    EmptyPayment,

    #[error("payment buckets sum to {buckets}, total is {total}")]
    AllocationMismatch {
        buckets: Money,
        total: Money,
    },

    #[error("invalid period: {message}")]
    InvalidPeriod {
        message: String,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },

    #[error("building has zero total heating mills, cannot distribute expense {expense_id}")]
    ZeroHeatingMills {
        expense_id: ExpenseId,
    },

    #[error("no apartments to distribute expense {expense_id}")]
    NoApartments {
        expense_id: ExpenseId,
    },

    #[error("no consumption figures available for expense {expense_id}")]
    MissingConsumption {
        expense_id: ExpenseId,
    },

    #[error("total consumption is zero, cannot distribute expense {expense_id}")]
    ZeroConsumption {
        expense_id: ExpenseId,
    },

    #[error("data source error: {message}")]
    DataSource {
        message: String,
    },
}

/// coarse error class used to decide how the caller reacts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// bad input, blocks submission, never retried
    Validation,
    /// fatal to a single expense's distribution only
    Distribution,
    /// failure at the api boundary
    DataSource,
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::ZeroHeatingMills { .. }
            | LedgerError::NoApartments { .. }
            | LedgerError::MissingConsumption { .. }
            | LedgerError::ZeroConsumption { .. } => ErrorKind::Distribution,
            LedgerError::DataSource { .. } => ErrorKind::DataSource,
            _ => ErrorKind::Validation,
        }
    }

    pub fn is_validation(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }

    pub fn is_distribution(&self) -> bool {
        self.kind() == ErrorKind::Distribution
    }

    /// field the ui should highlight, if any
    pub fn field(&self) -> Option<&str> {
        match self {
            LedgerError::NegativeAmount { field, .. } => Some(field.as_str()),
            LedgerError::InvalidMills { field, .. } => Some(field.as_str()),
            LedgerError::ReadingRegression { .. } | LedgerError::NegativeReading { .. } => {
                Some("value")
            }
            LedgerError::EmptyPayment | LedgerError::AllocationMismatch { .. } => Some("amount"),
            LedgerError::InvalidPeriod { .. } => Some("period"),
            _ => None,
        }
    }

    /// apartment the error refers to, if any
    pub fn apartment_id(&self) -> Option<ApartmentId> {
        match self {
            LedgerError::InvalidMills { apartment_id, .. }
            | LedgerError::ReadingRegression { apartment_id, .. }
            | LedgerError::NegativeReading { apartment_id, .. } => Some(*apartment_id),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_error_kinds() {
        let id = Uuid::new_v4();
        assert!(LedgerError::EmptyPayment.is_validation());
        assert!(LedgerError::ZeroHeatingMills { expense_id: id }.is_distribution());
        assert_eq!(
            LedgerError::DataSource { message: "timeout".to_string() }.kind(),
            ErrorKind::DataSource
        );
    }

    #[test]
    fn test_regression_names_apartment() {
        let apartment_id = Uuid::new_v4();
        let err = LedgerError::ReadingRegression {
            apartment_id,
            meter_type: MeterType::Water,
            previous: Decimal::from(120),
            current: Decimal::from(100),
        };

        assert_eq!(err.apartment_id(), Some(apartment_id));
        assert!(err.to_string().contains("reading regression"));
        assert!(err.to_string().contains(&apartment_id.to_string()));
    }

    #[test]
    fn test_empty_payment_message() {
        assert_eq!(LedgerError::EmptyPayment.to_string(), "empty payment");
        assert_eq!(LedgerError::EmptyPayment.field(), Some("amount"));
    }
}
