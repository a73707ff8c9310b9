use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use uuid::Uuid;

use crate::balance::total_payments_for;
use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::payments::PaymentSubmission;
use crate::shares::ApartmentShare;
use crate::state::ApartmentFinancialState;
use crate::types::{
    BillingPeriod, BuildingId, ExpenseCategory, ExpenseRecord, MeterReading, MeterType,
    PaymentRecord,
};

use super::FinancialDataSource;

/// single-building data source held in memory
///
/// Payments posted through `create_payment` are recorded and counted into
/// `total_payments` of later `apartments_with_financial_data` calls.
#[derive(Debug)]
pub struct InMemoryDataSource {
    building_id: BuildingId,
    apartments: Vec<ApartmentFinancialState>,
    expenses: Vec<ExpenseRecord>,
    readings: Vec<MeterReading>,
    advanced_shares: Vec<ApartmentShare>,
    payments: Mutex<Vec<PaymentRecord>>,
    failure: Option<String>,
}

impl InMemoryDataSource {
    pub fn new(building_id: BuildingId) -> Self {
        Self {
            building_id,
            apartments: Vec::new(),
            expenses: Vec::new(),
            readings: Vec::new(),
            advanced_shares: Vec::new(),
            payments: Mutex::new(Vec::new()),
            failure: None,
        }
    }

    pub fn with_apartments(mut self, apartments: Vec<ApartmentFinancialState>) -> Self {
        self.apartments = apartments;
        self
    }

    pub fn with_expenses(mut self, expenses: Vec<ExpenseRecord>) -> Self {
        self.expenses = expenses;
        self
    }

    pub fn with_readings(mut self, readings: Vec<MeterReading>) -> Self {
        self.readings = readings;
        self
    }

    pub fn with_advanced_shares(mut self, shares: Vec<ApartmentShare>) -> Self {
        self.advanced_shares = shares;
        self
    }

    /// every call fails with this message
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    pub fn building_id(&self) -> BuildingId {
        self.building_id
    }

    /// payments recorded so far
    pub fn payments(&self) -> Result<Vec<PaymentRecord>> {
        Ok(self.lock_payments()?.clone())
    }

    fn check(&self, building_id: BuildingId) -> Result<()> {
        if let Some(message) = &self.failure {
            return Err(LedgerError::DataSource {
                message: message.clone(),
            });
        }
        if building_id != self.building_id {
            return Err(LedgerError::DataSource {
                message: format!("unknown building {}", building_id),
            });
        }
        Ok(())
    }

    fn lock_payments(&self) -> Result<MutexGuard<'_, Vec<PaymentRecord>>> {
        self.payments.lock().map_err(|_| LedgerError::DataSource {
            message: "payment store poisoned".to_string(),
        })
    }
}

#[async_trait]
impl FinancialDataSource for InMemoryDataSource {
    async fn apartments_with_financial_data(
        &self,
        building_id: BuildingId,
        month: &BillingPeriod,
    ) -> Result<Vec<ApartmentFinancialState>> {
        self.check(building_id)?;
        let payments = self.lock_payments()?;

        let apartments = self
            .apartments
            .iter()
            .map(|apartment| {
                let recorded = total_payments_for(&payments, apartment.apartment_id, month, Money::CENT);
                let mut state = apartment.clone();
                state.total_payments += recorded.total;
                state.net_obligation = state.computed_net_obligation();
                state
            })
            .collect();

        Ok(apartments)
    }

    async fn expenses(
        &self,
        building_id: BuildingId,
        period: &BillingPeriod,
        category: Option<&ExpenseCategory>,
    ) -> Result<Vec<ExpenseRecord>> {
        self.check(building_id)?;

        Ok(self
            .expenses
            .iter()
            .filter(|e| period.contains(e.date))
            .filter(|e| category.map_or(true, |c| &e.category == c))
            .cloned()
            .collect())
    }

    async fn meter_readings(
        &self,
        building_id: BuildingId,
        meter_type: MeterType,
        period: &BillingPeriod,
    ) -> Result<Vec<MeterReading>> {
        self.check(building_id)?;

        Ok(self
            .readings
            .iter()
            .filter(|r| r.meter_type == meter_type && r.reading_date <= period.end)
            .cloned()
            .collect())
    }

    async fn create_payment(&self, submission: &PaymentSubmission) -> Result<PaymentRecord> {
        self.check(self.building_id)?;

        if !self.apartments.iter().any(|a| a.apartment_id == submission.apartment_id) {
            return Err(LedgerError::DataSource {
                message: format!("unknown apartment {}", submission.apartment_id),
            });
        }

        let record = PaymentRecord {
            id: Uuid::new_v4(),
            apartment_id: submission.apartment_id,
            date: submission.date,
            amount: submission.amount,
            common_expense_amount: submission.common_expense_amount,
            previous_obligations_amount: submission.previous_obligations_amount,
            reserve_fund_amount: submission.reserve_fund_amount,
            method: submission.method,
            payer_type: submission.payer_type,
            reference: submission.reference.clone(),
        };

        self.lock_payments()?.push(record.clone());
        Ok(record)
    }

    async fn calculate_advanced(
        &self,
        building_id: BuildingId,
        _period: &BillingPeriod,
    ) -> Result<Vec<ApartmentShare>> {
        self.check(building_id)?;
        Ok(self.advanced_shares.clone())
    }
}
