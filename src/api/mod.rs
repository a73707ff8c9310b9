//! data source port
//!
//! The engine never talks to the backend directly. Everything it reads or
//! writes goes through [`FinancialDataSource`]; [`InMemoryDataSource`] backs
//! tests and demos.

pub mod memory;

use async_trait::async_trait;

use crate::errors::Result;
use crate::payments::PaymentSubmission;
use crate::shares::ApartmentShare;
use crate::state::ApartmentFinancialState;
use crate::types::{
    BillingPeriod, BuildingId, ExpenseCategory, ExpenseRecord, MeterReading, MeterType,
    PaymentRecord,
};

pub use memory::InMemoryDataSource;

/// backend operations the engine consumes
///
/// Implementations report failures as `LedgerError::DataSource`; callers do
/// not retry.
#[async_trait]
pub trait FinancialDataSource: Send + Sync {
    /// per-apartment balances for the month
    async fn apartments_with_financial_data(
        &self,
        building_id: BuildingId,
        month: &BillingPeriod,
    ) -> Result<Vec<ApartmentFinancialState>>;

    async fn expenses(
        &self,
        building_id: BuildingId,
        period: &BillingPeriod,
        category: Option<&ExpenseCategory>,
    ) -> Result<Vec<ExpenseRecord>>;

    /// readings up to the end of the period, earlier history included
    async fn meter_readings(
        &self,
        building_id: BuildingId,
        meter_type: MeterType,
        period: &BillingPeriod,
    ) -> Result<Vec<MeterReading>>;

    async fn create_payment(&self, submission: &PaymentSubmission) -> Result<PaymentRecord>;

    /// shares as computed by the backend; empty when it has none
    async fn calculate_advanced(
        &self,
        building_id: BuildingId,
        period: &BillingPeriod,
    ) -> Result<Vec<ApartmentShare>>;
}
