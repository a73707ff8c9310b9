use hourglass_rs::{SafeTimeProvider, TimeSource};

use crate::api::FinancialDataSource;
use crate::balance::{BalanceReconciler, BuildingSummary};
use crate::config::BuildingPolicyConfig;
use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::events::{Event, EventStore};
use crate::meters::{build_consumption_table, ConsumptionTable};
use crate::payments::{
    ManualAllocation, OutstandingDebts, PaymentAllocation, PaymentAllocator, PaymentSubmission,
};
use crate::shares::{ExpenseShareCalculator, ShareBatch};
use crate::state::ApartmentFinancialState;
use crate::types::{
    ApartmentId, BillingPeriod, BuildingId, DistributionType, ExpenseRecord, MeterType, PayerType,
    PaymentMethod, PaymentRecord,
};

/// everything the balances screen shows for one building and month
#[derive(Debug, Clone)]
pub struct MonthlyStatement {
    pub building_id: BuildingId,
    pub period: BillingPeriod,
    /// apartment states with locally computed shares applied
    pub apartments: Vec<ApartmentFinancialState>,
    pub shares: ShareBatch,
    pub summary: BuildingSummary,
    pub events: EventStore,
}

impl MonthlyStatement {
    pub fn apartment(&self, apartment_id: ApartmentId) -> Option<&ApartmentFinancialState> {
        self.apartments.iter().find(|a| a.apartment_id == apartment_id)
    }
}

/// outcome of a posted payment
#[derive(Debug, Clone, PartialEq)]
pub struct Settlement {
    pub allocation: PaymentAllocation,
    pub record: PaymentRecord,
}

impl Settlement {
    pub fn event(&self) -> Event {
        self.allocation.event_for(self.record.apartment_id)
    }
}

/// runs the monthly cycle against a data source
pub struct BillingService<S> {
    source: S,
    policy: BuildingPolicyConfig,
    time_provider: SafeTimeProvider,
    collect_reserve_fund: bool,
}

impl<S: FinancialDataSource> BillingService<S> {
    pub fn new(source: S, policy: BuildingPolicyConfig) -> Result<Self> {
        policy.validate()?;
        Ok(Self {
            source,
            policy,
            time_provider: SafeTimeProvider::new(TimeSource::System),
            collect_reserve_fund: false,
        })
    }

    pub fn with_time_provider(mut self, time_provider: SafeTimeProvider) -> Self {
        self.time_provider = time_provider;
        self
    }

    pub fn collect_reserve_fund(mut self, collect: bool) -> Self {
        self.collect_reserve_fund = collect;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn policy(&self) -> &BuildingPolicyConfig {
        &self.policy
    }

    /// fetch, distribute, reconcile and cross-check one month
    pub async fn prepare_statement(
        &self,
        building_id: BuildingId,
        period: &BillingPeriod,
    ) -> Result<MonthlyStatement> {
        let apartments = self
            .source
            .apartments_with_financial_data(building_id, period)
            .await?;
        let expenses = self.source.expenses(building_id, period, None).await?;

        let mut events = EventStore::new();
        check_apartments(&apartments, &mut events);
        let mut shares = self
            .compute_shares(building_id, period, &expenses, &apartments, &mut events)
            .await?;
        events.extend(shares.events.take_events());

        let reconciler = BalanceReconciler::new(&self.policy);
        let corrected: Vec<ApartmentFinancialState> = apartments
            .iter()
            .map(|state| match shares.share_for(state.apartment_id) {
                Some(share) => reconciler.apply_shares(state, share),
                None => state.clone(),
            })
            .collect();

        let summary = reconciler.reconcile_building(&corrected);
        for rec in &summary.reconciliations {
            events.extend(rec.events());
        }

        self.cross_check(building_id, period, &shares, &mut events).await;

        tracing::info!(
            %building_id,
            period = %period.month_label(),
            apartments = corrected.len(),
            skipped = shares.skipped.len(),
            total_debt = %summary.total_debt,
            "monthly statement prepared"
        );

        Ok(MonthlyStatement {
            building_id,
            period: *period,
            apartments: corrected,
            shares,
            summary,
            events,
        })
    }

    /// reuse `cached` unless the period's expenses changed since it was computed
    pub async fn current_shares(
        &self,
        building_id: BuildingId,
        period: &BillingPeriod,
        cached: Option<ShareBatch>,
    ) -> Result<ShareBatch> {
        let expenses = self.source.expenses(building_id, period, None).await?;

        if let Some(batch) = cached {
            if !batch.is_stale_for(&expenses) {
                return Ok(batch);
            }
            tracing::debug!(%building_id, "expenses changed, recomputing shares");
        }

        let apartments = self
            .source
            .apartments_with_financial_data(building_id, period)
            .await?;
        let mut events = EventStore::new();
        let mut batch = self
            .compute_shares(building_id, period, &expenses, &apartments, &mut events)
            .await?;
        batch.events.extend(events.take_events());
        Ok(batch)
    }

    /// allocate and post a payment; `None` pays the full suggested amount
    pub async fn settle(
        &self,
        state: &ApartmentFinancialState,
        tendered: Option<Money>,
        method: PaymentMethod,
        payer_type: PayerType,
    ) -> Result<Settlement> {
        let allocator = PaymentAllocator::new();
        let allocation = match tendered {
            Some(amount) => allocator.allocate(&OutstandingDebts::from_state(state), amount)?,
            None => allocator.suggest(state)?,
        };

        let submission = PaymentSubmission::from_allocation(
            state.apartment_id,
            &allocation,
            method,
            payer_type,
            &self.time_provider,
        )?;
        let record = self.source.create_payment(&submission).await?;

        tracing::info!(
            apartment_id = %state.apartment_id,
            amount = %record.amount,
            previous_obligations = %allocation.previous_obligations_amount,
            reserve_fund = %allocation.reserve_fund_amount,
            common_expense = %allocation.common_expense_amount,
            "payment submitted"
        );

        Ok(Settlement { allocation, record })
    }

    /// post user-entered bucket amounts as given
    pub async fn submit_manual(
        &self,
        apartment_id: ApartmentId,
        manual: &ManualAllocation,
        method: PaymentMethod,
        payer_type: PayerType,
    ) -> Result<PaymentRecord> {
        let submission = PaymentSubmission::from_manual(
            apartment_id,
            manual,
            method,
            payer_type,
            &self.time_provider,
        )?;
        let record = self.source.create_payment(&submission).await?;

        tracing::info!(
            %apartment_id,
            amount = %record.amount,
            "manual payment submitted"
        );

        Ok(record)
    }

    async fn compute_shares(
        &self,
        building_id: BuildingId,
        period: &BillingPeriod,
        expenses: &[ExpenseRecord],
        apartments: &[ApartmentFinancialState],
        events: &mut EventStore,
    ) -> Result<ShareBatch> {
        let (tables, rejected) = self
            .consumption_tables(building_id, period, expenses, apartments, events)
            .await?;

        rejected
            .into_iter()
            .fold(
                ExpenseShareCalculator::new(&self.policy)
                    .collect_reserve_fund(self.collect_reserve_fund),
                |calculator, (meter_type, cause)| calculator.reject_meter(meter_type, cause),
            )
            .compute(expenses, apartments, &tables)
    }

    /// tables for the meter types metered expenses need; types without readings are left out,
    /// types with unusable readings are returned with the reason
    async fn consumption_tables(
        &self,
        building_id: BuildingId,
        period: &BillingPeriod,
        expenses: &[ExpenseRecord],
        apartments: &[ApartmentFinancialState],
        events: &mut EventStore,
    ) -> Result<(Vec<ConsumptionTable>, Vec<(MeterType, LedgerError)>)> {
        let metered: Vec<&ExpenseRecord> = expenses
            .iter()
            .filter(|e| e.distribution_type == DistributionType::ByMeters)
            .collect();
        if metered.is_empty() {
            return Ok((Vec::new(), Vec::new()));
        }

        let mut tables = Vec::new();
        let mut rejected = Vec::new();
        for meter_type in MeterType::ALL {
            let needed = metered.iter().any(|e| e.category.matches_meter(meter_type))
                || metered.iter().any(|e| !e.category.has_own_meter());
            if !needed {
                continue;
            }

            let readings = self
                .source
                .meter_readings(building_id, meter_type, period)
                .await?;
            if readings.is_empty() {
                continue;
            }

            match build_consumption_table(&readings, apartments, meter_type, period, events) {
                Ok(table) => tables.push(table),
                Err(error) if error.is_validation() => {
                    tracing::warn!(
                        %meter_type,
                        error = %error,
                        "meter readings rejected, dependent expenses skipped"
                    );
                    events.emit(Event::MeterReadingsRejected {
                        meter_type,
                        apartment_id: error.apartment_id(),
                        reason: error.to_string(),
                    });
                    rejected.push((meter_type, error));
                }
                Err(error) => return Err(error),
            }
        }

        Ok((tables, rejected))
    }

    async fn cross_check(
        &self,
        building_id: BuildingId,
        period: &BillingPeriod,
        shares: &ShareBatch,
        events: &mut EventStore,
    ) {
        let server_shares = match self.source.calculate_advanced(building_id, period).await {
            Ok(server_shares) => server_shares,
            Err(error) => {
                tracing::warn!(
                    %building_id,
                    error = %error,
                    "server calculation unavailable, shares not cross-checked"
                );
                events.emit(Event::ServerCrossCheckUnavailable {
                    reason: error.to_string(),
                });
                return;
            }
        };
        let tolerance = self.policy.reconciliation_tolerance;

        for server in &server_shares {
            let local = shares
                .share_for(server.apartment_id)
                .map(|s| s.expense_share)
                .unwrap_or(Money::ZERO);

            if !local.approx_eq(server.expense_share, tolerance) {
                tracing::warn!(
                    apartment_id = %server.apartment_id,
                    local = %local,
                    server = %server.expense_share,
                    "local share differs from server calculation"
                );
                events.emit(Event::ServerShareMismatch {
                    apartment_id: server.apartment_id,
                    local,
                    server: server.expense_share,
                });
            }
        }
    }
}

/// balances from the data source are shown as delivered; bad ones are flagged, not dropped
fn check_apartments(apartments: &[ApartmentFinancialState], events: &mut EventStore) {
    for apartment in apartments {
        if let Err(error) = apartment.validate() {
            tracing::warn!(
                apartment_id = %apartment.apartment_id,
                number = %apartment.number,
                error = %error,
                "invalid apartment data from data source"
            );
            events.emit(Event::InvalidApartmentData {
                apartment_id: apartment.apartment_id,
                reason: error.to_string(),
            });
        }
    }
}
