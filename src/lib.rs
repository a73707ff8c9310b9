pub mod api;
pub mod balance;
pub mod config;
pub mod decimal;
pub mod errors;
pub mod events;
pub mod meters;
pub mod payments;
pub mod service;
pub mod shares;
pub mod state;
pub mod types;

// re-export key types
pub use api::{FinancialDataSource, InMemoryDataSource};
pub use balance::{
    reconcile_balance, total_payments_for, BalanceReconciler, BuildingSummary, Mismatch,
    PaymentTotals, Reconciliation,
};
pub use config::{BuildingPolicyConfig, ReserveFundPolicy, StatusThresholds};
pub use decimal::{round_to_cents, Money, Rate};
pub use errors::{ErrorKind, LedgerError, Result};
pub use events::{Event, EventStore};
pub use meters::{
    build_consumption_table, resolve_meter_consumption, validate_new_readings, validate_series,
    ConsumptionTable, HeatingSplitter, MeterConsumption, MeterConsumptionResolver,
};
pub use payments::{
    allocate_payment, AllocationBucket, ManualAllocation, OutstandingDebts, PaymentAllocation,
    PaymentAllocator, PaymentSubmission,
};
pub use service::{BillingService, MonthlyStatement, Settlement};
pub use shares::{
    compute_expense_shares, ApartmentShare, ExpenseAllocation, ExpenseShareCalculator, ShareBatch,
    SkippedExpense,
};
pub use state::ApartmentFinancialState;
pub use types::{
    ApartmentId, BalanceStatus, BillingPeriod, BuildingId, DistributionType, ExpenseCategory,
    ExpenseId, ExpenseRecord, HeatingChargeSplit, MeterReading, MeterType, PayerResponsibility,
    PayerType, PaymentId, PaymentMethod, PaymentRecord,
};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
