pub mod calculator;
pub mod rules;

pub use calculator::{
    compute_expense_shares, ApartmentShare, ExpenseAllocation, ExpenseShareCalculator, ShareBatch,
    SkippedExpense,
};
pub use rules::{
    distribute_expense, DistributionRule, EqualRule, HeatingMillsRule, MeterRule,
    ParticipationMillsRule, ShareLine,
};
