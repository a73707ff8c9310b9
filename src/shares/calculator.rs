use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::BuildingPolicyConfig;
use crate::decimal::{sum_cents, Money};
use crate::errors::{LedgerError, Result};
use crate::events::{Event, EventStore};
use crate::meters::{ConsumptionTable, HeatingSplitter};
use crate::state::{check_mills, ApartmentFinancialState};
use crate::types::{
    ApartmentId, ExpenseCategory, ExpenseId, ExpenseRecord, MeterType, PayerResponsibility,
};

use super::rules::{distribute_expense, ShareLine};

/// one apartment's share of the period's expenses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApartmentShare {
    pub apartment_id: ApartmentId,
    /// includes the reserve fund portion
    pub expense_share: Money,
    pub reserve_fund_share: Money,
    pub resident_expenses: Money,
    pub owner_expenses: Money,
}

/// how one expense was spread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseAllocation {
    pub expense_id: ExpenseId,
    pub amount: Money,
    pub lines: Vec<ShareLine>,
    /// amount minus what was distributed
    pub undistributed: Money,
}

/// an expense left out of the batch
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedExpense {
    pub expense_id: ExpenseId,
    pub error: LedgerError,
}

/// result of one share computation pass
#[derive(Debug, Clone)]
pub struct ShareBatch {
    pub shares: Vec<ApartmentShare>,
    pub allocations: Vec<ExpenseAllocation>,
    pub skipped: Vec<SkippedExpense>,
    pub events: EventStore,
    fingerprint: u64,
}

impl ShareBatch {
    pub fn share_for(&self, apartment_id: ApartmentId) -> Option<&ApartmentShare> {
        self.shares.iter().find(|s| s.apartment_id == apartment_id)
    }

    pub fn total_distributed(&self) -> Money {
        self.shares.iter().map(|s| s.expense_share).sum()
    }

    pub fn has_skipped(&self) -> bool {
        !self.skipped.is_empty()
    }

    /// true when the expenses differ from the ones this batch was computed from
    pub fn is_stale_for(&self, expenses: &[ExpenseRecord]) -> bool {
        self.fingerprint != fingerprint(expenses)
    }
}

#[derive(Default)]
struct Accumulator {
    terms: Vec<Decimal>,
    reserve: Vec<Decimal>,
    resident: Vec<Decimal>,
    owner: Vec<Decimal>,
}

/// turns a period's expenses into per-apartment shares
pub struct ExpenseShareCalculator<'a> {
    policy: &'a BuildingPolicyConfig,
    collect_reserve_fund: bool,
    rejected_meters: Vec<(MeterType, LedgerError)>,
}

impl<'a> ExpenseShareCalculator<'a> {
    pub fn new(policy: &'a BuildingPolicyConfig) -> Self {
        Self {
            policy,
            collect_reserve_fund: false,
            rejected_meters: Vec::new(),
        }
    }

    /// add the policy's monthly reserve contribution to every apartment
    pub fn collect_reserve_fund(mut self, collect: bool) -> Self {
        self.collect_reserve_fund = collect;
        self
    }

    /// readings of this meter type were unusable; expenses relying on them are skipped with `cause`
    pub fn reject_meter(mut self, meter_type: MeterType, cause: LedgerError) -> Self {
        self.rejected_meters.push((meter_type, cause));
        self
    }

    pub fn compute(
        &self,
        expenses: &[ExpenseRecord],
        apartments: &[ApartmentFinancialState],
        consumption: &[ConsumptionTable],
    ) -> Result<ShareBatch> {
        self.validate(expenses, apartments)?;
        let heating = HeatingSplitter::new(self.policy.fixed_heating_pct)?;

        let mut events = EventStore::new();
        let mut allocations = Vec::with_capacity(expenses.len());
        let mut skipped = Vec::new();
        let mut acc: HashMap<ApartmentId, Accumulator> = HashMap::new();

        for expense in expenses {
            let lines = if expense.amount.is_zero() {
                apartments.iter().map(|apt| (apt.apartment_id, Money::ZERO)).collect()
            } else {
                match distribute_expense(expense, apartments, consumption, heating) {
                    Ok(lines) => lines,
                    Err(error) if error.is_distribution() => {
                        let error = self.skip_cause(expense, error);
                        tracing::warn!(
                            expense_id = %expense.id,
                            title = %expense.title,
                            error = %error,
                            "expense skipped from distribution"
                        );
                        events.emit(Event::ExpenseSkipped {
                            expense_id: expense.id,
                            reason: error.to_string(),
                        });
                        skipped.push(SkippedExpense {
                            expense_id: expense.id,
                            error,
                        });
                        continue;
                    }
                    Err(error) => return Err(error),
                }
            };

            for (apartment_id, share) in &lines {
                let entry = acc.entry(*apartment_id).or_default();
                self.accumulate(entry, expense, *share);
            }

            let allocation = self.allocation(expense, lines, apartments.len(), &mut events);
            allocations.push(allocation);
        }

        if self.collect_reserve_fund && self.policy.reserve_fund.is_active() {
            for apt in apartments {
                let contribution = self.policy.reserve_fund.monthly_contribution(apt.participation_mills);
                let entry = acc.entry(apt.apartment_id).or_default();
                entry.terms.push(contribution.as_decimal());
                entry.reserve.push(contribution.as_decimal());
                entry.owner.push(contribution.as_decimal());
            }
        }

        let shares = apartments
            .iter()
            .map(|apt| {
                let entry = acc.remove(&apt.apartment_id).unwrap_or_default();
                ApartmentShare {
                    apartment_id: apt.apartment_id,
                    expense_share: sum_cents(entry.terms),
                    reserve_fund_share: sum_cents(entry.reserve),
                    resident_expenses: sum_cents(entry.resident),
                    owner_expenses: sum_cents(entry.owner),
                }
            })
            .collect();

        tracing::debug!(
            expenses = expenses.len(),
            apartments = apartments.len(),
            skipped = skipped.len(),
            "expense shares computed"
        );

        Ok(ShareBatch {
            shares,
            allocations,
            skipped,
            events,
            fingerprint: fingerprint(expenses),
        })
    }

    fn validate(&self, expenses: &[ExpenseRecord], apartments: &[ApartmentFinancialState]) -> Result<()> {
        for expense in expenses {
            if expense.amount.is_negative() {
                return Err(LedgerError::NegativeAmount {
                    field: format!("expense {} amount", expense.id),
                    amount: expense.amount,
                });
            }
        }

        for apt in apartments {
            check_mills(apt.apartment_id, "participation_mills", apt.participation_mills)?;
            if let Some(heating) = apt.heating_mills {
                check_mills(apt.apartment_id, "heating_mills", heating)?;
            }
        }

        Ok(())
    }

    /// a missing table caused by rejected readings reports the rejection instead
    fn skip_cause(&self, expense: &ExpenseRecord, error: LedgerError) -> LedgerError {
        if !matches!(error, LedgerError::MissingConsumption { .. }) {
            return error;
        }

        self.rejected_meters
            .iter()
            .find(|(meter_type, _)| {
                !expense.category.has_own_meter() || expense.category.matches_meter(*meter_type)
            })
            .map(|(_, cause)| cause.clone())
            .unwrap_or(error)
    }

    fn accumulate(&self, entry: &mut Accumulator, expense: &ExpenseRecord, share: Money) {
        entry.terms.push(share.as_decimal());

        if expense.category == ExpenseCategory::Reserve {
            entry.reserve.push(share.as_decimal());
        }

        match expense.payer_responsibility {
            PayerResponsibility::Resident => entry.resident.push(share.as_decimal()),
            PayerResponsibility::Owner => entry.owner.push(share.as_decimal()),
            PayerResponsibility::Shared => {
                let resident = share * self.policy.shared_resident_ratio.as_decimal();
                entry.resident.push(resident.as_decimal());
                entry.owner.push((share - resident).as_decimal());
            }
        }
    }

    fn allocation(
        &self,
        expense: &ExpenseRecord,
        lines: Vec<ShareLine>,
        apartment_count: usize,
        events: &mut EventStore,
    ) -> ExpenseAllocation {
        let distributed: Money = lines.iter().map(|(_, share)| *share).sum();
        let undistributed = expense.amount - distributed;

        // every share may be off by half a cent
        let rounding_slack = self.policy.reconciliation_tolerance * Decimal::from(apartment_count.max(1));
        if undistributed.abs() > rounding_slack {
            tracing::warn!(
                expense_id = %expense.id,
                amount = %expense.amount,
                distributed = %distributed,
                "expense not fully distributed"
            );
            events.emit(Event::UndistributedRemainder {
                expense_id: expense.id,
                amount: expense.amount,
                distributed,
            });
        }

        ExpenseAllocation {
            expense_id: expense.id,
            amount: expense.amount,
            lines,
            undistributed,
        }
    }
}

fn fingerprint(expenses: &[ExpenseRecord]) -> u64 {
    let mut sorted: Vec<&ExpenseRecord> = expenses.iter().collect();
    sorted.sort_by_key(|e| e.id);

    let mut hasher = DefaultHasher::new();
    for expense in sorted {
        expense.id.hash(&mut hasher);
        expense.amount.hash(&mut hasher);
        expense.date.hash(&mut hasher);
        expense.category.hash(&mut hasher);
        expense.distribution_type.hash(&mut hasher);
        expense.payer_responsibility.hash(&mut hasher);
    }
    hasher.finish()
}

/// compute per-apartment shares for a period's expenses
pub fn compute_expense_shares(
    expenses: &[ExpenseRecord],
    apartments: &[ApartmentFinancialState],
    consumption: &[ConsumptionTable],
    policy: &BuildingPolicyConfig,
) -> Result<ShareBatch> {
    ExpenseShareCalculator::new(policy).compute(expenses, apartments, consumption)
}
