use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{ApartmentId, BalanceStatus, ExpenseId, MeterType};

/// things worth surfacing to the user that are not errors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // distribution events
    ExpenseSkipped {
        expense_id: ExpenseId,
        reason: String,
    },
    UndistributedRemainder {
        expense_id: ExpenseId,
        amount: Money,
        distributed: Money,
    },

    // reconciliation events
    ReconciliationMismatch {
        apartment_id: ApartmentId,
        field: String,
        expected: Money,
        actual: Money,
    },
    ServerShareMismatch {
        apartment_id: ApartmentId,
        local: Money,
        server: Money,
    },
    StatusClassified {
        apartment_id: ApartmentId,
        net_obligation: Money,
        status: BalanceStatus,
    },

    ServerCrossCheckUnavailable {
        reason: String,
    },
    InvalidApartmentData {
        apartment_id: ApartmentId,
        reason: String,
    },

    // meter events
    NoPriorReading {
        apartment_id: ApartmentId,
        meter_type: MeterType,
    },
    MeterReadingsRejected {
        meter_type: MeterType,
        apartment_id: Option<ApartmentId>,
        reason: String,
    },

    // payment events
    PaymentAllocated {
        apartment_id: ApartmentId,
        total: Money,
        previous_obligations_amount: Money,
        reserve_fund_amount: Money,
        common_expense_amount: Money,
    },
}

/// event store for collecting events during a computation pass
#[derive(Debug, Default, Clone)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
        }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn extend(&mut self, events: impl IntoIterator<Item = Event>) {
        self.events.extend(events);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
