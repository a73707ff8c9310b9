use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::{LedgerError, Result};
use crate::events::{Event, EventStore};
use crate::state::ApartmentFinancialState;
use crate::types::{ApartmentId, BillingPeriod, MeterReading, MeterType};

/// consumption of one apartment on one meter for a period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeterConsumption {
    pub apartment_id: ApartmentId,
    pub meter_type: MeterType,
    pub previous_reading: Option<Decimal>,
    pub previous_date: Option<NaiveDate>,
    pub current_reading: Option<Decimal>,
    pub current_date: Option<NaiveDate>,
    pub consumption: Decimal,
}

impl MeterConsumption {
    pub fn has_prior_reading(&self) -> bool {
        self.previous_reading.is_some()
    }
}

/// resolves previous/current readings out of a reading history
pub struct MeterConsumptionResolver<'a> {
    readings: &'a [MeterReading],
}

impl<'a> MeterConsumptionResolver<'a> {
    pub fn new(readings: &'a [MeterReading]) -> Self {
        Self { readings }
    }

    fn series(
        &self,
        apartment_id: ApartmentId,
        meter_type: MeterType,
    ) -> impl Iterator<Item = &'a MeterReading> {
        let readings: &'a [MeterReading] = self.readings;
        readings
            .iter()
            .filter(move |r| r.apartment_id == apartment_id && r.meter_type == meter_type)
    }

    /// latest reading strictly before `date`
    pub fn previous_reading(
        &self,
        apartment_id: ApartmentId,
        meter_type: MeterType,
        date: NaiveDate,
    ) -> Option<&'a MeterReading> {
        self.series(apartment_id, meter_type)
            .filter(|r| r.reading_date < date)
            .max_by_key(|r| r.reading_date)
    }

    /// latest reading inside the period
    pub fn current_reading(
        &self,
        apartment_id: ApartmentId,
        meter_type: MeterType,
        period: &BillingPeriod,
    ) -> Option<&'a MeterReading> {
        self.series(apartment_id, meter_type)
            .filter(|r| period.contains(r.reading_date))
            .max_by_key(|r| r.reading_date)
    }

    /// resolve consumption; missing history yields zero consumption, a regression is an error
    pub fn resolve(
        &self,
        apartment_id: ApartmentId,
        meter_type: MeterType,
        period: &BillingPeriod,
    ) -> Result<MeterConsumption> {
        let previous = self.previous_reading(apartment_id, meter_type, period.start);
        let current = self.current_reading(apartment_id, meter_type, period);

        let consumption = match (previous, current) {
            (Some(prev), Some(cur)) => {
                if cur.value < prev.value {
                    return Err(LedgerError::ReadingRegression {
                        apartment_id,
                        meter_type,
                        previous: prev.value,
                        current: cur.value,
                    });
                }
                (cur.value - prev.value).max(Decimal::ZERO)
            }
            _ => Decimal::ZERO,
        };

        Ok(MeterConsumption {
            apartment_id,
            meter_type,
            previous_reading: previous.map(|r| r.value),
            previous_date: previous.map(|r| r.reading_date),
            current_reading: current.map(|r| r.value),
            current_date: current.map(|r| r.reading_date),
            consumption,
        })
    }

    /// consumption table for every apartment in the building
    pub fn build_table(
        &self,
        apartments: &[ApartmentFinancialState],
        meter_type: MeterType,
        period: &BillingPeriod,
        events: &mut EventStore,
    ) -> Result<ConsumptionTable> {
        let mut entries = Vec::with_capacity(apartments.len());

        for apartment in apartments {
            let resolved = self.resolve(apartment.apartment_id, meter_type, period)?;
            if !resolved.has_prior_reading() {
                tracing::debug!(
                    apartment_id = %apartment.apartment_id,
                    %meter_type,
                    "no prior reading, consumption counted as zero"
                );
                events.emit(Event::NoPriorReading {
                    apartment_id: apartment.apartment_id,
                    meter_type,
                });
            }
            entries.push(resolved);
        }

        Ok(ConsumptionTable {
            meter_type,
            period: *period,
            entries,
        })
    }
}

/// per-apartment consumption for one meter type and period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionTable {
    pub meter_type: MeterType,
    pub period: BillingPeriod,
    pub entries: Vec<MeterConsumption>,
}

impl ConsumptionTable {
    /// table from already known figures
    pub fn from_figures(
        meter_type: MeterType,
        period: BillingPeriod,
        figures: impl IntoIterator<Item = (ApartmentId, Decimal)>,
    ) -> Self {
        let entries = figures
            .into_iter()
            .map(|(apartment_id, consumption)| MeterConsumption {
                apartment_id,
                meter_type,
                previous_reading: None,
                previous_date: None,
                current_reading: None,
                current_date: None,
                consumption,
            })
            .collect();

        Self {
            meter_type,
            period,
            entries,
        }
    }

    /// zero for apartments not in the table
    pub fn consumption_of(&self, apartment_id: ApartmentId) -> Decimal {
        self.entries
            .iter()
            .filter(|e| e.apartment_id == apartment_id)
            .map(|e| e.consumption)
            .sum()
    }

    pub fn total(&self) -> Decimal {
        self.entries.iter().map(|e| e.consumption).sum()
    }
}

/// resolve one apartment's consumption from its reading history
pub fn resolve_meter_consumption(
    readings: &[MeterReading],
    apartment_id: ApartmentId,
    meter_type: MeterType,
    period: &BillingPeriod,
) -> Result<MeterConsumption> {
    MeterConsumptionResolver::new(readings).resolve(apartment_id, meter_type, period)
}

/// consumption of every apartment for one meter type
pub fn build_consumption_table(
    readings: &[MeterReading],
    apartments: &[ApartmentFinancialState],
    meter_type: MeterType,
    period: &BillingPeriod,
    events: &mut EventStore,
) -> Result<ConsumptionTable> {
    MeterConsumptionResolver::new(readings).build_table(apartments, meter_type, period, events)
}

/// check readings about to be submitted for a period against the stored history
pub fn validate_new_readings(
    submitted: &[MeterReading],
    history: &[MeterReading],
    period: &BillingPeriod,
) -> Result<()> {
    let resolver = MeterConsumptionResolver::new(history);

    for reading in submitted {
        if reading.value < Decimal::ZERO {
            return Err(LedgerError::NegativeReading {
                apartment_id: reading.apartment_id,
                meter_type: reading.meter_type,
                value: reading.value,
            });
        }

        let previous =
            resolver.previous_reading(reading.apartment_id, reading.meter_type, period.start);
        if let Some(previous) = previous {
            if reading.value < previous.value {
                return Err(LedgerError::ReadingRegression {
                    apartment_id: reading.apartment_id,
                    meter_type: reading.meter_type,
                    previous: previous.value,
                    current: reading.value,
                });
            }
        }
    }

    Ok(())
}

/// a reading history must not decrease over time for any apartment and meter
pub fn validate_series(readings: &[MeterReading]) -> Result<()> {
    let mut series: BTreeMap<(ApartmentId, MeterType), Vec<&MeterReading>> = BTreeMap::new();
    for reading in readings {
        series
            .entry((reading.apartment_id, reading.meter_type))
            .or_default()
            .push(reading);
    }

    for (_, mut points) in series {
        points.sort_by_key(|r| r.reading_date);
        for pair in points.windows(2) {
            let (earlier, later) = (pair[0], pair[1]);
            if earlier.value < Decimal::ZERO {
                return Err(LedgerError::NegativeReading {
                    apartment_id: earlier.apartment_id,
                    meter_type: earlier.meter_type,
                    value: earlier.value,
                });
            }
            if later.value < earlier.value {
                return Err(LedgerError::ReadingRegression {
                    apartment_id: later.apartment_id,
                    meter_type: later.meter_type,
                    previous: earlier.value,
                    current: later.value,
                });
            }
        }
        if let Some(last) = points.last() {
            if last.value < Decimal::ZERO {
                return Err(LedgerError::NegativeReading {
                    apartment_id: last.apartment_id,
                    meter_type: last.meter_type,
                    value: last.value,
                });
            }
        }
    }

    Ok(())
}
