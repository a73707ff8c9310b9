pub mod heating;
pub mod resolver;

pub use heating::HeatingSplitter;
pub use resolver::{
    build_consumption_table, resolve_meter_consumption, validate_new_readings, validate_series, ConsumptionTable,
    MeterConsumption, MeterConsumptionResolver,
};
