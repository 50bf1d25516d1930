//! Strategy interchange format and per-node schedule configuration.

pub mod schema;

pub use schema::{
    export_strategy, import_strategy, ConnectionSchema, NodeSchema, PeriodUnit, PeriodicConfig,
    StrategySchema,
};
