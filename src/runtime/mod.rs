//! Fleet context and the periodic driver

pub mod context;
pub mod driver;

pub use context::{FleetContext, FleetUpdate, StepReport};
pub use driver::{run, DriverOptions, DriverReport};
