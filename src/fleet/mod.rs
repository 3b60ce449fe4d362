//! Fleet simulation: robot records, vendors, and the per-tick state machine

pub mod catalog;
pub mod command;
pub mod engine;
pub mod faults;
pub mod lifecycle;
pub mod robot;
pub mod snapshot;
pub mod vendor;

pub use command::{Command, CommandError, CommandOutcome, CommandParams};
pub use engine::{ErrorPattern, FleetSimulator, FleetSummary, RobotHistory};
pub use robot::{RobotRecord, RobotStatus, Task, TaskKind};
pub use snapshot::{FleetSnapshot, RobotSnapshot};
pub use vendor::{Vendor, VendorProfile, VendorTable};
