//! Per-vendor fault catalogs used for fault injection
//!
//! Each vendor reports faults in its own code space. Only the fields the
//! simulation needs are kept here; remediation text lives in the external
//! knowledge base.

use serde::{Deserialize, Serialize};

use crate::fleet::vendor::Vendor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FaultSeverity {
    Critical,
    Warning,
    Info,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaultDef {
    pub code: &'static str,
    pub name: &'static str,
    pub severity: FaultSeverity,
}

const fn fault(code: &'static str, name: &'static str, severity: FaultSeverity) -> FaultDef {
    FaultDef { code, name, severity }
}

use FaultSeverity::{Critical, Info, Warning};

const AMAZON_NORMAL_FAULTS: &[FaultDef] = &[
    fault("E-1001", "Emergency Stop Activated", Critical),
    fault("E-1005", "Battery Critical", Warning),
    fault("E-2001", "Obstacle Detected", Warning),
    fault("E-2002", "Obstacle Timeout", Warning),
    fault("E-3001", "Localization Lost", Critical),
    fault("E-3002", "Map Mismatch", Warning),
    fault("E-4010", "Path Computation Timeout", Warning),
    fault("E-4012", "Path Planning Failure", Warning),
    fault("E-4015", "Destination Unreachable", Warning),
    fault("E-5001", "Motor Fault", Critical),
    fault("E-5002", "Wheel Slip Detected", Info),
];

const BALYO_FAULTS: &[FaultDef] = &[
    fault("NAV_LOST", "Navigation Lost", Critical),
    fault("PATH_BLOCKED", "Path Blocked", Warning),
    fault("BATT_LOW", "Battery Low", Warning),
    fault("BATT_CRITICAL", "Battery Critical", Critical),
    fault("ESTOP", "Emergency Stop", Critical),
    fault("OBSTACLE_FRONT", "Front Obstacle", Info),
    fault("OBSTACLE_TIMEOUT", "Obstacle Timeout", Warning),
    fault("MOTOR_FAULT", "Motor Error", Critical),
    fault("CHARGING_FAIL", "Charging Failed", Warning),
    fault("TASK_TIMEOUT", "Task Timeout", Warning),
];

const AMAZON_INTERNAL_FAULTS: &[FaultDef] = &[
    fault("0x0001", "System Boot", Info),
    fault("0x8001", "E-Stop Pressed", Critical),
    fault("0x8004", "Battery Low", Warning),
    fault("0x8008", "Path Error", Warning),
    fault("0x800C", "Motor Stall", Critical),
    fault("0x8010", "Sensor Fault", Warning),
    fault("0x8014", "Communication Lost", Critical),
    fault("0x8018", "Guidance Lost", Critical),
    fault("ERR_47", "Undefined Error", Warning),
];

/// Full fault catalog for a vendor
pub fn catalog(vendor: Vendor) -> &'static [FaultDef] {
    match vendor {
        Vendor::AmazonNormal => AMAZON_NORMAL_FAULTS,
        Vendor::Balyo => BALYO_FAULTS,
        Vendor::AmazonInternal => AMAZON_INTERNAL_FAULTS,
    }
}

/// Faults eligible for injection (informational codes excluded)
pub fn injectable(vendor: Vendor) -> Vec<&'static FaultDef> {
    catalog(vendor)
        .iter()
        .filter(|f| f.severity != FaultSeverity::Info)
        .collect()
}

/// Look up a fault definition by code across all vendors
pub fn lookup(code: &str) -> Option<(Vendor, &'static FaultDef)> {
    Vendor::ALL
        .iter()
        .find_map(|&v| catalog(v).iter().find(|f| f.code == code).map(|f| (v, f)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_injectable_excludes_info() {
        for vendor in Vendor::ALL {
            let pool = injectable(vendor);
            assert!(!pool.is_empty());
            assert!(pool.iter().all(|f| f.severity != FaultSeverity::Info));
        }
    }

    #[test]
    fn test_lookup_finds_vendor() {
        let (vendor, def) = lookup("NAV_LOST").unwrap();
        assert_eq!(vendor, Vendor::Balyo);
        assert_eq!(def.name, "Navigation Lost");
        assert!(lookup("NOPE").is_none());
    }
}
