//! Robot vendors and their per-vendor constants

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::error::{FleetError, Result};

/// The vendors present in the fleet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Vendor {
    AmazonNormal,
    Balyo,
    AmazonInternal,
}

impl Vendor {
    pub const ALL: [Vendor; 3] = [Vendor::AmazonNormal, Vendor::Balyo, Vendor::AmazonInternal];

    /// Display name as operators know it
    pub fn label(&self) -> &'static str {
        match self {
            Vendor::AmazonNormal => "Amazon Normal",
            Vendor::Balyo => "Balyo",
            Vendor::AmazonInternal => "Amazon Internal",
        }
    }

    /// Robot id prefix (`AR-001`, `BALYO-001`, `AMZN-001`)
    pub fn id_prefix(&self) -> &'static str {
        match self {
            Vendor::AmazonNormal => "AR",
            Vendor::Balyo => "BALYO",
            Vendor::AmazonInternal => "AMZN",
        }
    }

    /// Hardware model reported in snapshots
    pub fn model(&self) -> &'static str {
        match self {
            Vendor::AmazonNormal => "Proteus AMR",
            Vendor::Balyo => "Balyo Reach",
            Vendor::AmazonInternal => "Hercules Drive",
        }
    }

    /// Vendor family used by the task catalog ("Amazon" covers both Amazon lines)
    pub fn family(&self) -> &'static str {
        match self {
            Vendor::AmazonNormal | Vendor::AmazonInternal => "Amazon",
            Vendor::Balyo => "Balyo",
        }
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-vendor rates. Battery rates are percent per simulated minute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorProfile {
    pub drain_per_minute: f64,
    pub charge_per_minute: f64,
    /// Chance per tick that a working robot faults
    pub fault_probability: f64,
    pub cruise_speed_min: f64,
    pub cruise_speed_max: f64,
}

impl VendorProfile {
    /// Drain per tick at the given tick rate
    pub fn drain_per_tick(&self, ticks_per_minute: f64) -> f64 {
        self.drain_per_minute / ticks_per_minute
    }

    /// Charge per tick at the given tick rate
    pub fn charge_per_tick(&self, ticks_per_minute: f64) -> f64 {
        self.charge_per_minute / ticks_per_minute
    }

    fn validate(&self, vendor: Vendor) -> Result<()> {
        if self.drain_per_minute < 0.0 || self.charge_per_minute <= 0.0 {
            return Err(FleetError::InvalidConfig(format!(
                "{}: drain must be >= 0 and charge > 0",
                vendor
            )));
        }
        if !(0.0..=1.0).contains(&self.fault_probability) {
            return Err(FleetError::InvalidConfig(format!(
                "{}: fault_probability must be within [0, 1]",
                vendor
            )));
        }
        if self.cruise_speed_min <= 0.0 || self.cruise_speed_min > self.cruise_speed_max {
            return Err(FleetError::InvalidConfig(format!(
                "{}: cruise speed range ({}, {}) is invalid",
                vendor, self.cruise_speed_min, self.cruise_speed_max
            )));
        }
        Ok(())
    }
}

/// Constant table with one profile per vendor
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VendorTable {
    pub amazon_normal: VendorProfile,
    pub balyo: VendorProfile,
    pub amazon_internal: VendorProfile,
}

impl Default for VendorTable {
    fn default() -> Self {
        Self {
            amazon_normal: VendorProfile {
                drain_per_minute: 0.8,
                charge_per_minute: 5.0,
                fault_probability: 0.0017,
                cruise_speed_min: 1.2,
                cruise_speed_max: 2.8,
            },
            balyo: VendorProfile {
                drain_per_minute: 0.6,
                charge_per_minute: 5.0,
                fault_probability: 0.0017,
                cruise_speed_min: 1.2,
                cruise_speed_max: 2.8,
            },
            // Roughly three times as fault-prone as the other lines
            amazon_internal: VendorProfile {
                drain_per_minute: 1.2,
                charge_per_minute: 5.0,
                fault_probability: 0.005,
                cruise_speed_min: 1.2,
                cruise_speed_max: 2.8,
            },
        }
    }
}

impl VendorTable {
    pub fn get(&self, vendor: Vendor) -> &VendorProfile {
        match vendor {
            Vendor::AmazonNormal => &self.amazon_normal,
            Vendor::Balyo => &self.balyo,
            Vendor::AmazonInternal => &self.amazon_internal,
        }
    }

    pub fn get_mut(&mut self, vendor: Vendor) -> &mut VendorProfile {
        match vendor {
            Vendor::AmazonNormal => &mut self.amazon_normal,
            Vendor::Balyo => &mut self.balyo,
            Vendor::AmazonInternal => &mut self.amazon_internal,
        }
    }

    pub fn validate(&self) -> Result<()> {
        for vendor in Vendor::ALL {
            self.get(vendor).validate(vendor)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_line_is_more_fault_prone() {
        let table = VendorTable::default();
        let ratio = table.amazon_internal.fault_probability / table.amazon_normal.fault_probability;
        assert!(ratio > 2.5 && ratio < 3.5);
    }

    #[test]
    fn test_per_tick_rates() {
        let table = VendorTable::default();
        let drain = table.get(Vendor::AmazonNormal).drain_per_tick(120.0);
        assert!((drain - 0.8 / 120.0).abs() < 1e-12);
    }

    #[test]
    fn test_labels_and_prefixes() {
        assert_eq!(Vendor::Balyo.label(), "Balyo");
        assert_eq!(Vendor::AmazonInternal.id_prefix(), "AMZN");
        assert_eq!(Vendor::AmazonInternal.family(), "Amazon");
    }

    #[test]
    fn test_invalid_speed_range_rejected() {
        let mut table = VendorTable::default();
        table.get_mut(Vendor::Balyo).cruise_speed_min = 5.0;
        assert!(table.validate().is_err());
    }
}
