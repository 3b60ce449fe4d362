//! Warehouse floor geometry
//!
//! Static layout of the grid: rectangular zones, pickup/delivery stations,
//! charging stations and parking spots, plus the pure geometric queries the
//! simulation and detection engines share.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::error::{FleetError, Result};
use crate::core::types::Position;

/// A named rectangular region of the floor, bounds inclusive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub name: String,
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl Zone {
    pub fn new(name: impl Into<String>, x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> Self {
        Self {
            name: name.into(),
            x_min,
            x_max,
            y_min,
            y_max,
        }
    }

    pub fn contains(&self, pos: Position) -> bool {
        self.x_min <= pos.x && pos.x <= self.x_max && self.y_min <= pos.y && pos.y <= self.y_max
    }
}

/// A named point on the floor (station, charger, parking spot)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub name: String,
    pub position: Position,
}

impl Site {
    pub fn new(name: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            name: name.into(),
            position: Position::new(x, y),
        }
    }
}

/// Nearest-charger query result
#[derive(Debug, Clone, PartialEq)]
pub struct ChargerFix<'a> {
    pub charger: &'a Site,
    pub distance: f64,
}

/// Warehouse layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Facility {
    /// Grid columns; valid x coordinates are `0..=width - 1`
    pub width: u32,
    /// Grid rows; valid y coordinates are `0..=height - 1`
    pub height: u32,
    pub zones: Vec<Zone>,
    pub stations: Vec<Site>,
    pub chargers: Vec<Site>,
    #[serde(default)]
    pub parking: Vec<Site>,
}

impl Default for Facility {
    fn default() -> Self {
        Self::warehouse()
    }
}

impl Facility {
    /// The reference 40x30 warehouse: six zones, twenty stations, six chargers
    pub fn warehouse() -> Self {
        let zones = vec![
            Zone::new("Zone A", 0.0, 13.0, 0.0, 14.0),
            Zone::new("Zone B", 14.0, 26.0, 0.0, 14.0),
            Zone::new("Zone C", 27.0, 39.0, 0.0, 14.0),
            Zone::new("Zone D", 0.0, 13.0, 15.0, 29.0),
            Zone::new("Zone E", 14.0, 26.0, 15.0, 29.0),
            Zone::new("Zone F", 27.0, 39.0, 15.0, 29.0),
        ];

        let station_coords = [
            (3.0, 3.0), (10.0, 3.0), (17.0, 3.0), (24.0, 3.0), (31.0, 3.0), (37.0, 3.0),
            (3.0, 12.0), (10.0, 12.0), (17.0, 12.0), (24.0, 12.0), (31.0, 12.0), (37.0, 12.0),
            (3.0, 20.0), (10.0, 20.0), (17.0, 20.0), (24.0, 20.0), (31.0, 20.0), (37.0, 20.0),
            (3.0, 27.0), (10.0, 27.0),
        ];
        let stations = station_coords
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| Site::new(format!("Station {}", i + 1), x, y))
            .collect();

        let chargers = vec![
            Site::new("Charger C1", 1.0, 1.0),
            Site::new("Charger C2", 20.0, 1.0),
            Site::new("Charger C3", 38.0, 1.0),
            Site::new("Charger C4", 1.0, 28.0),
            Site::new("Charger C5", 20.0, 28.0),
            Site::new("Charger C6", 38.0, 28.0),
        ];

        let parking = vec![
            Site::new("P1", 6.0, 7.0),
            Site::new("P2", 20.0, 7.0),
            Site::new("P3", 34.0, 7.0),
            Site::new("P4", 6.0, 22.0),
            Site::new("P5", 20.0, 22.0),
            Site::new("P6", 34.0, 22.0),
        ];

        Self {
            width: 40,
            height: 30,
            zones,
            stations,
            chargers,
            parking,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(FleetError::InvalidConfig("facility grid must be non-empty".into()));
        }
        if self.stations.len() < 2 {
            return Err(FleetError::InvalidConfig(
                "facility needs at least two stations".into(),
            ));
        }
        if self.chargers.is_empty() {
            return Err(FleetError::InvalidConfig(
                "facility needs at least one charger".into(),
            ));
        }
        Ok(())
    }

    /// Largest valid x coordinate
    pub fn max_x(&self) -> f64 {
        self.width.saturating_sub(1) as f64
    }

    /// Largest valid y coordinate
    pub fn max_y(&self) -> f64 {
        self.height.saturating_sub(1) as f64
    }

    pub fn clamp(&self, pos: Position) -> Position {
        pos.clamped(self.max_x(), self.max_y())
    }

    /// First zone containing the position, in declaration order
    pub fn zone_at(&self, pos: Position) -> Option<&Zone> {
        self.zones.iter().find(|z| z.contains(pos))
    }

    /// Zone name for display; positions between zones report "Unknown"
    pub fn zone_name(&self, pos: Position) -> String {
        self.zone_at(pos)
            .map(|z| z.name.clone())
            .unwrap_or_else(|| "Unknown".to_string())
    }

    pub fn station(&self, name: &str) -> Option<&Site> {
        self.stations.iter().find(|s| s.name == name)
    }

    /// Nearest charging station, ties resolved by declaration order
    pub fn nearest_charger(&self, pos: Position) -> Option<ChargerFix<'_>> {
        self.chargers
            .iter()
            .map(|c| ChargerFix {
                charger: c,
                distance: c.position.distance(&pos),
            })
            .fold(None, |best: Option<ChargerFix<'_>>, candidate| match best {
                Some(b) if b.distance <= candidate.distance => Some(b),
                _ => Some(candidate),
            })
    }

    /// Closest parking spot, if the facility has any
    pub fn nearest_parking(&self, pos: Position) -> Option<&Site> {
        self.parking.iter().min_by(|a, b| {
            a.position
                .distance(&pos)
                .partial_cmp(&b.position.distance(&pos))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
    }

    /// Two distinct stations picked uniformly
    pub fn random_station_pair<R: Rng>(&self, rng: &mut R) -> Option<(&Site, &Site)> {
        let from = self.stations.choose(rng)?;
        let others: Vec<&Site> = self.stations.iter().filter(|s| s.name != from.name).collect();
        let to = others.choose(rng)?;
        Some((from, *to))
    }

    /// A station other than `name`, picked uniformly
    pub fn random_station_except<R: Rng>(&self, name: &str, rng: &mut R) -> Option<&Site> {
        let others: Vec<&Site> = self.stations.iter().filter(|s| s.name != name).collect();
        others.choose(rng).copied()
    }
}
