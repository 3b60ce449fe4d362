//! Warehouse task catalog
//!
//! Named task types an operator can assign, which vendor families can run
//! them, and the cruise speed range each one uses.

use crate::fleet::vendor::Vendor;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaskDef {
    pub id: &'static str,
    pub name: &'static str,
    pub category: &'static str,
    pub description: &'static str,
    /// Vendor families able to execute the task ("Amazon", "Balyo", "Gemini")
    pub vendors: &'static [&'static str],
    pub speed_range: (f64, f64),
    /// Duration relative to a plain transport over the same distance
    pub duration_mult: f64,
}

pub const TASK_CATALOG: &[TaskDef] = &[
    TaskDef {
        id: "move_pod",
        name: "Move Inventory Pod",
        category: "Inventory Movement",
        description: "Drive under a shelving pod, lift it, and transport it to a workstation",
        vendors: &["Amazon"],
        speed_range: (1.0, 2.0),
        duration_mult: 1.0,
    },
    TaskDef {
        id: "transport_bin",
        name: "Transport Bin/Tote",
        category: "Inventory Movement",
        description: "Move a standardized bin or tote between storage frame and work cell",
        vendors: &["Amazon", "Balyo"],
        speed_range: (1.2, 2.5),
        duration_mult: 1.0,
    },
    TaskDef {
        id: "stow_inventory",
        name: "Stow Inventory",
        category: "Inbound",
        description: "Bring empty pod to stower, then return to optimized storage spot",
        vendors: &["Amazon", "Gemini"],
        speed_range: (1.0, 1.8),
        duration_mult: 1.3,
    },
    TaskDef {
        id: "pick_item",
        name: "Pick Item",
        category: "Picking",
        description: "Present bin to robotic arm for individual item pick",
        vendors: &["Amazon"],
        speed_range: (0.8, 1.5),
        duration_mult: 1.5,
    },
    TaskDef {
        id: "present_to_picker",
        name: "Present to Picker",
        category: "Picking",
        description: "Bring pod to human picker station, rotate to correct shelf face, queue and wait",
        vendors: &["Amazon", "Balyo"],
        speed_range: (1.0, 2.2),
        duration_mult: 1.0,
    },
    TaskDef {
        id: "inter_area_transport",
        name: "Inter-Area Transport",
        category: "Transport",
        description: "Move totes between picking, packing, and sorting areas",
        vendors: &["Amazon", "Balyo", "Gemini"],
        speed_range: (1.5, 3.0),
        duration_mult: 1.0,
    },
    TaskDef {
        id: "packing_assist",
        name: "Packing Assist",
        category: "Packing",
        description: "Feed items to automated packing station",
        vendors: &["Balyo", "Gemini"],
        speed_range: (1.0, 2.0),
        duration_mult: 1.2,
    },
    TaskDef {
        id: "sort_package",
        name: "Sort Package",
        category: "Sorting",
        description: "Carry labeled package to correct destination chute and tilt to release",
        vendors: &["Amazon", "Balyo"],
        speed_range: (1.5, 3.5),
        duration_mult: 0.7,
    },
    TaskDef {
        id: "outbound_sort",
        name: "Outbound Sort",
        category: "Sorting",
        description: "Present packages to robotic arms for barcode read and lane placement",
        vendors: &["Amazon"],
        speed_range: (1.0, 2.0),
        duration_mult: 1.0,
    },
    TaskDef {
        id: "consolidate_order",
        name: "Consolidate Order",
        category: "Outbound",
        description: "Gather items from multiple picks into shared containers for one route",
        vendors: &["Amazon", "Balyo"],
        speed_range: (1.0, 2.5),
        duration_mult: 1.4,
    },
    TaskDef {
        id: "receive_inbound",
        name: "Receive Inbound",
        category: "Inbound",
        description: "Move inbound pallets from dock to staging",
        vendors: &["Balyo", "Gemini"],
        speed_range: (0.8, 1.8),
        duration_mult: 1.3,
    },
    TaskDef {
        id: "safety_patrol",
        name: "Safety Patrol",
        category: "Operations",
        description: "Patrol zone scanning for obstacles, humans in robot areas, and congestion",
        vendors: &["Amazon", "Balyo", "Gemini"],
        speed_range: (0.5, 1.2),
        duration_mult: 2.0,
    },
    TaskDef {
        id: "high_bay_access",
        name: "High-Bay Retrieval",
        category: "Operations",
        description: "Access top-level rack positions for storage or retrieval",
        vendors: &["Amazon", "Gemini"],
        speed_range: (0.6, 1.5),
        duration_mult: 1.6,
    },
];

pub fn find(id: &str) -> Option<&'static TaskDef> {
    TASK_CATALOG.iter().find(|t| t.id == id)
}

impl TaskDef {
    /// Whether robots of this vendor's family can run the task
    pub fn runs_on(&self, vendor: Vendor) -> bool {
        self.vendors.contains(&vendor.family())
    }
}
