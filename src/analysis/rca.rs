//! Root-cause analysis text: LLM prompt construction and the rule-based
//! fallback used whenever the LLM is absent or fails.

use super::context::IncidentContext;

/// A neighbour closer than this is treated as blocking the robot
const BLOCKING_DISTANCE: f64 = 3.0;

/// Battery below this level is blamed before anything else
const DEAD_BATTERY: f64 = 10.0;

/// Repeated errors at one spot (or on one robot) worth flagging
const PATTERN_THRESHOLD: usize = 3;

pub const SYSTEM_PROMPT: &str = "You are a warehouse robot fleet engineer. Given an incident \
report, explain concisely what happened, why, and how to fix it. Base every claim on the \
data provided.";

/// User prompt for one incident
pub fn build_prompt(ctx: &IncidentContext) -> String {
    let fault = ctx
        .fault
        .as_ref()
        .map(|f| format!("{} ({}, {:?})", f.code, f.name, f.severity))
        .unwrap_or_else(|| "unknown".into());
    let task = ctx
        .task
        .as_ref()
        .map(|t| format!("{} {} -> {}", t.id, t.origin, t.destination))
        .unwrap_or_else(|| "none".into());
    let nearby = serde_json::to_string_pretty(&ctx.nearby).unwrap_or_else(|_| "[]".into());
    let location = serde_json::to_string(&ctx.same_location_errors).unwrap_or_else(|_| "[]".into());
    let history = serde_json::to_string(&ctx.robot_errors).unwrap_or_else(|_| "[]".into());
    let charger = ctx
        .nearest_charger
        .as_ref()
        .map(|c| format!("{} ({:.1}m away)", c.name, c.distance))
        .unwrap_or_else(|| "none".into());

    format!(
        "AFFECTED ROBOT:\n\
         - ID: {id}\n\
         - Vendor: {vendor}\n\
         - Position: ({x:.1}, {y:.1}) in {zone}\n\
         - Battery: {battery:.1}%\n\
         - Fault: {fault}\n\
         - Task: {task}\n\n\
         NEARBY ROBOTS (within 15m):\n{nearby}\n\n\
         HISTORY:\n\
         - Errors at this location: {location}\n\
         - This robot's errors: {history}\n\
         - Nearest charger: {charger}\n\n\
         Answer in this format:\n\n\
         WHAT HAPPENED:\n[1-2 sentences]\n\n\
         WHY:\n[root cause with evidence]\n\n\
         SUGGESTED FIX:\n1. ...\n2. ...\n3. ...\n\n\
         PATTERN WARNING:\n[recurring pattern, or \"No recurring patterns detected.\"]",
        id = ctx.robot_id,
        vendor = ctx.vendor,
        x = ctx.position.x,
        y = ctx.position.y,
        zone = ctx.zone,
        battery = ctx.battery,
        fault = fault,
        task = task,
        nearby = nearby,
        location = location,
        history = history,
        charger = charger,
    )
}

/// Section headers every analysis carries, in order
pub const SECTIONS: [&str; 4] = ["WHAT HAPPENED:", "WHY:", "SUGGESTED FIX:", "PATTERN WARNING:"];

/// Keep an LLM answer only if it has every section in order
///
/// Markdown bold markers and any preamble before the first header are
/// dropped.
pub fn accept_answer(raw: &str) -> Option<String> {
    let text = raw.replace("**", "");
    let start = text.find(SECTIONS[0])?;
    let body = text[start..].trim_end();

    let mut from = 0;
    for header in SECTIONS {
        from += body[from..].find(header)? + header.len();
    }
    Some(body.to_string())
}

/// Deterministic analysis from the incident data alone
pub fn rule_based(ctx: &IncidentContext) -> String {
    let (code, name) = ctx
        .fault
        .as_ref()
        .map(|f| (f.code.as_str(), f.name.as_str()))
        .unwrap_or(("Unknown", "Unknown Error"));
    let charger = ctx
        .nearest_charger
        .as_ref()
        .map(|c| (c.name.as_str(), c.distance))
        .unwrap_or(("the nearest charger", 0.0));
    let blocker = ctx.blocker(BLOCKING_DISTANCE);

    let mut lines = vec![
        SECTIONS[0].to_string(),
        format!(
            "{} ({}) stopped at ({:.1}, {:.1}) in {} with error {} ({}).",
            ctx.robot_id, ctx.vendor, ctx.position.x, ctx.position.y, ctx.zone, code, name
        ),
        String::new(),
        SECTIONS[1].to_string(),
    ];

    let mut steps: Vec<String> = Vec::new();
    if let Some(b) = blocker {
        let state = if b.status == crate::fleet::robot::RobotStatus::Idle {
            "idle"
        } else {
            "in error state"
        };
        lines.push(format!(
            "{} was trying to proceed but {} ({}) is {} at ({:.1}, {:.1}), just {:.1}m away, \
             directly blocking the path.",
            ctx.robot_id, b.id, b.vendor, state, b.position.x, b.position.y, b.distance
        ));
        steps.push(format!("Move {} with a new task or a parking trip", b.id));
        steps.push(format!("{} should resume once the path clears", ctx.robot_id));
    } else if ctx.battery < DEAD_BATTERY {
        lines.push(format!(
            "{} has critically low battery ({:.1}%) and likely ran out of power before \
             finishing its task. Nearest charger is {} ({:.1}m away).",
            ctx.robot_id, ctx.battery, charger.0, charger.1
        ));
        steps.push(format!("Manually move {} to {}", ctx.robot_id, charger.0));
        if let Some(task) = &ctx.task {
            steps.push(format!("Reassign task {} to another robot", task.id));
        }
    } else {
        lines.push(format!(
            "The exact cause needs investigation. {} may stem from environmental \
             conditions or hardware issues.",
            code
        ));
        steps.push("Check the robot's immediate surroundings for obstacles".to_string());
        steps.push("Clear the error and reassign the task".to_string());
    }

    lines.push(String::new());
    lines.push(SECTIONS[2].to_string());
    for (i, step) in steps.iter().enumerate() {
        lines.push(format!("{}. {}", i + 1, step));
    }

    lines.push(String::new());
    lines.push(SECTIONS[3].to_string());
    if ctx.same_location_errors.len() >= PATTERN_THRESHOLD {
        lines.push(format!(
            "This location has seen {} recent errors. Consider an alternate route or \
             marking it a no-idle zone.",
            ctx.same_location_errors.len()
        ));
    } else if ctx.robot_errors.len() >= PATTERN_THRESHOLD {
        lines.push(format!(
            "{} has had {} recent errors. Schedule maintenance or an inspection.",
            ctx.robot_id,
            ctx.robot_errors.len()
        ));
    } else {
        lines.push("No recurring patterns detected.".to_string());
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::context::{ChargerRef, LocationError, NearbyRobot};
    use crate::core::types::{Position, RobotId};
    use crate::fleet::faults::FaultSeverity;
    use crate::fleet::robot::{ActiveFault, RobotStatus};

    fn context() -> IncidentContext {
        IncidentContext {
            robot_id: RobotId::new("BALYO-004"),
            vendor: "Balyo".into(),
            position: Position::new(24.0, 17.0),
            zone: "Zone E".into(),
            battery: 55.0,
            fault: Some(ActiveFault {
                code: "PATH_BLOCKED".into(),
                name: "Path Blocked".into(),
                severity: FaultSeverity::Warning,
                timestamp: 12.0,
                resolved: false,
                resolved_at: None,
            }),
            task: None,
            nearby: Vec::new(),
            same_location_errors: Vec::new(),
            robot_errors: Vec::new(),
            nearest_charger: Some(ChargerRef {
                name: "Charger C5".into(),
                distance: 11.7,
            }),
            trail_points: 40,
            time: 12.0,
        }
    }

    #[test]
    fn test_blocker_is_named() {
        let mut ctx = context();
        ctx.nearby.push(NearbyRobot {
            id: RobotId::new("BALYO-005"),
            vendor: "Balyo".into(),
            position: Position::new(25.5, 17.0),
            status: RobotStatus::Idle,
            distance: 1.5,
            task: None,
        });
        let text = rule_based(&ctx);
        assert!(text.contains("BALYO-005"));
        assert!(text.contains("1. Move BALYO-005"));
        assert!(text.contains("No recurring patterns detected."));
    }

    #[test]
    fn test_low_battery_blamed_without_blocker() {
        let mut ctx = context();
        ctx.battery = 4.0;
        let text = rule_based(&ctx);
        assert!(text.contains("critically low battery"));
        assert!(text.contains("Charger C5"));
    }

    #[test]
    fn test_location_pattern_warning() {
        let mut ctx = context();
        ctx.same_location_errors = (0..3)
            .map(|i| LocationError {
                robot: RobotId::new("BALYO-004"),
                code: "PATH_BLOCKED".into(),
                timestamp: i as f64,
            })
            .collect();
        let text = rule_based(&ctx);
        assert!(text.contains("This location has seen 3 recent errors"));
    }

    #[test]
    fn test_rule_based_text_passes_own_check() {
        let text = rule_based(&context());
        assert_eq!(accept_answer(&text), Some(text));
    }

    #[test]
    fn test_answer_preamble_and_bold_stripped() {
        let raw = "Sure, here is the analysis.\n\n**WHAT HAPPENED:**\nStalled.\n\n\
                   **WHY:**\nBlocked.\n\n**SUGGESTED FIX:**\n1. Move it\n\n\
                   **PATTERN WARNING:**\nNo recurring patterns detected.\n\n";
        let text = accept_answer(raw).unwrap();
        assert!(text.starts_with("WHAT HAPPENED:\nStalled."));
        assert!(text.ends_with("No recurring patterns detected."));
        assert!(!text.contains("**"));
    }

    #[test]
    fn test_answer_missing_or_misordered_sections_rejected() {
        assert!(accept_answer("The robot stalled near Station 4.").is_none());
        assert!(accept_answer("WHAT HAPPENED:\nx\nWHY:\ny\nPATTERN WARNING:\nz").is_none());
        assert!(accept_answer(
            "WHAT HAPPENED:\nx\nSUGGESTED FIX:\n1. a\nWHY:\ny\nPATTERN WARNING:\nz"
        )
        .is_none());
    }

    #[test]
    fn test_prompt_mentions_fault_and_charger() {
        let prompt = build_prompt(&context());
        assert!(prompt.contains("PATH_BLOCKED (Path Blocked, Warning)"));
        assert!(prompt.contains("Charger C5 (11.7m away)"));
        assert!(prompt.contains("Zone E"));
    }
}
