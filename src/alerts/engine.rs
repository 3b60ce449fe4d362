//! Conflict engine: alert admission, deduplication and lifecycle
//!
//! Tracked alerts are keyed by fingerprint. A fingerprint is admitted at
//! most once per cooldown window, the number of unresolved alerts never
//! exceeds the configured cap, and alerts whose condition stops being
//! detected resolve themselves once stale and are purged after a short
//! retention window.

use ahash::{AHashMap, AHashSet};
use std::sync::Arc;

use crate::core::config::DetectionConfig;
use crate::core::types::{AlertId, RobotId, SimTime};
use crate::facility::Facility;
use crate::fleet::snapshot::FleetSnapshot;
use crate::fleet::vendor::VendorTable;

use super::detection::{self, DetectionInput};
use super::model::{Alert, AlertSeverity};

pub struct ConflictEngine {
    config: DetectionConfig,
    facility: Arc<Facility>,
    vendors: VendorTable,
    tracked: AHashMap<String, Alert>,
    /// Fingerprint -> time of its last admission
    cooldowns: AHashMap<String, SimTime>,
    next_sequence: u64,
    /// Time of the most recent snapshot seen
    clock: SimTime,
}

impl ConflictEngine {
    pub fn new(config: DetectionConfig, facility: Arc<Facility>, vendors: VendorTable) -> Self {
        Self {
            config,
            facility,
            vendors,
            tracked: AHashMap::new(),
            cooldowns: AHashMap::new(),
            next_sequence: 0,
            clock: 0.0,
        }
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Run every detection pass and apply the lifecycle rules
    ///
    /// Returns only the alerts admitted by this call.
    pub fn check_all(&mut self, snapshot: &FleetSnapshot) -> Vec<Alert> {
        let now = snapshot.time;
        self.clock = self.clock.max(now);

        let candidates = detection::run_all(&DetectionInput {
            snapshot,
            facility: &self.facility,
            config: &self.config,
            vendors: &self.vendors,
        });
        let current: AHashSet<String> = candidates.iter().map(|a| a.fingerprint()).collect();

        let mut admitted = Vec::new();
        for mut candidate in candidates {
            let fp = candidate.fingerprint();
            if self.tracked.contains_key(&fp) || self.in_cooldown(&fp, now) {
                continue;
            }
            if !self.make_room() {
                tracing::debug!("Alert cap reached, dropping {}", fp);
                continue;
            }
            candidate.created_at = now;
            candidate.sequence = self.next_sequence;
            self.next_sequence += 1;

            tracing::info!(
                "Alert {} raised: {} ({:?})",
                candidate.id,
                candidate.title,
                candidate.severity
            );
            self.cooldowns.insert(fp.clone(), now);
            self.tracked.insert(fp, candidate.clone());
            admitted.push(candidate);
        }
        // A later admission in the same pass may have evicted an earlier one
        admitted.retain(|a| self.alert(&a.id).is_some());

        self.auto_resolve(&current, now);
        self.purge(now);
        admitted
    }

    fn in_cooldown(&self, fingerprint: &str, now: SimTime) -> bool {
        self.cooldowns
            .get(fingerprint)
            .is_some_and(|&last| now - last < self.config.cooldown_secs)
    }

    fn unresolved_count(&self) -> usize {
        self.tracked.values().filter(|a| !a.resolved).count()
    }

    /// Free one unresolved slot for an admission; false if nothing can go
    ///
    /// At most one resolved alert is retired per admission. The slot itself
    /// comes from the oldest unresolved non-critical alert.
    fn make_room(&mut self) -> bool {
        if self.unresolved_count() < self.config.max_active_alerts {
            return true;
        }
        let Some(victim) = self.oldest(|a| !a.resolved && a.severity != AlertSeverity::Critical)
        else {
            return false;
        };
        if let Some(retired) = self.oldest(|a| a.resolved) {
            self.evict(&retired);
        }
        self.evict(&victim);
        true
    }

    fn oldest(&self, pick: impl Fn(&Alert) -> bool) -> Option<String> {
        self.tracked
            .iter()
            .filter(|(_, a)| pick(a))
            .min_by(|(_, a), (_, b)| {
                a.age_key()
                    .partial_cmp(&b.age_key())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(fp, _)| fp.clone())
    }

    fn evict(&mut self, fingerprint: &str) {
        if let Some(alert) = self.tracked.remove(fingerprint) {
            tracing::debug!("Evicted alert {} ({})", alert.id, fingerprint);
        }
    }

    fn auto_resolve(&mut self, current: &AHashSet<String>, now: SimTime) {
        let stale = self.config.stale_secs;
        for (fp, alert) in self.tracked.iter_mut() {
            if alert.resolved || current.contains(fp) {
                continue;
            }
            if now - alert.created_at > stale {
                alert.mark_resolved(now);
                tracing::info!("Alert {} auto-resolved ({})", alert.id, fp);
            }
        }
    }

    fn purge(&mut self, now: SimTime) {
        let ttl = self.config.resolved_ttl_secs;
        self.tracked.retain(|_, a| match a.resolved_at {
            Some(at) if a.resolved => now - at <= ttl,
            _ => true,
        });
        let cooldown = self.config.cooldown_secs;
        self.cooldowns.retain(|_, &mut last| now - last < cooldown);
    }

    /// Unresolved alerts, most urgent and oldest first, capped
    pub fn active_alerts(&self) -> Vec<Alert> {
        let mut alerts: Vec<&Alert> = self.tracked.values().filter(|a| !a.resolved).collect();
        alerts.sort_by(|a, b| {
            a.severity.rank().cmp(&b.severity.rank()).then(
                a.age_key()
                    .partial_cmp(&b.age_key())
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
        });
        alerts
            .into_iter()
            .take(self.config.max_active_alerts)
            .cloned()
            .collect()
    }

    /// Every tracked alert, resolved ones included, in no particular order
    pub fn tracked(&self) -> impl Iterator<Item = &Alert> {
        self.tracked.values()
    }

    pub fn tracked_len(&self) -> usize {
        self.tracked.len()
    }

    pub fn alert(&self, id: &AlertId) -> Option<&Alert> {
        self.tracked.values().find(|a| &a.id == id)
    }

    fn alert_mut(&mut self, id: &AlertId) -> Option<&mut Alert> {
        self.tracked.values_mut().find(|a| &a.id == id)
    }

    pub fn acknowledge(&mut self, id: &AlertId) -> bool {
        let now = self.clock;
        match self.alert_mut(id) {
            Some(alert) => {
                if !alert.acknowledged {
                    alert.acknowledged = true;
                    alert.acknowledged_at = Some(now);
                    tracing::info!("Alert {} acknowledged", id);
                }
                true
            }
            None => false,
        }
    }

    pub fn resolve(&mut self, id: &AlertId) -> bool {
        let now = self.clock;
        match self.alert_mut(id) {
            Some(alert) => {
                if !alert.resolved {
                    alert.mark_resolved(now);
                    tracing::info!("Alert {} resolved by operator", id);
                }
                true
            }
            None => false,
        }
    }

    /// Attach root-cause text to open alerts for `robot` that have none yet
    ///
    /// Returns how many alerts received the text.
    pub fn attach_analysis(&mut self, robot: &RobotId, text: &str) -> usize {
        let mut attached = 0;
        for alert in self.tracked.values_mut() {
            if !alert.resolved && alert.analysis.is_none() && alert.involves(robot) {
                alert.analysis = Some(text.to_string());
                attached += 1;
            }
        }
        attached
    }
}
