//! Role Components
//!
//! Continuous role drives and the hysteresis policy that turns them into a
//! single discrete role per worker.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::RolesConfig;

/// Behavioral role of a bee
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Forager,
    Receiver,
    Nurse,
    Fanner,
    Guard,
    /// Fallback for bees without drives; never chosen by the policy
    Idle,
}

impl Role {
    /// Roles that carry a drive, in drive-slot order
    pub const DRIVEN: [Role; 5] = [
        Role::Forager,
        Role::Receiver,
        Role::Nurse,
        Role::Fanner,
        Role::Guard,
    ];

    /// Drive slot, or None for idle
    pub fn slot(self) -> Option<usize> {
        match self {
            Role::Forager => Some(0),
            Role::Receiver => Some(1),
            Role::Nurse => Some(2),
            Role::Fanner => Some(3),
            Role::Guard => Some(4),
            Role::Idle => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Forager => "forager",
            Role::Receiver => "receiver",
            Role::Nurse => "nurse",
            Role::Fanner => "fanner",
            Role::Guard => "guard",
            Role::Idle => "idle",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-role propensity scores, each kept in `[0, max]`
#[derive(Component, Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RoleDrives {
    values: [f32; 5],
}

impl RoleDrives {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drive for a role; idle always scores 0
    pub fn score(&self, role: Role) -> f32 {
        role.slot().map_or(0.0, |i| self.values[i])
    }

    pub fn set(&mut self, role: Role, value: f32, max: f32) {
        if let Some(i) = role.slot() {
            self.values[i] = clamp_drive(value, max);
        }
    }

    pub fn add(&mut self, role: Role, delta: f32, max: f32) {
        if let Some(i) = role.slot() {
            self.values[i] = clamp_drive(self.values[i] + delta, max);
        }
    }

    /// Linear decay toward zero
    pub fn decay(&mut self, rate: f32, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        for v in &mut self.values {
            *v = (*v - rate * dt).max(0.0);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Role, f32)> + '_ {
        Role::DRIVEN.iter().copied().zip(self.values.iter().copied())
    }
}

fn clamp_drive(value: f32, max: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, max)
    } else {
        0.0
    }
}

/// Hysteresis and minimum-dwell gate over role switching
#[derive(Component, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RolePolicy {
    current: Role,
    dwell: f32,
    hysteresis: f32,
    min_dwell: f32,
}

impl Default for RolePolicy {
    fn default() -> Self {
        Self::new(&RolesConfig::default())
    }
}

impl RolePolicy {
    pub fn new(config: &RolesConfig) -> Self {
        Self {
            current: Role::Forager,
            dwell: 0.0,
            hysteresis: config.hysteresis,
            min_dwell: config.min_dwell,
        }
    }

    /// Policy pinned to one role, for castes that never switch
    pub fn fixed(role: Role) -> Self {
        Self {
            current: role,
            ..Self::default()
        }
    }

    pub fn current(&self) -> Role {
        self.current
    }

    /// Seconds since the last switch
    pub fn dwell(&self) -> f32 {
        self.dwell
    }

    pub fn tick(&mut self, dt: f32) {
        self.dwell += dt.max(0.0);
    }

    /// Switch immediately and reset the dwell timer
    pub fn force(&mut self, role: Role) {
        self.current = role;
        self.dwell = 0.0;
    }

    /// Returns the role after gating, and whether it changed.
    ///
    /// The best driven role wins only if it scores strictly higher than the
    /// current one, the dwell time has elapsed, and it clears the margin.
    /// Ties keep the current role.
    pub fn choose(&mut self, drives: &RoleDrives) -> (Role, bool) {
        let current_score = drives.score(self.current);
        let mut best = self.current;
        let mut best_score = current_score;
        for (role, score) in drives.iter() {
            if score > best_score {
                best = role;
                best_score = score;
            }
        }

        if best != self.current
            && self.dwell >= self.min_dwell
            && best_score >= current_score + self.hysteresis
        {
            self.force(best);
            return (best, true);
        }
        (self.current, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(hysteresis: f32, min_dwell: f32) -> RolePolicy {
        RolePolicy::new(&RolesConfig {
            hysteresis,
            min_dwell,
        })
    }

    fn drives_with(role: Role, value: f32) -> RoleDrives {
        let mut drives = RoleDrives::new();
        drives.set(role, value, 5.0);
        drives
    }

    #[test]
    fn test_initial_role_is_forager() {
        assert_eq!(RolePolicy::default().current(), Role::Forager);
    }

    #[test]
    fn test_drives_clamp_and_decay() {
        let mut drives = RoleDrives::new();
        drives.add(Role::Nurse, 9.0, 5.0);
        assert_eq!(drives.score(Role::Nurse), 5.0);

        drives.add(Role::Guard, -1.0, 5.0);
        assert_eq!(drives.score(Role::Guard), 0.0);

        drives.decay(0.15, 2.0);
        assert!((drives.score(Role::Nurse) - 4.7).abs() < 1e-5);

        drives.set(Role::Idle, 3.0, 5.0);
        assert_eq!(drives.score(Role::Idle), 0.0);
    }

    #[test]
    fn test_nan_drive_is_zeroed() {
        let mut drives = RoleDrives::new();
        drives.add(Role::Fanner, f32::NAN, 5.0);
        assert_eq!(drives.score(Role::Fanner), 0.0);
    }

    #[test]
    fn test_no_switch_before_min_dwell() {
        let mut policy = policy(0.25, 3.0);
        let drives = drives_with(Role::Nurse, 5.0);

        for _ in 0..29 {
            policy.tick(0.1);
            assert_eq!(policy.choose(&drives), (Role::Forager, false));
        }
        policy.tick(0.11);
        assert_eq!(policy.choose(&drives), (Role::Nurse, true));
        assert_eq!(policy.dwell(), 0.0);
    }

    #[test]
    fn test_margin_blocks_switch_forever() {
        let mut policy = policy(0.25, 3.0);
        let mut drives = drives_with(Role::Forager, 1.0);
        drives.set(Role::Receiver, 1.2, 5.0);

        for _ in 0..100 {
            policy.tick(1.0);
            assert_eq!(policy.choose(&drives).0, Role::Forager);
        }
    }

    #[test]
    fn test_switch_when_margin_met() {
        let mut policy = policy(0.25, 3.0);
        let mut drives = drives_with(Role::Forager, 1.0);
        drives.set(Role::Guard, 1.25, 5.0);
        policy.tick(3.0);

        assert_eq!(policy.choose(&drives), (Role::Guard, true));
    }

    #[test]
    fn test_tie_keeps_current_role() {
        let mut policy = policy(0.0, 0.0);
        let mut drives = drives_with(Role::Forager, 2.0);
        drives.set(Role::Nurse, 2.0, 5.0);
        policy.tick(10.0);

        assert_eq!(policy.choose(&drives), (Role::Forager, false));
    }

    #[test]
    fn test_fixed_policy_holds_idle() {
        let mut policy = RolePolicy::fixed(Role::Idle);
        policy.tick(100.0);
        assert_eq!(policy.choose(&RoleDrives::new()).0, Role::Idle);
    }
}
