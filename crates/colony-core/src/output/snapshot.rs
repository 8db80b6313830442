//! Snapshot Generation
//!
//! Builds `WorldSnapshot` records from the ECS world and writes them out as
//! JSON lines.

use bevy_ecs::prelude::*;
use colony_events::{
    generate_snapshot_id, AgentSnapshot, ArenaSnapshot, FlowerSnapshot, HiveMetrics, SignalSnapshot,
    WorldSnapshot,
};
use std::collections::BTreeMap;
use std::io::{self, Write};
use uuid::Uuid;

use crate::components::{AgentId, BeeKind, Flash, Kinematics, RolePolicy};
use crate::config::ColonyConfig;
use crate::environment::{FlowerField, FlowerSource, Hive, HiveIntake};
use crate::signals::SignalBus;
use crate::SimClock;

/// Resource to track snapshot generation
#[derive(Resource, Debug, Clone)]
pub struct SnapshotGenerator {
    run_id: Uuid,
    next_snapshot_id: u64,
    snapshot_interval: u64,
}

impl SnapshotGenerator {
    pub fn new(run_id: Uuid, snapshot_interval: u64) -> Self {
        Self {
            run_id,
            next_snapshot_id: 1,
            snapshot_interval,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// True on tick 0 and every `snapshot_interval` ticks; an interval of 0 never fires
    pub fn should_snapshot(&self, tick: u64) -> bool {
        self.snapshot_interval > 0 && tick % self.snapshot_interval == 0
    }

    pub fn next_id(&mut self) -> String {
        let id = generate_snapshot_id(self.next_snapshot_id);
        self.next_snapshot_id += 1;
        id
    }

    #[cfg(test)]
    pub(crate) fn snapshot_count(&self) -> u64 {
        self.next_snapshot_id - 1
    }
}

/// Generate a complete world snapshot
pub fn generate_snapshot(world: &mut World, triggered_by: &str) -> WorldSnapshot {
    let snapshot_id = world.resource_mut::<SnapshotGenerator>().next_id();
    let run_id = world.resource::<SnapshotGenerator>().run_id();
    let time = world.resource::<SimClock>().time;
    let (arena, signal_limit) = {
        let config = world.resource::<ColonyConfig>();
        (config.arena.clone(), config.simulation.snapshot_signal_limit)
    };

    let mut snapshot = WorldSnapshot::new(snapshot_id, run_id, time, triggered_by);
    snapshot.arena = ArenaSnapshot {
        width: arena.width,
        height: arena.height,
    };

    let hive = world.resource::<Hive>();
    let geometry = hive.geometry();
    snapshot.hive = HiveMetrics {
        x: geometry.center.x,
        y: geometry.center.y,
        radius: geometry.radius,
        queue: hive.read_queue_pressure(),
        total_deposited: hive.total_deposited(),
        brood: hive.brood_snapshot(),
        hatched_total: hive.hatched_total(),
    };

    let flowers = world.resource::<FlowerField>();
    snapshot.flowers_remaining = flowers.remaining_count();
    snapshot.flowers = flowers
        .iter()
        .map(|f| FlowerSnapshot {
            id: f.id,
            x: f.position.x,
            y: f.position.y,
            nectar: f.nectar,
            frac: f.fill(),
            reserved: f.reserved,
        })
        .collect();

    let bus = world.resource::<SignalBus>();
    snapshot.signal_counts = bus
        .counts()
        .into_iter()
        .map(|(kind, count)| (kind.as_str().to_string(), count))
        .collect::<BTreeMap<_, _>>();
    snapshot.signals = bus
        .iter()
        .take(signal_limit)
        .map(|s| SignalSnapshot {
            kind: s.kind().as_str().to_string(),
            x: s.position().x,
            y: s.position().y,
            radius: s.radius(),
            intensity: s.intensity(),
            target: s.recruit_target().map(|t| (t.x, t.y)),
        })
        .collect();

    let mut query = world.query::<(&AgentId, &BeeKind, &RolePolicy, &Kinematics, &Flash)>();
    let mut agents: Vec<AgentSnapshot> = query
        .iter(world)
        .map(|(id, kind, policy, kin, flash)| {
            let mut agent = AgentSnapshot::new(id.0, kind.as_str(), policy.current().as_str())
                .with_pose(kin.position.x, kin.position.y, kin.heading);
            if flash.is_active() {
                agent.flash = flash.remaining;
                agent.flash_kind = flash.kind.map(|k| k.as_str().to_string());
            }
            agent
        })
        .collect();
    agents.sort_by_key(|a| a.id);
    snapshot.agents = agents;

    snapshot
}

/// Append one snapshot as a single JSON line
pub fn write_snapshot_line<W: Write>(snapshot: &WorldSnapshot, out: &mut W) -> io::Result<()> {
    serde_json::to_writer(&mut *out, snapshot)?;
    out.write_all(b"\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use colony_events::SimTime;

    #[test]
    fn test_generator_interval() {
        let generator = SnapshotGenerator::new(Uuid::nil(), 60);
        assert!(generator.should_snapshot(0));
        assert!(!generator.should_snapshot(59));
        assert!(generator.should_snapshot(120));

        let never = SnapshotGenerator::new(Uuid::nil(), 0);
        assert!(!never.should_snapshot(0));
    }

    #[test]
    fn test_generator_ids() {
        let mut generator = SnapshotGenerator::new(Uuid::nil(), 10);
        assert_eq!(generator.next_id(), "snap_000001");
        assert_eq!(generator.next_id(), "snap_000002");
        assert_eq!(generator.snapshot_count(), 2);
    }

    #[test]
    fn test_write_snapshot_line() {
        let time = SimTime::new(3, 0.05);
        let snapshot = WorldSnapshot::new("snap_000001", Uuid::nil(), time, "test");
        let mut buf = Vec::new();
        write_snapshot_line(&snapshot, &mut buf).unwrap();
        write_snapshot_line(&snapshot, &mut buf).unwrap();

        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: WorldSnapshot = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed.time.tick, 3);
        assert_eq!(parsed.triggered_by, "test");
    }
}
