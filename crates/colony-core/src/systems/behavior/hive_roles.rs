//! In-hive worker roles: receiver, nurse, fanner, guard, idle

use tracing::debug;

use super::{AgentFrame, BehaviorFault, TickContext};
use crate::geometry::Vec2;
use crate::signals::SignalKind;

/// Fanners hold station this far inside the entrance
const FANNER_INSET: f32 = 6.0;
/// Drift allowed around the fanning station before steering back
const FANNER_SLACK: f32 = 5.0;
/// Receivers keep to this fraction of the hive radius
const RECEIVER_ZONE: f32 = 0.5;
/// Radians a guard advances along its orbit per second
const GUARD_ORBIT_RATE: f32 = 1.2;

/// Go to the hive center, then drain the intake queue while inside
pub fn receiver(frame: &mut AgentFrame, ctx: &mut TickContext<'_>) {
    let motion = frame.kind.motion(&ctx.config.castes);
    let geometry = ctx.hive.geometry();
    let kin = &mut frame.kinematics;

    if geometry.contains(kin.position) {
        ctx.hive.service_intake(ctx.dt, ctx.config.duties.receiver_rate);
    }
    if kin.position.distance(geometry.center) > geometry.radius * RECEIVER_ZONE {
        ctx.steer(kin, geometry.center, &motion);
    } else {
        ctx.wander(kin, &motion);
    }
}

/// Stay in the brood zone and care for larvae
pub fn nurse(frame: &mut AgentFrame, ctx: &mut TickContext<'_>) {
    let motion = frame.kind.motion(&ctx.config.castes);
    let geometry = ctx.hive.geometry();
    let kin = &mut frame.kinematics;

    if geometry.in_brood_zone(kin.position) {
        ctx.hive.add_care(ctx.config.duties.care_per_nurse * ctx.dt);
        ctx.wander(kin, &motion);
    } else {
        ctx.steer(kin, geometry.center, &motion);
    }
}

/// Hold station just inside the entrance and pulse a fanning signal
pub fn fanner(frame: &mut AgentFrame, ctx: &mut TickContext<'_>) -> Result<(), BehaviorFault> {
    let motion = frame.kind.motion(&ctx.config.castes);
    let geometry = ctx.hive.geometry();
    let inward = (geometry.center - geometry.entrance).normalized_or(Vec2::new(0.0, 1.0));
    let station = geometry.entrance + inward * FANNER_INSET;

    if frame.kinematics.position.distance(station) > FANNER_SLACK {
        ctx.steer(&mut frame.kinematics, station, &motion);
    } else {
        ctx.wander(&mut frame.kinematics, &motion);
    }

    let config = ctx.config;
    let duties = &config.duties;
    if frame.timers.since_emit >= duties.fanning_interval {
        frame.timers.since_emit = 0.0;
        let signal = duties
            .fanning
            .build(SignalKind::Fanning, frame.kinematics.position, frame.id.0)?;
        ctx.emit(&mut frame.flash, signal);
    }
    Ok(())
}

/// Patrol around the entrance; relay alarms that are strong enough
pub fn guard(frame: &mut AgentFrame, ctx: &mut TickContext<'_>) -> Result<(), BehaviorFault> {
    let motion = frame.kind.motion(&ctx.config.castes);
    let geometry = ctx.hive.geometry();
    let config = ctx.config;
    let duties = &config.duties;

    let offset = frame.kinematics.position - geometry.entrance;
    let angle = offset.angle_or(0.0) + GUARD_ORBIT_RATE * ctx.dt;
    let waypoint = geometry.entrance + Vec2::from_angle(angle) * duties.guard_orbit_radius;
    ctx.steer(&mut frame.kinematics, waypoint, &motion);

    let alarm = frame.senses.get(SignalKind::Alarm);
    let due = frame.timers.since_emit >= duties.guard_alarm_interval;
    if alarm >= duties.guard_alarm_threshold && due {
        frame.timers.since_emit = 0.0;
        let signal = duties
            .guard_alarm
            .build(SignalKind::Alarm, frame.kinematics.position, frame.id.0)?;
        ctx.emit(&mut frame.flash, signal);
        debug!("Guard {} relayed alarm (sensed {:.2})", frame.id.0, alarm);
    }
    Ok(())
}

pub fn idle(frame: &mut AgentFrame, ctx: &mut TickContext<'_>) {
    let motion = frame.kind.motion(&ctx.config.castes);
    ctx.wander(&mut frame.kinematics, &motion);
}
