//! Queen and drone castes. Neither carries drives.

use tracing::debug;

use super::{AgentFrame, BehaviorFault, TickContext};
use crate::signals::SignalKind;

/// The queen strays at most this fraction of the hive radius from its center
const QUEEN_RANGE: f32 = 0.8;

/// Slow walk inside the hive, scent pulses and the laying cycle
pub fn queen(frame: &mut AgentFrame, ctx: &mut TickContext<'_>) -> Result<(), BehaviorFault> {
    let motion = frame.kind.motion(&ctx.config.castes);
    let geometry = ctx.hive.geometry();
    let config = ctx.config;
    let castes = &config.castes;

    if frame.kinematics.position.distance(geometry.center) > geometry.radius * QUEEN_RANGE {
        ctx.steer(&mut frame.kinematics, geometry.center, &motion);
    } else {
        ctx.wander(&mut frame.kinematics, &motion);
    }

    if frame.timers.since_emit >= castes.queen_signal_interval {
        frame.timers.since_emit = 0.0;
        let signal = castes
            .queen_signal
            .build(SignalKind::QueenMandibular, frame.kinematics.position, frame.id.0)?;
        ctx.emit(&mut frame.flash, signal);
    }

    if frame.timers.since_lay >= castes.lay_interval {
        frame.timers.since_lay = 0.0;
        let brood = ctx.hive.brood_snapshot().total();
        if brood < castes.brood_cap {
            ctx.hive.add_eggs(castes.eggs_per_lay);
            debug!("Queen {} laid {} eggs ({} brood)", frame.id.0, castes.eggs_per_lay, brood);
        }
    }
    Ok(())
}

/// Random walk, no signals
pub fn drone(frame: &mut AgentFrame, ctx: &mut TickContext<'_>) {
    let motion = frame.kind.motion(&ctx.config.castes);
    ctx.wander(&mut frame.kinematics, &motion);
}
