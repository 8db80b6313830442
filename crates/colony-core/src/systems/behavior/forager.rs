//! Forager FSM
//!
//! wander -> to_flower -> (chained to_flower)* -> to_hive -> wander.
//! Every exit from to_flower that does not collect releases the claim.

use tracing::debug;

use super::{AgentFrame, BehaviorFault, TickContext};
use crate::components::{Flash, ForagerTrip, Kinematics, TripState};
use crate::config::MotionConfig;
use crate::environment::FlowerId;
use crate::signals::{SignalKind, SignalPayload};

/// Dances a wandering forager will follow
const RECRUIT_KINDS: [SignalKind; 2] = [SignalKind::Waggle, SignalKind::Round];

pub fn step(frame: &mut AgentFrame, ctx: &mut TickContext<'_>) -> Result<(), BehaviorFault> {
    let motion = frame.kind.motion(&ctx.config.castes);
    let AgentFrame {
        id,
        kinematics,
        flash,
        trip,
        ..
    } = frame;
    let Some(trip) = trip.as_mut() else {
        ctx.wander(kinematics, &motion);
        return Ok(());
    };

    match trip.state {
        TripState::Wander => wander(id.0, kinematics, trip, &motion, ctx),
        TripState::ToFlower => to_flower(id.0, kinematics, trip, &motion, ctx),
        TripState::ToHive => to_hive(id.0, kinematics, flash, trip, &motion, ctx)?,
    }
    Ok(())
}

fn wander(
    id: u32,
    kin: &mut Kinematics,
    trip: &mut ForagerTrip,
    motion: &MotionConfig,
    ctx: &mut TickContext<'_>,
) {
    let config = ctx.config;

    // read, not consumed: any number of foragers may follow one dance
    if let Some(target) = ctx
        .bus
        .strongest(kin.position, Some(&RECRUIT_KINDS[..]))
        .and_then(|hit| hit.signal.recruit_target())
    {
        trip.recruit_target = Some(target);
    }

    let flowers_left = ctx.flowers.remaining_count() > 0;
    if trip.carry > 0.0 && (!trip.has_spare_capacity() || !flowers_left) {
        trip.state = TripState::ToHive;
        debug!("Bee {} heading home with {:.2} on board", id, trip.carry);
        let entrance = ctx.hive.geometry().entrance;
        ctx.steer(kin, entrance, motion);
        return;
    }

    if trip.has_spare_capacity() && flowers_left {
        let search = trip.recruit_target.unwrap_or(kin.position);
        if let Some(flower) = ctx.flowers.reserve_nearest(search, trip.recent.as_slice()) {
            let recruited = trip.recruit_target.is_some();
            trip.begin_seek(flower);
            debug!("Bee {} reserved flower {} (recruited: {})", id, flower, recruited);
            head_for_flower(kin, flower, motion, ctx);
            return;
        }
    }

    match trip.recruit_target {
        Some(target) if kin.position.distance(target) > config.forager.arrival_radius => {
            ctx.steer(kin, target, motion);
        }
        Some(_) => {
            trip.recruit_target = None;
            ctx.wander(kin, motion);
        }
        None => ctx.wander(kin, motion),
    }
}

fn to_flower(
    id: u32,
    kin: &mut Kinematics,
    trip: &mut ForagerTrip,
    motion: &MotionConfig,
    ctx: &mut TickContext<'_>,
) {
    let config = ctx.config;
    let Some(flower) = trip.reserved else {
        trip.state = TripState::Wander;
        ctx.wander(kin, motion);
        return;
    };
    trip.seek_timer += ctx.dt;

    let view = ctx
        .flowers
        .flower(flower)
        .filter(|v| v.reserved && v.nectar > config.flowers.min_nectar);
    let Some(view) = view else {
        abandon(id, trip, ctx, "target no longer valid");
        ctx.wander(kin, motion);
        return;
    };
    if trip.seek_timer > config.forager.seek_timeout {
        abandon(id, trip, ctx, "seek timed out");
        ctx.wander(kin, motion);
        return;
    }

    if kin.position.distance(view.position) > config.forager.arrival_radius {
        ctx.steer(kin, view.position, motion);
        return;
    }

    let request = config.forager.collect_per_visit.min(trip.spare_capacity());
    // collect_from clears the claim whatever it yields
    trip.take_reservation();
    let taken = ctx.flowers.collect_from(flower, request);
    trip.recent.push(flower);

    if taken <= 0.0 {
        trip.state = if trip.carry > 0.0 {
            TripState::ToHive
        } else {
            TripState::Wander
        };
        debug!("Bee {} lost the race for flower {}, now {}", id, flower, trip.state.as_str());
        return;
    }

    trip.record_collection(view.position, taken);

    if trip.has_spare_capacity() && ctx.flowers.remaining_count() > 0 {
        if let Some(next) = ctx.flowers.reserve_nearest(kin.position, trip.recent.as_slice()) {
            trip.begin_seek(next);
            debug!("Bee {} took {:.2} from flower {}, chaining to {}", id, taken, flower, next);
            head_for_flower(kin, next, motion, ctx);
            return;
        }
    }

    trip.state = TripState::ToHive;
    debug!("Bee {} took {:.2} from flower {}, returning with {:.2}", id, taken, flower, trip.carry);
    let entrance = ctx.hive.geometry().entrance;
    ctx.steer(kin, entrance, motion);
}

fn to_hive(
    id: u32,
    kin: &mut Kinematics,
    flash: &mut Flash,
    trip: &mut ForagerTrip,
    motion: &MotionConfig,
    ctx: &mut TickContext<'_>,
) -> Result<(), BehaviorFault> {
    let colony = ctx.config;
    let config = &colony.forager;
    let entrance = ctx.hive.geometry().entrance;
    if kin.position.distance(entrance) > config.arrival_radius {
        ctx.steer(kin, entrance, motion);
        return Ok(());
    }

    let delivered = std::mem::take(&mut trip.carry);
    trip.state = TripState::Wander;
    if delivered <= 0.0 {
        return Ok(());
    }

    // Emissions are built first; a fault must leave the hive untouched
    let pressure = ctx.hive.read_queue_pressure() + delivered;
    let advert = if pressure >= config.tremble_threshold {
        let signal = config
            .tremble
            .build(SignalKind::Tremble, entrance, id)?
            .with_payload(SignalPayload::Tremble { queue: pressure })?;
        debug!(
            "Bee {} delivered {:.2} into a congested hive (queue {:.2}), trembling",
            id, delivered, pressure
        );
        Some(signal)
    } else {
        match trip.last_collection {
            Some(target) if trip.last_yield > config.advert_threshold => {
                let intensity = (1.0 + trip.last_yield).min(config.waggle_max_intensity);
                let signal = config
                    .waggle
                    .with_intensity(intensity)
                    .build(SignalKind::Waggle, entrance, id)?
                    .with_payload(SignalPayload::Waggle { target })?;
                debug!(
                    "Bee {} delivered {:.2}, advertising ({:.0}, {:.0})",
                    id, delivered, target.x, target.y
                );
                Some(signal)
            }
            _ => {
                debug!("Bee {} delivered {:.2}", id, delivered);
                None
            }
        }
    };

    ctx.hive.enqueue_intake(delivered);
    if let Some(signal) = advert {
        ctx.emit(flash, signal);
    }
    Ok(())
}

fn abandon(id: u32, trip: &mut ForagerTrip, ctx: &mut TickContext<'_>, reason: &str) {
    if let Some(flower) = trip.abandon() {
        ctx.flowers.release_reservation(flower);
        trip.recent.push(flower);
        debug!("Bee {} abandoned flower {}: {}", id, flower, reason);
    }
}

fn head_for_flower(
    kin: &mut Kinematics,
    flower: FlowerId,
    motion: &MotionConfig,
    ctx: &mut TickContext<'_>,
) {
    match ctx.flowers.flower(flower) {
        Some(view) => ctx.steer(kin, view.position, motion),
        None => ctx.wander(kin, motion),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{AgentId, BeeKind, Role};
    use crate::config::ColonyConfig;
    use crate::environment::{FlowerField, FlowerSource, Hive, HiveIntake};
    use crate::geometry::Vec2;
    use crate::signals::{Signal, SignalBus};
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    struct Fixture {
        config: ColonyConfig,
        bus: SignalBus,
        flowers: FlowerField,
        hive: Hive,
        rng: SmallRng,
    }

    impl Fixture {
        fn new() -> Self {
            let config = ColonyConfig::default();
            Self {
                flowers: FlowerField::new(&config.arena, &config.flowers),
                hive: Hive::new(&config.arena, &config.hive),
                bus: SignalBus::new(),
                rng: SmallRng::seed_from_u64(9),
                config,
            }
        }

        fn run(&mut self, frame: &mut AgentFrame, dt: f32) -> Vec<Signal> {
            self.try_run(frame, dt).unwrap()
        }

        fn try_run(
            &mut self,
            frame: &mut AgentFrame,
            dt: f32,
        ) -> Result<Vec<Signal>, BehaviorFault> {
            let mut ctx = TickContext {
                dt,
                config: &self.config,
                bus: &self.bus,
                flowers: &mut self.flowers,
                hive: &mut self.hive,
                rng: &mut self.rng,
                emitted: Vec::new(),
            };
            step(frame, &mut ctx)?;
            Ok(ctx.emitted)
        }
    }

    fn forager_at(x: f32, y: f32) -> AgentFrame {
        AgentFrame::new(AgentId(1), BeeKind::Worker, Role::Forager, Kinematics::at(Vec2::new(x, y)))
            .with_trip(ForagerTrip::new(2.0))
    }

    fn trip(frame: &AgentFrame) -> &ForagerTrip {
        frame.trip.as_ref().unwrap()
    }

    #[test]
    fn test_wander_reserves_and_steers() {
        let mut fx = Fixture::new();
        let flower = fx.flowers.insert(Vec2::new(200.0, 100.0), 2.0);
        let mut frame = forager_at(100.0, 100.0);

        fx.run(&mut frame, 0.1);

        assert_eq!(trip(&frame).state, TripState::ToFlower);
        assert_eq!(trip(&frame).reserved, Some(flower));
        assert!(fx.flowers.get(flower).unwrap().reserved);
        assert!(frame.kinematics.velocity.x > 0.0);
    }

    #[test]
    fn test_waggle_biases_search_point() {
        let mut fx = Fixture::new();
        fx.flowers.insert(Vec2::new(90.0, 100.0), 2.0);
        let advertised = fx.flowers.insert(Vec2::new(300.0, 300.0), 2.0);
        let waggle = Signal::new(SignalKind::Waggle, Vec2::new(100.0, 100.0), 50.0, 2.0, 0.2, 3.0)
            .unwrap()
            .with_payload(SignalPayload::Waggle {
                target: Vec2::new(305.0, 300.0),
            })
            .unwrap();
        fx.bus.emit(waggle);
        let mut frame = forager_at(100.0, 100.0);

        fx.run(&mut frame, 0.1);

        assert_eq!(trip(&frame).reserved, Some(advertised));
        assert_eq!(trip(&frame).recruit_target, None);
        assert_eq!(fx.bus.len(), 1);
    }

    #[test]
    fn test_seek_timeout_releases_claim() {
        let mut fx = Fixture::new();
        let flower = fx.flowers.insert(Vec2::new(900.0, 500.0), 2.0);
        let mut frame = forager_at(10.0, 10.0);
        fx.run(&mut frame, 0.1);
        assert_eq!(trip(&frame).reserved, Some(flower));

        frame.trip.as_mut().unwrap().seek_timer = 12.0;
        fx.run(&mut frame, 0.1);

        assert_eq!(trip(&frame).state, TripState::Wander);
        assert_eq!(trip(&frame).reserved, None);
        assert!(trip(&frame).recent.contains(flower));
        assert!(!fx.flowers.get(flower).unwrap().reserved);
    }

    #[test]
    fn test_invalid_claim_reverts_to_wander() {
        let mut fx = Fixture::new();
        let flower = fx.flowers.insert(Vec2::new(300.0, 100.0), 2.0);
        let mut frame = forager_at(100.0, 100.0);
        fx.run(&mut frame, 0.1);

        fx.flowers.release_reservation(flower);
        fx.run(&mut frame, 0.1);

        assert_eq!(trip(&frame).state, TripState::Wander);
        assert_eq!(trip(&frame).reserved, None);
    }

    #[test]
    fn test_arrival_collects_and_chains() {
        let mut fx = Fixture::new();
        let first = fx.flowers.insert(Vec2::new(100.0, 100.0), 2.0);
        let second = fx.flowers.insert(Vec2::new(130.0, 100.0), 2.0);
        let mut frame = forager_at(100.0, 100.0);

        fx.run(&mut frame, 0.1);
        assert_eq!(trip(&frame).reserved, Some(first));
        fx.run(&mut frame, 0.1);

        let t = trip(&frame);
        assert!((t.carry - 0.6).abs() < 1e-6);
        assert!((t.last_yield - 0.6).abs() < 1e-6);
        assert_eq!(t.state, TripState::ToFlower);
        assert_eq!(t.reserved, Some(second));
        assert_eq!(t.last_collection, Some(Vec2::new(100.0, 100.0)));
        assert!(!fx.flowers.get(first).unwrap().reserved);
        assert!(t.recent.contains(first));
    }

    #[test]
    fn test_full_load_heads_home() {
        let mut fx = Fixture::new();
        let flower = fx.flowers.insert(Vec2::new(100.0, 100.0), 2.0);
        fx.flowers.insert(Vec2::new(120.0, 100.0), 2.0);
        let mut frame = forager_at(100.0, 100.0);
        frame.trip.as_mut().unwrap().carry = 1.7;

        fx.run(&mut frame, 0.1);
        assert_eq!(trip(&frame).reserved, Some(flower));
        fx.run(&mut frame, 0.1);

        let t = trip(&frame);
        assert!((t.carry - 2.0).abs() < 1e-6);
        assert_eq!(t.state, TripState::ToHive);
        assert_eq!(t.reserved, None);
    }

    #[test]
    fn test_delivery_advertises_with_target() {
        let mut fx = Fixture::new();
        let entrance = fx.hive.geometry().entrance;
        let mut frame = forager_at(entrance.x, entrance.y);
        {
            let t = frame.trip.as_mut().unwrap();
            t.state = TripState::ToHive;
            t.carry = 1.2;
            t.last_collection = Some(Vec2::new(40.0, 50.0));
            t.last_yield = 1.2;
        }

        let emitted = fx.run(&mut frame, 0.1);

        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].kind(), SignalKind::Waggle);
        assert_eq!(emitted[0].recruit_target(), Some(Vec2::new(40.0, 50.0)));
        assert!((emitted[0].intensity() - 2.2).abs() < 1e-5);
        assert_eq!(emitted[0].source(), 1);
        assert!((fx.hive.read_queue_pressure() - 1.2).abs() < 1e-6);
        assert_eq!(trip(&frame).state, TripState::Wander);
        assert_eq!(frame.flash.kind, Some(SignalKind::Waggle));
    }

    #[test]
    fn test_small_delivery_is_not_advertised() {
        let mut fx = Fixture::new();
        let entrance = fx.hive.geometry().entrance;
        let mut frame = forager_at(entrance.x, entrance.y);
        {
            let t = frame.trip.as_mut().unwrap();
            t.state = TripState::ToHive;
            t.carry = 0.3;
            t.last_collection = Some(Vec2::new(40.0, 50.0));
            t.last_yield = 0.3;
        }

        assert!(fx.run(&mut frame, 0.1).is_empty());
        assert!(!frame.flash.is_active());
    }

    #[test]
    fn test_congested_delivery_trembles_instead() {
        let mut fx = Fixture::new();
        fx.hive.enqueue_intake(8.0);
        let entrance = fx.hive.geometry().entrance;
        let mut frame = forager_at(entrance.x, entrance.y);
        {
            let t = frame.trip.as_mut().unwrap();
            t.state = TripState::ToHive;
            t.carry = 1.5;
            t.last_collection = Some(Vec2::new(40.0, 50.0));
            t.last_yield = 0.6;
        }

        let emitted = fx.run(&mut frame, 0.1);

        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].kind(), SignalKind::Tremble);
        assert_eq!(emitted[0].payload(), Some(&SignalPayload::Tremble { queue: 9.5 }));
    }

    #[test]
    fn test_small_last_visit_is_not_advertised() {
        let mut fx = Fixture::new();
        let entrance = fx.hive.geometry().entrance;
        let mut frame = forager_at(entrance.x, entrance.y);
        {
            // A full load gathered from thin flowers, the last one yielding little
            let t = frame.trip.as_mut().unwrap();
            t.state = TripState::ToHive;
            t.carry = 1.8;
            t.last_collection = Some(Vec2::new(40.0, 50.0));
            t.last_yield = 0.3;
        }

        assert!(fx.run(&mut frame, 0.1).is_empty());
        assert!((fx.hive.read_queue_pressure() - 1.8).abs() < 1e-6);
    }

    #[test]
    fn test_failed_emission_leaves_hive_untouched() {
        let mut fx = Fixture::new();
        fx.config.forager.tremble.decay = 0.0;
        fx.config.forager.tremble_threshold = 0.0;
        let entrance = fx.hive.geometry().entrance;
        let mut frame = forager_at(entrance.x, entrance.y);
        {
            let t = frame.trip.as_mut().unwrap();
            t.state = TripState::ToHive;
            t.carry = 1.0;
        }

        let result = fx.try_run(&mut frame, 0.1);

        assert!(matches!(result, Err(BehaviorFault::InvalidSignal(_))));
        assert_eq!(fx.hive.read_queue_pressure(), 0.0);
        assert_eq!(fx.hive.total_deposited(), 0.0);
    }
}
