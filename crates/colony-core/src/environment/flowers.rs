//! Flower Field
//!
//! Patches of nectar sources with a single-claimant reservation flag.

use bevy_ecs::prelude::*;
use rand::Rng;

use super::{FlowerId, FlowerSource, FlowerView};
use crate::config::{ArenaConfig, FlowersConfig};
use crate::geometry::Vec2;

/// Keep generated patch centers this far from the arena edges
const PATCH_EDGE: f32 = 80.0;
const PATCH_RADIUS_MIN: f32 = 40.0;
const PATCH_RADIUS_MAX: f32 = 120.0;
const NECTAR_MIN: f32 = 1.0;
const NECTAR_MAX: f32 = 3.0;
/// Scatter radius for flowers added at a point
const CLUSTER_RADIUS: f32 = 20.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Flower {
    pub id: FlowerId,
    pub position: Vec2,
    pub nectar: f32,
    /// Nectar at creation; regrowth never exceeds it
    pub capacity: f32,
    pub reserved: bool,
}

impl Flower {
    /// Fill fraction in [0, 1]
    pub fn fill(&self) -> f32 {
        if self.capacity <= 0.0 {
            0.0
        } else {
            (self.nectar / self.capacity).clamp(0.0, 1.0)
        }
    }
}

#[derive(Resource, Debug, Clone)]
pub struct FlowerField {
    /// Sorted by id
    flowers: Vec<Flower>,
    next_id: FlowerId,
    width: f32,
    height: f32,
    margin: f32,
    min_nectar: f32,
    regrowth_rate: f32,
}

impl FlowerField {
    /// Empty field over the arena
    pub fn new(arena: &ArenaConfig, config: &FlowersConfig) -> Self {
        Self {
            flowers: Vec::new(),
            next_id: 1,
            width: arena.width,
            height: arena.height,
            margin: arena.margin,
            min_nectar: config.min_nectar,
            regrowth_rate: config.regrowth_rate,
        }
    }

    /// Field seeded with circular patches
    pub fn generate<R: Rng + ?Sized>(
        arena: &ArenaConfig,
        config: &FlowersConfig,
        rng: &mut R,
    ) -> Self {
        let mut field = Self::new(arena, config);
        for _ in 0..config.patches {
            let center = Vec2::new(
                uniform_or_mid(rng, PATCH_EDGE, arena.width - PATCH_EDGE),
                uniform_or_mid(rng, PATCH_EDGE, arena.height - PATCH_EDGE),
            );
            let radius = rng.gen_range(PATCH_RADIUS_MIN..PATCH_RADIUS_MAX);
            field.scatter(center, radius, config.flowers_per_patch, rng);
        }
        field
    }

    /// Adds `count` flowers at uniformly random positions
    pub fn add_random<R: Rng + ?Sized>(&mut self, count: usize, rng: &mut R) {
        for _ in 0..count {
            let position = Vec2::new(
                uniform_or_mid(rng, self.margin, self.width - self.margin),
                uniform_or_mid(rng, self.margin, self.height - self.margin),
            );
            let nectar = rng.gen_range(NECTAR_MIN..NECTAR_MAX);
            self.push(position, nectar);
        }
    }

    /// Adds `count` flowers clustered around a point
    pub fn add_at<R: Rng + ?Sized>(&mut self, at: Vec2, count: usize, rng: &mut R) {
        if count == 1 {
            let nectar = rng.gen_range(NECTAR_MIN..NECTAR_MAX);
            let position = at.clamp_to(self.width, self.height, self.margin);
            self.push(position, nectar);
        } else {
            self.scatter(at, CLUSTER_RADIUS, count, rng);
        }
    }

    /// Inserts a flower with a known position and nectar, returning its id
    pub fn insert(&mut self, position: Vec2, nectar: f32) -> FlowerId {
        self.push(position, nectar.max(0.0))
    }

    fn scatter<R: Rng + ?Sized>(&mut self, center: Vec2, radius: f32, count: usize, rng: &mut R) {
        for _ in 0..count {
            let angle = rng.gen_range(0.0..std::f32::consts::TAU);
            let r = rng.gen_range(0.0..radius.max(f32::EPSILON));
            let offset = Vec2::from_angle(angle) * r;
            let position = (center + offset).clamp_to(self.width, self.height, self.margin);
            let nectar = rng.gen_range(NECTAR_MIN..NECTAR_MAX);
            self.push(position, nectar);
        }
    }

    fn push(&mut self, position: Vec2, nectar: f32) -> FlowerId {
        let id = self.next_id;
        self.next_id += 1;
        self.flowers.push(Flower {
            id,
            position,
            nectar,
            capacity: nectar,
            reserved: false,
        });
        id
    }

    /// Linear regrowth toward each flower's capacity
    pub fn step(&mut self, dt: f32) {
        if dt <= 0.0 || self.regrowth_rate <= 0.0 {
            return;
        }
        let gain = self.regrowth_rate * dt;
        for flower in &mut self.flowers {
            flower.nectar = (flower.nectar + gain).min(flower.capacity);
        }
    }

    pub fn get(&self, id: FlowerId) -> Option<&Flower> {
        self.index_of(id).map(|i| &self.flowers[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Flower> {
        self.flowers.iter()
    }

    pub fn len(&self) -> usize {
        self.flowers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flowers.is_empty()
    }

    /// Ids of every flower currently reserved
    pub fn reserved_ids(&self) -> Vec<FlowerId> {
        self.flowers.iter().filter(|f| f.reserved).map(|f| f.id).collect()
    }

    fn index_of(&self, id: FlowerId) -> Option<usize> {
        self.flowers.binary_search_by_key(&id, |f| f.id).ok()
    }

    fn is_available(&self, flower: &Flower) -> bool {
        !flower.reserved && flower.nectar > self.min_nectar
    }
}

impl FlowerSource for FlowerField {
    fn reserve_nearest(&mut self, point: Vec2, avoid: &[FlowerId]) -> Option<FlowerId> {
        let mut best: Option<(usize, f32)> = None;
        for (i, flower) in self.flowers.iter().enumerate() {
            if !self.is_available(flower) || avoid.contains(&flower.id) {
                continue;
            }
            let d = point.distance(flower.position);
            // strict comparison keeps the lowest id on ties
            if best.map_or(true, |(_, best_d)| d < best_d) {
                best = Some((i, d));
            }
        }
        let (i, _) = best?;
        let flower = &mut self.flowers[i];
        flower.reserved = true;
        Some(flower.id)
    }

    fn release_reservation(&mut self, id: FlowerId) {
        if let Some(i) = self.index_of(id) {
            self.flowers[i].reserved = false;
        }
    }

    fn collect_from(&mut self, id: FlowerId, amount: f32) -> f32 {
        let Some(i) = self.index_of(id) else {
            return 0.0;
        };
        let flower = &mut self.flowers[i];
        flower.reserved = false;
        if !amount.is_finite() || amount <= 0.0 {
            return 0.0;
        }
        let taken = amount.min(flower.nectar).max(0.0);
        flower.nectar -= taken;
        taken
    }

    fn remaining_count(&self) -> usize {
        self.flowers.iter().filter(|f| f.nectar > self.min_nectar).count()
    }

    fn flower(&self, id: FlowerId) -> Option<FlowerView> {
        self.get(id).map(|f| FlowerView {
            id: f.id,
            position: f.position,
            nectar: f.nectar,
            reserved: f.reserved,
            available: self.is_available(f),
        })
    }
}

fn uniform_or_mid<R: Rng + ?Sized>(rng: &mut R, low: f32, high: f32) -> f32 {
    if high > low {
        rng.gen_range(low..high)
    } else {
        (low + high) * 0.5
    }
}
