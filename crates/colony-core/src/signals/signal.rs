//! Signals
//!
//! A signal is a decaying, spatially bounded emission of one kind at one
//! point. Signals are only ever mutated by the bus's decay step.

use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::geometry::Vec2;

/// Intensity at or below which a signal counts as dead
pub const ALIVE_EPSILON: f32 = 1e-6;

/// Source id used for signals emitted by the hive itself rather than a bee
pub const COLONY_SOURCE: u32 = 0;

/// Radii at or below this give zero falloff everywhere
const MIN_RADIUS: f32 = 1e-6;

/// Closed set of signal kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    QueenMandibular,
    BroodPheromone,
    ForagerPrimer,
    Waggle,
    Round,
    Tremble,
    Shake,
    Stop,
    Nasonov,
    Alarm,
    WorkerPiping,
    QueenPiping,
    Fanning,
    Thermal,
}

impl SignalKind {
    pub const COUNT: usize = 14;

    /// Every kind, in index order
    pub const ALL: [SignalKind; SignalKind::COUNT] = [
        SignalKind::QueenMandibular,
        SignalKind::BroodPheromone,
        SignalKind::ForagerPrimer,
        SignalKind::Waggle,
        SignalKind::Round,
        SignalKind::Tremble,
        SignalKind::Shake,
        SignalKind::Stop,
        SignalKind::Nasonov,
        SignalKind::Alarm,
        SignalKind::WorkerPiping,
        SignalKind::QueenPiping,
        SignalKind::Fanning,
        SignalKind::Thermal,
    ];

    /// Dense index in `0..COUNT`
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SignalKind::QueenMandibular => "queen_mandibular",
            SignalKind::BroodPheromone => "brood_pheromone",
            SignalKind::ForagerPrimer => "forager_primer",
            SignalKind::Waggle => "waggle",
            SignalKind::Round => "round",
            SignalKind::Tremble => "tremble",
            SignalKind::Shake => "shake",
            SignalKind::Stop => "stop",
            SignalKind::Nasonov => "nasonov",
            SignalKind::Alarm => "alarm",
            SignalKind::WorkerPiping => "worker_piping",
            SignalKind::QueenPiping => "queen_piping",
            SignalKind::Fanning => "fanning",
            SignalKind::Thermal => "thermal",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignalKind {
    type Err = SignalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SignalKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| SignalError::UnknownKind(s.to_string()))
    }
}

/// Structured payload, keyed by the kind of signal that may carry it
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SignalPayload {
    /// Recruitment to a distant resource
    Waggle { target: Vec2 },
    /// Recruitment to a resource close to the hive
    Round { target: Vec2 },
    /// Inhibition, stamped with the intake queue that triggered it
    Tremble { queue: f32 },
}

impl SignalPayload {
    /// The only signal kind allowed to carry this payload
    pub fn kind(&self) -> SignalKind {
        match self {
            SignalPayload::Waggle { .. } => SignalKind::Waggle,
            SignalPayload::Round { .. } => SignalKind::Round,
            SignalPayload::Tremble { .. } => SignalKind::Tremble,
        }
    }
}

/// Signal construction errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SignalError {
    #[error("signal radius must be finite and non-negative, got {0}")]
    InvalidRadius(f32),
    #[error("signal decay must be finite and positive, got {0}")]
    InvalidDecay(f32),
    #[error("signal intensity must be finite and non-negative, got {0}")]
    InvalidIntensity(f32),
    #[error("signal ttl must be finite and positive, got {0}")]
    InvalidTtl(f32),
    #[error("signal position must be finite, got ({0}, {1})")]
    NonFinitePosition(f32, f32),
    #[error("{payload:?} payload cannot ride on a {kind} signal")]
    PayloadMismatch {
        kind: SignalKind,
        payload: SignalPayload,
    },
    #[error("unknown signal kind: {0}")]
    UnknownKind(String),
}

/// Emission profile for one kind of signal: everything but position and source
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalSpec {
    pub radius: f32,
    pub intensity: f32,
    /// Exponential decay rate per second
    pub decay: f32,
    /// Seconds to live
    pub ttl: f32,
}

impl SignalSpec {
    pub const fn new(radius: f32, intensity: f32, decay: f32, ttl: f32) -> Self {
        Self {
            radius,
            intensity,
            decay,
            ttl,
        }
    }

    pub fn with_intensity(mut self, intensity: f32) -> Self {
        self.intensity = intensity;
        self
    }

    pub fn with_radius(mut self, radius: f32) -> Self {
        self.radius = radius;
        self
    }

    /// Build a validated signal from this profile
    pub fn build(&self, kind: SignalKind, at: Vec2, source: u32) -> Result<Signal, SignalError> {
        Signal::new(kind, at, self.radius, self.intensity, self.decay, self.ttl)
            .map(|s| s.from_source(source))
    }
}

/// A decaying emission at one point
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    kind: SignalKind,
    position: Vec2,
    radius: f32,
    intensity: f32,
    decay: f32,
    ttl: f32,
    source: u32,
    payload: Option<SignalPayload>,
}

impl Signal {
    /// Create a signal, rejecting parameters that would corrupt falloff or decay math
    pub fn new(
        kind: SignalKind,
        position: Vec2,
        radius: f32,
        intensity: f32,
        decay: f32,
        ttl: f32,
    ) -> Result<Self, SignalError> {
        if !position.is_finite() {
            return Err(SignalError::NonFinitePosition(position.x, position.y));
        }
        if !radius.is_finite() || radius < 0.0 {
            return Err(SignalError::InvalidRadius(radius));
        }
        if !decay.is_finite() || decay <= 0.0 {
            return Err(SignalError::InvalidDecay(decay));
        }
        if !intensity.is_finite() || intensity < 0.0 {
            return Err(SignalError::InvalidIntensity(intensity));
        }
        if !ttl.is_finite() || ttl <= 0.0 {
            return Err(SignalError::InvalidTtl(ttl));
        }

        Ok(Self {
            kind,
            position,
            radius,
            intensity,
            decay,
            ttl,
            source: COLONY_SOURCE,
            payload: None,
        })
    }

    pub fn from_source(mut self, source: u32) -> Self {
        self.source = source;
        self
    }

    /// Attach a payload; its variant must match the signal kind
    pub fn with_payload(mut self, payload: SignalPayload) -> Result<Self, SignalError> {
        if payload.kind() != self.kind {
            return Err(SignalError::PayloadMismatch {
                kind: self.kind,
                payload,
            });
        }
        self.payload = Some(payload);
        Ok(self)
    }

    pub fn kind(&self) -> SignalKind {
        self.kind
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn intensity(&self) -> f32 {
        self.intensity
    }

    pub fn decay(&self) -> f32 {
        self.decay
    }

    pub fn ttl(&self) -> f32 {
        self.ttl
    }

    pub fn source(&self) -> u32 {
        self.source
    }

    pub fn payload(&self) -> Option<&SignalPayload> {
        self.payload.as_ref()
    }

    /// Recruitment target carried by a waggle or round signal
    pub fn recruit_target(&self) -> Option<Vec2> {
        match self.payload {
            Some(SignalPayload::Waggle { target }) | Some(SignalPayload::Round { target }) => {
                Some(target)
            }
            _ => None,
        }
    }

    /// Spatial attenuation in [0, 1]: 1 at the emission point, 0 at and beyond the radius.
    ///
    /// Cosine interpolation, so strength flattens out near the edge.
    pub fn falloff(&self, point: Vec2) -> f32 {
        if self.radius <= MIN_RADIUS {
            return 0.0;
        }
        let d = self.position.distance(point);
        if d >= self.radius {
            return 0.0;
        }
        0.5 * (1.0 + (PI * d / self.radius).cos())
    }

    /// Local strength: intensity scaled by falloff
    pub fn strength_at(&self, point: Vec2) -> f32 {
        self.intensity * self.falloff(point)
    }

    pub fn is_alive(&self) -> bool {
        self.ttl > 0.0 && self.intensity > ALIVE_EPSILON
    }

    /// Exponential intensity decay plus ttl countdown; no-op for `dt <= 0`
    pub(crate) fn step(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        self.intensity *= (-self.decay * dt).max(-60.0).exp();
        self.ttl -= dt;
    }
}
