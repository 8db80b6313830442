//! Signal Bus
//!
//! Owns every live signal. Stepped once per tick before agents sense it;
//! answers spatial and kind-filtered queries in between.

use bevy_ecs::prelude::*;

use super::signal::{Signal, SignalKind};
use crate::geometry::Vec2;

/// Query defaults used by perception
pub mod query_defaults {
    /// Signals weaker than this at the query point are ignored
    pub const MIN_STRENGTH: f32 = 0.05;
    /// Maximum hits returned by a query
    pub const LIMIT: usize = 16;
}

/// A signal together with its strength at the queried point
#[derive(Debug, Clone, Copy)]
pub struct SignalHit<'a> {
    pub signal: &'a Signal,
    pub strength: f32,
    /// Insertion order within the bus, used as the tie-break
    index: usize,
}

/// Resource holding every live signal plus a per-kind index
#[derive(Resource, Debug, Default)]
pub struct SignalBus {
    signals: Vec<Signal>,
    /// Indices into `signals`, bucketed by kind, in insertion order
    by_kind: [Vec<usize>; SignalKind::COUNT],
}

impl SignalBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a signal; visible to every query until pruned
    pub fn emit(&mut self, signal: Signal) {
        self.by_kind[signal.kind().index()].push(self.signals.len());
        self.signals.push(signal);
    }

    /// Decay every signal by `dt`, then prune the dead and rebuild the kind index.
    ///
    /// For `dt <= 0` intensities and ttls are left unchanged.
    pub fn step(&mut self, dt: f32) {
        if self.signals.is_empty() {
            return;
        }
        for signal in &mut self.signals {
            signal.step(dt);
        }
        self.signals.retain(|s| s.is_alive());
        self.rebuild_index();
    }

    fn rebuild_index(&mut self) {
        for bucket in &mut self.by_kind {
            bucket.clear();
        }
        for (i, signal) in self.signals.iter().enumerate() {
            self.by_kind[signal.kind().index()].push(i);
        }
    }

    /// Visit candidate signals for a kind filter, each at most once
    fn for_each_candidate<'a>(
        &'a self,
        kinds: Option<&[SignalKind]>,
        mut visit: impl FnMut(usize, &'a Signal),
    ) {
        match kinds {
            None => {
                for (i, signal) in self.signals.iter().enumerate() {
                    visit(i, signal);
                }
            }
            Some(kinds) => {
                let mut wanted = [false; SignalKind::COUNT];
                for kind in kinds {
                    wanted[kind.index()] = true;
                }
                for kind in SignalKind::ALL {
                    if !wanted[kind.index()] {
                        continue;
                    }
                    for &i in &self.by_kind[kind.index()] {
                        visit(i, &self.signals[i]);
                    }
                }
            }
        }
    }

    /// Signals at least `min_strength` strong at `point`, strongest first.
    ///
    /// Ties keep insertion order. A `limit` of 0 means no truncation.
    pub fn query(
        &self,
        point: Vec2,
        kinds: Option<&[SignalKind]>,
        min_strength: f32,
        limit: usize,
    ) -> Vec<SignalHit<'_>> {
        let mut hits = Vec::new();
        self.for_each_candidate(kinds, |index, signal| {
            let strength = signal.strength_at(point);
            if strength >= min_strength {
                hits.push(SignalHit {
                    signal,
                    strength,
                    index,
                });
            }
        });

        hits.sort_by(|a, b| {
            b.strength
                .total_cmp(&a.strength)
                .then_with(|| a.index.cmp(&b.index))
        });
        if limit > 0 {
            hits.truncate(limit);
        }
        hits
    }

    /// The single strongest signal with non-zero strength at `point`
    pub fn strongest(&self, point: Vec2, kinds: Option<&[SignalKind]>) -> Option<SignalHit<'_>> {
        let mut best: Option<SignalHit<'_>> = None;
        self.for_each_candidate(kinds, |index, signal| {
            let strength = signal.strength_at(point);
            if strength <= 0.0 {
                return;
            }
            let better = match &best {
                None => true,
                Some(b) => strength > b.strength || (strength == b.strength && index < b.index),
            };
            if better {
                best = Some(SignalHit {
                    signal,
                    strength,
                    index,
                });
            }
        });
        best
    }

    pub fn iter(&self) -> impl Iterator<Item = &Signal> {
        self.signals.iter()
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    /// Live signals of one kind
    pub fn count(&self, kind: SignalKind) -> usize {
        self.by_kind[kind.index()].len()
    }

    /// Live counts for every kind that has at least one signal
    pub fn counts(&self) -> Vec<(SignalKind, usize)> {
        SignalKind::ALL
            .into_iter()
            .map(|k| (k, self.count(k)))
            .filter(|(_, n)| *n > 0)
            .collect()
    }
}

/// Signals emitted during the current tick.
///
/// Flushed into the bus at the end of the tick so nothing an agent emits is
/// sensed within the same tick.
#[derive(Resource, Debug, Default)]
pub struct SignalOutbox {
    pending: Vec<Signal>,
}

impl SignalOutbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, signal: Signal) {
        self.pending.push(signal);
    }

    pub fn extend(&mut self, signals: impl IntoIterator<Item = Signal>) {
        self.pending.extend(signals);
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Move every pending signal into the bus, in emission order
    pub fn flush_into(&mut self, bus: &mut SignalBus) {
        for signal in self.pending.drain(..) {
            bus.emit(signal);
        }
    }
}
