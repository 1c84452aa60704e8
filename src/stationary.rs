use crate::utils::bbox::{manhattan, BoundingBox};
use log::debug;
use nalgebra::Point2;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Stationary tracker configuration
pub mod options;

pub use options::{ReferencePolicy, StationaryOptions};

/// Default L1 displacement of the box center (in pixels) that counts as movement
pub const DEFAULT_MOVE_THRESHOLD: f32 = 10.0;

/// Default dwell duration after which a non-moving target is reported as loitering
pub const DEFAULT_DWELL: Duration = Duration::from_secs(60);

/// Default time without observations after which the track state is dropped
pub const DEFAULT_MAX_IDLE: Duration = Duration::from_secs(120);

pub(crate) const DEFAULT_AUTO_EVICT_PERIODICITY: usize = 100;

/// Per-track dwell state
///
#[derive(Debug, Clone, Copy)]
pub struct StationaryState {
    /// The point the displacement is measured from
    pub reference_position: Point2<f32>,
    /// The moment the dwell is measured from
    pub reference_time: Instant,
    /// The position at the last evaluation
    pub last_position: Point2<f32>,
    /// The moment the track was lastly evaluated
    pub last_seen: Instant,
}

impl StationaryState {
    fn new(position: Point2<f32>, now: Instant) -> Self {
        Self {
            reference_position: position,
            reference_time: now,
            last_position: position,
            last_seen: now,
        }
    }

    fn reset(&mut self, position: Point2<f32>, now: Instant) {
        self.reference_position = position;
        self.reference_time = now;
    }
}

#[derive(Debug)]
struct AutoEvict {
    periodicity: usize,
    counter: usize,
}

/// Loitering detector
///
/// Keeps the dwell state for every track it has seen. The tracker is owned by a single camera
/// pipeline; there is no process-wide state. `evaluate` must be called at most once per track
/// per frame.
///
#[derive(Debug)]
pub struct StationaryTracker {
    opts: StationaryOptions,
    states: HashMap<u64, StationaryState>,
    auto_evict: AutoEvict,
}

impl Default for StationaryTracker {
    fn default() -> Self {
        Self::new(StationaryOptions::default())
    }
}

impl StationaryTracker {
    pub fn new(opts: StationaryOptions) -> Self {
        let periodicity = opts.get_eviction_periodicity();
        Self {
            opts,
            states: HashMap::default(),
            auto_evict: AutoEvict {
                periodicity,
                counter: periodicity,
            },
        }
    }

    pub fn options(&self) -> &StationaryOptions {
        &self.opts
    }

    /// Evaluates the track at the current moment
    ///
    pub fn evaluate(&mut self, track_id: u64, bbox: &BoundingBox) -> bool {
        self.evaluate_at(track_id, bbox, Instant::now())
    }

    /// Evaluates the track at the moment `now`, returns `true` when the track is loitering
    ///
    /// # Parameters
    /// * `track_id` - track identifier assigned by the tracker
    /// * `bbox` - the current box of the track
    /// * `now` - observation moment; must not go backwards for the same track
    ///
    pub fn evaluate_at(&mut self, track_id: u64, bbox: &BoundingBox, now: Instant) -> bool {
        if self.auto_evict.counter == 0 {
            self.evict_stale_at(now);
            self.auto_evict.counter = self.auto_evict.periodicity;
        } else {
            self.auto_evict.counter -= 1;
        }

        if !bbox.is_finite() {
            debug!("Track {} has a non-finite box, the evaluation is skipped", track_id);
            return false;
        }

        let center = bbox.center();
        let state = match self.states.get_mut(&track_id) {
            None => {
                self.states
                    .insert(track_id, StationaryState::new(center, now));
                return false;
            }
            Some(state) => state,
        };

        if now.saturating_duration_since(state.last_seen) > self.opts.get_max_idle() {
            debug!(
                "Track {} reappeared after long absence, treated as a fresh target",
                track_id
            );
            *state = StationaryState::new(center, now);
            return false;
        }
        let threshold = self.opts.get_move_threshold();
        let step = manhattan(&center, &state.last_position);
        state.last_seen = now;
        state.last_position = center;

        if step >= threshold || manhattan(&center, &state.reference_position) >= threshold {
            state.reset(center, now);
            return false;
        }

        let elapsed = now.saturating_duration_since(state.reference_time);
        if elapsed >= self.opts.get_dwell() {
            return true;
        }

        if self.opts.get_reference_policy() == ReferencePolicy::RefreshWhilePending {
            state.reset(center, now);
        }
        false
    }

    /// Drops the states of the tracks not evaluated for longer than `max_idle`
    ///
    pub fn evict_stale(&mut self) -> usize {
        self.evict_stale_at(Instant::now())
    }

    pub fn evict_stale_at(&mut self, now: Instant) -> usize {
        let max_idle = self.opts.get_max_idle();
        let before = self.states.len();
        self.states
            .retain(|_, s| now.saturating_duration_since(s.last_seen) <= max_idle);
        let evicted = before - self.states.len();
        if evicted > 0 {
            debug!("Evicted {} stale stationary state(s)", evicted);
        }
        evicted
    }

    pub fn state(&self, track_id: u64) -> Option<&StationaryState> {
        self.states.get(&track_id)
    }

    pub fn forget(&mut self, track_id: u64) -> Option<StationaryState> {
        self.states.remove(&track_id)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
