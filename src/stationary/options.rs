use crate::stationary::{
    DEFAULT_AUTO_EVICT_PERIODICITY, DEFAULT_DWELL, DEFAULT_MAX_IDLE, DEFAULT_MOVE_THRESHOLD,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How the dwell reference is handled while the target stays within the movement threshold
/// and the dwell is not reached yet
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferencePolicy {
    /// The reference point and time are kept, the dwell accumulates across evaluations
    #[default]
    Hold,
    /// The reference is moved to the current point and time on every evaluation that doesn't
    /// trigger; the dwell is reached only when two consecutive evaluations are at least
    /// `dwell` apart
    RefreshWhilePending,
}

/// Class that is used to configure the stationary tracker
#[derive(Debug, Clone)]
pub struct StationaryOptions {
    move_threshold: f32,
    dwell: Duration,
    max_idle: Duration,
    reference_policy: ReferencePolicy,
    eviction_periodicity: usize,
}

impl Default for StationaryOptions {
    fn default() -> Self {
        Self {
            move_threshold: DEFAULT_MOVE_THRESHOLD,
            dwell: DEFAULT_DWELL,
            max_idle: DEFAULT_MAX_IDLE,
            reference_policy: ReferencePolicy::default(),
            eviction_periodicity: DEFAULT_AUTO_EVICT_PERIODICITY,
        }
    }
}

impl StationaryOptions {
    /// L1 displacement of the box center, in pixels, that is treated as movement.
    ///
    pub fn move_threshold(mut self, pixels: f32) -> Self {
        assert!(
            pixels > 0.0 && pixels.is_finite(),
            "Movement threshold must be a positive number"
        );
        self.move_threshold = pixels;
        self
    }

    /// How long a target must stay within the movement threshold to be reported as loitering.
    ///
    pub fn dwell(mut self, dwell: Duration) -> Self {
        self.dwell = dwell;
        self
    }

    /// The time without evaluations after which the track state is dropped. A track id that
    /// reappears later starts from scratch.
    ///
    pub fn max_idle(mut self, max_idle: Duration) -> Self {
        self.max_idle = max_idle;
        self
    }

    pub fn reference_policy(mut self, policy: ReferencePolicy) -> Self {
        self.reference_policy = policy;
        self
    }

    /// The number of evaluations between two stale-state sweeps.
    ///
    pub fn eviction_periodicity(mut self, n: usize) -> Self {
        self.eviction_periodicity = n;
        self
    }

    pub fn get_move_threshold(&self) -> f32 {
        self.move_threshold
    }

    pub fn get_dwell(&self) -> Duration {
        self.dwell
    }

    pub fn get_max_idle(&self) -> Duration {
        self.max_idle
    }

    pub fn get_reference_policy(&self) -> ReferencePolicy {
        self.reference_policy
    }

    pub fn get_eviction_periodicity(&self) -> usize {
        self.eviction_periodicity
    }
}
