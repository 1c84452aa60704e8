use crate::alerts::AlertType;
use log::debug;
use std::collections::HashMap;
use std::time::{Duration, Instant};

pub(crate) const DEFAULT_COOLDOWN_SWEEP_PERIODICITY: usize = 100;

/// Expiring-entry cache that suppresses repeats of the same alert type for the same track
/// within a window.
///
/// A window of zero disables suppression for the alert type.
///
#[derive(Debug, Clone)]
pub struct AlertCooldown {
    windows: HashMap<AlertType, Duration>,
    emitted: HashMap<(u64, AlertType), Instant>,
    sweep_periodicity: usize,
    counter: usize,
}

impl Default for AlertCooldown {
    fn default() -> Self {
        Self::new(HashMap::default())
    }
}

impl AlertCooldown {
    pub fn new(windows: HashMap<AlertType, Duration>) -> Self {
        Self {
            windows,
            emitted: HashMap::default(),
            sweep_periodicity: DEFAULT_COOLDOWN_SWEEP_PERIODICITY,
            counter: DEFAULT_COOLDOWN_SWEEP_PERIODICITY,
        }
    }

    pub fn window(&self, alert_type: AlertType) -> Duration {
        self.windows
            .get(&alert_type)
            .copied()
            .unwrap_or(Duration::ZERO)
    }

    /// Returns `true` if the alert may be emitted now and records the emission
    ///
    pub fn admit(&mut self, track_id: u64, alert_type: AlertType, now: Instant) -> bool {
        if self.counter == 0 {
            self.sweep(now);
            self.counter = self.sweep_periodicity;
        } else {
            self.counter -= 1;
        }

        let window = self.window(alert_type);
        if window.is_zero() {
            return true;
        }

        match self.emitted.get(&(track_id, alert_type)) {
            Some(last) if now.saturating_duration_since(*last) < window => {
                debug!(
                    "{} alert for track {} is suppressed by cooldown",
                    alert_type, track_id
                );
                false
            }
            _ => {
                self.emitted.insert((track_id, alert_type), now);
                true
            }
        }
    }

    /// Drops the entries whose window has expired
    ///
    pub fn sweep(&mut self, now: Instant) -> usize {
        let before = self.emitted.len();
        let windows = &self.windows;
        self.emitted.retain(|(_, alert_type), last| {
            let window = windows.get(alert_type).copied().unwrap_or(Duration::ZERO);
            now.saturating_duration_since(*last) < window
        });
        before - self.emitted.len()
    }

    pub fn len(&self) -> usize {
        self.emitted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emitted.is_empty()
    }
}
