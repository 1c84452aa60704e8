use crate::alerts::Alert;
use anyhow::Result;
use std::collections::VecDeque;
use std::sync::RwLock;

/// Persistent alert storage
///
pub trait AlertStore: Send + Sync {
    /// Persists the alert, returns the storage id
    ///
    fn save(&self, alert: &Alert) -> Result<u64>;

    /// The latest alerts, newest first, optionally limited to one camera
    ///
    fn query(&self, camera_id: Option<&str>, limit: usize) -> Result<Vec<Alert>>;
}

#[derive(Debug, Default)]
struct StoredAlerts {
    next_id: u64,
    alerts: VecDeque<(u64, Alert)>,
}

/// Alert store kept in memory
///
/// When `capacity` is set the oldest alerts are dropped once the capacity is reached.
///
#[derive(Debug, Default)]
pub struct InMemoryAlertStore {
    capacity: Option<usize>,
    inner: RwLock<StoredAlerts>,
}

impl InMemoryAlertStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "Capacity must be a positive number");
        Self {
            capacity: Some(capacity),
            inner: RwLock::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .expect("Access to alert store must always succeed")
            .alerts
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AlertStore for InMemoryAlertStore {
    fn save(&self, alert: &Alert) -> Result<u64> {
        let mut inner = self
            .inner
            .write()
            .expect("Access to alert store must always succeed");
        inner.next_id += 1;
        let id = inner.next_id;
        if let Some(capacity) = self.capacity {
            while inner.alerts.len() >= capacity {
                inner.alerts.pop_front();
            }
        }
        inner.alerts.push_back((id, alert.clone()));
        Ok(id)
    }

    fn query(&self, camera_id: Option<&str>, limit: usize) -> Result<Vec<Alert>> {
        let inner = self
            .inner
            .read()
            .expect("Access to alert store must always succeed");
        let mut res = inner
            .alerts
            .iter()
            .filter(|(_, a)| camera_id.map_or(true, |c| a.camera_id() == c))
            .map(|(id, a)| (*id, a.clone()))
            .collect::<Vec<_>>();
        res.sort_by(|(lid, l), (rid, r)| {
            r.created_at()
                .cmp(&l.created_at())
                .then_with(|| rid.cmp(lid))
        });
        Ok(res.into_iter().take(limit).map(|(_, a)| a).collect())
    }
}
