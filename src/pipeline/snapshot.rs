use crate::alerts::Alert;
use crate::pipeline::collaborators::SceneFeatures;
use crate::Errors;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

/// Analytics of the lastly processed frame
///
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyticsSnapshot {
    pub camera_id: String,
    pub frame_count: u64,
    pub alerts: Vec<Alert>,
    pub alert_count: usize,
    pub scene_features_available: bool,
    /// Present only for frames where the scene model ran
    pub scene_features: Option<SceneFeatures>,
}

/// Shared slot with the latest snapshot
///
/// The pipeline replaces the whole snapshot under the lock, readers get either the old or the
/// new snapshot, never a mix.
///
#[derive(Debug, Clone, Default)]
pub struct SnapshotHandle {
    latest: Arc<Mutex<Arc<AnalyticsSnapshot>>>,
}

impl SnapshotHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, snapshot: AnalyticsSnapshot) {
        let snapshot = Arc::new(snapshot);
        *self
            .latest
            .lock()
            .expect("Access to analytics snapshot must always succeed") = snapshot;
    }

    /// The latest published snapshot
    ///
    pub fn latest(&self) -> Arc<AnalyticsSnapshot> {
        self.latest
            .lock()
            .expect("Access to analytics snapshot must always succeed")
            .clone()
    }
}

/// Snapshot handles of all the running cameras, used by status queries
///
#[derive(Debug, Default)]
pub struct AnalyticsBoard {
    cameras: RwLock<HashMap<String, SnapshotHandle>>,
}

impl AnalyticsBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, camera_id: &str, handle: SnapshotHandle) {
        self.cameras
            .write()
            .expect("Access to analytics board must always succeed")
            .insert(camera_id.to_string(), handle);
    }

    pub fn unregister(&self, camera_id: &str) -> bool {
        self.cameras
            .write()
            .expect("Access to analytics board must always succeed")
            .remove(camera_id)
            .is_some()
    }

    pub fn latest(&self, camera_id: &str) -> Option<Arc<AnalyticsSnapshot>> {
        self.cameras
            .read()
            .expect("Access to analytics board must always succeed")
            .get(camera_id)
            .map(|h| h.latest())
    }

    /// Status query for the camera, fails when the camera is not registered
    ///
    pub fn status(&self, camera_id: &str) -> Result<Arc<AnalyticsSnapshot>> {
        self.latest(camera_id)
            .ok_or_else(|| Errors::UnknownCamera(camera_id.to_string()).into())
    }

    /// Latest snapshots of all cameras, ordered by camera id
    ///
    pub fn all(&self) -> Vec<Arc<AnalyticsSnapshot>> {
        let cameras = self
            .cameras
            .read()
            .expect("Access to analytics board must always succeed");
        let mut ids = cameras.keys().collect::<Vec<_>>();
        ids.sort();
        ids.into_iter().map(|id| cameras[id].latest()).collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::alerts::Alert;
    use crate::pipeline::snapshot::{AnalyticsBoard, AnalyticsSnapshot, SnapshotHandle};
    use crate::Errors;
    use std::thread;

    fn snapshot(frame_count: u64, alerts: usize) -> AnalyticsSnapshot {
        let alerts = (0..alerts)
            .map(|i| Alert::stationary("CAM_01", i as u64))
            .collect::<Vec<_>>();
        AnalyticsSnapshot {
            camera_id: "CAM_01".into(),
            frame_count,
            alert_count: alerts.len(),
            alerts,
            ..Default::default()
        }
    }

    #[test]
    fn readers_see_whole_snapshots() {
        let handle = SnapshotHandle::new();
        let writer = {
            let handle = handle.clone();
            thread::spawn(move || {
                for i in 0..500 {
                    handle.publish(snapshot(i, (i % 7) as usize));
                }
            })
        };
        let readers = (0..4)
            .map(|_| {
                let handle = handle.clone();
                thread::spawn(move || {
                    for _ in 0..500 {
                        let s = handle.latest();
                        assert_eq!(s.alert_count, s.alerts.len());
                        if s.frame_count > 0 || s.alert_count > 0 {
                            assert_eq!(s.alert_count, (s.frame_count % 7) as usize);
                        }
                    }
                })
            })
            .collect::<Vec<_>>();
        writer.join().unwrap();
        for r in readers {
            r.join().unwrap();
        }
        assert_eq!(handle.latest().frame_count, 499);
    }

    #[test]
    fn board() {
        let board = AnalyticsBoard::new();
        let h1 = SnapshotHandle::new();
        let h2 = SnapshotHandle::new();
        board.register("CAM_02", h2.clone());
        board.register("CAM_01", h1.clone());
        h1.publish(snapshot(3, 1));
        assert_eq!(board.latest("CAM_01").unwrap().frame_count, 3);
        assert!(board.latest("CAM_09").is_none());
        assert_eq!(board.status("CAM_01").unwrap().alert_count, 1);
        assert!(matches!(
            board.status("CAM_09").err().unwrap().downcast_ref::<Errors>(),
            Some(Errors::UnknownCamera(_))
        ));
        assert_eq!(board.all().len(), 2);
        assert!(board.unregister("CAM_02"));
        assert_eq!(board.all().len(), 1);
    }

    #[test]
    fn serializes_to_json() {
        let v = serde_json::to_value(snapshot(5, 2)).unwrap();
        assert_eq!(v["frame_count"], 5);
        assert_eq!(v["alert_count"], 2);
        assert_eq!(v["alerts"][0]["alert_type"], "STATIONARY");
    }
}
