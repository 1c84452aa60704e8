use crate::utils::bbox::BoundingBox;
use crate::utils::geometry::{intersects, polygon_from_vertices};
use geo::Polygon;
use log::{info, warn};
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Named restricted polygon in camera-pixel coordinates
///
/// The polygon geometry is validated on first use and cached. A zone with malformed geometry
/// never reports a violation.
///
#[derive(Debug, Clone)]
pub struct Zone {
    name: String,
    vertices: Vec<(f32, f32)>,
    geometry: OnceCell<Option<Polygon<f64>>>,
}

impl Zone {
    /// Constructor
    ///
    /// # Parameters
    /// * `name` - human-readable zone name, reported in alerts
    /// * `vertices` - ordered polygon vertices, at least three, may be non-convex
    ///
    pub fn new(name: &str, vertices: Vec<(f32, f32)>) -> Self {
        Self {
            name: name.to_string(),
            vertices,
            geometry: OnceCell::new(),
        }
    }

    /// Rectangular zone
    ///
    pub fn rect(name: &str, x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self::new(name, vec![(x1, y1), (x2, y1), (x2, y2), (x1, y2)])
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Validated polygon, `None` when the vertices don't form a valid polygon
    ///
    pub fn geometry(&self) -> Option<&Polygon<f64>> {
        self.geometry
            .get_or_init(|| match polygon_from_vertices(&self.name, &self.vertices) {
                Ok(p) => Some(p),
                Err(e) => {
                    warn!("Zone is ignored for intersection tests: {}", e);
                    None
                }
            })
            .as_ref()
    }

    pub fn is_valid(&self) -> bool {
        self.geometry().is_some()
    }

    /// The box touches or overlaps the zone
    ///
    pub fn violated_by(&self, bbox: &BoundingBox) -> bool {
        match self.geometry() {
            Some(p) => intersects(bbox, p),
            None => false,
        }
    }
}

/// Returns the name of the first zone (in registry order) intersected by the box
///
pub fn check_violation<'a>(bbox: &BoundingBox, zones: &'a [Zone]) -> Option<&'a str> {
    zones
        .iter()
        .find(|z| z.violated_by(bbox))
        .map(|z| z.name())
}

/// Process-wide registry of restricted zones grouped by camera
///
/// Readers take a cheap snapshot (`Arc`) of a camera's zone list; administrative updates
/// replace the whole list, so a frame already holding a snapshot keeps a consistent view
/// while the next frame picks up the change.
///
#[derive(Debug, Default)]
pub struct ZoneRegistry {
    cameras: RwLock<HashMap<String, Arc<Vec<Zone>>>>,
}

impl ZoneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with zones for the cameras
    ///
    pub fn with_zones(zones: HashMap<String, Vec<Zone>>) -> Self {
        let registry = Self::new();
        registry.reload(zones);
        registry
    }

    /// Zones of the camera in registry order, empty if the camera is unknown
    ///
    pub fn zones_for(&self, camera_id: &str) -> Arc<Vec<Zone>> {
        self.cameras
            .read()
            .expect("Access to zone registry must always succeed")
            .get(camera_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Known cameras
    ///
    pub fn cameras(&self) -> Vec<String> {
        let mut cameras = self
            .cameras
            .read()
            .expect("Access to zone registry must always succeed")
            .keys()
            .cloned()
            .collect::<Vec<_>>();
        cameras.sort();
        cameras
    }

    /// Replaces zones of the camera
    ///
    pub fn set_zones(&self, camera_id: &str, zones: Vec<Zone>) {
        Self::warn_invalid(camera_id, &zones);
        self.cameras
            .write()
            .expect("Access to zone registry must always succeed")
            .insert(camera_id.to_string(), Arc::new(zones));
    }

    /// Appends the zone to the camera's list
    ///
    pub fn add_zone(&self, camera_id: &str, zone: Zone) {
        Self::warn_invalid(camera_id, std::slice::from_ref(&zone));
        let mut cameras = self
            .cameras
            .write()
            .expect("Access to zone registry must always succeed");
        let mut zones = cameras
            .get(camera_id)
            .map(|z| z.as_ref().clone())
            .unwrap_or_default();
        zones.push(zone);
        cameras.insert(camera_id.to_string(), Arc::new(zones));
    }

    /// Removes all zones of the camera with the name, returns `true` if any was removed
    ///
    pub fn remove_zone(&self, camera_id: &str, name: &str) -> bool {
        let mut cameras = self
            .cameras
            .write()
            .expect("Access to zone registry must always succeed");
        let current = match cameras.get(camera_id) {
            Some(z) => z.clone(),
            None => return false,
        };
        let zones = current
            .iter()
            .filter(|z| z.name() != name)
            .cloned()
            .collect::<Vec<_>>();
        let removed = zones.len() != current.len();
        if removed {
            cameras.insert(camera_id.to_string(), Arc::new(zones));
        }
        removed
    }

    /// Replaces the whole configuration
    ///
    pub fn reload(&self, zones: HashMap<String, Vec<Zone>>) {
        let zones = zones
            .into_iter()
            .map(|(camera_id, zones)| {
                Self::warn_invalid(&camera_id, &zones);
                (camera_id, Arc::new(zones))
            })
            .collect::<HashMap<_, _>>();
        info!("Zone configuration loaded for {} camera(s)", zones.len());
        *self
            .cameras
            .write()
            .expect("Access to zone registry must always succeed") = zones;
    }

    fn warn_invalid(camera_id: &str, zones: &[Zone]) {
        for z in zones.iter().filter(|z| !z.is_valid()) {
            warn!(
                "Camera `{}`: zone `{}` has malformed geometry and will never be violated",
                camera_id,
                z.name()
            );
        }
    }
}
