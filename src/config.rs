use crate::alerts::dispatch::DEFAULT_NOTIFICATION_QUEUE;
use crate::alerts::engine::{AlertEngineOptions, DEFAULT_ALERT_COOLDOWN};
use crate::alerts::AlertType;
use crate::distance::DistanceMetric;
use crate::identity::{IdentityGate, DEFAULT_MATCH_THRESHOLD};
use crate::pipeline::{PipelineOptions, DEFAULT_LOW_LIGHT_THRESHOLD, DEFAULT_SCENE_CADENCE};
use crate::stationary::{
    ReferencePolicy, StationaryOptions, DEFAULT_DWELL, DEFAULT_MAX_IDLE, DEFAULT_MOVE_THRESHOLD,
};
use crate::utils::geometry::polygon_from_vertices;
use crate::zones::{Zone, ZoneRegistry};
use crate::Errors;
use anyhow::Result;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Restricted zone as it appears in the configuration document
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneConfig {
    pub name: String,
    pub coords: Vec<(f32, f32)>,
}

impl From<&ZoneConfig> for Zone {
    fn from(z: &ZoneConfig) -> Self {
        Zone::new(&z.name, z.coords.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StationaryConfig {
    pub move_threshold: f32,
    pub dwell_secs: f64,
    pub max_idle_secs: f64,
    pub reference_policy: ReferencePolicy,
}

impl Default for StationaryConfig {
    fn default() -> Self {
        Self {
            move_threshold: DEFAULT_MOVE_THRESHOLD,
            dwell_secs: DEFAULT_DWELL.as_secs_f64(),
            max_idle_secs: DEFAULT_MAX_IDLE.as_secs_f64(),
            reference_policy: ReferencePolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    pub match_threshold: f32,
    pub metric: DistanceMetric,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            match_threshold: DEFAULT_MATCH_THRESHOLD,
            metric: DistanceMetric::default(),
        }
    }
}

/// Configuration document of the alerting service
///
/// Every field is optional in the JSON, missing fields take the default values.
///
/// ```json
/// {
///   "zones": { "CAM_01": [ { "name": "No Entry", "coords": [[0, 0], [400, 0], [400, 300], [0, 300]] } ] },
///   "stationary": { "move_threshold": 10.0, "dwell_secs": 60, "max_idle_secs": 120 },
///   "identity": { "match_threshold": 0.8, "metric": "squared_euclidean" },
///   "cooldown_secs": { "RESTRICTED_ZONE": 30, "UNKNOWN_PERSON": 30, "STATIONARY": 0 },
///   "scene_cadence": 15,
///   "low_light_threshold": 60.0
/// }
/// ```
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchpostConfig {
    pub zones: BTreeMap<String, Vec<ZoneConfig>>,
    pub stationary: StationaryConfig,
    pub identity: IdentityConfig,
    pub cooldown_secs: BTreeMap<AlertType, f64>,
    pub scene_cadence: u64,
    pub low_light_threshold: f32,
    pub notification_queue: usize,
}

impl Default for WatchpostConfig {
    fn default() -> Self {
        Self {
            zones: BTreeMap::from([(
                "CAM_01".to_string(),
                vec![ZoneConfig {
                    name: "No Entry".to_string(),
                    coords: vec![(0.0, 0.0), (400.0, 0.0), (400.0, 300.0), (0.0, 300.0)],
                }],
            )]),
            stationary: StationaryConfig::default(),
            identity: IdentityConfig::default(),
            cooldown_secs: BTreeMap::from([
                (AlertType::RestrictedZone, DEFAULT_ALERT_COOLDOWN.as_secs_f64()),
                (AlertType::UnknownPerson, DEFAULT_ALERT_COOLDOWN.as_secs_f64()),
                (AlertType::Stationary, 0.0),
            ]),
            scene_cadence: DEFAULT_SCENE_CADENCE,
            low_light_threshold: DEFAULT_LOW_LIGHT_THRESHOLD,
            notification_queue: DEFAULT_NOTIFICATION_QUEUE,
        }
    }
}

fn seconds(field: &str, secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs).map_err(|_| {
        Errors::InvalidConfig(format!(
            "`{}` must be a non-negative number of seconds, got {}",
            field, secs
        ))
        .into()
    })
}

impl WatchpostConfig {
    /// Parses and validates the document
    ///
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| Errors::InvalidConfig(format!("malformed document: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates the document
    ///
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        info!(
            "Configuration is loaded from {}: {} camera(s) with zones",
            path.display(),
            config.zones.len()
        );
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Checks the values the option builders would reject, and the zone geometry
    ///
    pub fn validate(&self) -> Result<()> {
        for (camera_id, zones) in &self.zones {
            for z in zones {
                polygon_from_vertices(&z.name, &z.coords).map_err(|e| {
                    Errors::InvalidConfig(format!("camera `{}`: {}", camera_id, e))
                })?;
            }
        }
        if !(self.stationary.move_threshold > 0.0 && self.stationary.move_threshold.is_finite()) {
            return Err(Errors::InvalidConfig(format!(
                "`stationary.move_threshold` must be positive, got {}",
                self.stationary.move_threshold
            ))
            .into());
        }
        seconds("stationary.dwell_secs", self.stationary.dwell_secs)?;
        seconds("stationary.max_idle_secs", self.stationary.max_idle_secs)?;
        if !(self.identity.match_threshold > 0.0 && self.identity.match_threshold.is_finite()) {
            return Err(Errors::InvalidConfig(format!(
                "`identity.match_threshold` must be positive, got {}",
                self.identity.match_threshold
            ))
            .into());
        }
        for (t, secs) in &self.cooldown_secs {
            seconds(&format!("cooldown_secs.{}", t), *secs)?;
        }
        if self.scene_cadence == 0 {
            return Err(Errors::InvalidConfig("`scene_cadence` must be positive".into()).into());
        }
        if !self.low_light_threshold.is_finite() {
            return Err(
                Errors::InvalidConfig("`low_light_threshold` must be a number".into()).into(),
            );
        }
        if self.notification_queue == 0 {
            return Err(
                Errors::InvalidConfig("`notification_queue` must be positive".into()).into(),
            );
        }
        Ok(())
    }

    /// Zones grouped by camera
    ///
    pub fn zones(&self) -> HashMap<String, Vec<Zone>> {
        self.zones
            .iter()
            .map(|(camera_id, zones)| (camera_id.clone(), zones.iter().map(Zone::from).collect()))
            .collect()
    }

    pub fn zone_registry(&self) -> ZoneRegistry {
        ZoneRegistry::with_zones(self.zones())
    }

    pub fn stationary_options(&self) -> Result<StationaryOptions> {
        Ok(StationaryOptions::default()
            .move_threshold(self.stationary.move_threshold)
            .dwell(seconds("stationary.dwell_secs", self.stationary.dwell_secs)?)
            .max_idle(seconds(
                "stationary.max_idle_secs",
                self.stationary.max_idle_secs,
            )?)
            .reference_policy(self.stationary.reference_policy))
    }

    pub fn identity_gate(&self) -> IdentityGate {
        IdentityGate::new(self.identity.match_threshold, self.identity.metric)
    }

    pub fn alert_engine_options(&self) -> Result<AlertEngineOptions> {
        let mut opts =
            AlertEngineOptions::default().notification_queue(self.notification_queue);
        for (t, secs) in &self.cooldown_secs {
            opts = opts.cooldown(*t, seconds(&format!("cooldown_secs.{}", t), *secs)?);
        }
        Ok(opts)
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions::default()
            .scene_cadence(self.scene_cadence)
            .low_light_threshold(self.low_light_threshold)
    }
}
