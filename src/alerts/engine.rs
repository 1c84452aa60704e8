use crate::alerts::cooldown::AlertCooldown;
use crate::alerts::dispatch::{NotificationDispatcher, DEFAULT_NOTIFICATION_QUEUE};
use crate::alerts::notify::Notifier;
use crate::alerts::store::AlertStore;
use crate::alerts::{Alert, AlertType};
use crate::identity::embedding::FaceEmbedding;
use crate::identity::registry::IdentityRegistry;
use crate::identity::IdentityGate;
use crate::objects::TrackedObject;
use crate::stationary::StationaryTracker;
use crate::zones::{check_violation, ZoneRegistry};
use log::{debug, warn};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default repeat suppression window for zone violations and unknown faces
pub const DEFAULT_ALERT_COOLDOWN: Duration = Duration::from_secs(30);

/// Class that is used to configure the alert engine
#[derive(Debug, Clone)]
pub struct AlertEngineOptions {
    cooldowns: HashMap<AlertType, Duration>,
    notification_queue: usize,
}

impl Default for AlertEngineOptions {
    fn default() -> Self {
        Self {
            cooldowns: HashMap::from([
                (AlertType::RestrictedZone, DEFAULT_ALERT_COOLDOWN),
                (AlertType::UnknownPerson, DEFAULT_ALERT_COOLDOWN),
                (AlertType::Stationary, Duration::ZERO),
            ]),
            notification_queue: DEFAULT_NOTIFICATION_QUEUE,
        }
    }
}

impl AlertEngineOptions {
    /// Repeats of the alert type for the same track within the window are not emitted.
    ///
    /// Loitering is a continuous signal and has no cooldown by default; zero disables the
    /// suppression for the type.
    ///
    pub fn cooldown(mut self, alert_type: AlertType, window: Duration) -> Self {
        self.cooldowns.insert(alert_type, window);
        self
    }

    /// Disables repeat suppression for all alert types, every frame that satisfies a condition
    /// emits the alert.
    ///
    pub fn without_cooldown(mut self) -> Self {
        self.cooldowns.clear();
        self
    }

    /// The maximum number of notifications waiting for delivery
    ///
    pub fn notification_queue(mut self, n: usize) -> Self {
        assert!(n > 0, "Queue length must be a positive number");
        self.notification_queue = n;
        self
    }

    pub fn get_cooldown(&self, alert_type: AlertType) -> Duration {
        self.cooldowns
            .get(&alert_type)
            .copied()
            .unwrap_or(Duration::ZERO)
    }

    pub fn get_notification_queue(&self) -> usize {
        self.notification_queue
    }
}

/// Per-camera alert decision engine
///
/// Fuses restricted-zone, loitering and identity checks into typed alerts, applies the
/// cooldown, and hands every emitted alert to the store and the notifier. Storage and
/// notification are best-effort: their failures are logged and never stop alert generation.
///
pub struct AlertEngine {
    camera_id: String,
    zones: Arc<ZoneRegistry>,
    stationary: StationaryTracker,
    gate: IdentityGate,
    identities: Arc<dyn IdentityRegistry>,
    cooldown: AlertCooldown,
    opts: AlertEngineOptions,
    store: Option<Arc<dyn AlertStore>>,
    dispatcher: Option<NotificationDispatcher>,
}

impl AlertEngine {
    /// Creates the engine for the camera
    ///
    /// # Parameters
    /// * `camera_id` - camera the engine produces alerts for
    /// * `zones` - shared zone registry, the camera's zones are read at the start of every frame
    /// * `stationary` - loitering detector owned by the engine
    /// * `gate` - identity gate
    /// * `identities` - shared registry of known faces
    /// * `opts` - cooldown and delivery options
    ///
    pub fn new(
        camera_id: &str,
        zones: Arc<ZoneRegistry>,
        stationary: StationaryTracker,
        gate: IdentityGate,
        identities: Arc<dyn IdentityRegistry>,
        opts: AlertEngineOptions,
    ) -> Self {
        Self {
            camera_id: camera_id.to_string(),
            zones,
            stationary,
            gate,
            identities,
            cooldown: AlertCooldown::new(opts.cooldowns.clone()),
            opts,
            store: None,
            dispatcher: None,
        }
    }

    /// Persists every emitted alert into the store
    ///
    pub fn with_store(mut self, store: Arc<dyn AlertStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Delivers every emitted alert with the notifier on a background thread
    ///
    pub fn with_notifier<N: Notifier>(mut self, notifier: N) -> Self {
        self.dispatcher = Some(NotificationDispatcher::new(
            notifier,
            self.opts.notification_queue,
        ));
        self
    }

    pub fn camera_id(&self) -> &str {
        &self.camera_id
    }

    pub fn stationary(&self) -> &StationaryTracker {
        &self.stationary
    }

    pub fn stationary_mut(&mut self) -> &mut StationaryTracker {
        &mut self.stationary
    }

    pub fn dispatcher(&self) -> Option<&NotificationDispatcher> {
        self.dispatcher.as_ref()
    }

    /// Evaluates the frame's objects at the current moment
    ///
    pub fn process(
        &mut self,
        objects: &[TrackedObject],
        embeddings: &HashMap<u64, FaceEmbedding>,
    ) -> Vec<Alert> {
        self.process_at(objects, embeddings, Instant::now())
    }

    /// Evaluates the frame's objects at the moment `now`
    ///
    /// Only person objects are evaluated. For each of them, in order: restricted zone check,
    /// loitering check, and, when a face embedding is present for the track, the identity gate.
    /// The conditions are independent, so one object may produce up to three alerts per frame.
    ///
    pub fn process_at(
        &mut self,
        objects: &[TrackedObject],
        embeddings: &HashMap<u64, FaceEmbedding>,
        now: Instant,
    ) -> Vec<Alert> {
        let zones = self.zones.zones_for(&self.camera_id);
        let mut seen = HashSet::new();
        let mut alerts = Vec::default();

        for object in objects.iter().filter(|o| o.is_person()) {
            let track_id = object.track_id;
            if !seen.insert(track_id) {
                warn!(
                    "Camera `{}`: track {} is reported twice in one frame, the duplicate is skipped",
                    self.camera_id, track_id
                );
                continue;
            }

            if let Some(zone) = check_violation(&object.bbox, &zones) {
                if self
                    .cooldown
                    .admit(track_id, AlertType::RestrictedZone, now)
                {
                    alerts.push(Alert::restricted_zone(&self.camera_id, track_id, zone));
                }
            }

            if self.stationary.evaluate_at(track_id, &object.bbox, now)
                && self.cooldown.admit(track_id, AlertType::Stationary, now)
            {
                alerts.push(Alert::stationary(&self.camera_id, track_id));
            }

            if let Some(embedding) = embeddings.get(&track_id) {
                match self.gate.identify(embedding, self.identities.as_ref()) {
                    Ok(Some(m)) => debug!(
                        "Camera `{}`: track {} matches identity {} (distance {})",
                        self.camera_id, track_id, m.identity_id, m.distance
                    ),
                    Ok(None) => {
                        if self.cooldown.admit(track_id, AlertType::UnknownPerson, now) {
                            alerts.push(Alert::unknown_person(&self.camera_id, track_id));
                        }
                    }
                    Err(e) => warn!(
                        "Camera `{}`: identity check for track {} is skipped. Error is: {:?}",
                        self.camera_id, track_id, e
                    ),
                }
            }
        }

        for alert in &alerts {
            self.dispatch(alert);
        }

        alerts
    }

    fn dispatch(&self, alert: &Alert) {
        if let Some(store) = &self.store {
            match store.save(alert) {
                Ok(id) => debug!("Alert {} saved: {}", id, alert.description()),
                Err(e) => warn!(
                    "Unable to save alert `{}`. Error is: {:?}",
                    alert.description(),
                    e
                ),
            }
        }
        if let Some(dispatcher) = &self.dispatcher {
            if let Err(e) = dispatcher.notify(alert) {
                warn!(
                    "Unable to enqueue notification for `{}`. Error is: {:?}",
                    alert.description(),
                    e
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::alerts::engine::{AlertEngine, AlertEngineOptions};
    use crate::alerts::store::{AlertStore, InMemoryAlertStore};
    use crate::alerts::AlertType;
    use crate::examples::{CollectingNotifier, FailingAlertStore, FailingNotifier};
    use crate::identity::embedding::FaceEmbedding;
    use crate::identity::registry::InMemoryIdentityRegistry;
    use crate::identity::IdentityGate;
    use crate::objects::{ObjectClass, TrackedObject};
    use crate::stationary::{StationaryOptions, StationaryTracker};
    use crate::utils::bbox::BoundingBox;
    use crate::zones::{Zone, ZoneRegistry};
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    fn zones() -> Arc<ZoneRegistry> {
        Arc::new(ZoneRegistry::with_zones(HashMap::from([(
            "CAM_01".to_string(),
            vec![Zone::rect("No Entry", 0.0, 0.0, 400.0, 300.0)],
        )])))
    }

    fn identities() -> Arc<InMemoryIdentityRegistry> {
        let r = InMemoryIdentityRegistry::new();
        r.add(FaceEmbedding::from(vec![1.0, 0.0, 0.0, 0.0]), Some("guard"))
            .unwrap();
        Arc::new(r)
    }

    fn engine(opts: AlertEngineOptions) -> AlertEngine {
        AlertEngine::new(
            "CAM_01",
            zones(),
            StationaryTracker::new(StationaryOptions::default().dwell(Duration::from_secs(5))),
            IdentityGate::default(),
            identities(),
            opts,
        )
    }

    #[test]
    fn zone_violation() {
        let mut e = engine(AlertEngineOptions::default());
        let alerts = e.process(
            &[TrackedObject::person(7, BoundingBox::new(50.0, 50.0, 150.0, 150.0))],
            &HashMap::default(),
        );
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type(), AlertType::RestrictedZone);
        assert!(alerts[0].description().contains("No Entry"));
        assert!(alerts[0].description().contains('7'));
    }

    #[test]
    fn all_three_alerts_in_one_frame() {
        let mut e = engine(AlertEngineOptions::default());
        let t0 = Instant::now();
        let person = TrackedObject::person(11, BoundingBox::new(100.0, 100.0, 200.0, 250.0));
        let faces = HashMap::from([(11, FaceEmbedding::from(vec![0.0, 0.0, 1.0, 0.0]))]);

        let first = e.process_at(&[person.clone()], &HashMap::default(), t0);
        assert_eq!(first.len(), 1);

        let alerts = e.process_at(&[person], &faces, t0 + Duration::from_secs(60));
        let mut types = alerts.iter().map(|a| a.alert_type()).collect::<Vec<_>>();
        types.sort();
        assert_eq!(
            types,
            vec![
                AlertType::Stationary,
                AlertType::RestrictedZone,
                AlertType::UnknownPerson
            ]
        );
    }

    #[test]
    fn known_face_and_missing_face_produce_nothing() {
        let mut e = engine(AlertEngineOptions::default());
        let far = BoundingBox::new(1000.0, 1000.0, 1100.0, 1200.0);
        let faces = HashMap::from([(1, FaceEmbedding::from(vec![0.95, 0.05, 0.0, 0.0]))]);
        let alerts = e.process(
            &[TrackedObject::person(1, far), TrackedObject::person(2, far.shift(300.0, 0.0))],
            &faces,
        );
        assert!(alerts.is_empty());
    }

    #[test]
    fn non_person_objects_are_ignored() {
        let mut e = engine(AlertEngineOptions::default());
        let car = TrackedObject::new(
            3,
            BoundingBox::new(50.0, 50.0, 150.0, 150.0),
            ObjectClass::Other("car".into()),
            0.9,
        );
        assert!(e.process(&[car], &HashMap::default()).is_empty());
        assert!(e.stationary().state(3).is_none());
    }

    #[test]
    fn cooldown_suppresses_held_violation() {
        let mut e = engine(AlertEngineOptions::default());
        let t0 = Instant::now();
        let person = [TrackedObject::person(7, BoundingBox::new(50.0, 50.0, 150.0, 150.0))];
        let mut zone_alerts = 0;
        for i in 0..60 {
            zone_alerts += e
                .process_at(&person, &HashMap::default(), t0 + Duration::from_secs(i))
                .iter()
                .filter(|a| a.alert_type() == AlertType::RestrictedZone)
                .count();
        }
        assert_eq!(zone_alerts, 2);
    }

    #[test]
    fn without_cooldown_every_frame_alerts() {
        let mut e = engine(AlertEngineOptions::default().without_cooldown());
        let t0 = Instant::now();
        let person = [TrackedObject::person(7, BoundingBox::new(50.0, 50.0, 150.0, 150.0))];
        for i in 0..5 {
            let alerts =
                e.process_at(&person, &HashMap::default(), t0 + Duration::from_millis(i * 40));
            assert_eq!(alerts.len(), 1);
        }
    }

    #[test]
    fn stationary_alert_repeats() {
        let mut e = engine(AlertEngineOptions::default());
        let t0 = Instant::now();
        let person = [TrackedObject::person(42, BoundingBox::new(450.0, 450.0, 550.0, 550.0))];
        let mut stationary = Vec::default();
        for i in 0..8 {
            let alerts = e.process_at(&person, &HashMap::default(), t0 + Duration::from_secs(i));
            stationary.push(!alerts.is_empty());
        }
        assert_eq!(
            stationary,
            vec![false, false, false, false, false, true, true, true]
        );
    }

    #[test]
    fn duplicate_track_in_frame_is_evaluated_once() {
        let mut e = engine(AlertEngineOptions::default().without_cooldown());
        let b = BoundingBox::new(50.0, 50.0, 150.0, 150.0);
        let alerts = e.process(
            &[TrackedObject::person(7, b), TrackedObject::person(7, b)],
            &HashMap::default(),
        );
        assert_eq!(alerts.len(), 1);
    }

    #[test]
    fn store_and_notifier_receive_alerts() {
        let store = Arc::new(InMemoryAlertStore::new());
        let notifier = CollectingNotifier::default();
        let mut e = engine(AlertEngineOptions::default())
            .with_store(store.clone())
            .with_notifier(notifier.clone());
        e.process(
            &[TrackedObject::person(7, BoundingBox::new(50.0, 50.0, 150.0, 150.0))],
            &HashMap::default(),
        );
        e.dispatcher().unwrap().flush().unwrap();

        assert_eq!(store.query(Some("CAM_01"), 10).unwrap().len(), 1);
        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "Restricted Zone Alert");
    }

    #[test]
    fn failing_store_and_notifier_do_not_stop_alerts() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut e = engine(AlertEngineOptions::default().without_cooldown())
            .with_store(Arc::new(FailingAlertStore))
            .with_notifier(FailingNotifier);
        let b = BoundingBox::new(50.0, 50.0, 150.0, 150.0);
        let objects = [TrackedObject::person(1, b), TrackedObject::person(2, b.shift(10.0, 0.0))];
        assert_eq!(e.process(&objects, &HashMap::default()).len(), 2);
        assert_eq!(e.process(&objects, &HashMap::default()).len(), 2);
        e.dispatcher().unwrap().flush().unwrap();
        assert_eq!(e.dispatcher().unwrap().stats().failed(), 4);
    }

    #[test]
    fn identity_errors_skip_unknown_check() {
        let mut e = engine(AlertEngineOptions::default());
        let far = BoundingBox::new(1000.0, 1000.0, 1100.0, 1200.0);
        // registry holds 4-dimensional faces
        let faces = HashMap::from([(5, FaceEmbedding::from(vec![0.0; 16]))]);
        assert!(e.process(&[TrackedObject::person(5, far)], &faces).is_empty());
    }

    #[test]
    fn garbage_face_is_not_unknown_person() {
        let mut e = engine(AlertEngineOptions::default());
        let far = BoundingBox::new(1000.0, 1000.0, 1100.0, 1200.0);
        let faces = HashMap::from([(3, FaceEmbedding::from(vec![f32::NAN, 0.0, 0.0, 0.0]))]);
        assert!(e.process(&[TrackedObject::person(3, far)], &faces).is_empty());
    }
}
