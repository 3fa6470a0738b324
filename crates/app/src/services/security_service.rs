//! Security service — the alarm state machine.
//!
//! Every sensor, arming and camera event goes through [`SecurityService`],
//! which reads the current state from the repository, applies the rules
//! below and writes the outcome back:
//!
//! | Event | Outcome |
//! |-------|---------|
//! | sensor activated while armed | `NoAlarm` → `PendingAlarm`, `PendingAlarm` → `Alarm` |
//! | last active sensor deactivated while pending | `PendingAlarm` → `NoAlarm` |
//! | any sensor change while `Alarm` | no status change |
//! | disarm | `NoAlarm` |
//! | arm (home or away) | every sensor reset to inactive |
//! | cat seen while armed home | `Alarm` |
//! | no cat and no active sensor | `NoAlarm` |
//!
//! Sensor-driven changes are locked out while the alarm sounds; camera-driven
//! changes are not.

use std::collections::BTreeSet;

use tokio::sync::Mutex;

use catpoint_domain::error::{CatpointError, ValidationError};
use catpoint_domain::event::SecurityEvent;
use catpoint_domain::image::Image;
use catpoint_domain::sensor::Sensor;
use catpoint_domain::status::{AlarmStatus, ArmingStatus};

use crate::ports::{EventPublisher, ImageClassifier, SecurityRepository};

/// Confidence (in percent) the classifier must reach to report a cat.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 50.0;

/// State owned by the service itself rather than the repository.
#[derive(Debug, Default)]
struct Session {
    /// Outcome of the most recent image classification.
    cat_detected: bool,
}

/// Application service applying the alarm rules.
///
/// Each operation holds an internal lock for its whole read-modify-write
/// sequence, so concurrent callers sharing one service never interleave.
pub struct SecurityService<R, C, P> {
    repo: R,
    classifier: C,
    publisher: P,
    confidence_threshold: f32,
    session: Mutex<Session>,
}

impl<R, C, P> SecurityService<R, C, P>
where
    R: SecurityRepository,
    C: ImageClassifier,
    P: EventPublisher,
{
    /// Create a new service using [`DEFAULT_CONFIDENCE_THRESHOLD`].
    pub fn new(repo: R, classifier: C, publisher: P) -> Self {
        Self {
            repo,
            classifier,
            publisher,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            session: Mutex::new(Session::default()),
        }
    }

    /// Override the confidence threshold passed to the classifier.
    ///
    /// # Errors
    ///
    /// Returns [`CatpointError::Validation`] when `threshold` is not a
    /// percentage in `0.0..=100.0`.
    pub fn with_confidence_threshold(mut self, threshold: f32) -> Result<Self, CatpointError> {
        if !(0.0..=100.0).contains(&threshold) {
            return Err(ValidationError::InvalidConfidenceThreshold(threshold).into());
        }
        self.confidence_threshold = threshold;
        Ok(self)
    }

    #[must_use]
    pub fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }

    /// Whether the last classified image contained a cat.
    pub async fn cat_detected(&self) -> bool {
        self.session.lock().await.cat_detected
    }

    /// Current alarm status as stored in the repository.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn alarm_status(&self) -> Result<AlarmStatus, CatpointError> {
        self.repo.alarm_status().await
    }

    /// Current arming status as stored in the repository.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn arming_status(&self) -> Result<ArmingStatus, CatpointError> {
        self.repo.arming_status().await
    }

    /// Persist an alarm status directly, bypassing the rules.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    #[tracing::instrument(skip(self))]
    pub async fn set_alarm_status(&self, status: AlarmStatus) -> Result<(), CatpointError> {
        let _session = self.session.lock().await;
        self.write_alarm_status(status).await
    }

    /// Change the arming status.
    ///
    /// Disarming clears the alarm. Arming (home or away, including a switch
    /// between the two) resets every sensor to inactive. Arming home while
    /// the camera last showed a cat raises the alarm.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    #[tracing::instrument(skip(self))]
    pub async fn set_arming_status(&self, status: ArmingStatus) -> Result<(), CatpointError> {
        let session = self.session.lock().await;

        if status.is_armed() {
            self.reset_sensors().await?;
            if status == ArmingStatus::ArmedHome && session.cat_detected {
                self.write_alarm_status(AlarmStatus::Alarm).await?;
            }
        } else {
            self.write_alarm_status(AlarmStatus::NoAlarm).await?;
        }

        self.repo.set_arming_status(status).await?;
        tracing::info!(%status, "arming status changed");
        self.notify(SecurityEvent::arming_status_changed(status))
            .await;
        Ok(())
    }

    /// Change a sensor's activation flag and update the alarm accordingly.
    ///
    /// `sensor` must be tracked by the repository and carry the activation
    /// flag the caller last observed; that flag decides whether the call is a
    /// real transition. The new flag is always persisted, even while the
    /// alarm is locked. Returns the sensor as persisted.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    #[tracing::instrument(skip(self, sensor), fields(sensor = %sensor.name, sensor_type = %sensor.sensor_type))]
    pub async fn change_sensor_activation_status(
        &self,
        mut sensor: Sensor,
        active: bool,
    ) -> Result<Sensor, CatpointError> {
        let _session = self.session.lock().await;

        let alarm = self.repo.alarm_status().await?;
        let was_active = sensor.active;
        sensor.active = active;
        self.repo.update_sensor(sensor.clone()).await?;

        let next = if alarm == AlarmStatus::Alarm {
            None
        } else if active {
            self.on_sensor_activated(alarm).await?
        } else if was_active {
            self.on_sensor_deactivated(alarm).await?
        } else {
            None
        };

        if let Some(status) = next {
            self.write_alarm_status(status).await?;
        }
        self.notify(SecurityEvent::sensors_changed()).await;
        Ok(sensor)
    }

    /// Classify a camera image and update the alarm accordingly.
    ///
    /// Returns whether a cat was detected.
    ///
    /// # Errors
    ///
    /// Returns a classifier error when the image could not be classified, or
    /// a storage error propagated from the repository.
    #[tracing::instrument(skip(self, image), fields(image_len = image.len()))]
    pub async fn process_image(&self, image: &Image) -> Result<bool, CatpointError> {
        let mut session = self.session.lock().await;

        let cat = self
            .classifier
            .classify_contains_cat(image, self.confidence_threshold)
            .await?;
        session.cat_detected = cat;
        tracing::debug!(cat, "image classified");

        if cat {
            if self.repo.arming_status().await? == ArmingStatus::ArmedHome {
                self.write_alarm_status(AlarmStatus::Alarm).await?;
            }
        } else if self.all_sensors_inactive().await? {
            self.write_alarm_status(AlarmStatus::NoAlarm).await?;
        }

        self.notify(SecurityEvent::cat_detected(cat)).await;
        Ok(cat)
    }

    /// All tracked sensors.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn sensors(&self) -> Result<BTreeSet<Sensor>, CatpointError> {
        self.repo.sensors().await
    }

    /// Start tracking a sensor. No alarm rule is applied.
    ///
    /// # Errors
    ///
    /// Returns [`CatpointError::Validation`] if the sensor name is blank, or a
    /// storage error from the repository.
    #[tracing::instrument(skip(self, sensor), fields(sensor = %sensor.name))]
    pub async fn add_sensor(&self, sensor: Sensor) -> Result<(), CatpointError> {
        sensor.validate()?;
        let _session = self.session.lock().await;
        self.repo.add_sensor(sensor).await?;
        self.notify(SecurityEvent::sensors_changed()).await;
        Ok(())
    }

    /// Stop tracking a sensor. No alarm rule is applied.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    #[tracing::instrument(skip(self, sensor), fields(sensor = %sensor.name))]
    pub async fn remove_sensor(&self, sensor: Sensor) -> Result<(), CatpointError> {
        let _session = self.session.lock().await;
        self.repo.remove_sensor(sensor).await?;
        self.notify(SecurityEvent::sensors_changed()).await;
        Ok(())
    }

    async fn on_sensor_activated(
        &self,
        alarm: AlarmStatus,
    ) -> Result<Option<AlarmStatus>, CatpointError> {
        if self.repo.arming_status().await? == ArmingStatus::Disarmed {
            return Ok(None);
        }
        // Re-activating an already active sensor while pending escalates
        // exactly like a fresh activation does.
        Ok(Some(alarm.escalated()))
    }

    async fn on_sensor_deactivated(
        &self,
        alarm: AlarmStatus,
    ) -> Result<Option<AlarmStatus>, CatpointError> {
        if alarm == AlarmStatus::PendingAlarm && self.all_sensors_inactive().await? {
            return Ok(Some(AlarmStatus::NoAlarm));
        }
        Ok(None)
    }

    async fn all_sensors_inactive(&self) -> Result<bool, CatpointError> {
        let sensors = self.repo.sensors().await?;
        Ok(sensors.iter().all(|sensor| !sensor.active))
    }

    async fn reset_sensors(&self) -> Result<(), CatpointError> {
        let sensors = self.repo.sensors().await?;
        for sensor in sensors {
            self.repo.update_sensor(sensor.with_active(false)).await?;
        }
        self.notify(SecurityEvent::sensors_changed()).await;
        Ok(())
    }

    async fn write_alarm_status(&self, status: AlarmStatus) -> Result<(), CatpointError> {
        self.repo.set_alarm_status(status).await?;
        tracing::info!(%status, "alarm status changed");
        self.notify(SecurityEvent::alarm_status_changed(status))
            .await;
        Ok(())
    }

    async fn notify(&self, event: SecurityEvent) {
        if let Err(err) = self.publisher.publish(event).await {
            tracing::warn!(%err, "failed to publish security event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_bus::InProcessEventBus;
    use catpoint_domain::event::SecurityEventKind;
    use catpoint_domain::sensor::SensorType;
    use std::future::Future;
    use std::sync::Arc;
    use std::sync::Mutex as StdMutex;

    /// Answers reads from a fixed script and records every write without
    /// applying it.
    #[derive(Default)]
    struct StubRepo {
        alarm: AlarmStatus,
        arming: ArmingStatus,
        sensors: BTreeSet<Sensor>,
        alarm_writes: StdMutex<Vec<AlarmStatus>>,
        arming_writes: StdMutex<Vec<ArmingStatus>>,
        updates: StdMutex<Vec<Sensor>>,
    }

    impl StubRepo {
        fn with_alarm(mut self, alarm: AlarmStatus) -> Self {
            self.alarm = alarm;
            self
        }

        fn with_arming(mut self, arming: ArmingStatus) -> Self {
            self.arming = arming;
            self
        }

        fn with_sensors(mut self, sensors: impl IntoIterator<Item = Sensor>) -> Self {
            self.sensors = sensors.into_iter().collect();
            self
        }

        fn alarm_writes(&self) -> Vec<AlarmStatus> {
            self.alarm_writes.lock().unwrap().clone()
        }

        fn arming_writes(&self) -> Vec<ArmingStatus> {
            self.arming_writes.lock().unwrap().clone()
        }

        fn updates(&self) -> Vec<Sensor> {
            self.updates.lock().unwrap().clone()
        }
    }

    impl SecurityRepository for StubRepo {
        fn alarm_status(&self) -> impl Future<Output = Result<AlarmStatus, CatpointError>> + Send {
            let alarm = self.alarm;
            async move { Ok(alarm) }
        }

        fn set_alarm_status(
            &self,
            status: AlarmStatus,
        ) -> impl Future<Output = Result<(), CatpointError>> + Send {
            self.alarm_writes.lock().unwrap().push(status);
            async { Ok(()) }
        }

        fn arming_status(
            &self,
        ) -> impl Future<Output = Result<ArmingStatus, CatpointError>> + Send {
            let arming = self.arming;
            async move { Ok(arming) }
        }

        fn set_arming_status(
            &self,
            status: ArmingStatus,
        ) -> impl Future<Output = Result<(), CatpointError>> + Send {
            self.arming_writes.lock().unwrap().push(status);
            async { Ok(()) }
        }

        fn sensors(
            &self,
        ) -> impl Future<Output = Result<BTreeSet<Sensor>, CatpointError>> + Send {
            let sensors = self.sensors.clone();
            async move { Ok(sensors) }
        }

        fn add_sensor(
            &self,
            _sensor: Sensor,
        ) -> impl Future<Output = Result<(), CatpointError>> + Send {
            async { Ok(()) }
        }

        fn remove_sensor(
            &self,
            _sensor: Sensor,
        ) -> impl Future<Output = Result<(), CatpointError>> + Send {
            async { Ok(()) }
        }

        fn update_sensor(
            &self,
            sensor: Sensor,
        ) -> impl Future<Output = Result<(), CatpointError>> + Send {
            self.updates.lock().unwrap().push(sensor);
            async { Ok(()) }
        }
    }

    #[derive(Default)]
    struct MemoryState {
        alarm: AlarmStatus,
        arming: ArmingStatus,
        sensors: BTreeSet<Sensor>,
        alarm_writes: usize,
    }

    /// Stateful repository with the semantics of a real store.
    #[derive(Default)]
    struct InMemoryRepo {
        state: StdMutex<MemoryState>,
    }

    impl InMemoryRepo {
        fn alarm_writes(&self) -> usize {
            self.state.lock().unwrap().alarm_writes
        }
    }

    impl SecurityRepository for InMemoryRepo {
        fn alarm_status(&self) -> impl Future<Output = Result<AlarmStatus, CatpointError>> + Send {
            let alarm = self.state.lock().unwrap().alarm;
            async move { Ok(alarm) }
        }

        fn set_alarm_status(
            &self,
            status: AlarmStatus,
        ) -> impl Future<Output = Result<(), CatpointError>> + Send {
            let mut state = self.state.lock().unwrap();
            state.alarm = status;
            state.alarm_writes += 1;
            async { Ok(()) }
        }

        fn arming_status(
            &self,
        ) -> impl Future<Output = Result<ArmingStatus, CatpointError>> + Send {
            let arming = self.state.lock().unwrap().arming;
            async move { Ok(arming) }
        }

        fn set_arming_status(
            &self,
            status: ArmingStatus,
        ) -> impl Future<Output = Result<(), CatpointError>> + Send {
            self.state.lock().unwrap().arming = status;
            async { Ok(()) }
        }

        fn sensors(
            &self,
        ) -> impl Future<Output = Result<BTreeSet<Sensor>, CatpointError>> + Send {
            let sensors = self.state.lock().unwrap().sensors.clone();
            async move { Ok(sensors) }
        }

        fn add_sensor(
            &self,
            sensor: Sensor,
        ) -> impl Future<Output = Result<(), CatpointError>> + Send {
            self.state.lock().unwrap().sensors.insert(sensor);
            async { Ok(()) }
        }

        fn remove_sensor(
            &self,
            sensor: Sensor,
        ) -> impl Future<Output = Result<(), CatpointError>> + Send {
            self.state.lock().unwrap().sensors.remove(&sensor);
            async { Ok(()) }
        }

        fn update_sensor(
            &self,
            sensor: Sensor,
        ) -> impl Future<Output = Result<(), CatpointError>> + Send {
            self.state.lock().unwrap().sensors.replace(sensor);
            async { Ok(()) }
        }
    }

    /// Always gives the same answer and remembers the threshold it was asked with.
    struct FixedClassifier {
        cat: bool,
        thresholds: StdMutex<Vec<f32>>,
    }

    impl FixedClassifier {
        fn new(cat: bool) -> Self {
            Self {
                cat,
                thresholds: StdMutex::new(Vec::new()),
            }
        }
    }

    impl ImageClassifier for FixedClassifier {
        fn classify_contains_cat(
            &self,
            _image: &Image,
            confidence_threshold: f32,
        ) -> impl Future<Output = Result<bool, CatpointError>> + Send {
            self.thresholds.lock().unwrap().push(confidence_threshold);
            let cat = self.cat;
            async move { Ok(cat) }
        }
    }

    struct BrokenClassifier;

    impl ImageClassifier for BrokenClassifier {
        fn classify_contains_cat(
            &self,
            _image: &Image,
            _confidence_threshold: f32,
        ) -> impl Future<Output = Result<bool, CatpointError>> + Send {
            async {
                Err(CatpointError::Classifier(Box::new(std::io::Error::other(
                    "model not loaded",
                ))))
            }
        }
    }

    struct BrokenPublisher;

    impl EventPublisher for BrokenPublisher {
        fn publish(
            &self,
            _event: SecurityEvent,
        ) -> impl Future<Output = Result<(), CatpointError>> + Send {
            async {
                Err(CatpointError::EventBus(Box::new(std::io::Error::other(
                    "bus closed",
                ))))
            }
        }
    }

    type Service<R, C = FixedClassifier> = SecurityService<Arc<R>, C, Arc<InProcessEventBus>>;

    fn service<R: SecurityRepository + Send + Sync>(repo: &Arc<R>, cat: bool) -> Service<R> {
        SecurityService::new(
            Arc::clone(repo),
            FixedClassifier::new(cat),
            Arc::new(InProcessEventBus::new(64)),
        )
    }

    fn front_door() -> Sensor {
        Sensor::new("Front Door", SensorType::Door)
    }

    fn back_door() -> Sensor {
        Sensor::new("Back Door", SensorType::Door)
    }

    fn image() -> Image {
        Image::from_bytes(vec![1, 2, 3])
    }

    // -----------------------------------------------------------------------
    // Sensor activation
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn should_set_pending_when_armed_and_sensor_activated() {
        let repo = Arc::new(
            StubRepo::default()
                .with_arming(ArmingStatus::ArmedHome)
                .with_alarm(AlarmStatus::NoAlarm),
        );
        let svc = service(&repo, false);

        svc.change_sensor_activation_status(front_door(), true)
            .await
            .unwrap();

        assert_eq!(repo.alarm_writes(), vec![AlarmStatus::PendingAlarm]);
    }

    #[tokio::test]
    async fn should_set_alarm_when_sensor_activated_while_pending() {
        let repo = Arc::new(
            StubRepo::default()
                .with_arming(ArmingStatus::ArmedHome)
                .with_alarm(AlarmStatus::PendingAlarm),
        );
        let svc = service(&repo, false);

        svc.change_sensor_activation_status(front_door(), true)
            .await
            .unwrap();

        assert_eq!(repo.alarm_writes(), vec![AlarmStatus::Alarm]);
    }

    #[tokio::test]
    async fn should_return_to_no_alarm_on_every_deactivation_when_all_sensors_inactive() {
        // The stub keeps reporting a pending alarm and an all-inactive snapshot,
        // so each deactivation of a sensor the caller saw as active clears it.
        let repo = Arc::new(
            StubRepo::default()
                .with_alarm(AlarmStatus::PendingAlarm)
                .with_arming(ArmingStatus::ArmedHome)
                .with_sensors([
                    front_door(),
                    back_door(),
                    Sensor::new("Mid Door", SensorType::Door),
                ]),
        );
        let svc = service(&repo, false);

        for sensor in svc.sensors().await.unwrap() {
            svc.change_sensor_activation_status(sensor.with_active(true), false)
                .await
                .unwrap();
        }

        assert_eq!(repo.alarm_writes(), vec![AlarmStatus::NoAlarm; 3]);
    }

    #[tokio::test]
    async fn should_return_to_no_alarm_only_after_last_active_sensor_is_deactivated() {
        let repo = Arc::new(InMemoryRepo::default());
        let svc = service(&repo, false);
        let sensors = [
            front_door(),
            back_door(),
            Sensor::new("Kitchen", SensorType::Window),
        ];
        for sensor in &sensors {
            repo.add_sensor(sensor.clone().with_active(true)).await.unwrap();
        }
        repo.set_arming_status(ArmingStatus::ArmedAway).await.unwrap();
        repo.set_alarm_status(AlarmStatus::PendingAlarm).await.unwrap();

        for (idx, sensor) in sensors.into_iter().enumerate() {
            svc.change_sensor_activation_status(sensor.with_active(true), false)
                .await
                .unwrap();
            let expected = if idx < 2 {
                AlarmStatus::PendingAlarm
            } else {
                AlarmStatus::NoAlarm
            };
            assert_eq!(svc.alarm_status().await.unwrap(), expected);
        }
        // One write from the setup, one from the last deactivation.
        assert_eq!(repo.alarm_writes(), 2);
    }

    #[tokio::test]
    async fn should_not_write_alarm_status_when_alarm_active_and_sensor_changes() {
        let repo = Arc::new(
            StubRepo::default()
                .with_alarm(AlarmStatus::Alarm)
                .with_arming(ArmingStatus::ArmedHome),
        );
        let svc = service(&repo, false);

        let sensor = svc
            .change_sensor_activation_status(front_door(), true)
            .await
            .unwrap();
        svc.change_sensor_activation_status(sensor, false)
            .await
            .unwrap();

        assert!(repo.alarm_writes().is_empty());
    }

    #[tokio::test]
    async fn should_persist_sensor_flag_when_alarm_locked() {
        let repo = Arc::new(StubRepo::default().with_alarm(AlarmStatus::Alarm));
        let svc = service(&repo, false);

        let sensor = svc
            .change_sensor_activation_status(front_door(), true)
            .await
            .unwrap();
        assert!(sensor.active);
        svc.change_sensor_activation_status(sensor, false)
            .await
            .unwrap();

        let flags: Vec<bool> = repo.updates().iter().map(|s| s.active).collect();
        assert_eq!(flags, vec![true, false]);
    }

    #[tokio::test]
    async fn should_set_alarm_when_already_active_sensor_activated_while_pending() {
        let repo = Arc::new(
            StubRepo::default()
                .with_alarm(AlarmStatus::PendingAlarm)
                .with_arming(ArmingStatus::ArmedAway),
        );
        let svc = service(&repo, false);

        svc.change_sensor_activation_status(front_door().with_active(true), true)
            .await
            .unwrap();

        assert_eq!(repo.alarm_writes(), vec![AlarmStatus::Alarm]);
    }

    #[tokio::test]
    async fn should_not_write_alarm_status_when_inactive_sensor_deactivated() {
        let repo = Arc::new(
            StubRepo::default()
                .with_alarm(AlarmStatus::PendingAlarm)
                .with_arming(ArmingStatus::ArmedHome)
                .with_sensors([front_door()]),
        );
        let svc = service(&repo, false);

        svc.change_sensor_activation_status(front_door(), false)
            .await
            .unwrap();

        assert!(repo.alarm_writes().is_empty());
        assert_eq!(repo.updates().len(), 1);
    }

    #[tokio::test]
    async fn should_not_escalate_when_disarmed_and_sensor_activated() {
        let repo = Arc::new(
            StubRepo::default()
                .with_arming(ArmingStatus::Disarmed)
                .with_alarm(AlarmStatus::NoAlarm),
        );
        let svc = service(&repo, false);

        svc.change_sensor_activation_status(front_door(), true)
            .await
            .unwrap();

        assert!(repo.alarm_writes().is_empty());
        assert!(repo.updates()[0].active);
    }

    #[tokio::test]
    async fn should_keep_pending_when_another_sensor_is_still_active() {
        let repo = Arc::new(InMemoryRepo::default());
        let svc = service(&repo, false);
        repo.add_sensor(front_door().with_active(true)).await.unwrap();
        repo.add_sensor(back_door().with_active(true)).await.unwrap();
        repo.set_alarm_status(AlarmStatus::PendingAlarm).await.unwrap();

        svc.change_sensor_activation_status(front_door().with_active(true), false)
            .await
            .unwrap();

        assert_eq!(svc.alarm_status().await.unwrap(), AlarmStatus::PendingAlarm);
    }

    #[tokio::test]
    async fn should_serialize_concurrent_deactivations() {
        let repo = Arc::new(InMemoryRepo::default());
        let svc = service(&repo, false);
        repo.add_sensor(front_door().with_active(true)).await.unwrap();
        repo.add_sensor(back_door().with_active(true)).await.unwrap();
        repo.set_alarm_status(AlarmStatus::PendingAlarm).await.unwrap();

        let (a, b) = tokio::join!(
            svc.change_sensor_activation_status(front_door().with_active(true), false),
            svc.change_sensor_activation_status(back_door().with_active(true), false),
        );
        a.unwrap();
        b.unwrap();

        assert_eq!(svc.alarm_status().await.unwrap(), AlarmStatus::NoAlarm);
    }

    // -----------------------------------------------------------------------
    // Image processing
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn should_set_alarm_when_cat_detected_and_armed_home() {
        let repo = Arc::new(StubRepo::default().with_arming(ArmingStatus::ArmedHome));
        let svc = service(&repo, true);

        let cat = svc.process_image(&image()).await.unwrap();

        assert!(cat);
        assert!(svc.cat_detected().await);
        assert_eq!(repo.alarm_writes(), vec![AlarmStatus::Alarm]);
    }

    #[tokio::test]
    async fn should_set_alarm_from_cat_even_when_alarm_already_active() {
        let repo = Arc::new(
            StubRepo::default()
                .with_arming(ArmingStatus::ArmedHome)
                .with_alarm(AlarmStatus::Alarm),
        );
        let svc = service(&repo, true);

        svc.process_image(&image()).await.unwrap();

        assert_eq!(repo.alarm_writes(), vec![AlarmStatus::Alarm]);
    }

    #[tokio::test]
    async fn should_not_alarm_when_cat_detected_but_armed_away() {
        let repo = Arc::new(StubRepo::default().with_arming(ArmingStatus::ArmedAway));
        let svc = service(&repo, true);

        svc.process_image(&image()).await.unwrap();

        assert!(repo.alarm_writes().is_empty());
    }

    #[tokio::test]
    async fn should_set_no_alarm_when_no_cat_and_sensors_inactive() {
        let repo = Arc::new(
            StubRepo::default()
                .with_alarm(AlarmStatus::PendingAlarm)
                .with_sensors([front_door(), back_door()]),
        );
        let svc = service(&repo, false);

        let cat = svc.process_image(&image()).await.unwrap();

        assert!(!cat);
        assert_eq!(repo.alarm_writes(), vec![AlarmStatus::NoAlarm]);
    }

    #[tokio::test]
    async fn should_leave_status_when_no_cat_but_a_sensor_is_active() {
        let repo = Arc::new(
            StubRepo::default()
                .with_alarm(AlarmStatus::PendingAlarm)
                .with_sensors([front_door().with_active(true), back_door()]),
        );
        let svc = service(&repo, false);

        svc.process_image(&image()).await.unwrap();

        assert!(repo.alarm_writes().is_empty());
    }

    #[tokio::test]
    async fn should_pass_configured_threshold_to_classifier() {
        let repo = Arc::new(StubRepo::default());
        let svc = service(&repo, false)
            .with_confidence_threshold(80.0)
            .unwrap();

        svc.process_image(&image()).await.unwrap();

        assert_eq!(*svc.classifier.thresholds.lock().unwrap(), vec![80.0]);
    }

    #[test]
    fn should_use_default_threshold_when_not_configured() {
        let repo = Arc::new(StubRepo::default());
        let svc = service(&repo, false);
        assert!((svc.confidence_threshold() - DEFAULT_CONFIDENCE_THRESHOLD).abs() < f32::EPSILON);
    }

    #[test]
    fn should_reject_threshold_outside_percentage_range() {
        let repo = Arc::new(StubRepo::default());
        for threshold in [-1.0, 100.5, f32::NAN] {
            let result = service(&repo, false).with_confidence_threshold(threshold);
            assert!(matches!(
                result,
                Err(CatpointError::Validation(
                    ValidationError::InvalidConfidenceThreshold(_)
                ))
            ));
        }
    }

    #[tokio::test]
    async fn should_propagate_classifier_error_without_touching_status() {
        let repo = Arc::new(StubRepo::default().with_arming(ArmingStatus::ArmedHome));
        let svc: Service<StubRepo, BrokenClassifier> = SecurityService::new(
            Arc::clone(&repo),
            BrokenClassifier,
            Arc::new(InProcessEventBus::new(8)),
        );

        let result = svc.process_image(&image()).await;

        assert!(matches!(result, Err(CatpointError::Classifier(_))));
        assert!(repo.alarm_writes().is_empty());
    }

    // -----------------------------------------------------------------------
    // Arming
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn should_set_no_alarm_when_disarmed() {
        let repo = Arc::new(StubRepo::default().with_alarm(AlarmStatus::Alarm));
        let svc = service(&repo, false);

        svc.set_arming_status(ArmingStatus::Disarmed).await.unwrap();

        assert_eq!(repo.alarm_writes(), vec![AlarmStatus::NoAlarm]);
        assert_eq!(repo.arming_writes(), vec![ArmingStatus::Disarmed]);
    }

    #[tokio::test]
    async fn should_deactivate_and_persist_every_sensor_when_armed() {
        let repo = Arc::new(
            StubRepo::default().with_sensors([
                front_door().with_active(true),
                back_door().with_active(true),
            ]),
        );
        let svc = service(&repo, false);

        svc.set_arming_status(ArmingStatus::ArmedHome).await.unwrap();

        let updates = repo.updates();
        assert_eq!(updates.len(), 2);
        assert!(updates.contains(&front_door()));
        assert!(updates.contains(&back_door()));
        assert!(updates.iter().all(|sensor| !sensor.active));
        assert!(repo.alarm_writes().is_empty());
        assert_eq!(repo.arming_writes(), vec![ArmingStatus::ArmedHome]);
    }

    #[tokio::test]
    async fn should_reset_sensors_when_switching_between_armed_states() {
        let repo = Arc::new(InMemoryRepo::default());
        let svc = service(&repo, false);
        repo.add_sensor(front_door()).await.unwrap();
        svc.set_arming_status(ArmingStatus::ArmedHome).await.unwrap();
        repo.update_sensor(front_door().with_active(true))
            .await
            .unwrap();

        svc.set_arming_status(ArmingStatus::ArmedAway).await.unwrap();

        let sensors = svc.sensors().await.unwrap();
        assert!(sensors.iter().all(|sensor| !sensor.active));
        assert_eq!(svc.arming_status().await.unwrap(), ArmingStatus::ArmedAway);
    }

    #[tokio::test]
    async fn should_set_alarm_when_armed_home_after_cat_was_seen() {
        let repo = Arc::new(InMemoryRepo::default());
        let svc = service(&repo, true);

        svc.process_image(&image()).await.unwrap();
        assert_eq!(svc.alarm_status().await.unwrap(), AlarmStatus::NoAlarm);

        svc.set_arming_status(ArmingStatus::ArmedHome).await.unwrap();

        assert_eq!(svc.alarm_status().await.unwrap(), AlarmStatus::Alarm);
    }

    // -----------------------------------------------------------------------
    // Administration and events
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn should_list_added_sensors_and_forget_removed_ones() {
        let repo = Arc::new(InMemoryRepo::default());
        let svc = service(&repo, false);
        let first = Sensor::new("Sensor 1", SensorType::Door);
        let second = Sensor::new("Sensor 2", SensorType::Window);

        svc.add_sensor(first.clone()).await.unwrap();
        svc.add_sensor(second.clone()).await.unwrap();

        let sensors = svc.sensors().await.unwrap();
        assert_eq!(sensors.len(), 2);
        assert!(sensors.contains(&first));
        assert!(sensors.contains(&second));

        for sensor in sensors {
            svc.remove_sensor(sensor).await.unwrap();
        }
        assert!(svc.sensors().await.unwrap().is_empty());
        assert_eq!(repo.alarm_writes(), 0);
    }

    #[tokio::test]
    async fn should_reject_sensor_with_blank_name() {
        let repo = Arc::new(InMemoryRepo::default());
        let svc = service(&repo, false);

        let result = svc.add_sensor(Sensor::new("", SensorType::Motion)).await;

        assert!(matches!(
            result,
            Err(CatpointError::Validation(ValidationError::EmptySensorName))
        ));
        assert!(svc.sensors().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn should_publish_alarm_change_events() {
        let repo = Arc::new(
            StubRepo::default()
                .with_arming(ArmingStatus::ArmedHome)
                .with_alarm(AlarmStatus::NoAlarm),
        );
        let bus = Arc::new(InProcessEventBus::new(16));
        let mut rx = bus.subscribe();
        let svc = SecurityService::new(Arc::clone(&repo), FixedClassifier::new(false), bus);

        svc.change_sensor_activation_status(front_door(), true)
            .await
            .unwrap();

        assert_eq!(
            rx.recv().await.unwrap().kind,
            SecurityEventKind::AlarmStatusChanged {
                status: AlarmStatus::PendingAlarm
            }
        );
        assert_eq!(
            rx.recv().await.unwrap().kind,
            SecurityEventKind::SensorsChanged
        );
    }

    #[tokio::test]
    async fn should_publish_cat_detection_result() {
        let repo = Arc::new(StubRepo::default());
        let bus = Arc::new(InProcessEventBus::new(16));
        let mut rx = bus.subscribe();
        let svc = SecurityService::new(Arc::clone(&repo), FixedClassifier::new(true), bus);

        svc.process_image(&image()).await.unwrap();

        assert_eq!(
            rx.recv().await.unwrap().kind,
            SecurityEventKind::CatDetected { detected: true }
        );
    }

    #[tokio::test]
    async fn should_complete_transition_when_publisher_fails() {
        let repo = Arc::new(StubRepo::default().with_alarm(AlarmStatus::Alarm));
        let svc = SecurityService::new(
            Arc::clone(&repo),
            FixedClassifier::new(false),
            BrokenPublisher,
        );

        svc.set_arming_status(ArmingStatus::Disarmed).await.unwrap();

        assert_eq!(repo.alarm_writes(), vec![AlarmStatus::NoAlarm]);
    }

    #[tokio::test]
    async fn should_write_alarm_status_directly() {
        let repo = Arc::new(InMemoryRepo::default());
        let svc = service(&repo, false);

        svc.set_alarm_status(AlarmStatus::Alarm).await.unwrap();

        assert_eq!(svc.alarm_status().await.unwrap(), AlarmStatus::Alarm);
    }
}
