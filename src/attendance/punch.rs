use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;

use super::device::{Camera, CaptureError, LocationError, LocationProvider};
use super::geofence::Geofence;
use super::normalizer::{normalize_days, read_summary};
use crate::error::PunchError;
use crate::model::attendance::{ATTENDANCE_COLLECTION, DayEntry, DayStatus, GeoSnapshot, PunchType};
use crate::model::student::StudentProfile;
use crate::services::profile::ProfileService;
use crate::store::object::ObjectStore;
use crate::store::{Document, DocumentStore, Expect, FieldPath, MergePatch, StoreError, server_timestamp};
use crate::utils::clock::Clock;
use crate::utils::date_key::DayCalendar;
use crate::utils::geo::LatLng;

/// Everything steps 1-5 established; the camera opens only after this
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PunchPlan {
    pub punch_type: PunchType,
    pub number: String,
    pub status: DayStatus,
    pub campus: String,
    pub location: GeoSnapshot,
    pub radius_m: f64,
    #[serde(skip)]
    pub profile: StudentProfile,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PunchOutcome {
    pub punch_type: PunchType,
    #[schema(example = "2025-10-28")]
    pub date_key: String,
    pub photo_url: String,
    pub location: GeoSnapshot,
    /// Set on OUT only
    pub duration_min: Option<i64>,
}

/// Runs one punch for one student on today's date, enforcing the IN/OUT
/// ordering and the geofence, and writing at most one IN and one OUT per day.
#[derive(Clone)]
pub struct PunchService {
    store: Arc<dyn DocumentStore>,
    objects: Arc<dyn ObjectStore>,
    profiles: ProfileService,
    geofence: Arc<Geofence>,
    calendar: DayCalendar,
    clock: Arc<dyn Clock>,
    location_timeout: Duration,
}

/// IN needs a day without IN; OUT needs IN and no OUT yet
fn check_order(punch_type: PunchType, has_in: bool, has_out: bool) -> Result<(), PunchError> {
    match punch_type {
        PunchType::In if has_in => Err(PunchError::AlreadyPunchedIn),
        PunchType::In => Ok(()),
        PunchType::Out if !has_in => Err(PunchError::NotPunchedInYet),
        PunchType::Out if has_out => Err(PunchError::AlreadyPunchedOut),
        PunchType::Out => Ok(()),
    }
}

/// Whole minutes between the two instants, rounded, never negative
pub fn duration_minutes(in_ms: i64, out_ms: i64) -> i64 {
    let minutes = (out_ms.saturating_sub(in_ms) as f64 / 60_000.0).round();
    minutes.max(0.0) as i64
}

impl PunchService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        objects: Arc<dyn ObjectStore>,
        profiles: ProfileService,
        geofence: Arc<Geofence>,
        calendar: DayCalendar,
        clock: Arc<dyn Clock>,
        location_timeout: Duration,
    ) -> Self {
        Self {
            store,
            objects,
            profiles,
            geofence,
            calendar,
            clock,
            location_timeout,
        }
    }

    pub fn today_key(&self) -> String {
        self.calendar.date_key(self.clock.now())
    }

    /// Authoritative read of today's status
    pub async fn today_status(&self, number: &str) -> Result<DayStatus, StoreError> {
        let date_key = self.today_key();
        let doc = self.store.get(ATTENDANCE_COLLECTION, number).await?;
        Ok(status_of(doc.as_ref(), &date_key))
    }

    /// Steps 1-5: profile, today's status, order guards, location, geofence
    #[instrument(name = "punch_precheck", skip(self, location), fields(direction = %punch_type))]
    pub async fn precheck(
        &self,
        email: &str,
        punch_type: PunchType,
        location: &dyn LocationProvider,
    ) -> Result<PunchPlan, PunchError> {
        // 1. profile
        let profile = self.resolve_profile(email).await?;
        let number = profile.number.clone().unwrap_or_default();

        // 2. today's status, straight from the store
        let status = self.today_status(&number).await?;
        debug!(number = %number, date_key = %status.date_key, has_in = status.has_in, has_out = status.has_out, "status read");

        // 3. ordering
        check_order(punch_type, status.has_in, status.has_out)?;

        // 4. location, bounded
        let position = match tokio::time::timeout(self.location_timeout, location.current_position()).await {
            Ok(Ok(p)) => p,
            Ok(Err(LocationError::Denied)) => return Err(PunchError::LocationDenied),
            Ok(Err(LocationError::Unavailable(reason))) => {
                return Err(PunchError::LocationUnavailable(reason));
            }
            Err(_) => {
                return Err(PunchError::LocationUnavailable(format!(
                    "no fix within {}s",
                    self.location_timeout.as_secs()
                )));
            }
        };

        // 5. geofence
        let point = LatLng::new(position.lat, position.lng);
        let verdict = self
            .geofence
            .evaluate(profile.branch.as_deref(), point)
            .ok_or_else(|| PunchError::LocationUnavailable("invalid coordinates".into()))?;

        if !verdict.within() {
            info!(number = %number, distance_m = verdict.distance_m, radius_m = verdict.radius_m, campus = %verdict.campus, "outside geofence");
            return Err(PunchError::OutOfGeofence {
                distance_m: verdict.rounded_distance_m(),
                radius_m: verdict.radius_m,
                campus: verdict.campus,
            });
        }

        Ok(PunchPlan {
            punch_type,
            number,
            status,
            location: GeoSnapshot {
                lat: position.lat,
                lng: position.lng,
                accuracy: position.accuracy,
                dist_m: Some(verdict.rounded_distance_m()),
            },
            campus: verdict.campus,
            radius_m: verdict.radius_m,
            profile,
        })
    }

    /// The whole flow: precheck, capture, upload, compare-and-swap write
    #[instrument(name = "punch", skip(self, location, camera), fields(direction = %punch_type))]
    pub async fn punch(
        &self,
        email: &str,
        punch_type: PunchType,
        location: &dyn LocationProvider,
        camera: &dyn Camera,
    ) -> Result<PunchOutcome, PunchError> {
        let plan = self.precheck(email, punch_type, location).await?;

        // 6. capture; cancelling here leaves nothing behind
        let photo = camera.capture().await.map_err(|e| match e {
            CaptureError::Cancelled => PunchError::CaptureCancelled,
            CaptureError::Failed(reason) => PunchError::CaptureFailed(reason),
        })?;

        // 7. upload
        let date_key = plan.status.date_key.clone();
        let path = format!(
            "attendance/{}/{}_{}.jpg",
            plan.number,
            date_key,
            self.clock.now_ms()
        );
        let photo_url = self
            .objects
            .put(&path, photo.bytes, &photo.content_type)
            .await
            .map_err(|e| {
                warn!(number = %plan.number, error = %e, "photo upload failed");
                PunchError::from(e)
            })?;

        // 8. write
        let duration_min = self.write(&plan, &date_key, &photo_url).await?;

        info!(number = %plan.number, date_key = %date_key, duration_min, "punch recorded");
        Ok(PunchOutcome {
            punch_type,
            date_key,
            photo_url,
            location: plan.location,
            duration_min,
        })
    }

    async fn resolve_profile(&self, email: &str) -> Result<StudentProfile, PunchError> {
        match self.profiles.load_by_email(email).await? {
            Some(p) if p.number.as_deref().is_some_and(|n| !n.is_empty()) => Ok(p),
            _ => Err(PunchError::ProfileNotFound),
        }
    }

    /// Re-reads the record, re-validates ordering against it, then merges
    /// only if nobody wrote in between. Returns the duration for OUT.
    async fn write(
        &self,
        plan: &PunchPlan,
        date_key: &str,
        photo_url: &str,
    ) -> Result<Option<i64>, PunchError> {
        let number = plan.number.as_str();
        let profile = &plan.profile;
        let doc = self.store.get(ATTENDANCE_COLLECTION, number).await?;
        let day = day_of(doc.as_ref(), date_key);
        check_order(plan.punch_type, day.has_in, day.has_out)?;

        let now = self.clock.now();
        let now_ms = now.timestamp_millis();
        let day_path = |field: &str| FieldPath::new(["days", date_key, field]);
        let loc = serde_json::to_value(plan.location).unwrap_or(Value::Null);

        let log = json!({
            "dateKey": date_key,
            "type": plan.punch_type,
            "at": server_timestamp(now),
            "loc": loc,
        });

        let (patch, duration_min) = match plan.punch_type {
            PunchType::In => {
                let first_in_today = !day.has_in;
                let mut patch = MergePatch::new()
                    .set(day_path("hasIn"), true)
                    .set(day_path("hasOut"), day.has_out)
                    .server_timestamp(day_path("inAt"))
                    .set(day_path("inAtMs"), now_ms)
                    .set(day_path("inPhoto"), photo_url)
                    .set(day_path("inLoc"), loc.clone());
                if let Some(name) = profile.name.as_deref() {
                    patch = patch.set("name", name);
                }
                if let Some(branch) = profile.branch.as_deref() {
                    patch = patch.set("meta.branch", branch);
                }
                if let Some(course) = profile.course.as_deref() {
                    patch = patch.set("meta.course", course);
                }
                if first_in_today {
                    // set rather than increment: a legacy flattened counter
                    // would otherwise be shadowed by a fresh nested one
                    let total = doc
                        .as_ref()
                        .map(|d| read_summary(&d.body).total_days)
                        .unwrap_or(0);
                    patch = patch.set("summary.totalDays", total + 1);
                }
                (patch, None)
            }
            PunchType::Out => {
                let in_ms = day.in_millis().unwrap_or(now_ms);
                let minutes = duration_minutes(in_ms, now_ms);
                let patch = MergePatch::new()
                    .set(day_path("hasOut"), true)
                    .server_timestamp(day_path("outAt"))
                    .set(day_path("outAtMs"), now_ms)
                    .set(day_path("durationMin"), minutes)
                    .set(day_path("outPhoto"), photo_url)
                    .set(day_path("outLoc"), loc.clone());
                (patch, Some(minutes))
            }
        };

        let patch = patch
            .array_union("logs", vec![log])
            .set("summary.lastAction", json!(plan.punch_type))
            .server_timestamp("summary.lastActionAt");

        match self
            .store
            .merge(ATTENDANCE_COLLECTION, number, &patch, Expect::from_read(doc.as_ref()))
            .await
        {
            Ok(version) => {
                debug!(number, version, "attendance merged");
                Ok(duration_min)
            }
            Err(StoreError::Conflict { .. }) => Err(self.classify_conflict(plan.punch_type, number, date_key).await),
            Err(e) => Err(e.into()),
        }
    }

    /// Someone else wrote between our read and our write. Report what the
    /// record looks like now; never retry the write.
    async fn classify_conflict(&self, punch_type: PunchType, number: &str, date_key: &str) -> PunchError {
        warn!(number, date_key, direction = %punch_type, "concurrent attendance write");
        match self.store.get(ATTENDANCE_COLLECTION, number).await {
            Ok(doc) => {
                let day = day_of(doc.as_ref(), date_key);
                match check_order(punch_type, day.has_in, day.has_out) {
                    Err(e) => e,
                    Ok(()) => PunchError::WriteConflict,
                }
            }
            Err(e) => PunchError::Store(e),
        }
    }
}

fn day_of(doc: Option<&Document>, date_key: &str) -> DayEntry {
    doc.and_then(|d| normalize_days(&d.body).get(date_key).cloned())
        .unwrap_or_default()
}

fn status_of(doc: Option<&Document>, date_key: &str) -> DayStatus {
    let day = day_of(doc, date_key);
    DayStatus::from_entry(date_key, Some(&day))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance::device::{CapturedPhoto, Position};
    use crate::attendance::geofence::Campus;
    use crate::attendance::normalizer::{AttendanceRecord, read_logs};
    use crate::model::student::STUDENTS_COLLECTION;
    use crate::store::MemoryDocumentStore;
    use crate::store::object::{MemoryObjectStore, ObjectStoreError};
    use crate::utils::clock::ManualClock;
    use crate::utils::profile_cache::ProfileCache;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const EMAIL: &str = "9820012345@abs-login.local";
    const NUMBER: &str = "9820012345";
    const CENTER: LatLng = LatLng {
        lat: 19.280002916468632,
        lng: 73.05493116068932,
    };
    /// one meter of latitude, in degrees
    const METER: f64 = 1.0 / 111_194.93;

    struct Fix(Result<Position, LocationError>);

    #[async_trait]
    impl LocationProvider for Fix {
        async fn current_position(&self) -> Result<Position, LocationError> {
            self.0.clone()
        }
    }

    fn at_meters_north(m: f64) -> Fix {
        Fix(Ok(Position {
            lat: CENTER.lat + m * METER,
            lng: CENTER.lng,
            accuracy: Some(8.0),
        }))
    }

    struct NeverAnswers;

    #[async_trait]
    impl LocationProvider for NeverAnswers {
        async fn current_position(&self) -> Result<Position, LocationError> {
            std::future::pending().await
        }
    }

    struct Shutter(Result<CapturedPhoto, CaptureError>);

    #[async_trait]
    impl Camera for Shutter {
        async fn capture(&self) -> Result<CapturedPhoto, CaptureError> {
            self.0.clone()
        }
    }

    fn selfie() -> Shutter {
        Shutter(Ok(CapturedPhoto {
            bytes: vec![0xff, 0xd8, 0xff],
            content_type: "image/jpeg".into(),
        }))
    }

    struct BrokenUplink;

    #[async_trait]
    impl ObjectStore for BrokenUplink {
        async fn put(&self, _: &str, _: Vec<u8>, _: &str) -> Result<String, ObjectStoreError> {
            Err(ObjectStoreError::Unavailable("connection reset".into()))
        }
    }

    /// Lets a competing write land between the pre-write read and the merge
    struct RacingStore {
        inner: Arc<MemoryDocumentStore>,
        race: std::sync::Mutex<Option<MergePatch>>,
        reads: AtomicUsize,
        race_after_reads: usize,
    }

    #[async_trait]
    impl DocumentStore for RacingStore {
        async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
            let doc = self.inner.get(collection, id).await?;
            let n = self.reads.fetch_add(1, Ordering::SeqCst) + 1;
            if collection == ATTENDANCE_COLLECTION && n == self.race_after_reads {
                let patch = self.race.lock().unwrap().take();
                if let Some(p) = patch {
                    self.inner.merge(collection, id, &p, Expect::Any).await?;
                }
            }
            Ok(doc)
        }

        async fn find(&self, collection: &str, filters: &[crate::store::Filter]) -> Result<Vec<Document>, StoreError> {
            self.inner.find(collection, filters).await
        }

        async fn merge(&self, collection: &str, id: &str, patch: &MergePatch, expect: Expect) -> Result<u64, StoreError> {
            self.inner.merge(collection, id, patch, expect).await
        }
    }

    struct Harness {
        store: Arc<MemoryDocumentStore>,
        objects: Arc<MemoryObjectStore>,
        clock: Arc<ManualClock>,
    }

    impl Harness {
        async fn new(branch: &str) -> Self {
            let clock = Arc::new(ManualClock::at_ms(1_000));
            let store = Arc::new(MemoryDocumentStore::with_clock(clock.clone()));
            store
                .merge(
                    STUDENTS_COLLECTION,
                    "s1",
                    &MergePatch::new()
                        .set("number", NUMBER)
                        .set("name", "Asha")
                        .set("branch", branch)
                        .set("course", "BSc IT"),
                    Expect::Absent,
                )
                .await
                .unwrap();
            Self {
                store,
                objects: Arc::new(MemoryObjectStore::new("https://cdn.test")),
                clock,
            }
        }

        fn service_with(&self, store: Arc<dyn DocumentStore>, objects: Arc<dyn ObjectStore>, radius_m: f64) -> PunchService {
            let mut branches = HashMap::new();
            branches.insert(
                "Bhiwandi".to_string(),
                Campus {
                    name: "ABS Bhiwandi".into(),
                    center: CENTER,
                },
            );
            let geofence = Geofence::new(
                branches,
                Campus {
                    name: "ABS Main".into(),
                    center: LatLng::new(19.41890950317244, 72.8181867996178),
                },
                radius_m,
            );
            PunchService::new(
                store.clone(),
                objects,
                ProfileService::new(store, ProfileCache::new(16)),
                Arc::new(geofence),
                DayCalendar::default(),
                self.clock.clone(),
                Duration::from_secs(10),
            )
        }

        fn service(&self, radius_m: f64) -> PunchService {
            self.service_with(self.store.clone(), self.objects.clone(), radius_m)
        }

        async fn record(&self) -> AttendanceRecord {
            let doc = self.store.get(ATTENDANCE_COLLECTION, NUMBER).await.unwrap().unwrap();
            AttendanceRecord::from_body(&doc.body)
        }
    }

    #[tokio::test]
    async fn in_then_out_records_one_minute() {
        let h = Harness::new("Bhiwandi").await;
        let svc = h.service(50.0);

        let out = svc.punch(EMAIL, PunchType::In, &at_meters_north(10.0), &selfie()).await.unwrap();
        assert_eq!(out.date_key, "1970-01-01");
        assert!(out.photo_url.starts_with("https://cdn.test/attendance/9820012345/1970-01-01_"));
        assert_eq!(out.duration_min, None);

        h.clock.set_ms(61_000);
        let out = svc.punch(EMAIL, PunchType::Out, &at_meters_north(10.0), &selfie()).await.unwrap();
        assert_eq!(out.duration_min, Some(1));

        let record = h.record().await;
        let day = record.days.get("1970-01-01").unwrap();
        assert!(day.has_in && day.has_out);
        assert_eq!(day.in_at_ms, Some(1_000));
        assert_eq!(day.out_at_ms, Some(61_000));
        assert_eq!(day.duration_min, Some(1));
        assert!(day.in_at.is_some() && day.out_at.is_some());
        assert_eq!(day.in_loc.unwrap().dist_m, Some(10.0));
        assert_eq!(record.summary.total_days, 1);
        assert_eq!(record.summary.last_action, Some(PunchType::Out));
        assert_eq!(record.logs.len(), 2);
        assert_eq!(record.name.as_deref(), Some("Asha"));
        assert_eq!(record.meta["branch"], "Bhiwandi");
        assert_eq!(h.objects.len(), 2);
    }

    #[tokio::test]
    async fn second_in_is_rejected_every_time() {
        let h = Harness::new("Bhiwandi").await;
        let svc = h.service(50.0);
        svc.punch(EMAIL, PunchType::In, &at_meters_north(5.0), &selfie()).await.unwrap();

        for _ in 0..3 {
            h.clock.advance_ms(1_000);
            let err = svc.punch(EMAIL, PunchType::In, &at_meters_north(5.0), &selfie()).await.unwrap_err();
            assert!(matches!(err, PunchError::AlreadyPunchedIn), "{err:?}");
        }

        let record = h.record().await;
        assert_eq!(record.summary.total_days, 1);
        assert_eq!(record.logs.len(), 1);
        assert_eq!(h.objects.len(), 1);
    }

    #[tokio::test]
    async fn flattened_in_flag_blocks_second_in() {
        let h = Harness::new("Bhiwandi").await;
        h.store
            .merge(
                ATTENDANCE_COLLECTION,
                NUMBER,
                &MergePatch::new()
                    .set(FieldPath::new(["days", "1970-01-01", "hasIn"]), false)
                    .set(FieldPath::new(["days", "1970-01-01", "hasOut"]), false)
                    .set(FieldPath::new(["days.1970-01-01.hasIn"]), true)
                    .set(FieldPath::new(["summary", "totalDays"]), 5),
                Expect::Absent,
            )
            .await
            .unwrap();

        let err = h
            .service(50.0)
            .punch(EMAIL, PunchType::In, &at_meters_north(1.0), &selfie())
            .await
            .unwrap_err();
        assert!(matches!(err, PunchError::AlreadyPunchedIn), "{err:?}");
        assert_eq!(h.record().await.summary.total_days, 5);
        assert!(h.objects.is_empty());
    }

    #[test]
    fn duration_survives_extreme_timestamps() {
        assert_eq!(duration_minutes(0, 90_000), 2);
        assert_eq!(duration_minutes(i64::MAX, i64::MIN), 0);
        assert!(duration_minutes(i64::MIN, i64::MAX) > 0);
    }

    #[tokio::test]
    async fn total_days_counts_distinct_days() {
        let h = Harness::new("Bhiwandi").await;
        let svc = h.service(50.0);
        let day_ms = 86_400_000;

        for day in 0..3 {
            h.clock.set_ms(1_000 + day * day_ms);
            svc.punch(EMAIL, PunchType::In, &at_meters_north(1.0), &selfie()).await.unwrap();
            svc.punch(EMAIL, PunchType::In, &at_meters_north(1.0), &selfie()).await.unwrap_err();
        }
        assert_eq!(h.record().await.summary.total_days, 3);
        assert_eq!(h.record().await.days.len(), 3);
    }

    #[tokio::test]
    async fn out_without_in() {
        let h = Harness::new("Bhiwandi").await;
        let err = h
            .service(50.0)
            .punch(EMAIL, PunchType::Out, &at_meters_north(1.0), &selfie())
            .await
            .unwrap_err();
        assert!(matches!(err, PunchError::NotPunchedInYet));
        assert!(h.store.get(ATTENDANCE_COLLECTION, NUMBER).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn second_out_is_rejected() {
        let h = Harness::new("Bhiwandi").await;
        let svc = h.service(50.0);
        svc.punch(EMAIL, PunchType::In, &at_meters_north(1.0), &selfie()).await.unwrap();
        svc.punch(EMAIL, PunchType::Out, &at_meters_north(1.0), &selfie()).await.unwrap();
        let err = svc.punch(EMAIL, PunchType::Out, &at_meters_north(1.0), &selfie()).await.unwrap_err();
        assert!(matches!(err, PunchError::AlreadyPunchedOut));
    }

    #[tokio::test]
    async fn geofence_scenarios() {
        let h = Harness::new("Bhiwandi").await;
        let svc = h.service(50.0);

        let err = svc.punch(EMAIL, PunchType::In, &at_meters_north(60.0), &selfie()).await.unwrap_err();
        match err {
            PunchError::OutOfGeofence { distance_m, radius_m, campus } => {
                assert_eq!(distance_m, 60.0);
                assert_eq!(radius_m, 50.0);
                assert_eq!(campus, "ABS Bhiwandi");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(h.objects.is_empty());

        svc.punch(EMAIL, PunchType::In, &at_meters_north(40.0), &selfie()).await.unwrap();
    }

    #[tokio::test]
    async fn unknown_branch_uses_default_center() {
        let h = Harness::new("Nowhere").await;
        let err = h
            .service(50.0)
            .punch(EMAIL, PunchType::In, &at_meters_north(0.0), &selfie())
            .await
            .unwrap_err();
        assert!(matches!(err, PunchError::OutOfGeofence { ref campus, .. } if campus == "ABS Main"));
    }

    #[tokio::test]
    async fn missing_profile() {
        let h = Harness::new("Bhiwandi").await;
        let err = h
            .service(50.0)
            .punch("5550100@abs-login.local", PunchType::In, &at_meters_north(0.0), &selfie())
            .await
            .unwrap_err();
        assert!(matches!(err, PunchError::ProfileNotFound));
    }

    #[tokio::test]
    async fn location_failures() {
        let h = Harness::new("Bhiwandi").await;
        let svc = h.service(50.0);

        let err = svc
            .punch(EMAIL, PunchType::In, &Fix(Err(LocationError::Denied)), &selfie())
            .await
            .unwrap_err();
        assert!(matches!(err, PunchError::LocationDenied));

        let nan = Fix(Ok(Position { lat: f64::NAN, lng: 0.0, accuracy: None }));
        let err = svc.punch(EMAIL, PunchType::In, &nan, &selfie()).await.unwrap_err();
        assert!(matches!(err, PunchError::LocationUnavailable(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn location_times_out() {
        let h = Harness::new("Bhiwandi").await;
        let err = h
            .service(50.0)
            .punch(EMAIL, PunchType::In, &NeverAnswers, &selfie())
            .await
            .unwrap_err();
        assert!(matches!(err, PunchError::LocationUnavailable(ref r) if r.contains("10s")));
    }

    #[tokio::test]
    async fn cancelled_capture_writes_nothing() {
        let h = Harness::new("Bhiwandi").await;
        let err = h
            .service(50.0)
            .punch(EMAIL, PunchType::In, &at_meters_north(1.0), &Shutter(Err(CaptureError::Cancelled)))
            .await
            .unwrap_err();
        assert!(matches!(err, PunchError::CaptureCancelled));
        assert!(h.objects.is_empty());
        assert!(h.store.get(ATTENDANCE_COLLECTION, NUMBER).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn upload_failure_surfaces() {
        let h = Harness::new("Bhiwandi").await;
        let svc = h.service_with(h.store.clone(), Arc::new(BrokenUplink), 50.0);
        let err = svc.punch(EMAIL, PunchType::In, &at_meters_north(1.0), &selfie()).await.unwrap_err();
        assert!(matches!(err, PunchError::UploadFailed(_)));
        assert!(h.store.get(ATTENDANCE_COLLECTION, NUMBER).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn racing_in_loses_cleanly() {
        let h = Harness::new("Bhiwandi").await;
        // another device lands its IN right after our pre-write read
        let competing = MergePatch::new()
            .set(FieldPath::new(["days", "1970-01-01", "hasIn"]), true)
            .set(FieldPath::new(["days", "1970-01-01", "inAtMs"]), 900)
            .array_union("logs", vec![json!({"dateKey": "1970-01-01", "type": "IN", "at": "1970-01-01T00:00:00.900Z"})])
            .set("summary.totalDays", 1);
        let racing = Arc::new(RacingStore {
            inner: h.store.clone(),
            race: std::sync::Mutex::new(Some(competing)),
            reads: AtomicUsize::new(0),
            // status read, then the pre-write read
            race_after_reads: 2,
        });
        let svc = h.service_with(racing, h.objects.clone(), 50.0);

        let err = svc.punch(EMAIL, PunchType::In, &at_meters_north(1.0), &selfie()).await.unwrap_err();
        assert!(matches!(err, PunchError::AlreadyPunchedIn), "{err:?}");

        let doc = h.store.get(ATTENDANCE_COLLECTION, NUMBER).await.unwrap().unwrap();
        assert_eq!(read_logs(&doc.body).len(), 1);
        assert_eq!(read_summary(&doc.body).total_days, 1);
    }

    #[tokio::test]
    async fn unrelated_concurrent_write_is_a_conflict() {
        let h = Harness::new("Bhiwandi").await;
        let competing = MergePatch::new().set("meta.note", "edited by office");
        let racing = Arc::new(RacingStore {
            inner: h.store.clone(),
            race: std::sync::Mutex::new(Some(competing)),
            reads: AtomicUsize::new(0),
            race_after_reads: 2,
        });
        let svc = h.service_with(racing, h.objects.clone(), 50.0);

        let err = svc.punch(EMAIL, PunchType::In, &at_meters_north(1.0), &selfie()).await.unwrap_err();
        assert!(matches!(err, PunchError::WriteConflict), "{err:?}");
    }

    #[tokio::test]
    async fn out_reads_flattened_legacy_in() {
        let h = Harness::new("Bhiwandi").await;
        h.store
            .insert(
                ATTENDANCE_COLLECTION,
                NUMBER,
                json!({
                    "days.1970-01-01.hasIn": true,
                    "days.1970-01-01.inAtMs": 1_000,
                    "summary.totalDays": 12
                })
                .as_object()
                .cloned()
                .unwrap(),
            )
            .unwrap();
        h.clock.set_ms(1_000 + 90 * 60_000);

        let out = h
            .service(50.0)
            .punch(EMAIL, PunchType::Out, &at_meters_north(1.0), &selfie())
            .await
            .unwrap();
        assert_eq!(out.duration_min, Some(90));
        assert_eq!(h.record().await.summary.total_days, 12);
    }

    #[tokio::test]
    async fn legacy_total_days_carries_over() {
        let h = Harness::new("Bhiwandi").await;
        h.store
            .insert(
                ATTENDANCE_COLLECTION,
                NUMBER,
                json!({"summary.totalDays": 12}).as_object().cloned().unwrap(),
            )
            .unwrap();
        h.service(50.0)
            .punch(EMAIL, PunchType::In, &at_meters_north(1.0), &selfie())
            .await
            .unwrap();
        assert_eq!(h.record().await.summary.total_days, 13);
    }

    #[test]
    fn duration_rounds_and_clamps() {
        assert_eq!(duration_minutes(1_000, 61_000), 1);
        assert_eq!(duration_minutes(0, 89_999), 1);
        assert_eq!(duration_minutes(0, 90_000), 2);
        assert_eq!(duration_minutes(61_000, 1_000), 0);
    }

    #[tokio::test]
    async fn precheck_reports_distance_without_writing() {
        let h = Harness::new("Bhiwandi").await;
        let plan = h
            .service(50.0)
            .precheck(EMAIL, PunchType::In, &at_meters_north(20.0))
            .await
            .unwrap();
        assert_eq!(plan.location.dist_m, Some(20.0));
        assert_eq!(plan.campus, "ABS Bhiwandi");
        assert!(!plan.status.has_in);
        assert!(h.store.get(ATTENDANCE_COLLECTION, NUMBER).await.unwrap().is_none());
    }
}
