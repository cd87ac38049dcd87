//! Persisted subjects across process restarts.
//!
//! A "restart" is a fresh backend instance reading the same file and a fresh
//! subject opened on the same key with a different default.

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use fstore_core::error::{BackendError, StoreError};
use fstore_core::json_codec;
use fstore_core::persist::{
    FilePreferences, Json, PersistedSubject, PreferenceBackend, PreferenceCodec, PreferenceValue,
};
use fstore_harness::{FlakyBackend, Recorder};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing_test::traced_test;
use uuid::Uuid;

fn open_file(path: &Path) -> Arc<dyn PreferenceBackend> {
    Arc::new(FilePreferences::open(path).unwrap())
}

fn survives_restart<T>(value: T, other: T)
where
    T: PreferenceCodec + Clone + PartialEq + std::fmt::Debug + Send + Sync + 'static,
{
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prefs.json");
    {
        let subject = PersistedSubject::open(open_file(&path), "value", other.clone()).unwrap();
        subject.publish(value.clone()).unwrap();
    }
    let reopened = PersistedSubject::open(open_file(&path), "value", other).unwrap();
    assert_eq!(reopened.current_value().unwrap(), value);
}

#[test]
fn every_codec_kind_survives_restart() {
    survives_restart("hello wörld".to_string(), String::new());
    survives_restart(true, false);
    survives_restart(i32::MIN, 0);
    survives_restart(i64::MAX, 0);
    survives_restart(-0.5_f32, 1.0);
    survives_restart(std::f64::consts::PI, 0.0);
    survives_restart(
        Decimal::from_str("79228162514264337593543950335").unwrap(),
        Decimal::ZERO,
    );
    survives_restart(Decimal::from_str("-0.000001").unwrap(), Decimal::ONE);
    survives_restart(
        NaiveDate::from_ymd_opt(1999, 12, 31)
            .unwrap()
            .and_hms_micro_opt(23, 59, 59, 999_999)
            .unwrap(),
        NaiveDateTime::default(),
    );
    survives_restart(
        TimeDelta::days(400) + TimeDelta::nanoseconds(1_234_567_800),
        TimeDelta::zero(),
    );
    survives_restart(-TimeDelta::minutes(90), TimeDelta::zero());
    survives_restart(Uuid::new_v4(), Uuid::nil());
    survives_restart(Json(vec![1_u16, 2, 3]), Json(Vec::new()));
}

#[test]
fn non_finite_floats_survive_restart() {
    survives_restart(f64::INFINITY, 0.0);
    survives_restart(f64::NEG_INFINITY, 0.0);
    survives_restart(f32::INFINITY, 0.0);
    survives_restart(f32::NEG_INFINITY, 0.0);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prefs.json");
    {
        let backend = open_file(&path);
        let name = PersistedSubject::open(Arc::clone(&backend), "name", String::new()).unwrap();
        name.publish("ada".to_string()).unwrap();
        let ratio = PersistedSubject::open(Arc::clone(&backend), "ratio", 1.0_f64).unwrap();
        ratio.publish(f64::NAN).unwrap();
        let scale = PersistedSubject::open(backend, "scale", 1.0_f32).unwrap();
        scale.publish(f32::NAN).unwrap();
    }

    let backend = open_file(&path);
    let name = PersistedSubject::open(Arc::clone(&backend), "name", String::new()).unwrap();
    assert_eq!(name.current_value().unwrap(), "ada");
    let ratio = PersistedSubject::open(Arc::clone(&backend), "ratio", 1.0_f64).unwrap();
    assert!(ratio.current_value().unwrap().is_nan());
    let scale = PersistedSubject::open(backend, "scale", 1.0_f32).unwrap();
    assert!(scale.current_value().unwrap().is_nan());
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Session {
    user: String,
    expires: Option<u64>,
}
json_codec!(Session);

#[test]
fn json_codec_types_survive_restart() {
    survives_restart(
        Session {
            user: "ada".into(),
            expires: Some(1_700_000_000),
        },
        Session {
            user: String::new(),
            expires: None,
        },
    );
}

#[test]
fn date_time_resolution_is_microseconds() {
    let backend: Arc<dyn PreferenceBackend> = Arc::new(fstore_core::persist::MemoryPreferences::new());
    let precise = NaiveDate::from_ymd_opt(2020, 1, 1)
        .unwrap()
        .and_hms_nano_opt(0, 0, 0, 123_456_789)
        .unwrap();
    let subject = PersistedSubject::open(Arc::clone(&backend), "at", NaiveDateTime::default()).unwrap();
    subject.publish(precise).unwrap();

    assert_eq!(
        backend.get("at").unwrap(),
        Some(PreferenceValue::Text("2020-01-01 00:00:00.123456".into()))
    );
    let reopened = PersistedSubject::open(backend, "at", NaiveDateTime::default()).unwrap();
    assert_eq!(
        reopened.current_value().unwrap(),
        precise - TimeDelta::nanoseconds(789)
    );
}

#[traced_test]
#[test]
fn failed_write_is_logged_and_not_committed() {
    let backend = Arc::new(FlakyBackend::new());
    let subject = PersistedSubject::open(backend.clone(), "name", "seed".to_string()).unwrap();
    let recorder = Recorder::new();
    let _sub = subject.subscribe(recorder.clone()).unwrap();

    backend.fail_writes(true);
    let err = subject.publish("lost".to_string()).unwrap_err();
    assert!(matches!(
        err,
        StoreError::Backend(BackendError::Unavailable { .. })
    ));
    assert!(logs_contain("subject.persist.failed"));

    assert_eq!(subject.current_value().unwrap(), "seed");
    assert_eq!(recorder.values(), vec!["seed".to_string()]);
    assert_eq!(backend.inner().get("name").unwrap(), None);
}

#[test]
fn unreadable_backend_fails_open() {
    let backend = Arc::new(FlakyBackend::new());
    backend.fail_reads(true);
    let err = PersistedSubject::open(backend, "name", 0_i32).unwrap_err();
    assert!(matches!(err, StoreError::Backend(_)));
}

#[test]
fn unparsable_stored_text_fails_open() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prefs.json");
    open_file(&path)
        .set("id", PreferenceValue::Text("not-a-uuid".into()))
        .unwrap();

    let err = PersistedSubject::open(open_file(&path), "id", Uuid::nil()).unwrap_err();
    assert!(matches!(err, StoreError::Codec(_)));
}
