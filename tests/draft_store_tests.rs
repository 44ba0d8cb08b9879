mod common;

use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};

use bulkedit::io::draft_store::{DraftScope, DraftStore};
use bulkedit::io::storage::{FileStorage, MemoryStorage};
use bulkedit::io::DraftStorage;
use bulkedit::state::data_model::RowId;
use bulkedit::state::diff::SessionDiff;

use common::ManualClock;

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap()
}

fn scope() -> DraftScope {
    DraftScope::new("teacher-7", "/students/grades")
}

fn sample_diff() -> SessionDiff {
    let mut diff = SessionDiff::new();
    diff.record(&RowId::from("42"), "grade", Some(json!(7)), json!(8));
    diff
}

#[test]
fn test_set_then_get_returns_the_diff() {
    let storage = MemoryStorage::new();
    let mut store = DraftStore::with_clock(storage.clone(), ManualClock::new(start()));

    store.set(&scope(), &sample_diff(), DAY).unwrap();
    assert_eq!(store.get(&scope()).unwrap(), Some(sample_diff()));
    assert_eq!(storage.len(), 1);
}

#[test]
fn test_persisted_layout() {
    let storage = MemoryStorage::new();
    let mut store = DraftStore::with_clock(storage.clone(), ManualClock::new(start()));
    store.set(&scope(), &sample_diff(), DAY).unwrap();

    let raw = storage.read(&scope().key()).unwrap().unwrap();
    let value: Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(
        value["data"],
        json!({ "42": { "grade": { "originalValue": 7, "newValue": 8 } } })
    );
    let expires: DateTime<Utc> = value["expires"].as_str().unwrap().parse().unwrap();
    assert_eq!(expires, Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap());
}

#[test]
fn test_scopes_are_isolated() {
    let mut store = DraftStore::with_clock(MemoryStorage::new(), ManualClock::new(start()));
    store.set(&scope(), &sample_diff(), DAY).unwrap();

    assert_eq!(store.get(&DraftScope::new("teacher-8", "/students/grades")).unwrap(), None);
    assert_eq!(store.get(&DraftScope::new("teacher-7", "/students/roster")).unwrap(), None);
}

#[test]
fn test_separators_inside_ids_do_not_merge_scopes() {
    let mut store = DraftStore::with_clock(MemoryStorage::new(), ManualClock::new(start()));
    let alice = DraftScope::new("alice:x", "/v");
    let other = DraftScope::new("alice", "x:/v");
    assert_ne!(alice.key(), other.key());

    store.set(&alice, &sample_diff(), DAY).unwrap();
    assert_eq!(store.get(&other).unwrap(), None);
    assert_eq!(store.get(&alice).unwrap(), Some(sample_diff()));

    let quoted = DraftScope::new(r#"a","b"#, "/v");
    let split = DraftScope::new("a", r#"b","/v"#);
    assert_ne!(quoted.key(), split.key());
}

#[test]
fn test_setting_empty_diff_deletes_entry() {
    let storage = MemoryStorage::new();
    let mut store = DraftStore::with_clock(storage.clone(), ManualClock::new(start()));
    store.set(&scope(), &sample_diff(), DAY).unwrap();

    store.set(&scope(), &SessionDiff::new(), DAY).unwrap();
    assert!(storage.is_empty());
    assert_eq!(store.get(&scope()).unwrap(), None);
}

#[test]
fn test_expired_entry_is_not_returned_and_is_deleted() {
    let storage = MemoryStorage::new();
    let clock = ManualClock::new(start());
    let mut store = DraftStore::with_clock(storage.clone(), clock.clone());
    store.set(&scope(), &sample_diff(), Duration::from_secs(60)).unwrap();

    clock.advance(Duration::from_secs(60));
    assert!(store.get(&scope()).unwrap().is_some());

    clock.advance(Duration::from_secs(1));
    assert_eq!(store.get(&scope()).unwrap(), None);
    assert!(storage.read(&scope().key()).unwrap().is_none());
}

#[test]
fn test_malformed_draft_is_discarded() {
    let mut storage = MemoryStorage::new();
    storage.write(&scope().key(), "{not json").unwrap();
    let mut store = DraftStore::with_clock(storage.clone(), ManualClock::new(start()));

    assert_eq!(store.get(&scope()).unwrap(), None);
    assert!(storage.is_empty());
}

#[test]
fn test_draft_without_expiry_is_discarded() {
    let mut storage = MemoryStorage::new();
    storage
        .write(&scope().key(), r#"{"data":{"1":{"a":{"originalValue":1,"newValue":2}}}}"#)
        .unwrap();
    let mut store = DraftStore::with_clock(storage.clone(), ManualClock::new(start()));

    assert_eq!(store.get(&scope()).unwrap(), None);
    assert!(storage.is_empty());
}

#[test]
fn test_purge_expired_sweeps_only_stale_drafts() {
    let storage = MemoryStorage::new();
    let clock = ManualClock::new(start());
    let mut store = DraftStore::with_clock(storage.clone(), clock.clone());
    let fresh = DraftScope::new("teacher-7", "/students/roster");

    store.set(&scope(), &sample_diff(), Duration::from_secs(10)).unwrap();
    store.set(&fresh, &sample_diff(), DAY).unwrap();
    clock.advance(Duration::from_secs(11));

    assert_eq!(store.purge_expired().unwrap(), 1);
    assert_eq!(storage.len(), 1);
    assert!(store.get(&fresh).unwrap().is_some());
}

#[test]
fn test_quota_error_surfaces_from_set() {
    let mut store = DraftStore::with_clock(MemoryStorage::with_quota(8), ManualClock::new(start()));
    assert!(store.set(&scope(), &sample_diff(), DAY).is_err());
}

#[test]
fn test_file_storage_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let storage = FileStorage::open(dir.path().join("drafts")).unwrap();
        let mut store = DraftStore::with_clock(storage, ManualClock::new(start()));
        store.set(&scope(), &sample_diff(), DAY).unwrap();
    }

    let storage = FileStorage::open(dir.path().join("drafts")).unwrap();
    assert_eq!(storage.keys().unwrap(), vec![scope().key()]);
    let mut store = DraftStore::with_clock(storage, ManualClock::new(start()));
    assert_eq!(store.get(&scope()).unwrap(), Some(sample_diff()));

    store.remove(&scope()).unwrap();
    assert_eq!(store.get(&scope()).unwrap(), None);
}
