//! Which engine primitives each delete runs, and what a failure leaves behind.

use rangestream_core::{
    Backend, BackendConfig, DelStep, ListBackend, ListOptions, ListStore, MemoryListStore,
    StorageError, StreamError, StreamHandle,
};
use rangestream_testkit::prelude::*;
use serde_json::Value;
use std::sync::Arc;

use rangestream_testkit::Primitive::{DeleteRange, Len, Push, Range, Trim};

/// A backend over a fault-injecting wrapper, plus the wrapper itself.
fn faulty(events: usize, native: bool) -> (ListBackend, Arc<FaultyListStore>, StreamHandle) {
    let store = FaultyListStore::new(seeded(numbered_events(events)));
    over(if native { store.with_native_delete() } else { store })
}

fn seeded(events: Vec<Vec<u8>>) -> Arc<MemoryListStore> {
    Arc::new(MemoryListStore::with_lists([("s", events)]))
}

fn over(store: FaultyListStore) -> (ListBackend, Arc<FaultyListStore>, StreamHandle) {
    let store = Arc::new(store);
    let engine: Arc<dyn ListStore> = store.clone();
    let backend = ListBackend::with_engine(
        engine,
        BackendConfig::new("faulty", Value::Null),
        ListOptions::default(),
    );
    let stream = backend.get_stream("s").unwrap();
    store.reset_calls();
    (backend, store, stream)
}

fn events(names: &[&str]) -> Vec<Vec<u8>> {
    names.iter().map(|n| n.as_bytes().to_vec()).collect()
}

#[test]
fn middle_delete_reads_tail_trims_and_reappends() {
    let (_backend, store, stream) = faulty(3, false);

    assert!(stream.del(1, 2).unwrap());
    assert_eq!(store.calls(), vec![Len, Range, Trim, Push]);
    assert_eq!(stream.len().unwrap(), 2);
    assert_eq!(contents(&stream), events(&["e0", "e2"]));
}

#[test]
fn middle_delete_uses_native_delete_when_offered() {
    let (_backend, store, stream) = faulty(3, true);

    assert!(stream.del(1, 2).unwrap());
    assert_eq!(store.mutations(), vec![DeleteRange]);
    assert_eq!(contents(&stream), events(&["e0", "e2"]));
}

#[test]
fn prefix_and_suffix_deletes_are_single_trims() {
    let (_backend, store, stream) = faulty(5, false);

    assert!(stream.del(0, 2).unwrap());
    assert_eq!(store.mutations(), vec![Trim]);
    store.reset_calls();

    assert!(stream.del(2, -1).unwrap());
    assert_eq!(store.mutations(), vec![Trim]);
    assert_eq!(contents(&stream), events(&["e2", "e3"]));
}

#[test]
fn whole_stream_sentinel_skips_length_query() {
    let (_backend, store, stream) = faulty(2, false);

    assert!(stream.del(0, -1).unwrap());
    assert_eq!(store.calls(), vec![Primitive::Clear]);
}

#[test]
fn equal_indices_touch_no_storage() {
    let (_backend, store, stream) = faulty(2, false);

    assert!(stream.del(1, 1).unwrap());
    assert_eq!(stream.read_to_vec(4, 4).unwrap().len(), 0);
    assert!(store.calls().is_empty());
}

#[test]
fn failures_before_trim_leave_stream_unchanged() {
    let cases = [
        (Len, DelStep::Length),
        (Range, DelStep::ReadTail),
        (Trim, DelStep::Trim),
    ];
    for (primitive, expected) in cases {
        let (_backend, store, stream) = faulty(3, false);
        store.fail_on(primitive, 0);

        match stream.del(1, 2) {
            Err(StreamError::DeleteFailed { step, stream: name, .. }) => {
                assert_eq!(step, expected);
                assert_eq!(name, "s");
            }
            other => panic!("{primitive:?}: expected DeleteFailed, got {other:?}"),
        }
        assert_eq!(contents(&stream), numbered_events(3));
    }
}

#[test]
fn clear_failure_is_annotated() {
    let (_backend, store, stream) = faulty(2, false);
    store.fail_on(Primitive::Clear, 0);

    let err = stream.del(0, -1).unwrap_err();
    assert!(matches!(
        err,
        StreamError::DeleteFailed {
            step: DelStep::Clear,
            ..
        }
    ));
    assert!(!err.is_data_loss());
    assert_eq!(stream.len().unwrap(), 2);
}

#[test]
fn native_delete_failure_leaves_stream_unchanged() {
    let (_backend, store, stream) = faulty(4, true);
    store.fail_on(DeleteRange, 0);

    assert!(matches!(
        stream.del(1, 3),
        Err(StreamError::DeleteFailed {
            step: DelStep::NativeDelete,
            ..
        })
    ));
    assert_eq!(contents(&stream), numbered_events(4));
}

#[test]
fn reappend_failure_reports_lost_tail() {
    let (_backend, store, stream) = faulty(5, false);
    store.fail_on(Push, 0);

    let err = stream.del(1, 3).unwrap_err();
    assert!(err.is_data_loss());
    match err {
        StreamError::PartialDeleteDataLoss { stream: name, lost, .. } => {
            assert_eq!(name, "s");
            assert_eq!(lost, 2);
        }
        other => panic!("expected PartialDeleteDataLoss, got {other:?}"),
    }
    // The stream kept only the prefix before the range
    assert_eq!(contents(&stream), events(&["e0"]));
}

// Key "s" takes 9 payload bytes, each two-byte event 6 more: two per push
const TWO_EVENT_PUSH: usize = 21;

#[test]
fn middle_delete_reappends_tail_in_pushes_that_fit() {
    let (_backend, store, stream) =
        over(FaultyListStore::new(seeded(numbered_events(8))).with_push_limit(TWO_EVENT_PUSH));

    assert!(stream.del(1, 2).unwrap());
    assert_eq!(store.calls(), vec![Len, Range, Trim, Push, Push, Push]);
    let mut expected = numbered_events(8);
    expected.remove(1);
    assert_eq!(contents(&stream), expected);
}

#[test]
fn reappend_failure_counts_only_events_not_restored() {
    let (_backend, store, stream) =
        over(FaultyListStore::new(seeded(numbered_events(8))).with_push_limit(TWO_EVENT_PUSH));
    store.fail_on(Push, 1);

    match stream.del(1, 2).unwrap_err() {
        StreamError::PartialDeleteDataLoss { lost, .. } => assert_eq!(lost, 4),
        other => panic!("expected PartialDeleteDataLoss, got {other:?}"),
    }
    assert_eq!(contents(&stream), events(&["e0", "e2", "e3"]));
}

#[test]
fn tail_event_over_push_limit_refuses_before_trim() {
    let seed = events(&["e0", "e1", "an event longer than one push allows"]);
    let (_backend, store, stream) =
        over(FaultyListStore::new(seeded(seed.clone())).with_push_limit(TWO_EVENT_PUSH));

    match stream.del(1, 2) {
        Err(StreamError::DeleteFailed { step, source, .. }) => {
            assert_eq!(step, DelStep::ReadTail);
            assert!(matches!(source, StorageError::TooLarge { .. }));
        }
        other => panic!("expected DeleteFailed, got {other:?}"),
    }
    assert!(store.mutations().is_empty());
    assert_eq!(contents(&stream), seed);
}

#[test]
fn add_rejects_event_over_push_limit() {
    let (_backend, store, stream) =
        over(FaultyListStore::new(seeded(Vec::new())).with_push_limit(TWO_EVENT_PUSH));

    // 21 - 9 - 4 leaves 8 bytes for a single event
    assert!(matches!(
        stream.add("123456789"),
        Err(StreamError::InvalidPayload { size: 9, max: 8 })
    ));
    assert!(store.mutations().is_empty());
    stream.add("12345678").unwrap();
    assert_eq!(stream.len().unwrap(), 1);
}

#[test]
fn file_engine_middle_delete_survives_reopen() {
    let fixture = TestBackend::file_with(ListOptions::new().prefer_native_delete(false));
    let stream = seeded_stream(&fixture.backend, "s", &numbered_events(3)).unwrap();
    assert!(stream.del(1, 2).unwrap());
    stream.close().unwrap();

    let fixture = fixture.reopen(ListOptions::default());
    let stream = fixture.get_stream("s").unwrap();
    assert_eq!(contents(&stream), events(&["e0", "e2"]));
}
