//! Consistency tests for CachedStore
//!
//! Reads and writes for the same match interleave at await points. These
//! tests pin the interleavings with a laggy backend on a paused clock and
//! check the version and log invariants against a simple model.

use std::time::Duration;

use matchcache_test_utils::generators::{arb_deltalog, arb_state};
use matchcache_test_utils::*;
use proptest::prelude::*;

const LAG: Duration = Duration::from_millis(50);

fn id() -> MatchId {
    MatchId::from("gameID")
}

fn laggy_store() -> CachedStore<LaggyStorage<InMemoryStorage>> {
    init_tracing();
    CachedStore::new(LaggyStorage::new(InMemoryStorage::new(), LAG))
}

/// Run `write` once the backend read of an in-flight fetch has happened but
/// before the fetch has returned.
async fn mid_fetch<F: std::future::Future>(write: F) -> F::Output {
    tokio::time::sleep(LAG + LAG / 2).await;
    write.await
}

// ============================================================================
// INTERLEAVINGS
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_newer_write_during_fetch_wins() {
    let store = laggy_store();
    let game = id();
    let write = versioned_state(1);
    store.set_state(&game, &versioned_state(0), None).await.unwrap();
    store.reset_cache();

    let (read, written) = tokio::join!(
        store.fetch(&game, FetchFields::STATE),
        mid_fetch(store.set_state(&game, &write, None)),
    );
    written.unwrap();

    // The backend answered with version 0 before the write landed.
    assert_eq!(read.unwrap().state, Some(versioned_state(1)));
    assert_eq!(store.cache().state.peek(&id()), Some(versioned_state(1)));
}

#[tokio::test(start_paused = true)]
async fn test_older_write_during_fetch_loses() {
    let store = laggy_store();
    let game = id();
    let write = versioned_state(1);
    store.set_state(&game, &versioned_state(2), None).await.unwrap();
    store.reset_cache();

    let (read, written) = tokio::join!(
        store.fetch(&game, FetchFields::STATE),
        mid_fetch(store.set_state(&game, &write, None)),
    );
    written.unwrap();

    assert_eq!(read.unwrap().state, Some(versioned_state(2)));
    assert_eq!(store.cache().state.peek(&id()), Some(versioned_state(2)));
}

#[tokio::test(start_paused = true)]
async fn test_log_append_during_fetch_is_kept() {
    let store = laggy_store();
    store
        .create_match(&id(), sample_create_opts("A"))
        .await
        .unwrap();
    store.reset_cache();

    let game = id();
    let write = versioned_state(1);
    let entry = move_entry(0);
    let delta = [entry.clone()];
    let (read, written) = tokio::join!(
        store.fetch(&game, FetchFields::LOG),
        mid_fetch(store.set_state(&game, &write, Some(&delta[..]))),
    );
    written.unwrap();
    assert_eq!(read.unwrap().log, Some(vec![]));

    let log = store.fetch(&id(), FetchFields::LOG).await.unwrap().log;
    assert_eq!(log, Some(vec![entry.clone()]));

    let backend = store
        .backend()
        .inner()
        .fetch(&id(), FetchFields::LOG)
        .await
        .unwrap();
    assert_eq!(backend.log, Some(vec![entry]));
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_writes_settle_on_highest_version() {
    let store = laggy_store();

    let game = id();
    let (v3, v5, v4) = (versioned_state(3), versioned_state(5), versioned_state(4));
    let (a, b, c) = tokio::join!(
        store.set_state(&game, &v3, None),
        store.set_state(&game, &v5, None),
        store.set_state(&game, &v4, None),
    );
    a.unwrap();
    b.unwrap();
    c.unwrap();

    let read = store.fetch(&id(), FetchFields::STATE).await.unwrap();
    assert_eq!(read.state.map(|s| s.version()), Some(5));
}

// ============================================================================
// BACKEND FAILURES
// ============================================================================

#[tokio::test]
async fn test_failed_write_leaves_cache_ahead_of_backend() {
    init_tracing();
    let store = CachedStore::new(FlakyStorage::new(InMemoryStorage::new()));
    store.set_state(&id(), &versioned_state(1), None).await.unwrap();

    store.backend().set_failing(true);
    let result = store.set_state(&id(), &versioned_state(2), None).await;
    assert!(matches!(
        result,
        Err(MatchCacheError::Storage(StorageError::Backend { .. }))
    ));

    let read = store.fetch(&id(), FetchFields::STATE).await.unwrap();
    assert_eq!(read.state, Some(versioned_state(2)));

    // Dropping the cache brings the backend view back.
    store.reset_cache();
    let read = store.fetch(&id(), FetchFields::STATE).await.unwrap();
    assert_eq!(read.state, Some(versioned_state(1)));
}

#[tokio::test]
async fn test_uncached_log_is_loaded_once() {
    init_tracing();
    let store = CachedStore::new(CountingStorage::new(DeprecatedStorage::new()));
    store
        .create_match(&id(), sample_create_opts("A"))
        .await
        .unwrap();
    store.cache().log.delete(&id());

    let delta = [move_entry(0)];
    store
        .set_state(&id(), &versioned_state(1), Some(&delta[..]))
        .await
        .unwrap();
    assert_eq!(store.backend().fetch_count(), 1, "log loaded once");
    assert_eq!(store.cache().log.peek(&id()), Some(delta.to_vec()));
}

// ============================================================================
// MODEL PROPERTIES
// ============================================================================

#[derive(Debug, Clone)]
enum Op {
    Write(State, Vec<LogEntry>),
    Reset,
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (arb_state(), arb_deltalog()).prop_map(|(state, delta)| Op::Write(state, delta)),
        1 => Just(Op::Reset),
    ]
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Without resets the cache serves the highest version ever written,
    /// while the backend holds the last one.
    #[test]
    fn prop_cache_serves_highest_version(
        states in prop::collection::vec(arb_state(), 1..16)
    ) {
        let rt = runtime();
        rt.block_on(async {
            let store = CachedStore::new(InMemoryStorage::new());
            for state in &states {
                store.set_state(&id(), state, None).await.unwrap();
            }

            let max = states.iter().map(State::version).max();
            let read = store.fetch(&id(), FetchFields::STATE).await.unwrap();
            prop_assert_eq!(read.state.map(|s| s.version()), max);

            let backend = store.backend().fetch(&id(), FetchFields::STATE).await.unwrap();
            prop_assert_eq!(backend.state.as_ref(), states.last());
            Ok(())
        })?;
    }

    /// The log equals the concatenation of every delta, whatever the
    /// cache resets in between, and matches the backend.
    #[test]
    fn prop_log_is_concatenation_of_deltas(
        ops in prop::collection::vec(arb_op(), 1..24)
    ) {
        let rt = runtime();
        rt.block_on(async {
            let store = CachedStore::new(InMemoryStorage::new());
            store.create_match(&id(), sample_create_opts("A")).await.unwrap();

            let mut expected = Vec::new();
            for op in &ops {
                match op {
                    Op::Write(state, delta) => {
                        store.set_state(&id(), state, Some(delta.as_slice())).await.unwrap();
                        expected.extend_from_slice(delta);
                    }
                    Op::Reset => store.reset_cache(),
                }
            }

            let read = store.fetch(&id(), FetchFields::LOG).await.unwrap();
            prop_assert_eq!(read.log.as_ref(), Some(&expected));

            let backend = store.backend().fetch(&id(), FetchFields::LOG).await.unwrap();
            prop_assert_eq!(backend.log, Some(expected));
            Ok(())
        })?;
    }

    /// After a reset every read reflects the backend exactly.
    #[test]
    fn prop_reset_exposes_backend(
        states in prop::collection::vec(arb_state(), 1..8)
    ) {
        let rt = runtime();
        rt.block_on(async {
            let store = CachedStore::new(InMemoryStorage::new());
            for state in &states {
                store.set_state(&id(), state, None).await.unwrap();
            }
            store.reset_cache();

            let read = store.fetch(&id(), FetchFields::STATE).await.unwrap();
            prop_assert_eq!(read.state.as_ref(), states.last());
            Ok(())
        })?;
    }
}
